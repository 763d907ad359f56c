pub mod cancel;
pub mod io;
pub mod parallel;

pub use cancel::CancelToken;
