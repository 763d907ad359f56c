pub mod builder;
pub mod format;
pub mod store;

pub use builder::{BuildStats, IndexBuilder};
pub use format::{IndexHeader, FORMAT_VERSION, INDEX_MAGIC};
pub use store::AnnotationIndex;
