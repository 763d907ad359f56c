pub mod config;
pub mod paths;
pub mod pipeline;

pub use config::{load_config, save_config, Config};
pub use pipeline::{AnnotationPipeline, RunOutput, RunSummary};
