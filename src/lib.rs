pub mod bio;
pub mod cli;
pub mod consolidate;
pub mod core;
pub mod index;
pub mod ortholog;
pub mod report;
pub mod search;
pub mod utils;

pub use crate::consolidate::{consolidate, ConsolidatedAnnotation, RankedHit};
pub use crate::core::pipeline::AnnotationPipeline;
pub use crate::index::store::AnnotationIndex;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LachesisError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Corrupt index: {0}")]
    CorruptIndex(String),

    #[error("Index version {found} not supported (supported: {supported})")]
    VersionMismatch { found: u16, supported: u16 },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Search process error: {0}")]
    SearchProcess(String),

    #[error("Malformed search output: {0}")]
    MalformedOutput(String),

    #[error("Run cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, LachesisError>;
