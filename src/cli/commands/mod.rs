pub mod annotate;
pub mod config;
pub mod index;
