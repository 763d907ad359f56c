//! Report emitters. Every emitter serializes the run output in input
//! query order and never mutates it.

use crate::bio::fasta::write_fasta;
use crate::bio::sequence::QueryRecord;
use crate::core::pipeline::RunOutput;
use anyhow::Result;
use std::fs;
use std::path::PathBuf;
use tracing::info;

pub mod json;
pub mod summary;
pub mod tsv;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Tsv,
    Json,
}

impl Format {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "tsv" => Some(Self::Tsv),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    fn file_name(&self) -> &'static str {
        match self {
            Self::Tsv => "annotations.tsv",
            Self::Json => "annotations.json",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub formats: Vec<Format>,
    /// Keep only GO terms at this ontology level; zero keeps every level.
    pub go_level: u8,
    pub write_unannotated_fasta: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            formats: vec![Format::Tsv],
            go_level: 0,
            write_unannotated_fasta: false,
        }
    }
}

/// Writes the configured report files into one output directory and
/// returns the paths it produced. The run summary is always written.
pub struct ReportWriter {
    output_dir: PathBuf,
    options: ReportOptions,
}

impl ReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>, options: ReportOptions) -> Self {
        Self {
            output_dir: output_dir.into(),
            options,
        }
    }

    pub fn write_all(&self, output: &RunOutput, queries: &[QueryRecord]) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(&self.output_dir)?;
        let mut written = Vec::new();

        for format in &self.options.formats {
            let content = match format {
                Format::Tsv => {
                    tsv::generate_tsv_report(&output.annotations, self.options.go_level)?
                }
                Format::Json => json::generate_json_report(&output.annotations)?,
            };
            written.push(self.write_file(format.file_name(), &content)?);
        }

        let summary_text = summary::generate_summary_report(&output.summary)?;
        written.push(self.write_file("summary.txt", &summary_text)?);

        if self.options.write_unannotated_fasta {
            let unannotated: Vec<QueryRecord> = queries
                .iter()
                .zip(&output.annotations)
                .filter(|(_, annotation)| !annotation.is_annotated())
                .map(|(query, _)| query.clone())
                .collect();
            let path = self.output_dir.join("unannotated.fasta");
            write_fasta(&path, &unannotated)?;
            info!(
                "Wrote {} unannotated queries to {}",
                unannotated.len(),
                path.display()
            );
            written.push(path);
        }

        Ok(written)
    }

    fn write_file(&self, name: &str, content: &str) -> Result<PathBuf> {
        let path = self.output_dir.join(name);
        fs::write(&path, content)?;
        info!("Wrote report {}", path.display());
        Ok(path)
    }
}

/// Resolve configured format names, rejecting anything unrecognized.
pub fn parse_formats(names: &[String]) -> std::result::Result<Vec<Format>, String> {
    let mut formats = Vec::with_capacity(names.len());
    for name in names {
        match Format::parse(name) {
            Some(format) => {
                if !formats.contains(&format) {
                    formats.push(format);
                }
            }
            None => return Err(format!("unknown report format '{}'", name)),
        }
    }
    Ok(formats)
}
