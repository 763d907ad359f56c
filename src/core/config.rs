use crate::bio::taxonomy::LineageDistance;
use crate::search::hits::HitFilters;
use crate::search::DatabaseRef;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub taxonomy: TaxonomyConfig,
    #[serde(default)]
    pub ortholog: OrthologConfig,
    #[serde(default)]
    pub databases: Vec<DatabaseEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Worker pool size; 0 uses every core.
    #[serde(default)]
    pub concurrency: usize,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Report formats to emit: any of "tsv", "json".
    #[serde(default = "default_formats")]
    pub formats: Vec<String>,
    /// Also write a FASTA of the queries that received no best hit.
    #[serde(default)]
    pub write_unannotated_fasta: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IndexConfig {
    /// Annotation index path; the default location is used when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// External aligner executable. Bare names resolve through PATH.
    #[serde(default = "default_tool_path")]
    pub tool_path: PathBuf,
    #[serde(default = "default_max_evalue")]
    pub max_evalue: f64,
    #[serde(default = "default_min_identity")]
    pub min_identity: f64,
    #[serde(default = "default_min_coverage")]
    pub min_coverage: f64,
    /// Extra arguments appended verbatim to every invocation.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TaxonomyConfig {
    /// Favored lineage selector: scientific name or numeric taxon id.
    #[serde(default)]
    pub favored: Option<String>,
    #[serde(default)]
    pub distance_metric: LineageDistance,
    /// Lineage keywords marking contaminant hits.
    #[serde(default)]
    pub contaminants: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OrthologConfig {
    /// Accession-to-ortholog-group mapping table.
    #[serde(default)]
    pub mapping: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseEntry {
    pub name: String,
    pub path: PathBuf,
    /// Priority rank; defaults to the position in this list.
    #[serde(default)]
    pub priority: Option<u32>,
}

// Default value functions
fn default_output_dir() -> PathBuf {
    PathBuf::from("lachesis_out")
}
fn default_formats() -> Vec<String> {
    vec!["tsv".to_string()]
}
fn default_tool_path() -> PathBuf {
    PathBuf::from("diamond")
}
fn default_max_evalue() -> f64 {
    HitFilters::default().max_evalue
}
fn default_min_identity() -> f64 {
    HitFilters::default().min_identity
}
fn default_min_coverage() -> f64 {
    HitFilters::default().min_coverage
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            concurrency: 0,
            output_dir: default_output_dir(),
            formats: default_formats(),
            write_unannotated_fasta: false,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            tool_path: default_tool_path(),
            max_evalue: default_max_evalue(),
            min_identity: default_min_identity(),
            min_coverage: default_min_coverage(),
            extra_args: Vec::new(),
        }
    }
}

impl Config {
    /// Run-fatal validation, performed before anything is spawned.
    pub fn validate(&self) -> crate::Result<()> {
        if self.databases.is_empty() {
            return Err(crate::LachesisError::Config(
                "no databases configured".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for db in &self.databases {
            if db.name.is_empty() {
                return Err(crate::LachesisError::Config(
                    "database with empty name".to_string(),
                ));
            }
            if !seen.insert(db.name.as_str()) {
                return Err(crate::LachesisError::Config(format!(
                    "duplicate database name '{}'",
                    db.name
                )));
            }
        }

        if self.search.max_evalue <= 0.0 {
            return Err(crate::LachesisError::Config(format!(
                "max_evalue must be positive, got {}",
                self.search.max_evalue
            )));
        }
        for (label, value) in [
            ("min_identity", self.search.min_identity),
            ("min_coverage", self.search.min_coverage),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(crate::LachesisError::Config(format!(
                    "{} must be within 0..=100, got {}",
                    label, value
                )));
            }
        }

        if self.run.formats.is_empty() {
            return Err(crate::LachesisError::Config(
                "no report formats configured".to_string(),
            ));
        }
        for format in &self.run.formats {
            if !matches!(format.as_str(), "tsv" | "json") {
                return Err(crate::LachesisError::Config(format!(
                    "unknown report format '{}'",
                    format
                )));
            }
        }

        Ok(())
    }

    /// Databases in priority order, with unset priorities defaulting to
    /// list position.
    pub fn database_refs(&self) -> Vec<DatabaseRef> {
        self.databases
            .iter()
            .enumerate()
            .map(|(i, db)| {
                DatabaseRef::new(db.name.clone(), db.path.clone(), db.priority.unwrap_or(i as u32))
            })
            .collect()
    }

    pub fn hit_filters(&self) -> HitFilters {
        HitFilters {
            max_evalue: self.search.max_evalue,
            min_identity: self.search.min_identity,
            min_coverage: self.search.min_coverage,
        }
    }
}

pub fn default_config() -> Config {
    Config::default()
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, crate::LachesisError> {
    let contents = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&contents)
        .map_err(|e| crate::LachesisError::Config(format!("Failed to parse config: {}", e)))?;
    Ok(config)
}

pub fn save_config<P: AsRef<Path>>(path: P, config: &Config) -> Result<(), crate::LachesisError> {
    let contents = toml::to_string_pretty(config)
        .map_err(|e| crate::LachesisError::Config(format!("Failed to serialize config: {}", e)))?;
    std::fs::write(path, contents)?;
    Ok(())
}
