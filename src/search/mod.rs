pub mod hits;
pub mod process;

pub use hits::{HitFilters, HitRecord};
pub use process::ProcessSearchRunner;

use crate::bio::sequence::QueryRecord;
use crate::utils::CancelToken;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// A reference database registered for the run. Read-only while the
/// run is in flight.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DatabaseRef {
    pub name: String,
    pub path: PathBuf,
    /// Rank among the configured databases; lower wins the final
    /// priority tie-break.
    pub priority: u32,
}

impl DatabaseRef {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, priority: u32) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            priority,
        }
    }
}

/// Hits recovered from one (query, database) task, together with the
/// number of output lines that could not be parsed. Malformed lines
/// never discard the parseable ones.
#[derive(Debug, Clone, Default)]
pub struct SearchHits {
    pub records: Vec<HitRecord>,
    pub malformed_lines: usize,
    pub filtered_out: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The external tool failed to start, crashed, or exited non-zero.
    Process,
    /// The tool exited cleanly but its output could not be read.
    MalformedOutput,
    /// The task was abandoned because the run was cancelled.
    Cancelled,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Process => write!(f, "process error"),
            Self::MalformedOutput => write!(f, "malformed output"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A database-scoped failure. Recorded in the run summary; never fatal
/// to the query, which keeps whatever the other databases returned.
#[derive(Debug, Clone, Serialize)]
pub struct SearchFailure {
    pub query_id: String,
    pub database: String,
    pub kind: FailureKind,
    pub detail: String,
}

impl SearchFailure {
    pub fn process(query_id: &str, database: &str, detail: impl Into<String>) -> Self {
        Self {
            query_id: query_id.to_string(),
            database: database.to_string(),
            kind: FailureKind::Process,
            detail: detail.into(),
        }
    }

    pub fn malformed(query_id: &str, database: &str, detail: impl Into<String>) -> Self {
        Self {
            query_id: query_id.to_string(),
            database: database.to_string(),
            kind: FailureKind::MalformedOutput,
            detail: detail.into(),
        }
    }

    pub fn cancelled(query_id: &str, database: &str) -> Self {
        Self {
            query_id: query_id.to_string(),
            database: database.to_string(),
            kind: FailureKind::Cancelled,
            detail: String::new(),
        }
    }
}

impl fmt::Display for SearchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} vs {}: {} {}",
            self.query_id, self.database, self.kind, self.detail
        )
    }
}

/// The capability the pipeline needs from a search backend. Production
/// runs an external aligner per task; tests swap in deterministic fakes.
pub trait SearchRunner: Send + Sync {
    fn run_search(
        &self,
        query: &QueryRecord,
        database: &DatabaseRef,
        cancel: &CancelToken,
    ) -> std::result::Result<SearchHits, SearchFailure>;
}
