use super::hits::{parse_tabular, HitFilters};
use super::{DatabaseRef, SearchFailure, SearchHits, SearchRunner};
use crate::bio::fasta;
use crate::bio::sequence::{QueryRecord, SequenceType};
use crate::utils::CancelToken;
use crate::{LachesisError, Result};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;
use tracing::{debug, warn};

/// Output columns requested from the external tool. The first twelve are
/// the standard BLAST tabular set; coverage and title feed the
/// consolidator's filters and species resolution.
pub const OUTPUT_COLUMNS: [&str; 14] = [
    "qseqid", "sseqid", "pident", "length", "mismatch", "gapopen", "qstart", "qend", "sstart",
    "send", "evalue", "bitscore", "qcovhsp", "stitle",
];

const POLL_INTERVAL: Duration = Duration::from_millis(25);
const STDERR_TAIL_LINES: usize = 6;

/// Runs a DIAMOND-compatible aligner as one external process per
/// (query, database) task. Each task gets its own directory under a
/// run-scoped temp root; cancellation kills the child process.
pub struct ProcessSearchRunner {
    tool_path: PathBuf,
    filters: HitFilters,
    extra_args: Vec<String>,
    work_dir: PathBuf,
    keep_work_dir: bool,
}

impl ProcessSearchRunner {
    pub fn new(tool_path: impl Into<PathBuf>) -> Result<Self> {
        let tool_path = tool_path.into();
        // Bare names resolve through PATH at spawn time; only explicit
        // paths can be checked up front.
        if tool_path.components().count() > 1 && !tool_path.exists() {
            return Err(LachesisError::Config(format!(
                "search tool not found at {}",
                tool_path.display()
            )));
        }

        let work_dir =
            std::env::temp_dir().join(format!("lachesis-run-{}", std::process::id()));
        fs::create_dir_all(&work_dir)?;

        Ok(Self {
            tool_path,
            filters: HitFilters::default(),
            extra_args: Vec::new(),
            work_dir,
            keep_work_dir: false,
        })
    }

    pub fn with_filters(mut self, filters: HitFilters) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_extra_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }

    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Result<Self> {
        self.work_dir = dir.into();
        fs::create_dir_all(&self.work_dir)?;
        Ok(self)
    }

    /// Keep per-task files around for debugging instead of removing them.
    pub fn keep_work_dir(mut self) -> Self {
        self.keep_work_dir = true;
        self
    }

    /// Probe the tool once before the run starts.
    pub fn check_version(&self) -> Result<String> {
        let output = Command::new(&self.tool_path)
            .arg("--version")
            .output()
            .map_err(|e| {
                LachesisError::SearchProcess(format!(
                    "failed to run {}: {}",
                    self.tool_path.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            return Err(LachesisError::SearchProcess(format!(
                "{} --version exited with {:?}",
                self.tool_path.display(),
                output.status.code()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Translated search for nucleotide queries, untranslated for protein.
    fn mode_for(query: &QueryRecord) -> &'static str {
        match query.detect_type() {
            SequenceType::Protein => "blastp",
            SequenceType::Nucleotide => "blastx",
        }
    }

    fn command_args(
        &self,
        mode: &str,
        database: &Path,
        query_path: &Path,
        output_path: &Path,
    ) -> Vec<String> {
        let mut args = vec![
            mode.to_string(),
            "--db".to_string(),
            database.display().to_string(),
            "--query".to_string(),
            query_path.display().to_string(),
            "--out".to_string(),
            output_path.display().to_string(),
            "--outfmt".to_string(),
            "6".to_string(),
        ];
        args.extend(OUTPUT_COLUMNS.iter().map(|c| c.to_string()));
        args.push("--evalue".to_string());
        args.push(format!("{:e}", self.filters.max_evalue));
        // The worker pool already bounds parallelism; one thread per child
        args.push("--threads".to_string());
        args.push("1".to_string());
        args.extend(self.extra_args.iter().cloned());
        args
    }

    fn task_dir(&self, query: &QueryRecord, database: &DatabaseRef) -> PathBuf {
        self.work_dir
            .join(format!("{}__{}", sanitize(&query.id), sanitize(&database.name)))
    }

    fn execute(
        &self,
        query: &QueryRecord,
        database: &DatabaseRef,
        cancel: &CancelToken,
        task_dir: &Path,
    ) -> std::result::Result<SearchHits, SearchFailure> {
        let as_process_failure =
            |detail: String| SearchFailure::process(&query.id, &database.name, detail);

        fs::create_dir_all(task_dir)
            .map_err(|e| as_process_failure(format!("cannot create task dir: {}", e)))?;

        let query_path = task_dir.join("query.fasta");
        fasta::write_fasta(&query_path, std::slice::from_ref(query))
            .map_err(|e| as_process_failure(format!("cannot write query file: {}", e)))?;

        let output_path = task_dir.join("hits.tsv");
        let stderr_path = task_dir.join("search.err");
        let stderr_file = File::create(&stderr_path)
            .map_err(|e| as_process_failure(format!("cannot create stderr file: {}", e)))?;

        let mode = Self::mode_for(query);
        let args = self.command_args(mode, &database.path, &query_path, &output_path);
        debug!(
            "Searching {} against {} ({} {})",
            query.id,
            database.name,
            self.tool_path.display(),
            mode
        );

        let mut child = Command::new(&self.tool_path)
            .args(&args)
            .stdout(Stdio::null())
            .stderr(Stdio::from(stderr_file))
            .spawn()
            .map_err(|e| as_process_failure(format!("failed to start: {}", e)))?;

        let status = loop {
            if cancel.is_cancelled() {
                child.kill().ok();
                child.wait().ok();
                return Err(SearchFailure::cancelled(&query.id, &database.name));
            }
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => std::thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    return Err(as_process_failure(format!("wait failed: {}", e)));
                }
            }
        };

        if !status.success() {
            let tail = stderr_tail(&stderr_path);
            warn!(
                "Search {} vs {} exited with {:?}",
                query.id,
                database.name,
                status.code()
            );
            return Err(as_process_failure(format!(
                "exit code {:?}: {}",
                status.code(),
                tail
            )));
        }

        // A clean exit with no output file means no alignments were found
        if !output_path.exists() {
            return Ok(SearchHits::default());
        }

        let file = File::open(&output_path).map_err(|e| {
            SearchFailure::malformed(
                &query.id,
                &database.name,
                format!("cannot open output: {}", e),
            )
        })?;
        parse_tabular(BufReader::new(file), &database.name, &self.filters).map_err(|e| {
            SearchFailure::malformed(&query.id, &database.name, format!("cannot read output: {}", e))
        })
    }

    pub fn cleanup(&self) -> Result<()> {
        if self.work_dir.exists() {
            fs::remove_dir_all(&self.work_dir)?;
        }
        Ok(())
    }
}

impl SearchRunner for ProcessSearchRunner {
    fn run_search(
        &self,
        query: &QueryRecord,
        database: &DatabaseRef,
        cancel: &CancelToken,
    ) -> std::result::Result<SearchHits, SearchFailure> {
        if cancel.is_cancelled() {
            return Err(SearchFailure::cancelled(&query.id, &database.name));
        }

        let task_dir = self.task_dir(query, database);
        let result = self.execute(query, database, cancel, &task_dir);

        if !self.keep_work_dir {
            fs::remove_dir_all(&task_dir).ok();
        }

        result
    }
}

impl Drop for ProcessSearchRunner {
    fn drop(&mut self) {
        if !self.keep_work_dir {
            let _ = self.cleanup();
        }
    }
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn stderr_tail(path: &Path) -> String {
    match fs::read_to_string(path) {
        Ok(content) => {
            let lines: Vec<&str> = content.lines().rev().take(STDERR_TAIL_LINES).collect();
            lines.into_iter().rev().collect::<Vec<_>>().join(" | ")
        }
        Err(_) => String::new(),
    }
}
