//! Orchestrates the full annotation run: search every query against every
//! database, rank and consolidate the hits, then attach ortholog annotations.

use std::time::Instant;

use indexmap::IndexMap;
use indicatif::{ProgressBar, ProgressStyle};
use parking_lot::Mutex;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::bio::sequence::QueryRecord;
use crate::bio::taxonomy::{LineageDistance, TaxonomyEntry};
use crate::consolidate::{consolidate, ConsolidatedAnnotation, RankedHit, RankingContext};
use crate::index::store::AnnotationIndex;
use crate::ortholog::{Aggregator, EmptyOrthologMapper, OrthologMapper};
use crate::search::{DatabaseRef, FailureKind, SearchFailure, SearchRunner};
use crate::utils::parallel::build_thread_pool;
use crate::utils::CancelToken;
use crate::{LachesisError, Result};

static NO_MAPPER: EmptyOrthologMapper = EmptyOrthologMapper;

/// Per-database counters reported at the end of a run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DatabaseSummary {
    pub name: String,
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub hits_kept: usize,
    pub hits_filtered: usize,
    pub malformed_lines: usize,
}

/// Aggregate statistics for one pipeline run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub total_queries: usize,
    pub annotated: usize,
    pub unannotated: usize,
    pub contaminant_best: usize,
    pub databases: Vec<DatabaseSummary>,
    pub failures: Vec<SearchFailure>,
    pub elapsed_secs: f64,
}

/// Everything a run produces: one annotation per input query, in input
/// order, plus the run statistics.
#[derive(Debug)]
pub struct RunOutput {
    pub annotations: Vec<ConsolidatedAnnotation>,
    pub summary: RunSummary,
}

/// Annotation pipeline over a loaded index, a search runner, and a set of
/// registered databases.
///
/// Searches run as independent (query, database) tasks on a dedicated
/// thread pool. Results are regrouped per query in input order, so the
/// output is deterministic regardless of task scheduling.
pub struct AnnotationPipeline<'a> {
    index: &'a AnnotationIndex,
    runner: &'a dyn SearchRunner,
    mapper: &'a dyn OrthologMapper,
    databases: Vec<DatabaseRef>,
    favored: Option<String>,
    metric: LineageDistance,
    contaminants: Vec<String>,
    concurrency: usize,
    cancel: CancelToken,
    show_progress: bool,
}

impl<'a> AnnotationPipeline<'a> {
    pub fn new(
        index: &'a AnnotationIndex,
        runner: &'a dyn SearchRunner,
        databases: Vec<DatabaseRef>,
    ) -> Self {
        AnnotationPipeline {
            index,
            runner,
            mapper: &NO_MAPPER,
            databases,
            favored: None,
            metric: LineageDistance::default(),
            contaminants: Vec::new(),
            concurrency: 0,
            cancel: CancelToken::new(),
            show_progress: false,
        }
    }

    /// Attach an ortholog mapper; without one, queries keep their best hit
    /// but receive no group or GO terms.
    pub fn with_mapper(mut self, mapper: &'a dyn OrthologMapper) -> Self {
        self.mapper = mapper;
        self
    }

    /// Favor hits whose lineage is close to this taxon (numeric id or name).
    pub fn with_favored_taxon(mut self, selector: impl Into<String>) -> Self {
        self.favored = Some(selector.into());
        self
    }

    pub fn with_distance_metric(mut self, metric: LineageDistance) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_contaminants(mut self, contaminants: Vec<String>) -> Self {
        self.contaminants = contaminants;
        self
    }

    /// Worker thread count; zero means one per logical CPU.
    pub fn with_concurrency(mut self, threads: usize) -> Self {
        self.concurrency = threads;
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Run the pipeline over the given queries.
    ///
    /// Returns one annotation per query, in input order. A database failure
    /// for one (query, database) pair is recorded in the summary and does
    /// not abort the run; cancellation does, with no partial output.
    pub fn run(&self, queries: &[QueryRecord]) -> Result<RunOutput> {
        let started = Instant::now();

        if self.databases.is_empty() {
            return Err(LachesisError::Config(
                "no search databases registered".to_string(),
            ));
        }

        // Seed the per-query buckets up front so output order matches input
        // order and duplicate ids are caught before any search starts.
        let mut grouped: IndexMap<String, Vec<RankedHit>> =
            IndexMap::with_capacity(queries.len());
        for query in queries {
            if grouped.insert(query.id.clone(), Vec::new()).is_some() {
                return Err(LachesisError::Parse(format!(
                    "duplicate query id '{}'",
                    query.id
                )));
            }
        }

        let favored_entry = self.resolve_favored()?;
        let context = RankingContext::new(
            self.index,
            favored_entry.as_ref(),
            self.metric,
            self.contaminants.clone(),
        );

        let tasks: Vec<(usize, usize)> = (0..queries.len())
            .flat_map(|qi| (0..self.databases.len()).map(move |di| (qi, di)))
            .collect();

        info!(
            "Running {} searches ({} queries x {} databases)",
            tasks.len(),
            queries.len(),
            self.databases.len()
        );

        let progress = if self.show_progress {
            let pb = ProgressBar::new(tasks.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} Searching")
                    .unwrap(),
            );
            pb
        } else {
            ProgressBar::hidden()
        };

        let db_counters = Mutex::new(
            self.databases
                .iter()
                .map(|db| DatabaseSummary {
                    name: db.name.clone(),
                    ..Default::default()
                })
                .collect::<Vec<_>>(),
        );
        let failures = Mutex::new(Vec::<SearchFailure>::new());

        let pool = build_thread_pool(self.concurrency)
            .map_err(|e| LachesisError::Config(format!("Failed to build thread pool: {}", e)))?;

        let task_results: Vec<(usize, Vec<RankedHit>)> = pool.install(|| {
            tasks
                .par_iter()
                .map(|&(qi, di)| {
                    if self.cancel.is_cancelled() {
                        return (qi, Vec::new());
                    }
                    let query = &queries[qi];
                    let database = &self.databases[di];
                    db_counters.lock()[di].attempted += 1;

                    match self.runner.run_search(query, database, &self.cancel) {
                        Ok(hits) => {
                            let tagged: Vec<RankedHit> = hits
                                .records
                                .into_iter()
                                .map(|hit| context.tag(hit, database.priority))
                                .collect();
                            {
                                let mut counters = db_counters.lock();
                                counters[di].succeeded += 1;
                                counters[di].hits_kept += tagged.len();
                                counters[di].hits_filtered += hits.filtered_out;
                                counters[di].malformed_lines += hits.malformed_lines;
                            }
                            if hits.malformed_lines > 0 {
                                failures.lock().push(SearchFailure::malformed(
                                    &query.id,
                                    &database.name,
                                    format!("{} output lines skipped", hits.malformed_lines),
                                ));
                            }
                            progress.inc(1);
                            (qi, tagged)
                        }
                        Err(failure) => {
                            db_counters.lock()[di].failed += 1;
                            if failure.kind != FailureKind::Cancelled {
                                warn!("{}", failure);
                                failures.lock().push(failure);
                            }
                            progress.inc(1);
                            (qi, Vec::new())
                        }
                    }
                })
                .collect()
        });

        progress.finish_and_clear();

        if self.cancel.is_cancelled() {
            return Err(LachesisError::Cancelled);
        }

        for (qi, tagged) in task_results {
            if let Some((_, bucket)) = grouped.get_index_mut(qi) {
                bucket.extend(tagged);
            }
        }

        let aggregator = Aggregator::new(self.index, self.mapper);
        let per_query: Vec<(String, Vec<RankedHit>)> = grouped.into_iter().collect();
        let annotations: Vec<ConsolidatedAnnotation> = pool.install(|| {
            per_query
                .into_par_iter()
                .map(|(query_id, hits)| {
                    let mut annotation = consolidate(&query_id, hits);
                    aggregator.annotate(&mut annotation);
                    annotation
                })
                .collect()
        });

        let mut summary = RunSummary {
            total_queries: queries.len(),
            databases: db_counters.into_inner(),
            failures: failures.into_inner(),
            ..Default::default()
        };
        // Failure arrival order depends on scheduling; sort for stable output.
        summary
            .failures
            .sort_by(|a, b| (&a.database, &a.query_id).cmp(&(&b.database, &b.query_id)));
        for annotation in &annotations {
            if annotation.is_annotated() {
                summary.annotated += 1;
            } else {
                summary.unannotated += 1;
            }
            let contaminant = annotation
                .best_hit
                .as_ref()
                .map(|best| best.contaminant.is_some())
                .unwrap_or(false);
            if contaminant {
                summary.contaminant_best += 1;
            }
        }
        summary.elapsed_secs = started.elapsed().as_secs_f64();

        info!(
            "Annotated {}/{} queries in {:.1}s ({} search failures)",
            summary.annotated,
            summary.total_queries,
            summary.elapsed_secs,
            summary.failures.len()
        );

        Ok(RunOutput {
            annotations,
            summary,
        })
    }

    fn resolve_favored(&self) -> Result<Option<TaxonomyEntry>> {
        let selector = match &self.favored {
            Some(selector) => selector,
            None => return Ok(None),
        };
        let entry = self.index.resolve_taxon(selector).cloned().ok_or_else(|| {
            LachesisError::Config(format!(
                "favored taxon '{}' not found in the annotation index",
                selector
            ))
        })?;
        info!(
            "Favoring lineage of {} (taxon {})",
            entry.name, entry.taxon_id
        );
        Ok(Some(entry))
    }
}
