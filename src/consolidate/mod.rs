use crate::bio::go::GoTerm;
use crate::bio::taxonomy::{LineageDistance, TaxonomyEntry};
use crate::index::store::AnnotationIndex;
use crate::ortholog::OrthologAssignment;
use crate::search::hits::HitRecord;
use serde::Serialize;
use std::cmp::Ordering;

/// A hit tagged with everything the comparator needs. Tagging happens
/// once per hit, against the shared index; comparisons are then pure.
#[derive(Debug, Clone, Serialize)]
pub struct RankedHit {
    pub hit: HitRecord,
    /// Resolved subject taxon, when the index knows it.
    pub taxonomy: Option<TaxonomyEntry>,
    /// False whenever the taxon is unknown or flagged uninformative.
    pub informative: bool,
    /// The contaminant keyword that matched, if any.
    pub contaminant: Option<String>,
    /// Closeness to the favored lineage (higher = closer).
    pub lineage_score: u32,
    /// Rank of the originating database (lower = preferred).
    pub db_priority: u32,
}

/// Per-run tagging context: the favored lineage path, the distance
/// metric, and the contaminant keyword list.
pub struct RankingContext<'a> {
    index: &'a AnnotationIndex,
    favored_path: Vec<String>,
    metric: LineageDistance,
    contaminants: Vec<String>,
}

impl<'a> RankingContext<'a> {
    pub fn new(
        index: &'a AnnotationIndex,
        favored: Option<&TaxonomyEntry>,
        metric: LineageDistance,
        contaminants: Vec<String>,
    ) -> Self {
        Self {
            index,
            favored_path: favored.map(|t| t.full_path()).unwrap_or_default(),
            metric,
            contaminants: contaminants.iter().map(|c| c.to_lowercase()).collect(),
        }
    }

    /// Resolve the hit's taxon (explicit taxid column first, then the
    /// species name from the title) and compute its ranking tags.
    pub fn tag(&self, hit: HitRecord, db_priority: u32) -> RankedHit {
        let taxonomy = hit
            .taxon_hint
            .and_then(|id| self.index.lookup_taxonomy(crate::bio::taxonomy::TaxonId(id)))
            .or_else(|| {
                hit.species
                    .as_deref()
                    .and_then(|name| self.index.lookup_taxon_by_name(name))
            })
            .cloned();

        let informative = taxonomy.as_ref().map(|t| t.informative).unwrap_or(false);
        let lineage_score = taxonomy
            .as_ref()
            .map(|t| {
                self.metric
                    .score(&t.full_path(), informative, &self.favored_path)
            })
            .unwrap_or(0);
        let contaminant = if self.contaminants.is_empty() {
            None
        } else {
            taxonomy
                .as_ref()
                .and_then(|t| t.matches_contaminant(&self.contaminants))
        };

        RankedHit {
            hit,
            taxonomy,
            informative,
            contaminant,
            lineage_score,
            db_priority,
        }
    }
}

/// Total order over ranked hits; `Ordering::Less` means `a` is the
/// better annotation source. The chain, in strictly decreasing weight:
///
/// 1. informative taxon beats uninformative
/// 2. non-contaminant beats contaminant (inert with no contaminant list)
/// 3. among informative hits, closer to the favored lineage wins
/// 4. lower e-value, then higher identity, then higher bit score
/// 5. higher-priority database
/// 6. lexicographically smaller accession
///
/// Floats go through `total_cmp`, so NaN cannot poison the order. The
/// trailing coordinate comparison only separates distinct alignments of
/// the same subject that tie on everything above.
pub fn rank_cmp(a: &RankedHit, b: &RankedHit) -> Ordering {
    b.informative
        .cmp(&a.informative)
        .then_with(|| a.contaminant.is_some().cmp(&b.contaminant.is_some()))
        .then_with(|| {
            if a.informative && b.informative {
                b.lineage_score.cmp(&a.lineage_score)
            } else {
                Ordering::Equal
            }
        })
        .then_with(|| a.hit.evalue.total_cmp(&b.hit.evalue))
        .then_with(|| b.hit.pident.total_cmp(&a.hit.pident))
        .then_with(|| b.hit.bitscore.total_cmp(&a.hit.bitscore))
        .then_with(|| a.db_priority.cmp(&b.db_priority))
        .then_with(|| a.hit.accession.cmp(&b.hit.accession))
        .then_with(|| {
            (a.hit.qstart, a.hit.sstart, a.hit.qend, a.hit.send).cmp(&(
                b.hit.qstart,
                b.hit.sstart,
                b.hit.qend,
                b.hit.send,
            ))
        })
}

/// The final state of one query: its best hit, if any, plus whatever
/// the ortholog/GO aggregation attached. Built once, never mutated by
/// the report emitters.
#[derive(Debug, Clone, Serialize)]
pub struct ConsolidatedAnnotation {
    pub query_id: String,
    pub best_hit: Option<RankedHit>,
    pub ortholog: Option<OrthologAssignment>,
    pub go_terms: Vec<GoTerm>,
    pub description: Option<String>,
}

impl ConsolidatedAnnotation {
    pub fn unannotated(query_id: impl Into<String>) -> Self {
        Self {
            query_id: query_id.into(),
            best_hit: None,
            ortholog: None,
            go_terms: Vec::new(),
            description: None,
        }
    }

    pub fn is_annotated(&self) -> bool {
        self.best_hit.is_some()
    }
}

/// Pick the best hit for one query. Zero candidates is a valid terminal
/// state and produces an unannotated record, not an error.
pub fn consolidate(query_id: &str, hits: Vec<RankedHit>) -> ConsolidatedAnnotation {
    let mut best: Option<RankedHit> = None;
    for candidate in hits {
        best = match best.take() {
            None => Some(candidate),
            Some(current) => {
                if rank_cmp(&candidate, &current) == Ordering::Less {
                    Some(candidate)
                } else {
                    Some(current)
                }
            }
        };
    }

    ConsolidatedAnnotation {
        query_id: query_id.to_string(),
        best_hit: best,
        ortholog: None,
        go_terms: Vec::new(),
        description: None,
    }
}
