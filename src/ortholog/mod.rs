use crate::bio::go::GroupEntry;
use crate::consolidate::ConsolidatedAnnotation;
use crate::index::store::AnnotationIndex;
use crate::utils::io::open_lines;
use crate::Result;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// An accession's ortholog-group assignment as provided by the external
/// mapping collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrthologAssignment {
    pub group_id: String,
    /// The database accession the assignment was keyed on.
    pub seed_ortholog: String,
    pub seed_evalue: Option<f64>,
    pub seed_score: Option<f64>,
    pub predicted_gene: Option<String>,
    pub tax_scope: Option<String>,
    pub kegg_terms: Vec<String>,
}

/// Capability interface over the accession-to-group mapping. A missing
/// mapping is an expected outcome, never an error.
pub trait OrthologMapper: Send + Sync {
    fn map_accession(&self, accession: &str) -> Option<OrthologAssignment>;
}

/// Mapper used when no mapping file is configured: every lookup misses,
/// so best hits keep empty GO sets.
#[derive(Debug, Default)]
pub struct EmptyOrthologMapper;

impl OrthologMapper for EmptyOrthologMapper {
    fn map_accession(&self, _accession: &str) -> Option<OrthologAssignment> {
        None
    }
}

/// Mapping loaded from a tab-separated table:
/// `accession <tab> group_id <tab> seed_evalue <tab> seed_score <tab>
/// predicted_gene <tab> tax_scope <tab> kegg,terms`. Only the first two
/// columns are required; `-` marks an absent value.
#[derive(Debug, Default)]
pub struct TsvOrthologMapper {
    map: HashMap<String, OrthologAssignment>,
}

impl TsvOrthologMapper {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut map = HashMap::new();
        let mut skipped = 0usize;

        for line in open_lines(path)? {
            let line = line?;
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match parse_mapping_line(&line) {
                Some((accession, assignment)) => {
                    map.insert(accession, assignment);
                }
                None => skipped += 1,
            }
        }

        info!(
            "Loaded {} ortholog mappings from {} ({} lines skipped)",
            map.len(),
            path.display(),
            skipped
        );

        Ok(Self { map })
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl OrthologMapper for TsvOrthologMapper {
    fn map_accession(&self, accession: &str) -> Option<OrthologAssignment> {
        self.map.get(accession).cloned()
    }
}

fn parse_mapping_line(line: &str) -> Option<(String, OrthologAssignment)> {
    let parts: Vec<&str> = line.split('\t').collect();
    if parts.len() < 2 {
        return None;
    }

    let accession = parts[0].trim();
    let group_id = parts[1].trim();
    if accession.is_empty() || group_id.is_empty() {
        return None;
    }

    let field = |i: usize| -> Option<&str> {
        parts
            .get(i)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty() && *s != "-")
    };

    let assignment = OrthologAssignment {
        group_id: group_id.to_string(),
        seed_ortholog: accession.to_string(),
        seed_evalue: field(2).and_then(|s| s.parse().ok()),
        seed_score: field(3).and_then(|s| s.parse().ok()),
        predicted_gene: field(4).map(|s| s.to_string()),
        tax_scope: field(5).map(|s| s.to_string()),
        kegg_terms: field(6)
            .map(|s| {
                s.split(',')
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect()
            })
            .unwrap_or_default(),
    };

    Some((accession.to_string(), assignment))
}

/// Attaches ortholog assignments and GO terms to consolidated
/// annotations. Group lookups are memoized across worker threads.
pub struct Aggregator<'a> {
    index: &'a AnnotationIndex,
    mapper: &'a dyn OrthologMapper,
    cache: DashMap<String, Option<GroupEntry>>,
}

impl<'a> Aggregator<'a> {
    pub fn new(index: &'a AnnotationIndex, mapper: &'a dyn OrthologMapper) -> Self {
        Self {
            index,
            mapper,
            cache: DashMap::new(),
        }
    }

    /// Resolve best hit -> ortholog group -> GO terms and description.
    /// An annotation without a best hit, or a best hit without a mapping,
    /// passes through untouched with an empty GO set.
    pub fn annotate(&self, annotation: &mut ConsolidatedAnnotation) {
        let accession = match &annotation.best_hit {
            Some(best) => best.hit.accession.clone(),
            None => return,
        };

        let assignment = match self.mapper.map_accession(&accession) {
            Some(a) => a,
            None => {
                debug!("No ortholog mapping for {}", accession);
                return;
            }
        };

        let group = self
            .cache
            .entry(assignment.group_id.clone())
            .or_insert_with(|| self.index.lookup_go_terms(&assignment.group_id).cloned())
            .clone();

        if let Some(group) = group {
            annotation.go_terms = group.terms;
            if !group.description.is_empty() {
                annotation.description = Some(group.description);
            }
        } else {
            debug!(
                "Ortholog group {} absent from index (accession {})",
                assignment.group_id, accession
            );
        }

        annotation.ortholog = Some(assignment);
    }
}
