use serde::{Deserialize, Serialize};
use std::fmt;

/// Weight applied to the overlap count of informative taxa.
pub const INFORM_FACTOR: u32 = 4;
/// Floor added to informative taxa that share nothing with the favored lineage.
pub const INFORM_ADD: u32 = 3;

/// NCBI-style numeric taxon identifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct TaxonId(pub u32);

impl fmt::Display for TaxonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One taxon as stored in the annotation index. Lineage is the ordered
/// ancestor chain, root first, normalized to lowercase at build time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomyEntry {
    pub taxon_id: TaxonId,
    pub name: String,
    pub lineage: Vec<String>,
    pub informative: bool,
}

impl TaxonomyEntry {
    /// Ancestor chain including the taxon's own name as the final segment.
    pub fn full_path(&self) -> Vec<String> {
        let mut path = self.lineage.clone();
        let name = self.name.to_lowercase();
        if path.last().map(|s| s.as_str()) != Some(name.as_str()) {
            path.push(name);
        }
        path
    }

    /// Human-readable lineage summary for reports.
    pub fn lineage_display(&self) -> String {
        self.lineage.join("; ")
    }

    /// True if any lineage segment (or the name itself) matches one of the
    /// configured contaminant keywords.
    pub fn matches_contaminant(&self, contaminants: &[String]) -> Option<String> {
        let path = self.full_path();
        for needle in contaminants {
            if path.iter().any(|seg| seg.contains(needle.as_str())) {
                return Some(needle.clone());
            }
        }
        None
    }
}

/// Split a raw `a;b;c` lineage string into normalized segments.
pub fn normalize_lineage(raw: &str) -> Vec<String> {
    raw.split(';')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// How closeness to the favored lineage is scored. Higher score = closer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LineageDistance {
    /// Length of the common root-first prefix with the favored lineage.
    #[default]
    SharedPrefix,
    /// Count of hit-lineage segments present anywhere in the favored
    /// lineage, weighted up for informative taxa.
    WeightedOverlap,
}

impl LineageDistance {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "shared-prefix" | "shared_prefix" | "prefix" => Some(Self::SharedPrefix),
            "weighted-overlap" | "weighted_overlap" | "overlap" => Some(Self::WeightedOverlap),
            _ => None,
        }
    }

    /// Score a hit's lineage path against the favored path. An empty hit
    /// path (unresolved taxon) always scores zero.
    pub fn score(&self, hit_path: &[String], informative: bool, favored_path: &[String]) -> u32 {
        if hit_path.is_empty() || favored_path.is_empty() {
            return 0;
        }

        match self {
            Self::SharedPrefix => hit_path
                .iter()
                .zip(favored_path.iter())
                .take_while(|(a, b)| a == b)
                .count() as u32,
            Self::WeightedOverlap => {
                let mut score: u32 = hit_path
                    .iter()
                    .filter(|seg| favored_path.contains(seg))
                    .count() as u32;
                if informative {
                    score *= INFORM_FACTOR;
                    if score == 0 {
                        score += INFORM_ADD;
                    }
                }
                score
            }
        }
    }
}

impl fmt::Display for LineageDistance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SharedPrefix => write!(f, "shared-prefix"),
            Self::WeightedOverlap => write!(f, "weighted-overlap"),
        }
    }
}

/// Name/lineage keywords that mark a taxon as uninformative when no
/// explicit pattern file is supplied at index build time.
pub fn default_uninformative_patterns() -> Vec<String> {
    [
        "uncultured",
        "unclassified",
        "unidentified",
        "unknown",
        "synthetic construct",
        "artificial",
        "environmental sample",
        "metagenome",
        "vector",
        "plasmid",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Check a taxon name and lineage against the uninformative pattern list.
pub fn is_uninformative(name: &str, lineage: &[String], patterns: &[String]) -> bool {
    let name = name.to_lowercase();
    patterns.iter().any(|pat| {
        name.contains(pat.as_str()) || lineage.iter().any(|seg| seg.contains(pat.as_str()))
    })
}
