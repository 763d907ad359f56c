use regex::Regex;
use serde::{Deserialize, Serialize};
use std::io::BufRead;
use std::sync::OnceLock;

use super::SearchHits;
use crate::Result;

/// One alignment row from the tabular search output. Immutable once
/// parsed; the consolidator works on tagged copies.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HitRecord {
    pub query_id: String,
    pub database: String,
    /// Raw subject identifier as the tool printed it.
    pub subject_id: String,
    /// Normalized accession extracted from `subject_id`.
    pub accession: String,
    pub pident: f64,
    pub length: u32,
    pub mismatch: u32,
    pub gapopen: u32,
    pub qstart: u32,
    pub qend: u32,
    pub sstart: u32,
    pub send: u32,
    pub evalue: f64,
    pub bitscore: f64,
    /// Query coverage percentage, when the tool emitted the column.
    pub coverage: Option<f64>,
    pub title: Option<String>,
    /// Species name pulled out of the subject title.
    pub species: Option<String>,
    /// Explicit subject taxon id column, when present. Trusted over
    /// title parsing.
    pub taxon_hint: Option<u32>,
}

/// Admission thresholds applied while parsing. Hits that fail them are
/// counted but never reach the consolidator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HitFilters {
    pub max_evalue: f64,
    pub min_identity: f64,
    pub min_coverage: f64,
}

impl Default for HitFilters {
    fn default() -> Self {
        Self {
            max_evalue: 1e-5,
            min_identity: 0.0,
            min_coverage: 50.0,
        }
    }
}

impl HitFilters {
    pub fn admits(&self, hit: &HitRecord) -> bool {
        if hit.evalue > self.max_evalue {
            return false;
        }
        if hit.pident < self.min_identity {
            return false;
        }
        if let Some(cov) = hit.coverage {
            if cov < self.min_coverage {
                return false;
            }
        }
        true
    }
}

/// Parse tabular search output: the 12 standard BLAST columns, with
/// optional `qcovhsp`, `stitle` and `staxids` extensions. Lines that do
/// not parse are counted and skipped; everything parseable is kept.
pub fn parse_tabular<R: BufRead>(
    reader: R,
    database: &str,
    filters: &HitFilters,
) -> Result<SearchHits> {
    let mut hits = SearchHits::default();

    for line in reader.lines() {
        let line = line?;
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        match parse_hit_line(&line, database) {
            Some(hit) => {
                if filters.admits(&hit) {
                    hits.records.push(hit);
                } else {
                    hits.filtered_out += 1;
                }
            }
            None => hits.malformed_lines += 1,
        }
    }

    Ok(hits)
}

fn parse_hit_line(line: &str, database: &str) -> Option<HitRecord> {
    let parts: Vec<&str> = line.split('\t').collect();
    if parts.len() < 12 {
        return None;
    }

    let subject_id = parts[1].to_string();
    let mut hit = HitRecord {
        query_id: parts[0].to_string(),
        database: database.to_string(),
        accession: extract_accession(&subject_id),
        subject_id,
        pident: parts[2].parse().ok()?,
        length: parts[3].parse().ok()?,
        mismatch: parts[4].parse().ok()?,
        gapopen: parts[5].parse().ok()?,
        qstart: parts[6].parse().ok()?,
        qend: parts[7].parse().ok()?,
        sstart: parts[8].parse().ok()?,
        send: parts[9].parse().ok()?,
        evalue: parts[10].parse().ok()?,
        bitscore: parts[11].parse().ok()?,
        coverage: None,
        title: None,
        species: None,
        taxon_hint: None,
    };

    if hit.query_id.is_empty() || hit.subject_id.is_empty() {
        return None;
    }

    // qcovhsp, stitle, staxids in that order when requested
    if let Some(cov) = parts.get(12) {
        hit.coverage = cov.parse().ok();
    }
    if let Some(title) = parts.get(13) {
        if !title.is_empty() {
            hit.species = extract_species(title);
            hit.title = Some(title.to_string());
        }
    }
    if let Some(taxid) = parts.get(14) {
        // Multi-valued staxids come `;`-separated; the first one wins
        hit.taxon_hint = taxid.split(';').next().and_then(|t| t.trim().parse().ok());
    }

    Some(hit)
}

/// Normalize a subject identifier to a bare accession:
/// `sp|P12345|NAME_HUMAN` -> `P12345`, `gi|123|ref|NP_001.2|` -> `NP_001`,
/// otherwise the id with any trailing version stripped.
pub fn extract_accession(id: &str) -> String {
    if id.contains('|') {
        let parts: Vec<&str> = id.split('|').collect();
        if parts.len() >= 2 && (parts[0] == "sp" || parts[0] == "tr") {
            return parts[1].to_string();
        }
        for (i, part) in parts.iter().enumerate() {
            if matches!(*part, "ref" | "gb" | "emb" | "dbj") && i + 1 < parts.len() {
                let acc = parts[i + 1];
                return acc.split('.').next().unwrap_or(acc).to_string();
            }
        }
    }

    id.split('.').next().unwrap_or(id).to_string()
}

fn species_patterns() -> &'static (Regex, Regex) {
    static PATTERNS: OnceLock<(Regex, Regex)> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        (
            // UniProt style: `... OS=Pinus taeda OX=3352 GN=...`
            Regex::new(r"OS=(.+?)(?:\s+[A-Z]{2}=|$)").unwrap(),
            // NCBI style: trailing `[Pinus taeda]`
            Regex::new(r"\[([^\[\]]+)\]\s*$").unwrap(),
        )
    })
}

/// Pull the organism name out of a subject title, handling UniProt
/// `OS=` tags and NCBI trailing brackets.
pub fn extract_species(title: &str) -> Option<String> {
    let (os_re, bracket_re) = species_patterns();

    if let Some(caps) = os_re.captures(title) {
        let name = caps.get(1)?.as_str().trim();
        if !name.is_empty() {
            return Some(name.to_string());
        }
    }

    if let Some(caps) = bracket_re.captures(title) {
        let name = caps.get(1)?.as_str().trim();
        if !name.is_empty() {
            return Some(name.to_string());
        }
    }

    None
}
