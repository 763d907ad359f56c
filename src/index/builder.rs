use crate::bio::go::{GoCategory, GoTerm, GroupEntry};
use crate::bio::taxonomy::{
    default_uninformative_patterns, is_uninformative, normalize_lineage, TaxonId, TaxonomyEntry,
};
use crate::index::format::{IndexHeader, IndexPayload, FORMAT_VERSION};
use crate::utils::io::open_lines;
use crate::{LachesisError, Result};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Builds the binary annotation index from three tab-separated tables:
/// taxonomy (`name <tab> taxon_id <tab> lineage;semi;separated`), GO
/// terms (`go_id <tab> name <tab> category <tab> level`), and ortholog
/// groups (`group_id <tab> description <tab> GO:id[=EVIDENCE],...`).
/// Inputs may be gzip-compressed.
pub struct IndexBuilder {
    taxonomy_path: PathBuf,
    go_terms_path: PathBuf,
    groups_path: PathBuf,
    uninformative: Vec<String>,
}

#[derive(Debug, Default, Clone)]
pub struct BuildStats {
    pub taxa: usize,
    pub groups: usize,
    pub terms: usize,
    pub skipped_lines: usize,
    pub unknown_terms: usize,
}

impl IndexBuilder {
    pub fn new<P: AsRef<Path>>(taxonomy: P, go_terms: P, groups: P) -> Self {
        Self {
            taxonomy_path: taxonomy.as_ref().to_path_buf(),
            go_terms_path: go_terms.as_ref().to_path_buf(),
            groups_path: groups.as_ref().to_path_buf(),
            uninformative: default_uninformative_patterns(),
        }
    }

    pub fn with_uninformative_patterns(mut self, patterns: Vec<String>) -> Self {
        self.uninformative = patterns;
        self
    }

    /// Build the payload and write the container atomically (temp file,
    /// then rename into place).
    pub fn build<P: AsRef<Path>>(&self, output: P) -> Result<BuildStats> {
        let output = output.as_ref();
        let mut stats = BuildStats::default();

        let payload = self.build_payload(&mut stats)?;

        let payload_bytes = bincode::serialize(&payload)
            .map_err(|e| LachesisError::Other(format!("index serialization failed: {}", e)))?;
        let mut checksum = [0u8; 32];
        checksum.copy_from_slice(&Sha256::digest(&payload_bytes));

        let header = IndexHeader {
            version: FORMAT_VERSION,
            created_at: chrono::Utc::now().timestamp(),
            taxon_count: payload.taxa.len() as u64,
            group_count: payload.groups.len() as u64,
            payload_len: payload_bytes.len() as u64,
            checksum,
        };

        let tmp = output.with_extension("tmp");
        {
            let mut file = File::create(&tmp)?;
            file.write_all(&header.encode())?;
            file.write_all(&payload_bytes)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, output)?;

        info!(
            "Wrote index {} ({} taxa, {} groups, {} terms)",
            output.display(),
            stats.taxa,
            stats.groups,
            stats.terms
        );

        Ok(stats)
    }

    fn build_payload(&self, stats: &mut BuildStats) -> Result<IndexPayload> {
        let mut payload = IndexPayload::default();

        // Taxonomy table
        for line in open_lines(&self.taxonomy_path)? {
            let line = line?;
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match parse_taxonomy_line(&line, &self.uninformative) {
                Some(entry) => {
                    payload.names.insert(entry.name.to_lowercase(), entry.taxon_id);
                    payload.taxa.insert(entry.taxon_id, entry);
                }
                None => {
                    stats.skipped_lines += 1;
                    warn!("Skipping malformed taxonomy line: {}", truncate(&line));
                }
            }
        }
        stats.taxa = payload.taxa.len();

        // GO term vocabulary, joined into groups below
        let mut vocabulary: HashMap<String, GoTerm> = HashMap::new();
        for line in open_lines(&self.go_terms_path)? {
            let line = line?;
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match parse_go_line(&line) {
                Some(term) => {
                    vocabulary.insert(term.id.clone(), term);
                }
                None => {
                    stats.skipped_lines += 1;
                    warn!("Skipping malformed GO term line: {}", truncate(&line));
                }
            }
        }

        // Ortholog groups
        for line in open_lines(&self.groups_path)? {
            let line = line?;
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match parse_group_line(&line, &vocabulary, stats) {
                Some(group) => {
                    stats.terms += group.terms.len();
                    payload.groups.insert(group.group_id.clone(), group);
                }
                None => {
                    stats.skipped_lines += 1;
                    warn!("Skipping malformed group line: {}", truncate(&line));
                }
            }
        }
        stats.groups = payload.groups.len();

        if payload.taxa.is_empty() {
            return Err(LachesisError::Parse(format!(
                "no taxa parsed from {}",
                self.taxonomy_path.display()
            )));
        }

        Ok(payload)
    }
}

fn truncate(line: &str) -> &str {
    match line.char_indices().nth(80) {
        Some((i, _)) => &line[..i],
        None => line,
    }
}

fn parse_taxonomy_line(line: &str, uninformative: &[String]) -> Option<TaxonomyEntry> {
    let mut fields = line.split('\t');
    let name = fields.next()?.trim();
    let taxon_id: u32 = fields.next()?.trim().parse().ok()?;
    let lineage = normalize_lineage(fields.next().unwrap_or(""));

    if name.is_empty() {
        return None;
    }

    let informative = !is_uninformative(name, &lineage, uninformative);
    Some(TaxonomyEntry {
        taxon_id: TaxonId(taxon_id),
        name: name.to_string(),
        lineage,
        informative,
    })
}

fn parse_go_line(line: &str) -> Option<GoTerm> {
    let mut fields = line.split('\t');
    let id = fields.next()?.trim();
    let name = fields.next()?.trim();
    let category = GoCategory::parse(fields.next()?)?;
    let level = fields.next().and_then(|s| s.trim().parse::<u8>().ok());

    if id.is_empty() || name.is_empty() {
        return None;
    }

    Some(GoTerm {
        id: id.to_string(),
        name: name.to_string(),
        category,
        level,
        evidence: None,
    })
}

fn parse_group_line(
    line: &str,
    vocabulary: &HashMap<String, GoTerm>,
    stats: &mut BuildStats,
) -> Option<GroupEntry> {
    let mut fields = line.split('\t');
    let group_id = fields.next()?.trim();
    let description = fields.next()?.trim();
    let term_list = fields.next().unwrap_or("");

    if group_id.is_empty() {
        return None;
    }

    let mut terms = Vec::new();
    for spec in term_list.split(',').filter(|s| !s.trim().is_empty()) {
        // `GO:0016301=IEA` attaches an evidence code to the membership
        let (go_id, evidence) = match spec.trim().split_once('=') {
            Some((id, ev)) => (id.trim(), Some(ev.trim().to_string())),
            None => (spec.trim(), None),
        };
        match vocabulary.get(go_id) {
            Some(term) => {
                let mut term = term.clone();
                term.evidence = evidence;
                terms.push(term);
            }
            None => {
                stats.unknown_terms += 1;
                warn!("Group {} references unknown term {}", group_id, go_id);
            }
        }
    }

    Some(GroupEntry {
        group_id: group_id.to_string(),
        description: description.to_string(),
        terms,
    })
}

/// Read an uninformative-pattern file: one pattern per line, `#` comments.
pub fn load_patterns<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let mut patterns = Vec::new();
    for line in open_lines(path.as_ref())? {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        patterns.push(line.to_lowercase());
    }
    Ok(patterns)
}
