use crate::bio::go::GroupEntry;
use crate::bio::taxonomy::{TaxonId, TaxonomyEntry};
use crate::index::format::{IndexHeader, IndexPayload, HEADER_LEN};
use crate::{LachesisError, Result};
use memmap2::Mmap;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// The loaded taxonomy / ortholog-group store. Loading happens once,
/// before any search task starts; afterwards the index is shared via
/// `Arc` and every lookup is a plain map read.
#[derive(Debug)]
pub struct AnnotationIndex {
    header: IndexHeader,
    payload: IndexPayload,
    path: PathBuf,
}

impl AnnotationIndex {
    /// Load and fully validate an index file. Any mismatch between the
    /// header and the payload is reported as corruption; an unrecognized
    /// format version is reported as such and never guessed around.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };

        let header = IndexHeader::decode(&mmap[..])?;

        let payload_bytes = &mmap[HEADER_LEN..];
        if payload_bytes.len() as u64 != header.payload_len {
            return Err(LachesisError::CorruptIndex(format!(
                "payload length {} does not match header ({})",
                payload_bytes.len(),
                header.payload_len
            )));
        }

        let digest = Sha256::digest(payload_bytes);
        if digest[..] != header.checksum {
            return Err(LachesisError::CorruptIndex(format!(
                "payload checksum mismatch (expected {}, got {})",
                hex::encode(header.checksum),
                hex::encode(digest)
            )));
        }

        let payload: IndexPayload = bincode::deserialize(payload_bytes).map_err(|e| {
            LachesisError::CorruptIndex(format!("payload decode failed: {}", e))
        })?;

        if payload.taxa.len() as u64 != header.taxon_count
            || payload.groups.len() as u64 != header.group_count
        {
            return Err(LachesisError::CorruptIndex(format!(
                "entry counts do not match header ({} taxa, {} groups)",
                payload.taxa.len(),
                payload.groups.len()
            )));
        }

        info!(
            "Loaded annotation index {} ({} taxa, {} groups)",
            path.display(),
            payload.taxa.len(),
            payload.groups.len()
        );

        Ok(Self {
            header,
            payload,
            path: path.to_path_buf(),
        })
    }

    pub fn lookup_taxonomy(&self, taxon_id: TaxonId) -> Option<&TaxonomyEntry> {
        self.payload.taxa.get(&taxon_id)
    }

    /// Name lookup is case-insensitive; keys were lowercased at build time.
    pub fn lookup_taxon_by_name(&self, name: &str) -> Option<&TaxonomyEntry> {
        let id = self.payload.names.get(&name.to_lowercase())?;
        self.payload.taxa.get(id)
    }

    pub fn lookup_go_terms(&self, group_id: &str) -> Option<&GroupEntry> {
        self.payload.groups.get(group_id)
    }

    /// Resolve a favored-lineage selector, accepting either a numeric
    /// taxon id or a scientific name.
    pub fn resolve_taxon(&self, selector: &str) -> Option<&TaxonomyEntry> {
        if let Ok(id) = selector.trim().parse::<u32>() {
            if let Some(entry) = self.lookup_taxonomy(TaxonId(id)) {
                return Some(entry);
            }
        }
        let entry = self.lookup_taxon_by_name(selector.trim());
        if entry.is_none() {
            debug!("Taxon selector '{}' not present in index", selector);
        }
        entry
    }

    pub fn taxon_count(&self) -> usize {
        self.payload.taxa.len()
    }

    pub fn group_count(&self) -> usize {
        self.payload.groups.len()
    }

    pub fn created_at(&self) -> i64 {
        self.header.created_at
    }

    pub fn version(&self) -> u16 {
        self.header.version
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Build an in-memory index directly from a payload. Test fixtures
    /// use this to avoid touching the filesystem.
    pub fn from_payload(payload: IndexPayload) -> Self {
        let header = IndexHeader {
            version: crate::index::format::FORMAT_VERSION,
            created_at: 0,
            taxon_count: payload.taxa.len() as u64,
            group_count: payload.groups.len() as u64,
            payload_len: 0,
            checksum: [0u8; 32],
        };
        Self {
            header,
            payload,
            path: PathBuf::new(),
        }
    }
}
