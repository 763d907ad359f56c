use crate::bio::go::GroupEntry;
use crate::bio::taxonomy::{TaxonId, TaxonomyEntry};
use crate::{LachesisError, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

/// Magic bytes for the annotation index container
pub const INDEX_MAGIC: &[u8] = b"LCS\x01";

/// Current container format version. Readers reject anything else.
pub const FORMAT_VERSION: u16 = 1;

/// magic + version + created_at + taxon_count + group_count + payload_len + sha256
pub const HEADER_LEN: usize = 4 + 2 + 8 + 8 + 8 + 8 + 32;

/// Fixed-size container header preceding the bincode payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexHeader {
    pub version: u16,
    /// Unix seconds at build time.
    pub created_at: i64,
    pub taxon_count: u64,
    pub group_count: u64,
    pub payload_len: u64,
    /// SHA-256 of the payload bytes.
    pub checksum: [u8; 32],
}

impl IndexHeader {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_LEN);
        buf.extend_from_slice(INDEX_MAGIC);
        // Writes into a Vec cannot fail
        buf.write_u16::<LittleEndian>(self.version).ok();
        buf.write_i64::<LittleEndian>(self.created_at).ok();
        buf.write_u64::<LittleEndian>(self.taxon_count).ok();
        buf.write_u64::<LittleEndian>(self.group_count).ok();
        buf.write_u64::<LittleEndian>(self.payload_len).ok();
        buf.extend_from_slice(&self.checksum);
        buf
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_LEN {
            return Err(LachesisError::CorruptIndex(format!(
                "file too short for header ({} bytes)",
                data.len()
            )));
        }
        if &data[..INDEX_MAGIC.len()] != INDEX_MAGIC {
            return Err(LachesisError::CorruptIndex(
                "bad magic bytes".to_string(),
            ));
        }

        let mut cursor = &data[INDEX_MAGIC.len()..];
        let version = cursor.read_u16::<LittleEndian>()?;
        if version != FORMAT_VERSION {
            return Err(LachesisError::VersionMismatch {
                found: version,
                supported: FORMAT_VERSION,
            });
        }

        let created_at = cursor.read_i64::<LittleEndian>()?;
        let taxon_count = cursor.read_u64::<LittleEndian>()?;
        let group_count = cursor.read_u64::<LittleEndian>()?;
        let payload_len = cursor.read_u64::<LittleEndian>()?;
        let mut checksum = [0u8; 32];
        cursor.read_exact(&mut checksum)?;

        Ok(Self {
            version,
            created_at,
            taxon_count,
            group_count,
            payload_len,
            checksum,
        })
    }
}

/// Everything the index stores, serialized as one bincode blob.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IndexPayload {
    pub taxa: HashMap<TaxonId, TaxonomyEntry>,
    /// Lowercased scientific name to taxon id.
    pub names: HashMap<String, TaxonId>,
    pub groups: HashMap<String, GroupEntry>,
}

/// Sniff the magic bytes without reading the whole file.
pub fn is_index_file(path: &Path) -> bool {
    if let Ok(mut file) = std::fs::File::open(path) {
        let mut magic = [0u8; 4];
        if std::io::Read::read_exact(&mut file, &mut magic).is_ok() {
            return magic == INDEX_MAGIC;
        }
    }
    false
}
