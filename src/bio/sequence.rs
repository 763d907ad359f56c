use serde::{Deserialize, Serialize};

/// A single input query sequence. Immutable once loaded; the pipeline
/// only ever reads from it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryRecord {
    pub id: String,
    pub description: Option<String>,
    pub sequence: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SequenceType {
    Protein,
    Nucleotide,
}

impl QueryRecord {
    pub fn new(id: String, sequence: Vec<u8>) -> Self {
        Self {
            id,
            description: None,
            sequence,
        }
    }

    pub fn with_description(mut self, description: String) -> Self {
        self.description = Some(description);
        self
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Residue-alphabet heuristic. Anything containing a char outside the
    /// nucleotide alphabet (plus ambiguity codes) is called protein; the
    /// search runner uses this to pick its translated/untranslated mode.
    pub fn detect_type(&self) -> SequenceType {
        let protein_chars = b"EFILPQXZ";
        let has_protein = self
            .sequence
            .iter()
            .any(|&c| protein_chars.contains(&c.to_ascii_uppercase()));

        if has_protein {
            SequenceType::Protein
        } else {
            SequenceType::Nucleotide
        }
    }

    pub fn header(&self) -> String {
        let mut header = format!(">{}", self.id);
        if let Some(desc) = &self.description {
            header.push(' ');
            header.push_str(desc);
        }
        header
    }
}
