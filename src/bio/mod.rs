pub mod fasta;
pub mod go;
pub mod sequence;
pub mod taxonomy;

pub use go::{GoCategory, GoTerm, GroupEntry};
pub use sequence::{QueryRecord, SequenceType};
pub use taxonomy::{TaxonId, TaxonomyEntry};
