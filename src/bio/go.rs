use serde::{Deserialize, Serialize};
use std::fmt;

/// The three GO namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoCategory {
    BiologicalProcess,
    MolecularFunction,
    CellularComponent,
}

impl GoCategory {
    /// Parse the namespace from the spellings seen in term dumps.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace(' ', "_").as_str() {
            "biological_process" | "bp" => Some(Self::BiologicalProcess),
            "molecular_function" | "mf" => Some(Self::MolecularFunction),
            "cellular_component" | "cc" => Some(Self::CellularComponent),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::BiologicalProcess => "biological_process",
            Self::MolecularFunction => "molecular_function",
            Self::CellularComponent => "cellular_component",
        }
    }
}

impl fmt::Display for GoCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A single GO term attached to an ortholog group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoTerm {
    /// Term accession, e.g. `GO:0016301`.
    pub id: String,
    pub name: String,
    pub category: GoCategory,
    /// Depth in the ontology graph, when the source table provides it.
    pub level: Option<u8>,
    /// Evidence code, e.g. `IEA`, when the mapping carries one.
    pub evidence: Option<String>,
}

impl GoTerm {
    /// Report rendering: `GO:0016301-kinase activity(L=4)`.
    pub fn render(&self) -> String {
        match self.level {
            Some(level) => format!("{}-{}(L={})", self.id, self.name, level),
            None => format!("{}-{}", self.id, self.name),
        }
    }
}

/// An ortholog group as stored in the annotation index: a functional
/// description plus the GO terms assigned to group members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct GroupEntry {
    pub group_id: String,
    pub description: String,
    pub terms: Vec<GoTerm>,
}

impl GroupEntry {
    /// Terms belonging to one namespace, in stored order.
    pub fn terms_in(&self, category: GoCategory) -> impl Iterator<Item = &GoTerm> {
        self.terms.iter().filter(move |t| t.category == category)
    }
}
