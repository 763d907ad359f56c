//! Shared fixtures for the integration tests: a small reference
//! taxonomy / GO / ortholog-group dataset in on-disk and in-memory form,
//! plus a scripted search runner so pipeline tests run without an
//! external aligner.
#![allow(dead_code)]

use lachesis::bio::go::{GoCategory, GoTerm, GroupEntry};
use lachesis::bio::sequence::QueryRecord;
use lachesis::bio::taxonomy::{normalize_lineage, TaxonId, TaxonomyEntry};
use lachesis::index::builder::IndexBuilder;
use lachesis::index::format::IndexPayload;
use lachesis::index::store::AnnotationIndex;
use lachesis::search::{DatabaseRef, HitRecord, SearchFailure, SearchHits, SearchRunner};
use lachesis::utils::CancelToken;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

/// Test environment backed by a unique temporary directory.
pub struct TestEnvironment {
    temp_dir: TempDir,
    pub root: PathBuf,
}

impl TestEnvironment {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let root = temp_dir.path().to_path_buf();
        TestEnvironment { temp_dir, root }
    }

    /// Get a path within the test environment
    pub fn path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    /// Write a fixture file and return its path
    pub fn write(&self, relative: &str, contents: &str) -> PathBuf {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create fixture dir");
        }
        std::fs::write(&path, contents).expect("Failed to write fixture");
        path
    }
}

/// Write the three index input tables the tests build against. The
/// taxonomy mixes informative entries, a pair sharing most of their
/// lineage (the two conifers), and one entry the default uninformative
/// patterns reject.
pub fn write_index_inputs(env: &TestEnvironment) -> (PathBuf, PathBuf, PathBuf) {
    let taxonomy = env.write(
        "taxonomy.tsv",
        "# scientific name, taxon id, lineage\n\
         Pinus taeda\t3352\tEukaryota;Viridiplantae;Streptophyta;Pinidae\n\
         Picea glauca\t3330\tEukaryota;Viridiplantae;Streptophyta;Pinidae\n\
         Homo sapiens\t9606\tEukaryota;Metazoa;Chordata;Mammalia;Primates\n\
         Drosophila melanogaster\t7227\tEukaryota;Metazoa;Arthropoda;Insecta\n\
         uncultured bacterium\t77133\tBacteria;environmental samples\n",
    );
    let go_terms = env.write(
        "go_terms.tsv",
        "GO:0016301\tkinase activity\tmolecular_function\t4\n\
         GO:0006468\tprotein phosphorylation\tbiological_process\t6\n\
         GO:0005634\tnucleus\tcellular_component\t3\n",
    );
    let groups = env.write(
        "groups.tsv",
        "COG0515\tSerine/threonine-protein kinase\tGO:0016301=IEA,GO:0006468=IEA,GO:0005634\n\
         NOG21407\tUncharacterized conserved protein\n",
    );
    (taxonomy, go_terms, groups)
}

/// Build a real index file from the fixture tables and return its path.
pub fn build_index_file(env: &TestEnvironment) -> PathBuf {
    let (taxonomy, go_terms, groups) = write_index_inputs(env);
    let output = env.path("reference.idx");
    IndexBuilder::new(&taxonomy, &go_terms, &groups)
        .build(&output)
        .expect("Failed to build test index");
    output
}

/// Write the accession-to-group mapping table used by pipeline and
/// report tests. `KIN1_PINTA` resolves to the kinase group; `-` marks
/// absent optional fields.
pub fn sample_mapping(env: &TestEnvironment) -> PathBuf {
    env.write(
        "mapping.tsv",
        "KIN1_PINTA\tCOG0515\t1e-45\t210.5\tKIN1\tViridiplantae\tK08884,K04688\n\
         YBX1_DROME\tNOG21407\t-\t-\t-\t-\t-\n",
    )
}

/// The same dataset as `write_index_inputs`, assembled in memory for
/// tests that never touch the container format.
pub fn memory_index() -> AnnotationIndex {
    let mut payload = IndexPayload::default();
    let taxa: [(&str, u32, &str, bool); 5] = [
        (
            "Pinus taeda",
            3352,
            "Eukaryota;Viridiplantae;Streptophyta;Pinidae",
            true,
        ),
        (
            "Picea glauca",
            3330,
            "Eukaryota;Viridiplantae;Streptophyta;Pinidae",
            true,
        ),
        (
            "Homo sapiens",
            9606,
            "Eukaryota;Metazoa;Chordata;Mammalia;Primates",
            true,
        ),
        (
            "Drosophila melanogaster",
            7227,
            "Eukaryota;Metazoa;Arthropoda;Insecta",
            true,
        ),
        ("uncultured bacterium", 77133, "Bacteria;environmental samples", false),
    ];
    for (name, id, lineage, informative) in taxa {
        payload.names.insert(name.to_lowercase(), TaxonId(id));
        payload.taxa.insert(
            TaxonId(id),
            TaxonomyEntry {
                taxon_id: TaxonId(id),
                name: name.to_string(),
                lineage: normalize_lineage(lineage),
                informative,
            },
        );
    }

    payload.groups.insert(
        "COG0515".to_string(),
        GroupEntry {
            group_id: "COG0515".to_string(),
            description: "Serine/threonine-protein kinase".to_string(),
            terms: vec![
                go_term("GO:0016301", "kinase activity", GoCategory::MolecularFunction, 4),
                go_term(
                    "GO:0006468",
                    "protein phosphorylation",
                    GoCategory::BiologicalProcess,
                    6,
                ),
                go_term("GO:0005634", "nucleus", GoCategory::CellularComponent, 3),
            ],
        },
    );
    payload.groups.insert(
        "NOG21407".to_string(),
        GroupEntry {
            group_id: "NOG21407".to_string(),
            description: "Uncharacterized conserved protein".to_string(),
            terms: Vec::new(),
        },
    );

    AnnotationIndex::from_payload(payload)
}

fn go_term(id: &str, name: &str, category: GoCategory, level: u8) -> GoTerm {
    GoTerm {
        id: id.to_string(),
        name: name.to_string(),
        category,
        level: Some(level),
        evidence: None,
    }
}

/// Build one canned alignment row. Tests tweak individual fields after
/// the fact; everything not worth varying gets a plausible constant.
pub fn hit(query: &str, database: &str, accession: &str, evalue: f64, species: Option<&str>) -> HitRecord {
    HitRecord {
        query_id: query.to_string(),
        database: database.to_string(),
        subject_id: accession.to_string(),
        accession: accession.to_string(),
        pident: 92.5,
        length: 180,
        mismatch: 12,
        gapopen: 1,
        qstart: 1,
        qend: 180,
        sstart: 5,
        send: 184,
        evalue,
        bitscore: 265.0,
        coverage: Some(96.0),
        title: Some(format!("{} protein", accession)),
        species: species.map(|s| s.to_string()),
        taxon_hint: None,
    }
}

pub fn query(id: &str) -> QueryRecord {
    QueryRecord::new(id.to_string(), b"MKTAYIAKQRQISFVKSHFSRQLEERLGLIEVQ".to_vec())
}

/// Deterministic stand-in for the external aligner. Serves canned hits
/// keyed on (query id, database name); whole databases can be scripted
/// to fail or to report malformed output lines.
pub struct ScriptedRunner {
    hits: Vec<HitRecord>,
    failing: HashSet<String>,
    malformed: HashMap<String, usize>,
    searches: AtomicUsize,
}

impl ScriptedRunner {
    pub fn new(hits: Vec<HitRecord>) -> Self {
        ScriptedRunner {
            hits,
            failing: HashSet::new(),
            malformed: HashMap::new(),
            searches: AtomicUsize::new(0),
        }
    }

    /// Every task against this database returns a process failure.
    pub fn with_failing_database(mut self, name: &str) -> Self {
        self.failing.insert(name.to_string());
        self
    }

    /// Tasks against this database succeed but report skipped lines.
    pub fn with_malformed_database(mut self, name: &str, lines: usize) -> Self {
        self.malformed.insert(name.to_string(), lines);
        self
    }

    /// Number of search tasks the pipeline actually dispatched.
    pub fn searches(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }
}

impl SearchRunner for ScriptedRunner {
    fn run_search(
        &self,
        query: &QueryRecord,
        database: &DatabaseRef,
        cancel: &CancelToken,
    ) -> Result<SearchHits, SearchFailure> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        if cancel.is_cancelled() {
            return Err(SearchFailure::cancelled(&query.id, &database.name));
        }
        if self.failing.contains(&database.name) {
            return Err(SearchFailure::process(
                &query.id,
                &database.name,
                "scripted failure",
            ));
        }
        let records: Vec<HitRecord> = self
            .hits
            .iter()
            .filter(|h| h.query_id == query.id && h.database == database.name)
            .cloned()
            .collect();
        Ok(SearchHits {
            records,
            malformed_lines: self.malformed.get(&database.name).copied().unwrap_or(0),
            filtered_out: 0,
        })
    }
}
