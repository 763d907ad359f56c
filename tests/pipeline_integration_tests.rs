//! End-to-end pipeline runs against a real on-disk index and scripted
//! search results: consolidation across databases, failure isolation,
//! cancellation, and scheduling-independent output.

mod common;

use common::{build_index_file, hit, query, sample_mapping, ScriptedRunner, TestEnvironment};
use lachesis::core::pipeline::{AnnotationPipeline, RunOutput};
use lachesis::index::store::AnnotationIndex;
use lachesis::ortholog::TsvOrthologMapper;
use lachesis::search::{DatabaseRef, FailureKind};
use lachesis::utils::CancelToken;
use lachesis::LachesisError;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

fn fixture_databases(env: &TestEnvironment) -> Vec<DatabaseRef> {
    vec![
        DatabaseRef::new("plants", env.path("plants.dmnd"), 0),
        DatabaseRef::new("nr", env.path("nr.dmnd"), 1),
    ]
}

#[test]
fn test_end_to_end_annotation_with_mapping() {
    let env = TestEnvironment::new();
    let index = AnnotationIndex::load(build_index_file(&env)).unwrap();
    let mapper = TsvOrthologMapper::load(sample_mapping(&env)).unwrap();

    // The uncultured hit is stronger but uninformative; the plant hit
    // must win and pull in its ortholog group.
    let runner = ScriptedRunner::new(vec![
        hit("q1", "plants", "KIN1_PINTA", 1e-60, Some("Pinus taeda")),
        hit("q1", "nr", "ENV01", 1e-90, Some("uncultured bacterium")),
    ]);
    let queries = [query("q1"), query("q2")];

    let output = AnnotationPipeline::new(&index, &runner, fixture_databases(&env))
        .with_mapper(&mapper)
        .with_concurrency(2)
        .run(&queries)
        .unwrap();

    assert_eq!(output.annotations.len(), 2);
    assert_eq!(runner.searches(), 4);

    let first = &output.annotations[0];
    assert_eq!(first.query_id, "q1");
    let best = first.best_hit.as_ref().unwrap();
    assert_eq!(best.hit.accession, "KIN1_PINTA");
    assert!(best.informative);

    let ortholog = first.ortholog.as_ref().unwrap();
    assert_eq!(ortholog.group_id, "COG0515");
    assert_eq!(ortholog.seed_evalue, Some(1e-45));
    assert_eq!(ortholog.predicted_gene.as_deref(), Some("KIN1"));
    assert_eq!(ortholog.kegg_terms, vec!["K08884", "K04688"]);
    assert_eq!(first.go_terms.len(), 3);
    assert_eq!(
        first.description.as_deref(),
        Some("Serine/threonine-protein kinase")
    );

    let second = &output.annotations[1];
    assert_eq!(second.query_id, "q2");
    assert!(!second.is_annotated());

    let summary = &output.summary;
    assert_eq!(summary.total_queries, 2);
    assert_eq!(summary.annotated, 1);
    assert_eq!(summary.unannotated, 1);
    assert_eq!(summary.contaminant_best, 0);
    assert!(summary.failures.is_empty());

    assert_eq!(summary.databases.len(), 2);
    let plants = &summary.databases[0];
    assert_eq!(plants.name, "plants");
    assert_eq!(plants.attempted, 2);
    assert_eq!(plants.succeeded, 2);
    assert_eq!(plants.failed, 0);
    assert_eq!(plants.hits_kept, 1);
    assert_eq!(summary.databases[1].hits_kept, 1);
}

#[test]
fn test_one_database_failure_keeps_other_results() {
    let env = TestEnvironment::new();
    let index = AnnotationIndex::load(build_index_file(&env)).unwrap();

    let runner = ScriptedRunner::new(vec![hit(
        "q1",
        "plants",
        "KIN1_PINTA",
        1e-60,
        Some("Pinus taeda"),
    )])
    .with_failing_database("nr");
    let queries = [query("q1"), query("q2")];

    let output = AnnotationPipeline::new(&index, &runner, fixture_databases(&env))
        .run(&queries)
        .unwrap();

    assert_eq!(
        output.annotations[0].best_hit.as_ref().unwrap().hit.accession,
        "KIN1_PINTA"
    );

    let summary = &output.summary;
    assert_eq!(summary.failures.len(), 2);
    assert!(summary
        .failures
        .iter()
        .all(|f| f.kind == FailureKind::Process && f.database == "nr"));
    // Failures come out sorted by database, then query id
    assert_eq!(summary.failures[0].query_id, "q1");
    assert_eq!(summary.failures[1].query_id, "q2");

    let nr = &summary.databases[1];
    assert_eq!(nr.failed, 2);
    assert_eq!(nr.succeeded, 0);
}

#[test]
fn test_malformed_output_lines_are_recorded_but_kept() {
    let env = TestEnvironment::new();
    let index = AnnotationIndex::load(build_index_file(&env)).unwrap();

    let runner = ScriptedRunner::new(vec![hit("q1", "nr", "HUM01", 1e-50, Some("Homo sapiens"))])
        .with_malformed_database("nr", 3);
    let queries = [query("q1")];

    let output = AnnotationPipeline::new(&index, &runner, fixture_databases(&env))
        .run(&queries)
        .unwrap();

    // The parseable record still annotates the query
    assert_eq!(
        output.annotations[0].best_hit.as_ref().unwrap().hit.accession,
        "HUM01"
    );

    let nr = &output.summary.databases[1];
    assert_eq!(nr.succeeded, 1);
    assert_eq!(nr.hits_kept, 1);
    assert_eq!(nr.malformed_lines, 3);

    assert_eq!(output.summary.failures.len(), 1);
    let failure = &output.summary.failures[0];
    assert_eq!(failure.kind, FailureKind::MalformedOutput);
    assert!(failure.detail.contains("3 output lines"));
}

#[test]
fn test_favored_taxon_steers_selection() {
    let env = TestEnvironment::new();
    let index = AnnotationIndex::load(build_index_file(&env)).unwrap();

    let hits = vec![
        hit("q1", "plants", "PIC01", 1e-40, Some("Picea glauca")),
        hit("q1", "nr", "HUM01", 1e-80, Some("Homo sapiens")),
    ];
    let queries = [query("q1")];

    let best_accession = |output: &RunOutput| {
        output.annotations[0]
            .best_hit
            .as_ref()
            .unwrap()
            .hit
            .accession
            .clone()
    };

    // Without a favored taxon the better e-value wins
    let runner = ScriptedRunner::new(hits.clone());
    let output = AnnotationPipeline::new(&index, &runner, fixture_databases(&env))
        .run(&queries)
        .unwrap();
    assert_eq!(best_accession(&output), "HUM01");

    // Favoring the pine steers consolidation to its relative
    let runner = ScriptedRunner::new(hits.clone());
    let output = AnnotationPipeline::new(&index, &runner, fixture_databases(&env))
        .with_favored_taxon("Pinus taeda")
        .run(&queries)
        .unwrap();
    assert_eq!(best_accession(&output), "PIC01");

    // Numeric selectors resolve to the same taxon
    let runner = ScriptedRunner::new(hits);
    let output = AnnotationPipeline::new(&index, &runner, fixture_databases(&env))
        .with_favored_taxon("3352")
        .run(&queries)
        .unwrap();
    assert_eq!(best_accession(&output), "PIC01");
}

#[test]
fn test_contaminant_best_hit_is_flagged_and_counted() {
    let env = TestEnvironment::new();
    let index = AnnotationIndex::load(build_index_file(&env)).unwrap();

    let runner = ScriptedRunner::new(vec![hit(
        "q1",
        "nr",
        "FLY01",
        1e-60,
        Some("Drosophila melanogaster"),
    )]);
    let queries = [query("q1")];

    let output = AnnotationPipeline::new(&index, &runner, fixture_databases(&env))
        .with_contaminants(vec!["insecta".to_string()])
        .run(&queries)
        .unwrap();

    // A lone contaminant hit still annotates, flagged as such
    let best = output.annotations[0].best_hit.as_ref().unwrap();
    assert_eq!(best.hit.accession, "FLY01");
    assert_eq!(best.contaminant.as_deref(), Some("insecta"));
    assert_eq!(output.summary.contaminant_best, 1);
    assert_eq!(output.summary.annotated, 1);
}

#[test]
fn test_unknown_favored_taxon_fails_before_any_search() {
    let env = TestEnvironment::new();
    let index = AnnotationIndex::load(build_index_file(&env)).unwrap();

    let runner = ScriptedRunner::new(Vec::new());
    let err = AnnotationPipeline::new(&index, &runner, fixture_databases(&env))
        .with_favored_taxon("atlantis")
        .run(&[query("q1")])
        .unwrap_err();

    assert!(matches!(err, LachesisError::Config(_)));
    assert_eq!(runner.searches(), 0);
}

#[test]
fn test_cancelled_token_aborts_without_partial_output() {
    let env = TestEnvironment::new();
    let index = AnnotationIndex::load(build_index_file(&env)).unwrap();

    let token = CancelToken::new();
    token.cancel();

    let runner = ScriptedRunner::new(vec![hit("q1", "nr", "HUM01", 1e-50, Some("Homo sapiens"))]);
    let err = AnnotationPipeline::new(&index, &runner, fixture_databases(&env))
        .with_cancel_token(token)
        .run(&[query("q1")])
        .unwrap_err();

    assert!(matches!(err, LachesisError::Cancelled));
}

#[test]
fn test_duplicate_query_ids_are_rejected_upfront() {
    let env = TestEnvironment::new();
    let index = AnnotationIndex::load(build_index_file(&env)).unwrap();

    let runner = ScriptedRunner::new(Vec::new());
    let err = AnnotationPipeline::new(&index, &runner, fixture_databases(&env))
        .run(&[query("q1"), query("q1")])
        .unwrap_err();

    assert!(matches!(err, LachesisError::Parse(_)));
    assert_eq!(runner.searches(), 0);
}

#[test]
fn test_results_are_stable_across_hit_arrival_orders() {
    let env = TestEnvironment::new();
    let index = AnnotationIndex::load(build_index_file(&env)).unwrap();
    let mapper = TsvOrthologMapper::load(sample_mapping(&env)).unwrap();

    let mut hits = vec![
        hit("q1", "plants", "KIN1_PINTA", 1e-60, Some("Pinus taeda")),
        hit("q1", "nr", "HUM01", 1e-40, Some("Homo sapiens")),
        hit("q2", "plants", "PIC01", 1e-30, Some("Picea glauca")),
        hit("q2", "nr", "FLY01", 1e-35, Some("Drosophila melanogaster")),
        hit("q3", "nr", "ENV01", 1e-200, Some("uncultured bacterium")),
        hit("q3", "plants", "HUM02", 1e-10, Some("Homo sapiens")),
    ];
    let queries = [query("q1"), query("q2"), query("q3")];

    let fingerprint = |output: &RunOutput| -> Vec<(String, Option<String>)> {
        output
            .annotations
            .iter()
            .map(|a| {
                (
                    a.query_id.clone(),
                    a.best_hit.as_ref().map(|b| b.hit.accession.clone()),
                )
            })
            .collect()
    };

    let runner = ScriptedRunner::new(hits.clone());
    let baseline = fingerprint(
        &AnnotationPipeline::new(&index, &runner, fixture_databases(&env))
            .with_mapper(&mapper)
            .run(&queries)
            .unwrap(),
    );
    assert_eq!(
        baseline,
        vec![
            ("q1".to_string(), Some("KIN1_PINTA".to_string())),
            ("q2".to_string(), Some("FLY01".to_string())),
            ("q3".to_string(), Some("HUM02".to_string())),
        ]
    );

    let mut rng = StdRng::seed_from_u64(0xC0FFEE);
    for _ in 0..4 {
        hits.shuffle(&mut rng);
        let runner = ScriptedRunner::new(hits.clone());
        let output = AnnotationPipeline::new(&index, &runner, fixture_databases(&env))
            .with_mapper(&mapper)
            .run(&queries)
            .unwrap();
        assert_eq!(fingerprint(&output), baseline);
    }
}
