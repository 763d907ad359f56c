use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use lachesis::bio::go::GroupEntry;
use lachesis::bio::taxonomy::{normalize_lineage, LineageDistance, TaxonId, TaxonomyEntry};
use lachesis::consolidate::{consolidate, RankedHit, RankingContext};
use lachesis::index::format::IndexPayload;
use lachesis::index::store::AnnotationIndex;
use lachesis::search::HitRecord;
use std::hint::black_box;

const SPECIES: &[(&str, u32, &str)] = &[
    ("Pinus taeda", 3352, "Eukaryota;Viridiplantae;Streptophyta;Pinidae"),
    ("Picea glauca", 3330, "Eukaryota;Viridiplantae;Streptophyta;Pinidae"),
    ("Homo sapiens", 9606, "Eukaryota;Metazoa;Chordata;Mammalia;Primates"),
    ("Drosophila melanogaster", 7227, "Eukaryota;Metazoa;Arthropoda;Insecta"),
    ("uncultured bacterium", 77133, "Bacteria;environmental samples"),
];

fn bench_index() -> AnnotationIndex {
    let mut payload = IndexPayload::default();
    for &(name, id, lineage) in SPECIES {
        payload.names.insert(name.to_lowercase(), TaxonId(id));
        payload.taxa.insert(
            TaxonId(id),
            TaxonomyEntry {
                taxon_id: TaxonId(id),
                name: name.to_string(),
                lineage: normalize_lineage(lineage),
                informative: !name.starts_with("uncultured"),
            },
        );
    }
    payload.groups.insert(
        "COG0515".to_string(),
        GroupEntry {
            group_id: "COG0515".to_string(),
            description: "Serine/threonine-protein kinase".to_string(),
            terms: Vec::new(),
        },
    );
    AnnotationIndex::from_payload(payload)
}

/// Deterministic synthetic hits spread over the species table and four
/// databases, with e-values spanning forty orders of magnitude.
fn generate_hits(count: usize) -> Vec<HitRecord> {
    let databases = ["swissprot", "nr", "plants", "trembl"];
    (0..count)
        .map(|i| {
            let (species, _, _) = SPECIES[i % SPECIES.len()];
            HitRecord {
                query_id: "q1".to_string(),
                database: databases[i % databases.len()].to_string(),
                subject_id: format!("SUBJ_{:06}", i),
                accession: format!("SUBJ_{:06}", i),
                pident: 60.0 + (i % 40) as f64,
                length: 150 + (i % 200) as u32,
                mismatch: (i % 30) as u32,
                gapopen: (i % 4) as u32,
                qstart: 1,
                qend: 150,
                sstart: 1,
                send: 150,
                evalue: 10f64.powi(-((i % 40) as i32) - 5),
                bitscore: 100.0 + (i % 300) as f64,
                coverage: Some(50.0 + (i % 50) as f64),
                title: None,
                species: Some(species.to_string()),
                taxon_hint: None,
            }
        })
        .collect()
}

fn tagged_pool(index: &AnnotationIndex, count: usize) -> Vec<RankedHit> {
    let favored = index.resolve_taxon("3352");
    let context = RankingContext::new(
        index,
        favored,
        LineageDistance::SharedPrefix,
        vec!["insecta".to_string()],
    );
    generate_hits(count)
        .into_iter()
        .enumerate()
        .map(|(i, hit)| context.tag(hit, (i % 4) as u32))
        .collect()
}

fn bench_tagging(c: &mut Criterion) {
    let index = bench_index();
    let mut group = c.benchmark_group("consolidation/tagging");

    for count in [100, 1_000, 10_000].iter() {
        let hits = generate_hits(*count);
        let favored = index.resolve_taxon("3352");
        let context = RankingContext::new(
            &index,
            favored,
            LineageDistance::SharedPrefix,
            vec!["insecta".to_string()],
        );

        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, _| {
            b.iter_batched(
                || hits.clone(),
                |hits| {
                    for (i, hit) in hits.into_iter().enumerate() {
                        black_box(context.tag(hit, (i % 4) as u32));
                    }
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn bench_consolidation(c: &mut Criterion) {
    let index = bench_index();
    let mut group = c.benchmark_group("consolidation/best_hit");

    for count in [100, 1_000, 10_000].iter() {
        let pool = tagged_pool(&index, *count);

        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, _| {
            b.iter_batched(
                || pool.clone(),
                |pool| black_box(consolidate("q1", pool)),
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_tagging, bench_consolidation);
criterion_main!(benches);
