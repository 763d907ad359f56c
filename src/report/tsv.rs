use crate::bio::go::GoCategory;
use crate::consolidate::ConsolidatedAnnotation;
use anyhow::Result;
use std::fmt::Write;

/// Column layout of the tab-separated report. One row per input query,
/// in input order; unannotated queries print `none` in the subject
/// column and leave the alignment columns empty.
pub const TSV_COLUMNS: &[&str] = &[
    "query",
    "subject",
    "pct_identity",
    "align_len",
    "mismatches",
    "gap_openings",
    "query_start",
    "query_end",
    "subject_start",
    "subject_end",
    "evalue",
    "coverage",
    "title",
    "species",
    "lineage",
    "database",
    "informative",
    "contaminant",
    "ortholog_group",
    "seed_ortholog",
    "seed_evalue",
    "seed_score",
    "predicted_gene",
    "tax_scope",
    "kegg",
    "go_biological",
    "go_cellular",
    "go_molecular",
    "description",
];

pub fn generate_tsv_report(
    annotations: &[ConsolidatedAnnotation],
    go_level: u8,
) -> Result<String> {
    let mut output = String::new();
    writeln!(&mut output, "{}", TSV_COLUMNS.join("\t"))?;
    for annotation in annotations {
        writeln!(&mut output, "{}", render_row(annotation, go_level).join("\t"))?;
    }
    Ok(output)
}

fn render_row(annotation: &ConsolidatedAnnotation, go_level: u8) -> Vec<String> {
    let mut fields = Vec::with_capacity(TSV_COLUMNS.len());
    fields.push(clean(&annotation.query_id));

    match &annotation.best_hit {
        Some(best) => {
            let hit = &best.hit;
            fields.push(clean(&hit.accession));
            fields.push(format!("{}", hit.pident));
            fields.push(hit.length.to_string());
            fields.push(hit.mismatch.to_string());
            fields.push(hit.gapopen.to_string());
            fields.push(hit.qstart.to_string());
            fields.push(hit.qend.to_string());
            fields.push(hit.sstart.to_string());
            fields.push(hit.send.to_string());
            fields.push(format!("{:e}", hit.evalue));
            fields.push(
                hit.coverage
                    .map(|c| format!("{}", c))
                    .unwrap_or_default(),
            );
            fields.push(hit.title.as_deref().map(clean).unwrap_or_default());
            fields.push(hit.species.as_deref().map(clean).unwrap_or_default());
            fields.push(
                best.taxonomy
                    .as_ref()
                    .map(|t| clean(&t.lineage_display()))
                    .unwrap_or_default(),
            );
            fields.push(clean(&hit.database));
            fields.push(if best.informative { "yes" } else { "no" }.to_string());
            fields.push(best.contaminant.clone().unwrap_or_default());
        }
        None => {
            fields.push("none".to_string());
            // subject through contaminant stay empty
            for _ in 2..18 {
                fields.push(String::new());
            }
        }
    }

    match &annotation.ortholog {
        Some(assignment) => {
            fields.push(clean(&assignment.group_id));
            fields.push(clean(&assignment.seed_ortholog));
            fields.push(
                assignment
                    .seed_evalue
                    .map(|e| format!("{:e}", e))
                    .unwrap_or_default(),
            );
            fields.push(
                assignment
                    .seed_score
                    .map(|s| format!("{}", s))
                    .unwrap_or_default(),
            );
            fields.push(assignment.predicted_gene.as_deref().map(clean).unwrap_or_default());
            fields.push(assignment.tax_scope.as_deref().map(clean).unwrap_or_default());
            fields.push(clean(&assignment.kegg_terms.join(",")));
        }
        None => {
            for _ in 0..7 {
                fields.push(String::new());
            }
        }
    }

    fields.push(go_column(annotation, GoCategory::BiologicalProcess, go_level));
    fields.push(go_column(annotation, GoCategory::CellularComponent, go_level));
    fields.push(go_column(annotation, GoCategory::MolecularFunction, go_level));
    fields.push(annotation.description.as_deref().map(clean).unwrap_or_default());

    fields
}

fn go_column(annotation: &ConsolidatedAnnotation, category: GoCategory, go_level: u8) -> String {
    let rendered: Vec<String> = annotation
        .go_terms
        .iter()
        .filter(|term| term.category == category)
        .filter(|term| go_level == 0 || term.level == Some(go_level))
        .map(|term| term.render())
        .collect();
    rendered.join(",")
}

/// Tabs and newlines inside a field would shift every following column.
fn clean(value: &str) -> String {
    value
        .chars()
        .map(|c| if c == '\t' || c == '\n' || c == '\r' { ' ' } else { c })
        .collect()
}
