use crate::core::pipeline::RunSummary;
use anyhow::Result;
use std::fmt::Write;

const MAX_LISTED_FAILURES: usize = 20;

/// Plain-text run summary: totals, one line per database, and the
/// recorded database-level failures.
pub fn generate_summary_report(summary: &RunSummary) -> Result<String> {
    let mut output = String::new();

    writeln!(&mut output, "Annotation Run Summary")?;
    writeln!(&mut output, "======================")?;
    writeln!(&mut output)?;

    let pct = if summary.total_queries > 0 {
        summary.annotated as f64 / summary.total_queries as f64 * 100.0
    } else {
        0.0
    };
    writeln!(&mut output, "Queries:     {:6}", summary.total_queries)?;
    writeln!(
        &mut output,
        "Annotated:   {:6} ({:.1}%)",
        summary.annotated, pct
    )?;
    writeln!(&mut output, "Unannotated: {:6}", summary.unannotated)?;
    if summary.contaminant_best > 0 {
        writeln!(
            &mut output,
            "Contaminant best hits: {}",
            summary.contaminant_best
        )?;
    }
    writeln!(&mut output, "Elapsed: {:.1}s", summary.elapsed_secs)?;
    writeln!(&mut output)?;

    writeln!(&mut output, "Databases")?;
    writeln!(&mut output, "---------")?;
    for db in &summary.databases {
        writeln!(
            &mut output,
            "- {:<20} {:6} attempted, {:6} ok, {:4} failed, {:8} hits kept, {:6} filtered",
            db.name, db.attempted, db.succeeded, db.failed, db.hits_kept, db.hits_filtered
        )?;
        if db.malformed_lines > 0 {
            writeln!(
                &mut output,
                "  {} malformed output lines skipped",
                db.malformed_lines
            )?;
        }
    }
    writeln!(&mut output)?;

    if !summary.failures.is_empty() {
        writeln!(
            &mut output,
            "Recorded Failures (Top {})",
            MAX_LISTED_FAILURES
        )?;
        writeln!(&mut output, "-------------------------")?;
        for failure in summary.failures.iter().take(MAX_LISTED_FAILURES) {
            writeln!(&mut output, "  {}", failure)?;
        }
        if summary.failures.len() > MAX_LISTED_FAILURES {
            writeln!(
                &mut output,
                "  ... and {} more",
                summary.failures.len() - MAX_LISTED_FAILURES
            )?;
        }
        writeln!(&mut output)?;
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pipeline::DatabaseSummary;
    use crate::search::SearchFailure;

    fn sample_summary() -> RunSummary {
        RunSummary {
            total_queries: 100,
            annotated: 80,
            unannotated: 20,
            contaminant_best: 2,
            databases: vec![
                DatabaseSummary {
                    name: "swissprot".to_string(),
                    attempted: 100,
                    succeeded: 98,
                    failed: 2,
                    hits_kept: 450,
                    hits_filtered: 120,
                    malformed_lines: 3,
                },
                DatabaseSummary {
                    name: "refseq".to_string(),
                    attempted: 100,
                    succeeded: 100,
                    failed: 0,
                    hits_kept: 700,
                    hits_filtered: 90,
                    malformed_lines: 0,
                },
            ],
            failures: vec![SearchFailure::process("q17", "swissprot", "exit status 1")],
            elapsed_secs: 42.5,
        }
    }

    #[test]
    fn test_summary_lists_every_database() {
        let text = generate_summary_report(&sample_summary()).unwrap();
        assert!(text.contains("Annotation Run Summary"));
        assert!(text.contains("swissprot"));
        assert!(text.contains("refseq"));
        assert!(text.contains("80 (80.0%)"));
        assert!(text.contains("3 malformed output lines skipped"));
        assert!(text.contains("q17 vs swissprot"));
    }

    #[test]
    fn test_empty_run_does_not_divide_by_zero() {
        let summary = RunSummary::default();
        let text = generate_summary_report(&summary).unwrap();
        assert!(text.contains("(0.0%)"));
    }

    #[test]
    fn test_failure_list_truncates() {
        let mut summary = sample_summary();
        summary.failures = (0..30)
            .map(|i| SearchFailure::process(&format!("q{}", i), "swissprot", "boom"))
            .collect();
        let text = generate_summary_report(&summary).unwrap();
        assert!(text.contains("... and 10 more"));
    }
}
