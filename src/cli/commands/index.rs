use clap::{Args, Subcommand};
use colored::*;
use std::path::PathBuf;

use crate::core::paths;
use crate::index::builder::{load_patterns, IndexBuilder};
use crate::index::store::AnnotationIndex;

#[derive(Args)]
pub struct IndexArgs {
    #[command(subcommand)]
    pub command: IndexCommands,
}

#[derive(Subcommand)]
pub enum IndexCommands {
    /// Build an annotation index from taxonomy, GO term and group tables
    Build(BuildArgs),

    /// Show the contents of an annotation index file
    Inspect(InspectArgs),
}

#[derive(Args)]
pub struct BuildArgs {
    /// Taxonomy table: scientific_name <tab> taxon_id <tab> lineage;semi;separated
    #[arg(long, value_name = "FILE")]
    pub taxonomy: PathBuf,

    /// GO term table: id <tab> name <tab> category [<tab> level]
    #[arg(long = "go-terms", value_name = "FILE")]
    pub go_terms: PathBuf,

    /// Group table: group_id <tab> description <tab> GO:id[=EVIDENCE],...
    #[arg(long, value_name = "FILE")]
    pub groups: PathBuf,

    /// Output index file (default: ${LACHESIS_HOME}/indexes/annotation.idx)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// File of extra uninformative-name patterns, one per line
    #[arg(long, value_name = "FILE")]
    pub uninformative: Option<PathBuf>,
}

#[derive(Args)]
pub struct InspectArgs {
    /// Index file to inspect
    pub index: PathBuf,
}

pub fn run(args: IndexArgs) -> anyhow::Result<()> {
    match args.command {
        IndexCommands::Build(args) => run_build(args),
        IndexCommands::Inspect(args) => run_inspect(args),
    }
}

fn run_build(args: BuildArgs) -> anyhow::Result<()> {
    let output = args
        .output
        .clone()
        .unwrap_or_else(paths::default_index_path);
    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut builder = IndexBuilder::new(&args.taxonomy, &args.go_terms, &args.groups);
    if let Some(patterns_path) = &args.uninformative {
        builder = builder.with_uninformative_patterns(load_patterns(patterns_path)?);
    }

    let stats = builder.build(&output)?;

    println!(
        "{} index written to {}",
        "Done:".green().bold(),
        output.display()
    );
    println!("  {} taxa", stats.taxa);
    println!("  {} ortholog groups ({} GO terms)", stats.groups, stats.terms);
    if stats.skipped_lines > 0 {
        println!(
            "{} {} malformed input lines skipped",
            "Warning:".yellow().bold(),
            stats.skipped_lines
        );
    }
    if stats.unknown_terms > 0 {
        println!(
            "{} {} group term references had no entry in the GO table",
            "Warning:".yellow().bold(),
            stats.unknown_terms
        );
    }

    Ok(())
}

fn run_inspect(args: InspectArgs) -> anyhow::Result<()> {
    use chrono::{TimeZone, Utc};
    use comfy_table::modifiers::UTF8_ROUND_CORNERS;
    use comfy_table::presets::UTF8_FULL;
    use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};
    use humansize::{format_size, BINARY};

    let index = AnnotationIndex::load(&args.index)?;
    let file_size = std::fs::metadata(&args.index).map(|m| m.len()).unwrap_or(0);
    let created = Utc
        .timestamp_opt(index.created_at(), 0)
        .single()
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("Field").add_attribute(Attribute::Bold).fg(Color::Green),
        Cell::new("Value").add_attribute(Attribute::Bold).fg(Color::Green),
    ]);
    table.add_row(vec![Cell::new("Path"), Cell::new(args.index.display())]);
    table.add_row(vec![
        Cell::new("Format version"),
        Cell::new(index.version()),
    ]);
    table.add_row(vec![Cell::new("Created"), Cell::new(created)]);
    table.add_row(vec![
        Cell::new("File size"),
        Cell::new(format_size(file_size, BINARY)),
    ]);
    table.add_row(vec![Cell::new("Taxa"), Cell::new(index.taxon_count())]);
    table.add_row(vec![
        Cell::new("Ortholog groups"),
        Cell::new(index.group_count()),
    ]);

    println!("{table}");
    Ok(())
}
