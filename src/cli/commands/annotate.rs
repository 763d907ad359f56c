use clap::Args;
use colored::*;
use std::path::PathBuf;
use tracing::info;

use crate::bio::fasta::parse_fasta;
use crate::core::config::{self, Config, DatabaseEntry};
use crate::core::paths;
use crate::core::pipeline::AnnotationPipeline;
use crate::index::store::AnnotationIndex;
use crate::ortholog::{EmptyOrthologMapper, OrthologMapper, TsvOrthologMapper};
use crate::report::{parse_formats, ReportOptions, ReportWriter};
use crate::search::ProcessSearchRunner;

#[derive(Args, Debug)]
pub struct AnnotateArgs {
    /// Input FASTA file of query sequences (.gz supported)
    #[arg(value_name = "QUERIES")]
    pub input: PathBuf,

    /// Configuration file (default: ${LACHESIS_HOME}/config.toml when present)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Annotation index file (overrides the configured path)
    #[arg(short = 'i', long)]
    pub index: Option<PathBuf>,

    /// Database to search, as NAME=PATH (repeatable; replaces the configured list)
    #[arg(short = 'd', long = "database", value_name = "NAME=PATH")]
    pub databases: Vec<String>,

    /// Output directory for report files
    #[arg(short = 'o', long)]
    pub output_dir: Option<PathBuf>,

    /// Report format to write: tsv or json (repeatable)
    #[arg(short = 'f', long = "format", value_name = "FORMAT")]
    pub formats: Vec<String>,

    /// Favored taxon (scientific name or numeric id) for lineage weighting
    #[arg(long)]
    pub favored: Option<String>,

    /// Contaminant lineage keyword (repeatable)
    #[arg(long = "contaminant", value_name = "KEYWORD")]
    pub contaminants: Vec<String>,

    /// Maximum e-value for an admissible hit
    #[arg(long)]
    pub evalue: Option<f64>,

    /// Minimum percent identity for an admissible hit
    #[arg(long)]
    pub min_identity: Option<f64>,

    /// Minimum query coverage for an admissible hit
    #[arg(long)]
    pub min_coverage: Option<f64>,

    /// Path to the search tool binary (bare names resolve through PATH)
    #[arg(long)]
    pub tool: Option<PathBuf>,

    /// Ortholog mapping table (accession -> group)
    #[arg(long)]
    pub mapping: Option<PathBuf>,

    /// Keep only GO terms at this ontology level in the TSV report (0 = all)
    #[arg(long, default_value = "0")]
    pub go_level: u8,

    /// Also write the queries that received no annotation as FASTA
    #[arg(long)]
    pub write_unannotated: bool,

    /// Keep per-task temp files for debugging
    #[arg(long)]
    pub keep_temp: bool,

    /// Suppress the progress bar
    #[arg(short, long)]
    pub quiet: bool,

    /// Number of threads (passed from global)
    #[arg(skip)]
    pub threads: usize,
}

pub fn run(args: AnnotateArgs) -> anyhow::Result<()> {
    let mut config = load_effective_config(&args)?;
    apply_overrides(&mut config, &args)?;
    config.validate()?;

    let index_path = config
        .index
        .path
        .clone()
        .unwrap_or_else(paths::default_index_path);
    let index = AnnotationIndex::load(&index_path)?;

    let queries = parse_fasta(&args.input)?;
    if queries.is_empty() {
        anyhow::bail!("No query sequences found in {}", args.input.display());
    }
    info!(
        "Loaded {} queries from {}",
        queries.len(),
        args.input.display()
    );

    let mut runner = ProcessSearchRunner::new(&config.search.tool_path)?
        .with_filters(config.hit_filters())
        .with_extra_args(config.search.extra_args.clone());
    if args.keep_temp {
        runner = runner.keep_work_dir();
    }
    let tool_version = runner.check_version()?;
    info!("Search tool: {}", tool_version);

    let mapper: Box<dyn OrthologMapper> = match &config.ortholog.mapping {
        Some(path) => Box::new(TsvOrthologMapper::load(path)?),
        None => Box::new(EmptyOrthologMapper),
    };

    let threads = if args.threads > 0 {
        args.threads
    } else {
        config.run.concurrency
    };

    let mut pipeline = AnnotationPipeline::new(&index, &runner, config.database_refs())
        .with_mapper(mapper.as_ref())
        .with_distance_metric(config.taxonomy.distance_metric)
        .with_contaminants(config.taxonomy.contaminants.clone())
        .with_concurrency(threads)
        .with_progress(!args.quiet);
    if let Some(favored) = &config.taxonomy.favored {
        pipeline = pipeline.with_favored_taxon(favored.clone());
    }

    let output = pipeline.run(&queries)?;

    let formats = parse_formats(&config.run.formats).map_err(|e| anyhow::anyhow!(e))?;
    let options = ReportOptions {
        formats,
        go_level: args.go_level,
        write_unannotated_fasta: config.run.write_unannotated_fasta,
    };
    let writer = ReportWriter::new(&config.run.output_dir, options);
    let written = writer.write_all(&output, &queries)?;

    let summary = &output.summary;
    let pct = if summary.total_queries > 0 {
        summary.annotated as f64 / summary.total_queries as f64 * 100.0
    } else {
        0.0
    };
    println!(
        "{} {} of {} queries annotated ({:.1}%) in {:.1}s",
        "Done:".green().bold(),
        summary.annotated,
        summary.total_queries,
        pct,
        summary.elapsed_secs
    );
    if summary.contaminant_best > 0 {
        println!(
            "{} {} queries best-matched a configured contaminant lineage",
            "Note:".yellow().bold(),
            summary.contaminant_best
        );
    }
    if !summary.failures.is_empty() {
        println!(
            "{} {} database-level failures recorded (details in summary.txt)",
            "Warning:".yellow().bold(),
            summary.failures.len()
        );
    }
    for path in &written {
        println!("  {} {}", "wrote".dimmed(), path.display());
    }

    Ok(())
}

fn load_effective_config(args: &AnnotateArgs) -> anyhow::Result<Config> {
    if let Some(path) = &args.config {
        return Ok(config::load_config(path)?);
    }
    if let Ok(env_path) = std::env::var("LACHESIS_CONFIG") {
        return Ok(config::load_config(env_path)?);
    }
    let default_path = paths::default_config_path();
    if default_path.exists() {
        return Ok(config::load_config(&default_path)?);
    }
    Ok(config::default_config())
}

fn apply_overrides(config: &mut Config, args: &AnnotateArgs) -> anyhow::Result<()> {
    if !args.databases.is_empty() {
        config.databases = args
            .databases
            .iter()
            .map(|spec| parse_database_arg(spec))
            .collect::<anyhow::Result<Vec<_>>>()?;
    }
    if let Some(dir) = &args.output_dir {
        config.run.output_dir = dir.clone();
    }
    if !args.formats.is_empty() {
        config.run.formats = args.formats.clone();
    }
    if let Some(favored) = &args.favored {
        config.taxonomy.favored = Some(favored.clone());
    }
    if !args.contaminants.is_empty() {
        config.taxonomy.contaminants = args.contaminants.clone();
    }
    if let Some(evalue) = args.evalue {
        config.search.max_evalue = evalue;
    }
    if let Some(min_identity) = args.min_identity {
        config.search.min_identity = min_identity;
    }
    if let Some(min_coverage) = args.min_coverage {
        config.search.min_coverage = min_coverage;
    }
    if let Some(tool) = &args.tool {
        config.search.tool_path = tool.clone();
    }
    if let Some(mapping) = &args.mapping {
        config.ortholog.mapping = Some(mapping.clone());
    }
    if let Some(index) = &args.index {
        config.index.path = Some(index.clone());
    }
    if args.write_unannotated {
        config.run.write_unannotated_fasta = true;
    }
    Ok(())
}

fn parse_database_arg(spec: &str) -> anyhow::Result<DatabaseEntry> {
    let (name, path) = spec.split_once('=').ok_or_else(|| {
        anyhow::anyhow!("invalid database spec '{}', expected NAME=PATH", spec)
    })?;
    let name = name.trim();
    let path = path.trim();
    if name.is_empty() || path.is_empty() {
        anyhow::bail!("invalid database spec '{}', expected NAME=PATH", spec);
    }
    Ok(DatabaseEntry {
        name: name.to_string(),
        path: PathBuf::from(path),
        priority: None,
    })
}
