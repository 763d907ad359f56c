pub mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "lachesis",
    version,
    about = "Multi-database similarity search consolidation and functional annotation",
    long_about = "Lachesis searches query sequences against a set of reference databases, \
                  consolidates the hits into one best annotation per query using taxonomic \
                  weighting, and attaches ortholog-group and GO-term annotations from a \
                  prebuilt index."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Number of worker threads (0 = all available)
    #[arg(short = 'j', long, default_value = "0", global = true)]
    pub threads: usize,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Annotate query sequences against the configured databases
    Annotate(commands::annotate::AnnotateArgs),

    /// Build or inspect annotation index files
    Index(commands::index::IndexArgs),

    /// Manage the configuration file
    Config(commands::config::ConfigArgs),
}
