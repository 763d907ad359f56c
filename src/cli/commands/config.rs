use clap::{Args, Subcommand};
use colored::*;
use std::path::PathBuf;

use crate::core::config::{default_config, load_config, save_config};
use crate::core::paths;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Write a default configuration file to edit
    Init(InitArgs),

    /// Print a configuration file as parsed
    Show(ShowArgs),
}

#[derive(Args)]
pub struct InitArgs {
    /// Where to write the file (default: ${LACHESIS_HOME}/config.toml)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct ShowArgs {
    /// Configuration file to print (default: ${LACHESIS_HOME}/config.toml)
    pub config: Option<PathBuf>,
}

pub fn run(args: ConfigArgs) -> anyhow::Result<()> {
    match args.command {
        ConfigCommands::Init(args) => run_init(args),
        ConfigCommands::Show(args) => run_show(args),
    }
}

fn run_init(args: InitArgs) -> anyhow::Result<()> {
    let path = args.output.unwrap_or_else(paths::default_config_path);
    if path.exists() && !args.force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    save_config(&path, &default_config())?;
    println!(
        "{} wrote default configuration to {}",
        "Done:".green().bold(),
        path.display()
    );
    println!("Add your databases under [[databases]] before running annotate.");
    Ok(())
}

fn run_show(args: ShowArgs) -> anyhow::Result<()> {
    let path = args.config.unwrap_or_else(paths::default_config_path);
    let config = load_config(&path)?;
    print!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}
