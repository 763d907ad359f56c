use clap::Parser;
use colored::*;
use lachesis::cli::{Cli, Commands};
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    // Initialize logging with LACHESIS_LOG environment variable support
    let log_level = std::env::var("LACHESIS_LOG").unwrap_or_else(|_| "info".to_string());

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level)),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("{} {}", "Error:".red().bold(), e);

        // Use appropriate exit codes based on error type
        let exit_code = match e.downcast_ref::<lachesis::LachesisError>() {
            Some(lachesis::LachesisError::Config(_)) => 2,
            Some(lachesis::LachesisError::Io(_)) => 3,
            Some(lachesis::LachesisError::Parse(_))
            | Some(lachesis::LachesisError::MalformedOutput(_)) => 4,
            Some(lachesis::LachesisError::CorruptIndex(_))
            | Some(lachesis::LachesisError::VersionMismatch { .. }) => 5,
            Some(lachesis::LachesisError::SearchProcess(_)) => 6,
            Some(lachesis::LachesisError::Cancelled) => 130,
            _ => 1,
        };
        process::exit(exit_code);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    if cli.verbose > 0 {
        let threads = if cli.threads == 0 {
            num_cpus::get()
        } else {
            cli.threads
        };
        eprintln!("Using {} threads", threads);
    }

    match cli.command {
        Commands::Annotate(mut args) => {
            args.threads = cli.threads;
            lachesis::cli::commands::annotate::run(args)
        }
        Commands::Index(args) => lachesis::cli::commands::index::run(args),
        Commands::Config(args) => lachesis::cli::commands::config::run(args),
    }
}
