//! opcat - operator catalog browser
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use opcat::cli::{Cli, Commands};
use opcat::config::{Config, ConfigManager};
use opcat::error::{CatalogError, CatalogResult};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(CatalogError::Interrupted) => {
            eprintln!("{}", style("Interrupted").yellow());
            ExitCode::from(130)
        }
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> CatalogResult<()> {
    let cli = Cli::parse();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let config = config_manager.load().await?;

    init_logging(cli.verbose, &config);
    debug!("Loaded configuration from {}", config_manager.path().display());

    let command = dispatch(cli.command, &config, &config_manager);

    // Dropping the command future kills any port-forward it started and
    // discards partially written cache generations
    let outcome = tokio::select! {
        result = command => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };
    outcome.unwrap_or(Err(CatalogError::Interrupted))
}

async fn dispatch(
    command: Commands,
    config: &Config,
    manager: &ConfigManager,
) -> CatalogResult<()> {
    match command {
        Commands::Packages(args) => opcat::cli::commands::packages(args, config).await,
        Commands::Bundles(args) => opcat::cli::commands::bundles(args, config).await,
        Commands::Cache(args) => opcat::cli::commands::cache(args, config).await,
        Commands::Config(args) => opcat::cli::commands::config(args, config, manager).await,
    }
}

/// 0 = warn, 1 = info, 2+ = debug; RUST_LOG overrides
fn init_logging(verbose: u8, config: &Config) {
    let level = match verbose {
        0 => "opcat=warn",
        1 => "opcat=info",
        _ => "opcat=debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if config.general.log_format == "json" {
        builder.json().init();
    } else {
        builder.without_time().init();
    }
}
