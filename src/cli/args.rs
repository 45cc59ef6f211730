//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// opcat - browse operator catalogs served inside a cluster
///
/// Fetches catalog contents through a port-forward to the catalog server
/// and caches them locally, keyed by each catalog's resolved reference.
#[derive(Parser, Debug)]
#[command(name = "opcat")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "OPCAT_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List packages available from the cluster's catalogs
    Packages(PackagesArgs),

    /// List bundles with their channels and deprecations
    Bundles(BundlesArgs),

    /// Inspect or clear the local catalog cache
    Cache(CacheArgs),

    /// Show or initialize configuration
    Config(ConfigArgs),
}

/// Arguments for the packages command
#[derive(Parser, Debug)]
pub struct PackagesArgs {
    /// Only use these catalogs (comma-separated, case-insensitive)
    #[arg(long, value_delimiter = ',')]
    pub catalog: Vec<String>,

    /// Cache directory (overrides config)
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,
}

/// Arguments for the bundles command
#[derive(Parser, Debug)]
pub struct BundlesArgs {
    /// Only use these catalogs (comma-separated, case-insensitive)
    #[arg(long, value_delimiter = ',')]
    pub catalog: Vec<String>,

    /// Only show bundles of this package
    #[arg(short, long)]
    pub package: Option<String>,

    /// Cache directory (overrides config)
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the cache command
#[derive(Parser, Debug)]
pub struct CacheArgs {
    /// Subcommand for cache
    #[command(subcommand)]
    pub action: CacheAction,

    /// Cache directory (overrides config)
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,
}

/// Cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// Show cached catalogs
    Status {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Remove all cached catalogs
    Clear,

    /// Print the cache directory
    Path,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

/// Output format for listing commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}
