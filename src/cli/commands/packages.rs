//! Packages command - list package names across catalogs

use crate::cli::args::PackagesArgs;
use crate::client;
use crate::config::{Config, ConfigManager};
use crate::error::CatalogResult;
use tracing::debug;

/// Execute the packages command
pub async fn execute(args: PackagesArgs, config: &Config) -> CatalogResult<()> {
    let cache_dir = ConfigManager::resolve_cache_dir(args.cache_dir, config);
    debug!("Using cache directory {}", cache_dir.display());

    let names = client::list_packages(config, &args.catalog, &cache_dir).await?;
    for name in unique_sorted(names) {
        println!("{}", name);
    }
    Ok(())
}

/// The same package may be published by several catalogs
fn unique_sorted(mut names: Vec<String>) -> Vec<String> {
    names.sort();
    names.dedup();
    names
}
