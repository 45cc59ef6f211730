//! Bundles command - show bundles with channel membership and deprecations

use crate::catalog::Bundle;
use crate::cli::args::{BundlesArgs, OutputFormat};
use crate::client;
use crate::config::{Config, ConfigManager};
use crate::error::CatalogResult;
use crate::ui::{self, UiContext};
use console::style;
use serde::Serialize;

/// Flattened view of a bundle for output
#[derive(Debug, Serialize)]
struct BundleRow<'a> {
    catalog: &'a str,
    package: &'a str,
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    channels: Vec<&'a str>,
    deprecated: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    deprecation_messages: Vec<&'a str>,
}

impl<'a> From<&'a Bundle> for BundleRow<'a> {
    fn from(bundle: &'a Bundle) -> Self {
        Self {
            catalog: &bundle.catalog,
            package: &bundle.package,
            name: &bundle.name,
            version: bundle.version().map(|v| v.to_string()),
            channels: bundle.channel_names(),
            deprecated: bundle.is_deprecated(),
            deprecation_messages: bundle
                .deprecations
                .iter()
                .map(|d| d.message.as_str())
                .collect(),
        }
    }
}

/// Execute the bundles command
pub async fn execute(args: BundlesArgs, config: &Config) -> CatalogResult<()> {
    let cache_dir = ConfigManager::resolve_cache_dir(args.cache_dir, config);
    let client = client::connect(config, &cache_dir).await?;
    let bundles = client.bundles(&args.catalog).await?;

    let rows: Vec<BundleRow<'_>> = bundles
        .iter()
        .filter(|b| {
            args.package
                .as_deref()
                .is_none_or(|package| b.package == package)
        })
        .map(BundleRow::from)
        .collect();

    if rows.is_empty() {
        match args.format {
            OutputFormat::Json => println!("[]"),
            OutputFormat::Plain => {}
            OutputFormat::Table => ui::step_info(&UiContext::detect(), "No bundles found"),
        }
        return Ok(());
    }

    match args.format {
        OutputFormat::Table => print_table(&rows),
        OutputFormat::Json => print_json(&rows)?,
        OutputFormat::Plain => print_plain(&rows),
    }

    Ok(())
}

fn print_table(rows: &[BundleRow<'_>]) {
    println!(
        "{:<24} {:<32} {:<40} {:<12} {:<24}",
        style("CATALOG").bold(),
        style("PACKAGE").bold(),
        style("BUNDLE").bold(),
        style("VERSION").bold(),
        style("CHANNELS").bold()
    );
    println!("{}", "-".repeat(136));

    for row in rows {
        let name = if row.deprecated {
            style(row.name.to_string()).yellow()
        } else {
            style(row.name.to_string())
        };
        println!(
            "{:<24} {:<32} {:<40} {:<12} {:<24}",
            row.catalog,
            row.package,
            name,
            row.version.as_deref().unwrap_or("-"),
            row.channels.join(",")
        );
    }

    println!();
    let deprecated = rows.iter().filter(|r| r.deprecated).count();
    if deprecated > 0 {
        println!("{} bundle(s), {} deprecated", rows.len(), deprecated);
    } else {
        println!("{} bundle(s)", rows.len());
    }
}

fn print_json(rows: &[BundleRow<'_>]) -> CatalogResult<()> {
    let json = serde_json::to_string_pretty(rows)?;
    println!("{}", json);
    Ok(())
}

fn print_plain(rows: &[BundleRow<'_>]) {
    for row in rows {
        println!("{}/{}/{}", row.catalog, row.package, row.name);
    }
}
