//! Cache command - inspect or clear the local catalog cache

use crate::cache;
use crate::cli::args::{CacheAction, CacheArgs, OutputFormat};
use crate::config::{Config, ConfigManager};
use crate::error::CatalogResult;
use crate::ui::{self, UiContext};
use console::style;
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CacheRow {
    catalog: String,
    resolved_ref: String,
    cached_at: Option<String>,
    present: bool,
}

/// Execute the cache command
pub async fn execute(args: CacheArgs, config: &Config) -> CatalogResult<()> {
    let root = ConfigManager::resolve_cache_dir(args.cache_dir, config);

    match args.action {
        CacheAction::Status { format } => show_status(&root, format).await,
        CacheAction::Clear => clear(&root).await,
        CacheAction::Path => {
            println!("{}", root.display());
            Ok(())
        }
    }
}

async fn show_status(root: &Path, format: OutputFormat) -> CatalogResult<()> {
    let rows: Vec<CacheRow> = cache::status(root)
        .await?
        .into_iter()
        .map(|c| CacheRow {
            catalog: c.name,
            resolved_ref: c.entry.resolved_ref,
            cached_at: c
                .entry
                .cached_at
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string()),
            present: c.present,
        })
        .collect();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
        OutputFormat::Plain => {
            for row in &rows {
                println!("{} {}", row.catalog, row.resolved_ref);
            }
        }
        OutputFormat::Table => {
            let ctx = UiContext::detect();
            ui::intro(&ctx, "Catalog cache");
            ui::key_value(&ctx, "Location", &root.display().to_string());
            println!();

            if rows.is_empty() {
                ui::step_info(&ctx, "No catalogs cached");
                return Ok(());
            }

            println!(
                "{:<24} {:<17} {:<8} {}",
                style("CATALOG").bold(),
                style("CACHED").bold(),
                style("STATE").bold(),
                style("REFERENCE").bold()
            );
            for row in &rows {
                let state = if row.present {
                    style("ok").green()
                } else {
                    style("missing").yellow()
                };
                println!(
                    "{:<24} {:<17} {:<8} {}",
                    row.catalog,
                    row.cached_at.as_deref().unwrap_or("-"),
                    state,
                    row.resolved_ref
                );
            }
        }
    }

    Ok(())
}

async fn clear(root: &Path) -> CatalogResult<()> {
    let ctx = UiContext::detect();

    if !root.exists() {
        ui::step_info(&ctx, "Cache is empty");
        return Ok(());
    }

    let removed = cache::clear(root).await?;
    ui::step_ok_detail(
        &ctx,
        &format!("Removed {} cached catalog(s)", removed),
        &root.display().to_string(),
    );
    Ok(())
}
