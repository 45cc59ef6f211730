//! Local cache of catalog contents
//!
//! Catalog contents are content-addressed by the resolved reference the
//! cluster reports for each catalog. A catalog is only downloaded when its
//! reference differs from the one recorded in the index; otherwise the
//! cached generation is served without touching the network.
//!
//! # Layout
//!
//! ```text
//! <root>/index.json                       catalog -> resolved reference
//! <root>/<catalog>/<package>/<schema>/<name>.json
//! <root>/.generations/<catalog>-XXXXXX/   generation storage
//! ```

mod filesystem;
pub mod generation;
mod index;

pub use filesystem::FilesystemCache;
pub use index::{CacheIndex, IndexEntry};

use crate::cluster::CatalogSource;
use crate::declcfg::CatalogTree;
use crate::error::{CatalogError, CatalogResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// File name of the cache index under the cache root
pub const INDEX_FILE: &str = "index.json";

/// Supplies the materialized contents of a catalog
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Return a read-only tree of the catalog's records, fetching them first
    /// if the cached copy is missing or stale
    async fn fetch(&self, catalog: &CatalogSource) -> CatalogResult<CatalogTree>;
}

/// One catalog as recorded in the cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedCatalog {
    pub name: String,
    pub entry: IndexEntry,
    pub path: PathBuf,
    /// Whether the generation is still on disk
    pub present: bool,
}

/// Describe the catalogs cached under `root`
pub async fn status(root: &Path) -> CatalogResult<Vec<CachedCatalog>> {
    let index = CacheIndex::load(&root.join(INDEX_FILE)).await?;
    Ok(index
        .entries()
        .map(|(name, entry)| {
            let path = generation::current_path(root, name);
            CachedCatalog {
                name: name.to_string(),
                entry: entry.clone(),
                present: path.is_dir(),
                path,
            }
        })
        .collect())
}

/// Remove every cached catalog and the index under `root`.
/// Returns how many catalogs were removed.
pub async fn clear(root: &Path) -> CatalogResult<usize> {
    let index_path = root.join(INDEX_FILE);
    // An unreadable index should not prevent clearing the cache
    let index = CacheIndex::load(&index_path).await.unwrap_or_default();
    let names: Vec<String> = index.entries().map(|(name, _)| name.to_string()).collect();

    let root_owned = root.to_path_buf();
    let removed = tokio::task::spawn_blocking(move || {
        generation::clear(&root_owned, names.iter().map(String::as_str))
    })
    .await
    .map_err(|e| CatalogError::Internal(format!("cache clear task failed: {}", e)))??;

    match tokio::fs::remove_file(&index_path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            return Err(CatalogError::io(
                format!("removing {}", index_path.display()),
                e,
            ))
        }
    }
    Ok(removed)
}
