//! Atomic publication of catalog generations
//!
//! A generation is written into a staging directory under
//! `<root>/.generations/` and becomes current in one step. On unix
//! `<root>/<catalog>` is a symlink to the current generation and is replaced
//! with `rename(2)`, so readers see either the old tree or the new one.
//! Elsewhere the old directory is removed and the new one renamed into place.

use crate::error::{CatalogError, CatalogResult};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

/// Directory under the cache root holding every generation
pub const GENERATIONS_DIR: &str = ".generations";

/// Reject catalog names that cannot be used as a single path component
pub fn validate_catalog_name(catalog: &str) -> CatalogResult<()> {
    let valid = !catalog.is_empty()
        && !catalog.starts_with('.')
        && !catalog.contains(['/', '\\', '\0']);
    if valid {
        Ok(())
    } else {
        Err(CatalogError::InvalidCatalog {
            catalog: catalog.to_string(),
            reason: "name cannot be used as a cache directory".to_string(),
        })
    }
}

/// Where the current generation of `catalog` is visible
pub fn current_path(root: &Path, catalog: &str) -> PathBuf {
    root.join(catalog)
}

/// A generation being written. Removed on drop unless published.
#[derive(Debug)]
pub struct Staging {
    dir: TempDir,
}

impl Staging {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

/// Create an empty staging directory for a new generation of `catalog`
pub fn stage(root: &Path, catalog: &str) -> CatalogResult<Staging> {
    let generations = root.join(GENERATIONS_DIR);
    fs::create_dir_all(&generations).map_err(|e| {
        CatalogError::io(
            format!("creating generations directory {}", generations.display()),
            e,
        )
    })?;

    let dir = tempfile::Builder::new()
        .prefix(&format!("{}-", catalog))
        .tempdir_in(&generations)
        .map_err(|e| {
            CatalogError::io(
                "error creating temporary directory to unpack catalog metadata",
                e,
            )
        })?;
    debug!("Staging {} in {}", catalog, dir.path().display());
    Ok(Staging { dir })
}

/// Make a staged generation current and discard the previous one
pub fn publish(root: &Path, catalog: &str, staging: Staging) -> CatalogResult<PathBuf> {
    let generation = staging.dir.keep();
    let live = current_path(root, catalog);

    match swap(root, catalog, &generation, &live) {
        Ok(previous) => {
            if let Some(previous) = previous {
                if let Err(e) = fs::remove_dir_all(&previous) {
                    warn!(
                        "Failed to remove previous generation {}: {}",
                        previous.display(),
                        e
                    );
                }
            }
            debug!("Published {} -> {}", live.display(), generation.display());
            Ok(live)
        }
        Err(e) => {
            let _ = fs::remove_dir_all(&generation);
            Err(e)
        }
    }
}

/// Prefix of a plain directory moved aside while being replaced
const LEGACY_PREFIX: &str = ".legacy.";

fn legacy_path(root: &Path, catalog: &str) -> PathBuf {
    root.join(GENERATIONS_DIR).join(format!(
        "{}{}.{}",
        LEGACY_PREFIX,
        catalog,
        uuid::Uuid::new_v4().simple()
    ))
}

/// Whether `file_name` is a moved-aside directory of `catalog`
fn is_legacy_of(file_name: &str, catalog: &str) -> bool {
    file_name
        .strip_prefix(LEGACY_PREFIX)
        .and_then(|rest| rest.strip_prefix(catalog))
        .and_then(|rest| rest.strip_prefix('.'))
        .is_some_and(|id| id.len() == 32 && id.bytes().all(|b| b.is_ascii_hexdigit()))
}

/// Put back a directory that was moved aside by a swap that never finished.
///
/// Returns whether anything was restored. A no-op when `catalog` already
/// has a current generation.
pub fn recover(root: &Path, catalog: &str) -> CatalogResult<bool> {
    let live = current_path(root, catalog);
    match fs::symlink_metadata(&live) {
        Ok(_) => return Ok(false),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            return Err(CatalogError::io(
                format!("inspecting {}", live.display()),
                e,
            ))
        }
    }

    let generations = root.join(GENERATIONS_DIR);
    let entries = match fs::read_dir(&generations) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => {
            return Err(CatalogError::io(
                format!("reading {}", generations.display()),
                e,
            ))
        }
    };

    for entry in entries.flatten() {
        let name = entry.file_name();
        if !name.to_str().is_some_and(|n| is_legacy_of(n, catalog)) {
            continue;
        }
        fs::rename(entry.path(), &live).map_err(|e| {
            CatalogError::io(format!("restoring {}", live.display()), e)
        })?;
        warn!("Restored {} after an interrupted update", live.display());
        return Ok(true);
    }
    Ok(false)
}

/// Point `live` at `generation`, returning the generation it replaced
#[cfg(unix)]
fn swap(
    root: &Path,
    catalog: &str,
    generation: &Path,
    live: &Path,
) -> CatalogResult<Option<PathBuf>> {
    let previous = match fs::symlink_metadata(live) {
        Ok(meta) if meta.file_type().is_symlink() => {
            let target = fs::read_link(live)
                .map_err(|e| CatalogError::io(format!("reading link {}", live.display()), e))?;
            Some(root.join(target))
        }
        Ok(meta) if meta.is_dir() => {
            // Plain directory left by an older cache layout. rename(2) cannot
            // put a symlink over a directory, so it is moved aside first;
            // `recover` restores it if the swap never completes.
            let aside = legacy_path(root, catalog);
            fs::rename(live, &aside).map_err(|e| {
                CatalogError::io(format!("moving aside {}", live.display()), e)
            })?;
            Some(aside)
        }
        Ok(_) => {
            fs::remove_file(live)
                .map_err(|e| CatalogError::io(format!("removing {}", live.display()), e))?;
            None
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => {
            return Err(CatalogError::io(
                format!("inspecting {}", live.display()),
                e,
            ))
        }
    };

    // Relative target keeps the cache root relocatable
    let target = generation
        .strip_prefix(root)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| generation.to_path_buf());
    let link = root.join(format!(".{}.{}.link", catalog, uuid::Uuid::new_v4().simple()));

    std::os::unix::fs::symlink(&target, &link)
        .map_err(|e| CatalogError::io(format!("creating link {}", link.display()), e))?;
    if let Err(e) = fs::rename(&link, live) {
        let _ = fs::remove_file(&link);
        return Err(CatalogError::io(
            "error moving temporary directory to cache directory",
            e,
        ));
    }

    Ok(previous.filter(|p| p != generation))
}

#[cfg(not(unix))]
fn swap(
    _root: &Path,
    _catalog: &str,
    generation: &Path,
    live: &Path,
) -> CatalogResult<Option<PathBuf>> {
    if live.exists() {
        fs::remove_dir_all(live)
            .map_err(|e| CatalogError::io("error removing old cache directory", e))?;
    }
    fs::rename(generation, live)
        .map_err(|e| CatalogError::io("error moving temporary directory to cache directory", e))?;
    Ok(None)
}

/// Remove the published view and every generation of the given catalogs,
/// plus any staging leftovers. Returns how many catalogs were removed.
pub fn clear<'a>(root: &Path, catalogs: impl IntoIterator<Item = &'a str>) -> CatalogResult<usize> {
    let mut removed = 0;
    for catalog in catalogs {
        if validate_catalog_name(catalog).is_err() {
            continue;
        }
        let live = current_path(root, catalog);
        let result = match fs::symlink_metadata(&live) {
            Ok(meta) if meta.is_dir() => fs::remove_dir_all(&live),
            Ok(_) => fs::remove_file(&live),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => Err(e),
        };
        result.map_err(|e| CatalogError::io(format!("removing {}", live.display()), e))?;
        removed += 1;
    }

    let generations = root.join(GENERATIONS_DIR);
    if generations.exists() {
        fs::remove_dir_all(&generations).map_err(|e| {
            CatalogError::io(format!("removing {}", generations.display()), e)
        })?;
    }
    Ok(removed)
}
