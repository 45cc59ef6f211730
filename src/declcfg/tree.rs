//! Read-only view over a materialized catalog generation

use super::DeclarativeRecord;
use crate::error::{CatalogError, CatalogResult};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A catalog's records on disk, one JSON file per record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogTree {
    root: PathBuf,
}

impl CatalogTree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of the tree
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether the tree has been materialized
    pub fn exists(&self) -> bool {
        self.root.is_dir()
    }

    /// Decode every record file and hand it to `visit`.
    ///
    /// Files are decoded independently; callers must not rely on the
    /// visiting order. The first decoding failure or error returned by
    /// `visit` stops the walk.
    pub fn walk<F>(&self, mut visit: F) -> CatalogResult<()>
    where
        F: FnMut(DeclarativeRecord) -> CatalogResult<()>,
    {
        if !self.exists() {
            return Err(CatalogError::TreeNotFound(self.root.clone()));
        }

        for entry in WalkDir::new(&self.root).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let context = format!("walking catalog tree {}", self.root.display());
                match e.into_io_error() {
                    Some(io) => CatalogError::io(context, io),
                    None => CatalogError::Internal(context),
                }
            })?;

            let path = entry.path();
            if !entry.file_type().is_file() || path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }

            let bytes = fs::read(path)
                .map_err(|e| CatalogError::io(format!("reading {}", path.display()), e))?;
            let record = DeclarativeRecord::from_slice(&bytes).map_err(|e| match e {
                CatalogError::MalformedRecord { reason, .. } => {
                    let (schema, name) = Self::describe(path);
                    CatalogError::record(schema, name, reason)
                }
                other => other,
            })?;
            visit(record)?;
        }

        Ok(())
    }

    /// Collect every record; convenient for small catalogs and tests
    pub fn records(&self) -> CatalogResult<Vec<DeclarativeRecord>> {
        let mut records = Vec::new();
        self.walk(|record| {
            records.push(record);
            Ok(())
        })?;
        Ok(records)
    }

    /// Best-effort schema/name for a record file, from its location
    fn describe(path: &Path) -> (String, String) {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "<unknown>".to_string());
        let schema = path
            .parent()
            .and_then(Path::file_name)
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "<unknown>".to_string());
        (schema, name)
    }
}
