//! Durable index of cached catalogs
//!
//! Maps catalog name to the content reference of its current generation.

use crate::error::{CatalogError, CatalogResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tokio::fs;
use uuid::Uuid;

/// What is known about one cached catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexEntry {
    /// Content reference the current generation was fetched for
    pub resolved_ref: String,

    /// When the current generation was published
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_at: Option<DateTime<Utc>>,
}

impl IndexEntry {
    pub fn new(resolved_ref: impl Into<String>) -> Self {
        Self {
            resolved_ref: resolved_ref.into(),
            cached_at: Some(Utc::now()),
        }
    }
}

/// Catalog name to index entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheIndex {
    entries: BTreeMap<String, IndexEntry>,
}

impl CacheIndex {
    /// Load the index from `path`; a missing file is an empty index
    pub async fn load(path: &Path) -> CatalogResult<Self> {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(CatalogError::io(
                    format!("reading cache index {}", path.display()),
                    e,
                ))
            }
        };

        serde_json::from_str(&content).map_err(|e| CatalogError::IndexInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Whether `catalog` was last cached for exactly `resolved_ref`
    pub fn is_fresh(&self, catalog: &str, resolved_ref: &str) -> bool {
        self.entries
            .get(catalog)
            .is_some_and(|entry| entry.resolved_ref == resolved_ref)
    }

    pub fn get(&self, catalog: &str) -> Option<&IndexEntry> {
        self.entries.get(catalog)
    }

    /// Record a newly published generation; last write wins
    pub fn record(&mut self, catalog: impl Into<String>, entry: IndexEntry) {
        self.entries.insert(catalog.into(), entry);
    }

    /// Entries in catalog name order
    pub fn entries(&self) -> impl Iterator<Item = (&str, &IndexEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write the whole index to `path`.
    ///
    /// Goes through a temporary sibling file and a rename, so a crash leaves
    /// either the old or the new index, never a torn one.
    pub async fn persist(&self, path: &Path) -> CatalogResult<()> {
        let content = serde_json::to_string_pretty(self)?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "index.json".to_string());
        let tmp = path.with_file_name(format!(".{}.{}.tmp", file_name, Uuid::new_v4()));

        fs::write(&tmp, content)
            .await
            .map_err(|e| CatalogError::io(format!("writing {}", tmp.display()), e))?;

        if let Err(e) = fs::rename(&tmp, path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(CatalogError::io(
                format!("replacing cache index {}", path.display()),
                e,
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_index_is_empty() {
        let dir = TempDir::new().unwrap();
        let index = CacheIndex::load(&dir.path().join("index.json")).await.unwrap();
        assert!(index.is_empty());
    }

    #[tokio::test]
    async fn persist_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.json");

        let mut index = CacheIndex::default();
        index.record("operatorhub", IndexEntry::new("sha256:aaa"));
        index.record("community", IndexEntry::new("sha256:bbb"));
        index.persist(&path).await.unwrap();

        let loaded = CacheIndex::load(&path).await.unwrap();
        assert_eq!(loaded, index);
        let names: Vec<_> = loaded.entries().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["community", "operatorhub"]);

        // No temporary files left behind
        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn freshness_is_exact_equality() {
        let mut index = CacheIndex::default();
        index.record("c", IndexEntry::new("sha256:aaa"));

        assert!(index.is_fresh("c", "sha256:aaa"));
        assert!(!index.is_fresh("c", "sha256:AAA"));
        assert!(!index.is_fresh("c", "sha256:aaa "));
        assert!(!index.is_fresh("other", "sha256:aaa"));
    }

    #[test]
    fn later_record_wins() {
        let mut index = CacheIndex::default();
        index.record("c", IndexEntry::new("one"));
        index.record("c", IndexEntry::new("two"));
        assert_eq!(index.len(), 1);
        assert_eq!(index.get("c").unwrap().resolved_ref, "two");
    }

    #[test]
    fn reads_entries_without_timestamp() {
        let index: CacheIndex =
            serde_json::from_str(r#"{"c":{"resolvedRef":"sha256:aaa"}}"#).unwrap();
        assert!(index.is_fresh("c", "sha256:aaa"));
        assert!(index.get("c").unwrap().cached_at.is_none());
    }

    #[tokio::test]
    async fn malformed_index_names_the_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.json");
        std::fs::write(&path, "[not an index").unwrap();

        let err = CacheIndex::load(&path).await.unwrap_err();
        assert!(matches!(err, CatalogError::IndexInvalid { .. }));
        assert!(err.to_string().contains("index.json"));
    }
}
