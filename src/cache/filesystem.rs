//! Filesystem-backed catalog cache

use super::generation::{self, Staging};
use super::{CacheIndex, CachedCatalog, Fetcher, IndexEntry, INDEX_FILE};
use crate::cluster::CatalogSource;
use crate::declcfg::{CatalogTree, DeclarativeRecord, StreamDecoder};
use crate::error::{CatalogError, CatalogResult};
use crate::tunnel::{LocalEndpoint, ServiceEndpoint, TransportSettings, TunnelOpener};
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::StatusCode;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tokio::fs;
use tracing::{debug, info, warn};

/// Caches catalog contents on the local filesystem, downloading them
/// through a fresh tunnel whenever the cached copy is missing or stale
pub struct FilesystemCache {
    root: PathBuf,
    index_path: PathBuf,
    index: Mutex<CacheIndex>,
    /// Serializes writers of the index file
    persist_lock: tokio::sync::Mutex<()>,
    tunnels: Box<dyn TunnelOpener>,
    service: ServiceEndpoint,
    transport: TransportSettings,
    scheme: &'static str,
}

impl FilesystemCache {
    /// Open the cache rooted at `root`, loading its index if one exists.
    ///
    /// The root itself is only created on the first download.
    pub async fn open(
        root: impl Into<PathBuf>,
        tunnels: Box<dyn TunnelOpener>,
        service: ServiceEndpoint,
        transport: TransportSettings,
    ) -> CatalogResult<Self> {
        let root = root.into();
        let index_path = root.join(INDEX_FILE);
        let index = CacheIndex::load(&index_path).await?;
        debug!(
            "Opened cache at {} with {} indexed catalogs",
            root.display(),
            index.len()
        );

        Ok(Self {
            root,
            index_path,
            index: Mutex::new(index),
            persist_lock: tokio::sync::Mutex::new(()),
            tunnels,
            service,
            transport,
            scheme: "https",
        })
    }

    /// Talk plain HTTP to the tunnel, for tests against a local listener
    #[cfg(test)]
    pub(crate) fn with_plain_http(mut self) -> Self {
        self.scheme = "http";
        self
    }

    /// Catalogs currently recorded in the index
    pub async fn status(&self) -> CatalogResult<Vec<CachedCatalog>> {
        super::status(&self.root).await
    }

    /// Drop every cached catalog, on disk and in memory
    pub async fn clear(&self) -> CatalogResult<usize> {
        let _guard = self.persist_lock.lock().await;
        let removed = super::clear(&self.root).await?;
        *self.index.lock().unwrap_or_else(PoisonError::into_inner) = CacheIndex::default();
        Ok(removed)
    }

    fn is_fresh(&self, catalog: &str, resolved_ref: &str) -> bool {
        self.index
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_fresh(catalog, resolved_ref)
    }

    /// Write the in-memory index to disk
    async fn persist_index(&self) -> CatalogResult<()> {
        let _guard = self.persist_lock.lock().await;
        let snapshot = self
            .index
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        snapshot.persist(&self.index_path).await
    }

    /// Download `catalog` into a new generation and publish it.
    ///
    /// The tunnel is kept alive alongside the download. Whichever finishes
    /// first decides the outcome and the other is dropped, which tears the
    /// tunnel down and removes any partially written generation.
    async fn populate(&self, catalog: &str) -> CatalogResult<()> {
        let tunnel = self.tunnels.open(&self.service).await?;
        let (endpoint, keep_alive) = tunnel.into_parts();
        let staging = generation::stage(&self.root, catalog)?;

        tokio::select! {
            biased;
            result = self.download(catalog, endpoint, staging.path()) => result?,
            result = keep_alive => {
                return Err(match result {
                    Err(e) => e,
                    Ok(()) => CatalogError::TunnelClosed {
                        service: self.service.to_string(),
                        reason: "tunnel stopped during download".to_string(),
                    },
                });
            }
        }

        self.publish(catalog, staging).await
    }

    async fn publish(&self, catalog: &str, staging: Staging) -> CatalogResult<()> {
        let root = self.root.clone();
        let name = catalog.to_string();
        tokio::task::spawn_blocking(move || generation::publish(&root, &name, staging))
            .await
            .map_err(|e| CatalogError::Internal(format!("publish task failed: {}", e)))??;
        Ok(())
    }

    /// GET the catalog's contents through the tunnel and write each record
    /// into `dir` as it arrives
    async fn download(
        &self,
        catalog: &str,
        endpoint: LocalEndpoint,
        dir: &Path,
    ) -> CatalogResult<()> {
        let local = endpoint.wait().await?;
        let host = self.service.dns_name();
        let client = self.transport.client_for(&host, local)?;
        let url = format!(
            "{}://{}:{}/catalogs/{}/all.json",
            self.scheme,
            host,
            local.port(),
            catalog
        );
        debug!(
            "GET {} via {} (timeout {:?})",
            url,
            local,
            self.transport.timeout()
        );

        let response = client
            .get(&url)
            .send()
            .await
            .map_err(|e| CatalogError::http("error performing request", e))?;

        if response.status() != StatusCode::OK {
            return Err(CatalogError::UnexpectedStatus {
                catalog: catalog.to_string(),
                status: response.status().as_u16(),
            });
        }

        let mut decoder = StreamDecoder::new();
        let mut body = response.bytes_stream();
        let mut written = 0usize;

        while let Some(chunk) = body.next().await {
            let chunk =
                chunk.map_err(|e| CatalogError::http("error reading catalog contents", e))?;
            for record in decoder.push(&chunk)? {
                write_record(dir, &record).await?;
                written += 1;
            }
        }
        for record in decoder.finish()? {
            write_record(dir, &record).await?;
            written += 1;
        }

        debug!("Wrote {} records for catalog {}", written, catalog);
        Ok(())
    }
}

/// Store one record at `<dir>/<package>/<schema>/<name>.json`
async fn write_record(dir: &Path, record: &DeclarativeRecord) -> CatalogResult<()> {
    let path = dir.join(record.relative_path()?);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await.map_err(|e| {
            CatalogError::io("error creating directory for catalog metadata", e)
        })?;
    }
    fs::write(&path, &record.blob)
        .await
        .map_err(|e| CatalogError::io("error writing catalog metadata to file", e))
}

#[async_trait]
impl Fetcher for FilesystemCache {
    async fn fetch(&self, catalog: &CatalogSource) -> CatalogResult<CatalogTree> {
        let resolved_ref = catalog.content_ref()?;
        generation::validate_catalog_name(&catalog.name)?;
        generation::recover(&self.root, &catalog.name)?;

        let tree = CatalogTree::new(generation::current_path(&self.root, &catalog.name));
        if self.is_fresh(&catalog.name, resolved_ref) && tree.exists() {
            debug!("Catalog {} is up to date ({})", catalog.name, resolved_ref);
            return Ok(tree);
        }

        fs::create_dir_all(&self.root).await.map_err(|e| {
            CatalogError::io(
                format!("unable to create cache directory {}", self.root.display()),
                e,
            )
        })?;

        info!("Fetching catalog {} ({})", catalog.name, resolved_ref);
        self.populate(&catalog.name).await?;

        self.index
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record(&catalog.name, IndexEntry::new(resolved_ref));

        if let Err(e) = self.persist_index().await {
            warn!("Failed to write cache index: {}", e);
        }

        Ok(tree)
    }
}
