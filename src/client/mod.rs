//! Catalog metadata client
//!
//! Lists the catalogs known to the cluster, fetches the selected ones
//! concurrently through a [`Fetcher`] and reads their records. Any
//! per-catalog failure fails the whole call: results gathered from the
//! other catalogs are discarded and every failure is reported together.

use crate::cache::{Fetcher, FilesystemCache};
use crate::catalog::{read_package_names, Bundle, CatalogContents};
use crate::cluster::{CatalogSource, ClusterApi, Kubectl};
use crate::config::Config;
use crate::declcfg::CatalogTree;
use crate::error::{AggregateError, CatalogError, CatalogResult};
use crate::tunnel::{KubectlPortForward, ServiceEndpoint, TransportSettings};
use futures_util::future::join_all;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

/// Reads one catalog's tree into output items
type TreeReader<T> = fn(&str, CatalogTree) -> CatalogResult<Vec<T>>;

pub struct MetadataClient {
    cluster: Arc<dyn ClusterApi>,
    fetcher: Arc<dyn Fetcher>,
}

impl MetadataClient {
    pub fn new(cluster: Arc<dyn ClusterApi>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self { cluster, fetcher }
    }

    /// Names of every package published by the selected catalogs.
    ///
    /// An empty `allow` list selects every catalog; otherwise catalog names
    /// are matched case-insensitively.
    pub async fn packages(&self, allow: &[String]) -> CatalogResult<Vec<String>> {
        self.fan_out(allow, |_, tree| read_package_names(&tree)).await
    }

    /// Every bundle of the selected catalogs, joined with its channels and
    /// deprecations, ordered by catalog, package and name
    pub async fn bundles(&self, allow: &[String]) -> CatalogResult<Vec<Bundle>> {
        let mut bundles = self
            .fan_out(allow, |catalog, tree| {
                CatalogContents::read(&tree)?.into_bundles(catalog)
            })
            .await?;
        bundles.sort_by(|a, b| {
            (&a.catalog, &a.package, &a.name).cmp(&(&b.catalog, &b.package, &b.name))
        });
        Ok(bundles)
    }

    async fn fan_out<T>(&self, allow: &[String], read: TreeReader<T>) -> CatalogResult<Vec<T>>
    where
        T: Send + 'static,
    {
        let catalogs: Vec<CatalogSource> = self
            .cluster
            .list_catalogs()
            .await?
            .into_iter()
            .filter(|c| is_allowed(allow, &c.name))
            .collect();
        debug!("Processing {} catalogs", catalogs.len());

        let results = Mutex::new(Vec::new());
        let outcomes = join_all(
            catalogs
                .iter()
                .map(|catalog| self.process(catalog, read, &results)),
        )
        .await;

        let errors: AggregateError = outcomes
            .into_iter()
            .filter_map(Result::err)
            .collect::<Vec<_>>()
            .into();
        errors.into_result()?;

        Ok(results.into_inner().unwrap_or_else(PoisonError::into_inner))
    }

    async fn process<T>(
        &self,
        catalog: &CatalogSource,
        read: TreeReader<T>,
        results: &Mutex<Vec<T>>,
    ) -> CatalogResult<()>
    where
        T: Send + 'static,
    {
        if !catalog.ready {
            return Err(CatalogError::NotUnpacked(catalog.name.clone()));
        }

        let tree = self
            .fetcher
            .fetch(catalog)
            .await
            .map_err(|e| CatalogError::CatalogFetch {
                catalog: catalog.name.clone(),
                source: Box::new(e),
            })?;

        let name = catalog.name.clone();
        let items = tokio::task::spawn_blocking(move || read(&name, tree))
            .await
            .map_err(|e| CatalogError::Internal(format!("catalog read task failed: {}", e)))?;

        let items = match items {
            Ok(items) => items,
            Err(CatalogError::TreeNotFound(path)) => {
                warn!(
                    "Catalog {} has no cached contents at {}, skipping",
                    catalog.name,
                    path.display()
                );
                return Ok(());
            }
            Err(e) => {
                return Err(CatalogError::CatalogRead {
                    catalog: catalog.name.clone(),
                    source: Box::new(e),
                })
            }
        };

        results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(items);
        Ok(())
    }
}

fn is_allowed(allow: &[String], catalog: &str) -> bool {
    allow.is_empty() || allow.iter().any(|a| a.eq_ignore_ascii_case(catalog))
}

/// Build a client that reaches the cluster through kubectl and caches
/// catalog contents under `cache_dir`
pub async fn connect(config: &Config, cache_dir: &Path) -> CatalogResult<MetadataClient> {
    let kubectl = Kubectl::new(config.kubectl.clone(), config.catalogd.clone());
    let ca = kubectl.certificate_authority().await?;
    let token = kubectl.bearer_token().await?;
    let transport =
        TransportSettings::new(Some(&ca), token, config.catalogd.request_timeout())?;
    if !transport.has_token() {
        debug!("No bearer token in the current kubectl context; requests go unauthenticated");
    }

    let cache = FilesystemCache::open(
        cache_dir,
        Box::new(KubectlPortForward::new(kubectl.clone())),
        ServiceEndpoint::from(&config.catalogd),
        transport,
    )
    .await?;

    Ok(MetadataClient::new(Arc::new(kubectl), Arc::new(cache)))
}

/// Package names from the catalogs in `allow` (all catalogs when empty)
pub async fn list_packages(
    config: &Config,
    allow: &[String],
    cache_dir: &Path,
) -> CatalogResult<Vec<String>> {
    connect(config, cache_dir).await?.packages(allow).await
}
