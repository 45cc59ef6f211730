//! Cluster API boundary
//!
//! The cluster is only read from: catalog sources are enumerated, and the
//! catalog server's certificate authority and the caller's bearer token
//! are looked up so the tunneled HTTPS request can be authenticated.

mod kubectl;

pub use kubectl::{parse_catalog_list, Kubectl};

use crate::error::{CatalogError, CatalogResult};
use async_trait::async_trait;

/// A catalog as reported by the cluster control plane
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSource {
    /// Catalog name
    pub name: String,
    /// Whether the catalog has been unpacked and is being served
    pub ready: bool,
    /// Opaque reference to the immutable rendering being served (a digest)
    pub resolved_ref: Option<String>,
}

impl CatalogSource {
    pub fn new(name: impl Into<String>, ready: bool, resolved_ref: Option<&str>) -> Self {
        Self {
            name: name.into(),
            ready,
            resolved_ref: resolved_ref.map(str::to_string),
        }
    }

    /// The resolved content reference, required before anything is fetched
    pub fn content_ref(&self) -> CatalogResult<&str> {
        match self.resolved_ref.as_deref() {
            Some(r) if !r.is_empty() => Ok(r),
            _ => Err(CatalogError::InvalidCatalog {
                catalog: self.name.clone(),
                reason: "status has no resolved content reference".to_string(),
            }),
        }
    }
}

/// Read-only access to the cluster
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// Enumerate every catalog source
    async fn list_catalogs(&self) -> CatalogResult<Vec<CatalogSource>>;

    /// PEM bundle of the authority that signs the catalog server's certificate
    async fn certificate_authority(&self) -> CatalogResult<Vec<u8>>;

    /// Bearer token of the current user, if the credentials carry one
    async fn bearer_token(&self) -> CatalogResult<Option<String>>;
}
