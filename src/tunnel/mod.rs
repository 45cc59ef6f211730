//! Tunneled access to the in-cluster catalog server
//!
//! A tunnel binds a local port that forwards into the cluster network. It is
//! driven by a keep-alive future that must be polled for as long as the
//! tunnel is in use; dropping that future tears the tunnel down. Readiness
//! is reported separately through [`LocalEndpoint`].
//!
//! One tunnel is opened per fetch. Tunnels are never pooled and failures
//! are never retried here.

mod http;
mod port_forward;

pub use http::TransportSettings;
pub use port_forward::{parse_forwarding_line, KubectlPortForward};

use crate::config::schema::CatalogdConfig;
use crate::error::{CatalogError, CatalogResult};
use async_trait::async_trait;
use futures_util::future::{BoxFuture, FutureExt};
use std::fmt;
use std::future::Future;
use std::net::SocketAddr;
use tokio::sync::oneshot;

/// An in-cluster service to tunnel to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEndpoint {
    pub namespace: String,
    pub name: String,
    /// Port number or name
    pub port: String,
}

impl ServiceEndpoint {
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        port: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            port: port.into(),
        }
    }

    /// In-cluster DNS name; the serving certificate is issued for it
    pub fn dns_name(&self) -> String {
        format!("{}.{}.svc", self.name, self.namespace)
    }
}

impl From<&CatalogdConfig> for ServiceEndpoint {
    fn from(config: &CatalogdConfig) -> Self {
        Self::new(&config.namespace, &config.service, &config.port)
    }
}

impl fmt::Display for ServiceEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:{}", self.namespace, self.name, self.port)
    }
}

/// An opened tunnel
pub struct TunnelHandle {
    endpoint: LocalEndpoint,
    keep_alive: BoxFuture<'static, CatalogResult<()>>,
}

impl TunnelHandle {
    /// Assemble a handle from a readiness channel and the future that keeps
    /// the tunnel alive. The future resolving at all means the tunnel is gone.
    pub fn new<F>(service: &ServiceEndpoint, ready: oneshot::Receiver<SocketAddr>, keep_alive: F) -> Self
    where
        F: Future<Output = CatalogResult<()>> + Send + 'static,
    {
        Self {
            endpoint: LocalEndpoint {
                ready,
                service: service.to_string(),
            },
            keep_alive: keep_alive.boxed(),
        }
    }

    /// Split into the readiness half and the keep-alive half
    pub fn into_parts(self) -> (LocalEndpoint, BoxFuture<'static, CatalogResult<()>>) {
        (self.endpoint, self.keep_alive)
    }
}

/// The local side of a tunnel, available once the tunnel is ready
pub struct LocalEndpoint {
    ready: oneshot::Receiver<SocketAddr>,
    service: String,
}

impl LocalEndpoint {
    /// Wait for the tunnel to come up and return the bound local address.
    ///
    /// Fails if the tunnel gave up before becoming ready.
    pub async fn wait(self) -> CatalogResult<SocketAddr> {
        self.ready.await.map_err(|_| CatalogError::TunnelSetup {
            service: self.service,
            reason: "tunnel stopped before becoming ready".to_string(),
        })
    }
}

/// Opens tunnels to in-cluster services
#[async_trait]
pub trait TunnelOpener: Send + Sync {
    async fn open(&self, service: &ServiceEndpoint) -> CatalogResult<TunnelHandle>;
}
