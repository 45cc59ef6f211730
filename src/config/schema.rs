//! Configuration schema for opcat
//!
//! Configuration is stored at `~/.config/opcat/config.toml`

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Local catalog cache settings
    pub cache: CacheConfig,

    /// In-cluster catalog server settings
    pub catalogd: CatalogdConfig,

    /// kubectl invocation settings
    pub kubectl: KubectlConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

/// Cache configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache root directory; defaults to `~/operator-framework/cache`
    pub dir: Option<PathBuf>,
}

/// Catalog server (catalogd) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogdConfig {
    /// Namespace the catalog server runs in
    pub namespace: String,

    /// Service fronting the catalog server
    pub service: String,

    /// Service port (number or name) to forward to
    pub port: String,

    /// Config map holding the serving certificate authority
    pub ca_config_map: String,

    /// Key of the CA bundle inside the config map's binary data
    pub ca_key: String,

    /// Fixed timeout for each catalog download
    pub request_timeout_secs: u64,

    /// Status condition that marks a catalog as ready to serve
    pub ready_condition: String,
}

impl CatalogdConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for CatalogdConfig {
    fn default() -> Self {
        Self {
            namespace: "olmv1-system".to_string(),
            service: "catalogd-catalogserver".to_string(),
            port: "https".to_string(),
            ca_config_map: "catalogd-connection-details".to_string(),
            ca_key: "ca".to_string(),
            request_timeout_secs: 30,
            ready_condition: "Unpacked".to_string(),
        }
    }
}

/// kubectl configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KubectlConfig {
    /// kubectl executable
    pub binary: String,

    /// Kubeconfig context to use
    pub context: Option<String>,

    /// Kubeconfig file to use
    pub kubeconfig: Option<PathBuf>,
}

impl Default for KubectlConfig {
    fn default() -> Self {
        Self {
            binary: "kubectl".to_string(),
            context: None,
            kubeconfig: None,
        }
    }
}
