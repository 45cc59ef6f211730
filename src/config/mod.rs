//! Configuration management for opcat

pub mod schema;

pub use schema::Config;

use crate::error::{CatalogError, CatalogResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("opcat")
            .join("config.toml")
    }

    /// Default cache root: `<home>/operator-framework/cache`, or a relative
    /// path when no home directory can be determined.
    ///
    /// Resolved once at startup and passed down to the cache.
    pub fn default_cache_dir() -> PathBuf {
        Self::cache_dir_under(dirs::home_dir())
    }

    fn cache_dir_under(home: Option<PathBuf>) -> PathBuf {
        match home {
            Some(home) => home.join("operator-framework").join("cache"),
            None => PathBuf::from(".").join("operator-framework").join("cache"),
        }
    }

    /// Pick the cache root: explicit flag, then config, then the default
    pub fn resolve_cache_dir(flag: Option<PathBuf>, config: &Config) -> PathBuf {
        flag.or_else(|| config.cache.dir.clone())
            .unwrap_or_else(Self::default_cache_dir)
    }

    /// Load configuration, creating default if not exists
    pub async fn load(&self) -> CatalogResult<Config> {
        if !self.config_path.exists() {
            debug!("Config file not found, using defaults");
            return Ok(Config::default());
        }

        self.load_from_file(&self.config_path).await
    }

    /// Load configuration from a specific file
    pub async fn load_from_file(&self, path: &Path) -> CatalogResult<Config> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| CatalogError::io(format!("reading config from {}", path.display()), e))?;

        toml::from_str(&content).map_err(|e| CatalogError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Save configuration to file
    pub async fn save(&self, config: &Config) -> CatalogResult<()> {
        self.ensure_config_dir().await?;

        let content = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, content).await.map_err(|e| {
            CatalogError::io(
                format!("writing config to {}", self.config_path.display()),
                e,
            )
        })?;

        info!("Configuration saved to {}", self.config_path.display());
        Ok(())
    }

    /// Ensure the config directory exists
    async fn ensure_config_dir(&self) -> CatalogResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| CatalogError::ConfigDirCreate {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }
        Ok(())
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_default_when_missing() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nonexistent.toml");
        let manager = ConfigManager::with_path(path);

        let config = manager.load().await.unwrap();
        assert_eq!(config.catalogd.namespace, "olmv1-system");
    }

    #[tokio::test]
    async fn save_and_load_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.toml");
        let manager = ConfigManager::with_path(path);

        let mut config = Config::default();
        config.catalogd.namespace = "olm".to_string();

        manager.save(&config).await.unwrap();
        let loaded = manager.load().await.unwrap();

        assert_eq!(loaded.catalogd.namespace, "olm");
    }

    #[tokio::test]
    async fn invalid_config_reports_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[catalogd\nnamespace = 1").unwrap();

        let err = ConfigManager::with_path(path.clone()).load().await.unwrap_err();
        assert!(matches!(err, CatalogError::ConfigInvalid { path: p, .. } if p == path));
    }

    #[test]
    fn cache_dir_falls_back_to_relative_path() {
        assert_eq!(
            ConfigManager::cache_dir_under(None),
            PathBuf::from("./operator-framework/cache")
        );
        assert_eq!(
            ConfigManager::cache_dir_under(Some(PathBuf::from("/home/me"))),
            PathBuf::from("/home/me/operator-framework/cache")
        );
    }

    #[test]
    fn cache_dir_flag_wins_over_config() {
        let mut config = Config::default();
        config.cache.dir = Some(PathBuf::from("/from/config"));

        assert_eq!(
            ConfigManager::resolve_cache_dir(Some(PathBuf::from("/from/flag")), &config),
            PathBuf::from("/from/flag")
        );
        assert_eq!(
            ConfigManager::resolve_cache_dir(None, &config),
            PathBuf::from("/from/config")
        );
    }
}
