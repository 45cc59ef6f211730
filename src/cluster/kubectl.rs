//! Cluster access through the `kubectl` CLI
//!
//! Uses whatever credentials and context kubectl is configured with, so no
//! kubeconfig parsing happens here.

use super::{CatalogSource, ClusterApi};
use crate::config::schema::{CatalogdConfig, KubectlConfig};
use crate::error::{CatalogError, CatalogResult};
use async_trait::async_trait;
use serde::Deserialize;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// kubectl-backed cluster client
#[derive(Debug, Clone)]
pub struct Kubectl {
    config: KubectlConfig,
    catalogd: CatalogdConfig,
}

impl Kubectl {
    pub fn new(config: KubectlConfig, catalogd: CatalogdConfig) -> Self {
        Self { config, catalogd }
    }

    /// A kubectl command with the configured context and kubeconfig applied
    pub(crate) fn command(&self) -> Command {
        let mut cmd = Command::new(&self.config.binary);
        if let Some(ref kubeconfig) = self.config.kubeconfig {
            cmd.arg("--kubeconfig").arg(kubeconfig);
        }
        if let Some(ref context) = self.config.context {
            cmd.args(["--context", context.as_str()]);
        }
        cmd
    }

    /// Map a spawn failure, reporting a missing binary distinctly
    pub(crate) fn spawn_error(&self, args: &[&str], e: std::io::Error) -> CatalogError {
        if e.kind() == std::io::ErrorKind::NotFound {
            CatalogError::KubectlNotFound(self.config.binary.clone())
        } else {
            CatalogError::command_failed(format!("{} {}", self.config.binary, args.join(" ")), e)
        }
    }

    /// Execute a kubectl command and return its stdout
    async fn exec(&self, args: &[&str]) -> CatalogResult<String> {
        debug!("Executing: {} {:?}", self.config.binary, args);

        let output = self
            .command()
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| self.spawn_error(args, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CatalogError::command_exec(
                format!("{} {}", self.config.binary, args.join(" ")),
                stderr.trim(),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl ClusterApi for Kubectl {
    async fn list_catalogs(&self) -> CatalogResult<Vec<CatalogSource>> {
        let json = self.exec(&["get", "clustercatalogs", "-o", "json"]).await?;
        parse_catalog_list(&json, &self.catalogd.ready_condition)
    }

    async fn certificate_authority(&self) -> CatalogResult<Vec<u8>> {
        let template = format!(
            "go-template={{{{index .binaryData \"{}\" | base64decode}}}}",
            self.catalogd.ca_key
        );
        let pem = self
            .exec(&[
                "get",
                "configmap",
                "-n",
                self.catalogd.namespace.as_str(),
                self.catalogd.ca_config_map.as_str(),
                "-o",
                template.as_str(),
            ])
            .await
            .map_err(|e| match e {
                CatalogError::KubectlNotFound(_) => e,
                other => CatalogError::CertificateAuthority(format!(
                    "get connection details config data from catalogd: {}",
                    other
                )),
            })?;

        if !pem.contains("-----BEGIN CERTIFICATE-----") {
            return Err(CatalogError::CertificateAuthority(format!(
                "config map {}/{} has no PEM data under {:?}",
                self.catalogd.namespace, self.catalogd.ca_config_map, self.catalogd.ca_key
            )));
        }
        Ok(pem.into_bytes())
    }

    async fn bearer_token(&self) -> CatalogResult<Option<String>> {
        let token = self
            .exec(&[
                "config",
                "view",
                "--minify",
                "--raw",
                "-o",
                "jsonpath={.users[0].user.token}",
            ])
            .await?;
        let token = token.trim();
        Ok((!token.is_empty()).then(|| token.to_string()))
    }
}

#[derive(Deserialize)]
struct ObjectList {
    #[serde(default)]
    items: Vec<ClusterCatalogObject>,
}

#[derive(Deserialize)]
struct ClusterCatalogObject {
    metadata: ObjectMeta,
    #[serde(default)]
    status: CatalogStatus,
}

#[derive(Deserialize)]
struct ObjectMeta {
    name: String,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogStatus {
    #[serde(default)]
    conditions: Vec<Condition>,
    #[serde(default)]
    resolved_source: Option<ResolvedSource>,
}

#[derive(Deserialize)]
struct Condition {
    #[serde(rename = "type")]
    kind: String,
    status: String,
}

#[derive(Deserialize)]
struct ResolvedSource {
    #[serde(default)]
    image: Option<ResolvedImage>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResolvedImage {
    #[serde(default)]
    resolved_ref: Option<String>,
    #[serde(default, rename = "ref")]
    reference: Option<String>,
}

/// Parse `kubectl get clustercatalogs -o json` output.
///
/// A catalog is ready when the `ready_condition` status condition is "True".
/// Older servers report the digest as `resolvedRef`, newer ones as `ref`.
pub fn parse_catalog_list(json: &str, ready_condition: &str) -> CatalogResult<Vec<CatalogSource>> {
    let list: ObjectList = serde_json::from_str(json)?;

    Ok(list
        .items
        .into_iter()
        .map(|item| {
            let ready = item
                .status
                .conditions
                .iter()
                .any(|c| c.kind == ready_condition && c.status == "True");
            let resolved_ref = item
                .status
                .resolved_source
                .and_then(|s| s.image)
                .and_then(|i| i.resolved_ref.or(i.reference));
            CatalogSource {
                name: item.metadata.name,
                ready,
                resolved_ref,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIST: &str = r#"{
        "apiVersion": "v1",
        "kind": "List",
        "items": [
            {
                "metadata": {"name": "operatorhubio"},
                "status": {
                    "conditions": [
                        {"type": "Unpacked", "status": "True", "reason": "UnpackSuccessful"}
                    ],
                    "resolvedSource": {
                        "type": "image",
                        "image": {
                            "ref": "quay.io/operatorhubio/catalog:latest",
                            "resolvedRef": "quay.io/operatorhubio/catalog@sha256:abc"
                        }
                    }
                }
            },
            {
                "metadata": {"name": "pending"},
                "status": {
                    "conditions": [{"type": "Unpacked", "status": "False"}]
                }
            },
            {
                "metadata": {"name": "fresh"}
            }
        ]
    }"#;

    #[test]
    fn parses_catalog_status() {
        let catalogs = parse_catalog_list(LIST, "Unpacked").unwrap();
        assert_eq!(catalogs.len(), 3);

        assert_eq!(catalogs[0].name, "operatorhubio");
        assert!(catalogs[0].ready);
        assert_eq!(
            catalogs[0].resolved_ref.as_deref(),
            Some("quay.io/operatorhubio/catalog@sha256:abc")
        );

        assert!(!catalogs[1].ready);
        assert!(catalogs[1].resolved_ref.is_none());

        assert!(!catalogs[2].ready);
    }

    #[test]
    fn ready_condition_is_configurable() {
        let json = r#"{"items":[{
            "metadata":{"name":"v1"},
            "status":{
                "conditions":[{"type":"Serving","status":"True"}],
                "resolvedSource":{"image":{"ref":"registry/c@sha256:def"}}
            }
        }]}"#;

        let catalogs = parse_catalog_list(json, "Serving").unwrap();
        assert!(catalogs[0].ready);
        assert_eq!(catalogs[0].resolved_ref.as_deref(), Some("registry/c@sha256:def"));

        let catalogs = parse_catalog_list(json, "Unpacked").unwrap();
        assert!(!catalogs[0].ready);
    }

    #[test]
    fn rejects_non_json() {
        assert!(parse_catalog_list("error: the server doesn't have a resource type", "Unpacked").is_err());
    }

    #[tokio::test]
    async fn missing_binary_is_reported() {
        let kubectl = Kubectl::new(
            KubectlConfig {
                binary: "/nonexistent/kubectl-for-opcat-tests".to_string(),
                ..KubectlConfig::default()
            },
            CatalogdConfig::default(),
        );
        let err = kubectl.list_catalogs().await.unwrap_err();
        assert!(matches!(err, CatalogError::KubectlNotFound(_)));
    }
}
