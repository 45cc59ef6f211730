//! HTTPS client configuration for requests sent through a tunnel

use crate::error::{CatalogError, CatalogResult};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Certificate, Client};
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

/// Default timeout applied to each catalog request
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Trust roots, credentials and timeout for catalog requests
#[derive(Clone)]
pub struct TransportSettings {
    roots: Vec<Certificate>,
    bearer_token: Option<String>,
    timeout: Duration,
}

impl TransportSettings {
    /// Build settings from an optional PEM bundle and bearer token.
    ///
    /// With a bundle, only its certificates are trusted; without one the
    /// built-in roots are used.
    pub fn new(
        ca_pem: Option<&[u8]>,
        bearer_token: Option<String>,
        timeout: Duration,
    ) -> CatalogResult<Self> {
        let roots = match ca_pem {
            Some(pem) => {
                let certs = Certificate::from_pem_bundle(pem).map_err(|e| {
                    CatalogError::CertificateAuthority(format!("malformed PEM: {}", e))
                })?;
                if certs.is_empty() {
                    return Err(CatalogError::CertificateAuthority(
                        "failed to load certificate authority into cert pool: malformed PEM?"
                            .to_string(),
                    ));
                }
                certs
            }
            None => Vec::new(),
        };

        Ok(Self {
            roots,
            bearer_token: bearer_token.filter(|t| !t.is_empty()),
            timeout,
        })
    }

    /// Whether a bearer token will be attached to requests
    pub fn has_token(&self) -> bool {
        self.bearer_token.is_some()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Client that connects to `local` whenever a request names `host`
    pub fn client_for(&self, host: &str, local: SocketAddr) -> CatalogResult<Client> {
        let mut headers = HeaderMap::new();
        if let Some(ref token) = self.bearer_token {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|_| {
                CatalogError::Internal("bearer token is not a valid header value".to_string())
            })?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let mut builder = Client::builder()
            .default_headers(headers)
            .timeout(self.timeout)
            .resolve(host, local)
            .no_proxy();

        if !self.roots.is_empty() {
            builder = builder.tls_built_in_root_certs(false);
            for cert in &self.roots {
                builder = builder.add_root_certificate(cert.clone());
            }
        }

        builder
            .build()
            .map_err(|e| CatalogError::http("error creating http client to get catalog data", e))
    }
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            bearer_token: None,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl fmt::Debug for TransportSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportSettings")
            .field("roots", &self.roots.len())
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_ca_is_rejected() {
        let err = TransportSettings::new(Some(b"not a certificate"), None, DEFAULT_REQUEST_TIMEOUT)
            .unwrap_err();
        assert!(matches!(err, CatalogError::CertificateAuthority(_)));
    }

    #[test]
    fn empty_token_is_dropped() {
        let settings =
            TransportSettings::new(None, Some(String::new()), DEFAULT_REQUEST_TIMEOUT).unwrap();
        assert!(!settings.has_token());
    }

    #[test]
    fn debug_redacts_token() {
        let settings =
            TransportSettings::new(None, Some("s3cr3t".to_string()), DEFAULT_REQUEST_TIMEOUT)
                .unwrap();
        let debug = format!("{:?}", settings);
        assert!(!debug.contains("s3cr3t"));
        assert!(debug.contains("redacted"));
    }

    #[test]
    fn builds_client_with_system_roots() {
        let settings = TransportSettings::default();
        let local: SocketAddr = "127.0.0.1:8443".parse().unwrap();
        assert!(settings.client_for("svc.ns.svc", local).is_ok());
    }

    #[test]
    fn invalid_token_characters_fail() {
        let settings =
            TransportSettings::new(None, Some("bad\ntoken".to_string()), DEFAULT_REQUEST_TIMEOUT)
                .unwrap();
        let local: SocketAddr = "127.0.0.1:8443".parse().unwrap();
        assert!(settings.client_for("svc.ns.svc", local).is_err());
    }
}
