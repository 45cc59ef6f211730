//! Error types for opcat
//!
//! All modules use `CatalogResult<T>` as their return type.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for opcat operations
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Coarse classification of a [`CatalogError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or incomplete catalog input
    Validation,
    /// Tunnel, TLS or HTTP failure
    Transport,
    /// Malformed record in a stream or on-disk tree
    Parse,
    /// Cross-reference failure while joining records
    Consistency,
    /// Several per-catalog failures reported together
    Aggregate,
    /// Configuration or cache index problems
    Config,
    /// Local filesystem or process errors
    Io,
    /// Anything else
    Internal,
}

/// All errors that can occur in opcat
#[derive(Error, Debug)]
pub enum CatalogError {
    // Validation errors
    #[error("catalog {catalog:?} is invalid: {reason}")]
    InvalidCatalog { catalog: String, reason: String },

    #[error("catalog {0:?} is not unpacked")]
    NotUnpacked(String),

    // Transport errors
    #[error("kubectl not found: {0}")]
    KubectlNotFound(String),

    #[error("failed to establish tunnel to {service}: {reason}")]
    TunnelSetup { service: String, reason: String },

    #[error("tunnel to {service} closed unexpectedly: {reason}")]
    TunnelClosed { service: String, reason: String },

    #[error("failed to load certificate authority: {0}")]
    CertificateAuthority(String),

    #[error("{context}: {source}")]
    Http {
        context: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("received unexpected response status code {status} for catalog {catalog:?}")]
    UnexpectedStatus { catalog: String, status: u16 },

    // Parse errors
    #[error("error parsing catalog contents at byte {offset}: {source}")]
    MalformedStream {
        offset: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("error parsing {schema} {name:?}: {reason}")]
    MalformedRecord {
        schema: String,
        name: String,
        reason: String,
    },

    #[error("catalog tree not found: {0}")]
    TreeNotFound(PathBuf),

    // Consistency errors
    #[error(
        "bundle {bundle:?} not found in catalog {catalog:?} (package {package:?}, channel {channel:?})"
    )]
    MissingBundle {
        catalog: String,
        package: String,
        channel: String,
        bundle: String,
    },

    // Per-catalog wrapping
    #[error("error fetching catalog {catalog:?} contents: {source}")]
    CatalogFetch {
        catalog: String,
        #[source]
        source: Box<CatalogError>,
    },

    #[error("error reading records from catalog {catalog:?}: {source}")]
    CatalogRead {
        catalog: String,
        #[source]
        source: Box<CatalogError>,
    },

    #[error("{0}")]
    Aggregate(AggregateError),

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to parse local cache index {path}: {reason}")]
    IndexInvalid { path: PathBuf, reason: String },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Process errors
    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command execution error: {command}, stderr: {stderr}")]
    CommandExecution { command: String, stderr: String },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("interrupted")]
    Interrupted,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CatalogError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create an HTTP transport error with context
    pub fn http(context: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Http {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Create a command execution error
    pub fn command_exec(command: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self::CommandExecution {
            command: command.into(),
            stderr: stderr.into(),
        }
    }

    /// Create a malformed record error
    pub fn record(
        schema: impl Into<String>,
        name: impl Into<String>,
        reason: impl fmt::Display,
    ) -> Self {
        Self::MalformedRecord {
            schema: schema.into(),
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidCatalog { .. } | Self::NotUnpacked(_) => ErrorKind::Validation,
            Self::KubectlNotFound(_)
            | Self::TunnelSetup { .. }
            | Self::TunnelClosed { .. }
            | Self::CertificateAuthority(_)
            | Self::Http { .. }
            | Self::UnexpectedStatus { .. } => ErrorKind::Transport,
            Self::MalformedStream { .. }
            | Self::MalformedRecord { .. }
            | Self::TreeNotFound(_)
            | Self::Json(_) => ErrorKind::Parse,
            Self::MissingBundle { .. } => ErrorKind::Consistency,
            Self::CatalogFetch { source, .. } | Self::CatalogRead { source, .. } => source.kind(),
            Self::Aggregate(_) => ErrorKind::Aggregate,
            Self::ConfigInvalid { .. }
            | Self::ConfigDirCreate { .. }
            | Self::IndexInvalid { .. }
            | Self::TomlParse(_)
            | Self::TomlSerialize(_) => ErrorKind::Config,
            Self::Io { .. } | Self::CommandFailed { .. } | Self::CommandExecution { .. } => {
                ErrorKind::Io
            }
            Self::Interrupted | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::NotUnpacked(_)
            | Self::TunnelSetup { .. }
            | Self::TunnelClosed { .. }
            | Self::Http { .. } => true,
            Self::CatalogFetch { source, .. } => source.is_retryable(),
            Self::Aggregate(agg) => agg.iter().all(CatalogError::is_retryable),
            _ => false,
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::KubectlNotFound(_) => {
                Some("Install kubectl or set kubectl.binary in the opcat config")
            }
            Self::NotUnpacked(_) => Some("Wait for the catalog to finish unpacking, then retry"),
            Self::CertificateAuthority(_) => {
                Some("Check the catalogd connection details config map in the cluster")
            }
            Self::IndexInvalid { .. } => Some("Run: opcat cache clear"),
            Self::Aggregate(agg) if agg.iter().all(|e| matches!(e, Self::NotUnpacked(_))) => {
                Some("Wait for the catalogs to finish unpacking, then retry")
            }
            _ => None,
        }
    }
}

/// Several errors gathered while processing catalogs independently
#[derive(Debug, Default)]
pub struct AggregateError {
    errors: Vec<CatalogError>,
}

impl AggregateError {
    /// Create an empty aggregate
    pub fn new() -> Self {
        Self::default()
    }

    /// Record another failure
    pub fn push(&mut self, error: CatalogError) {
        self.errors.push(error);
    }

    /// Number of constituent errors
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Iterate over constituent errors
    pub fn iter(&self) -> std::slice::Iter<'_, CatalogError> {
        self.errors.iter()
    }

    /// `Ok(())` when nothing was recorded, the aggregate otherwise
    pub fn into_result(self) -> CatalogResult<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(CatalogError::Aggregate(self))
        }
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateError {}

impl From<Vec<CatalogError>> for AggregateError {
    fn from(errors: Vec<CatalogError>) -> Self {
        Self { errors }
    }
}

impl IntoIterator for AggregateError {
    type Item = CatalogError;
    type IntoIter = std::vec::IntoIter<CatalogError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl<'a> IntoIterator for &'a AggregateError {
    type Item = &'a CatalogError;
    type IntoIter = std::slice::Iter<'a, CatalogError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_unpacked_display() {
        let err = CatalogError::NotUnpacked("X".to_string());
        assert_eq!(err.to_string(), r#"catalog "X" is not unpacked"#);
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn missing_bundle_names_everything() {
        let err = CatalogError::MissingBundle {
            catalog: "operatorhub".to_string(),
            package: "foo".to_string(),
            channel: "stable".to_string(),
            bundle: "foo.v1".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("operatorhub"));
        assert!(msg.contains("foo"));
        assert!(msg.contains("stable"));
        assert!(msg.contains("foo.v1"));
        assert_eq!(err.kind(), ErrorKind::Consistency);
    }

    #[test]
    fn aggregate_joins_with_newlines() {
        let mut agg = AggregateError::new();
        agg.push(CatalogError::NotUnpacked("a".to_string()));
        agg.push(CatalogError::NotUnpacked("b".to_string()));

        assert_eq!(agg.len(), 2);
        assert_eq!(
            agg.to_string(),
            "catalog \"a\" is not unpacked\ncatalog \"b\" is not unpacked"
        );

        let err = agg.into_result().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Aggregate);
        assert!(err.is_retryable());
        assert!(err.hint().is_some());
    }

    #[test]
    fn empty_aggregate_is_ok() {
        assert!(AggregateError::new().into_result().is_ok());
    }

    #[test]
    fn wrapped_errors_keep_their_kind() {
        let err = CatalogError::CatalogFetch {
            catalog: "c".to_string(),
            source: Box::new(CatalogError::UnexpectedStatus {
                catalog: "c".to_string(),
                status: 500,
            }),
        };
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(err.to_string().contains("status code 500"));
    }

    #[test]
    fn error_hint() {
        let err = CatalogError::KubectlNotFound("kubectl".to_string());
        assert!(err.hint().unwrap().contains("kubectl"));
        assert_eq!(CatalogError::Internal("x".to_string()).hint(), None);
    }
}
