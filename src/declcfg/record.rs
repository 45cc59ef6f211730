//! A single schema-tagged record

use super::{SCHEMA_BUNDLE, SCHEMA_CHANNEL, SCHEMA_DEPRECATIONS, SCHEMA_PACKAGE};
use crate::error::{CatalogError, CatalogResult};
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;

/// Known record schemas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Schema {
    Package,
    Channel,
    Bundle,
    Deprecations,
    /// Anything else; passed through untouched
    Other,
}

impl Schema {
    /// Classify a schema tag
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            SCHEMA_PACKAGE => Self::Package,
            SCHEMA_CHANNEL => Self::Channel,
            SCHEMA_BUNDLE => Self::Bundle,
            SCHEMA_DEPRECATIONS => Self::Deprecations,
            _ => Self::Other,
        }
    }
}

/// Fields every record shares; the rest of the object stays opaque
#[derive(Deserialize)]
struct Header {
    #[serde(default)]
    schema: String,
    #[serde(default)]
    package: String,
    #[serde(default)]
    name: String,
}

/// One decoded record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclarativeRecord {
    /// Schema tag, e.g. `olm.bundle`
    pub schema: String,
    /// Owning package, if the record names one
    pub package: Option<String>,
    /// Record name; the schema tag when the record has none
    pub name: String,
    /// The raw JSON object
    pub blob: Vec<u8>,
}

impl DeclarativeRecord {
    /// Decode a record from the bytes of a single JSON object
    pub fn from_slice(bytes: &[u8]) -> CatalogResult<Self> {
        let header: Header = serde_json::from_slice(bytes)
            .map_err(|e| CatalogError::record("<unknown>", "<unknown>", e))?;

        if header.schema.is_empty() {
            let name = if header.name.is_empty() {
                "<unknown>".to_string()
            } else {
                header.name
            };
            return Err(CatalogError::record("<unknown>", name, "missing schema"));
        }

        let name = if header.name.is_empty() {
            header.schema.clone()
        } else {
            header.name
        };
        let package = if header.package.is_empty() {
            None
        } else {
            Some(header.package)
        };

        Ok(Self {
            schema: header.schema,
            package,
            name,
            blob: bytes.to_vec(),
        })
    }

    /// Classified schema
    pub fn kind(&self) -> Schema {
        Schema::from_tag(&self.schema)
    }

    /// Package this record is filed under. Package records file under their own name.
    pub fn package_key(&self) -> Option<&str> {
        match self.kind() {
            Schema::Package => Some(&self.name),
            _ => self.package.as_deref(),
        }
    }

    /// Relative file path for this record inside a catalog tree
    pub fn relative_path(&self) -> CatalogResult<PathBuf> {
        let mut path = PathBuf::new();
        if let Some(package) = self.package_key() {
            self.check_component(package)?;
            path.push(package);
        }
        self.check_component(&self.schema)?;
        self.check_component(&self.name)?;
        path.push(&self.schema);
        path.push(format!("{}.json", self.name));
        Ok(path)
    }

    /// Decode the record body into a typed value
    pub fn decode<'a, T: Deserialize<'a>>(&'a self) -> CatalogResult<T> {
        serde_json::from_slice(&self.blob)
            .map_err(|e| CatalogError::record(&self.schema, &self.name, e))
    }

    fn check_component(&self, component: &str) -> CatalogResult<()> {
        let valid = !component.is_empty()
            && component != "."
            && component != ".."
            && !component.contains(['/', '\\', '\0']);
        if valid {
            Ok(())
        } else {
            Err(CatalogError::record(
                &self.schema,
                &self.name,
                format!("unsafe path component {:?}", component),
            ))
        }
    }
}

impl fmt::Display for DeclarativeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.package {
            Some(package) => write!(f, "{} {}/{}", self.schema, package, self.name),
            None => write!(f, "{} {}", self.schema, self.name),
        }
    }
}
