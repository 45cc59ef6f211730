//! Typed catalog records

use crate::declcfg::{SCHEMA_BUNDLE, SCHEMA_CHANNEL, SCHEMA_PACKAGE};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Property type carrying a bundle's package name and version
const PROPERTY_PACKAGE: &str = "olm.package";

/// An operator package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A named upgrade stream within a package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub package: String,
    pub name: String,
    #[serde(default)]
    pub entries: Vec<ChannelEntry>,
}

/// One bundle listed by a channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replaces: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skips: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_range: Option<String>,
}

/// A bundle property, kept mostly opaque
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub value: serde_json::Value,
}

/// One installable version of a package
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bundle {
    pub package: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub properties: Vec<Property>,

    /// Catalog this bundle was read from; set during assembly
    #[serde(skip_deserializing, default)]
    pub catalog: String,
    /// Channels listing this bundle, sorted by name; set during assembly
    #[serde(skip)]
    pub in_channels: Vec<Arc<Channel>>,
    /// Deprecations that apply to this bundle; set during assembly
    #[serde(skip_deserializing, default)]
    pub deprecations: Vec<DeprecationEntry>,
}

impl Bundle {
    /// Semantic version from the bundle's `olm.package` property
    pub fn version(&self) -> Option<semver::Version> {
        self.properties
            .iter()
            .find(|p| p.kind == PROPERTY_PACKAGE)
            .and_then(|p| p.value.get("version"))
            .and_then(|v| v.as_str())
            .and_then(|v| semver::Version::parse(v).ok())
    }

    /// Names of the channels this bundle belongs to
    pub fn channel_names(&self) -> Vec<&str> {
        self.in_channels.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn is_deprecated(&self) -> bool {
        !self.deprecations.is_empty()
    }
}

/// Deprecation notices for one package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deprecation {
    pub package: String,
    #[serde(default)]
    pub entries: Vec<DeprecationEntry>,
}

/// A single deprecation notice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeprecationEntry {
    pub reference: PackageScopedReference,
    #[serde(default)]
    pub message: String,
}

/// What a deprecation entry points at, within its package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageScopedReference {
    pub schema: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
}

/// Scope of a deprecation entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeprecationScope {
    Package,
    Channel,
    Bundle,
}

impl PackageScopedReference {
    /// Scope of the reference; `None` for schemas that scope nothing
    pub fn scope(&self) -> Option<DeprecationScope> {
        match self.schema.as_str() {
            SCHEMA_PACKAGE => Some(DeprecationScope::Package),
            SCHEMA_CHANNEL => Some(DeprecationScope::Channel),
            SCHEMA_BUNDLE => Some(DeprecationScope::Bundle),
            _ => None,
        }
    }
}
