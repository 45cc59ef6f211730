//! Typed catalog metadata
//!
//! Decodes the records of one catalog tree into packages, channels, bundles
//! and deprecations, and joins them with [`assemble`].

mod assemble;
mod model;

pub use assemble::assemble;
pub use model::{
    Bundle, Channel, ChannelEntry, Deprecation, DeprecationEntry, DeprecationScope, Package,
    PackageScopedReference, Property,
};

use crate::declcfg::{CatalogTree, Schema};
use crate::error::CatalogResult;

/// Everything one catalog publishes, decoded
#[derive(Debug, Default)]
pub struct CatalogContents {
    pub packages: Vec<Package>,
    pub channels: Vec<Channel>,
    pub bundles: Vec<Bundle>,
    pub deprecations: Vec<Deprecation>,
}

impl CatalogContents {
    /// Decode all known record types from a tree; other schemas are skipped
    pub fn read(tree: &CatalogTree) -> CatalogResult<Self> {
        let mut contents = Self::default();
        tree.walk(|record| {
            match record.kind() {
                Schema::Package => contents.packages.push(record.decode()?),
                Schema::Channel => contents.channels.push(record.decode()?),
                Schema::Bundle => contents.bundles.push(record.decode()?),
                Schema::Deprecations => contents.deprecations.push(record.decode()?),
                Schema::Other => {}
            }
            Ok(())
        })?;
        Ok(contents)
    }

    /// Join this catalog's records into enriched bundles
    pub fn into_bundles(self, catalog: &str) -> CatalogResult<Vec<Bundle>> {
        assemble(catalog, self.channels, self.bundles, self.deprecations)
    }
}

/// Names of the packages a tree publishes
pub fn read_package_names(tree: &CatalogTree) -> CatalogResult<Vec<String>> {
    let mut names = Vec::new();
    tree.walk(|record| {
        if record.kind() == Schema::Package {
            let package: Package = record.decode()?;
            names.push(package.name);
        }
        Ok(())
    })?;
    Ok(names)
}
