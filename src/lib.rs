//! opcat - cached, tunneled access to operator catalog metadata
//!
//! Lists the catalogs a cluster serves, downloads their contents through a
//! port-forward to the in-cluster catalog server, caches them on disk keyed
//! by resolved reference and joins packages, channels, bundles and
//! deprecations into consistent records.

pub mod cache;
pub mod catalog;
pub mod cli;
pub mod client;
pub mod cluster;
pub mod config;
pub mod declcfg;
pub mod error;
pub mod tunnel;
pub mod ui;

pub use error::{CatalogError, CatalogResult};
