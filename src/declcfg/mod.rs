//! Declarative catalog records
//!
//! A catalog is served as a concatenated stream of JSON objects, each tagged
//! with a `schema`. Records are decoded lazily, either from a byte stream as
//! it arrives ([`StreamDecoder`]) or from a materialized on-disk tree where
//! each record lives in its own file ([`CatalogTree`]).
//!
//! # On-disk layout
//!
//! ```text
//! <root>/<package>/<schema>/<name>.json
//! ```

mod record;
mod stream;
mod tree;

pub use record::{DeclarativeRecord, Schema};
pub use stream::StreamDecoder;
pub use tree::CatalogTree;

/// Schema tag of package records
pub const SCHEMA_PACKAGE: &str = "olm.package";
/// Schema tag of channel records
pub const SCHEMA_CHANNEL: &str = "olm.channel";
/// Schema tag of bundle records
pub const SCHEMA_BUNDLE: &str = "olm.bundle";
/// Schema tag of deprecation records
pub const SCHEMA_DEPRECATIONS: &str = "olm.deprecations";
