//! CLI command implementations

pub mod bundles;
pub mod cache;
pub mod config;
pub mod packages;

pub use bundles::execute as bundles;
pub use cache::execute as cache;
pub use config::execute as config;
pub use packages::execute as packages;
