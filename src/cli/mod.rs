//! Command-line interface

mod args;
pub mod commands;

pub use args::{
    BundlesArgs, CacheAction, CacheArgs, Cli, Commands, ConfigAction, ConfigArgs, OutputFormat,
    PackagesArgs,
};
