//! CLI command implementations

pub mod completions;
pub mod config;
pub mod convert;
pub mod handle;
pub mod mapping;
pub mod merge;
pub mod split;
