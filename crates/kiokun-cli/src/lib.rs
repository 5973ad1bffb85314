//! Kiokun command-line tooling: routing diagnostics, lookups, shard separation

pub mod cli;
pub mod separate;
