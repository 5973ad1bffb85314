#![warn(missing_docs)]

//! Kiokun routing subsystem: key classification, stable hash, deterministic shard routing
//!
//! Everything in this crate is pure and synchronous. The same functions are linked into
//! the offline build tooling (to decide where an entry is written) and into lookup
//! clients (to decide where it is read), so their output must never depend on anything
//! but the key and the shard-set generation.

pub mod classify;
pub mod hash;
pub mod plan;
pub mod router;
pub mod types;

pub use classify::{classify, is_ideograph, is_kana};
pub use hash::stable_hash;
pub use plan::{PartitionPlan, PartitionReport, ShardCeiling, ShardLoad};
pub use router::{route, ShardRouter};
pub use types::{Classification, Result, RoutingError, ShardId, ShardSetGeneration};
