//! Build-side partition planning.
//!
//! Runs every corpus key through the same router lookup clients use, tallies file
//! and byte counts per shard, and checks them against the hosting layer's ceilings.

use std::collections::HashMap;

use serde::Serialize;

use crate::router::ShardRouter;
use crate::types::*;

/// Size limits a single shard must stay within.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShardCeiling {
    /// Maximum number of entry files per shard.
    pub max_files: u64,
    /// Maximum total payload bytes per shard.
    pub max_bytes: u64,
}

impl Default for ShardCeiling {
    fn default() -> Self {
        Self {
            max_files: 20_000,
            max_bytes: 1 << 30,
        }
    }
}

/// Accumulated load of one shard.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ShardLoad {
    /// Published shard name.
    pub shard: String,
    /// Number of entries routed to the shard.
    pub files: u64,
    /// Total payload bytes routed to the shard.
    pub bytes: u64,
    /// True if either count exceeds the ceiling.
    pub over_ceiling: bool,
}

/// Summary of a partition plan, suitable for printing or serializing.
#[derive(Clone, Debug, Serialize)]
pub struct PartitionReport {
    /// Generation the plan was built for.
    pub generation: ShardSetGeneration,
    /// Every shard of the generation, largest file count first.
    pub shards: Vec<ShardLoad>,
    /// Total entries across all shards.
    pub total_files: u64,
    /// Total payload bytes across all shards.
    pub total_bytes: u64,
    /// Number of shards exceeding the ceiling.
    pub violations: usize,
}

impl PartitionReport {
    /// Returns the shard holding the most files.
    pub fn largest(&self) -> Option<&ShardLoad> {
        self.shards.first()
    }
}

/// Assigns corpus keys to shards and tracks per-shard load.
///
/// Rejects keys it has already seen, so a completed plan is a partition: every key
/// belongs to exactly one shard.
pub struct PartitionPlan {
    router: ShardRouter,
    ceiling: ShardCeiling,
    assignments: HashMap<String, ShardId>,
    files: Vec<u64>,
    bytes: Vec<u64>,
}

impl PartitionPlan {
    /// Creates an empty plan for the given generation.
    pub fn new(generation: ShardSetGeneration, ceiling: ShardCeiling) -> Self {
        let count = generation.shard_count();
        Self {
            router: ShardRouter::new(generation),
            ceiling,
            assignments: HashMap::new(),
            files: vec![0; count],
            bytes: vec![0; count],
        }
    }

    /// Routes `key` and records an entry of `size_bytes` in its shard.
    ///
    /// Returns the assigned shard, or `RoutingError::DuplicateKey` if the key was
    /// already added.
    pub fn add(&mut self, key: &str, size_bytes: u64) -> Result<ShardId> {
        if let Some(&shard) = self.assignments.get(key) {
            return Err(RoutingError::DuplicateKey {
                key: key.to_string(),
                shard,
            });
        }

        let shard = self.router.shard_for_key(key);
        self.assignments.insert(key.to_string(), shard);
        self.files[shard.index()] += 1;
        self.bytes[shard.index()] += size_bytes;
        Ok(shard)
    }

    /// Returns the shard a key was assigned to, if it has been added.
    pub fn shard_of(&self, key: &str) -> Option<ShardId> {
        self.assignments.get(key).copied()
    }

    /// Number of keys added so far.
    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    /// Returns true if no keys have been added.
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Builds the distribution report.
    pub fn report(&self) -> PartitionReport {
        let generation = self.router.generation();
        let mut shards: Vec<ShardLoad> = generation
            .shards()
            .map(|shard| {
                let files = self.files[shard.index()];
                let bytes = self.bytes[shard.index()];
                ShardLoad {
                    shard: shard.name().to_string(),
                    files,
                    bytes,
                    over_ceiling: files > self.ceiling.max_files || bytes > self.ceiling.max_bytes,
                }
            })
            .collect();

        // stable sort keeps table order among equal counts
        shards.sort_by(|a, b| b.files.cmp(&a.files));

        let violations = shards.iter().filter(|s| s.over_ceiling).count();
        for load in shards.iter().filter(|s| s.over_ceiling) {
            tracing::warn!(
                "shard {} exceeds ceiling: {} files, {} bytes",
                load.shard,
                load.files,
                load.bytes
            );
        }

        PartitionReport {
            generation,
            total_files: self.files.iter().sum(),
            total_bytes: self.bytes.iter().sum(),
            shards,
            violations,
        }
    }
}
