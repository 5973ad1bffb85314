//! Core routing types: classification, shard-set generations, shard ids, errors.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Distribution-relevant features of a lookup key.
///
/// Derived on demand by [`crate::classify`]; never stored alongside entries.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Classification {
    /// Number of code points inside the recognized CJK Unified Ideograph ranges
    pub ideograph_count: usize,
    /// True if any code point is Hiragana or Katakana
    pub has_kana: bool,
    /// Total number of code points in the key
    pub length: usize,
}

/// A named version of the routing scheme.
///
/// A deployment targets exactly one generation; switching generations means
/// rebuilding the whole corpus under the new one.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShardSetGeneration {
    /// Four shards split purely by ideograph count. Deprecated.
    Coarse,
    /// Twenty-seven shards stratified by ideograph count and length with hash splits.
    #[default]
    Fine,
}

const COARSE_SHARDS: [&str; 4] = ["non-han", "han-1char", "han-2char", "han-3plus"];

const FINE_SHARDS: [&str; 27] = [
    "non-han-non-kana",
    "kana-1",
    "kana-2",
    "han1-len1-0",
    "han1-len1-1",
    "han1-len1-2",
    "han1-len1-3",
    "han1-len2",
    "han1-len3",
    "han1-len4plus",
    "han2-len2-low-0",
    "han2-len2-low-1",
    "han2-len2-mid-0",
    "han2-len2-mid-1",
    "han2-len2-high-0",
    "han2-len2-high-1",
    "han2-len3",
    "han2-len4",
    "han2-len5plus",
    "han3-len3-0",
    "han3-len3-1",
    "han3-len4",
    "han3-len5",
    "han3-len6plus",
    "han4plus-0",
    "han4plus-1",
    "han4plus-2",
];

impl ShardSetGeneration {
    /// All known generations, oldest first.
    pub const ALL: [ShardSetGeneration; 2] = [ShardSetGeneration::Coarse, ShardSetGeneration::Fine];

    /// Returns the stable name used in configuration files and on the command line
    pub fn name(&self) -> &'static str {
        match self {
            ShardSetGeneration::Coarse => "coarse",
            ShardSetGeneration::Fine => "fine",
        }
    }

    fn table(&self) -> &'static [&'static str] {
        match self {
            ShardSetGeneration::Coarse => &COARSE_SHARDS,
            ShardSetGeneration::Fine => &FINE_SHARDS,
        }
    }

    /// Number of shards in this generation's fixed set
    pub fn shard_count(&self) -> usize {
        self.table().len()
    }

    /// Enumerates every shard of this generation in a stable order
    pub fn shards(self) -> impl Iterator<Item = ShardId> {
        (0..self.shard_count()).map(move |i| ShardId::new(self, i as u8))
    }
}

impl fmt::Display for ShardSetGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ShardSetGeneration {
    type Err = RoutingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "coarse" => Ok(ShardSetGeneration::Coarse),
            "fine" => Ok(ShardSetGeneration::Fine),
            other => Err(RoutingError::UnknownGeneration(other.to_string())),
        }
    }
}

/// Identifies one shard within a generation's fixed set.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShardId {
    generation: ShardSetGeneration,
    index: u8,
}

impl ShardId {
    /// Creates a ShardId from a generation and a position in its shard table.
    ///
    /// Only the router and the generation's own enumeration construct these, so the
    /// index is always in range.
    pub(crate) fn new(generation: ShardSetGeneration, index: u8) -> Self {
        debug_assert!((index as usize) < generation.shard_count());
        ShardId { generation, index }
    }

    /// Looks up a shard by its published name
    pub fn from_name(generation: ShardSetGeneration, name: &str) -> Result<Self> {
        generation
            .table()
            .iter()
            .position(|n| *n == name)
            .map(|i| ShardId::new(generation, i as u8))
            .ok_or_else(|| RoutingError::UnknownShard {
                generation,
                name: name.to_string(),
            })
    }

    /// Returns the generation this shard belongs to
    pub fn generation(&self) -> ShardSetGeneration {
        self.generation
    }

    /// Returns the position of this shard in its generation's stable order
    pub fn index(&self) -> usize {
        self.index as usize
    }

    /// Returns the published shard name (directory / URL path segment)
    pub fn name(&self) -> &'static str {
        self.generation.table()[self.index as usize]
    }
}

impl fmt::Display for ShardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error types for the routing subsystem.
///
/// Classification and routing are total; these only arise when parsing names
/// or assembling a partition plan.
#[derive(Debug, thiserror::Error)]
pub enum RoutingError {
    /// The generation name is not one of the known shard-set generations.
    #[error("unknown shard-set generation: {0}")]
    UnknownGeneration(String),

    /// The shard name does not belong to the given generation.
    #[error("unknown shard {name} in generation {generation}")]
    UnknownShard {
        /// Generation that was searched
        generation: ShardSetGeneration,
        /// Name that was not found
        name: String,
    },

    /// The same key was added to a partition plan twice.
    #[error("key {key:?} already assigned to shard {shard}")]
    DuplicateKey {
        /// The repeated key
        key: String,
        /// Shard the key was first assigned to
        shard: ShardId,
    },
}

/// Result type alias using RoutingError as the error type.
pub type Result<T> = std::result::Result<T, RoutingError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_shard_counts() {
        assert_eq!(ShardSetGeneration::Coarse.shard_count(), 4);
        assert_eq!(ShardSetGeneration::Fine.shard_count(), 27);
    }

    #[test]
    fn test_shard_names_unique() {
        for generation in ShardSetGeneration::ALL {
            let names: HashSet<_> = generation.shards().map(|s| s.name()).collect();
            assert_eq!(names.len(), generation.shard_count());
        }
    }

    #[test]
    fn test_from_name_round_trip() {
        for generation in ShardSetGeneration::ALL {
            for shard in generation.shards() {
                let parsed = ShardId::from_name(generation, shard.name()).unwrap();
                assert_eq!(parsed, shard);
            }
        }
    }

    #[test]
    fn test_from_name_wrong_generation() {
        let err = ShardId::from_name(ShardSetGeneration::Fine, "han-1char").unwrap_err();
        assert!(matches!(err, RoutingError::UnknownShard { .. }));
        assert_eq!(err.to_string(), "unknown shard han-1char in generation fine");
    }

    #[test]
    fn test_generation_parse() {
        assert_eq!("fine".parse::<ShardSetGeneration>().unwrap(), ShardSetGeneration::Fine);
        assert_eq!(" Coarse ".parse::<ShardSetGeneration>().unwrap(), ShardSetGeneration::Coarse);
        assert!(matches!(
            "medium".parse::<ShardSetGeneration>(),
            Err(RoutingError::UnknownGeneration(_))
        ));
    }

    #[test]
    fn test_generation_default_is_fine() {
        assert_eq!(ShardSetGeneration::default(), ShardSetGeneration::Fine);
    }

    #[test]
    fn test_generation_serde_lowercase() {
        let json = serde_json::to_string(&ShardSetGeneration::Coarse).unwrap();
        assert_eq!(json, "\"coarse\"");
        let decoded: ShardSetGeneration = serde_json::from_str("\"fine\"").unwrap();
        assert_eq!(decoded, ShardSetGeneration::Fine);
    }

    #[test]
    fn test_shard_display() {
        let shard = ShardId::from_name(ShardSetGeneration::Coarse, "han-2char").unwrap();
        assert_eq!(shard.to_string(), "han-2char");
        assert_eq!(shard.index(), 2);
        assert_eq!(shard.generation(), ShardSetGeneration::Coarse);
    }
}
