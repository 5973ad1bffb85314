//! Deterministic shard routing.
//!
//! Maps a key to exactly one shard of a shard-set generation. The mapping is a pure
//! function of the key and the generation: no shared state, no central index.

use crate::classify::{classify, first_ideograph};
use crate::hash::stable_hash;
use crate::types::*;

// Positions in the fine generation's shard table (see `types::FINE_SHARDS`).
const NON_HAN_NON_KANA: u8 = 0;
const KANA_EARLY: u8 = 1;
const KANA_LATE: u8 = 2;
const HAN1_LEN1: u8 = 3; // 4 hash buckets
const HAN1_LEN2: u8 = 7;
const HAN1_LEN3: u8 = 8;
const HAN1_LEN4_PLUS: u8 = 9;
const HAN2_LEN2: u8 = 10; // 3 bands x 2 hash buckets
const HAN2_LEN3: u8 = 16;
const HAN2_LEN4: u8 = 17;
const HAN2_LEN5_PLUS: u8 = 18;
const HAN3_LEN3: u8 = 19; // 2 hash buckets
const HAN3_LEN4: u8 = 21;
const HAN3_LEN5: u8 = 22;
const HAN3_LEN6_PLUS: u8 = 23;
const HAN4_PLUS: u8 = 24; // 3 hash buckets

/// Last code point routed to the first kana shard: hiragana and early katakana.
const KANA_SPLIT: u32 = 0x30B4;

/// Routes keys to shards of a single, fixed shard-set generation.
///
/// Holds no mutable state and is freely shareable across threads. The build
/// tooling and the lookup client each construct their own router for the
/// deployment's generation and are guaranteed to agree.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ShardRouter {
    generation: ShardSetGeneration,
}

impl ShardRouter {
    /// Creates a router for the given generation.
    pub fn new(generation: ShardSetGeneration) -> Self {
        Self { generation }
    }

    /// Returns the generation this router targets.
    pub fn generation(&self) -> ShardSetGeneration {
        self.generation
    }

    /// Returns the shard that owns `key`.
    pub fn shard_for_key(&self, key: &str) -> ShardId {
        route(key, self.generation)
    }
}

impl Default for ShardRouter {
    fn default() -> Self {
        Self::new(ShardSetGeneration::default())
    }
}

/// Returns the shard that owns `key` under `generation`. Total and deterministic.
pub fn route(key: &str, generation: ShardSetGeneration) -> ShardId {
    let class = classify(key);
    let index = match generation {
        ShardSetGeneration::Coarse => coarse_index(&class),
        ShardSetGeneration::Fine => fine_index(key, &class),
    };
    ShardId::new(generation, index)
}

fn coarse_index(class: &Classification) -> u8 {
    match class.ideograph_count {
        0 => 0,
        1 => 1,
        2 => 2,
        _ => 3,
    }
}

fn fine_index(key: &str, class: &Classification) -> u8 {
    let bucket = |n: u32| (stable_hash(key) % n) as u8;

    match (class.ideograph_count, class.length) {
        (0, _) if !class.has_kana => NON_HAN_NON_KANA,
        (0, _) => {
            // has_kana guarantees at least one char
            let first = key.chars().next().map_or(0, u32::from);
            if first <= KANA_SPLIT {
                KANA_EARLY
            } else {
                KANA_LATE
            }
        }
        (1, 1) => HAN1_LEN1 + bucket(4),
        (1, 2) => HAN1_LEN2,
        (1, 3) => HAN1_LEN3,
        (1, _) => HAN1_LEN4_PLUS,
        (2, 2) => HAN2_LEN2 + 2 * band(first_ideograph(key)) + bucket(2),
        (2, 3) => HAN2_LEN3,
        (2, 4) => HAN2_LEN4,
        (2, _) => HAN2_LEN5_PLUS,
        (3, 3) => HAN3_LEN3 + bucket(2),
        (3, 4) => HAN3_LEN4,
        (3, 5) => HAN3_LEN5,
        (3, _) => HAN3_LEN6_PLUS,
        _ => HAN4_PLUS + bucket(3),
    }
}

/// Unicode band of a two-ideograph word's first ideograph: 0 (U+4E00-5FFF),
/// 1 (U+6000-7FFF) or 2 (everything else, including extension planes).
fn band(first: Option<char>) -> u8 {
    match first.map(u32::from) {
        Some(0x4E00..=0x5FFF) => 0,
        Some(0x6000..=0x7FFF) => 1,
        _ => 2,
    }
}
