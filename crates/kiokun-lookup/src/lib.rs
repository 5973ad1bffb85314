#![warn(missing_docs)]

//! Kiokun lookup subsystem: shard addressing, fetch backends, entry decoding, redirect resolution

pub mod address;
pub mod cache;
pub mod client;
pub mod config;
pub mod entry;
pub mod error;
pub mod fetch;

pub use address::{safe_filename, AddressPolicy, CdnLayout, LocalLayout};
pub use cache::{CachedLookup, LookupCacheConfig, LookupCacheStats};
pub use client::{LookupClient, LookupOutcome, Resolved};
pub use config::{CacheConfig, LookupConfig, SourceConfig};
pub use entry::{ContentEntry, DecodeError, Entry, EntryDecoder, JsonEntryDecoder};
pub use error::{FetchError, LookupError, Result};
pub use fetch::{Fetcher, FsFetcher, HttpFetcher, MemoryFetcher};
