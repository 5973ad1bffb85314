//! Lookup client.
//!
//! Resolves a key to its entry: route to a shard, build the address, fetch, decode,
//! and follow at most one redirect through the same router. The build guarantees
//! redirect chains of length one, so a second redirect is reported as a loop.

use std::sync::Arc;

use kiokun_routing::{ShardId, ShardRouter, ShardSetGeneration};
use tokio_util::sync::CancellationToken;

use crate::address::{AddressPolicy, CdnLayout, LocalLayout};
use crate::config::{LookupConfig, SourceConfig};
use crate::entry::{ContentEntry, Entry, EntryDecoder, JsonEntryDecoder};
use crate::error::{FetchError, LookupError, Result};
use crate::fetch::{Fetcher, FsFetcher, HttpFetcher};

/// A successfully resolved entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    /// Key whose document holds the content (the redirect target, if redirected)
    pub key: String,
    /// Shard the content was read from
    pub shard: ShardId,
    /// Key originally requested, if it was a redirect
    pub redirected_from: Option<String>,
    /// The content
    pub entry: ContentEntry,
}

/// Result of a lookup that completed without a system failure.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    /// The entry exists
    Found(Resolved),
    /// No document exists for the key (or for the key a redirect named)
    NotFound {
        /// Key whose address had no document
        key: String,
        /// Shard that was searched
        shard: ShardId,
    },
}

impl LookupOutcome {
    /// Returns the resolved entry, if found.
    pub fn found(&self) -> Option<&Resolved> {
        match self {
            LookupOutcome::Found(resolved) => Some(resolved),
            LookupOutcome::NotFound { .. } => None,
        }
    }

    /// Returns true if the outcome is `NotFound`.
    pub fn is_not_found(&self) -> bool {
        matches!(self, LookupOutcome::NotFound { .. })
    }
}

/// Outcome of resolving a single key without following redirects.
enum Hop {
    Missing(ShardId),
    Content(ShardId, ContentEntry),
    Redirect(String),
}

/// Resolves keys against a sharded corpus.
///
/// Holds only read-only, shared handles; clones are cheap and concurrent lookups
/// are independent.
#[derive(Clone)]
pub struct LookupClient {
    router: ShardRouter,
    layout: Arc<dyn AddressPolicy>,
    fetcher: Arc<dyn Fetcher>,
    decoder: Arc<dyn EntryDecoder>,
}

impl std::fmt::Debug for LookupClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LookupClient")
            .field("generation", &self.router.generation())
            .finish_non_exhaustive()
    }
}

impl LookupClient {
    /// Creates a client for a corpus built with `generation`, decoding the
    /// published JSON shape.
    pub fn new(
        generation: ShardSetGeneration,
        layout: Arc<dyn AddressPolicy>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        Self {
            router: ShardRouter::new(generation),
            layout,
            fetcher,
            decoder: Arc::new(JsonEntryDecoder),
        }
    }

    /// Replaces the payload decoder.
    pub fn with_decoder(mut self, decoder: Arc<dyn EntryDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    /// Builds a client from configuration: HTTP for CDN sources, filesystem for
    /// local shard directories.
    pub fn from_config(config: &LookupConfig) -> Result<Self> {
        config.validate()?;
        let client = match &config.source {
            SourceConfig::Http { base_url } => Self::new(
                config.generation,
                Arc::new(CdnLayout::new(base_url)),
                Arc::new(HttpFetcher::new(config.timeout())?),
            ),
            SourceConfig::Fs { root } => Self::new(
                config.generation,
                Arc::new(LocalLayout::new(root.clone())),
                Arc::new(FsFetcher),
            ),
        };
        Ok(client)
    }

    /// Returns the shard-set generation this client routes with.
    pub fn generation(&self) -> ShardSetGeneration {
        self.router.generation()
    }

    /// Returns the shard and address `key` would be fetched from.
    pub fn locate(&self, key: &str) -> (ShardId, String) {
        let shard = self.router.shard_for_key(key);
        let address = self.layout.address(shard, key);
        (shard, address)
    }

    /// Looks up `key`, following at most one redirect.
    ///
    /// Returns `LookupOutcome::NotFound` when no document exists; transport,
    /// decode, redirect-loop and cancellation failures are errors.
    pub async fn lookup(&self, key: &str) -> Result<LookupOutcome> {
        match self.resolve_once(key).await? {
            Hop::Missing(shard) => Ok(LookupOutcome::NotFound {
                key: key.to_string(),
                shard,
            }),
            Hop::Content(shard, entry) => Ok(LookupOutcome::Found(Resolved {
                key: key.to_string(),
                shard,
                redirected_from: None,
                entry,
            })),
            Hop::Redirect(target) => {
                tracing::debug!("key {:?} redirects to {:?}", key, target);
                match self.resolve_once(&target).await? {
                    Hop::Missing(shard) => {
                        tracing::warn!(
                            "redirect from {:?} names missing key {:?} in shard {}",
                            key,
                            target,
                            shard
                        );
                        Ok(LookupOutcome::NotFound { key: target, shard })
                    }
                    Hop::Content(shard, entry) => Ok(LookupOutcome::Found(Resolved {
                        key: target,
                        shard,
                        redirected_from: Some(key.to_string()),
                        entry,
                    })),
                    Hop::Redirect(next) => {
                        tracing::warn!(
                            "redirect chain longer than one hop: {:?} -> {:?} -> {:?}",
                            key,
                            target,
                            next
                        );
                        Err(LookupError::RedirectLoop {
                            origin: key.to_string(),
                            target,
                            next,
                        })
                    }
                }
            }
        }
    }

    /// Looks up `key`, abandoning the in-flight fetch if `token` is cancelled.
    pub async fn lookup_cancellable(
        &self,
        key: &str,
        token: &CancellationToken,
    ) -> Result<LookupOutcome> {
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(LookupError::Cancelled {
                key: key.to_string(),
                reason: "cancelled by caller".to_string(),
            }),
            outcome = self.lookup(key) => outcome,
        }
    }

    async fn resolve_once(&self, key: &str) -> Result<Hop> {
        let (shard, address) = self.locate(key);
        tracing::debug!("fetching {:?} from shard {} at {}", key, shard, address);

        let payload = match self.fetcher.fetch(&address).await {
            Ok(payload) => payload,
            Err(FetchError::NotFound { .. }) => return Ok(Hop::Missing(shard)),
            Err(FetchError::Transport { address, reason }) => {
                return Err(LookupError::Transport {
                    key: key.to_string(),
                    address,
                    reason,
                })
            }
            Err(FetchError::Cancelled { reason, .. }) => {
                return Err(LookupError::Cancelled {
                    key: key.to_string(),
                    reason,
                })
            }
        };

        match self.decoder.decode(&payload) {
            Ok(Entry::Content(entry)) => Ok(Hop::Content(shard, entry)),
            Ok(Entry::Redirect { target }) => Ok(Hop::Redirect(target)),
            Err(e) => Err(LookupError::Decode {
                key: key.to_string(),
                address,
                reason: e.reason,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::MemoryFetcher;
    use kiokun_routing::route;

    const GEN: ShardSetGeneration = ShardSetGeneration::Fine;

    fn client_with(fetcher: Arc<MemoryFetcher>) -> LookupClient {
        LookupClient::new(GEN, Arc::new(CdnLayout::new("mem://dict")), fetcher)
    }

    fn address(key: &str) -> String {
        CdnLayout::new("mem://dict").address(route(key, GEN), key)
    }

    #[tokio::test]
    async fn test_lookup_content() {
        let fetcher = Arc::new(MemoryFetcher::new());
        fetcher.insert(address("好"), r#"{"k":"好","cc":{"sc":6}}"#);
        let client = client_with(fetcher.clone());

        let outcome = client.lookup("好").await.unwrap();
        let resolved = outcome.found().unwrap();
        assert_eq!(resolved.key, "好");
        assert_eq!(resolved.shard, route("好", GEN));
        assert_eq!(resolved.redirected_from, None);
        assert_eq!(resolved.entry.key.as_deref(), Some("好"));
        assert_eq!(fetcher.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_lookup_not_found() {
        let fetcher = Arc::new(MemoryFetcher::new());
        let client = client_with(fetcher);

        let outcome = client.lookup("不存在").await.unwrap();
        assert!(outcome.is_not_found());
        assert_eq!(
            outcome,
            LookupOutcome::NotFound {
                key: "不存在".to_string(),
                shard: route("不存在", GEN),
            }
        );
    }

    #[tokio::test]
    async fn test_lookup_transport_error_is_not_not_found() {
        let fetcher = Arc::new(MemoryFetcher::new());
        fetcher.insert_failure(address("好"), "connection reset");
        let client = client_with(fetcher);

        let err = client.lookup("好").await.unwrap_err();
        assert!(matches!(err, LookupError::Transport { ref key, .. } if key == "好"));
    }

    #[tokio::test]
    async fn test_lookup_decode_error() {
        let fetcher = Arc::new(MemoryFetcher::new());
        fetcher.insert(address("好"), "[1,2,3]");
        let client = client_with(fetcher);

        let err = client.lookup("好").await.unwrap_err();
        assert!(matches!(err, LookupError::Decode { .. }));
        assert!(err.is_data_defect());
    }

    #[tokio::test]
    async fn test_locate_uses_layout() {
        let client = client_with(Arc::new(MemoryFetcher::new()));
        let (shard, addr) = client.locate("日本");
        assert_eq!(shard.name(), "han2-len2-mid-1");
        assert_eq!(addr, "mem://dict/han2-len2-mid-1/%E6%97%A5%E6%9C%AC.json");
        assert_eq!(client.generation(), GEN);
    }

    #[tokio::test]
    async fn test_from_config_fs() {
        let dir = tempfile::tempdir().unwrap();
        let config = LookupConfig {
            source: SourceConfig::Fs {
                root: dir.path().to_path_buf(),
            },
            ..LookupConfig::default()
        };
        let client = LookupClient::from_config(&config).unwrap();
        assert!(client.lookup("好").await.unwrap().is_not_found());
    }

    #[test]
    fn test_from_config_rejects_invalid() {
        let config = LookupConfig {
            timeout_ms: 0,
            ..LookupConfig::default()
        };
        assert!(LookupClient::from_config(&config).is_err());
    }
}
