//! Common test utilities and fixtures for lookup integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use kiokun_lookup::{AddressPolicy, CdnLayout, FetchError, Fetcher, LookupClient, MemoryFetcher};
use kiokun_routing::{route, ShardSetGeneration};

pub const BASE: &str = "https://cdn.test/dict";

/// An in-memory corpus published under the CDN layout.
pub struct TestCorpus {
    pub generation: ShardSetGeneration,
    pub fetcher: Arc<MemoryFetcher>,
    layout: CdnLayout,
}

impl TestCorpus {
    pub fn new(generation: ShardSetGeneration) -> Self {
        Self {
            generation,
            fetcher: Arc::new(MemoryFetcher::new()),
            layout: CdnLayout::new(BASE),
        }
    }

    /// Address the build would publish `key` at
    pub fn address(&self, key: &str) -> String {
        self.layout.address(route(key, self.generation), key)
    }

    pub fn content(&self, key: &str, body: &str) {
        self.fetcher
            .insert(self.address(key), format!(r#"{{"k":"{}",{}}}"#, key, body));
    }

    pub fn redirect(&self, key: &str, target: &str) {
        self.fetcher
            .insert(self.address(key), format!(r#"{{"k":"{}","r":"{}"}}"#, key, target));
    }

    pub fn raw(&self, key: &str, payload: &str) {
        self.fetcher.insert(self.address(key), payload.to_string());
    }

    pub fn broken(&self, key: &str, reason: &str) {
        self.fetcher.insert_failure(self.address(key), reason);
    }

    pub fn client(&self) -> LookupClient {
        LookupClient::new(
            self.generation,
            Arc::new(self.layout.clone()),
            self.fetcher.clone(),
        )
    }

    pub fn fetches(&self) -> usize {
        self.fetcher.fetch_count()
    }
}

/// A fetcher that never completes, for cancellation tests.
#[derive(Default)]
pub struct StallingFetcher {
    pub started: AtomicUsize,
}

#[async_trait]
impl Fetcher for StallingFetcher {
    async fn fetch(&self, _address: &str) -> Result<Bytes, FetchError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }
}
