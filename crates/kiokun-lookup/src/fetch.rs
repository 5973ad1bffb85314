//! Fetch backends.
//!
//! The lookup client only needs "bytes, not found, or failure" from an address.
//! HTTP serves the published CDN layout, the filesystem backend serves locally
//! separated shards, and the in-memory backend serves fixtures.

use std::io::ErrorKind;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use reqwest::StatusCode;

use crate::error::{FetchError, LookupError};

/// Retrieves the raw document stored at an address.
///
/// Implementations do not retry; retry and backoff belong in a wrapper.
#[async_trait]
pub trait Fetcher: Send + Sync + 'static {
    /// Fetch the document at `address`.
    ///
    /// # Returns
    /// The raw payload, `FetchError::NotFound` if no document exists, or another
    /// `FetchError` for transport failures and cancellations.
    async fn fetch(&self, address: &str) -> Result<Bytes, FetchError>;
}

/// HTTP(S) backend using a shared reqwest client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Creates a fetcher whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, LookupError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LookupError::Config {
                reason: format!("failed to build HTTP client: {}", e),
            })?;
        Ok(Self { client })
    }

    /// Wraps an existing client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, address: &str) -> Result<Bytes, FetchError> {
        let response = self
            .client
            .get(address)
            .send()
            .await
            .map_err(|e| http_failure(address, e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
            return Err(FetchError::NotFound {
                address: address.to_string(),
            });
        }
        if !status.is_success() {
            return Err(FetchError::Transport {
                address: address.to_string(),
                reason: format!("HTTP {}", status),
            });
        }

        response.bytes().await.map_err(|e| http_failure(address, e))
    }
}

fn http_failure(address: &str, e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Cancelled {
            address: address.to_string(),
            reason: "request timed out".to_string(),
        }
    } else {
        FetchError::Transport {
            address: address.to_string(),
            reason: e.to_string(),
        }
    }
}

/// Local filesystem backend. Addresses are file paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsFetcher;

#[async_trait]
impl Fetcher for FsFetcher {
    async fn fetch(&self, address: &str) -> Result<Bytes, FetchError> {
        match tokio::fs::read(address).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(FetchError::NotFound {
                address: address.to_string(),
            }),
            Err(e) => Err(FetchError::Transport {
                address: address.to_string(),
                reason: e.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
enum Stored {
    Document(Bytes),
    Failure(String),
}

/// In-memory backend keyed by address. Counts every fetch it serves.
#[derive(Debug, Default)]
pub struct MemoryFetcher {
    documents: DashMap<String, Stored>,
    fetches: AtomicUsize,
}

impl MemoryFetcher {
    /// Creates an empty fetcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a document at `address`.
    pub fn insert(&self, address: impl Into<String>, payload: impl Into<Bytes>) {
        self.documents
            .insert(address.into(), Stored::Document(payload.into()));
    }

    /// Makes every fetch of `address` fail with a transport error.
    pub fn insert_failure(&self, address: impl Into<String>, reason: impl Into<String>) {
        self.documents
            .insert(address.into(), Stored::Failure(reason.into()));
    }

    /// Removes whatever is stored at `address`.
    pub fn remove(&self, address: &str) {
        self.documents.remove(address);
    }

    /// Number of fetches served so far, including misses and failures.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for MemoryFetcher {
    async fn fetch(&self, address: &str) -> Result<Bytes, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let stored = self.documents.get(address).map(|s| s.value().clone());
        match stored {
            Some(Stored::Document(payload)) => Ok(payload),
            Some(Stored::Failure(reason)) => Err(FetchError::Transport {
                address: address.to_string(),
                reason,
            }),
            None => Err(FetchError::NotFound {
                address: address.to_string(),
            }),
        }
    }
}
