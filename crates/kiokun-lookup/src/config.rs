//! Lookup client configuration

use std::path::{Path, PathBuf};
use std::time::Duration;

use kiokun_routing::ShardSetGeneration;
use serde::{Deserialize, Serialize};

use crate::error::{LookupError, Result};

/// Where shard documents are read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceConfig {
    /// Published CDN layout
    Http {
        /// Base URL the shard directories live under
        base_url: String,
    },
    /// Locally separated shards
    Fs {
        /// Directory the shard directories live under
        root: PathBuf,
    },
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig::Fs {
            root: PathBuf::from("shards"),
        }
    }
}

/// Settings for the optional cache in front of the lookup client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Whether lookups go through the cache
    pub enabled: bool,
    /// Seconds a cached outcome stays valid
    pub ttl_secs: u64,
    /// Maximum number of cached outcomes
    pub max_entries: usize,
    /// Whether "no such entry" outcomes are cached too
    pub cache_not_found: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ttl_secs: 300,
            max_entries: 8192,
            cache_not_found: true,
        }
    }
}

/// Lookup client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    /// Shard-set generation the corpus was built with
    pub generation: ShardSetGeneration,
    /// Document source
    pub source: SourceConfig,
    /// HTTP request timeout in milliseconds
    pub timeout_ms: u64,
    /// Default tracing filter when RUST_LOG is unset
    pub log_level: String,
    /// Cache settings
    pub cache: CacheConfig,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            generation: ShardSetGeneration::default(),
            source: SourceConfig::default(),
            timeout_ms: 10_000,
            log_level: "info".to_string(),
            cache: CacheConfig::default(),
        }
    }
}

impl LookupConfig {
    /// Loads a configuration from a `.toml` or `.json` file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| LookupError::Config {
            reason: format!("cannot read {}: {}", path.display(), e),
        })?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();

        let config: LookupConfig = match ext.to_lowercase().as_str() {
            "toml" => toml::from_str(&contents).map_err(|e| LookupError::Config {
                reason: format!("invalid TOML in {}: {}", path.display(), e),
            })?,
            "json" => serde_json::from_str(&contents).map_err(|e| LookupError::Config {
                reason: format!("invalid JSON in {}: {}", path.display(), e),
            })?,
            _ => {
                return Err(LookupError::Config {
                    reason: format!("unsupported config file extension: {}", ext),
                })
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// HTTP request timeout as a Duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Rejects configurations the client cannot run with.
    pub fn validate(&self) -> Result<()> {
        match &self.source {
            SourceConfig::Http { base_url } if base_url.trim().is_empty() => {
                return Err(LookupError::Config {
                    reason: "http source requires a base_url".to_string(),
                });
            }
            SourceConfig::Fs { root } if root.as_os_str().is_empty() => {
                return Err(LookupError::Config {
                    reason: "fs source requires a root directory".to_string(),
                });
            }
            _ => {}
        }

        if self.timeout_ms == 0 {
            return Err(LookupError::Config {
                reason: "timeout_ms must be greater than 0".to_string(),
            });
        }

        if self.cache.enabled && self.cache.max_entries == 0 {
            return Err(LookupError::Config {
                reason: "cache.max_entries must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}
