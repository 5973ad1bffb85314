//! Address construction: where a key's document lives once its shard is known.

use std::fmt::Write;
use std::path::{Path, PathBuf};

use kiokun_routing::ShardId;

/// Maps a (shard, key) pair to a fetchable address.
pub trait AddressPolicy: Send + Sync {
    /// Returns the address of `key`'s document inside `shard`.
    fn address(&self, shard: ShardId, key: &str) -> String;
}

/// CDN layout: `{base}/{shard}/{urlencode(key)}.json`.
#[derive(Debug, Clone)]
pub struct CdnLayout {
    base_url: String,
}

impl CdnLayout {
    /// Creates a layout rooted at `base_url`. A trailing slash is ignored.
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Returns the normalized base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl AddressPolicy for CdnLayout {
    fn address(&self, shard: ShardId, key: &str) -> String {
        format!(
            "{}/{}/{}.json",
            self.base_url,
            shard.name(),
            urlencoding::encode(key)
        )
    }
}

/// Filesystem layout: `{root}/{shard}/{safe_filename(key)}.json`.
///
/// The shard separation tool writes with the same layout, so local lookups and
/// the build agree on paths.
#[derive(Debug, Clone)]
pub struct LocalLayout {
    root: PathBuf,
}

impl LocalLayout {
    /// Creates a layout rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the layout root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the directory holding every document of `shard`.
    pub fn shard_dir(&self, shard: ShardId) -> PathBuf {
        self.root.join(shard.name())
    }

    /// Returns the file path of `key`'s document inside `shard`.
    pub fn path_for(&self, shard: ShardId, key: &str) -> PathBuf {
        self.shard_dir(shard)
            .join(format!("{}.json", safe_filename(key)))
    }
}

impl AddressPolicy for LocalLayout {
    fn address(&self, shard: ShardId, key: &str) -> String {
        self.path_for(shard, key).to_string_lossy().into_owned()
    }
}

/// Escapes characters that are unsafe in file names as `%XX` UTF-8 bytes.
///
/// `%` is escaped as well, so distinct keys always map to distinct names.
pub fn safe_filename(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for c in key.chars() {
        let escape = c.is_control()
            || matches!(c, '%' | '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|');
        if escape {
            let mut buf = [0u8; 4];
            for b in c.encode_utf8(&mut buf).bytes() {
                let _ = write!(out, "%{:02X}", b);
            }
        } else {
            out.push(c);
        }
    }
    out
}
