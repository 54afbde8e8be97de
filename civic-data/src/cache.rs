//! Content-addressable store of raw HTTP response bodies.
//!
//! Each entry lives in its own file named by the [`CacheKey`] of the request
//! URL. Entries are written atomically and never expire; a caller replaces
//! one only by fetching the same URL again with a forced refresh.

use std::{fmt, io};

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::fs_utf8::Dir;
use log::{debug, warn};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Deterministic digest of a request URL.
///
/// The key is the lowercase hex SHA-256 of the exact URL bytes, so the same
/// URL maps to the same entry across runs and processes.
///
/// # Examples
/// ```
/// use civic_data::cache::CacheKey;
///
/// let key = CacheKey::for_url("https://data.example.org/resource/abcd.json?");
/// assert_eq!(key.as_str().len(), 64);
/// assert_eq!(key, CacheKey::for_url("https://data.example.org/resource/abcd.json?"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Hash `url` into a cache key.
    pub fn for_url(url: &str) -> Self {
        let digest = Sha256::digest(url.as_bytes());
        Self(hex::encode(digest))
    }

    /// Hex form of the key, also used as the entry file name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Errors raised by [`FetchCache`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CacheError {
    /// The cache directory could not be created or opened.
    #[error("failed to open cache directory {path}: {source}")]
    Open {
        /// Cache root that was requested.
        path: Utf8PathBuf,
        /// Underlying filesystem error.
        source: io::Error,
    },
    /// An entry could not be written.
    #[error("failed to write cache entry {path}: {source}")]
    Write {
        /// Final location of the entry.
        path: Utf8PathBuf,
        /// Underlying filesystem error.
        source: io::Error,
    },
}

/// Directory of cached response bodies keyed by [`CacheKey`].
pub struct FetchCache {
    root: Utf8PathBuf,
    dir: Dir,
}

impl fmt::Debug for FetchCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchCache")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl FetchCache {
    /// Open the cache rooted at `root`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Open`] when the directory cannot be created or
    /// opened.
    pub fn open(root: impl Into<Utf8PathBuf>) -> Result<Self, CacheError> {
        let root = root.into();
        let dir = civic_fs::open_or_create_dir(&root).map_err(|source| CacheError::Open {
            path: root.clone(),
            source,
        })?;
        Ok(Self { root, dir })
    }

    /// Directory holding the entries.
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Location of the entry for `key`, whether or not it exists.
    pub fn path_for(&self, key: &CacheKey) -> Utf8PathBuf {
        self.root.join(key.as_str())
    }

    /// Return the stored body for `key`.
    ///
    /// An entry that exists but cannot be read is logged and reported as
    /// absent so the caller refetches it.
    pub fn read(&self, key: &CacheKey) -> Option<Vec<u8>> {
        match civic_fs::read_if_present(&self.dir, key.as_str()) {
            Ok(Some(bytes)) => {
                debug!("cache hit {key} ({} bytes)", bytes.len());
                Some(bytes)
            }
            Ok(None) => None,
            Err(err) => {
                warn!(
                    "unreadable cache entry {}; treating as a miss: {err}",
                    self.path_for(key)
                );
                None
            }
        }
    }

    /// Whether an entry exists for `key`.
    pub fn contains(&self, key: &CacheKey) -> bool {
        civic_fs::is_file(&self.dir, key.as_str()).unwrap_or(false)
    }

    /// Store `bytes` under `key`, replacing any previous entry atomically.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Write`] when the entry cannot be staged or moved
    /// into place; any previous entry is left untouched in that case.
    pub fn write(&self, key: &CacheKey, bytes: &[u8]) -> Result<(), CacheError> {
        civic_fs::write_atomic(&self.dir, key.as_str(), bytes).map_err(|source| {
            CacheError::Write {
                path: self.path_for(key),
                source,
            }
        })?;
        debug!("cached {} bytes under {key}", bytes.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    #[fixture]
    fn cache_dir() -> TempDir {
        TempDir::new().expect("create temp dir")
    }

    fn open_cache(dir: &TempDir) -> FetchCache {
        let root = Utf8PathBuf::from_path_buf(dir.path().join("http"))
            .expect("temp dir should be UTF-8");
        FetchCache::open(root).expect("open cache")
    }

    #[rstest]
    fn key_is_lowercase_sha256_hex() {
        let key = CacheKey::for_url("hello world");
        assert_eq!(
            key.as_str(),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[rstest]
    fn distinct_urls_produce_distinct_keys() {
        let first = CacheKey::for_url("https://example.org/a.json?$offset=0");
        let second = CacheKey::for_url("https://example.org/a.json?$offset=1");
        assert_ne!(first, second);
    }

    #[rstest]
    fn read_after_write_round_trips(cache_dir: TempDir) {
        let cache = open_cache(&cache_dir);
        let key = CacheKey::for_url("https://example.org/a.json");
        assert_eq!(cache.read(&key), None);
        assert!(!cache.contains(&key));

        cache.write(&key, b"[{\"a\":\"1\"}]").expect("write entry");

        assert!(cache.contains(&key));
        assert_eq!(cache.read(&key).as_deref(), Some(&b"[{\"a\":\"1\"}]"[..]));
        assert!(cache.path_for(&key).as_std_path().is_file());
    }

    #[rstest]
    fn rewriting_replaces_the_entry(cache_dir: TempDir) {
        let cache = open_cache(&cache_dir);
        let key = CacheKey::for_url("https://example.org/a.json");
        cache.write(&key, b"old").expect("first write");
        cache.write(&key, b"new").expect("second write");
        assert_eq!(cache.read(&key).as_deref(), Some(&b"new"[..]));
    }

    #[rstest]
    fn entries_persist_across_handles(cache_dir: TempDir) {
        let key = CacheKey::for_url("https://example.org/persist.json");
        open_cache(&cache_dir)
            .write(&key, b"kept")
            .expect("write entry");
        let reopened = open_cache(&cache_dir);
        assert_eq!(reopened.read(&key).as_deref(), Some(&b"kept"[..]));
    }

    #[rstest]
    fn unreadable_entry_reads_as_a_miss(cache_dir: TempDir) {
        let cache = open_cache(&cache_dir);
        let key = CacheKey::for_url("https://example.org/blocked.json");
        std::fs::create_dir(cache.path_for(&key)).expect("block the entry with a directory");

        assert_eq!(cache.read(&key), None);
        assert!(!cache.contains(&key));
    }

    proptest! {
        #[test]
        fn keys_are_deterministic(url in ".*") {
            let first = CacheKey::for_url(&url);
            let second = CacheKey::for_url(&url);
            prop_assert_eq!(first.as_str().len(), 64);
            prop_assert_eq!(first, second);
        }
    }
}
