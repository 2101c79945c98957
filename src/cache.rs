//! Blur placeholder cache for incremental runs.
//!
//! Sized derivatives are skipped by path: if the target file exists it is
//! left alone. The blur placeholder has no file of its own; it lives only in
//! the manifest. Without a cache, every re-run would decode every source
//! just to rebuild a 20×20 preview. This module remembers previews so an
//! unchanged re-run decodes nothing.
//!
//! ## Cache keys
//!
//! The cache is **content-addressed**: entries are keyed by
//! `"{source_hash}:{params_hash}"`, so renamed or re-slugged sources still
//! hit.
//!
//! - **`source_hash`**: SHA-256 of the source file contents. Content-based
//!   rather than mtime-based so it survives copies and checkouts.
//! - **`params_hash`**: SHA-256 of the preview box and quality. Changing
//!   `[images.preview]` invalidates every entry.
//!
//! ## Storage
//!
//! `<derivatives_dir>/.preview-cache.json`, next to the files it describes.
//! Entries not used by a run are pruned on save, and the file is only
//! rewritten when its contents change.
//!
//! ## Concurrency
//!
//! The renderer reads the cache from many workers but never writes it
//! during the parallel phase. New previews are returned with each record's
//! result and merged with [`PreviewCache::insert`] after the barrier.

use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Name of the cache file within the derivatives directory.
const CACHE_FILENAME: &str = ".preview-cache.json";

/// Bump to invalidate every existing cache when the format or key changes.
const CACHE_VERSION: u32 = 1;

/// On-disk preview cache: content key → `data:` URI.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PreviewCache {
    pub version: u32,
    pub entries: BTreeMap<String, String>,
    /// Set when entries were added or pruned since load. Never serialized.
    #[serde(skip)]
    dirty: bool,
}

impl PreviewCache {
    /// Empty cache (first run).
    pub fn empty() -> Self {
        Self {
            version: CACHE_VERSION,
            entries: BTreeMap::new(),
            dirty: false,
        }
    }

    /// Load from the derivatives directory. Returns an empty cache if the
    /// file doesn't exist or can't be parsed (version mismatch, corruption).
    pub fn load(dir: &Path) -> Self {
        let content = match std::fs::read_to_string(cache_path(dir)) {
            Ok(c) => c,
            Err(_) => return Self::empty(),
        };
        let cache: Self = match serde_json::from_str(&content) {
            Ok(c) => c,
            Err(_) => return Self::empty(),
        };
        if cache.version != CACHE_VERSION {
            return Self::empty();
        }
        cache
    }

    /// Write the cache if anything changed since load. Returns whether a
    /// write happened.
    pub fn save(&mut self, dir: &Path) -> io::Result<bool> {
        if !self.dirty {
            return Ok(false);
        }
        std::fs::create_dir_all(dir)?;
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(cache_path(dir), json)?;
        self.dirty = false;
        Ok(true)
    }

    pub fn get(&self, source_hash: &str, params_hash: &str) -> Option<&str> {
        self.entries
            .get(&content_key(source_hash, params_hash))
            .map(String::as_str)
    }

    pub fn insert(&mut self, source_hash: &str, params_hash: &str, data_uri: String) {
        let key = content_key(source_hash, params_hash);
        if self.entries.get(&key) != Some(&data_uri) {
            self.entries.insert(key, data_uri);
            self.dirty = true;
        }
    }

    /// Drop every entry whose key is not in `live`.
    pub fn prune(&mut self, live: &HashSet<String>) {
        let before = self.entries.len();
        self.entries.retain(|key, _| live.contains(key));
        if self.entries.len() != before {
            self.dirty = true;
        }
    }
}

/// `"{source_hash}:{params_hash}"`.
pub fn content_key(source_hash: &str, params_hash: &str) -> String {
    format!("{}:{}", source_hash, params_hash)
}

/// SHA-256 hash of a file's contents, returned as a hex string.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let bytes = std::fs::read(path)?;
    let digest = Sha256::digest(&bytes);
    Ok(format!("{:x}", digest))
}

/// SHA-256 hash of the preview parameters.
pub fn hash_preview_params(width: u32, height: u32, quality: u32) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"preview\0");
    hasher.update(width.to_le_bytes());
    hasher.update(height.to_le_bytes());
    hasher.update(quality.to_le_bytes());
    format!("{:x}", hasher.finalize())
}

/// Preview cache performance for one run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct CacheStats {
    pub hits: u32,
    pub misses: u32,
}

impl CacheStats {
    pub fn hit(&mut self) {
        self.hits += 1;
    }

    pub fn miss(&mut self) {
        self.misses += 1;
    }

    pub fn total(&self) -> u32 {
        self.hits + self.misses
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hits > 0 {
            write!(
                f,
                "{} cached, {} encoded ({} total)",
                self.hits,
                self.misses,
                self.total()
            )
        } else {
            write!(f, "{} encoded", self.misses)
        }
    }
}

/// Resolve the cache file path for a derivatives directory.
pub fn cache_path(dir: &Path) -> PathBuf {
    dir.join(CACHE_FILENAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    // =========================================================================
    // PreviewCache basics
    // =========================================================================

    #[test]
    fn empty_cache_has_no_entries() {
        let c = PreviewCache::empty();
        assert_eq!(c.version, CACHE_VERSION);
        assert!(c.entries.is_empty());
    }

    #[test]
    fn get_hit_and_miss() {
        let mut c = PreviewCache::empty();
        c.insert("src", "prm", "data:image/webp;base64,AAAA".into());
        assert_eq!(c.get("src", "prm"), Some("data:image/webp;base64,AAAA"));
        assert_eq!(c.get("src", "other"), None);
        assert_eq!(c.get("other", "prm"), None);
    }

    #[test]
    fn prune_keeps_live_keys() {
        let mut c = PreviewCache::empty();
        c.insert("a", "p", "A".into());
        c.insert("b", "p", "B".into());
        let live = HashSet::from([content_key("a", "p")]);
        c.prune(&live);
        assert_eq!(c.get("a", "p"), Some("A"));
        assert_eq!(c.get("b", "p"), None);
    }

    // =========================================================================
    // Save / Load
    // =========================================================================

    #[test]
    fn save_and_load_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let mut c = PreviewCache::empty();
        c.insert("s1", "p1", "one".into());
        assert!(c.save(tmp.path()).unwrap());

        let loaded = PreviewCache::load(tmp.path());
        assert_eq!(loaded.get("s1", "p1"), Some("one"));
    }

    #[test]
    fn unchanged_cache_is_not_rewritten() {
        let tmp = TempDir::new().unwrap();
        let mut c = PreviewCache::empty();
        c.insert("s1", "p1", "one".into());
        c.save(tmp.path()).unwrap();

        let mut loaded = PreviewCache::load(tmp.path());
        loaded.insert("s1", "p1", "one".into());
        loaded.prune(&HashSet::from([content_key("s1", "p1")]));
        assert!(!loaded.save(tmp.path()).unwrap());
    }

    #[test]
    fn empty_cache_save_writes_nothing() {
        let tmp = TempDir::new().unwrap();
        let mut c = PreviewCache::empty();
        assert!(!c.save(tmp.path()).unwrap());
        assert!(!cache_path(tmp.path()).exists());
    }

    #[test]
    fn load_missing_file_returns_empty() {
        let tmp = TempDir::new().unwrap();
        assert!(PreviewCache::load(tmp.path()).entries.is_empty());
    }

    #[test]
    fn load_corrupt_json_returns_empty() {
        let tmp = TempDir::new().unwrap();
        fs::write(cache_path(tmp.path()), "not json").unwrap();
        assert!(PreviewCache::load(tmp.path()).entries.is_empty());
    }

    #[test]
    fn load_wrong_version_returns_empty() {
        let tmp = TempDir::new().unwrap();
        let json = format!(
            r#"{{"version": {}, "entries": {{"h:p": "x"}}}}"#,
            CACHE_VERSION + 1
        );
        fs::write(cache_path(tmp.path()), json).unwrap();
        assert!(PreviewCache::load(tmp.path()).entries.is_empty());
    }

    // =========================================================================
    // Hash functions
    // =========================================================================

    #[test]
    fn hash_file_deterministic() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("test.bin");
        fs::write(&path, b"hello world").unwrap();

        let h1 = hash_file(&path).unwrap();
        assert_eq!(h1, hash_file(&path).unwrap());
        assert_eq!(h1.len(), 64);
    }

    #[test]
    fn hash_file_changes_with_content() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("test.bin");
        fs::write(&path, b"version 1").unwrap();
        let h1 = hash_file(&path).unwrap();
        fs::write(&path, b"version 2").unwrap();
        assert_ne!(h1, hash_file(&path).unwrap());
    }

    #[test]
    fn hash_preview_params_varies_with_each_input() {
        let base = hash_preview_params(20, 20, 20);
        assert_eq!(base, hash_preview_params(20, 20, 20));
        assert_ne!(base, hash_preview_params(30, 20, 20));
        assert_ne!(base, hash_preview_params(20, 30, 20));
        assert_ne!(base, hash_preview_params(20, 20, 30));
    }

    // =========================================================================
    // CacheStats
    // =========================================================================

    #[test]
    fn cache_stats_display_with_hits() {
        let s = CacheStats { hits: 5, misses: 2 };
        assert_eq!(format!("{}", s), "5 cached, 2 encoded (7 total)");
    }

    #[test]
    fn cache_stats_display_no_hits() {
        let s = CacheStats { hits: 0, misses: 3 };
        assert_eq!(format!("{}", s), "3 encoded");
    }
}
