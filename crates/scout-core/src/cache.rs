//! Persisted content cache.
//!
//! Maps each document path to the text extracted from its first page and the
//! modification time the document had at the time. The whole map is written
//! as one JSON document on every save.

use crate::error::{Result, ScoutError};
use crate::extract::Extraction;
use crate::persistence::write_json_atomic;
use crate::types::{CacheEntry, IndexedFile};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// File name of the content cache inside the cache directory
pub const CONTENT_FILE: &str = "content.json";

/// In-memory content cache bound to its backing file.
#[derive(Debug)]
pub struct ContentCache {
    path: PathBuf,
    entries: HashMap<String, CacheEntry>,
}

impl ContentCache {
    /// An empty cache that will be saved under `base_dir`.
    pub fn empty(base_dir: impl AsRef<Path>) -> Self {
        ContentCache {
            path: base_dir.as_ref().join(CONTENT_FILE),
            entries: HashMap::new(),
        }
    }

    /// Load the cache stored under `base_dir`.
    ///
    /// A missing file yields an empty cache. A file that fails to parse is
    /// reported as [`ScoutError::CacheCorrupted`].
    pub fn load_from(base_dir: impl AsRef<Path>) -> Result<Self> {
        let mut cache = Self::empty(base_dir);
        if !cache.path.exists() {
            debug!(path = %cache.path.display(), "No content cache yet");
            return Ok(cache);
        }

        let contents = fs::read_to_string(&cache.path)?;
        cache.entries =
            serde_json::from_str(&contents).map_err(|e| ScoutError::CacheCorrupted {
                reason: e.to_string(),
            })?;

        info!(
            path = %cache.path.display(),
            entries = cache.entries.len(),
            "Content cache loaded"
        );
        Ok(cache)
    }

    /// Load the cache, or start empty if it is missing or unreadable.
    ///
    /// Logs a warning if loading fails.
    pub fn open(base_dir: impl AsRef<Path>) -> Self {
        let base_dir = base_dir.as_ref();
        match Self::load_from(base_dir) {
            Ok(cache) => cache,
            Err(e) => {
                warn!(error = %e, "Failed to load content cache, starting empty");
                Self::empty(base_dir)
            }
        }
    }

    /// Write the whole cache to disk.
    pub fn save(&self) -> Result<()> {
        write_json_atomic(&self.path, &self.entries)?;
        debug!(
            path = %self.path.display(),
            entries = self.entries.len(),
            "Content cache saved"
        );
        Ok(())
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up the entry for a document path.
    pub fn get(&self, path: &str) -> Option<&CacheEntry> {
        self.entries.get(path)
    }

    /// Whether the cached entry can be trusted for this version of the file.
    ///
    /// With `retry_failed`, placeholders left by failed extractions count as
    /// stale even when the modification time still matches.
    pub fn is_fresh(&self, file: &IndexedFile, retry_failed: bool) -> bool {
        match self.entries.get(&file.path) {
            Some(entry) => entry.matches(file) && !(retry_failed && entry.failed),
            None => false,
        }
    }

    /// Insert or replace an entry.
    pub fn insert(&mut self, path: impl Into<String>, entry: CacheEntry) {
        self.entries.insert(path.into(), entry);
    }

    /// Store the outcome of extracting `file`.
    ///
    /// Failures are stored as placeholders tagged with the file's current
    /// modification time so they are not retried until the file changes.
    pub fn record(&mut self, file: &IndexedFile, extraction: &Extraction) {
        let entry = if extraction.is_failed() {
            CacheEntry::failed(file.mtime)
        } else {
            CacheEntry::new(file.mtime, extraction.text())
        };
        self.entries.insert(file.path.clone(), entry);
    }

    /// Drop entries for paths that are not in `files`. Returns how many were removed.
    pub fn retain_indexed(&mut self, files: &[IndexedFile]) -> usize {
        let keep: HashSet<&str> = files.iter().map(|f| f.path.as_str()).collect();
        let before = self.entries.len();
        self.entries.retain(|path, _| keep.contains(path.as_str()));
        before - self.entries.len()
    }

    /// Number of cached documents
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of failure placeholders
    pub fn failed_count(&self) -> usize {
        self.entries.values().filter(|e| e.failed).count()
    }

    /// Remove every entry (in memory only).
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ExtractionError;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();

        let mut cache = ContentCache::empty(temp_dir.path());
        cache.insert("/a/x.pdf", CacheEntry::new(100, "hello world"));
        cache.insert("/a/y.pdf", CacheEntry::failed(200));
        cache.save().unwrap();

        let loaded = ContentCache::load_from(temp_dir.path()).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(
            loaded.get("/a/x.pdf"),
            Some(&CacheEntry::new(100, "hello world"))
        );
        assert_eq!(loaded.get("/a/y.pdf"), Some(&CacheEntry::failed(200)));
        assert_eq!(loaded.failed_count(), 1);
    }

    #[test]
    fn test_persisted_layout() {
        let temp_dir = TempDir::new().unwrap();

        let mut cache = ContentCache::empty(temp_dir.path());
        cache.insert("/a/x.pdf", CacheEntry::new(100, "hello world"));
        cache.save().unwrap();

        let raw = fs::read_to_string(temp_dir.path().join(CONTENT_FILE)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"/a/x.pdf": {"mtime": 100, "text": "hello world"}})
        );
    }

    #[test]
    fn test_load_missing() {
        let temp_dir = TempDir::new().unwrap();
        let cache = ContentCache::load_from(temp_dir.path()).unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_corrupted_cache() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(CONTENT_FILE), b"{\"/a/x.pdf\": {\"mtime\": ").unwrap();

        let result = ContentCache::load_from(temp_dir.path());
        assert!(matches!(result, Err(ScoutError::CacheCorrupted { .. })));

        let cache = ContentCache::open(temp_dir.path());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_freshness() {
        let temp_dir = TempDir::new().unwrap();
        let mut cache = ContentCache::empty(temp_dir.path());
        let file = IndexedFile::new("/a/x.pdf", 100);

        assert!(!cache.is_fresh(&file, false));

        cache.insert("/a/x.pdf", CacheEntry::new(99, "old"));
        assert!(!cache.is_fresh(&file, false));

        cache.insert("/a/x.pdf", CacheEntry::new(100, "new"));
        assert!(cache.is_fresh(&file, false));
        assert!(cache.is_fresh(&file, true));

        cache.insert("/a/x.pdf", CacheEntry::failed(100));
        assert!(cache.is_fresh(&file, false));
        assert!(!cache.is_fresh(&file, true));
    }

    #[test]
    fn test_record() {
        let temp_dir = TempDir::new().unwrap();
        let mut cache = ContentCache::empty(temp_dir.path());
        let file = IndexedFile::new("/a/x.pdf", 100);

        cache.record(&file, &Extraction::Text("hello".to_string()));
        assert_eq!(cache.get("/a/x.pdf"), Some(&CacheEntry::new(100, "hello")));

        cache.record(&file, &Extraction::EmptyPage);
        assert_eq!(cache.get("/a/x.pdf"), Some(&CacheEntry::new(100, "")));

        cache.record(
            &file,
            &Extraction::Failed(ExtractionError::TimedOut { secs: 30 }),
        );
        assert_eq!(cache.get("/a/x.pdf"), Some(&CacheEntry::failed(100)));
    }

    #[test]
    fn test_retain_indexed() {
        let temp_dir = TempDir::new().unwrap();
        let mut cache = ContentCache::empty(temp_dir.path());
        cache.insert("/a/keep.pdf", CacheEntry::new(1, "a"));
        cache.insert("/a/gone.pdf", CacheEntry::new(2, "b"));
        cache.insert("/b/gone.pdf", CacheEntry::new(3, "c"));

        let removed = cache.retain_indexed(&[IndexedFile::new("/a/keep.pdf", 1)]);
        assert_eq!(removed, 2);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("/a/keep.pdf").is_some());
    }
}
