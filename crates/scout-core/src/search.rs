//! Content search over the file index.
//!
//! A search walks the file index in order, makes sure every document has a
//! fresh cache entry, and keeps the documents whose first-page text contains
//! the query (case-insensitive substring match, no ranking).
//!
//! ## Concurrency
//!
//! The engine owns the one long-lived [`ContentCache`]. A pass runs in three
//! steps:
//!
//! 1. Under the cache lock, collect the documents whose entry is missing or
//!    stale.
//! 2. Without the lock, extract those documents on a bounded Rayon pool.
//!    Workers only return results; they never touch the cache.
//! 3. Under the lock again, write the results back, filter in index order and
//!    persist the cache once.
//!
//! ## Cancellation
//!
//! Interactive callers issue a new search on every keystroke. Each search
//! takes a [`CancelToken`] from a shared [`SearchSession`]; starting a newer
//! search cancels all older tokens, and a cancelled pass stops scheduling
//! extractions and returns [`ScoutError::Cancelled`].

use crate::cache::ContentCache;
use crate::config::SearchConfig;
use crate::error::{Result, ScoutError};
use crate::extract::{Extraction, TextExtractor};
use crate::types::{CacheEntry, IndexedFile};
use parking_lot::Mutex;
use rayon::prelude::*;
use rayon::ThreadPool;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Hands out cancellation tokens; each new token supersedes all earlier ones.
#[derive(Debug, Clone, Default)]
pub struct SearchSession {
    generation: Arc<AtomicU64>,
}

impl SearchSession {
    /// Create a new session
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new search, cancelling every token issued before.
    pub fn begin(&self) -> CancelToken {
        let issued = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        CancelToken {
            generation: Some(self.generation.clone()),
            issued,
        }
    }

    /// Cancel every outstanding token.
    pub fn cancel_all(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}

/// Cancellation flag for one search pass.
#[derive(Debug, Clone)]
pub struct CancelToken {
    generation: Option<Arc<AtomicU64>>,
    issued: u64,
}

impl CancelToken {
    /// A token that is never cancelled
    pub fn never() -> Self {
        CancelToken {
            generation: None,
            issued: 0,
        }
    }

    /// Whether a newer search has started since this token was issued
    pub fn is_cancelled(&self) -> bool {
        match &self.generation {
            Some(generation) => generation.load(Ordering::SeqCst) != self.issued,
            None => false,
        }
    }
}

/// Summary of the content cache for status displays.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cached documents
    pub entries: usize,

    /// Number of failure placeholders among them
    pub failed: usize,
}

/// Searches document contents, refreshing the content cache as it goes.
pub struct SearchEngine {
    cache: Mutex<ContentCache>,
    extractor: Arc<dyn TextExtractor>,
    pool: ThreadPool,
    min_query_len: usize,
    retry_failed: bool,
}

impl std::fmt::Debug for SearchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchEngine")
            .field("extractor", &self.extractor.name())
            .field("workers", &self.pool.current_num_threads())
            .field("min_query_len", &self.min_query_len)
            .field("retry_failed", &self.retry_failed)
            .finish()
    }
}

impl SearchEngine {
    /// Create an engine that owns `cache` and extracts with `extractor`.
    pub fn new(
        config: &SearchConfig,
        cache: ContentCache,
        extractor: Arc<dyn TextExtractor>,
    ) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers.max(1))
            .thread_name(|i| format!("scout-extract-{}", i))
            .build()
            .map_err(|e| ScoutError::Internal(format!("failed to start extractor pool: {}", e)))?;

        Ok(SearchEngine {
            cache: Mutex::new(cache),
            extractor,
            pool,
            min_query_len: config.min_query_len,
            retry_failed: config.retry_failed,
        })
    }

    /// Whether `query` is long enough to run a search.
    pub fn accepts(&self, query: &str) -> bool {
        query.trim().chars().count() >= self.min_query_len
    }

    /// Search `files` for documents whose first page contains `query`.
    ///
    /// Returns matches as a subsequence of `files`. Queries shorter than the
    /// minimum length return an empty list without extracting anything.
    pub fn search(&self, files: &[IndexedFile], query: &str) -> Result<Vec<IndexedFile>> {
        self.search_with(files, query, &CancelToken::never())
    }

    /// Like [`search`](Self::search), but gives up once `token` is cancelled.
    #[instrument(skip(self, files, token), fields(files = files.len()))]
    pub fn search_with(
        &self,
        files: &[IndexedFile],
        query: &str,
        token: &CancelToken,
    ) -> Result<Vec<IndexedFile>> {
        if !self.accepts(query) {
            debug!("Query below minimum length, nothing to search");
            return Ok(Vec::new());
        }
        if token.is_cancelled() {
            return Err(ScoutError::Cancelled);
        }

        let start = Instant::now();
        let needle = query.to_lowercase();

        let stale = self.stale_files(files);
        let extracted = self.extract_all(&stale, token);

        let mut cache = self.cache.lock();
        let mut refreshed = 0usize;
        for (file, extraction) in stale.iter().zip(extracted) {
            let Some(extraction) = extraction else {
                continue;
            };
            if let Extraction::Failed(ref e) = extraction {
                warn!(path = %file.path, error = %e, "Text extraction failed");
            }
            cache.record(file, &extraction);
            refreshed += 1;
        }

        if token.is_cancelled() {
            if refreshed > 0 {
                save_logged(&cache);
            }
            debug!(refreshed = refreshed, "Search superseded");
            return Err(ScoutError::Cancelled);
        }

        let matches: Vec<IndexedFile> = files
            .iter()
            .filter(|file| {
                cache
                    .get(&file.path)
                    .map_or(false, |entry| entry.text.contains(&needle))
            })
            .cloned()
            .collect();

        save_logged(&cache);

        info!(
            refreshed = refreshed,
            matches = matches.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Search complete"
        );
        Ok(matches)
    }

    /// Files needing extraction, in index order, each path at most once.
    fn stale_files(&self, files: &[IndexedFile]) -> Vec<IndexedFile> {
        let cache = self.cache.lock();
        let mut seen = HashSet::new();
        files
            .iter()
            .filter(|file| !cache.is_fresh(file, self.retry_failed))
            .filter(|file| seen.insert(file.path.as_str()))
            .cloned()
            .collect()
    }

    /// Extract every file on the pool. `None` marks files skipped after cancellation.
    fn extract_all(&self, stale: &[IndexedFile], token: &CancelToken) -> Vec<Option<Extraction>> {
        if stale.is_empty() {
            return Vec::new();
        }
        debug!(
            stale = stale.len(),
            workers = self.pool.current_num_threads(),
            extractor = self.extractor.name(),
            "Refreshing stale cache entries"
        );

        let extractor = &self.extractor;
        self.pool.install(|| {
            stale
                .par_iter()
                .map(|file| {
                    if token.is_cancelled() {
                        None
                    } else {
                        Some(extractor.extract_first_page(file.as_path()))
                    }
                })
                .collect()
        })
    }

    /// Cached text for a document, for previews.
    pub fn cached_text(&self, path: &str) -> Option<String> {
        self.cache.lock().get(path).map(|entry| entry.text.clone())
    }

    /// Cached entry for a document.
    pub fn cached_entry(&self, path: &str) -> Option<CacheEntry> {
        self.cache.lock().get(path).cloned()
    }

    /// Drop cache entries for documents not in `files` and persist the cache.
    ///
    /// Returns the number of entries removed.
    pub fn prune(&self, files: &[IndexedFile]) -> Result<usize> {
        let mut cache = self.cache.lock();
        let removed = cache.retain_indexed(files);
        if removed > 0 {
            cache.save()?;
            info!(removed = removed, "Pruned content cache");
        }
        Ok(removed)
    }

    /// Entry counts of the content cache
    pub fn cache_stats(&self) -> CacheStats {
        let cache = self.cache.lock();
        CacheStats {
            entries: cache.len(),
            failed: cache.failed_count(),
        }
    }

    /// Empty the content cache and persist the empty state.
    pub fn clear_cache(&self) -> Result<()> {
        let mut cache = self.cache.lock();
        cache.clear();
        cache.save()
    }
}

fn save_logged(cache: &ContentCache) {
    if let Err(e) = cache.save() {
        warn!(error = %e, path = %cache.path().display(), "Failed to save content cache");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ExtractionError;
    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::atomic::AtomicUsize;
    use tempfile::TempDir;

    /// Extractor returning canned text and counting calls.
    #[derive(Default)]
    struct FakeExtractor {
        texts: HashMap<String, String>,
        failing: HashSet<String>,
        calls: AtomicUsize,
    }

    impl FakeExtractor {
        fn with(texts: &[(&str, &str)]) -> Self {
            FakeExtractor {
                texts: texts
                    .iter()
                    .map(|(p, t)| (p.to_string(), t.to_string()))
                    .collect(),
                ..Default::default()
            }
        }

        fn failing(mut self, path: &str) -> Self {
            self.failing.insert(path.to_string());
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl TextExtractor for FakeExtractor {
        fn extract_first_page(&self, path: &Path) -> Extraction {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let key = path.to_string_lossy();
            if self.failing.contains(key.as_ref()) {
                return Extraction::Failed(ExtractionError::Exit { code: Some(1) });
            }
            Extraction::from_output(self.texts.get(key.as_ref()).map_or("", String::as_str))
        }

        fn name(&self) -> &str {
            "fake"
        }
    }

    fn config(workers: usize) -> SearchConfig {
        SearchConfig {
            workers,
            ..SearchConfig::default()
        }
    }

    fn engine(dir: &Path, extractor: Arc<FakeExtractor>) -> SearchEngine {
        SearchEngine::new(&config(2), ContentCache::open(dir), extractor).unwrap()
    }

    #[test]
    fn test_search_extracts_on_miss_and_caches() {
        let temp_dir = TempDir::new().unwrap();
        let extractor = Arc::new(FakeExtractor::with(&[("/a/x.pdf", "hello world")]));
        let engine = engine(temp_dir.path(), extractor.clone());
        let index = vec![IndexedFile::new("/a/x.pdf", 100)];

        let results = engine.search(&index, "world").unwrap();
        assert_eq!(results, index);
        assert_eq!(extractor.calls(), 1);
        assert_eq!(
            engine.cached_entry("/a/x.pdf"),
            Some(CacheEntry::new(100, "hello world"))
        );

        let persisted = ContentCache::load_from(temp_dir.path()).unwrap();
        assert_eq!(
            persisted.get("/a/x.pdf"),
            Some(&CacheEntry::new(100, "hello world"))
        );
    }

    #[test]
    fn test_fresh_entry_is_not_reextracted() {
        let temp_dir = TempDir::new().unwrap();
        let extractor = Arc::new(FakeExtractor::with(&[("/a/x.pdf", "hello world")]));
        let engine = engine(temp_dir.path(), extractor.clone());
        let index = vec![IndexedFile::new("/a/x.pdf", 100)];

        engine.search(&index, "world").unwrap();
        let results = engine.search(&index, "missing").unwrap();

        assert!(results.is_empty());
        assert_eq!(extractor.calls(), 1);
    }

    #[test]
    fn test_stale_entry_is_reextracted() {
        let temp_dir = TempDir::new().unwrap();
        let mut cache = ContentCache::empty(temp_dir.path());
        cache.insert("/a/x.pdf", CacheEntry::new(50, "old contents"));
        cache.save().unwrap();

        let extractor = Arc::new(FakeExtractor::with(&[("/a/x.pdf", "new contents")]));
        let engine = engine(temp_dir.path(), extractor.clone());
        let index = vec![IndexedFile::new("/a/x.pdf", 100)];

        assert!(engine.search(&index, "old").unwrap().is_empty());
        assert_eq!(extractor.calls(), 1);
        assert_eq!(
            engine.cached_entry("/a/x.pdf"),
            Some(CacheEntry::new(100, "new contents"))
        );
    }

    #[test]
    fn test_matching_is_case_insensitive_substring() {
        let temp_dir = TempDir::new().unwrap();
        let extractor = Arc::new(FakeExtractor::with(&[("/a/x.pdf", "Annual Report 2024")]));
        let engine = engine(temp_dir.path(), extractor);
        let index = vec![IndexedFile::new("/a/x.pdf", 1)];

        assert_eq!(engine.search(&index, "REPORT").unwrap().len(), 1);
        assert_eq!(engine.search(&index, "al rep").unwrap().len(), 1);
        assert!(engine.search(&index, "reports").unwrap().is_empty());
    }

    #[test]
    fn test_short_query_does_no_work() {
        let temp_dir = TempDir::new().unwrap();
        let extractor = Arc::new(FakeExtractor::with(&[("/a/x.pdf", "a b c")]));
        let engine = engine(temp_dir.path(), extractor.clone());
        let index = vec![IndexedFile::new("/a/x.pdf", 1)];

        assert!(!engine.accepts(" a "));
        assert!(engine.search(&index, "a").unwrap().is_empty());
        assert!(engine.search(&index, "   b   ").unwrap().is_empty());
        assert!(engine.search(&index, "").unwrap().is_empty());
        assert_eq!(extractor.calls(), 0);
        assert!(!temp_dir.path().join(crate::cache::CONTENT_FILE).exists());
    }

    #[test]
    fn test_results_follow_index_order() {
        let temp_dir = TempDir::new().unwrap();
        let paths: Vec<String> = (0..40).map(|i| format!("/docs/{:02}.pdf", 39 - i)).collect();
        let texts: Vec<(String, String)> = paths
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let text = if i % 3 == 0 { "has the token" } else { "nothing" };
                (p.clone(), text.to_string())
            })
            .collect();
        let pairs: Vec<(&str, &str)> = texts.iter().map(|(p, t)| (p.as_str(), t.as_str())).collect();

        let extractor = Arc::new(FakeExtractor::with(&pairs));
        let engine =
            SearchEngine::new(&config(4), ContentCache::open(temp_dir.path()), extractor.clone())
                .unwrap();
        let index: Vec<IndexedFile> = paths.iter().map(|p| IndexedFile::new(p.clone(), 7)).collect();

        let results = engine.search(&index, "token").unwrap();
        let expected: Vec<IndexedFile> = index.iter().step_by(3).cloned().collect();
        assert_eq!(results, expected);
        assert_eq!(extractor.calls(), 40);

        let again = engine.search(&index, "token").unwrap();
        assert_eq!(again, expected);
        assert_eq!(extractor.calls(), 40);
    }

    #[test]
    fn test_duplicate_paths_extract_once() {
        let temp_dir = TempDir::new().unwrap();
        let extractor = Arc::new(FakeExtractor::with(&[("/a/x.pdf", "hello world")]));
        let engine = engine(temp_dir.path(), extractor.clone());
        let file = IndexedFile::new("/a/x.pdf", 100);

        let results = engine.search(&[file.clone(), file.clone()], "hello").unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(extractor.calls(), 1);
    }

    #[test]
    fn test_failed_extraction_is_remembered() {
        let temp_dir = TempDir::new().unwrap();
        let extractor = Arc::new(FakeExtractor::default().failing("/a/broken.pdf"));
        let engine = engine(temp_dir.path(), extractor.clone());
        let index = vec![IndexedFile::new("/a/broken.pdf", 100)];

        assert!(engine.search(&index, "anything").unwrap().is_empty());
        assert_eq!(engine.cached_entry("/a/broken.pdf"), Some(CacheEntry::failed(100)));

        engine.search(&index, "anything").unwrap();
        assert_eq!(extractor.calls(), 1);
        assert_eq!(engine.cache_stats(), CacheStats { entries: 1, failed: 1 });

        let changed = vec![IndexedFile::new("/a/broken.pdf", 200)];
        engine.search(&changed, "anything").unwrap();
        assert_eq!(extractor.calls(), 2);
    }

    #[test]
    fn test_retry_failed() {
        let temp_dir = TempDir::new().unwrap();
        let extractor = Arc::new(FakeExtractor::default().failing("/a/broken.pdf"));
        let config = SearchConfig {
            retry_failed: true,
            ..config(1)
        };
        let engine =
            SearchEngine::new(&config, ContentCache::open(temp_dir.path()), extractor.clone())
                .unwrap();
        let index = vec![IndexedFile::new("/a/broken.pdf", 100)];

        engine.search(&index, "anything").unwrap();
        engine.search(&index, "anything").unwrap();
        assert_eq!(extractor.calls(), 2);
    }

    #[test]
    fn test_empty_page_is_cached_as_success() {
        let temp_dir = TempDir::new().unwrap();
        let extractor = Arc::new(FakeExtractor::with(&[("/a/scan.pdf", "\u{c}")]));
        let engine = engine(temp_dir.path(), extractor.clone());
        let index = vec![IndexedFile::new("/a/scan.pdf", 3)];

        assert!(engine.search(&index, "text").unwrap().is_empty());
        assert_eq!(engine.cached_entry("/a/scan.pdf"), Some(CacheEntry::new(3, "")));
        assert_eq!(engine.cache_stats().failed, 0);
    }

    #[test]
    fn test_superseded_token_cancels_before_work() {
        let temp_dir = TempDir::new().unwrap();
        let extractor = Arc::new(FakeExtractor::with(&[("/a/x.pdf", "hello world")]));
        let engine = engine(temp_dir.path(), extractor.clone());
        let index = vec![IndexedFile::new("/a/x.pdf", 100)];

        let session = SearchSession::new();
        let stale = session.begin();
        let fresh = session.begin();
        assert!(stale.is_cancelled());
        assert!(!fresh.is_cancelled());

        let result = engine.search_with(&index, "hello", &stale);
        assert!(matches!(result, Err(ScoutError::Cancelled)));
        assert_eq!(extractor.calls(), 0);

        assert_eq!(engine.search_with(&index, "hello", &fresh).unwrap(), index);
    }

    /// Extractor that starts a newer search while the first document is extracted.
    struct SupersedingExtractor {
        session: SearchSession,
        calls: AtomicUsize,
    }

    impl TextExtractor for SupersedingExtractor {
        fn extract_first_page(&self, _path: &Path) -> Extraction {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.session.begin();
            Extraction::Text("hello world".to_string())
        }

        fn name(&self) -> &str {
            "superseding"
        }
    }

    #[test]
    fn test_cancellation_mid_pass_keeps_finished_work() {
        let temp_dir = TempDir::new().unwrap();
        let session = SearchSession::new();
        let extractor = Arc::new(SupersedingExtractor {
            session: session.clone(),
            calls: AtomicUsize::new(0),
        });
        let engine =
            SearchEngine::new(&config(1), ContentCache::open(temp_dir.path()), extractor.clone())
                .unwrap();
        let index: Vec<IndexedFile> = (0..5)
            .map(|i| IndexedFile::new(format!("/a/{}.pdf", i), 1))
            .collect();

        let token = session.begin();
        let result = engine.search_with(&index, "hello", &token);

        assert!(matches!(result, Err(ScoutError::Cancelled)));
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 1);
        assert_eq!(engine.cache_stats().entries, 1);
        assert_eq!(ContentCache::load_from(temp_dir.path()).unwrap().len(), 1);
    }

    #[test]
    fn test_cancel_all() {
        let session = SearchSession::new();
        let token = session.begin();
        session.cancel_all();
        assert!(token.is_cancelled());
        assert!(!CancelToken::never().is_cancelled());
    }

    #[test]
    fn test_prune() {
        let temp_dir = TempDir::new().unwrap();
        let extractor = Arc::new(FakeExtractor::with(&[
            ("/a/x.pdf", "hello"),
            ("/a/y.pdf", "world"),
        ]));
        let engine = engine(temp_dir.path(), extractor);
        let index = vec![
            IndexedFile::new("/a/x.pdf", 1),
            IndexedFile::new("/a/y.pdf", 1),
        ];
        engine.search(&index, "hello").unwrap();

        let removed = engine.prune(&index[..1]).unwrap();
        assert_eq!(removed, 1);
        assert_eq!(engine.cached_text("/a/y.pdf"), None);
        assert_eq!(ContentCache::load_from(temp_dir.path()).unwrap().len(), 1);
    }

    #[test]
    fn test_clear_cache() {
        let temp_dir = TempDir::new().unwrap();
        let extractor = Arc::new(FakeExtractor::with(&[("/a/x.pdf", "hello")]));
        let engine = engine(temp_dir.path(), extractor.clone());
        let index = vec![IndexedFile::new("/a/x.pdf", 1)];

        engine.search(&index, "hello").unwrap();
        engine.clear_cache().unwrap();
        assert_eq!(engine.cache_stats().entries, 0);

        engine.search(&index, "hello").unwrap();
        assert_eq!(extractor.calls(), 2);
    }
}
