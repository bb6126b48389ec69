//! Application state management.

use scout_core::{
    BuildReport, CommandExtractor, Config, ContentCache, Crawler, IndexStore, IndexedFile,
    SearchEngine,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Shared application state.
pub struct App {
    /// Configuration
    pub config: Config,

    /// Directory holding the file index and content cache
    pub cache_dir: PathBuf,

    /// File index persistence
    pub store: IndexStore,

    /// Search engine owning the content cache
    pub engine: SearchEngine,
}

impl App {
    /// Create a new application instance.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let cache_dir = config.cache_dir()?;
        let store = IndexStore::new(&cache_dir);
        store.prepare()?;

        let extractor = Arc::new(CommandExtractor::new(&config.extractor));
        let engine = SearchEngine::new(&config.search, ContentCache::open(&cache_dir), extractor)?;

        info!(
            cache_dir = %cache_dir.display(),
            roots = config.index.roots.len(),
            "Application initialized"
        );

        Ok(App {
            config,
            cache_dir,
            store,
            engine,
        })
    }

    /// The persisted file index, building it first if none exists.
    ///
    /// A corrupted index is rebuilt as well.
    pub fn files(&self) -> anyhow::Result<Vec<IndexedFile>> {
        match self.store.load() {
            Ok(Some(files)) => Ok(files),
            Ok(None) => {
                eprintln!("No index yet, indexing folders...");
                let report = self.rebuild_index()?;
                eprintln!("Indexed {} PDFs", report.files().len());
                Ok(report.crawl.files)
            }
            Err(e) if e.requires_rebuild() => {
                warn!(error = %e, "File index unusable, rebuilding");
                Ok(self.rebuild_index()?.crawl.files)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Crawl all roots on a background worker, replace the index, and prune
    /// cache entries for documents that disappeared.
    pub fn rebuild_index(&self) -> anyhow::Result<BuildReport> {
        let crawler = Crawler::new(&self.config.index)?;
        let handle = self
            .store
            .spawn_build(crawler, self.config.index.roots.clone())?;
        let report = handle.wait()?;

        self.engine.prune(report.files())?;
        Ok(report)
    }
}
