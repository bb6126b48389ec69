//! # Scout Core Library
//!
//! This crate provides crawling, caching and content search for the Scout
//! PDF search tool. It finds documents under a set of root directories,
//! extracts the text of each document's first page with an external
//! converter, caches that text keyed by modification time, and answers
//! substring queries over it.
//!
//! ## Architecture
//!
//! - **Crawler** (`crawler`): Recursive document discovery
//! - **Persistence** (`persistence`): The persisted file index and background rebuilds
//! - **Extract** (`extract`): The `TextExtractor` trait and the subprocess extractor
//! - **Cache** (`cache`): The persisted content cache and its invalidation rule
//! - **Search** (`search`): The search engine, extractor pool and cancellation
//! - **Snippet** (`snippet`): Preview windows and match highlighting
//! - **Config** (`config`): Configuration management
//!
//! ## Example
//!
//! ```rust,ignore
//! use scout_core::{CommandExtractor, Config, ContentCache, Crawler, IndexStore, SearchEngine};
//! use std::sync::Arc;
//!
//! let config = Config::load()?;
//! let cache_dir = config.cache_dir()?;
//!
//! let store = IndexStore::new(&cache_dir);
//! let files = match store.load()? {
//!     Some(files) => files,
//!     None => store.build(&Crawler::new(&config.index)?, &config.index.roots)?.crawl.files,
//! };
//!
//! let engine = SearchEngine::new(
//!     &config.search,
//!     ContentCache::open(&cache_dir),
//!     Arc::new(CommandExtractor::new(&config.extractor)),
//! )?;
//! for file in engine.search(&files, "invoice")? {
//!     println!("{}", file.path);
//! }
//! ```

pub mod cache;
pub mod config;
pub mod crawler;
pub mod error;
pub mod extract;
pub mod persistence;
pub mod search;
pub mod snippet;
pub mod types;

// Re-export commonly used types
pub use cache::ContentCache;
pub use config::Config;
pub use crawler::Crawler;
pub use error::{Result, ScoutError};
pub use extract::{CommandExtractor, Extraction, ExtractionError, TextExtractor};
pub use persistence::{BuildHandle, BuildReport, IndexStore};
pub use search::{CacheStats, CancelToken, SearchEngine, SearchSession};
pub use snippet::{extract_snippet, highlight_match};
pub use types::{CacheEntry, CrawlReport, IndexedFile, SkippedPath};
