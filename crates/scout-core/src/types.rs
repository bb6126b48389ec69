//! Core data types for Scout.
//!
//! This module defines the records that flow between the crawler, the file
//! index, the content cache and the search engine. These types are:
//!
//! - **Serializable**: both persisted documents are plain JSON
//! - **Platform-agnostic**: paths are stored as strings, times as epoch millis
//! - **Cheap to clone**: search results are handed to callers by value

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// A document discovered by a crawl.
///
/// `path` is the unique key within one index. `mtime` is the file's last
/// modification time in milliseconds since the Unix epoch and is what cache
/// invalidation compares against.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexedFile {
    /// Absolute path of the document
    pub path: String,

    /// Last modification time, milliseconds since the Unix epoch
    pub mtime: i64,
}

impl IndexedFile {
    /// Create a new indexed file record
    pub fn new(path: impl Into<String>, mtime: i64) -> Self {
        IndexedFile {
            path: path.into(),
            mtime,
        }
    }

    /// The path as a `Path`
    pub fn as_path(&self) -> &Path {
        Path::new(&self.path)
    }

    /// Final path component, falling back to the whole path
    pub fn file_name(&self) -> &str {
        self.as_path()
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(&self.path)
    }

    /// Modification time as a UTC timestamp
    pub fn modified(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.mtime).single()
    }
}

impl fmt::Display for IndexedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path)
    }
}

/// Convert a filesystem timestamp to epoch milliseconds.
///
/// Times before the epoch are returned as negative values.
pub fn system_time_millis(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(since) => since.as_millis() as i64,
        Err(before) => -(before.duration().as_millis() as i64),
    }
}

/// Extracted first-page text for one document.
///
/// The entry is valid only while `mtime` equals the document's current
/// modification time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Modification time of the document when the text was extracted
    pub mtime: i64,

    /// Lowercased first-page text (empty for empty pages and failures)
    pub text: String,

    /// Set when extraction failed and `text` is only a placeholder
    #[serde(default, skip_serializing_if = "is_false")]
    pub failed: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl CacheEntry {
    /// Create an entry holding extracted text
    pub fn new(mtime: i64, text: impl Into<String>) -> Self {
        CacheEntry {
            mtime,
            text: text.into(),
            failed: false,
        }
    }

    /// Create the placeholder stored after a failed extraction
    pub fn failed(mtime: i64) -> Self {
        CacheEntry {
            mtime,
            text: String::new(),
            failed: true,
        }
    }

    /// Whether this entry was extracted from the given version of the file
    pub fn matches(&self, file: &IndexedFile) -> bool {
        self.mtime == file.mtime
    }
}

/// A path the crawler could not descend into or stat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedPath {
    /// The directory or file that was skipped
    pub path: PathBuf,

    /// Human-readable reason (permission denied, symlink loop, ...)
    pub reason: String,
}

/// Outcome of crawling one or more roots.
#[derive(Debug, Clone, Default)]
pub struct CrawlReport {
    /// Matching documents, in crawl order
    pub files: Vec<IndexedFile>,

    /// Subtrees and entries that were skipped
    pub skipped: Vec<SkippedPath>,
}

impl CrawlReport {
    /// Create an empty report
    pub fn new() -> Self {
        Self::default()
    }

    /// Append another report, keeping this one's entries first
    pub fn merge(&mut self, other: CrawlReport) {
        self.files.extend(other.files);
        self.skipped.extend(other.skipped);
    }

    /// Number of skipped paths
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }
}
