//! Persistence layer for the Scout file index.
//!
//! The file index is a JSON array of `{path, mtime}` records stored in the
//! cache directory. It is always rebuilt from a fresh crawl and written as a
//! whole; there is no incremental update.
//!
//! ## Atomic Writes
//!
//! Both the file index and the content cache are written to a temporary
//! sibling file first and then renamed over the target, so a crash mid-write
//! never leaves a truncated document in place.

use crate::crawler::Crawler;
use crate::error::{Result, ScoutError};
use crate::types::{CrawlReport, IndexedFile};
use crossbeam_channel::{Receiver, TryRecvError};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::{debug, info, warn};

/// File name of the file index inside the cache directory
pub const INDEX_FILE: &str = "files.json";

/// Serialize `value` as pretty JSON and atomically replace `path` with it.
///
/// The parent directory is created if needed.
pub(crate) fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);

    {
        let file = File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
    }

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        ScoutError::filesystem(format!("rename {}", temp_path.display()), e.to_string())
    })
}

/// Outcome of a rebuild.
#[derive(Debug, Clone)]
pub struct BuildReport {
    /// The crawl that produced the new index
    pub crawl: CrawlReport,

    /// Wall-clock time of crawl plus save, in milliseconds
    pub elapsed_ms: u128,
}

impl BuildReport {
    /// The freshly persisted index
    pub fn files(&self) -> &[IndexedFile] {
        &self.crawl.files
    }
}

/// Manages persistence of the file index to disk.
///
/// ## Example
///
/// ```rust,ignore
/// use scout_core::{Crawler, IndexStore};
///
/// let store = IndexStore::new("/tmp/scout");
/// let files = match store.load()? {
///     Some(files) => files,
///     None => store.build(&Crawler::default(), &["/home/user/Downloads"])?.crawl.files,
/// };
/// ```
#[derive(Debug, Clone)]
pub struct IndexStore {
    /// Base directory for storing the index file
    base_dir: PathBuf,
}

impl IndexStore {
    /// Create a new IndexStore with the given base directory.
    ///
    /// Nothing touches the disk until [`prepare`](Self::prepare) or a save.
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        IndexStore {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    /// Directory holding the persisted documents
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Get the path to the index file.
    pub fn index_path(&self) -> PathBuf {
        self.base_dir.join(INDEX_FILE)
    }

    /// Create the storage directory. Safe to call repeatedly.
    pub fn prepare(&self) -> Result<()> {
        fs::create_dir_all(&self.base_dir).map_err(|e| {
            ScoutError::filesystem(
                format!("create {}", self.base_dir.display()),
                e.to_string(),
            )
        })
    }

    /// Check if an index has ever been persisted.
    pub fn exists(&self) -> bool {
        self.index_path().exists()
    }

    /// Replace the persisted index with `files`.
    pub fn save(&self, files: &[IndexedFile]) -> Result<()> {
        self.prepare()?;
        info!(
            path = %self.index_path().display(),
            files = files.len(),
            "Saving file index"
        );
        write_json_atomic(&self.index_path(), files)
    }

    /// Load the persisted index.
    ///
    /// Returns `Ok(None)` if no index has been saved yet, which is different
    /// from a saved index that happens to be empty.
    pub fn load(&self) -> Result<Option<Vec<IndexedFile>>> {
        let index_path = self.index_path();
        if !index_path.exists() {
            debug!(path = %index_path.display(), "No file index yet");
            return Ok(None);
        }

        let contents = fs::read_to_string(&index_path)?;
        let files: Vec<IndexedFile> =
            serde_json::from_str(&contents).map_err(|e| ScoutError::IndexCorrupted {
                reason: e.to_string(),
            })?;

        info!(path = %index_path.display(), files = files.len(), "File index loaded");
        Ok(Some(files))
    }

    /// Load the persisted index, failing with [`ScoutError::IndexNotFound`]
    /// if none exists.
    pub fn load_existing(&self) -> Result<Vec<IndexedFile>> {
        self.load()?.ok_or_else(|| ScoutError::IndexNotFound {
            path: self.index_path(),
        })
    }

    /// Crawl `roots` and replace the persisted index with the result.
    pub fn build<P: AsRef<Path>>(&self, crawler: &Crawler, roots: &[P]) -> Result<BuildReport> {
        let start = Instant::now();
        self.prepare()?;

        let crawl = crawler.crawl_all(roots);
        self.save(&crawl.files)?;

        let elapsed_ms = start.elapsed().as_millis();
        info!(
            files = crawl.files.len(),
            skipped = crawl.skipped_count(),
            elapsed_ms = elapsed_ms as u64,
            "File index rebuilt"
        );
        Ok(BuildReport { crawl, elapsed_ms })
    }

    /// Run [`build`](Self::build) on a background thread.
    pub fn spawn_build(&self, crawler: Crawler, roots: Vec<PathBuf>) -> Result<BuildHandle> {
        let store = self.clone();
        let (tx, rx) = crossbeam_channel::bounded(1);

        let thread = thread::Builder::new()
            .name("scout-index-build".to_string())
            .spawn(move || {
                let result = store.build(&crawler, &roots[..]);
                if let Err(ref e) = result {
                    warn!(error = %e, "Background index build failed");
                }
                let _ = tx.send(result);
            })?;

        Ok(BuildHandle {
            receiver: rx,
            thread: Some(thread),
        })
    }

    /// Delete the persisted index.
    pub fn clear(&self) -> Result<()> {
        let index_path = self.index_path();
        if index_path.exists() {
            fs::remove_file(&index_path)?;
        }
        Ok(())
    }
}

/// Completion signal for a background index build.
pub struct BuildHandle {
    receiver: Receiver<Result<BuildReport>>,
    thread: Option<JoinHandle<()>>,
}

impl BuildHandle {
    /// Block until the build finishes.
    pub fn wait(mut self) -> Result<BuildReport> {
        let result = self.receiver.recv().map_err(|_| {
            ScoutError::Internal("index build thread exited without a result".to_string())
        });
        self.join();
        result?
    }

    /// Return the result if the build has finished, without blocking.
    pub fn try_finish(&mut self) -> Option<Result<BuildReport>> {
        match self.receiver.try_recv() {
            Ok(result) => {
                self.join();
                Some(result)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.join();
                Some(Err(ScoutError::Internal(
                    "index build thread exited without a result".to_string(),
                )))
            }
        }
    }

    fn join(&mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
