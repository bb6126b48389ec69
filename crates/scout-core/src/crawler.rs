//! Directory crawler.
//!
//! Walks each configured root depth-first and records every regular file
//! whose name ends in the document extension, together with its modification
//! time. Unreadable subtrees are skipped and reported rather than failing the
//! whole crawl.
//!
//! Symlinks are not followed unless `follow_links` is set. When they are,
//! `walkdir` keeps the chain of ancestors for every entry and reports a
//! directory that links back to one of them as a loop error, which ends up in
//! [`CrawlReport::skipped`].

use crate::config::IndexConfig;
use crate::error::{Result, ScoutError};
use crate::types::{system_time_millis, CrawlReport, IndexedFile, SkippedPath};
use glob::Pattern;
use std::collections::HashSet;
use std::env;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

/// Recursive document finder.
#[derive(Debug, Clone)]
pub struct Crawler {
    /// Lowercased suffix including the dot, e.g. ".pdf"
    suffix: String,
    follow_links: bool,
    max_depth: Option<usize>,
    exclude: Vec<Pattern>,
}

impl Default for Crawler {
    fn default() -> Self {
        Crawler::with_extension("pdf")
    }
}

impl Crawler {
    /// Build a crawler from the `[index]` configuration section.
    pub fn new(config: &IndexConfig) -> Result<Self> {
        let exclude = config
            .exclude
            .iter()
            .map(|p| {
                Pattern::new(p).map_err(|e| ScoutError::ConfigError {
                    reason: format!("invalid exclude pattern {:?}: {}", p, e),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Crawler {
            follow_links: config.follow_links,
            max_depth: config.max_depth,
            exclude,
            ..Crawler::with_extension(&config.extension)
        })
    }

    /// A crawler selecting files with the given extension and no other limits.
    pub fn with_extension(extension: &str) -> Self {
        Crawler {
            suffix: format!(".{}", extension.trim_start_matches('.').to_lowercase()),
            follow_links: false,
            max_depth: None,
            exclude: Vec::new(),
        }
    }

    /// Follow symlinked directories and files.
    pub fn follow_links(mut self, yes: bool) -> Self {
        self.follow_links = yes;
        self
    }

    /// Limit how deep below the root the crawl descends.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Whether a file name carries the document extension.
    pub fn is_document_name(&self, name: &str) -> bool {
        name.to_lowercase().ends_with(&self.suffix)
    }

    fn is_excluded(&self, path: &Path) -> bool {
        self.exclude.iter().any(|p| p.matches_path(path))
    }

    /// Crawl a single root.
    ///
    /// Results are sorted by path so that two crawls of an unchanged tree
    /// produce identical output regardless of directory enumeration order.
    pub fn crawl(&self, root: &Path) -> CrawlReport {
        let root = absolutize(root);
        let mut report = CrawlReport::new();

        debug!(root = %root.display(), "Crawling root");

        let mut walker = WalkDir::new(&root).follow_links(self.follow_links);
        if let Some(depth) = self.max_depth {
            walker = walker.max_depth(depth.saturating_add(1));
        }

        let entries = walker
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !self.is_excluded(entry.path()));

        for entry in entries {
            match entry {
                Ok(entry) => {
                    if let Some(file) = self.record(&entry, &mut report) {
                        report.files.push(file);
                    }
                }
                Err(err) => {
                    let path = err
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| root.clone());
                    let reason = match err.loop_ancestor() {
                        Some(ancestor) => {
                            format!("symlink loop back to {}", ancestor.display())
                        }
                        None => err
                            .io_error()
                            .map(|e| e.to_string())
                            .unwrap_or_else(|| err.to_string()),
                    };
                    warn!(path = %path.display(), reason = %reason, "Skipping unreadable path");
                    report.skipped.push(SkippedPath { path, reason });
                }
            }
        }

        report.files.sort_by(|a, b| a.path.cmp(&b.path));

        debug!(
            root = %root.display(),
            files = report.files.len(),
            skipped = report.skipped.len(),
            "Root crawled"
        );
        report
    }

    fn record(&self, entry: &DirEntry, report: &mut CrawlReport) -> Option<IndexedFile> {
        if !entry.file_type().is_file() {
            return None;
        }
        if !self.is_document_name(&entry.file_name().to_string_lossy()) {
            return None;
        }

        let modified = entry
            .metadata()
            .map_err(|e| e.to_string())
            .and_then(|meta| meta.modified().map_err(|e| e.to_string()));

        match modified {
            Ok(time) => Some(IndexedFile::new(
                entry.path().to_string_lossy().into_owned(),
                system_time_millis(time),
            )),
            Err(reason) => {
                warn!(path = %entry.path().display(), reason = %reason, "Cannot stat document");
                report.skipped.push(SkippedPath {
                    path: entry.path().to_path_buf(),
                    reason,
                });
                None
            }
        }
    }

    /// Crawl every root in order and concatenate the results.
    ///
    /// A path reachable from more than one root is kept only at its first
    /// occurrence.
    pub fn crawl_all<P: AsRef<Path>>(&self, roots: &[P]) -> CrawlReport {
        let mut report = CrawlReport::new();
        for root in roots {
            report.merge(self.crawl(root.as_ref()));
        }

        let mut seen = HashSet::with_capacity(report.files.len());
        report.files.retain(|file| seen.insert(file.path.clone()));

        if !report.skipped.is_empty() {
            warn!(skipped = report.skipped.len(), "Some paths were skipped during crawl");
        }
        info!(
            roots = roots.len(),
            files = report.files.len(),
            "Crawl complete"
        );
        report
    }
}

fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path.to_path_buf(),
    }
}
