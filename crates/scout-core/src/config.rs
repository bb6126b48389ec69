//! Configuration management for Scout.
//!
//! This module provides configuration loading, saving, and defaults.
//! Configuration is stored in TOML format in a platform-appropriate location.

use crate::error::{Result, ScoutError};
use directories::{ProjectDirs, UserDirs};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Main configuration structure for Scout.
///
/// ## Example Configuration File (scout.toml)
///
/// ```toml
/// [general]
/// cache_dir = "/var/tmp/scout"
///
/// [index]
/// roots = ["/home/user/Downloads", "/mnt/shared/linux"]
/// exclude = ["*/.Trash/*"]
///
/// [search]
/// workers = 4
///
/// [extractor]
/// program = "/usr/bin/pdftotext"
/// timeout_secs = 10
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// What to crawl and how
    pub index: IndexConfig,

    /// Search tuning
    pub search: SearchConfig,

    /// External text extractor
    pub extractor: ExtractorConfig,
}

/// General configuration options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory holding the file index and content cache (None = default location)
    pub cache_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        GeneralConfig {
            cache_dir: None,
            log_level: "info".to_string(),
        }
    }
}

/// Crawl configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Root directories to crawl, in order
    pub roots: Vec<PathBuf>,

    /// Document extension to select (case-insensitive, without the dot)
    pub extension: String,

    /// Descend into symlinked directories (loops are detected and skipped)
    pub follow_links: bool,

    /// Maximum directory depth below each root (None = unlimited)
    pub max_depth: Option<usize>,

    /// Glob patterns matched against full paths; matching directories are pruned
    pub exclude: Vec<String>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        let roots = UserDirs::new()
            .and_then(|dirs| dirs.download_dir().map(Path::to_path_buf))
            .into_iter()
            .collect();

        IndexConfig {
            roots,
            extension: "pdf".to_string(),
            follow_links: false,
            max_depth: None,
            exclude: Vec::new(),
        }
    }
}

/// Search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Minimum trimmed query length before any work is done
    pub min_query_len: usize,

    /// Number of concurrent extractor invocations
    pub workers: usize,

    /// Characters of context on each side of a snippet match
    pub snippet_radius: usize,

    /// Re-extract documents whose previous extraction failed
    pub retry_failed: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            min_query_len: 2,
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            snippet_radius: 80,
            retry_failed: false,
        }
    }
}

/// External extractor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Converter executable
    pub program: PathBuf,

    /// Arguments; `{path}` is replaced with the document path
    pub args: Vec<String>,

    /// Kill the converter after this many seconds
    pub timeout_secs: u64,

    /// Converter output beyond this many bytes is discarded
    pub max_output_bytes: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        ExtractorConfig {
            program: PathBuf::from("pdftotext"),
            args: ["-f", "1", "-l", "1", "{path}", "-"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            timeout_secs: 30,
            max_output_bytes: 1024 * 1024,
        }
    }
}

impl ExtractorConfig {
    /// Timeout as a `Duration`
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default config if no config file exists.
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Config::default());
        }

        info!(path = %path.display(), "Loading configuration");
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents).map_err(|e| ScoutError::ConfigError {
            reason: format!("Failed to parse config: {}", e),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        info!(path = %path.display(), "Saving configuration");
        let contents = toml::to_string_pretty(self).map_err(|e| ScoutError::ConfigError {
            reason: format!("Failed to serialize config: {}", e),
        })?;

        fs::write(path, contents)?;
        Ok(())
    }

    /// Reject values the rest of the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.search.workers == 0 {
            return Err(ScoutError::ConfigError {
                reason: "search.workers must be at least 1".to_string(),
            });
        }
        if self.index.extension.trim_start_matches('.').is_empty() {
            return Err(ScoutError::ConfigError {
                reason: "index.extension must not be empty".to_string(),
            });
        }
        if self.extractor.timeout_secs == 0 {
            return Err(ScoutError::ConfigError {
                reason: "extractor.timeout_secs must be at least 1".to_string(),
            });
        }
        if self.extractor.max_output_bytes == 0 {
            return Err(ScoutError::ConfigError {
                reason: "extractor.max_output_bytes must be at least 1".to_string(),
            });
        }
        for pattern in &self.index.exclude {
            glob::Pattern::new(pattern).map_err(|e| ScoutError::ConfigError {
                reason: format!("invalid exclude pattern {:?}: {}", pattern, e),
            })?;
        }
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> Result<PathBuf> {
        let dirs = project_dirs()?;
        Ok(dirs.config_dir().join("scout.toml"))
    }

    /// Get the default cache directory path.
    pub fn default_cache_dir() -> Result<PathBuf> {
        let dirs = project_dirs()?;
        Ok(dirs.cache_dir().to_path_buf())
    }

    /// Get the cache directory (from config or default).
    pub fn cache_dir(&self) -> Result<PathBuf> {
        if let Some(ref path) = self.general.cache_dir {
            Ok(path.clone())
        } else {
            Self::default_cache_dir()
        }
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("", "", "scout").ok_or_else(|| ScoutError::ConfigError {
        reason: "Could not determine home directory".to_string(),
    })
}
