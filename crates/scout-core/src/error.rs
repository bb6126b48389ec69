//! Error types for Scout core operations.
//!
//! This module defines well-structured error types using `thiserror` for
//! library-level errors, while the CLI uses `anyhow` for convenient error
//! handling.

use crate::extract::ExtractionError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using ScoutError
pub type Result<T> = std::result::Result<T, ScoutError>;

/// Core error types for Scout operations.
///
/// These errors represent specific failure modes that callers may want to
/// handle differently (e.g., rebuilding the file index when it is corrupted).
#[derive(Error, Debug)]
pub enum ScoutError {
    // === File Index Errors ===
    /// No file index has been persisted yet
    #[error("file index not found at {path}")]
    IndexNotFound { path: PathBuf },

    /// The persisted file index exists but could not be parsed
    #[error("file index is corrupted: {reason}")]
    IndexCorrupted { reason: String },

    // === Content Cache Errors ===
    /// The persisted content cache exists but could not be parsed
    #[error("content cache is corrupted: {reason}")]
    CacheCorrupted { reason: String },

    // === Filesystem Errors ===
    /// Generic filesystem operation failure
    #[error("filesystem error: {operation} failed: {reason}")]
    FilesystemError { operation: String, reason: String },

    // === Extraction Errors ===
    /// The text extractor failed for a document
    #[error("text extraction failed for {path}: {source}")]
    Extraction {
        path: PathBuf,
        #[source]
        source: ExtractionError,
    },

    // === Search Errors ===
    /// The search was superseded by a newer one before it finished
    #[error("search cancelled")]
    Cancelled,

    // === Configuration Errors ===
    /// Configuration file parsing failed
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    // === I/O Errors ===
    /// Generic I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Serialization Errors ===
    /// Serialization/deserialization failed
    #[error("serialization error: {0}")]
    Serialization(String),

    // === Internal Errors ===
    /// Internal error that should not happen
    #[error("internal error: {0}")]
    Internal(String),
}

impl ScoutError {
    /// Returns true if this error indicates the file index needs to be rebuilt
    pub fn requires_rebuild(&self) -> bool {
        matches!(
            self,
            ScoutError::IndexNotFound { .. } | ScoutError::IndexCorrupted { .. }
        )
    }

    /// Returns true if a newer search superseded the one that failed
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ScoutError::Cancelled)
    }

    /// Create a filesystem error
    pub fn filesystem(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        ScoutError::FilesystemError {
            operation: operation.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for ScoutError {
    fn from(err: serde_json::Error) -> Self {
        ScoutError::Serialization(err.to_string())
    }
}
