//! First-page text extraction.
//!
//! The search engine talks to extractors only through [`TextExtractor`], so
//! the subprocess-based [`CommandExtractor`] can be swapped for an in-memory
//! double in tests.
//!
//! ## Output Handling
//!
//! The converter's standard output is read on a helper thread. At most
//! `max_output_bytes` are kept. Once the converter writes past that limit it
//! is killed and the truncated text is returned as a normal result. If the
//! child does not finish within the timeout it is killed and the extraction
//! counts as failed.

use crate::config::ExtractorConfig;
use crossbeam_channel::RecvTimeoutError;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, trace};

/// Placeholder in [`ExtractorConfig::args`] replaced by the document path.
pub const PATH_PLACEHOLDER: &str = "{path}";

/// Why an extraction produced no text.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// The converter could not be started (usually: not installed)
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// The converter exited unsuccessfully
    #[error("converter exited with status {}", display_code(.code))]
    Exit { code: Option<i32> },

    /// The converter ran past the configured timeout and was killed
    #[error("converter timed out after {secs}s")]
    TimedOut { secs: u64 },

    /// Reading the converter's output failed
    #[error("failed to read converter output: {0}")]
    Io(#[from] io::Error),
}

fn display_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "signal".to_string(),
    }
}

/// Result of extracting one document's first page.
#[derive(Debug)]
pub enum Extraction {
    /// Lowercased page text
    Text(String),

    /// The converter succeeded but the page has no text
    EmptyPage,

    /// The converter failed; the reason is kept for logging
    Failed(ExtractionError),
}

impl Extraction {
    /// Classify raw converter output, lowercasing it.
    pub fn from_output(output: &str) -> Self {
        if output.trim().is_empty() {
            Extraction::EmptyPage
        } else {
            Extraction::Text(output.to_lowercase())
        }
    }

    /// Whether the converter failed
    pub fn is_failed(&self) -> bool {
        matches!(self, Extraction::Failed(_))
    }

    /// The text to cache: empty for empty pages and failures
    pub fn text(&self) -> &str {
        match self {
            Extraction::Text(text) => text,
            Extraction::EmptyPage | Extraction::Failed(_) => "",
        }
    }
}

/// Source of first-page text for documents.
pub trait TextExtractor: Send + Sync {
    /// Extract the lowercased text of the document's first page.
    ///
    /// Never panics or returns an error: failures are reported as
    /// [`Extraction::Failed`].
    fn extract_first_page(&self, path: &Path) -> Extraction;

    /// Short name for logs
    fn name(&self) -> &str;
}

/// Runs an external converter such as `pdftotext` for each document.
#[derive(Debug, Clone)]
pub struct CommandExtractor {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
    max_output_bytes: usize,
}

impl CommandExtractor {
    /// Create an extractor from the `[extractor]` configuration section.
    pub fn new(config: &ExtractorConfig) -> Self {
        CommandExtractor {
            program: config.program.clone(),
            args: config.args.clone(),
            timeout: config.timeout(),
            max_output_bytes: config.max_output_bytes,
        }
    }

    fn command(&self, path: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        for arg in &self.args {
            if arg == PATH_PLACEHOLDER {
                cmd.arg(path);
            } else {
                cmd.arg(arg);
            }
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());
        cmd
    }

    fn run(&self, path: &Path) -> Result<String, ExtractionError> {
        let mut child = self
            .command(path)
            .spawn()
            .map_err(|source| ExtractionError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        let stdout = match child.stdout.take() {
            Some(stdout) => stdout,
            None => {
                reap(&mut child);
                return Err(ExtractionError::Io(io::Error::new(
                    io::ErrorKind::BrokenPipe,
                    "converter stdout was not captured",
                )));
            }
        };

        let limit = self.max_output_bytes;
        let (tx, rx) = crossbeam_channel::bounded(1);
        let spawned = thread::Builder::new()
            .name("scout-extract-reader".to_string())
            .spawn(move || {
                let _ = tx.send(read_capped(stdout, limit));
            });
        if let Err(e) = spawned {
            reap(&mut child);
            return Err(ExtractionError::Io(e));
        }

        let (bytes, truncated) = match rx.recv_timeout(self.timeout) {
            Ok(read) => match read {
                Ok(read) => read,
                Err(e) => {
                    reap(&mut child);
                    return Err(ExtractionError::Io(e));
                }
            },
            Err(RecvTimeoutError::Timeout) => {
                reap(&mut child);
                return Err(ExtractionError::TimedOut {
                    secs: self.timeout.as_secs(),
                });
            }
            Err(RecvTimeoutError::Disconnected) => {
                reap(&mut child);
                return Err(ExtractionError::Io(io::Error::new(
                    io::ErrorKind::Other,
                    "output reader stopped unexpectedly",
                )));
            }
        };

        if truncated {
            // Killed at the limit, so the exit status is meaningless
            reap(&mut child);
            debug!(
                path = %path.display(),
                limit = limit,
                "Converter output truncated"
            );
            return Ok(String::from_utf8_lossy(&bytes).into_owned());
        }

        let status = child.wait()?;
        if !status.success() {
            return Err(ExtractionError::Exit {
                code: status.code(),
            });
        }

        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

impl TextExtractor for CommandExtractor {
    fn extract_first_page(&self, path: &Path) -> Extraction {
        trace!(path = %path.display(), "Extracting first page");
        match self.run(path) {
            Ok(output) => Extraction::from_output(&output),
            Err(e) => Extraction::Failed(e),
        }
    }

    fn name(&self) -> &str {
        self.program.to_str().unwrap_or("command")
    }
}

/// Read until EOF or until more than `limit` bytes arrived.
///
/// Returns at most `limit` bytes and whether the stream had more. The rest of
/// the stream is left unread.
fn read_capped<R: Read>(reader: R, limit: usize) -> io::Result<(Vec<u8>, bool)> {
    let mut bytes = Vec::new();
    reader.take(limit as u64 + 1).read_to_end(&mut bytes)?;
    let truncated = bytes.len() > limit;
    bytes.truncate(limit);
    Ok((bytes, truncated))
}

fn reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}
