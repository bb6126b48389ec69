//! # Scout CLI
//!
//! Command-line interface for the Scout PDF content search tool.
//!
//! ## Commands
//!
//! - `scout index` - Crawl the configured roots and rebuild the file index
//! - `scout query <text>` - Find documents whose first page contains the text
//! - `scout preview <path> [text]` - Show cached text or a highlighted snippet
//! - `scout extract <path>` - Run the text extractor on one document
//! - `scout status` - Show index and cache statistics
//! - `scout clear` - Delete the index and the content cache
//!
//! ## Example Usage
//!
//! ```bash
//! # Build the index (also happens on the first query)
//! scout index
//!
//! # Search inside PDFs, with preview snippets
//! scout query "purchase order" --snippets
//! ```

mod app;
mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Scout - search inside PDFs by content
#[derive(Parser)]
#[command(name = "scout")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, env = "SCOUT_CONFIG")]
    config: Option<PathBuf>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl the configured roots and rebuild the file index
    Index {
        /// Rebuild even if an index already exists
        #[arg(short, long)]
        force: bool,
    },

    /// Search document contents
    #[command(alias = "q")]
    Query {
        /// Text to look for (case-insensitive)
        text: String,

        /// Maximum number of results to show
        #[arg(short, long, default_value = "100")]
        limit: usize,

        /// Print a highlighted snippet under each result
        #[arg(short, long)]
        snippets: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        output: OutputFormat,
    },

    /// Show the cached text of a document
    Preview {
        /// Document path as stored in the index
        path: String,

        /// Show a highlighted snippet around this text instead of the full preview
        text: Option<String>,
    },

    /// Run the text extractor on a single document
    Extract {
        /// Document to extract
        path: PathBuf,
    },

    /// Show index and cache status
    Status,

    /// Delete the file index and the content cache
    Clear {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Clone, Debug, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration before logging so the configured level can apply
    let config = match &cli.config {
        Some(path) => scout_core::Config::load_from(path)?,
        None => scout_core::Config::load()?,
    };

    let log_level = if cli.quiet {
        "error".to_string()
    } else {
        match cli.verbose {
            0 => config.general.log_level.clone(),
            1 => "debug".to_string(),
            _ => "trace".to_string(),
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)))
        .init();

    match cli.command {
        Commands::Index { force } => commands::index::run(config, force),
        Commands::Query {
            text,
            limit,
            snippets,
            output,
        } => commands::query::run(config, &text, limit, snippets, output),
        Commands::Preview { path, text } => commands::preview::run(config, &path, text.as_deref()),
        Commands::Extract { path } => commands::extract::run(config, &path),
        Commands::Status => commands::status::run(config),
        Commands::Clear { yes } => commands::clear::run(config, yes),
    }
}
