//! Preview command - show what the cache holds for one document.

use crate::app::App;
use chrono::{DateTime, Local};
use scout_core::snippet::{preview_excerpt, DEFAULT_PREVIEW_CHARS};
use scout_core::{extract_snippet, highlight_match, Config, IndexedFile};

/// Run the preview command.
pub fn run(config: Config, path: &str, text: Option<&str>) -> anyhow::Result<()> {
    let app = App::new(config)?;

    let indexed = app
        .store
        .load()?
        .unwrap_or_default()
        .into_iter()
        .find(|f| f.path == path);
    let entry = app.engine.cached_entry(path);

    let name = IndexedFile::new(path, 0).file_name().to_string();
    println!("# {}", name);
    println!();
    println!("  Where:          {}", path);
    println!("  Type:           PDF document");
    if let Some(modified) = indexed.as_ref().and_then(|f| f.modified()) {
        let local: DateTime<Local> = modified.into();
        println!("  Last modified:  {}", local.format("%Y-%m-%d %H:%M:%S"));
    }
    if indexed.is_none() {
        println!("  Note:           not in the current index");
    }
    println!();

    let rendered = match (text, entry) {
        (_, None) => "_Not extracted yet. Run a query first._".to_string(),
        (_, Some(entry)) if entry.failed => "_Text extraction failed for this document._".to_string(),
        (Some(query), Some(entry)) => {
            let snippet = extract_snippet(&entry.text, query, app.config.search.snippet_radius);
            let highlighted = highlight_match(&snippet, query);
            if highlighted.is_empty() {
                "_No preview available_".to_string()
            } else {
                format!("…{}…", highlighted)
            }
        }
        (None, Some(entry)) => {
            let excerpt = preview_excerpt(&entry.text, DEFAULT_PREVIEW_CHARS);
            if excerpt.trim().is_empty() {
                "_No extractable text found on first page._".to_string()
            } else {
                excerpt.to_string()
            }
        }
    };

    println!("{}", rendered);
    Ok(())
}
