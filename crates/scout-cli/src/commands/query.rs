//! Query command - search document contents.

use crate::app::App;
use crate::OutputFormat;
use scout_core::{extract_snippet, highlight_match, Config};
use std::time::Instant;

/// Run the query command.
pub fn run(
    config: Config,
    text: &str,
    limit: usize,
    snippets: bool,
    output: OutputFormat,
) -> anyhow::Result<()> {
    let app = App::new(config)?;

    if !app.engine.accepts(text) {
        eprintln!(
            "Query must be at least {} characters.",
            app.config.search.min_query_len
        );
        return Ok(());
    }

    let files = app.files()?;
    if files.is_empty() {
        eprintln!("Index is empty. Check the configured roots and run 'scout index --force'.");
        return Ok(());
    }

    let start = Instant::now();
    let results = app.engine.search(&files, text)?;
    let elapsed = start.elapsed();
    let radius = app.config.search.snippet_radius;

    let snippet_for = |path: &str| -> String {
        let cached = app.engine.cached_text(path).unwrap_or_default();
        highlight_match(&extract_snippet(&cached, text, radius), text)
    };

    match output {
        OutputFormat::Text => {
            for file in results.iter().take(limit) {
                println!("{}", file.path);
                if snippets {
                    let snippet = snippet_for(&file.path);
                    if !snippet.is_empty() {
                        println!("    …{}…", snippet);
                    }
                }
            }

            eprintln!();
            eprintln!(
                "Found {} of {} documents in {:.3}s",
                results.len(),
                files.len(),
                elapsed.as_secs_f64()
            );
        }
        OutputFormat::Json => {
            let json_results: Vec<serde_json::Value> = results
                .iter()
                .take(limit)
                .map(|file| {
                    let mut value = serde_json::json!({
                        "name": file.file_name(),
                        "path": file.path,
                        "mtime": file.mtime,
                        "modified": file.modified().map(|t| t.to_rfc3339()),
                    });
                    if snippets {
                        value["snippet"] = serde_json::Value::String(snippet_for(&file.path));
                    }
                    value
                })
                .collect();

            println!("{}", serde_json::to_string_pretty(&json_results)?);
        }
    }

    Ok(())
}
