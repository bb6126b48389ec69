//! Index command - crawl the roots and rebuild the file index.

use crate::app::App;
use scout_core::Config;

/// Run the index command.
pub fn run(config: Config, force: bool) -> anyhow::Result<()> {
    let app = App::new(config)?;

    if app.store.exists() && !force {
        let files = app.store.load()?.unwrap_or_default();
        println!("Index already exists with {} documents.", files.len());
        println!("Use --force to reindex from scratch.");
        return Ok(());
    }

    if app.config.index.roots.is_empty() {
        eprintln!("No roots configured. Add [index] roots to the configuration file.");
        return Ok(());
    }

    println!("Indexing folders...");
    for root in &app.config.index.roots {
        println!("  {}", root.display());
    }
    println!();

    let report = app.rebuild_index()?;
    let secs = report.elapsed_ms as f64 / 1000.0;

    println!("Indexing complete!");
    println!("  Documents:  {}", report.files().len());
    println!("  Skipped:    {}", report.crawl.skipped_count());
    println!("  Time:       {:.2}s", secs);

    for skipped in report.crawl.skipped.iter().take(10) {
        eprintln!("  skipped {} ({})", skipped.path.display(), skipped.reason);
    }
    if report.crawl.skipped_count() > 10 {
        eprintln!("  ... and {} more", report.crawl.skipped_count() - 10);
    }

    Ok(())
}
