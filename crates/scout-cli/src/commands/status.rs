//! Status command - show index and cache status.

use crate::app::App;
use scout_core::Config;

/// Run the status command.
pub fn run(config: Config) -> anyhow::Result<()> {
    let app = App::new(config)?;

    println!("Scout Status");
    println!("============");
    println!();

    println!("Roots:");
    if app.config.index.roots.is_empty() {
        println!("  (none configured)");
    }
    for root in &app.config.index.roots {
        let marker = if root.is_dir() { "✓" } else { "⚠ missing" };
        println!("  {} {}", root.display(), marker);
    }
    println!();

    match app.store.load() {
        Ok(Some(files)) => {
            println!("File index:");
            println!("  Documents:       {}", files.len());
        }
        Ok(None) => {
            println!("No index yet. Run 'scout index' to build it.");
        }
        Err(e) => {
            println!("File index unreadable ({}). Run 'scout index --force'.", e);
        }
    }

    let stats = app.engine.cache_stats();
    println!();
    println!("Content cache:");
    println!("  Cached pages:    {}", stats.entries);
    println!("  Failed:          {}", stats.failed);
    println!("  Extractor:       {}", app.config.extractor.program.display());
    println!("  Workers:         {}", app.config.search.workers);

    println!();
    println!("Cache directory: {}", app.cache_dir.display());

    Ok(())
}
