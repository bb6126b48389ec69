//! Clear command - remove the file index and content cache.

use crate::app::App;
use scout_core::Config;
use std::io::{self, Write};

/// Run the clear command.
pub fn run(config: Config, skip_confirm: bool) -> anyhow::Result<()> {
    let app = App::new(config)?;

    if !app.store.exists() && app.engine.cache_stats().entries == 0 {
        println!("No index found. Nothing to clear.");
        return Ok(());
    }

    if !skip_confirm {
        print!("This will delete the index and all cached text. Are you sure? [y/N] ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Cancelled.");
            return Ok(());
        }
    }

    app.store.clear()?;
    app.engine.clear_cache()?;
    println!("Index and content cache cleared.");

    Ok(())
}
