//! Extract command - run the configured converter on one document.

use scout_core::{CommandExtractor, Config, Extraction, ScoutError, TextExtractor};
use std::path::Path;

/// Run the extract command.
pub fn run(config: Config, path: &Path) -> anyhow::Result<()> {
    let extractor = CommandExtractor::new(&config.extractor);

    match extractor.extract_first_page(path) {
        Extraction::Text(text) => {
            println!("{}", text);
            Ok(())
        }
        Extraction::EmptyPage => {
            eprintln!("The first page of {} has no text.", path.display());
            Ok(())
        }
        Extraction::Failed(source) => Err(ScoutError::Extraction {
            path: path.to_path_buf(),
            source,
        }
        .into()),
    }
}
