//! Journal initialization command.

use anyhow::Result;
use console::style;
use journal_core::{Config, SessionStore};
use std::path::Path;

/// Create the journal directory, default configuration, and store schema.
pub fn run(root: &Path) -> Result<()> {
    std::fs::create_dir_all(root)?;

    let config_path = root.join("config.toml");
    if config_path.exists() {
        println!(
            "{} Journal already initialized at {}",
            style("✓").green(),
            root.display()
        );
        return Ok(());
    }

    let config = Config::default();
    config.save(root)?;

    // Opening the store once creates the schema idempotently.
    let store = SessionStore::open(root, &config.storage)?;
    drop(store);

    println!(
        "{} Initialized journal at {}",
        style("✓").green(),
        root.display()
    );
    println!("  config:   {}", config_path.display());
    println!("  database: {}", root.join(&config.storage.db_file).display());
    Ok(())
}
