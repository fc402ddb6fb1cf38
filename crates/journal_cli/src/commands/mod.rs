//! Command implementations.

pub mod edit;
pub mod import;
pub mod init;
pub mod repair;
pub mod sessions;
pub mod trash;

use anyhow::{Context, Result};
use journal_core::{Config, SessionStore};
use std::path::Path;
use std::sync::Arc;

/// Loads the configuration and opens the store for a journal directory.
pub fn open_journal(root: &Path) -> Result<(Config, Arc<SessionStore>)> {
    let config = Config::load(root).context("failed to load journal configuration")?;
    let store = SessionStore::open(root, &config.storage)
        .context("failed to open the session store")?;
    Ok((config, Arc::new(store)))
}

/// Formats an epoch-millisecond date for display.
pub fn format_date(millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| format!("@{millis}"))
}
