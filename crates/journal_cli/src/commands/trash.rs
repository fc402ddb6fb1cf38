//! Trash partition commands.

use super::{format_date, open_journal};
use anyhow::Result;
use console::style;
use std::path::Path;

/// List every record in the trash partition.
pub fn list(root: &Path) -> Result<()> {
    let (_, store) = open_journal(root)?;

    let records = store.list_trash()?;
    if records.is_empty() {
        println!("Trash is empty.");
        return Ok(());
    }

    println!("{:>6}  {:<10}  {:<16}", "id", "kind", "expires");
    for record in &records {
        println!(
            "{:>6}  {:<10}  {:<16}",
            record.id,
            record.kind,
            format_date(record.expire_at)
        );
    }
    println!("{} record(s)", records.len());
    Ok(())
}

/// Remove expired trash records.
pub fn purge(root: &Path) -> Result<()> {
    let (_, store) = open_journal(root)?;

    let now = chrono::Utc::now().timestamp_millis();
    let purged = store.purge_expired_trash(now)?;
    if purged == 0 {
        println!("{} Nothing to purge.", style("✓").green());
    } else {
        println!(
            "{} Purged {} expired record(s).",
            style("✓").green(),
            purged
        );
    }
    Ok(())
}
