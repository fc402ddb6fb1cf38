//! Import command: load session records from a JSON export.

use super::open_journal;
use anyhow::{bail, Context, Result};
use console::style;
use serde_json::Value;
use std::path::Path;

/// Import a JSON array of session records.
///
/// The default path normalizes every record and writes the whole file as one
/// atomic batch: either every record lands or none do. `--raw` bypasses
/// normalization for legacy exports and imports record by record; whatever is
/// broken in them is left for the repair sweeps.
pub fn run(root: &Path, file: &Path, raw: bool) -> Result<()> {
    let (_, store) = open_journal(root)?;

    let content = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let records: Vec<Value> = match serde_json::from_str::<Value>(&content)
        .context("file is not valid JSON")?
    {
        Value::Array(records) => records,
        _ => bail!("expected a JSON array of session records"),
    };

    if records.is_empty() {
        println!("Nothing to import.");
        return Ok(());
    }

    if raw {
        let mut imported = 0;
        let mut skipped = 0;
        for record in &records {
            match store.import_raw(record) {
                Ok(_) => imported += 1,
                Err(e) => {
                    eprintln!("{} record skipped: {}", style("!").yellow(), e);
                    skipped += 1;
                }
            }
        }
        println!(
            "{} Imported {} record(s) verbatim ({} skipped).",
            style("✓").green(),
            imported,
            skipped
        );
        if imported > 0 {
            println!("  Run `journal repair fill` to heal legacy records.");
        }
        return Ok(());
    }

    match store.add_sessions_batch(&records, None) {
        Ok(result) => {
            println!(
                "{} Imported {} of {} record(s) in one transaction.",
                style("✓").green(),
                result.success_count,
                result.total
            );
            Ok(())
        }
        Err(e) => {
            println!(
                "{} Import rejected, nothing was written: {}",
                style("✗").red(),
                e
            );
            println!("  Fix the file, or use --raw to import verbatim and repair afterwards.");
            Ok(())
        }
    }
}
