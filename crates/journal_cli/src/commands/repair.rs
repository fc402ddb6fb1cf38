//! Repair commands: detect and heal corrupted session records.

use super::open_journal;
use anyhow::Result;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

fn sweep_spinner(message: &'static str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .expect("valid template"),
    );
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Remove corrupted session records.
pub fn clear(root: &Path) -> Result<()> {
    let (_, store) = open_journal(root)?;

    let spinner = sweep_spinner("Scanning for corrupted sessions...");
    let removed = store.clear_corrupted()?;
    spinner.finish_and_clear();

    if removed == 0 {
        println!("{} No corrupted sessions found.", style("✓").green());
    } else {
        println!(
            "{} Removed {} corrupted session(s).",
            style("✓").green(),
            removed
        );
    }
    Ok(())
}

/// Repair corrupted session records in place.
pub fn fill(root: &Path) -> Result<()> {
    let (_, store) = open_journal(root)?;

    let spinner = sweep_spinner("Repairing corrupted sessions...");
    let repaired = store.repair_corrupted()?;
    spinner.finish_and_clear();

    if repaired == 0 {
        println!("{} No corrupted sessions found.", style("✓").green());
    } else {
        println!(
            "{} Repaired {} session(s) with safe defaults.",
            style("✓").green(),
            repaired
        );
    }
    Ok(())
}

/// Recompute invalid financial results.
pub fn results(root: &Path) -> Result<()> {
    let (_, store) = open_journal(root)?;

    let spinner = sweep_spinner("Recomputing invalid financial results...");
    let outcome = store.repair_invalid_results()?;
    spinner.finish_and_clear();

    println!(
        "{} Examined {} session(s): {} repaired, {} error(s).",
        if outcome.errors == 0 {
            style("✓").green()
        } else {
            style("!").yellow()
        },
        outcome.total,
        outcome.repaired,
        outcome.errors
    );
    Ok(())
}
