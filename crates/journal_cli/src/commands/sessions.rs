//! Session listing and inspection commands.

use super::{format_date, open_journal};
use anyhow::Result;
use console::style;
use journal_core::normalize;
use std::path::Path;

/// List persisted sessions, optionally filtered by mode or recency.
pub fn list(root: &Path, mode: Option<&str>, days: Option<i64>) -> Result<()> {
    let (_, store) = open_journal(root)?;

    let docs = match (mode, days) {
        (Some(mode), _) => store.get_sessions_by_mode(mode)?,
        (None, Some(days)) => {
            let now = chrono::Utc::now().timestamp_millis();
            store.get_sessions_between(now - days * 24 * 60 * 60 * 1000, now)?
        }
        (None, None) => store.get_all_sessions()?,
    };

    if docs.is_empty() {
        println!("No sessions found.");
        return Ok(());
    }

    println!(
        "{:>6}  {:<16}  {:<12}  {:>5}  {:>12}",
        "id", "date", "mode", "ops", "result"
    );
    for doc in &docs {
        match normalize(doc) {
            Some(session) => {
                let result = session.financial_result;
                let styled = if result >= 0.0 {
                    style(format!("{:>12.2}", result)).green()
                } else {
                    style(format!("{:>12.2}", result)).red()
                };
                println!(
                    "{:>6}  {:<16}  {:<12}  {:>5}  {}",
                    session.id.map_or_else(|| "?".to_string(), |id| id.to_string()),
                    format_date(session.date),
                    session.mode,
                    session.operation_count,
                    styled
                );
            }
            None => println!("{} unreadable record skipped", style("!").yellow()),
        }
    }
    println!("{} session(s)", docs.len());
    Ok(())
}

/// Show one session with its full operation history.
pub fn show(root: &Path, id: u64) -> Result<()> {
    let (_, store) = open_journal(root)?;

    let Some(doc) = store.get_session_by_id(id)? else {
        println!("{} Session {} not found.", style("✗").red(), id);
        return Ok(());
    };
    let Some(session) = normalize(&doc) else {
        println!(
            "{} Session {} is not normalizable; run `journal repair fill`.",
            style("!").yellow(),
            id
        );
        return Ok(());
    };

    println!("Session {}", id);
    println!("  date:   {}", format_date(session.date));
    println!("  mode:   {}", session.mode);
    println!("  result: {:.2}", session.financial_result);
    println!("  operations: {}", session.operation_count);

    for (index, op) in session.combined_history.iter().enumerate() {
        let outcome = if op.is_win {
            style("win ").green()
        } else {
            style("loss").red()
        };
        let value = op
            .value
            .map_or_else(|| "?".to_string(), |v| format!("{:+.2}", v));
        let tag = op.tag.as_deref().unwrap_or("-");
        println!(
            "  [{:>3}] {} {} {:>10}  tag: {}",
            index, op.timestamp, outcome, value, tag
        );
        if let Some(note) = &op.note {
            println!("        note: {}", note);
        }
    }
    Ok(())
}

/// Delete a session, soft by default.
pub fn delete(root: &Path, id: u64, hard: bool) -> Result<()> {
    let (config, store) = open_journal(root)?;

    if hard {
        store.delete_session(id)?;
        println!("{} Session {} deleted.", style("✓").green(), id);
    } else {
        let ttl = chrono::Duration::days(i64::from(config.storage.trash_ttl_days));
        match store.soft_delete_session(id, ttl)? {
            Some(_) => println!(
                "{} Session {} moved to trash (expires in {} days).",
                style("✓").green(),
                id,
                config.storage.trash_ttl_days
            ),
            None => println!("{} Session {} not found.", style("✗").red(), id),
        }
    }
    Ok(())
}
