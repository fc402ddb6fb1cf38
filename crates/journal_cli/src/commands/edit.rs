//! Archived-operation edit command.

use super::open_journal;
use anyhow::Result;
use console::style;
use journal_core::{
    JournalError, NoopGoalEvaluator, NoopPlanAdvancer, OperationLedger,
};
use std::path::Path;

/// Flip the outcome of one operation in a persisted session.
///
/// The ledger recomputes the session's aggregate result over the whole
/// history and writes the record back through the store.
pub fn run(root: &Path, session: u64, index: usize, is_win: bool) -> Result<()> {
    let (config, store) = open_journal(root)?;

    let mut ledger = OperationLedger::new(
        store,
        Box::new(NoopPlanAdvancer),
        Box::new(NoopGoalEvaluator),
        config.session,
    );

    match ledger.edit_archived_operation(session, index, is_win) {
        Ok(()) => {
            println!(
                "{} Operation {} of session {} set to {}.",
                style("✓").green(),
                index,
                session,
                if is_win { "win" } else { "loss" }
            );
            Ok(())
        }
        Err(e) => {
            let message = e
                .user_message()
                .map(str::to_string)
                .unwrap_or_else(|| match &e {
                    JournalError::SessionNotFound(_)
                    | JournalError::OperationOutOfRange { .. } => e.to_string(),
                    _ => format!("could not edit the operation: {e}"),
                });
            println!("{} {}", style("✗").red(), message);
            Ok(())
        }
    }
}
