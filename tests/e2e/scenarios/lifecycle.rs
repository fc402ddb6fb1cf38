//! Session lifecycle scenarios: stage, commit, undo, edit, end.

use crate::harness::{doubling_plan, TestJournal, ThresholdGoals};
use journal_core::{EntrySlot, StakeIntent};
use serde_json::json;

#[test]
fn test_full_run_commits_and_persists() {
    let mut journal = TestJournal::new();
    journal
        .ledger
        .start_session(doubling_plan(), None)
        .unwrap();

    let win = journal.win(0);
    assert_eq!(win.value, Some(36.0));
    let loss = journal.loss(1);
    assert_eq!(loss.value, Some(-40.0));

    assert_eq!(journal.ledger.state().current_capital, 996.0);
    assert_eq!(journal.ledger.state().next_step_index, 2);

    let id = journal.ledger.end_session().unwrap();
    let doc = journal.store.get_session_by_id(id).unwrap().unwrap();
    assert_eq!(doc["mode"], json!("official"));
    assert_eq!(doc["operation_count"], json!(2));
    assert_eq!(doc["financial_result"], json!(-4.0));

    assert!(journal.events.contains("session_ended"));
    assert!(!journal.ledger.state().session_active);
}

#[test]
fn test_goal_reached_ends_the_flow() {
    let mut journal = TestJournal::with_goals(ThresholdGoals {
        stop_win: 36.0,
        stop_loss: 100.0,
    });
    journal
        .ledger
        .start_session(doubling_plan(), None)
        .unwrap();

    journal.win(0);

    assert!(journal.ledger.state().goal_reached);
    let events = journal.events.names();
    // The goal notification is the final step of the commit.
    assert_eq!(events.last().map(String::as_str), Some("goal_reached"));
}

#[test]
fn test_stop_loss_threshold() {
    let mut journal = TestJournal::with_goals(ThresholdGoals {
        stop_win: 1_000.0,
        stop_loss: 60.0,
    });
    journal
        .ledger
        .start_session(doubling_plan(), None)
        .unwrap();

    journal.loss(0); // -20
    assert!(!journal.ledger.state().goal_reached);
    journal.loss(1); // -40, total -60
    assert!(journal.ledger.state().goal_reached);
    assert!(journal.events.contains("goal_reached"));
}

#[test]
fn test_undo_chain_restores_initial_state() {
    let mut journal = TestJournal::new();
    journal
        .ledger
        .start_session(doubling_plan(), None)
        .unwrap();
    let initial = journal.ledger.state().clone();

    journal.win(0);
    journal.loss(1);
    journal.win(2);
    assert_eq!(journal.ledger.undo_depth(), 3);

    assert!(journal.ledger.undo().unwrap());
    assert!(journal.ledger.undo().unwrap());
    assert!(journal.ledger.undo().unwrap());

    assert_eq!(journal.ledger.state(), &initial);
    assert!(!journal.ledger.undo().unwrap());
}

#[test]
fn test_edit_in_session_and_undo_the_edit() {
    let mut journal = TestJournal::new();
    journal
        .ledger
        .start_session(doubling_plan(), None)
        .unwrap();

    journal.win(0);
    assert_eq!(journal.ledger.state().current_capital, 1_036.0);

    journal.ledger.edit_operation(0, false).unwrap();
    assert_eq!(journal.ledger.state().current_capital, 980.0);
    assert_eq!(journal.ledger.state().history[0].value, Some(-20.0));

    assert!(journal.ledger.undo().unwrap());
    assert_eq!(journal.ledger.state().current_capital, 1_036.0);
    assert_eq!(journal.ledger.state().history[0].value, Some(36.0));
}

#[test]
fn test_annotations_land_on_the_operation() {
    let mut journal = TestJournal::new();
    journal
        .ledger
        .start_session(doubling_plan(), None)
        .unwrap();

    journal
        .ledger
        .stage(StakeIntent {
            index: 0,
            is_win: true,
            slot: EntrySlot::First,
        })
        .unwrap();
    let op = journal
        .ledger
        .finalize(Some("breakout"), Some("  entered on retest  "))
        .unwrap();

    assert_eq!(op.tag.as_deref(), Some("breakout"));
    assert_eq!(op.note.as_deref(), Some("entered on retest"));

    // A whitespace-only note is dropped.
    journal
        .ledger
        .stage(StakeIntent {
            index: 1,
            is_win: false,
            slot: EntrySlot::First,
        })
        .unwrap();
    let op = journal.ledger.finalize(None, Some("   ")).unwrap();
    assert_eq!(op.note, None);
}

#[test]
fn test_archived_edit_after_session_ends() {
    let mut journal = TestJournal::new();
    journal
        .ledger
        .start_session(doubling_plan(), None)
        .unwrap();
    journal.win(0);
    journal.win(1);
    let id = journal.ledger.end_session().unwrap();

    journal.ledger.edit_archived_operation(id, 0, false).unwrap();

    let doc = journal.store.get_session_by_id(id).unwrap().unwrap();
    // Op 0 flipped to a loss of its entry; op 1 untouched: -20 + 72.
    assert_eq!(doc["financial_result"], json!(52.0));
    assert!(journal.events.contains("archived_edited"));
}
