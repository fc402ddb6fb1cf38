//! Crash-recovery scenarios built on the quick-save slot.

use crate::harness::{
    doubling_plan, open_store, test_session_config, SequentialAdvancer, ThresholdGoals,
};
use journal_core::{EntrySlot, OperationLedger, StakeIntent};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

fn never_goals() -> ThresholdGoals {
    ThresholdGoals {
        stop_win: f64::MAX,
        stop_loss: f64::MAX,
    }
}

#[test]
fn test_resume_after_simulated_crash() {
    let tmp = TempDir::new().unwrap();

    // First process: run half a session, then vanish without ending it.
    let live_state = {
        let store = Arc::new(open_store(tmp.path()));
        let mut ledger = OperationLedger::new(
            store,
            Box::new(SequentialAdvancer),
            Box::new(never_goals()),
            test_session_config(),
        );
        ledger.start_session(doubling_plan(), None).unwrap();
        ledger
            .stage(StakeIntent {
                index: 0,
                is_win: true,
                slot: EntrySlot::First,
            })
            .unwrap();
        ledger.finalize(Some("trend"), None).unwrap();
        ledger.state().clone()
    };

    // Second process: resume from the quick-save slot.
    let store = Arc::new(open_store(tmp.path()));
    let mut ledger = OperationLedger::new(
        store.clone(),
        Box::new(SequentialAdvancer),
        Box::new(never_goals()),
        test_session_config(),
    );
    assert!(ledger.resume_session().unwrap());
    assert_eq!(ledger.state(), &live_state);
    assert_eq!(ledger.state().current_capital, 1_036.0);
    assert_eq!(ledger.state().history.len(), 1);

    // The resumed session keeps working and ends normally.
    ledger
        .stage(StakeIntent {
            index: 1,
            is_win: false,
            slot: EntrySlot::First,
        })
        .unwrap();
    ledger.finalize(None, None).unwrap();
    let id = ledger.end_session().unwrap();

    let doc = store.get_session_by_id(id).unwrap().unwrap();
    assert_eq!(doc["operation_count"], json!(2));
    assert_eq!(doc["financial_result"], json!(-4.0));
    assert!(store.load_active_snapshot().is_none());
}

#[test]
fn test_nothing_to_resume_on_fresh_journal() {
    let tmp = TempDir::new().unwrap();
    let store = Arc::new(open_store(tmp.path()));
    let mut ledger = OperationLedger::new(
        store,
        Box::new(SequentialAdvancer),
        Box::new(never_goals()),
        test_session_config(),
    );

    assert!(!ledger.resume_session().unwrap());
    assert!(!ledger.state().session_active);
}

#[test]
fn test_records_survive_store_reopen() {
    let tmp = TempDir::new().unwrap();

    let id = {
        let store = open_store(tmp.path());
        store
            .add_session(&json!({
                "date": 42,
                "mode": "official",
                "combined_history": [{ "is_win": true, "value": 10.0 }],
                "financial_result": 10.0,
            }))
            .unwrap()
    };

    let store = open_store(tmp.path());
    let doc = store.get_session_by_id(id).unwrap().unwrap();
    assert_eq!(doc["financial_result"], json!(10.0));
    assert_eq!(store.get_sessions_by_mode("official").unwrap().len(), 1);
    assert_eq!(store.get_sessions_between(0, 100).unwrap().len(), 1);
}

#[test]
fn test_undone_work_is_not_resumed() {
    let tmp = TempDir::new().unwrap();

    {
        let store = Arc::new(open_store(tmp.path()));
        let mut ledger = OperationLedger::new(
            store,
            Box::new(SequentialAdvancer),
            Box::new(never_goals()),
            test_session_config(),
        );
        ledger.start_session(doubling_plan(), None).unwrap();
        ledger
            .stage(StakeIntent {
                index: 0,
                is_win: true,
                slot: EntrySlot::First,
            })
            .unwrap();
        ledger.finalize(None, None).unwrap();
        // The undo persists the restored state before the "crash".
        assert!(ledger.undo().unwrap());
    }

    let store = Arc::new(open_store(tmp.path()));
    let mut ledger = OperationLedger::new(
        store,
        Box::new(SequentialAdvancer),
        Box::new(never_goals()),
        test_session_config(),
    );
    assert!(ledger.resume_session().unwrap());
    assert!(ledger.state().history.is_empty());
    assert_eq!(ledger.state().current_capital, 1_000.0);
}
