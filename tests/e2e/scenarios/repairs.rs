//! Repair sweep scenarios over imported legacy data.

use crate::harness::TestJournal;
use journal_core::{RepairOutcome, DEFAULT_MODE};
use serde_json::json;

#[test]
fn test_legacy_import_then_clear() {
    let journal = TestJournal::new();

    journal
        .store
        .add_session(&json!({
            "date": 1_000,
            "mode": "official",
            "combined_history": [],
            "financial_result": 0.0,
        }))
        .unwrap();
    journal
        .store
        .import_raw(&json!({ "combined_history": "legacy blob" }))
        .unwrap();
    journal.store.import_raw(&json!({ "mode": "official" })).unwrap();

    let removed = journal.store.clear_corrupted().unwrap();
    assert_eq!(removed, 2);
    assert_eq!(journal.store.get_all_sessions().unwrap().len(), 1);
}

#[test]
fn test_legacy_import_then_fill_makes_records_queryable() {
    let journal = TestJournal::new();

    // A record with no mode is invisible to the mode index until repaired.
    journal
        .store
        .import_raw(&json!({ "combined_history": [{ "value": 9.0 }] }))
        .unwrap();
    assert!(journal
        .store
        .get_sessions_by_mode(DEFAULT_MODE)
        .unwrap()
        .is_empty());

    let repaired = journal.store.repair_corrupted().unwrap();
    assert_eq!(repaired, 1);

    let healed = journal.store.get_sessions_by_mode(DEFAULT_MODE).unwrap();
    assert_eq!(healed.len(), 1);
    // Write-back went through normalization, so the aggregates are sound.
    assert_eq!(healed[0]["operation_count"], json!(1));
    assert_eq!(healed[0]["financial_result"], json!(9.0));
}

#[test]
fn test_invalid_results_sweep_reports_counts() {
    let journal = TestJournal::new();

    for date in 1..=3i64 {
        journal
            .store
            .add_session(&json!({
                "date": date,
                "mode": "official",
                "combined_history": [{ "is_win": true, "value": 10.0 }],
                "financial_result": 10.0,
            }))
            .unwrap();
    }
    journal
        .store
        .import_raw(&json!({
            "date": 4,
            "mode": "official",
            "operation_count": 0,
            "financial_result": "NaN",
            "combined_history": [
                { "is_win": true, "value": 100.0 },
                { "is_win": false, "value": -50.0 },
                "junk",
            ],
        }))
        .unwrap();

    let outcome = journal.store.repair_invalid_results().unwrap();
    assert_eq!(
        outcome,
        RepairOutcome {
            repaired: 1,
            errors: 0,
            total: 4
        }
    );

    let all = journal.store.get_all_sessions().unwrap();
    let healed = all.iter().find(|d| d["date"] == json!(4)).unwrap();
    assert_eq!(healed["financial_result"], json!(50.0));
    // The write-back normalizes, so the junk entry is gone from the count.
    assert_eq!(healed["operation_count"], json!(2));
}

#[test]
fn test_sweeps_are_idempotent() {
    let journal = TestJournal::new();

    journal.store.import_raw(&json!({ "mode": "official" })).unwrap();

    assert_eq!(journal.store.repair_corrupted().unwrap(), 1);
    assert_eq!(journal.store.repair_corrupted().unwrap(), 0);
    assert_eq!(journal.store.clear_corrupted().unwrap(), 0);
    assert_eq!(
        journal.store.repair_invalid_results().unwrap(),
        RepairOutcome {
            repaired: 0,
            errors: 0,
            total: 1
        }
    );
}
