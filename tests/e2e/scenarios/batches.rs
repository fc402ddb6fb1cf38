//! Batch write scenarios: atomicity and wholesale rejection.

use crate::harness::TestJournal;
use serde_json::{json, Value};

fn record(date: i64, mode: &str, result: f64) -> Value {
    json!({
        "date": date,
        "mode": mode,
        "combined_history": [{ "is_win": result >= 0.0, "value": result }],
        "financial_result": result,
    })
}

#[test]
fn test_batch_add_commits_everything() {
    let journal = TestJournal::new();

    let records = vec![
        record(1_000, "official", 25.0),
        record(2_000, "official", -10.0),
        record(3_000, "simulation", 40.0),
    ];
    let result = journal.store.add_sessions_batch(&records, None).unwrap();
    assert_eq!(result.success_count, 3);
    assert_eq!(result.total, 3);

    let all = journal.store.get_all_sessions().unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(
        journal.store.get_sessions_by_mode("official").unwrap().len(),
        2
    );
}

#[test]
fn test_batch_add_rejects_wholesale() {
    let journal = TestJournal::new();
    journal.store.add_session(&record(1, "official", 5.0)).unwrap();

    // The second item is not even an object; the whole batch must reject
    // without touching the store.
    let records = vec![record(2, "official", 1.0), json!("broken"), record(3, "m", 2.0)];
    assert!(journal.store.add_sessions_batch(&records, None).is_err());

    assert_eq!(journal.store.get_all_sessions().unwrap().len(), 1);
}

#[test]
fn test_batch_update_roundtrip() {
    let journal = TestJournal::new();

    let a = journal.store.add_session(&record(1, "official", 5.0)).unwrap();
    let b = journal.store.add_session(&record(2, "official", 6.0)).unwrap();

    let mut doc_a = journal.store.get_session_by_id(a).unwrap().unwrap();
    let mut doc_b = journal.store.get_session_by_id(b).unwrap().unwrap();
    doc_a["mode"] = json!("simulation");
    doc_b["mode"] = json!("simulation");

    let result = journal
        .store
        .update_sessions_batch(&[doc_a, doc_b], Some("e2e_update"))
        .unwrap();
    assert_eq!(result.success_count, 2);
    assert_eq!(result.request_id, "e2e_update");

    assert!(journal.store.get_sessions_by_mode("official").unwrap().is_empty());
    assert_eq!(
        journal.store.get_sessions_by_mode("simulation").unwrap().len(),
        2
    );
}

#[test]
fn test_batch_delete_counts_missing_as_success() {
    let journal = TestJournal::new();

    let a = journal.store.add_session(&record(1, "m", 0.0)).unwrap();
    let b = journal.store.add_session(&record(2, "m", 0.0)).unwrap();

    let result = journal
        .store
        .delete_sessions_batch(&[a, b, 12_345], None)
        .unwrap();
    assert_eq!(result.success_count, 3);
    assert!(journal.store.get_all_sessions().unwrap().is_empty());
}

#[test]
fn test_empty_batches_short_circuit() {
    let journal = TestJournal::new();

    assert_eq!(
        journal
            .store
            .add_sessions_batch(&[], None)
            .unwrap()
            .success_count,
        0
    );
    assert_eq!(
        journal
            .store
            .update_sessions_batch(&[], None)
            .unwrap()
            .success_count,
        0
    );
    assert_eq!(
        journal
            .store
            .delete_sessions_batch(&[], None)
            .unwrap()
            .success_count,
        0
    );
}
