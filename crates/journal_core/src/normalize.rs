//! Session record normalization.
//!
//! Canonicalizes a raw session document into a well-formed [`Session`]:
//! history entries that are not objects are dropped, the operation count is
//! always recomputed, and the aggregate result is healed only when the stored
//! value is not a finite number. Pure and idempotent; no I/O.

use crate::types::{Operation, Session, DEFAULT_MODE};
use serde_json::Value;
use tracing::warn;

/// Normalizes a raw session document.
///
/// Returns `None` when `raw` has no identifiable structure (anything that is
/// not a JSON object). Otherwise every field is coerced to its canonical
/// shape:
///
/// - `combined_history` is forced to an array and non-object entries are
///   dropped;
/// - `operation_count` is recomputed unconditionally; it is never trusted
///   from input;
/// - `financial_result` is preserved verbatim when it is already a finite
///   number, and recomputed from the history otherwise. The asymmetry is
///   intentional: an upstream caller may pre-compute the aggregate, but a
///   corrupt or missing value is always healed;
/// - `date` defaults to now and `mode` to [`DEFAULT_MODE`] when absent or of
///   the wrong type.
pub fn normalize(raw: &Value) -> Option<Session> {
    let obj = raw.as_object()?;

    let combined_history: Vec<Operation> = obj
        .get("combined_history")
        .and_then(Value::as_array)
        .map(|entries| entries.iter().filter_map(coerce_operation).collect())
        .unwrap_or_default();

    let stored_result = obj.get("financial_result").and_then(finite_f64);
    let financial_result = match stored_result {
        Some(result) => result,
        None => {
            let recomputed = sum_operation_values(&combined_history);
            warn!(
                original = ?obj.get("financial_result"),
                recomputed, "financial_result invalid, recomputed from history"
            );
            recomputed
        }
    };

    Some(Session {
        id: obj.get("id").and_then(Value::as_u64),
        date: obj
            .get("date")
            .and_then(Value::as_i64)
            .unwrap_or_else(now_millis),
        mode: obj
            .get("mode")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_MODE)
            .to_string(),
        operation_count: combined_history.len() as u64,
        combined_history,
        financial_result,
        request_id: obj
            .get("request_id")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

/// Applies the aggregate healing rules to an already-typed session.
///
/// Used by callers that build [`Session`] values in memory: the count is
/// recomputed, a non-finite result is replaced by the history sum, and an
/// empty mode falls back to the sentinel.
pub fn canonicalize(session: &mut Session) {
    session.operation_count = session.combined_history.len() as u64;
    if !session.financial_result.is_finite() {
        session.financial_result = sum_operation_values(&session.combined_history);
    }
    if session.mode.is_empty() {
        session.mode = DEFAULT_MODE.to_string();
    }
}

/// Coerces one history entry into an [`Operation`].
///
/// Returns `None` only when the entry is not a JSON object; malformed fields
/// inside an object entry degrade to their defaults instead of dropping the
/// entry.
fn coerce_operation(entry: &Value) -> Option<Operation> {
    let obj = entry.as_object()?;
    Some(Operation {
        is_win: obj.get("is_win").and_then(Value::as_bool).unwrap_or(false),
        value: obj.get("value").and_then(finite_f64),
        entry_amount: obj.get("entry_amount").and_then(finite_f64),
        return_amount: obj.get("return_amount").and_then(finite_f64),
        payout_percent: obj
            .get("payout_percent")
            .and_then(finite_f64)
            .unwrap_or(0.0),
        tag: obj.get("tag").and_then(Value::as_str).map(str::to_string),
        note: obj.get("note").and_then(Value::as_str).map(str::to_string),
        timestamp: obj
            .get("timestamp")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    })
}

/// Sums the finite operation values in a history.
pub(crate) fn sum_operation_values(history: &[Operation]) -> f64 {
    history
        .iter()
        .filter_map(|op| op.value)
        .filter(|v| v.is_finite())
        .sum()
}

fn finite_f64(value: &Value) -> Option<f64> {
    value.as_f64().filter(|v| v.is_finite())
}

/// Current time as epoch milliseconds.
pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
