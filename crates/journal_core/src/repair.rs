//! Self-healing sweeps over the session partition.
//!
//! Each routine is independent: it reads every record, computes the diff,
//! and writes back through the atomic batch path. When the batch call itself
//! rejects, the sweep degrades to per-item sequential writes: atomicity
//! traded for best-effort progress, in cleanup context only.

use crate::error::{JournalError, Result};
use crate::normalize::now_millis;
use crate::store::{doc_id, ensure_request_id, SessionStore};
use crate::types::SessionId;
use serde_json::{json, Map, Value};
use tracing::{error, info, warn};

/// Outcome of [`SessionStore::repair_invalid_results`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RepairOutcome {
    /// Records whose aggregate result was recomputed and written back.
    pub repaired: usize,
    /// Records whose write-back failed.
    pub errors: usize,
    /// Records examined.
    pub total: usize,
}

impl SessionStore {
    /// Removes every corrupted session record. Returns how many were
    /// removed.
    ///
    /// A record is corrupted when `date`, `financial_result`,
    /// `operation_count`, or `mode` is absent (or of the wrong type), or
    /// when `combined_history` is not an array.
    pub fn clear_corrupted(&self) -> Result<usize> {
        info!("scanning for corrupted session records");
        let all = self.get_all_sessions()?;

        let mut to_remove: Vec<SessionId> = Vec::new();
        for doc in &all {
            let Some(id) = doc_id(doc) else { continue };
            if let Some(reason) = corruption_reason(doc) {
                let detected = JournalError::DataCorruption { id, reason };
                warn!(error = %detected, "removing corrupted session");
                to_remove.push(id);
            }
        }
        if to_remove.is_empty() {
            return Ok(0);
        }

        let request_id = ensure_request_id(None, "store_cleanup");
        let removed = match self.delete_sessions_batch(&to_remove, Some(&request_id)) {
            Ok(result) => result.success_count,
            Err(e) => {
                warn!(error = %e, "batch delete rejected, falling back to per-item deletes");
                let mut removed = 0;
                for id in to_remove {
                    if self.delete_session(id).is_ok() {
                        removed += 1;
                    }
                }
                removed
            }
        };

        info!(removed, "corruption cleanup complete");
        Ok(removed)
    }

    /// Repairs every corrupted session record in place instead of removing
    /// it. Returns how many were repaired.
    ///
    /// Uses the same detection as [`Self::clear_corrupted`], filling the
    /// broken fields with safe defaults: `date` becomes now,
    /// `financial_result` and `operation_count` become 0, `mode` becomes the
    /// sentinel, and `combined_history` becomes empty.
    pub fn repair_corrupted(&self) -> Result<usize> {
        info!("repairing corrupted session records");
        let all = self.get_all_sessions()?;

        let to_repair: Vec<Value> = all.iter().filter_map(repair_document).collect();
        if to_repair.is_empty() {
            return Ok(0);
        }

        let request_id = ensure_request_id(None, "store_repair");
        let repaired = match self.update_sessions_batch(&to_repair, Some(&request_id)) {
            Ok(result) => result.success_count,
            Err(e) => {
                warn!(error = %e, "batch update rejected, falling back to per-item updates");
                let mut repaired = 0;
                for doc in &to_repair {
                    if self.update_session(doc).is_ok() {
                        repaired += 1;
                    }
                }
                repaired
            }
        };

        info!(repaired, "corruption repair complete");
        Ok(repaired)
    }

    /// Recomputes the aggregate result of every session whose
    /// `financial_result` is not a finite number, setting `operation_count`
    /// to match the history length.
    pub fn repair_invalid_results(&self) -> Result<RepairOutcome> {
        let all = self.get_all_sessions()?;
        let total = all.len();

        let mut to_update = Vec::new();
        for doc in &all {
            let result = doc
                .get("financial_result")
                .and_then(Value::as_f64)
                .filter(|v| v.is_finite());
            if result.is_some() {
                continue;
            }

            let history = doc
                .get("combined_history")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            let recalculated: f64 = history
                .iter()
                .filter_map(|op| op.get("value").and_then(Value::as_f64))
                .filter(|v| v.is_finite())
                .sum();

            info!(
                id = doc_id(doc),
                original = ?doc.get("financial_result"),
                recalculated,
                operations = history.len(),
                "repairing invalid financial result"
            );

            let mut repaired = doc.clone();
            if let Some(obj) = repaired.as_object_mut() {
                obj.insert("financial_result".to_string(), json!(recalculated));
                obj.insert("operation_count".to_string(), json!(history.len()));
            }
            to_update.push(repaired);
        }

        if to_update.is_empty() {
            return Ok(RepairOutcome {
                repaired: 0,
                errors: 0,
                total,
            });
        }

        match self.update_sessions_batch(&to_update, None) {
            Ok(result) => Ok(RepairOutcome {
                repaired: result.success_count,
                errors: 0,
                total,
            }),
            Err(e) => {
                error!(error = %e, "batch update rejected, falling back to per-item updates");
                let mut repaired = 0;
                let mut errors = 0;
                for doc in &to_update {
                    match self.update_session(doc) {
                        Ok(()) => repaired += 1,
                        Err(_) => errors += 1,
                    }
                }
                Ok(RepairOutcome {
                    repaired,
                    errors,
                    total,
                })
            }
        }
    }
}

/// Describes what is broken about a record, or `None` when it is sound.
fn corruption_reason(doc: &Value) -> Option<String> {
    let Some(obj) = doc.as_object() else {
        return Some("record is not an object".to_string());
    };

    let mut broken = Vec::new();
    if !obj.get("date").is_some_and(Value::is_number) {
        broken.push("date");
    }
    if obj.get("financial_result").is_none() {
        broken.push("financial_result");
    }
    if obj.get("operation_count").is_none() {
        broken.push("operation_count");
    }
    if !obj.get("mode").is_some_and(Value::is_string) {
        broken.push("mode");
    }
    if !obj.get("combined_history").is_some_and(Value::is_array) {
        broken.push("combined_history");
    }

    if broken.is_empty() {
        None
    } else {
        Some(format!("invalid fields: {}", broken.join(", ")))
    }
}

/// Fills the broken fields of a record with safe defaults.
///
/// Returns `None` when the record needs no repair.
fn repair_document(doc: &Value) -> Option<Value> {
    corruption_reason(doc)?;
    let obj = doc.as_object()?;

    let mut repaired: Map<String, Value> = obj.clone();
    if !repaired.get("date").is_some_and(Value::is_number) {
        repaired.insert("date".to_string(), json!(now_millis()));
    }
    if repaired.get("financial_result").is_none() {
        repaired.insert("financial_result".to_string(), json!(0.0));
    }
    if repaired.get("operation_count").is_none() {
        repaired.insert("operation_count".to_string(), json!(0));
    }
    if !repaired.get("mode").is_some_and(Value::is_string) {
        repaired.insert(
            "mode".to_string(),
            json!(crate::types::DEFAULT_MODE),
        );
    }
    if !repaired.get("combined_history").is_some_and(Value::is_array) {
        repaired.insert("combined_history".to_string(), json!([]));
    }

    Some(Value::Object(repaired))
}
