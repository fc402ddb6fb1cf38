//! Durable session storage over an embedded redb database.
//!
//! The store keeps two logical partitions (primary session records and a
//! soft-delete trash) plus secondary indexes on `date` and `mode` and a
//! metadata table holding the schema version and id counters. Records are
//! persisted as JSON documents so legacy and partially-schemaed data stays
//! representable; the repair sweeps in [`crate::repair`] exist because of it.
//!
//! Batched writes are applied inside one redb write transaction: either the
//! whole batch commits or the call fails with `TransactionAborted` and the
//! database is untouched.

use crate::config::StorageConfig;
use crate::error::{JournalError, Result};
use crate::normalize::{normalize, now_millis};
use crate::types::{RuntimeState, SessionId};
use fs2::FileExt;
use redb::{Database, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{error, info, info_span, warn};
use uuid::Uuid;

/// Store schema version for migration support.
pub const STORE_SCHEMA_VERSION: u64 = 1;

/// File name of the active-session quick-save slot.
const ACTIVE_SESSION_FILE: &str = "ACTIVE_SESSION";

// Table definitions
const SESSIONS_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("sessions");
const TRASH_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("trash");
const DATE_INDEX_TABLE: TableDefinition<&[u8], u64> = TableDefinition::new("date_idx");
const MODE_INDEX_TABLE: TableDefinition<&[u8], u64> = TableDefinition::new("mode_idx");
const META_TABLE: TableDefinition<&str, u64> = TableDefinition::new("meta");

/// Outcome of a batch write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchResult {
    /// Number of items applied. Equals `total` on success; the transaction
    /// never commits partially.
    pub success_count: usize,
    /// Number of items submitted.
    pub total: usize,
    /// Correlation id the batch was traced under.
    pub request_id: String,
}

/// A soft-deleted record awaiting expiry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrashRecord {
    /// Trash-partition identifier.
    pub id: u64,
    /// What kind of record was discarded (e.g. "session").
    pub kind: String,
    /// Epoch milliseconds after which the record may be purged.
    pub expire_at: i64,
    /// The discarded document.
    pub payload: Value,
}

/// Durable CRUD, batch, and repair surface over session records.
///
/// Constructed once per journal directory and shared with the
/// [`OperationLedger`](crate::OperationLedger). Construction either yields a
/// fully initialized store or fails with `StoreUnavailable`; there is no
/// half-open state to guard against afterwards.
pub struct SessionStore {
    root: PathBuf,
    db: Database,
    _lock: File,
}

impl SessionStore {
    /// Opens (or creates) the store under the given journal root.
    ///
    /// Idempotently creates the schema: both partitions, both secondary
    /// indexes, and the metadata table. Takes an exclusive lock on the
    /// directory so a second process cannot open the same journal.
    ///
    /// # Errors
    ///
    /// Returns `Locked` when another process holds the journal, and
    /// `StoreUnavailable` when the underlying engine cannot be opened or the
    /// schema version does not match.
    pub fn open(root: impl AsRef<Path>, config: &StorageConfig) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;

        let lock = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(root.join("LOCK"))?;
        lock.try_lock_exclusive().map_err(|_| JournalError::Locked)?;

        let db = Database::create(root.join(&config.db_file)).map_err(backend)?;

        // Create all tables and stamp/check the schema version in one
        // transaction so a freshly created database is fully formed.
        let txn = db.begin_write().map_err(backend)?;
        {
            let mut meta = txn.open_table(META_TABLE).map_err(backend)?;
            let current_version = meta.get("schema_version").map_err(backend)?.map(|g| g.value());
            match current_version {
                Some(version) if version != STORE_SCHEMA_VERSION => {
                    return Err(JournalError::StoreUnavailable(format!(
                        "schema version mismatch: found {}, expected {}",
                        version, STORE_SCHEMA_VERSION
                    )));
                }
                Some(_) => {}
                None => {
                    meta.insert("schema_version", STORE_SCHEMA_VERSION)
                        .map_err(backend)?;
                }
            }
            txn.open_table(SESSIONS_TABLE).map_err(backend)?;
            txn.open_table(TRASH_TABLE).map_err(backend)?;
            txn.open_table(DATE_INDEX_TABLE).map_err(backend)?;
            txn.open_table(MODE_INDEX_TABLE).map_err(backend)?;
        }
        txn.commit().map_err(backend)?;

        Ok(Self {
            root,
            db,
            _lock: lock,
        })
    }

    /// Returns the journal root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Normalizes and inserts a session record, assigning its identifier.
    ///
    /// # Errors
    ///
    /// Returns `Validation` when the record cannot be normalized.
    pub fn add_session(&self, record: &Value) -> Result<SessionId> {
        let request_id = ensure_request_id(
            record.get("request_id").and_then(Value::as_str),
            "store_add",
        );
        let span = info_span!("add_session", request_id = %request_id);
        let _guard = span.enter();

        let session = normalize(record).ok_or_else(|| {
            error!("error: record failed normalization");
            JournalError::Validation("session record failed normalization".into())
        })?;
        info!(
            mode = %session.mode,
            operation_count = session.operation_count,
            "start"
        );

        match self.insert_documents(vec![session.to_value()]) {
            Ok(ids) => {
                info!(id = ids[0], "success");
                Ok(ids[0])
            }
            Err(e) => {
                error!(error = %e, "error");
                Err(e)
            }
        }
    }

    /// Normalizes and replaces a session record by id.
    ///
    /// # Errors
    ///
    /// Returns `Validation` when the record cannot be normalized or carries
    /// no id.
    pub fn update_session(&self, record: &Value) -> Result<()> {
        let request_id = ensure_request_id(
            record.get("request_id").and_then(Value::as_str),
            "store_update",
        );
        let span = info_span!("update_session", request_id = %request_id);
        let _guard = span.enter();

        let session = normalize(record)
            .ok_or_else(|| JournalError::Validation("session record failed normalization".into()))?;
        let id = session
            .id
            .ok_or_else(|| JournalError::Validation("session record has no id".into()))?;
        info!(id, operation_count = session.operation_count, "start");

        match self.upsert_documents(vec![(id, session.to_value())]) {
            Ok(()) => {
                info!(id, "success");
                Ok(())
            }
            Err(e) => {
                error!(id, error = %e, "error");
                Err(e)
            }
        }
    }

    /// Deletes a session record. Idempotent: deleting an id that does not
    /// exist still succeeds.
    pub fn delete_session(&self, id: SessionId) -> Result<()> {
        let request_id = ensure_request_id(None, "store_delete");
        let span = info_span!("delete_session", request_id = %request_id);
        let _guard = span.enter();

        info!(id, "start");
        match self.remove_documents(&[id]) {
            Ok(_) => {
                info!(id, "success");
                Ok(())
            }
            Err(e) => {
                error!(id, error = %e, "error");
                Err(e)
            }
        }
    }

    /// Moves a session record into the trash partition, then deletes it.
    ///
    /// Returns the trash id, or `None` when the session does not exist.
    pub fn soft_delete_session(
        &self,
        id: SessionId,
        ttl: chrono::Duration,
    ) -> Result<Option<u64>> {
        let Some(doc) = self.get_session_by_id(id)? else {
            return Ok(None);
        };
        let trash_id = self.put_trash("session", doc, ttl)?;
        self.delete_session(id)?;
        Ok(Some(trash_id))
    }

    /// Returns every session record, sorted ascending by date.
    ///
    /// Records without a readable date sort first. Corrupt records are
    /// returned as-is so the repair sweeps can see them.
    pub fn get_all_sessions(&self) -> Result<Vec<Value>> {
        let read_txn = self.db.begin_read().map_err(backend)?;
        let sessions = read_txn.open_table(SESSIONS_TABLE).map_err(backend)?;

        let mut docs = Vec::new();
        for entry in sessions.iter().map_err(backend)? {
            let (key, value) = entry.map_err(backend)?;
            docs.push(decode_doc(key.value(), value.value()));
        }

        docs.sort_by_key(|doc| doc_date(doc).unwrap_or(i64::MIN));
        Ok(docs)
    }

    /// Looks up one session record by id.
    pub fn get_session_by_id(&self, id: SessionId) -> Result<Option<Value>> {
        let read_txn = self.db.begin_read().map_err(backend)?;
        let sessions = read_txn.open_table(SESSIONS_TABLE).map_err(backend)?;

        match sessions.get(id).map_err(backend)? {
            Some(bytes) => Ok(Some(decode_doc(id, bytes.value()))),
            None => Ok(None),
        }
    }

    /// Returns all session records with the given mode, via the mode index.
    pub fn get_sessions_by_mode(&self, mode: &str) -> Result<Vec<Value>> {
        let read_txn = self.db.begin_read().map_err(backend)?;
        let index = read_txn.open_table(MODE_INDEX_TABLE).map_err(backend)?;
        let sessions = read_txn.open_table(SESSIONS_TABLE).map_err(backend)?;

        let (lower, upper) = mode_bounds(mode);
        let mut docs = Vec::new();
        for entry in index
            .range(lower.as_slice()..=upper.as_slice())
            .map_err(backend)?
        {
            let (_, id) = entry.map_err(backend)?;
            let id = id.value();
            if let Some(bytes) = sessions.get(id).map_err(backend)? {
                docs.push(decode_doc(id, bytes.value()));
            }
        }

        Ok(docs)
    }

    /// Returns session records whose date falls in `[from, to]`, in date
    /// order, via the date index.
    pub fn get_sessions_between(&self, from: i64, to: i64) -> Result<Vec<Value>> {
        let read_txn = self.db.begin_read().map_err(backend)?;
        let index = read_txn.open_table(DATE_INDEX_TABLE).map_err(backend)?;
        let sessions = read_txn.open_table(SESSIONS_TABLE).map_err(backend)?;

        let lower = date_key(from, 0);
        let upper = date_key(to, u64::MAX);
        let mut docs = Vec::new();
        for entry in index
            .range(lower.as_slice()..=upper.as_slice())
            .map_err(backend)?
        {
            let (_, id) = entry.map_err(backend)?;
            let id = id.value();
            if let Some(bytes) = sessions.get(id).map_err(backend)? {
                docs.push(decode_doc(id, bytes.value()));
            }
        }

        Ok(docs)
    }

    /// Inserts a raw document without normalizing it.
    ///
    /// This is the legacy-backup ingestion path: records from old exports
    /// land verbatim and are healed later by the repair sweeps. Only minimal
    /// structure is required (the document must be a JSON object).
    pub fn import_raw(&self, record: &Value) -> Result<SessionId> {
        if !record.is_object() {
            return Err(JournalError::Validation(
                "imported record is not an object".into(),
            ));
        }
        let ids = self.insert_documents(vec![record.clone()])?;
        Ok(ids[0])
    }

    /// Normalizes and inserts a list of records inside one atomic
    /// transaction.
    ///
    /// The whole call rejects with `Validation` when any item fails
    /// normalization, and with `TransactionAborted` when the commit fails;
    /// in both cases no record is written. An empty list short-circuits to a
    /// zero-cost success.
    pub fn add_sessions_batch(
        &self,
        records: &[Value],
        request_id: Option<&str>,
    ) -> Result<BatchResult> {
        let request_id = ensure_request_id(request_id, "store_add_batch");
        if records.is_empty() {
            return Ok(BatchResult {
                success_count: 0,
                total: 0,
                request_id,
            });
        }
        let span = info_span!("add_sessions_batch", request_id = %request_id);
        let _guard = span.enter();
        info!(total = records.len(), "start");

        let mut docs = Vec::with_capacity(records.len());
        for record in records {
            let session = normalize(record).ok_or_else(|| {
                error!("error: batch contains a record that failed normalization");
                JournalError::Validation("batch contains invalid session records".into())
            })?;
            docs.push(session.to_value());
        }

        match self.insert_documents(docs) {
            Ok(ids) => {
                info!(success_count = ids.len(), "complete");
                Ok(BatchResult {
                    success_count: ids.len(),
                    total: records.len(),
                    request_id,
                })
            }
            Err(e) => {
                error!(error = %e, "error");
                Err(e)
            }
        }
    }

    /// Normalizes and replaces a list of records inside one atomic
    /// transaction.
    ///
    /// Rejects wholesale with `Validation` when any item fails normalization
    /// or lacks an id.
    pub fn update_sessions_batch(
        &self,
        records: &[Value],
        request_id: Option<&str>,
    ) -> Result<BatchResult> {
        let request_id = ensure_request_id(request_id, "store_update_batch");
        if records.is_empty() {
            return Ok(BatchResult {
                success_count: 0,
                total: 0,
                request_id,
            });
        }
        let span = info_span!("update_sessions_batch", request_id = %request_id);
        let _guard = span.enter();
        info!(total = records.len(), "start");

        let mut docs = Vec::with_capacity(records.len());
        for record in records {
            let session = normalize(record).ok_or_else(|| {
                JournalError::Validation("batch contains invalid session records".into())
            })?;
            let id = session.id.ok_or_else(|| {
                JournalError::Validation("batch contains a session without an id".into())
            })?;
            docs.push((id, session.to_value()));
        }

        match self.upsert_documents(docs) {
            Ok(()) => {
                info!(success_count = records.len(), "complete");
                Ok(BatchResult {
                    success_count: records.len(),
                    total: records.len(),
                    request_id,
                })
            }
            Err(e) => {
                error!(error = %e, "error");
                Err(e)
            }
        }
    }

    /// Deletes a list of session records inside one atomic transaction.
    ///
    /// Like the single delete, ids that do not exist are counted as
    /// successes.
    pub fn delete_sessions_batch(
        &self,
        ids: &[SessionId],
        request_id: Option<&str>,
    ) -> Result<BatchResult> {
        let request_id = ensure_request_id(request_id, "store_delete_batch");
        if ids.is_empty() {
            return Ok(BatchResult {
                success_count: 0,
                total: 0,
                request_id,
            });
        }
        let span = info_span!("delete_sessions_batch", request_id = %request_id);
        let _guard = span.enter();
        info!(total = ids.len(), "start");

        match self.remove_documents(ids) {
            Ok(_) => {
                info!(success_count = ids.len(), "complete");
                Ok(BatchResult {
                    success_count: ids.len(),
                    total: ids.len(),
                    request_id,
                })
            }
            Err(e) => {
                error!(error = %e, "error");
                Err(e)
            }
        }
    }

    /// Puts a discarded document into the trash partition.
    pub fn put_trash(&self, kind: &str, payload: Value, ttl: chrono::Duration) -> Result<u64> {
        let expire_at = now_millis() + ttl.num_milliseconds();

        let txn = self.db.begin_write().map_err(backend)?;
        let id;
        {
            let mut meta = txn.open_table(META_TABLE).map_err(backend)?;
            id = next_id(&mut meta, "next_trash_id")?;

            let record = TrashRecord {
                id,
                kind: kind.to_string(),
                expire_at,
                payload,
            };
            let bytes = serde_json::to_vec(&record)
                .map_err(|e| JournalError::Serialization(e.to_string()))?;

            let mut trash = txn.open_table(TRASH_TABLE).map_err(backend)?;
            trash.insert(id, bytes.as_slice()).map_err(backend)?;
        }
        txn.commit()
            .map_err(|e| JournalError::TransactionAborted(e.to_string()))?;

        Ok(id)
    }

    /// Lists every record in the trash partition.
    pub fn list_trash(&self) -> Result<Vec<TrashRecord>> {
        let read_txn = self.db.begin_read().map_err(backend)?;
        let trash = read_txn.open_table(TRASH_TABLE).map_err(backend)?;

        let mut records = Vec::new();
        for entry in trash.iter().map_err(backend)? {
            let (_, value) = entry.map_err(backend)?;
            match serde_json::from_slice::<TrashRecord>(value.value()) {
                Ok(record) => records.push(record),
                Err(e) => warn!(error = %e, "undecodable trash record skipped"),
            }
        }

        Ok(records)
    }

    /// Removes trash records whose expiry has passed. Returns how many were
    /// purged.
    pub fn purge_expired_trash(&self, now: i64) -> Result<usize> {
        let expired: Vec<u64> = self
            .list_trash()?
            .into_iter()
            .filter(|record| record.expire_at <= now)
            .map(|record| record.id)
            .collect();
        if expired.is_empty() {
            return Ok(0);
        }

        let txn = self.db.begin_write().map_err(backend)?;
        {
            let mut trash = txn.open_table(TRASH_TABLE).map_err(backend)?;
            for id in &expired {
                trash.remove(*id).map_err(backend)?;
            }
        }
        txn.commit()
            .map_err(|e| JournalError::TransactionAborted(e.to_string()))?;

        Ok(expired.len())
    }

    /// Writes the in-progress runtime state to the quick-save slot.
    ///
    /// Best-effort crash insurance outside any transaction: failures are
    /// logged and swallowed, never propagated.
    pub fn save_active_snapshot(&self, state: &RuntimeState) -> bool {
        match self.write_active_snapshot(state) {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, "failed to save active session snapshot");
                false
            }
        }
    }

    /// Reads the runtime state back from the quick-save slot.
    ///
    /// Returns `None` when no snapshot exists or it cannot be decoded.
    pub fn load_active_snapshot(&self) -> Option<RuntimeState> {
        let path = self.root.join(ACTIVE_SESSION_FILE);
        if !path.exists() {
            return None;
        }
        match fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(state) => Some(state),
                Err(e) => {
                    warn!(error = %e, "active session snapshot is undecodable");
                    None
                }
            },
            Err(e) => {
                warn!(error = %e, "failed to read active session snapshot");
                None
            }
        }
    }

    /// Removes the quick-save slot. Does nothing when no snapshot exists.
    pub fn clear_active_snapshot(&self) -> Result<()> {
        let path = self.root.join(ACTIVE_SESSION_FILE);
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }

    /// Writes the snapshot slot atomically via temp file + rename.
    fn write_active_snapshot(&self, state: &RuntimeState) -> Result<()> {
        let path = self.root.join(ACTIVE_SESSION_FILE);
        let tmp_path = path.with_extension("tmp");

        let bytes =
            serde_json::to_vec(state).map_err(|e| JournalError::Serialization(e.to_string()))?;
        {
            let mut file = File::create(&tmp_path)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &path)?;

        Ok(())
    }

    /// Inserts documents with freshly allocated ids, all in one transaction.
    fn insert_documents(&self, docs: Vec<Value>) -> Result<Vec<SessionId>> {
        let txn = self.db.begin_write().map_err(backend)?;
        let mut ids = Vec::with_capacity(docs.len());
        {
            let mut meta = txn.open_table(META_TABLE).map_err(backend)?;
            for _ in &docs {
                ids.push(next_id(&mut meta, "next_session_id")?);
            }
        }

        let mut encoded = Vec::with_capacity(docs.len());
        for (id, mut doc) in ids.iter().copied().zip(docs) {
            if let Some(obj) = doc.as_object_mut() {
                obj.insert("id".to_string(), json!(id));
            }
            let bytes = serde_json::to_vec(&doc)
                .map_err(|e| JournalError::Serialization(e.to_string()))?;
            encoded.push((id, doc, bytes));
        }

        {
            let mut sessions = txn.open_table(SESSIONS_TABLE).map_err(backend)?;
            for (id, _, bytes) in &encoded {
                sessions.insert(*id, bytes.as_slice()).map_err(backend)?;
            }
        }
        {
            let mut date_index = txn.open_table(DATE_INDEX_TABLE).map_err(backend)?;
            for (id, doc, _) in &encoded {
                if let Some(date) = doc_date(doc) {
                    date_index
                        .insert(date_key(date, *id).as_slice(), *id)
                        .map_err(backend)?;
                }
            }
        }
        {
            let mut mode_index = txn.open_table(MODE_INDEX_TABLE).map_err(backend)?;
            for (id, doc, _) in &encoded {
                if let Some(mode) = doc_mode(doc) {
                    mode_index
                        .insert(mode_key(mode, *id).as_slice(), *id)
                        .map_err(backend)?;
                }
            }
        }

        txn.commit()
            .map_err(|e| JournalError::TransactionAborted(e.to_string()))?;
        Ok(ids)
    }

    /// Replaces documents by id, migrating index entries, in one
    /// transaction.
    fn upsert_documents(&self, docs: Vec<(SessionId, Value)>) -> Result<()> {
        let txn = self.db.begin_write().map_err(backend)?;

        // (id, new doc, bytes, old date, old mode)
        let mut work = Vec::with_capacity(docs.len());
        {
            let mut sessions = txn.open_table(SESSIONS_TABLE).map_err(backend)?;
            for (id, mut doc) in docs {
                if let Some(obj) = doc.as_object_mut() {
                    obj.insert("id".to_string(), json!(id));
                }
                let old = sessions
                    .get(id)
                    .map_err(backend)?
                    .map(|g| decode_doc(id, g.value()));
                let bytes = serde_json::to_vec(&doc)
                    .map_err(|e| JournalError::Serialization(e.to_string()))?;
                sessions.insert(id, bytes.as_slice()).map_err(backend)?;

                let old_date = old.as_ref().and_then(doc_date);
                let old_mode = old
                    .as_ref()
                    .and_then(doc_mode)
                    .map(str::to_string);
                work.push((id, doc, old_date, old_mode));
            }
        }
        {
            let mut date_index = txn.open_table(DATE_INDEX_TABLE).map_err(backend)?;
            for (id, doc, old_date, _) in &work {
                if let Some(old) = old_date {
                    date_index
                        .remove(date_key(*old, *id).as_slice())
                        .map_err(backend)?;
                }
                if let Some(date) = doc_date(doc) {
                    date_index
                        .insert(date_key(date, *id).as_slice(), *id)
                        .map_err(backend)?;
                }
            }
        }
        {
            let mut mode_index = txn.open_table(MODE_INDEX_TABLE).map_err(backend)?;
            for (id, doc, _, old_mode) in &work {
                if let Some(old) = old_mode {
                    mode_index
                        .remove(mode_key(old, *id).as_slice())
                        .map_err(backend)?;
                }
                if let Some(mode) = doc_mode(doc) {
                    mode_index
                        .insert(mode_key(mode, *id).as_slice(), *id)
                        .map_err(backend)?;
                }
            }
        }

        txn.commit()
            .map_err(|e| JournalError::TransactionAborted(e.to_string()))?;
        Ok(())
    }

    /// Removes documents and their index entries in one transaction.
    ///
    /// Returns how many documents actually existed.
    fn remove_documents(&self, ids: &[SessionId]) -> Result<usize> {
        let txn = self.db.begin_write().map_err(backend)?;

        // (id, old date, old mode)
        let mut removed = Vec::with_capacity(ids.len());
        {
            let mut sessions = txn.open_table(SESSIONS_TABLE).map_err(backend)?;
            for id in ids {
                let old = sessions
                    .remove(*id)
                    .map_err(backend)?
                    .map(|g| decode_doc(*id, g.value()));
                if let Some(doc) = old {
                    removed.push((
                        *id,
                        doc_date(&doc),
                        doc_mode(&doc).map(str::to_string),
                    ));
                }
            }
        }
        {
            let mut date_index = txn.open_table(DATE_INDEX_TABLE).map_err(backend)?;
            for (id, old_date, _) in &removed {
                if let Some(date) = old_date {
                    date_index
                        .remove(date_key(*date, *id).as_slice())
                        .map_err(backend)?;
                }
            }
        }
        {
            let mut mode_index = txn.open_table(MODE_INDEX_TABLE).map_err(backend)?;
            for (id, _, old_mode) in &removed {
                if let Some(mode) = old_mode {
                    mode_index
                        .remove(mode_key(mode, *id).as_slice())
                        .map_err(backend)?;
                }
            }
        }

        txn.commit()
            .map_err(|e| JournalError::TransactionAborted(e.to_string()))?;
        Ok(removed.len())
    }
}

/// Allocates the next id from a named meta counter.
fn next_id(meta: &mut redb::Table<&'static str, u64>, key: &str) -> Result<u64> {
    let next = meta
        .get(key)
        .map_err(backend)?
        .map(|g| g.value())
        .unwrap_or(1);
    meta.insert(key, next + 1).map_err(backend)?;
    Ok(next)
}

/// Uses the caller-supplied correlation id or generates one.
pub(crate) fn ensure_request_id(external: Option<&str>, prefix: &str) -> String {
    match external {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => format!("{}_{}", prefix, Uuid::new_v4().simple()),
    }
}

/// Decodes a stored row, stamping the key id into the document.
///
/// Undecodable rows surface as bare `{id}` husks so the repair sweeps can
/// see and deal with them instead of them hiding behind a decode error.
fn decode_doc(id: SessionId, bytes: &[u8]) -> Value {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(mut doc) => {
            if let Some(obj) = doc.as_object_mut() {
                obj.insert("id".to_string(), json!(id));
            }
            doc
        }
        Err(e) => {
            warn!(id, error = %e, "undecodable session row");
            json!({ "id": id })
        }
    }
}

pub(crate) fn doc_id(doc: &Value) -> Option<SessionId> {
    doc.get("id").and_then(Value::as_u64)
}

pub(crate) fn doc_date(doc: &Value) -> Option<i64> {
    doc.get("date").and_then(Value::as_i64)
}

pub(crate) fn doc_mode(doc: &Value) -> Option<&str> {
    doc.get("mode").and_then(Value::as_str)
}

/// Encode a date index key: order-preserving date + record id.
fn date_key(date: i64, id: SessionId) -> Vec<u8> {
    let mut key = Vec::with_capacity(16);
    key.extend_from_slice(&((date as u64) ^ (1u64 << 63)).to_be_bytes());
    key.extend_from_slice(&id.to_be_bytes());
    key
}

/// Encode a mode index key: length-prefixed mode + record id.
fn mode_key(mode: &str, id: SessionId) -> Vec<u8> {
    let bytes = mode.as_bytes();
    let mut key = Vec::with_capacity(2 + bytes.len() + 8);
    key.extend_from_slice(&(bytes.len() as u16).to_le_bytes());
    key.extend_from_slice(bytes);
    key.extend_from_slice(&id.to_be_bytes());
    key
}

/// Key range covering every record id for one mode.
fn mode_bounds(mode: &str) -> (Vec<u8>, Vec<u8>) {
    (mode_key(mode, 0), mode_key(mode, u64::MAX))
}

fn backend<E: std::fmt::Display>(e: E) -> JournalError {
    JournalError::StoreUnavailable(e.to_string())
}
