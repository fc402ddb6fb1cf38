//! Error types for journal_core operations.

use crate::types::SessionId;
use thiserror::Error;

/// Core error type for journal_core operations.
#[derive(Error, Debug)]
pub enum JournalError {
    /// The underlying store could not be opened or the backend failed mid-call.
    #[error("session store unavailable: {0}")]
    StoreUnavailable(String),

    /// A session record could not be normalized into a usable shape.
    #[error("invalid session record: {0}")]
    Validation(String),

    /// An atomic batch transaction failed to commit; no writes were applied.
    #[error("transaction aborted: {0}")]
    TransactionAborted(String),

    /// A persisted record failed an integrity check during a repair sweep.
    #[error("corrupted session {id}: {reason}")]
    DataCorruption {
        /// Identifier of the corrupted record.
        id: SessionId,
        /// Description of the corruption.
        reason: String,
    },

    /// An operation was staged without an active session.
    #[error("no active session")]
    NoActiveSession,

    /// A new session was started while one is already running.
    #[error("a session is already active")]
    SessionActive,

    /// An operation was staged while another one is still pending.
    #[error("an operation is already pending confirmation")]
    OperationPending,

    /// Finalize was called with nothing staged.
    #[error("no pending operation to finalize")]
    NoPendingOperation,

    /// The staking plan is missing or empty.
    #[error("staking plan is missing or empty")]
    PlanMissing,

    /// The staged intent points past the end of the plan.
    #[error("plan step {index} not found (plan has {plan_len} steps)")]
    StepOutOfRange {
        /// Requested step index.
        index: usize,
        /// Number of steps in the plan.
        plan_len: usize,
    },

    /// An edit targeted an operation index outside the history.
    #[error("operation {index} not found in history")]
    OperationOutOfRange {
        /// Requested operation index.
        index: usize,
    },

    /// A store lookup by id found nothing.
    #[error("session {0} not found")]
    SessionNotFound(SessionId),

    /// The journal directory is locked by another process.
    #[error("journal locked by another process")]
    Locked,

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error while encoding a record or snapshot.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error while decoding a record or snapshot.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Configuration error (loading, parsing, invalid values).
    #[error("configuration error: {0}")]
    Config(String),
}

impl JournalError {
    /// Returns the user-facing message for errors the UI layer should show
    /// verbatim, if there is one.
    ///
    /// Staging preconditions map to the dialog texts the journal presents;
    /// infrastructure errors return `None` and are reported generically.
    pub fn user_message(&self) -> Option<&'static str> {
        match self {
            Self::NoActiveSession => Some(
                "No operations can be recorded without an active session. \
                 Start a new session first.",
            ),
            Self::PlanMissing => Some(
                "The staking plan has not been computed. Restart the session.",
            ),
            Self::StepOutOfRange { .. } => Some(
                "The plan step was not found. The session may need to be restarted.",
            ),
            Self::OperationPending => Some(
                "Another operation is awaiting confirmation. Confirm or discard it first.",
            ),
            Self::NoPendingOperation => Some("There is no operation awaiting confirmation."),
            Self::SessionActive => Some(
                "A session is already running. End it before starting a new one.",
            ),
            _ => None,
        }
    }
}

/// Convenience Result type for journal_core operations.
pub type Result<T> = std::result::Result<T, JournalError>;
