//! Staking Journal Core
//!
//! The session ledger and persistence engine behind a personal
//! trading-risk-management journal:
//!
//! - A pure **normalizer** that canonicalizes raw session documents
//! - A durable **session store** over an embedded database, with atomic
//!   batch writes, secondary indexes, a soft-delete trash partition, and
//!   self-healing repair sweeps
//! - An **operation ledger** that stages, validates, commits, undoes, and
//!   edits staking operations against the in-memory session, with
//!   capital-integrity self-healing and snapshot-based undo
//!
//! Plan computation and goal evaluation live outside this crate, behind the
//! [`PlanAdvancer`] and [`GoalEvaluator`] traits the ledger is constructed
//! with.
//!
//! # Quick Start
//!
//! ```no_run
//! use journal_core::{
//!     Config, EntrySlot, NoopGoalEvaluator, NoopPlanAdvancer, OperationLedger, PlanStep,
//!     SessionStore, StakeIntent,
//! };
//! use std::sync::Arc;
//!
//! # fn main() -> journal_core::Result<()> {
//! let config = Config::load(std::path::Path::new("."))?;
//! let store = Arc::new(SessionStore::open(".", &config.storage)?);
//!
//! let mut ledger = OperationLedger::new(
//!     store,
//!     Box::new(NoopPlanAdvancer),
//!     Box::new(NoopGoalEvaluator),
//!     config.session,
//! );
//!
//! ledger.start_session(vec![PlanStep::single(20.0, 36.0)], None)?;
//! ledger.stage(StakeIntent {
//!     index: 0,
//!     is_win: true,
//!     slot: EntrySlot::First,
//! })?;
//! let operation = ledger.finalize(Some("trend"), None)?;
//! assert_eq!(operation.value, Some(36.0));
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod ledger;
mod normalize;
mod repair;
mod store;
mod types;

pub use config::{Config, GoalConfig, SessionConfig, StorageConfig, FALLBACK_CAPITAL};
pub use error::{JournalError, Result};
pub use ledger::{
    AdvanceContext, GoalEvaluator, LedgerEvent, LedgerSubscriber, NoopGoalEvaluator,
    NoopPlanAdvancer, OperationLedger, PlanAdvancer,
};
pub use normalize::{canonicalize, normalize};
pub use repair::RepairOutcome;
pub use store::{BatchResult, SessionStore, TrashRecord, STORE_SCHEMA_VERSION};
pub use types::{
    EntrySlot, GoalKind, GoalStatus, Operation, PlanStep, RuntimeState, Session, SessionId,
    StakeIntent, StateSnapshot, StepEntries, Strategy, SubEntry, DEFAULT_MODE,
};
