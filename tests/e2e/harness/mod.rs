//! Test harness for the e2e scenarios.
//!
//! Keeps a few helpers around that only some scenarios use.

#![allow(dead_code)]

use journal_core::{
    AdvanceContext, EntrySlot, GoalEvaluator, GoalKind, GoalStatus, LedgerEvent,
    LedgerSubscriber, Operation, OperationLedger, PlanAdvancer, PlanStep, Result, RuntimeState,
    SessionConfig, SessionStore, StakeIntent, StorageConfig, Strategy,
};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Plan advancer that walks sequentially through the plan, one step per
/// commit, always pointing at the first sub-entry.
pub struct SequentialAdvancer;

impl PlanAdvancer for SequentialAdvancer {
    fn advance(&mut self, state: &mut RuntimeState, ctx: &AdvanceContext) {
        state.next_step_index = ctx.index + 1;
        state.next_entry_slot = EntrySlot::First;
    }
}

/// Goal evaluator with absolute gain/loss thresholds.
pub struct ThresholdGoals {
    pub stop_win: f64,
    pub stop_loss: f64,
}

impl GoalEvaluator for ThresholdGoals {
    fn check_goals(&self, state: &RuntimeState) -> GoalStatus {
        let delta = state.current_capital - state.session_start_capital;
        if delta >= self.stop_win {
            GoalStatus {
                goal_reached: true,
                goal_type: Some(GoalKind::StopWin),
            }
        } else if delta <= -self.stop_loss {
            GoalStatus {
                goal_reached: true,
                goal_type: Some(GoalKind::StopLoss),
            }
        } else {
            GoalStatus::default()
        }
    }
}

/// Shared record of every event the ledger emitted.
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn names(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.lock().unwrap().iter().any(|n| n == name)
    }
}

struct LogSubscriber(EventLog);

impl LedgerSubscriber for LogSubscriber {
    fn on_event(&mut self, event: &LedgerEvent, _state: &RuntimeState) -> Result<()> {
        let name = match event {
            LedgerEvent::SessionStarted => "session_started",
            LedgerEvent::Staged { .. } => "staged",
            LedgerEvent::Committed { .. } => "committed",
            LedgerEvent::Undone { .. } => "undone",
            LedgerEvent::Edited { .. } => "edited",
            LedgerEvent::ArchivedEdited { .. } => "archived_edited",
            LedgerEvent::Refresh => "refresh",
            LedgerEvent::GoalReached { .. } => "goal_reached",
            LedgerEvent::SessionEnded { .. } => "session_ended",
        };
        self.0 .0.lock().unwrap().push(name.to_string());
        Ok(())
    }
}

/// Session defaults every scenario runs with: 1000 capital, 90% payout.
pub fn test_session_config() -> SessionConfig {
    SessionConfig {
        initial_capital: 1_000.0,
        payout_percent: 90.0,
        strategy: Strategy::Cycles,
        default_mode: "official".to_string(),
    }
}

/// A journal over a fresh temp directory with scripted collaborators.
pub struct TestJournal {
    _tmp: TempDir,
    pub store: Arc<SessionStore>,
    pub ledger: OperationLedger,
    pub events: EventLog,
}

impl TestJournal {
    /// Opens a journal with generous goal thresholds (never reached).
    pub fn new() -> Self {
        Self::with_goals(ThresholdGoals {
            stop_win: f64::MAX,
            stop_loss: f64::MAX,
        })
    }

    /// Opens a journal with the given goal thresholds.
    pub fn with_goals(goals: ThresholdGoals) -> Self {
        let tmp = TempDir::new().unwrap();
        let store = Arc::new(open_store(tmp.path()));
        let mut ledger = OperationLedger::new(
            store.clone(),
            Box::new(SequentialAdvancer),
            Box::new(goals),
            test_session_config(),
        );
        let events = EventLog::default();
        ledger.subscribe(Box::new(LogSubscriber(events.clone())));
        Self {
            _tmp: tmp,
            store,
            ledger,
            events,
        }
    }

    /// Stages and finalizes a win against the given plan step.
    pub fn win(&mut self, index: usize) -> Operation {
        self.ledger
            .stage(StakeIntent {
                index,
                is_win: true,
                slot: EntrySlot::First,
            })
            .unwrap();
        self.ledger.finalize(None, None).unwrap()
    }

    /// Stages and finalizes a loss against the given plan step.
    pub fn loss(&mut self, index: usize) -> Operation {
        self.ledger
            .stage(StakeIntent {
                index,
                is_win: false,
                slot: EntrySlot::First,
            })
            .unwrap();
        self.ledger.finalize(None, None).unwrap()
    }
}

/// Opens a store on the given path with default storage settings.
pub fn open_store(path: &Path) -> SessionStore {
    SessionStore::open(path, &StorageConfig::default()).unwrap()
}

/// A five-step doubling plan: stake 20, 40, 80, ... with 80% net payoff.
pub fn doubling_plan() -> Vec<PlanStep> {
    (0..5)
        .map(|step| {
            let entry = 20.0 * f64::powi(2.0, step);
            PlanStep::single(entry, entry * 1.8)
        })
        .collect()
}
