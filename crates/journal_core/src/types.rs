//! Core data types for the staking journal.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_repr::{Deserialize_repr, Serialize_repr};

/// Identifier assigned to a session record on first insert.
pub type SessionId = u64;

/// Sentinel mode stamped onto records that arrive without one.
pub const DEFAULT_MODE: &str = "unspecified";

/// One recorded win/loss staking event.
///
/// `value` is the signed net result: the return amount on a win, the negated
/// entry amount on a loss. Ledger-created operations always carry a finite
/// value; `None` only appears on legacy or corrupted documents and is skipped
/// when aggregates are recomputed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// Outcome of the staking event.
    pub is_win: bool,

    /// Signed net result.
    #[serde(default)]
    pub value: Option<f64>,

    /// Stake placed. Absent on legacy records, which forces the payout-based
    /// estimate when the outcome is later flipped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_amount: Option<f64>,

    /// Payoff received on a win.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_amount: Option<f64>,

    /// Payout percentage in effect when the operation was recorded.
    #[serde(default)]
    pub payout_percent: f64,

    /// Optional categorization tag chosen at confirmation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,

    /// Optional free-text note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,

    /// Wall-clock time of day the operation was committed (HH:MM).
    #[serde(default)]
    pub timestamp: String,
}

/// One persisted trading run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Store-assigned identifier; `None` until first insert.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<SessionId>,

    /// Session date, epoch milliseconds.
    pub date: i64,

    /// Session mode (e.g. "official" or "simulation").
    pub mode: String,

    /// Every operation recorded during the run.
    pub combined_history: Vec<Operation>,

    /// Always equals `combined_history.len()`; recomputed on normalization.
    pub operation_count: u64,

    /// Aggregate net result. Recomputed from history only when the stored
    /// value is not a finite number.
    pub financial_result: f64,

    /// Correlation tag for tracing; not semantically required.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl Session {
    /// Serializes the session to the JSON document shape the store persists.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).expect("session serialization is infallible")
    }
}

/// Selector for the sub-entry of a split plan step.
///
/// Persisted as its numeric discriminant so snapshots written by older
/// builds keep loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum EntrySlot {
    /// First sub-contribution of a split step.
    First = 1,
    /// Second sub-contribution of a split step.
    Second = 2,
}

/// Staking strategy driving step-completion bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Flat staking; steps are never marked complete.
    Fixed,
    /// Cycle staking; steps (or their sub-entries) are marked as they land.
    #[default]
    Cycles,
}

/// One sub-contribution of a split plan step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubEntry {
    /// Stake for this sub-contribution.
    pub entry_amount: f64,
    /// Payoff for this sub-contribution on a win.
    pub return_amount: f64,
    /// Whether this sub-contribution has been played.
    #[serde(default)]
    pub done: bool,
}

/// Entry layout of a plan step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepEntries {
    /// A step with a single stake.
    Single {
        /// Stake for the step.
        entry_amount: f64,
        /// Payoff for the step on a win.
        return_amount: f64,
        /// Whether the step has been played.
        #[serde(default)]
        done: bool,
    },
    /// A step split into two sub-contributions (the "cycles" layout).
    Split {
        /// First sub-contribution.
        first: SubEntry,
        /// Second sub-contribution.
        second: SubEntry,
    },
}

/// One step of the externally computed staking plan.
///
/// The ledger reads amounts from steps and marks them complete; it never
/// computes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    /// Entry layout of the step.
    pub entries: StepEntries,
}

impl PlanStep {
    /// A single-entry step.
    pub fn single(entry_amount: f64, return_amount: f64) -> Self {
        Self {
            entries: StepEntries::Single {
                entry_amount,
                return_amount,
                done: false,
            },
        }
    }

    /// A split step with two sub-contributions.
    pub fn split(first: (f64, f64), second: (f64, f64)) -> Self {
        Self {
            entries: StepEntries::Split {
                first: SubEntry {
                    entry_amount: first.0,
                    return_amount: first.1,
                    done: false,
                },
                second: SubEntry {
                    entry_amount: second.0,
                    return_amount: second.1,
                    done: false,
                },
            },
        }
    }

    /// Resolves the stake and payoff this step yields for the given slot.
    ///
    /// Single steps ignore the slot; split steps select the matching
    /// sub-contribution.
    pub fn amounts(&self, slot: EntrySlot) -> (f64, f64) {
        match &self.entries {
            StepEntries::Single {
                entry_amount,
                return_amount,
                ..
            } => (*entry_amount, *return_amount),
            StepEntries::Split { first, second } => {
                let sub = match slot {
                    EntrySlot::First => first,
                    EntrySlot::Second => second,
                };
                (sub.entry_amount, sub.return_amount)
            }
        }
    }
}

/// A staged outcome awaiting confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StakeIntent {
    /// Plan step the outcome applies to.
    pub index: usize,
    /// Whether the staking event was won.
    pub is_win: bool,
    /// Sub-entry selector for split steps.
    pub slot: EntrySlot,
}

/// Which threshold ended the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GoalKind {
    /// Accumulated profit crossed the stop-win threshold.
    StopWin,
    /// Accumulated loss crossed the stop-loss threshold.
    StopLoss,
}

/// Verdict of the external goal evaluator after a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GoalStatus {
    /// Whether a threshold was crossed by this commit.
    pub goal_reached: bool,
    /// Which threshold, when one was crossed.
    pub goal_type: Option<GoalKind>,
}

/// The live, in-memory session under construction.
///
/// Owned exclusively by the [`OperationLedger`](crate::OperationLedger)
/// while a session is active; persisted only through the store's quick-save
/// slot and, at session end, as a [`Session`] record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeState {
    /// Whether a session is currently running.
    pub session_active: bool,
    /// Running account balance.
    pub current_capital: f64,
    /// Capital basis the plan calculator works from.
    pub calc_capital: f64,
    /// Capital at the moment the session started.
    pub session_start_capital: f64,
    /// Index of the next plan step to play.
    pub next_step_index: usize,
    /// Sub-entry the next operation should use.
    pub next_entry_slot: EntrySlot,
    /// The externally computed staking plan.
    pub plan: Vec<PlanStep>,
    /// Operations committed so far.
    pub history: Vec<Operation>,
    /// Session mode.
    pub mode: String,
    /// Whether a gain/loss threshold has been crossed.
    pub goal_reached: bool,
    /// Whether the 80% stop-win warning has been shown.
    pub stop_win_warned: bool,
    /// Whether the 80% stop-loss warning has been shown.
    pub stop_loss_warned: bool,
}

impl Default for RuntimeState {
    fn default() -> Self {
        Self {
            session_active: false,
            current_capital: 0.0,
            calc_capital: 0.0,
            session_start_capital: 0.0,
            next_step_index: 0,
            next_entry_slot: EntrySlot::First,
            plan: Vec::new(),
            history: Vec::new(),
            mode: DEFAULT_MODE.to_string(),
            goal_reached: false,
            stop_win_warned: false,
            stop_loss_warned: false,
        }
    }
}

impl RuntimeState {
    /// Takes a full, independent copy of the mutable subset of the state.
    ///
    /// The copy shares nothing with the live state; restoring it is exact by
    /// construction.
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            current_capital: self.current_capital,
            calc_capital: self.calc_capital,
            next_step_index: self.next_step_index,
            next_entry_slot: self.next_entry_slot,
            plan: self.plan.clone(),
            history: self.history.clone(),
            goal_reached: self.goal_reached,
            stop_win_warned: self.stop_win_warned,
            stop_loss_warned: self.stop_loss_warned,
        }
    }

    /// Restores every snapshotted field verbatim.
    pub fn restore(&mut self, snapshot: StateSnapshot) {
        self.current_capital = snapshot.current_capital;
        self.calc_capital = snapshot.calc_capital;
        self.next_step_index = snapshot.next_step_index;
        self.next_entry_slot = snapshot.next_entry_slot;
        self.plan = snapshot.plan;
        self.history = snapshot.history;
        self.goal_reached = snapshot.goal_reached;
        self.stop_win_warned = snapshot.stop_win_warned;
        self.stop_loss_warned = snapshot.stop_loss_warned;
    }
}

/// Copy of the mutable runtime state taken before every mutating action.
///
/// Lives on the undo stack for the duration of the session; never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct StateSnapshot {
    /// Running account balance at snapshot time.
    pub current_capital: f64,
    /// Plan calculation basis at snapshot time.
    pub calc_capital: f64,
    /// Next plan step index at snapshot time.
    pub next_step_index: usize,
    /// Next sub-entry selector at snapshot time.
    pub next_entry_slot: EntrySlot,
    /// Full plan, including completion flags.
    pub plan: Vec<PlanStep>,
    /// Full operation history.
    pub history: Vec<Operation>,
    /// Goal flag at snapshot time.
    pub goal_reached: bool,
    /// Stop-win warning flag at snapshot time.
    pub stop_win_warned: bool,
    /// Stop-loss warning flag at snapshot time.
    pub stop_loss_warned: bool,
}
