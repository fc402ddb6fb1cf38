//! Operation lifecycle state machine.
//!
//! The [`OperationLedger`] turns a staged outcome into a committed history
//! entry: it validates the intent against the current plan step, applies the
//! result to capital with integrity self-healing, snapshots for undo, and
//! delegates persistence to the [`SessionStore`]. Plan advancement and goal
//! evaluation stay outside, behind constructor-injected traits; UI refresh
//! and secondary state mirrors hang off a subscriber list whose failures are
//! isolated per subscriber.

use crate::config::{SessionConfig, FALLBACK_CAPITAL};
use crate::error::{JournalError, Result};
use crate::normalize::{canonicalize, now_millis, sum_operation_values};
use crate::store::{ensure_request_id, SessionStore};
use crate::types::{
    EntrySlot, GoalKind, GoalStatus, Operation, PlanStep, RuntimeState, Session, SessionId,
    StakeIntent, StateSnapshot, StepEntries, Strategy,
};
use std::sync::Arc;
use tracing::{error, warn};

/// Context handed to the plan advancer after every commit.
#[derive(Debug, Clone, Copy)]
pub struct AdvanceContext {
    /// Outcome of the committed operation.
    pub is_win: bool,
    /// Plan step the operation was played against.
    pub index: usize,
    /// Sub-entry the operation used.
    pub slot: EntrySlot,
    /// Signed net result applied to capital.
    pub result_value: f64,
}

/// Advances the externally owned staking plan after a commit.
pub trait PlanAdvancer {
    /// Moves the plan forward. Receives the full runtime state so it can
    /// update the next step index, the next entry slot, and the plan itself.
    fn advance(&mut self, state: &mut RuntimeState, ctx: &AdvanceContext);
}

/// Evaluates gain/loss thresholds after a commit.
pub trait GoalEvaluator {
    /// Reports whether this commit crossed a threshold.
    fn check_goals(&self, state: &RuntimeState) -> GoalStatus;
}

/// Plan advancer that leaves the plan untouched.
///
/// Used by tooling (repairs, archived edits) that never commits operations.
pub struct NoopPlanAdvancer;

impl PlanAdvancer for NoopPlanAdvancer {
    fn advance(&mut self, _state: &mut RuntimeState, _ctx: &AdvanceContext) {}
}

/// Goal evaluator that never reports a crossed threshold.
pub struct NoopGoalEvaluator;

impl GoalEvaluator for NoopGoalEvaluator {
    fn check_goals(&self, _state: &RuntimeState) -> GoalStatus {
        GoalStatus::default()
    }
}

/// Notification emitted by the ledger.
///
/// Emission is fire-and-forget: the ledger never waits on a subscriber, and
/// a failing subscriber is logged and skipped without affecting the others.
#[derive(Debug, Clone)]
pub enum LedgerEvent {
    /// A new session started.
    SessionStarted,
    /// An outcome was staged and awaits annotation/confirmation.
    Staged {
        /// Plan step index of the staged intent.
        index: usize,
        /// Staged outcome.
        is_win: bool,
    },
    /// An operation was committed to the history.
    Committed {
        /// The committed operation.
        operation: Operation,
    },
    /// The last commit was reverted.
    Undone {
        /// The operation that was reverted.
        operation: Operation,
    },
    /// An in-session operation was edited.
    Edited {
        /// History index of the edited operation.
        index: usize,
    },
    /// An archived session's operation was edited.
    ArchivedEdited {
        /// Identifier of the edited session.
        session_id: SessionId,
    },
    /// Displays should re-render.
    Refresh,
    /// A gain/loss threshold was crossed.
    GoalReached {
        /// Which threshold.
        goal: GoalKind,
    },
    /// The session ended and was persisted.
    SessionEnded {
        /// Identifier of the persisted session record.
        session_id: SessionId,
    },
}

/// Receives ledger notifications (UI refresh hooks, state mirrors).
pub trait LedgerSubscriber {
    /// Handles one notification. Errors are logged by the ledger and never
    /// propagated.
    fn on_event(&mut self, event: &LedgerEvent, state: &RuntimeState) -> Result<()>;
}

/// Snapshot plus the operation that caused it, kept for undo.
struct UndoEntry {
    snapshot: StateSnapshot,
    operation: Operation,
}

/// The runtime state machine: Idle → Staged → Committed, with undo and edit
/// transitions.
///
/// Owns the single active [`RuntimeState`] exclusively. Only one intent may
/// be staged at a time, and every transition runs to completion (including
/// its persistence step) before the state is observable again. `&mut self`
/// makes an overlapping second staging unrepresentable in safe code.
pub struct OperationLedger {
    store: Arc<SessionStore>,
    plan_advancer: Box<dyn PlanAdvancer>,
    goal_evaluator: Box<dyn GoalEvaluator>,
    subscribers: Vec<Box<dyn LedgerSubscriber>>,
    config: SessionConfig,
    state: RuntimeState,
    pending: Option<StakeIntent>,
    undo_stack: Vec<UndoEntry>,
}

impl OperationLedger {
    /// Creates a ledger over the given store and collaborators.
    pub fn new(
        store: Arc<SessionStore>,
        plan_advancer: Box<dyn PlanAdvancer>,
        goal_evaluator: Box<dyn GoalEvaluator>,
        config: SessionConfig,
    ) -> Self {
        Self {
            store,
            plan_advancer,
            goal_evaluator,
            subscribers: Vec::new(),
            config,
            state: RuntimeState::default(),
            pending: None,
            undo_stack: Vec::new(),
        }
    }

    /// Registers a notification subscriber.
    pub fn subscribe(&mut self, subscriber: Box<dyn LedgerSubscriber>) {
        self.subscribers.push(subscriber);
    }

    /// Read access to the live runtime state.
    pub fn state(&self) -> &RuntimeState {
        &self.state
    }

    /// Whether an intent is staged and awaiting confirmation.
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Number of commits that can currently be undone.
    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    /// Starts a new session over an externally computed plan.
    ///
    /// Seeds capital from the configuration and persists the first quick-save
    /// snapshot. `mode` defaults to the configured session mode.
    pub fn start_session(&mut self, plan: Vec<PlanStep>, mode: Option<&str>) -> Result<()> {
        if self.state.session_active {
            return Err(JournalError::SessionActive);
        }

        let mut capital = self.config.initial_capital;
        if !capital.is_finite() {
            capital = FALLBACK_CAPITAL;
        }

        self.state = RuntimeState {
            session_active: true,
            current_capital: capital,
            calc_capital: capital,
            session_start_capital: capital,
            next_step_index: 0,
            next_entry_slot: EntrySlot::First,
            plan,
            history: Vec::new(),
            mode: mode.unwrap_or(&self.config.default_mode).to_string(),
            goal_reached: false,
            stop_win_warned: false,
            stop_loss_warned: false,
        };
        self.pending = None;
        self.undo_stack.clear();

        self.store.save_active_snapshot(&self.state);
        self.emit(LedgerEvent::SessionStarted);
        Ok(())
    }

    /// Restores the runtime state from the quick-save slot after a crash.
    ///
    /// Returns `false` when there is nothing usable to resume.
    pub fn resume_session(&mut self) -> Result<bool> {
        if self.state.session_active {
            return Err(JournalError::SessionActive);
        }
        match self.store.load_active_snapshot() {
            Some(state) if state.session_active => {
                self.state = state;
                self.pending = None;
                self.undo_stack.clear();
                self.emit(LedgerEvent::Refresh);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Stages an intended outcome for confirmation.
    ///
    /// Every precondition fails fast with a descriptive error and no state
    /// mutation: there must be an active session, a non-empty plan, a step at
    /// `intent.index`, and no other intent already pending. On success the
    /// intent is held as the single pending request and a [`LedgerEvent::Staged`]
    /// notification hands off to the annotation flow.
    pub fn stage(&mut self, intent: StakeIntent) -> Result<()> {
        if !self.state.session_active {
            return Err(JournalError::NoActiveSession);
        }
        if self.state.plan.is_empty() {
            return Err(JournalError::PlanMissing);
        }
        if intent.index >= self.state.plan.len() {
            return Err(JournalError::StepOutOfRange {
                index: intent.index,
                plan_len: self.state.plan.len(),
            });
        }
        if self.pending.is_some() {
            return Err(JournalError::OperationPending);
        }

        self.pending = Some(intent);
        self.emit(LedgerEvent::Staged {
            index: intent.index,
            is_win: intent.is_win,
        });
        Ok(())
    }

    /// Commits the pending intent as an operation.
    ///
    /// The pending request is consumed up front, so it is cleared even when a
    /// later step fails. The commit applies the result to capital (healing a
    /// non-finite balance by recomputing from scratch), snapshots for undo,
    /// marks the plan step, and then delegates in order: plan advancement,
    /// subscriber notification, goal evaluation, quick-save persistence,
    /// refresh, and, last, the goal-reached notification when a threshold
    /// was crossed.
    pub fn finalize(&mut self, tag: Option<&str>, note: Option<&str>) -> Result<Operation> {
        let intent = self.pending.take().ok_or(JournalError::NoPendingOperation)?;

        let step = self
            .state
            .plan
            .get(intent.index)
            .ok_or(JournalError::StepOutOfRange {
                index: intent.index,
                plan_len: self.state.plan.len(),
            })?;
        let (entry_amount, return_amount) = step.amounts(intent.slot);

        let mut value = if intent.is_win {
            return_amount
        } else {
            -entry_amount
        };
        if !value.is_finite() {
            // Never let a broken plan step poison the history; surface loudly
            // and record a zero-value operation instead.
            error!(
                index = intent.index,
                entry_amount, return_amount, "computed operation value is not finite, recording 0"
            );
            value = 0.0;
        }

        let operation = Operation {
            is_win: intent.is_win,
            value: Some(value),
            entry_amount: Some(entry_amount),
            return_amount: Some(return_amount),
            payout_percent: self.config.payout_percent,
            tag: tag.map(str::to_string),
            note: note
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string),
            timestamp: chrono::Local::now().format("%H:%M").to_string(),
        };

        if !self.state.current_capital.is_finite() {
            error!("current capital is not finite before commit, recomputing");
            self.state.current_capital = self.recompute_capital();
        }

        self.undo_stack.push(UndoEntry {
            snapshot: self.state.snapshot(),
            operation: operation.clone(),
        });
        self.state.history.push(operation.clone());

        let new_capital = self.state.current_capital + value;
        if !new_capital.is_finite() {
            error!("capital update produced a non-finite value, recomputing");
            self.state.current_capital = self.recompute_capital();
        } else {
            self.state.current_capital = new_capital;
        }

        mark_step_completed(
            &mut self.state.plan[intent.index],
            intent.slot,
            self.config.strategy,
        );

        let ctx = AdvanceContext {
            is_win: intent.is_win,
            index: intent.index,
            slot: intent.slot,
            result_value: value,
        };
        self.plan_advancer.advance(&mut self.state, &ctx);

        self.emit(LedgerEvent::Committed {
            operation: operation.clone(),
        });

        let goal = self.goal_evaluator.check_goals(&self.state);

        self.store.save_active_snapshot(&self.state);
        self.emit(LedgerEvent::Refresh);

        if goal.goal_reached {
            self.state.goal_reached = true;
            if let Some(kind) = goal.goal_type {
                self.emit(LedgerEvent::GoalReached { goal: kind });
            }
        }

        Ok(operation)
    }

    /// Reverts the most recent commit by restoring its snapshot.
    ///
    /// A full verbatim restore rather than a computed inverse, so it is
    /// exact by construction. Returns `false` when there is nothing to undo.
    pub fn undo(&mut self) -> Result<bool> {
        let Some(entry) = self.undo_stack.pop() else {
            return Ok(false);
        };

        self.state.restore(entry.snapshot);
        self.store.save_active_snapshot(&self.state);

        self.emit(LedgerEvent::Undone {
            operation: entry.operation,
        });
        self.emit(LedgerEvent::Refresh);
        Ok(true)
    }

    /// Flips the outcome of an operation in the current session.
    ///
    /// When the original entry/return amounts were recorded, the new value is
    /// recomputed from them exactly. Without them the value is estimated from
    /// the payout percentage. That is an approximation rather than a true
    /// inverse, kept as-is pending product input.
    pub fn edit_operation(&mut self, index: usize, new_is_win: bool) -> Result<()> {
        let op = self
            .state
            .history
            .get(index)
            .ok_or(JournalError::OperationOutOfRange { index })?;
        if op.is_win == new_is_win {
            return Ok(());
        }

        self.undo_stack.push(UndoEntry {
            snapshot: self.state.snapshot(),
            operation: op.clone(),
        });

        let default_payout = self.config.payout_percent;
        let op = &mut self.state.history[index];
        let old_value = op.value.unwrap_or(0.0);
        op.is_win = new_is_win;

        match (op.entry_amount, op.return_amount) {
            (Some(entry), Some(ret)) => {
                op.value = Some(if new_is_win { ret } else { -entry });
            }
            _ => {
                warn!(index, "editing operation without recorded entry/return amounts");
                let payout_percent = if op.payout_percent > 0.0 {
                    op.payout_percent
                } else {
                    default_payout
                };
                let payout_factor = payout_percent / 100.0;
                op.value = Some(if new_is_win {
                    // Was a loss of the stake; estimate the win as stake × payout.
                    old_value.abs() * payout_factor
                } else {
                    // Was stake × payout; estimate the stake back out.
                    -(old_value / payout_factor)
                });
            }
        }

        let delta = op.value.unwrap_or(0.0) - old_value;
        self.state.current_capital += delta;

        self.store.save_active_snapshot(&self.state);
        self.emit(LedgerEvent::Edited { index });
        self.emit(LedgerEvent::Refresh);
        Ok(())
    }

    /// Flips the outcome of an operation in a previously persisted session.
    ///
    /// Unlike the in-session edit, the aggregate result is recomputed over
    /// the entire history rather than adjusted by a delta: safer against
    /// drift at the cost of a full scan.
    pub fn edit_archived_operation(
        &mut self,
        session_id: SessionId,
        index: usize,
        new_is_win: bool,
    ) -> Result<()> {
        let doc = self
            .store
            .get_session_by_id(session_id)?
            .ok_or(JournalError::SessionNotFound(session_id))?;
        let mut session = crate::normalize::normalize(&doc)
            .ok_or_else(|| JournalError::Validation("archived session is not normalizable".into()))?;

        let op = session
            .combined_history
            .get_mut(index)
            .ok_or(JournalError::OperationOutOfRange { index })?;
        if op.is_win == new_is_win {
            return Ok(());
        }

        op.is_win = new_is_win;
        op.value = match (op.entry_amount, op.return_amount) {
            (Some(entry), Some(ret)) => Some(if new_is_win { ret } else { -entry }),
            _ => {
                let magnitude = op.value.unwrap_or(0.0).abs();
                Some(if new_is_win { magnitude } else { -magnitude })
            }
        };

        session.financial_result = sum_operation_values(&session.combined_history);
        session.operation_count = session.combined_history.len() as u64;
        session.request_id = Some(ensure_request_id(None, "session_edit"));

        self.store.update_session(&session.to_value())?;
        self.emit(LedgerEvent::ArchivedEdited { session_id });
        Ok(())
    }

    /// Ends the active session, persisting it as an immutable record.
    ///
    /// Returns the assigned session id. Clears the runtime state, the undo
    /// stack, and the quick-save slot.
    pub fn end_session(&mut self) -> Result<SessionId> {
        if !self.state.session_active {
            return Err(JournalError::NoActiveSession);
        }

        let mut session = Session {
            id: None,
            date: now_millis(),
            mode: self.state.mode.clone(),
            combined_history: self.state.history.clone(),
            operation_count: 0,
            financial_result: sum_operation_values(&self.state.history),
            request_id: None,
        };
        canonicalize(&mut session);

        let session_id = self.store.add_session(&session.to_value())?;

        self.state = RuntimeState::default();
        self.pending = None;
        self.undo_stack.clear();
        if let Err(e) = self.store.clear_active_snapshot() {
            warn!(error = %e, "failed to clear active session snapshot");
        }

        self.emit(LedgerEvent::SessionEnded { session_id });
        Ok(session_id)
    }

    /// Recomputes capital from scratch: session start capital plus the sum of
    /// every finite operation value, falling back to configured and then
    /// hardcoded defaults when the start capital itself is unusable.
    fn recompute_capital(&self) -> f64 {
        let mut capital = self.state.session_start_capital;
        if !capital.is_finite() {
            capital = self.config.initial_capital;
        }
        if !capital.is_finite() {
            capital = FALLBACK_CAPITAL;
        }
        capital + sum_operation_values(&self.state.history)
    }

    /// Notifies every subscriber, isolating failures per subscriber.
    fn emit(&mut self, event: LedgerEvent) {
        for subscriber in &mut self.subscribers {
            if let Err(e) = subscriber.on_event(&event, &self.state) {
                warn!(error = %e, "ledger subscriber failed");
            }
        }
    }
}

/// Marks a plan step (or one of its sub-entries) as played.
///
/// Only the cycles strategy tracks completion.
fn mark_step_completed(step: &mut PlanStep, slot: EntrySlot, strategy: Strategy) {
    if strategy != Strategy::Cycles {
        return;
    }
    match &mut step.entries {
        StepEntries::Single { done, .. } => *done = true,
        StepEntries::Split { first, second } => match slot {
            EntrySlot::First => first.done = true,
            EntrySlot::Second => second.done = true,
        },
    }
}
