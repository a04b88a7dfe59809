// SPDX-License-Identifier: MIT

//! The per-goal engine state machine.
//!
//! One `EngineWorkflow` instance owns one goal's state for the life of
//! the goal. The host delivers signals one at a time with a recorded
//! timestamp; each handler runs to completion (including the spec
//! invocation and decision application) before the next signal is
//! delivered, so a handler never observes a partially-applied decision.
//!
//! Terminal discipline: once `status` is terminal every handler appends
//! a single `SIGNAL_IGNORED` informational log entry and mutates
//! nothing else.

use crate::context::{DeterministicIds, ExecContext};
use crate::spec::{ArtifactView, Spec, SpecError};
use indexmap::map::Entry;
use muster_core::{
    AgentResponse, EngineAction, EngineDecision, EngineEvent, EngineSignal, EngineState,
    EngineStatus, GoalId, LogEntry, ResponseStatus, StepId, StepState, StepStatus, WorkflowId,
    APPROVAL_KIND, UNKNOWN_KIND,
};
use std::sync::Arc;

/// Placeholder policy for tombstone engines that are born terminal.
/// Never invoked: every handler checks the terminal status first.
struct InertSpec;

impl Spec for InertSpec {
    fn name(&self) -> &str {
        "inert"
    }

    fn on_agent_completed(
        &self,
        _state: &EngineState,
        _response: &AgentResponse,
        _ctx: &mut ExecContext<'_>,
    ) -> Result<EngineDecision, SpecError> {
        Ok(EngineDecision::new("inert"))
    }
}

/// Durable state machine for one goal.
pub struct EngineWorkflow {
    workflow_id: WorkflowId,
    state: EngineState,
    spec: Arc<dyn Spec>,
    ids: DeterministicIds,
    /// Monotonic time watermark; host stamps can only move it forward.
    now_ms: u64,
}

impl EngineWorkflow {
    /// Start a fresh engine for a goal with a resolved spec.
    pub fn start(
        goal_id: GoalId,
        workflow_id: WorkflowId,
        spec: Arc<dyn Spec>,
        at_ms: u64,
    ) -> Self {
        let ids = DeterministicIds::for_goal(&goal_id, &workflow_id);
        let mut workflow =
            Self { workflow_id, state: EngineState::new(goal_id), spec, ids, now_ms: at_ms };
        let spec_name = workflow.spec.name().to_string();
        workflow.append(EngineEvent::EngineStarted { spec: spec_name });
        workflow
    }

    /// Start a tombstone engine for a spec name that did not resolve.
    ///
    /// Born `FAILED` with an `UNKNOWN_SPEC` event; still accepts and
    /// logs signals like any other terminal engine.
    pub fn failed(goal_id: GoalId, workflow_id: WorkflowId, spec_name: &str, at_ms: u64) -> Self {
        let ids = DeterministicIds::for_goal(&goal_id, &workflow_id);
        let mut workflow = Self {
            workflow_id,
            state: EngineState::new(goal_id),
            spec: Arc::new(InertSpec),
            ids,
            now_ms: at_ms,
        };
        workflow.state.status = EngineStatus::Failed;
        workflow.append(EngineEvent::UnknownSpec { spec: spec_name.to_string() });
        workflow
    }

    /// Rebuild from checkpointed parts (host recovery path).
    pub fn resume(
        workflow_id: WorkflowId,
        state: EngineState,
        ids: DeterministicIds,
        now_ms: u64,
        spec: Arc<dyn Spec>,
    ) -> Self {
        Self { workflow_id, state, spec, ids, now_ms }
    }

    /// Rebuild a tombstone engine from checkpointed parts.
    pub fn resume_failed(
        workflow_id: WorkflowId,
        state: EngineState,
        ids: DeterministicIds,
        now_ms: u64,
    ) -> Self {
        Self { workflow_id, state, spec: Arc::new(InertSpec), ids, now_ms }
    }

    pub fn workflow_id(&self) -> WorkflowId {
        self.workflow_id.clone()
    }

    pub fn goal_id(&self) -> &GoalId {
        &self.state.goal_id
    }

    pub fn spec_name(&self) -> &str {
        self.spec.name()
    }

    /// The `currentState` query: a snapshot consistent with the last
    /// fully-applied signal.
    pub fn current_state(&self) -> EngineState {
        self.state.clone()
    }

    pub fn status(&self) -> EngineStatus {
        self.state.status
    }

    /// Checkpointable parts: (state, id source, time watermark).
    pub fn checkpoint_parts(&self) -> (&EngineState, &DeterministicIds, u64) {
        (&self.state, &self.ids, self.now_ms)
    }

    /// Drop all but the last `keep` log entries (host compaction; the
    /// discarded prefix survives in the snapshot chain).
    pub fn compact_log(&mut self, keep: usize) {
        let len = self.state.log.len();
        if len > keep {
            self.state.log.drain(..len - keep);
        }
    }

    /// Apply the boot decision. Called by the host exactly once, after
    /// start and before any external signal.
    pub fn boot(&mut self, decision: &EngineDecision, at_ms: u64) {
        self.observe_time(at_ms);
        self.apply_decision(decision);
    }

    /// Handle one signal with the host-recorded timestamp.
    pub fn handle_signal(&mut self, signal: &EngineSignal, at_ms: u64) {
        self.observe_time(at_ms);

        if self.state.status.is_terminal() {
            // Observed but without effect; the log stays honest.
            tracing::debug!(
                signal = signal.name(),
                status = %self.state.status,
                "signal ignored on terminal goal"
            );
            self.append(EngineEvent::SignalIgnored { signal: signal.name().to_string() });
            return;
        }

        let info: String =
            signal.fields().iter().map(|(k, v)| format!("{k}={v}")).collect::<Vec<_>>().join(" ");
        tracing::info!("handling signal={} {}", signal.name(), info);

        match signal {
            EngineSignal::AgentCompleted { step_id, response } => {
                self.on_agent_completed(step_id, response)
            }
            EngineSignal::ApplyDecision { decision } => self.apply_decision(decision),
            EngineSignal::Approve { step_id } => self.on_approve(step_id),
            EngineSignal::Cancel { reason } => self.on_cancel(reason),
            EngineSignal::Custom { event_type, payload } => {
                self.on_custom(event_type, payload)
            }
        }
    }

    fn observe_time(&mut self, at_ms: u64) {
        self.now_ms = self.now_ms.max(at_ms);
    }

    fn append(&mut self, event: EngineEvent) {
        self.state.log.push(LogEntry::new(self.now_ms, event));
    }

    // -- agent completion --

    fn on_agent_completed(&mut self, step_id: &StepId, response: &AgentResponse) {
        self.append(EngineEvent::AgentCompleted {
            step_id: step_id.clone(),
            run_id: response.run_id.clone(),
            status: response.status,
        });

        let step_status = match response.status {
            ResponseStatus::Ok => StepStatus::Done,
            ResponseStatus::Partial => StepStatus::InProgress,
            ResponseStatus::Fail => StepStatus::Failed,
        };
        let now = self.now_ms;
        match self.state.open_steps.entry(step_id.clone()) {
            Entry::Occupied(mut entry) => {
                let step = entry.get_mut();
                step.status = step_status;
                step.updated_at_ms = now;
            }
            Entry::Vacant(entry) => {
                // A completion for a step this engine never opened:
                // upsert under a reserved kind so history stays honest.
                let mut step = StepState::open(UNKNOWN_KIND, serde_json::Value::Null, now);
                step.status = step_status;
                entry.insert(step);
            }
        }

        // An approval step can be settled by an agent completion too;
        // the gate must track the surviving WAITING approval steps.
        self.sync_approval_gate();

        self.index_artifacts(response);

        let mut ctx = ExecContext::new(self.now_ms, &mut self.ids);
        match self.spec.on_agent_completed(&self.state, response, &mut ctx) {
            Ok(decision) => self.apply_decision(&decision),
            Err(e) => self.fail_from_spec(e),
        }
    }

    /// Index `response.artifacts` under `"{type}:{ref-or-fresh-uuid}"`.
    /// Existing keys are overwritten (last-writer-wins).
    fn index_artifacts(&mut self, response: &AgentResponse) {
        for entry in &response.artifacts {
            let ref_id = match &entry.ref_id {
                Some(r) => r.clone(),
                None => {
                    let mut ctx = ExecContext::new(self.now_ms, &mut self.ids);
                    ctx.next_uuid().to_string()
                }
            };
            let key = format!("{}:{}", entry.entry_type, ref_id);
            match serde_json::to_value(entry) {
                Ok(value) => {
                    self.state.artifacts.insert(key, value);
                }
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "failed to serialize artifact entry");
                }
            }
        }
    }

    // -- approval --

    fn on_approve(&mut self, step_id: &StepId) {
        let now = self.now_ms;
        let Some(step) = self.state.open_steps.get_mut(step_id.as_str()) else {
            // No such step: a no-op by contract.
            tracing::debug!(step_id = %step_id, "approve for unknown step");
            return;
        };
        step.status = StepStatus::Done;
        step.updated_at_ms = now;
        self.append(EngineEvent::Approved { step_id: step_id.clone() });
        self.sync_approval_gate();
    }

    /// Keep `AWAITING_APPROVAL` in lockstep with the existence of a
    /// WAITING APPROVAL step, whichever way the step got settled or
    /// (re)opened. Terminal statuses are never touched.
    fn sync_approval_gate(&mut self) {
        match (self.state.status, self.state.has_waiting_approval()) {
            (EngineStatus::Running, true) => self.state.status = EngineStatus::AwaitingApproval,
            (EngineStatus::AwaitingApproval, false) => self.state.status = EngineStatus::Running,
            _ => {}
        }
    }

    // -- cancel --

    fn on_cancel(&mut self, reason: &str) {
        self.state.status = EngineStatus::Cancelled;
        self.append(EngineEvent::Cancelled { reason: reason.to_string() });
    }

    // -- custom events --

    fn on_custom(&mut self, event_type: &str, payload: &serde_json::Value) {
        self.append(EngineEvent::CustomEvent { event_type: event_type.to_string() });
        match self.spec.on_custom_event(&self.state, event_type, payload) {
            Ok(Some(decision)) => self.apply_decision(&decision),
            Ok(None) => {}
            Err(e) => self.fail_from_spec(e),
        }
    }

    // -- decision application --

    /// Apply one decision as a single logical transaction: the
    /// `APPLY_DECISION` event, each action in order, the finalize
    /// transition, then the spec's `post_apply`.
    fn apply_decision(&mut self, decision: &EngineDecision) {
        if self.state.status.is_terminal() {
            self.append(EngineEvent::SignalIgnored { signal: "apply_decision".to_string() });
            return;
        }

        self.append(EngineEvent::ApplyDecision { decision: decision.clone() });

        for action in &decision.actions {
            match action {
                EngineAction::RequestWork { work_kind, payload, step_id } => {
                    self.open_step(work_kind, payload, step_id.as_ref());
                }
                EngineAction::RequestApproval { payload, step_id } => {
                    self.open_step(APPROVAL_KIND, payload, step_id.as_ref());
                }
                EngineAction::Annotate { key, value } => {
                    self.state.artifacts.insert(key.clone(), value.clone());
                }
                EngineAction::Unsupported => {
                    // Abort: already-applied actions remain, the log
                    // records what ran.
                    let detail = format!(
                        "decision {} carried an unsupported action",
                        decision.decision_id
                    );
                    tracing::error!(decision_id = %decision.decision_id, "{}", detail);
                    self.state.status = EngineStatus::Failed;
                    self.append(EngineEvent::ApplicationError { detail });
                    return;
                }
            }
        }

        self.sync_approval_gate();

        if decision.finalize {
            self.state.status = EngineStatus::Completed;
            self.append(EngineEvent::Finalized);
        }

        self.run_post_apply();
    }

    /// Open (or reset) a step for a work/approval request.
    ///
    /// Steps named by ID are reset only from WAITING/FAILED; anything
    /// else is left untouched with a `REQUEST_IGNORED` warning. The
    /// approval gate is recomputed by the caller once the whole
    /// decision has been applied.
    fn open_step(&mut self, kind: &str, payload: &serde_json::Value, step_id: Option<&StepId>) {
        let now = self.now_ms;
        let effective_id = match step_id {
            Some(id) => id.clone(),
            None => {
                let mut ctx = ExecContext::new(now, &mut self.ids);
                ctx.mint_step_id(kind)
            }
        };

        // Resolve the disposition first: `append` needs the whole state,
        // so the step borrow must end before any warning is logged.
        let blocked = match self.state.open_steps.get(effective_id.as_str()) {
            Some(existing) if !existing.status.is_resettable() => Some(existing.status),
            _ => None,
        };
        if let Some(status) = blocked {
            tracing::warn!(
                step_id = %effective_id,
                %status,
                "work request for non-resettable step ignored"
            );
            self.append(EngineEvent::RequestIgnored { step_id: effective_id, status });
            return;
        }

        match self.state.open_steps.entry(effective_id) {
            Entry::Occupied(mut entry) => {
                let existing = entry.get_mut();
                existing.status = StepStatus::Waiting;
                existing.payload = payload.clone();
                existing.updated_at_ms = now;
            }
            Entry::Vacant(entry) => {
                entry.insert(StepState::open(kind, payload.clone(), now));
            }
        }
    }

    fn run_post_apply(&mut self) {
        let mut view = ArtifactView::new(
            self.state.status,
            &self.state.open_steps,
            &mut self.state.artifacts,
        );
        if let Err(e) = self.spec.post_apply(&mut view) {
            self.fail_from_spec(e);
        }
    }

    fn fail_from_spec(&mut self, error: SpecError) {
        tracing::error!(spec = self.spec.name(), error = %error, "spec callback failed");
        self.state.status = EngineStatus::Failed;
        self.append(EngineEvent::SpecError { detail: error.message });
    }
}

#[cfg(test)]
#[path = "workflow_tests/mod.rs"]
mod tests;
