// SPDX-License-Identifier: MIT

//! The dispatch loop: observe WAITING steps, run agents, signal back.
//!
//! Stateless with respect to goals: everything it needs is read from
//! the engine via the `currentState` query. The only local memory is
//! the dedup window, which suppresses duplicate executions of a step
//! generation while its completion signal is in flight (signal
//! delivery is at-least-once).

use crate::agent::AgentContext;
use crate::config::DispatcherConfig;
use crate::coordinator::Coordinator;
use muster_core::{
    Clock, EngineAction, EngineDecision, ResponseError, RunId, StepId, SystemClock,
};
use muster_runtime::EngineHandle;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// What one tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// Steps handed to agents this tick.
    pub dispatched: usize,
    /// WAITING steps skipped by the dedup window.
    pub suppressed: usize,
    /// WAITING steps with no routed agent (left WAITING).
    pub unroutable: usize,
}

/// One remembered dispatch, keyed by step.
struct DispatchRecord {
    correlation: String,
    /// `updated_at_ms` of the step when dispatched; a re-requested
    /// step gets a new generation and may be dispatched again.
    generation_ms: u64,
    at_ms: u64,
}

/// External reactor running agents against a goal's WAITING steps.
pub struct Dispatcher<C: Clock = SystemClock> {
    coordinator: Arc<Coordinator>,
    config: DispatcherConfig,
    clock: C,
    seen: Mutex<HashMap<StepId, DispatchRecord>>,
    limits: Mutex<HashMap<String, Arc<Semaphore>>>,
}

impl Dispatcher<SystemClock> {
    pub fn new(coordinator: Arc<Coordinator>, config: DispatcherConfig) -> Self {
        Self::with_clock(coordinator, config, SystemClock)
    }
}

impl<C: Clock> Dispatcher<C> {
    pub fn with_clock(coordinator: Arc<Coordinator>, config: DispatcherConfig, clock: C) -> Self {
        Self {
            coordinator,
            config,
            clock,
            seen: Mutex::new(HashMap::new()),
            limits: Mutex::new(HashMap::new()),
        }
    }

    /// One activation: dispatch every WAITING step that has a routed
    /// agent and is not shielded by the dedup window, then wait for
    /// the dispatched agents to finish signaling.
    pub async fn tick(&self, handle: &EngineHandle) -> TickSummary {
        let mut summary = TickSummary::default();
        let state = handle.current_state();
        if state.status.is_terminal() {
            return summary;
        }

        let now = self.clock.epoch_ms();
        self.prune_seen(now);

        struct Target {
            step_id: StepId,
            kind: String,
            payload: serde_json::Value,
            run_id: RunId,
            agent: Arc<dyn crate::agent::Agent>,
        }

        let mut targets = Vec::new();
        for (step_id, step) in state.waiting_steps() {
            if self.is_suppressed(step_id, step.updated_at_ms) {
                summary.suppressed += 1;
                continue;
            }
            let kind = step.kind.as_str();
            let Some(agent) = self.coordinator.agent_for_kind(kind) else {
                summary.unroutable += 1;
                tracing::warn!(step_id = %step_id, kind, "no agent routed; step stays waiting");
                continue;
            };

            let run_id = RunId::new();
            self.remember(step_id.clone(), run_id.clone(), step.updated_at_ms, now);
            targets.push(Target {
                step_id: step_id.clone(),
                kind: kind.to_string(),
                payload: step.payload.clone(),
                run_id,
                agent,
            });
        }

        summary.dispatched = targets.len();
        let mut joins = Vec::with_capacity(targets.len());
        for target in targets {
            let semaphore = self.limit_for(&target.kind);
            let handle = handle.clone();
            let announce = self.config.announce_dispatch;
            let goal_id = state.goal_id.clone();
            let workflow_id = handle.workflow_id();

            joins.push(tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return;
                };

                let ctx = AgentContext {
                    goal_id,
                    workflow_id,
                    step_id: target.step_id.clone(),
                    run_id: target.run_id.clone(),
                    agent_role: target.agent.describe().name,
                };

                if announce {
                    let marker = EngineDecision::new(format!("dispatch-{}", target.run_id))
                        .action(EngineAction::annotate(
                            format!("dispatched:{}", target.step_id),
                            serde_json::json!({ "run_id": target.run_id.clone() }),
                        ));
                    let _ = handle.apply_decision(marker).await;
                }

                tracing::info!(
                    step_id = %target.step_id,
                    kind = %target.kind,
                    run_id = %target.run_id,
                    agent = %ctx.agent_role,
                    "dispatching step"
                );
                let response = match target
                    .agent
                    .execute(&target.kind, &target.payload, ctx.clone())
                    .await
                {
                    Ok(response) => response,
                    Err(e) => {
                        // No envelope came back; synthesize a FAIL so
                        // the spec still observes a completion.
                        tracing::error!(step_id = %target.step_id, error = %e, "agent error");
                        ctx.fail().error(ResponseError::new(e.to_string()))
                    }
                };

                if handle.agent_completed(target.step_id.clone(), response).await.is_err() {
                    tracing::warn!(step_id = %target.step_id, "engine host gone; completion dropped");
                }
            }));
        }

        for join in joins {
            let _ = join.await;
        }
        summary
    }

    /// Tick until the goal reaches a terminal status.
    pub async fn run(&self, handle: &EngineHandle) -> muster_core::EngineStatus {
        loop {
            let summary = self.tick(handle).await;
            handle.drained().await;

            let status = handle.status();
            if status.is_terminal() {
                return status;
            }
            if summary.dispatched == 0 {
                tokio::time::sleep(self.config.poll_interval).await;
            }
        }
    }

    fn is_suppressed(&self, step_id: &StepId, generation_ms: u64) -> bool {
        let seen = self.seen.lock();
        match seen.get(step_id.as_str()) {
            Some(record) if record.generation_ms == generation_ms => {
                tracing::debug!(
                    correlation = %record.correlation,
                    "dispatch suppressed by dedup window"
                );
                true
            }
            _ => false,
        }
    }

    fn remember(&self, step_id: StepId, run_id: RunId, generation_ms: u64, at_ms: u64) {
        let correlation = format!("{step_id}:{run_id}");
        tracing::debug!(correlation = %correlation, "recording dispatch");
        self.seen.lock().insert(step_id, DispatchRecord { correlation, generation_ms, at_ms });
    }

    fn prune_seen(&self, now_ms: u64) {
        let window = self.config.dedup_window.as_millis() as u64;
        self.seen.lock().retain(|_, record| record.at_ms + window > now_ms);
    }

    fn limit_for(&self, kind: &str) -> Arc<Semaphore> {
        let mut limits = self.limits.lock();
        limits
            .entry(kind.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(self.config.concurrency_for(kind))))
            .clone()
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
