// SPDX-License-Identifier: MIT

//! Client handle to a running goal engine.

use crate::error::SignalError;
use crate::host::Envelope;
use muster_core::{
    AgentResponse, EngineDecision, EngineSignal, EngineState, EngineStatus, GoalId, StepId,
    WorkflowId,
};
use muster_engine::EngineWorkflow;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

/// Handle to one goal's engine host.
///
/// Cloneable; all clones address the same engine instance. Queries read
/// a snapshot consistent with the last fully-applied signal; signals
/// are durably logged before they are applied.
#[derive(Clone)]
pub struct EngineHandle {
    pub(crate) goal_id: GoalId,
    pub(crate) workflow_id: WorkflowId,
    pub(crate) tx: mpsc::Sender<Envelope>,
    pub(crate) cell: Arc<Mutex<EngineWorkflow>>,
    pub(crate) status_rx: watch::Receiver<EngineStatus>,
    pub(crate) done_rx: watch::Receiver<bool>,
    pub(crate) cancel: CancellationToken,
}

impl EngineHandle {
    pub fn goal_id(&self) -> &GoalId {
        &self.goal_id
    }

    pub fn workflow_id(&self) -> WorkflowId {
        self.workflow_id.clone()
    }

    /// The `currentState` query.
    pub fn current_state(&self) -> EngineState {
        self.cell.lock().current_state()
    }

    /// Engine status as of the last applied signal.
    pub fn status(&self) -> EngineStatus {
        self.cell.lock().status()
    }

    /// Send a signal. Returns an error only when the host has stopped;
    /// a terminal goal still accepts (and logs) signals.
    pub async fn signal(&self, signal: EngineSignal) -> Result<(), SignalError> {
        self.tx.send(Envelope::Signal(signal)).await.map_err(|_| SignalError::HostStopped)
    }

    pub async fn agent_completed(
        &self,
        step_id: impl Into<StepId>,
        response: AgentResponse,
    ) -> Result<(), SignalError> {
        self.signal(EngineSignal::AgentCompleted { step_id: step_id.into(), response }).await
    }

    pub async fn apply_decision(&self, decision: EngineDecision) -> Result<(), SignalError> {
        self.signal(EngineSignal::ApplyDecision { decision }).await
    }

    pub async fn approve(&self, step_id: impl Into<StepId>) -> Result<(), SignalError> {
        self.signal(EngineSignal::Approve { step_id: step_id.into() }).await
    }

    pub async fn cancel(&self, reason: impl Into<String>) -> Result<(), SignalError> {
        self.signal(EngineSignal::Cancel { reason: reason.into() }).await
    }

    pub async fn custom(
        &self,
        event_type: impl Into<String>,
        payload: Value,
    ) -> Result<(), SignalError> {
        self.signal(EngineSignal::Custom { event_type: event_type.into(), payload }).await
    }

    /// Wait until the goal reaches a terminal status and return it.
    pub async fn await_terminal(&self) -> EngineStatus {
        let mut rx = self.status_rx.clone();
        loop {
            let status = *rx.borrow_and_update();
            if status.is_terminal() {
                return status;
            }
            if rx.changed().await.is_err() {
                // Host stopped; report whatever was last observed.
                return *rx.borrow();
            }
        }
    }

    /// Wait until every signal sent before this call has been applied.
    ///
    /// The mailbox is drained strictly in order, so a barrier message
    /// acknowledges only after everything ahead of it was applied.
    pub async fn drained(&self) {
        let (ack_tx, ack_rx) = tokio::sync::oneshot::channel();
        if self.tx.send(Envelope::Barrier(ack_tx)).await.is_err() {
            return;
        }
        let _ = ack_rx.await;
    }

    /// Stop the host: flushes the WAL and writes a final checkpoint.
    /// The engine stops accepting signals once the host exits.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Wait for the host task to exit (after [`shutdown`](Self::shutdown)).
    pub async fn join(&self) {
        let mut rx = self.done_rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}
