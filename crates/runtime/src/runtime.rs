// SPDX-License-Identifier: MIT

//! Goal lifecycle: start, resume, tombstone.

use crate::config::RuntimeConfig;
use crate::error::RuntimeError;
use crate::handle::EngineHandle;
use crate::host::GoalHost;
use crate::record::{EngineCheckpoint, GoalRecord};
use muster_core::{Clock, EngineDecision, GoalId, SystemClock, WorkflowId};
use muster_engine::{EngineWorkflow, Spec};
use muster_storage::{Checkpointer, Wal};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

/// The durable host: starts and resumes goal engines.
pub struct Runtime<C: Clock = SystemClock> {
    config: RuntimeConfig,
    clock: C,
}

impl Runtime<SystemClock> {
    pub fn new(config: RuntimeConfig) -> Self {
        Self { config, clock: SystemClock }
    }
}

impl<C: Clock> Runtime<C> {
    pub fn with_clock(config: RuntimeConfig, clock: C) -> Self {
        Self { config, clock }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Start a fresh goal with a resolved spec and an optional boot
    /// decision (applied exactly once, before any external signal).
    ///
    /// Fails with [`RuntimeError::GoalExists`] when the goal already
    /// has durable state; use [`resume`](Self::resume) for that.
    pub fn start(
        &self,
        goal_id: GoalId,
        spec: Arc<dyn Spec>,
        boot: Option<EngineDecision>,
    ) -> Result<EngineHandle, RuntimeError> {
        self.ensure_fresh(&goal_id)?;

        let workflow_id = WorkflowId::new();
        let at_ms = self.clock.epoch_ms();
        let spec_name = spec.name().to_string();

        let mut wal: Wal<GoalRecord> = Wal::open(self.config.wal_path(&goal_id), 0)?;
        wal.append(&GoalRecord::Started {
            goal_id: goal_id.clone(),
            workflow_id: workflow_id.clone(),
            spec: spec_name.clone(),
            boot: boot.clone(),
            at_ms,
        })?;
        wal.flush()?;

        let mut engine = EngineWorkflow::start(goal_id, workflow_id, spec, at_ms);
        if let Some(decision) = &boot {
            engine.boot(decision, at_ms);
        }
        consume_processed(&mut wal)?;

        Ok(self.spawn(engine, wal, spec_name, false))
    }

    /// Start a tombstone for a spec name that did not resolve: the
    /// goal is queryable, FAILED from birth (*unknown-spec*).
    pub fn start_failed(
        &self,
        goal_id: GoalId,
        spec_name: &str,
    ) -> Result<EngineHandle, RuntimeError> {
        self.ensure_fresh(&goal_id)?;

        let workflow_id = WorkflowId::new();
        let at_ms = self.clock.epoch_ms();

        let mut wal: Wal<GoalRecord> = Wal::open(self.config.wal_path(&goal_id), 0)?;
        wal.append(&GoalRecord::Tombstone {
            goal_id: goal_id.clone(),
            workflow_id: workflow_id.clone(),
            spec: spec_name.to_string(),
            at_ms,
        })?;
        wal.flush()?;

        let engine = EngineWorkflow::failed(goal_id, workflow_id, spec_name, at_ms);
        consume_processed(&mut wal)?;

        Ok(self.spawn(engine, wal, spec_name.to_string(), true))
    }

    /// Resume a goal from its snapshot plus WAL tail.
    ///
    /// The offered spec must carry the name the goal was started with.
    pub fn resume(
        &self,
        goal_id: &GoalId,
        spec: Arc<dyn Spec>,
    ) -> Result<EngineHandle, RuntimeError> {
        let checkpointer = Checkpointer::new(self.config.snapshot_path(goal_id));
        let snapshot = checkpointer.load::<EngineCheckpoint>()?;

        let (mut engine, processed_seq, spec_name, tombstone) = match snapshot {
            Some(snap) => {
                let cp = snap.state;
                if !cp.tombstone && cp.spec != spec.name() {
                    return Err(RuntimeError::SpecMismatch {
                        recorded: cp.spec,
                        offered: spec.name().to_string(),
                    });
                }
                let engine = if cp.tombstone {
                    EngineWorkflow::resume_failed(cp.workflow_id, cp.state, cp.ids, cp.now_ms)
                } else {
                    EngineWorkflow::resume(cp.workflow_id, cp.state, cp.ids, cp.now_ms, spec.clone())
                };
                (Some(engine), snap.seq, cp.spec, cp.tombstone)
            }
            None => (None, 0, String::new(), false),
        };

        let wal_path = self.config.wal_path(goal_id);
        if engine.is_none() && !wal_path.exists() {
            return Err(RuntimeError::GoalNotFound(goal_id.to_string()));
        }

        let mut wal: Wal<GoalRecord> = Wal::open(wal_path, processed_seq)?;
        let mut spec_name = spec_name;
        let mut tombstone = tombstone;

        while let Some(entry) = wal.next_unprocessed()? {
            match entry.record {
                GoalRecord::Started { goal_id, workflow_id, spec: recorded, boot, at_ms } => {
                    if recorded != spec.name() {
                        return Err(RuntimeError::SpecMismatch {
                            recorded,
                            offered: spec.name().to_string(),
                        });
                    }
                    let mut fresh =
                        EngineWorkflow::start(goal_id, workflow_id, spec.clone(), at_ms);
                    if let Some(decision) = &boot {
                        fresh.boot(decision, at_ms);
                    }
                    spec_name = recorded;
                    tombstone = false;
                    engine = Some(fresh);
                }
                GoalRecord::Tombstone { goal_id, workflow_id, spec: recorded, at_ms } => {
                    engine =
                        Some(EngineWorkflow::failed(goal_id, workflow_id, &recorded, at_ms));
                    spec_name = recorded;
                    tombstone = true;
                }
                GoalRecord::Signal { at_ms, signal } => {
                    let Some(engine) = engine.as_mut() else {
                        return Err(RuntimeError::CorruptLog(
                            "signal record precedes goal start".to_string(),
                        ));
                    };
                    engine.handle_signal(&signal, at_ms);
                }
            }
            wal.mark_processed(entry.seq);
        }

        let engine = engine.ok_or_else(|| {
            RuntimeError::CorruptLog("no start record and no snapshot".to_string())
        })?;
        tracing::info!(goal = %goal_id, seq = wal.processed_seq(), "goal resumed");
        Ok(self.spawn(engine, wal, spec_name, tombstone))
    }

    fn ensure_fresh(&self, goal_id: &GoalId) -> Result<(), RuntimeError> {
        let wal_exists = self
            .config
            .wal_path(goal_id)
            .metadata()
            .map(|m| m.len() > 0)
            .unwrap_or(false);
        if wal_exists || self.config.snapshot_path(goal_id).exists() {
            return Err(RuntimeError::GoalExists(goal_id.to_string()));
        }
        Ok(())
    }

    fn spawn(
        &self,
        engine: EngineWorkflow,
        wal: Wal<GoalRecord>,
        spec_name: String,
        tombstone: bool,
    ) -> EngineHandle {
        let goal_id = engine.goal_id().clone();
        let workflow_id = engine.workflow_id();
        let status = engine.status();

        let cell = Arc::new(Mutex::new(engine));
        let (tx, rx) = mpsc::channel(self.config.mailbox_capacity);
        let (status_tx, status_rx) = watch::channel(status);
        let (done_tx, done_rx) = watch::channel(false);
        let cancel = CancellationToken::new();

        let host = GoalHost {
            cell: cell.clone(),
            wal,
            checkpointer: Checkpointer::new(self.config.snapshot_path(&goal_id)),
            clock: self.clock.clone(),
            config: self.config.clone(),
            spec_name,
            tombstone,
            rx,
            status_tx,
            done_tx,
            cancel: cancel.clone(),
            signals_since_checkpoint: 0,
        };
        tokio::spawn(host.run());

        EngineHandle { goal_id, workflow_id, tx, cell, status_rx, done_rx, cancel }
    }
}

/// Drain records that were already applied during construction.
fn consume_processed(wal: &mut Wal<GoalRecord>) -> Result<(), RuntimeError> {
    while let Some(entry) = wal.next_unprocessed()? {
        wal.mark_processed(entry.seq);
    }
    Ok(())
}

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod tests;
