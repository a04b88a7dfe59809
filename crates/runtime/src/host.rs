// SPDX-License-Identifier: MIT

//! Per-goal host task: the engine's mailbox, durability, and parking.
//!
//! One task per goal. The loop parks on a `select!` over the mailbox,
//! the shutdown token, and a long periodic wake used only for
//! checkpoint compaction. Handlers themselves never suspend, so
//! signal application is serialized exactly as the engine requires.

use crate::config::RuntimeConfig;
use crate::error::RuntimeError;
use crate::record::{EngineCheckpoint, GoalRecord};
use muster_core::{Clock, EngineSignal, EngineStatus};
use muster_engine::EngineWorkflow;
use muster_storage::{Checkpointer, Wal};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;

/// Mailbox message: a signal, or a barrier acknowledged once every
/// earlier message has been fully applied.
pub(crate) enum Envelope {
    Signal(EngineSignal),
    Barrier(oneshot::Sender<()>),
}

pub(crate) struct GoalHost<C: Clock> {
    pub(crate) cell: Arc<Mutex<EngineWorkflow>>,
    pub(crate) wal: Wal<GoalRecord>,
    pub(crate) checkpointer: Checkpointer,
    pub(crate) clock: C,
    pub(crate) config: RuntimeConfig,
    pub(crate) spec_name: String,
    pub(crate) tombstone: bool,
    pub(crate) rx: mpsc::Receiver<Envelope>,
    pub(crate) status_tx: watch::Sender<EngineStatus>,
    pub(crate) done_tx: watch::Sender<bool>,
    pub(crate) cancel: CancellationToken,
    pub(crate) signals_since_checkpoint: u64,
}

impl<C: Clock> GoalHost<C> {
    pub(crate) async fn run(mut self) {
        let goal = self.cell.lock().goal_id().to_string();
        tracing::info!(goal = %goal, spec = %self.spec_name, "goal host up");

        // Graceful shutdown writes a final checkpoint; an abandoned
        // mailbox (every handle dropped) only flushes, leaving recovery
        // to WAL replay like a crash would.
        let mut graceful = false;
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    graceful = true;
                    break;
                }
                envelope = self.rx.recv() => match envelope {
                    Some(Envelope::Signal(signal)) => {
                        if let Err(e) = self.deliver(signal) {
                            tracing::error!(goal = %goal, error = %e, "failed to persist signal");
                        }
                    }
                    Some(Envelope::Barrier(ack)) => {
                        let _ = ack.send(());
                    }
                    None => break,
                },
                _ = tokio::time::sleep(self.config.park_wake) => {
                    // Park wake: compaction only, invisible to the spec.
                    if let Err(e) = self.checkpoint() {
                        tracing::warn!(goal = %goal, error = %e, "park-wake checkpoint failed");
                    }
                }
            }
        }

        let finale = self.wal.flush().map_err(RuntimeError::from).and_then(|()| {
            if graceful {
                self.checkpoint()
            } else {
                Ok(())
            }
        });
        if let Err(e) = finale {
            tracing::warn!(goal = %goal, error = %e, "final checkpoint failed");
        }
        self.done_tx.send_replace(true);
        tracing::info!(goal = %goal, "goal host down");
    }

    /// Persist one signal, then apply everything unprocessed in order.
    fn deliver(&mut self, signal: EngineSignal) -> Result<(), RuntimeError> {
        let at_ms = self.clock.epoch_ms();
        self.wal.append(&GoalRecord::Signal { at_ms, signal })?;
        self.wal.flush()?;

        while let Some(entry) = self.wal.next_unprocessed()? {
            if let GoalRecord::Signal { at_ms, signal } = &entry.record {
                let mut engine = self.cell.lock();
                engine.handle_signal(signal, *at_ms);
                self.status_tx.send_replace(engine.status());
            }
            self.wal.mark_processed(entry.seq);
        }

        self.signals_since_checkpoint += 1;
        if self.signals_since_checkpoint >= self.config.checkpoint_interval {
            self.checkpoint()?;
        }
        Ok(())
    }

    /// Snapshot the engine and truncate the processed WAL prefix.
    fn checkpoint(&mut self) -> Result<(), RuntimeError> {
        let checkpoint = {
            let mut engine = self.cell.lock();
            if let Some(keep) = self.config.log_tail {
                engine.compact_log(keep);
            }
            let (state, ids, now_ms) = engine.checkpoint_parts();
            EngineCheckpoint {
                workflow_id: engine.workflow_id(),
                spec: self.spec_name.clone(),
                tombstone: self.tombstone,
                state: state.clone(),
                ids: ids.clone(),
                now_ms,
            }
        };

        let result = self.checkpointer.checkpoint_sync(self.wal.processed_seq(), &checkpoint)?;
        self.wal.truncate_processed()?;
        self.signals_since_checkpoint = 0;
        tracing::debug!(seq = result.seq, size_bytes = result.size_bytes, "goal checkpointed");
        Ok(())
    }
}
