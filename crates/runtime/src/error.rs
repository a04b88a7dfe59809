// SPDX-License-Identifier: MIT

//! Host errors.

use thiserror::Error;

/// Errors surfaced by [`Runtime`](crate::Runtime) operations.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("WAL error: {0}")]
    Wal(#[from] muster_storage::WalError),

    #[error("snapshot error: {0}")]
    Snapshot(#[from] muster_storage::SnapshotError),

    #[error("goal {0} already has durable state")]
    GoalExists(String),

    #[error("no durable state found for goal {0}")]
    GoalNotFound(String),

    #[error("goal was started with spec {recorded}, resume offered {offered}")]
    SpecMismatch { recorded: String, offered: String },

    #[error("corrupt goal log: {0}")]
    CorruptLog(String),
}

/// Error returned when signaling an engine whose host has stopped.
#[derive(Debug, Error)]
pub enum SignalError {
    #[error("engine host is not running")]
    HostStopped,
}
