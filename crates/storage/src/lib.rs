// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! muster-storage: durability primitives for the goal host.
//!
//! A per-goal write-ahead log of inbound records plus versioned,
//! compressed snapshots. Recovery loads the latest snapshot and replays
//! the WAL tail past the snapshot's sequence number.

mod checkpoint;
mod snapshot;
mod wal;

pub use checkpoint::{CheckpointResult, Checkpointer};
pub use snapshot::{Snapshot, SnapshotError, CURRENT_SNAPSHOT_VERSION};
pub use wal::{Wal, WalEntry, WalError};
