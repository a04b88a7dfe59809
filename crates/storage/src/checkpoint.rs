// SPDX-License-Identifier: MIT

//! Checkpointer: compressed snapshot writes with backup rotation.

use crate::snapshot::{rotate_bak_path, Snapshot, SnapshotError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// zstd level 0 = the library default (currently 3); snapshots are
/// small and written off the hot path, so the default is plenty.
const ZSTD_LEVEL: i32 = 0;

/// Outcome of a completed checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckpointResult {
    pub seq: u64,
    pub size_bytes: u64,
}

/// Writes and loads compressed snapshots at a fixed path.
pub struct Checkpointer {
    path: PathBuf,
}

impl Checkpointer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write a snapshot of `state` at WAL sequence `seq`.
    ///
    /// The previous snapshot (if any) is rotated to a `.bak` file and
    /// the new one is written to a temp path then renamed, so a crash
    /// mid-write never leaves a half-written snapshot in place.
    pub fn checkpoint_sync<S>(&self, seq: u64, state: &S) -> Result<CheckpointResult, SnapshotError>
    where
        S: Serialize + DeserializeOwned + Clone,
    {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let snapshot = Snapshot::new(seq, state.clone());
        let json = serde_json::to_vec(&snapshot)?;
        let compressed = zstd::encode_all(json.as_slice(), ZSTD_LEVEL)?;

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, &compressed)?;

        if self.path.exists() {
            let bak = rotate_bak_path(&self.path);
            let _ = fs::rename(&self.path, bak);
        }
        fs::rename(&tmp, &self.path)?;

        tracing::debug!(
            path = %self.path.display(),
            seq,
            size_bytes = compressed.len(),
            "checkpoint written"
        );
        Ok(CheckpointResult { seq, size_bytes: compressed.len() as u64 })
    }

    /// Load the snapshot, or `None` if no snapshot has been written.
    ///
    /// Accepts both compressed and plain-JSON files so snapshots from
    /// before compression was introduced still load.
    pub fn load<S>(&self) -> Result<Option<Snapshot<S>>, SnapshotError>
    where
        S: Serialize + DeserializeOwned,
    {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read(&self.path)?;
        let json = match zstd::decode_all(raw.as_slice()) {
            Ok(decoded) => decoded,
            Err(_) => raw,
        };
        Ok(Some(Snapshot::from_json(&json)?))
    }
}

#[cfg(test)]
#[path = "checkpoint_tests.rs"]
mod tests;
