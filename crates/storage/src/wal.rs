// SPDX-License-Identifier: MIT

//! Append-only write-ahead log.
//!
//! Records are JSON, one per line, each wrapped with a monotonically
//! increasing sequence number. The log doubles as the host's inbound
//! queue: `append` + `flush` make a record durable, `next_unprocessed`
//! hands records to the consumer in order, `mark_processed` advances
//! the cursor that snapshots record.
//!
//! Corruption safety: an unreadable line (torn write, binary garbage)
//! never loses data silently. The file is first rotated to a `.bak`
//! backup, then rewritten with only the readable prefix, so later
//! appends land in a clean log instead of after corrupt bytes.

use crate::snapshot::rotate_bak_path;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur in WAL operations
#[derive(Debug, Error)]
pub enum WalError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One sequenced record read back from the log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalEntry<T> {
    pub seq: u64,
    pub record: T,
}

/// Append-only JSON-lines log with a processed-sequence cursor.
pub struct Wal<T> {
    path: PathBuf,
    writer: BufWriter<File>,
    write_seq: u64,
    processed_seq: u64,
    pending: VecDeque<WalEntry<T>>,
}

impl<T> Wal<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Open (or create) the log at `path`.
    ///
    /// Entries with `seq > processed_seq` are queued for
    /// [`next_unprocessed`](Self::next_unprocessed). When corruption is
    /// detected the original file is backed up and the corrupt tail is
    /// truncated away.
    pub fn open(path: impl AsRef<Path>, processed_seq: u64) -> Result<Self, WalError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut write_seq = processed_seq;
        let mut pending = VecDeque::new();
        if path.exists() {
            let mut readable: Vec<String> = Vec::new();
            let mut corrupt = false;
            let reader = BufReader::new(File::open(&path)?);
            for (line_no, line) in reader.lines().enumerate() {
                // Non-UTF-8 bytes surface as an Err line, not an Io
                // failure of the whole open.
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            line = line_no + 1,
                            error = %e,
                            "unreadable bytes in WAL"
                        );
                        corrupt = true;
                        break;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }
                let entry: WalEntry<T> = match serde_json::from_str(&line) {
                    Ok(entry) => entry,
                    Err(e) => {
                        // Torn line from a crash mid-append, or foreign
                        // content; everything before it is intact.
                        tracing::warn!(
                            path = %path.display(),
                            line = line_no + 1,
                            error = %e,
                            "unparseable WAL line"
                        );
                        corrupt = true;
                        break;
                    }
                };
                write_seq = write_seq.max(entry.seq);
                if entry.seq > processed_seq {
                    pending.push_back(entry);
                }
                readable.push(line);
            }

            if corrupt {
                back_up(&path)?;
                rewrite_lines(&path, &readable)?;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { path, writer: BufWriter::new(file), write_seq, processed_seq, pending })
    }

    /// Append a record, returning its sequence number.
    ///
    /// The record is buffered; call [`flush`](Self::flush) before
    /// applying it to make it durable.
    pub fn append(&mut self, record: &T) -> Result<u64, WalError>
    where
        T: Clone,
    {
        self.write_seq += 1;
        let seq = self.write_seq;
        let line = serde_json::to_string(&WalEntry { seq, record })?;
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.pending.push_back(WalEntry { seq, record: record.clone() });
        Ok(seq)
    }

    /// Flush buffered appends to disk.
    pub fn flush(&mut self) -> Result<(), WalError> {
        self.writer.flush()?;
        Ok(())
    }

    /// Next record past the processed cursor, in sequence order.
    pub fn next_unprocessed(&mut self) -> Result<Option<WalEntry<T>>, WalError> {
        Ok(self.pending.pop_front())
    }

    /// Advance the processed cursor (recorded by the next snapshot).
    pub fn mark_processed(&mut self, seq: u64) {
        self.processed_seq = self.processed_seq.max(seq);
    }

    /// Rewrite the log keeping only records past the processed cursor.
    ///
    /// Called after a snapshot has made the processed prefix redundant.
    /// An unreadable line found here is handled like in
    /// [`open`](Self::open): back up first, then truncate.
    pub fn truncate_processed(&mut self) -> Result<(), WalError> {
        self.writer.flush()?;

        let mut keep: Vec<String> = Vec::new();
        let mut corrupt = false;
        {
            let reader = BufReader::new(File::open(&self.path)?);
            for line in reader.lines() {
                let Ok(line) = line else {
                    corrupt = true;
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                let Ok(entry) = serde_json::from_str::<WalEntry<T>>(&line) else {
                    corrupt = true;
                    break;
                };
                if entry.seq > self.processed_seq {
                    keep.push(line);
                }
            }
        }

        if corrupt {
            back_up(&self.path)?;
        }
        rewrite_lines(&self.path, &keep)?;

        let file = OpenOptions::new().append(true).open(&self.path)?;
        self.writer = BufWriter::new(file);
        Ok(())
    }

    pub fn write_seq(&self) -> u64 {
        self.write_seq
    }

    pub fn processed_seq(&self) -> u64 {
        self.processed_seq
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Rotate a `.bak` slot and copy the current file into it, preserving
/// the original bytes before any truncation.
fn back_up(path: &Path) -> Result<(), WalError> {
    let bak = rotate_bak_path(path);
    fs::copy(path, &bak)?;
    tracing::warn!(
        path = %path.display(),
        backup = %bak.display(),
        "backed up corrupt WAL before truncating"
    );
    Ok(())
}

/// Atomically replace the log with the given raw lines.
fn rewrite_lines(path: &Path, lines: &[String]) -> Result<(), WalError> {
    let tmp = path.with_extension("wal.tmp");
    {
        let mut writer = BufWriter::new(File::create(&tmp)?);
        for line in lines {
            writer.write_all(line.as_bytes())?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
#[path = "wal_tests.rs"]
mod tests;
