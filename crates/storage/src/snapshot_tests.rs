// SPDX-License-Identifier: MIT

use super::*;
use tempfile::tempdir;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
struct State {
    count: u32,
}

#[test]
fn snapshot_carries_version_and_seq() {
    let snapshot = Snapshot::new(7, State { count: 3 });
    assert_eq!(snapshot.version, CURRENT_SNAPSHOT_VERSION);
    assert_eq!(snapshot.seq, 7);
}

#[test]
fn from_json_roundtrip() {
    let snapshot = Snapshot::new(7, State { count: 3 });
    let bytes = serde_json::to_vec(&snapshot).unwrap();
    let loaded: Snapshot<State> = Snapshot::from_json(&bytes).unwrap();
    assert_eq!(loaded.seq, 7);
    assert_eq!(loaded.state, State { count: 3 });
}

#[test]
fn from_json_rejects_future_version() {
    let mut snapshot = Snapshot::new(1, State { count: 0 });
    snapshot.version = CURRENT_SNAPSHOT_VERSION + 1;
    let bytes = serde_json::to_vec(&snapshot).unwrap();
    let result: Result<Snapshot<State>, _> = Snapshot::from_json(&bytes);
    assert!(matches!(result, Err(SnapshotError::UnsupportedVersion(_))));
}

#[test]
fn bak_rotation_shifts_existing_backups() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("snapshot.bin");

    // No backups yet: first rotation target is .bak
    let first = rotate_bak_path(&path);
    assert_eq!(first, dir.path().join("snapshot.bak"));

    std::fs::write(&first, b"one").unwrap();
    let second = rotate_bak_path(&path);
    assert_eq!(second, dir.path().join("snapshot.bak"));
    // The earlier backup moved up a slot
    assert_eq!(std::fs::read(dir.path().join("snapshot.bak.2")).unwrap(), b"one");
}

#[test]
fn bak_rotation_caps_backup_count() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("snapshot.bin");

    for n in 0..5u8 {
        let target = rotate_bak_path(&path);
        std::fs::write(&target, [n]).unwrap();
    }

    let baks: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().contains("bak"))
        .collect();
    assert_eq!(baks.len(), 3);
}
