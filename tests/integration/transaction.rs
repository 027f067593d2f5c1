//! Filesystem behavior of the self-update swap: a successful dry run
//! against a live directory with user data, and rollback correctness
//! after a failure.

use std::fs;
use std::path::Path;

use nimbus_launcher::upgrade::{UndoLog, swap_from_staging};
use tempfile::TempDir;

fn write(path: &Path, content: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

/// Build a live installation with an old binary, an old library, and a
/// user-data subtree that must survive untouched.
fn live_install(root: &Path) {
    write(&root.join("app.bin"), b"old-binary");
    write(&root.join("lib.so"), b"old-library");
    write(&root.join("profiles/default/profile.toml"), b"user-profile");
    write(&root.join("profiles/alt/profile.toml"), b"alt-profile");
}

#[test]
fn successful_swap_replaces_payload_and_preserves_user_data() {
    let tmp = TempDir::new().unwrap();
    let live = tmp.path().join("install");
    let staging = tmp.path().join("staging");
    live_install(&live);
    write(&staging.join("app.bin"), b"new-binary");
    write(&staging.join("lib.so"), b"new-library");

    let undo = swap_from_staging(&staging, &live).unwrap();
    undo.commit();

    assert_eq!(fs::read(live.join("app.bin")).unwrap(), b"new-binary");
    assert_eq!(fs::read(live.join("lib.so")).unwrap(), b"new-library");
    // User data is byte-for-byte unchanged.
    assert_eq!(fs::read(live.join("profiles/default/profile.toml")).unwrap(), b"user-profile");
    assert_eq!(fs::read(live.join("profiles/alt/profile.toml")).unwrap(), b"alt-profile");
    // No displaced artifacts remain after commit.
    let leftovers: Vec<_> = fs::read_dir(&live)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".old"))
        .collect();
    assert!(leftovers.is_empty(), "stale artifacts: {leftovers:?}");
}

#[test]
fn staged_user_data_names_are_never_installed() {
    let tmp = TempDir::new().unwrap();
    let live = tmp.path().join("install");
    let staging = tmp.path().join("staging");
    live_install(&live);
    write(&staging.join("app.bin"), b"new-binary");
    // A hostile or buggy archive carrying a user-data name must be ignored.
    write(&staging.join("profiles/default/profile.toml"), b"evil-overwrite");

    let undo = swap_from_staging(&staging, &live).unwrap();
    undo.commit();

    assert_eq!(fs::read(live.join("profiles/default/profile.toml")).unwrap(), b"user-profile");
}

#[test]
fn live_entries_without_staged_counterparts_are_untouched() {
    let tmp = TempDir::new().unwrap();
    let live = tmp.path().join("install");
    let staging = tmp.path().join("staging");
    live_install(&live);
    write(&live.join("unmanaged-note.txt"), b"left-alone");
    write(&staging.join("app.bin"), b"new-binary");

    let undo = swap_from_staging(&staging, &live).unwrap();
    undo.commit();

    assert_eq!(fs::read(live.join("unmanaged-note.txt")).unwrap(), b"left-alone");
    assert_eq!(fs::read(live.join("lib.so")).unwrap(), b"old-library");
}

#[test]
fn stale_backup_from_an_interrupted_run_is_cleared_first() {
    let tmp = TempDir::new().unwrap();
    let live = tmp.path().join("install");
    let staging = tmp.path().join("staging");
    live_install(&live);
    write(&live.join("app.bin.old"), b"interrupted-run-leftover");
    write(&staging.join("app.bin"), b"new-binary");

    let undo = swap_from_staging(&staging, &live).unwrap();
    undo.commit();

    assert_eq!(fs::read(live.join("app.bin")).unwrap(), b"new-binary");
    assert!(!live.join("app.bin.old").exists());
}

#[test]
fn rollback_after_failed_install_restores_the_original_state() {
    let tmp = TempDir::new().unwrap();
    let live = tmp.path().join("install");
    live_install(&live);

    // Reproduce the state after displacement renamed app.bin away and the
    // install step wrote one new file before failing.
    fs::rename(live.join("app.bin"), live.join("app.bin.old")).unwrap();
    write(&live.join("app.bin"), b"half-installed");
    write(&live.join("brand-new.dat"), b"partial");

    let mut undo = UndoLog::new();
    undo.record_displaced(live.join("app.bin"), live.join("app.bin.old"));
    undo.record_installed(live.join("app.bin"));
    undo.record_installed(live.join("brand-new.dat"));
    undo.rollback();

    assert_eq!(fs::read(live.join("app.bin")).unwrap(), b"old-binary");
    assert!(!live.join("brand-new.dat").exists());
    assert!(!live.join("app.bin.old").exists());
    assert_eq!(fs::read(live.join("lib.so")).unwrap(), b"old-library");
}

#[test]
fn swap_rolls_itself_back_when_staging_is_unreadable() {
    let tmp = TempDir::new().unwrap();
    let live = tmp.path().join("install");
    live_install(&live);

    let missing_staging = tmp.path().join("never-created");
    assert!(swap_from_staging(&missing_staging, &live).is_err());

    // Nothing was displaced or installed.
    assert_eq!(fs::read(live.join("app.bin")).unwrap(), b"old-binary");
    assert!(!live.join("app.bin.old").exists());
}

#[cfg(unix)]
#[test]
fn installed_executables_receive_the_executable_bit() {
    use std::os::unix::fs::PermissionsExt;

    let tmp = TempDir::new().unwrap();
    let live = tmp.path().join("install");
    let staging = tmp.path().join("staging");
    fs::create_dir_all(&live).unwrap();
    write(&staging.join("nimbus"), b"#!/bin/sh\n");
    write(&staging.join("lib/libnimbus_core.so"), b"library");
    write(&staging.join("README.md"), b"docs");

    let undo = swap_from_staging(&staging, &live).unwrap();
    undo.commit();

    let mode = |p: &Path| fs::metadata(p).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode(&live.join("nimbus")), 0o755);
    assert_eq!(mode(&live.join("lib/libnimbus_core.so")), 0o755);
    assert_ne!(mode(&live.join("README.md")), 0o755);
}
