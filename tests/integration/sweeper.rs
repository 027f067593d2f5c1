//! End-to-end sweep scenario: the wreckage of an interrupted swap is
//! cleared at the next startup without touching live files or user data.

use std::fs;

use nimbus_launcher::upgrade::sweep_stale_artifacts;
use tempfile::TempDir;

#[test]
fn interrupted_swap_wreckage_is_cleared_without_touching_live_files() {
    let tmp = TempDir::new().unwrap();
    let install = tmp.path();

    // State a crash mid-swap would leave behind: backups at the top
    // level, a backed-up library tree, and one nested artifact.
    fs::write(install.join("app.bin"), b"half-installed").unwrap();
    fs::write(install.join("app.bin.old"), b"previous").unwrap();
    fs::create_dir_all(install.join("lib.old")).unwrap();
    fs::write(install.join("lib.old/libnimbus_core.so"), b"previous").unwrap();
    fs::create_dir_all(install.join("lib")).unwrap();
    fs::write(install.join("lib/libnimbus_render.so.old"), b"previous").unwrap();
    fs::create_dir_all(install.join("profiles/default")).unwrap();
    fs::write(install.join("profiles/default/profile.toml"), b"user").unwrap();

    let removed = sweep_stale_artifacts(install);
    assert_eq!(removed, 3);

    assert!(!install.join("app.bin.old").exists());
    assert!(!install.join("lib.old").exists());
    assert!(!install.join("lib/libnimbus_render.so.old").exists());
    assert_eq!(fs::read(install.join("app.bin")).unwrap(), b"half-installed");
    assert_eq!(fs::read(install.join("profiles/default/profile.toml")).unwrap(), b"user");
}

#[test]
fn clean_install_sweeps_nothing() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("app.bin"), b"live").unwrap();
    fs::create_dir_all(tmp.path().join("profiles")).unwrap();

    assert_eq!(sweep_stale_artifacts(tmp.path()), 0);
    assert!(tmp.path().join("app.bin").exists());
}
