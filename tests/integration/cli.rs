//! Smoke tests for the `nimbus` binary surface: help, version, and
//! argument validation. Network-touching commands are covered by the
//! registry tests against a stub fetcher instead.

use assert_cmd::Command;
use predicates::prelude::*;

fn nimbus() -> Command {
    Command::cargo_bin("nimbus").unwrap()
}

#[test]
fn help_lists_every_subcommand() {
    nimbus()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("branches"))
        .stdout(predicate::str::contains("upgrade"));
}

#[test]
fn version_flag_reports_the_crate_version() {
    nimbus()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn unknown_subcommand_is_rejected() {
    nimbus()
        .arg("frobnicate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

#[test]
fn missing_subcommand_prints_usage() {
    nimbus()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn verbose_and_quiet_conflict() {
    nimbus()
        .args(["--verbose", "--quiet", "status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn upgrade_help_documents_check_and_yes() {
    nimbus()
        .args(["upgrade", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--check"))
        .stdout(predicate::str::contains("--yes"));
}
