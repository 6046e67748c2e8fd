//! Smoke tests for the `trellis` binary.

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn help_lists_subcommands() {
    Command::cargo_bin("trellis")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("build"))
        .stdout(predicate::str::contains("dev"));
}

#[test]
fn unknown_subcommand_fails() {
    Command::cargo_bin("trellis")
        .unwrap()
        .arg("frobnicate")
        .assert()
        .failure();
}

#[test]
fn build_without_config_or_entries_reports_missing_entry() {
    let temp = tempfile::tempdir().unwrap();

    Command::cargo_bin("trellis")
        .unwrap()
        .current_dir(temp.path())
        .args(["build", "--entry", "src/missing.js"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Entry point not found"));
}
