//! Integration tests for the `weaver-cli` binary entry point.
//!
//! Verifies the capabilities probe behaviour and user-facing error handling
//! for malformed invocations, without requiring a running daemon.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::str::contains;

#[test]
fn capabilities_probe_succeeds() {
    let mut command = cargo_bin_cmd!("weaver-cli");
    command.arg("--capabilities");
    command.assert().success();
}

#[test]
fn references_without_required_arguments_is_a_usage_error() {
    let mut command = cargo_bin_cmd!("weaver-cli");
    command.arg("references");
    command
        .assert()
        .failure()
        .stderr(contains("--path"));
}

#[test]
fn unknown_subcommand_is_a_usage_error() {
    let mut command = cargo_bin_cmd!("weaver-cli");
    command.arg("observe");
    command.assert().failure();
}
