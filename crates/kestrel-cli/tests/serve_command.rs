use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;

#[allow(deprecated)]
fn get_kestrel_bin() -> PathBuf {
    assert_cmd::cargo::cargo_bin("kestrel")
}

#[test]
fn test_serve_command_help() {
    let mut cmd = Command::new(get_kestrel_bin());
    cmd.arg("serve").arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Run the HTTP analysis service"))
        .stdout(predicate::str::contains("--port"))
        .stdout(predicate::str::contains("--host"))
        .stdout(predicate::str::contains("--body-limit"))
        .stdout(predicate::str::contains("--lighthouse-path"))
        .stdout(predicate::str::contains("env: PORT"));
}

#[test]
fn test_serve_rejects_invalid_port() {
    let mut cmd = Command::new(get_kestrel_bin());
    cmd.arg("serve").arg("--port").arg("not-a-port");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn test_top_level_help_lists_commands() {
    let mut cmd = Command::new(get_kestrel_bin());
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("analyze"));
}
