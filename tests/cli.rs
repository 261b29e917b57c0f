use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

fn philipshue(home: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("philipshue").unwrap();
    cmd.env("HOME", home)
        .env("PHILIPSHUE_COLOR_DEPTH", "1")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help_lists_options() {
    let home = tempfile::tempdir().unwrap();
    philipshue(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--config"))
        .stdout(predicate::str::contains("--verbose"));
}

#[test]
fn test_version() {
    let home = tempfile::tempdir().unwrap();
    philipshue(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("philipshue "));
}

#[test]
fn test_unreachable_bridge_exits_with_connection_error() {
    let home = tempfile::tempdir().unwrap();
    let config = home.path().join("hue.ini");
    fs::write(
        &config,
        "[DEFAULT]\nbridge_location = 127.0.0.1:1\nbridge_username = abc123\n",
    )
    .unwrap();

    philipshue(home.path())
        .arg("--config")
        .arg(&config)
        .write_stdin("")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Connecting to 127.0.0.1:1..."))
        .stdout(predicate::str::contains("ConnectionError: "))
        .stdout(predicate::str::contains("Time taken").not());
}

#[test]
fn test_unknown_flag_is_rejected() {
    let home = tempfile::tempdir().unwrap();
    philipshue(home.path())
        .arg("--bogus")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--bogus"));
}
