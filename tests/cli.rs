//! CLI tests for the `minirpc` binary

use assert_cmd::Command;
use predicates::prelude::*;

fn minirpc() -> Command {
    let mut cmd = Command::cargo_bin("minirpc").unwrap();
    cmd.env_remove("MINIRPC_CONFIG").env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help_lists_commands() {
    minirpc()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_config_show_uses_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("minirpc.toml");
    std::fs::write(&path, "[control]\nlisten-port = 12345\nallow-cors = true\n").unwrap();

    minirpc()
        .current_dir(dir.path())
        .args(["--config", path.to_str().unwrap(), "config"])
        .assert()
        .success()
        .stdout(predicate::str::contains("listen-port = 12345"))
        .stdout(predicate::str::contains("allow-cors = true"));
}

#[test]
fn test_config_init_writes_local_file() {
    let dir = tempfile::tempdir().unwrap();

    minirpc()
        .current_dir(dir.path())
        .args(["config", "--init"])
        .assert()
        .success();

    let written = dir.path().join(".minirpc").join("config.toml");
    let content = std::fs::read_to_string(&written).unwrap();
    assert!(content.contains("[control]"));
    assert!(content.contains("listen-port = 10081"));

    minirpc()
        .current_dir(dir.path())
        .args(["config", "--init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));
}

#[test]
fn test_invalid_config_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    std::fs::write(&path, "[control]\nworkers = 0\n").unwrap();

    minirpc()
        .current_dir(dir.path())
        .args(["--config", path.to_str().unwrap(), "config"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid config"));
}

#[test]
fn test_disabled_control_exits_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("off.toml");
    std::fs::write(&path, "[control]\nenabled = false\n").unwrap();

    minirpc()
        .current_dir(dir.path())
        .args(["--config", path.to_str().unwrap(), "serve"])
        .assert()
        .success()
        .stderr(predicate::str::contains("disabled"));
}
