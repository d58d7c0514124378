use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn artifacts(root: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("artifacts").unwrap();
    cmd.arg("--root").arg(root.path()).env("RUST_LOG", "off");
    cmd
}

#[test]
fn test_write_then_read() {
    let root = TempDir::new().unwrap();

    artifacts(&root)
        .args(["write", "docs/plan.md", "--actor", "agent", "--reason", "draft"])
        .write_stdin("# Plan\n")
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""status":"committed""#))
        .stdout(predicate::str::contains(r#""action":"CREATE""#));

    artifacts(&root)
        .args(["read", "docs/plan.md"])
        .assert()
        .success()
        .stdout("# Plan\n");
}

#[test]
fn test_history_and_restore() {
    let root = TempDir::new().unwrap();
    for content in ["one", "two"] {
        artifacts(&root)
            .args(["write", "a.md"])
            .write_stdin(content)
            .assert()
            .success();
    }

    let output = artifacts(&root)
        .args(["history", "a.md", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let version = json["backups"][0]["version"].as_str().unwrap().to_string();

    artifacts(&root)
        .args(["restore", "a.md", &version])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""action":"UPDATE""#));

    artifacts(&root)
        .args(["read", "a.md"])
        .assert()
        .success()
        .stdout("one");
}

#[test]
fn test_log_json() {
    let root = TempDir::new().unwrap();
    artifacts(&root)
        .args(["write", "a.md", "--tool-call-id", "call_5"])
        .write_stdin("x")
        .assert()
        .success();
    artifacts(&root)
        .args(["write", "b.md"])
        .write_stdin("y")
        .assert()
        .success();

    artifacts(&root)
        .args(["log", "--artifact", "a.md", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""tool_call_id":"call_5""#))
        .stdout(predicate::str::contains("b.md").not());
}

#[test]
fn test_escape_fails() {
    let root = TempDir::new().unwrap();
    artifacts(&root)
        .args(["write", "../../etc/passwd"])
        .write_stdin("nope")
        .assert()
        .failure()
        .stderr(predicate::str::contains("escapes project root"));
}

#[test]
fn test_read_missing_fails() {
    let root = TempDir::new().unwrap();
    artifacts(&root)
        .args(["read", "missing.md"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read missing.md"));
}

#[test]
fn test_unknown_actor_rejected() {
    let root = TempDir::new().unwrap();
    artifacts(&root)
        .args(["write", "a.md", "--actor", "robot"])
        .write_stdin("x")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown actor"));
}

#[test]
fn test_restore_records_reason_and_tool_call() {
    let root = TempDir::new().unwrap();
    for content in ["one", "two"] {
        artifacts(&root)
            .args(["write", "a.md"])
            .write_stdin(content)
            .assert()
            .success();
    }
    let output = artifacts(&root)
        .args(["history", "a.md", "--json"])
        .output()
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let version = json["backups"][0]["version"].as_str().unwrap().to_string();

    artifacts(&root)
        .args(["restore", "a.md", &version, "--actor", "agent"])
        .args(["--reason", "roll back", "--tool-call-id", "call_7"])
        .assert()
        .success();

    artifacts(&root)
        .args(["log", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""reason":"roll back""#))
        .stdout(predicate::str::contains(r#""tool_call_id":"call_7""#));
}

#[test]
fn test_debounce_flag_not_accepted() {
    let root = TempDir::new().unwrap();
    artifacts(&root)
        .args(["--debounce-ms", "10", "read", "a.md"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--debounce-ms"));
}
