//! CLI integration tests for sqlock
//!
//! Tests the sqlock CLI commands end-to-end using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::process::Stdio;
use tempfile::TempDir;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    fn database(&self) -> PathBuf {
        self.dir.path().join("shared.db")
    }

    fn config_dir(&self) -> PathBuf {
        self.dir.path().join("config")
    }

    /// A command isolated from the user's config and environment
    #[allow(deprecated)]
    fn process(&self) -> std::process::Command {
        let mut cmd = std::process::Command::new(assert_cmd::cargo::cargo_bin("sqlock"));
        cmd.env("SQLOCK_CONFIG_DIR", self.config_dir());
        cmd.env_remove("SQLOCK_CONNECTION_STRING");
        cmd.env("RUST_LOG", "sqlock=info");
        cmd.current_dir(self.dir.path());
        cmd.arg("--database").arg(self.database());
        cmd
    }

    fn sqlock(&self) -> Command {
        Command::from_std(self.process())
    }
}

#[test]
fn test_init_creates_wal_database() {
    let ws = Workspace::new();

    ws.sqlock()
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Database initialized"))
        .stdout(predicate::str::contains("Schema: v2"))
        .stdout(predicate::str::contains("Journal mode: wal"));

    assert!(ws.database().exists(), "Database file should exist");
}

#[test]
fn test_locks_list_shows_seeded_rows() {
    let ws = Workspace::new();

    ws.sqlock()
        .args(["locks", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ContentTree"))
        .stdout(predicate::str::contains("-1000"))
        .stdout(predicate::str::contains("MainDom"));
}

#[test]
fn test_write_lock_toggles_row() {
    let ws = Workspace::new();

    ws.sqlock()
        .args(["lock", "write", "-333"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Acquired WriteLock on lock -333 (ContentTree)",
        ));

    ws.sqlock()
        .args(["--format", "json", "locks", "list"])
        .assert()
        .success()
        .stdout(predicate::str::is_match(r#""id": -333,\s*"value": -1"#).unwrap());
}

#[test]
fn test_read_lock_json_output() {
    let ws = Workspace::new();

    ws.sqlock()
        .args(["--format", "json", "lock", "read", "-340"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"lock_id\":-340"))
        .stdout(predicate::str::contains("\"lock_type\":\"ReadLock\""))
        .stdout(predicate::str::contains("\"name\":\"Languages\""));
}

#[test]
fn test_write_lock_on_unknown_id_fails() {
    let ws = Workspace::new();

    ws.sqlock()
        .args(["lock", "write", "424242"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E303"));
}

#[test]
fn test_contended_write_lock_times_out() {
    let ws = Workspace::new();
    ws.sqlock().arg("init").assert().success();

    let mut holder = ws
        .process()
        .args(["lock", "write", "-333", "--hold-ms", "3000"])
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();

    // Wait until the holder reports the lock
    let stderr = holder.stderr.take().unwrap();
    let mut lines = BufReader::new(stderr).lines().map_while(Result::ok);
    let acquired = lines.any(|line| line.contains("Acquired lock"));
    assert!(acquired, "holder never acquired the lock");

    ws.sqlock()
        .args(["lock", "write", "-333", "--timeout-ms", "100"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E302"));

    lines.for_each(drop);
    assert!(holder.wait().unwrap().success());

    // Released on commit; a retry now succeeds
    ws.sqlock()
        .args(["lock", "write", "-333", "--timeout-ms", "100"])
        .assert()
        .success();
}

#[test]
fn test_config_set_get_roundtrip() {
    let ws = Workspace::new();

    ws.sqlock()
        .args(["config", "set", "locking.write_lock_timeout_ms", "1500"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Set locking.write_lock_timeout_ms = 1500"));

    ws.sqlock()
        .args(["config", "get", "locking.write_lock_timeout_ms"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1500"));

    ws.sqlock()
        .args(["config", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("database.provider_name = Sqlite"));
}

#[test]
fn test_config_set_rejects_unknown_key() {
    let ws = Workspace::new();

    ws.sqlock()
        .args(["config", "set", "locking.nope", "1"])
        .assert()
        .failure();
}

#[test]
fn test_doctor_reports_healthy_database() {
    let ws = Workspace::new();

    ws.sqlock()
        .arg("doctor")
        .assert()
        .success()
        .stdout(predicate::str::contains("[OK] Database: Connected"))
        .stdout(predicate::str::contains("[OK] Journal mode: wal"))
        .stdout(predicate::str::contains("All checks passed!"));
}
