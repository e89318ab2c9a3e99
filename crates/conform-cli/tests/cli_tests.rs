//! End-to-end tests for the `conform` binary
//!
//! Tests cover:
//! - `conform run` exit codes, filters, JSON output and the status dump
//! - `conform plan` ordering
//! - `conform list`
//! - configuration errors surfacing before anything runs

use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

// ============================================================================
// Test Helpers
// ============================================================================

/// A `conform` command isolated from the caller's environment
fn conform(dir: &TempDir) -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("conform");
    cmd.current_dir(dir.path())
        .env("NO_COLOR", "1")
        .env_remove("CONFORM_JSON")
        .env_remove("CONFORM_AREAS")
        .env_remove("CONFORM_FILTER")
        .env_remove("CONFORM_STATUS_FILE")
        .env_remove("CONFORM_LOG");
    cmd
}

fn project(config: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("conform.toml"), config).unwrap();
    dir
}

fn run_json(dir: &TempDir, args: &[&str]) -> serde_json::Value {
    let output = conform(dir)
        .arg("run")
        .arg("--json")
        .args(args)
        .output()
        .unwrap();
    serde_json::from_slice(&output.stdout).unwrap()
}

// ============================================================================
// conform run
// ============================================================================

#[test]
fn test_run_everything_passes() {
    let dir = TempDir::new().unwrap();

    conform(&dir)
        .arg("run")
        .assert()
        .success()
        .stdout(predicate::str::contains("PASSED"))
        .stdout(predicate::str::contains("0 failed, 0 errors"));
}

#[test]
fn test_run_verbose_lists_each_test() {
    let dir = TempDir::new().unwrap();

    conform(&dir)
        .args(["run", "--verbose", "whoami"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "PASS  session / login: valid credentials issue a token",
        ))
        .stdout(predicate::str::contains(
            "PASS  session / identity: whoami reports the logged-in user",
        ));
}

#[test]
fn test_run_failure_exits_nonzero() {
    let dir = project(
        r#"
[run]
areas = ["session"]

[areas.session.settings]
password = "guess"
"#,
    );

    conform(&dir)
        .args(["run", "-v"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("FAIL  session / login"))
        .stdout(predicate::str::contains("ERROR session / identity"))
        .stdout(predicate::str::contains("expected status 200, got 401"));
}

#[test]
fn test_run_skipped_check() {
    let dir = project("[areas.store.settings]\nrequire-auth = false\n");

    conform(&dir)
        .args(["run", "-v", "anonymous"])
        .assert()
        .success()
        .stdout(predicate::str::contains("SKIP  store / access"));
}

#[test]
fn test_run_filter_pulls_in_dependencies() {
    let dir = TempDir::new().unwrap();
    let report = run_json(&dir, &["deleted"]);

    let assertions: Vec<_> = report["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["assertion"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(
        assertions,
        vec![
            "anonymous writes are refused",
            "writer logs in",
            "stored value can be read back",
            "deleted value is gone",
        ]
    );
    assert_eq!(report["passed"], 4);
}

#[test]
fn test_run_json_reports_harness_errors() {
    let dir = project("[areas.store.settings]\npassword = \"guess\"\n");
    let report = run_json(&dir, &["--area", "store"]);

    assert_eq!(report["tests"], 5);
    assert_eq!(report["failed"], 4);
    let statuses: Vec<_> = report["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["status"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(statuses, vec!["passed", "failed", "error", "error", "error"]);
}

#[test]
fn test_run_writes_configured_status_file() {
    let dir = project("[run]\nstatus-file = \"reports/status.json\"\n");

    conform(&dir)
        .args(["run", "logout"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Status written to"));

    let written: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(dir.path().join("reports/status.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(written["tests"], 3);
    assert_eq!(written["failed"], 0);
}

#[test]
fn test_run_env_overrides_config() {
    let dir = project("[run]\nfilters = [\"logout\"]\n");

    let output = conform(&dir)
        .args(["run", "--json"])
        .env("CONFORM_FILTER", "whoami")
        .output()
        .unwrap();
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["tests"], 2);
}

#[test]
fn test_run_nothing_selected() {
    let dir = TempDir::new().unwrap();

    conform(&dir)
        .args(["run", "no such assertion"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No tests selected."));
}

// ============================================================================
// Configuration errors
// ============================================================================

#[test]
fn test_unknown_area_is_fatal() {
    let dir = project("[areas.smtp]\nenabled = true\n");

    conform(&dir)
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown protocol area 'smtp'"));
}

#[test]
fn test_unknown_field_is_fatal() {
    let dir = project("[run]\nparallel = true\n");

    conform(&dir)
        .arg("plan")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid TOML syntax"));
}

#[test]
fn test_explicit_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ci.toml");
    fs::write(&path, "[run]\nareas = [\"session\"]\n").unwrap();

    let output = conform(&dir)
        .args(["run", "--json", "--config"])
        .arg(&path)
        .output()
        .unwrap();
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["tests"], 4);
}

// ============================================================================
// conform plan / list / completions
// ============================================================================

#[test]
fn test_plan_marks_dependencies() {
    let dir = TempDir::new().unwrap();

    conform(&dir)
        .args(["plan", "logout"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Execution plan: 3 tests (1 requested)"))
        .stdout(predicate::str::contains(
            "1. session / login: valid credentials issue a token (dependency)",
        ))
        .stdout(predicate::str::contains(
            "3. session / logout: logout revokes the token\n",
        ));
}

#[test]
fn test_plan_json_follows_configuration() {
    let dir = project("[areas.store.settings]\nrequire-auth = false\n");

    let output = conform(&dir)
        .args(["plan", "--json", "read back"])
        .output()
        .unwrap();
    let plan: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();

    let assertions: Vec<_> = plan["tests"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["assertion"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(
        assertions,
        vec!["writer logs in", "stored value can be read back"]
    );
    assert_eq!(plan["tests"][1]["requested"], true);
}

#[test]
fn test_list_shows_areas() {
    let dir = TempDir::new().unwrap();

    conform(&dir)
        .args(["ls", "--verbose"])
        .assert()
        .success()
        .stdout(predicate::str::contains("session"))
        .stdout(predicate::str::contains("store"))
        .stdout(predicate::str::contains("provides: writer-token"));
}

#[test]
fn test_completions_bash() {
    let dir = TempDir::new().unwrap();

    conform(&dir)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("conform"));
}
