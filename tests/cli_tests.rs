// End-to-end tests for the slowtest binary
//
// Each test writes a small build history (and optionally a config file) to a
// temp dir and runs the binary from inside it, so no stray slowtest.toml is
// picked up.

use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const HISTORY: &str = r#"{
    "builds": [
        { "id": 10, "pipeline": "app", "status": "success",
          "tests": [
            { "run_id": 100, "name": "api.test_login", "duration_ms": 1000 },
            { "run_id": 101, "name": "api.test_logout", "duration_ms": 1500 },
            { "run_id": 102, "name": "ui.test_render", "duration_ms": 1000 }
          ] },
        { "id": 11, "pipeline": "app", "status": "failure",
          "tests": [
            { "run_id": 110, "name": "api.test_login", "duration_ms": 1100 }
          ] },
        { "id": 12, "pipeline": "app", "status": "running",
          "tests": [
            { "run_id": 120, "name": "api.test_login", "duration_ms": 2500 },
            { "run_id": 121, "name": "api.test_logout", "duration_ms": 1600 },
            { "run_id": 122, "name": "ui.test_render", "duration_ms": 3000 },
            { "run_id": 123, "name": "api.test_flaky", "duration_ms": 9000, "status": "failed" }
          ] },
        { "id": 20, "pipeline": "fresh", "status": "running",
          "tests": [ { "run_id": 200, "name": "api.test_login", "duration_ms": 9000 } ] }
    ]
}"#;

fn setup() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("history.json"), HISTORY).unwrap();
    dir
}

fn slowtest(dir: &Path) -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("slowtest");
    cmd.current_dir(dir).arg("--history").arg("history.json");
    cmd
}

#[test]
fn test_slow_tests_fail_the_run() {
    let dir = setup();
    slowtest(dir.path())
        .arg("--build")
        .arg("12")
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains(
            "SLOW TESTS DETECTED in build 12 (2 problem(s), 3 report(s))",
        ))
        .stdout(predicate::str::contains("api.test_login (+150%"))
        .stdout(predicate::str::contains("api.test_login (+127%"))
        .stdout(predicate::str::contains("ui.test_render (+200%"))
        .stdout(predicate::str::contains("api.test_logout").not())
        .stdout(predicate::str::contains("api.test_flaky").not());
}

#[test]
fn test_no_fail_flag() {
    let dir = setup();
    slowtest(dir.path())
        .args(["--build", "12", "--no-fail"])
        .assert()
        .success()
        .stdout(predicate::str::contains("SLOW TESTS DETECTED"));
}

#[test]
fn test_pattern_override() {
    let dir = setup();
    slowtest(dir.path())
        .args(["--build", "12", "--pattern", "ui\\..*", "--no-fail"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ui.test_render"))
        .stdout(predicate::str::contains("api.test_login").not());
}

#[test]
fn test_high_threshold_finds_nothing() {
    let dir = setup();
    slowtest(dir.path())
        .args(["--build", "12", "--threshold", "500"])
        .assert()
        .success()
        .stdout(predicate::str::contains("NO SLOW TESTS in build 12"));
}

#[test]
fn test_malformed_threshold_disables_detection() {
    let dir = setup();
    slowtest(dir.path())
        .args(["--build", "12", "--threshold", "fast"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Policy: inert"));
}

#[test]
fn test_first_build_of_pipeline_has_nothing_to_compare() {
    let dir = setup();
    slowtest(dir.path())
        .args(["--build", "20"])
        .assert()
        .success()
        .stdout(predicate::str::contains("NO SLOW TESTS in build 20"));
}

#[test]
fn test_json_output() {
    let dir = setup();
    let output = slowtest(dir.path())
        .args(["--build", "12", "--format", "json", "--no-fail"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["build_id"], 12);
    assert_eq!(json["problems"], 2);
    let regressions = json["regressions"].as_array().unwrap();
    assert_eq!(regressions.len(), 3);
    assert_eq!(regressions[0]["test_name"], "api.test_login");
    assert_eq!(regressions[0]["reference_build_id"], 10);
    assert_eq!(regressions[0]["current_run_id"], 120);
}

fn login_reference_builds(extra: &[&str]) -> Vec<u64> {
    let dir = setup();
    let output = slowtest(dir.path())
        .args([
            "--build",
            "12",
            "--format",
            "json",
            "--pattern",
            "api\\.test_login",
            "--no-fail",
        ])
        .args(extra)
        .output()
        .unwrap();

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["problems"], 1);
    json["regressions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["reference_build_id"].as_u64().unwrap())
        .collect()
}

#[test]
fn test_reports_each_earlier_build_by_default() {
    assert_eq!(login_reference_builds(&[]), vec![10, 11]);
}

#[test]
fn test_first_match_stops_at_reference_build() {
    assert_eq!(login_reference_builds(&["--first-match"]), vec![10]);
}

#[test]
fn test_config_file_is_discovered() {
    let dir = setup();
    fs::write(
        dir.path().join("slowtest.toml"),
        "[feature]\ntestNamesPatterns = \"ui\\\\..*\"\nthreshold = 80\n",
    )
    .unwrap();

    slowtest(dir.path())
        .args(["--build", "12", "--no-fail"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "SLOW TESTS DETECTED in build 12 (1 problem(s), 1 report(s))",
        ))
        .stdout(predicate::str::contains("ui.test_render"));
}

#[test]
fn test_explicit_config_file() {
    let dir = setup();
    fs::write(
        dir.path().join("strict.toml"),
        "[feature]\nminDuration = 5000\n",
    )
    .unwrap();

    slowtest(dir.path())
        .args(["--build", "12", "--config", "strict.toml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("NO SLOW TESTS"));
}

#[test]
fn test_invalid_config_file_is_an_error() {
    let dir = setup();
    fs::write(dir.path().join("bad.toml"), "[feature\n").unwrap();

    slowtest(dir.path())
        .args(["--build", "12", "--config", "bad.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse config file"));
}

#[test]
fn test_unknown_build_is_an_error() {
    let dir = setup();
    slowtest(dir.path())
        .args(["--build", "99"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Build 99 not found"));
}

#[test]
fn test_missing_history_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    slowtest(dir.path())
        .args(["--build", "12"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read history file"));
}
