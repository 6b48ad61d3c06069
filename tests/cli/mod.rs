use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn benchtrack(dir: &Path) -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("benchtrack");
    cmd.current_dir(dir).env("NO_COLOR", "1");
    cmd
}

fn track(dir: &Path, args: &[&str]) -> assert_cmd::assert::Assert {
    benchtrack(dir)
        .args(["track", "--state-dir", "state"])
        .args(args)
        .assert()
}

fn json_stdout(assert: assert_cmd::assert::Assert) -> Value {
    let out = assert.get_output().stdout.clone();
    serde_json::from_slice(&out).expect("json output")
}

#[test]
fn track_flow_then_status_json() {
    let dir = tempdir().expect("tempdir");
    let root = dir.path();

    track(
        root,
        &[
            "start-run",
            "--run-id",
            "r1",
            "--model",
            "modelX",
            "--language",
            "python",
            "--total",
            "2",
            "--set",
            "threads=4",
        ],
    )
    .success()
    .stdout(predicate::str::contains("started run r1 (2 exercises)"));

    track(root, &["start", "a", "--language", "python"]).success();
    track(
        root,
        &[
            "complete",
            "a",
            "passed",
            "--language",
            "python",
            "--metric",
            "total_tokens=100",
            "--metric",
            "cost=0.01",
        ],
    )
    .success()
    .stdout(predicate::str::contains("python/a passed"));
    track(root, &["start", "b", "--language", "python"]).success();
    track(
        root,
        &["complete", "b", "failed", "--language", "python", "--error", "timeout"],
    )
    .success();

    let status = json_stdout(
        benchtrack(root)
            .args(["status", "--state-dir", "state", "--json"])
            .assert()
            .success(),
    );
    assert_eq!(status["active"], false);
    assert!(status["progress"].is_null());

    let runs = json_stdout(
        benchtrack(root)
            .args(["runs", "--state-dir", "state", "--json"])
            .assert()
            .success(),
    );
    assert!(runs["current"].is_null());
    let run = &runs["history"][0];
    assert_eq!(run["run_id"], "r1");
    assert_eq!(run["state"], "completed");
    assert_eq!(run["completed_exercises"], 2);
    assert_eq!(run["config"]["threads"], 4);
    assert_eq!(run["exercises"]["python/a"]["metrics"]["total_tokens"], 100);
    assert_eq!(run["exercises"]["python/b"]["error_message"], "timeout");
}

#[test]
fn status_json_reports_active_run() {
    let dir = tempdir().expect("tempdir");
    let root = dir.path();

    track(
        root,
        &[
            "start-run", "--run-id", "r2", "--model", "m", "--language", "go", "--language",
            "rust", "--total", "4",
        ],
    )
    .success();
    track(root, &["start", "leap", "--language", "go"]).success();
    track(root, &["complete", "leap", "passed", "--language", "go"]).success();

    let status = json_stdout(
        benchtrack(root)
            .args(["status", "--state-dir", "state", "--json"])
            .assert()
            .success(),
    );
    assert_eq!(status["active"], true);
    assert_eq!(status["progress"]["state"], "running");
    assert_eq!(status["progress"]["progress"]["percentage"], 25.0);
    assert_eq!(status["statistics"]["overall"]["success_rate"], 100.0);
    assert_eq!(status["statistics"]["by_language"]["go"]["passed"], 1);

    benchtrack(root)
        .args(["status", "--state-dir", "state"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Run ID: r2"))
        .stdout(predicate::str::contains("1/4 (25%)"));
}

#[test]
fn completing_unknown_exercise_fails_with_runtime_code() {
    let dir = tempdir().expect("tempdir");
    let root = dir.path();

    track(
        root,
        &["start-run", "--run-id", "r", "--model", "m", "--language", "go", "--total", "1"],
    )
    .success();

    track(root, &["complete", "ghost", "passed", "--language", "go"])
        .failure()
        .code(1)
        .stderr(predicate::str::contains("go/ghost not found"));
}

#[test]
fn tracking_without_run_fails() {
    let dir = tempdir().expect("tempdir");
    track(dir.path(), &["state", "paused"])
        .failure()
        .code(1)
        .stderr(predicate::str::contains("no active benchmark run"));
}

#[test]
fn invalid_run_id_is_usage_error() {
    let dir = tempdir().expect("tempdir");
    track(
        dir.path(),
        &["start-run", "--run-id", "../x", "--model", "m", "--language", "go", "--total", "1"],
    )
    .failure()
    .code(2);
}

#[test]
fn bad_metric_pair_is_usage_error() {
    let dir = tempdir().expect("tempdir");
    let root = dir.path();
    track(
        root,
        &["start-run", "--run-id", "r", "--model", "m", "--language", "go", "--total", "1"],
    )
    .success();
    track(root, &["start", "a", "--language", "go"]).success();

    track(
        root,
        &["complete", "a", "passed", "--language", "go", "--metric", "novalue"],
    )
    .failure()
    .code(2)
    .stderr(predicate::str::contains("--metric expects KEY=VALUE"));
}

#[test]
fn set_status_marks_skipped_exercise() {
    let dir = tempdir().expect("tempdir");
    let root = dir.path();
    track(
        root,
        &["start-run", "--run-id", "r", "--model", "m", "--language", "go", "--total", "3"],
    )
    .success();
    track(root, &["set-status", "bob", "skipped", "--language", "go"])
        .success()
        .stdout(predicate::str::contains("go/bob skipped"));

    let runs = json_stdout(
        benchtrack(root)
            .args(["runs", "--state-dir", "state", "--json"])
            .assert()
            .success(),
    );
    assert_eq!(runs["current"]["exercises"]["go/bob"]["status"], "skipped");
    assert_eq!(runs["current"]["completed_exercises"], 0);
}

#[test]
fn report_writes_json_document() {
    let dir = tempdir().expect("tempdir");
    let root = dir.path();
    track(
        root,
        &["start-run", "--run-id", "rep", "--model", "m", "--language", "go", "--total", "2"],
    )
    .success();

    benchtrack(root)
        .args(["report", "--state-dir", "state"])
        .assert()
        .success()
        .stdout(predicate::str::contains("report written to"));

    let text = fs::read_to_string(root.join("state").join("report_rep.json")).expect("report");
    let report: Value = serde_json::from_str(&text).expect("report json");
    assert_eq!(report["run"]["run_id"], "rep");
    assert_eq!(report["progress"]["progress"]["total"], 2);

    benchtrack(root)
        .args(["report", "--state-dir", "state", "--output", "out.json"])
        .assert()
        .success();
    assert!(root.join("out.json").exists());
}

#[test]
fn report_without_run_fails() {
    let dir = tempdir().expect("tempdir");
    benchtrack(dir.path())
        .args(["report", "--state-dir", "state"])
        .assert()
        .failure()
        .code(1);
}

#[test]
fn runs_lists_nothing_in_fresh_dir() {
    let dir = tempdir().expect("tempdir");
    benchtrack(dir.path())
        .args(["runs", "--state-dir", "state"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No benchmark runs recorded yet."));
}

#[test]
fn monitor_needs_dir_without_auto_detect() {
    let dir = tempdir().expect("tempdir");
    benchtrack(dir.path())
        .args(["monitor", "--no-auto-detect"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("state directory is required"));
}

#[test]
fn monitor_rejects_bad_interval() {
    let dir = tempdir().expect("tempdir");
    benchtrack(dir.path())
        .args(["monitor", "state", "--interval", "0"])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn init_then_validate() {
    let dir = tempdir().expect("tempdir");
    let root = dir.path();

    benchtrack(root)
        .args(["init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("created"));
    assert!(root.join("benchtrack.yml").exists());

    benchtrack(root)
        .args(["init"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("already exists"));

    let parsed = json_stdout(
        benchtrack(root)
            .args(["validate", "--json"])
            .assert()
            .success(),
    );
    assert_eq!(parsed["valid"], true);
    assert_eq!(parsed["config"], "./benchtrack.yml");
    assert!(parsed.get("issues").is_none());
}

#[test]
fn validate_json_reports_invalid_config_and_fails() {
    let dir = tempdir().expect("tempdir");
    fs::write(
        dir.path().join("benchtrack.yml"),
        "version: 1\nstate_subdir: a/b\n",
    )
    .expect("write config");

    let parsed = json_stdout(
        benchtrack(dir.path())
            .args(["validate", "--json"])
            .assert()
            .failure()
            .code(2),
    );
    assert_eq!(parsed["valid"], false);
    assert_eq!(parsed["issues"][0]["field"], "state_subdir");
    assert!(parsed["error"].as_str().is_some());
}

#[test]
fn config_state_dir_is_used_by_default() {
    let dir = tempdir().expect("tempdir");
    let root = dir.path();
    fs::write(
        root.join("benchtrack.yml"),
        "version: 1\nstate_dir: custom/state\n",
    )
    .expect("write config");

    benchtrack(root)
        .args([
            "track", "start-run", "--run-id", "c", "--model", "m", "--language", "go",
            "--total", "1",
        ])
        .assert()
        .success();
    assert!(root.join("custom").join("state").join("c.json").exists());
}

#[test]
fn missing_explicit_config_is_usage_error() {
    let dir = tempdir().expect("tempdir");
    benchtrack(dir.path())
        .args(["--config", "nope.yml", "status"])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn version_prints_package_version() {
    let dir = tempdir().expect("tempdir");
    benchtrack(dir.path())
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn completion_generates_script() {
    let dir = tempdir().expect("tempdir");
    benchtrack(dir.path())
        .args(["completion", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("benchtrack"));
}
