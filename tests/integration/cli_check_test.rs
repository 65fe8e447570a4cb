use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const WORKFLOW: &str = r#"
stages:
  train:
    file: train.py
parameters:
  threshold:
    type: float
    default: 0.5
    user_defined: True
    min_value: 0
    max_value: 1
  mode:
    type: str
    default: fast
    user_defined: True
    options: [fast, slow]
"#;

fn workspace() -> TempDir {
    let root = TempDir::new().unwrap();
    fs::write(root.path().join("workflow.yml"), WORKFLOW).unwrap();
    fs::write(root.path().join("train.py"), "").unwrap();
    root
}

fn write_request(root: &Path, body: &str) -> std::path::PathBuf {
    let path = root.join("request.json");
    fs::write(&path, body).unwrap();
    path
}

fn stagehand() -> Command {
    let mut cmd = Command::cargo_bin("stagehand").unwrap();
    for var in [
        "STAGEHAND_ROOT",
        "STAGEHAND_WORKFLOW_DIR",
        "STAGEHAND_DEFAULT_WORKFLOW",
        "STAGEHAND_INTERPRETER",
        "STAGEHAND_CONSOLE_OUTPUT",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn test_check_accepts_valid_request() {
    let root = workspace();
    let request = write_request(root.path(), r#"{"threshold": "0.75"}"#);

    stagehand()
        .arg("check")
        .arg("--request")
        .arg(&request)
        .arg("--root")
        .arg(root.path())
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "workflow.yml: request is valid (2 parameters, 1 stages)",
        ));
}

#[test]
fn test_check_reports_every_violation() {
    let root = workspace();
    let request = write_request(root.path(), r#"{"threshold": 2, "mode": "turbo"}"#);

    stagehand()
        .arg("check")
        .arg("--request")
        .arg(&request)
        .arg("--root")
        .arg(root.path())
        .assert()
        .failure()
        .stdout(predicate::str::contains("invalid job request (2 violations)"))
        .stdout(predicate::str::contains("threshold [out-of-range]"))
        .stdout(predicate::str::contains("mode [not-in-options]"));
}

#[test]
fn test_check_prints_stage_arguments() {
    let root = workspace();
    let request = write_request(root.path(), r#"{"mode": "slow"}"#);
    let expected = format!(
        "train: python {} --threshold 0.5 --mode slow",
        root.path().join("train.py").display()
    );

    stagehand()
        .arg("check")
        .arg("--request")
        .arg(&request)
        .arg("--root")
        .arg(root.path())
        .arg("--print-args")
        .assert()
        .success()
        .stdout(predicate::str::contains(expected));
}

#[test]
fn test_check_missing_request_file_fails() {
    let root = workspace();

    stagehand()
        .arg("check")
        .arg("--request")
        .arg(root.path().join("absent.json"))
        .arg("--root")
        .arg(root.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read request"));
}

#[test]
fn test_check_command_help() {
    stagehand()
        .arg("check")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Check loads the workflow schema"));
}

#[test]
fn test_run_requires_job_id() {
    stagehand()
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("JOB_ID"));
}

#[test]
fn test_run_help_lists_environment_overrides() {
    stagehand()
        .arg("run")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("STAGEHAND_API_URL"))
        .stdout(predicate::str::contains("STAGEHAND_ARTIFACT_ROOT"));
}
