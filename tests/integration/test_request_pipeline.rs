use serde_json::json;
use stagehand::core::{
    materialize, normalize, validate, ErrorCategory, JobRequest, ViolationKind, WorkflowSchema,
};
use std::path::Path;
use tempfile::TempDir;

fn schema(yaml: &str) -> WorkflowSchema {
    WorkflowSchema::from_yaml_str(yaml, Path::new("/")).unwrap()
}

fn parameters_only(parameters: &str) -> WorkflowSchema {
    // Stage scripts resolve against "/", so point at a file every unix host has.
    schema(&format!(
        "stages:\n  run:\n    file: bin/sh\nparameters:\n{}",
        parameters
    ))
}

#[test]
fn default_threshold_passes_validation() {
    let schema = parameters_only(
        "  threshold:\n    type: float\n    default: 0.5\n    user_defined: True\n    min_value: 0.0\n    max_value: 1.0\n",
    );
    let mut request = JobRequest::from_value(json!({})).unwrap();
    normalize(&mut request, &schema, "job-1").unwrap();

    assert_eq!(request.get("threshold"), Some(&json!(0.5)));
    assert!(validate(&request, &schema).is_empty());
}

#[test]
fn option_outside_list_is_reported() {
    let schema = parameters_only(
        "  mode:\n    type: str\n    user_defined: True\n    options: [fast, slow]\n    default: fast\n",
    );
    let mut request = JobRequest::from_value(json!({"mode": "turbo"})).unwrap();
    normalize(&mut request, &schema, "job-1").unwrap();

    let report = validate(&request, &schema);
    assert_eq!(report.len(), 1);
    assert!(report.has("mode", ViolationKind::NotInOptions));
}

#[test]
fn output_directory_default_is_created_once() {
    let scratch = TempDir::new().unwrap();
    let out_dir = format!("{}/job1/", scratch.path().display());
    let schema = parameters_only(&format!(
        "  out_dir:\n    type: path\n    default: \"{}\"\n",
        out_dir
    ));

    let mut request = JobRequest::from_value(json!({})).unwrap();
    normalize(&mut request, &schema, "job-1").unwrap();
    assert!(scratch.path().join("job1").is_dir());

    normalize(&mut request, &schema, "job-1").unwrap();
    assert!(validate(&request, &schema).is_empty());
}

#[test]
fn directory_failure_stops_normalization() {
    let scratch = TempDir::new().unwrap();
    let nested = format!("{}/missing/parent/", scratch.path().display());
    let schema = parameters_only("  out_dir:\n    type: path\n");
    let mut request = JobRequest::from_value(json!({ "out_dir": nested })).unwrap();
    let err = normalize(&mut request, &schema, "job-1").unwrap_err();
    assert_eq!(err.category, ErrorCategory::DirectoryCreationError);
}

#[test]
fn string_inputs_are_coerced_before_range_checks() {
    let schema = parameters_only(
        "  epochs:\n    type: int\n    user_defined: true\n    min_value: 1\n    max_value: 100\n  rate:\n    type: float\n    user_defined: true\n    max_value: 1\n",
    );
    let mut request = JobRequest::from_value(json!({"epochs": "250", "rate": " 0.1 "})).unwrap();
    normalize(&mut request, &schema, "job-1").unwrap();

    assert_eq!(request.get("epochs"), Some(&json!(250)));
    assert_eq!(request.get("rate"), Some(&json!(0.1)));
    let report = validate(&request, &schema);
    assert_eq!(report.len(), 1);
    assert!(report.has("epochs", ViolationKind::OutOfRange));
}

#[test]
fn every_violation_is_reported_in_one_pass() {
    let schema = parameters_only(
        "  threshold:\n    type: float\n    user_defined: true\n    min_value: 0\n    max_value: 1\n  mode:\n    type: str\n    user_defined: true\n    options: [fast, slow]\n  count:\n    type: int\n  seed:\n    type: int\n",
    );
    let mut request = JobRequest::from_value(json!({
        "threshold": 3,
        "mode": "turbo",
        "count": "lots"
    }))
    .unwrap();
    normalize(&mut request, &schema, "job-1").unwrap();

    let report = validate(&request, &schema);
    assert_eq!(report.len(), 4);
    assert!(report.has("threshold", ViolationKind::OutOfRange));
    assert!(report.has("mode", ViolationKind::NotInOptions));
    assert!(report.has("count", ViolationKind::TypeMismatch));
    assert!(report.has("seed", ViolationKind::TypeMismatch));

    let err = report.into_result().unwrap_err();
    assert_eq!(err.category, ErrorCategory::ValidationError);
    assert!(err.message.starts_with("invalid job request (4 violations)"));
}

#[test]
fn materialized_arguments_follow_schema_then_uploads() {
    let schema = parameters_only(
        "  threshold:\n    type: float\n    default: 1\n  mode:\n    type: str\n    default: fast\n  verbose:\n    type: bool\n    default: false\n  counts:\n    type: path\n",
    );
    let mut request = JobRequest::from_value(json!({
        "workflow_name": "workflow.yml",
        "verbose": "True",
        "input_files": {
            "counts": "/data/counts.csv",
            "metadata": "/data/meta.csv"
        }
    }))
    .unwrap();
    normalize(&mut request, &schema, "job-7").unwrap();
    assert!(validate(&request, &schema).is_empty());

    let args = materialize(&request, &schema);
    assert_eq!(
        args.to_argv(),
        vec![
            "--threshold",
            "1.0",
            "--mode",
            "fast",
            "--verbose",
            "True",
            "--counts",
            "/data/counts.csv",
            "--metadata",
            "/data/meta.csv",
        ]
    );
    assert_eq!(args.len(), 5);
    assert_eq!(materialize(&request, &schema), args);
    assert_eq!(request.job_id(), Some("job-7"));
}
