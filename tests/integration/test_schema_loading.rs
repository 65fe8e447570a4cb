use serde_json::json;
use stagehand::core::config::WorkspaceConfig;
use stagehand::core::{ErrorCategory, ParameterType, WorkflowLocator, WorkflowSchema};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const WORKFLOW: &str = r#"
name: clustering
description: Cluster single-cell counts
stages:
  preprocess:
    file: stages/preprocess.py
  cluster:
    file: stages/cluster.py
  report:
    script: stages/report.py
parameters:
  threshold:
    type: float
    default: 0.5
    user_defined: True
    min_value: 0
    max_value: 1
    increment: 0.05
    title: Threshold
  mode:
    type: str
    default: fast
    user_defined: "True"
    options: [fast, slow]
  cell_type:
    type: str
    user_defined: true
    from_data: "True"
  n_pcs:
    type: int
    default: "30"
  out_dir:
    type: path
    default: /tmp/results/
input_settings:
  ignored: true
"#;

fn workspace_with(workflow: &str, scripts: &[&str]) -> TempDir {
    let root = TempDir::new().unwrap();
    for script in scripts {
        let path = root.path().join(script);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }
    fs::write(root.path().join("workflow.yml"), workflow).unwrap();
    root
}

fn locator(root: &Path, name: Option<&str>) -> WorkflowLocator {
    let workspace = WorkspaceConfig {
        root: root.to_path_buf(),
        workflow_dir: PathBuf::from("."),
        default_workflow: "workflow.yml".to_string(),
    };
    WorkflowLocator::from_config(&workspace, name)
}

#[test]
fn loads_stages_and_parameters_in_declaration_order() {
    let root = workspace_with(
        WORKFLOW,
        &["stages/preprocess.py", "stages/cluster.py", "stages/report.py"],
    );
    let schema = WorkflowSchema::load(&locator(root.path(), None)).unwrap();

    assert_eq!(schema.name.as_deref(), Some("clustering"));
    let stages: Vec<_> = schema.stages.keys().map(String::as_str).collect();
    assert_eq!(stages, vec!["preprocess", "cluster", "report"]);
    assert_eq!(
        schema.stages["report"].script,
        PathBuf::from("stages/report.py")
    );

    let params: Vec<_> = schema.parameters.keys().map(String::as_str).collect();
    assert_eq!(params, vec!["threshold", "mode", "cell_type", "n_pcs", "out_dir"]);

    let threshold = schema.parameter("threshold").unwrap();
    assert_eq!(threshold.param_type, ParameterType::Float);
    assert_eq!(threshold.default, Some(json!(0.5)));
    assert!(threshold.user_defined);
    assert_eq!(threshold.min_value, Some(0.0));
    assert_eq!(threshold.max_value, Some(1.0));
    assert_eq!(threshold.title.as_deref(), Some("Threshold"));

    let mode = schema.parameter("mode").unwrap();
    assert!(mode.user_defined);
    assert!(mode.is_enum_checked());

    let cell_type = schema.parameter("cell_type").unwrap();
    assert!(cell_type.from_data);
    assert!(!cell_type.is_enum_checked());

    assert_eq!(schema.parameter("n_pcs").unwrap().default, Some(json!(30)));
    assert_eq!(
        schema.parameter("out_dir").unwrap().param_type,
        ParameterType::Path
    );
}

#[test]
fn request_can_select_another_workflow() {
    let root = workspace_with(WORKFLOW, &["a.py"]);
    fs::write(
        root.path().join("alt.yml"),
        "stages:\n  only:\n    file: a.py\nparameters: {}\n",
    )
    .unwrap();
    let schema = WorkflowSchema::load(&locator(root.path(), Some("alt.yml"))).unwrap();
    assert_eq!(schema.stages.len(), 1);
    assert!(schema.parameters.is_empty());
}

#[test]
fn workflow_names_must_be_plain_file_names() {
    let root = workspace_with(WORKFLOW, &[]);
    let err = WorkflowSchema::load(&locator(root.path(), Some("../workflow.yml"))).unwrap_err();
    assert_eq!(err.category, ErrorCategory::SchemaError);
    assert_eq!(err.code, "SCHEMA-004");
}

#[test]
fn missing_document_is_a_schema_error() {
    let root = TempDir::new().unwrap();
    let err = WorkflowSchema::load(&locator(root.path(), None)).unwrap_err();
    assert_eq!(err.category, ErrorCategory::SchemaError);
    assert_eq!(err.code, "SCHEMA-001");
}

#[test]
fn all_document_problems_are_reported_together() {
    let document = r#"
stages:
  train:
    file: missing.py
parameters:
  epochs:
    type: int
    default: many
  rate:
    type: decimal
  label:
    type: str
    min_value: 1
  bounds:
    type: float
    min_value: 5
    max_value: 1
"#;
    let root = workspace_with(document, &[]);
    let err = WorkflowSchema::load(&locator(root.path(), None)).unwrap_err();
    assert_eq!(err.code, "SCHEMA-003");
    for fragment in [
        "missing script",
        "parameter 'epochs'",
        "parameter 'rate': unknown type 'decimal'",
        "parameter 'label': 'min_value' is only allowed on numeric parameters",
        "parameter 'bounds': min_value 5 exceeds max_value 1",
    ] {
        assert!(
            err.message.contains(fragment),
            "expected '{fragment}' in:\n{}",
            err.message
        );
    }
    assert!(err.context.contains_key("workflow"));
}

#[test]
fn malformed_yaml_is_a_schema_error() {
    let root = workspace_with("stages: [unclosed", &[]);
    let err = WorkflowSchema::load(&locator(root.path(), None)).unwrap_err();
    assert_eq!(err.code, "SCHEMA-002");
}
