use serial_test::serial;
use stagehand::core::config::{ConfigLoader, ConfigValidator, CONFIG_FILE_NAME};
use std::env;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn clear_stagehand_env() {
    for v in &[
        "STAGEHAND_ROOT",
        "STAGEHAND_WORKFLOW_DIR",
        "STAGEHAND_DEFAULT_WORKFLOW",
        "STAGEHAND_INTERPRETER",
        "STAGEHAND_API_URL",
        "STAGEHAND_API_USER",
        "STAGEHAND_API_PASSWORD",
        "STAGEHAND_CONFIG_VERSION",
        "STAGEHAND_API_TIMEOUT",
        "STAGEHAND_ARTIFACT_ROOT",
        "AWS_DATASET_BUCKET",
        "AWS_REGION",
        "STAGEHAND_S3_ENDPOINT",
    ] {
        env::remove_var(v);
    }
}

/// Test integration of config loading with environment variables
#[test]
#[serial]
fn test_config_loading_integration() {
    clear_stagehand_env();
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();

    let config_content = r#"
[workspace]
workflow_dir = "workflows"
default_workflow = "clustering.yml"

[executor]
interpreter = "python3"

[control_plane]
api_url = "https://jobs.example.com"
user = "runner@example.com"
config_version = "v2"
timeout_seconds = 10

[artifacts]
store_root = "/mnt/bucket"
payload_manifest = "out/payload.json"
"#;
    fs::write(root.join(CONFIG_FILE_NAME), config_content).unwrap();
    env::set_var("STAGEHAND_API_PASSWORD", "from-env");

    let config = ConfigLoader::load(None, Some(root)).unwrap();
    clear_stagehand_env();

    assert_eq!(config.workspace.root, root);
    assert_eq!(config.workspace.workflow_dir, PathBuf::from("workflows"));
    assert_eq!(config.workspace.default_workflow, "clustering.yml");
    assert_eq!(config.executor.interpreter, "python3");
    assert_eq!(
        config.control_plane.api_url.as_deref(),
        Some("https://jobs.example.com")
    );
    assert_eq!(config.control_plane.password.as_deref(), Some("from-env"));
    assert_eq!(config.control_plane.config_version.as_deref(), Some("v2"));
    assert_eq!(config.control_plane.timeout_seconds, 10);
    assert_eq!(config.artifacts.store_root, Some(PathBuf::from("/mnt/bucket")));
    assert_eq!(
        config.artifacts.payload_manifest,
        PathBuf::from("out/payload.json")
    );
    assert_eq!(
        config.artifacts.upload_manifest,
        PathBuf::from("results_for_upload.json")
    );

    ConfigValidator::validate(&config).unwrap();
}

#[test]
#[serial]
fn test_root_from_environment() {
    clear_stagehand_env();
    let temp_dir = TempDir::new().unwrap();
    fs::write(
        temp_dir.path().join(CONFIG_FILE_NAME),
        "[executor]\ninterpreter = \"Rscript\"\n",
    )
    .unwrap();
    env::set_var("STAGEHAND_ROOT", temp_dir.path());

    let config = ConfigLoader::load(None, None).unwrap();
    clear_stagehand_env();

    assert_eq!(config.workspace.root, temp_dir.path());
    assert_eq!(config.executor.interpreter, "Rscript");
}

#[test]
#[serial]
fn test_invalid_api_url_fails_validation() {
    clear_stagehand_env();
    let temp_dir = TempDir::new().unwrap();
    env::set_var("STAGEHAND_API_URL", "ftp://jobs.example.com");

    let config = ConfigLoader::load(None, Some(temp_dir.path())).unwrap();
    clear_stagehand_env();

    let err = ConfigValidator::validate(&config).unwrap_err();
    assert_eq!(err.code, "CFG-003");
}
