use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Runner configuration loaded from runner.toml
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RunnerConfig {
    /// Workspace layout
    #[serde(default)]
    pub workspace: WorkspaceConfig,

    /// Stage subprocess settings
    #[serde(default)]
    pub executor: ExecutorConfig,

    /// Remote job-state API
    #[serde(default)]
    pub control_plane: ControlPlaneConfig,

    /// Result upload settings
    #[serde(default)]
    pub artifacts: ArtifactsConfig,
}

/// Workspace configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Working root that stage scripts and relative paths resolve against
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Directory holding workflow documents, relative to the root
    #[serde(default = "default_workflow_dir")]
    pub workflow_dir: PathBuf,

    /// Workflow document used when the request does not name one
    #[serde(default = "default_workflow")]
    pub default_workflow: String,
}

/// Executor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Program used to launch stage scripts
    #[serde(default = "default_interpreter")]
    pub interpreter: String,
}

/// Control plane configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlPlaneConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Job config schema version requested from the API (e.g. "v2")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_version: Option<String>,

    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

/// Artifact configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactsConfig {
    /// Root of a local object-store mirror
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_root: Option<PathBuf>,

    /// S3 bucket receiving results; uploads are skipped when neither this nor `store_root` is set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// Alternative S3 endpoint (MinIO, localstack); switches to path-style addressing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    #[serde(default = "default_payload_manifest")]
    pub payload_manifest: PathBuf,

    #[serde(default = "default_upload_manifest")]
    pub upload_manifest: PathBuf,
}

fn default_root() -> PathBuf {
    PathBuf::from("/app")
}

fn default_workflow_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_workflow() -> String {
    "workflow.yml".to_string()
}

fn default_interpreter() -> String {
    "python".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_payload_manifest() -> PathBuf {
    PathBuf::from("results_for_payload.json")
}

fn default_upload_manifest() -> PathBuf {
    PathBuf::from("results_for_upload.json")
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        WorkspaceConfig {
            root: default_root(),
            workflow_dir: default_workflow_dir(),
            default_workflow: default_workflow(),
        }
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        ExecutorConfig {
            interpreter: default_interpreter(),
        }
    }
}

impl Default for ControlPlaneConfig {
    fn default() -> Self {
        ControlPlaneConfig {
            api_url: None,
            user: None,
            password: None,
            config_version: None,
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        ArtifactsConfig {
            store_root: None,
            bucket: None,
            region: None,
            endpoint: None,
            payload_manifest: default_payload_manifest(),
            upload_manifest: default_upload_manifest(),
        }
    }
}


pub mod loader;
pub mod validation;

pub use loader::{ConfigLoader, CONFIG_FILE_NAME};
pub use validation::ConfigValidator;
