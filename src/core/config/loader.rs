#![allow(clippy::result_large_err)]

use super::RunnerConfig;
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use std::env;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "runner.toml";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load config from the working root (root/runner.toml)
    /// The root defaults to `root` unless the file names one; environment variables override both
    pub fn load_from_root(root: &Path) -> Result<RunnerConfig, AppError> {
        let config_path = root.join(CONFIG_FILE_NAME);
        let mut config = match Self::read_file(&config_path)? {
            Some((config, true)) => config,
            Some((mut config, false)) => {
                config.workspace.root = root.to_path_buf();
                config
            }
            None => {
                let mut config = RunnerConfig::default();
                config.workspace.root = root.to_path_buf();
                config
            }
        };

        Self::apply_env_overrides(&mut config);

        Ok(config)
    }

    /// Load config from an explicit file, or from the working root when no file is given.
    /// Precedence: file, then environment, then an explicit `root` argument.
    pub fn load(path: Option<&Path>, root: Option<&Path>) -> Result<RunnerConfig, AppError> {
        let mut config = match path {
            Some(path) => {
                let mut config = Self::load_from_file(path)?.ok_or_else(|| {
                    AppError::new(
                        ErrorCategory::IoError,
                        format!("Config file {} does not exist", path.display()),
                    )
                    .with_code("CFG-001")
                })?;
                Self::apply_env_overrides(&mut config);
                config
            }
            None => {
                let search_root = root
                    .map(Path::to_path_buf)
                    .or_else(|| env::var("STAGEHAND_ROOT").ok().map(PathBuf::from))
                    .unwrap_or_else(|| RunnerConfig::default().workspace.root);
                Self::load_from_root(&search_root)?
            }
        };

        if let Some(root) = root {
            config.workspace.root = root.to_path_buf();
        }
        Ok(config)
    }

    /// Load config from specific file path
    /// Returns Ok(None) if file doesn't exist
    pub fn load_from_file(path: &Path) -> Result<Option<RunnerConfig>, AppError> {
        Ok(Self::read_file(path)?.map(|(config, _)| config))
    }

    /// Parse a config file, also reporting whether it sets `workspace.root` itself.
    fn read_file(path: &Path) -> Result<Option<(RunnerConfig, bool)>, AppError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::new(
                ErrorCategory::IoError,
                format!("Failed to read config file {}: {}", path.display(), e),
            )
        })?;

        let parse_error = |e: toml::de::Error| {
            AppError::new(
                ErrorCategory::ValidationError,
                format!("Failed to parse config file {}: {}", path.display(), e),
            )
            .with_code("CFG-002")
        };
        let table: toml::Table = toml::from_str(&content).map_err(parse_error)?;
        let declares_root = table
            .get("workspace")
            .and_then(|workspace| workspace.get("root"))
            .is_some();
        let config: RunnerConfig = toml::from_str(&content).map_err(parse_error)?;

        Ok(Some((config, declares_root)))
    }

    /// Apply environment variable overrides to the configuration
    /// Environment variables take precedence over config file values
    fn apply_env_overrides(config: &mut RunnerConfig) {
        if let Ok(root) = env::var("STAGEHAND_ROOT") {
            config.workspace.root = PathBuf::from(root);
        }

        if let Ok(workflow_dir) = env::var("STAGEHAND_WORKFLOW_DIR") {
            config.workspace.workflow_dir = PathBuf::from(workflow_dir);
        }

        if let Ok(default_workflow) = env::var("STAGEHAND_DEFAULT_WORKFLOW") {
            config.workspace.default_workflow = default_workflow;
        }

        if let Ok(interpreter) = env::var("STAGEHAND_INTERPRETER") {
            config.executor.interpreter = interpreter;
        }

        if let Ok(api_url) = env::var("STAGEHAND_API_URL") {
            config.control_plane.api_url = Some(api_url);
        }

        if let Ok(user) = env::var("STAGEHAND_API_USER") {
            config.control_plane.user = Some(user);
        }

        if let Ok(password) = env::var("STAGEHAND_API_PASSWORD") {
            config.control_plane.password = Some(password);
        }

        if let Ok(version) = env::var("STAGEHAND_CONFIG_VERSION") {
            config.control_plane.config_version = Some(version);
        }

        if let Ok(timeout_str) = env::var("STAGEHAND_API_TIMEOUT") {
            if let Ok(timeout) = timeout_str.parse::<u64>() {
                config.control_plane.timeout_seconds = timeout;
            }
        }

        if let Ok(store_root) = env::var("STAGEHAND_ARTIFACT_ROOT") {
            config.artifacts.store_root = Some(PathBuf::from(store_root));
        }

        if let Ok(bucket) = env::var("AWS_DATASET_BUCKET") {
            config.artifacts.bucket = Some(bucket);
        }

        if let Ok(region) = env::var("AWS_REGION") {
            config.artifacts.region = Some(region);
        }

        if let Ok(endpoint) = env::var("STAGEHAND_S3_ENDPOINT") {
            config.artifacts.endpoint = Some(endpoint);
        }
    }

    /// Get documentation for supported environment variables
    pub fn env_var_documentation() -> &'static [&'static str] {
        &[
            "STAGEHAND_ROOT - Override the working root (default: /app)",
            "STAGEHAND_WORKFLOW_DIR - Override the workflow directory, relative to the root",
            "STAGEHAND_DEFAULT_WORKFLOW - Override the default workflow document (default: workflow.yml)",
            "STAGEHAND_INTERPRETER - Override the stage interpreter (default: python)",
            "STAGEHAND_API_URL - Control plane base URL",
            "STAGEHAND_API_USER - Control plane login user",
            "STAGEHAND_API_PASSWORD - Control plane login password",
            "STAGEHAND_CONFIG_VERSION - Job config version requested from the control plane",
            "STAGEHAND_API_TIMEOUT - Control plane request timeout in seconds (default: 30)",
            "STAGEHAND_ARTIFACT_ROOT - Root of a local artifact store mirror",
            "AWS_DATASET_BUCKET - S3 bucket receiving job results",
            "AWS_REGION - Region of the S3 bucket",
            "STAGEHAND_S3_ENDPOINT - Alternative S3 endpoint URL",
            "AWS_ACCESS_KEY_ID / AWS_SECRET_ACCESS_KEY - S3 credentials (standard AWS provider chain)",
        ]
    }
}
