use crate::logging::layers::console::ConsoleOutput;
use crate::Result;
use anyhow::{anyhow, Context};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing_subscriber::filter::Directive;

const DEFAULT_LEVEL: &str = "info";
const CONSOLE_OUTPUT_ENV: &str = "STAGEHAND_CONSOLE_OUTPUT";

/// Logging settings for one invocation.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub log_dir: Option<PathBuf>,
    pub default_level: String,
    pub enable_file: bool,
    pub console_output: Option<ConsoleOutput>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: None,
            default_level: DEFAULT_LEVEL.to_string(),
            enable_file: true,
            console_output: None,
        }
    }
}

impl LoggingConfig {
    /// Defaults, then `<root>/.stagehand/logging.toml`, then `STAGEHAND_CONSOLE_OUTPUT`.
    pub fn load(workspace_root: &Path) -> Result<Self> {
        let mut config = LoggingConfig::default();
        if let Some(section) = read_section(&Self::config_path(workspace_root))? {
            config.merge(section);
        }

        match env::var(CONSOLE_OUTPUT_ENV) {
            Ok(value) if !value.trim().is_empty() => {
                config.console_output = Some(value.parse().map_err(|err: String| anyhow!(err))?);
            }
            _ => {}
        }

        Directive::from_str(&config.default_level).map_err(|_| {
            anyhow!(
                "logging.default_level '{}' is not a tracing directive",
                config.default_level
            )
        })?;
        Ok(config)
    }

    pub fn config_path(workspace_root: &Path) -> PathBuf {
        workspace_root.join(".stagehand").join("logging.toml")
    }

    fn merge(&mut self, section: LoggingSection) {
        self.log_dir = section.log_dir.or(self.log_dir.take());
        if let Some(level) = section.default_level {
            self.default_level = level;
        }
        self.enable_file = section.enable_file.unwrap_or(self.enable_file);
        self.console_output = section.console_output.or(self.console_output);
    }
}

/// `[logging]` table of the workspace logging file; absent keys keep their defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LoggingSection {
    log_dir: Option<PathBuf>,
    default_level: Option<String>,
    enable_file: Option<bool>,
    console_output: Option<ConsoleOutput>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LoggingFile {
    logging: Option<LoggingSection>,
}

fn read_section(path: &Path) -> Result<Option<LoggingSection>> {
    if !path.is_file() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read logging config {}", path.display()))?;
    let file: LoggingFile = toml::from_str(&raw)
        .with_context(|| format!("failed to parse logging config {}", path.display()))?;
    Ok(file.logging)
}
