pub mod config;
pub mod context;
pub mod layers;

pub use context::{detect_context, ExecutionContext};
pub use layers::console::ConsoleOutput;

use crate::logging::config::LoggingConfig;
use crate::logging::layers::{console, file, PlainFmtLayer};
use crate::Result;
use anyhow::{bail, Context};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::layer::Layered;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::Registry;

static INSTALLED: AtomicBool = AtomicBool::new(false);

/// What `init` installed for this command.
pub struct LoggingGuard {
    console_output: ConsoleOutput,
    job_log: Option<PathBuf>,
}

impl LoggingGuard {
    pub fn console_output(&self) -> ConsoleOutput {
        self.console_output
    }

    /// Path of `job.log`, or `None` when the file sink is disabled.
    pub fn log_file_path(&self) -> Option<&Path> {
        self.job_log.as_deref()
    }
}

/// Install the global subscriber: `RUST_LOG` (or the configured level), the `job.log` sink and
/// the console sink for `context`. A second call in the same process fails.
pub fn init(context: ExecutionContext, workspace_root: &Path) -> Result<LoggingGuard> {
    if INSTALLED.swap(true, Ordering::SeqCst) {
        bail!("logging already initialized");
    }

    let config = LoggingConfig::load(workspace_root)?;
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.default_level)
            .with_context(|| format!("invalid log level '{}'", config.default_level))?,
    };

    let job_log = file::log_file_path(&config, context, workspace_root)?;
    let file_layer = file::file_layer::<Registry>(&job_log, config.enable_file)?;
    let console_output = console::select_console_output(context, config.console_output);
    let console_layer =
        console::console_layer::<Layered<PlainFmtLayer<Registry>, Registry>>(console_output);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .with(filter)
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(LoggingGuard {
        console_output,
        job_log: config.enable_file.then_some(job_log),
    })
}
