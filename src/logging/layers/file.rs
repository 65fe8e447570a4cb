use crate::logging::config::LoggingConfig;
use crate::logging::context::ExecutionContext;
use crate::logging::layers::{plain_fmt_layer, PlainFmtLayer};
use crate::Result;
use anyhow::{anyhow, Context};
use std::fs::create_dir_all;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::Subscriber;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::registry::LookupSpan;

pub const LOG_FILE_NAME: &str = "job.log";

/// Location of the job log for this context.
///
/// An absolute `log_dir` is used as is; a relative one is resolved against the workspace and
/// may not leave it.
pub fn log_file_path(
    config: &LoggingConfig,
    context: ExecutionContext,
    workspace_root: &Path,
) -> Result<PathBuf> {
    let directory = match &config.log_dir {
        Some(custom) if custom.is_absolute() => custom.clone(),
        Some(custom) => {
            if custom
                .components()
                .any(|part| matches!(part, Component::ParentDir | Component::Prefix(_)))
            {
                return Err(anyhow!(
                    "logging.log_dir {} must stay inside workspace {}",
                    custom.display(),
                    workspace_root.display()
                ));
            }
            workspace_root.join(custom)
        }
        None => match context.default_log_subdir() {
            Some(subdir) => workspace_root.join(subdir),
            None => workspace_root.to_path_buf(),
        },
    };
    Ok(directory.join(LOG_FILE_NAME))
}

/// Append-mode sink for `log_file`. Each event reaches the file before the logging call returns,
/// so the log can be uploaded while the subscriber is still installed. A disabled sink discards
/// everything.
pub fn file_layer<S>(log_file: &Path, enabled: bool) -> Result<PlainFmtLayer<S>>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    if !enabled {
        return Ok(plain_fmt_layer(BoxMakeWriter::new(io::sink)));
    }

    let directory = log_file.parent().unwrap_or_else(|| Path::new("."));
    create_dir_all(directory)
        .with_context(|| format!("failed to create log directory {}", directory.display()))?;
    let file_name = log_file
        .file_name()
        .ok_or_else(|| anyhow!("job log path {} has no file name", log_file.display()))?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name.to_string_lossy())
        .build(directory)
        .with_context(|| format!("failed to open job log {}", log_file.display()))?;
    Ok(plain_fmt_layer(BoxMakeWriter::new(appender)))
}
