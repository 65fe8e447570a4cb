#![allow(clippy::result_large_err)] // Stage execution returns AppError to carry stage name and exit code.

use crate::core::error::AppError;
use crate::core::materializer::CommandArgs;
use crate::core::schema::{StageSpec, WorkflowSchema};
use crate::core::types::ErrorCategory;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

const STDERR_TAIL_LINES: usize = 20;

/// One fully resolved stage subprocess.
#[derive(Clone, Debug)]
pub struct StageInvocation {
    pub stage: String,
    pub program: String,
    pub script: PathBuf,
    pub args: Vec<String>,
    pub cwd: PathBuf,
}

#[derive(Clone, Debug)]
pub struct StageOutput {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout_lines: usize,
    pub stderr_tail: Vec<String>,
}

#[async_trait]
pub trait StageRunner: Send + Sync + 'static {
    async fn run(&self, invocation: &StageInvocation) -> Result<StageOutput, AppError>;
}

/// Spawns stages with tokio and streams their output into the job log.
pub struct TokioStageRunner;

#[async_trait]
impl StageRunner for TokioStageRunner {
    async fn run(&self, invocation: &StageInvocation) -> Result<StageOutput, AppError> {
        let mut child = Command::new(&invocation.program)
            .arg(&invocation.script)
            .args(&invocation.args)
            .current_dir(&invocation.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| {
                AppError::with_source(
                    ErrorCategory::StageExecutionError,
                    format!(
                        "failed to launch stage {} with {}",
                        invocation.stage, invocation.program
                    ),
                    Box::new(err),
                )
                .with_code("STAGE-001")
                .with_context("stage", invocation.stage.clone())
            })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let stage = invocation.stage.as_str();
        let ((stdout_lines, _), (_, stderr_tail)) = tokio::join!(
            forward_lines(stdout, stage, false),
            forward_lines(stderr, stage, true)
        );

        let status = child.wait().await.map_err(|err| {
            AppError::new(
                ErrorCategory::StageExecutionError,
                format!("failed to wait for stage {}: {}", stage, err),
            )
            .with_code("STAGE-002")
            .with_context("stage", stage)
        })?;

        Ok(StageOutput {
            exit_code: status.code(),
            stdout_lines,
            stderr_tail: stderr_tail.into_iter().collect(),
        })
    }
}

/// Log every line of a child stream. Returns the line count and, for stderr, the last lines.
async fn forward_lines<R>(
    stream: Option<R>,
    stage: &str,
    is_stderr: bool,
) -> (usize, VecDeque<String>)
where
    R: AsyncRead + Unpin,
{
    let mut count = 0usize;
    let mut tail = VecDeque::new();
    let Some(stream) = stream else {
        return (count, tail);
    };
    let mut lines = BufReader::new(stream).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                count += 1;
                if is_stderr {
                    tracing::warn!(stage, "{}", line.trim_end());
                    if tail.len() == STDERR_TAIL_LINES {
                        tail.pop_front();
                    }
                    tail.push_back(line);
                } else {
                    tracing::info!(stage, "{}", line.trim_end());
                }
            }
            Ok(None) => break,
            Err(err) => {
                tracing::warn!(stage, "stopped reading stage output: {}", err);
                break;
            }
        }
    }
    (count, tail)
}

#[derive(Clone, Debug)]
pub struct StageReport {
    pub name: String,
    pub duration: Duration,
}

#[derive(Clone, Debug, Default)]
pub struct PipelineOutcome {
    pub completed: Vec<StageReport>,
}

/// Runs the stages of a workflow one after another, stopping at the first failure.
pub struct PipelineExecutor {
    root: PathBuf,
    interpreter: String,
    runner: Arc<dyn StageRunner>,
}

impl PipelineExecutor {
    pub fn new<T: Into<String>>(root: PathBuf, interpreter: T) -> Self {
        Self::with_runner(root, interpreter, Arc::new(TokioStageRunner))
    }

    pub fn with_runner<T: Into<String>>(
        root: PathBuf,
        interpreter: T,
        runner: Arc<dyn StageRunner>,
    ) -> Self {
        Self {
            root,
            interpreter: interpreter.into(),
            runner,
        }
    }

    pub fn invocation(&self, stage: &StageSpec, args: &CommandArgs) -> StageInvocation {
        StageInvocation {
            stage: stage.name.clone(),
            program: self.interpreter.clone(),
            script: self.root.join(&stage.script),
            args: args.to_argv(),
            cwd: self.root.clone(),
        }
    }

    pub async fn run(
        &self,
        schema: &WorkflowSchema,
        args: &CommandArgs,
    ) -> Result<PipelineOutcome, AppError> {
        let mut outcome = PipelineOutcome::default();
        for stage in schema.stages.values() {
            let invocation = self.invocation(stage, args);
            tracing::info!(stage = %stage.name, script = %invocation.script.display(), "stage starting");
            let start = Instant::now();
            let output = self.runner.run(&invocation).await?;
            let duration = start.elapsed();

            if output.exit_code != Some(0) {
                let status = match output.exit_code {
                    Some(code) => format!("exit code {}", code),
                    None => "termination by signal".to_string(),
                };
                tracing::error!(stage = %stage.name, "stage failed with {}", status);
                let mut err = AppError::new(
                    ErrorCategory::StageExecutionError,
                    format!("stage {} failed with {}", stage.name, status),
                )
                .with_code("STAGE-003")
                .with_context("stage", stage.name.clone());
                if !output.stderr_tail.is_empty() {
                    err.add_context("stderr", &output.stderr_tail.join("\n"));
                }
                return Err(err);
            }

            tracing::info!(
                stage = %stage.name,
                lines = output.stdout_lines,
                "stage completed in {}",
                humantime::format_duration(round_millis(duration))
            );
            outcome.completed.push(StageReport {
                name: stage.name.clone(),
                duration,
            });
        }
        Ok(outcome)
    }
}

/// Drops sub-millisecond precision for display; whole seconds are kept as they are.
fn round_millis(duration: Duration) -> Duration {
    Duration::new(duration.as_secs(), duration.subsec_millis() * 1_000_000)
}
