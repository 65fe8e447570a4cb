use crate::cli::Command;

/// Execution contexts that influence how logging is routed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionContext {
    /// Container job run; the console is the job's primary output.
    Job,
    /// Offline commands run by a developer against a workspace.
    Local,
}

impl ExecutionContext {
    /// Directory, relative to the workspace root, that holds the log file by default.
    pub fn default_log_subdir(self) -> Option<&'static str> {
        match self {
            ExecutionContext::Job => None,
            ExecutionContext::Local => Some(".stagehand/logs"),
        }
    }
}

/// Derive the active execution context from a parsed CLI command.
pub fn detect_context(command: &Command) -> ExecutionContext {
    match command {
        Command::Run(_) => ExecutionContext::Job,
        Command::Check(_) => ExecutionContext::Local,
    }
}
