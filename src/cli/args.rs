use clap::Args;
use std::path::PathBuf;

#[derive(Args, Clone, Debug)]
pub struct RunArgs {
    /// Job identifier assigned by the control plane
    #[arg(value_name = "JOB_ID")]
    pub job_id: String,

    /// Working root holding workflow documents and stage scripts (default: /app or STAGEHAND_ROOT)
    #[arg(long, value_name = "DIR", help_heading = "Configuration")]
    pub root: Option<PathBuf>,

    /// Path to custom config file (default: {root}/runner.toml)
    #[arg(long, value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<PathBuf>,
}

#[derive(Args, Clone, Debug)]
pub struct CheckArgs {
    /// JSON file holding the job request to check
    #[arg(long, value_name = "FILE")]
    pub request: PathBuf,

    /// Workflow document to check against (default: the request's workflow_name, then runner.toml)
    #[arg(long, value_name = "NAME")]
    pub workflow: Option<String>,

    /// Job id stamped into the normalized request
    #[arg(long, value_name = "ID", default_value = "local-check")]
    pub job_id: String,

    /// Working root holding workflow documents and stage scripts (default: /app or STAGEHAND_ROOT)
    #[arg(long, value_name = "DIR", help_heading = "Configuration")]
    pub root: Option<PathBuf>,

    /// Path to custom config file (default: {root}/runner.toml)
    #[arg(long, value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<PathBuf>,

    /// Print the command line each stage would receive
    #[arg(long, help_heading = "Output Options")]
    pub print_args: bool,
}
