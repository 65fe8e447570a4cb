pub mod args;
pub mod commands;

pub use args::{CheckArgs, RunArgs};
use clap::{Parser, Subcommand};
use std::process::ExitCode;

const HELP_TEMPLATE: &str = "\
{name} {version}\n\
{about-with-newline}\n\
USAGE:\n    {usage}\n\
\nOPTIONS:\n{options}\n\
JOB COMMANDS:\n{subcommands}\n";

#[derive(Parser)]
#[command(name = "stagehand")]
#[command(version = crate::VERSION)]
#[command(about = "Workflow job runner: validates job requests and drives stage scripts")]
#[command(help_template = HELP_TEMPLATE)]
#[command(
    after_long_help = "Typical flow: check a request offline against its workflow, then let the container run the job by id."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    #[command(
        about = "Run a job end to end",
        long_about = "Run fetches the job request from the control plane, normalizes and validates it against the workflow schema, runs every stage in order, uploads the results and reports the final status.",
        after_help = "Example:\n    stagehand run 6f1c2a --root /app",
        after_long_help = run_long_help()
    )]
    Run(RunArgs),
    #[command(
        about = "Validate a job request offline",
        long_about = "Check loads the workflow schema, normalizes the request from a local JSON file and prints every violation found. Exits non-zero when the request is invalid.",
        after_help = "Example:\n    stagehand check --request job.json --root ./app --print-args"
    )]
    Check(CheckArgs),
}

fn run_long_help() -> String {
    let mut help = String::from("Example:\n    stagehand run 6f1c2a --root /app\n\nEnvironment:\n");
    for line in crate::core::ConfigLoader::env_var_documentation() {
        help.push_str("    ");
        help.push_str(line);
        help.push('\n');
    }
    help
}

pub async fn run(args: Args) -> crate::Result<ExitCode> {
    let context = crate::logging::detect_context(&args.command);
    match args.command {
        Command::Run(run_args) => commands::run(run_args, context).await,
        Command::Check(check_args) => commands::check(check_args, context).await,
    }
}
