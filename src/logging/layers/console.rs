use crate::logging::context::ExecutionContext;
use crate::logging::layers::{plain_fmt_layer, PlainFmtLayer};
use serde::Deserialize;
use std::fmt;
use std::io;
use std::str::FromStr;
use tracing::Subscriber;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::registry::LookupSpan;

/// Stream that receives console logs.
#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleOutput {
    Stdout,
    #[default]
    Stderr,
    None,
}

impl ConsoleOutput {
    const ALL: [ConsoleOutput; 3] = [ConsoleOutput::Stdout, ConsoleOutput::Stderr, ConsoleOutput::None];

    pub fn as_str(self) -> &'static str {
        match self {
            ConsoleOutput::Stdout => "stdout",
            ConsoleOutput::Stderr => "stderr",
            ConsoleOutput::None => "none",
        }
    }

    fn writer(self) -> BoxMakeWriter {
        match self {
            ConsoleOutput::Stdout => BoxMakeWriter::new(io::stdout),
            ConsoleOutput::Stderr => BoxMakeWriter::new(io::stderr),
            ConsoleOutput::None => BoxMakeWriter::new(io::sink),
        }
    }
}

impl fmt::Display for ConsoleOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConsoleOutput {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = value.trim().to_ascii_lowercase();
        ConsoleOutput::ALL
            .into_iter()
            .find(|output| output.as_str() == wanted)
            .ok_or_else(|| {
                format!(
                    "invalid console output '{}'; expected stdout, stderr or none",
                    value
                )
            })
    }
}

/// Pick the console sink for a context unless the configuration names one.
///
/// Job runs log to stdout where the container runtime collects them; local commands keep
/// stdout for their report.
pub fn select_console_output(
    context: ExecutionContext,
    configured: Option<ConsoleOutput>,
) -> ConsoleOutput {
    configured.unwrap_or(match context {
        ExecutionContext::Job => ConsoleOutput::Stdout,
        ExecutionContext::Local => ConsoleOutput::Stderr,
    })
}

pub fn console_layer<S>(output: ConsoleOutput) -> PlainFmtLayer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    plain_fmt_layer(output.writer())
}
