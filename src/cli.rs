// src/cli.rs

//! CLI argument parsing for task hosts, using `clap`.

use std::ffi::OsString;

use clap::{Parser, ValueEnum};

/// Command-line arguments of a taskchain host program.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "taskchain",
    version,
    about = "Run tasks declared by this program, re-running them when watched files change.",
    long_about = None
)]
pub struct CliArgs {
    /// Task to run. Without it, the registered task names are listed.
    #[arg(value_name = "TASK")]
    pub task: Option<String>,

    /// Path to the engine config file (TOML).
    ///
    /// A missing file means default settings.
    #[arg(long, value_name = "PATH", default_value = "Taskchain.toml")]
    pub config: String,

    /// Run the task once, without watching.
    #[arg(long)]
    pub once: bool,

    /// List registered tasks and exit.
    #[arg(long)]
    pub list: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TASKCHAIN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

/// Parse from an explicit argument list (first item is the program name).
pub fn parse_from<I, T>(args: I) -> Result<CliArgs, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    CliArgs::try_parse_from(args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_arguments_lists_tasks() {
        let args = parse_from(["host"]).unwrap();
        assert!(args.task.is_none());
        assert_eq!(args.config, "Taskchain.toml");
        assert!(!args.once);
    }

    #[test]
    fn task_and_flags() {
        let args = parse_from(["host", "build", "--once", "--log-level", "debug", "--config", "ci.toml"])
            .unwrap();
        assert_eq!(args.task.as_deref(), Some("build"));
        assert!(args.once);
        assert_eq!(args.log_level, Some(LogLevel::Debug));
        assert_eq!(args.config, "ci.toml");
    }
}
