// src/runner.rs

//! Host entry point: list the registered tasks, or run one and report.
//!
//! A host program declares its tasks and hands the registry over:
//!
//! ```no_run
//! use std::process::ExitCode;
//! use taskchain::{Registry, TaskBuilder};
//!
//! #[tokio::main]
//! async fn main() -> ExitCode {
//!     let mut registry = Registry::new();
//!     registry.register(TaskBuilder::new("hello").exec(["echo", "hello"]).build());
//!     taskchain::go(registry).await
//! }
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::cli::{self, CliArgs};
use crate::config::load_or_default;
use crate::engine::{Engine, StepResult};
use crate::logging;
use crate::registry::Registry;
use crate::watch::path_utils::display_relative;

/// Parse the process arguments, initialise logging and run.
///
/// Returns a failing exit code when the task fails or the setup is invalid.
pub async fn go(registry: Registry) -> ExitCode {
    let args = cli::parse();
    if let Err(err) = logging::init_logging(args.log_level) {
        eprintln!("taskchain: {err:#}");
    }

    match run(registry, args).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("taskchain error: {err:?}");
            ExitCode::FAILURE
        }
    }
}

/// Run with already-parsed arguments (logging is left to the caller).
pub async fn run(registry: Registry, args: CliArgs) -> Result<ExitCode> {
    registry.validate().context("validating task definitions")?;
    let config = load_or_default(&args.config)
        .with_context(|| format!("loading config {:?}", args.config))?;

    let name = match (&args.task, args.list) {
        (Some(name), false) => name.clone(),
        _ => {
            print_task_list(&registry);
            return Ok(ExitCode::SUCCESS);
        }
    };

    let engine = Engine::new(Arc::new(registry), config);
    let started = Instant::now();
    println!("Running task {name}");

    if args.once {
        let result = engine.run_task(&name).await;
        print_result(&result);
        print_finished(&result, started.elapsed());
        return Ok(exit_code(&result));
    }

    let mut execution = engine.execute(&name);
    print_watched(execution.watched_files());

    let mut interrupted = false;
    loop {
        tokio::select! {
            report = execution.next_run() => {
                let Some(result) = report else { break };
                print_result(&result);
            }
            signal = tokio::signal::ctrl_c(), if !interrupted => {
                interrupted = true;
                if let Err(err) = signal {
                    warn!(error = %err, "failed to listen for Ctrl+C");
                    continue;
                }
                info!(task = %name, "interrupted; stopping after the current run");
                execution.stop();
            }
        }
    }

    let result = match execution.wait().await {
        Ok(result) => result,
        Err(err) => {
            println!("Task {name} stopped: {err}");
            println!("Failed after {}", format_elapsed(started.elapsed()));
            return Ok(ExitCode::FAILURE);
        }
    };
    print_finished(&result, started.elapsed());
    Ok(exit_code(&result))
}

fn print_task_list(registry: &Registry) {
    if registry.is_empty() {
        println!("No tasks registered.");
        return;
    }
    println!("Tasks:");
    for name in registry.names() {
        println!("  {name}");
    }
}

fn print_watched(files: &[PathBuf]) {
    if files.is_empty() {
        return;
    }
    let root = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    println!("Watching {} file(s):", files.len());
    for file in files {
        println!("  {}", display_relative(&root, file));
    }
}

fn print_result(result: &StepResult) {
    if !result.payload.is_none() {
        println!("Result: {}", result.payload);
    }
    if let Some(err) = &result.error {
        println!("Error: {err}");
    }
}

fn print_finished(result: &StepResult, elapsed: Duration) {
    let outcome = if result.is_err() { "Failed" } else { "Success" };
    println!("{outcome} after {}", format_elapsed(elapsed));
}

fn format_elapsed(elapsed: Duration) -> String {
    format!("{:.3}s", elapsed.as_secs_f64())
}

fn exit_code(result: &StepResult) -> ExitCode {
    if result.is_err() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
