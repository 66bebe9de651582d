// src/step/mod.rs

//! The step model.
//!
//! A task is an ordered list of [`Step`]s. The set of step kinds is closed;
//! the engine dispatches on it with a `match` (see `engine::steps`).
//!
//! - [`builder`] holds the host-facing [`TaskBuilder`].
//! - [`duration`] parses Sleep durations (`"1h30m"`, `"250ms"`, ...).
//! - [`prompt`] is the seam used to answer Prompt steps.

pub mod builder;
pub mod duration;
pub mod prompt;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::errors::StepError;
use crate::types::{Payload, TaskName};

pub use builder::TaskBuilder;
pub use duration::parse_duration;
pub use prompt::{Prompter, StdinPrompter};

/// Handler attached to the step it guards.
///
/// `Ok(())` recovers and lets the task continue; `Err` aborts the task with
/// that error.
pub type CatchFn = Arc<dyn Fn(CaughtError) -> Result<(), StepError> + Send + Sync>;

/// Side-effecting callback over the previous step's payload.
pub type ResultFn = Arc<dyn Fn(&Payload) + Send + Sync>;

/// What a Catch handler receives: the failure plus whatever payload the
/// failing step produced alongside it.
#[derive(Debug, Clone)]
pub struct CaughtError {
    pub error: StepError,
    pub payload: Payload,
}

impl fmt::Display for CaughtError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error, self.payload)
    }
}

impl std::error::Error for CaughtError {}

/// A single unit of work.
#[derive(Clone)]
pub enum Step {
    /// Glob patterns to watch. Does nothing when run.
    Watch(Vec<String>),
    /// Spawn a process (argv).
    Exec(Vec<String>),
    /// Run another task to completion.
    Run(TaskName),
    /// Run several tasks concurrently.
    Parallel(Vec<TaskName>),
    /// Recover from the failure of the preceding step.
    Catch(CatchFn),
    /// Observe the previous payload.
    Result(ResultFn),
    /// Append `KEY=VALUE` entries to the environment of later Exec steps.
    Env(Vec<String>),
    Chdir(PathBuf),
    Exists(PathBuf),
    /// Duration string, e.g. `"2s"`.
    Sleep(String),
    /// Print args, or the previous payload when empty.
    Print(Vec<String>),
    /// Ask a yes/no question; empty message asks about the previous payload.
    Prompt(String),
    Yes,
    No,
    End,
}

impl Step {
    /// Short, stable name of the step kind (used in logs).
    pub fn kind(&self) -> &'static str {
        match self {
            Step::Watch(_) => "watch",
            Step::Exec(_) => "exec",
            Step::Run(_) => "run",
            Step::Parallel(_) => "parallel",
            Step::Catch(_) => "catch",
            Step::Result(_) => "result",
            Step::Env(_) => "env",
            Step::Chdir(_) => "chdir",
            Step::Exists(_) => "exists",
            Step::Sleep(_) => "sleep",
            Step::Print(_) => "print",
            Step::Prompt(_) => "prompt",
            Step::Yes => "yes",
            Step::No => "no",
            Step::End => "end",
        }
    }

    /// Names of tasks this step invokes (Run / Parallel), in order.
    pub fn invoked_tasks(&self) -> &[TaskName] {
        match self {
            Step::Run(name) => std::slice::from_ref(name),
            Step::Parallel(names) => names,
            _ => &[],
        }
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Watch(p) => f.debug_tuple("Watch").field(p).finish(),
            Step::Exec(a) => f.debug_tuple("Exec").field(a).finish(),
            Step::Run(n) => f.debug_tuple("Run").field(n).finish(),
            Step::Parallel(n) => f.debug_tuple("Parallel").field(n).finish(),
            Step::Catch(_) => f.write_str("Catch(..)"),
            Step::Result(_) => f.write_str("Result(..)"),
            Step::Env(e) => f.debug_tuple("Env").field(e).finish(),
            Step::Chdir(p) => f.debug_tuple("Chdir").field(p).finish(),
            Step::Exists(p) => f.debug_tuple("Exists").field(p).finish(),
            Step::Sleep(d) => f.debug_tuple("Sleep").field(d).finish(),
            Step::Print(a) => f.debug_tuple("Print").field(a).finish(),
            Step::Prompt(m) => f.debug_tuple("Prompt").field(m).finish(),
            Step::Yes => f.write_str("Yes"),
            Step::No => f.write_str("No"),
            Step::End => f.write_str("End"),
        }
    }
}
