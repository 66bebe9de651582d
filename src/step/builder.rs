// src/step/builder.rs

//! Host-facing builder for tasks.
//!
//! ```no_run
//! use taskchain::{Registry, TaskBuilder};
//!
//! let mut registry = Registry::new();
//! registry.register(
//!     TaskBuilder::new("build")
//!         .watch(["src/**/*.rs"])
//!         .exec(["cargo", "build"])
//!         .catch(|_err| Ok(()))
//!         .run("test")
//!         .build(),
//! );
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use crate::engine::Task;
use crate::errors::StepError;
use crate::step::{CaughtError, Step};
use crate::types::{Payload, SignalName, TaskName};

/// Appends steps in declaration order and produces a [`Task`].
#[derive(Debug, Clone)]
pub struct TaskBuilder {
    name: TaskName,
    steps: Vec<Step>,
    signals: Vec<SignalName>,
}

impl TaskBuilder {
    pub fn new(name: impl Into<TaskName>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
            signals: Vec::new(),
        }
    }

    /// Append an already-constructed step.
    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Watch glob patterns (`*`, `?`, `[..]`, and `**` for recursive walks).
    pub fn watch<I, S>(self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let patterns = patterns.into_iter().map(Into::into).collect();
        self.step(Step::Watch(patterns))
    }

    /// Spawn a process. Arguments may be any `Display` type; they are turned
    /// into strings here, once.
    pub fn exec<I>(self, args: I) -> Self
    where
        I: IntoIterator,
        I::Item: ToString,
    {
        let argv = args.into_iter().map(|a| a.to_string()).collect();
        self.step(Step::Exec(argv))
    }

    pub fn run(self, task: impl Into<TaskName>) -> Self {
        self.step(Step::Run(task.into()))
    }

    pub fn parallel<I, S>(self, tasks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskName>,
    {
        let names = tasks.into_iter().map(Into::into).collect();
        self.step(Step::Parallel(names))
    }

    /// Guard the previously appended step.
    pub fn catch<F>(self, handler: F) -> Self
    where
        F: Fn(CaughtError) -> Result<(), StepError> + Send + Sync + 'static,
    {
        self.step(Step::Catch(Arc::new(handler)))
    }

    pub fn result<F>(self, callback: F) -> Self
    where
        F: Fn(&Payload) + Send + Sync + 'static,
    {
        self.step(Step::Result(Arc::new(callback)))
    }

    /// `KEY=VALUE` entries for subsequent Exec steps.
    pub fn env<I, S>(self, vars: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let vars = vars.into_iter().map(Into::into).collect();
        self.step(Step::Env(vars))
    }

    pub fn chdir(self, path: impl Into<PathBuf>) -> Self {
        self.step(Step::Chdir(path.into()))
    }

    pub fn exists(self, path: impl Into<PathBuf>) -> Self {
        self.step(Step::Exists(path.into()))
    }

    pub fn sleep(self, duration: impl Into<String>) -> Self {
        self.step(Step::Sleep(duration.into()))
    }

    pub fn print<I>(self, args: I) -> Self
    where
        I: IntoIterator,
        I::Item: ToString,
    {
        let args = args.into_iter().map(|a| a.to_string()).collect();
        self.step(Step::Print(args))
    }

    pub fn prompt(self, message: impl Into<String>) -> Self {
        self.step(Step::Prompt(message.into()))
    }

    pub fn yes(self) -> Self {
        self.step(Step::Yes)
    }

    pub fn no(self) -> Self {
        self.step(Step::No)
    }

    pub fn end(self) -> Self {
        self.step(Step::End)
    }

    /// Route these OS signals to the task's kill sweep while it executes.
    pub fn signals<I>(mut self, signals: I) -> Self
    where
        I: IntoIterator<Item = SignalName>,
    {
        self.signals.extend(signals);
        self
    }

    pub fn build(self) -> Task {
        Task::new(self.name, self.steps, self.signals)
    }
}
