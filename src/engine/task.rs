// src/engine/task.rs

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Mutex;

use crate::engine::program::Program;
use crate::engine::{ExecutionContext, KillRegistry};
use crate::step::Step;
use crate::types::{SignalName, TaskName};

/// A named, compiled step sequence plus the context it runs in.
///
/// Runs of the same task are serialised on the context lock; the kill
/// registry is kept outside that lock so a watcher or signal can reach the
/// task's processes while a run holds it.
#[derive(Debug)]
pub struct Task {
    name: TaskName,
    program: Program,
    signals: Vec<SignalName>,
    context: Mutex<ExecutionContext>,
    kills: KillRegistry,
    running: AtomicBool,
}

impl Task {
    pub fn new(name: impl Into<TaskName>, steps: Vec<Step>, signals: Vec<SignalName>) -> Self {
        let name = name.into();
        let program = Program::compile(&name, steps);
        let kills = KillRegistry::new();
        Self {
            context: Mutex::new(ExecutionContext::new(".", kills.clone())),
            name,
            program,
            signals,
            kills,
            running: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of executable steps (Catch steps are folded into the step they
    /// guard).
    pub fn step_count(&self) -> usize {
        self.program.len()
    }

    pub fn watch_patterns(&self) -> &[String] {
        self.program.watch_patterns()
    }

    /// Tasks named by this task's Run and Parallel steps.
    pub fn invoked_tasks(&self) -> impl Iterator<Item = &str> {
        self.program.invoked_tasks().map(String::as_str)
    }

    pub fn signals(&self) -> &[SignalName] {
        &self.signals
    }

    pub fn kills(&self) -> &KillRegistry {
        &self.kills
    }

    /// Whether a run of this task is in progress.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub(crate) fn program(&self) -> &Program {
        &self.program
    }

    pub(crate) fn context(&self) -> &Mutex<ExecutionContext> {
        &self.context
    }

    pub(crate) fn mark_running(&self) -> RunningFlag<'_> {
        self.running.store(true, Ordering::SeqCst);
        RunningFlag { task: self }
    }
}

/// Clears the task's running flag when dropped.
pub(crate) struct RunningFlag<'a> {
    task: &'a Task,
}

impl Drop for RunningFlag<'_> {
    fn drop(&mut self) {
        self.task.running.store(false, Ordering::SeqCst);
    }
}
