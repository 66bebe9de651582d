// src/engine/core.rs

//! The sequential/branching state machine and the run-task entry point.
//!
//! One run of a task:
//! - takes the task's context lock (runs of the same task never overlap),
//! - starts from the configured base directory with no env additions,
//! - walks the compiled program node by node, feeding each step the previous
//!   step's result,
//! - hands a failure to the catch attached to the failing step, or stops,
//! - restores the working directory on every exit path.
//!
//! The terminal result is the result of the last executed step, or the first
//! unrecovered error.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::engine::context::RunScope;
use crate::engine::program::Branch;
use crate::engine::{ExecutionContext, StepResult, Task};
use crate::errors::StepError;
use crate::exec::{ProcessSpawner, TokioSpawner};
use crate::fs::{FileSystem, RealFileSystem};
use crate::registry::Registry;
use crate::step::{CaughtError, Prompter, StdinPrompter};
use crate::types::TaskName;
use crate::watch::{NotifyWatcherFactory, WatcherFactory};

/// Future returned by [`Engine::run_task`].
pub type TaskFuture<'a> = Pin<Box<dyn Future<Output = StepResult> + Send + 'a>>;

/// Runs tasks from a [`Registry`].
///
/// Cheap to clone; clones share the registry, configuration and
/// collaborators.
#[derive(Debug, Clone)]
pub struct Engine {
    pub(crate) registry: Arc<Registry>,
    pub(crate) config: Arc<EngineConfig>,
    pub(crate) spawner: Arc<dyn ProcessSpawner>,
    pub(crate) prompter: Arc<dyn Prompter>,
    pub(crate) fs: Arc<dyn FileSystem>,
    pub(crate) watchers: Arc<dyn WatcherFactory>,
}

impl Engine {
    pub fn new(registry: Arc<Registry>, config: EngineConfig) -> Self {
        Self {
            registry,
            config: Arc::new(config),
            spawner: Arc::new(TokioSpawner),
            prompter: Arc::new(StdinPrompter),
            fs: Arc::new(RealFileSystem),
            watchers: Arc::new(NotifyWatcherFactory),
        }
    }

    pub fn with_spawner(mut self, spawner: Arc<dyn ProcessSpawner>) -> Self {
        self.spawner = spawner;
        self
    }

    pub fn with_watcher_factory(mut self, watchers: Arc<dyn WatcherFactory>) -> Self {
        self.watchers = watchers;
        self
    }

    pub fn with_prompter(mut self, prompter: Arc<dyn Prompter>) -> Self {
        self.prompter = prompter;
        self
    }

    pub fn with_fs(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run the named task once, without watching.
    ///
    /// An unknown name is reported as a [`StepError::Lookup`] result, not as
    /// a separate error path.
    pub fn run_task<'a>(&'a self, name: &'a str) -> TaskFuture<'a> {
        self.run_invoked(name, &[])
    }

    /// Run `name` on behalf of `callers`, the tasks whose Run/Parallel steps
    /// led here (outermost first).
    ///
    /// A task already in `callers` would wait on its own context lock, so
    /// the re-entry is reported as a [`StepError::Validation`] instead.
    pub(crate) fn run_invoked<'a>(&'a self, name: &'a str, callers: &'a [TaskName]) -> TaskFuture<'a> {
        Box::pin(async move {
            if callers.iter().any(|c| c == name) {
                let mut chain = callers.to_vec();
                chain.push(name.to_string());
                warn!(task = %name, chain = ?chain, "task invokes itself");
                return StepResult::failed(StepError::Validation(format!(
                    "task \"{name}\" invokes itself: {}",
                    chain.join(" -> ")
                )));
            }
            match self.registry.get(name) {
                Some(task) => self.run_task_once(&task, callers).await,
                None => {
                    warn!(task = %name, "task does not exist");
                    StepResult::failed(StepError::Lookup(name.to_string()))
                }
            }
        })
    }

    pub(crate) async fn run_task_once(&self, task: &Arc<Task>, callers: &[TaskName]) -> StepResult {
        let mut chain = callers.to_vec();
        chain.push(task.name().to_string());

        let mut ctx = task.context().lock().await;
        let _running = task.mark_running();

        let start_dir = match self.start_dir() {
            Ok(dir) => dir,
            Err(err) => return StepResult::failed(err),
        };
        let mut scope = RunScope::enter(&mut ctx, start_dir);

        info!(task = %task.name(), steps = task.step_count(), "run started");
        let result = self.run_program(task, &mut scope, &chain).await;
        match &result.error {
            Some(err) => info!(task = %task.name(), error = %err, "run failed"),
            None => info!(task = %task.name(), "run finished"),
        }
        result
    }

    /// Directory every run starts from: `base_dir` resolved against the
    /// process working directory.
    pub(crate) fn start_dir(&self) -> Result<PathBuf, StepError> {
        let cwd = std::env::current_dir().map_err(|e| StepError::io(".", e))?;
        Ok(match &self.config.base_dir {
            Some(base) => cwd.join(base),
            None => cwd,
        })
    }

    async fn run_program(
        &self,
        task: &Task,
        ctx: &mut ExecutionContext,
        chain: &[TaskName],
    ) -> StepResult {
        let nodes = task.program().nodes();
        let mut pc = 0;
        let mut query_handled = false;
        let mut prev = StepResult::empty();

        while let Some(node) = nodes.get(pc) {
            debug!(task = %task.name(), step = pc, kind = node.step.kind(), "running step");
            let mut result = self.run_step(task, &node.step, &prev, ctx, chain).await;

            if let Some(error) = result.error.take() {
                let Some(catch) = &node.catch else {
                    warn!(task = %task.name(), step = pc, error = %error, "step failed; aborting run");
                    result.error = Some(error);
                    return result;
                };
                let caught = CaughtError {
                    error,
                    payload: result.payload.clone(),
                };
                if let Err(fatal) = catch(caught) {
                    warn!(task = %task.name(), step = pc, error = %fatal, "catch did not recover; aborting run");
                    return StepResult::failed(fatal);
                }
                debug!(task = %task.name(), step = pc, "step error recovered by catch");
            }

            pc = match node.branch {
                Branch::Next => pc + 1,
                Branch::Prompt { on_yes, on_no } => {
                    query_handled = false;
                    if result.payload.as_bool().unwrap_or(false) {
                        on_yes
                    } else {
                        on_no
                    }
                }
                Branch::Arm { end } => {
                    let next = if query_handled { end } else { pc + 1 };
                    query_handled = true;
                    next
                }
                Branch::End => {
                    query_handled = false;
                    pc + 1
                }
            };
            prev = result;
        }

        prev
    }

    /// Send a kill request to every running task named by a Run or Parallel
    /// step of `task`.
    ///
    /// Only direct children are swept; `task`'s own Exec steps are left
    /// alone. Returns the number of kill requests delivered.
    pub fn kill_descendants(&self, task: &Task) -> usize {
        let mut delivered = 0;
        for name in task.invoked_tasks() {
            let Some(child) = self.registry.get(name) else {
                continue;
            };
            if child.is_running() {
                let n = child.kills().kill_all();
                debug!(task = %task.name(), child = %name, killed = n, "swept child task");
                delivered += n;
            }
        }
        delivered
    }
}
