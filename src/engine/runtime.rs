// src/engine/runtime.rs

//! Run lifecycle of an executed task.
//!
//! [`Engine::execute`] starts three cooperating pieces:
//! - the run loop, which waits for either a run request or a stop request,
//! - the watch loop (only when the task's patterns resolve to files),
//! - the Signal Bridge (only when signals are configured).
//!
//! Run requests go through a single-slot channel. Reserving the slot is the
//! "no run pending yet" check, so a burst of triggers queues at most one run.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::engine::{Engine, StepResult, Task};
use crate::errors::{StepError, TaskchainError};
use crate::signal::SignalBridge;
use crate::types::{SignalName, TaskName};
use crate::watch::event_loop::WatchLoop;
use crate::watch::{ContentCache, FileWatcher, WatchEvent, resolve_patterns};

#[derive(Debug, Clone, Copy)]
pub(crate) struct RunRequest {
    /// Leave the run loop once this run completes.
    exit_after: bool,
}

/// Handle used by the watch loop and the Signal Bridge to drive a run loop.
#[derive(Debug, Clone)]
pub(crate) struct RunControl {
    engine: Engine,
    task: Arc<Task>,
    run_tx: mpsc::Sender<RunRequest>,
    stop_tx: mpsc::UnboundedSender<Option<String>>,
}

impl RunControl {
    pub(crate) fn task_name(&self) -> &str {
        self.task.name()
    }

    /// Queue a run unless one is already pending.
    ///
    /// Before queuing, running child tasks (Run/Parallel targets) are sent a
    /// kill request so the new run does not wait on stale work.
    pub(crate) fn trigger(&self, reason: &'static str) -> bool {
        match self.run_tx.try_reserve() {
            Ok(permit) => {
                let killed = self.engine.kill_descendants(&self.task);
                debug!(task = %self.task.name(), reason, killed, "queuing run");
                permit.send(RunRequest { exit_after: false });
                true
            }
            Err(mpsc::error::TrySendError::Full(())) => {
                debug!(task = %self.task.name(), reason, "run already pending; coalescing");
                false
            }
            Err(mpsc::error::TrySendError::Closed(())) => false,
        }
    }

    fn queue_once(&self) {
        if self.run_tx.try_send(RunRequest { exit_after: true }).is_err() {
            warn!(task = %self.task.name(), "run loop is not accepting requests");
        }
    }

    /// End the run loop; `Some` carries the watcher error it ends with.
    pub(crate) fn stop(&self, error: Option<String>) {
        let _ = self.stop_tx.send(error);
    }
}

/// A task running under its watch lifecycle.
///
/// Every completed run is delivered through [`Execution::next_run`]. The
/// lifecycle ends when the watcher closes or fails, when [`Execution::stop`]
/// is called, or after the single run of a task with nothing to watch.
#[derive(Debug)]
pub struct Execution {
    task_name: TaskName,
    watched: Vec<PathBuf>,
    reports: mpsc::UnboundedReceiver<StepResult>,
    handle: JoinHandle<Result<StepResult, TaskchainError>>,
    control: Option<RunControl>,
    close_tx: Option<oneshot::Sender<()>>,
    signal_bridge: Option<SignalBridge>,
}

impl Execution {
    pub fn task_name(&self) -> &str {
        &self.task_name
    }

    /// Paths the watch patterns resolved to (empty when not watching).
    pub fn watched_files(&self) -> &[PathBuf] {
        &self.watched
    }

    pub fn is_watching(&self) -> bool {
        self.close_tx.is_some()
    }

    /// Result of the next completed run, or `None` once the run loop ended.
    pub async fn next_run(&mut self) -> Option<StepResult> {
        self.reports.recv().await
    }

    /// Queue another run as if a watched file changed. Returns `false` when a
    /// run is already pending or the lifecycle has ended.
    pub fn request_run(&self) -> bool {
        self.control
            .as_ref()
            .is_some_and(|control| control.trigger("requested"))
    }

    /// Stop watching and end the run loop after the current run, if any.
    pub fn stop(&mut self) {
        self.shutdown_sources();
        if let Some(control) = &self.control {
            control.stop(None);
        }
    }

    /// Wait for the run loop to end.
    ///
    /// Returns the result of the last completed run (empty if none ran), or
    /// the watcher error that ended the lifecycle.
    pub async fn wait(mut self) -> Result<StepResult, TaskchainError> {
        let outcome = (&mut self.handle).await;
        self.shutdown_sources();
        match outcome {
            Ok(result) => result,
            Err(err) => Err(TaskchainError::Other(
                anyhow::Error::new(err).context("run loop did not complete"),
            )),
        }
    }

    fn shutdown_sources(&mut self) {
        if let Some(close) = self.close_tx.take() {
            let _ = close.send(());
        }
        if let Some(mut bridge) = self.signal_bridge.take() {
            bridge.reset();
        }
    }
}

impl Drop for Execution {
    fn drop(&mut self) {
        self.stop();
    }
}

impl Engine {
    /// Run the named task under its watch lifecycle.
    ///
    /// - Watch patterns are resolved once, relative to the base directory.
    /// - No resolved files: the task runs exactly once.
    /// - Otherwise an initial run is queued and every coalesced change queues
    ///   another.
    ///
    /// An unknown name yields an execution whose single run reports a
    /// [`StepError::Lookup`].
    pub fn execute(&self, name: &str) -> Execution {
        let (reports_tx, reports) = mpsc::unbounded_channel();

        let Some(task) = self.registry.get(name) else {
            warn!(task = %name, "task does not exist");
            let lookup = StepResult::failed(StepError::Lookup(name.to_string()));
            let handle = tokio::spawn(async move {
                let _ = reports_tx.send(lookup.clone());
                Ok(lookup)
            });
            return Execution {
                task_name: name.to_string(),
                watched: Vec::new(),
                reports,
                handle,
                control: None,
                close_tx: None,
                signal_bridge: None,
            };
        };

        let (run_tx, run_rx) = mpsc::channel(1);
        let (stop_tx, stop_rx) = mpsc::unbounded_channel();
        let control = RunControl {
            engine: self.clone(),
            task: Arc::clone(&task),
            run_tx,
            stop_tx,
        };

        let base = self.start_dir().unwrap_or_else(|_| PathBuf::from("."));
        let watched = resolve_patterns(self.fs.as_ref(), &base, task.watch_patterns());

        let handle = tokio::spawn(run_loop(
            self.clone(),
            Arc::clone(&task),
            run_rx,
            stop_rx,
            reports_tx,
        ));

        let mut close_tx = None;
        if watched.is_empty() {
            if !task.watch_patterns().is_empty() {
                warn!(task = %task.name(), patterns = ?task.watch_patterns(), "watch patterns matched no files; running once");
            }
            control.queue_once();
        } else {
            match self.start_watcher(&watched) {
                Ok((watcher, events)) => {
                    let (tx, close_rx) = oneshot::channel();
                    close_tx = Some(tx);
                    let hashes = self
                        .config
                        .use_hash
                        .then(|| ContentCache::prime(Arc::clone(&self.fs), &watched));
                    control.trigger("initial run");
                    tokio::spawn(
                        WatchLoop {
                            watcher,
                            events,
                            control: control.clone(),
                            close_rx,
                            debounce: self.config.debounce,
                            hashes,
                        }
                        .run(),
                    );
                }
                Err(err) => {
                    warn!(task = %task.name(), error = %format!("{err:#}"), "could not start file watcher");
                    control.stop(Some(format!("{err:#}")));
                }
            }
        }

        let signals = self.signals_for(&task);
        let signal_bridge = if signals.is_empty() {
            None
        } else {
            let control = control.clone();
            Some(SignalBridge::install(&signals, move |signal| {
                info!(task = %control.task_name(), %signal, "signal received; restarting run");
                control.trigger("signal");
            }))
        };

        Execution {
            task_name: task.name().to_string(),
            watched,
            reports,
            handle,
            control: Some(control),
            close_tx,
            signal_bridge,
        }
    }

    fn start_watcher(
        &self,
        paths: &[PathBuf],
    ) -> anyhow::Result<(Box<dyn FileWatcher>, mpsc::UnboundedReceiver<WatchEvent>)> {
        let mut watcher = self.watchers.create().context("creating file watcher")?;
        for path in paths {
            watcher.add(path)?;
        }
        let events = watcher
            .start(self.config.poll_interval)
            .context("starting file watcher")?;
        Ok((watcher, events))
    }

    fn signals_for(&self, task: &Task) -> Vec<SignalName> {
        let mut signals = task.signals().to_vec();
        for signal in &self.config.signals {
            if !signals.contains(signal) {
                signals.push(*signal);
            }
        }
        signals
    }
}

async fn run_loop(
    engine: Engine,
    task: Arc<Task>,
    mut run_rx: mpsc::Receiver<RunRequest>,
    mut stop_rx: mpsc::UnboundedReceiver<Option<String>>,
    reports: mpsc::UnboundedSender<StepResult>,
) -> Result<StepResult, TaskchainError> {
    let mut last = StepResult::empty();

    loop {
        // A stop request wins over a pending run.
        tokio::select! {
            biased;

            stop = stop_rx.recv() => {
                if let Some(message) = stop.flatten() {
                    return Err(TaskchainError::WatchError(message));
                }
                break;
            }
            request = run_rx.recv() => {
                let Some(request) = request else { break };
                let result = engine.run_task_once(&task, &[]).await;
                last = result.clone();
                let _ = reports.send(result);
                if request.exit_after {
                    break;
                }
            }
        }
    }

    debug!(task = %task.name(), "run loop finished");
    Ok(last)
}
