// src/watch/watcher.rs

//! Filesystem watcher seam.
//!
//! The engine only needs `add(path)`, `start(interval)` and `close()` plus a
//! stream of [`WatchEvent`]s. [`NotifyWatcher`] implements that on top of
//! notify's polling watcher; tests use a fake that injects events.

use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use notify::{Config, Event, EventKind, PollWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Events delivered by a running watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// A watched file changed.
    Changed(PathBuf),
    /// The watcher failed; the task's run loop stops with this error.
    Error(String),
    /// The watcher shut down gracefully.
    Closed,
}

/// A filesystem watcher over an explicit list of paths.
pub trait FileWatcher: Send + Debug {
    /// Register a path. Only valid before [`FileWatcher::start`].
    fn add(&mut self, path: &Path) -> Result<()>;

    /// Begin polling every `interval` and return the event stream.
    fn start(&mut self, interval: Duration) -> Result<mpsc::UnboundedReceiver<WatchEvent>>;

    /// Stop watching; a final [`WatchEvent::Closed`] is delivered.
    fn close(&mut self);
}

/// Creates one watcher per executed task.
pub trait WatcherFactory: Send + Sync + Debug {
    fn create(&self) -> Result<Box<dyn FileWatcher>>;
}

/// Polling watcher backed by `notify::PollWatcher`.
///
/// Each path is watched non-recursively: glob resolution has already expanded
/// directories into the concrete files of interest.
pub struct NotifyWatcher {
    paths: Vec<PathBuf>,
    inner: Option<PollWatcher>,
    events: Option<mpsc::UnboundedSender<WatchEvent>>,
}

impl Debug for NotifyWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifyWatcher")
            .field("paths", &self.paths)
            .field("running", &self.inner.is_some())
            .finish()
    }
}

impl NotifyWatcher {
    pub fn new() -> Self {
        Self {
            paths: Vec::new(),
            inner: None,
            events: None,
        }
    }
}

impl Default for NotifyWatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl FileWatcher for NotifyWatcher {
    fn add(&mut self, path: &Path) -> Result<()> {
        if self.inner.is_some() {
            anyhow::bail!("cannot add {:?} to a watcher that is already running", path);
        }
        self.paths.push(path.to_path_buf());
        Ok(())
    }

    fn start(&mut self, interval: Duration) -> Result<mpsc::UnboundedReceiver<WatchEvent>> {
        let (tx, rx) = mpsc::unbounded_channel();

        // notify calls this synchronously from its polling thread.
        let handler = {
            let tx = tx.clone();
            move |res: notify::Result<Event>| {
                let event = match res {
                    Ok(event) if is_content_change(&event.kind) => event,
                    Ok(_) => return,
                    Err(err) => {
                        let _ = tx.send(WatchEvent::Error(err.to_string()));
                        return;
                    }
                };
                for path in event.paths {
                    let _ = tx.send(WatchEvent::Changed(path));
                }
            }
        };

        let mut watcher = PollWatcher::new(handler, Config::default().with_poll_interval(interval))
            .context("creating polling watcher")?;
        for path in &self.paths {
            watcher
                .watch(path, RecursiveMode::NonRecursive)
                .with_context(|| format!("watching {:?}", path))?;
        }

        info!(files = self.paths.len(), ?interval, "file watcher started");
        self.inner = Some(watcher);
        self.events = Some(tx);
        Ok(rx)
    }

    fn close(&mut self) {
        // Dropping the PollWatcher stops its polling thread.
        if self.inner.take().is_some() {
            debug!("file watcher closed");
        }
        if let Some(tx) = self.events.take() {
            let _ = tx.send(WatchEvent::Closed);
        }
    }
}

fn is_content_change(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) | EventKind::Any
    )
}

/// Factory for [`NotifyWatcher`]s.
#[derive(Debug, Clone, Default)]
pub struct NotifyWatcherFactory;

impl WatcherFactory for NotifyWatcherFactory {
    fn create(&self) -> Result<Box<dyn FileWatcher>> {
        Ok(Box::new(NotifyWatcher::new()))
    }
}
