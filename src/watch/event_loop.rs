// src/watch/event_loop.rs

//! The per-task watch loop: turns watcher events into run requests.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::engine::runtime::RunControl;
use crate::watch::hash::ContentCache;
use crate::watch::watcher::{FileWatcher, WatchEvent};

pub(crate) struct WatchLoop {
    pub(crate) watcher: Box<dyn FileWatcher>,
    pub(crate) events: mpsc::UnboundedReceiver<WatchEvent>,
    pub(crate) control: RunControl,
    pub(crate) close_rx: oneshot::Receiver<()>,
    pub(crate) debounce: Duration,
    pub(crate) hashes: Option<ContentCache>,
}

impl WatchLoop {
    /// Run until the watcher errors, closes, or the execution is shut down.
    ///
    /// Change bursts within the debounce window coalesce into one trigger.
    pub(crate) async fn run(mut self) {
        loop {
            let event = tokio::select! {
                _ = &mut self.close_rx => {
                    debug!(task = %self.control.task_name(), "watch loop shut down");
                    self.watcher.close();
                    return;
                }
                event = self.events.recv() => event,
            };

            match event {
                Some(WatchEvent::Changed(first)) => {
                    tokio::time::sleep(self.debounce).await;

                    let mut changed = vec![first];
                    let mut terminal = None;
                    while let Ok(event) = self.events.try_recv() {
                        match event {
                            WatchEvent::Changed(path) => changed.push(path),
                            other => {
                                terminal = Some(other);
                                break;
                            }
                        }
                    }

                    if self.passes_hash_filter(&changed) {
                        info!(
                            task = %self.control.task_name(),
                            files = ?changed,
                            "watched files changed"
                        );
                        self.control.trigger("file change");
                    }

                    if let Some(event) = terminal {
                        self.finish(Some(event));
                        return;
                    }
                }
                other => {
                    self.finish(other);
                    return;
                }
            }
        }
    }

    fn passes_hash_filter(&mut self, changed: &[std::path::PathBuf]) -> bool {
        let Some(cache) = self.hashes.as_mut() else {
            return true;
        };
        // Every path must be re-hashed to keep the cache current.
        let modified = changed.iter().filter(|p| cache.has_changed(p)).count();
        if modified == 0 {
            debug!(task = %self.control.task_name(), "content unchanged; ignoring change event");
        }
        modified > 0
    }

    fn finish(&mut self, event: Option<WatchEvent>) {
        match event {
            Some(WatchEvent::Error(message)) => {
                warn!(task = %self.control.task_name(), error = %message, "file watcher failed");
                self.watcher.close();
                self.control.stop(Some(message));
            }
            Some(WatchEvent::Closed) | None => {
                info!(task = %self.control.task_name(), "file watcher closed");
                self.control.stop(None);
            }
            Some(WatchEvent::Changed(_)) => {}
        }
    }
}
