use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::mpsc;

use taskchain::watch::{FileWatcher, WatchEvent, WatcherFactory};

#[derive(Debug, Default)]
struct State {
    added: Vec<PathBuf>,
    interval: Option<Duration>,
    sender: Option<mpsc::UnboundedSender<WatchEvent>>,
    closed: bool,
    fail_start: bool,
}

/// Watcher factory whose watchers never touch the filesystem.
///
/// Tests inject events with [`FakeWatcherFactory::change`] and friends; they
/// reach the most recently started watcher.
#[derive(Debug, Clone, Default)]
pub struct FakeWatcherFactory {
    state: Arc<Mutex<State>>,
}

impl FakeWatcherFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// A factory whose watchers fail to start.
    pub fn failing() -> Self {
        let factory = Self::default();
        factory.lock().fail_start = true;
        factory
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Inject an event. Returns `false` if no watcher is running.
    pub fn send(&self, event: WatchEvent) -> bool {
        match &self.lock().sender {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        }
    }

    pub fn change(&self, path: impl AsRef<Path>) -> bool {
        self.send(WatchEvent::Changed(path.as_ref().to_path_buf()))
    }

    pub fn fail(&self, message: &str) -> bool {
        self.send(WatchEvent::Error(message.to_string()))
    }

    /// Paths registered with `add`.
    pub fn added(&self) -> Vec<PathBuf> {
        self.lock().added.clone()
    }

    pub fn is_started(&self) -> bool {
        self.lock().sender.is_some()
    }

    pub fn started_interval(&self) -> Option<Duration> {
        self.lock().interval
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}

impl WatcherFactory for FakeWatcherFactory {
    fn create(&self) -> anyhow::Result<Box<dyn FileWatcher>> {
        Ok(Box::new(FakeWatcher {
            state: Arc::clone(&self.state),
        }))
    }
}

#[derive(Debug)]
struct FakeWatcher {
    state: Arc<Mutex<State>>,
}

impl FileWatcher for FakeWatcher {
    fn add(&mut self, path: &Path) -> anyhow::Result<()> {
        self.state.lock().unwrap().added.push(path.to_path_buf());
        Ok(())
    }

    fn start(&mut self, interval: Duration) -> anyhow::Result<mpsc::UnboundedReceiver<WatchEvent>> {
        let mut state = self.state.lock().unwrap();
        if state.fail_start {
            anyhow::bail!("fake watcher refused to start");
        }
        let (tx, rx) = mpsc::unbounded_channel();
        state.interval = Some(interval);
        state.sender = Some(tx);
        Ok(rx)
    }

    fn close(&mut self) {
        let mut state = self.state.lock().unwrap();
        state.closed = true;
        if let Some(tx) = state.sender.take() {
            let _ = tx.send(WatchEvent::Closed);
        }
    }
}
