// src/signal.rs

//! Signal Bridge: routes OS signals into a task's run control.
//!
//! On each configured signal the callback runs; the engine uses it to sweep
//! running child tasks and queue one more run, the same as a file change.
//!
//! `reset` stops the bridge from reacting. Once tokio has registered a
//! handler for a signal it stays registered for the life of the process, so
//! after a reset the signal is still consumed rather than falling back to the
//! default disposition.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::types::SignalName;

#[derive(Debug)]
pub struct SignalBridge {
    signals: Vec<SignalName>,
    listeners: Vec<JoinHandle<()>>,
}

impl SignalBridge {
    /// Start listening for `signals`. Must be called within a tokio runtime.
    ///
    /// Signals the platform cannot listen for are logged and skipped.
    pub fn install<F>(signals: &[SignalName], on_signal: F) -> Self
    where
        F: Fn(SignalName) + Send + Sync + 'static,
    {
        let on_signal = Arc::new(on_signal);
        let listeners = signals
            .iter()
            .filter_map(|&signal| listen(signal, Arc::clone(&on_signal)))
            .collect();
        debug!(?signals, "signal bridge installed");
        Self {
            signals: signals.to_vec(),
            listeners,
        }
    }

    pub fn signals(&self) -> &[SignalName] {
        &self.signals
    }

    /// Number of signals actually being listened for.
    pub fn active(&self) -> usize {
        self.listeners.len()
    }

    /// Stop reacting to the configured signals.
    pub fn reset(&mut self) {
        if self.listeners.is_empty() {
            return;
        }
        for listener in self.listeners.drain(..) {
            listener.abort();
        }
        debug!(signals = ?self.signals, "signal bridge reset");
    }
}

impl Drop for SignalBridge {
    fn drop(&mut self) {
        self.reset();
    }
}

#[cfg(unix)]
fn listen<F>(signal: SignalName, on_signal: Arc<F>) -> Option<JoinHandle<()>>
where
    F: Fn(SignalName) + Send + Sync + 'static,
{
    use tokio::signal::unix::{SignalKind, signal as unix_signal};

    let kind = match signal {
        SignalName::Interrupt => SignalKind::interrupt(),
        SignalName::Quit => SignalKind::quit(),
        SignalName::Terminate => SignalKind::terminate(),
        SignalName::Hangup => SignalKind::hangup(),
    };
    match unix_signal(kind) {
        Ok(mut stream) => Some(tokio::spawn(async move {
            while stream.recv().await.is_some() {
                debug!(%signal, "signal received");
                on_signal(signal);
            }
        })),
        Err(err) => {
            warn!(%signal, error = %err, "cannot listen for signal");
            None
        }
    }
}

#[cfg(not(unix))]
fn listen<F>(signal: SignalName, on_signal: Arc<F>) -> Option<JoinHandle<()>>
where
    F: Fn(SignalName) + Send + Sync + 'static,
{
    match signal {
        SignalName::Interrupt => Some(tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                debug!(%signal, "signal received");
                on_signal(signal);
            }
        })),
        other => {
            warn!(signal = %other, "signal is not supported on this platform");
            None
        }
    }
}
