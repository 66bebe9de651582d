// src/engine/kill.rs

//! Per-context registry of kill channels for in-flight Exec steps.
//!
//! Each Exec step registers a one-shot channel before spawning its process and
//! holds a [`KillGuard`] until it settles; dropping the guard deregisters the
//! channel, whether the process finished on its own or was killed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::oneshot;
use tracing::debug;

#[derive(Debug, Default)]
struct KillSlots {
    next_id: u64,
    /// `None` once a kill request has been sent but the step has not yet
    /// settled.
    senders: HashMap<u64, Option<oneshot::Sender<()>>>,
}

/// Cloneable handle; all clones share the same set of channels.
#[derive(Debug, Clone, Default)]
pub struct KillRegistry {
    inner: Arc<Mutex<KillSlots>>,
}

impl KillRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> MutexGuard<'_, KillSlots> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a fresh kill channel.
    pub fn register(&self) -> (KillGuard, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        let mut slots = self.slots();
        let id = slots.next_id;
        slots.next_id += 1;
        slots.senders.insert(id, Some(tx));
        debug!(process_slot = id, "registered kill channel");
        (
            KillGuard {
                registry: self.clone(),
                id,
            },
            rx,
        )
    }

    /// Send a kill request on every registered channel.
    ///
    /// Returns how many requests were delivered.
    pub fn kill_all(&self) -> usize {
        let mut slots = self.slots();
        let mut delivered = 0;
        for (id, slot) in slots.senders.iter_mut() {
            if let Some(tx) = slot.take() {
                if tx.send(()).is_ok() {
                    delivered += 1;
                    debug!(process_slot = *id, "kill request sent");
                }
            }
        }
        delivered
    }

    /// Number of Exec steps currently registered.
    pub fn len(&self) -> usize {
        self.slots().senders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn remove(&self, id: u64) {
        self.slots().senders.remove(&id);
        debug!(process_slot = id, "deregistered kill channel");
    }
}

/// Deregisters its kill channel when dropped.
#[derive(Debug)]
pub struct KillGuard {
    registry: KillRegistry,
    id: u64,
}

impl Drop for KillGuard {
    fn drop(&mut self) {
        self.registry.remove(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_drop_deregisters() {
        let kills = KillRegistry::new();
        let (guard, _rx) = kills.register();
        assert_eq!(kills.len(), 1);
        drop(guard);
        assert!(kills.is_empty());
    }

    #[tokio::test]
    async fn kill_all_reaches_every_receiver_once() {
        let kills = KillRegistry::new();
        let (_g1, rx1) = kills.register();
        let (_g2, rx2) = kills.register();

        assert_eq!(kills.kill_all(), 2);
        assert!(rx1.await.is_ok());
        assert!(rx2.await.is_ok());

        // Already-signalled channels stay registered until their guard drops,
        // but are not signalled twice.
        assert_eq!(kills.len(), 2);
        assert_eq!(kills.kill_all(), 0);
    }
}
