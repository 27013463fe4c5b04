//! Single-writer catalog snapshot store
//!
//! One coordinating component owns the catalog; mutations publish a whole
//! new immutable snapshot behind a pointer swap, so concurrent readers never
//! observe in-place mutation. Subscribers receive every published snapshot
//! in order over an unbounded channel.

use reel_core::types::CatalogSnapshot;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tokio::sync::mpsc;

/// Shared store for the current catalog snapshot
#[derive(Debug, Default)]
pub struct CatalogStore {
    current: RwLock<Arc<CatalogSnapshot>>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<Arc<CatalogSnapshot>>>>,
}

impl CatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recently published snapshot
    pub fn current(&self) -> Arc<CatalogSnapshot> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Publish a new snapshot and notify all subscribers
    ///
    /// The swap is atomic from a reader's point of view; a subscriber either
    /// sees the previous snapshot or this one, never a mix.
    pub fn publish(&self, snapshot: CatalogSnapshot) {
        let snapshot = Arc::new(snapshot);
        *self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner) = snapshot.clone();

        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|tx| tx.send(snapshot.clone()).is_ok());
    }

    /// Register for snapshot change notifications
    ///
    /// The receiver sees snapshots published after this call; dropped
    /// receivers are pruned on the next publish.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<Arc<CatalogSnapshot>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }
}
