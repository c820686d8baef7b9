//! One-shot completion signal.
//!
//! Several tasks race to report how a server run ended. Each holds a
//! [`Resolver`]; the first `resolve` wins and wakes the single [`Completion`]
//! waiter. Later resolves return immediately and their value is dropped.

use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::oneshot;

/// Create a linked resolver/waiter pair
pub fn channel<T>() -> (Resolver<T>, Completion<T>) {
    let (tx, rx) = oneshot::channel();
    let resolver = Resolver {
        slot: Arc::new(Mutex::new(Some(tx))),
    };
    (resolver, Completion { rx })
}

/// Write side of the completion; cheap to clone, one per reporting task
pub struct Resolver<T> {
    slot: Arc<Mutex<Option<oneshot::Sender<T>>>>,
}

impl<T> Clone for Resolver<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T> Resolver<T> {
    /// Offer the outcome. Returns true if this call was the one that counted.
    pub fn resolve(&self, value: T) -> bool {
        let sender = self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        match sender {
            Some(tx) => tx.send(value).is_ok(),
            None => false,
        }
    }
}

/// Read side of the completion
pub struct Completion<T> {
    rx: oneshot::Receiver<T>,
}

impl<T> Completion<T> {
    /// Wait for the first outcome.
    ///
    /// Returns `None` if every resolver was dropped without reporting.
    pub async fn wait(self) -> Option<T> {
        self.rx.await.ok()
    }
}
