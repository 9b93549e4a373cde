//! Channel-backed observation.

use std::fmt;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::writable::Subscription;

/// An ordered stream of store values.
///
/// The first value is the store's value at the time [`crate::Writable::changes`]
/// was called. Dropping the handle detaches it from the store.
pub struct Changes<T> {
    rx: UnboundedReceiver<T>,
    _subscription: Subscription,
}

impl<T> Changes<T> {
    pub(crate) fn new(rx: UnboundedReceiver<T>, subscription: Subscription) -> Self {
        Self {
            rx,
            _subscription: subscription,
        }
    }

    /// Waits for the next value.
    pub async fn next(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Returns the next value if one is already queued.
    pub fn try_next(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Drains every queued value.
    pub fn drain(&mut self) -> Vec<T> {
        let mut values = Vec::new();
        while let Some(value) = self.try_next() {
            values.push(value);
        }
        values
    }
}

impl<T> fmt::Debug for Changes<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Changes").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use crate::Writable;

    #[tokio::test]
    async fn changes_yield_every_write() {
        let store = Writable::new(0u8);
        let mut changes = store.changes();
        store.set(1);
        store.set(2);

        assert_eq!(changes.next().await, Some(0));
        assert_eq!(changes.drain(), vec![1, 2]);
    }

    #[test]
    fn dropping_changes_detaches() {
        let store = Writable::new(0u8);
        let changes = store.changes();
        assert_eq!(store.subscriber_count(), 1);
        drop(changes);
        assert_eq!(store.subscriber_count(), 0);
    }
}
