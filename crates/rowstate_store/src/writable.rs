//! The writable store.

use parking_lot::{Mutex, ReentrantMutex};
use std::fmt;
use std::sync::Arc;

use crate::changes::Changes;

/// Cleanup returned by a start notifier, run when the last observer detaches.
pub type Teardown = Box<dyn FnOnce() + Send>;

type StartFn = Box<dyn Fn() -> Teardown + Send + Sync>;
type Observer<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct State<T> {
    value: T,
    observers: Vec<(u64, Observer<T>)>,
    next_id: u64,
    teardown: Option<Teardown>,
}

struct Shared<T> {
    /// Serializes notification so every observer sees writes in order.
    /// Reentrant so observers may write back into the store.
    notify: ReentrantMutex<()>,
    state: Mutex<State<T>>,
    start: Option<StartFn>,
}

/// A shared, observable value.
///
/// Cloning a `Writable` yields another handle on the same value.
pub struct Writable<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Writable<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Writable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("Writable")
            .field("value", &state.value)
            .field("observers", &state.observers.len())
            .finish()
    }
}

impl<T> Writable<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Creates a store holding `initial`.
    pub fn new(initial: T) -> Self {
        Self::build(initial, None)
    }

    /// Creates a store with a start notifier.
    ///
    /// `start` runs on every transition from zero to one observer. The
    /// teardown it returns runs exactly once, on the matching transition from
    /// one observer back to zero.
    pub fn with_start<F>(initial: T, start: F) -> Self
    where
        F: Fn() -> Teardown + Send + Sync + 'static,
    {
        Self::build(initial, Some(Box::new(start)))
    }

    fn build(initial: T, start: Option<StartFn>) -> Self {
        Self {
            shared: Arc::new(Shared {
                notify: ReentrantMutex::new(()),
                state: Mutex::new(State {
                    value: initial,
                    observers: Vec::new(),
                    next_id: 0,
                    teardown: None,
                }),
                start,
            }),
        }
    }

    /// Returns a snapshot of the current value.
    pub fn get(&self) -> T {
        self.shared.state.lock().value.clone()
    }

    /// Returns the number of attached observers.
    pub fn subscriber_count(&self) -> usize {
        self.shared.state.lock().observers.len()
    }

    /// Replaces the value and notifies every observer.
    pub fn set(&self, value: T) {
        self.update(move |_| value);
    }

    /// Replaces the value with `f(current)` and notifies every observer.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        let _notify = self.shared.notify.lock();
        let (observers, value) = {
            let mut state = self.shared.state.lock();
            let next = f(&state.value);
            state.value = next;
            let observers: Vec<Observer<T>> =
                state.observers.iter().map(|(_, o)| Arc::clone(o)).collect();
            (observers, state.value.clone())
        };
        for observer in observers {
            observer(&value);
        }
    }

    /// Attaches an observer.
    ///
    /// The observer is called immediately with the current value, then once
    /// per later write. It stays attached until the returned [`Subscription`]
    /// is dropped or [`Subscription::unsubscribe`] is called.
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let observer: Observer<T> = Arc::new(observer);
        let _notify = self.shared.notify.lock();

        let (id, first, value) = {
            let mut state = self.shared.state.lock();
            let id = state.next_id;
            state.next_id += 1;
            state.observers.push((id, Arc::clone(&observer)));
            (id, state.observers.len() == 1, state.value.clone())
        };

        if first {
            if let Some(start) = &self.shared.start {
                let teardown = start();
                self.shared.state.lock().teardown = Some(teardown);
            }
        }

        observer(&value);

        let store = self.clone();
        Subscription {
            detach: Some(Box::new(move || store.detach(id))),
        }
    }

    /// Attaches a channel-backed observer that yields every value in order.
    pub fn changes(&self) -> Changes<T> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let subscription = self.subscribe(move |value: &T| {
            // A closed receiver means the Changes handle is being dropped.
            let _ = tx.send(value.clone());
        });
        Changes::new(rx, subscription)
    }

    /// Waits for the first value, current or future, that satisfies `pred`.
    pub async fn wait_for<P>(&self, mut pred: P) -> T
    where
        P: FnMut(&T) -> bool,
    {
        let mut changes = self.changes();
        while let Some(value) = changes.next().await {
            if pred(&value) {
                return value;
            }
        }
        self.get()
    }

    fn detach(&self, id: u64) {
        let _notify = self.shared.notify.lock();
        let teardown = {
            let mut state = self.shared.state.lock();
            let before = state.observers.len();
            state.observers.retain(|(oid, _)| *oid != id);
            let removed = state.observers.len() < before;
            if removed && state.observers.is_empty() {
                state.teardown.take()
            } else {
                None
            }
        };
        if let Some(teardown) = teardown {
            teardown();
        }
    }
}

/// Keeps an observer attached to a store.
///
/// Dropping the subscription detaches the observer.
#[must_use = "dropping a Subscription detaches the observer immediately"]
pub struct Subscription {
    detach: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    /// Detaches the observer.
    pub fn unsubscribe(mut self) {
        self.run_detach();
    }

    fn run_detach(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run_detach();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("attached", &self.detach.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn recorder<T: Clone + Send + 'static>() -> (Arc<Mutex<Vec<T>>>, impl Fn(&T) + Send + Sync) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |v: &T| sink.lock().push(v.clone()))
    }

    #[test]
    fn subscribe_delivers_current_value() {
        let store = Writable::new("a".to_string());
        let (seen, observer) = recorder::<String>();
        let _sub = store.subscribe(observer);
        assert_eq!(*seen.lock(), vec!["a".to_string()]);
    }

    #[test]
    fn set_and_update_notify_in_order() {
        let store = Writable::new(0u32);
        let (seen, observer) = recorder::<u32>();
        let _sub = store.subscribe(observer);

        store.set(1);
        store.update(|v| v + 10);

        assert_eq!(*seen.lock(), vec![0, 1, 11]);
        assert_eq!(store.get(), 11);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let store = Writable::new(0u32);
        let (seen, observer) = recorder::<u32>();
        let sub = store.subscribe(observer);
        sub.unsubscribe();

        store.set(5);
        assert_eq!(*seen.lock(), vec![0]);
        assert_eq!(store.subscriber_count(), 0);
    }

    #[test]
    fn start_and_teardown_follow_observer_count() {
        let starts = Arc::new(AtomicUsize::new(0));
        let stops = Arc::new(AtomicUsize::new(0));

        let (s, t) = (Arc::clone(&starts), Arc::clone(&stops));
        let store = Writable::with_start(0u8, move || {
            s.fetch_add(1, Ordering::SeqCst);
            let t = Arc::clone(&t);
            Box::new(move || {
                t.fetch_add(1, Ordering::SeqCst);
            })
        });

        assert_eq!(starts.load(Ordering::SeqCst), 0);

        let a = store.subscribe(|_| {});
        let b = store.subscribe(|_| {});
        assert_eq!(starts.load(Ordering::SeqCst), 1);

        drop(a);
        assert_eq!(stops.load(Ordering::SeqCst), 0);
        drop(b);
        assert_eq!(stops.load(Ordering::SeqCst), 1);

        // Re-activation starts again.
        let c = store.subscribe(|_| {});
        assert_eq!(starts.load(Ordering::SeqCst), 2);
        drop(c);
        assert_eq!(stops.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn observer_may_write_back() {
        let store = Writable::new(0u32);
        let inner = store.clone();
        let _sub = store.subscribe(move |v| {
            if *v == 1 {
                inner.set(2);
            }
        });
        store.set(1);
        assert_eq!(store.get(), 2);
    }

    #[test]
    fn clones_share_value() {
        let a = Writable::new(1u8);
        let b = a.clone();
        b.set(9);
        assert_eq!(a.get(), 9);
    }

    #[tokio::test]
    async fn wait_for_resolves_on_matching_value() {
        let store = Writable::new(0u32);
        let writer = store.clone();
        let handle = tokio::spawn(async move {
            for i in 1..=5 {
                writer.set(i);
                tokio::task::yield_now().await;
            }
        });

        let value = store.wait_for(|v| *v >= 3).await;
        assert!(value >= 3);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn wait_for_matches_current_value() {
        let store = Writable::new(42u32);
        assert_eq!(store.wait_for(|v| *v == 42).await, 42);
        assert_eq!(store.subscriber_count(), 0);
    }
}
