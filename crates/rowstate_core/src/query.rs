//! Live query results.

use crate::cell::StatusCell;
use crate::config::StoreConfig;
use crate::error::StoreResult;
use crate::log::Logger;
use crate::status::Status;
use parking_lot::Mutex;
use rowstate_client::{
    BackendClient, Filter, RealtimeEvent, Record, SubscriptionId, TriggerClass,
};
use rowstate_store::{Changes, Subscription, Teardown, Writable};
use std::sync::{Arc, Weak};
use tokio::runtime::Handle;
use tokio::sync::mpsc;

/// Why the worker should refetch.
#[derive(Debug)]
enum Refresh {
    /// A realtime notification arrived.
    Change(RealtimeEvent),
    /// The realtime subscription was reopened after full detachment.
    Resubscribed,
}

struct QueryInner {
    table: String,
    filter: Filter,
    trigger: TriggerClass,
    client: Arc<dyn BackendClient>,
    cell: StatusCell<Vec<Record>>,
    realtime: Mutex<Option<SubscriptionId>>,
    runtime: Handle,
}

/// Keeps a filtered view of a table current.
///
/// The result set is refetched wholesale, never patched: once when the
/// subscription is built and once per realtime notification. A realtime
/// subscription is held from construction until the last observer detaches;
/// attaching again opens a fresh one and refetches. Dropping the container
/// closes whatever subscription is still open.
pub struct QuerySubscription {
    inner: Arc<QueryInner>,
}

impl QueryInner {
    fn scope(&self) -> &str {
        self.cell.scope()
    }

    fn logger(&self) -> Logger {
        self.cell.logger()
    }

    async fn fetch(&self) -> StoreResult<Vec<Record>> {
        let ticket = self.cell.begin("fetch", true);
        let result = self
            .client
            .select(&self.table, &self.filter)
            .await
            .map_err(Into::into);
        self.cell.settle(ticket, result, "results")
    }

    /// Opens a realtime subscription and its worker unless one is open.
    fn open_realtime(self: &Arc<Self>, resync: bool) {
        let mut slot = self.realtime.lock();
        if slot.is_some() {
            return;
        }

        let (tx, mut rx) = mpsc::unbounded_channel();
        if resync {
            let _ = tx.send(Refresh::Resubscribed);
        }
        let id = self.client.open_subscription(
            &self.table,
            self.trigger,
            Arc::new(move |event: RealtimeEvent| {
                // Closed only once the worker is gone, i.e. after close_realtime.
                let _ = tx.send(Refresh::Change(event));
            }),
        );
        *slot = Some(id);
        drop(slot);
        self.logger()
            .log(self.scope(), "realtime subscription created");

        // Ends when the backend drops the callback and with it the sender.
        let inner = Arc::clone(self);
        self.runtime.spawn(async move {
            while let Some(refresh) = rx.recv().await {
                inner.refresh(refresh).await;
            }
        });
    }

    fn close_realtime(&self) {
        let id = self.realtime.lock().take();
        if let Some(id) = id {
            self.client.close_subscription(id);
            self.logger()
                .log(self.scope(), "realtime subscription removed");
        }
    }

    async fn refresh(&self, refresh: Refresh) {
        match &refresh {
            Refresh::Change(event) => {
                self.logger().log(
                    self.scope(),
                    format_args!("{:?} event received", event.kind),
                );
                self.logger().verbose(self.scope(), format_args!("{event:?}"));
            }
            Refresh::Resubscribed => {
                self.logger().log(self.scope(), "resubscribed, refetching");
            }
        }
        // The outcome is already in the container and the log.
        let _ = self.fetch().await;
    }
}

impl QuerySubscription {
    /// Builds the container, opens its realtime subscription and performs the
    /// initial fetch before returning. Must run inside a tokio runtime.
    pub(crate) async fn open(
        client: Arc<dyn BackendClient>,
        config: &StoreConfig,
        logger: Logger,
        table: String,
        filter: Filter,
        trigger: TriggerClass,
    ) -> Self {
        let scope = format!("query store - {table} - {filter}");
        let inner = Arc::new_cyclic(|weak: &Weak<QueryInner>| {
            let on_start = weak.clone();
            let store = Writable::with_start(Status::Idle, move || -> Teardown {
                let Some(inner) = on_start.upgrade() else {
                    return Box::new(|| {});
                };
                inner.open_realtime(true);
                let on_stop = Arc::downgrade(&inner);
                Box::new(move || {
                    if let Some(inner) = on_stop.upgrade() {
                        inner.close_realtime();
                    }
                })
            });
            QueryInner {
                table,
                filter,
                trigger,
                client,
                cell: StatusCell::new(store, config, logger, scope),
                realtime: Mutex::new(None),
                runtime: Handle::current(),
            }
        });
        logger.info(inner.scope(), "initialized");

        inner.open_realtime(false);
        let _ = inner.fetch().await;

        Self { inner }
    }

    /// Refetches the result set.
    pub async fn fetch(&self) -> StoreResult<Vec<Record>> {
        self.inner.fetch().await
    }

    /// Returns the table name.
    pub fn table(&self) -> &str {
        &self.inner.table
    }

    /// Returns the query filter.
    pub fn filter(&self) -> &Filter {
        &self.inner.filter
    }

    /// Returns the realtime trigger class.
    pub fn trigger(&self) -> TriggerClass {
        self.inner.trigger
    }

    /// Returns true while a realtime subscription is open.
    pub fn is_live(&self) -> bool {
        self.inner.realtime.lock().is_some()
    }

    /// Attaches an observer. See [`Writable::subscribe`].
    ///
    /// Attaching the first observer after every observer detached reopens
    /// the realtime subscription.
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&Status<Vec<Record>>) + Send + Sync + 'static,
    {
        self.inner.cell.subscribe(observer)
    }

    /// Returns the current state.
    pub fn get(&self) -> Status<Vec<Record>> {
        self.inner.cell.get()
    }

    /// Returns an ordered stream of states.
    pub fn changes(&self) -> Changes<Status<Vec<Record>>> {
        self.inner.cell.changes()
    }

    /// Waits for a state satisfying `pred`.
    pub async fn wait_for<P>(&self, pred: P) -> Status<Vec<Record>>
    where
        P: FnMut(&Status<Vec<Record>>) -> bool,
    {
        self.inner.cell.wait_for(pred).await
    }
}

impl Drop for QuerySubscription {
    fn drop(&mut self) {
        self.inner.close_realtime();
    }
}

impl std::fmt::Debug for QuerySubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuerySubscription")
            .field("table", &self.inner.table)
            .field("filter", &self.inner.filter)
            .field("trigger", &self.inner.trigger)
            .field("live", &self.is_live())
            .field("state", &self.get().tag())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::log::LogLevel;
    use crate::status::StatusTag;
    use rowstate_client::{BackendError, QueryFilter, TableClient};
    use rowstate_testkit::prelude::*;

    async fn open(backend: &Arc<MemoryBackend>, query: &str, trigger: TriggerClass) -> QuerySubscription {
        QuerySubscription::open(
            backend.clone(),
            &StoreConfig::default(),
            Logger::new(LogLevel::Verbose),
            "todos".to_string(),
            Filter::Any(QueryFilter::parse(query).unwrap()),
            trigger,
        )
        .await
    }

    fn seeded() -> Arc<MemoryBackend> {
        let backend = Arc::new(MemoryBackend::new());
        backend.seed(
            "todos",
            vec![
                row(json!({ "id": 1, "done": false })),
                row(json!({ "id": 2, "done": true })),
            ],
        );
        backend
    }

    #[tokio::test]
    async fn initial_fetch_on_construction() {
        let backend = seeded();
        let todos = open(&backend, "done.is.false", TriggerClass::All).await;

        assert_eq!(backend.calls(Operation::Select), 1);
        assert_eq!(
            todos.get(),
            Status::Success(vec![row(json!({ "id": 1, "done": false }))])
        );
        assert!(todos.is_live());
        assert_eq!(backend.open_subscriptions(), 1);
    }

    #[tokio::test]
    async fn realtime_event_refetches_full_result() {
        let backend = seeded();
        let todos = open(&backend, "done.is.false", TriggerClass::All).await;

        backend
            .insert("todos", vec![row(json!({ "id": 3, "done": false }))])
            .await
            .unwrap();

        let state = todos
            .wait_for(|s| s.data().is_some_and(|rows| rows.len() == 2))
            .await;
        assert_eq!(state.tag(), StatusTag::Success);
        assert_eq!(backend.calls(Operation::Select), 2);
    }

    #[tokio::test]
    async fn trigger_class_filters_notifications() {
        let backend = seeded();
        let todos = open(&backend, "done.is.false", TriggerClass::Delete).await;

        backend
            .insert("todos", vec![row(json!({ "id": 3, "done": false }))])
            .await
            .unwrap();
        tokio::task::yield_now().await;
        assert_eq!(backend.calls(Operation::Select), 1);

        backend
            .delete("todos", &Filter::Match(row(json!({ "id": 1 }))))
            .await
            .unwrap();
        todos.wait_for(|s| s.data().is_some_and(|rows| rows.len() == 1
            && rows[0].get("id") == Some(&json!(3)))).await;
        assert_eq!(backend.calls(Operation::Select), 2);
    }

    #[tokio::test]
    async fn fetch_failure_surfaces_error() {
        let backend = seeded();
        let todos = open(&backend, "done.is.false", TriggerClass::All).await;

        let error = BackendError::new("JWT expired").with_status(401);
        backend.fail(Operation::Select, error.clone());
        let err = todos.fetch().await.unwrap_err();
        assert_eq!(err, StoreError::Backend(error));
        assert_eq!(todos.get(), Status::Error(err));
    }

    #[tokio::test]
    async fn pending_keeps_previous_results() {
        let backend = seeded();
        let todos = open(&backend, "done.is.true", TriggerClass::All).await;
        let before = todos.get().data().cloned().unwrap();

        let mut changes = todos.changes();
        todos.fetch().await.unwrap();
        let states = changes.drain();
        assert_eq!(states[1], Status::Pending(Some(before)));
    }

    #[tokio::test]
    async fn last_observer_detaching_releases_realtime() {
        let backend = seeded();
        let todos = open(&backend, "done.is.false", TriggerClass::All).await;

        let a = todos.subscribe(|_| {});
        let b = todos.subscribe(|_| {});
        assert_eq!(backend.subscriptions_opened(), 1);

        drop(a);
        assert!(todos.is_live());
        b.unsubscribe();
        assert!(!todos.is_live());
        assert_eq!(backend.subscriptions_closed(), 1);
        assert_eq!(backend.open_subscriptions(), 0);

        // Mutations while detached trigger nothing.
        backend
            .insert("todos", vec![row(json!({ "id": 3, "done": false }))])
            .await
            .unwrap();
        assert_eq!(backend.calls(Operation::Select), 1);

        // Re-attaching opens a fresh subscription and catches up.
        let _c = todos.subscribe(|_| {});
        assert!(todos.is_live());
        assert_eq!(backend.subscriptions_opened(), 2);
        todos
            .wait_for(|s| s.data().is_some_and(|rows| rows.len() == 2))
            .await;
    }

    #[tokio::test]
    async fn drop_closes_realtime() {
        let backend = seeded();
        let todos = open(&backend, "done.is.false", TriggerClass::All).await;
        assert_eq!(backend.open_subscriptions(), 1);
        drop(todos);
        assert_eq!(backend.open_subscriptions(), 0);
        assert_eq!(backend.subscriptions_closed(), 1);
    }
}
