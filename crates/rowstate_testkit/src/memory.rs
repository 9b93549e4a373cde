//! In-memory backend.

use async_trait::async_trait;
use parking_lot::Mutex;
use rowstate_client::{
    AuthCallback, AuthClient, AuthEvent, BackendError, BackendResult, Credentials, Filter,
    ListenerId, RealtimeCallback, RealtimeClient, RealtimeEvent, Record, Session, SubscriptionId,
    TableClient, TriggerClass, User,
};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

/// Backend calls that can be counted, failed or delayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `AuthClient::session`.
    Session,
    /// `AuthClient::sign_in`.
    SignIn,
    /// `AuthClient::sign_up`.
    SignUp,
    /// `AuthClient::sign_out`.
    SignOut,
    /// `TableClient::select`.
    Select,
    /// `TableClient::insert`.
    Insert,
    /// `TableClient::update`.
    Update,
    /// `TableClient::delete`.
    Delete,
}

struct RealtimeEntry {
    table: String,
    trigger: TriggerClass,
    callback: RealtimeCallback,
}

#[derive(Default)]
struct Inner {
    accounts: HashMap<String, (User, String)>,
    session: Option<Session>,
    tables: HashMap<String, Vec<Record>>,
    next_row_id: HashMap<String, i64>,
    auth_listeners: HashMap<u64, AuthCallback>,
    realtime: HashMap<u64, RealtimeEntry>,
    next_handle: u64,
    calls: HashMap<Operation, usize>,
    failures: HashMap<Operation, BackendError>,
    delays: HashMap<Operation, VecDeque<Duration>>,
    defer_auth: bool,
    deferred_auth: VecDeque<AuthEvent>,
    opened_subscriptions: usize,
    closed_subscriptions: usize,
}

/// An in-memory backend for tests.
///
/// Rows live in per-table vectors; inserted rows without an `id` column get
/// a sequential integer one. Mutations fire realtime notifications to
/// matching subscriptions, and sign-in/sign-out fire auth-state changes.
/// Callbacks always run with no internal lock held.
#[derive(Default)]
pub struct MemoryBackend {
    inner: Mutex<Inner>,
}

impl MemoryBackend {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an account that can sign in.
    pub fn register(&self, email: &str, password: &str) -> User {
        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            email: email.to_string(),
        };
        self.inner
            .lock()
            .accounts
            .insert(email.to_string(), (user.clone(), password.to_string()));
        user
    }

    /// Replaces the current session without firing auth events.
    pub fn set_session(&self, session: Option<Session>) {
        self.inner.lock().session = session;
    }

    /// Adds rows to a table without firing realtime events.
    pub fn seed(&self, table: &str, rows: Vec<Record>) {
        self.inner
            .lock()
            .tables
            .entry(table.to_string())
            .or_default()
            .extend(rows);
    }

    /// Returns the rows of a table.
    pub fn rows(&self, table: &str) -> Vec<Record> {
        self.inner
            .lock()
            .tables
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    /// Makes every later call of `op` fail with `error`.
    pub fn fail(&self, op: Operation, error: BackendError) {
        self.inner.lock().failures.insert(op, error);
    }

    /// Stops failing `op`.
    pub fn clear_failure(&self, op: Operation) {
        self.inner.lock().failures.remove(&op);
    }

    /// Delays the next call of `op` by `delay`. Delays queue up per call.
    pub fn delay_next(&self, op: Operation, delay: Duration) {
        self.inner
            .lock()
            .delays
            .entry(op)
            .or_default()
            .push_back(delay);
    }

    /// Returns how many times `op` was called.
    pub fn calls(&self, op: Operation) -> usize {
        self.inner.lock().calls.get(&op).copied().unwrap_or(0)
    }

    /// Returns the number of open realtime subscriptions.
    pub fn open_subscriptions(&self) -> usize {
        self.inner.lock().realtime.len()
    }

    /// Returns how many realtime subscriptions were ever opened.
    pub fn subscriptions_opened(&self) -> usize {
        self.inner.lock().opened_subscriptions
    }

    /// Returns how many realtime subscriptions were closed.
    pub fn subscriptions_closed(&self) -> usize {
        self.inner.lock().closed_subscriptions
    }

    /// Returns the number of registered auth listeners.
    pub fn auth_listener_count(&self) -> usize {
        self.inner.lock().auth_listeners.len()
    }

    /// Holds back the auth-state changes fired by sign-in and sign-out until
    /// [`MemoryBackend::flush_auth_events`], like a backend that notifies
    /// after the call has returned.
    pub fn defer_auth_events(&self, defer: bool) {
        self.inner.lock().defer_auth = defer;
    }

    /// Fires every held-back auth-state change, oldest first.
    pub fn flush_auth_events(&self) {
        let events: Vec<AuthEvent> = self.inner.lock().deferred_auth.drain(..).collect();
        for event in events {
            self.emit_auth(event);
        }
    }

    fn notify_auth(&self, event: AuthEvent) {
        {
            let mut inner = self.inner.lock();
            if inner.defer_auth {
                inner.deferred_auth.push_back(event);
                return;
            }
        }
        self.emit_auth(event);
    }

    /// Fires an auth-state change with the current session.
    pub fn emit_auth(&self, event: AuthEvent) {
        let (listeners, session) = {
            let inner = self.inner.lock();
            let listeners: Vec<AuthCallback> = inner.auth_listeners.values().cloned().collect();
            (listeners, inner.session.clone())
        };
        for listener in listeners {
            listener(event, session.clone());
        }
    }

    /// Delivers a realtime event to matching subscriptions.
    pub fn emit_realtime(&self, event: RealtimeEvent) {
        let callbacks: Vec<RealtimeCallback> = {
            let inner = self.inner.lock();
            inner
                .realtime
                .values()
                .filter(|e| e.table == event.table && e.trigger.admits(event.kind))
                .map(|e| e.callback.clone())
                .collect()
        };
        for callback in callbacks {
            callback(event.clone());
        }
    }

    /// Counts the call, applies queued latency, then returns any injected
    /// failure.
    async fn enter(&self, op: Operation) -> BackendResult<()> {
        let delay = {
            let mut inner = self.inner.lock();
            *inner.calls.entry(op).or_insert(0) += 1;
            inner.delays.get_mut(&op).and_then(VecDeque::pop_front)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.injected(op)
    }

    fn injected(&self, op: Operation) -> BackendResult<()> {
        match self.inner.lock().failures.get(&op) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("MemoryBackend")
            .field("tables", &inner.tables.len())
            .field("signed_in", &inner.session.is_some())
            .field("realtime", &inner.realtime.len())
            .finish()
    }
}

#[async_trait]
impl AuthClient for MemoryBackend {
    fn session(&self) -> BackendResult<Option<Session>> {
        *self
            .inner
            .lock()
            .calls
            .entry(Operation::Session)
            .or_insert(0) += 1;
        self.injected(Operation::Session)?;
        Ok(self.inner.lock().session.clone())
    }

    async fn sign_in(&self, credentials: &Credentials) -> BackendResult<User> {
        self.enter(Operation::SignIn).await?;
        let user = {
            let mut inner = self.inner.lock();
            let user = match inner.accounts.get(&credentials.email) {
                Some((user, password)) if *password == credentials.password => user.clone(),
                _ => {
                    return Err(BackendError::new("Invalid login credentials")
                        .with_status(400)
                        .with_code("invalid_grant"))
                }
            };
            inner.session = Some(Session {
                access_token: uuid::Uuid::new_v4().to_string(),
                user: user.clone(),
            });
            user
        };
        self.notify_auth(AuthEvent::SignedIn);
        Ok(user)
    }

    async fn sign_up(&self, credentials: &Credentials) -> BackendResult<User> {
        self.enter(Operation::SignUp).await?;
        if credentials.password.len() < 6 {
            return Err(BackendError::new("Password should be at least 6 characters")
                .with_status(422));
        }
        if self.inner.lock().accounts.contains_key(&credentials.email) {
            return Err(BackendError::new("User already registered").with_status(422));
        }
        Ok(self.register(&credentials.email, &credentials.password))
    }

    async fn sign_out(&self) -> BackendResult<()> {
        self.enter(Operation::SignOut).await?;
        self.inner.lock().session = None;
        self.notify_auth(AuthEvent::SignedOut);
        Ok(())
    }

    fn on_auth_state_change(&self, callback: AuthCallback) -> ListenerId {
        let mut inner = self.inner.lock();
        inner.next_handle += 1;
        let id = inner.next_handle;
        inner.auth_listeners.insert(id, callback);
        ListenerId(id)
    }

    fn remove_auth_listener(&self, id: ListenerId) {
        self.inner.lock().auth_listeners.remove(&id.0);
    }
}

#[async_trait]
impl TableClient for MemoryBackend {
    async fn select(&self, table: &str, filter: &Filter) -> BackendResult<Vec<Record>> {
        self.enter(Operation::Select).await?;
        Ok(self
            .rows(table)
            .into_iter()
            .filter(|r| filter.matches(r))
            .collect())
    }

    async fn insert(&self, table: &str, records: Vec<Record>) -> BackendResult<Vec<Record>> {
        self.enter(Operation::Insert).await?;
        let inserted = {
            let mut inner = self.inner.lock();
            let mut inserted = Vec::with_capacity(records.len());
            for mut record in records {
                if !record.contains_key("id") {
                    let next = inner.next_row_id.entry(table.to_string()).or_insert(0);
                    *next += 1;
                    record.insert("id".to_string(), Value::from(*next));
                }
                inserted.push(record);
            }
            inner
                .tables
                .entry(table.to_string())
                .or_default()
                .extend(inserted.iter().cloned());
            inserted
        };
        for record in &inserted {
            self.emit_realtime(RealtimeEvent::insert(table, record.clone()));
        }
        Ok(inserted)
    }

    async fn update(
        &self,
        table: &str,
        patch: &Record,
        filter: &Filter,
    ) -> BackendResult<Vec<Record>> {
        self.enter(Operation::Update).await?;
        let changes = {
            let mut inner = self.inner.lock();
            let rows = inner.tables.entry(table.to_string()).or_default();
            let mut changes = Vec::new();
            for row in rows.iter_mut().filter(|r| filter.matches(r)) {
                let old = row.clone();
                for (column, value) in patch {
                    row.insert(column.clone(), value.clone());
                }
                changes.push((old, row.clone()));
            }
            changes
        };
        for (old, new) in &changes {
            self.emit_realtime(RealtimeEvent::update(table, Some(old.clone()), new.clone()));
        }
        Ok(changes.into_iter().map(|(_, new)| new).collect())
    }

    async fn delete(&self, table: &str, filter: &Filter) -> BackendResult<Vec<Record>> {
        self.enter(Operation::Delete).await?;
        let deleted = {
            let mut inner = self.inner.lock();
            let rows = inner.tables.entry(table.to_string()).or_default();
            let (deleted, kept): (Vec<Record>, Vec<Record>) =
                rows.drain(..).partition(|r| filter.matches(r));
            *rows = kept;
            deleted
        };
        for record in &deleted {
            self.emit_realtime(RealtimeEvent::delete(table, record.clone()));
        }
        Ok(deleted)
    }
}

impl RealtimeClient for MemoryBackend {
    fn open_subscription(
        &self,
        table: &str,
        trigger: TriggerClass,
        callback: RealtimeCallback,
    ) -> SubscriptionId {
        let mut inner = self.inner.lock();
        inner.next_handle += 1;
        inner.opened_subscriptions += 1;
        let id = inner.next_handle;
        inner.realtime.insert(
            id,
            RealtimeEntry {
                table: table.to_string(),
                trigger,
                callback,
            },
        );
        SubscriptionId(id)
    }

    fn close_subscription(&self, id: SubscriptionId) {
        // Drop the callback outside the lock; it may own channel senders.
        let removed = {
            let mut inner = self.inner.lock();
            let removed = inner.realtime.remove(&id.0);
            if removed.is_some() {
                inner.closed_subscriptions += 1;
            }
            removed
        };
        drop(removed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::row;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn insert_assigns_ids() {
        let backend = MemoryBackend::new();
        let rows = backend
            .insert("users", vec![row(json!({ "email": "a@x.com" }))])
            .await
            .unwrap();
        assert_eq!(rows[0].get("id"), Some(&json!(1)));
        assert_eq!(backend.rows("users").len(), 1);
        assert_eq!(backend.calls(Operation::Insert), 1);
    }

    #[tokio::test]
    async fn update_and_delete_by_filter() {
        let backend = MemoryBackend::new();
        backend.seed(
            "t",
            vec![row(json!({ "id": 1, "n": 1 })), row(json!({ "id": 2, "n": 2 }))],
        );

        let filter = Filter::Match(row(json!({ "id": 2 })));
        let updated = backend
            .update("t", &row(json!({ "n": 20 })), &filter)
            .await
            .unwrap();
        assert_eq!(updated, vec![row(json!({ "id": 2, "n": 20 }))]);

        let deleted = backend.delete("t", &filter).await.unwrap();
        assert_eq!(deleted.len(), 1);
        assert_eq!(backend.rows("t"), vec![row(json!({ "id": 1, "n": 1 }))]);
    }

    #[tokio::test]
    async fn injected_failure() {
        let backend = MemoryBackend::new();
        backend.fail(Operation::Select, BackendError::new("down"));
        let err = backend.select("t", &Filter::All).await.unwrap_err();
        assert_eq!(err.message, "down");

        backend.clear_failure(Operation::Select);
        assert!(backend.select("t", &Filter::All).await.is_ok());
        assert_eq!(backend.calls(Operation::Select), 2);
    }

    #[tokio::test]
    async fn sign_in_flow_fires_auth_events() {
        let backend = MemoryBackend::new();
        backend.register("a@x.com", "secret123");

        let events = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&events);
        backend.on_auth_state_change(Arc::new(move |_: AuthEvent, _: Option<Session>| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        let bad = backend
            .sign_in(&Credentials::new("a@x.com", "wrong"))
            .await
            .unwrap_err();
        assert_eq!(bad.status, Some(400));
        assert_eq!(events.load(Ordering::SeqCst), 0);

        backend
            .sign_in(&Credentials::new("a@x.com", "secret123"))
            .await
            .unwrap();
        assert!(backend.session().unwrap().is_some());
        assert_eq!(events.load(Ordering::SeqCst), 1);

        backend.sign_out().await.unwrap();
        assert!(backend.session().unwrap().is_none());
        assert_eq!(events.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn deferred_auth_events_fire_on_flush() {
        let backend = MemoryBackend::new();
        backend.register("a@x.com", "secret123");
        backend.defer_auth_events(true);

        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        backend.on_auth_state_change(Arc::new(move |event: AuthEvent, _: Option<Session>| {
            sink.lock().push(event);
        }));

        backend
            .sign_in(&Credentials::new("a@x.com", "secret123"))
            .await
            .unwrap();
        backend.sign_out().await.unwrap();
        assert!(seen.lock().is_empty());

        backend.flush_auth_events();
        assert_eq!(*seen.lock(), vec![AuthEvent::SignedIn, AuthEvent::SignedOut]);
    }

    #[tokio::test]
    async fn sign_up_rejects_duplicates() {
        let backend = MemoryBackend::new();
        let creds = Credentials::new("a@x.com", "secret123");
        backend.sign_up(&creds).await.unwrap();
        let err = backend.sign_up(&creds).await.unwrap_err();
        assert_eq!(err.message, "User already registered");
    }

    #[tokio::test]
    async fn realtime_respects_trigger_and_table() {
        let backend = MemoryBackend::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&hits);
        let id = backend.open_subscription(
            "t",
            TriggerClass::Delete,
            Arc::new(move |_: RealtimeEvent| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        backend.insert("t", vec![row(json!({}))]).await.unwrap();
        backend.insert("other", vec![row(json!({}))]).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        backend.delete("t", &Filter::All).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        backend.close_subscription(id);
        backend.close_subscription(id);
        assert_eq!(backend.open_subscriptions(), 0);
        assert_eq!(backend.subscriptions_closed(), 1);
    }
}
