//! Backend client traits.

use async_trait::async_trait;

use crate::auth::{AuthCallback, ListenerId};
use crate::error::BackendResult;
use crate::filter::Filter;
use crate::realtime::{RealtimeCallback, SubscriptionId, TriggerClass};
use crate::types::{Credentials, Record, Session, User};

/// Authentication surface of a backend.
#[async_trait]
pub trait AuthClient: Send + Sync {
    /// Returns the current session, if any.
    ///
    /// This reads locally cached state and does not suspend. An `Err` means
    /// the backend could not determine the session at all.
    fn session(&self) -> BackendResult<Option<Session>>;

    /// Signs in with email and password.
    async fn sign_in(&self, credentials: &Credentials) -> BackendResult<User>;

    /// Creates an account.
    async fn sign_up(&self, credentials: &Credentials) -> BackendResult<User>;

    /// Ends the current session.
    async fn sign_out(&self) -> BackendResult<()>;

    /// Registers a callback for auth-state changes.
    ///
    /// Implementations must not hold internal locks while invoking callbacks;
    /// callbacks typically call [`AuthClient::session`].
    fn on_auth_state_change(&self, callback: AuthCallback) -> ListenerId;

    /// Removes a previously registered callback. Unknown IDs are ignored.
    fn remove_auth_listener(&self, id: ListenerId);
}

/// Row access surface of a backend.
#[async_trait]
pub trait TableClient: Send + Sync {
    /// Returns the rows of `table` selected by `filter`.
    async fn select(&self, table: &str, filter: &Filter) -> BackendResult<Vec<Record>>;

    /// Inserts rows and returns them as stored.
    async fn insert(&self, table: &str, records: Vec<Record>) -> BackendResult<Vec<Record>>;

    /// Applies `patch` to every row selected by `filter` and returns the
    /// updated rows.
    async fn update(&self, table: &str, patch: &Record, filter: &Filter)
        -> BackendResult<Vec<Record>>;

    /// Deletes every row selected by `filter` and returns the deleted rows.
    async fn delete(&self, table: &str, filter: &Filter) -> BackendResult<Vec<Record>>;
}

/// Realtime surface of a backend.
pub trait RealtimeClient: Send + Sync {
    /// Opens a subscription delivering `trigger` changes on `table`.
    fn open_subscription(
        &self,
        table: &str,
        trigger: TriggerClass,
        callback: RealtimeCallback,
    ) -> SubscriptionId;

    /// Closes a subscription and drops its callback. Unknown IDs are ignored.
    fn close_subscription(&self, id: SubscriptionId);
}

/// The full backend surface.
///
/// Implemented automatically for anything that implements the three parts.
pub trait BackendClient: AuthClient + TableClient + RealtimeClient {}

impl<T> BackendClient for T where T: AuthClient + TableClient + RealtimeClient {}
