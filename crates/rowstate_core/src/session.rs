//! Session tracking.

use crate::error::{StoreError, StoreResult};
use crate::log::Logger;
use crate::status::SessionState;
use parking_lot::Mutex;
use rowstate_client::{AuthEvent, BackendClient, Credentials, ListenerId, Session, User};
use rowstate_store::{Changes, Subscription, Writable};
use std::sync::Arc;

const SCOPE: &str = "session store";

/// Projects the backend's authentication state into an observable.
///
/// The tracker probes the backend once when built and again on every
/// auth-state-change notification. The notification listener is owned by the
/// tracker: it stays registered regardless of how many observers are
/// attached and is removed by [`SessionTracker::close`] or on drop.
///
/// `signin` and `signout` do not write the terminal state on success. The
/// backend's auth-state-change notification does. A resolved `signin` thus
/// does not guarantee the tracker already shows [`SessionState::SignedIn`];
/// callers that need that wait on the tracker:
///
/// ```rust,ignore
/// tracker.signin(email, password).await?;
/// tracker.wait_for(|s| matches!(s, SessionState::SignedIn(_))).await;
/// ```
pub struct SessionTracker {
    store: Writable<SessionState>,
    client: Arc<dyn BackendClient>,
    logger: Logger,
    listener: Mutex<Option<ListenerId>>,
}

/// Classifies the backend's current session.
fn probe(client: &dyn BackendClient, logger: Logger) -> SessionState {
    match client.session() {
        Ok(Some(session)) => SessionState::SignedIn(session),
        Ok(None) => SessionState::SignedOut,
        Err(e) => {
            let err = StoreError::Probe(e);
            logger.err(SCOPE, &err);
            SessionState::Error(err)
        }
    }
}

impl SessionTracker {
    pub(crate) fn new(client: Arc<dyn BackendClient>, logger: Logger) -> Self {
        let store = Writable::new(probe(client.as_ref(), logger));
        logger.info(SCOPE, "initialized");

        // Weak, so the backend holding this callback does not keep itself alive.
        let weak = Arc::downgrade(&client);
        let target = store.clone();
        let id = client.on_auth_state_change(Arc::new(move |event: AuthEvent, _session: Option<Session>| {
            let Some(client) = weak.upgrade() else {
                return;
            };
            logger.log(SCOPE, format_args!("detected {event} event"));
            let current = probe(client.as_ref(), logger);
            let tag = current.tag();
            target.set(current);
            logger.log(SCOPE, format_args!("state set to {tag} and data updated"));
        }));

        Self {
            store,
            client,
            logger,
            listener: Mutex::new(Some(id)),
        }
    }

    /// Signs in with email and password.
    ///
    /// Writes `Pending`, then `Error` on failure. On success the state is left
    /// to the auth-state-change listener.
    pub async fn signin(&self, email: &str, password: &str) -> StoreResult<User> {
        self.logger
            .log(SCOPE, format_args!("signin for {email} triggered"));
        self.store.set(SessionState::Pending);
        self.logger.log(SCOPE, "state set to pending");

        match self
            .client
            .sign_in(&Credentials::new(email, password))
            .await
        {
            Ok(user) => Ok(user),
            Err(e) => Err(self.fail(e.into())),
        }
    }

    /// Signs out the current session.
    ///
    /// Returns [`StoreError::NotSignedIn`] without contacting the backend or
    /// touching the state if no session is shown. On success the state is left
    /// to the auth-state-change listener.
    pub async fn signout(&self) -> StoreResult<()> {
        let email = match self.store.get() {
            SessionState::SignedIn(session) => session.user.email,
            _ => {
                let err = StoreError::NotSignedIn;
                self.logger.err(SCOPE, &err);
                return Err(err);
            }
        };
        self.logger
            .log(SCOPE, format_args!("signout for {email} triggered"));
        self.store.set(SessionState::Pending);
        self.logger.log(SCOPE, "state set to pending");

        self.client
            .sign_out()
            .await
            .map_err(|e| self.fail(e.into()))
    }

    /// Forces `SignedOut` locally without contacting the backend.
    pub fn reset(&self) {
        self.logger.log(SCOPE, "reset triggered");
        self.store.set(SessionState::SignedOut);
        self.logger
            .log(SCOPE, "state set to signed-out and data cleared");
    }

    /// Removes the auth-state-change listener.
    ///
    /// The state stops following the backend afterwards. Calling it again is
    /// a no-op.
    pub fn close(&self) {
        if let Some(id) = self.listener.lock().take() {
            self.client.remove_auth_listener(id);
            self.logger.info(SCOPE, "auth listener removed");
        }
    }

    /// Returns true until [`SessionTracker::close`] is called.
    pub fn is_listening(&self) -> bool {
        self.listener.lock().is_some()
    }

    /// Attaches an observer. See [`Writable::subscribe`].
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&SessionState) + Send + Sync + 'static,
    {
        self.store.subscribe(observer)
    }

    /// Returns the current state.
    pub fn get(&self) -> SessionState {
        self.store.get()
    }

    /// Returns an ordered stream of states.
    pub fn changes(&self) -> Changes<SessionState> {
        self.store.changes()
    }

    /// Waits for a state satisfying `pred`.
    pub async fn wait_for<P>(&self, pred: P) -> SessionState
    where
        P: FnMut(&SessionState) -> bool,
    {
        self.store.wait_for(pred).await
    }

    fn fail(&self, err: StoreError) -> StoreError {
        self.store.set(SessionState::Error(err.clone()));
        self.logger.err(SCOPE, "state set to error");
        self.logger.err(SCOPE, &err);
        err
    }
}

impl Drop for SessionTracker {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for SessionTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionTracker")
            .field("state", &self.store.get().tag())
            .field("listening", &self.is_listening())
            .finish()
    }
}
