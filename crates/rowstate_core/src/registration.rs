//! Sign-up flow.

use crate::cell::StatusCell;
use crate::config::StoreConfig;
use crate::error::StoreResult;
use crate::log::Logger;
use crate::status::Status;
use rowstate_client::{BackendClient, Credentials, User};
use rowstate_store::{Changes, Subscription, Writable};
use std::sync::Arc;

const SCOPE: &str = "registration store";

/// Projects a sign-up attempt into an observable.
///
/// Every `signup` starts from a clean `Pending(None)`; a success carries the
/// created user.
pub struct RegistrationFlow {
    cell: StatusCell<User>,
    client: Arc<dyn BackendClient>,
}

impl RegistrationFlow {
    pub(crate) fn new(client: Arc<dyn BackendClient>, config: &StoreConfig, logger: Logger) -> Self {
        let cell = StatusCell::new(Writable::new(Status::Idle), config, logger, SCOPE.to_string());
        logger.info(SCOPE, "initialized");
        Self { cell, client }
    }

    /// Creates an account.
    pub async fn signup(&self, email: &str, password: &str) -> StoreResult<User> {
        let ticket = self.cell.begin("signup", false);
        let result = self
            .client
            .sign_up(&Credentials::new(email, password))
            .await
            .map_err(Into::into);
        self.cell.settle(ticket, result, "user")
    }

    /// Forces `Idle`, regardless of any sign-up in flight.
    pub fn reset(&self) {
        self.cell.reset("idle");
    }

    /// Attaches an observer. See [`Writable::subscribe`].
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&Status<User>) + Send + Sync + 'static,
    {
        self.cell.subscribe(observer)
    }

    /// Returns the current state.
    pub fn get(&self) -> Status<User> {
        self.cell.get()
    }

    /// Returns an ordered stream of states.
    pub fn changes(&self) -> Changes<Status<User>> {
        self.cell.changes()
    }

    /// Waits for a state satisfying `pred`.
    pub async fn wait_for<P>(&self, pred: P) -> Status<User>
    where
        P: FnMut(&Status<User>) -> bool,
    {
        self.cell.wait_for(pred).await
    }
}

impl std::fmt::Debug for RegistrationFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationFlow")
            .field("state", &self.cell.get().tag())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Consistency;
    use crate::error::StoreError;
    use crate::log::LogLevel;
    use crate::status::StatusTag;
    use rowstate_client::BackendError;
    use rowstate_testkit::{MemoryBackend, Operation};
    use std::time::Duration;

    fn flow(backend: &Arc<MemoryBackend>, config: StoreConfig) -> RegistrationFlow {
        RegistrationFlow::new(backend.clone(), &config, Logger::new(LogLevel::Log))
    }

    #[tokio::test]
    async fn signup_success() {
        let backend = Arc::new(MemoryBackend::new());
        let flow = flow(&backend, StoreConfig::default());
        let mut changes = flow.changes();

        let user = flow.signup("a@x.com", "secret123").await.unwrap();
        assert_eq!(user.email, "a@x.com");

        let tags: Vec<StatusTag> = changes.drain().iter().map(Status::tag).collect();
        assert_eq!(tags, vec![StatusTag::Idle, StatusTag::Pending, StatusTag::Success]);
        assert_eq!(flow.get(), Status::Success(user));
    }

    #[tokio::test]
    async fn signup_failure_surfaces_backend_error() {
        let backend = Arc::new(MemoryBackend::new());
        let error = BackendError::new("Signups not allowed for this instance").with_status(422);
        backend.fail(Operation::SignUp, error.clone());
        let flow = flow(&backend, StoreConfig::default());

        let err = flow.signup("a@x.com", "secret123").await.unwrap_err();
        assert_eq!(err, StoreError::Backend(error));
        assert_eq!(flow.get(), Status::Error(err));
    }

    #[tokio::test]
    async fn each_signup_starts_clean() {
        let backend = Arc::new(MemoryBackend::new());
        let flow = flow(&backend, StoreConfig::default());
        flow.signup("a@x.com", "secret123").await.unwrap();

        let mut changes = flow.changes();
        flow.signup("b@x.com", "secret123").await.unwrap();
        let states = changes.drain();
        assert_eq!(states[1], Status::Pending(None));
    }

    #[tokio::test]
    async fn reset_forces_idle() {
        let backend = Arc::new(MemoryBackend::new());
        let flow = flow(&backend, StoreConfig::default());
        let _ = flow.signup("a@x.com", "short").await;
        assert!(flow.get().error().is_some());

        flow.reset();
        assert_eq!(flow.get(), Status::Idle);
    }

    #[tokio::test]
    async fn reset_supersedes_inflight_signup_when_ordered() {
        let backend = Arc::new(MemoryBackend::new());
        backend.delay_next(Operation::SignUp, Duration::from_millis(50));
        let config = StoreConfig::new().with_consistency(Consistency::LatestOperation);
        let flow = Arc::new(flow(&backend, config));

        let running = Arc::clone(&flow);
        let handle = tokio::spawn(async move { running.signup("a@x.com", "secret123").await });
        flow.wait_for(Status::is_pending).await;
        flow.reset();

        // The call still reports its own outcome.
        assert!(handle.await.unwrap().is_ok());
        assert_eq!(flow.get(), Status::Idle);
    }
}
