//! Container construction.

use crate::config::StoreConfig;
use crate::log::Logger;
use crate::query::QuerySubscription;
use crate::record::RecordController;
use crate::registration::RegistrationFlow;
use crate::session::SessionTracker;
use rowstate_client::{BackendClient, Filter, TriggerClass};
use std::sync::Arc;

/// Builds containers bound to one backend client and one configuration.
///
/// The client is shared by every container the factory builds; each call
/// returns an independent container.
///
/// # Example
///
/// ```rust,ignore
/// use rowstate_core::{LogLevel, QueryFilter, StoreConfig, StoreFactory, TriggerClass};
///
/// let factory = StoreFactory::new(client, StoreConfig::new().with_log(LogLevel::Info));
/// let session = factory.session_store();
/// let todos = factory
///     .query_store("todos", "done.is.false".parse::<QueryFilter>()?, TriggerClass::All)
///     .await;
/// ```
#[derive(Clone)]
pub struct StoreFactory {
    client: Arc<dyn BackendClient>,
    config: StoreConfig,
    logger: Logger,
}

impl StoreFactory {
    /// Creates a factory.
    pub fn new(client: Arc<dyn BackendClient>, config: StoreConfig) -> Self {
        let logger = Logger::new(config.log);
        logger.info("constructors", "initialized");
        Self {
            client,
            config,
            logger,
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Builds a session tracker.
    pub fn session_store(&self) -> SessionTracker {
        SessionTracker::new(Arc::clone(&self.client), self.logger)
    }

    /// Builds a registration flow.
    pub fn registration_store(&self) -> RegistrationFlow {
        RegistrationFlow::new(Arc::clone(&self.client), &self.config, self.logger)
    }

    /// Builds a record controller for `table`.
    pub fn record_store(&self, table: impl Into<String>) -> RecordController {
        RecordController::new(
            Arc::clone(&self.client),
            &self.config,
            self.logger,
            table.into(),
        )
    }

    /// Builds a live query over `table`.
    ///
    /// Resolves once the initial fetch has settled.
    ///
    /// # Panics
    ///
    /// Panics if polled outside a tokio runtime. The container refetches on
    /// a task spawned onto the runtime it was built in.
    pub async fn query_store(
        &self,
        table: impl Into<String>,
        query: impl Into<Filter>,
        trigger: TriggerClass,
    ) -> QuerySubscription {
        QuerySubscription::open(
            Arc::clone(&self.client),
            &self.config,
            self.logger,
            table.into(),
            query.into(),
            trigger,
        )
        .await
    }
}

impl std::fmt::Debug for StoreFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreFactory")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
