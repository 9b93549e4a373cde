//! Single-record CRUD.

use crate::cell::StatusCell;
use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::log::Logger;
use crate::status::Status;
use rowstate_client::{BackendClient, Filter, Record};
use rowstate_store::{Changes, Subscription, Writable};
use std::sync::Arc;

/// Projects create/read/update/delete outcomes for one record of a table.
///
/// Records are addressed by a match pattern: a partial row whose columns must
/// all be equal. Read, update and delete first resolve the pattern and refuse
/// to proceed unless it selects exactly one row, so a mutation can never touch
/// zero or several rows.
pub struct RecordController {
    table: String,
    cell: StatusCell<Record>,
    client: Arc<dyn BackendClient>,
}

fn first_row(rows: Vec<Record>) -> StoreResult<Record> {
    rows.into_iter().next().ok_or(StoreError::EmptyResponse)
}

impl RecordController {
    pub(crate) fn new(
        client: Arc<dyn BackendClient>,
        config: &StoreConfig,
        logger: Logger,
        table: String,
    ) -> Self {
        let scope = format!("record store - {table}");
        let cell = StatusCell::new(Writable::new(Status::Idle), config, logger, scope);
        logger.info(cell.scope(), "initialized");
        Self {
            table,
            cell,
            client,
        }
    }

    /// Returns the table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Resolves a match pattern to exactly one row.
    async fn check_record(&self, pattern: &Record) -> StoreResult<Record> {
        self.cell.logger().log(self.cell.scope(), "checking record");
        let mut rows = self
            .client
            .select(&self.table, &Filter::Match(pattern.clone()))
            .await?;
        match rows.len() {
            0 => Err(StoreError::NoRecordMatched),
            1 => Ok(rows.remove(0)),
            count => Err(StoreError::NonUniqueMatch { count }),
        }
    }

    /// Inserts a record and returns it as stored.
    pub async fn create(&self, record: Record) -> StoreResult<Record> {
        let ticket = self.cell.begin("create record", true);
        let result = match self.client.insert(&self.table, vec![record]).await {
            Ok(rows) => first_row(rows),
            Err(e) => Err(e.into()),
        };
        self.cell.settle(ticket, result, "record")
    }

    /// Reads the one row matching `pattern`.
    pub async fn read(&self, pattern: Record) -> StoreResult<Record> {
        let ticket = self.cell.begin("read record", true);
        let result = self.check_record(&pattern).await;
        self.cell.settle(ticket, result, "record")
    }

    /// Writes `record` over the one row it matches.
    ///
    /// The record doubles as its own match pattern.
    pub async fn update(&self, record: Record) -> StoreResult<Record> {
        self.update_matching(record.clone(), record).await
    }

    /// Applies `patch` to the one row matching `pattern`.
    ///
    /// If the pattern does not resolve to exactly one row the backend update
    /// is never issued and the resolution error is surfaced.
    pub async fn update_matching(&self, pattern: Record, patch: Record) -> StoreResult<Record> {
        let ticket = self.cell.begin("update record", true);
        let result = match self.check_record(&pattern).await {
            Ok(_) => match self
                .client
                .update(&self.table, &patch, &Filter::Match(pattern))
                .await
            {
                Ok(rows) => first_row(rows),
                Err(e) => Err(e.into()),
            },
            Err(e) => Err(e),
        };
        self.cell.settle(ticket, result, "record")
    }

    /// Deletes the one row matching `record` and returns it.
    ///
    /// If the pattern does not resolve to exactly one row the backend delete
    /// is never issued and the resolution error is surfaced.
    pub async fn delete(&self, record: Record) -> StoreResult<Record> {
        let ticket = self.cell.begin("delete record", true);
        let result = match self.check_record(&record).await {
            Ok(_) => match self
                .client
                .delete(&self.table, &Filter::Match(record))
                .await
            {
                Ok(rows) => first_row(rows),
                Err(e) => Err(e.into()),
            },
            Err(e) => Err(e),
        };
        self.cell.settle(ticket, result, "record")
    }

    /// Attaches an observer. See [`Writable::subscribe`].
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&Status<Record>) + Send + Sync + 'static,
    {
        self.cell.subscribe(observer)
    }

    /// Returns the current state.
    pub fn get(&self) -> Status<Record> {
        self.cell.get()
    }

    /// Returns an ordered stream of states.
    pub fn changes(&self) -> Changes<Status<Record>> {
        self.cell.changes()
    }

    /// Waits for a state satisfying `pred`.
    pub async fn wait_for<P>(&self, pred: P) -> Status<Record>
    where
        P: FnMut(&Status<Record>) -> bool,
    {
        self.cell.wait_for(pred).await
    }
}

impl std::fmt::Debug for RecordController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordController")
            .field("table", &self.table)
            .field("state", &self.cell.get().tag())
            .finish()
    }
}
