//! The status cell shared by registration, record and query containers.

use crate::config::StoreConfig;
use crate::error::StoreResult;
use crate::gate::{OperationGate, Ticket};
use crate::log::Logger;
use crate::status::Status;
use parking_lot::ReentrantMutex;
use rowstate_store::{Changes, Subscription, Writable};

/// A [`Status`] store plus the logging and ordering every operation goes
/// through.
///
/// Taking a ticket and checking one are each paired with the write they
/// guard under `write`, so a superseded outcome can never land after the
/// write of the operation that superseded it. Reentrant, since observers run
/// inside it and may start operations of their own.
pub(crate) struct StatusCell<T> {
    store: Writable<Status<T>>,
    gate: OperationGate,
    write: ReentrantMutex<()>,
    logger: Logger,
    scope: String,
}

impl<T> StatusCell<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(
        store: Writable<Status<T>>,
        config: &StoreConfig,
        logger: Logger,
        scope: String,
    ) -> Self {
        Self {
            store,
            gate: OperationGate::new(config.consistency),
            write: ReentrantMutex::new(()),
            logger,
            scope,
        }
    }

    pub(crate) fn scope(&self) -> &str {
        &self.scope
    }

    pub(crate) fn logger(&self) -> Logger {
        self.logger
    }

    /// Writes the pending status and takes a ticket.
    ///
    /// With `keep_payload`, the last success payload stays visible while the
    /// operation runs.
    pub(crate) fn begin(&self, operation: &str, keep_payload: bool) -> Ticket {
        self.logger
            .log(&self.scope, format_args!("{operation} triggered"));
        let ticket = {
            let _write = self.write.lock();
            let ticket = self.gate.begin();
            if keep_payload {
                self.store.update(Status::to_pending);
            } else {
                self.store.set(Status::Pending(None));
            }
            ticket
        };
        self.logger.log(&self.scope, "state set to pending");
        ticket
    }

    /// Writes the terminal status for `result` and hands it back.
    pub(crate) fn settle(&self, ticket: Ticket, result: StoreResult<T>, payload: &str) -> StoreResult<T> {
        let _write = self.write.lock();
        if !self.gate.admits(ticket) {
            self.logger
                .log(&self.scope, "superseded by a newer operation, outcome not written");
            return result;
        }
        match &result {
            Ok(data) => {
                self.store.set(Status::Success(data.clone()));
                self.logger.log(
                    &self.scope,
                    format_args!("state set to success and data set with {payload}"),
                );
            }
            Err(e) => {
                self.store.set(Status::Error(e.clone()));
                self.logger
                    .err(&self.scope, "state set to error and data set with error");
                self.logger.err(&self.scope, e);
            }
        }
        result
    }

    /// Forces idle, superseding any operation in flight.
    pub(crate) fn reset(&self, label: &str) {
        self.logger.log(&self.scope, "reset triggered");
        {
            let _write = self.write.lock();
            self.gate.begin();
            self.store.set(Status::Idle);
        }
        self.logger
            .log(&self.scope, format_args!("state set to {label} and data cleared"));
    }

    pub(crate) fn get(&self) -> Status<T> {
        self.store.get()
    }

    pub(crate) fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&Status<T>) + Send + Sync + 'static,
    {
        self.store.subscribe(observer)
    }

    pub(crate) fn changes(&self) -> Changes<Status<T>> {
        self.store.changes()
    }

    pub(crate) async fn wait_for<P>(&self, pred: P) -> Status<T>
    where
        P: FnMut(&Status<T>) -> bool,
    {
        self.store.wait_for(pred).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Consistency;
    use crate::log::LogLevel;
    use std::sync::{Arc, Barrier};
    use std::thread;

    fn cell(consistency: Consistency) -> StatusCell<u32> {
        StatusCell::new(
            Writable::new(Status::Idle),
            &StoreConfig::default().with_consistency(consistency),
            Logger::new(LogLevel::Silent),
            "test cell".to_string(),
        )
    }

    #[test]
    fn superseded_outcome_is_returned_but_not_written() {
        let cell = cell(Consistency::LatestOperation);
        let ticket = cell.begin("op", false);
        cell.reset("idle");

        assert_eq!(cell.settle(ticket, Ok(7), "value"), Ok(7));
        assert_eq!(cell.get(), Status::Idle);
    }

    #[test]
    fn last_write_wins_writes_after_reset() {
        let cell = cell(Consistency::LastWriteWins);
        let ticket = cell.begin("op", false);
        cell.reset("idle");

        let _ = cell.settle(ticket, Ok(7), "value");
        assert_eq!(cell.get(), Status::Success(7));
    }

    #[test]
    fn reset_racing_settle_never_ends_on_stale_success() {
        for _ in 0..500 {
            let cell = Arc::new(cell(Consistency::LatestOperation));
            let ticket = cell.begin("op", false);
            let barrier = Arc::new(Barrier::new(2));

            let settler = {
                let (cell, barrier) = (Arc::clone(&cell), Arc::clone(&barrier));
                thread::spawn(move || {
                    barrier.wait();
                    let _ = cell.settle(ticket, Ok(1), "value");
                })
            };
            let resetter = {
                let (cell, barrier) = (Arc::clone(&cell), Arc::clone(&barrier));
                thread::spawn(move || {
                    barrier.wait();
                    cell.reset("idle");
                })
            };
            settler.join().unwrap();
            resetter.join().unwrap();

            // Either the settle landed first and the reset overwrote it, or
            // the reset superseded the ticket. Both end idle.
            assert_eq!(cell.get(), Status::Idle);
        }
    }
}
