//! Per-container operation ordering.

use crate::config::Consistency;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies one started operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Ticket(u64);

/// Decides whether an operation may write its outcome.
#[derive(Debug)]
pub(crate) struct OperationGate {
    mode: Consistency,
    latest: AtomicU64,
}

impl OperationGate {
    pub(crate) fn new(mode: Consistency) -> Self {
        Self {
            mode,
            latest: AtomicU64::new(0),
        }
    }

    /// Starts an operation, superseding every earlier one.
    pub(crate) fn begin(&self) -> Ticket {
        Ticket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Returns true if the operation holding `ticket` may write.
    pub(crate) fn admits(&self, ticket: Ticket) -> bool {
        match self.mode {
            Consistency::LastWriteWins => true,
            Consistency::LatestOperation => self.latest.load(Ordering::SeqCst) == ticket.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_write_wins_admits_everything() {
        let gate = OperationGate::new(Consistency::LastWriteWins);
        let first = gate.begin();
        let second = gate.begin();
        assert!(gate.admits(first));
        assert!(gate.admits(second));
    }

    #[test]
    fn latest_operation_admits_newest_only() {
        let gate = OperationGate::new(Consistency::LatestOperation);
        let first = gate.begin();
        assert!(gate.admits(first));
        let second = gate.begin();
        assert!(!gate.admits(first));
        assert!(gate.admits(second));
    }
}
