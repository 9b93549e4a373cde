//! Realtime change notifications.

use crate::types::Record;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// Type of row change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    /// Row was inserted.
    Insert,
    /// Row was updated.
    Update,
    /// Row was deleted.
    Delete,
}

/// Which changes a realtime subscription listens for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TriggerClass {
    /// Inserts only.
    #[serde(rename = "INSERT")]
    Insert,
    /// Updates only.
    #[serde(rename = "UPDATE")]
    Update,
    /// Deletes only.
    #[serde(rename = "DELETE")]
    Delete,
    /// Every change.
    #[default]
    #[serde(rename = "*")]
    All,
}

impl TriggerClass {
    /// Returns true if a change of `kind` fires this trigger.
    pub fn admits(&self, kind: ChangeKind) -> bool {
        matches!(
            (self, kind),
            (TriggerClass::All, _)
                | (TriggerClass::Insert, ChangeKind::Insert)
                | (TriggerClass::Update, ChangeKind::Update)
                | (TriggerClass::Delete, ChangeKind::Delete)
        )
    }

    /// Returns the backend's wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerClass::Insert => "INSERT",
            TriggerClass::Update => "UPDATE",
            TriggerClass::Delete => "DELETE",
            TriggerClass::All => "*",
        }
    }
}

impl fmt::Display for TriggerClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A trigger class name other than `INSERT`, `UPDATE`, `DELETE` or `*`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown trigger class: {0}")]
pub struct ParseTriggerError(pub String);

impl FromStr for TriggerClass {
    type Err = ParseTriggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "INSERT" => Ok(TriggerClass::Insert),
            "UPDATE" => Ok(TriggerClass::Update),
            "DELETE" => Ok(TriggerClass::Delete),
            "*" | "ALL" => Ok(TriggerClass::All),
            other => Err(ParseTriggerError(other.to_string())),
        }
    }
}

/// A single realtime notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealtimeEvent {
    /// Table the change happened in.
    pub table: String,
    /// Type of change.
    pub kind: ChangeKind,
    /// Row after the change. None for deletes.
    pub new: Option<Record>,
    /// Row before the change, when the backend reports it.
    pub old: Option<Record>,
}

impl RealtimeEvent {
    /// Creates an insert event.
    pub fn insert(table: impl Into<String>, new: Record) -> Self {
        Self {
            table: table.into(),
            kind: ChangeKind::Insert,
            new: Some(new),
            old: None,
        }
    }

    /// Creates an update event.
    pub fn update(table: impl Into<String>, old: Option<Record>, new: Record) -> Self {
        Self {
            table: table.into(),
            kind: ChangeKind::Update,
            new: Some(new),
            old,
        }
    }

    /// Creates a delete event.
    pub fn delete(table: impl Into<String>, old: Record) -> Self {
        Self {
            table: table.into(),
            kind: ChangeKind::Delete,
            new: None,
            old: Some(old),
        }
    }
}

/// Callback invoked for each realtime notification.
pub type RealtimeCallback = Arc<dyn Fn(RealtimeEvent) + Send + Sync>;

/// Handle identifying an open realtime subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_admits() {
        assert!(TriggerClass::All.admits(ChangeKind::Delete));
        assert!(TriggerClass::Insert.admits(ChangeKind::Insert));
        assert!(!TriggerClass::Insert.admits(ChangeKind::Update));
        assert!(!TriggerClass::Delete.admits(ChangeKind::Insert));
    }

    #[test]
    fn trigger_parse() {
        assert_eq!("*".parse::<TriggerClass>().unwrap(), TriggerClass::All);
        assert_eq!("insert".parse::<TriggerClass>().unwrap(), TriggerClass::Insert);
        assert_eq!(
            "upsert".parse::<TriggerClass>(),
            Err(ParseTriggerError("UPSERT".to_string()))
        );
        assert_eq!(TriggerClass::default(), TriggerClass::All);
    }
}
