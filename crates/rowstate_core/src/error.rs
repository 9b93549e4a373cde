//! Error types for rowstate containers.

use rowstate_client::BackendError;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use thiserror::Error;

/// Result type for container operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by container operations.
///
/// The same value is returned to the caller and written into the container.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backend reported a failure.
    #[error("{0}")]
    Backend(#[from] BackendError),

    /// The backend could not report the current session.
    #[error("session probe failed: {0}")]
    Probe(BackendError),

    /// A match pattern selected no rows.
    #[error("no record matched the pattern provided")]
    NoRecordMatched,

    /// A match pattern selected more than one row.
    #[error("multiple records match the pattern provided, but a unique match is expected ({count} matched)")]
    NonUniqueMatch {
        /// Number of rows the pattern selected.
        count: usize,
    },

    /// The backend reported success but returned no row.
    #[error("backend returned no row")]
    EmptyResponse,

    /// Sign-out was requested while no session was held.
    #[error("no signed-in session to sign out")]
    NotSignedIn,
}

impl StoreError {
    /// Returns a stable, kebab-case name for the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::Backend(_) => "backend",
            StoreError::Probe(_) => "probe",
            StoreError::NoRecordMatched => "no-record-matched",
            StoreError::NonUniqueMatch { .. } => "non-unique-match",
            StoreError::EmptyResponse => "empty-response",
            StoreError::NotSignedIn => "not-signed-in",
        }
    }

    /// Returns the backend error this wraps, if any.
    pub fn backend_error(&self) -> Option<&BackendError> {
        match self {
            StoreError::Backend(e) | StoreError::Probe(e) => Some(e),
            _ => None,
        }
    }

    /// Returns true if the error was produced locally rather than by the
    /// backend.
    pub fn is_synthesized(&self) -> bool {
        self.backend_error().is_none()
    }
}

impl Serialize for StoreError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("StoreError", 2)?;
        state.serialize_field("kind", self.kind())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}
