//! Status envelopes held by containers.
//!
//! Each variant carries only the data valid for it: a success carries the
//! payload, an error carries the error, and idle carries nothing.

use crate::error::StoreError;
use rowstate_client::Session;
use serde::Serialize;
use std::fmt;

/// Status of a registration, record or query container.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "data", rename_all = "kebab-case")]
pub enum Status<T> {
    /// No operation has run, or the container was reset.
    Idle,
    /// An operation is in flight. Carries the last successful payload, if the
    /// container keeps one across refreshes.
    Pending(Option<T>),
    /// The last operation succeeded.
    Success(T),
    /// The last operation failed.
    Error(StoreError),
}

/// Tag of a [`Status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusTag {
    /// `idle`
    Idle,
    /// `pending`
    Pending,
    /// `success`
    Success,
    /// `error`
    Error,
}

impl StatusTag {
    /// Returns the tag name.
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusTag::Idle => "idle",
            StatusTag::Pending => "pending",
            StatusTag::Success => "success",
            StatusTag::Error => "error",
        }
    }
}

impl fmt::Display for StatusTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<T> Status<T> {
    /// Returns the tag.
    pub fn tag(&self) -> StatusTag {
        match self {
            Status::Idle => StatusTag::Idle,
            Status::Pending(_) => StatusTag::Pending,
            Status::Success(_) => StatusTag::Success,
            Status::Error(_) => StatusTag::Error,
        }
    }

    /// Returns true while an operation is in flight.
    pub fn is_pending(&self) -> bool {
        matches!(self, Status::Pending(_))
    }

    /// Returns true for success and error.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Success(_) | Status::Error(_))
    }

    /// Returns the success payload.
    pub fn data(&self) -> Option<&T> {
        match self {
            Status::Success(data) => Some(data),
            _ => None,
        }
    }

    /// Returns the error.
    pub fn error(&self) -> Option<&StoreError> {
        match self {
            Status::Error(e) => Some(e),
            _ => None,
        }
    }
}

impl<T: Clone> Status<T> {
    /// Returns the pending status that keeps this status's payload.
    pub fn to_pending(&self) -> Status<T> {
        match self {
            Status::Success(data) => Status::Pending(Some(data.clone())),
            Status::Pending(last) => Status::Pending(last.clone()),
            Status::Idle | Status::Error(_) => Status::Pending(None),
        }
    }
}

/// Status of a [`crate::SessionTracker`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "data", rename_all = "kebab-case")]
pub enum SessionState {
    /// No session.
    SignedOut,
    /// A session is active.
    SignedIn(Session),
    /// A sign-in or sign-out is in flight.
    Pending,
    /// The last probe or auth call failed.
    Error(StoreError),
}

/// Tag of a [`SessionState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionTag {
    /// `signed-out`
    SignedOut,
    /// `signed-in`
    SignedIn,
    /// `pending`
    Pending,
    /// `error`
    Error,
}

impl SessionTag {
    /// Returns the tag name.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionTag::SignedOut => "signed-out",
            SessionTag::SignedIn => "signed-in",
            SessionTag::Pending => "pending",
            SessionTag::Error => "error",
        }
    }
}

impl fmt::Display for SessionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl SessionState {
    /// Returns the tag.
    pub fn tag(&self) -> SessionTag {
        match self {
            SessionState::SignedOut => SessionTag::SignedOut,
            SessionState::SignedIn(_) => SessionTag::SignedIn,
            SessionState::Pending => SessionTag::Pending,
            SessionState::Error(_) => SessionTag::Error,
        }
    }

    /// Returns the active session.
    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionState::SignedIn(session) => Some(session),
            _ => None,
        }
    }

    /// Returns the error.
    pub fn error(&self) -> Option<&StoreError> {
        match self {
            SessionState::Error(e) => Some(e),
            _ => None,
        }
    }
}
