//! Auth-state-change notifications.

use crate::types::Session;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Kind of auth-state change reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthEvent {
    /// A user signed in.
    SignedIn,
    /// The user signed out.
    SignedOut,
    /// The session token was refreshed.
    TokenRefreshed,
    /// The user's profile changed.
    UserUpdated,
    /// The user was deleted.
    UserDeleted,
    /// A password recovery link was followed.
    PasswordRecovery,
}

impl AuthEvent {
    /// Returns the backend's wire name for the event.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthEvent::SignedIn => "SIGNED_IN",
            AuthEvent::SignedOut => "SIGNED_OUT",
            AuthEvent::TokenRefreshed => "TOKEN_REFRESHED",
            AuthEvent::UserUpdated => "USER_UPDATED",
            AuthEvent::UserDeleted => "USER_DELETED",
            AuthEvent::PasswordRecovery => "PASSWORD_RECOVERY",
        }
    }
}

impl fmt::Display for AuthEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Callback invoked on every auth-state change.
pub type AuthCallback = Arc<dyn Fn(AuthEvent, Option<Session>) + Send + Sync>;

/// Handle identifying a registered auth listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);
