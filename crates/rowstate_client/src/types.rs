//! Value types exchanged with the backend.

use serde::{Deserialize, Serialize};

/// A row: column name to value.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// An authenticated identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Backend-assigned user ID.
    pub id: String,
    /// Email the user signed up with.
    pub email: String,
}

/// An authenticated session.
///
/// Sessions are owned by the backend. rowstate reads them and never builds
/// one itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Bearer token for the session.
    pub access_token: String,
    /// The signed-in user.
    pub user: User,
}

/// Email/password credentials.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Account email.
    pub email: String,
    /// Account password.
    pub password: String,
}

impl Credentials {
    /// Creates credentials.
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}
