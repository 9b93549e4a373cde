//! Test fixtures.

use rowstate_client::{Record, Session, User};
use serde_json::Value;
use std::sync::Once;
use std::time::Duration;

/// Installs a `tracing` subscriber once per process.
///
/// Honors `RUST_LOG`; defaults to `rowstate=debug`. Output goes through the
/// test writer so it only shows for failing tests.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("rowstate=debug"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// Converts a JSON object into a row.
///
/// # Panics
///
/// Panics if `value` is not an object.
pub fn row(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        other => panic!("row fixture must be a JSON object, got {other}"),
    }
}

/// Builds a user with a deterministic ID derived from the email.
pub fn user(email: &str) -> User {
    User {
        id: format!("user-{email}"),
        email: email.to_string(),
    }
}

/// Builds a session for `user`.
pub fn session_for(user: &User) -> Session {
    Session {
        access_token: format!("token-{}", user.id),
        user: user.clone(),
    }
}

/// Polls `cond` until it holds.
///
/// # Panics
///
/// Panics if `cond` still fails after two seconds.
pub async fn eventually<F>(mut cond: F)
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !cond() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not met within 2s"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn row_from_object() {
        let r = row(json!({ "id": 1 }));
        assert_eq!(r.get("id"), Some(&json!(1)));
    }

    #[test]
    #[should_panic(expected = "must be a JSON object")]
    fn row_rejects_non_object() {
        row(json!([1, 2]));
    }

    #[tokio::test]
    async fn eventually_returns_once_true() {
        let mut polls = 0;
        eventually(|| {
            polls += 1;
            polls >= 3
        })
        .await;
        assert_eq!(polls, 3);
    }

    #[test]
    fn session_carries_user() {
        let u = user("a@x.com");
        assert_eq!(session_for(&u).user, u);
    }
}
