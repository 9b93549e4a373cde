//! # rowstate client contract
//!
//! The capability surface rowstate consumes from a hosted backend:
//! - Authentication: current session, sign-in, sign-up, sign-out and
//!   auth-state-change notifications
//! - Table access: select, insert, update and delete over rows
//! - Realtime: per-table change subscriptions
//!
//! Implementations live outside this crate. `rowstate_testkit` provides an
//! in-memory one.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod auth;
mod client;
mod error;
mod filter;
mod realtime;
mod types;

pub use auth::{AuthCallback, AuthEvent, ListenerId};
pub use client::{AuthClient, BackendClient, RealtimeClient, TableClient};
pub use error::{BackendError, BackendResult};
pub use filter::{Condition, Filter, FilterError, Operator, QueryFilter};
pub use realtime::{
    ChangeKind, ParseTriggerError, RealtimeCallback, RealtimeEvent, SubscriptionId, TriggerClass,
};
pub use types::{Credentials, Record, Session, User};
