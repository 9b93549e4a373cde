//! # rowstate
//!
//! Reactive state containers over a hosted backend.
//!
//! This crate wraps asynchronous backend calls into observable containers
//! with a uniform status shape, so a UI can follow state transitions instead
//! of juggling futures and error branches:
//! - [`SessionTracker`]: the current authentication session
//! - [`RegistrationFlow`]: a one-shot sign-up attempt
//! - [`RecordController`]: create/read/update/delete of one record
//! - [`QuerySubscription`]: a filtered result set kept live by realtime events
//!
//! All four are built by a [`StoreFactory`] bound to one backend client and
//! one [`StoreConfig`].
//!
//! ## Key Invariants
//!
//! - Every operation writes `Pending` before its backend call and exactly one
//!   terminal state after it
//! - Errors are reported twice: returned to the caller and written into the
//!   container
//! - Nothing is retried
//! - Update and delete only run after the match pattern resolves to exactly
//!   one row
//!
//! ## Example
//!
//! ```rust,ignore
//! use rowstate_core::{StoreConfig, StoreFactory};
//!
//! let factory = StoreFactory::new(client, StoreConfig::default());
//! let users = factory.record_store("users");
//! let _sub = users.subscribe(|status| println!("{}", status.tag()));
//! users.create(new_user).await?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cell;
mod config;
mod error;
mod factory;
mod gate;
mod log;
mod query;
mod record;
mod registration;
mod session;
mod status;

pub use config::{Consistency, StoreConfig};
pub use error::{StoreError, StoreResult};
pub use factory::StoreFactory;
pub use log::{LogLevel, Logger, ParseLogLevelError};
pub use query::QuerySubscription;
pub use record::RecordController;
pub use registration::RegistrationFlow;
pub use session::SessionTracker;
pub use status::{SessionState, SessionTag, Status, StatusTag};

pub use rowstate_client::{BackendClient, BackendError, Filter, QueryFilter, Record, TriggerClass};
pub use rowstate_store::{Changes, Subscription};
