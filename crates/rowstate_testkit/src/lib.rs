//! # rowstate testkit
//!
//! Test utilities for rowstate.
//!
//! This crate provides:
//! - [`MemoryBackend`]: an in-memory implementation of the backend client
//!   contract with call counters, failure injection and per-call latency
//! - Fixtures for rows, users and tracing setup
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rowstate_testkit::prelude::*;
//!
//! #[tokio::test]
//! async fn reads_a_seeded_row() {
//!     let backend = MemoryBackend::new();
//!     backend.seed("users", vec![row(json!({ "id": 1 }))]);
//!     // ... build containers against Arc::new(backend)
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod memory;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::memory::*;
    pub use serde_json::json;
}

pub use fixtures::*;
pub use memory::*;
