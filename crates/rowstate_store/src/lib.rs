//! # rowstate store
//!
//! Observable value containers.
//!
//! A [`Writable`] holds one value and notifies every attached observer each
//! time the value is replaced. Observers receive the current value as soon as
//! they attach, then every later value in write order.
//!
//! A store can carry a start notifier: it runs when the first observer
//! attaches and returns a [`Teardown`] that runs when the last observer
//! detaches. Containers use this to hold backend resources only while
//! somebody is watching.
//!
//! ```
//! use rowstate_store::Writable;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! let seen = Arc::new(AtomicUsize::new(0));
//! let store = Writable::new(1usize);
//!
//! let sink = Arc::clone(&seen);
//! let sub = store.subscribe(move |v: &usize| sink.store(*v, Ordering::SeqCst));
//! assert_eq!(seen.load(Ordering::SeqCst), 1);
//!
//! store.set(7);
//! assert_eq!(seen.load(Ordering::SeqCst), 7);
//! sub.unsubscribe();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod changes;
mod writable;

pub use changes::Changes;
pub use writable::{Subscription, Teardown, Writable};
