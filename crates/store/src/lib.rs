// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Persistence as a capability interface, not a schema: callers depend on
//! [`traits::Store`] (or just the sub-trait they need), never on a
//! concrete database. [`InMemoryStore`] backs tests and single-node local
//! runs; `PostgresStore`, behind the `postgres` feature, backs production.

pub mod error;
pub mod in_memory;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod traits;

pub use error::StoreError;
pub use in_memory::InMemoryStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresStore;
pub use traits::{
    AuditStore, ErrorEventStore, GcStore, JobFilter, JobLogStore, JobStore, NotificationStore, Page, Store,
    TaskStore, WebhookStore, WorkerStore,
};
