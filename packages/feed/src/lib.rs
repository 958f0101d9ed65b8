#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Realtime incident feed.
//!
//! An [`IncidentFeedCache`] keeps the latest full read of an
//! [`IncidentStore`] in memory and replaces it wholesale whenever the store
//! signals a change. Two stores are provided: an in-memory one for tests
//! and local development, and a Postgres one that detects changes by
//! polling a cheap table fingerprint.

pub mod cache;
pub mod store;
pub mod stores;

pub use cache::{FeedStatus, IncidentFeedCache, ListenerId};
pub use store::{ChangeNotification, IncidentStore};
pub use stores::memory::InMemoryIncidentStore;
pub use stores::postgres::PostgresIncidentStore;

use thiserror::Error;

/// Errors that can occur while reading or writing incidents.
#[derive(Debug, Error)]
pub enum FeedError {
    /// Database error from the Postgres store.
    #[error("Database error: {0}")]
    Database(#[from] civic_map_database::DbError),

    /// The store could not serve the request.
    #[error("Store error: {message}")]
    Store {
        /// Description of what went wrong.
        message: String,
    },
}
