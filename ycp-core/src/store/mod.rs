//! Durable per-pattern counters.
//!
//! The engine only ever talks to a store through the atomic primitives of
//! [`CounterStore`]. It never reads a value, modifies it locally and writes
//! it back.

pub mod memory;
pub mod postgres;

pub use memory::MemoryCounterStore;
pub use postgres::{GetCounter, IncrementCounter, PgCounterStore, ResetCounter};

use crate::events::PatternKey;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur on a single counter operation.
///
/// All of them mean the store could not be reached for that operation.
/// The engine treats them as recoverable per-match failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The operation did not finish within the configured I/O timeout
    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),

    /// The store refused the operation
    #[error("counter store unavailable: {0}")]
    Unavailable(String),
}

/// Key-value counter store with atomic per-key primitives.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Atomically add one to the counter for `key` and return the new value.
    async fn increment(&self, key: &PatternKey) -> Result<i64, StoreError>;

    /// Read the counter for `key`. A missing key reads as zero.
    async fn get(&self, key: &PatternKey) -> Result<i64, StoreError>;

    /// Atomically set the counter for `key` back to zero.
    async fn reset(&self, key: &PatternKey) -> Result<(), StoreError>;

    /// Release the underlying connections.
    async fn close(&self);
}
