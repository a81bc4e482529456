//! Counter storage shared by the rate limiter and the spending guard
//!
//! The window algorithms are written once against [`CounterStore`]. When
//! several host processes must agree on rate-limit and spend state, a
//! distributed implementation (backed by any key-value service with
//! atomic increment-with-expiry) is plugged in; otherwise the in-process
//! [`LocalCounterStore`] backs the same interface.
//!
//! Every operation is a single atomic step on the store side. Callers
//! never read a counter, modify it locally and write it back.

mod guarded;
mod memory;

#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub use guarded::GuardedStore;
pub use memory::LocalCounterStore;

/// Deadline applied to each shared store call unless configured otherwise
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_millis(250);

/// Where counters live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendMode {
    /// Shared store, consistent across every host process
    Distributed,
    /// Process-local tables
    InMemory,
}

impl std::fmt::Display for BackendMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Distributed => write!(f, "distributed"),
            Self::InMemory => write!(f, "in-memory"),
        }
    }
}

/// Result of a bounded fixed-window increment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowHit {
    /// Count after this hit (unchanged when rejected)
    pub count: u64,
    /// Whether the hit was counted
    pub accepted: bool,
    /// Time until the window resets
    pub resets_in: Duration,
}

/// Accumulated amount in a rolling window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowTotal {
    pub total: f64,
    pub resets_in: Duration,
}

/// Counter store failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("counter store unavailable: {0}")]
    Unavailable(String),
    #[error("counter store call timed out after {0:?}")]
    Timeout(Duration),
}

/// Atomic counter primitives.
///
/// Keys that have passed their expiry behave as absent.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Count one hit in the fixed window at `key`.
    ///
    /// Starts a fresh window (count 1) when the key is absent or expired.
    /// A hit that would take the count past `limit` is rejected and not
    /// counted.
    async fn hit(&self, key: &str, limit: u64, window: Duration) -> Result<WindowHit, StoreError>;

    /// Add `amount` to the rolling total at `key`, starting a new window
    /// when the previous one has elapsed
    async fn add(&self, key: &str, amount: f64, window: Duration)
    -> Result<WindowTotal, StoreError>;

    /// Current total at `key`, if a window is live
    async fn total(&self, key: &str) -> Result<Option<WindowTotal>, StoreError>;

    /// Store `value` with a time-to-live and return the previous live value
    async fn swap(&self, key: &str, value: u64, ttl: Duration) -> Result<Option<u64>, StoreError>;

    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Delete every key beginning with `prefix`
    async fn delete_prefix(&self, prefix: &str) -> Result<(), StoreError>;
}

pub(crate) fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
