//! Rate limiting per caller identifier
//!
//! Fixed-window counters plus an optional minimum spacing between
//! consecutive requests, backed by a shared store or by bounded
//! in-memory tables.

mod identifier;
mod limiter;
mod types;

#[cfg(test)]
mod tests;

pub use identifier::Identifier;
pub use limiter::{LimiterBackend, RateLimiter};
pub use types::{RateLimitConfig, RateLimitDecision, RejectReason};
