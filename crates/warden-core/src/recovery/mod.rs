//! Provider recovery and admission control
//!
//! This module provides the per-request safety machinery:
//! - Error classification (provider-transient vs application errors)
//! - Circuit breaker per provider
//! - Fixed-window rate limiting with burst protection
//! - Hourly and daily spend guarding

pub mod circuit_breaker;
pub mod classifier;
pub mod rate_limiter;
pub mod spending;

pub use circuit_breaker::{CircuitBreaker, CircuitState, HealthSnapshot};
pub use classifier::{ErrorClass, StreamErrorKind, classify_error, is_provider_error};
pub use rate_limiter::{Identifier, RateLimitConfig, RateLimitDecision, RateLimiter};
pub use spending::{SpendRecord, SpendingGuard, SpendingStatus};
