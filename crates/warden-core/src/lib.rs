//! Warden Core Library
//!
//! Resilience layer that sits between an application and a set of
//! interchangeable AI completion providers. It decides which provider
//! serves a request, stops sending traffic to a failing provider, fails
//! over to a healthy alternate, caps per-caller request rates, caps total
//! spend per hour and day, and retries streaming calls that break during
//! setup.
//!
//! Request flow:
//!
//! ```text
//! caller ─▶ RateLimiter ─▶ SpendingGuard ─▶ FailoverOrchestrator ─▶ provider
//!                                              │         │
//!                                       CircuitBreaker  classifier
//!                                              │
//!                                       StreamRecovery (streaming calls)
//! ```

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod failover;
pub mod layer;
pub mod recovery;
pub mod store;
pub mod streaming;

// Re-export commonly used types
pub use cache::BoundedLruMap;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::WardenConfig;
pub use error::{UpstreamError, WardenError, WardenResult};
pub use failover::{FailoverError, FailoverOptions, FailoverOrchestrator, FailoverOutcome, ProviderTier};
pub use layer::{Admission, Warden};
pub use recovery::circuit_breaker::{CircuitBreaker, CircuitState, HealthSnapshot};
pub use recovery::classifier::{StreamErrorKind, is_provider_error};
pub use recovery::rate_limiter::{Identifier, RateLimitConfig, RateLimitDecision, RateLimiter};
pub use recovery::spending::{SpendRecord, SpendingGuard, SpendingStatus};
pub use store::{BackendMode, CounterStore, LocalCounterStore};
pub use streaming::{StreamRecoveryOptions, with_stream_recovery};
