//! Circuit breaker pattern for provider health
//!
//! Stops sending traffic to a provider after repeated failures and lets a
//! single probe through once the cool-down has passed.

mod breaker;
mod types;


// Re-export all public items
pub use breaker::CircuitBreaker;
pub use types::{CircuitState, FAILURE_THRESHOLD, HealthSnapshot, RECOVERY_TIMEOUT};
