//! Provider failover
//!
//! Composes the circuit breaker and the error classifier: run the primary
//! call, and substitute the fallback when the primary's circuit is open
//! or the primary fails transiently.

mod orchestrator;
mod types;

#[cfg(test)]
mod tests;

pub use orchestrator::FailoverOrchestrator;
pub use types::{
    FailoverConfig, FailoverError, FailoverEvent, FailoverOptions, FailoverOutcome, FailoverReason,
    ProviderTier,
};
