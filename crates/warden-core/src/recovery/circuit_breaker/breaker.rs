//! Per-provider circuit breaker

use super::types::{CircuitRecord, CircuitState, FAILURE_THRESHOLD, HealthSnapshot};
use crate::clock::{Clock, system_clock};
use crate::store::BackendMode;
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Circuit breaker table covering every provider.
///
/// Records are created on the first failure and live until
/// [`reset_all_circuits`](Self::reset_all_circuits). Each mutation holds
/// the provider's shard lock for its whole read-modify-write and never
/// suspends, so interleaved requests cannot lose updates.
///
/// The open to half-open transition is computed when the circuit is read;
/// there is no background timer.
#[derive(Debug)]
pub struct CircuitBreaker {
    circuits: DashMap<String, CircuitRecord>,
    clock: Arc<dyn Clock>,
}

impl CircuitBreaker {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            circuits: DashMap::new(),
            clock,
        }
    }

    /// Whether requests to `provider` should be skipped.
    ///
    /// An open circuit whose cool-down has elapsed flips to half-open here
    /// and lets the caller through as a probe. Unknown providers are
    /// treated as closed.
    pub fn is_circuit_open(&self, provider: &str) -> bool {
        let Some(mut record) = self.circuits.get_mut(provider) else {
            return false;
        };
        match record.state {
            CircuitState::Closed | CircuitState::HalfOpen => false,
            CircuitState::Open => {
                if !record.cooled_down(self.clock.now_ms()) {
                    return true;
                }
                record.state = CircuitState::HalfOpen;
                tracing::info!(
                    provider = %provider,
                    failures = record.failures,
                    "Circuit breaker transitioning to half-open"
                );
                false
            }
        }
    }

    /// Count a failed call against `provider`
    pub fn record_failure(&self, provider: &str, reason: &str) {
        let now = self.clock.now_ms();
        let mut record = self.circuits.entry(provider.to_string()).or_default();

        record.failures = record.failures.saturating_add(1);
        record.total_failures = record.total_failures.saturating_add(1);
        record.last_failure_ms = Some(now);
        record.last_reason = Some(reason.to_string());

        let probe_failed = record.state == CircuitState::HalfOpen;
        if record.state != CircuitState::Open && (probe_failed || record.failures >= FAILURE_THRESHOLD)
        {
            record.state = CircuitState::Open;
            tracing::warn!(
                provider = %provider,
                failures = record.failures,
                reason = %reason,
                "Circuit breaker opened"
            );
        } else {
            tracing::debug!(
                provider = %provider,
                failures = record.failures,
                reason = %reason,
                "Provider failure recorded"
            );
        }
    }

    /// Close the circuit for `provider` after a successful call
    pub fn record_success(&self, provider: &str) {
        let Some(mut record) = self.circuits.get_mut(provider) else {
            return;
        };
        let previous = record.state;
        record.failures = 0;
        record.state = CircuitState::Closed;
        record.last_success_ms = Some(self.clock.now_ms());

        if previous != CircuitState::Closed {
            tracing::info!(provider = %provider, "Circuit breaker closed");
        }
    }

    /// Current state of `provider`'s circuit, without side effects
    pub fn state(&self, provider: &str) -> CircuitState {
        let now = self.clock.now_ms();
        self.circuits
            .get(provider)
            .map(|record| record.effective_state(now))
            .unwrap_or_default()
    }

    /// Snapshot of every provider seen so far, ordered by name
    pub fn provider_health(&self) -> BTreeMap<String, HealthSnapshot> {
        let now = self.clock.now_ms();
        self.circuits
            .iter()
            .map(|entry| {
                (
                    entry.key().clone(),
                    HealthSnapshot::from_record(entry.value(), now),
                )
            })
            .collect()
    }

    /// Forget every circuit
    pub fn reset_all_circuits(&self) {
        self.circuits.clear();
        tracing::info!("All circuit breakers reset");
    }

    /// Circuit state is always kept per process
    pub fn mode(&self) -> BackendMode {
        BackendMode::InMemory
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(system_clock())
    }
}
