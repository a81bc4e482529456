//! Circuit breaker types and constants

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Consecutive failures that open a circuit
pub const FAILURE_THRESHOLD: u32 = 3;

/// Time an open circuit waits before letting a probe through
pub const RECOVERY_TIMEOUT: Duration = Duration::from_secs(60);

/// Circuit breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CircuitState {
    /// Circuit is closed, requests flow normally
    #[default]
    Closed,
    /// Circuit is open, the provider is bypassed
    Open,
    /// Cool-down elapsed, the next request is a probe
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Open => write!(f, "open"),
            Self::HalfOpen => write!(f, "half-open"),
        }
    }
}

/// Stored state for one provider
#[derive(Debug, Clone, Default)]
pub(crate) struct CircuitRecord {
    /// Consecutive failures since the last success
    pub failures: u32,
    /// Lifetime failures, never reset
    pub total_failures: u64,
    pub state: CircuitState,
    pub last_failure_ms: Option<u64>,
    pub last_success_ms: Option<u64>,
    pub last_reason: Option<String>,
}

impl CircuitRecord {
    /// Whether an open circuit has sat out its cool-down at `now_ms`
    pub fn cooled_down(&self, now_ms: u64) -> bool {
        let since = now_ms.saturating_sub(self.last_failure_ms.unwrap_or(0));
        u128::from(since) >= RECOVERY_TIMEOUT.as_millis()
    }

    /// State as a reader at `now_ms` would observe it
    pub fn effective_state(&self, now_ms: u64) -> CircuitState {
        match self.state {
            CircuitState::Open if self.cooled_down(now_ms) => CircuitState::HalfOpen,
            state => state,
        }
    }
}

/// Read-only view of one provider's circuit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthSnapshot {
    /// False only while the circuit is open
    pub healthy: bool,
    pub state: CircuitState,
    pub failures: u32,
    pub total_failures: u64,
    pub last_failure: Option<DateTime<Utc>>,
    pub last_success: Option<DateTime<Utc>>,
    pub last_reason: Option<String>,
}

impl HealthSnapshot {
    pub(crate) fn from_record(record: &CircuitRecord, now_ms: u64) -> Self {
        let state = record.effective_state(now_ms);
        Self {
            healthy: state != CircuitState::Open,
            state,
            failures: record.failures,
            total_failures: record.total_failures,
            last_failure: record.last_failure_ms.and_then(to_datetime),
            last_success: record.last_success_ms.and_then(to_datetime),
            last_reason: record.last_reason.clone(),
        }
    }
}

fn to_datetime(ms: u64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(i64::try_from(ms).ok()?)
}
