//! Primary/fallback orchestration

use super::types::{
    FailoverConfig, FailoverError, FailoverEvent, FailoverOptions, FailoverOutcome, FailoverReason,
    ProviderTier,
};
use crate::clock::Clock;
use crate::recovery::circuit_breaker::CircuitBreaker;
use crate::recovery::classifier::is_provider_error;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Failover events kept for inspection
const MAX_EVENTS: usize = 100;

const DEFAULT_FALLBACK: &str = "fallback";

/// Runs a primary call and substitutes a fallback call when the primary
/// is unhealthy or fails with a provider error.
///
/// Application errors from the primary are returned unchanged and never
/// count against its circuit.
pub struct FailoverOrchestrator {
    config: FailoverConfig,
    breaker: Arc<CircuitBreaker>,
    events: Mutex<VecDeque<FailoverEvent>>,
    clock: Arc<dyn Clock>,
}

impl FailoverOrchestrator {
    pub fn new(config: FailoverConfig, breaker: Arc<CircuitBreaker>, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            breaker,
            events: Mutex::new(VecDeque::with_capacity(MAX_EVENTS)),
            clock,
        }
    }

    pub async fn execute_with_failover<T, E, P, PFut, F, FFut>(
        &self,
        primary: P,
        fallback: F,
        options: FailoverOptions,
    ) -> Result<FailoverOutcome<T>, FailoverError<E>>
    where
        P: FnOnce() -> PFut,
        PFut: Future<Output = Result<T, E>>,
        F: FnOnce() -> FFut,
        FFut: Future<Output = Result<T, E>>,
        E: std::error::Error + 'static,
    {
        let started = Instant::now();
        let primary_name = options
            .primary
            .unwrap_or_else(|| self.default_provider(0));
        let fallback_name = options
            .fallback
            .unwrap_or_else(|| self.default_provider(1));
        let timeout = options.timeout.or(self.config.call_timeout);

        if !self.config.enabled {
            return match bounded(primary(), timeout).await {
                Some(Ok(result)) => Ok(outcome(result, ProviderTier::Primary, primary_name, started)),
                Some(Err(error)) => Err(FailoverError::Call(error)),
                None => Err(FailoverError::TimedOut {
                    provider: primary_name,
                    timeout: timeout.unwrap_or_default(),
                }),
            };
        }

        let reason = if self.breaker.is_circuit_open(&primary_name) {
            tracing::debug!(provider = %primary_name, "Primary circuit open, skipping");
            FailoverReason::CircuitOpen
        } else {
            match bounded(primary(), timeout).await {
                Some(Ok(result)) => {
                    self.breaker.record_success(&primary_name);
                    return Ok(outcome(result, ProviderTier::Primary, primary_name, started));
                }
                Some(Err(error)) => {
                    if !is_provider_error(&error) {
                        return Err(FailoverError::Call(error));
                    }
                    let message = error.to_string();
                    self.breaker.record_failure(&primary_name, &message);
                    FailoverReason::ProviderError(message)
                }
                None => {
                    self.breaker
                        .record_failure(&primary_name, &timeout_message(timeout));
                    FailoverReason::Timeout
                }
            }
        };

        if self.breaker.is_circuit_open(&fallback_name) {
            tracing::error!(
                primary = %primary_name,
                fallback = %fallback_name,
                reason = %reason,
                "All providers unavailable"
            );
            return Err(FailoverError::AllProvidersUnavailable {
                primary: primary_name,
                fallback: fallback_name,
                last_error: Some(reason.to_string()),
            });
        }

        tracing::warn!(
            from = %primary_name,
            to = %fallback_name,
            reason = %reason,
            "Failing over to fallback provider"
        );
        self.push_event(FailoverEvent {
            from_provider: primary_name,
            to_provider: fallback_name.clone(),
            reason,
            at: self.now(),
        });

        match bounded(fallback(), timeout).await {
            Some(Ok(result)) => {
                self.breaker.record_success(&fallback_name);
                Ok(outcome(result, ProviderTier::Fallback, fallback_name, started))
            }
            Some(Err(error)) => {
                if is_provider_error(&error) {
                    self.breaker.record_failure(&fallback_name, &error.to_string());
                }
                Err(FailoverError::Call(error))
            }
            None => {
                self.breaker
                    .record_failure(&fallback_name, &timeout_message(timeout));
                Err(FailoverError::TimedOut {
                    provider: fallback_name,
                    timeout: timeout.unwrap_or_default(),
                })
            }
        }
    }

    /// First provider whose circuit is not open, trying `preferred` first
    /// and then the configured order
    pub fn select_healthy_provider(&self, preferred: Option<&str>) -> Option<String> {
        preferred
            .into_iter()
            .chain(
                self.config
                    .providers
                    .iter()
                    .map(String::as_str)
                    .filter(|name| Some(*name) != preferred),
            )
            .find(|name| !self.breaker.is_circuit_open(name))
            .map(str::to_string)
    }

    pub fn is_failover_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Most recent failovers, oldest first
    pub fn recent_events(&self) -> Vec<FailoverEvent> {
        self.events.lock().iter().cloned().collect()
    }

    pub fn clear_events(&self) {
        self.events.lock().clear();
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    pub fn config(&self) -> &FailoverConfig {
        &self.config
    }

    fn default_provider(&self, index: usize) -> String {
        self.config
            .providers
            .get(index)
            .cloned()
            .unwrap_or_else(|| DEFAULT_FALLBACK.to_string())
    }

    fn push_event(&self, event: FailoverEvent) {
        let mut events = self.events.lock();
        events.push_back(event);
        while events.len() > MAX_EVENTS {
            events.pop_front();
        }
    }

    fn now(&self) -> DateTime<Utc> {
        i64::try_from(self.clock.now_ms())
            .ok()
            .and_then(DateTime::from_timestamp_millis)
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for FailoverOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FailoverOrchestrator")
            .field("config", &self.config)
            .field("events", &self.events.lock().len())
            .finish_non_exhaustive()
    }
}

/// Await `call`, giving up after `timeout` when one is set
async fn bounded<T, E>(
    call: impl Future<Output = Result<T, E>>,
    timeout: Option<Duration>,
) -> Option<Result<T, E>> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, call).await.ok(),
        None => Some(call.await),
    }
}

fn outcome<T>(
    result: T,
    provider: ProviderTier,
    provider_name: String,
    started: Instant,
) -> FailoverOutcome<T> {
    FailoverOutcome {
        result,
        provider,
        provider_name,
        used_fallback: provider == ProviderTier::Fallback,
        duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
    }
}

fn timeout_message(timeout: Option<Duration>) -> String {
    format!("timed out after {:?}", timeout.unwrap_or_default())
}
