//! Fixed-window rate limiter with burst protection

use super::identifier::Identifier;
use super::types::{RateLimitConfig, RateLimitDecision, RejectReason};
use crate::cache::DEFAULT_CAPACITY;
use crate::clock::{Clock, system_clock};
use crate::error::WardenResult;
use crate::store::{
    BackendMode, CounterStore, DEFAULT_STORE_TIMEOUT, GuardedStore, LocalCounterStore, StoreError,
    duration_ms,
};
use std::sync::Arc;
use std::time::Duration;

/// Where a limiter keeps its counters and how it reacts to store failure
#[derive(Clone)]
pub struct LimiterBackend {
    /// Shared store; `None` runs purely in memory
    pub shared: Option<Arc<dyn CounterStore>>,
    /// Reject instead of falling back when the shared store fails
    pub fail_closed: bool,
    /// Deadline for each shared store call
    pub store_timeout: Duration,
    /// Capacity of the in-memory table
    pub max_entries: usize,
    pub clock: Arc<dyn Clock>,
}

impl LimiterBackend {
    pub fn in_memory(clock: Arc<dyn Clock>) -> Self {
        Self {
            shared: None,
            fail_closed: false,
            store_timeout: DEFAULT_STORE_TIMEOUT,
            max_entries: DEFAULT_CAPACITY,
            clock,
        }
    }

    pub fn distributed(shared: Arc<dyn CounterStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            shared: Some(shared),
            ..Self::in_memory(clock)
        }
    }

    pub fn with_fail_closed(mut self, fail_closed: bool) -> Self {
        self.fail_closed = fail_closed;
        self
    }

    pub fn with_store_timeout(mut self, store_timeout: Duration) -> Self {
        self.store_timeout = store_timeout;
        self
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }
}

impl Default for LimiterBackend {
    fn default() -> Self {
        Self::in_memory(system_clock())
    }
}

impl std::fmt::Debug for LimiterBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LimiterBackend")
            .field("shared", &self.shared.is_some())
            .field("fail_closed", &self.fail_closed)
            .field("store_timeout", &self.store_timeout)
            .field("max_entries", &self.max_entries)
            .finish()
    }
}

/// Per-identifier fixed-window limiter.
///
/// The window and burst algorithms are written once against
/// [`CounterStore`]. With a shared store the counts are consistent across
/// processes; when that store fails the check falls back to the local
/// table for that call, or rejects when fail-closed is enabled. Every
/// shared store call is bounded by the backend's store timeout, so a
/// stalled store counts as a failure rather than blocking the check.
pub struct RateLimiter {
    config: RateLimitConfig,
    shared: Option<Arc<dyn CounterStore>>,
    local: LocalCounterStore,
    fail_closed: bool,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig, backend: LimiterBackend) -> WardenResult<Self> {
        config.validate()?;
        let local = LocalCounterStore::new(backend.max_entries, backend.clock.clone())?;
        let timeout = backend.store_timeout;
        Ok(Self {
            config,
            shared: backend
                .shared
                .map(|store| Arc::new(GuardedStore::new(store, timeout)) as Arc<dyn CounterStore>),
            local,
            fail_closed: backend.fail_closed,
            clock: backend.clock,
        })
    }

    /// Decide whether `identifier` may proceed and count the request if so.
    ///
    /// Burst spacing is checked first and does not consume window quota.
    /// `skip_burst` (or a fingerprint identifier) bypasses it.
    pub async fn check(
        &self,
        identifier: impl Into<Identifier>,
        skip_burst: bool,
    ) -> RateLimitDecision {
        let identifier = identifier.into();
        let check_burst = !skip_burst && !identifier.skips_burst();
        let id = identifier.to_string();

        if let Some(shared) = &self.shared {
            match self.evaluate(shared.as_ref(), &id, check_burst).await {
                Ok(decision) => return self.logged(&id, decision),
                Err(error) if self.fail_closed => {
                    tracing::warn!(
                        limiter = %self.config.prefix,
                        identifier = %id,
                        error = %error,
                        "Shared rate limit store failed, rejecting (fail-closed)"
                    );
                    let retry_ms = duration_ms(self.config.window);
                    return RateLimitDecision::reject(RejectReason::StoreUnavailable, retry_ms);
                }
                Err(error) => {
                    tracing::warn!(
                        limiter = %self.config.prefix,
                        identifier = %id,
                        error = %error,
                        "Shared rate limit store failed, falling back to in-memory"
                    );
                }
            }
        }

        match self.evaluate(&self.local, &id, check_burst).await {
            Ok(decision) => self.logged(&id, decision),
            Err(error) => {
                tracing::error!(
                    limiter = %self.config.prefix,
                    error = %error,
                    "Local rate limit store failed"
                );
                RateLimitDecision::allow(0)
            }
        }
    }

    async fn evaluate(
        &self,
        store: &dyn CounterStore,
        id: &str,
        check_burst: bool,
    ) -> Result<RateLimitDecision, StoreError> {
        if let (true, Some(interval)) = (check_burst, self.config.burst_interval) {
            let now = self.clock.now_ms();
            let previous = store.swap(&self.burst_key(id), now, interval).await?;
            if let Some(last) = previous {
                let since = now.saturating_sub(last);
                let interval_ms = duration_ms(interval);
                if since < interval_ms {
                    return Ok(RateLimitDecision::reject(
                        RejectReason::Burst,
                        interval_ms - since,
                    ));
                }
            }
        }

        let limit = u64::from(self.config.max_requests);
        let hit = store
            .hit(&self.window_key(id), limit, self.config.window)
            .await?;
        if hit.accepted {
            let remaining = limit.saturating_sub(hit.count);
            Ok(RateLimitDecision::allow(
                u32::try_from(remaining).unwrap_or(u32::MAX),
            ))
        } else {
            Ok(RateLimitDecision::reject(
                RejectReason::WindowExhausted,
                duration_ms(hit.resets_in),
            ))
        }
    }

    fn logged(&self, id: &str, decision: RateLimitDecision) -> RateLimitDecision {
        if !decision.allowed {
            tracing::debug!(
                limiter = %self.config.prefix,
                identifier = %id,
                reason = ?decision.reason,
                remaining_ms = decision.remaining_ms,
                "Rate limit rejected request"
            );
        }
        decision
    }

    /// Forget the counters for one identifier
    pub async fn clear(&self, identifier: impl Into<Identifier>) {
        let id = identifier.into().to_string();
        let keys = [self.window_key(&id), self.burst_key(&id)];
        for key in &keys {
            self.local.delete_now(key);
        }
        if let Some(shared) = &self.shared {
            for key in &keys {
                if let Err(error) = shared.delete(key).await {
                    tracing::warn!(key = %key, error = %error, "Failed to clear shared rate limit key");
                }
            }
        }
    }

    /// Forget every counter belonging to this limiter
    pub async fn clear_all(&self) {
        let prefix = format!("{}:", self.config.prefix);
        self.local.delete_prefix_now(&prefix);
        if let Some(shared) = &self.shared {
            if let Err(error) = shared.delete_prefix(&prefix).await {
                tracing::warn!(
                    limiter = %self.config.prefix,
                    error = %error,
                    "Failed to clear shared rate limit keys"
                );
            }
        }
    }

    pub fn mode(&self) -> BackendMode {
        if self.shared.is_some() {
            BackendMode::Distributed
        } else {
            BackendMode::InMemory
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    fn window_key(&self, id: &str) -> String {
        format!("{}:win:{}", self.config.prefix, id)
    }

    fn burst_key(&self, id: &str) -> String {
        format!("{}:burst:{}", self.config.prefix, id)
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("config", &self.config)
            .field("mode", &self.mode())
            .field("fail_closed", &self.fail_closed)
            .finish()
    }
}
