//! Composed request gate
//!
//! [`Warden`] owns one instance of each component, wired to the same clock
//! and shared store, and checks a request in data-flow order: rate limit,
//! then spend. Provider calls then go through [`Warden::failover`].

use crate::clock::{Clock, system_clock};
use crate::config::WardenConfig;
use crate::error::{WardenError, WardenResult};
use crate::failover::FailoverOrchestrator;
use crate::recovery::circuit_breaker::CircuitBreaker;
use crate::recovery::rate_limiter::{
    Identifier, LimiterBackend, RateLimitConfig, RateLimiter, RejectReason,
};
use crate::recovery::spending::{SpendLevel, SpendingGuard};
use crate::store::{BackendMode, CounterStore};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;

/// Verdict for one incoming request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Admission {
    Allowed {
        /// Requests left in the caller's window
        remaining: Option<u32>,
    },
    RateLimited {
        retry_after_ms: u64,
        reason: Option<RejectReason>,
    },
    SpendingBlocked {
        window: String,
        spent_usd: f64,
    },
}

impl Admission {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }

    /// The error a host would surface for a spend block, if this is one
    pub fn spending_error(&self) -> Option<WardenError> {
        match self {
            Self::SpendingBlocked { window, spent_usd } => {
                Some(WardenError::spending_blocked(window.clone(), *spent_usd))
            }
            _ => None,
        }
    }
}

/// The resilience layer as one value
pub struct Warden {
    config: WardenConfig,
    clock: Arc<dyn Clock>,
    shared: Option<Arc<dyn CounterStore>>,
    breaker: Arc<CircuitBreaker>,
    failover: FailoverOrchestrator,
    spending: SpendingGuard,
    limiters: Mutex<Vec<Arc<RateLimiter>>>,
}

impl Warden {
    /// In-memory layer on the system clock
    pub fn new(config: WardenConfig) -> WardenResult<Self> {
        Self::from_config(config, system_clock(), None)
    }

    /// Build every component from `config`.
    ///
    /// Components that use the shared store give up on each call after the
    /// configured store timeout.
    pub fn from_config(
        config: WardenConfig,
        clock: Arc<dyn Clock>,
        shared: Option<Arc<dyn CounterStore>>,
    ) -> WardenResult<Self> {
        config.validate()?;

        let breaker = Arc::new(CircuitBreaker::new(clock.clone()));
        let failover =
            FailoverOrchestrator::new(config.failover.clone(), breaker.clone(), clock.clone());
        let spending = SpendingGuard::with_store_timeout(
            config.spending.clone(),
            shared.clone(),
            config.rate_limit.store_timeout,
            clock.clone(),
        )?;

        tracing::info!(
            mode = %mode_of(&shared),
            providers = ?config.failover.providers,
            failover_enabled = config.failover.enabled,
            block_on_spend_limit = config.spending.block_on_limit,
            "Warden initialized"
        );

        Ok(Self {
            config,
            clock,
            shared,
            breaker,
            failover,
            spending,
            limiters: Mutex::new(Vec::new()),
        })
    }

    /// Create a limiter on this layer's store, clock and fail policy
    pub fn create_rate_limiter(&self, config: RateLimitConfig) -> WardenResult<Arc<RateLimiter>> {
        let backend = match &self.shared {
            Some(shared) => LimiterBackend::distributed(shared.clone(), self.clock.clone()),
            None => LimiterBackend::in_memory(self.clock.clone()),
        }
        .with_fail_closed(self.config.rate_limit.fail_closed)
        .with_store_timeout(self.config.rate_limit.store_timeout)
        .with_max_entries(self.config.rate_limit.max_entries);

        let limiter = Arc::new(RateLimiter::new(config, backend)?);
        self.limiters.lock().push(limiter.clone());
        Ok(limiter)
    }

    /// Rate limit, then spend. A rejected request never reaches the
    /// spending check.
    pub async fn admit(
        &self,
        limiter: &RateLimiter,
        identifier: impl Into<Identifier>,
    ) -> Admission {
        let decision = limiter.check(identifier, false).await;
        if !decision.allowed {
            return Admission::RateLimited {
                retry_after_ms: decision.remaining_ms.unwrap_or(0),
                reason: decision.reason,
            };
        }

        if !self.spending.config().block_on_limit {
            return Admission::Allowed {
                remaining: decision.remaining,
            };
        }

        let status = self.spending.spending_status().await;
        if status.is_blocked {
            let (window, spent_usd) = if status.hourly.status == SpendLevel::Exceeded {
                ("hourly", status.hourly.spent)
            } else {
                ("daily", status.daily.spent)
            };
            tracing::warn!(window, spent_usd, "Request blocked by spending limit");
            return Admission::SpendingBlocked {
                window: window.to_string(),
                spent_usd,
            };
        }

        Admission::Allowed {
            remaining: decision.remaining,
        }
    }

    /// Clear circuits, failover history, spend windows and the counters
    /// of every limiter created here
    pub async fn reset_all(&self) {
        self.breaker.reset_all_circuits();
        self.failover.clear_events();
        self.spending.clear_spending_data().await;
        let limiters: Vec<_> = self.limiters.lock().clone();
        for limiter in limiters {
            limiter.clear_all().await;
        }
        tracing::info!("All resilience state reset");
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    pub fn failover(&self) -> &FailoverOrchestrator {
        &self.failover
    }

    pub fn spending(&self) -> &SpendingGuard {
        &self.spending
    }

    pub fn config(&self) -> &WardenConfig {
        &self.config
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn mode(&self) -> BackendMode {
        mode_of(&self.shared)
    }
}

impl std::fmt::Debug for Warden {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Warden")
            .field("mode", &self.mode())
            .field("failover", &self.failover)
            .field("spending", &self.spending)
            .field("limiters", &self.limiters.lock().len())
            .finish()
    }
}

fn mode_of(shared: &Option<Arc<dyn CounterStore>>) -> BackendMode {
    if shared.is_some() {
        BackendMode::Distributed
    } else {
        BackendMode::InMemory
    }
}
