//! Hourly and daily spend accumulator

use super::types::{SpendLevel, SpendRecord, SpendingConfig, SpendingStatus, WindowStatus};
use crate::cache::{BoundedLruMap, DEFAULT_CAPACITY};
use crate::clock::Clock;
use crate::error::WardenResult;
use crate::store::{
    BackendMode, CounterStore, DEFAULT_STORE_TIMEOUT, GuardedStore, LocalCounterStore, WindowTotal,
    duration_ms,
};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

const KEY_PREFIX: &str = "spend:";
const HOURLY_KEY: &str = "spend:hourly";
const DAILY_KEY: &str = "spend:daily";

const HOUR: Duration = Duration::from_secs(60 * 60);
const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Rolling spend accumulator with warning and exceeded levels.
///
/// Advisory unless `block_on_limit` is set. Totals live in the shared
/// store when one is configured, with every store call bounded by the
/// store timeout; a failing store falls back to the local windows so spend
/// is never silently dropped.
pub struct SpendingGuard {
    config: SpendingConfig,
    shared: Option<Arc<dyn CounterStore>>,
    local: LocalCounterStore,
    /// Providers with a possibly live daily total
    providers: Mutex<BoundedLruMap<String, ()>>,
    clock: Arc<dyn Clock>,
}

impl SpendingGuard {
    pub fn new(
        config: SpendingConfig,
        shared: Option<Arc<dyn CounterStore>>,
        clock: Arc<dyn Clock>,
    ) -> WardenResult<Self> {
        Self::with_store_timeout(config, shared, DEFAULT_STORE_TIMEOUT, clock)
    }

    pub fn with_store_timeout(
        config: SpendingConfig,
        shared: Option<Arc<dyn CounterStore>>,
        store_timeout: Duration,
        clock: Arc<dyn Clock>,
    ) -> WardenResult<Self> {
        config.validate()?;
        let shared = shared.map(|store| {
            Arc::new(GuardedStore::new(store, store_timeout)) as Arc<dyn CounterStore>
        });
        Ok(Self {
            local: LocalCounterStore::new(DEFAULT_CAPACITY, clock.clone())?,
            config,
            shared,
            providers: Mutex::new(BoundedLruMap::with_default_capacity()),
            clock,
        })
    }

    /// Add a call's cost to both windows and the provider's daily total
    pub async fn record_spending(&self, record: &SpendRecord) {
        if !record.cost_usd.is_finite() || record.cost_usd < 0.0 {
            tracing::warn!(
                provider = %record.provider,
                model = %record.model,
                cost_usd = record.cost_usd,
                "Ignoring invalid spend amount"
            );
            return;
        }

        let hourly = self.add(HOURLY_KEY, record.cost_usd, HOUR).await;
        self.report_crossing(
            "hourly",
            hourly.total - record.cost_usd,
            hourly.total,
            self.config.hourly_limit_usd,
        );

        let daily = self.add(DAILY_KEY, record.cost_usd, DAY).await;
        self.report_crossing(
            "daily",
            daily.total - record.cost_usd,
            daily.total,
            self.config.daily_limit_usd,
        );

        self.providers.lock().set(record.provider.clone(), ());
        self.add(&provider_key(&record.provider), record.cost_usd, DAY)
            .await;

        tracing::debug!(
            provider = %record.provider,
            model = %record.model,
            cost_usd = record.cost_usd,
            hourly_total = hourly.total,
            daily_total = daily.total,
            "Spend recorded"
        );
    }

    pub async fn spending_status(&self) -> SpendingStatus {
        let hourly = self
            .window_status(HOURLY_KEY, self.config.hourly_limit_usd)
            .await;
        let daily = self
            .window_status(DAILY_KEY, self.config.daily_limit_usd)
            .await;
        let is_blocked = self.config.block_on_limit
            && (hourly.status == SpendLevel::Exceeded || daily.status == SpendLevel::Exceeded);

        let providers: Vec<String> = self
            .providers
            .lock()
            .iter()
            .map(|(provider, _)| provider.clone())
            .collect();
        let mut by_provider = BTreeMap::new();
        let mut expired = Vec::new();
        for provider in providers {
            match self.total(&provider_key(&provider)).await {
                Some(window) => {
                    by_provider.insert(provider, window.total);
                }
                None => expired.push(provider),
            }
        }
        if !expired.is_empty() {
            self.providers
                .lock()
                .delete_where(|provider| expired.contains(provider));
        }

        SpendingStatus {
            hourly,
            daily,
            is_blocked,
            by_provider,
        }
    }

    /// False only when blocking is enabled and a window is exceeded
    pub async fn is_spending_allowed(&self) -> bool {
        if !self.config.block_on_limit {
            return true;
        }
        !self.spending_status().await.is_blocked
    }

    /// Drop every window and provider total
    pub async fn clear_spending_data(&self) {
        self.local.delete_prefix_now(KEY_PREFIX);
        self.providers.lock().clear();
        if let Some(shared) = &self.shared {
            if let Err(error) = shared.delete_prefix(KEY_PREFIX).await {
                tracing::warn!(error = %error, "Failed to clear shared spending data");
            }
        }
        tracing::info!("Spending data cleared");
    }

    pub fn config(&self) -> &SpendingConfig {
        &self.config
    }

    pub fn mode(&self) -> BackendMode {
        if self.shared.is_some() {
            BackendMode::Distributed
        } else {
            BackendMode::InMemory
        }
    }

    async fn window_status(&self, key: &str, limit: f64) -> WindowStatus {
        let window = self.total(key).await;
        let spent = window.map_or(0.0, |window| window.total);
        let percentage = spent / limit;
        WindowStatus {
            spent,
            limit,
            percentage,
            status: SpendLevel::for_percentage(percentage, self.config.warning_threshold),
            reset_at: window.and_then(|window| self.reset_at(window.resets_in)),
        }
    }

    fn reset_at(&self, resets_in: Duration) -> Option<DateTime<Utc>> {
        let at = self.clock.now_ms().saturating_add(duration_ms(resets_in));
        DateTime::from_timestamp_millis(i64::try_from(at).ok()?)
    }

    fn report_crossing(&self, window: &str, before: f64, after: f64, limit: f64) {
        let threshold = self.config.warning_threshold;
        let was = SpendLevel::for_percentage(before / limit, threshold);
        let now = SpendLevel::for_percentage(after / limit, threshold);
        if was == now {
            return;
        }
        match now {
            SpendLevel::Exceeded => tracing::warn!(
                window = %window,
                spent_usd = after,
                limit_usd = limit,
                blocking = self.config.block_on_limit,
                "Spending limit exceeded"
            ),
            SpendLevel::Warning => tracing::warn!(
                window = %window,
                spent_usd = after,
                limit_usd = limit,
                "Spending approaching limit"
            ),
            SpendLevel::Ok => {}
        }
    }

    async fn add(&self, key: &str, amount: f64, window: Duration) -> WindowTotal {
        if let Some(shared) = &self.shared {
            match shared.add(key, amount, window).await {
                Ok(total) => return total,
                Err(error) => tracing::warn!(
                    key = %key,
                    error = %error,
                    "Shared spend store failed, recording locally"
                ),
            }
        }
        self.local.add_now(key, amount, window)
    }

    async fn total(&self, key: &str) -> Option<WindowTotal> {
        if let Some(shared) = &self.shared {
            match shared.total(key).await {
                Ok(total) => return total,
                Err(error) => tracing::warn!(
                    key = %key,
                    error = %error,
                    "Shared spend store failed, reading local totals"
                ),
            }
        }
        self.local.total_now(key)
    }
}

impl std::fmt::Debug for SpendingGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpendingGuard")
            .field("config", &self.config)
            .field("mode", &self.mode())
            .finish()
    }
}

fn provider_key(provider: &str) -> String {
    format!("{}provider:{}", KEY_PREFIX, provider)
}
