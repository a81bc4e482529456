//! Spending guard types

use crate::error::{WardenError, WardenResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Spend caps and how strictly they are enforced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpendingConfig {
    /// Cap for the rolling hour, in USD
    pub hourly_limit_usd: f64,
    /// Cap for the rolling day, in USD
    pub daily_limit_usd: f64,
    /// Fraction of a cap at which the window reports a warning
    pub warning_threshold: f64,
    /// Deny requests once a window is exceeded; otherwise advisory only
    pub block_on_limit: bool,
}

impl Default for SpendingConfig {
    fn default() -> Self {
        Self {
            hourly_limit_usd: 1.0,
            daily_limit_usd: 10.0,
            warning_threshold: 0.8,
            block_on_limit: false,
        }
    }
}

impl SpendingConfig {
    pub fn validate(&self) -> WardenResult<()> {
        for (name, limit) in [
            ("hourly_limit_usd", self.hourly_limit_usd),
            ("daily_limit_usd", self.daily_limit_usd),
        ] {
            if !limit.is_finite() || limit <= 0.0 {
                return Err(WardenError::config_with_context(
                    "spending limits must be positive",
                    format!("{} = {}", name, limit),
                ));
            }
        }
        if !(self.warning_threshold > 0.0 && self.warning_threshold <= 1.0) {
            return Err(WardenError::config_with_context(
                "warning threshold must be in (0, 1]",
                format!("warning_threshold = {}", self.warning_threshold),
            ));
        }
        Ok(())
    }
}

/// One completed provider call's cost
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpendRecord {
    pub cost_usd: f64,
    pub provider: String,
    pub model: String,
}

impl SpendRecord {
    pub fn new(cost_usd: f64, provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            cost_usd,
            provider: provider.into(),
            model: model.into(),
        }
    }
}

/// Budget level of one window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpendLevel {
    Ok,
    Warning,
    Exceeded,
}

impl SpendLevel {
    pub(crate) fn for_percentage(percentage: f64, warning_threshold: f64) -> Self {
        if percentage >= 1.0 {
            Self::Exceeded
        } else if percentage >= warning_threshold {
            Self::Warning
        } else {
            Self::Ok
        }
    }
}

/// State of one rolling window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowStatus {
    pub spent: f64,
    pub limit: f64,
    /// `spent / limit`; above 1 once the cap is passed
    pub percentage: f64,
    pub status: SpendLevel,
    /// When the current window rolls over; `None` before any spend
    pub reset_at: Option<DateTime<Utc>>,
}

/// Snapshot of both windows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpendingStatus {
    pub hourly: WindowStatus,
    pub daily: WindowStatus,
    /// True only when blocking is enabled and a window is exceeded
    pub is_blocked: bool,
    /// Daily spend per provider seen by this process
    pub by_provider: BTreeMap<String, f64>,
}
