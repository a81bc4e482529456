//! Tests for the spending guard

use super::*;
use crate::clock::ManualClock;
use crate::error::WardenError;
use crate::store::testing::HangingStore;
use crate::store::{BackendMode, MockCounterStore, StoreError};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

const START_MS: u64 = 1_700_000_000_000;

fn guard(config: SpendingConfig) -> (SpendingGuard, ManualClock) {
    let clock = ManualClock::new(START_MS);
    let guard = SpendingGuard::new(config, None, Arc::new(clock.clone())).unwrap();
    (guard, clock)
}

fn spend(cost: f64) -> SpendRecord {
    SpendRecord::new(cost, "anthropic", "claude-sonnet")
}

#[tokio::test]
async fn test_warning_then_exceeded() {
    let (guard, _clock) = guard(SpendingConfig::default());

    guard.record_spending(&spend(0.85)).await;
    let status = guard.spending_status().await;
    assert_eq!(status.hourly.status, SpendLevel::Warning);
    assert_eq!(status.daily.status, SpendLevel::Ok);

    guard.record_spending(&spend(0.20)).await;
    let status = guard.spending_status().await;
    assert_eq!(status.hourly.status, SpendLevel::Exceeded);
    assert!(status.hourly.percentage > 1.0);
    assert!((status.hourly.spent - 1.05).abs() < 1e-9);
}

#[tokio::test]
async fn test_advisory_by_default() {
    let (guard, _clock) = guard(SpendingConfig::default());

    guard.record_spending(&spend(5.0)).await;

    let status = guard.spending_status().await;
    assert_eq!(status.hourly.status, SpendLevel::Exceeded);
    assert!(!status.is_blocked);
    assert!(guard.is_spending_allowed().await);
}

#[tokio::test]
async fn test_block_on_limit() {
    let (guard, _clock) = guard(SpendingConfig {
        block_on_limit: true,
        ..Default::default()
    });

    guard.record_spending(&spend(0.5)).await;
    assert!(guard.is_spending_allowed().await);

    guard.record_spending(&spend(0.5)).await;
    assert!(guard.spending_status().await.is_blocked);
    assert!(!guard.is_spending_allowed().await);
}

#[tokio::test]
async fn test_hourly_window_rolls_over() {
    let (guard, clock) = guard(SpendingConfig::default());

    guard.record_spending(&spend(0.9)).await;
    let status = guard.spending_status().await;
    assert_eq!(
        status.hourly.reset_at.map(|t| t.timestamp_millis()),
        Some((START_MS + 3_600_000) as i64)
    );

    clock.advance(Duration::from_secs(3600));
    let status = guard.spending_status().await;
    assert_eq!(status.hourly.spent, 0.0);
    assert_eq!(status.hourly.status, SpendLevel::Ok);
    assert!(status.hourly.reset_at.is_none());
    assert!((status.daily.spent - 0.9).abs() < 1e-9);

    guard.record_spending(&spend(0.1)).await;
    assert!((guard.spending_status().await.hourly.spent - 0.1).abs() < 1e-9);
}

#[tokio::test]
async fn test_invalid_costs_are_ignored() {
    let (guard, _clock) = guard(SpendingConfig::default());

    guard.record_spending(&spend(-1.0)).await;
    guard.record_spending(&spend(f64::NAN)).await;
    guard.record_spending(&spend(f64::INFINITY)).await;

    let status = guard.spending_status().await;
    assert_eq!(status.hourly.spent, 0.0);
    assert!(status.by_provider.is_empty());
}

#[tokio::test]
async fn test_by_provider_and_clear() {
    let (guard, _clock) = guard(SpendingConfig::default());

    guard.record_spending(&spend(0.25)).await;
    guard
        .record_spending(&SpendRecord::new(0.5, "openai", "gpt-4o"))
        .await;
    guard.record_spending(&spend(0.25)).await;

    let status = guard.spending_status().await;
    assert!((status.by_provider["anthropic"] - 0.5).abs() < 1e-9);
    assert!((status.by_provider["openai"] - 0.5).abs() < 1e-9);

    guard.clear_spending_data().await;
    let status = guard.spending_status().await;
    assert_eq!(status.hourly.spent, 0.0);
    assert_eq!(status.daily.spent, 0.0);
    assert!(status.by_provider.is_empty());
}

#[tokio::test]
async fn test_store_failure_records_locally() {
    let mut mock = MockCounterStore::new();
    mock.expect_add()
        .returning(|_, _, _| Err(StoreError::Timeout(Duration::from_millis(250))));
    mock.expect_total()
        .returning(|_| Err(StoreError::Timeout(Duration::from_millis(250))));

    let clock = ManualClock::new(START_MS);
    let guard = SpendingGuard::new(
        SpendingConfig::default(),
        Some(Arc::new(mock)),
        Arc::new(clock),
    )
    .unwrap();
    assert_eq!(guard.mode(), BackendMode::Distributed);

    guard.record_spending(&spend(0.85)).await;

    assert_eq!(
        guard.spending_status().await.hourly.status,
        SpendLevel::Warning
    );
}

#[tokio::test(start_paused = true)]
async fn test_stalled_store_times_out() {
    let guard = SpendingGuard::with_store_timeout(
        SpendingConfig::default(),
        Some(Arc::new(HangingStore)),
        Duration::from_millis(100),
        Arc::new(ManualClock::new(START_MS)),
    )
    .unwrap();

    let started = Instant::now();
    let status = tokio::time::timeout(Duration::from_secs(3600), async {
        guard.record_spending(&spend(0.85)).await;
        guard.spending_status().await
    })
    .await
    .expect("spend calls give up on the stalled store");

    assert_eq!(status.hourly.status, SpendLevel::Warning);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test(start_paused = true)]
async fn test_default_constructor_bounds_store_calls() {
    let guard = SpendingGuard::new(
        SpendingConfig::default(),
        Some(Arc::new(HangingStore)),
        Arc::new(ManualClock::new(START_MS)),
    )
    .unwrap();

    let recorded = tokio::time::timeout(
        Duration::from_secs(3600),
        guard.record_spending(&spend(0.1)),
    )
    .await;
    assert!(recorded.is_ok());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_spend_is_never_lost() {
    let (guard, _clock) = guard(SpendingConfig::default());
    let guard = Arc::new(guard);

    let handles: Vec<_> = (0..100)
        .map(|i| {
            let guard = guard.clone();
            let provider = if i % 2 == 0 { "anthropic" } else { "openai" };
            tokio::spawn(async move {
                guard
                    .record_spending(&SpendRecord::new(0.25, provider, "model"))
                    .await;
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    let status = guard.spending_status().await;
    assert_eq!(status.hourly.spent, 25.0);
    assert_eq!(status.daily.spent, 25.0);
    assert_eq!(status.by_provider["anthropic"], 12.5);
    assert_eq!(status.by_provider["openai"], 12.5);
}

#[tokio::test]
async fn test_expired_providers_are_dropped() {
    let (guard, clock) = guard(SpendingConfig::default());

    guard.record_spending(&spend(0.3)).await;
    clock.advance(Duration::from_secs(12 * 3600));
    guard
        .record_spending(&SpendRecord::new(0.2, "openai", "gpt-4o"))
        .await;

    // The anthropic daily total started 12h before openai's and expires first
    clock.advance(Duration::from_secs(13 * 3600));
    let status = guard.spending_status().await;
    assert!(!status.by_provider.contains_key("anthropic"));
    assert!((status.by_provider["openai"] - 0.2).abs() < 1e-9);

    clock.advance(Duration::from_secs(12 * 3600));
    assert!(guard.spending_status().await.by_provider.is_empty());
}

#[test]
fn test_config_validation() {
    assert!(SpendingConfig::default().validate().is_ok());

    let zero_limit = SpendingConfig {
        hourly_limit_usd: 0.0,
        ..Default::default()
    };
    assert!(matches!(
        zero_limit.validate(),
        Err(WardenError::Config { .. })
    ));

    let bad_threshold = SpendingConfig {
        warning_threshold: 1.5,
        ..Default::default()
    };
    assert!(bad_threshold.validate().is_err());

    let full_threshold = SpendingConfig {
        warning_threshold: 1.0,
        ..Default::default()
    };
    assert!(full_threshold.validate().is_ok());
}

#[test]
fn test_status_serializes_lowercase_levels() {
    assert_eq!(
        serde_json::to_string(&SpendLevel::Exceeded).unwrap(),
        "\"exceeded\""
    );
}
