//! Tests for failover orchestration

use super::*;
use crate::clock::ManualClock;
use crate::error::{UpstreamError, WardenError};
use crate::recovery::circuit_breaker::{CircuitBreaker, FAILURE_THRESHOLD};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

fn orchestrator(config: FailoverConfig) -> FailoverOrchestrator {
    let clock: Arc<ManualClock> = Arc::new(ManualClock::new(1_700_000_000_000));
    let breaker = Arc::new(CircuitBreaker::new(clock.clone()));
    FailoverOrchestrator::new(config, breaker, clock)
}

fn trip(orchestrator: &FailoverOrchestrator, provider: &str) {
    for _ in 0..FAILURE_THRESHOLD {
        orchestrator.breaker().record_failure(provider, "overloaded");
    }
}

fn names() -> FailoverOptions {
    FailoverOptions::providers("primary-name", "fallback-name")
}

#[tokio::test]
async fn test_primary_success_does_not_use_fallback() {
    let failover = orchestrator(FailoverConfig::default());

    let outcome = failover
        .execute_with_failover(
            || async { Ok::<_, UpstreamError>("primary") },
            || async { Ok("fallback") },
            FailoverOptions::new(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.result, "primary");
    assert_eq!(outcome.provider, ProviderTier::Primary);
    assert_eq!(outcome.provider_name, "anthropic");
    assert!(!outcome.used_fallback);
    assert!(failover.recent_events().is_empty());
}

#[tokio::test]
async fn test_provider_error_fails_over() {
    let failover = orchestrator(FailoverConfig::default());
    failover.breaker().record_failure("fallback-name", "blip");

    let outcome = failover
        .execute_with_failover(
            || async { Err(UpstreamError::new("503 Service Unavailable")) },
            || async { Ok("ok") },
            names(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.result, "ok");
    assert_eq!(outcome.provider, ProviderTier::Fallback);
    assert_eq!(outcome.provider_name, "fallback-name");
    assert!(outcome.used_fallback);

    let health = failover.breaker().provider_health();
    assert_eq!(health["primary-name"].failures, 1);
    assert_eq!(
        health["primary-name"].last_reason.as_deref(),
        Some("503 Service Unavailable")
    );
    // The fallback's success cleared its earlier failure
    assert_eq!(health["fallback-name"].failures, 0);
    assert!(health["fallback-name"].last_success.is_some());

    let events = failover.recent_events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].from_provider, "primary-name");
    assert_eq!(
        events[0].reason,
        FailoverReason::ProviderError("503 Service Unavailable".to_string())
    );
}

#[tokio::test]
async fn test_application_error_is_returned_unchanged() {
    let failover = orchestrator(FailoverConfig::default());
    let fallback_calls = AtomicUsize::new(0);

    let result = failover
        .execute_with_failover(
            || async {
                Err::<&str, _>(UpstreamError::with_status(
                    400,
                    "Validation error: messages must not be empty",
                ))
            },
            || async {
                fallback_calls.fetch_add(1, Ordering::SeqCst);
                Ok("fallback")
            },
            names(),
        )
        .await;

    match result {
        Err(FailoverError::Call(error)) => {
            assert_eq!(error.status, Some(400));
            assert_eq!(error.message, "Validation error: messages must not be empty");
        }
        other => panic!("expected the original error, got {:?}", other),
    }
    assert_eq!(fallback_calls.load(Ordering::SeqCst), 0);
    assert!(failover.breaker().provider_health().is_empty());
}

#[tokio::test]
async fn test_open_primary_circuit_skips_primary() {
    let failover = orchestrator(FailoverConfig::default());
    trip(&failover, "primary-name");
    let primary_calls = AtomicUsize::new(0);

    let outcome = failover
        .execute_with_failover(
            || async {
                primary_calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, UpstreamError>("primary")
            },
            || async { Ok("fallback") },
            names(),
        )
        .await
        .unwrap();

    assert!(outcome.used_fallback);
    assert_eq!(primary_calls.load(Ordering::SeqCst), 0);
    assert_eq!(failover.recent_events()[0].reason, FailoverReason::CircuitOpen);
}

#[tokio::test]
async fn test_all_providers_unavailable() {
    let failover = orchestrator(FailoverConfig::default());
    trip(&failover, "primary-name");
    trip(&failover, "fallback-name");

    let result = failover
        .execute_with_failover(
            || async { Ok::<_, UpstreamError>("primary") },
            || async { Ok("fallback") },
            names(),
        )
        .await;

    let error = result.unwrap_err();
    assert!(error.is_all_providers_unavailable());

    let error: WardenError = error.into();
    assert_eq!(error.error_code(), "WARDEN_ALL_PROVIDERS_DOWN");
    assert!(error.is_retryable());
}

#[tokio::test]
async fn test_fallback_failure_propagates() {
    let failover = orchestrator(FailoverConfig::default());

    let result = failover
        .execute_with_failover(
            || async { Err::<&str, _>(UpstreamError::with_status(529, "overloaded")) },
            || async { Err(UpstreamError::with_status(503, "also down")) },
            names(),
        )
        .await;

    let error = result.unwrap_err().into_call_error().unwrap();
    assert_eq!(error.message, "also down");
    let health = failover.breaker().provider_health();
    assert_eq!(health["primary-name"].failures, 1);
    assert_eq!(health["fallback-name"].failures, 1);
}

#[tokio::test]
async fn test_disabled_failover_calls_primary_only() {
    let failover = orchestrator(FailoverConfig {
        enabled: false,
        ..Default::default()
    });
    assert!(!failover.is_failover_enabled());

    let result = failover
        .execute_with_failover(
            || async { Err::<&str, _>(UpstreamError::new("503 Service Unavailable")) },
            || async { Ok("fallback") },
            names(),
        )
        .await;

    assert!(matches!(result, Err(FailoverError::Call(_))));
    assert!(failover.breaker().provider_health().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_slow_primary_times_out_and_fails_over() {
    let failover = orchestrator(FailoverConfig::default());

    let outcome = failover
        .execute_with_failover(
            || async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok::<_, UpstreamError>("late")
            },
            || async { Ok("fallback") },
            names().with_timeout(Duration::from_secs(5)),
        )
        .await
        .unwrap();

    assert_eq!(outcome.result, "fallback");
    assert!((5_000..6_000).contains(&outcome.duration_ms));
    assert_eq!(failover.recent_events()[0].reason, FailoverReason::Timeout);
}

#[tokio::test]
async fn test_select_healthy_provider() {
    let failover = orchestrator(FailoverConfig::default());

    assert_eq!(failover.select_healthy_provider(None).as_deref(), Some("anthropic"));
    assert_eq!(
        failover.select_healthy_provider(Some("google")).as_deref(),
        Some("google")
    );

    trip(&failover, "google");
    trip(&failover, "anthropic");
    assert_eq!(
        failover.select_healthy_provider(Some("google")).as_deref(),
        Some("openai")
    );

    trip(&failover, "openai");
    assert_eq!(failover.select_healthy_provider(None), None);
}

#[tokio::test]
async fn test_event_history_is_bounded() {
    let failover = orchestrator(FailoverConfig::default());
    trip(&failover, "primary-name");

    for _ in 0..120 {
        failover
            .execute_with_failover(
                || async { Ok::<_, UpstreamError>(()) },
                || async { Ok(()) },
                names(),
            )
            .await
            .unwrap();
    }

    assert_eq!(failover.recent_events().len(), 100);
    failover.clear_events();
    assert!(failover.recent_events().is_empty());
}

#[test]
fn test_config_validation() {
    assert!(FailoverConfig::default().validate().is_ok());
    let empty = FailoverConfig {
        providers: Vec::new(),
        ..Default::default()
    };
    assert!(matches!(empty.validate(), Err(WardenError::Config { .. })));
}
