//! Tests for rate limiting

use super::*;
use crate::clock::ManualClock;
use crate::error::WardenError;
use crate::store::testing::HangingStore;
use crate::store::{BackendMode, CounterStore, LocalCounterStore, MockCounterStore, StoreError};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

fn in_memory(config: RateLimitConfig) -> (RateLimiter, ManualClock) {
    let clock = ManualClock::new(1_000_000);
    let backend = LimiterBackend::in_memory(Arc::new(clock.clone()));
    (RateLimiter::new(config, backend).unwrap(), clock)
}

fn failing_store() -> MockCounterStore {
    let mut mock = MockCounterStore::new();
    mock.expect_hit()
        .returning(|_, _, _| Err(StoreError::Unavailable("connection refused".into())));
    mock.expect_swap()
        .returning(|_, _, _| Err(StoreError::Unavailable("connection refused".into())));
    mock
}

#[tokio::test]
async fn test_allows_exactly_max_requests_per_window() {
    let (limiter, clock) = in_memory(RateLimitConfig::new("api", 3, Duration::from_secs(60)));
    let id = Identifier::ip("10.0.0.1");

    for expected_remaining in [2, 1, 0] {
        let decision = limiter.check(&id, false).await;
        assert!(decision.allowed);
        assert_eq!(decision.remaining, Some(expected_remaining));
    }

    clock.advance(Duration::from_secs(15));
    let rejected = limiter.check(&id, false).await;
    assert!(!rejected.allowed);
    assert_eq!(rejected.reason, Some(RejectReason::WindowExhausted));
    assert_eq!(rejected.remaining_ms, Some(45_000));

    clock.advance(Duration::from_secs(45));
    assert!(limiter.check(&id, false).await.allowed);
}

#[tokio::test]
async fn test_identifiers_are_counted_separately() {
    let (limiter, _clock) = in_memory(RateLimitConfig::new("api", 1, Duration::from_secs(60)));

    assert!(limiter.check("ip:1.1.1.1", false).await.allowed);
    assert!(limiter.check("ip:2.2.2.2", false).await.allowed);
    assert!(!limiter.check("ip:1.1.1.1", false).await.allowed);
}

#[tokio::test]
async fn test_burst_interval_rejects_rapid_requests() {
    let (limiter, clock) = in_memory(RateLimitConfig::chat());
    let id = Identifier::ip("10.0.0.2");

    assert!(limiter.check(&id, false).await.allowed);

    clock.advance(Duration::from_millis(500));
    let burst = limiter.check(&id, false).await;
    assert!(!burst.allowed);
    assert_eq!(burst.reason, Some(RejectReason::Burst));
    assert_eq!(burst.remaining_ms, Some(1_500));

    clock.advance(Duration::from_secs(2));
    let spaced = limiter.check(&id, false).await;
    assert!(spaced.allowed);
    // The burst rejection did not consume window quota
    assert_eq!(spaced.remaining, Some(18));

    assert!(limiter.check(&id, true).await.allowed);
}

#[tokio::test]
async fn test_fingerprints_skip_burst_checks() {
    let (limiter, _clock) = in_memory(RateLimitConfig::chat());
    let id = Identifier::fingerprint("abc123");

    assert!(limiter.check(&id, false).await.allowed);
    assert!(limiter.check(&id, false).await.allowed);
}

#[tokio::test]
async fn test_clear_and_clear_all() {
    let (limiter, _clock) = in_memory(RateLimitConfig::new("auth", 1, Duration::from_secs(900)));
    let a = Identifier::user("alice");
    let b = Identifier::user("bob");

    limiter.check(&a, false).await;
    limiter.check(&b, false).await;
    assert!(!limiter.check(&a, false).await.allowed);

    limiter.clear(&a).await;
    assert!(limiter.check(&a, false).await.allowed);
    assert!(!limiter.check(&b, false).await.allowed);

    limiter.clear_all().await;
    assert!(limiter.check(&b, false).await.allowed);
}

#[tokio::test]
async fn test_shared_store_is_consistent_across_limiters() {
    let clock = ManualClock::new(0);
    let shared: Arc<dyn CounterStore> =
        Arc::new(LocalCounterStore::new(100, Arc::new(clock.clone())).unwrap());
    let config = RateLimitConfig::new("api", 2, Duration::from_secs(60));

    let first = RateLimiter::new(
        config.clone(),
        LimiterBackend::distributed(shared.clone(), Arc::new(clock.clone())),
    )
    .unwrap();
    let second = RateLimiter::new(
        config,
        LimiterBackend::distributed(shared, Arc::new(clock.clone())),
    )
    .unwrap();

    assert_eq!(first.mode(), BackendMode::Distributed);
    assert!(first.check("ip:9.9.9.9", false).await.allowed);
    assert!(second.check("ip:9.9.9.9", false).await.allowed);
    assert!(!first.check("ip:9.9.9.9", false).await.allowed);
}

#[tokio::test]
async fn test_store_failure_falls_back_to_memory() {
    let clock = ManualClock::new(0);
    let backend = LimiterBackend::distributed(Arc::new(failing_store()), Arc::new(clock));
    let limiter =
        RateLimiter::new(RateLimitConfig::new("api", 1, Duration::from_secs(60)), backend).unwrap();

    assert!(limiter.check("ip:1.2.3.4", false).await.allowed);
    // The in-memory fallback still enforces the window
    assert!(!limiter.check("ip:1.2.3.4", false).await.allowed);
}

#[tokio::test]
async fn test_store_failure_rejects_when_fail_closed() {
    let clock = ManualClock::new(0);
    let backend = LimiterBackend::distributed(Arc::new(failing_store()), Arc::new(clock))
        .with_fail_closed(true);
    let limiter =
        RateLimiter::new(RateLimitConfig::new("api", 5, Duration::from_secs(60)), backend).unwrap();

    let decision = limiter.check("ip:1.2.3.4", false).await;
    assert!(!decision.allowed);
    assert_eq!(decision.reason, Some(RejectReason::StoreUnavailable));
    assert!(decision.remaining_ms.unwrap_or(0) > 0);
}

#[tokio::test(start_paused = true)]
async fn test_stalled_store_times_out_and_falls_back() {
    let backend = LimiterBackend::distributed(Arc::new(HangingStore), Arc::new(ManualClock::new(0)));
    let limiter =
        RateLimiter::new(RateLimitConfig::new("api", 1, Duration::from_secs(60)), backend).unwrap();

    let started = Instant::now();
    let decision = tokio::time::timeout(
        Duration::from_secs(3600),
        limiter.check("ip:1.2.3.4", false),
    )
    .await
    .expect("check gives up on the stalled store");

    assert!(decision.allowed);
    assert!(started.elapsed() >= Duration::from_millis(250));
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn test_stalled_store_rejects_when_fail_closed() {
    let backend = LimiterBackend::distributed(Arc::new(HangingStore), Arc::new(ManualClock::new(0)))
        .with_fail_closed(true)
        .with_store_timeout(Duration::from_millis(50));
    let limiter = RateLimiter::new(RateLimitConfig::api(), backend).unwrap();

    let started = Instant::now();
    let decision = tokio::time::timeout(
        Duration::from_secs(3600),
        limiter.check("user:7", false),
    )
    .await
    .expect("check gives up on the stalled store");

    assert!(!decision.allowed);
    assert_eq!(decision.reason, Some(RejectReason::StoreUnavailable));
    assert!(started.elapsed() < Duration::from_millis(250));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_checks_allow_exactly_max_requests() {
    let (limiter, _clock) = in_memory(RateLimitConfig::new("api", 10, Duration::from_secs(60)));
    let limiter = Arc::new(limiter);

    let handles: Vec<_> = (0..200)
        .map(|_| {
            let limiter = limiter.clone();
            tokio::spawn(async move { limiter.check("ip:10.9.8.7", false).await.allowed })
        })
        .collect();

    let mut allowed = 0;
    for handle in handles {
        if handle.await.unwrap() {
            allowed += 1;
        }
    }
    assert_eq!(allowed, 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_checks_on_shared_store() {
    let clock = ManualClock::new(0);
    let shared: Arc<dyn CounterStore> =
        Arc::new(LocalCounterStore::new(100, Arc::new(clock.clone())).unwrap());
    let config = RateLimitConfig::new("api", 10, Duration::from_secs(60));
    let limiters: Vec<Arc<RateLimiter>> = (0..4)
        .map(|_| {
            let backend = LimiterBackend::distributed(shared.clone(), Arc::new(clock.clone()));
            Arc::new(RateLimiter::new(config.clone(), backend).unwrap())
        })
        .collect();

    let handles: Vec<_> = (0..200)
        .map(|i| {
            let limiter = limiters[i % limiters.len()].clone();
            tokio::spawn(async move { limiter.check("user:shared", false).await.allowed })
        })
        .collect();

    let mut allowed = 0;
    for handle in handles {
        if handle.await.unwrap() {
            allowed += 1;
        }
    }
    assert_eq!(allowed, 10);
}

#[tokio::test]
async fn test_window_and_burst_keys_do_not_collide() {
    let (limiter, clock) = in_memory(
        RateLimitConfig::new("chat", 1, Duration::from_secs(60))
            .with_burst_interval(Duration::from_secs(2)),
    );

    // "burst:x" renders like the burst key of "x"; each keeps its own state
    assert!(limiter.check("x", false).await.allowed);
    assert!(limiter.check("burst:x", true).await.allowed);

    clock.advance(Duration::from_millis(500));
    let burst = limiter.check("x", false).await;
    assert!(!burst.allowed);
    assert_eq!(burst.reason, Some(RejectReason::Burst));

    let exhausted = limiter.check("burst:x", true).await;
    assert_eq!(exhausted.reason, Some(RejectReason::WindowExhausted));
}

#[test]
fn test_identifier_rendering_and_parsing() {
    assert_eq!(Identifier::ip("1.2.3.4").to_string(), "ip:1.2.3.4");
    assert_eq!(Identifier::fingerprint("f").to_string(), "fp:f");
    assert_eq!(Identifier::parse("user:42"), Identifier::user("42"));
    assert_eq!(
        "anon-session".parse::<Identifier>().unwrap(),
        Identifier::Raw("anon-session".into())
    );
    assert!(Identifier::parse("fp:xyz").skips_burst());
    assert!(!Identifier::parse("ip:xyz").skips_burst());
}

#[test]
fn test_invalid_config_is_rejected() {
    let backend = LimiterBackend::in_memory(Arc::new(ManualClock::new(0)));

    let zero = RateLimitConfig::new("api", 0, Duration::from_secs(60));
    assert!(matches!(
        RateLimiter::new(zero, backend.clone()),
        Err(WardenError::Config { .. })
    ));

    let no_room = backend.with_max_entries(0);
    assert!(matches!(
        RateLimiter::new(RateLimitConfig::api(), no_room),
        Err(WardenError::Config { .. })
    ));
}

#[test]
fn test_config_round_trips_humantime() {
    let parsed: RateLimitConfig = toml::from_str(
        r#"
        prefix = "chat"
        max_requests = 20
        window = "1m"
        burst_interval = "2s"
        "#,
    )
    .unwrap();
    assert_eq!(parsed, RateLimitConfig::chat());
}
