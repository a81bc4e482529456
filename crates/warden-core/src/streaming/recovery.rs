//! Retry loop for stream setup

use super::types::{RecoveryFailure, StreamFailure, StreamRecoveryOptions};
use crate::recovery::classifier::{StreamErrorKind, classify_stream_error};
use crate::store::duration_ms;
use std::error::Error;
use std::future::Future;
use tokio::time::sleep;

/// Run `operation`, retrying recoverable failures with a constant delay.
///
/// Only connection, timeout and incomplete failures are retried (plus
/// cancellation when `retry_cancelled` is set). The total wait is bounded
/// by `max_retries * retry_delay`. On giving up, `on_recovery_failed` runs
/// once and the last error is returned inside a [`StreamFailure`].
pub async fn with_stream_recovery<T, E, F, Fut>(
    mut operation: F,
    options: &StreamRecoveryOptions,
) -> Result<T, StreamFailure<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Error + 'static,
{
    let mut attempts: u32 = 0;

    loop {
        attempts += 1;
        let error = match operation().await {
            Ok(value) => {
                if attempts > 1 {
                    tracing::info!(attempts, "Stream recovered");
                }
                return Ok(value);
            }
            Err(error) => error,
        };

        let kind = classify_stream_error(&error);
        let retries_left = attempts <= options.max_retries;
        if !retries_left || !options.should_retry(kind) {
            return Err(give_up(error, kind, attempts, options));
        }

        tracing::info!(
            kind = %kind,
            attempt = attempts,
            max_retries = options.max_retries,
            delay_ms = duration_ms(options.retry_delay),
            error = %error,
            "Retrying stream setup"
        );

        if let Some(token) = &options.cancel {
            tokio::select! {
                _ = token.cancelled() => {
                    return Err(give_up(error, StreamErrorKind::Cancelled, attempts, options));
                }
                _ = sleep(options.retry_delay) => {}
            }
        } else {
            sleep(options.retry_delay).await;
        }
    }
}

fn give_up<E: Error + 'static>(
    error: E,
    kind: StreamErrorKind,
    attempts: u32,
    options: &StreamRecoveryOptions,
) -> StreamFailure<E> {
    tracing::error!(kind = %kind, attempts, error = %error, "Stream recovery failed");
    if let Some(callback) = &options.on_recovery_failed {
        callback(&RecoveryFailure {
            kind,
            attempts,
            message: error.to_string(),
        });
    }
    StreamFailure {
        source: error,
        kind,
        attempts,
    }
}
