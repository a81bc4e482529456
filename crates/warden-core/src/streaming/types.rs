//! Type definitions for stream recovery

use crate::recovery::classifier::StreamErrorKind;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// A mid-stream failure whose kind is already known
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct StreamFault {
    pub kind: StreamErrorKind,
    pub message: String,
}

impl StreamFault {
    pub fn new(kind: StreamErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// The stream ended without its terminal item
    pub fn incomplete() -> Self {
        Self::new(
            StreamErrorKind::Incomplete,
            "stream ended before completion",
        )
    }
}

/// Summary handed to the recovery-failed callback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryFailure {
    pub kind: StreamErrorKind,
    pub attempts: u32,
    pub message: String,
}

/// Callback invoked once when recovery gives up
pub type RecoveryCallback = Arc<dyn Fn(&RecoveryFailure) + Send + Sync>;

/// Retry policy for stream setup
#[derive(Clone)]
pub struct StreamRecoveryOptions {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Constant pause between attempts
    pub retry_delay: Duration,
    /// Also retry failures classified as cancellation
    pub retry_cancelled: bool,
    /// Stops retrying as soon as it fires
    pub cancel: Option<CancellationToken>,
    pub on_recovery_failed: Option<RecoveryCallback>,
}

impl Default for StreamRecoveryOptions {
    fn default() -> Self {
        Self {
            max_retries: 2,
            retry_delay: Duration::from_millis(500),
            retry_cancelled: false,
            cancel: None,
            on_recovery_failed: None,
        }
    }
}

impl StreamRecoveryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn with_retry_cancelled(mut self, retry: bool) -> Self {
        self.retry_cancelled = retry;
        self
    }

    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn on_recovery_failed<F>(mut self, callback: F) -> Self
    where
        F: Fn(&RecoveryFailure) + Send + Sync + 'static,
    {
        self.on_recovery_failed = Some(Arc::new(callback));
        self
    }

    pub(crate) fn should_retry(&self, kind: StreamErrorKind) -> bool {
        crate::recovery::classifier::is_recoverable_stream_error(kind)
            || (self.retry_cancelled && kind == StreamErrorKind::Cancelled)
    }
}

impl std::fmt::Debug for StreamRecoveryOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamRecoveryOptions")
            .field("max_retries", &self.max_retries)
            .field("retry_delay", &self.retry_delay)
            .field("retry_cancelled", &self.retry_cancelled)
            .field("cancel", &self.cancel.is_some())
            .field("on_recovery_failed", &self.on_recovery_failed.is_some())
            .finish()
    }
}

/// Recovery gave up; carries the last error unchanged
#[derive(Error, Debug)]
#[error("stream failed after {attempts} attempt(s) ({kind}): {source}")]
pub struct StreamFailure<E: std::error::Error + 'static> {
    #[source]
    pub source: E,
    pub kind: StreamErrorKind,
    pub attempts: u32,
}

impl<E: std::error::Error + 'static> StreamFailure<E> {
    /// Drop the diagnostics and keep the original error
    pub fn into_inner(self) -> E {
        self.source
    }
}

/// Body sent when a stream could not be set up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackResponse {
    pub status: u16,
    pub message: String,
    pub kind: StreamErrorKind,
}

/// Either the live stream or a well-formed failure response
#[derive(Debug)]
pub enum StreamResponse<S> {
    Streaming(S),
    Fallback(FallbackResponse),
}

impl<S> StreamResponse<S> {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }

    pub fn into_stream(self) -> Option<S> {
        match self {
            Self::Streaming(stream) => Some(stream),
            Self::Fallback(_) => None,
        }
    }
}
