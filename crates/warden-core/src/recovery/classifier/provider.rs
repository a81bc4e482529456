//! Provider call error classifier

use super::error_chain;
use crate::error::UpstreamError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::io::ErrorKind;

/// Category of a failed provider call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Rate limits, overload, 5xx responses, unknown models, aborts
    Provider,
    /// The call ran out of time
    Timeout,
    /// Socket or DNS level failure
    Connection,
    /// Validation and other errors that will recur on retry
    Application,
}

impl ErrorClass {
    /// Whether the failure should count against the provider and trigger failover
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::Application)
    }
}

/// Phrases that mark an error as the caller's fault, checked first
const APPLICATION_PHRASES: &[&str] = &[
    "validation error",
    "validation failed",
    "invalid input",
    "invalid request",
    "bad request",
];

const TIMEOUT_PHRASES: &[&str] = &["timed out", "timeout", "etimedout", "deadline exceeded"];

const CONNECTION_PHRASES: &[&str] = &[
    "econnrefused",
    "econnreset",
    "enotfound",
    "eai_again",
    "connection refused",
    "connection reset",
    "connection closed",
    "connection aborted",
    "socket hang up",
    "network error",
    "fetch failed",
    "getaddrinfo",
    "dns",
];

const PROVIDER_PHRASES: &[&str] = &[
    "rate limit",
    "rate_limit",
    "ratelimit",
    "too many requests",
    "overloaded",
    "capacity",
    "temporarily unavailable",
    "service unavailable",
    "bad gateway",
    "resource exhausted",
    "resource_exhausted",
    "quota",
    "abort",
    "cancelled",
    "canceled",
    "unknown model",
    "model_not_found",
];

static STATUS_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(429|502|503|504|529)\b").expect("valid status code regex"));

static MODEL_NOT_FOUND_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bmodel\b.*\bnot\s+(found|available|supported)\b")
        .expect("valid model not found regex")
});

/// Classify a failed provider call.
///
/// Typed signals anywhere in the source chain win over message text; an
/// explicit validation phrase in the top-level message wins over both.
pub fn classify_error(error: &(dyn Error + 'static)) -> ErrorClass {
    let top = error.to_string().to_lowercase();
    if contains_any(&top, APPLICATION_PHRASES) {
        return ErrorClass::Application;
    }

    for cause in error_chain(error) {
        if let Some(class) = typed_class(cause) {
            return class;
        }
    }

    for cause in error_chain(error) {
        let class = classify_message(&cause.to_string());
        if class.is_transient() {
            return class;
        }
    }
    ErrorClass::Application
}

/// Classify a bare message, as for values that are not error types
pub fn classify_message(message: &str) -> ErrorClass {
    let lower = message.to_lowercase();
    if contains_any(&lower, APPLICATION_PHRASES) {
        ErrorClass::Application
    } else if contains_any(&lower, TIMEOUT_PHRASES) {
        ErrorClass::Timeout
    } else if contains_any(&lower, CONNECTION_PHRASES) {
        ErrorClass::Connection
    } else if contains_any(&lower, PROVIDER_PHRASES)
        || STATUS_CODE_RE.is_match(&lower)
        || MODEL_NOT_FOUND_RE.is_match(&lower)
    {
        ErrorClass::Provider
    } else {
        ErrorClass::Application
    }
}

/// Whether a failed provider call is plausibly transient
pub fn is_provider_error(error: &(dyn Error + 'static)) -> bool {
    classify_error(error).is_transient()
}

/// [`is_provider_error`] for a bare message
pub fn is_provider_message(message: &str) -> bool {
    classify_message(message).is_transient()
}

fn typed_class(error: &(dyn Error + 'static)) -> Option<ErrorClass> {
    if let Some(upstream) = error.downcast_ref::<UpstreamError>() {
        return match upstream.status? {
            408 => Some(ErrorClass::Timeout),
            429 | 500 | 502 | 503 | 504 | 529 => Some(ErrorClass::Provider),
            _ => None,
        };
    }
    if let Some(io) = error.downcast_ref::<std::io::Error>() {
        return match io.kind() {
            ErrorKind::TimedOut => Some(ErrorClass::Timeout),
            ErrorKind::ConnectionRefused
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::NotConnected
            | ErrorKind::BrokenPipe
            | ErrorKind::UnexpectedEof => Some(ErrorClass::Connection),
            _ => None,
        };
    }
    if error.is::<tokio::time::error::Elapsed>() {
        return Some(ErrorClass::Timeout);
    }
    None
}

pub(super) fn contains_any(haystack: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|phrase| haystack.contains(phrase))
}
