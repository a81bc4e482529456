//! Mid-stream failure classifier

use super::error_chain;
use super::provider::contains_any;
use crate::error::UpstreamError;
use crate::streaming::StreamFault;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::io::ErrorKind;

/// Why a streaming response broke
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StreamErrorKind {
    /// Malformed chunk
    #[serde(rename = "parse_error")]
    Parse,
    /// Socket level failure
    #[serde(rename = "connection_error")]
    Connection,
    /// Deadline or abort signal
    #[serde(rename = "timeout_error")]
    Timeout,
    /// Rate limit or capacity signal from the provider
    #[serde(rename = "provider_error")]
    Provider,
    /// Stream ended before its terminal marker
    #[serde(rename = "incomplete_error")]
    Incomplete,
    /// Explicit cancellation by the caller
    #[serde(rename = "cancelled")]
    Cancelled,
    #[serde(rename = "unknown_error")]
    Unknown,
}

impl StreamErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Parse => "parse_error",
            Self::Connection => "connection_error",
            Self::Timeout => "timeout_error",
            Self::Provider => "provider_error",
            Self::Incomplete => "incomplete_error",
            Self::Cancelled => "cancelled",
            Self::Unknown => "unknown_error",
        }
    }
}

impl std::fmt::Display for StreamErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

const CANCELLED_PHRASES: &[&str] = &["cancelled", "canceled"];

const TIMEOUT_PHRASES: &[&str] = &["timed out", "timeout", "deadline exceeded", "abort"];

const PARSE_PHRASES: &[&str] = &[
    "json",
    "parse",
    "unexpected token",
    "malformed",
    "decode",
    "utf-8",
    "invalid chunk",
];

const INCOMPLETE_PHRASES: &[&str] = &[
    "incomplete",
    "ended unexpectedly",
    "premature end",
    "unexpected end",
    "stream ended",
    "before completion",
];

const PROVIDER_PHRASES: &[&str] = &[
    "rate limit",
    "rate_limit",
    "too many requests",
    "429",
    "overloaded",
    "capacity",
    "quota",
    "503",
];

const CONNECTION_PHRASES: &[&str] = &[
    "econnreset",
    "econnrefused",
    "enotfound",
    "epipe",
    "connection",
    "socket",
    "network",
    "broken pipe",
    "fetch failed",
];

/// Classify a mid-stream failure from its message
pub fn classify_stream_message(message: &str) -> StreamErrorKind {
    let lower = message.to_lowercase();
    if contains_any(&lower, CANCELLED_PHRASES) {
        StreamErrorKind::Cancelled
    } else if contains_any(&lower, TIMEOUT_PHRASES) {
        StreamErrorKind::Timeout
    } else if contains_any(&lower, PARSE_PHRASES) {
        StreamErrorKind::Parse
    } else if contains_any(&lower, INCOMPLETE_PHRASES) {
        StreamErrorKind::Incomplete
    } else if contains_any(&lower, PROVIDER_PHRASES) {
        StreamErrorKind::Provider
    } else if contains_any(&lower, CONNECTION_PHRASES) {
        StreamErrorKind::Connection
    } else {
        StreamErrorKind::Unknown
    }
}

/// Classify a mid-stream failure, preferring typed signals in the source chain
pub fn classify_stream_error(error: &(dyn Error + 'static)) -> StreamErrorKind {
    for cause in error_chain(error) {
        if let Some(kind) = typed_kind(cause) {
            return kind;
        }
    }
    for cause in error_chain(error) {
        let kind = classify_stream_message(&cause.to_string());
        if kind != StreamErrorKind::Unknown {
            return kind;
        }
    }
    StreamErrorKind::Unknown
}

/// Whether a retry has a realistic chance of succeeding.
///
/// Parse errors tend to recur and provider errors belong to the failover
/// layer. Cancellation is only retried when the caller opts in.
pub fn is_recoverable_stream_error(kind: StreamErrorKind) -> bool {
    matches!(
        kind,
        StreamErrorKind::Connection | StreamErrorKind::Timeout | StreamErrorKind::Incomplete
    )
}

fn typed_kind(error: &(dyn Error + 'static)) -> Option<StreamErrorKind> {
    if let Some(fault) = error.downcast_ref::<StreamFault>() {
        return Some(fault.kind);
    }
    if error.is::<serde_json::Error>() {
        return Some(StreamErrorKind::Parse);
    }
    if error.is::<tokio::time::error::Elapsed>() {
        return Some(StreamErrorKind::Timeout);
    }
    if let Some(io) = error.downcast_ref::<std::io::Error>() {
        return match io.kind() {
            ErrorKind::TimedOut => Some(StreamErrorKind::Timeout),
            ErrorKind::UnexpectedEof => Some(StreamErrorKind::Incomplete),
            ErrorKind::InvalidData => Some(StreamErrorKind::Parse),
            ErrorKind::ConnectionRefused
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::NotConnected
            | ErrorKind::BrokenPipe => Some(StreamErrorKind::Connection),
            _ => None,
        };
    }
    if let Some(upstream) = error.downcast_ref::<UpstreamError>() {
        return match upstream.status? {
            408 | 504 => Some(StreamErrorKind::Timeout),
            429 | 503 | 529 => Some(StreamErrorKind::Provider),
            _ => None,
        };
    }
    None
}
