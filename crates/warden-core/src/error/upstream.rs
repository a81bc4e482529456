//! Error type for outbound provider calls

use thiserror::Error;

/// Failure reported by a provider call.
///
/// Hosts are free to use their own error types with the failover and
/// stream recovery helpers; this one exists so that an HTTP status can
/// travel with the message and be seen by the classifier.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct UpstreamError {
    pub message: String,
    pub status: Option<u16>,
}

impl UpstreamError {
    /// Create an error carrying only a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
        }
    }

    /// Create an error carrying an HTTP status code
    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: Some(status),
        }
    }
}
