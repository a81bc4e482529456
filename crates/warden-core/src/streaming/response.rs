//! Construction-time failure handling for streaming responses

use super::types::{FallbackResponse, StreamResponse};
use crate::recovery::classifier::classify_stream_error;
use std::error::Error;

const FALLBACK_STATUS: u16 = 503;
const DEFAULT_FALLBACK_MESSAGE: &str =
    "The response stream could not be started. Please try again in a moment.";

/// Turn the result of building a stream into something the host can
/// always send: the stream itself, or a 503 body carrying `fallback_message`
pub fn create_recoverable_stream_response<S, E>(
    built: Result<S, E>,
    fallback_message: Option<&str>,
) -> StreamResponse<S>
where
    E: Error + 'static,
{
    match built {
        Ok(stream) => StreamResponse::Streaming(stream),
        Err(error) => {
            let kind = classify_stream_error(&error);
            tracing::error!(kind = %kind, error = %error, "Failed to start response stream");
            StreamResponse::Fallback(FallbackResponse {
                status: FALLBACK_STATUS,
                message: fallback_message
                    .unwrap_or(DEFAULT_FALLBACK_MESSAGE)
                    .to_string(),
                kind,
            })
        }
    }
}
