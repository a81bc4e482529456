//! Stream recovery
//!
//! Retries stream setup on recoverable failures, turns setup failures into
//! a well-formed fallback response, and tags mid-stream failures with
//! their [`StreamErrorKind`].

mod recovery;
mod response;
mod stream;
mod types;


pub use recovery::with_stream_recovery;
pub use response::create_recoverable_stream_response;
pub use stream::GuardedStream;
pub use types::{
    FallbackResponse, RecoveryCallback, RecoveryFailure, StreamFailure, StreamFault,
    StreamRecoveryOptions, StreamResponse,
};

pub use crate::recovery::classifier::StreamErrorKind;

/// Classify a stream failure
pub fn classify(error: &(dyn std::error::Error + 'static)) -> StreamErrorKind {
    crate::recovery::classifier::classify_stream_error(error)
}

/// Whether a failure of this kind is worth retrying
pub fn is_recoverable(kind: StreamErrorKind) -> bool {
    crate::recovery::classifier::is_recoverable_stream_error(kind)
}
