//! Error classification
//!
//! Provider call failures and mid-stream failures use different
//! vocabularies, so there are two classifiers. Both look at typed signals
//! in the error's source chain first (HTTP status, IO error kind, elapsed
//! deadlines) and fall back to phrase matching on the rendered messages.
//!
//! The provider classifier is deliberately permissive: an unneeded
//! failover attempt costs far less than giving up on a transient blip.

mod provider;
mod stream;


pub use provider::{ErrorClass, classify_error, classify_message, is_provider_error, is_provider_message};
pub use stream::{
    StreamErrorKind, classify_stream_error, classify_stream_message, is_recoverable_stream_error,
};

use std::error::Error;

/// Walk an error and every source below it
pub(crate) fn error_chain<'a>(
    error: &'a (dyn Error + 'static),
) -> impl Iterator<Item = &'a (dyn Error + 'static)> {
    std::iter::successors(Some(error), |&current| current.source())
}
