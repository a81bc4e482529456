//! Error types for Warden
//!
//! `WardenError` covers failures of the layer itself (bad configuration,
//! an unreachable counter store, every provider being down). Errors raised
//! by provider calls are never wrapped into it: the failover and stream
//! recovery paths hand the caller's own error type back unchanged.

mod constructors;
mod conversions;
mod types;
mod upstream;

pub use types::{WardenError, WardenResult};
pub use upstream::UpstreamError;
