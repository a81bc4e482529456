//! Spend guarding
//!
//! Tracks cost over a rolling hour and a rolling day. By default the guard
//! only reports; with `block_on_limit` it also denies requests once a
//! window is exceeded.

mod guard;
mod types;

#[cfg(test)]
mod tests;

pub use guard::SpendingGuard;
pub use types::{SpendLevel, SpendRecord, SpendingConfig, SpendingStatus, WindowStatus};
