//! Bounded in-memory tables
//!
//! Every per-identifier table the layer keeps in process memory goes
//! through [`BoundedLruMap`], so a flood of distinct (possibly spoofed)
//! identifiers evicts old entries instead of growing without limit.

mod bounded_map;


pub use bounded_map::{BoundedLruMap, DEFAULT_CAPACITY};
