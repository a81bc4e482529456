//! Store doubles shared by component tests

use super::{CounterStore, StoreError, WindowHit, WindowTotal};
use async_trait::async_trait;
use std::time::Duration;

/// Store whose calls never complete
pub(crate) struct HangingStore;

#[async_trait]
impl CounterStore for HangingStore {
    async fn hit(&self, _key: &str, _limit: u64, _window: Duration) -> Result<WindowHit, StoreError> {
        std::future::pending().await
    }

    async fn add(
        &self,
        _key: &str,
        _amount: f64,
        _window: Duration,
    ) -> Result<WindowTotal, StoreError> {
        std::future::pending().await
    }

    async fn total(&self, _key: &str) -> Result<Option<WindowTotal>, StoreError> {
        std::future::pending().await
    }

    async fn swap(&self, _key: &str, _value: u64, _ttl: Duration) -> Result<Option<u64>, StoreError> {
        std::future::pending().await
    }

    async fn delete(&self, _key: &str) -> Result<(), StoreError> {
        std::future::pending().await
    }

    async fn delete_prefix(&self, _prefix: &str) -> Result<(), StoreError> {
        std::future::pending().await
    }
}
