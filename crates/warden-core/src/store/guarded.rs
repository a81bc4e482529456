//! Timeout wrapper for a shared counter store

use super::{CounterStore, StoreError, WindowHit, WindowTotal};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Bounds every call to the wrapped store.
///
/// A call that outlives the timeout resolves to [`StoreError::Timeout`],
/// which callers treat like any other store outage.
#[derive(Clone)]
pub struct GuardedStore {
    inner: Arc<dyn CounterStore>,
    timeout: Duration,
}

impl GuardedStore {
    pub fn new(inner: Arc<dyn CounterStore>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout(self.timeout)),
        }
    }
}

impl std::fmt::Debug for GuardedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardedStore")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl CounterStore for GuardedStore {
    async fn hit(&self, key: &str, limit: u64, window: Duration) -> Result<WindowHit, StoreError> {
        self.bounded(self.inner.hit(key, limit, window)).await
    }

    async fn add(
        &self,
        key: &str,
        amount: f64,
        window: Duration,
    ) -> Result<WindowTotal, StoreError> {
        self.bounded(self.inner.add(key, amount, window)).await
    }

    async fn total(&self, key: &str) -> Result<Option<WindowTotal>, StoreError> {
        self.bounded(self.inner.total(key)).await
    }

    async fn swap(&self, key: &str, value: u64, ttl: Duration) -> Result<Option<u64>, StoreError> {
        self.bounded(self.inner.swap(key, value, ttl)).await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.bounded(self.inner.delete(key)).await
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<(), StoreError> {
        self.bounded(self.inner.delete_prefix(prefix)).await
    }
}
