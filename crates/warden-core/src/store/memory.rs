//! Process-local counter store

use super::{CounterStore, StoreError, WindowHit, WindowTotal, duration_ms};
use crate::cache::BoundedLruMap;
use crate::clock::Clock;
use crate::error::WardenResult;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
enum Slot {
    Counter { count: u64, reset_at_ms: u64 },
    Total { total: f64, reset_at_ms: u64 },
    Stamp { value: u64, expires_at_ms: u64 },
}

impl Slot {
    fn expires_at_ms(&self) -> u64 {
        match *self {
            Self::Counter { reset_at_ms, .. } | Self::Total { reset_at_ms, .. } => reset_at_ms,
            Self::Stamp { expires_at_ms, .. } => expires_at_ms,
        }
    }

    fn is_live(&self, now_ms: u64) -> bool {
        now_ms < self.expires_at_ms()
    }
}

/// Counter store over a [`BoundedLruMap`].
///
/// Each operation takes the table lock once and never suspends while
/// holding it, which makes every read-modify-write atomic with respect to
/// concurrent requests in this process.
#[derive(Debug)]
pub struct LocalCounterStore {
    slots: Mutex<BoundedLruMap<String, Slot>>,
    clock: Arc<dyn Clock>,
}

impl LocalCounterStore {
    pub fn new(capacity: usize, clock: Arc<dyn Clock>) -> WardenResult<Self> {
        Ok(Self {
            slots: Mutex::new(BoundedLruMap::new(capacity)?),
            clock,
        })
    }

    pub fn hit_now(&self, key: &str, limit: u64, window: Duration) -> WindowHit {
        let now = self.clock.now_ms();
        let mut slots = self.slots.lock();

        if let Some(Slot::Counter { count, reset_at_ms }) = slots.get_mut(key) {
            if now < *reset_at_ms {
                let resets_in = Duration::from_millis(*reset_at_ms - now);
                if *count >= limit {
                    return WindowHit {
                        count: *count,
                        accepted: false,
                        resets_in,
                    };
                }
                *count += 1;
                return WindowHit {
                    count: *count,
                    accepted: true,
                    resets_in,
                };
            }
        }

        if limit == 0 {
            return WindowHit {
                count: 0,
                accepted: false,
                resets_in: window,
            };
        }
        slots.set(
            key.to_string(),
            Slot::Counter {
                count: 1,
                reset_at_ms: now.saturating_add(duration_ms(window)),
            },
        );
        WindowHit {
            count: 1,
            accepted: true,
            resets_in: window,
        }
    }

    pub fn add_now(&self, key: &str, amount: f64, window: Duration) -> WindowTotal {
        let now = self.clock.now_ms();
        let mut slots = self.slots.lock();

        if let Some(Slot::Total { total, reset_at_ms }) = slots.get_mut(key) {
            if now < *reset_at_ms {
                *total += amount;
                return WindowTotal {
                    total: *total,
                    resets_in: Duration::from_millis(*reset_at_ms - now),
                };
            }
        }

        slots.set(
            key.to_string(),
            Slot::Total {
                total: amount,
                reset_at_ms: now.saturating_add(duration_ms(window)),
            },
        );
        WindowTotal {
            total: amount,
            resets_in: window,
        }
    }

    pub fn total_now(&self, key: &str) -> Option<WindowTotal> {
        let now = self.clock.now_ms();
        let slots = self.slots.lock();
        match slots.peek(key) {
            Some(Slot::Total { total, reset_at_ms }) if now < *reset_at_ms => Some(WindowTotal {
                total: *total,
                resets_in: Duration::from_millis(*reset_at_ms - now),
            }),
            _ => None,
        }
    }

    pub fn swap_now(&self, key: &str, value: u64, ttl: Duration) -> Option<u64> {
        let now = self.clock.now_ms();
        let mut slots = self.slots.lock();

        let previous = match slots.peek(key) {
            Some(Slot::Stamp {
                value,
                expires_at_ms,
            }) if now < *expires_at_ms => Some(*value),
            _ => None,
        };
        slots.set(
            key.to_string(),
            Slot::Stamp {
                value,
                expires_at_ms: now.saturating_add(duration_ms(ttl)),
            },
        );
        previous
    }

    pub fn delete_now(&self, key: &str) {
        self.slots.lock().delete(key);
    }

    pub fn delete_prefix_now(&self, prefix: &str) -> usize {
        self.slots.lock().delete_where(|key| key.starts_with(prefix))
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        let now = self.clock.now_ms();
        self.slots
            .lock()
            .iter()
            .filter(|(_, slot)| slot.is_live(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.slots.lock().capacity()
    }

    pub fn clear(&self) {
        self.slots.lock().clear();
    }
}

#[async_trait]
impl CounterStore for LocalCounterStore {
    async fn hit(&self, key: &str, limit: u64, window: Duration) -> Result<WindowHit, StoreError> {
        Ok(self.hit_now(key, limit, window))
    }

    async fn add(
        &self,
        key: &str,
        amount: f64,
        window: Duration,
    ) -> Result<WindowTotal, StoreError> {
        Ok(self.add_now(key, amount, window))
    }

    async fn total(&self, key: &str) -> Result<Option<WindowTotal>, StoreError> {
        Ok(self.total_now(key))
    }

    async fn swap(&self, key: &str, value: u64, ttl: Duration) -> Result<Option<u64>, StoreError> {
        Ok(self.swap_now(key, value, ttl))
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.delete_now(key);
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<(), StoreError> {
        self.delete_prefix_now(prefix);
        Ok(())
    }
}
