//! Process-local counter store.
//!
//! Used in dev mode and tests. Counters vanish with the process.

use super::{CounterStore, StoreError};
use crate::events::PatternKey;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
pub struct MemoryCounterStore {
    counters: Mutex<HashMap<PatternKey, i64>>,
    closed: AtomicBool,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of every counter that has been touched.
    pub fn snapshot(&self) -> HashMap<PatternKey, i64> {
        self.counters().clone()
    }

    fn counters(&self) -> MutexGuard<'_, HashMap<PatternKey, i64>> {
        // The map holds plain integers, a panic mid-update cannot leave it torn.
        self.counters.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Unavailable("store is closed".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn increment(&self, key: &PatternKey) -> Result<i64, StoreError> {
        self.ensure_open()?;
        let mut counters = self.counters();
        let value = counters.entry(key.clone()).or_insert(0);
        *value += 1;
        Ok(*value)
    }

    async fn get(&self, key: &PatternKey) -> Result<i64, StoreError> {
        self.ensure_open()?;
        Ok(self.counters().get(key).copied().unwrap_or(0))
    }

    async fn reset(&self, key: &PatternKey) -> Result<(), StoreError> {
        self.ensure_open()?;
        self.counters().insert(key.clone(), 0);
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}
