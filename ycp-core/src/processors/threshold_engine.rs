//! ThresholdEngine processor.
//!
//! The ThresholdEngine is responsible for:
//! - Incrementing and reading the store counter of every matched key
//! - Resetting a counter once it exceeds its threshold
//! - Extending the run's budget and emitting an `Action` on each crossing
//! - Updating the run's `Stats`
//!
//! Store failures are handled per match: the failing match is skipped with a
//! warning and processing continues with the next one.

use crate::config::ThresholdConfig;
use crate::context::RunContext;
use crate::events::{Action, Comment, PatternKey};
use crate::processors::stop_signal::StopSignal;
use crate::sink::ActionSink;
use crate::store::{CounterStore, StoreError};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Result of running one comment's matches through the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventDisposition {
    /// Every match was attempted and the comment was counted.
    Completed {
        /// Matches whose increment and read both succeeded.
        counted: usize,
        /// Matches that crossed their threshold.
        crossings: usize,
    },
    /// The stop signal fired mid-comment. No stat of the comment was
    /// recorded.
    Abandoned,
}

/// What happened to a single counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CounterUpdate {
    Counted { value: i64 },
    Crossed { value: i64 },
    /// Past the threshold, but the stop fired before the reset. The counter
    /// is left as read.
    Stopped { value: i64 },
}

/// Applies the counter policy to matched keys.
///
/// The increment, read and reset for one key run under a per-key lock, so
/// they behave as one serialized step even if the engine is shared between
/// tasks. Different keys never wait on each other.
pub struct ThresholdEngine {
    store: Arc<dyn CounterStore>,
    threshold: ThresholdConfig,
    op_timeout: Duration,
    key_locks: Mutex<HashMap<PatternKey, Arc<tokio::sync::Mutex<()>>>>,
}

impl ThresholdEngine {
    pub fn new(
        store: Arc<dyn CounterStore>,
        threshold: ThresholdConfig,
        op_timeout: Duration,
    ) -> Self {
        Self {
            store,
            threshold,
            op_timeout,
            key_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn threshold(&self) -> &ThresholdConfig {
        &self.threshold
    }

    /// Run every key matched by `comment` through the counter policy.
    ///
    /// Keys are processed in the given order. The stop signal is checked
    /// before each key and again before a crossing resets its counter. Once
    /// the stop is observed the comment is abandoned: its stats are never
    /// recorded and no further counter is reset or action emitted.
    ///
    /// A crossing whose reset went ahead is always completed, so a reset
    /// counter is never left without its action.
    pub async fn process_matches(
        &self,
        comment: &Comment,
        keys: &[PatternKey],
        ctx: &mut RunContext,
        sink: &dyn ActionSink,
        stop: &StopSignal,
    ) -> EventDisposition {
        let mut counted = 0;
        let mut crossings = 0;

        for key in keys {
            if stop.is_stopped() {
                debug!(sequence = comment.sequence, %key, "Stop observed, abandoning comment");
                return EventDisposition::Abandoned;
            }

            match self.apply(key, stop).await {
                Ok(CounterUpdate::Counted { value }) => {
                    debug!(%key, value, "Counter incremented");
                }
                Ok(CounterUpdate::Crossed { value }) => {
                    ctx.budget.extend();
                    info!(
                        %key,
                        value,
                        total_limit = ctx.budget.total_limit(),
                        "Threshold crossed"
                    );
                    sink.deliver(&Action {
                        key: key.clone(),
                        sequence: comment.sequence,
                    });
                    crossings += 1;
                }
                Ok(CounterUpdate::Stopped { value }) => {
                    debug!(
                        sequence = comment.sequence,
                        %key,
                        value,
                        "Stop observed before reset, abandoning comment"
                    );
                    return EventDisposition::Abandoned;
                }
                Err(e) => {
                    warn!(
                        sequence = comment.sequence,
                        %key,
                        error = %e,
                        "Counter update failed, skipping match"
                    );
                    continue;
                }
            }

            counted += 1;
        }

        ctx.stats.record_matches(counted as u64);
        ctx.stats.record_comment();
        EventDisposition::Completed { counted, crossings }
    }

    /// Increment, read and, past the threshold, reset the counter for `key`.
    async fn apply(
        &self,
        key: &PatternKey,
        stop: &StopSignal,
    ) -> Result<CounterUpdate, StoreError> {
        let lock = self.key_lock(key);
        let _guard = lock.lock().await;

        self.with_timeout(self.store.increment(key)).await?;
        let value = self.with_timeout(self.store.get(key)).await?;

        if value <= self.threshold.limit_for(key) {
            return Ok(CounterUpdate::Counted { value });
        }

        if stop.is_stopped() {
            return Ok(CounterUpdate::Stopped { value });
        }

        // A failed reset leaves the counter high; the crossing still counts.
        if let Err(e) = self.with_timeout(self.store.reset(key)).await {
            warn!(%key, error = %e, "Failed to reset counter after crossing");
        }
        Ok(CounterUpdate::Crossed { value })
    }

    fn key_lock(&self, key: &PatternKey) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.key_locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(key.clone()).or_default())
    }

    async fn with_timeout<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match tokio::time::timeout(self.op_timeout, op).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout(self.op_timeout)),
        }
    }
}
