//! Run-scoped configuration.

use super::pattern::MatchPolicy;
use crate::events::{DEFAULT_CHANNEL_BUFFER, PatternKey};
use std::collections::HashMap;
use std::time::Duration;

/// Default I/O timeout for a single counter store operation.
pub const DEFAULT_STORE_OP_TIMEOUT: Duration = Duration::from_secs(2);

/// Threshold applied to pattern counters.
///
/// A single global `limit` is shared by all patterns unless a pattern carries
/// its own override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThresholdConfig {
    pub limit: i64,
    overrides: HashMap<PatternKey, i64>,
}

impl ThresholdConfig {
    pub fn new(limit: i64) -> Self {
        Self {
            limit,
            overrides: HashMap::new(),
        }
    }

    pub fn with_override(mut self, key: PatternKey, limit: i64) -> Self {
        self.overrides.insert(key, limit);
        self
    }

    /// Effective threshold for `key`.
    pub fn limit_for(&self, key: &PatternKey) -> i64 {
        self.overrides.get(key).copied().unwrap_or(self.limit)
    }
}

/// Everything the ingestion pipeline needs for one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Initial action budget. Grows by one per threshold crossing.
    pub total_limit: u64,
    /// Wall-clock limit of the run.
    pub time_limit: Duration,
    /// Terminal marker. An empty marker never ends the run.
    pub final_comment: String,
    pub threshold: ThresholdConfig,
    pub policy: MatchPolicy,
    pub channel_capacity: usize,
    pub store_op_timeout: Duration,
}

impl RunConfig {
    /// Build a config with the stock defaults: a budget of
    /// 100 actions, one hour, a counter limit of 5 and the repeated-character
    /// policy.
    pub fn new(final_comment: impl Into<String>) -> Self {
        Self {
            total_limit: 100,
            time_limit: Duration::from_secs(3600),
            final_comment: final_comment.into(),
            threshold: ThresholdConfig::new(5),
            policy: MatchPolicy::RepeatedCharacter,
            channel_capacity: DEFAULT_CHANNEL_BUFFER,
            store_op_timeout: DEFAULT_STORE_OP_TIMEOUT,
        }
    }

    pub fn with_total_limit(mut self, total_limit: u64) -> Self {
        self.total_limit = total_limit;
        self
    }

    pub fn with_time_limit(mut self, time_limit: Duration) -> Self {
        self.time_limit = time_limit;
        self
    }

    pub fn with_threshold(mut self, threshold: ThresholdConfig) -> Self {
        self.threshold = threshold;
        self
    }

    /// Switch to the given policy. Per-pattern limits are folded into the
    /// threshold overrides.
    pub fn with_policy(mut self, policy: MatchPolicy) -> Self {
        for pattern in policy.patterns() {
            if let Some(limit) = pattern.limit {
                self.threshold = self.threshold.with_override(pattern.key.clone(), limit);
            }
        }
        self.policy = policy;
        self
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    pub fn with_store_op_timeout(mut self, timeout: Duration) -> Self {
        self.store_op_timeout = timeout;
        self
    }
}
