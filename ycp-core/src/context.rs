//! Per-run mutable state owned by the consumer.
//!
//! A `RunContext` is built once per run and moved into the consumer task.
//! Nothing else holds a reference to it while the pipeline is running, so
//! the counters need no synchronization. It is handed back to the caller
//! only after the consumer has exited.

use serde::Serialize;

/// Counts accumulated over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    comments_read: u64,
    letters_typed: u64,
    commands_sent: u64,
}

impl Stats {
    pub fn comments_read(&self) -> u64 {
        self.comments_read
    }

    pub fn letters_typed(&self) -> u64 {
        self.letters_typed
    }

    pub fn commands_sent(&self) -> u64 {
        self.commands_sent
    }

    pub(crate) fn record_comment(&mut self) {
        self.comments_read += 1;
    }

    /// Count `matches` completed counter updates of one comment.
    pub(crate) fn record_matches(&mut self, matches: u64) {
        self.letters_typed += matches;
        self.commands_sent += matches;
    }
}

/// Action budget of a run.
///
/// Every threshold crossing extends the budget by one, so a run that keeps
/// crossing thresholds never stops on the budget alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Budget {
    total_limit: u64,
}

impl Budget {
    pub fn new(total_limit: u64) -> Self {
        Self { total_limit }
    }

    pub fn total_limit(&self) -> u64 {
        self.total_limit
    }

    pub(crate) fn extend(&mut self) {
        self.total_limit += 1;
    }

    pub fn is_exhausted_by(&self, stats: &Stats) -> bool {
        stats.commands_sent >= self.total_limit
    }
}

/// Explicit run state passed from the pipeline into the engine.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub stats: Stats,
    pub budget: Budget,
}

impl RunContext {
    pub fn new(total_limit: u64) -> Self {
        Self {
            stats: Stats::default(),
            budget: Budget::new(total_limit),
        }
    }
}
