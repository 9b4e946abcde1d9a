//! First-wins stop signal shared by every task of a run.
//!
//! Generalises a `watch::Sender<bool>` shutdown flag to carry the cause of
//! the stop. Only the first [`StopSignal::trigger`] records its outcome;
//! every later call is a no-op that reports the outcome which won.

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;

/// The single cause that ended a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// A comment contained the terminal marker.
    TerminalEventSeen,
    /// Actions sent reached the (possibly extended) budget.
    BudgetExhausted,
    /// The wall-clock limit elapsed.
    DeadlineExpired,
    /// An external stop request arrived.
    Interrupted,
    /// The source ended before any other cause fired.
    SourceExhausted,
}

impl std::fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            RunOutcome::TerminalEventSeen => "terminal comment seen",
            RunOutcome::BudgetExhausted => "command budget exhausted",
            RunOutcome::DeadlineExpired => "time limit reached",
            RunOutcome::Interrupted => "interrupted",
            RunOutcome::SourceExhausted => "comment source exhausted",
        };
        f.write_str(text)
    }
}

/// Cloneable handle to the run's stop state.
#[derive(Debug, Clone)]
pub struct StopSignal {
    tx: Arc<watch::Sender<Option<RunOutcome>>>,
}

impl StopSignal {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Record `outcome` if nothing stopped the run yet.
    ///
    /// Returns the outcome that actually stopped the run, which is `outcome`
    /// only for the first caller.
    pub fn trigger(&self, outcome: RunOutcome) -> RunOutcome {
        let mut winner = outcome;
        self.tx.send_if_modified(|current| match current {
            Some(existing) => {
                winner = *existing;
                false
            }
            None => {
                *current = Some(outcome);
                true
            }
        });
        winner
    }

    pub fn outcome(&self) -> Option<RunOutcome> {
        *self.tx.borrow()
    }

    pub fn is_stopped(&self) -> bool {
        self.outcome().is_some()
    }

    /// Wait until the run is stopped and return the winning outcome.
    ///
    /// Completes immediately if the signal already fired.
    pub async fn stopped(&self) -> RunOutcome {
        let mut rx = self.tx.subscribe();
        let outcome = match rx.wait_for(Option::is_some).await {
            Ok(value) => *value,
            // The sender lives in `self`, so the channel cannot close while we wait.
            Err(_) => None,
        };
        match outcome {
            Some(outcome) => outcome,
            None => std::future::pending().await,
        }
    }
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}
