//! Delivery of threshold-crossing actions to the caller.

use crate::events::Action;
use std::sync::{Mutex, PoisonError};

/// Receives each [`Action`] synchronously, at the moment the crossing fires.
///
/// Implementations must not block for long: delivery happens on the
/// consumer task, between two counter operations.
pub trait ActionSink: Send + Sync {
    fn deliver(&self, action: &Action);
}

impl<F> ActionSink for F
where
    F: Fn(&Action) + Send + Sync,
{
    fn deliver(&self, action: &Action) {
        self(action)
    }
}

/// Keeps every delivered action in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    actions: Mutex<Vec<Action>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn actions(&self) -> Vec<Action> {
        self.actions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ActionSink for RecordingSink {
    fn deliver(&self, action: &Action) {
        self.actions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(action.clone());
    }
}
