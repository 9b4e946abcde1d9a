//! Configuration types for a single ingestion run.
//!
//! These types represent the validated runtime configuration. Loading and
//! parsing from files or the environment is handled by the CLI crate.

mod pattern;
mod run;

pub use pattern::{MatchPolicy, Pattern};
pub use run::{DEFAULT_STORE_OP_TIMEOUT, RunConfig, ThresholdConfig};
