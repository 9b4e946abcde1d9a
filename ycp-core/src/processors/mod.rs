//! Processors of the ingestion pipeline.
//!
//! - `EventMatcher`: turns a comment into matched pattern keys
//! - `ThresholdEngine`: applies the counter policy to matched keys, emits actions
//! - `IngestionPipeline`: runs producer and consumer, arbitrates the stop
//! - `StopSignal`: first-wins cancellation shared by all tasks of a run

pub mod ingestion;
pub mod matcher;
pub mod stop_signal;
pub mod threshold_engine;

pub use ingestion::{IngestionPipeline, PipelineError, RunReport, TERMINAL_EVENT};
pub use matcher::{
    CharPredicate, EventMatcher, RepeatedCharacterMatcher, SubstringMatcher, TerminalMarker,
    build_matcher, repeated_marker_char,
};
pub use stop_signal::{RunOutcome, StopSignal};
pub use threshold_engine::{EventDisposition, ThresholdEngine};
