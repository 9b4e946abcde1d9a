//! Event system for the ingestion pipeline.
//!
//! # Event Flow
//!
//! 1. A comment source yields raw text, the producer stamps it into a `Comment`
//! 2. `Comment` travels over a bounded channel to the consumer
//! 3. The consumer matches it into a `MatchSet` and hands the keys to the
//!    threshold engine
//! 4. Every threshold crossing is delivered to the caller as an `Action`

pub mod channels;
pub mod types;

pub use channels::{CommentReceiver, CommentSender, DEFAULT_CHANNEL_BUFFER, comment_channel};
pub use types::{Action, Comment, MatchSet, MatchedKeys, PatternKey};
