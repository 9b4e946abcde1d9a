//! Event type definitions for the ingestion pipeline.
//!
//! Comments are immutable once produced. They carry nothing but their text
//! and their position in the stream.

use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Stable identifier of a pattern and of the counter that backs it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatternKey(CompactString);

impl PatternKey {
    pub fn new(key: impl AsRef<str>) -> Self {
        Self(CompactString::new(key))
    }

    /// Key for a single character, as produced by the repeated-character rule.
    pub fn from_char(c: char) -> Self {
        let mut buf = [0u8; 4];
        Self(CompactString::new(c.encode_utf8(&mut buf)))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for PatternKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for PatternKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<char> for PatternKey {
    fn from(value: char) -> Self {
        Self::from_char(value)
    }
}

/// One inbound comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    /// Zero-based arrival position assigned by the producer.
    pub sequence: u64,
    pub text: String,
}

impl Comment {
    pub fn new(sequence: u64, text: impl Into<String>) -> Self {
        Self {
            sequence,
            text: text.into(),
        }
    }
}

/// Matched keys for one comment, in discovery order and without duplicates.
pub type MatchedKeys = SmallVec<[PatternKey; 4]>;

/// Result of matching a single comment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchSet {
    pub keys: MatchedKeys,
    /// The comment contains the terminal marker.
    pub is_terminal: bool,
}

impl MatchSet {
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Caller-visible side effect of a threshold crossing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Action {
    pub key: PatternKey,
    /// Sequence number of the comment that caused the crossing.
    pub sequence: u64,
}
