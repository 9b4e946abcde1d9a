//! Pattern and matching policy configuration.

use crate::events::PatternKey;

/// A configured (key, word) pair for the substring policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    pub key: PatternKey,
    /// Substring that must appear in a comment for the pattern to match.
    pub word: String,
    /// Overrides the global threshold for this pattern's counter.
    pub limit: Option<i64>,
}

impl Pattern {
    pub fn new(key: impl Into<PatternKey>, word: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            word: word.into(),
            limit: None,
        }
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// How comments are turned into pattern keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchPolicy {
    /// Each configured pattern matches when its word is a substring of the comment.
    Substring(Vec<Pattern>),
    /// Every character repeated within a comment that also occurs in the
    /// terminal marker becomes a key of its own.
    RepeatedCharacter,
}

impl MatchPolicy {
    /// Configured patterns, empty for the repeated-character policy.
    pub fn patterns(&self) -> &[Pattern] {
        match self {
            MatchPolicy::Substring(patterns) => patterns,
            MatchPolicy::RepeatedCharacter => &[],
        }
    }
}
