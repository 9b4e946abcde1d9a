//! Comment matching.
//!
//! Matching is pure and total: every comment yields a [`MatchSet`], possibly
//! empty. Keys come out in a stable order (configuration order for the
//! substring policy, first occurrence for the repeated-character policy) so
//! counter updates are deterministic for a given comment.

use crate::config::{MatchPolicy, Pattern};
use crate::events::{MatchSet, MatchedKeys, PatternKey};
use itertools::Itertools;

/// Maps a comment to the pattern keys it satisfies.
pub trait EventMatcher: Send + Sync {
    fn match_comment(&self, text: &str) -> MatchSet;
}

/// Decides whether character `c` of `text` counts as a match, given the
/// terminal marker.
pub type CharPredicate = fn(c: char, text: &str, marker: &str) -> bool;

/// `c` occurs at least twice in `text` and also occurs in `marker`.
pub fn repeated_marker_char(c: char, text: &str, marker: &str) -> bool {
    marker.contains(c) && text.chars().filter(|&other| other == c).nth(1).is_some()
}

/// Substring that ends the run when a comment contains it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalMarker(String);

impl TerminalMarker {
    pub fn new(marker: impl Into<String>) -> Self {
        Self(marker.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// An empty marker never matches.
    pub fn matches(&self, text: &str) -> bool {
        !self.0.is_empty() && text.contains(self.0.as_str())
    }
}

/// Matches configured words as substrings of the comment.
#[derive(Debug, Clone)]
pub struct SubstringMatcher {
    patterns: Vec<Pattern>,
    marker: TerminalMarker,
}

impl SubstringMatcher {
    pub fn new(patterns: Vec<Pattern>, marker: TerminalMarker) -> Self {
        Self { patterns, marker }
    }
}

impl EventMatcher for SubstringMatcher {
    fn match_comment(&self, text: &str) -> MatchSet {
        let keys: MatchedKeys = self
            .patterns
            .iter()
            .filter(|pattern| text.contains(pattern.word.as_str()))
            .map(|pattern| pattern.key.clone())
            .unique()
            .collect();
        MatchSet {
            keys,
            is_terminal: self.marker.matches(text),
        }
    }
}

/// Turns qualifying characters of the comment into keys of their own.
#[derive(Debug, Clone)]
pub struct RepeatedCharacterMatcher {
    marker: TerminalMarker,
    predicate: CharPredicate,
}

impl RepeatedCharacterMatcher {
    pub fn new(marker: TerminalMarker) -> Self {
        Self::with_predicate(marker, repeated_marker_char)
    }

    pub fn with_predicate(marker: TerminalMarker, predicate: CharPredicate) -> Self {
        Self { marker, predicate }
    }
}

impl EventMatcher for RepeatedCharacterMatcher {
    fn match_comment(&self, text: &str) -> MatchSet {
        let marker = self.marker.as_str();
        let keys: MatchedKeys = text
            .chars()
            .unique()
            .filter(|&c| (self.predicate)(c, text, marker))
            .map(PatternKey::from_char)
            .collect();
        MatchSet {
            keys,
            is_terminal: self.marker.matches(text),
        }
    }
}

/// Build the matcher for `policy`.
pub fn build_matcher(policy: &MatchPolicy, marker: TerminalMarker) -> Box<dyn EventMatcher> {
    match policy {
        MatchPolicy::Substring(patterns) => {
            Box::new(SubstringMatcher::new(patterns.clone(), marker))
        }
        MatchPolicy::RepeatedCharacter => Box::new(RepeatedCharacterMatcher::new(marker)),
    }
}
