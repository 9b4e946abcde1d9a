//! TOML file configuration structures.
//!
//! These structs directly map to the `ycp-config.toml` file format. Every
//! section is optional; a missing field falls back to its stock default.

use serde::{Deserialize, Serialize};
use url::Url;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub run: RunSection,
    #[serde(default)]
    pub source: SourceSection,
    #[serde(default)]
    pub matcher: MatcherSection,
    #[serde(default)]
    pub store: StoreSection,
}

/// Run limits section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSection {
    /// Initial action budget.
    #[serde(default = "default_total_limit")]
    pub total_limit: u64,
    /// Wall-clock limit in seconds.
    #[serde(default = "default_time_limit_secs")]
    pub time_limit_secs: u64,
    /// Comment that ends the run. Empty disables the terminal marker.
    #[serde(default)]
    pub final_comment: String,
    /// Global counter threshold.
    #[serde(default = "default_counter_limit")]
    pub counter_limit: i64,
}

fn default_total_limit() -> u64 {
    100
}

fn default_time_limit_secs() -> u64 {
    3600
}

fn default_counter_limit() -> i64 {
    5
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            total_limit: default_total_limit(),
            time_limit_secs: default_time_limit_secs(),
            final_comment: String::new(),
            counter_limit: default_counter_limit(),
        }
    }
}

/// Comment source section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSection {
    /// Live stream endpoint, shown on the home screen.
    #[serde(default)]
    pub api_connection: Option<Url>,
    /// Delay between two comments of the built-in and file sources.
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,
    /// Capacity of the producer/consumer channel.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_pacing_ms() -> u64 {
    1000
}

fn default_channel_capacity() -> usize {
    ycp_core::events::DEFAULT_CHANNEL_BUFFER
}

impl Default for SourceSection {
    fn default() -> Self {
        Self {
            api_connection: None,
            pacing_ms: default_pacing_ms(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

/// Matching policy name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    #[default]
    RepeatedCharacter,
    Substring,
}

/// Matcher section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatcherSection {
    #[serde(default)]
    pub policy: PolicyKind,
    #[serde(default)]
    pub patterns: Vec<PatternEntry>,
}

/// One `[[matcher.patterns]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternEntry {
    pub key: String,
    pub word: String,
    /// Overrides `run.counter_limit` for this pattern.
    #[serde(default)]
    pub limit: Option<i64>,
}

/// Counter store backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    #[default]
    Postgres,
    Memory,
}

/// Counter store section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSection {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// I/O timeout of one counter operation.
    #[serde(default = "default_op_timeout_ms")]
    pub op_timeout_ms: u64,
}

fn default_max_connections() -> u32 {
    5
}

fn default_op_timeout_ms() -> u64 {
    2000
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            max_connections: default_max_connections(),
            op_timeout_ms: default_op_timeout_ms(),
        }
    }
}
