//! Configuration module for ycp.
//!
//! Handles loading configuration from TOML files, CLI arguments,
//! and environment variables, and turns it into the runtime types of
//! `ycp_core::config`.

pub mod file;

use crate::config::file::{FileConfig, PolicyKind, StoreBackend};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;
use ycp_core::config::{MatchPolicy, Pattern, RunConfig, ThresholdConfig};

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("DATABASE_URL environment variable not set")]
    MissingDatabaseUrl,
}

/// Values given on the command line that win over the file.
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    pub total_limit: Option<u64>,
    pub time_limit_secs: Option<u64>,
    pub final_comment: Option<String>,
    /// Force the in-process counter store.
    pub memory_store: bool,
}

/// Source settings that stay in the binary.
#[derive(Debug, Clone)]
pub struct SourceSettings {
    pub api_connection: Option<Url>,
    pub pacing: Duration,
}

/// Store settings that stay in the binary.
#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub backend: StoreBackend,
    pub max_connections: u32,
    /// Present whenever the backend is Postgres.
    pub database_url: Option<String>,
}

/// Loaded configuration result containing all parts.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub run: RunConfig,
    pub source: SourceSettings,
    pub store: StoreSettings,
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: PathBuf,
    overrides: RunOverrides,
}

impl ConfigLoader {
    /// Create a new config loader.
    pub fn new(config_path: impl AsRef<Path>, overrides: RunOverrides) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            overrides,
        }
    }

    /// Load and process the configuration.
    ///
    /// This will:
    /// 1. Read the TOML file
    /// 2. Apply CLI overrides
    /// 3. Validate the configuration
    /// 4. Build the runtime configuration
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let config_content = std::fs::read_to_string(&self.config_path)?;
        let file_config: FileConfig = toml::from_str(&config_content)?;
        self.load_from(file_config, get_database_url().ok())
    }

    fn load_from(
        &self,
        mut file_config: FileConfig,
        database_url: Option<String>,
    ) -> Result<LoadedConfig, ConfigError> {
        self.apply_overrides(&mut file_config);
        self.validate(&file_config, database_url.as_deref())?;
        Ok(self.build_loaded_config(file_config, database_url))
    }

    fn apply_overrides(&self, config: &mut FileConfig) {
        if let Some(total_limit) = self.overrides.total_limit {
            config.run.total_limit = total_limit;
        }
        if let Some(time_limit_secs) = self.overrides.time_limit_secs {
            config.run.time_limit_secs = time_limit_secs;
        }
        if let Some(final_comment) = &self.overrides.final_comment {
            config.run.final_comment = final_comment.clone();
        }
        if self.overrides.memory_store {
            config.store.backend = StoreBackend::Memory;
        }
    }

    fn validate(&self, config: &FileConfig, database_url: Option<&str>) -> Result<(), ConfigError> {
        if config.run.counter_limit < 0 {
            return Err(ConfigError::ValidationError(format!(
                "counter_limit must not be negative, got {}",
                config.run.counter_limit
            )));
        }

        if config.source.channel_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "channel_capacity must be at least 1".to_string(),
            ));
        }

        let patterns = &config.matcher.patterns;
        match config.matcher.policy {
            PolicyKind::Substring if patterns.is_empty() => {
                return Err(ConfigError::ValidationError(
                    "substring policy needs at least one pattern".to_string(),
                ));
            }
            PolicyKind::RepeatedCharacter if !patterns.is_empty() => {
                return Err(ConfigError::ValidationError(
                    "patterns are only used by the substring policy".to_string(),
                ));
            }
            _ => {}
        }

        let mut seen = HashSet::new();
        for pattern in patterns {
            if pattern.key.is_empty() {
                return Err(ConfigError::ValidationError(
                    "pattern key must not be empty".to_string(),
                ));
            }
            if pattern.word.is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "pattern {} has an empty word",
                    pattern.key
                )));
            }
            if pattern.limit.is_some_and(|limit| limit < 0) {
                return Err(ConfigError::ValidationError(format!(
                    "pattern {} has a negative limit",
                    pattern.key
                )));
            }
            if !seen.insert(pattern.key.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate pattern key {}",
                    pattern.key
                )));
            }
        }

        if config.store.backend == StoreBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::MissingDatabaseUrl);
        }

        Ok(())
    }

    fn build_loaded_config(
        &self,
        file_config: FileConfig,
        database_url: Option<String>,
    ) -> LoadedConfig {
        let policy = match file_config.matcher.policy {
            PolicyKind::RepeatedCharacter => MatchPolicy::RepeatedCharacter,
            PolicyKind::Substring => MatchPolicy::Substring(
                file_config
                    .matcher
                    .patterns
                    .into_iter()
                    .map(|p| {
                        let pattern = Pattern::new(p.key.as_str(), p.word);
                        match p.limit {
                            Some(limit) => pattern.with_limit(limit),
                            None => pattern,
                        }
                    })
                    .collect(),
            ),
        };

        let run = RunConfig::new(file_config.run.final_comment)
            .with_total_limit(file_config.run.total_limit)
            .with_time_limit(Duration::from_secs(file_config.run.time_limit_secs))
            .with_threshold(ThresholdConfig::new(file_config.run.counter_limit))
            .with_policy(policy)
            .with_channel_capacity(file_config.source.channel_capacity)
            .with_store_op_timeout(Duration::from_millis(file_config.store.op_timeout_ms));

        let backend = file_config.store.backend;
        LoadedConfig {
            run,
            source: SourceSettings {
                api_connection: file_config.source.api_connection,
                pacing: Duration::from_millis(file_config.source.pacing_ms),
            },
            store: StoreSettings {
                backend,
                max_connections: file_config.store.max_connections,
                database_url: database_url.filter(|_| backend == StoreBackend::Postgres),
            },
        }
    }
}

/// Get the database URL from the environment.
pub fn get_database_url() -> Result<String, ConfigError> {
    std::env::var("DATABASE_URL").map_err(|_| ConfigError::MissingDatabaseUrl)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ycp_core::events::PatternKey;

    fn parse(toml_str: &str) -> FileConfig {
        toml::from_str(toml_str).unwrap()
    }

    fn loader(overrides: RunOverrides) -> ConfigLoader {
        ConfigLoader::new("./ycp-config.toml", overrides)
    }

    #[test]
    fn test_overrides_win_over_file() {
        let config = parse(
            r#"
[run]
total_limit = 20
final_comment = "exit"

[store]
backend = "memory"
"#,
        );
        let loaded = loader(RunOverrides {
            total_limit: Some(3),
            time_limit_secs: Some(10),
            final_comment: Some("bye".to_string()),
            memory_store: false,
        })
        .load_from(config, None)
        .unwrap();

        assert_eq!(loaded.run.total_limit, 3);
        assert_eq!(loaded.run.time_limit, Duration::from_secs(10));
        assert_eq!(loaded.run.final_comment, "bye");
    }

    #[test]
    fn test_pattern_limits_become_overrides() {
        let config = parse(
            r#"
[run]
counter_limit = 4

[matcher]
policy = "substring"
patterns = [
    { key = "j", word = "jump", limit = 1 },
    { key = "d", word = "duck" },
]

[store]
backend = "memory"
"#,
        );
        let loaded = loader(RunOverrides::default()).load_from(config, None).unwrap();

        assert_eq!(loaded.run.threshold.limit_for(&PatternKey::new("j")), 1);
        assert_eq!(loaded.run.threshold.limit_for(&PatternKey::new("d")), 4);
        assert_eq!(loaded.run.policy.patterns().len(), 2);
    }

    #[test]
    fn test_duplicate_pattern_keys_are_rejected() {
        let config = parse(
            r#"
[matcher]
policy = "substring"
patterns = [
    { key = "j", word = "jump" },
    { key = "j", word = "jog" },
]

[store]
backend = "memory"
"#,
        );
        let result = loader(RunOverrides::default()).load_from(config, None);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_substring_policy_without_patterns_is_rejected() {
        let config = parse(
            r#"
[matcher]
policy = "substring"

[store]
backend = "memory"
"#,
        );
        let result = loader(RunOverrides::default()).load_from(config, None);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_empty_pattern_word_is_rejected() {
        let config = parse(
            r#"
[matcher]
policy = "substring"
patterns = [{ key = "j", word = "" }]

[store]
backend = "memory"
"#,
        );
        let result = loader(RunOverrides::default()).load_from(config, None);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_zero_channel_capacity_is_rejected() {
        let config = parse(
            r#"
[source]
channel_capacity = 0

[store]
backend = "memory"
"#,
        );
        let result = loader(RunOverrides::default()).load_from(config, None);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_postgres_backend_requires_database_url() {
        let result = loader(RunOverrides::default()).load_from(FileConfig::default(), None);
        assert!(matches!(result, Err(ConfigError::MissingDatabaseUrl)));

        let loaded = loader(RunOverrides::default())
            .load_from(
                FileConfig::default(),
                Some("postgres://localhost/ycp".to_string()),
            )
            .unwrap();
        assert_eq!(
            loaded.store.database_url.as_deref(),
            Some("postgres://localhost/ycp")
        );
    }

    #[test]
    fn test_dev_override_forces_memory_store() {
        let loaded = loader(RunOverrides {
            memory_store: true,
            ..Default::default()
        })
        .load_from(FileConfig::default(), None)
        .unwrap();
        assert_eq!(loaded.store.backend, StoreBackend::Memory);
        assert!(loaded.store.database_url.is_none());
    }
}
