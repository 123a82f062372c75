//! Engine configuration and tracing setup.

use std::time::Duration;

use serde::Deserialize;
use tracing::Level;

/// Non-secret engine settings, deserializable from a TOML section of the
/// host's config file. Every field has a default so an empty table works.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QuestlineConfig {
    /// TTL for the quest-list checkpoint blob in the durable cache.
    pub cache_ttl_seconds: u64,
    /// Cache key prefix; the user id is appended.
    pub cache_key_prefix: String,
    /// Capacity of the transition event channel.
    pub event_capacity: usize,
    pub log_level: LogLevel,
}

impl Default for QuestlineConfig {
    fn default() -> Self {
        Self {
            cache_ttl_seconds: 86_400,
            cache_key_prefix: "questline:quests".to_string(),
            event_capacity: 256,
            log_level: LogLevel::Info,
        }
    }
}

impl QuestlineConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    pub const fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<&LogLevel> for Level {
    fn from(level: &LogLevel) -> Self {
        match level {
            LogLevel::Error => Self::ERROR,
            LogLevel::Warn => Self::WARN,
            LogLevel::Info => Self::INFO,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Trace => Self::TRACE,
        }
    }
}

pub fn setup_tracing(log_level: &LogLevel) {
    let level: Level = log_level.into();
    let default_filter = format!("questline={level}");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();
}
