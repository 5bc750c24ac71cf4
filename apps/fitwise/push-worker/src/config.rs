//! Worker configuration loaded from the environment.

use core_config::{env_list, env_or_default, env_parse, ConfigError, FromEnv};
use domain_notifications::{Channel, RedisStoreConfig, DEFAULT_TITLE};
use std::str::FromStr;

/// Runtime settings for the push worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// HTTP port for the trigger, health and metrics endpoints.
    pub port: u16,
    pub redis_url: String,
    /// Title used when a record has none.
    pub default_title: String,
    /// Channels to fan out to, in configured order without duplicates.
    pub channels: Vec<Channel>,
    pub store: RedisStoreConfig,
}

impl WorkerConfig {
    pub fn addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

fn parse_channels(raw: Vec<String>) -> Result<Vec<Channel>, ConfigError> {
    let mut channels = Vec::with_capacity(raw.len());
    for name in raw {
        let channel = Channel::from_str(&name).map_err(|e| ConfigError::ParseError {
            key: "NOTIFICATION_CHANNELS".to_string(),
            details: format!("'{}': {}", name, e),
        })?;
        if !channels.contains(&channel) {
            channels.push(channel);
        }
    }
    if channels.is_empty() {
        return Err(ConfigError::ParseError {
            key: "NOTIFICATION_CHANNELS".to_string(),
            details: "at least one channel is required".to_string(),
        });
    }
    Ok(channels)
}

impl FromEnv for WorkerConfig {
    fn from_env() -> Result<Self, ConfigError> {
        // PUSH_WORKER_PORT wins over the platform-provided PORT
        let port = match std::env::var("PUSH_WORKER_PORT") {
            Ok(_) => env_parse("PUSH_WORKER_PORT", 8080)?,
            Err(_) => env_parse("PORT", 8080)?,
        };

        let redis_url = std::env::var("REDIS_URL")
            .or_else(|_| std::env::var("REDIS_HOST"))
            .map_err(|_| ConfigError::MissingEnvVar("REDIS_URL or REDIS_HOST".to_string()))?;

        let defaults = RedisStoreConfig::default();
        let store = RedisStoreConfig {
            preferences_prefix: env_or_default("USER_SETTINGS_PREFIX", &defaults.preferences_prefix),
            tokens_prefix: env_or_default("USER_TOKENS_PREFIX", &defaults.tokens_prefix),
        };

        Ok(Self {
            port,
            redis_url,
            default_title: env_or_default("NOTIFICATION_DEFAULT_TITLE", DEFAULT_TITLE),
            channels: parse_channels(env_list("NOTIFICATION_CHANNELS", "push"))?,
            store,
        })
    }
}
