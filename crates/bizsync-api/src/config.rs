use std::collections::HashMap;
use std::env;
use std::fmt;
use std::ops::RangeInclusive;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub database_path: String,
    pub replica: Option<ReplicaRuntimeConfig>,
    pub presence_ttl: Duration,
    pub sync_timeout: Duration,
    pub rate_limit_window: Duration,
    pub sync_rate_limit_per_window: u32,
}

/// Remote libSQL primary the local database replicates from
#[derive(Clone, PartialEq, Eq)]
pub struct ReplicaRuntimeConfig {
    pub url: String,
    pub auth_token: String,
}

impl fmt::Debug for ReplicaRuntimeConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ReplicaRuntimeConfig")
            .field("url", &self.url)
            .field("auth_token", &"[REDACTED]")
            .finish()
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("database_path", &self.database_path)
            .field("replica", &self.replica)
            .field("presence_ttl", &self.presence_ttl)
            .field("sync_timeout", &self.sync_timeout)
            .field("rate_limit_window", &self.rate_limit_window)
            .field(
                "sync_rate_limit_per_window",
                &self.sync_rate_limit_per_window,
            )
            .finish()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = value_or_default(&lookup, "BIZSYNC_BIND_ADDR", "127.0.0.1:8080");
        let database_path = value_or_default(&lookup, "BIZSYNC_DATABASE_PATH", "bizsync.db");

        let presence_ttl_secs =
            bounded_secs(&lookup, "BIZSYNC_PRESENCE_TTL_SECS", "300", 30..=3_600)?;
        let sync_timeout_secs = bounded_secs(&lookup, "BIZSYNC_SYNC_TIMEOUT_SECS", "30", 1..=300)?;
        let rate_limit_window_secs =
            bounded_secs(&lookup, "BIZSYNC_RATE_LIMIT_WINDOW_SECS", "60", 10..=3_600)?;

        let sync_rate_limit_per_window =
            value_or_default(&lookup, "BIZSYNC_SYNC_RATE_LIMIT_PER_WINDOW", "30")
                .parse::<u32>()
                .map_err(|_| {
                    ConfigError::Invalid(
                        "BIZSYNC_SYNC_RATE_LIMIT_PER_WINDOW must be an integer in [1, 1000]"
                            .to_string(),
                    )
                })?;
        if !(1..=1_000).contains(&sync_rate_limit_per_window) {
            return Err(ConfigError::Invalid(
                "BIZSYNC_SYNC_RATE_LIMIT_PER_WINDOW must be in [1, 1000]".to_string(),
            ));
        }

        let replica = parse_replica_config(&lookup)?;

        Ok(Self {
            bind_addr,
            database_path,
            replica,
            presence_ttl: Duration::from_secs(presence_ttl_secs),
            sync_timeout: Duration::from_secs(sync_timeout_secs),
            rate_limit_window: Duration::from_secs(rate_limit_window_secs),
            sync_rate_limit_per_window,
        })
    }
}

fn parse_replica_config(
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Option<ReplicaRuntimeConfig>, ConfigError> {
    let url = optional_trimmed(&lookup, "BIZSYNC_DATABASE_URL");
    let auth_token = optional_trimmed(&lookup, "BIZSYNC_DATABASE_AUTH_TOKEN");

    match (url, auth_token) {
        (None, None) => Ok(None),
        (Some(url), Some(auth_token)) => {
            if !url.starts_with("libsql://") && !url.starts_with("https://") {
                return Err(ConfigError::Invalid(
                    "BIZSYNC_DATABASE_URL must start with libsql:// or https://".to_string(),
                ));
            }
            Ok(Some(ReplicaRuntimeConfig { url, auth_token }))
        }
        (Some(_), None) => Err(ConfigError::MissingVar("BIZSYNC_DATABASE_AUTH_TOKEN")),
        (None, Some(_)) => Err(ConfigError::MissingVar("BIZSYNC_DATABASE_URL")),
    }
}

fn bounded_secs(
    lookup: impl Fn(&str) -> Option<String>,
    name: &str,
    default: &str,
    range: RangeInclusive<u64>,
) -> Result<u64, ConfigError> {
    let value = value_or_default(lookup, name, default)
        .parse::<u64>()
        .map_err(|_| {
            ConfigError::Invalid(format!(
                "{name} must be an integer in [{}, {}]",
                range.start(),
                range.end()
            ))
        })?;
    if !range.contains(&value) {
        return Err(ConfigError::Invalid(format!(
            "{name} must be in [{}, {}]",
            range.start(),
            range.end()
        )));
    }
    Ok(value)
}

fn value_or_default(lookup: impl Fn(&str) -> Option<String>, name: &str, default: &str) -> String {
    optional_trimmed(lookup, name).unwrap_or_else(|| default.to_string())
}

fn optional_trimmed(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name).and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
