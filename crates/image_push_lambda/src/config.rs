//! Environment-driven configuration, read once per cold start.

use std::time::Duration;

use thiserror::Error;

use crate::adapters::record_store::WriteMode;

pub const TABLE_ENV: &str = "IMAGE_RECORD_TABLE";
pub const TOPIC_ENV: &str = "IMAGE_PUSH_TOPIC_ARN";
pub const WRITE_MODE_ENV: &str = "IMAGE_RECORD_WRITE_MODE";
pub const TIMEOUT_ENV: &str = "HANDLER_TIMEOUT_MS";
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{0} must be configured")]
    Missing(&'static str),
    #[error("{name} is invalid: {message}")]
    Invalid { name: &'static str, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerConfig {
    pub table_name: String,
    pub topic_arn: String,
    pub write_mode: WriteMode,
    pub timeout: Duration,
}

impl HandlerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |name: &'static str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .ok_or(ConfigError::Missing(name))
        };
        let optional = |name: &'static str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let write_mode = match optional(WRITE_MODE_ENV) {
            Some(value) => value.parse::<WriteMode>().map_err(|message| ConfigError::Invalid {
                name: WRITE_MODE_ENV,
                message,
            })?,
            None => WriteMode::default(),
        };

        let timeout_ms = match optional(TIMEOUT_ENV) {
            Some(value) => parse_timeout_ms(&value)?,
            None => DEFAULT_TIMEOUT_MS,
        };

        Ok(Self {
            table_name: required(TABLE_ENV)?,
            topic_arn: required(TOPIC_ENV)?,
            write_mode,
            timeout: Duration::from_millis(timeout_ms),
        })
    }
}

fn parse_timeout_ms(value: &str) -> Result<u64, ConfigError> {
    match value.parse::<u64>() {
        Ok(0) => Err(ConfigError::Invalid {
            name: TIMEOUT_ENV,
            message: "must be a positive integer".to_string(),
        }),
        Ok(ms) => Ok(ms),
        Err(error) => Err(ConfigError::Invalid {
            name: TIMEOUT_ENV,
            message: error.to_string(),
        }),
    }
}
