use std::env;
use std::path::PathBuf;
use std::time::Duration;

use callguard_core::logging::LogFormat;
use callguard_dispatch::{TwilioConfig, DEFAULT_TWILIO_API_BASE};
use thiserror::Error;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_LOCK_FILE: &str = "locks.json";
const DEFAULT_DISPATCH_TIMEOUT_SECS: u64 = 30;

/// Configuration errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {var}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Clone)]
pub struct Config {
    pub port: u16,
    pub api_key: String,
    pub from_number: String,
    pub twilio: TwilioConfig,
    pub lock_file: PathBuf,
    pub prune_locks_on_load: bool,
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |var: &'static str| {
            lookup(var)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(var))
        };

        let port = match lookup("PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid { var: "PORT", value: raw })?,
            None => DEFAULT_PORT,
        };

        let timeout_secs = match lookup("DISPATCH_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                var: "DISPATCH_TIMEOUT_SECS",
                value: raw,
            })?,
            None => DEFAULT_DISPATCH_TIMEOUT_SECS,
        };

        let prune_locks_on_load = match lookup("LOCK_PRUNE_ON_LOAD") {
            Some(raw) => parse_bool(&raw).ok_or(ConfigError::Invalid {
                var: "LOCK_PRUNE_ON_LOAD",
                value: raw,
            })?,
            None => false,
        };

        Ok(Config {
            port,
            api_key: required("API_KEY")?,
            from_number: required("TWILIO_FROM_NUMBER")?,
            twilio: TwilioConfig {
                account_sid: required("TWILIO_ACCOUNT_SID")?,
                auth_token: required("TWILIO_AUTH_TOKEN")?,
                api_base: lookup("TWILIO_API_BASE")
                    .unwrap_or_else(|| DEFAULT_TWILIO_API_BASE.to_string()),
                timeout: Duration::from_secs(timeout_secs),
            },
            lock_file: lookup("LOCK_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOCK_FILE)),
            prune_locks_on_load,
            log_format: lookup("LOG_FORMAT")
                .map(|v| LogFormat::parse(&v))
                .unwrap_or_default(),
        })
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
