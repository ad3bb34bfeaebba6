//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use docsensei_core::JumpPolicy;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    pub allowed_origin: String,
    /// Base URL of the quiz provider. `None` selects the built-in question bank.
    pub quiz_provider_url: Option<String>,
    pub quiz_provider_timeout: Duration,
    pub quiz_auto_advance: bool,
    pub jump_policy: JumpPolicy,
    pub upload_delay: Duration,
    pub chat_reply_delay: Duration,
    pub quiz_pass_delay: Duration,
    pub quiz_prompt_delay: Duration,
    pub theme_path: PathBuf,
    pub chat_seed: Option<u64>,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Server Settings ---
        let bind_address: SocketAddr =
            parse_or(&lookup, "BIND_ADDRESS", "0.0.0.0:3000".parse().ok())?;

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let allowed_origin =
            lookup("ALLOWED_ORIGIN").unwrap_or_else(|| "http://localhost:5173".to_string());

        // --- Quiz Provider Settings ---
        let quiz_provider_url = lookup("QUIZ_PROVIDER_URL")
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty());
        let quiz_provider_timeout =
            Duration::from_secs(parse_or(&lookup, "QUIZ_PROVIDER_TIMEOUT_SECS", Some(30))?);
        let quiz_auto_advance = parse_bool(&lookup, "QUIZ_AUTO_ADVANCE", false)?;

        let jump_policy = match lookup("JUMP_POLICY") {
            None => JumpPolicy::default(),
            Some(raw) => JumpPolicy::from_label(&raw).ok_or_else(|| {
                ConfigError::InvalidValue(
                    "JUMP_POLICY".to_string(),
                    format!("'{}' is not one of strict, visited", raw),
                )
            })?,
        };

        // --- Simulated Delays ---
        let upload_delay = millis(&lookup, "UPLOAD_DELAY_MS", 2500)?;
        let chat_reply_delay = millis(&lookup, "CHAT_REPLY_DELAY_MS", 1200)?;
        let quiz_pass_delay = millis(&lookup, "QUIZ_PASS_DELAY_MS", 1000)?;
        let quiz_prompt_delay = millis(&lookup, "QUIZ_PROMPT_DELAY_MS", 3000)?;

        let theme_path = lookup("THEME_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./theme.json"));

        let chat_seed = match lookup("CHAT_SEED") {
            None => None,
            Some(_) => Some(parse_or::<_, u64>(&lookup, "CHAT_SEED", None)?),
        };

        Ok(Self {
            bind_address,
            log_level,
            allowed_origin,
            quiz_provider_url,
            quiz_provider_timeout,
            quiz_auto_advance,
            jump_policy,
            upload_delay,
            chat_reply_delay,
            quiz_pass_delay,
            quiz_prompt_delay,
            theme_path,
            chat_seed,
        })
    }
}

/// Parses `key`, falling back to `default` when unset. A `None` default makes the key required.
fn parse_or<F, T>(lookup: &F, key: &str, default: Option<T>) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string())),
        None => default.ok_or_else(|| ConfigError::MissingVar(key.to_string())),
    }
}

fn parse_bool<F>(lookup: &F, key: &str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => Ok(true),
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => Ok(false),
        Some(v) => Err(ConfigError::InvalidValue(
            key.to_string(),
            format!("'{}' is not a boolean", v),
        )),
    }
}

fn millis<F>(lookup: &F, key: &str, default: u64) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    parse_or(lookup, key, Some(default)).map(Duration::from_millis)
}
