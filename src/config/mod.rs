//! Configuration management
//!
//! This module handles loading and validating configuration from environment variables,
//! with support for different environments (development, staging, production).

use std::env;
use std::net::IpAddr;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::Duration;
use thiserror::Error;

use crate::auth::AddressFraming;
use crate::session::CookieSettings;

/// Longest session lifetime accepted from configuration (one year)
const MAX_SESSION_TTL_SECONDS: i64 = 365 * 24 * 60 * 60;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid environment value: {0}")]
    InvalidValue(String),

    #[error("Invalid port number: {0}")]
    InvalidPort(String),
}

/// Application environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    /// Check if this is a production environment
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    /// Get the environment name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Ok(Environment::Development),
            "staging" => Ok(Environment::Staging),
            "prod" | "production" => Ok(Environment::Production),
            _ => Err(ConfigError::InvalidValue(format!(
                "Invalid environment: '{}'. Expected: dev, staging, or prod",
                s
            ))),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Current environment
    pub environment: Environment,

    /// Interface to bind
    pub bind_address: IpAddr,

    /// Server port
    pub port: u16,

    /// Log level (RUST_LOG)
    pub log_level: String,

    /// CORS allowed origins, comma separated
    pub cors_allowed_origins: Option<String>,

    /// Name of the session cookie (default: auth_session)
    pub session_cookie_name: String,

    /// Session lifetime (default: 24 hours, at most one year)
    pub session_ttl: Duration,

    /// Expired session sweep interval in seconds (default: 300)
    pub session_sweep_interval_seconds: u64,

    /// Stake addresses allowed to authenticate
    pub registered_identities: Vec<String>,

    /// File with one registered stake address per line
    pub registered_identities_file: Option<PathBuf>,

    /// Require the signing key to match the stake key credential
    pub require_key_binding: bool,

    /// Framing of the protected address header
    pub address_framing: AddressFraming,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup("ENVIRONMENT")
            .map(|s| s.parse::<Environment>())
            .unwrap_or(Ok(Environment::Development))?;

        let bind_address = lookup("BIND_ADDRESS")
            .unwrap_or_else(|| "127.0.0.1".to_string())
            .parse::<IpAddr>()
            .map_err(|_| ConfigError::InvalidValue("BIND_ADDRESS must be an IP address".to_string()))?;

        let port = lookup("PORT")
            .unwrap_or_else(|| "8000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort("PORT must be a valid number".to_string()))?;

        let log_level = lookup("RUST_LOG").unwrap_or_else(|| "info".to_string());

        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS").filter(|s| !s.trim().is_empty());

        let session_cookie_name = lookup("SESSION_COOKIE_NAME")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| CookieSettings::default().name().to_string());

        let session_ttl_seconds: i64 = parse_or(&lookup, "SESSION_TTL_SECONDS", 86_400)?;
        if !(1..=MAX_SESSION_TTL_SECONDS).contains(&session_ttl_seconds) {
            return Err(ConfigError::InvalidValue(format!(
                "SESSION_TTL_SECONDS must be between 1 and {}",
                MAX_SESSION_TTL_SECONDS
            )));
        }
        let session_ttl = Duration::try_seconds(session_ttl_seconds).ok_or_else(|| {
            ConfigError::InvalidValue("SESSION_TTL_SECONDS is out of range".to_string())
        })?;

        let session_sweep_interval_seconds: u64 =
            parse_or(&lookup, "SESSION_SWEEP_INTERVAL_SECONDS", 300)?;
        if session_sweep_interval_seconds == 0 {
            return Err(ConfigError::InvalidValue(
                "SESSION_SWEEP_INTERVAL_SECONDS must be positive".to_string(),
            ));
        }

        let registered_identities = lookup("REGISTERED_IDENTITIES")
            .map(|s| {
                s.split(',')
                    .map(|entry| entry.trim().to_string())
                    .filter(|entry| !entry.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let registered_identities_file = lookup("REGISTERED_IDENTITIES_FILE")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        let require_key_binding = lookup("AUTH_REQUIRE_KEY_BINDING")
            .map(|s| parse_bool("AUTH_REQUIRE_KEY_BINDING", &s))
            .unwrap_or(Ok(true))?;

        let address_framing = lookup("AUTH_ADDRESS_FRAMING")
            .map(|s| s.parse::<AddressFraming>().map_err(ConfigError::InvalidValue))
            .unwrap_or(Ok(AddressFraming::default()))?;

        Ok(Config {
            environment,
            bind_address,
            port,
            log_level,
            cors_allowed_origins,
            session_cookie_name,
            session_ttl,
            session_sweep_interval_seconds,
            registered_identities,
            registered_identities_file,
            require_key_binding,
            address_framing,
        })
    }

    /// Cookie settings for this deployment; production cookies are `Secure`
    pub fn cookie_settings(&self) -> CookieSettings {
        CookieSettings::new(
            self.session_cookie_name.clone(),
            self.environment.is_production(),
        )
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue(format!("{} must be a number, got '{}'", key, raw))),
        None => Ok(default),
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue(format!(
            "{} must be a boolean, got '{}'",
            key, raw
        ))),
    }
}
