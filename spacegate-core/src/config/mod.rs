//! Configuration management for Spacegate
//!
//! Configuration is read from a TOML file (every section optional), then
//! overridden by `SPACEGATE_*` environment variables, then validated.

use crate::core_credentials::cipher::KEY_LEN;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

mod error;
mod profile;

pub use error::ConfigError;
pub use profile::SecurityProfile;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Store configuration
    pub store: StoreConfig,

    /// External access configuration
    pub access: AccessConfig,

    /// Notification email configuration
    pub notifications: NotificationConfig,

    /// Credential encryption configuration
    pub security: SecurityConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite database file
    pub database_path: PathBuf,

    /// Maximum pooled connections
    pub pool_size: u32,

    /// How long a statement waits on a locked database
    #[serde(with = "humantime_serde")]
    pub busy_timeout: Duration,
}

/// External access configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    /// Lifetime of an issued magic link
    #[serde(with = "humantime_serde")]
    pub magic_link_ttl: Duration,

    /// Lifetime of a visitor session
    #[serde(with = "humantime_serde")]
    pub session_ttl: Duration,

    /// Base URL magic links point at
    pub public_base_url: String,

    /// Validity of signed branding asset URLs
    #[serde(with = "humantime_serde")]
    pub branding_url_ttl: Duration,
}

/// Notification email configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// At most one email per recipient and space within this window
    #[serde(with = "humantime_serde")]
    pub email_window: Duration,
}

/// Credential encryption configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Deployment profile
    pub profile: SecurityProfile,

    /// Integration credential encryption key (32 bytes)
    #[serde(skip_serializing)]
    pub credential_key: Option<SecretString>,

    /// Store integration credentials unencrypted when no key is configured.
    /// Only honoured under the development profile.
    pub allow_plaintext_credentials: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Enable JSON formatting
    pub json_format: bool,

    /// Include target module
    pub with_target: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("./data/spacegate.db"),
            pool_size: 8,
            busy_timeout: Duration::from_secs(5),
        }
    }
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            magic_link_ttl: Duration::from_secs(7 * 24 * 60 * 60),
            session_ttl: Duration::from_secs(30 * 24 * 60 * 60),
            public_base_url: "http://localhost:3000".to_string(),
            branding_url_ttl: Duration::from_secs(60 * 60),
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            email_window: Duration::from_secs(5 * 60),
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            profile: SecurityProfile::Production,
            credential_key: None,
            allow_plaintext_credentials: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            with_target: true,
        }
    }
}

fn parse_duration(name: &str, value: &str) -> Result<Duration, ConfigError> {
    humantime_serde::re::humantime::parse_duration(value)
        .map_err(|e| ConfigError::InvalidValue(format!("Invalid {}: {}", name, e)))
}

fn parse_flag(name: &str, value: &str) -> Result<bool, ConfigError> {
    value
        .parse()
        .map_err(|e| ConfigError::InvalidValue(format!("Invalid {}: {}", name, e)))
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Environment variables follow the pattern: SPACEGATE_<KEY>
    /// Example: SPACEGATE_MAGIC_LINK_TTL=3d
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config = Self::parse_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// File (if any), then environment, then validation
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::parse_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn parse_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::FileReadError(e.to_string()))?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Apply `SPACEGATE_*` overrides read through `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Store config
        if let Some(path) = lookup("SPACEGATE_DATABASE_PATH") {
            self.store.database_path = PathBuf::from(path);
        }
        if let Some(size) = lookup("SPACEGATE_POOL_SIZE") {
            self.store.pool_size = size
                .parse()
                .map_err(|e| ConfigError::InvalidValue(format!("Invalid pool size: {}", e)))?;
        }

        // Access config
        if let Some(ttl) = lookup("SPACEGATE_MAGIC_LINK_TTL") {
            self.access.magic_link_ttl = parse_duration("magic link TTL", &ttl)?;
        }
        if let Some(ttl) = lookup("SPACEGATE_SESSION_TTL") {
            self.access.session_ttl = parse_duration("session TTL", &ttl)?;
        }
        if let Some(url) = lookup("SPACEGATE_PUBLIC_BASE_URL") {
            self.access.public_base_url = url;
        }

        // Notification config
        if let Some(window) = lookup("SPACEGATE_EMAIL_WINDOW") {
            self.notifications.email_window = parse_duration("email window", &window)?;
        }

        // Security config
        if let Some(profile) = lookup("SPACEGATE_PROFILE") {
            self.security.profile = profile.parse()?;
        }
        if let Some(key) = lookup("SPACEGATE_CREDENTIAL_KEY") {
            self.security.credential_key = Some(SecretString::new(key));
        }
        if let Some(flag) = lookup("SPACEGATE_ALLOW_PLAINTEXT_CREDENTIALS") {
            self.security.allow_plaintext_credentials = parse_flag("plaintext flag", &flag)?;
        }

        // Logging config
        if let Some(level) = lookup("SPACEGATE_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(json) = lookup("SPACEGATE_LOG_JSON") {
            self.logging.json_format = parse_flag("JSON flag", &json)?;
        }

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.pool_size == 0 {
            return Err(ConfigError::ValidationFailed(
                "pool_size must be greater than 0".to_string(),
            ));
        }

        if self.access.magic_link_ttl.is_zero() {
            return Err(ConfigError::ValidationFailed(
                "magic_link_ttl must be greater than 0".to_string(),
            ));
        }

        if self.access.session_ttl.is_zero() {
            return Err(ConfigError::ValidationFailed(
                "session_ttl must be greater than 0".to_string(),
            ));
        }

        if self.access.public_base_url.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "public_base_url must not be empty".to_string(),
            ));
        }

        if self.notifications.email_window.is_zero() {
            return Err(ConfigError::ValidationFailed(
                "email_window must be greater than 0".to_string(),
            ));
        }

        if self.security.allow_plaintext_credentials
            && self.security.profile == SecurityProfile::Production
        {
            return Err(ConfigError::ValidationFailed(
                "allow_plaintext_credentials is not permitted in production".to_string(),
            ));
        }

        if let Some(key) = &self.security.credential_key {
            let len = key.expose_secret().len();
            if len == 0 {
                return Err(ConfigError::ValidationFailed(
                    "credential_key must not be empty".to_string(),
                ));
            }
            if len < KEY_LEN && self.security.profile == SecurityProfile::Production {
                return Err(ConfigError::ValidationFailed(format!(
                    "credential_key is {} bytes, production requires at least {}",
                    len, KEY_LEN
                )));
            }
        }

        let valid_levels = ["trace", "debug", "info", "warn", "warning", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationFailed(format!(
                "Invalid log level: {}",
                self.logging.level
            )));
        }

        Ok(())
    }

    /// Save configuration to file. The credential key is never written.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let contents =
            toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, contents).map_err(|e| ConfigError::FileWriteError(e.to_string()))?;

        Ok(())
    }
}
