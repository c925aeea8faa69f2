//! Configuration error types

use thiserror::Error;

/// Failures while loading, overriding or validating [`super::Config`]
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The TOML file could not be read
    #[error("Failed to read configuration file: {0}")]
    FileReadError(String),

    #[error("Failed to write configuration file: {0}")]
    FileWriteError(String),

    /// The TOML file is not a valid configuration
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Failed to serialize configuration: {0}")]
    SerializeError(String),

    /// An environment override did not parse
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// Values parsed but are not usable together
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}
