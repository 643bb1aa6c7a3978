//! Configuration error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during configuration loading and validation
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file
    #[error("Failed to read config file at {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write configuration file
    #[error("Failed to write config file at {path}: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML configuration
    #[error("Failed to parse TOML config: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Failed to serialize TOML configuration
    #[error("Failed to serialize TOML config: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// A size or count limit was zero
    #[error("Invalid limit: {name} must be positive")]
    ZeroLimit { name: &'static str },

    /// The per-transaction limit exceeds the buffer limit
    #[error("Invalid mempool limits: max_tx_size ({max_tx_size}) exceeds max_bytes ({max_bytes})")]
    TxSizeExceedsBuffer { max_tx_size: usize, max_bytes: usize },

    /// Invalid timeout configuration
    #[error("Invalid timeout: {name} must be positive, got {value}ms")]
    InvalidTimeout { name: &'static str, value: u64 },

    /// Location prefix for block data hints is empty
    #[error("Invalid block data location prefix: must not be empty")]
    EmptyLocationPrefix,

    /// Invalid log level
    #[error("Invalid log level: {0}. Valid values: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    /// Invalid log format
    #[error("Invalid log format: {0}. Valid values: pretty, compact, json")]
    InvalidLogFormat(String),

    /// Tracing subscriber could not be installed
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;
