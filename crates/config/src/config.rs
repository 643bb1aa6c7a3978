//! Main configuration module for ballot
//!
//! All decision-layer settings are defined in one `ballot.toml` file.

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Main configuration struct containing all ballot settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Consensus strategy parameters
    pub consensus: ConsensusConfig,

    /// Pending transaction buffer limits
    pub mempool: MempoolConfig,

    /// Block data dissemination settings
    pub block_data: BlockDataConfig,

    /// Background retrieval settings
    pub retrieval: RetrievalConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the TOML configuration file
    ///
    /// # Returns
    ///
    /// The parsed and validated configuration, or an error if loading fails.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        info!("Loading configuration from {:?}", path);

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content)?;

        debug!("Configuration parsed successfully, validating...");
        config.validate()?;

        info!(
            proposer_selection = ?config.consensus.proposer_selection,
            max_data_bytes = config.block_data.max_data_bytes,
            "Configuration loaded"
        );

        Ok(config)
    }

    /// Load configuration from a TOML string.
    ///
    /// Useful for testing or when configuration is provided as a string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> ConfigResult<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// Checks that all values are within acceptable ranges and that
    /// the configuration is internally consistent.
    pub fn validate(&self) -> ConfigResult<()> {
        self.mempool.validate()?;
        self.block_data.validate()?;
        self.retrieval.validate()?;
        self.logging.validate()?;

        debug!("Configuration validation passed");
        Ok(())
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| ConfigError::FileWrite {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(())
    }
}

// =============================================================================
// Consensus Configuration
// =============================================================================

/// Consensus strategy parameters.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ConsensusConfig {
    /// How the proposer for each (height, round) is chosen
    pub proposer_selection: ProposerSelectionKind,
}

/// Proposer selection mechanism
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposerSelectionKind {
    /// validators[(height + round) % n]
    #[default]
    RoundRobin,
    /// Round robin over cumulative voting power
    StakeWeighted,
}

// =============================================================================
// Mempool Configuration
// =============================================================================

/// Pending transaction buffer limits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MempoolConfig {
    /// Maximum number of buffered transactions
    pub max_txs: usize,

    /// Maximum total payload bytes buffered
    pub max_bytes: usize,

    /// Maximum size of a single transaction payload
    pub max_tx_size: usize,
}

impl MempoolConfig {
    /// Validate mempool limits.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_txs == 0 {
            return Err(ConfigError::ZeroLimit { name: "mempool.max_txs" });
        }
        if self.max_bytes == 0 {
            return Err(ConfigError::ZeroLimit { name: "mempool.max_bytes" });
        }
        if self.max_tx_size == 0 {
            return Err(ConfigError::ZeroLimit { name: "mempool.max_tx_size" });
        }
        if self.max_tx_size > self.max_bytes {
            return Err(ConfigError::TxSizeExceedsBuffer {
                max_tx_size: self.max_tx_size,
                max_bytes: self.max_bytes,
            });
        }
        Ok(())
    }
}

impl Default for MempoolConfig {
    fn default() -> Self {
        Self {
            max_txs: 10_000,
            max_bytes: 64 * 1024 * 1024, // 64 MB
            max_tx_size: 128 * 1024,     // 128 KB
        }
    }
}

// =============================================================================
// Block Data Configuration
// =============================================================================

/// Block data dissemination settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BlockDataConfig {
    /// Largest encoded batch that will be provided or fetched
    pub max_data_bytes: usize,

    /// Prefix of the location hints advertised to peers
    pub location_prefix: String,
}

impl BlockDataConfig {
    /// Validate block data settings.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_data_bytes == 0 {
            return Err(ConfigError::ZeroLimit { name: "block_data.max_data_bytes" });
        }
        if self.location_prefix.trim().is_empty() {
            return Err(ConfigError::EmptyLocationPrefix);
        }
        Ok(())
    }
}

impl Default for BlockDataConfig {
    fn default() -> Self {
        Self {
            max_data_bytes: 32 * 1024 * 1024, // 32 MB
            location_prefix: "mem://local".to_string(),
        }
    }
}

// =============================================================================
// Retrieval Configuration
// =============================================================================

/// Background retrieval of remote block data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Passes over the location hints before giving up
    pub max_attempts: u32,

    /// Timeout for a single fetch (milliseconds)
    pub fetch_timeout_ms: u64,

    /// Pause between passes over the location hints (milliseconds)
    pub retry_backoff_ms: u64,
}

impl RetrievalConfig {
    /// Validate retrieval settings.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_attempts == 0 {
            return Err(ConfigError::ZeroLimit { name: "retrieval.max_attempts" });
        }
        if self.fetch_timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout {
                name: "retrieval.fetch_timeout_ms",
                value: 0,
            });
        }
        Ok(())
    }

    /// Timeout for a single fetch.
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    /// Pause between passes.
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            fetch_timeout_ms: 2_000,
            retry_backoff_ms: 250,
        }
    }
}

// =============================================================================
// Logging Configuration
// =============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (pretty, compact, json)
    pub format: String,
}

impl LoggingConfig {
    /// Validate logging settings.
    pub fn validate(&self) -> ConfigResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(self.level.clone()));
        }

        let valid_formats = ["pretty", "compact", "json"];
        if !valid_formats.contains(&self.format.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogFormat(self.format.clone()));
        }

        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
