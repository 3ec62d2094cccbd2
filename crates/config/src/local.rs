//! Node-local configuration, loaded from a single TOML file.
//!
//! ```toml
//! [oracle]
//! database_timeout_ms = 5000
//! contract_config_confirmations = 3
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Everything an operator configures for one node.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct NodeConfig {
    /// Timeouts and chain settings of the oracle
    #[serde(default)]
    pub oracle: LocalConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl NodeConfig {
    /// Load and validate configuration from a TOML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        info!("Loading configuration from {:?}", path);

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: NodeConfig = toml::from_str(content)?;
        debug!("Configuration parsed successfully, validating...");
        config.validate()?;
        Ok(config)
    }

    /// Validate every section.
    pub fn validate(&self) -> ConfigResult<()> {
        self.oracle.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

// =============================================================================
// Oracle Configuration
// =============================================================================

/// Timeouts and chain-interaction settings of one oracle.
///
/// Durations are in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LocalConfig {
    /// Timeout for calls to the contract config tracker
    #[serde(default = "default_blockchain_timeout_ms")]
    pub blockchain_timeout_ms: u64,

    /// Number of blocks a config must be buried under before it is used
    #[serde(default = "default_contract_config_confirmations")]
    pub contract_config_confirmations: u16,

    /// Accept configs without waiting for confirmations
    #[serde(default)]
    pub skip_contract_config_confirmations: bool,

    /// Polling interval of the config tracker
    #[serde(default = "default_contract_config_tracker_poll_interval_ms")]
    pub contract_config_tracker_poll_interval_ms: u64,

    /// Timeout for fetching a full contract config
    #[serde(default = "default_contract_config_load_timeout_ms")]
    pub contract_config_load_timeout_ms: u64,

    /// Timeout for a single transmission
    #[serde(default = "default_contract_transmitter_transmit_timeout_ms")]
    pub contract_transmitter_transmit_timeout_ms: u64,

    /// Timeout for every database operation
    #[serde(default = "default_database_timeout_ms")]
    pub database_timeout_ms: u64,

    /// Time budget for creating a reporting plugin
    #[serde(default = "default_max_duration_initialization_ms")]
    pub default_max_duration_initialization_ms: u64,

    /// Floor applied to the configured `max_duration_query`
    #[serde(default)]
    pub min_ocr2_max_duration_query_ms: u64,

    /// Unsafe development mode: skips resource checks and the bounds below.
    /// Never enable in production.
    #[serde(default)]
    pub development_mode: bool,
}

fn default_blockchain_timeout_ms() -> u64 {
    10_000
}

fn default_contract_config_confirmations() -> u16 {
    3
}

fn default_contract_config_tracker_poll_interval_ms() -> u64 {
    15_000
}

fn default_contract_config_load_timeout_ms() -> u64 {
    60_000
}

fn default_contract_transmitter_transmit_timeout_ms() -> u64 {
    10_000
}

fn default_database_timeout_ms() -> u64 {
    10_000
}

fn default_max_duration_initialization_ms() -> u64 {
    30_000
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            blockchain_timeout_ms: default_blockchain_timeout_ms(),
            contract_config_confirmations: default_contract_config_confirmations(),
            skip_contract_config_confirmations: false,
            contract_config_tracker_poll_interval_ms:
                default_contract_config_tracker_poll_interval_ms(),
            contract_config_load_timeout_ms: default_contract_config_load_timeout_ms(),
            contract_transmitter_transmit_timeout_ms:
                default_contract_transmitter_transmit_timeout_ms(),
            database_timeout_ms: default_database_timeout_ms(),
            default_max_duration_initialization_ms: default_max_duration_initialization_ms(),
            min_ocr2_max_duration_query_ms: 0,
            development_mode: false,
        }
    }
}

fn check_bound(errors: &mut Vec<String>, name: &str, value_ms: u64, min_ms: u64, max_ms: u64) {
    if !(min_ms..=max_ms).contains(&value_ms) {
        errors.push(format!(
            "{name} must be between {min_ms}ms and {max_ms}ms, but is currently {value_ms}ms"
        ));
    }
}

impl LocalConfig {
    /// Check every value against its sane range, reporting all violations at once.
    ///
    /// Development mode disables the checks entirely.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.development_mode {
            return Ok(());
        }

        let mut errors = Vec::new();
        check_bound(
            &mut errors,
            "blockchain_timeout_ms",
            self.blockchain_timeout_ms,
            1_000,
            20_000,
        );
        check_bound(
            &mut errors,
            "contract_config_tracker_poll_interval_ms",
            self.contract_config_tracker_poll_interval_ms,
            1_000,
            120_000,
        );
        check_bound(
            &mut errors,
            "contract_config_load_timeout_ms",
            self.contract_config_load_timeout_ms,
            1_000,
            3_600_000,
        );
        check_bound(
            &mut errors,
            "contract_transmitter_transmit_timeout_ms",
            self.contract_transmitter_transmit_timeout_ms,
            1_000,
            60_000,
        );
        check_bound(
            &mut errors,
            "database_timeout_ms",
            self.database_timeout_ms,
            100,
            10_000,
        );
        check_bound(
            &mut errors,
            "default_max_duration_initialization_ms",
            self.default_max_duration_initialization_ms,
            1_000,
            3_600_000,
        );
        if !(1..=100).contains(&self.contract_config_confirmations) {
            errors.push(format!(
                "contract_config_confirmations must be between 1 and 100, but is currently {}",
                self.contract_config_confirmations
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::LocalConfig(errors))
        }
    }

    /// Timeout for calls to the contract config tracker.
    pub fn blockchain_timeout(&self) -> Duration {
        Duration::from_millis(self.blockchain_timeout_ms)
    }

    /// Polling interval of the config tracker.
    pub fn contract_config_tracker_poll_interval(&self) -> Duration {
        Duration::from_millis(self.contract_config_tracker_poll_interval_ms)
    }

    /// Timeout for fetching a full contract config.
    pub fn contract_config_load_timeout(&self) -> Duration {
        Duration::from_millis(self.contract_config_load_timeout_ms)
    }

    /// Timeout for a single transmission.
    pub fn contract_transmitter_transmit_timeout(&self) -> Duration {
        Duration::from_millis(self.contract_transmitter_transmit_timeout_ms)
    }

    /// Timeout for every database operation.
    pub fn database_timeout(&self) -> Duration {
        Duration::from_millis(self.database_timeout_ms)
    }

    /// Time budget for creating a reporting plugin.
    pub fn default_max_duration_initialization(&self) -> Duration {
        Duration::from_millis(self.default_max_duration_initialization_ms)
    }

    /// Floor applied to the configured `max_duration_query`.
    pub fn min_ocr2_max_duration_query(&self) -> Duration {
        Duration::from_millis(self.min_ocr2_max_duration_query_ms)
    }
}

// =============================================================================
// Logging Configuration
// =============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (pretty, json, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Check level and format names.
    pub fn validate(&self) -> ConfigResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(self.level.clone()));
        }

        let valid_formats = ["pretty", "json", "compact"];
        if !valid_formats.contains(&self.format.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogFormat(self.format.clone()));
        }

        Ok(())
    }

    /// Install the global tracing subscriber.
    ///
    /// `RUST_LOG`, when set, overrides the configured level. Fails if a global
    /// subscriber is already installed.
    pub fn try_init(&self) -> ConfigResult<()> {
        self.validate()?;

        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.level.to_lowercase()));

        let result = match self.format.to_lowercase().as_str() {
            "json" => tracing_subscriber::registry()
                .with(fmt::layer().json())
                .with(env_filter)
                .try_init(),
            "compact" => tracing_subscriber::registry()
                .with(fmt::layer().compact())
                .with(env_filter)
                .try_init(),
            _ => tracing_subscriber::registry()
                .with(fmt::layer().with_target(true))
                .with(env_filter)
                .try_init(),
        };

        result.map_err(|e| ConfigError::LoggingInit(e.to_string()))
    }
}
