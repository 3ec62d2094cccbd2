//! Configuration error types

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while loading local configuration or validating a
/// contract configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file
    #[error("Failed to read config file at {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML configuration
    #[error("Failed to parse TOML config: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Local configuration values out of bounds (all violations are listed)
    #[error("Invalid local config: {}", .0.join("; "))]
    LocalConfig(Vec<String>),

    /// Invalid log level
    #[error("Invalid log level: {0}. Valid values: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    /// Invalid log format
    #[error("Invalid log format: {0}. Valid values: pretty, json, compact")]
    InvalidLogFormat(String),

    /// Installing the global tracing subscriber failed
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    /// The contract advertises an offchain config version this node cannot read
    #[error("Unsupported offchain_config_version {got}, supported version is {expected}")]
    UnsupportedOffchainConfigVersion { got: u64, expected: u64 },

    /// The offchain config could not be decoded
    #[error("Failed to decode offchain config: {0}")]
    OffchainConfigDecode(String),

    /// Two signers in the contract config are identical
    #[error("{first}-th and {second}-th signer are identical: {signer}")]
    DuplicateSigner {
        first: usize,
        second: usize,
        signer: String,
    },

    /// Peer id listed twice
    #[error("Duplicate peer id '{0}'")]
    DuplicatePeerId(String),

    /// Offchain public key listed twice
    #[error("Duplicate offchain public key {0}")]
    DuplicateOffchainPublicKey(String),

    /// Transmitter listed twice
    #[error("Duplicate transmitter '{0}'")]
    DuplicateTransmitter(String),

    /// An identity list does not match the length of the signers list
    #[error("{name} list must have same length as onchain signers list: {length} != {expected}")]
    IdentityListLength {
        name: &'static str,
        length: usize,
        expected: usize,
    },

    /// A duration parameter is negative
    #[error("{name} ({value_ns}ns) must be non-negative")]
    NegativeDuration { name: &'static str, value_ns: i64 },

    /// F violates 0 <= F and 3F < N
    #[error("f ({f}) must be non-negative and less than n/3 (n = {n})")]
    InvalidFaultTolerance { f: usize, n: usize },

    /// More oracles than supported
    #[error("n ({n}) must be less than or equal to max_oracles ({max})")]
    TooManyOracles { n: usize, max: usize },

    /// delta_round must be strictly below delta_progress
    #[error("delta_round ({delta_round:?}) must be less than delta_progress ({delta_progress:?})")]
    DeltaRoundNotBelowProgress {
        delta_round: Duration,
        delta_progress: Duration,
    },

    /// The report generation phase budget does not fit in delta_progress
    #[error(
        "sum of max_duration_query/observation/report ({sum:?}) must be less than delta_progress ({delta_progress:?})"
    )]
    MaxDurationsExceedProgress {
        sum: Duration,
        delta_progress: Duration,
    },

    /// rmax out of (0, 255)
    #[error("rmax ({0}) must be greater than zero and less than 255")]
    InvalidRMax(u8),

    /// Stage array too long
    #[error("len(s) ({0}) must be less than 1000")]
    TooManyStages(usize),

    /// Stage size out of range
    #[error("s[{index}] ({value}) must be between 0 and max_oracles ({max})")]
    InvalidStageSize { index: usize, value: i64, max: usize },

    /// An interval is shorter than the resource exhaustion safe interval
    #[error("{name} ({value:?}) is set below the resource exhaustion safe interval ({min:?})")]
    BelowSafeInterval {
        name: &'static str,
        value: Duration,
        min: Duration,
    },

    /// This node's offchain public key is not part of the configuration
    #[error("Could not find my offchain public key {0} in the public config")]
    OwnIdentityNotFound(String),

    /// This node's offchain public key is listed, but another identity column differs
    #[error("{field} {configured} in the public config does not match mine {mine}")]
    OwnIdentityMismatch {
        field: &'static str,
        configured: String,
        mine: String,
    },
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;
