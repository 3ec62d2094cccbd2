//! Tests for local node configuration loading and bounds

use ocrnode_config::{ConfigError, LocalConfig, LoggingConfig, NodeConfig};
use std::io::Write;
use std::time::Duration;

#[test]
fn test_default_config_is_valid() {
    let config = NodeConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.oracle.contract_config_confirmations, 3);
    assert_eq!(config.oracle.database_timeout(), Duration::from_secs(10));
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_empty_toml_uses_defaults() {
    let config = NodeConfig::from_toml_str("").unwrap();
    assert_eq!(config, NodeConfig::default());
}

#[test]
fn test_partial_toml_overrides() {
    let config = NodeConfig::from_toml_str(
        r#"
        [oracle]
        database_timeout_ms = 500
        skip_contract_config_confirmations = true
        min_ocr2_max_duration_query_ms = 250

        [logging]
        level = "debug"
        format = "json"
        "#,
    )
    .unwrap();

    assert_eq!(config.oracle.database_timeout(), Duration::from_millis(500));
    assert!(config.oracle.skip_contract_config_confirmations);
    assert_eq!(
        config.oracle.min_ocr2_max_duration_query(),
        Duration::from_millis(250)
    );
    assert_eq!(config.oracle.blockchain_timeout(), Duration::from_secs(10));
    assert_eq!(config.logging.format, "json");
}

#[test]
fn test_all_violations_are_reported() {
    let config = LocalConfig {
        blockchain_timeout_ms: 50,
        database_timeout_ms: 60_000,
        contract_config_confirmations: 0,
        ..Default::default()
    };

    match config.validate() {
        Err(ConfigError::LocalConfig(errors)) => {
            assert_eq!(errors.len(), 3);
            assert!(errors[0].starts_with("blockchain_timeout_ms"));
            assert!(errors.iter().any(|e| e.starts_with("database_timeout_ms")));
            assert!(errors
                .iter()
                .any(|e| e.starts_with("contract_config_confirmations")));
        }
        other => panic!("expected local config error, got {:?}", other),
    }
}

#[test]
fn test_bounds_are_inclusive() {
    let config = LocalConfig {
        blockchain_timeout_ms: 20_000,
        contract_config_tracker_poll_interval_ms: 1_000,
        database_timeout_ms: 100,
        contract_config_confirmations: 100,
        ..Default::default()
    };
    assert!(config.validate().is_ok());
}

#[test]
fn test_development_mode_skips_bounds() {
    let config = LocalConfig {
        blockchain_timeout_ms: 1,
        contract_config_confirmations: 0,
        development_mode: true,
        ..Default::default()
    };
    assert!(config.validate().is_ok());
}

#[test]
fn test_invalid_logging() {
    let config = LoggingConfig {
        level: "verbose".to_string(),
        format: "pretty".to_string(),
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidLogLevel(_))
    ));

    let config = LoggingConfig {
        level: "WARN".to_string(),
        format: "xml".to_string(),
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidLogFormat(_))
    ));
}

#[test]
fn test_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[oracle]\ncontract_config_confirmations = 12").unwrap();

    let config = NodeConfig::load(file.path()).unwrap();
    assert_eq!(config.oracle.contract_config_confirmations, 12);
}

#[test]
fn test_load_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = NodeConfig::load(&dir.path().join("missing.toml"));
    assert!(matches!(result, Err(ConfigError::FileRead { .. })));
}

#[test]
fn test_load_invalid_toml() {
    let result = NodeConfig::from_toml_str("[oracle\nfoo");
    assert!(matches!(result, Err(ConfigError::TomlParse(_))));
}

#[test]
fn test_out_of_bounds_toml_is_rejected() {
    let result = NodeConfig::from_toml_str("[oracle]\ncontract_config_tracker_poll_interval_ms = 10");
    assert!(matches!(result, Err(ConfigError::LocalConfig(_))));
}
