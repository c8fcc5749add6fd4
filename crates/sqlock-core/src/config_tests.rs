//! Config module tests

use crate::config::{Config, DatabaseSettings, LockingConfig};
use std::time::Duration;

#[test]
fn test_config_default() {
    let config = Config::default();

    assert!(config.database.connection_string.is_none());
    assert_eq!(config.database.provider_name, "Sqlite");
    assert_eq!(config.database.busy_timeout_ms, 30_000);
    assert_eq!(config.database.max_connections, 5);

    assert_eq!(config.locking.read_lock_timeout_ms, 60_000);
    assert_eq!(config.locking.write_lock_timeout_ms, 5_000);
}

#[test]
fn test_locking_config_durations() {
    let locking = LockingConfig {
        read_lock_timeout_ms: 1500,
        write_lock_timeout_ms: 250,
    };

    assert_eq!(locking.read_lock_timeout(), Duration::from_millis(1500));
    assert_eq!(locking.write_lock_timeout(), Duration::from_millis(250));
}

#[test]
fn test_database_settings_busy_timeout() {
    let settings = DatabaseSettings {
        busy_timeout_ms: 42,
        ..Default::default()
    };
    assert_eq!(settings.busy_timeout(), Duration::from_millis(42));
}

#[test]
fn test_config_get_and_set() {
    let mut config = Config::default();

    config
        .set("database.connection_string", "sqlite:/tmp/app.db")
        .unwrap();
    assert_eq!(
        config.get("database.connection_string").unwrap(),
        "sqlite:/tmp/app.db"
    );

    config.set("locking.write_lock_timeout_ms", "750").unwrap();
    assert_eq!(config.locking.write_lock_timeout_ms, 750);

    config.set("database.provider_name", "SQLITE").unwrap();
    assert_eq!(config.get("database.provider_name").unwrap(), "SQLITE");
}

#[test]
fn test_config_clear_connection_string() {
    let mut config = Config::default();
    config
        .set("database.connection_string", "sqlite:/tmp/app.db")
        .unwrap();
    config.set("database.connection_string", "  ").unwrap();
    assert!(config.database.connection_string.is_none());
}

#[test]
fn test_config_set_rejects_invalid_values() {
    let mut config = Config::default();

    assert!(config.set("locking.write_lock_timeout_ms", "0").is_err());
    assert!(config.set("locking.read_lock_timeout_ms", "soon").is_err());
    assert!(config.set("database.max_connections", "0").is_err());
    assert!(config.set("database.provider_name", "").is_err());
    assert!(config.set("nope.key", "1").is_err());
}

#[test]
fn test_config_unknown_key() {
    let config = Config::default();
    let err = config.get("llm.default_model").unwrap_err();
    assert!(err.to_string().contains("Unknown configuration key"));
}

#[test]
fn test_config_list_covers_all_keys() {
    let config = Config::default();
    let entries = config.list().unwrap();

    assert_eq!(entries.len(), 6);
    assert!(entries.iter().any(|(k, _)| k == "locking.write_lock_timeout_ms"));
    assert!(entries.iter().any(|(k, _)| k == "database.provider_name"));
}

#[test]
fn test_config_toml_roundtrip_with_partial_file() {
    let parsed: Config = toml::from_str(
        r#"
        [locking]
        write_lock_timeout_ms = 100
        "#,
    )
    .unwrap();

    assert_eq!(parsed.locking.write_lock_timeout_ms, 100);
    assert_eq!(parsed.locking.read_lock_timeout_ms, 60_000);
    assert_eq!(parsed.database.provider_name, "Sqlite");
    assert!(parsed.validate().is_ok());
}

#[test]
fn test_config_validate_rejects_zero_write_timeout() {
    let mut config = Config::default();
    config.locking.write_lock_timeout_ms = 0;
    let err = config.validate().unwrap_err();
    assert_eq!(err.code(), "E600");
    assert!(err.to_string().contains("write_lock_timeout_ms"));
}
