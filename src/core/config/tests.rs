use super::defaults::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use super::{Config, ConfigError};
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_load_nonexistent_config() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("nonexistent_config.toml");

    let config = Config::load_from_path(&config_path).expect("Failed to load config");

    assert_eq!(config, Config::default());
    assert_eq!(config.base_url(), DEFAULT_BASE_URL);
    assert_eq!(config.model(), DEFAULT_MODEL);
    assert!(config.stream_enabled());
}

#[test]
fn test_config_persistence_round_trip() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("nested").join("config.toml");

    let config = Config {
        default_model: Some("meta/llama".to_string()),
        stream: Some(false),
        temperature: Some(0.3),
        data_dir: Some(PathBuf::from("/tmp/parlance-data")),
        ..Default::default()
    };
    config.save_to_path(&config_path).expect("save failed");

    let loaded = Config::load_from_path(&config_path).expect("load failed");
    assert_eq!(loaded, config);
    assert_eq!(loaded.model(), "meta/llama");
    assert!(!loaded.stream_enabled());
    assert_eq!(loaded.sampling().temperature, Some(0.3));
    assert_eq!(loaded.sampling().max_tokens, None);
}

#[test]
fn test_invalid_toml_reports_path() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("config.toml");
    std::fs::write(&config_path, "base_url = [").expect("write failed");

    let err = Config::load_from_path(&config_path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
    assert!(err.to_string().starts_with("Failed to parse config at"));
}

#[test]
fn test_api_key_lookup() {
    let found = Config::api_key_from("MY_KEY", |name| {
        (name == "MY_KEY").then(|| "  secret \n".to_string())
    });
    assert_eq!(found.unwrap(), "secret");

    let blank = Config::api_key_from("MY_KEY", |_| Some("   ".to_string()));
    assert!(matches!(blank, Err(ConfigError::MissingApiKey(name)) if name == "MY_KEY"));

    let missing = Config::api_key_from("OTHER", |_| None);
    assert_eq!(
        missing.unwrap_err().to_string(),
        "No API key found. Set the OTHER environment variable."
    );
}

#[test]
fn test_explicit_data_dir_wins() {
    let config = Config {
        data_dir: Some(PathBuf::from("/srv/chats")),
        ..Default::default()
    };
    assert_eq!(
        config.resolve_data_dir().expect("resolve failed"),
        PathBuf::from("/srv/chats")
    );
}
