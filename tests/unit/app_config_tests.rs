/*!
 * Tests for configuration loading and validation
 */

use nbglot::app_config::{Config, LogLevel, Overrides};
use nbglot::errors::AppError;
use nbglot::language_utils::TargetLanguage;

use crate::common::{create_temp_dir, create_test_file};

#[test]
fn test_load_withExistingFile_shouldUseIt() {
    let dir = create_temp_dir().unwrap();
    let path = create_test_file(
        dir.path(),
        "conf.json",
        r#"{
            "target_language": "ja",
            "provider": {"api_key": "sk-file", "model": "vision/model"},
            "common": {"concurrent_requests": 3},
            "log_level": "debug"
        }"#,
    )
    .unwrap();

    let config = Config::load(&path).unwrap();

    assert_eq!(config.language().unwrap(), TargetLanguage::Japanese);
    assert_eq!(config.provider.model, "vision/model");
    assert_eq!(config.provider.endpoint, "https://openrouter.ai/api/v1");
    assert_eq!(config.common.concurrent_requests, 3);
    assert_eq!(config.log_level, LogLevel::Debug);
    assert!(config.validate().is_ok());
}

#[test]
fn test_load_withInvalidJson_shouldFailWithPath() {
    let dir = create_temp_dir().unwrap();
    let path = create_test_file(dir.path(), "conf.json", "{ nope").unwrap();

    let err = Config::load(&path).unwrap_err();

    assert!(format!("{:#}", err).contains("conf.json"));
}

#[test]
fn test_apply_withEnvironmentOverrides_shouldReplaceFileValues() {
    let mut config = Config::default();
    config.apply(Overrides {
        api_key: Some("sk-env".to_string()),
        endpoint: Some("http://localhost:1234/v1".to_string()),
        log_level: Some(LogLevel::Warn),
        ..Overrides::default()
    });

    assert_eq!(config.provider.api_key, "sk-env");
    assert_eq!(config.provider.endpoint, "http://localhost:1234/v1");
    assert_eq!(config.log_level, LogLevel::Warn);
    assert!(config.validate().is_ok());
}

#[test]
fn test_validate_withBadValues_shouldBeConfigurationErrors() {
    let mut config = Config::default();
    config.provider.api_key = "sk".to_string();

    config.provider.endpoint = "not a url".to_string();
    assert!(matches!(config.validate(), Err(AppError::Configuration(_))));

    config.provider.endpoint = "https://api.example.com/v1".to_string();
    config.common.temperature = 3.5;
    assert!(matches!(config.validate(), Err(AppError::Configuration(_))));

    config.common.temperature = 0.3;
    config.common.concurrent_requests = 0;
    assert!(matches!(config.validate(), Err(AppError::Configuration(_))));
}

#[test]
fn test_default_shouldSerializeAndParseBack() {
    let config = Config::default();
    let json = serde_json::to_string_pretty(&config).unwrap();
    let parsed: Config = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, config);
}
