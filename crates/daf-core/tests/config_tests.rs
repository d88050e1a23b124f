#![allow(clippy::unwrap_used, clippy::expect_used)]

use daf_core::config::{timeout_from_file, EnvSettings, SettingsSource, TomlSettings};
use daf_core::{ExErrorKind, TimeoutSetting, DEFAULT_TIMEOUT_SECS, TIMEOUT_KEY};
use std::collections::HashMap;
use std::io::Write;
use tempfile::NamedTempFile;

fn settings_file(text: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp settings file");
    file.write_all(text.as_bytes()).unwrap();
    file
}

#[test]
fn test_absent_key_resolves_to_default() {
    // Given: configuration without the timeout key
    let setting = TimeoutSetting::from_source(HashMap::<String, String>::new());

    // Then: the timeout is 30 seconds
    assert_eq!(setting.resolve(), 30);
    assert_eq!(DEFAULT_TIMEOUT_SECS, 30);
}

#[test]
fn test_unusable_values_fall_back_to_default() {
    for raw in ["", "abc", "0", "-5", "1.5"] {
        let mut map = HashMap::new();
        map.insert(TIMEOUT_KEY.to_string(), raw.to_string());
        assert_eq!(
            TimeoutSetting::from_source(map).resolve(),
            DEFAULT_TIMEOUT_SECS,
            "value {:?}",
            raw
        );
    }
}

#[test]
fn test_nested_toml_table() {
    let file = settings_file("[ConnectionString]\nTimeOut = 45\n");

    let setting = timeout_from_file(file.path()).unwrap();

    assert_eq!(setting.resolve(), 45);
}

#[test]
fn test_quoted_dotted_toml_key() {
    let settings = TomlSettings::parse("\"ConnectionString.TimeOut\" = \"90\"\n").unwrap();
    assert_eq!(settings.get(TIMEOUT_KEY).as_deref(), Some("90"));
}

#[test]
fn test_malformed_file_is_configuration_error() {
    let file = settings_file("[ConnectionString\nTimeOut = ");

    let err = timeout_from_file(file.path()).unwrap_err();

    assert_eq!(err.kind(), ExErrorKind::Configuration);
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();

    let err = timeout_from_file(dir.path().join("absent.toml")).unwrap_err();

    assert_eq!(err.kind(), ExErrorKind::Io);
    assert_eq!(err.op(), Some("load_settings"));
}

#[test]
fn test_env_variable_name() {
    let env = EnvSettings::new();
    assert_eq!(env.var_name(TIMEOUT_KEY), "DAF_CONNECTIONSTRING_TIMEOUT");

    let custom = EnvSettings::with_prefix("ORDERS_");
    assert_eq!(custom.var_name(TIMEOUT_KEY), "ORDERS_CONNECTIONSTRING_TIMEOUT");
}
