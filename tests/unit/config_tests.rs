use std::io::Write;
use std::time::Duration;

use cli_relay::config::{DEFAULT_HOST, DEFAULT_PORT};
use cli_relay::{AppError, RelayConfig};

fn sample_toml() -> &'static str {
    r#"
host = "0.0.0.0"
port = 60000
command_prefix = "!"
max_line_bytes = 4096
outbound_queue = 8
history_limit = 50
color = false

[timeouts]
drain_ms = 100
close_ms = 150
fatal_exit_delay_ms = 0
"#
}

#[test]
fn defaults_match_documented_values() {
    let config = RelayConfig::default();
    assert_eq!(config.host, DEFAULT_HOST);
    assert_eq!(config.port, DEFAULT_PORT);
    assert_eq!(config.port, 57679);
    assert_eq!(config.command_prefix, "@");
    assert_eq!(config.max_line_bytes, 1_048_576);
    assert_eq!(config.drain_timeout(), Duration::from_millis(200));
    assert_eq!(config.close_timeout(), Duration::from_millis(200));
    assert_eq!(config.fatal_exit_delay(), Duration::from_secs(5));
    assert!(config.color);
    config.validate().expect("defaults are valid");
}

#[test]
fn empty_toml_yields_defaults() {
    let config = RelayConfig::from_toml_str("").expect("empty config");
    assert_eq!(config, RelayConfig::default());
}

#[test]
fn full_toml_is_parsed() {
    let config = RelayConfig::from_toml_str(sample_toml()).expect("valid config");
    assert_eq!(config.bind_address(), "0.0.0.0:60000");
    assert_eq!(config.command_prefix, "!");
    assert_eq!(config.max_line_bytes, 4096);
    assert_eq!(config.outbound_queue, 8);
    assert_eq!(config.history_limit, 50);
    assert!(!config.color);
    assert_eq!(config.drain_timeout(), Duration::from_millis(100));
    assert_eq!(config.close_timeout(), Duration::from_millis(150));
    assert_eq!(config.fatal_exit_delay(), Duration::ZERO);
}

#[test]
fn partial_timeouts_keep_other_defaults() {
    let config = RelayConfig::from_toml_str("[timeouts]\ndrain_ms = 50\n").expect("valid");
    assert_eq!(config.drain_timeout(), Duration::from_millis(50));
    assert_eq!(config.close_timeout(), Duration::from_millis(200));
}

#[test]
fn invalid_toml_is_a_config_error() {
    let err = RelayConfig::from_toml_str("port = \"not a number\"").expect_err("bad type");
    assert!(matches!(err, AppError::Config(_)), "got {err:?}");
}

#[test]
fn blank_command_prefix_is_rejected() {
    let err = RelayConfig::from_toml_str("command_prefix = \" \"").expect_err("blank prefix");
    assert!(err.to_string().contains("command_prefix"), "{err}");
}

#[test]
fn zero_timeouts_are_rejected() {
    let err = RelayConfig::from_toml_str("[timeouts]\nclose_ms = 0\n").expect_err("zero close");
    assert!(matches!(err, AppError::Config(_)));
}

#[test]
fn zero_queue_is_rejected() {
    assert!(RelayConfig::from_toml_str("outbound_queue = 0").is_err());
    assert!(RelayConfig::from_toml_str("max_line_bytes = 0").is_err());
}

#[test]
fn config_loads_from_file() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(sample_toml().as_bytes()).expect("write");

    let config = RelayConfig::load_from_path(file.path()).expect("load");
    assert_eq!(config.port, 60000);
}

#[test]
fn missing_file_is_a_config_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let err = RelayConfig::load_from_path(dir.path().join("absent.toml")).expect_err("missing");
    assert!(err.to_string().starts_with("config: failed to read config"));
}

#[test]
fn overrides_replace_only_given_fields() {
    let mut config = RelayConfig::default();
    config.apply_overrides(None, Some(4000));
    assert_eq!(config.bind_address(), "127.0.0.1:4000");

    config.apply_overrides(Some("10.0.0.2".into()), None);
    assert_eq!(config.bind_address(), "10.0.0.2:4000");
}
