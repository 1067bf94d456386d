// Config loading and validation tests

use dnsmon::config::AppConfig;
use dnsmon::transport::TransportConfig;
use std::time::Duration;

const VALID_CONFIG: &str = r#"
[server]
base_url = "http://dns-monitor.lan:5000/"

[push]
enabled = true
connect_timeout_ms = 10000
reconnect_delay_ms = 1000
reconnect_delay_max_ms = 5000
max_reconnect_attempts = 10
outbound_queue_capacity = 100

[poll]
interval_ms = 5000
timeout_ms = 10000

[ui]
clock_interval_ms = 1000
prefs_path = "data/prefs.json"
"#;

#[test]
fn test_config_loads_from_str() {
    let config = AppConfig::load_from_str(VALID_CONFIG).expect("load_from_str");
    assert_eq!(config.base_url(), "http://dns-monitor.lan:5000");
    assert!(config.push.enabled);
    assert_eq!(config.push.max_reconnect_attempts, 10);
    assert_eq!(config.poll.interval_ms, 5000);
    assert_eq!(config.ui.prefs_path, "data/prefs.json");
    assert_eq!(config.clock_interval(), Duration::from_secs(1));
}

#[test]
fn test_config_empty_file_uses_defaults() {
    let config = AppConfig::load_from_str("").expect("defaults");
    assert_eq!(config.base_url(), "http://127.0.0.1:5000");
    assert_eq!(config.push.connect_timeout_ms, 10_000);
    assert_eq!(config.push.reconnect_delay_ms, 1_000);
    assert_eq!(config.push.reconnect_delay_max_ms, 5_000);
    assert_eq!(config.push.max_reconnect_attempts, 10);
    assert_eq!(config.push.outbound_queue_capacity, 100);
    assert_eq!(config.poll.interval_ms, 5_000);
    assert_eq!(config.poll.timeout_ms, 10_000);
    assert_eq!(config.ui.clock_interval_ms, 1_000);
}

#[test]
fn test_config_partial_section_keeps_other_defaults() {
    let config = AppConfig::load_from_str("[push]\nenabled = false\n").expect("valid");
    assert!(!config.push.enabled);
    assert_eq!(config.push.max_reconnect_attempts, 10);
}

#[test]
fn test_transport_config_derives_from_app_config() {
    let config = AppConfig::load_from_str(VALID_CONFIG).expect("valid");
    let transport = TransportConfig::from_app(&config);
    assert_eq!(transport.poll_interval, Duration::from_secs(5));
    assert_eq!(transport.poll_timeout, Duration::from_secs(10));
    assert_eq!(transport.backoff.initial, Duration::from_secs(1));
    assert_eq!(transport.backoff.max, Duration::from_secs(5));
    assert_eq!(
        transport.push_url(),
        "ws://dns-monitor.lan:5000/socket.io/?EIO=4&transport=websocket"
    );
}

#[test]
fn test_config_validation_rejects_bad_base_url() {
    let bad = VALID_CONFIG.replace("http://dns-monitor.lan:5000/", "dns-monitor.lan");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("server.base_url"));
}

#[test]
fn test_config_validation_rejects_max_reconnect_attempts_zero() {
    let bad = VALID_CONFIG.replace("max_reconnect_attempts = 10", "max_reconnect_attempts = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("push.max_reconnect_attempts"));
}

#[test]
fn test_config_validation_rejects_delay_max_below_initial() {
    let bad = VALID_CONFIG.replace("reconnect_delay_max_ms = 5000", "reconnect_delay_max_ms = 500");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("push.reconnect_delay_max_ms"));
}

#[test]
fn test_config_validation_rejects_queue_capacity_zero() {
    let bad = VALID_CONFIG.replace("outbound_queue_capacity = 100", "outbound_queue_capacity = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("push.outbound_queue_capacity"));
}

#[test]
fn test_config_validation_rejects_poll_interval_zero() {
    let bad = VALID_CONFIG.replace("interval_ms = 5000", "interval_ms = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("poll.interval_ms"));
}

#[test]
fn test_config_validation_rejects_clock_interval_zero() {
    let bad = VALID_CONFIG.replace("clock_interval_ms = 1000", "clock_interval_ms = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("ui.clock_interval_ms"));
}

#[test]
fn test_config_validation_rejects_invalid_toml() {
    let err = AppConfig::load_from_str("not valid toml [[[").unwrap_err();
    assert!(!err.to_string().is_empty());
}

#[test]
fn test_config_load_from_file_via_env() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, VALID_CONFIG).unwrap();
    unsafe { std::env::set_var("CONFIG_FILE", path.to_str().unwrap()) };
    let result = AppConfig::load();
    unsafe { std::env::remove_var("CONFIG_FILE") };
    let config = result.expect("load from CONFIG_FILE");
    assert_eq!(config.base_url(), "http://dns-monitor.lan:5000");
}
