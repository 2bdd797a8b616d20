// Test configuration loading
use sct_demo::cli::{Cli, Required};
use sct_demo::config::Config;
use sct_demo::metrics::MetricsConfig;
use std::path::Path;
use std::time::Duration;

use clap::Parser;

#[test]
fn test_load_test_config() {
    let config_path = Path::new("tests/test_config.toml");
    let config = Config::from_file(config_path).expect("Failed to load test config");

    // Verify server config
    assert_eq!(config.server.listen.as_deref(), Some("127.0.0.1:8443"));
    assert_eq!(config.server.cert_file.as_deref(), Some("tests/cert.pem"));
    assert_eq!(
        config.server.log_list.as_deref(),
        Some("https://www.gstatic.com/ct/log_list/v3/all_logs_list.json")
    );
    assert_eq!(config.server.handshake_timeout(), Duration::from_secs(8));
    assert_eq!(config.server.request_timeout(), Duration::from_secs(4));
    assert!(config.server.watch_cert);

    // Verify submission config
    assert_eq!(config.submission.timeout_secs, 20);

    // Verify cache config
    assert_eq!(config.cache.file.as_deref(), Some("sct-cache.toml"));

    // Verify metrics config
    let metrics = MetricsConfig::from(&config.metrics);
    assert!(metrics.enabled);
    assert_eq!(metrics.export_path.as_deref(), Some("metrics.prom"));
    assert_eq!(metrics.export_interval_secs, 15);

    // Verify logging config
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_cli_overrides_test_config() {
    let cli = Cli::parse_from([
        "sct-demo",
        "--config",
        "tests/test_config.toml",
        "--listen",
        "0.0.0.0:443",
        "-v",
    ]);
    let config = cli.load_config().unwrap();
    let required = Required::from_config(&config).unwrap();

    assert_eq!(required.listen, "0.0.0.0:443");
    assert_eq!(required.cert_file, "tests/cert.pem");
    assert_eq!(cli.log_level(&config), "debug");
}

#[test]
fn test_missing_config_file_is_an_error() {
    let cli = Cli::parse_from(["sct-demo", "--config", "tests/does_not_exist.toml"]);
    assert!(cli.load_config().is_err());
}
