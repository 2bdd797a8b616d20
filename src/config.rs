// src/config.rs

use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Address to accept TLS connections on
    #[serde(default)]
    pub listen: Option<String>,
    /// PEM file holding the certificate chain and private key
    #[serde(default)]
    pub cert_file: Option<String>,
    /// Log list JSON, as a path or an http(s) URL
    #[serde(default)]
    pub log_list: Option<String>,
    #[serde(default = "default_handshake_timeout")]
    pub handshake_timeout_secs: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub watch_cert: bool,
}

fn default_handshake_timeout() -> u64 { 10 }
fn default_request_timeout() -> u64 { 10 }

impl ServerConfig {
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: None,
            cert_file: None,
            log_list: None,
            handshake_timeout_secs: default_handshake_timeout(),
            request_timeout_secs: default_request_timeout(),
            watch_cert: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SubmissionConfig {
    /// Overall timeout for one add-chain request
    #[serde(default = "default_submission_timeout")]
    pub timeout_secs: u64,
}

fn default_submission_timeout() -> u64 { 30 }

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_submission_timeout(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CacheConfig {
    /// Persist SCTs to this TOML file; in-memory only when unset
    #[serde(default)]
    pub file: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MetricsSection {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub export_path: Option<String>,
    #[serde(default = "default_export_interval")]
    pub export_interval_secs: u64,
}

fn default_export_interval() -> u64 { 60 }

impl Default for MetricsSection {
    fn default() -> Self {
        Self {
            enabled: false,
            export_path: None,
            export_interval_secs: default_export_interval(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub submission: SubmissionConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub metrics: MetricsSection,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let cfg: Config = toml::from_str(&contents)?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_from_valid_toml() {
        let toml_content = r#"
[server]
listen = "127.0.0.1:8443"
cert_file = "/etc/sct-demo/cert.pem"
log_list = "https://www.gstatic.com/ct/log_list/v3/all_logs_list.json"
handshake_timeout_secs = 5
watch_cert = true

[submission]
timeout_secs = 15

[cache]
file = "scts.toml"

[metrics]
enabled = true
export_interval_secs = 30

[logging]
level = "debug"
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::from_file(temp_file.path()).unwrap();

        assert_eq!(config.server.listen.as_deref(), Some("127.0.0.1:8443"));
        assert_eq!(config.server.cert_file.as_deref(), Some("/etc/sct-demo/cert.pem"));
        assert_eq!(config.server.handshake_timeout(), Duration::from_secs(5));
        assert_eq!(config.server.request_timeout_secs, 10);
        assert!(config.server.watch_cert);
        assert_eq!(config.submission.timeout_secs, 15);
        assert_eq!(config.cache.file.as_deref(), Some("scts.toml"));
        assert!(config.metrics.enabled);
        assert_eq!(config.metrics.export_path, None);
        assert_eq!(config.metrics.export_interval_secs, 30);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_config_empty_toml_uses_defaults() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"").unwrap();
        temp_file.flush().unwrap();

        let config = Config::from_file(temp_file.path()).unwrap();

        assert_eq!(config.server.listen, None);
        assert_eq!(config.server.handshake_timeout_secs, 10);
        assert_eq!(config.server.request_timeout_secs, 10);
        assert!(!config.server.watch_cert);
        assert_eq!(config.submission.timeout_secs, 30);
        assert_eq!(config.cache.file, None);
        assert!(!config.metrics.enabled);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_config_invalid_toml() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"invalid toml content {{{").unwrap();
        temp_file.flush().unwrap();

        let result = Config::from_file(temp_file.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_config_wrong_type() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[server]\nhandshake_timeout_secs = \"soon\"\n")
            .unwrap();
        temp_file.flush().unwrap();

        assert!(Config::from_file(temp_file.path()).is_err());
    }

    #[test]
    fn test_config_nonexistent_file() {
        let result = Config::from_file(Path::new("/nonexistent/path/config.toml"));
        assert!(result.is_err());
    }
}
