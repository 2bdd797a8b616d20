// src/cli.rs
use clap::Parser;
use std::path::Path;

use crate::config::Config;
use crate::ct_log::DEFAULT_LOG_LIST_URL;

/// sct-demo: TLS server that embeds SCTs chosen by the client's host name
///
/// Connect to `<log prefix>-<log prefix>.<your domain>` and the handshake
/// carries fresh SCTs from those logs, in that order.
#[derive(Parser, Debug, Clone)]
#[command(name = "sct-demo")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    // ===== Input & Configuration =====
    /// Path to TOML config file
    #[arg(short = 'c', long = "config")]
    pub config: Option<String>,

    /// PEM file with the certificate chain and private key
    #[arg(long = "cert")]
    pub cert: Option<String>,

    /// CT log list JSON (file path or http(s) URL); defaults to Google's
    /// published list of all logs
    #[arg(long = "loglist")]
    pub loglist: Option<String>,

    /// Address to listen on, e.g. 0.0.0.0:443
    #[arg(short = 'l', long = "listen")]
    pub listen: Option<String>,

    /// Persist SCTs to this file instead of keeping them in memory
    #[arg(long = "cache-file")]
    pub cache_file: Option<String>,

    /// Reload the certificate when the file changes
    #[arg(short = 'w', long = "watch-cert")]
    pub watch_cert: bool,

    // ===== Logging =====
    /// Verbose logging (set log level to debug)
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Quiet logging (set log level to warn)
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,
}

impl Cli {
    /// Validate flag combinations and return errors for invalid usage
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.verbose && self.quiet {
            anyhow::bail!("Cannot specify both --verbose and --quiet");
        }

        Ok(())
    }

    /// Config file (if any) with command line overrides applied
    pub fn load_config(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(Path::new(path))?,
            None => Config::default(),
        };
        self.apply(&mut config);
        Ok(config)
    }

    /// Apply CLI overrides; flags win over the config file
    pub fn apply(&self, config: &mut Config) {
        if let Some(ref cert) = self.cert {
            config.server.cert_file = Some(cert.clone());
        }
        if let Some(ref loglist) = self.loglist {
            config.server.log_list = Some(loglist.clone());
        }
        if let Some(ref listen) = self.listen {
            config.server.listen = Some(listen.clone());
        }
        if let Some(ref file) = self.cache_file {
            config.cache.file = Some(file.clone());
        }
        if self.watch_cert {
            config.server.watch_cert = true;
        }
    }

    /// Log level from -v/-q, else the configured one
    pub fn log_level<'a>(&self, config: &'a Config) -> &'a str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "warn"
        } else {
            config.logging.level.as_str()
        }
    }
}

/// Settings that must be present once config and flags are merged
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Required {
    pub cert_file: String,
    pub log_list: String,
    pub listen: String,
}

impl Required {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let missing = |what: &str, flag: &str| {
            anyhow::anyhow!("No {} configured: pass {} or set it in [server]", what, flag)
        };
        Ok(Self {
            cert_file: config
                .server
                .cert_file
                .clone()
                .ok_or_else(|| missing("certificate", "--cert"))?,
            log_list: config
                .server
                .log_list
                .clone()
                .unwrap_or_else(|| DEFAULT_LOG_LIST_URL.to_string()),
            listen: config
                .server
                .listen
                .clone()
                .ok_or_else(|| missing("listen address", "--listen"))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_config_by_default() {
        let cli = Cli::parse_from(&["sct-demo"]);
        assert_eq!(cli.config, None);
        assert!(!cli.watch_cert);
    }

    #[test]
    fn test_verbose_and_quiet_invalid() {
        let cli = Cli::parse_from(&["sct-demo", "--verbose", "--quiet"]);
        assert!(cli.validate().is_err());
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from(&[
            "sct-demo",
            "--cert", "cert.pem",
            "--loglist", "logs.json",
            "-l", "127.0.0.1:8443",
            "--cache-file", "scts.toml",
            "-w",
        ]);
        let mut config = Config::default();
        config.server.cert_file = Some("from-file.pem".to_string());

        cli.apply(&mut config);

        assert_eq!(config.server.cert_file.as_deref(), Some("cert.pem"));
        assert_eq!(config.server.log_list.as_deref(), Some("logs.json"));
        assert_eq!(config.server.listen.as_deref(), Some("127.0.0.1:8443"));
        assert_eq!(config.cache.file.as_deref(), Some("scts.toml"));
        assert!(config.server.watch_cert);
    }

    #[test]
    fn test_absent_flags_keep_config() {
        let cli = Cli::parse_from(&["sct-demo"]);
        let mut config = Config::default();
        config.server.listen = Some("0.0.0.0:443".to_string());
        config.server.watch_cert = true;

        cli.apply(&mut config);

        assert_eq!(config.server.listen.as_deref(), Some("0.0.0.0:443"));
        assert!(config.server.watch_cert);
    }

    #[test]
    fn test_required_settings() {
        let cli = Cli::parse_from(&["sct-demo", "--cert", "c.pem", "--loglist", "l.json"]);
        let config = cli.load_config().unwrap();
        let err = Required::from_config(&config).unwrap_err();
        assert!(err.to_string().contains("--listen"));

        let cli = Cli::parse_from(&["sct-demo", "--cert", "c.pem", "--loglist", "l.json", "--listen", ":443"]);
        let required = Required::from_config(&cli.load_config().unwrap()).unwrap();
        assert_eq!(
            required,
            Required {
                cert_file: "c.pem".to_string(),
                log_list: "l.json".to_string(),
                listen: ":443".to_string(),
            }
        );
    }

    #[test]
    fn test_log_list_defaults_to_published_list() {
        let cli = Cli::parse_from(&["sct-demo", "--cert", "c.pem", "--listen", ":443"]);
        let required = Required::from_config(&cli.load_config().unwrap()).unwrap();
        assert_eq!(required.log_list, DEFAULT_LOG_LIST_URL);
    }

    #[test]
    fn test_log_level() {
        let config = Config::default();
        assert_eq!(Cli::parse_from(&["sct-demo", "-v"]).log_level(&config), "debug");
        assert_eq!(Cli::parse_from(&["sct-demo", "-q"]).log_level(&config), "warn");
        assert_eq!(Cli::parse_from(&["sct-demo"]).log_level(&config), "info");
    }
}
