//! Prometheus metrics for sct-demo
//!
//! Counts log submissions, SCT cache lookups, handshakes and status page
//! responses.

use lazy_static::lazy_static;
use prometheus::{HistogramVec, IntCounterVec, Opts, Registry};
use tracing::warn;

use crate::config::MetricsSection;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // ===== Submission Metrics =====

    /// Total add-chain submissions
    /// Labels: outcome="success|failure"
    pub static ref SCT_SUBMISSIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "sctdemo_sct_submissions_total",
            "Total number of add-chain submissions to CT logs"
        ),
        &["outcome"]
    ).expect("metric cannot be created");

    /// Add-chain round trip in seconds, verification included
    /// Labels: outcome="success|failure"
    pub static ref SCT_SUBMISSION_DURATION: HistogramVec = HistogramVec::new(
        prometheus::HistogramOpts::new(
            "sctdemo_sct_submission_duration_seconds",
            "Duration of add-chain submissions in seconds"
        )
        .buckets(vec![
            0.010, 0.025, 0.050, 0.100, 0.250,  // 10ms to 250ms
            0.500, 1.0, 2.5, 5.0, 10.0, 30.0    // 500ms to 30s
        ]),
        &["outcome"]
    ).expect("metric cannot be created");

    // ===== Cache Metrics =====

    /// SCT cache lookups
    /// Labels: result="hit|miss"
    pub static ref SCT_CACHE_LOOKUPS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "sctdemo_sct_cache_lookups_total",
            "Total number of SCT cache lookups"
        ),
        &["result"]
    ).expect("metric cannot be created");

    // ===== Server Metrics =====

    /// TLS handshakes
    /// Labels: outcome="success|augment_failed|timeout|tls_error"
    pub static ref HANDSHAKES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "sctdemo_handshakes_total",
            "Total number of TLS handshakes by outcome"
        ),
        &["outcome"]
    ).expect("metric cannot be created");

    /// Status page responses
    /// Labels: status="200|500"
    pub static ref STATUS_PAGE_RESPONSES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "sctdemo_status_page_responses_total",
            "Total number of status page responses by HTTP status"
        ),
        &["status"]
    ).expect("metric cannot be created");
}

/// Initialize metrics registry
pub fn init_metrics() -> Result<(), prometheus::Error> {
    REGISTRY.register(Box::new(SCT_SUBMISSIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(SCT_SUBMISSION_DURATION.clone()))?;
    REGISTRY.register(Box::new(SCT_CACHE_LOOKUPS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(HANDSHAKES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(STATUS_PAGE_RESPONSES_TOTAL.clone()))?;

    Ok(())
}

/// Export metrics in Prometheus text format
pub fn export_metrics() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        warn!("Failed to encode metrics: {}", e);
        return String::new();
    }

    String::from_utf8(buffer).unwrap_or_default()
}

/// Metrics configuration
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub export_path: Option<String>,  // None = stdout, Some = file path
    pub export_interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            export_path: None,
            export_interval_secs: 60,
        }
    }
}

impl From<&MetricsSection> for MetricsConfig {
    fn from(section: &MetricsSection) -> Self {
        Self {
            enabled: section.enabled,
            export_path: section.export_path.clone(),
            export_interval_secs: section.export_interval_secs.max(1),
        }
    }
}

/// Background task for periodic metrics export
pub async fn metrics_exporter_task(config: MetricsConfig) {
    use tokio::time::{interval, Duration};

    let mut ticker = interval(Duration::from_secs(config.export_interval_secs));

    loop {
        ticker.tick().await;

        let metrics_text = export_metrics();

        match &config.export_path {
            None => {
                println!("\n# Prometheus Metrics");
                println!("{}", metrics_text);
            }
            Some(path) => {
                if let Err(e) = tokio::fs::write(path, metrics_text.as_bytes()).await {
                    warn!("Failed to write metrics to file {}: {}", path, e);
                }
            }
        }
    }
}
