// src/main.rs
use anyhow::Context;
use clap::Parser;
use sct_demo::augment::CertificateAugmenter;
use sct_demo::cache::{FileSctCache, MemorySctCache, SctCache};
use sct_demo::certificate::FileCertificateSource;
use sct_demo::cli::{Cli, Required};
use sct_demo::ct_log::{build_http_client, LogList};
use sct_demo::metrics::{self, MetricsConfig};
use sct_demo::server::Server;
use sct_demo::status::{self, StatusState};
use sct_demo::watcher::CertificateWatcher;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Validate arguments
    cli.validate()?;

    // Load config file and apply CLI overrides
    let config = cli.load_config()?;

    // Initialize logging
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level(&config)));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .init();

    let required = Required::from_config(&config)?;

    tracing::info!("Starting sct-demo...");

    // Initialize metrics if enabled
    let metrics_config = MetricsConfig::from(&config.metrics);
    if metrics_config.enabled {
        metrics::init_metrics().context("Failed to register metrics")?;
        tracing::info!(
            "Metrics export every {}s to {}",
            metrics_config.export_interval_secs,
            metrics_config.export_path.as_deref().unwrap_or("stdout")
        );
        tokio::spawn(metrics::metrics_exporter_task(metrics_config));
    }

    // HTTP client shared by log list fetching and SCT submission
    let http_client = build_http_client(&config.submission)?;

    let logs = Arc::new(LogList::load(&http_client, &required.log_list).await?);
    if logs.is_empty() {
        tracing::warn!("Log list {} contains no usable logs", required.log_list);
    }

    // Base certificate
    let cert_path = PathBuf::from(&required.cert_file);
    let certificates = Arc::new(FileCertificateSource::load(&cert_path).await?);

    if config.server.watch_cert {
        let watcher = CertificateWatcher::new(cert_path.clone());
        let mut cert_rx = watcher.watch()?;
        let certificates = Arc::clone(&certificates);

        tokio::spawn(async move {
            while let Some(cert) = cert_rx.recv().await {
                certificates.replace(cert).await;
            }
        });
    } else {
        tracing::debug!("Certificate file watching disabled");
    }

    // SCT cache
    let cache: Arc<dyn SctCache> = match &config.cache.file {
        Some(path) => Arc::new(FileSctCache::open(Path::new(path)).await?),
        None => {
            tracing::info!("Keeping SCTs in memory only");
            Arc::new(MemorySctCache::new())
        }
    };

    let augmenter = Arc::new(CertificateAugmenter::new(
        http_client,
        certificates,
        logs.clone(),
        cache,
    ));

    let router = status::router(StatusState {
        logs,
        request_timeout: config.server.request_timeout(),
    });

    let listener = TcpListener::bind(&required.listen)
        .await
        .with_context(|| format!("Failed to listen on {}", required.listen))?;

    let server = Server::new(
        augmenter,
        router,
        config.server.handshake_timeout(),
        config.server.request_timeout(),
    );

    tokio::select! {
        result = server.serve(listener) => result?,
        _ = shutdown_signal() => tracing::info!("Shutting down"),
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}
