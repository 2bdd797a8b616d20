// src/ct_log/client.rs
use anyhow::Context;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::StatusCode;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use url::Url;

use super::types::CtLog;
use crate::config::SubmissionConfig;
use crate::error::{Error, Result};
use crate::metrics::{SCT_SUBMISSIONS_TOTAL, SCT_SUBMISSION_DURATION};
use crate::sct::{AddChainResponse, SignedCertificateTimestamp};

pub const USER_AGENT_VALUE: &str = concat!("sct-demo/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Serialize)]
struct AddChainRequest {
    chain: Vec<String>,
}

/// Build the HTTP client used for log submissions
pub fn build_http_client(config: &SubmissionConfig) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .user_agent(USER_AGENT_VALUE)
        .gzip(true)
        .build()
        .context("Failed to build HTTP client")
}

/// `<submission_url>/ct/v1/add-chain`, keeping any path the base already has
pub fn add_chain_url(submission_url: &str) -> Result<Url> {
    let invalid = |source| Error::InvalidUrl {
        url: submission_url.to_string(),
        source,
    };
    let mut url = Url::parse(submission_url).map_err(invalid)?;
    url.path_segments_mut()
        .map_err(|_| invalid(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
        .pop_if_empty()
        .extend(["ct", "v1", "add-chain"]);
    Ok(url)
}

/// Submit `chain` to `log` and return the verified SCT in `SerializedSCT` form
///
/// Endpoint: POST {submission_url}/ct/v1/add-chain
///
/// The returned SCT has been checked against the log's key and the leaf
/// certificate, so it is safe to cache and hand to clients.
pub async fn add_chain(
    http_client: &reqwest::Client,
    log: &CtLog,
    chain: &[rustls::Certificate],
) -> Result<Vec<u8>> {
    let started = Instant::now();
    let result = submit(http_client, log, chain).await;

    let outcome = if result.is_ok() { "success" } else { "failure" };
    SCT_SUBMISSIONS_TOTAL.with_label_values(&[outcome]).inc();
    SCT_SUBMISSION_DURATION
        .with_label_values(&[outcome])
        .observe(started.elapsed().as_secs_f64());

    result
}

async fn submit(http_client: &reqwest::Client, log: &CtLog, chain: &[rustls::Certificate]) -> Result<Vec<u8>> {
    let leaf = chain.first().ok_or(Error::EmptyChain)?;
    let url = add_chain_url(&log.submission_url)?;
    let url_str = url.to_string();

    let request = AddChainRequest {
        chain: chain.iter().map(|cert| STANDARD.encode(&cert.0)).collect(),
    };

    debug!("Submitting {} certificates to {}", request.chain.len(), url_str);

    let response = http_client
        .post(url)
        .header(USER_AGENT, USER_AGENT_VALUE)
        .header(CONTENT_TYPE, "application/json")
        .json(&request)
        .send()
        .await
        .map_err(|source| Error::Transport {
            url: url_str.clone(),
            source,
        })?;

    let status = response.status();
    let body = response.bytes().await.map_err(|source| Error::Transport {
        url: url_str.clone(),
        source,
    })?;

    if status != StatusCode::OK {
        warn!("Log {} rejected submission with status {}", log.description, status);
        return Err(Error::Status {
            url: url_str,
            status,
            body: String::from_utf8_lossy(&body).into_owned(),
        });
    }

    let record: AddChainResponse = serde_json::from_slice(&body).map_err(|source| Error::Decode {
        url: url_str.clone(),
        source,
    })?;

    let sct = SignedCertificateTimestamp::try_from(record).map_err(|source| Error::InvalidSct {
        url: url_str.clone(),
        source,
    })?;

    sct.verify(log, &leaf.0).map_err(|source| Error::Verification {
        url: url_str.clone(),
        source,
    })?;

    info!(
        "Obtained SCT from {} (timestamp {})",
        log.description, sct.timestamp
    );

    Ok(sct.to_bytes())
}
