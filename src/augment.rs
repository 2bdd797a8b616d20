// src/augment.rs
//! Per-handshake certificate augmentation.
//!
//! For every log named in the SNI host name, the augmenter finds an SCT for
//! the base certificate (from the cache, or by submitting the chain to the
//! log) and returns a copy of the certificate carrying those SCTs in token
//! order. Any failure aborts the handshake.

use anyhow::anyhow;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::cache::SctCache;
use crate::ct_log::client::add_chain;
use crate::ct_log::types::CtLog;
use crate::error::{Error, Result};
use crate::hostname::log_tokens;
use crate::metrics::SCT_CACHE_LOOKUPS_TOTAL;
use crate::types::{ClientHelloInfo, Fingerprint, ServerCertificate};

/// Supplies the certificate (without SCTs) to present for a handshake
#[async_trait]
pub trait CertificateSource: Send + Sync {
    async fn get_certificate(&self, hello: &ClientHelloInfo) -> Result<Arc<ServerCertificate>>;
}

/// Maps a host name token to the log it names
///
/// Errors must distinguish `Error::UnknownLog` from `Error::AmbiguousLog`.
#[async_trait]
pub trait LogResolver: Send + Sync {
    async fn resolve(&self, token: &str) -> Result<Arc<CtLog>>;
}

pub struct CertificateAugmenter {
    http_client: reqwest::Client,
    certificates: Arc<dyn CertificateSource>,
    logs: Arc<dyn LogResolver>,
    cache: Arc<dyn SctCache>,
}

impl CertificateAugmenter {
    pub fn new(
        http_client: reqwest::Client,
        certificates: Arc<dyn CertificateSource>,
        logs: Arc<dyn LogResolver>,
        cache: Arc<dyn SctCache>,
    ) -> Self {
        Self {
            http_client,
            certificates,
            logs,
            cache,
        }
    }

    /// Build the certificate to present for `hello`
    pub async fn augment(&self, hello: &ClientHelloInfo) -> Result<ServerCertificate> {
        let result = self.build(hello).await;
        if let Err(e) = &result {
            warn!("Aborting handshake for {:?}: {}", hello.server_name, e);
        }
        result
    }

    async fn build(&self, hello: &ClientHelloInfo) -> Result<ServerCertificate> {
        let cert = self.certificates.get_certificate(hello).await?;
        let leaf = cert
            .leaf()
            .ok_or_else(|| Error::CertificateSource(anyhow!("certificate chain is empty")))?;
        let fingerprint = Fingerprint::of(leaf);

        let server_name = hello.server_name.as_deref().unwrap_or_default();
        let tokens = log_tokens(server_name);
        let mut scts = Vec::with_capacity(tokens.len());

        for token in tokens {
            let log = self.logs.resolve(token).await?;
            let sct = self.obtain_sct(&cert, &fingerprint, &log).await?;
            scts.push(sct);
        }

        debug!(
            "Presenting {} with {} SCTs for {:?}",
            fingerprint,
            scts.len(),
            server_name
        );

        Ok(cert.with_scts(scts))
    }

    async fn obtain_sct(&self, cert: &ServerCertificate, fingerprint: &Fingerprint, log: &CtLog) -> Result<Vec<u8>> {
        if let Some(sct) = self.cache.get(fingerprint, &log.log_id).await? {
            SCT_CACHE_LOOKUPS_TOTAL.with_label_values(&["hit"]).inc();
            debug!("Using cached SCT from {} for {}", log.description, fingerprint);
            return Ok(sct);
        }
        SCT_CACHE_LOOKUPS_TOTAL.with_label_values(&["miss"]).inc();

        info!("Submitting {} to {}", fingerprint, log.description);
        let sct = add_chain(&self.http_client, log, &cert.chain).await?;
        self.cache.put(fingerprint, &log.log_id, &sct).await?;
        Ok(sct)
    }
}
