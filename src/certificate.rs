// src/certificate.rs
//! Base certificate loaded from a PEM file.

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use rustls_pemfile::Item;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::augment::CertificateSource;
use crate::error::Result;
use crate::types::{ClientHelloInfo, Fingerprint, ServerCertificate};

/// Serves one certificate to every client, replaceable at runtime
pub struct FileCertificateSource {
    current: RwLock<Arc<ServerCertificate>>,
}

impl FileCertificateSource {
    pub fn new(cert: ServerCertificate) -> Self {
        Self {
            current: RwLock::new(Arc::new(cert)),
        }
    }

    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        let pem = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read certificate file {:?}", path))?;
        let cert = parse_pem(&pem).with_context(|| format!("Failed to load certificate from {:?}", path))?;
        Ok(Self::new(cert))
    }

    /// Blocking load, for the file watcher thread
    pub fn read_file(path: &Path) -> anyhow::Result<ServerCertificate> {
        let pem = std::fs::read(path).with_context(|| format!("Failed to read certificate file {:?}", path))?;
        parse_pem(&pem).with_context(|| format!("Failed to load certificate from {:?}", path))
    }

    pub async fn replace(&self, cert: ServerCertificate) {
        let mut current = self.current.write().await;
        info!(
            "Replacing certificate {} with {}",
            describe(&current),
            describe(&cert)
        );
        *current = Arc::new(cert);
    }

    pub async fn current(&self) -> Arc<ServerCertificate> {
        Arc::clone(&*self.current.read().await)
    }
}

#[async_trait]
impl CertificateSource for FileCertificateSource {
    async fn get_certificate(&self, _hello: &ClientHelloInfo) -> Result<Arc<ServerCertificate>> {
        Ok(self.current().await)
    }
}

/// Parse a PEM bundle: certificates in chain order (leaf first) plus exactly
/// one private key in PKCS#8, PKCS#1 or SEC1 form.
pub fn parse_pem(pem: &[u8]) -> anyhow::Result<ServerCertificate> {
    let mut reader = pem;
    let items = rustls_pemfile::read_all(&mut reader).context("Failed to parse PEM")?;

    let mut chain = Vec::new();
    let mut keys = Vec::new();
    for item in items {
        match item {
            Item::X509Certificate(der) => chain.push(rustls::Certificate(der)),
            Item::PKCS8Key(der) | Item::RSAKey(der) | Item::ECKey(der) => keys.push(rustls::PrivateKey(der)),
            _ => debug!("Ignoring unsupported PEM section"),
        }
    }

    if chain.is_empty() {
        anyhow::bail!("no certificates found");
    }
    let key = match keys.len() {
        0 => anyhow::bail!("no private key found"),
        1 => keys.remove(0),
        n => anyhow::bail!("expected one private key, found {}", n),
    };

    let signing_key = rustls::sign::any_supported_type(&key).map_err(|e| anyhow!("unusable private key: {}", e))?;

    let cert = ServerCertificate::new(chain, signing_key);
    debug!("Loaded certificate {}", describe(&cert));
    Ok(cert)
}

fn describe(cert: &ServerCertificate) -> String {
    let Some(leaf) = cert.leaf() else {
        return "<empty chain>".to_string();
    };
    let fingerprint = Fingerprint::of(leaf);
    match x509_parser::parse_x509_certificate(leaf) {
        Ok((_, parsed)) => format!("{} ({})", parsed.subject(), fingerprint),
        Err(e) => {
            warn!("Leaf certificate {} is not parseable X.509: {}", fingerprint, e);
            fingerprint.to_string()
        }
    }
}
