// src/types.rs
use rustls::sign::{CertifiedKey, SigningKey};
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;

use crate::sct::encode_sct_list;

/// SHA-256 of a leaf certificate's DER bytes, used as the first half of the
/// SCT cache key
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(pub [u8; 32]);

impl Fingerprint {
    pub fn of(der: &[u8]) -> Self {
        Self(Sha256::digest(der).into())
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.to_hex())
    }
}

/// The parts of a TLS ClientHello that certificate selection depends on
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientHelloInfo {
    /// SNI host name, if the client sent one
    pub server_name: Option<String>,
}

impl ClientHelloInfo {
    pub fn with_server_name(server_name: impl Into<String>) -> Self {
        Self {
            server_name: Some(server_name.into()),
        }
    }
}

impl From<&rustls::server::ClientHello<'_>> for ClientHelloInfo {
    fn from(hello: &rustls::server::ClientHello<'_>) -> Self {
        Self {
            server_name: hello.server_name().map(str::to_owned),
        }
    }
}

/// Certificate presented to a client: chain, signing key, and the SCTs that
/// ride along in the `signed_certificate_timestamp` TLS extension
#[derive(Clone)]
pub struct ServerCertificate {
    /// DER certificates, leaf first
    pub chain: Vec<rustls::Certificate>,
    pub key: Arc<dyn SigningKey>,
    pub ocsp: Option<Vec<u8>>,
    /// Serialized SCTs, in the order they are sent
    pub scts: Vec<Vec<u8>>,
}

impl ServerCertificate {
    pub fn new(chain: Vec<rustls::Certificate>, key: Arc<dyn SigningKey>) -> Self {
        Self {
            chain,
            key,
            ocsp: None,
            scts: Vec::new(),
        }
    }

    pub fn leaf(&self) -> Option<&[u8]> {
        self.chain.first().map(|cert| cert.0.as_slice())
    }

    /// Copy of this certificate with the SCT list replaced
    pub fn with_scts(&self, scts: Vec<Vec<u8>>) -> Self {
        Self {
            chain: self.chain.clone(),
            key: Arc::clone(&self.key),
            ocsp: self.ocsp.clone(),
            scts,
        }
    }

    pub fn to_certified_key(&self) -> CertifiedKey {
        CertifiedKey {
            cert: self.chain.clone(),
            key: Arc::clone(&self.key),
            ocsp: self.ocsp.clone(),
            sct_list: if self.scts.is_empty() {
                None
            } else {
                Some(encode_sct_list(&self.scts))
            },
        }
    }
}

impl fmt::Debug for ServerCertificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerCertificate")
            .field("chain_len", &self.chain.len())
            .field("leaf", &self.leaf().map(Fingerprint::of))
            .field("has_ocsp", &self.ocsp.is_some())
            .field("scts", &self.scts.len())
            .finish()
    }
}
