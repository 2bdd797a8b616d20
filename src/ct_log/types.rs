// src/ct_log/types.rs
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// SHA-256 of a log's DER SubjectPublicKeyInfo (RFC 6962 section 3.2)
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LogId(pub [u8; 32]);

impl LogId {
    pub fn from_spki(spki_der: &[u8]) -> Self {
        Self(Sha256::digest(spki_der).into())
    }

    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        bytes.try_into().ok().map(Self)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for LogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for LogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LogId({})", self.to_hex())
    }
}

/// Everything needed to submit to a log and check what it sends back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CtLog {
    pub log_id: LogId,
    /// DER SubjectPublicKeyInfo
    pub key: Vec<u8>,
    /// Base URL that `/ct/v1/add-chain` is appended to
    pub submission_url: String,
    pub description: String,
}

impl CtLog {
    /// Build a log whose id is derived from its key
    pub fn new(key: Vec<u8>, submission_url: String, description: String) -> Self {
        Self {
            log_id: LogId::from_spki(&key),
            key,
            submission_url,
            description,
        }
    }
}

/// Google's CT log list V3 format
#[derive(Debug, Serialize, Deserialize)]
pub struct LogListV3 {
    #[serde(default)]
    pub version: Option<String>,
    pub operators: Vec<Operator>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Operator {
    pub name: String,
    #[serde(default)]
    pub email: Vec<String>,
    #[serde(default)]
    pub logs: Vec<LogInfo>,
    #[serde(default)]
    pub tiled_logs: Vec<TiledLogInfo>,
}

/// RFC 6962 log entry; submissions go to `url`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogInfo {
    #[serde(default)]
    pub description: String,
    pub log_id: Option<String>,
    pub key: Option<String>,
    #[serde(default)]
    pub url: String,
    pub mmd: Option<u64>,
}

/// Static CT API log entry; submissions go to `submission_url`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TiledLogInfo {
    #[serde(default)]
    pub description: String,
    pub log_id: Option<String>,
    pub key: Option<String>,
    #[serde(default)]
    pub submission_url: String,
    #[serde(default)]
    pub monitoring_url: String,
    pub mmd: Option<u64>,
}
