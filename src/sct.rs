// src/sct.rs
//! RFC 6962 Signed Certificate Timestamps.
//!
//! Covers the three encodings an SCT passes through here: the JSON record a
//! log returns from `add-chain`, the TLS `SerializedSCT` bytes that are cached
//! and sent to clients, and the `SignedCertificateTimestampList` carried in
//! the TLS extension. Verification follows section 3.2 of the RFC for
//! `x509_entry` submissions.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ring::signature::{self, UnparsedPublicKey};
use serde::{Deserialize, Serialize};
use x509_parser::prelude::FromDer;
use x509_parser::x509::SubjectPublicKeyInfo;

use crate::ct_log::types::{CtLog, LogId};

// TLS SignatureAndHashAlgorithm values (RFC 5246 7.4.1.4.1)
pub const ECDSA_SHA256: u16 = 0x0403;
pub const ECDSA_SHA384: u16 = 0x0503;
pub const RSA_PKCS1_SHA256: u16 = 0x0401;

const SCT_V1: u8 = 0;
const SIGNATURE_TYPE_CERTIFICATE_TIMESTAMP: u8 = 0;
const ENTRY_TYPE_X509: u16 = 0;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SctError {
    #[error("unsupported SCT version {0}")]
    UnsupportedVersion(u8),

    #[error("SCT is from log {actual}, expected {expected}")]
    LogIdMismatch { expected: LogId, actual: LogId },

    #[error("unsupported signature algorithm 0x{0:04x}")]
    UnsupportedAlgorithm(u16),

    #[error("invalid log public key: {0}")]
    InvalidKey(String),

    #[error("signature is invalid")]
    BadSignature,

    #[error("malformed SCT: {0}")]
    Malformed(String),
}

/// The SCT record returned by `add-chain` (RFC 6962 section 4.1)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddChainResponse {
    pub sct_version: u8,
    #[serde(with = "base64_bytes")]
    pub id: Vec<u8>,
    pub timestamp: u64,
    #[serde(with = "base64_bytes")]
    pub extensions: Vec<u8>,
    /// TLS-encoded `DigitallySigned` struct
    #[serde(with = "base64_bytes")]
    pub signature: Vec<u8>,
}

/// A `DigitallySigned` struct: algorithm pair plus the raw signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigitallySigned {
    pub algorithm: u16,
    pub signature: Vec<u8>,
}

impl DigitallySigned {
    pub fn parse(bytes: &[u8]) -> Result<Self, SctError> {
        let mut reader = Reader::new(bytes);
        let signed = Self::read(&mut reader)?;
        reader.finish()?;
        Ok(signed)
    }

    fn read(reader: &mut Reader<'_>) -> Result<Self, SctError> {
        let algorithm = reader.u16()?;
        let len = reader.u16()? as usize;
        let signature = reader.take(len)?.to_vec();
        Ok(Self {
            algorithm,
            signature,
        })
    }

    /// TLS encoding, as carried in `AddChainResponse::signature`
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 + self.signature.len());
        self.write(&mut out);
        out
    }

    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.algorithm.to_be_bytes());
        write_u16_prefixed(&self.signature, out);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedCertificateTimestamp {
    pub log_id: LogId,
    /// Milliseconds since the Unix epoch
    pub timestamp: u64,
    pub extensions: Vec<u8>,
    pub signature: DigitallySigned,
}

impl TryFrom<AddChainResponse> for SignedCertificateTimestamp {
    type Error = SctError;

    fn try_from(response: AddChainResponse) -> Result<Self, SctError> {
        if response.sct_version != SCT_V1 {
            return Err(SctError::UnsupportedVersion(response.sct_version));
        }
        let log_id = LogId::from_slice(&response.id).ok_or_else(|| {
            SctError::Malformed(format!("log id is {} bytes, expected 32", response.id.len()))
        })?;
        if response.extensions.len() > u16::MAX as usize {
            return Err(SctError::Malformed("extensions too long".to_string()));
        }
        let signature = DigitallySigned::parse(&response.signature)?;

        Ok(Self {
            log_id,
            timestamp: response.timestamp,
            extensions: response.extensions,
            signature,
        })
    }
}

impl SignedCertificateTimestamp {
    /// Parse a TLS `SerializedSCT`
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SctError> {
        let mut reader = Reader::new(bytes);
        let version = reader.u8()?;
        if version != SCT_V1 {
            return Err(SctError::UnsupportedVersion(version));
        }
        let log_id = LogId::from_slice(reader.take(32)?)
            .ok_or_else(|| SctError::Malformed("short log id".to_string()))?;
        let timestamp = reader.u64()?;
        let ext_len = reader.u16()? as usize;
        let extensions = reader.take(ext_len)?.to_vec();
        let signature = DigitallySigned::read(&mut reader)?;
        reader.finish()?;

        Ok(Self {
            log_id,
            timestamp,
            extensions,
            signature,
        })
    }

    /// TLS `SerializedSCT` encoding
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(47 + self.extensions.len() + self.signature.signature.len());
        out.push(SCT_V1);
        out.extend_from_slice(&self.log_id.0);
        out.extend_from_slice(&self.timestamp.to_be_bytes());
        write_u16_prefixed(&self.extensions, &mut out);
        self.signature.write(&mut out);
        out
    }

    /// Check that this SCT was issued by `log` for the certificate `leaf_der`
    pub fn verify(&self, log: &CtLog, leaf_der: &[u8]) -> Result<(), SctError> {
        if self.log_id != log.log_id {
            return Err(SctError::LogIdMismatch {
                expected: log.log_id,
                actual: self.log_id,
            });
        }
        let input = signature_input(self.timestamp, leaf_der, &self.extensions);
        verify_signature(&log.key, self.signature.algorithm, &input, &self.signature.signature)
    }
}

/// The `digitally-signed` input of a v1 SCT over an `x509_entry`
pub fn signature_input(timestamp: u64, leaf_der: &[u8], extensions: &[u8]) -> Vec<u8> {
    let mut data = Vec::with_capacity(leaf_der.len() + extensions.len() + 17);
    data.push(SCT_V1);
    data.push(SIGNATURE_TYPE_CERTIFICATE_TIMESTAMP);
    data.extend_from_slice(&timestamp.to_be_bytes());
    data.extend_from_slice(&ENTRY_TYPE_X509.to_be_bytes());
    let len = leaf_der.len() as u32;
    data.extend_from_slice(&len.to_be_bytes()[1..]);
    data.extend_from_slice(leaf_der);
    write_u16_prefixed(extensions, &mut data);
    data
}

/// Verify `sig` over `data` with a log key given as DER SubjectPublicKeyInfo
pub fn verify_signature(spki_der: &[u8], algorithm: u16, data: &[u8], sig: &[u8]) -> Result<(), SctError> {
    let alg: &'static dyn signature::VerificationAlgorithm = match algorithm {
        ECDSA_SHA256 => &signature::ECDSA_P256_SHA256_ASN1,
        ECDSA_SHA384 => &signature::ECDSA_P384_SHA384_ASN1,
        RSA_PKCS1_SHA256 => &signature::RSA_PKCS1_2048_8192_SHA256,
        other => return Err(SctError::UnsupportedAlgorithm(other)),
    };

    let (_, spki) = SubjectPublicKeyInfo::from_der(spki_der)
        .map_err(|e| SctError::InvalidKey(e.to_string()))?;
    let key = spki.subject_public_key.data.as_ref();

    UnparsedPublicKey::new(alg, key)
        .verify(data, sig)
        .map_err(|_| SctError::BadSignature)
}

/// TLS `SignedCertificateTimestampList` (RFC 6962 section 3.3)
pub fn encode_sct_list(scts: &[Vec<u8>]) -> Vec<u8> {
    let mut body = Vec::new();
    for sct in scts {
        write_u16_prefixed(sct, &mut body);
    }
    let mut out = Vec::with_capacity(body.len() + 2);
    write_u16_prefixed(&body, &mut out);
    out
}

fn write_u16_prefixed(data: &[u8], out: &mut Vec<u8>) {
    out.extend_from_slice(&(data.len() as u16).to_be_bytes());
    out.extend_from_slice(data);
}

struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], SctError> {
        if self.buf.len() < n {
            return Err(SctError::Malformed(format!(
                "truncated: need {} bytes, have {}",
                n,
                self.buf.len()
            )));
        }
        let (head, rest) = self.buf.split_at(n);
        self.buf = rest;
        Ok(head)
    }

    fn u8(&mut self) -> Result<u8, SctError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, SctError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u64(&mut self) -> Result<u64, SctError> {
        let mut b = [0u8; 8];
        b.copy_from_slice(self.take(8)?);
        Ok(u64::from_be_bytes(b))
    }

    fn finish(self) -> Result<(), SctError> {
        if self.buf.is_empty() {
            Ok(())
        } else {
            Err(SctError::Malformed(format!("{} trailing bytes", self.buf.len())))
        }
    }
}

pub(crate) mod base64_bytes {
    use super::{Engine, STANDARD};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
pub(crate) mod test_log {
    //! A CT log that signs SCTs with a throwaway P-256 key.

    use super::*;
    use ring::rand::SystemRandom;
    use ring::signature::{EcdsaKeyPair, KeyPair, ECDSA_P256_SHA256_ASN1_SIGNING};

    // SEQUENCE { SEQUENCE { ecPublicKey, prime256v1 }, BIT STRING
    const P256_SPKI_PREFIX: &str = "3059301306072a8648ce3d020106082a8648ce3d030107034200";

    pub struct TestLog {
        pub log: CtLog,
        key_pair: EcdsaKeyPair,
        rng: SystemRandom,
    }

    impl TestLog {
        pub fn new(description: &str, submission_url: &str) -> Self {
            let rng = SystemRandom::new();
            let pkcs8 = EcdsaKeyPair::generate_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, &rng).unwrap();
            let key_pair =
                EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, pkcs8.as_ref(), &rng).unwrap();
            let mut spki = hex::decode(P256_SPKI_PREFIX).unwrap();
            spki.extend_from_slice(key_pair.public_key().as_ref());

            Self {
                log: CtLog::new(spki, submission_url.to_string(), description.to_string()),
                key_pair,
                rng,
            }
        }

        pub fn issue(&self, leaf_der: &[u8], timestamp: u64) -> AddChainResponse {
            let input = signature_input(timestamp, leaf_der, &[]);
            let sig = self.key_pair.sign(&self.rng, &input).unwrap();
            let mut signature = Vec::new();
            DigitallySigned {
                algorithm: ECDSA_SHA256,
                signature: sig.as_ref().to_vec(),
            }
            .write(&mut signature);

            AddChainResponse {
                sct_version: 0,
                id: self.log.log_id.0.to_vec(),
                timestamp,
                extensions: Vec::new(),
                signature,
            }
        }
    }
}
