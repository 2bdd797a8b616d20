// src/error.rs
//! Error type shared by the handshake and status page paths.
//!
//! Every variant is fatal to the handshake that produced it. The status page
//! renders the `Display` text of resolution errors into a 500 response.

use crate::sct::SctError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The base certificate could not be obtained
    #[error("error obtaining certificate: {0:#}")]
    CertificateSource(anyhow::Error),

    #[error("no log with prefix {0:?}")]
    UnknownLog(String),

    #[error("log prefix {0:?} is ambiguous")]
    AmbiguousLog(String),

    #[error("SCT cache error: {0:#}")]
    Cache(anyhow::Error),

    #[error("invalid submission URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("cannot submit an empty certificate chain")]
    EmptyChain,

    #[error("Post {url:?}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Post {url:?}: {status} ({body:?})")]
    Status {
        url: String,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("error unmarshaling response from {url:?}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid SCT in response from {url:?}: {source}")]
    InvalidSct {
        url: String,
        #[source]
        source: SctError,
    },

    #[error("error verifying SCT signature from {url:?}: {source}")]
    Verification {
        url: String,
        #[source]
        source: SctError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_messages() {
        assert_eq!(
            Error::UnknownLog("zz".to_string()).to_string(),
            "no log with prefix \"zz\""
        );
        assert_eq!(
            Error::AmbiguousLog("aa".to_string()).to_string(),
            "log prefix \"aa\" is ambiguous"
        );
    }

    #[test]
    fn test_status_error_names_url_and_body() {
        let err = Error::Status {
            url: "https://log.example/ct/v1/add-chain".to_string(),
            status: reqwest::StatusCode::BAD_REQUEST,
            body: "unknown root".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("https://log.example/ct/v1/add-chain"));
        assert!(msg.contains("400 Bad Request"));
        assert!(msg.contains("unknown root"));
    }
}
