// src/server.rs
//! TLS listener.
//!
//! Each connection reads the ClientHello first, builds the augmented
//! certificate for its SNI, and only then configures rustls for that one
//! handshake. The decrypted stream is handed to hyper with the status page
//! router, speaking whichever protocol ALPN settled on.

use axum::Router;
use hyper_util::rt::{TokioExecutor, TokioIo, TokioTimer};
use hyper_util::server::conn::auto;
use hyper_util::service::TowerToHyperService;
use rustls::server::{Acceptor, ClientHello, ResolvesServerCert};
use rustls::sign::CertifiedKey;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio_rustls::server::TlsStream;
use tokio_rustls::LazyConfigAcceptor;
use tracing::{debug, error, info, warn};

use crate::augment::CertificateAugmenter;
use crate::error::Error;
use crate::metrics::HANDSHAKES_TOTAL;
use crate::types::{ClientHelloInfo, ServerCertificate};

pub const ALPN_PROTOCOLS: [&[u8]; 2] = [b"h2", b"http/1.1"];

#[derive(Debug, thiserror::Error)]
pub enum HandshakeError {
    #[error("TLS error: {0}")]
    Tls(#[from] std::io::Error),

    #[error("cannot build certificate for {server_name:?}: {source}")]
    Augment {
        server_name: Option<String>,
        #[source]
        source: Error,
    },

    #[error("handshake did not finish within {0:?}")]
    Timeout(Duration),
}

impl HandshakeError {
    fn outcome(&self) -> &'static str {
        match self {
            HandshakeError::Tls(_) => "tls_error",
            HandshakeError::Augment { .. } => "augment_failed",
            HandshakeError::Timeout(_) => "timeout",
        }
    }
}

/// Always answers with the certificate built for this connection
struct FixedCertResolver(Arc<CertifiedKey>);

impl ResolvesServerCert for FixedCertResolver {
    fn resolve(&self, _client_hello: ClientHello) -> Option<Arc<CertifiedKey>> {
        Some(Arc::clone(&self.0))
    }
}

/// Single-use rustls config presenting `cert`
pub fn tls_config(cert: &ServerCertificate) -> Arc<rustls::ServerConfig> {
    let mut config = rustls::ServerConfig::builder()
        .with_safe_defaults()
        .with_no_client_auth()
        .with_cert_resolver(Arc::new(FixedCertResolver(Arc::new(cert.to_certified_key()))));
    config.alpn_protocols = ALPN_PROTOCOLS.iter().map(|p| p.to_vec()).collect();
    Arc::new(config)
}

/// Read the ClientHello from `io`, augment, and finish the TLS handshake
pub async fn accept_tls<IO>(augmenter: &CertificateAugmenter, io: IO) -> Result<TlsStream<IO>, HandshakeError>
where
    IO: AsyncRead + AsyncWrite + Unpin,
{
    let start = LazyConfigAcceptor::new(Acceptor::default(), io).await?;
    let hello = ClientHelloInfo::from(&start.client_hello());

    let cert = augmenter
        .augment(&hello)
        .await
        .map_err(|source| HandshakeError::Augment {
            server_name: hello.server_name.clone(),
            source,
        })?;

    debug!(
        "Completing handshake for {:?} with {} SCTs",
        hello.server_name,
        cert.scts.len()
    );

    Ok(start.into_stream(tls_config(&cert)).await?)
}

pub struct Server {
    augmenter: Arc<CertificateAugmenter>,
    router: Router,
    handshake_timeout: Duration,
    request_timeout: Duration,
}

impl Server {
    pub fn new(
        augmenter: Arc<CertificateAugmenter>,
        router: Router,
        handshake_timeout: Duration,
        request_timeout: Duration,
    ) -> Self {
        Self {
            augmenter,
            router,
            handshake_timeout,
            request_timeout,
        }
    }

    /// Accept connections until the listener fails permanently
    pub async fn serve(self, listener: TcpListener) -> anyhow::Result<()> {
        info!("Listening on {}", listener.local_addr()?);

        loop {
            let (stream, peer) = match listener.accept().await {
                Ok(conn) => conn,
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    continue;
                }
            };

            let augmenter = Arc::clone(&self.augmenter);
            let router = self.router.clone();
            let handshake_timeout = self.handshake_timeout;
            let request_timeout = self.request_timeout;

            tokio::spawn(async move {
                handle_connection(&augmenter, router, handshake_timeout, request_timeout, stream, peer).await;
            });
        }
    }
}

async fn handle_connection<IO>(
    augmenter: &CertificateAugmenter,
    router: Router,
    handshake_timeout: Duration,
    request_timeout: Duration,
    io: IO,
    peer: SocketAddr,
) where
    IO: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let handshake = match tokio::time::timeout(handshake_timeout, accept_tls(augmenter, io)).await {
        Ok(result) => result,
        Err(_) => Err(HandshakeError::Timeout(handshake_timeout)),
    };

    let tls = match handshake {
        Ok(tls) => {
            HANDSHAKES_TOTAL.with_label_values(&["success"]).inc();
            tls
        }
        Err(e) => {
            HANDSHAKES_TOTAL.with_label_values(&[e.outcome()]).inc();
            match e {
                // already logged by the augmenter
                HandshakeError::Augment { .. } => debug!("Handshake with {} failed: {}", peer, e),
                _ => warn!("Handshake with {} failed: {}", peer, e),
            }
            return;
        }
    };

    let builder = http_builder(tls.get_ref().1.alpn_protocol(), request_timeout);
    let service = TowerToHyperService::new(router);
    if let Err(e) = builder.serve_connection(TokioIo::new(tls), service).await {
        debug!("Connection from {} ended with error: {}", peer, e);
    }
}

/// hyper connection builder for the negotiated ALPN protocol
///
/// HTTP/1.1 clients must deliver each request head within `request_timeout`,
/// which also bounds idle keep-alive. HTTP/2 clients must answer pings
/// within it.
fn http_builder(alpn: Option<&[u8]>, request_timeout: Duration) -> auto::Builder<TokioExecutor> {
    let mut builder = auto::Builder::new(TokioExecutor::new());
    if alpn == Some(b"h2".as_slice()) {
        builder = builder.http2_only();
        builder
            .http2()
            .timer(TokioTimer::new())
            .keep_alive_interval(request_timeout)
            .keep_alive_timeout(request_timeout);
    } else {
        builder = builder.http1_only();
        builder
            .http1()
            .timer(TokioTimer::new())
            .header_read_timeout(request_timeout);
    }
    builder
}
