// src/watcher.rs
//! Certificate file watcher using notify

use crate::certificate::FileCertificateSource;
use crate::types::ServerCertificate;
use notify::{Event, RecursiveMode, Watcher};
use std::path::PathBuf;
use std::sync::mpsc;
use std::time::Duration;
use tokio::sync::mpsc as tokio_mpsc;

/// Certificate file watcher
pub struct CertificateWatcher {
    path: PathBuf,
}

impl CertificateWatcher {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Start watching the certificate file for changes
    ///
    /// Returns a receiver that gets a freshly parsed certificate whenever the
    /// file changes. A file that fails to parse is logged and skipped.
    pub fn watch(&self) -> anyhow::Result<tokio_mpsc::Receiver<ServerCertificate>> {
        let (tx, rx) = tokio_mpsc::channel(4);
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || {
            if let Err(e) = Self::watch_blocking(path, tx) {
                tracing::error!("Certificate watcher error: {}", e);
            }
        });

        Ok(rx)
    }

    fn watch_blocking(path: PathBuf, tx: tokio_mpsc::Sender<ServerCertificate>) -> anyhow::Result<()> {
        let (notify_tx, notify_rx) = mpsc::channel();

        let mut watcher = notify::recommended_watcher(notify_tx)?;
        watcher.watch(&path, RecursiveMode::NonRecursive)?;

        tracing::info!("Watching certificate file: {:?}", path);

        // Editors and cert renewers tend to emit a burst of events per write
        let mut last_reload: Option<std::time::Instant> = None;

        while let Ok(event) = notify_rx.recv() {
            let Ok(event) = event else { continue };
            if !Self::should_reload(&event) {
                continue;
            }

            let now = std::time::Instant::now();
            if last_reload.is_some_and(|last| now.duration_since(last) < Duration::from_secs(1)) {
                continue;
            }

            // A failed parse does not start the debounce window: the event may
            // have come from a truncate with the new contents still to follow.
            match FileCertificateSource::read_file(&path) {
                Ok(cert) => {
                    last_reload = Some(now);
                    tracing::info!("Certificate reloaded from {:?}", path);
                    if tx.blocking_send(cert).is_err() {
                        tracing::warn!("Certificate receiver dropped, stopping watcher");
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!("Failed to reload certificate: {:#}. Keeping previous certificate.", e);
                }
            }
        }

        Ok(())
    }

    fn should_reload(event: &Event) -> bool {
        use notify::EventKind;

        matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certificate::test_pem::bundle;
    use notify::event::{AccessKind, CreateKind, EventKind, ModifyKind};
    use tempfile::TempDir;

    #[test]
    fn test_should_reload() {
        let modify = Event::new(EventKind::Modify(ModifyKind::Any));
        let create = Event::new(EventKind::Create(CreateKind::File));
        let access = Event::new(EventKind::Access(AccessKind::Any));

        assert!(CertificateWatcher::should_reload(&modify));
        assert!(CertificateWatcher::should_reload(&create));
        assert!(!CertificateWatcher::should_reload(&access));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_watch_delivers_reloaded_certificate() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cert.pem");
        std::fs::write(&path, bundle(b"original")).unwrap();

        let mut rx = CertificateWatcher::new(path.clone()).watch().unwrap();
        // Give the watcher thread time to register
        tokio::time::sleep(Duration::from_millis(500)).await;
        std::fs::write(&path, bundle(b"renewed")).unwrap();

        let cert = tokio::time::timeout(Duration::from_secs(10), rx.recv())
            .await
            .expect("no reload within 10s")
            .expect("watcher stopped");
        assert_eq!(cert.leaf(), Some(&b"renewed"[..]));
    }
}
