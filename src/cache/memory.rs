// src/cache/memory.rs
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::SctCache;
use crate::ct_log::types::LogId;
use crate::error::Result;
use crate::types::Fingerprint;

/// Process-lifetime SCT cache
#[derive(Clone, Default)]
pub struct MemorySctCache {
    inner: Arc<Mutex<HashMap<(Fingerprint, LogId), Vec<u8>>>>,
}

impl MemorySctCache {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}

#[async_trait]
impl SctCache for MemorySctCache {
    async fn get(&self, fingerprint: &Fingerprint, log_id: &LogId) -> Result<Option<Vec<u8>>> {
        let guard = self.inner.lock().await;
        Ok(guard.get(&(*fingerprint, *log_id)).cloned())
    }

    async fn put(&self, fingerprint: &Fingerprint, log_id: &LogId, sct: &[u8]) -> Result<()> {
        let mut guard = self.inner.lock().await;
        guard
            .entry((*fingerprint, *log_id))
            .or_insert_with(|| sct.to_vec());
        Ok(())
    }
}
