// src/cache/mod.rs
//! SCT cache abstraction.
//!
//! An entry is keyed by (certificate fingerprint, log id) and, once written,
//! is final: later writes for the same key are ignored. Implementations hand
//! out copies so callers never alias cache-internal buffers.

use async_trait::async_trait;

use crate::ct_log::types::LogId;
use crate::error::Result;
use crate::types::Fingerprint;

pub mod file;
pub mod memory;

pub use file::FileSctCache;
pub use memory::MemorySctCache;

#[async_trait]
pub trait SctCache: Send + Sync {
    /// Previously cached SCT, or `None` on a miss
    async fn get(&self, fingerprint: &Fingerprint, log_id: &LogId) -> Result<Option<Vec<u8>>>;

    /// Store an SCT; a no-op if the key already has a value
    async fn put(&self, fingerprint: &Fingerprint, log_id: &LogId, sct: &[u8]) -> Result<()>;
}
