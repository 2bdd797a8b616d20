// src/cache/file.rs
use anyhow::Context;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::SctCache;
use crate::ct_log::types::LogId;
use crate::error::{Error, Result};
use crate::types::Fingerprint;

/// SCT cache persisted to a TOML file so SCTs survive restarts
///
/// File format: one `"<fingerprint hex>:<log id hex>" = "<base64 SCT>"` pair
/// per entry. The file is rewritten (temp file + rename) after every new
/// entry.
pub struct FileSctCache {
    path: PathBuf,
    entries: Mutex<HashMap<(Fingerprint, LogId), Vec<u8>>>,
}

impl FileSctCache {
    /// Open the cache, loading existing entries if the file exists
    pub async fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let mut entries = HashMap::new();

        if path.exists() {
            info!("Loading SCT cache from {:?}", path);

            let contents = fs::read_to_string(&path)
                .await
                .context("Failed to read SCT cache file")?;

            let stored: BTreeMap<String, String> =
                toml::from_str(&contents).context("Failed to parse SCT cache file")?;

            for (key, value) in stored {
                match parse_entry(&key, &value) {
                    Some((k, sct)) => {
                        entries.insert(k, sct);
                    }
                    None => warn!("Skipping malformed SCT cache entry {:?}", key),
                }
            }

            info!("Loaded {} cached SCTs", entries.len());
        } else {
            info!("SCT cache file {:?} does not exist, starting empty", path);
        }

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    async fn save(&self, entries: &HashMap<(Fingerprint, LogId), Vec<u8>>) -> anyhow::Result<()> {
        let stored: BTreeMap<String, String> = entries
            .iter()
            .map(|((fp, id), sct)| (format!("{}:{}", fp, id), STANDARD.encode(sct)))
            .collect();

        let toml_string = toml::to_string(&stored).context("Failed to serialize SCT cache")?;

        let temp_path = self.path.with_extension("tmp");

        fs::write(&temp_path, toml_string)
            .await
            .context("Failed to write SCT cache to temporary file")?;

        fs::rename(&temp_path, &self.path)
            .await
            .context("Failed to rename temporary SCT cache file")?;

        debug!("Saved {} SCTs to {:?}", stored.len(), self.path);
        Ok(())
    }
}

fn parse_entry(key: &str, value: &str) -> Option<((Fingerprint, LogId), Vec<u8>)> {
    let (fp_hex, id_hex) = key.split_once(':')?;
    let fp: [u8; 32] = hex::decode(fp_hex).ok()?.try_into().ok()?;
    let id = LogId::from_slice(&hex::decode(id_hex).ok()?)?;
    let sct = STANDARD.decode(value).ok()?;
    Some(((Fingerprint(fp), id), sct))
}

#[async_trait]
impl SctCache for FileSctCache {
    async fn get(&self, fingerprint: &Fingerprint, log_id: &LogId) -> Result<Option<Vec<u8>>> {
        let entries = self.entries.lock().await;
        Ok(entries.get(&(*fingerprint, *log_id)).cloned())
    }

    async fn put(&self, fingerprint: &Fingerprint, log_id: &LogId, sct: &[u8]) -> Result<()> {
        let mut entries = self.entries.lock().await;
        let key = (*fingerprint, *log_id);
        if entries.contains_key(&key) {
            return Ok(());
        }

        // Only visible once it is on disk, so a cancelled save leaves no trace
        let mut updated = entries.clone();
        updated.insert(key, sct.to_vec());
        self.save(&updated)
            .await
            .map_err(|e| Error::Cache(e.context(format!("saving SCT cache {:?}", self.path))))?;

        *entries = updated;
        Ok(())
    }
}
