// src/ct_log/log_list.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::types::{CtLog, LogId, LogListV3};
use crate::augment::LogResolver;
use crate::error::Error;

pub const DEFAULT_LOG_LIST_URL: &str = "https://www.gstatic.com/ct/log_list/v3/all_logs_list.json";

/// Every log in a loaded log list, RFC 6962 and tiled alike
#[derive(Debug, Clone, Default)]
pub struct LogList {
    logs: Vec<Arc<CtLog>>,
}

impl LogList {
    pub fn new(logs: Vec<CtLog>) -> Self {
        Self {
            logs: logs.into_iter().map(Arc::new).collect(),
        }
    }

    /// Load a log list from an `http(s)://` URL or a filesystem path
    pub async fn load(http_client: &reqwest::Client, source: &str) -> Result<Self> {
        let json = if source.starts_with("https://") || source.starts_with("http://") {
            info!("Fetching CT log list from {}", source);

            let response = http_client
                .get(source)
                .send()
                .await
                .context("Failed to fetch CT log list")?;

            if !response.status().is_success() {
                anyhow::bail!("Failed to fetch log list: HTTP {}", response.status());
            }

            response.text().await.context("Failed to read CT log list")?
        } else {
            info!("Reading CT log list from {}", source);
            tokio::fs::read_to_string(source)
                .await
                .with_context(|| format!("Failed to read CT log list {}", source))?
        };

        let list = Self::from_json(&json)?;
        info!("Loaded {} CT logs", list.len());
        Ok(list)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let v3: LogListV3 = serde_json::from_str(json).context("Failed to parse log list JSON")?;
        Ok(Self::from_v3(&v3))
    }

    /// Flatten a V3 list. Entries without a usable key are skipped.
    pub fn from_v3(list: &LogListV3) -> Self {
        let mut logs = Vec::new();

        for operator in &list.operators {
            let classic = operator
                .logs
                .iter()
                .map(|l| (&l.description, &l.log_id, &l.key, &l.url));
            let tiled = operator
                .tiled_logs
                .iter()
                .map(|l| (&l.description, &l.log_id, &l.key, &l.submission_url));

            for (description, log_id, key, url) in classic.chain(tiled) {
                match build_log(description, log_id.as_deref(), key.as_deref(), url) {
                    Ok(log) => {
                        debug!("Found log: {} ({}) at {}", log.description, log.log_id, log.submission_url);
                        logs.push(Arc::new(log));
                    }
                    Err(e) => warn!("Skipping log {:?} from {}: {:#}", description, operator.name, e),
                }
            }
        }

        Self { logs }
    }

    pub fn all_logs(&self) -> &[Arc<CtLog>] {
        &self.logs
    }

    pub fn len(&self) -> usize {
        self.logs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.logs.is_empty()
    }

    /// The single log whose hex id starts with `prefix` (case-insensitive)
    pub fn find_by_prefix(&self, prefix: &str) -> Result<Arc<CtLog>, Error> {
        let wanted = prefix.to_ascii_lowercase();
        let mut found: Option<&Arc<CtLog>> = None;

        for log in &self.logs {
            if log.log_id.to_hex().starts_with(&wanted) {
                if found.is_some() {
                    return Err(Error::AmbiguousLog(prefix.to_string()));
                }
                found = Some(log);
            }
        }

        found
            .cloned()
            .ok_or_else(|| Error::UnknownLog(prefix.to_string()))
    }
}

fn build_log(description: &str, log_id: Option<&str>, key: Option<&str>, url: &str) -> Result<CtLog> {
    let key = STANDARD
        .decode(key.context("missing key")?)
        .context("invalid base64 key")?;
    if url.is_empty() {
        anyhow::bail!("missing submission URL");
    }

    let log = CtLog::new(key, url.to_string(), description.to_string());

    if let Some(listed) = log_id {
        let listed = STANDARD.decode(listed).context("invalid base64 log_id")?;
        if listed != log.log_id.0 {
            anyhow::bail!("log_id does not match key");
        }
    }

    Ok(log)
}

#[async_trait]
impl LogResolver for LogList {
    async fn resolve(&self, token: &str) -> crate::error::Result<Arc<CtLog>> {
        self.find_by_prefix(token)
    }
}
