//! Community switch database keyed by SHA-256.
//!
//! An exact hash match is the strongest signal the aggregator knows. Lookups
//! never fail an analysis: errors become `CommunityUnavailable` warnings.

use crate::core::{SwitchSet, SwitchSource};
use crate::engine::config::CommunityConfig;
use crate::error::{Result, UnattendError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Crowd-verified switches for one installer hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunityRecord {
    #[serde(default)]
    pub sha256: String,
    #[serde(default)]
    pub installer_type: Option<String>,
    #[serde(default)]
    pub product_name: Option<String>,
    pub install_args: Vec<String>,
    #[serde(default)]
    pub uninstall_args: Vec<String>,
}

impl CommunityRecord {
    pub fn switch_set(&self, confidence: f32) -> SwitchSet {
        SwitchSet::new(
            self.install_args.clone(),
            self.uninstall_args.clone(),
            SwitchSource::Community,
            confidence,
        )
    }
}

fn normalize(sha256: &str) -> String {
    sha256.trim().to_ascii_lowercase()
}

#[async_trait]
pub trait CommunityDatabase: Send + Sync {
    /// `Ok(None)` means the database answered and has no record.
    async fn lookup(&self, sha256: &str) -> Result<Option<CommunityRecord>>;
}

/// In-memory database, usually loaded from a JSON array of records.
#[derive(Debug, Clone, Default)]
pub struct StaticCommunityDatabase {
    records: HashMap<String, CommunityRecord>,
}

impl StaticCommunityDatabase {
    pub fn new<I: IntoIterator<Item = CommunityRecord>>(records: I) -> Self {
        let records = records
            .into_iter()
            .filter(|r| !r.sha256.trim().is_empty())
            .map(|r| (normalize(&r.sha256), r))
            .collect();
        Self { records }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let records: Vec<CommunityRecord> = serde_json::from_str(json)?;
        Ok(Self::new(records))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl CommunityDatabase for StaticCommunityDatabase {
    async fn lookup(&self, sha256: &str) -> Result<Option<CommunityRecord>> {
        Ok(self.records.get(&normalize(sha256)).cloned())
    }
}

/// Remote database answering `GET {endpoint}/{sha256}`.
#[cfg(feature = "community-http")]
#[derive(Debug, Clone)]
pub struct HttpCommunityDatabase {
    endpoint: String,
    timeout: std::time::Duration,
    client: reqwest::Client,
}

#[cfg(feature = "community-http")]
impl HttpCommunityDatabase {
    pub fn new(endpoint: &str, timeout: std::time::Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            timeout,
            client,
        }
    }

    fn record_url(&self, sha256: &str) -> String {
        format!("{}/{}", self.endpoint, normalize(sha256))
    }
}

#[cfg(feature = "community-http")]
#[async_trait]
impl CommunityDatabase for HttpCommunityDatabase {
    async fn lookup(&self, sha256: &str) -> Result<Option<CommunityRecord>> {
        use crate::timeout::{with_timeout, TimeoutConfig};

        let url = self.record_url(sha256);
        let config = TimeoutConfig::new(self.timeout, "community lookup").quiet();
        with_timeout(config, async {
            let response = self.client.get(&url).send().await?;
            let status = response.status();
            if status == reqwest::StatusCode::NOT_FOUND {
                return Ok(None);
            }
            if !status.is_success() {
                return Err(UnattendError::CommunityUnavailable(format!(
                    "{url} answered {status}"
                )));
            }
            let mut record: CommunityRecord = response.json().await?;
            if record.sha256.is_empty() {
                record.sha256 = normalize(sha256);
            }
            Ok(Some(record))
        })
        .await
        .map_err(|e| match e {
            UnattendError::ProcessTimeout { millis } => {
                UnattendError::CommunityUnavailable(format!("no answer within {millis}ms"))
            }
            other => other,
        })
    }
}

/// Tries each source in order; the first record wins.
///
/// A failing source does not hide later ones, but when every source failed
/// the last error is returned.
#[derive(Clone, Default)]
pub struct ChainedCommunityDatabase {
    sources: Vec<Arc<dyn CommunityDatabase>>,
}

impl ChainedCommunityDatabase {
    pub fn new(sources: Vec<Arc<dyn CommunityDatabase>>) -> Self {
        Self { sources }
    }
}

#[async_trait]
impl CommunityDatabase for ChainedCommunityDatabase {
    async fn lookup(&self, sha256: &str) -> Result<Option<CommunityRecord>> {
        let mut last_err = None;
        let mut answered = false;
        for source in &self.sources {
            match source.lookup(sha256).await {
                Ok(Some(record)) => return Ok(Some(record)),
                Ok(None) => answered = true,
                Err(e) => {
                    warn!(error = %e, "community source failed");
                    last_err = Some(e);
                }
            }
        }
        match last_err {
            Some(e) if !answered => Err(e),
            _ => Ok(None),
        }
    }
}

/// Write-once cache in front of another database.
///
/// Answers (including "no record") are cached per hash; errors are not, so a
/// flaky endpoint is retried by the next analysis.
pub struct CachedCommunityDatabase<D> {
    inner: D,
    cache: RwLock<HashMap<String, Option<CommunityRecord>>>,
}

impl<D: CommunityDatabase> CachedCommunityDatabase<D> {
    pub fn new(inner: D) -> Self {
        Self {
            inner,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub async fn cached_entries(&self) -> usize {
        self.cache.read().await.len()
    }
}

#[async_trait]
impl<D: CommunityDatabase> CommunityDatabase for CachedCommunityDatabase<D> {
    async fn lookup(&self, sha256: &str) -> Result<Option<CommunityRecord>> {
        let key = normalize(sha256);
        if let Some(hit) = self.cache.read().await.get(&key) {
            debug!(sha256 = %key, "community cache hit");
            return Ok(hit.clone());
        }
        let answer = self.inner.lookup(&key).await?;
        let mut cache = self.cache.write().await;
        Ok(cache.entry(key).or_insert(answer).clone())
    }
}

/// Build the database described by `config`, or `None` when lookups are off
/// or no source is configured.
pub fn database_from_config(config: &CommunityConfig) -> Result<Option<Arc<dyn CommunityDatabase>>> {
    if !config.enabled {
        return Ok(None);
    }
    let mut sources: Vec<Arc<dyn CommunityDatabase>> = Vec::new();
    if let Some(path) = &config.database_file {
        let db = StaticCommunityDatabase::from_json_file(path)?;
        debug!(records = db.len(), path = %path.display(), "loaded community database file");
        sources.push(Arc::new(db));
    }
    if let Some(endpoint) = &config.endpoint {
        #[cfg(feature = "community-http")]
        sources.push(Arc::new(HttpCommunityDatabase::new(endpoint, config.timeout())));
        #[cfg(not(feature = "community-http"))]
        warn!(%endpoint, "community endpoint configured but HTTP support is disabled");
    }
    Ok(match sources.len() {
        0 => None,
        1 => sources.pop().map(|only| {
            Arc::new(CachedCommunityDatabase::new(SharedDatabase(only))) as Arc<dyn CommunityDatabase>
        }),
        _ => Some(Arc::new(CachedCommunityDatabase::new(ChainedCommunityDatabase::new(
            sources,
        ))) as Arc<dyn CommunityDatabase>),
    })
}

/// Adapter so an `Arc<dyn CommunityDatabase>` can sit inside the cache.
struct SharedDatabase(Arc<dyn CommunityDatabase>);

#[async_trait]
impl CommunityDatabase for SharedDatabase {
    async fn lookup(&self, sha256: &str) -> Result<Option<CommunityRecord>> {
        self.0.lookup(sha256).await
    }
}
