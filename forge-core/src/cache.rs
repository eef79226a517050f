//! Generation result cache and the short-lived Figma style cache.
//!
//! The generation cache key is SHA-256 over the input digest, both content
//! hashes, the pattern id, and the pipeline version, so any input change
//! invalidates naturally. Writes are last-writer-wins: identical keys carry
//! identical values by construction, so no transactions are needed.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;

use crate::generated::GeneratedCode;

/// Compose the generation cache key.
pub fn cache_key(
    input_digest: &str,
    tokens_hash: &str,
    requirements_hash: &str,
    pattern_id: &str,
    pipeline_version: &str,
) -> String {
    let mut hasher = Sha256::new();
    for part in [
        input_digest,
        tokens_hash,
        requirements_hash,
        pattern_id,
        pipeline_version,
    ] {
        hasher.update(part.as_bytes());
        hasher.update([0x1f]); // separator so concatenations cannot collide
    }
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub value: GeneratedCode,
    pub created_at: DateTime<Utc>,
    /// No TTL by default; invalidation rides on key changes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<Duration>,
}

impl CacheEntry {
    pub fn new(key: String, value: GeneratedCode) -> Self {
        Self {
            key,
            value,
            created_at: Utc::now(),
            ttl: None,
        }
    }

    pub fn is_expired(&self) -> bool {
        match self.ttl {
            None => false,
            Some(ttl) => {
                let age = Utc::now() - self.created_at;
                age.to_std().map(|age| age > ttl).unwrap_or(false)
            }
        }
    }
}

/// Seam for the result cache; production can back this with an external
/// store reached via `CACHE_URL`, tests and single-node use the in-memory
/// implementation.
#[async_trait]
pub trait GenerationCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<CacheEntry>;
    async fn put(&self, entry: CacheEntry);
}

#[derive(Default)]
pub struct InMemoryCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

#[async_trait]
impl GenerationCache for InMemoryCache {
    async fn get(&self, key: &str) -> Option<CacheEntry> {
        let entries = self.entries.read().await;
        entries.get(key).filter(|e| !e.is_expired()).cloned()
    }

    async fn put(&self, entry: CacheEntry) {
        let mut entries = self.entries.write().await;
        entries.insert(entry.key.clone(), entry);
    }
}

/// Generic TTL cache for small hot values (Figma styles, 5 minutes).
pub struct TtlCache<T: Clone> {
    ttl: Duration,
    entries: RwLock<HashMap<String, (DateTime<Utc>, T)>>,
}

impl<T: Clone> TtlCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, key: &str) -> Option<T> {
        let entries = self.entries.read().await;
        let (stored_at, value) = entries.get(key)?;
        let age = (Utc::now() - *stored_at).to_std().ok()?;
        if age > self.ttl {
            return None;
        }
        Some(value.clone())
    }

    pub async fn insert(&self, key: impl Into<String>, value: T) {
        let mut entries = self.entries.write().await;
        entries.insert(key.into(), (Utc::now(), value));
    }

    /// Drop expired entries; callers invoke this opportunistically.
    pub async fn evict_expired(&self) {
        let mut entries = self.entries.write().await;
        let ttl = self.ttl;
        entries.retain(|_, (stored_at, _)| {
            (Utc::now() - *stored_at)
                .to_std()
                .map(|age| age <= ttl)
                .unwrap_or(true)
        });
    }
}
