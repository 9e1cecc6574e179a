//! Result cache: content-addressed analysis results.
//!
//! Keys follow the `paper:<source-kind>:<source-id>` scheme (see
//! `PaperSource::cache_key`). The cache is a pure external collaborator:
//! a concurrent read-before-write race on the same key means a redundant
//! recomputation, never a correctness problem, since analyses are
//! idempotent.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Key-value cache for completed analyses.
#[async_trait]
pub trait ResultCache: Send + Sync {
    /// Fetch a cached value, or `None` on miss/expiry.
    async fn get(&self, key: &str) -> Option<Value>;

    /// Store a value with a time-to-live.
    async fn set(&self, key: &str, value: Value, ttl: Duration);
}

/// In-memory TTL cache. Expired entries are dropped lazily on read.
pub struct InMemoryResultCache {
    inner: RwLock<HashMap<String, CacheEntry>>,
}

struct CacheEntry {
    value: Value,
    expires_at: Instant,
}

impl InMemoryResultCache {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored entries, including not-yet-collected expired ones.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for InMemoryResultCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResultCache for InMemoryResultCache {
    async fn get(&self, key: &str) -> Option<Value> {
        {
            let entries = self.inner.read().await;
            match entries.get(key) {
                Some(entry) if entry.expires_at > Instant::now() => {
                    return Some(entry.value.clone())
                }
                Some(_) => {}
                None => return None,
            }
        }
        // Expired: drop it under a write lock
        self.inner.write().await.remove(key);
        None
    }

    async fn set(&self, key: &str, value: Value, ttl: Duration) {
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.inner.write().await.insert(key.to_string(), entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_set_get_roundtrip() {
        let cache = InMemoryResultCache::new();
        cache
            .set("paper:arxiv:1234.5678", json!({"title": "T"}), Duration::from_secs(60))
            .await;
        let value = cache.get("paper:arxiv:1234.5678").await.unwrap();
        assert_eq!(value["title"], "T");
    }

    #[tokio::test]
    async fn test_miss() {
        let cache = InMemoryResultCache::new();
        assert!(cache.get("paper:doi:none").await.is_none());
    }

    #[tokio::test]
    async fn test_expiry() {
        let cache = InMemoryResultCache::new();
        cache
            .set("k", json!(1), Duration::from_millis(0))
            .await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(cache.get("k").await.is_none());
        // The expired entry was removed on read
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_overwrite_same_key() {
        let cache = InMemoryResultCache::new();
        cache.set("k", json!(1), Duration::from_secs(60)).await;
        cache.set("k", json!(2), Duration::from_secs(60)).await;
        assert_eq!(cache.get("k").await.unwrap(), json!(2));
        assert_eq!(cache.len().await, 1);
    }
}
