//! Durable key-value cache boundary.
//!
//! Values are opaque blobs with an expiry; an expired read behaves as a miss.
//! The cache is a read-through convenience only -- the engine checkpoints its
//! optimistic quest list here and restores the previous checkpoint on
//! rollback, but never treats a cached value as authoritative.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::error::CacheError;

#[async_trait]
pub trait DurableCache: Send + Sync + 'static {
    /// The blob at `key`, or `None` on a miss. Expired entries are misses.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    async fn remove(&self, key: &str) -> Result<(), CacheError>;
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: Instant,
}

/// Process-local cache with lazy expiry: stale entries are dropped on the
/// read that finds them.
#[derive(Debug, Default, Clone)]
pub struct InMemoryCache {
    entries: Arc<RwLock<BTreeMap<String, CacheEntry>>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn write_guard(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<String, CacheEntry>> {
        match self.entries.write() {
            Ok(guard) => guard,
            Err(poison) => poison.into_inner(),
        }
    }
}

#[async_trait]
impl DurableCache for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = Instant::now();
        let mut entries = self.write_guard();

        let expired = entries.get(key).is_some_and(|e| e.expires_at <= now);
        if expired {
            entries.remove(key);
            return Ok(None);
        }

        Ok(entries.get(key).map(|e| e.value.clone()))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.write_guard().insert(key.to_string(), entry);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        self.write_guard().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get_returns_the_blob() {
        let cache = InMemoryCache::new();
        cache
            .set("k", "v".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some("v".to_string()));
    }

    #[tokio::test]
    async fn expired_entry_reads_as_miss() {
        let cache = InMemoryCache::new();
        cache
            .set("k", "v".to_string(), Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(cache.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn overwrite_refreshes_the_ttl() {
        let cache = InMemoryCache::new();
        cache
            .set("k", "old".to_string(), Duration::ZERO)
            .await
            .unwrap();
        cache
            .set("k", "new".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some("new".to_string()));
    }

    #[tokio::test]
    async fn remove_deletes_the_entry() {
        let cache = InMemoryCache::new();
        cache
            .set("k", "v".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
        cache.remove("k").await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), None);
    }
}
