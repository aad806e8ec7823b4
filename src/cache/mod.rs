//! Transaction cache boundary
//!
//! The cache holds serialized transaction sets keyed by user id.
//! It is an optimization only: callers treat every error as a miss.

use crate::Result;
use moka::future::Cache;
use moka::Expiry;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Byte-level cache contract
#[async_trait::async_trait]
pub trait TransactionCache: Send + Sync {
    async fn get(&self, user_id: &str) -> Result<Option<Vec<u8>>>;
    async fn set(&self, user_id: &str, bytes: Vec<u8>, ttl: Duration) -> Result<()>;
}

#[derive(Debug, Clone)]
struct CachedBlob {
    bytes: Arc<[u8]>,
    ttl: Duration,
}

/// Expires each entry after the TTL it was written with.
struct BlobExpiry;

impl Expiry<String, CachedBlob> for BlobExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CachedBlob,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CachedBlob,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// In-process cache built on moka
#[derive(Clone)]
pub struct MokaTransactionCache {
    inner: Cache<String, CachedBlob>,
}

impl MokaTransactionCache {
    pub fn new(max_entries: u64) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_entries)
                .expire_after(BlobExpiry)
                .build(),
        }
    }

    pub async fn invalidate(&self, user_id: &str) {
        self.inner.invalidate(user_id).await;
    }
}

#[async_trait::async_trait]
impl TransactionCache for MokaTransactionCache {
    async fn get(&self, user_id: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.inner.get(user_id).await.map(|blob| blob.bytes.to_vec()))
    }

    async fn set(&self, user_id: &str, bytes: Vec<u8>, ttl: Duration) -> Result<()> {
        let blob = CachedBlob {
            bytes: bytes.into(),
            ttl,
        };
        self.inner.insert(user_id.to_string(), blob).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_then_get() {
        let cache = MokaTransactionCache::new(16);
        assert!(cache.get("user_001").await.unwrap().is_none());

        tokio_test::assert_ok!(
            cache
                .set("user_001", b"[1,2,3]".to_vec(), Duration::from_secs(60))
                .await
        );

        assert_eq!(
            cache.get("user_001").await.unwrap(),
            Some(b"[1,2,3]".to_vec())
        );
        assert!(cache.get("user_002").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_entry_expires_after_ttl() {
        let cache = MokaTransactionCache::new(16);
        cache
            .set("user_001", b"x".to_vec(), Duration::from_millis(50))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(cache.get("user_001").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_last_writer_wins() {
        let cache = MokaTransactionCache::new(16);
        let ttl = Duration::from_secs(60);
        cache.set("user_001", b"first".to_vec(), ttl).await.unwrap();
        cache.set("user_001", b"second".to_vec(), ttl).await.unwrap();

        assert_eq!(
            cache.get("user_001").await.unwrap(),
            Some(b"second".to_vec())
        );

        cache.invalidate("user_001").await;
        assert!(cache.get("user_001").await.unwrap().is_none());
    }
}
