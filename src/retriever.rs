//! Cache-aside transaction retrieval
//!
//! cache lookup → store fallback on miss → cache population → return.
//! Cache faults are recovered here and never reach the pipeline.

use crate::cache::TransactionCache;
use crate::error::PipelineError;
use crate::models::TransactionSet;
use crate::store::TransactionStore;
use crate::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

pub struct CacheAsideRetriever {
    store: Arc<dyn TransactionStore>,
    cache: Arc<dyn TransactionCache>,
    ttl: Duration,
}

impl CacheAsideRetriever {
    pub fn new(
        store: Arc<dyn TransactionStore>,
        cache: Arc<dyn TransactionCache>,
        ttl: Duration,
    ) -> Self {
        Self { store, cache, ttl }
    }

    /// Return the user's transactions, from the cache when possible.
    pub async fn fetch(&self, user_id: &str) -> Result<TransactionSet> {
        if let Some(cached) = self.lookup(user_id).await {
            debug!(user_id = %user_id, cache = "hit", rows = cached.len(), "Transactions served from cache");
            return Ok(cached);
        }

        debug!(user_id = %user_id, cache = "miss", "Fetching transactions from store");

        let rows = self
            .store
            .fetch_transactions(user_id)
            .await
            .map_err(|e| PipelineError::DataUnavailable(e.to_string()))?;

        let transactions = TransactionSet::new(user_id, rows);
        self.populate(&transactions).await;

        Ok(transactions)
    }

    /// Cache read; undecodable bytes and cache errors both count as a miss.
    async fn lookup(&self, user_id: &str) -> Option<TransactionSet> {
        let bytes = match self.cache.get(user_id).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                warn!(user_id = %user_id, "Cache read failed, treating as miss: {}", e);
                return None;
            }
        };

        match serde_json::from_slice::<TransactionSet>(&bytes) {
            Ok(set) if set.user_id() == user_id => Some(set),
            Ok(set) => {
                warn!(
                    user_id = %user_id,
                    cached_user = %set.user_id(),
                    "Cached entry belongs to another user, treating as miss"
                );
                None
            }
            Err(e) => {
                warn!(user_id = %user_id, "Cached entry undecodable, treating as miss: {}", e);
                None
            }
        }
    }

    async fn populate(&self, transactions: &TransactionSet) {
        let bytes = match serde_json::to_vec(transactions) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(user_id = %transactions.user_id(), "Skipping cache write: {}", e);
                return;
            }
        };

        if let Err(e) = self.cache.set(transactions.user_id(), bytes, self.ttl).await {
            warn!(user_id = %transactions.user_id(), "Cache write failed: {}", e);
        }
    }
}
