//! Environment-driven configuration
//!
//! Read once at process start by the binaries, then used to wire
//! the pipeline's collaborators.

use crate::cache::MokaTransactionCache;
use crate::error::PipelineError;
use crate::pipeline::Pipeline;
use crate::reasoning::gemini::DEFAULT_MODEL;
use crate::reasoning::{
    GeminiReasoningClient, MockReasoningClient, ReasoningClient, RetryingReasoningClient,
};
use crate::retriever::CacheAsideRetriever;
use crate::store::{InMemoryTransactionStore, PostgresTransactionStore, TransactionStore};
use crate::Result;
use std::env;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Missing key means the offline mock client is used.
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub reasoning_timeout: Duration,
    /// 0 keeps the pipeline fail-fast.
    pub reasoning_max_retries: u32,
    pub reasoning_retry_backoff: Duration,
    pub cache_ttl: Duration,
    pub cache_max_entries: u64,
    /// Missing URL means the in-memory demo store is used.
    pub database_url: Option<String>,
    pub port: u16,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            gemini_model: DEFAULT_MODEL.to_string(),
            reasoning_timeout: Duration::from_secs(60),
            reasoning_max_retries: 0,
            reasoning_retry_backoff: Duration::from_millis(500),
            cache_ttl: Duration::from_secs(3600),
            cache_max_entries: 10_000,
            database_url: None,
            port: 8080,
        }
    }
}

impl PipelineConfig {
    /// Load from the process environment (call `dotenv` first).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load from any key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        Ok(Self {
            gemini_api_key: get("GEMINI_API_KEY"),
            gemini_model: get("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            reasoning_timeout: parse_or(&get, "REASONING_TIMEOUT_SECS", 60)
                .map(Duration::from_secs)?,
            reasoning_max_retries: parse_or(&get, "REASONING_MAX_RETRIES", 0)?,
            reasoning_retry_backoff: parse_or(&get, "REASONING_RETRY_BACKOFF_MS", 500)
                .map(Duration::from_millis)?,
            cache_ttl: parse_or(&get, "CACHE_TTL_SECS", 3600).map(Duration::from_secs)?,
            cache_max_entries: parse_or(&get, "CACHE_MAX_ENTRIES", defaults.cache_max_entries)?,
            database_url: get("DATABASE_URL"),
            port: match get("PORT") {
                Some(_) => parse_or(&get, "PORT", defaults.port)?,
                None => parse_or(&get, "API_PORT", defaults.port)?,
            },
        })
    }

    /// Construct every collaborator and inject them into a pipeline.
    ///
    /// Must be called inside a tokio runtime when a database URL is set.
    pub fn build_pipeline(&self) -> Result<Pipeline> {
        let store: Arc<dyn TransactionStore> = match &self.database_url {
            Some(url) => {
                info!("Transaction store: postgres");
                Arc::new(PostgresTransactionStore::connect_lazy(url)?)
            }
            None => {
                info!("Transaction store: in-memory sample data");
                Arc::new(InMemoryTransactionStore::with_sample_data())
            }
        };

        let cache = Arc::new(MokaTransactionCache::new(self.cache_max_entries));

        let client: Arc<dyn ReasoningClient> = match &self.gemini_api_key {
            Some(api_key) => Arc::new(GeminiReasoningClient::new(
                api_key.clone(),
                &self.gemini_model,
                self.reasoning_timeout,
            )?),
            None => {
                warn!("GEMINI_API_KEY not set, using mock reasoning client");
                Arc::new(MockReasoningClient)
            }
        };

        let reasoning: Arc<dyn ReasoningClient> = if self.reasoning_max_retries > 0 {
            Arc::new(RetryingReasoningClient::new(
                client,
                self.reasoning_max_retries,
                self.reasoning_retry_backoff,
            ))
        } else {
            client
        };

        Ok(Pipeline::new(
            CacheAsideRetriever::new(store, cache, self.cache_ttl),
            reasoning,
        ))
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.trim().parse().map_err(|e| {
            PipelineError::ConfigError(format!("{} has invalid value {:?}: {}", key, raw, e))
        }),
        None => Ok(default),
    }
}
