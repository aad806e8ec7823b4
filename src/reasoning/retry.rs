//! Bounded retry wrapper for reasoning clients
//!
//! The pipeline itself is fail-fast; callers that want retries wrap the
//! client they inject. Only `ReasoningUnavailable` is retried: a malformed
//! answer is not expected to improve on a second ask.

use super::{ReasoningClient, ReasoningRequest};
use crate::error::PipelineError;
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

pub struct RetryingReasoningClient {
    inner: Arc<dyn ReasoningClient>,
    max_retries: u32,
    backoff: Duration,
}

impl RetryingReasoningClient {
    /// Attempt `1 + max_retries` times, sleeping `backoff * attempt` between tries.
    pub fn new(inner: Arc<dyn ReasoningClient>, max_retries: u32, backoff: Duration) -> Self {
        Self {
            inner,
            max_retries,
            backoff,
        }
    }
}

#[async_trait]
impl ReasoningClient for RetryingReasoningClient {
    async fn generate(&self, request: &ReasoningRequest) -> Result<String> {
        let mut attempt = 0;

        loop {
            match self.inner.generate(request).await {
                Err(PipelineError::ReasoningUnavailable(reason)) if attempt < self.max_retries => {
                    attempt += 1;
                    warn!(
                        stage = %request.stage,
                        attempt,
                        max_retries = self.max_retries,
                        "Reasoning call failed, retrying: {}",
                        reason
                    );
                    tokio::time::sleep(self.backoff * attempt).await;
                }
                other => return other,
            }
        }
    }
}
