//! Reasoning client boundary
//!
//! One narrow request/response call to an external text-generation service.
//! Clients never see pipeline state, only the request built by a stage.

use crate::models::Stage;
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod gemini;
pub mod retry;

pub use gemini::GeminiReasoningClient;
pub use retry::RetryingReasoningClient;

/// Prompt payload for one stage
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReasoningRequest {
    pub stage: Stage,
    /// Role instructions for the model.
    pub system: String,
    /// Stage input, built only from earlier stage results.
    pub prompt: String,
}

/// Trait for text generation
#[async_trait]
pub trait ReasoningClient: Send + Sync {
    /// Fails with `ReasoningUnavailable` or `MalformedResponse`.
    async fn generate(&self, request: &ReasoningRequest) -> Result<String>;
}

/// Offline client with canned, deterministic markdown
/// Keeps the pipeline runnable without an API key
pub struct MockReasoningClient;

#[async_trait]
impl ReasoningClient for MockReasoningClient {
    async fn generate(&self, request: &ReasoningRequest) -> Result<String> {
        let excerpt: String = request.prompt.lines().take(4).collect::<Vec<_>>().join("\n> ");

        let body = match request.stage {
            Stage::Analysis => "## Financial Analysis\n\n\
                 - Income comfortably covers recurring spending.\n\
                 - Housing is the dominant expense category.\n\
                 - Discretionary spending is moderate and trimmable.",
            Stage::Budget => "## Budget Plan\n\n\
                 | Bucket | Share |\n|--------|-------|\n\
                 | Needs | 50% |\n| Wants | 30% |\n| Savings | 20% |\n\n\
                 Automate the savings transfer on payday.",
            Stage::Investment => "## Investment Suggestions\n\n\
                 1. Build a three-month emergency fund first.\n\
                 2. Direct surplus savings into a broad, low-cost index fund.\n\
                 3. Revisit the allocation every six months.",
        };

        Ok(format!("{}\n\n> {}", body, excerpt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_client_is_deterministic() {
        let request = ReasoningRequest {
            stage: Stage::Budget,
            system: "You are a friendly budgeting expert.".to_string(),
            prompt: "Here is the analysis".to_string(),
        };

        let first = MockReasoningClient.generate(&request).await.unwrap();
        let second = MockReasoningClient.generate(&request).await.unwrap();

        assert_eq!(first, second);
        assert!(first.starts_with("## Budget Plan"));
        assert!(first.contains("Here is the analysis"));
    }
}
