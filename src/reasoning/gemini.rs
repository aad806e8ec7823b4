//! Gemini API reasoning client
//!
//! Uses a long-lived reqwest::Client for connection pooling.
//! Every failure maps onto the two reasoning error kinds.

use super::{ReasoningClient, ReasoningRequest};
use crate::error::PipelineError;
use crate::Result;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Reusable Gemini client (connection-pooled)
pub struct GeminiReasoningClient {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl GeminiReasoningClient {
    pub fn new(api_key: String, model: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            api_key,
            endpoint: format!("{}/{}:generateContent", BASE_URL, model),
        })
    }

    fn build_request(request: &ReasoningRequest) -> GeminiRequest {
        GeminiRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: request.prompt.clone(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.1,
                top_p: 0.9,
                top_k: 40,
                max_output_tokens: 2048,
            },
            system_instruction: SystemInstruction {
                parts: vec![Part {
                    text: request.system.clone(),
                }],
            },
        }
    }
}

#[async_trait]
impl ReasoningClient for GeminiReasoningClient {
    async fn generate(&self, request: &ReasoningRequest) -> Result<String> {
        if self.api_key.is_empty() {
            return Err(PipelineError::ReasoningUnavailable(
                "GEMINI_API_KEY not configured".to_string(),
            ));
        }

        info!(stage = %request.stage, "Calling Gemini API");

        // API key stays out of the URL.
        let response = self
            .client
            .post(&self.endpoint)
            .header(API_KEY_HEADER, self.api_key.as_str())
            .json(&Self::build_request(request))
            .send()
            .await
            .map_err(|e| {
                let e = e.without_url();
                error!(stage = %request.stage, "Gemini API request failed: {}", e);
                let reason = if e.is_timeout() {
                    "request timed out".to_string()
                } else {
                    e.to_string()
                };
                PipelineError::ReasoningUnavailable(format!("Gemini API error: {}", reason))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!(stage = %request.stage, %status, "Gemini API error response: {}", error_text);

            let reason = if status == StatusCode::TOO_MANY_REQUESTS {
                "quota exhausted".to_string()
            } else {
                format!("{}: {}", status, error_text)
            };
            return Err(PipelineError::ReasoningUnavailable(format!(
                "Gemini API error: {}",
                reason
            )));
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            let e = e.without_url();
            error!(stage = %request.stage, "Failed to parse Gemini response: {}", e);
            PipelineError::MalformedResponse(format!("Gemini parse error: {}", e))
        })?;

        let text = extract_text(gemini_response)?;

        info!(stage = %request.stage, chars = text.len(), "Gemini response received");

        Ok(text)
    }
}

/// Pull the first candidate's text, rejecting empty answers.
fn extract_text(response: GeminiResponse) -> Result<String> {
    let candidate = response.candidates.into_iter().next().ok_or_else(|| {
        PipelineError::MalformedResponse("No candidates in Gemini response".to_string())
    })?;

    let text: String = candidate
        .content
        .map(|content| content.parts.into_iter().map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(PipelineError::MalformedResponse(format!(
            "Empty response from Gemini (finish reason: {})",
            candidate.finish_reason.as_deref().unwrap_or("unknown")
        )));
    }

    Ok(text)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
    system_instruction: SystemInstruction,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: i32,
    max_output_tokens: i32,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}
