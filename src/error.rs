//! Error types for the financial insight pipeline

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Error, Debug)]
pub enum PipelineError {

    // =============================
    // Core Pipeline Errors
    // =============================

    #[error("Transaction data unavailable: {0}")]
    DataUnavailable(String),

    #[error("Reasoning service unavailable: {0}")]
    ReasoningUnavailable(String),

    #[error("Malformed reasoning response: {0}")]
    MalformedResponse(String),

    #[error("Stage result already recorded: {0}")]
    StageAlreadyRecorded(String),

    #[error("Missing prior stage result: {0}")]
    MissingStageResult(String),

    // =============================
    // Collaborator Errors
    // =============================

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Cache error: {0}")]
    CacheError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),
}

impl PipelineError {
    /// Classify an error into the kind reported to pipeline callers.
    ///
    /// Only the store and cache side reports `DataUnavailable`. Faults while
    /// shaping reasoning output or recording it count as malformed output.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            PipelineError::DataUnavailable(_)
            | PipelineError::StoreError(_)
            | PipelineError::CacheError(_)
            | PipelineError::ConfigError(_) => FailureKind::DataUnavailable,
            PipelineError::ReasoningUnavailable(_) | PipelineError::HttpError(_) => {
                FailureKind::ReasoningUnavailable
            }
            PipelineError::MalformedResponse(_)
            | PipelineError::SerializationError(_)
            | PipelineError::StageAlreadyRecorded(_)
            | PipelineError::MissingStageResult(_) => FailureKind::MalformedResponse,
        }
    }
}

/// Failure kinds surfaced in a failed pipeline report
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    DataUnavailable,
    ReasoningUnavailable,
    /// Structural parse failure of reasoning output; propagates as a reasoning failure.
    MalformedResponse,
}

impl FailureKind {
    pub fn is_reasoning_failure(&self) -> bool {
        matches!(
            self,
            FailureKind::ReasoningUnavailable | FailureKind::MalformedResponse
        )
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::DataUnavailable => "DataUnavailable",
            FailureKind::ReasoningUnavailable => "ReasoningUnavailable",
            FailureKind::MalformedResponse => "MalformedResponse",
        };
        write!(f, "{}", s)
    }
}
