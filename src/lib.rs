//! Financial Insight Pipeline
//!
//! A three-stage reasoning pipeline over a user's transaction history:
//! - Analyzer: computes metrics and a narrative analysis
//! - Budgetor: derives a spending plan from the analysis
//! - Investor: derives recommendations from the plan
//!
//! Transactions are read cache-aside (cache → store → populate), and every
//! stage appends to a per-run, append-only state.
//!
//! PIPELINE:
//! FETCH → ANALYZE → BUDGET → INVEST → DONE | FAILED(stage)

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod prompts;
pub mod reasoning;
pub mod retriever;
pub mod store;

#[cfg(test)]
mod test_support;

pub use error::Result;

// Re-export common types
pub use error::{FailureKind, PipelineError};
pub use models::*;
pub use pipeline::{AbortHandle, Pipeline, PipelineReport, PipelineState, PipelineStatus};
