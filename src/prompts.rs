//! Stage prompt construction
//!
//! Each builder is a pure function of the results that precede its stage.
//! No builder accepts pipeline state, so a stage cannot look ahead.

use crate::error::PipelineError;
use crate::metrics::format_money;
use crate::models::{Metrics, Stage, TransactionSummary};
use crate::reasoning::ReasoningRequest;
use crate::Result;
use regex::Regex;
use std::sync::OnceLock;

const ANALYST_ROLE: &str = "You are a meticulous financial analyst AI.";
const BUDGET_ROLE: &str = "You are a friendly budgeting expert.";
const INVESTOR_ROLE: &str =
    "You are a financial educator providing beginner-friendly investment advice.";

/// Analyzer input: metrics plus the structured summary of the same set.
pub fn analysis_request(metrics: &Metrics, summary: &TransactionSummary) -> ReasoningRequest {
    let mut prompt = format!(
        "Here is the user's transaction summary:\n\
         Total Income: {}\n\
         Total Spending: {}\n\
         Net Flow: {}\n\
         {}\n",
        format_money(metrics.total_income),
        format_money(metrics.total_spending),
        format_money(metrics.net_flow),
        summary.headline()
    );

    if !summary.spending_by_category.is_empty() {
        prompt.push_str("\nSpending by category:\n");
        for (category, amount) in &summary.spending_by_category {
            prompt.push_str(&format!("- {}: {}\n", category, format_money(*amount)));
        }
    }

    prompt.push_str("\nProvide a detailed financial analysis in markdown.");

    ReasoningRequest {
        stage: Stage::Analysis,
        system: ANALYST_ROLE.to_string(),
        prompt,
    }
}

/// Budgetor input: the analysis narrative and nothing else.
pub fn budget_request(analysis_narrative: &str) -> ReasoningRequest {
    ReasoningRequest {
        stage: Stage::Budget,
        system: BUDGET_ROLE.to_string(),
        prompt: format!(
            "Here is the user's financial analysis:\n\n{}\n\n\
             Create a detailed, encouraging budget plan.",
            analysis_narrative
        ),
    }
}

/// Investor input: the budget narrative and nothing else.
pub fn investment_request(budget_narrative: &str) -> ReasoningRequest {
    ReasoningRequest {
        stage: Stage::Investment,
        system: INVESTOR_ROLE.to_string(),
        prompt: format!(
            "Here is the user's budget plan:\n\n{}\n\n\
             Provide personalized investment suggestions.",
            budget_narrative
        ),
    }
}

fn echoed_json_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^json\s+\{.*?\}\s*").expect("valid regex"))
}

/// Analysis narrative: a fenced JSON metrics block, then the model's markdown.
///
/// Models sometimes echo the metrics as a bare `json {...}` line; those lines
/// are dropped so the fenced block stays the only copy.
pub fn analysis_narrative(metrics: &Metrics, model_markdown: &str) -> Result<String> {
    let metrics_json = serde_json::to_string(metrics)?;
    let cleaned = echoed_json_line().replace_all(model_markdown, "");

    Ok(format!("```json\n{}\n```\n\n{}", metrics_json, cleaned))
}

/// Read the metrics back out of an analysis narrative.
pub fn parse_metrics_block(narrative: &str) -> Result<Metrics> {
    let start = narrative.find("```json").ok_or_else(|| {
        PipelineError::MalformedResponse("Analysis is missing its JSON metrics block".to_string())
    })?;
    let after_fence = &narrative[start + 7..];
    let end = after_fence.find("```").ok_or_else(|| {
        PipelineError::MalformedResponse("Unterminated JSON metrics block".to_string())
    })?;

    serde_json::from_str(after_fence[..end].trim()).map_err(|e| {
        PipelineError::MalformedResponse(format!("Invalid JSON metrics block: {}", e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn metrics() -> Metrics {
        Metrics {
            total_income: dec!(5000),
            total_spending: dec!(1500),
            net_flow: dec!(3500),
        }
    }

    #[test]
    fn test_analysis_request_carries_metrics() {
        let request = analysis_request(&metrics(), &TransactionSummary::default());
        assert_eq!(request.stage, Stage::Analysis);
        assert!(request.prompt.contains("Total Income: 5,000.00"));
        assert!(request.prompt.contains("Total Spending: 1,500.00"));
        assert!(request.prompt.contains("Net Flow: 3,500.00"));
        assert!(request.prompt.contains("No transactions found for this user."));
    }

    #[test]
    fn test_downstream_requests_embed_only_prior_text() {
        let budget = budget_request("ANALYSIS-TEXT");
        assert_eq!(budget.stage, Stage::Budget);
        assert!(budget.prompt.contains("ANALYSIS-TEXT"));

        let investment = investment_request("BUDGET-TEXT");
        assert_eq!(investment.stage, Stage::Investment);
        assert!(investment.prompt.contains("BUDGET-TEXT"));
        assert!(!investment.prompt.contains("ANALYSIS-TEXT"));
    }

    #[test]
    fn test_narrative_strips_echoed_json_line() {
        let raw = "json {\"total_income\": 5000}\n## Overview\nYou saved well.";
        let narrative = analysis_narrative(&metrics(), raw).unwrap();

        assert!(narrative.starts_with("```json\n"));
        assert!(!narrative.contains("json {\"total_income\""));
        assert!(narrative.ends_with("## Overview\nYou saved well."));
    }

    #[test]
    fn test_metrics_block_round_trip() {
        let narrative = analysis_narrative(&metrics(), "## Overview").unwrap();
        assert_eq!(parse_metrics_block(&narrative).unwrap(), metrics());
    }

    #[test]
    fn test_missing_metrics_block_is_malformed() {
        let err = parse_metrics_block("## Overview only").unwrap_err();
        assert!(matches!(err, PipelineError::MalformedResponse(_)));

        let err = parse_metrics_block("```json\n{\"total_income\": ").unwrap_err();
        assert!(matches!(err, PipelineError::MalformedResponse(_)));
    }
}
