//! Pipeline state machine
//!
//! START → ANALYZING → BUDGETING → INVESTING → DONE
//!
//! Any stage failure ends the run as FAILED(stage) with the results
//! recorded so far. Nothing is retried and no stage runs on degraded input.

use crate::error::PipelineError;
use crate::metrics;
use crate::models::{PipelinePhase, Stage, StagePayload, StageResult};
use crate::prompts;
use crate::reasoning::{ReasoningClient, ReasoningRequest};
use crate::retriever::CacheAsideRetriever;
use crate::Result;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

pub mod state;
pub use state::{AbortHandle, PipelineReport, PipelineState, PipelineStatus, StageFailure};

/// Runs the analyzer, budgetor and investor stages for one user at a time
pub struct Pipeline {
    retriever: CacheAsideRetriever,
    reasoning: Arc<dyn ReasoningClient>,
}

impl Pipeline {
    pub fn new(retriever: CacheAsideRetriever, reasoning: Arc<dyn ReasoningClient>) -> Self {
        Self {
            retriever,
            reasoning,
        }
    }

    /// Run every stage for `user_id`.
    pub async fn run(&self, user_id: &str) -> PipelineReport {
        self.run_with_abort(user_id, &AbortHandle::new()).await
    }

    /// Run every stage, stopping before the next stage once `abort` fires.
    ///
    /// A stage that has started always runs to completion or failure.
    pub async fn run_with_abort(&self, user_id: &str, abort: &AbortHandle) -> PipelineReport {
        let start_time = Instant::now();
        let mut state = PipelineState::new(user_id);
        let mut phase = PipelinePhase::Start;

        info!(
            run_id = %state.run_id(),
            user_id = %user_id,
            "Pipeline: starting run"
        );

        for stage in Stage::ALL {
            if abort.is_aborted() {
                warn!(
                    run_id = %state.run_id(),
                    before = %stage.phase(),
                    "Pipeline aborted between stages"
                );
                return PipelineReport {
                    state,
                    status: PipelineStatus::Aborted {
                        before: stage.phase(),
                    },
                };
            }

            phase = phase.next();
            debug!(run_id = %state.run_id(), phase = %phase, "Stage started");

            let outcome = match stage {
                Stage::Analysis => self.analyze(user_id).await.map(|(result, fingerprint)| {
                    state.set_source_fingerprint(fingerprint);
                    result
                }),
                Stage::Budget => match state.require(Stage::Analysis) {
                    Ok(analysis) => self.budget(analysis).await,
                    Err(e) => Err(e),
                },
                Stage::Investment => match state.require(Stage::Budget) {
                    Ok(budget) => self.invest(budget).await,
                    Err(e) => Err(e),
                },
            };

            let recorded = outcome.and_then(|result| state.record(result));
            if let Err(e) = recorded {
                let failure = StageFailure {
                    stage: phase,
                    kind: e.failure_kind(),
                    reason: e.to_string(),
                };

                error!(
                    run_id = %state.run_id(),
                    stage = %phase,
                    kind = %failure.kind,
                    completed = ?state.keys(),
                    "Stage failed: {}",
                    failure.reason
                );

                return PipelineReport {
                    state,
                    status: PipelineStatus::Failed(failure),
                };
            }

            info!(run_id = %state.run_id(), stage = %stage, "Stage completed");
        }

        info!(
            run_id = %state.run_id(),
            user_id = %user_id,
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "Pipeline: run complete"
        );

        PipelineReport {
            state,
            status: PipelineStatus::Done,
        }
    }

    /// Analyzer: one fetched set feeds both the metrics and the prompt.
    async fn analyze(&self, user_id: &str) -> Result<(StageResult, String)> {
        let transactions = self.retriever.fetch(user_id).await?;
        let metrics = metrics::compute(&transactions)?;
        let summary = metrics::summarize(&transactions)?;

        debug!(
            user_id = %user_id,
            transaction_count = transactions.len(),
            net_flow = %metrics.net_flow,
            "Metrics computed"
        );

        let request = prompts::analysis_request(&metrics, &summary);
        let markdown = self.generate(&request).await?;
        let narrative = prompts::analysis_narrative(&metrics, &markdown)?;

        Ok((
            StageResult::new(Stage::Analysis, narrative, StagePayload::Metrics(metrics)),
            transactions.fingerprint(),
        ))
    }

    /// Budgetor: sees the analysis narrative only.
    async fn budget(&self, analysis: &StageResult) -> Result<StageResult> {
        let request = prompts::budget_request(&analysis.narrative_text);
        let plan = self.generate(&request).await?;
        Ok(StageResult::new(Stage::Budget, plan, StagePayload::None))
    }

    /// Investor: sees the budget narrative only.
    async fn invest(&self, budget: &StageResult) -> Result<StageResult> {
        let request = prompts::investment_request(&budget.narrative_text);
        let recommendations = self.generate(&request).await?;
        Ok(StageResult::new(Stage::Investment, recommendations, StagePayload::None))
    }

    async fn generate(&self, request: &ReasoningRequest) -> Result<String> {
        let text = self.reasoning.generate(request).await?;
        if text.trim().is_empty() {
            return Err(PipelineError::MalformedResponse(format!(
                "Empty {} response",
                request.stage
            )));
        }
        Ok(text)
    }
}
