//! Append-only pipeline state
//!
//! One state per run. Results are only ever appended; an entry, once
//! recorded, is never replaced.

use crate::error::{FailureKind, PipelineError};
use crate::models::{PipelinePhase, Stage, StageResult};
use crate::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct PipelineState {
    run_id: Uuid,
    user_id: String,
    started_at: DateTime<Utc>,
    /// Fingerprint of the transaction set the analyzer consumed.
    source_fingerprint: Option<String>,
    results: Vec<StageResult>,
}

impl PipelineState {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            user_id: user_id.into(),
            started_at: Utc::now(),
            source_fingerprint: None,
            results: Vec::with_capacity(Stage::ALL.len()),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn source_fingerprint(&self) -> Option<&str> {
        self.source_fingerprint.as_deref()
    }

    pub(crate) fn set_source_fingerprint(&mut self, fingerprint: String) {
        if self.source_fingerprint.is_none() {
            self.source_fingerprint = Some(fingerprint);
        }
    }

    /// Append a stage result. Recording a stage twice is rejected.
    pub fn record(&mut self, result: StageResult) -> Result<()> {
        if self.get(result.stage).is_some() {
            return Err(PipelineError::StageAlreadyRecorded(result.stage.key().to_string()));
        }
        self.results.push(result);
        Ok(())
    }

    pub fn get(&self, stage: Stage) -> Option<&StageResult> {
        self.results.iter().find(|r| r.stage == stage)
    }

    pub fn get_by_key(&self, key: &str) -> Option<&StageResult> {
        self.results.iter().find(|r| r.stage.key() == key)
    }

    /// Prior result a stage depends on; absent only if the run skipped it.
    pub fn require(&self, stage: Stage) -> Result<&StageResult> {
        self.get(stage)
            .ok_or_else(|| PipelineError::MissingStageResult(stage.key().to_string()))
    }

    /// Keys in creation order.
    pub fn keys(&self) -> Vec<&'static str> {
        self.results.iter().map(|r| r.stage.key()).collect()
    }

    pub fn results(&self) -> &[StageResult] {
        &self.results
    }

    pub fn is_complete(&self) -> bool {
        Stage::ALL.iter().all(|stage| self.get(*stage).is_some())
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StageFailure {
    pub stage: PipelinePhase,
    pub kind: FailureKind,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PipelineStatus {
    Done,
    Failed(StageFailure),
    Aborted { before: PipelinePhase },
}

/// What a caller gets back from a run: the state plus how the run ended
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub state: PipelineState,
    #[serde(flatten)]
    pub status: PipelineStatus,
}

impl PipelineReport {
    pub fn is_done(&self) -> bool {
        self.status == PipelineStatus::Done
    }

    pub fn failure(&self) -> Option<&StageFailure> {
        match &self.status {
            PipelineStatus::Failed(failure) => Some(failure),
            _ => None,
        }
    }
}

/// Cooperative abort flag, honored between stages only
#[derive(Debug, Clone, Default)]
pub struct AbortHandle {
    aborted: Arc<AtomicBool>,
}

impl AbortHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.aborted.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }
}
