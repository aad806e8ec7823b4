//! Core data models for the financial insight pipeline

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::sync::Arc;

//
// ================= Transactions =================
//

/// A single transaction row as returned by the store.
///
/// `amount` is signed at the store boundary: positive is income (credit),
/// negative is spending (debit), zero counts toward neither total.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
pub struct Transaction {
    pub date: NaiveDate,
    pub description: String,
    pub amount: Decimal,
    pub category: String,
    pub bank_name: String,
    pub user_id: String,
}

impl Transaction {
    pub fn is_credit(&self) -> bool {
        self.amount.is_sign_positive() && !self.amount.is_zero()
    }

    pub fn is_debit(&self) -> bool {
        self.amount.is_sign_negative() && !self.amount.is_zero()
    }
}

/// Ordered, immutable transactions for one user.
///
/// The rows sit behind an `Arc` so the analyzer and the metrics computer
/// share one fetched set without copying it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransactionSet {
    user_id: String,
    transactions: Arc<[Transaction]>,
}

impl TransactionSet {
    pub fn new(user_id: impl Into<String>, transactions: Vec<Transaction>) -> Self {
        Self {
            user_id: user_id.into(),
            transactions: transactions.into(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
        self.transactions.iter()
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// SHA-256 over the serialized set, hex encoded.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();

        if serde_json::to_writer(&mut HashWriter(&mut hasher), self).is_err() {
            return String::new();
        }

        hex::encode(hasher.finalize())
    }
}

/// Adapter to allow writing into Sha256 via std::io::Write
struct HashWriter<'a, H: Digest>(&'a mut H);

impl<'a, H: Digest> Write for HashWriter<'a, H> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

//
// ================= Metrics =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Metrics {
    pub total_income: Decimal,
    /// Absolute value of all debits.
    pub total_spending: Decimal,
    pub net_flow: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct TransactionSummary {
    pub transaction_count: usize,
    pub largest_amount: Option<Decimal>,
    pub smallest_amount: Option<Decimal>,
    /// Absolute debit totals per category.
    pub spending_by_category: BTreeMap<String, Decimal>,
}

//
// ================= Stages =================
//

/// The three reasoning stages, in execution order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Analysis,
    Budget,
    Investment,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Analysis, Stage::Budget, Stage::Investment];

    /// Key under which the stage result is stored.
    pub fn key(&self) -> &'static str {
        match self {
            Stage::Analysis => "analysis",
            Stage::Budget => "budget",
            Stage::Investment => "investment",
        }
    }

    /// State machine phase that produces this stage's result.
    pub fn phase(&self) -> PipelinePhase {
        match self {
            Stage::Analysis => PipelinePhase::Analyzing,
            Stage::Budget => PipelinePhase::Budgeting,
            Stage::Investment => PipelinePhase::Investing,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PipelinePhase {
    Start,
    Analyzing,
    Budgeting,
    Investing,
    Done,
}

impl PipelinePhase {
    /// Next phase on success; `Done` is terminal.
    pub fn next(&self) -> PipelinePhase {
        match self {
            PipelinePhase::Start => PipelinePhase::Analyzing,
            PipelinePhase::Analyzing => PipelinePhase::Budgeting,
            PipelinePhase::Budgeting => PipelinePhase::Investing,
            PipelinePhase::Investing | PipelinePhase::Done => PipelinePhase::Done,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PipelinePhase::Start => "start",
            PipelinePhase::Analyzing => "analyzing",
            PipelinePhase::Budgeting => "budgeting",
            PipelinePhase::Investing => "investing",
            PipelinePhase::Done => "done",
        }
    }
}

impl fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-stage structured payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum StagePayload {
    Metrics(Metrics),
    None,
}

impl StagePayload {
    pub fn metrics(&self) -> Option<&Metrics> {
        match self {
            StagePayload::Metrics(metrics) => Some(metrics),
            StagePayload::None => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StageResult {
    pub stage: Stage,
    /// Markdown produced for this stage.
    pub narrative_text: String,
    pub structured_payload: StagePayload,
    pub created_at: DateTime<Utc>,
}

impl StageResult {
    pub fn new(stage: Stage, narrative_text: String, structured_payload: StagePayload) -> Self {
        Self {
            stage,
            narrative_text,
            structured_payload,
            created_at: Utc::now(),
        }
    }
}
