//! Stub collaborators shared by the unit test suites

use crate::cache::TransactionCache;
use crate::error::PipelineError;
use crate::models::{Stage, Transaction};
use crate::reasoning::{ReasoningClient, ReasoningRequest};
use crate::store::TransactionStore;
use crate::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal_macros::dec;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// +5000 salary, -1200 rent, -300 groceries.
pub fn sample_transactions(user_id: &str) -> Vec<Transaction> {
    let row = |day: u32, description: &str, amount, category: &str| Transaction {
        date: NaiveDate::from_ymd_opt(2024, 7, day).unwrap(),
        description: description.to_string(),
        amount,
        category: category.to_string(),
        bank_name: "First National".to_string(),
        user_id: user_id.to_string(),
    };

    vec![
        row(28, "Corner grocery run", dec!(-300), "groceries"),
        row(15, "July rent transfer", dec!(-1200), "housing"),
        row(1, "Employer payroll deposit", dec!(5000), "income"),
    ]
}

/// Returns fixed rows and counts calls.
pub struct CountingStore {
    rows: Vec<Transaction>,
    calls: AtomicUsize,
}

impl CountingStore {
    pub fn new(rows: Vec<Transaction>) -> Self {
        Self {
            rows,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransactionStore for CountingStore {
    async fn fetch_transactions(&self, _user_id: &str) -> Result<Vec<Transaction>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.rows.clone())
    }
}

pub struct FailingStore;

#[async_trait]
impl TransactionStore for FailingStore {
    async fn fetch_transactions(&self, _user_id: &str) -> Result<Vec<Transaction>> {
        Err(PipelineError::StoreError("connection refused".to_string()))
    }
}

pub struct FailingCache;

#[async_trait]
impl TransactionCache for FailingCache {
    async fn get(&self, _user_id: &str) -> Result<Option<Vec<u8>>> {
        Err(PipelineError::CacheError("cache offline".to_string()))
    }

    async fn set(&self, _user_id: &str, _bytes: Vec<u8>, _ttl: Duration) -> Result<()> {
        Err(PipelineError::CacheError("cache offline".to_string()))
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Fault {
    Unavailable,
    Malformed,
    Blank,
}

/// Echoes each prompt back, records every request, optionally faults at one stage.
pub struct ScriptedReasoningClient {
    fault: Option<(Stage, Fault)>,
    requests: Mutex<Vec<ReasoningRequest>>,
}

impl ScriptedReasoningClient {
    pub fn echo() -> Self {
        Self {
            fault: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_at(stage: Stage, fault: Fault) -> Self {
        Self {
            fault: Some((stage, fault)),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ReasoningRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReasoningClient for ScriptedReasoningClient {
    async fn generate(&self, request: &ReasoningRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request.clone());

        match self.fault {
            Some((stage, Fault::Unavailable)) if stage == request.stage => Err(
                PipelineError::ReasoningUnavailable("upstream timed out".to_string()),
            ),
            Some((stage, Fault::Malformed)) if stage == request.stage => Err(
                PipelineError::MalformedResponse("no candidates".to_string()),
            ),
            Some((stage, Fault::Blank)) if stage == request.stage => Ok("   ".to_string()),
            _ => Ok(request.prompt.clone()),
        }
    }
}

/// Fails a fixed number of times, then echoes.
pub struct FlakyReasoningClient {
    failures: usize,
    malformed: bool,
    calls: AtomicUsize,
}

impl FlakyReasoningClient {
    pub fn unavailable_times(failures: usize) -> Self {
        Self {
            failures,
            malformed: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn malformed_times(failures: usize) -> Self {
        Self {
            failures,
            malformed: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReasoningClient for FlakyReasoningClient {
    async fn generate(&self, request: &ReasoningRequest) -> Result<String> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            if self.malformed {
                return Err(PipelineError::MalformedResponse("truncated".to_string()));
            }
            return Err(PipelineError::ReasoningUnavailable("quota exhausted".to_string()));
        }
        Ok(request.prompt.clone())
    }
}
