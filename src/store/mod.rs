//! Transaction store adapters
//!
//! The store is the durable source of truth for raw transactions.
//! The pipeline only ever reads from it, through the cache-aside retriever.

use crate::models::Transaction;
use crate::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

pub mod postgres;
pub use postgres::PostgresTransactionStore;

/// User ids seeded into the demo store.
pub const SAMPLE_USER_IDS: [&str; 5] = ["user_001", "user_002", "user_003", "user_004", "user_005"];

/// Trait for transaction retrieval
#[async_trait::async_trait]
pub trait TransactionStore: Send + Sync {
    /// Fetch every transaction for a user, in store order.
    ///
    /// An unknown user is an empty list, not an error.
    async fn fetch_transactions(&self, user_id: &str) -> Result<Vec<Transaction>>;
}

/// In-memory transaction store for development and tests
pub struct InMemoryTransactionStore {
    by_user: Arc<RwLock<HashMap<String, Vec<Transaction>>>>,
}

impl InMemoryTransactionStore {
    pub fn new() -> Self {
        Self {
            by_user: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Store pre-loaded with a small ledger for each sample user.
    pub fn with_sample_data() -> Self {
        let mut by_user = HashMap::new();
        for (i, user_id) in SAMPLE_USER_IDS.iter().enumerate() {
            by_user.insert(user_id.to_string(), sample::ledger(user_id, i as u32));
        }

        Self {
            by_user: Arc::new(RwLock::new(by_user)),
        }
    }

    pub async fn insert(&self, transaction: Transaction) {
        let mut by_user = self.by_user.write().await;
        by_user
            .entry(transaction.user_id.clone())
            .or_insert_with(Vec::new)
            .push(transaction);
    }

    pub async fn user_ids(&self) -> Vec<String> {
        let by_user = self.by_user.read().await;
        let mut ids: Vec<String> = by_user.keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl Default for InMemoryTransactionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl TransactionStore for InMemoryTransactionStore {
    async fn fetch_transactions(&self, user_id: &str) -> Result<Vec<Transaction>> {
        let by_user = self.by_user.read().await;
        Ok(by_user.get(user_id).cloned().unwrap_or_default())
    }
}

mod sample {
    use crate::models::Transaction;
    use chrono::{Days, NaiveDate};
    use rust_decimal::Decimal;

    const ROWS: &[(&str, i64, &str, &str)] = &[
        ("Monthly salary", 520000, "income", "First National"),
        ("Apartment rent", -145000, "housing", "First National"),
        ("Grocery market", -18245, "groceries", "City Credit Union"),
        ("Electric utility", -9310, "utilities", "First National"),
        ("Streaming subscription", -1599, "entertainment", "City Credit Union"),
        ("Freelance invoice", 75000, "income", "City Credit Union"),
        ("Restaurant dinner", -6420, "dining", "First National"),
        ("Fuel station", -5230, "transport", "City Credit Union"),
    ];

    /// Deterministic ledger; `variant` shifts amounts so users differ.
    pub(super) fn ledger(user_id: &str, variant: u32) -> Vec<Transaction> {
        let start = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap_or_default();
        let factor = Decimal::from(100 + variant * 15) / Decimal::from(100);

        let mut rows: Vec<Transaction> = ROWS
            .iter()
            .enumerate()
            .map(|(i, (description, cents, category, bank))| Transaction {
                date: start
                    .checked_add_days(Days::new(i as u64 * 3))
                    .unwrap_or(start),
                description: description.to_string(),
                amount: (Decimal::new(*cents, 2) * factor).round_dp(2),
                category: category.to_string(),
                bank_name: bank.to_string(),
                user_id: user_id.to_string(),
            })
            .collect();

        // Newest first, like the warehouse query.
        rows.sort_by(|a, b| b.date.cmp(&a.date));
        rows
    }
}
