//! Postgres-backed transaction store
//!
//! Reads the `transactions` table of the analytical database.

use super::TransactionStore;
use crate::error::PipelineError;
use crate::models::Transaction;
use crate::Result;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{debug, error};

const FETCH_TRANSACTIONS_SQL: &str = r#"
    SELECT date, description, amount, category, bank_name, user_id
    FROM transactions
    WHERE user_id = $1
    ORDER BY date DESC
"#;

pub struct PostgresTransactionStore {
    pool: PgPool,
}

impl PostgresTransactionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Build a lazily-connecting pool; nothing is dialed until the first query.
    pub fn connect_lazy(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect_lazy(database_url)
            .map_err(|e| {
                PipelineError::StoreError(format!("Failed to configure postgres pool: {}", e))
            })?;

        Ok(Self::new(pool))
    }
}

#[async_trait::async_trait]
impl TransactionStore for PostgresTransactionStore {
    async fn fetch_transactions(&self, user_id: &str) -> Result<Vec<Transaction>> {
        let rows = sqlx::query_as::<_, Transaction>(FETCH_TRANSACTIONS_SQL)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!(user_id = %user_id, "Transaction query failed: {}", e);
                PipelineError::StoreError(format!(
                    "Failed to load transactions for {}: {}",
                    user_id, e
                ))
            })?;

        debug!(user_id = %user_id, rows = rows.len(), "Loaded transactions from postgres");

        Ok(rows)
    }
}
