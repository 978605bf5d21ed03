use crate::database::error::DatabaseError;
use crate::database::transaction::{NewTransaction, Settlement, Transaction};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Storage port for purchase transactions
///
/// Implemented by the Postgres repository and by the in-memory store used in
/// tests and embedded setups.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Insert a new `pending` row. The store assigns `id` and `created_at`.
    async fn insert(&self, new: NewTransaction) -> Result<Transaction, DatabaseError>;

    /// Settle a pending row: set its terminal status and merge the outcome
    /// into `details`. Fails if the row is not pending.
    async fn update(&self, id: Uuid, settlement: &Settlement) -> Result<(), DatabaseError>;

    /// Find a transaction by its ID
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Transaction>, DatabaseError>;

    /// Find a transaction by its client-generated reference
    async fn find_by_reference(&self, reference: &str)
        -> Result<Option<Transaction>, DatabaseError>;

    /// List a user's transactions, newest first
    async fn find_by_user(
        &self,
        user_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Transaction>, DatabaseError>;

    /// Rows still `pending` that were created before `cutoff`
    async fn find_pending_older_than(
        &self,
        cutoff: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Transaction>, DatabaseError>;

    /// Check if a transaction exists by ID
    async fn exists(&self, id: Uuid) -> Result<bool, DatabaseError> {
        match self.find_by_id(id).await {
            Ok(Some(_)) => Ok(true),
            Ok(None) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
