//! In-memory transaction store
//!
//! Thread-safe store backed by `Arc<RwLock<HashMap>>`. Used in tests and by
//! callers that embed the billing layer without Postgres.

use crate::database::error::{DatabaseError, DatabaseErrorKind};
use crate::database::repository::TransactionStore;
use crate::database::transaction::{NewTransaction, Settlement, Transaction, TransactionStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default, Clone)]
pub struct InMemoryTransactionStore {
    transactions: Arc<RwLock<HashMap<Uuid, Transaction>>>,
}

impl InMemoryTransactionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.transactions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.transactions.read().await.is_empty()
    }

    pub async fn all(&self) -> Vec<Transaction> {
        let mut rows: Vec<_> = self.transactions.read().await.values().cloned().collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows
    }
}

#[async_trait]
impl TransactionStore for InMemoryTransactionStore {
    async fn insert(&self, new: NewTransaction) -> Result<Transaction, DatabaseError> {
        let mut transactions = self.transactions.write().await;

        if transactions.values().any(|t| t.reference == new.reference) {
            return Err(DatabaseError::new(
                DatabaseErrorKind::UniqueConstraintViolation {
                    column: "reference".to_string(),
                    value: new.reference,
                },
            ));
        }

        let transaction = Transaction {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            service_type: new.service_type,
            amount: new.amount,
            status: TransactionStatus::Pending,
            reference: new.reference,
            details: new.details,
            created_at: Utc::now(),
        };
        transactions.insert(transaction.id, transaction.clone());
        Ok(transaction)
    }

    async fn update(&self, id: Uuid, settlement: &Settlement) -> Result<(), DatabaseError> {
        let mut transactions = self.transactions.write().await;
        let transaction = transactions
            .get_mut(&id)
            .ok_or_else(|| DatabaseError::not_found("Transaction", id.to_string()))?;

        let current = transaction.status;
        if !transaction.settle(settlement) {
            return Err(DatabaseError::new(
                DatabaseErrorKind::InvalidStateTransition {
                    id: id.to_string(),
                    current: current.to_string(),
                },
            ));
        }
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Transaction>, DatabaseError> {
        Ok(self.transactions.read().await.get(&id).cloned())
    }

    async fn find_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Transaction>, DatabaseError> {
        Ok(self
            .transactions
            .read()
            .await
            .values()
            .find(|t| t.reference == reference)
            .cloned())
    }

    async fn find_by_user(
        &self,
        user_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Transaction>, DatabaseError> {
        Ok(self
            .all()
            .await
            .into_iter()
            .filter(|t| t.user_id == user_id)
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn find_pending_older_than(
        &self,
        cutoff: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Transaction>, DatabaseError> {
        let mut rows: Vec<_> = self
            .all()
            .await
            .into_iter()
            .filter(|t| t.status == TransactionStatus::Pending && t.created_at < cutoff)
            .collect();
        rows.reverse();
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }
}
