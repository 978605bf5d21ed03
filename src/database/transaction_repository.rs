use crate::database::error::{DatabaseError, DatabaseErrorKind};
use crate::database::repository::TransactionStore;
use crate::database::transaction::{
    NewTransaction, Outcome, Settlement, Transaction, TransactionDetails,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use tracing::debug;
use uuid::Uuid;

const COLUMNS: &str =
    "id, user_id, type, amount, status, reference, details, external_reference, created_at";

/// Raw `transactions` row
#[derive(Debug, Clone, FromRow)]
struct TransactionRow {
    id: Uuid,
    user_id: String,
    #[sqlx(rename = "type")]
    service_type: String,
    amount: Decimal,
    status: String,
    reference: String,
    details: serde_json::Value,
    external_reference: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = DatabaseError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        let mut details: TransactionDetails = serde_json::from_value(row.details)
            .map_err(|e| DatabaseError::decode(format!("details: {}", e)))?;

        // The indexed column is authoritative for the provider reference
        if let Some(Outcome::Success {
            external_reference, ..
        }) = details.outcome.as_mut()
        {
            if row.external_reference.is_some() {
                *external_reference = row.external_reference;
            }
        }

        Ok(Transaction {
            id: row.id,
            user_id: row.user_id,
            service_type: row.service_type.parse().map_err(DatabaseError::decode)?,
            amount: row.amount,
            status: row.status.parse().map_err(DatabaseError::decode)?,
            reference: row.reference,
            details,
            created_at: row.created_at,
        })
    }
}

fn into_transactions(rows: Vec<TransactionRow>) -> Result<Vec<Transaction>, DatabaseError> {
    rows.into_iter().map(Transaction::try_from).collect()
}

/// Postgres-backed transaction repository
pub struct TransactionRepository {
    pool: PgPool,
}

impl TransactionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get transaction count for a user
    pub async fn count_by_user(&self, user_id: &str) -> Result<i64, DatabaseError> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM transactions WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(DatabaseError::from_sqlx)
    }

    async fn current_status(&self, id: Uuid) -> Result<Option<String>, DatabaseError> {
        sqlx::query_scalar::<_, String>("SELECT status FROM transactions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from_sqlx)
    }
}

#[async_trait]
impl TransactionStore for TransactionRepository {
    async fn insert(&self, new: NewTransaction) -> Result<Transaction, DatabaseError> {
        let details = serde_json::to_value(&new.details)
            .map_err(|e| DatabaseError::decode(format!("details: {}", e)))?;

        let row = sqlx::query_as::<_, TransactionRow>(&format!(
            "INSERT INTO transactions (user_id, type, amount, status, reference, details) \
             VALUES ($1, $2, $3, 'pending', $4, $5) \
             RETURNING {}",
            COLUMNS
        ))
        .bind(&new.user_id)
        .bind(new.service_type.as_str())
        .bind(new.amount)
        .bind(&new.reference)
        .bind(details)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        debug!("Inserted pending transaction {} ({})", row.id, row.reference);
        row.try_into()
    }

    async fn update(&self, id: Uuid, settlement: &Settlement) -> Result<(), DatabaseError> {
        let external_reference = match &settlement.outcome {
            Outcome::Success {
                external_reference, ..
            } => external_reference.clone(),
            _ => None,
        };

        // Merge-only on details; the status guard keeps terminal rows terminal
        let result = sqlx::query(
            "UPDATE transactions \
             SET status = $1, details = details || $2::jsonb, \
                 external_reference = COALESCE($3, external_reference) \
             WHERE id = $4 AND status = 'pending'",
        )
        .bind(settlement.status.as_str())
        .bind(settlement.details_patch())
        .bind(external_reference)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        if result.rows_affected() == 0 {
            return match self.current_status(id).await? {
                Some(current) => Err(DatabaseError::new(
                    DatabaseErrorKind::InvalidStateTransition {
                        id: id.to_string(),
                        current,
                    },
                )),
                None => Err(DatabaseError::not_found("Transaction", id.to_string())),
            };
        }
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Transaction>, DatabaseError> {
        sqlx::query_as::<_, TransactionRow>(&format!(
            "SELECT {} FROM transactions WHERE id = $1",
            COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?
        .map(Transaction::try_from)
        .transpose()
    }

    async fn find_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Transaction>, DatabaseError> {
        sqlx::query_as::<_, TransactionRow>(&format!(
            "SELECT {} FROM transactions WHERE reference = $1",
            COLUMNS
        ))
        .bind(reference)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?
        .map(Transaction::try_from)
        .transpose()
    }

    async fn find_by_user(
        &self,
        user_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Transaction>, DatabaseError> {
        let rows = sqlx::query_as::<_, TransactionRow>(&format!(
            "SELECT {} FROM transactions WHERE user_id = $1 \
             ORDER BY created_at DESC LIMIT $2 OFFSET $3",
            COLUMNS
        ))
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        into_transactions(rows)
    }

    async fn find_pending_older_than(
        &self,
        cutoff: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Transaction>, DatabaseError> {
        let rows = sqlx::query_as::<_, TransactionRow>(&format!(
            "SELECT {} FROM transactions WHERE status = 'pending' AND created_at < $1 \
             ORDER BY created_at ASC LIMIT $2",
            COLUMNS
        ))
        .bind(cutoff)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        into_transactions(rows)
    }
}
