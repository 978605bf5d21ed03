//! Purchase orchestration
//!
//! Every airtime or data attempt produces exactly two writes: a `pending`
//! insert before the provider is called, and one settlement afterwards.
//! Settlement write failures are logged and never replace the outcome the
//! caller sees; such rows stay `pending` and can be found with
//! `TransactionStore::find_pending_older_than`.

use crate::database::error::DatabaseError;
use crate::database::repository::TransactionStore;
use crate::database::transaction::{
    NewTransaction, RequestDetails, ServiceType, Settlement, Transaction, TransactionDetails,
};
use crate::error::BillingError;
use crate::payments::traits::VtuGateway;
use crate::payments::types::AirtimeRequest;
use crate::services::classify::{classify, FailureCategory, UserFacingError};
use crate::services::reference::generate_transaction_reference;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

pub const DATA_ENDPOINT_UNAVAILABLE: &str =
    "Data purchase API endpoint is not available from SME Plug. Cannot complete transaction.";
pub const ELECTRICITY_UNSUPPORTED: &str =
    "Electricity payment is not supported by the current provider.";

/// Data bundle purchase parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPurchase {
    pub network: String,
    pub plan: String,
    pub phone_number: String,
    pub amount: Decimal,
}

/// Electricity token purchase parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElectricityPurchase {
    pub disco: String,
    pub meter_number: String,
    pub meter_type: String,
    pub amount: Decimal,
}

/// A purchase attempt, by service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PurchaseRequest {
    Airtime(AirtimeRequest),
    Data(DataPurchase),
    Electricity(ElectricityPurchase),
}

impl PurchaseRequest {
    pub fn service_type(&self) -> ServiceType {
        match self {
            PurchaseRequest::Airtime(_) => ServiceType::Airtime,
            PurchaseRequest::Data(_) => ServiceType::Data,
            PurchaseRequest::Electricity(_) => ServiceType::Electricity,
        }
    }
}

/// Error returned to callers of the purchase service
#[derive(Debug, Error)]
pub enum PurchaseError {
    /// The pending row could not be written; the provider was not called
    #[error("Failed to create transaction record. Please try again.")]
    RecordCreation(#[source] DatabaseError),

    /// The attempt was recorded and settled as failed
    #[error("{}", .failure.message)]
    Failed {
        transaction_id: Uuid,
        reference: String,
        failure: UserFacingError,
        #[source]
        cause: BillingError,
    },

    /// The service type has no working purchase path; nothing was recorded
    #[error("{message}")]
    Unsupported {
        service: ServiceType,
        message: String,
    },
}

impl PurchaseError {
    pub fn category(&self) -> FailureCategory {
        match self {
            PurchaseError::Failed { failure, .. } => failure.category,
            _ => FailureCategory::Other,
        }
    }

    /// ID of the failed row, when one was created
    pub fn transaction_id(&self) -> Option<Uuid> {
        match self {
            PurchaseError::Failed { transaction_id, .. } => Some(*transaction_id),
            _ => None,
        }
    }
}

/// Orchestrates purchase attempts against a store and a gateway
#[derive(Clone)]
pub struct PurchaseService {
    store: Arc<dyn TransactionStore>,
    gateway: Arc<dyn VtuGateway>,
}

impl PurchaseService {
    pub fn new(store: Arc<dyn TransactionStore>, gateway: Arc<dyn VtuGateway>) -> Self {
        Self { store, gateway }
    }

    /// Run one purchase attempt for `user_id`
    pub async fn purchase(
        &self,
        user_id: &str,
        request: PurchaseRequest,
    ) -> Result<Transaction, PurchaseError> {
        match request {
            PurchaseRequest::Airtime(airtime) => self.purchase_airtime(user_id, airtime).await,
            PurchaseRequest::Data(data) => self.purchase_data(user_id, data).await,
            PurchaseRequest::Electricity(_) => {
                warn!("Rejected electricity purchase for user {}", user_id);
                Err(PurchaseError::Unsupported {
                    service: ServiceType::Electricity,
                    message: ELECTRICITY_UNSUPPORTED.to_string(),
                })
            }
        }
    }

    pub async fn purchase_airtime(
        &self,
        user_id: &str,
        request: AirtimeRequest,
    ) -> Result<Transaction, PurchaseError> {
        let details = TransactionDetails::new(RequestDetails::Airtime {
            network: request.network.clone(),
            phone: request.phone_number.clone(),
        });
        let transaction = self
            .create_pending(user_id, ServiceType::Airtime, request.amount, details)
            .await?;

        match self.gateway.purchase_airtime(&request).await {
            Ok(receipt) => {
                let settlement = Settlement::success(receipt.raw, receipt.external_reference);
                Ok(self.settle_success(transaction, settlement).await)
            }
            Err(e) => Err(self.settle_failure(transaction, e).await),
        }
    }

    /// Records the attempt, then fails: the provider has no data purchase
    /// endpoint.
    pub async fn purchase_data(
        &self,
        user_id: &str,
        request: DataPurchase,
    ) -> Result<Transaction, PurchaseError> {
        let details = TransactionDetails::new(RequestDetails::Data {
            network: request.network,
            plan: request.plan,
            phone: request.phone_number,
        });
        let transaction = self
            .create_pending(user_id, ServiceType::Data, request.amount, details)
            .await?;

        let unavailable = BillingError::unsupported(ServiceType::Data, DATA_ENDPOINT_UNAVAILABLE);
        Err(self.settle_failure(transaction, unavailable).await)
    }

    async fn create_pending(
        &self,
        user_id: &str,
        service_type: ServiceType,
        amount: Decimal,
        details: TransactionDetails,
    ) -> Result<Transaction, PurchaseError> {
        let new = NewTransaction {
            user_id: user_id.to_string(),
            service_type,
            amount,
            reference: generate_transaction_reference(),
            details,
        };

        let transaction = self.store.insert(new).await.map_err(|e| {
            error!(
                "Database error creating {} transaction for user {}: {}",
                service_type, user_id, e
            );
            PurchaseError::RecordCreation(e)
        })?;

        info!(
            transaction_id = %transaction.id,
            reference = %transaction.reference,
            "Created pending {} transaction for user {}",
            service_type,
            user_id
        );
        Ok(transaction)
    }

    async fn settle_success(
        &self,
        mut transaction: Transaction,
        settlement: Settlement,
    ) -> Transaction {
        if let Err(e) = self.store.update(transaction.id, &settlement).await {
            // The provider already accepted the purchase; only the record is stale
            error!(
                transaction_id = %transaction.id,
                reference = %transaction.reference,
                "Database error updating successful transaction: {}",
                e
            );
        }

        transaction.settle(&settlement);
        info!(
            transaction_id = %transaction.id,
            reference = %transaction.reference,
            external_reference = ?transaction.external_reference(),
            "Transaction succeeded"
        );
        transaction
    }

    async fn settle_failure(&self, transaction: Transaction, cause: BillingError) -> PurchaseError {
        warn!(
            transaction_id = %transaction.id,
            reference = %transaction.reference,
            "{} purchase failed: {}",
            transaction.service_type,
            cause
        );

        let settlement = Settlement::failed(cause.to_string());
        if let Err(e) = self.store.update(transaction.id, &settlement).await {
            error!(
                transaction_id = %transaction.id,
                reference = %transaction.reference,
                "Database error updating failed transaction: {}",
                e
            );
        }

        PurchaseError::Failed {
            transaction_id: transaction.id,
            reference: transaction.reference,
            failure: classify(&cause),
            cause,
        }
    }
}
