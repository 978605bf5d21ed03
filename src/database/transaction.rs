//! Transaction entity and its typed details payload
//!
//! A transaction row records one purchase attempt. It is inserted as
//! `pending` before the provider is called and settled exactly once.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Current version of the `details` payload layout
pub const DETAILS_VERSION: u8 = 1;

/// Provider tag recorded on every transaction
pub const SERVICE_PROVIDER: &str = "smeplug";

/// Purchasable service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceType {
    Airtime,
    Data,
    Electricity,
}

impl ServiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Airtime => "airtime",
            ServiceType::Data => "data",
            ServiceType::Electricity => "electricity",
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "airtime" => Ok(ServiceType::Airtime),
            "data" => Ok(ServiceType::Data),
            "electricity" => Ok(ServiceType::Electricity),
            other => Err(format!("unknown service type '{}'", other)),
        }
    }
}

/// Transaction status. `Success` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Success,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Success => "success",
            TransactionStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransactionStatus::Pending)
    }

    /// Only `pending -> success | failed` is allowed
    pub fn can_transition_to(&self, next: TransactionStatus) -> bool {
        *self == TransactionStatus::Pending && next.is_terminal()
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TransactionStatus::Pending),
            "success" => Ok(TransactionStatus::Success),
            "failed" => Ok(TransactionStatus::Failed),
            other => Err(format!("unknown transaction status '{}'", other)),
        }
    }
}

/// Request parameters captured when the row is created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "service", rename_all = "lowercase")]
pub enum RequestDetails {
    Airtime {
        network: String,
        phone: String,
    },
    Data {
        network: String,
        plan: String,
        phone: String,
    },
}

/// Settlement information, added once when the row leaves `pending`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "lowercase")]
pub enum Outcome {
    Success {
        raw_provider_response: serde_json::Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        external_reference: Option<String>,
    },
    Failed {
        error: String,
        error_time: DateTime<Utc>,
    },
}

/// Structured `details` column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionDetails {
    pub version: u8,
    pub service_provider: String,
    pub request: RequestDetails,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
}

impl TransactionDetails {
    pub fn new(request: RequestDetails) -> Self {
        Self {
            version: DETAILS_VERSION,
            service_provider: SERVICE_PROVIDER.to_string(),
            request,
            outcome: None,
        }
    }

    pub fn external_reference(&self) -> Option<&str> {
        match &self.outcome {
            Some(Outcome::Success {
                external_reference, ..
            }) => external_reference.as_deref(),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            Some(Outcome::Failed { error, .. }) => Some(error),
            _ => None,
        }
    }
}

/// Settlement write applied to a pending row
#[derive(Debug, Clone, PartialEq)]
pub struct Settlement {
    pub status: TransactionStatus,
    pub outcome: Outcome,
}

impl Settlement {
    pub fn success(
        raw_provider_response: serde_json::Value,
        external_reference: Option<String>,
    ) -> Self {
        Self {
            status: TransactionStatus::Success,
            outcome: Outcome::Success {
                raw_provider_response,
                external_reference,
            },
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: TransactionStatus::Failed,
            outcome: Outcome::Failed {
                error: error.into(),
                error_time: Utc::now(),
            },
        }
    }

    /// The JSON object merged into `details`
    pub fn details_patch(&self) -> serde_json::Value {
        serde_json::json!({ "outcome": self.outcome })
    }
}

/// Row to insert; id and created_at are assigned by the store
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub user_id: String,
    pub service_type: ServiceType,
    pub amount: Decimal,
    pub reference: String,
    pub details: TransactionDetails,
}

/// Transaction entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: String,
    #[serde(rename = "type")]
    pub service_type: ServiceType,
    pub amount: Decimal,
    pub status: TransactionStatus,
    pub reference: String,
    pub details: TransactionDetails,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn external_reference(&self) -> Option<&str> {
        self.details.external_reference()
    }

    /// Apply a settlement in memory, mirroring what the store persists
    pub fn settle(&mut self, settlement: &Settlement) -> bool {
        if !self.status.can_transition_to(settlement.status) || self.details.outcome.is_some() {
            return false;
        }
        self.status = settlement.status;
        self.details.outcome = Some(settlement.outcome.clone());
        true
    }
}
