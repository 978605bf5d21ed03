//! Maps low-level billing failures onto user-facing messages

use crate::error::{BillingError, FailureKind};
use serde::Serialize;

pub const NOT_CONFIGURED_MESSAGE: &str =
    "Payment service not configured. Please contact support to set up the payment system.";
pub const CONNECTIVITY_MESSAGE: &str =
    "Unable to connect to payment service. Please check your internet connection and try again.";
pub const AUTHENTICATION_MESSAGE: &str =
    "Payment service authentication error. Please contact support.";
pub const PROVIDER_UNAVAILABLE_MESSAGE: &str =
    "Payment service temporarily unavailable. Please try again later or contact support.";
pub const GENERIC_FAILURE_MESSAGE: &str =
    "Transaction failed. Please try again or contact support if the issue persists.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    NotConfigured,
    Connectivity,
    Authentication,
    ProviderUnavailable,
    Other,
}

/// Message shown to the end user for a failed purchase
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserFacingError {
    pub category: FailureCategory,
    pub message: String,
}

impl UserFacingError {
    fn template(category: FailureCategory, message: &str) -> Self {
        Self {
            category,
            message: message.to_string(),
        }
    }

    /// `Other` keeps the underlying message unless it is blank
    fn other(underlying: String) -> Self {
        let message = if underlying.trim().is_empty() {
            GENERIC_FAILURE_MESSAGE.to_string()
        } else {
            underlying
        };
        Self {
            category: FailureCategory::Other,
            message,
        }
    }
}

/// Classify a failure. Pure: the same error always yields the same result.
pub fn classify(error: &BillingError) -> UserFacingError {
    match error {
        BillingError::Configuration { .. } => {
            UserFacingError::template(FailureCategory::NotConfigured, NOT_CONFIGURED_MESSAGE)
        }
        BillingError::Network { .. } => {
            UserFacingError::template(FailureCategory::Connectivity, CONNECTIVITY_MESSAGE)
        }
        BillingError::Transport { kind, .. } => match kind {
            FailureKind::NotConfigured => {
                UserFacingError::template(FailureCategory::NotConfigured, NOT_CONFIGURED_MESSAGE)
            }
            FailureKind::Authentication => {
                UserFacingError::template(FailureCategory::Authentication, AUTHENTICATION_MESSAGE)
            }
            FailureKind::ProviderUnavailable => UserFacingError::template(
                FailureCategory::ProviderUnavailable,
                PROVIDER_UNAVAILABLE_MESSAGE,
            ),
            FailureKind::InvalidRequest | FailureKind::Other => {
                UserFacingError::other(error.to_string())
            }
        },
        BillingError::Persistence(_) => {
            UserFacingError::template(FailureCategory::Other, GENERIC_FAILURE_MESSAGE)
        }
        BillingError::UnsupportedOperation { .. }
        | BillingError::InvalidNetwork { .. }
        | BillingError::InvalidRequest { .. } => UserFacingError::other(error.to_string()),
    }
}
