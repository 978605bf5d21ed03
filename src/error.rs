//! Error taxonomy shared by the gateway client and the purchase service

use crate::database::error::DatabaseError;
use crate::database::transaction::ServiceType;
use thiserror::Error;

pub type BillingResult<T> = Result<T, BillingError>;

/// Why the proxy or provider refused a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Provider credentials are missing or still the placeholder
    NotConfigured,
    /// Provider rejected the credentials
    Authentication,
    /// Provider-side server or configuration error
    ProviderUnavailable,
    /// Malformed request or unknown action
    InvalidRequest,
    Other,
}

impl FailureKind {
    /// Machine-readable code carried in proxy failure envelopes
    pub fn code(&self) -> &'static str {
        match self {
            FailureKind::NotConfigured => "not_configured",
            FailureKind::Authentication => "auth_failed",
            FailureKind::ProviderUnavailable => "provider_unavailable",
            FailureKind::InvalidRequest => "invalid_request",
            FailureKind::Other => "request_failed",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "not_configured" => Some(FailureKind::NotConfigured),
            "auth_failed" => Some(FailureKind::Authentication),
            "provider_unavailable" => Some(FailureKind::ProviderUnavailable),
            "invalid_request" => Some(FailureKind::InvalidRequest),
            "request_failed" => Some(FailureKind::Other),
            _ => None,
        }
    }

    /// Resolve the kind of a proxy failure.
    ///
    /// The `code` field wins when present. Proxies that only send text are
    /// matched on the phrases they are known to emit, then on HTTP status.
    pub fn infer(status: Option<u16>, code: Option<&str>, message: &str) -> Self {
        if let Some(kind) = code.and_then(FailureKind::from_code) {
            return kind;
        }

        const NOT_CONFIGURED: [&str; 4] = [
            "API token not configured",
            "YOUR_SMEPLUG_TOKEN_HERE",
            "API configuration not found",
            "API configuration is incomplete",
        ];
        const AUTHENTICATION: [&str; 2] = ["API authentication failed", "API access denied"];
        const UNAVAILABLE: [&str; 2] = ["API server error", "Service configuration error"];

        if NOT_CONFIGURED.iter().any(|p| message.contains(p)) {
            FailureKind::NotConfigured
        } else if AUTHENTICATION.iter().any(|p| message.contains(p)) {
            FailureKind::Authentication
        } else if UNAVAILABLE.iter().any(|p| message.contains(p)) {
            FailureKind::ProviderUnavailable
        } else if matches!(status, Some(401) | Some(403)) {
            FailureKind::Authentication
        } else {
            FailureKind::Other
        }
    }
}

/// Low-level failure of a purchase attempt
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BillingError {
    #[error("{0}")]
    Persistence(#[from] DatabaseError),

    #[error("Payment gateway configuration missing: {message}")]
    Configuration { message: String },

    /// Non-2xx proxy response, or an envelope with `success: false`
    #[error("{message}")]
    Transport {
        status: Option<u16>,
        message: String,
        kind: FailureKind,
    },

    #[error("Network connection error: {message}")]
    Network { message: String },

    #[error("{message}")]
    UnsupportedOperation {
        service: ServiceType,
        message: String,
    },

    #[error("Unsupported network '{network}'. Expected one of: mtn, airtel, 9mobile, glo")]
    InvalidNetwork { network: String },

    #[error("Invalid purchase request: {message}")]
    InvalidRequest { message: String },
}

impl BillingError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    pub fn unsupported(service: ServiceType, message: impl Into<String>) -> Self {
        Self::UnsupportedOperation {
            service,
            message: message.into(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

}

impl From<reqwest::Error> for BillingError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            // Unusable URL or request, e.g. a proxy URL without a scheme
            BillingError::configuration(format!("invalid proxy request: {}", err))
        } else if err.is_timeout() {
            BillingError::network(format!("request timeout: {}", err))
        } else if err.is_connect() || err.is_request() {
            BillingError::network(format!("Unable to connect: {}", err))
        } else if let Some(status) = err.status() {
            BillingError::Transport {
                status: Some(status.as_u16()),
                message: err.to_string(),
                kind: FailureKind::infer(Some(status.as_u16()), None, ""),
            }
        } else {
            BillingError::network(err.to_string())
        }
    }
}
