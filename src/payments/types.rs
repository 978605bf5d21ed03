//! VTU request/response types and the proxy wire format

use crate::error::BillingError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Proxy action for an airtime top-up
pub const ACTION_BUY_AIRTIME: &str = "buy_airtime";
/// Proxy action for the data plan catalogue
pub const ACTION_GET_DATA_PLANS: &str = "get_data_plans";

/// Provider `type` value for VTU airtime
pub const VTU_TYPE: u8 = 1;

/// Mobile network operator supported by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Network {
    Mtn,
    Airtel,
    NineMobile,
    Glo,
}

impl Network {
    pub const ALL: [Network; 4] = [
        Network::Mtn,
        Network::Airtel,
        Network::NineMobile,
        Network::Glo,
    ];

    /// Provider network code
    pub fn id(&self) -> u8 {
        match self {
            Network::Mtn => 1,
            Network::Airtel => 2,
            Network::NineMobile => 3,
            Network::Glo => 4,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Network::Mtn => "mtn",
            Network::Airtel => "airtel",
            Network::NineMobile => "9mobile",
            Network::Glo => "glo",
        }
    }

    /// Look up a network by its display name
    pub fn from_name(name: &str) -> Result<Self, BillingError> {
        let normalized = name.trim().to_ascii_lowercase();
        Network::ALL
            .into_iter()
            .find(|n| n.name() == normalized)
            .ok_or_else(|| BillingError::InvalidNetwork {
                network: name.to_string(),
            })
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Airtime purchase as requested by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirtimeRequest {
    /// Network display name (mtn, airtel, 9mobile, glo)
    pub network: String,
    pub amount: Decimal,
    pub phone_number: String,
}

/// Result of a successful airtime purchase
#[derive(Debug, Clone, PartialEq)]
pub struct AirtimeReceipt {
    /// Unwrapped `data` payload of the proxy envelope
    pub raw: serde_json::Value,
    /// Provider reference, when the provider returned one
    pub external_reference: Option<String>,
}

impl AirtimeReceipt {
    pub fn from_provider_payload(raw: serde_json::Value) -> Self {
        let external_reference = extract_external_reference(&raw);
        Self {
            raw,
            external_reference,
        }
    }
}

/// Data plan catalogue as returned by the provider
#[derive(Debug, Clone, PartialEq)]
pub struct DataPlans(pub serde_json::Value);

impl DataPlans {
    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }
}

/// Pull the provider's own reference out of a response payload.
///
/// Checks `reference` then `id`; numbers are rendered as strings and empty
/// strings count as absent.
pub fn extract_external_reference(payload: &serde_json::Value) -> Option<String> {
    ["reference", "id"].iter().find_map(|key| match payload.get(*key) {
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Body posted to the credentialed proxy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProxyRequest {
    pub action: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// `buy_airtime` payload, forwarded as-is to the provider's `/vtu` endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuyAirtimePayload {
    pub network_id: u8,
    pub phone_number: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub vtu_type: u8,
}

impl BuyAirtimePayload {
    pub fn new(network: Network, phone_number: &str, amount: Decimal) -> Self {
        Self {
            network_id: network.id(),
            phone_number: phone_number.to_string(),
            amount,
            vtu_type: VTU_TYPE,
        }
    }
}

/// Response envelope returned by the proxy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProxyEnvelope {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ProxyEnvelope {
    pub fn ok(data: serde_json::Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            code: None,
        }
    }

    pub fn failure(error: impl Into<String>, code: &str) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            code: Some(code.to_string()),
        }
    }
}
