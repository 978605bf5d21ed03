//! Gateway and transport trait definitions

use crate::error::BillingResult;
use crate::payments::types::{AirtimeRequest, AirtimeReceipt, DataPlans};
use async_trait::async_trait;

/// VTU provider operations used by the purchase service
#[async_trait]
pub trait VtuGateway: Send + Sync {
    /// Buy airtime for a phone number
    ///
    /// Fails with `InvalidNetwork` or `Configuration` before any network
    /// call when the request or the gateway config is unusable.
    async fn purchase_airtime(&self, request: &AirtimeRequest) -> BillingResult<AirtimeReceipt>;

    /// Fetch the provider's data plan catalogue
    async fn list_data_plans(&self) -> BillingResult<DataPlans>;
}

/// Raw HTTP response from the proxy
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyResponse {
    pub status: u16,
    pub body: String,
}

impl ProxyResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends a JSON body to the proxy with a bearer credential
///
/// Implementations return `Network` errors only for connectivity failures;
/// any HTTP response, whatever its status, is returned as `Ok`.
#[async_trait]
pub trait ProxyTransport: Send + Sync {
    async fn post_json(
        &self,
        url: &str,
        bearer_token: &str,
        body: &serde_json::Value,
    ) -> BillingResult<ProxyResponse>;
}
