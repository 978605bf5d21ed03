//! reqwest-backed proxy transport

use crate::error::{BillingError, BillingResult};
use crate::payments::traits::{ProxyResponse, ProxyTransport};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> BillingResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("vtu-billing/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                BillingError::configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { client })
    }
}

#[async_trait]
impl ProxyTransport for HttpTransport {
    async fn post_json(
        &self,
        url: &str,
        bearer_token: &str,
        body: &serde_json::Value,
    ) -> BillingResult<ProxyResponse> {
        debug!("POST {}", url);

        let response = self
            .client
            .post(url)
            .bearer_auth(bearer_token)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                warn!("Proxy request failed before a response: {}", e);
                BillingError::from(e)
            })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| {
            warn!("Failed to read proxy response body: {}", e);
            BillingError::from(e)
        })?;

        Ok(ProxyResponse { status, body })
    }
}
