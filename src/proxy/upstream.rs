//! Outbound calls from the proxy to the provider API

use crate::error::FailureKind;
use crate::payments::types::{
    BuyAirtimePayload, ProxyRequest, ACTION_BUY_AIRTIME, ACTION_GET_DATA_PLANS,
};
use crate::proxy::settings::ProviderCredentials;
use crate::proxy::ProxyFailure;
use async_trait::async_trait;
use http::Method;
use reqwest::Client;
use std::time::Duration;
use tracing::{error, info};

/// Raw provider response
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

/// Performs authenticated requests against the provider
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    async fn send(
        &self,
        method: Method,
        url: &str,
        token: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<UpstreamResponse, String>;
}

pub struct ReqwestUpstream {
    client: Client,
}

impl ReqwestUpstream {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl UpstreamClient for ReqwestUpstream {
    async fn send(
        &self,
        method: Method,
        url: &str,
        token: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<UpstreamResponse, String> {
        let mut request = self
            .client
            .request(method, url)
            .bearer_auth(token)
            .header(http::header::CONTENT_TYPE, "application/json");

        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| e.to_string())?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await.map_err(|e| e.to_string())?;

        Ok(UpstreamResponse {
            status,
            content_type,
            body,
        })
    }
}

/// A proxy action resolved to a provider endpoint
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderCall {
    BuyAirtime(BuyAirtimePayload),
    GetDataPlans,
}

impl ProviderCall {
    pub fn from_request(request: ProxyRequest) -> Result<Self, ProxyFailure> {
        match request.action.as_str() {
            ACTION_BUY_AIRTIME => serde_json::from_value(request.data)
                .map(ProviderCall::BuyAirtime)
                .map_err(|e| {
                    ProxyFailure::new(
                        format!("Invalid buy_airtime payload: {}", e),
                        FailureKind::InvalidRequest,
                    )
                }),
            ACTION_GET_DATA_PLANS => Ok(ProviderCall::GetDataPlans),
            _ => Err(ProxyFailure::new("Invalid action", FailureKind::InvalidRequest)),
        }
    }

    pub fn method(&self) -> Method {
        match self {
            ProviderCall::BuyAirtime(_) => Method::POST,
            ProviderCall::GetDataPlans => Method::GET,
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            ProviderCall::BuyAirtime(_) => "/vtu",
            ProviderCall::GetDataPlans => "/data/plans",
        }
    }

    /// Request body; GET calls carry none
    pub fn body(&self) -> Result<Option<serde_json::Value>, ProxyFailure> {
        match self {
            ProviderCall::BuyAirtime(payload) => serde_json::to_value(payload)
                .map(Some)
                .map_err(|e| ProxyFailure::new(e.to_string(), FailureKind::InvalidRequest)),
            ProviderCall::GetDataPlans => Ok(None),
        }
    }

    /// Execute against the provider and normalize the response
    pub async fn execute(
        &self,
        upstream: &dyn UpstreamClient,
        credentials: &ProviderCredentials,
    ) -> Result<serde_json::Value, ProxyFailure> {
        let url = format!("{}{}", credentials.base_url, self.path());
        let body = self.body()?;

        info!("Forwarding {} {}", self.method(), url);
        let response = upstream
            .send(self.method(), &url, &credentials.token, body.as_ref())
            .await
            .map_err(|e| {
                error!("Provider unreachable: {}", e);
                ProxyFailure::new(
                    format!("API server error: provider unreachable: {}", e),
                    FailureKind::ProviderUnavailable,
                )
            })?;

        if !(200..300).contains(&response.status) {
            error!("Provider returned {}: {}", response.status, response.body);
            return Err(upstream_failure(response.status, &response.body));
        }

        normalize_provider_body(response.content_type.as_deref(), &response.body)
    }
}

fn upstream_failure(status: u16, body: &str) -> ProxyFailure {
    match status {
        401 | 403 => ProxyFailure::new(
            format!("API authentication failed: {} - {}", status, body),
            FailureKind::Authentication,
        ),
        500..=599 => ProxyFailure::new(
            format!("API server error: {} - {}", status, body),
            FailureKind::ProviderUnavailable,
        ),
        _ => ProxyFailure::new(
            format!("API request failed: {} - {}", status, body),
            FailureKind::Other,
        ),
    }
}

/// JSON bodies pass through; the provider answers VTU success with an empty
/// or non-JSON body, which becomes `{status: true, message: "Success"}`.
pub fn normalize_provider_body(
    content_type: Option<&str>,
    body: &str,
) -> Result<serde_json::Value, ProxyFailure> {
    let is_json = content_type.is_some_and(|ct| ct.contains("application/json"));
    if !is_json || body.trim().is_empty() {
        return Ok(serde_json::json!({ "status": true, "message": "Success" }));
    }

    serde_json::from_str(body).map_err(|e| {
        ProxyFailure::new(
            format!("Invalid JSON from provider: {}", e),
            FailureKind::Other,
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_actions_route_to_provider_endpoints() {
        let call = ProviderCall::from_request(ProxyRequest {
            action: "buy_airtime".to_string(),
            data: json!({"network_id": 1, "phone_number": "08012345678", "amount": 100, "type": 1}),
        })
        .unwrap();
        assert_eq!(call.method(), Method::POST);
        assert_eq!(call.path(), "/vtu");
        assert_eq!(call.body().unwrap().unwrap()["network_id"], 1);

        let call = ProviderCall::from_request(ProxyRequest {
            action: "get_data_plans".to_string(),
            data: json!({}),
        })
        .unwrap();
        assert_eq!(call.method(), Method::GET);
        assert_eq!(call.path(), "/data/plans");
        assert_eq!(call.body().unwrap(), None);
    }

    #[test]
    fn test_unknown_action_is_invalid() {
        let err = ProviderCall::from_request(ProxyRequest {
            action: "buy_electricity".to_string(),
            data: json!({}),
        })
        .unwrap_err();
        assert_eq!(err.message, "Invalid action");
        assert_eq!(err.kind, FailureKind::InvalidRequest);
    }

    #[test]
    fn test_normalize_provider_body() {
        assert_eq!(
            normalize_provider_body(None, "").unwrap(),
            json!({"status": true, "message": "Success"})
        );
        assert_eq!(
            normalize_provider_body(Some("text/html"), "<p>ok</p>").unwrap(),
            json!({"status": true, "message": "Success"})
        );
        assert_eq!(
            normalize_provider_body(
                Some("application/json; charset=utf-8"),
                r#"{"reference":"SME1"}"#
            )
            .unwrap(),
            json!({"reference": "SME1"})
        );
        assert!(normalize_provider_body(Some("application/json"), "{oops").is_err());
    }

    #[test]
    fn test_upstream_failure_messages() {
        let err = upstream_failure(401, "bad token");
        assert_eq!(err.message, "API authentication failed: 401 - bad token");
        assert_eq!(err.kind, FailureKind::Authentication);

        assert_eq!(upstream_failure(503, "down").kind, FailureKind::ProviderUnavailable);

        let err = upstream_failure(422, "invalid phone");
        assert_eq!(err.message, "API request failed: 422 - invalid phone");
        assert_eq!(err.kind, FailureKind::Other);
    }
}
