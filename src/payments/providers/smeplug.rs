//! SME Plug gateway client
//!
//! Talks to the provider only through the credentialed proxy. The proxy
//! holds the provider token; this client holds the proxy's bearer
//! credential.

use crate::error::{BillingError, BillingResult, FailureKind};
use crate::payments::traits::{ProxyTransport, VtuGateway};
use crate::payments::transport::HttpTransport;
use crate::payments::types::{
    AirtimeReceipt, AirtimeRequest, BuyAirtimePayload, DataPlans, Network, ProxyEnvelope,
    ProxyRequest, ACTION_BUY_AIRTIME, ACTION_GET_DATA_PLANS,
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

pub const DEFAULT_PROXY_PATH: &str = "/functions/v1/smeplug-proxy";

/// Amounts are stored as NUMERIC(18, 2)
const MAX_AMOUNT_SCALE: u32 = 2;

/// Gateway client configuration
///
/// URL and token are optional so a half-configured deployment still builds;
/// each call checks them and fails with `Configuration` before sending.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL of the proxy host
    pub proxy_url: Option<String>,
    /// Bearer credential accepted by the proxy
    pub proxy_token: Option<String>,
    /// Path of the proxy function on the host
    pub proxy_path: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            proxy_url: None,
            proxy_token: None,
            proxy_path: DEFAULT_PROXY_PATH.to_string(),
            timeout_secs: 30,
        }
    }
}

impl GatewayConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        let non_empty = |key: &str| {
            std::env::var(key)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Self {
            proxy_url: non_empty("VTU_PROXY_URL"),
            proxy_token: non_empty("VTU_PROXY_TOKEN"),
            proxy_path: non_empty("VTU_PROXY_PATH")
                .unwrap_or_else(|| DEFAULT_PROXY_PATH.to_string()),
            timeout_secs: non_empty("VTU_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
        }
    }

    /// Resolve the proxy URL and bearer credential
    pub fn endpoint(&self) -> BillingResult<(String, String)> {
        let base = self
            .proxy_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| BillingError::configuration("proxy URL not configured"))?;
        let token = self
            .proxy_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| BillingError::configuration("proxy credential not configured"))?;

        let path = self.proxy_path.trim_start_matches('/');
        let url = format!("{}/{}", base.trim_end_matches('/'), path);
        reqwest::Url::parse(&url).map_err(|e| {
            BillingError::configuration(format!("invalid proxy URL '{}': {}", url, e))
        })?;
        Ok((url, token.to_string()))
    }
}

/// VTU gateway backed by the SME Plug proxy
pub struct SmePlugGateway {
    config: GatewayConfig,
    transport: Arc<dyn ProxyTransport>,
}

impl SmePlugGateway {
    pub fn new(config: GatewayConfig, transport: Arc<dyn ProxyTransport>) -> Self {
        Self { config, transport }
    }

    /// Gateway with a reqwest transport using the configured timeout
    pub fn with_http(config: GatewayConfig) -> BillingResult<Self> {
        let transport = HttpTransport::new(Duration::from_secs(config.timeout_secs))?;
        Ok(Self::new(config, Arc::new(transport)))
    }

    /// Create gateway from environment variables
    pub fn from_env() -> BillingResult<Self> {
        Self::with_http(GatewayConfig::from_env())
    }

    /// Send one `{action, data}` envelope and unwrap its `data`
    async fn make_request(
        &self,
        action: &str,
        data: serde_json::Value,
    ) -> BillingResult<serde_json::Value> {
        let (url, token) = self.config.endpoint()?;
        let body = serde_json::to_value(ProxyRequest {
            action: action.to_string(),
            data,
        })
        .map_err(|e| BillingError::invalid_request(e.to_string()))?;

        let response = self.transport.post_json(&url, &token, &body).await?;

        if !response.is_success() {
            // Failure bodies are usually envelopes; use their code when present
            let envelope = serde_json::from_str::<ProxyEnvelope>(&response.body).ok();
            let code = envelope.as_ref().and_then(|e| e.code.as_deref());
            let detail = envelope
                .as_ref()
                .and_then(|e| e.error.as_deref())
                .unwrap_or(&response.body);
            let kind = FailureKind::infer(Some(response.status), code, detail);

            error!(
                "Proxy request '{}' failed: status={}, kind={:?}",
                action, response.status, kind
            );
            return Err(BillingError::Transport {
                status: Some(response.status),
                message: format!("Request failed: {} - {}", response.status, response.body),
                kind,
            });
        }

        let envelope: ProxyEnvelope = serde_json::from_str(&response.body).map_err(|e| {
            error!("Failed to parse proxy response for '{}': {}", action, e);
            BillingError::Transport {
                status: Some(response.status),
                message: format!("Invalid response format: {}", e),
                kind: FailureKind::Other,
            }
        })?;

        if !envelope.success {
            let message = envelope
                .error
                .filter(|e| !e.trim().is_empty())
                .unwrap_or_else(|| "API request failed".to_string());
            let kind =
                FailureKind::infer(Some(response.status), envelope.code.as_deref(), &message);
            error!("Proxy rejected '{}': {} ({:?})", action, message, kind);
            return Err(BillingError::Transport {
                status: Some(response.status),
                message,
                kind,
            });
        }

        Ok(envelope.data.unwrap_or(serde_json::Value::Null))
    }
}

fn validate_airtime(request: &AirtimeRequest) -> BillingResult<Network> {
    let network = Network::from_name(&request.network)?;
    if request.amount <= Decimal::ZERO {
        return Err(BillingError::invalid_request(format!(
            "amount must be positive, got {}",
            request.amount
        )));
    }
    if request.amount.normalize().scale() > MAX_AMOUNT_SCALE {
        return Err(BillingError::invalid_request(format!(
            "amount must have at most {} decimal places, got {}",
            MAX_AMOUNT_SCALE, request.amount
        )));
    }
    if request.phone_number.trim().is_empty() {
        return Err(BillingError::invalid_request("phone number is required"));
    }
    Ok(network)
}

#[async_trait]
impl VtuGateway for SmePlugGateway {
    async fn purchase_airtime(&self, request: &AirtimeRequest) -> BillingResult<AirtimeReceipt> {
        let network = validate_airtime(request)?;
        info!(
            "Buying airtime: network={} amount={} phone={}",
            network, request.amount, request.phone_number
        );

        let payload = BuyAirtimePayload::new(network, request.phone_number.trim(), request.amount);
        let data = serde_json::to_value(&payload)
            .map_err(|e| BillingError::invalid_request(e.to_string()))?;

        let raw = self.make_request(ACTION_BUY_AIRTIME, data).await?;
        let receipt = AirtimeReceipt::from_provider_payload(raw);

        info!(
            "Airtime purchase accepted: external_reference={:?}",
            receipt.external_reference
        );
        Ok(receipt)
    }

    async fn list_data_plans(&self) -> BillingResult<DataPlans> {
        let raw = self
            .make_request(ACTION_GET_DATA_PLANS, serde_json::json!({}))
            .await?;
        Ok(DataPlans(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payments::traits::ProxyResponse;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use std::sync::Mutex;

    /// Transport returning a canned result and recording every call
    struct ScriptedTransport {
        reply: Mutex<Option<BillingResult<ProxyResponse>>>,
        calls: Mutex<Vec<(String, String, serde_json::Value)>>,
    }

    impl ScriptedTransport {
        fn new(reply: BillingResult<ProxyResponse>) -> Arc<Self> {
            Arc::new(Self {
                reply: Mutex::new(Some(reply)),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn respond(status: u16, body: serde_json::Value) -> Arc<Self> {
            Self::new(Ok(ProxyResponse {
                status,
                body: body.to_string(),
            }))
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ProxyTransport for ScriptedTransport {
        async fn post_json(
            &self,
            url: &str,
            bearer_token: &str,
            body: &serde_json::Value,
        ) -> BillingResult<ProxyResponse> {
            self.calls
                .lock()
                .unwrap()
                .push((url.to_string(), bearer_token.to_string(), body.clone()));
            self.reply
                .lock()
                .unwrap()
                .take()
                .expect("transport called more than once")
        }
    }

    fn config() -> GatewayConfig {
        GatewayConfig {
            proxy_url: Some("https://proxy.example.com/".to_string()),
            proxy_token: Some("anon-key".to_string()),
            ..Default::default()
        }
    }

    fn airtime(network: &str) -> AirtimeRequest {
        AirtimeRequest {
            network: network.to_string(),
            amount: dec!(100),
            phone_number: "08012345678".to_string(),
        }
    }

    #[tokio::test]
    async fn test_purchase_sends_envelope_and_unwraps_data() {
        let transport = ScriptedTransport::respond(
            200,
            json!({"success": true, "data": {"reference": "SME123"}}),
        );
        let gateway = SmePlugGateway::new(config(), transport.clone());

        let receipt = gateway.purchase_airtime(&airtime("mtn")).await.unwrap();
        assert_eq!(receipt.external_reference.as_deref(), Some("SME123"));

        let calls = transport.calls.lock().unwrap();
        let (url, token, body) = &calls[0];
        assert_eq!(url, "https://proxy.example.com/functions/v1/smeplug-proxy");
        assert_eq!(token, "anon-key");
        assert_eq!(body["action"], "buy_airtime");
        assert_eq!(body["data"]["network_id"], 1);
        assert_eq!(body["data"]["phone_number"], "08012345678");
        assert_eq!(body["data"]["amount"].as_f64(), Some(100.0));
        assert_eq!(body["data"]["type"], 1);
    }

    #[tokio::test]
    async fn test_unknown_network_never_reaches_transport() {
        let transport = ScriptedTransport::respond(200, json!({"success": true, "data": {}}));
        let gateway = SmePlugGateway::new(config(), transport.clone());

        let err = gateway
            .purchase_airtime(&airtime("unknown-telco"))
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::InvalidNetwork { .. }));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_config_fails_without_network_call() {
        let transport = ScriptedTransport::respond(200, json!({"success": true, "data": {}}));

        for cfg in [
            GatewayConfig {
                proxy_url: None,
                ..config()
            },
            GatewayConfig {
                proxy_token: Some("  ".to_string()),
                ..config()
            },
        ] {
            let gateway = SmePlugGateway::new(cfg, transport.clone());
            let err = gateway.purchase_airtime(&airtime("glo")).await.unwrap_err();
            assert!(matches!(err, BillingError::Configuration { .. }));
        }
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_non_positive_amount_rejected_locally() {
        let transport = ScriptedTransport::respond(200, json!({"success": true, "data": {}}));
        let gateway = SmePlugGateway::new(config(), transport.clone());

        let mut request = airtime("airtel");
        request.amount = dec!(0);
        let err = gateway.purchase_airtime(&request).await.unwrap_err();
        assert!(matches!(err, BillingError::InvalidRequest { .. }));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_sub_kobo_amount_rejected_locally() {
        let transport = ScriptedTransport::respond(200, json!({"success": true, "data": {}}));
        let gateway = SmePlugGateway::new(config(), transport.clone());

        let mut request = airtime("mtn");
        request.amount = dec!(100.555);
        let err = gateway.purchase_airtime(&request).await.unwrap_err();
        assert!(matches!(err, BillingError::InvalidRequest { .. }));
        assert_eq!(transport.call_count(), 0);

        request.amount = dec!(100.50);
        assert!(gateway.purchase_airtime(&request).await.is_ok());
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_non_2xx_embeds_status_and_body() {
        let body = json!({
            "success": false,
            "error": "API token not configured. Please update the token in admin settings.",
            "code": "not_configured"
        });
        let transport = ScriptedTransport::respond(500, body.clone());
        let gateway = SmePlugGateway::new(config(), transport);

        match gateway.purchase_airtime(&airtime("mtn")).await.unwrap_err() {
            BillingError::Transport {
                status,
                message,
                kind,
            } => {
                assert_eq!(status, Some(500));
                assert_eq!(message, format!("Request failed: 500 - {}", body));
                assert_eq!(kind, FailureKind::NotConfigured);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_non_2xx_plain_text_body() {
        let transport = ScriptedTransport::new(Ok(ProxyResponse {
            status: 502,
            body: "Bad Gateway".to_string(),
        }));
        let gateway = SmePlugGateway::new(config(), transport);

        let err = gateway.purchase_airtime(&airtime("mtn")).await.unwrap_err();
        assert_eq!(err.to_string(), "Request failed: 502 - Bad Gateway");
    }

    #[tokio::test]
    async fn test_success_false_uses_error_or_fallback() {
        let transport = ScriptedTransport::respond(200, json!({"success": false}));
        let gateway = SmePlugGateway::new(config(), transport);

        let err = gateway.purchase_airtime(&airtime("mtn")).await.unwrap_err();
        assert_eq!(err.to_string(), "API request failed");

        let transport = ScriptedTransport::respond(
            200,
            json!({"success": false, "error": "API authentication failed: 401"}),
        );
        let gateway = SmePlugGateway::new(config(), transport);
        match gateway.purchase_airtime(&airtime("mtn")).await.unwrap_err() {
            BillingError::Transport { kind, .. } => assert_eq!(kind, FailureKind::Authentication),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_network_failure_is_distinct_from_rejection() {
        let transport = ScriptedTransport::new(Err(BillingError::network("Failed to fetch")));
        let gateway = SmePlugGateway::new(config(), transport);

        let err = gateway.purchase_airtime(&airtime("mtn")).await.unwrap_err();
        assert!(matches!(err, BillingError::Network { .. }));
    }

    #[tokio::test]
    async fn test_list_data_plans() {
        let transport = ScriptedTransport::respond(
            200,
            json!({"success": true, "data": {"plans": [{"id": 1, "name": "1GB"}]}}),
        );
        let gateway = SmePlugGateway::new(config(), transport.clone());

        let plans = gateway.list_data_plans().await.unwrap();
        assert_eq!(plans.as_value()["plans"][0]["name"], "1GB");

        let calls = transport.calls.lock().unwrap();
        assert_eq!(calls[0].2, json!({"action": "get_data_plans", "data": {}}));
    }

    #[test]
    fn test_gateway_config_default() {
        let config = GatewayConfig::default();
        assert_eq!(config.proxy_path, "/functions/v1/smeplug-proxy");
        assert_eq!(config.timeout_secs, 30);
        assert!(matches!(
            config.endpoint(),
            Err(BillingError::Configuration { .. })
        ));
    }

    #[test]
    fn test_endpoint_joins_base_and_path() {
        let config = GatewayConfig {
            proxy_url: Some("https://project.supabase.co/".to_string()),
            proxy_token: Some(" anon-key ".to_string()),
            ..GatewayConfig::default()
        };

        let (url, token) = config.endpoint().unwrap();
        assert_eq!(url, "https://project.supabase.co/functions/v1/smeplug-proxy");
        assert_eq!(token, "anon-key");
    }

    #[tokio::test]
    async fn test_proxy_url_without_scheme_is_configuration_error() {
        let transport = ScriptedTransport::respond(200, json!({"success": true, "data": {}}));
        let gateway = SmePlugGateway::new(
            GatewayConfig {
                proxy_url: Some("proxy.example.com".to_string()),
                ..config()
            },
            transport.clone(),
        );

        let err = gateway.purchase_airtime(&airtime("mtn")).await.unwrap_err();
        assert!(matches!(err, BillingError::Configuration { .. }));
        assert_eq!(
            crate::services::classify::classify(&err).message,
            crate::services::classify::NOT_CONFIGURED_MESSAGE
        );
        assert_eq!(transport.call_count(), 0);
    }
}
