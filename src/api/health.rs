use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::proxy::settings::load_credentials;
use crate::proxy::ProxyState;

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub environment: String,
    pub provider_configured: bool,
}

pub async fn health_check(State(state): State<ProxyState>) -> Json<HealthResponse> {
    let provider_configured = load_credentials(state.settings.as_ref()).await.is_ok();

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        environment: state.environment.clone(),
        provider_configured,
    })
}
