use crate::error::FailureKind;
use crate::payments::types::{ProxyEnvelope, ProxyRequest};
use crate::proxy::settings::load_credentials;
use crate::proxy::upstream::ProviderCall;
use crate::proxy::{ProxyFailure, ProxyState};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::Json;
use tracing::{info, warn};

fn check_client_token(state: &ProxyState, headers: &HeaderMap) -> Result<(), ProxyFailure> {
    let Some(expected) = state.client_token.as_deref() else {
        return Ok(());
    };

    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim);

    if presented == Some(expected) {
        Ok(())
    } else {
        warn!("Rejected proxy call with missing or invalid client credential");
        Err(ProxyFailure::new("Unauthorized", FailureKind::Authentication)
            .with_status(StatusCode::UNAUTHORIZED))
    }
}

/// `POST` handler for `{action, data}` requests
pub async fn proxy_action(
    State(state): State<ProxyState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ProxyEnvelope>, ProxyFailure> {
    check_client_token(&state, &headers)?;

    let credentials = load_credentials(state.settings.as_ref()).await?;

    let request: ProxyRequest = serde_json::from_slice(&body).map_err(|e| {
        ProxyFailure::new(
            format!("Invalid request body: {}", e),
            FailureKind::InvalidRequest,
        )
    })?;
    let action = request.action.clone();
    let call = ProviderCall::from_request(request)?;

    let data = call
        .execute(state.upstream.as_ref(), &credentials)
        .await
        .inspect_err(|e| warn!("Action '{}' failed: {}", action, e.message))?;

    info!("Action '{}' completed", action);
    Ok(Json(ProxyEnvelope::ok(data)))
}
