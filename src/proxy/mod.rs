//! Credentialed proxy
//!
//! Accepts `{action, data}` from app clients, attaches the provider token
//! from the settings store and forwards the call to the provider API. Every
//! answer is a `ProxyEnvelope`: 200 with `data` on success, 500 (401 for a
//! rejected client credential) with `error` and `code` otherwise.

pub mod handlers;
pub mod settings;
pub mod upstream;

use crate::error::FailureKind;
use crate::payments::types::ProxyEnvelope;
use axum::http::{header, HeaderName, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use self::settings::SettingsStore;
use self::upstream::UpstreamClient;

/// A proxy request that could not be served
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyFailure {
    pub status: StatusCode,
    pub message: String,
    pub kind: FailureKind,
}

impl ProxyFailure {
    pub fn new(message: impl Into<String>, kind: FailureKind) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
            kind,
        }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }
}

impl IntoResponse for ProxyFailure {
    fn into_response(self) -> Response {
        let envelope = ProxyEnvelope::failure(self.message, self.kind.code());
        (self.status, Json(envelope)).into_response()
    }
}

/// Shared state of the proxy service
#[derive(Clone)]
pub struct ProxyState {
    pub settings: Arc<dyn SettingsStore>,
    pub upstream: Arc<dyn UpstreamClient>,
    /// Bearer credential app clients must present; unchecked when `None`
    pub client_token: Option<String>,
    pub environment: String,
}

/// Build the proxy router, serving the proxy function at `path`
pub fn router(state: ProxyState, path: &str) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::GET, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
        ]);

    Router::new()
        .route("/health", get(crate::api::health::health_check))
        .route(path, post(handlers::proxy_action))
        .layer(cors)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}
