//! Shared fakes for the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::Router;
use chrono::{DateTime, Utc};
use http::{Method, Request};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tower::ServiceExt;
use uuid::Uuid;
use vtu_billing::database::error::{DatabaseError, DatabaseErrorKind};
use vtu_billing::database::memory::InMemoryTransactionStore;
use vtu_billing::database::transaction::{NewTransaction, Settlement, Transaction};
use vtu_billing::error::{BillingError, BillingResult};
use vtu_billing::payments::providers::GatewayConfig;
use vtu_billing::payments::traits::{ProxyResponse, ProxyTransport};
use vtu_billing::proxy::upstream::{UpstreamClient, UpstreamResponse};
use vtu_billing::TransactionStore;

pub const PROXY_URL: &str = "https://proxy.test";
pub const PROXY_PATH: &str = "/functions/v1/smeplug-proxy";
pub const PROXY_TOKEN: &str = "anon-key";

pub fn gateway_config() -> GatewayConfig {
    GatewayConfig {
        proxy_url: Some(PROXY_URL.to_string()),
        proxy_token: Some(PROXY_TOKEN.to_string()),
        proxy_path: PROXY_PATH.to_string(),
        timeout_secs: 5,
    }
}

/// In-memory store that counts writes and can be told to fail them
#[derive(Default)]
pub struct CountingStore {
    pub inner: InMemoryTransactionStore,
    pub inserts: AtomicUsize,
    pub updates: AtomicUsize,
    pub fail_insert: bool,
    pub fail_update: bool,
}

impl CountingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_insert() -> Self {
        Self {
            fail_insert: true,
            ..Self::default()
        }
    }

    pub fn failing_update() -> Self {
        Self {
            fail_update: true,
            ..Self::default()
        }
    }

    pub fn inserts(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    pub fn updates(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }
}

fn unavailable() -> DatabaseError {
    DatabaseError::new(DatabaseErrorKind::ConnectionError {
        message: "connection reset by peer".to_string(),
    })
}

#[async_trait]
impl TransactionStore for CountingStore {
    async fn insert(&self, new: NewTransaction) -> Result<Transaction, DatabaseError> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        if self.fail_insert {
            return Err(unavailable());
        }
        self.inner.insert(new).await
    }

    async fn update(&self, id: Uuid, settlement: &Settlement) -> Result<(), DatabaseError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        if self.fail_update {
            return Err(unavailable());
        }
        self.inner.update(id, settlement).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Transaction>, DatabaseError> {
        self.inner.find_by_id(id).await
    }

    async fn find_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Transaction>, DatabaseError> {
        self.inner.find_by_reference(reference).await
    }

    async fn find_by_user(
        &self,
        user_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Transaction>, DatabaseError> {
        self.inner.find_by_user(user_id, limit, offset).await
    }

    async fn find_pending_older_than(
        &self,
        cutoff: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Transaction>, DatabaseError> {
        self.inner.find_pending_older_than(cutoff, limit).await
    }
}

/// Proxy transport answering every call with the same canned result
pub struct CannedTransport {
    reply: BillingResult<ProxyResponse>,
    pub bodies: Mutex<Vec<serde_json::Value>>,
}

impl CannedTransport {
    pub fn ok(status: u16, body: serde_json::Value) -> Self {
        Self {
            reply: Ok(ProxyResponse {
                status,
                body: body.to_string(),
            }),
            bodies: Mutex::new(Vec::new()),
        }
    }

    pub fn err(error: BillingError) -> Self {
        Self {
            reply: Err(error),
            bodies: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.bodies.lock().unwrap().len()
    }
}

#[async_trait]
impl ProxyTransport for CannedTransport {
    async fn post_json(
        &self,
        _url: &str,
        _bearer_token: &str,
        body: &serde_json::Value,
    ) -> BillingResult<ProxyResponse> {
        self.bodies.lock().unwrap().push(body.clone());
        self.reply.clone()
    }
}

/// Transport that serves gateway calls from an in-process proxy router
pub struct RouterTransport {
    router: Router,
}

impl RouterTransport {
    pub fn new(router: Router) -> Self {
        Self { router }
    }
}

#[async_trait]
impl ProxyTransport for RouterTransport {
    async fn post_json(
        &self,
        url: &str,
        bearer_token: &str,
        body: &serde_json::Value,
    ) -> BillingResult<ProxyResponse> {
        let uri: http::Uri = url
            .parse()
            .map_err(|e: http::uri::InvalidUri| BillingError::network(e.to_string()))?;
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri.path())
            .header(http::header::AUTHORIZATION, format!("Bearer {}", bearer_token))
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .map_err(|e| BillingError::network(e.to_string()))?;

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .map_err(|e| BillingError::network(e.to_string()))?;
        let status = response.status().as_u16();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .map_err(|e| BillingError::network(e.to_string()))?;

        Ok(ProxyResponse {
            status,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }
}

/// Provider stand-in returning one canned response, or refusing connections
pub struct FakeProvider {
    reply: Option<UpstreamResponse>,
    pub requests: Mutex<Vec<(Method, String, Option<serde_json::Value>)>>,
}

impl FakeProvider {
    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Self {
            reply: Some(UpstreamResponse {
                status,
                content_type: Some("application/json".to_string()),
                body: body.to_string(),
            }),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn unreachable() -> Self {
        Self {
            reply: None,
            requests: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl UpstreamClient for FakeProvider {
    async fn send(
        &self,
        method: Method,
        url: &str,
        _token: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<UpstreamResponse, String> {
        self.requests
            .lock()
            .unwrap()
            .push((method, url.to_string(), body.cloned()));
        self.reply
            .clone()
            .ok_or_else(|| "connection refused".to_string())
    }
}
