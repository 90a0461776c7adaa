//! Health check handlers for background workers.
//!
//! - Liveness probes (`/health`, `/healthz`)
//! - Readiness probes (`/ready`, `/readyz`), one entry per registered dependency
//! - Prometheus metrics (`/metrics`)

use async_trait::async_trait;
use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
};
use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;

use crate::metrics;

/// A dependency the readiness probe should verify.
#[async_trait]
pub trait ReadinessCheck: Send + Sync {
    fn name(&self) -> &'static str;

    async fn check(&self) -> Result<(), String>;
}

/// Readiness check that PINGs Redis.
pub struct RedisCheck {
    redis: ConnectionManager,
}

impl RedisCheck {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl ReadinessCheck for RedisCheck {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn check(&self) -> Result<(), String> {
        let mut conn = self.redis.clone();
        let result: Result<String, _> = redis::cmd("PING").query_async(&mut conn).await;
        match result {
            Ok(response) if response == "PONG" => Ok(()),
            Ok(response) => Err(format!("unexpected response: {}", response)),
            Err(e) => Err(format!("error: {}", e)),
        }
    }
}

/// Shared state for health endpoints.
#[derive(Clone)]
pub struct HealthState {
    pub app_name: String,
    pub app_version: String,
    checks: Vec<Arc<dyn ReadinessCheck>>,
    /// Features switched off by configuration, reported but never failing
    disabled: Vec<&'static str>,
}

impl HealthState {
    pub fn new(app_name: impl Into<String>, app_version: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            app_version: app_version.into(),
            checks: Vec::new(),
            disabled: Vec::new(),
        }
    }

    pub fn with_check(mut self, check: impl ReadinessCheck + 'static) -> Self {
        self.checks.push(Arc::new(check));
        self
    }

    pub fn with_disabled(mut self, feature: &'static str) -> Self {
        self.disabled.push(feature);
        self
    }

    /// Run every check. Returns overall readiness and a per-check report.
    pub async fn readiness(&self) -> (bool, Map<String, Value>) {
        let mut ready = true;
        let mut report = Map::new();

        for check in &self.checks {
            let status = match check.check().await {
                Ok(()) => "ok".to_string(),
                Err(e) => {
                    ready = false;
                    e
                }
            };
            report.insert(check.name().to_string(), Value::String(status));
        }
        for feature in &self.disabled {
            report.insert(feature.to_string(), Value::String("disabled".to_string()));
        }

        (ready, report)
    }
}

/// Health response for liveness probes.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub name: String,
    pub version: String,
}

/// Liveness probe handler. Always OK while the process serves requests.
pub async fn health_handler(State(state): State<HealthState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        name: state.app_name,
        version: state.app_version,
    })
}

/// Readiness probe handler.
pub async fn ready_handler(State(state): State<HealthState>) -> (StatusCode, Json<Value>) {
    let (ready, checks) = state.readiness().await;

    if ready {
        (
            StatusCode::OK,
            Json(json!({ "status": "ready", "checks": checks })),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "not_ready", "checks": checks })),
        )
    }
}

/// Prometheus metrics endpoint handler.
pub async fn metrics_handler() -> impl IntoResponse {
    match metrics::prometheus_handle() {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            handle.render(),
        )
            .into_response(),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            "Metrics not initialized. Call metrics::init_metrics() at startup.".to_string(),
        )
            .into_response(),
    }
}

/// Create the standard health router.
pub fn health_router(state: HealthState) -> axum::Router {
    use axum::routing::get;

    axum::Router::new()
        .route("/health", get(health_handler))
        .route("/healthz", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/readyz", get(ready_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Serve `health_router` on `addr` until `shutdown` flips.
pub async fn serve_health(
    addr: &str,
    state: HealthState,
    mut shutdown: watch::Receiver<bool>,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Health server listening");

    axum::serve(listener, health_router(state))
        .with_graceful_shutdown(async move {
            let _ = shutdown.wait_for(|stop| *stop).await;
        })
        .await
}
