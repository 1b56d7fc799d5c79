//! Status HTTP endpoint.
//!
//! Read-only projections of the registry for dashboards and health
//! probes, plus the Prometheus scrape target. This is not the admin
//! API: nothing here mutates the pool.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use ibgw_core::TenantId;
use ibgw_pool::PoolManager;
use ibgw_telemetry::Metrics;
use std::sync::Arc;
use tracing::info;

/// Create the status router.
pub fn create_router(manager: Arc<PoolManager>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .route("/api/gateways", get(list_gateways))
        .route("/api/gateways/{tenant}", get(gateway_status))
        .with_state(manager)
}

/// Bind and serve until the process exits.
pub async fn serve(manager: Arc<PoolManager>, bind: &str) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(addr = %bind, "Status endpoint listening");
    axum::serve(listener, create_router(manager)).await
}

async fn healthz() -> &'static str {
    "ok"
}

async fn metrics() -> String {
    Metrics::gather()
}

async fn list_gateways(State(manager): State<Arc<PoolManager>>) -> impl IntoResponse {
    Json(manager.list())
}

async fn gateway_status(
    State(manager): State<Arc<PoolManager>>,
    Path(tenant): Path<String>,
) -> impl IntoResponse {
    let Ok(tenant) = TenantId::new(tenant) else {
        return (StatusCode::BAD_REQUEST, "invalid tenant id").into_response();
    };

    match manager.status(&tenant) {
        Some(snapshot) => Json(snapshot).into_response(),
        None => (StatusCode::NOT_FOUND, "unknown tenant").into_response(),
    }
}
