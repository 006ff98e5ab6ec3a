use std::net::SocketAddr;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::config::DefaultsProvider;
use crate::controller::StatusCache;
use crate::crd::{Paas, PaasStatus};
use crate::validation::{ValidationReport, validate};

#[derive(Clone)]
pub struct AppState {
    pub defaults: DefaultsProvider,
    pub status_cache: StatusCache,
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

async fn active_config(
    State(state): State<AppState>,
) -> Json<serde_json::Value> {
    let defaults = state.defaults.snapshot().await;
    Json(json!({
        "version": defaults.version,
        "capabilities": defaults.spec.capabilities.keys().collect::<Vec<_>>(),
        "quotaLabel": defaults.spec.quota_label,
        "requestorLabel": defaults.spec.requestor_label,
        "argoNamespace": defaults.spec.argo_namespace,
    }))
}

async fn tenant_status(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<PaasStatus>, ApiError> {
    state
        .status_cache
        .get(&name)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("tenant {name}")))
}

async fn dry_run_validate(
    State(state): State<AppState>,
    Json(paas): Json<Paas>,
) -> Json<ValidationReport> {
    let defaults = state.defaults.snapshot().await;
    let report = validate(&paas, &defaults.spec, None);
    debug!(
        errors = report.errors.len(),
        warnings = report.warnings.len(),
        "validated tenant"
    );
    Json(report)
}

pub fn router(state: AppState) -> Router {
    // Expose both /health (preferred) and /healthz (legacy) for compatibility
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/healthz", get(|| async { "ok" }))
        .route("/v1/config", get(active_config))
        .route("/v1/tenants/{name}/status", get(tenant_status))
        .route("/v1/validate", post(dry_run_validate))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

pub async fn run_http_server(
    addr: SocketAddr,
    state: AppState,
) -> anyhow::Result<()> {
    info!("CRM HTTP listening on {}", addr);
    axum::serve(tokio::net::TcpListener::bind(addr).await?, router(state))
        .await?;
    Ok(())
}
