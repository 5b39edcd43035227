//! Liveness and readiness probes.

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};

use crate::api::dto::{HealthResponse, HealthStatus, ProviderHealth};
use crate::state::AppState;

pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/live", get(live))
        .route("/ready", get(ready))
}

fn response(status: HealthStatus, providers: Vec<ProviderHealth>) -> HealthResponse {
    HealthResponse {
        status,
        version: crate::pkg_version().to_string(),
        timestamp: jiff::Timestamp::now().to_string(),
        providers,
    }
}

/// Process is up. Never looks at providers.
async fn live() -> Json<HealthResponse> {
    Json(response(HealthStatus::Healthy, Vec::new()))
}

/// 200 only while every registered provider reports ready.
async fn ready(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let providers: Vec<_> = state
        .registry
        .providers()
        .iter()
        .map(|p| ProviderHealth {
            name: p.name().to_string(),
            priority: p.priority(),
            ready: p.is_ready(),
        })
        .collect();

    if providers.iter().all(|p| p.ready) {
        (StatusCode::OK, Json(response(HealthStatus::Healthy, providers)))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(response(HealthStatus::Unhealthy, providers)),
        )
    }
}
