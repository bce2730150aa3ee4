use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
struct LivenessResponse {
    status: &'static str,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    database: &'static str,
}

/// `GET /health` — liveness probe, no dependencies touched.
async fn liveness() -> Json<LivenessResponse> {
    Json(LivenessResponse { status: "ok" })
}

/// `GET /api/v1/health` — readiness including database connectivity.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = match state.db.ping().await {
        Ok(()) => "connected",
        Err(_) => "disconnected",
    };

    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        database,
    })
}

/// Root-level health route (used by the hosting platform).
pub fn root_router() -> Router<AppState> {
    Router::new().route("/health", get(liveness))
}

/// Versioned health route with dependency detail.
pub fn api_router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
