use axum::{extract::State, response::IntoResponse, Json};
use serde::Serialize;
use serde_json::json;
use std::time::Instant;
use utoipa::ToSchema;

use crate::AppState;

/// Tracks application start time for uptime calculation
static START_TIME: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize the start time (call this on application startup)
pub fn init_start_time() {
    let _ = START_TIME.get_or_init(Instant::now);
}

fn get_uptime_secs() -> u64 {
    START_TIME.get().map(|t| t.elapsed().as_secs()).unwrap_or(0)
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub environment: String,
    pub uptime_secs: u64,
    /// `baas` or `in-memory`
    pub store: String,
    pub webhooks_verified: bool,
}

/// Service health
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse)),
    tag = "Health"
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let config = &state.config;
    Json(HealthResponse {
        status: "up".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        environment: config.environment.clone(),
        uptime_secs: get_uptime_secs(),
        store: if config.baas().is_some() { "baas" } else { "in-memory" }.to_string(),
        webhooks_verified: config.webhook_secret().is_some(),
    })
}

/// Basic liveness probe
pub async fn liveness_check() -> impl IntoResponse {
    Json(json!({
        "status": "up",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}
