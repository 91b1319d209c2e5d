// src/routes/health.rs
//! Health check endpoint.
//!
//! `/health` answers as long as the process is serving HTTP and reports how
//! many of the configured sensors are currently live. A stale sensor does not
//! make the service unhealthy; that is what `/sensors` is for.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use super::Sensors;

/// JSON response body for the `/health` endpoint.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    sensors: usize,
    live: usize,
}

/// Handle `GET /health`.
async fn health(State(sensors): State<Sensors>) -> Json<HealthResponse> {
    // ---
    let live = sensors.iter().filter(|s| s.is_live()).count();
    Json(HealthResponse {
        status: "ok",
        sensors: sensors.len(),
        live,
    })
}

pub fn router() -> Router<Sensors> {
    Router::new().route("/health", get(health))
}
