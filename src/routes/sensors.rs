use axum::{
    extract::Path, extract::State, http::StatusCode, response::IntoResponse, routing::get, Json,
    Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

use super::Sensors;
use crate::aqi::AirQuality;
use crate::error::CommunicationFailure;
use crate::poller::{PollerState, SensorHandle};

// ---

pub fn router() -> Router<Sensors> {
    // ---
    Router::new()
        .route("/sensors", get(list))
        .route("/sensors/{id}", get(show))
}

/// One sensor as reported by the status API.
#[derive(Debug, Serialize)]
pub struct SensorStatus {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub live: bool,
    pub stale: bool,
    pub model: &'static str,
    pub sensor_id: Option<String>,
    pub firmware_version: Option<String>,
    pub read_at: Option<DateTime<Utc>>,
    pub seconds_since_read: Option<u64>,
    /// `None` while the sensor is stale.
    pub metrics: Option<Metrics>,
}

/// Metric values behind the staleness gate.
#[derive(Debug, Serialize)]
pub struct Metrics {
    pub air_quality: AirQuality,
    pub aqi: f64,
    /// Density in µg/m³, or the AQI when configured to report that instead.
    pub pm2_5: f64,
    pub pm10: f64,
    pub voc: Option<f64>,
    pub temperature_c: f64,
    pub humidity: f64,
}

impl SensorStatus {
    // ---
    pub fn from_handle(handle: &SensorHandle) -> Self {
        // ---
        let state = handle.snapshot();
        let now = handle.now();
        let reading = state.last_reading.as_deref();

        SensorStatus {
            id: state.identity.id(),
            name: state.name(),
            address: state.identity.address.clone(),
            live: state.is_live(now),
            stale: state.is_stale(now),
            model: state.model(),
            sensor_id: reading.and_then(|r| r.sensor_id.clone()),
            firmware_version: reading.and_then(|r| r.firmware_version.clone()),
            read_at: reading.map(|r| r.captured_at_utc),
            seconds_since_read: state.seconds_since_read(now),
            metrics: Metrics::collect(&state, now).ok(),
        }
    }
}

impl Metrics {
    fn collect(state: &PollerState, now: Instant) -> Result<Self, CommunicationFailure> {
        // ---
        Ok(Metrics {
            air_quality: state.air_quality(now)?,
            aqi: state.aqi(now)?,
            pm2_5: state.pm2_5_density(now)?,
            pm10: state.pm10_density(now)?,
            voc: state.voc_density(now)?,
            temperature_c: state.temperature_c(now)?,
            humidity: state.humidity(now)?,
        })
    }
}

async fn list(State(sensors): State<Sensors>) -> impl IntoResponse {
    // ---
    debug!("GET /sensors");

    let statuses: Vec<SensorStatus> = sensors.iter().map(SensorStatus::from_handle).collect();
    (StatusCode::OK, Json(statuses))
}

async fn show(Path(id): Path<Uuid>, State(sensors): State<Sensors>) -> impl IntoResponse {
    // ---
    debug!("GET /sensors/{}", id);

    let Some(handle) = sensors.iter().find(|s| s.identity().id() == id) else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "unknown sensor" })),
        )
            .into_response();
    };

    let status = SensorStatus::from_handle(handle);
    let code = if status.stale {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    (code, Json(status)).into_response()
}
