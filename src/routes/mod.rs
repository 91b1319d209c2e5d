//! Status API gateway.
//!
//! Merges the per-endpoint subrouters and attaches the shared sensor list,
//! so `main.rs` only ever sees [`router`].

use std::sync::Arc;

use axum::Router;

use crate::poller::SensorHandle;

mod health;
mod sensors;

pub use sensors::{Metrics, SensorStatus};

/// Handles of every polled sensor, shared by all routes.
pub type Sensors = Arc<Vec<SensorHandle>>;

// ---

pub fn router(sensors: Vec<SensorHandle>) -> Router {
    // ---
    Router::new()
        .merge(sensors::router())
        .merge(health::router())
        .with_state(Arc::new(sensors))
}
