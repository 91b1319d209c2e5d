//! Sink for what the pollers learn.
//!
//! Called synchronously from the poller task, so implementations must not
//! block; enqueue or log and return.

use std::sync::Arc;

use tracing::info;

use crate::models::Reading;
use crate::poller::SensorIdentity;

// ---

pub trait Publisher: Send + Sync + 'static {
    /// Called once per successful poll cycle with the new reading.
    fn on_reading_updated(&self, identity: &SensorIdentity, reading: &Arc<Reading>);

    /// Called when the sensor turns live or stops being live.
    fn on_liveness_changed(&self, identity: &SensorIdentity, is_live: bool) {
        let _ = (identity, is_live);
    }
}

impl<P: Publisher + ?Sized> Publisher for Arc<P> {
    fn on_reading_updated(&self, identity: &SensorIdentity, reading: &Arc<Reading>) {
        (**self).on_reading_updated(identity, reading)
    }

    fn on_liveness_changed(&self, identity: &SensorIdentity, is_live: bool) {
        (**self).on_liveness_changed(identity, is_live)
    }
}

/// Publishes by logging through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingPublisher;

impl Publisher for TracingPublisher {
    fn on_reading_updated(&self, identity: &SensorIdentity, reading: &Arc<Reading>) {
        info!(
            sensor = %identity.address,
            model = reading.model,
            "{}: {}",
            reading.display_name,
            reading
        );
    }

    fn on_liveness_changed(&self, identity: &SensorIdentity, is_live: bool) {
        if is_live {
            info!(sensor = %identity.address, "sensor is live");
        } else {
            info!(sensor = %identity.address, "sensor is not responding");
        }
    }
}
