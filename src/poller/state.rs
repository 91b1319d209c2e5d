//! Per-sensor poller state and the staleness gate in front of every metric.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use uuid::Uuid;

use crate::aqi::AirQuality;
use crate::error::CommunicationFailure;
use crate::models::{Reading, TransformSettings, UNKNOWN_MODEL};

// ---

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Upper bound reported for any density metric, in µg/m³.
pub const MAX_DENSITY: f64 = 1000.0;

/// Name used before the sensor has told us its own.
pub const FALLBACK_NAME: &str = "PurpleAir";

/// Polling cadence and the thresholds derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    pub poll_interval: Duration,
    pub request_timeout: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl Timings {
    /// Warm-up window after start during which nothing is judged stale.
    pub fn grace_period(&self) -> Duration {
        self.request_timeout * 4
    }

    /// Age after which the last successful reading no longer counts.
    pub fn stale_after(&self) -> Duration {
        self.poll_interval * 3
    }
}

/// Where a sensor lives and what to call it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorIdentity {
    /// Host or `host:port` of the sensor on the local network.
    pub address: String,

    /// Overrides the name derived from the sensor's own payload.
    pub display_name: Option<String>,
}

impl SensorIdentity {
    pub fn new(address: impl Into<String>, display_name: Option<String>) -> Self {
        Self {
            address: address.into(),
            display_name,
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}/json", self.address)
    }

    /// Stable id derived from the sensor URL.
    pub fn id(&self) -> Uuid {
        Uuid::new_v5(&Uuid::NAMESPACE_URL, self.url().as_bytes())
    }
}

/// Coarse liveness of a sensor at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    /// Inside the grace period without a reading yet.
    Initializing,
    Live,
    Stale,
}

/// Everything a poller knows about its sensor.
///
/// Only the owning [`Poller`](super::Poller) mutates this; handles observe
/// clones of it.
#[derive(Debug, Clone)]
pub struct PollerState {
    pub identity: SensorIdentity,
    pub started_at: Instant,
    pub last_reading: Option<Arc<Reading>>,
    pub timings: Timings,
    pub settings: TransformSettings,
}

impl PollerState {
    // ---
    pub fn new(
        identity: SensorIdentity,
        started_at: Instant,
        timings: Timings,
        settings: TransformSettings,
    ) -> Self {
        Self {
            identity,
            started_at,
            last_reading: None,
            timings,
            settings,
        }
    }

    /// Stale once the grace period is over and there is either no reading
    /// or the last one is older than [`Timings::stale_after`].
    pub fn is_stale(&self, now: Instant) -> bool {
        // ---
        if now.saturating_duration_since(self.started_at) < self.timings.grace_period() {
            return false;
        }

        match &self.last_reading {
            None => true,
            Some(reading) => {
                now.saturating_duration_since(reading.captured_at) > self.timings.stale_after()
            }
        }
    }

    /// Not stale and backed by at least one successful reading.
    pub fn is_live(&self, now: Instant) -> bool {
        self.last_reading.is_some() && !self.is_stale(now)
    }

    pub fn liveness(&self, now: Instant) -> Liveness {
        if self.is_stale(now) {
            Liveness::Stale
        } else if self.last_reading.is_some() {
            Liveness::Live
        } else {
            Liveness::Initializing
        }
    }

    pub fn name(&self) -> String {
        // ---
        match (&self.identity.display_name, &self.last_reading) {
            (Some(name), _) => name.clone(),
            (None, Some(reading)) => reading.display_name.clone(),
            (None, None) => FALLBACK_NAME.to_string(),
        }
    }

    pub fn model(&self) -> &'static str {
        self.last_reading
            .as_ref()
            .map_or(UNKNOWN_MODEL, |reading| reading.model)
    }

    pub fn seconds_since_read(&self, now: Instant) -> Option<u64> {
        self.last_reading
            .as_ref()
            .map(|reading| now.saturating_duration_since(reading.captured_at).as_secs())
    }

    /// The current reading, unless the sensor is stale.
    fn gate(&self, now: Instant) -> Result<Option<&Reading>, CommunicationFailure> {
        if self.is_stale(now) {
            return Err(CommunicationFailure);
        }
        Ok(self.last_reading.as_deref())
    }

    pub fn air_quality(&self, now: Instant) -> Result<AirQuality, CommunicationFailure> {
        Ok(self
            .gate(now)?
            .map_or(AirQuality::Unknown, |reading| AirQuality::from_aqi(reading.aqi)))
    }

    pub fn aqi(&self, now: Instant) -> Result<f64, CommunicationFailure> {
        Ok(self.gate(now)?.map_or(0.0, |reading| reading.aqi))
    }

    /// PM2.5 density, or the AQI number when `aqi_instead_of_density` is set.
    pub fn pm2_5_density(&self, now: Instant) -> Result<f64, CommunicationFailure> {
        // ---
        let aqi_instead = self.settings.aqi_instead_of_density;
        Ok(self.gate(now)?.map_or(0.0, |reading| {
            let value = if aqi_instead {
                reading.aqi
            } else {
                reading.pm2_5
            };
            value.min(MAX_DENSITY)
        }))
    }

    pub fn pm10_density(&self, now: Instant) -> Result<f64, CommunicationFailure> {
        Ok(self
            .gate(now)?
            .map_or(0.0, |reading| reading.pm10.min(MAX_DENSITY)))
    }

    /// `None` until a reading that carries VOC arrives.
    pub fn voc_density(&self, now: Instant) -> Result<Option<f64>, CommunicationFailure> {
        Ok(self
            .gate(now)?
            .and_then(|reading| reading.voc)
            .map(|voc| voc.min(MAX_DENSITY)))
    }

    pub fn temperature_c(&self, now: Instant) -> Result<f64, CommunicationFailure> {
        Ok(self.gate(now)?.map_or(0.0, |reading| reading.temperature_c))
    }

    pub fn humidity(&self, now: Instant) -> Result<f64, CommunicationFailure> {
        Ok(self.gate(now)?.map_or(0.0, |reading| reading.humidity))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    // ---
    use super::*;
    use chrono::Utc;

    pub(crate) fn reading_at(captured_at: Instant, aqi: u32, pm2_5: f64) -> Reading {
        // ---
        Reading {
            captured_at,
            captured_at_utc: Utc::now(),
            display_name: "PurpleAir-c8a1 (outside)".to_string(),
            model: "PA-II",
            sensor_id: Some("84:f3:eb:7b:c8:a1".to_string()),
            firmware_version: Some("7.02".to_string()),
            pm2_5,
            pm10: pm2_5 + 2.0,
            humidity: 54.0,
            temperature_c: 16.67,
            voc: None,
            aqi: f64::from(aqi),
        }
    }

    fn state(started_at: Instant) -> PollerState {
        PollerState::new(
            SensorIdentity::new("192.168.1.20", None),
            started_at,
            Timings::default(),
            TransformSettings::default(),
        )
    }

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn test_thresholds() {
        // ---
        let timings = Timings::default();
        assert_eq!(timings.grace_period(), secs(60));
        assert_eq!(timings.stale_after(), secs(180));
    }

    #[test]
    fn test_grace_period_without_reading() {
        // ---
        let t0 = Instant::now();
        let s = state(t0);

        for at in [0, 30, 59] {
            let now = t0 + secs(at);
            assert!(!s.is_stale(now));
            assert!(!s.is_live(now));
            assert_eq!(s.liveness(now), Liveness::Initializing);
            assert_eq!(s.air_quality(now), Ok(AirQuality::Unknown));
            assert_eq!(s.aqi(now), Ok(0.0));
            assert_eq!(s.pm2_5_density(now), Ok(0.0));
            assert_eq!(s.pm10_density(now), Ok(0.0));
            assert_eq!(s.voc_density(now), Ok(None));
            assert_eq!(s.temperature_c(now), Ok(0.0));
            assert_eq!(s.humidity(now), Ok(0.0));
        }
    }

    #[test]
    fn test_stale_after_grace_without_reading() {
        // ---
        let t0 = Instant::now();
        let s = state(t0);
        let now = t0 + secs(60);

        assert!(s.is_stale(now));
        assert_eq!(s.liveness(now), Liveness::Stale);
        assert_eq!(s.air_quality(now), Err(CommunicationFailure));
        assert_eq!(s.pm2_5_density(now), Err(CommunicationFailure));
        assert_eq!(s.humidity(now), Err(CommunicationFailure));
    }

    #[test]
    fn test_reading_ages_into_staleness_and_recovers() {
        // ---
        let t0 = Instant::now();
        let mut s = state(t0);
        s.last_reading = Some(Arc::new(reading_at(t0 + secs(10), 112, 40.0)));

        assert!(s.is_live(t0 + secs(20)));
        assert_eq!(s.air_quality(t0 + secs(20)), Ok(AirQuality::Fair));
        assert!(!s.is_stale(t0 + secs(190)));
        assert!(s.is_stale(t0 + secs(191)));
        assert!(!s.is_live(t0 + secs(191)));

        s.last_reading = Some(Arc::new(reading_at(t0 + secs(191), 30, 7.0)));
        assert!(!s.is_stale(t0 + secs(191)));
        assert_eq!(s.air_quality(t0 + secs(191)), Ok(AirQuality::Excellent));
    }

    #[test]
    fn test_aqi_instead_of_density() {
        // ---
        let t0 = Instant::now();
        let mut s = state(t0);
        s.last_reading = Some(Arc::new(reading_at(t0, 112, 40.0)));
        assert_eq!(s.pm2_5_density(t0), Ok(40.0));

        s.settings.aqi_instead_of_density = true;
        assert_eq!(s.pm2_5_density(t0), Ok(112.0));
    }

    #[test]
    fn test_density_is_capped() {
        // ---
        let t0 = Instant::now();
        let mut s = state(t0);
        let mut reading = reading_at(t0, 500, 1500.0);
        reading.voc = Some(2400.0);
        s.last_reading = Some(Arc::new(reading));

        assert_eq!(s.pm2_5_density(t0), Ok(MAX_DENSITY));
        assert_eq!(s.pm10_density(t0), Ok(MAX_DENSITY));
        assert_eq!(s.voc_density(t0), Ok(Some(MAX_DENSITY)));
    }

    #[test]
    fn test_name_precedence() {
        // ---
        let t0 = Instant::now();
        let mut s = state(t0);
        assert_eq!(s.name(), FALLBACK_NAME);
        assert_eq!(s.model(), UNKNOWN_MODEL);

        s.last_reading = Some(Arc::new(reading_at(t0, 10, 2.0)));
        assert_eq!(s.name(), "PurpleAir-c8a1 (outside)");
        assert_eq!(s.model(), "PA-II");

        s.identity.display_name = Some("Back Porch".to_string());
        assert_eq!(s.name(), "Back Porch");
    }

    #[test]
    fn test_identity_id_is_stable() {
        // ---
        let a = SensorIdentity::new("192.168.1.20", None);
        let b = SensorIdentity::new("192.168.1.20", Some("Porch".to_string()));
        let c = SensorIdentity::new("192.168.1.21", None);

        assert_eq!(a.url(), "http://192.168.1.20/json");
        assert_eq!(a.id(), b.id());
        assert_ne!(a.id(), c.id());
    }
}
