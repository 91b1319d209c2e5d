//! Read-only view of a running poller.

use tokio::sync::watch;
use tokio::time::Instant;

use crate::aqi::AirQuality;
use crate::error::CommunicationFailure;

use super::clock::{Clock, SystemClock};
use super::state::{Liveness, PollerState, SensorIdentity};

// ---

/// Cheap to clone; every clone observes the same poller.
///
/// Each accessor evaluates staleness at the moment it is called, so a
/// sensor that stops answering turns into [`CommunicationFailure`] without
/// the poller having to push anything.
#[derive(Debug, Clone)]
pub struct SensorHandle<C: Clock = SystemClock> {
    state: watch::Receiver<PollerState>,
    clock: C,
}

impl<C: Clock> SensorHandle<C> {
    // ---
    pub(crate) fn new(state: watch::Receiver<PollerState>, clock: C) -> Self {
        Self { state, clock }
    }

    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    /// A consistent copy of the poller state.
    pub fn snapshot(&self) -> PollerState {
        self.state.borrow().clone()
    }

    pub fn identity(&self) -> SensorIdentity {
        self.state.borrow().identity.clone()
    }

    pub fn name(&self) -> String {
        self.state.borrow().name()
    }

    pub fn is_stale(&self) -> bool {
        self.state.borrow().is_stale(self.now())
    }

    pub fn is_live(&self) -> bool {
        self.state.borrow().is_live(self.now())
    }

    pub fn liveness(&self) -> Liveness {
        self.state.borrow().liveness(self.now())
    }

    pub fn air_quality(&self) -> Result<AirQuality, CommunicationFailure> {
        self.state.borrow().air_quality(self.now())
    }

    pub fn aqi(&self) -> Result<f64, CommunicationFailure> {
        self.state.borrow().aqi(self.now())
    }

    pub fn pm2_5_density(&self) -> Result<f64, CommunicationFailure> {
        self.state.borrow().pm2_5_density(self.now())
    }

    pub fn pm10_density(&self) -> Result<f64, CommunicationFailure> {
        self.state.borrow().pm10_density(self.now())
    }

    pub fn voc_density(&self) -> Result<Option<f64>, CommunicationFailure> {
        self.state.borrow().voc_density(self.now())
    }

    pub fn temperature_c(&self) -> Result<f64, CommunicationFailure> {
        self.state.borrow().temperature_c(self.now())
    }

    pub fn humidity(&self) -> Result<f64, CommunicationFailure> {
        self.state.borrow().humidity(self.now())
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use crate::models::TransformSettings;
    use crate::poller::state::tests::reading_at;
    use crate::poller::state::Timings;

    #[derive(Debug, Clone)]
    struct ManualClock(Arc<Mutex<Instant>>);

    impl ManualClock {
        fn advance(&self, by: Duration) {
            *self.0.lock().unwrap() += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            *self.0.lock().unwrap()
        }
    }

    #[test]
    fn test_handle_judges_staleness_with_its_clock() {
        // ---
        let clock = ManualClock(Arc::new(Mutex::new(Instant::now())));
        let state = PollerState::new(
            SensorIdentity::new("10.0.0.5", Some("Garage".to_string())),
            clock.now(),
            Timings::default(),
            TransformSettings::default(),
        );
        let (tx, rx) = watch::channel(state);
        let handle = SensorHandle::new(rx, clock.clone());

        assert_eq!(handle.liveness(), Liveness::Initializing);
        assert_eq!(handle.air_quality(), Ok(AirQuality::Unknown));
        assert_eq!(handle.name(), "Garage");

        clock.advance(Duration::from_secs(61));
        assert!(handle.is_stale());
        assert_eq!(handle.aqi(), Err(CommunicationFailure));
        assert_eq!(handle.temperature_c(), Err(CommunicationFailure));

        tx.send_modify(|s| s.last_reading = Some(Arc::new(reading_at(clock.now(), 112, 40.0))));
        assert!(handle.is_live());
        assert_eq!(handle.air_quality(), Ok(AirQuality::Fair));
        assert_eq!(handle.pm2_5_density(), Ok(40.0));
        assert_eq!(handle.pm10_density(), Ok(42.0));
        assert_eq!(handle.voc_density(), Ok(None));
        assert_eq!(handle.humidity(), Ok(54.0));
        assert_eq!(handle.identity().address, "10.0.0.5");
    }
}
