//! Per-sensor polling loop.
//!
//! A [`Poller`] owns everything about one sensor: the source it fetches
//! from, the last good reading, and the schedule. It fetches immediately on
//! start, then every poll interval. A transport failure on a scheduled fetch
//! earns exactly one extra attempt after the request timeout; if that also
//! fails the regular cadence carries on. Invalid payloads are skipped without
//! a retry and leave the previous reading in place.
//!
//! Consumers never touch the poller directly once it runs. They hold a
//! [`SensorHandle`], which sees each new state through a watch channel.

mod clock;
mod handle;
mod source;
mod state;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{interval, sleep_until, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::error::PollError;
use crate::models::{Reading, TransformSettings};
use crate::publisher::Publisher;

pub use clock::{Clock, SystemClock};
pub use handle::SensorHandle;
pub use source::{HttpSource, SensorSource};
pub use state::{
    Liveness, PollerState, SensorIdentity, Timings, DEFAULT_POLL_INTERVAL,
    DEFAULT_REQUEST_TIMEOUT, FALLBACK_NAME, MAX_DENSITY,
};

// ---

/// Why a fetch is happening.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchTrigger {
    Scheduled,
    Retry,
}

pub struct Poller<S, P, C = SystemClock> {
    source: S,
    publisher: P,
    clock: C,
    state: PollerState,
    updates: watch::Sender<PollerState>,
    reported_live: bool,
}

impl<S, P, C> Poller<S, P, C>
where
    S: SensorSource,
    P: Publisher,
    C: Clock,
{
    // ---
    pub fn new(
        identity: SensorIdentity,
        source: S,
        publisher: P,
        clock: C,
        timings: Timings,
        settings: TransformSettings,
    ) -> Self {
        // ---
        let state = PollerState::new(identity, clock.now(), timings, settings);
        let (updates, _) = watch::channel(state.clone());

        Self {
            source,
            publisher,
            clock,
            state,
            updates,
            reported_live: false,
        }
    }

    pub fn handle(&self) -> SensorHandle<C> {
        SensorHandle::new(self.updates.subscribe(), self.clock.clone())
    }

    pub fn state(&self) -> &PollerState {
        &self.state
    }

    pub fn is_stale(&self) -> bool {
        self.state.is_stale(self.clock.now())
    }

    pub fn is_live(&self) -> bool {
        self.state.is_live(self.clock.now())
    }

    /// One fetch/transform cycle.
    ///
    /// On success the new reading replaces the previous one and is handed to
    /// the publisher. On any error the state is left untouched.
    pub async fn fetch(&mut self) -> Result<Arc<Reading>, PollError> {
        // ---
        let payload = self.source.fetch().await?;

        let reading = payload.to_reading(
            &self.state.settings,
            self.clock.now(),
            self.clock.utc_now(),
        )?;
        let reading = Arc::new(reading);

        self.state.last_reading = Some(Arc::clone(&reading));
        self.updates.send_replace(self.state.clone());
        self.publisher
            .on_reading_updated(&self.state.identity, &reading);

        Ok(reading)
    }

    /// Fetch once, log the outcome, and return the delay until an early
    /// retry if one is due.
    pub async fn poll(&mut self, trigger: FetchTrigger) -> Option<Duration> {
        // ---
        let address = self.state.identity.address.clone();

        let retry = match self.fetch().await {
            Ok(reading) => {
                debug!("Updated sensor [{}] readings: {}", address, reading);
                None
            }
            Err(PollError::Transform(e)) => {
                info!("Skipping reading from sensor [{}]: {}", address, e);
                None
            }
            Err(PollError::Transport(e)) => {
                let timeout = self.state.timings.request_timeout;
                match trigger {
                    FetchTrigger::Scheduled => {
                        warn!(
                            "Unable to read sensor [{}]: {}, retrying in {:?}",
                            address, e, timeout
                        );
                        Some(timeout)
                    }
                    FetchTrigger::Retry => {
                        debug!(
                            "Retry of sensor [{}] failed: {}, waiting for next interval",
                            address, e
                        );
                        None
                    }
                }
            }
        };

        self.report_liveness();
        retry
    }

    fn report_liveness(&mut self) {
        // ---
        let live = self.is_live();
        if live != self.reported_live {
            self.reported_live = live;
            self.publisher
                .on_liveness_changed(&self.state.identity, live);
        }
    }

    /// Start polling until `shutdown` turns true or its sender is dropped.
    ///
    /// Records the start time, fetches immediately, then once per poll
    /// interval. Fetches never overlap. Shutdown is only observed between
    /// fetches, so one in-flight request may still run to its timeout.
    pub async fn start(mut self, mut shutdown: watch::Receiver<bool>) {
        // ---
        self.state.started_at = self.clock.now();
        self.updates.send_replace(self.state.clone());

        let timings = self.state.timings;
        info!(
            "Polling sensor [{}] every {:?} (timeout {:?})",
            self.state.identity.address, timings.poll_interval, timings.request_timeout
        );

        let mut ticker = interval(timings.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut retry_at: Option<Instant> = None;

        loop {
            if *shutdown.borrow_and_update() {
                break;
            }

            let trigger = tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
                _ = ticker.tick() => FetchTrigger::Scheduled,
                _ = sleep_until(retry_at.unwrap_or_else(Instant::now)), if retry_at.is_some() => {
                    FetchTrigger::Retry
                }
            };

            retry_at = self
                .poll(trigger)
                .await
                .map(|delay| Instant::now() + delay);
        }

        info!("Stopped polling sensor [{}]", self.state.identity.address);
    }
}
