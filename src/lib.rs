//! Poller and AQI transform for PurpleAir sensors on the local network.
//!
//! Each configured sensor gets its own [`Poller`](poller::Poller), which
//! fetches `http://<sensor>/json` on a fixed interval, turns the payload into
//! a calibrated [`Reading`](models::Reading), and tracks whether the sensor
//! is live or stale. Consumers read metrics through a
//! [`SensorHandle`](poller::SensorHandle); once a sensor goes stale every
//! accessor returns [`CommunicationFailure`](error::CommunicationFailure)
//! instead of a value.
//!
//! Module boundaries follow the gateway style used throughout: siblings talk
//! through what each `mod.rs` re-exports.

pub mod aqi;
pub mod config;
pub mod error;
pub mod models;
pub mod poller;
pub mod publisher;
pub mod routes;

pub use config::Config;
pub use error::{CommunicationFailure, PollError, TransformError, TransportError};
pub use models::{RawPayload, Reading};
