//! Error taxonomy for the poller and the reading transform.
//!
//! None of these are fatal. `InvalidReading` and transport failures are
//! recovered inside the poll loop; `CommunicationFailure` is the only one a
//! consumer ever sees, and only through the metric accessors.

use thiserror::Error;

// ---

/// The payload decoded but one or more required numeric fields were
/// missing or not a number.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    #[error("invalid reading, missing or NaN fields: {}", .fields.join(", "))]
    InvalidReading { fields: Vec<&'static str> },
}

/// The sensor could not be reached or did not answer with a JSON document.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connect error, timeout, or a body that is not valid JSON.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The sensor answered with a non-success status code.
    #[error("sensor answered with HTTP {0}")]
    Status(u16),
}

impl TransportError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Request(e) if e.is_timeout())
    }
}

/// Outcome of a single failed poll cycle.
#[derive(Debug, Error)]
pub enum PollError {
    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl PollError {
    /// Transport failures earn one early retry; invalid payloads do not.
    pub fn is_transport(&self) -> bool {
        matches!(self, PollError::Transport(_))
    }
}

/// The sensor is stale; its values must be treated as unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("sensor is not responding")]
pub struct CommunicationFailure;

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_invalid_reading_lists_fields() {
        // ---
        let err = TransformError::InvalidReading {
            fields: vec!["current_humidity", "pm2_5_atm"],
        };
        assert_eq!(
            err.to_string(),
            "invalid reading, missing or NaN fields: current_humidity, pm2_5_atm"
        );
    }

    #[test]
    fn test_only_transport_errors_are_retryable() {
        // ---
        let transform: PollError = TransformError::InvalidReading { fields: vec![] }.into();
        let transport: PollError = TransportError::Status(503).into();

        assert!(!transform.is_transport());
        assert!(transport.is_transport());
        assert!(!TransportError::Status(504).is_timeout());
    }
}
