//! Configuration loader for the `purpleair-sensorflow` service.
//!
//! All runtime configuration values and their defaults live here, loaded
//! from environment variables (with optional `.env` file support provided by
//! the caller). The rest of the crate receives typed values and never calls
//! `env::var` itself.

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};

use crate::models::{AqiConversion, TransformSettings};
use crate::poller::{SensorIdentity, Timings};

/// Parse an optional positive integer variable with a default value.
macro_rules! parse_secs {
    ($lookup:expr, $var_name:expr, $default:expr) => {
        match $lookup($var_name) {
            None => $default,
            Some(v) => match v.trim().parse::<u64>() {
                Ok(0) => bail!("Invalid {}: must be greater than zero", $var_name),
                Ok(secs) => Duration::from_secs(secs),
                Err(e) => bail!("Invalid {}: {}", $var_name, e),
            },
        }
    };
}

/// Parse a required string variable.
macro_rules! require_env {
    ($lookup:expr, $var_name:expr) => {
        $lookup($var_name)
            .ok_or_else(|| anyhow!("{} must be set in .env or environment", $var_name))?
    };
}

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// Sensors to poll, in configuration order.
    pub sensors: Vec<SensorIdentity>,

    /// How AQI is computed.
    pub conversion: AqiConversion,

    /// Report AQI in place of PM2.5 density.
    pub aqi_instead_of_density: bool,

    /// Time between scheduled fetches.
    pub poll_interval: Duration,

    /// Upper bound on one request to a sensor.
    pub request_timeout: Duration,

    /// Bind address of the status API.
    pub listen_addr: SocketAddr,
}

/// Load configuration from environment variables with defaults.
///
/// Required:
/// - `PURPLEAIR_SENSORS` – comma-separated `address[=Display Name]` list
///
/// Optional:
/// - `AQI_CONVERSION` – `US_EPA` for EPA-corrected AQI (default: raw)
/// - `AQI_INSTEAD_OF_DENSITY` – `1|true|yes` to report AQI as PM2.5 (default: false)
/// - `POLL_INTERVAL_SECS` – seconds between fetches (default: 60)
/// - `REQUEST_TIMEOUT_SECS` – request timeout in seconds (default: 15)
/// - `LISTEN_ADDR` – status API bind address (default: `0.0.0.0:8080`)
///
/// Returns an error if any required variable is missing or invalid.
pub fn load_from_env() -> Result<Config> {
    load_from(|name| env::var(name).ok())
}

/// Same as [`load_from_env`] but reading variables through `lookup`.
pub fn load_from<F>(lookup: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    // ---
    let sensors = parse_sensors(&require_env!(lookup, "PURPLEAIR_SENSORS"))?;
    let conversion = lookup("AQI_CONVERSION")
        .map(|v| AqiConversion::from_config(&v))
        .unwrap_or_default();
    let aqi_instead_of_density = lookup("AQI_INSTEAD_OF_DENSITY")
        .map(|v| parse_flag(&v))
        .unwrap_or(false);
    let poll_interval = parse_secs!(lookup, "POLL_INTERVAL_SECS", Timings::default().poll_interval);
    let request_timeout = parse_secs!(
        lookup,
        "REQUEST_TIMEOUT_SECS",
        Timings::default().request_timeout
    );
    let listen_addr = match lookup("LISTEN_ADDR") {
        Some(v) => v
            .trim()
            .parse::<SocketAddr>()
            .map_err(|e| anyhow!("Invalid LISTEN_ADDR '{}': {}", v, e))?,
        None => SocketAddr::from(([0, 0, 0, 0], 8080)),
    };

    Ok(Config {
        sensors,
        conversion,
        aqi_instead_of_density,
        poll_interval,
        request_timeout,
        listen_addr,
    })
}

/// Parse `address[=Display Name]` entries separated by commas.
///
/// Blank entries are skipped; an empty list or a repeated address is an
/// error.
pub fn parse_sensors(list: &str) -> Result<Vec<SensorIdentity>> {
    // ---
    let mut sensors: Vec<SensorIdentity> = Vec::new();

    for entry in list.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (address, name) = match entry.split_once('=') {
            Some((address, name)) => (address.trim(), Some(name.trim())),
            None => (entry, None),
        };

        if address.is_empty() {
            bail!("Invalid sensor entry '{}': missing address", entry);
        }
        if sensors.iter().any(|s| s.address == address) {
            bail!("Sensor {} is configured more than once", address);
        }

        let name = name.filter(|n| !n.is_empty()).map(str::to_string);
        sensors.push(SensorIdentity::new(address, name));
    }

    if sensors.is_empty() {
        bail!("PURPLEAIR_SENSORS does not list any sensor");
    }

    Ok(sensors)
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}

impl Config {
    // ---
    pub fn timings(&self) -> Timings {
        Timings {
            poll_interval: self.poll_interval,
            request_timeout: self.request_timeout,
        }
    }

    pub fn transform_settings(&self) -> TransformSettings {
        TransformSettings {
            conversion: self.conversion,
            aqi_instead_of_density: self.aqi_instead_of_density,
        }
    }

    /// Log the loaded configuration for debugging purposes.
    pub fn log_config(&self) {
        // ---
        tracing::info!("Configuration loaded:");
        for sensor in &self.sensors {
            tracing::info!(
                "  SENSOR                 : {} ({})",
                sensor.address,
                sensor.display_name.as_deref().unwrap_or("name from sensor")
            );
        }
        tracing::info!("  AQI_CONVERSION         : {}", self.conversion.as_str());
        tracing::info!("  AQI_INSTEAD_OF_DENSITY : {}", self.aqi_instead_of_density);
        tracing::info!("  POLL_INTERVAL_SECS     : {}", self.poll_interval.as_secs());
        tracing::info!("  REQUEST_TIMEOUT_SECS   : {}", self.request_timeout.as_secs());
        tracing::info!("  LISTEN_ADDR            : {}", self.listen_addr);
    }
}
