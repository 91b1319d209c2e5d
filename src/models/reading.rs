//! Calibrated reading derived from one raw payload.

use std::fmt;

use chrono::{DateTime, Utc};
use tokio::time::Instant;

use super::payload::{channel_mean, RawPayload};
use crate::aqi::{epa_aqi, raw_aqi};
use crate::error::TransformError;

// ---

/// Self-heating bias of the on-board humidity sensor, in percentage points.
const HUMIDITY_CORRECTION: f64 = 4.0;

/// Self-heating bias of the on-board temperature sensor, in °F.
const TEMPERATURE_CORRECTION_F: f64 = -8.0;

/// How AQI is derived from a payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AqiConversion {
    /// Use the sensor's own `pm2.5_aqi` fields.
    #[default]
    Raw,
    /// EPA wildfire-corrected PM2.5 through the breakpoint table.
    UsEpa,
}

impl AqiConversion {
    /// `US_EPA` selects the EPA correction; any other value means raw.
    pub fn from_config(value: &str) -> Self {
        match value.trim() {
            "US_EPA" => AqiConversion::UsEpa,
            _ => AqiConversion::Raw,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AqiConversion::Raw => "raw",
            AqiConversion::UsEpa => "US_EPA",
        }
    }
}

/// Options that shape the transform and what gets reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransformSettings {
    pub conversion: AqiConversion,

    /// Report the AQI number where a PM2.5 density is expected.
    pub aqi_instead_of_density: bool,
}

/// Immutable snapshot of one successful poll.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    // ---
    pub captured_at: Instant,
    pub captured_at_utc: DateTime<Utc>,
    pub display_name: String,
    pub model: &'static str,
    pub sensor_id: Option<String>,
    pub firmware_version: Option<String>,
    /// µg/m³
    pub pm2_5: f64,
    /// µg/m³
    pub pm10: f64,
    /// Percent, corrected.
    pub humidity: f64,
    pub temperature_c: f64,
    pub voc: Option<f64>,
    /// Whole number with US EPA conversion; with raw conversion the sensor's
    /// value, or the unrounded mean of both channels.
    pub aqi: f64,
}

impl RawPayload {
    // ---
    /// Validate the payload and derive a calibrated [`Reading`] from it.
    ///
    /// Indoor sensors (`place == "inside"`) report from the CF=1 fields,
    /// outdoor ones from the ATM fields. Either way channel B is averaged in
    /// when present.
    pub fn to_reading(
        &self,
        settings: &TransformSettings,
        captured_at: Instant,
        captured_at_utc: DateTime<Utc>,
    ) -> Result<Reading, TransformError> {
        // ---
        let required = self.validate()?;

        let (pm2_5, pm10) = if self.is_indoor() {
            (
                channel_mean(required.pm2_5_cf_1, self.pm2_5_cf_1_b),
                channel_mean(required.pm10_0_cf_1, self.pm10_0_cf_1_b),
            )
        } else {
            (
                channel_mean(required.pm2_5_atm, self.pm2_5_atm_b),
                channel_mean(required.pm10_0_atm, self.pm10_0_atm_b),
            )
        };
        let pm2_5 = round2(pm2_5);
        let pm10 = round2(pm10);

        let humidity = required.current_humidity + HUMIDITY_CORRECTION;
        let temperature_c = round2(fahrenheit_to_celsius(
            required.current_temp_f + TEMPERATURE_CORRECTION_F,
        ));

        let aqi = match settings.conversion {
            AqiConversion::Raw => raw_aqi(required.pm2_5_aqi, self.pm2_5_aqi_b),
            AqiConversion::UsEpa => f64::from(epa_aqi(pm2_5, humidity)),
        };

        Ok(Reading {
            captured_at,
            captured_at_utc,
            display_name: self.display_name(),
            model: self.model(),
            sensor_id: self.sensor_id.clone(),
            firmware_version: self.firmware_version.clone(),
            pm2_5,
            pm10,
            humidity,
            temperature_c,
            voc: self.voc,
            aqi,
        })
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AQI={}, PM2.5={}µg/m³, Humidity={}%, Temperature={}°C",
            self.aqi, self.pm2_5, self.humidity, self.temperature_c
        )
    }
}

/// Round half away from zero to 2 decimals, nudged by epsilon so values
/// like 1.005 land on the expected side.
pub fn round2(value: f64) -> f64 {
    ((value + f64::EPSILON) * 100.0).round() / 100.0
}

fn fahrenheit_to_celsius(fahrenheit: f64) -> f64 {
    (fahrenheit - 32.0) * 5.0 / 9.0
}
