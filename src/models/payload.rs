//! The sensor's `/json` document, decoded into typed fields.
//!
//! PurpleAir firmware is not consistent about value types between revisions,
//! so numeric fields are decoded leniently: numbers and numeric strings are
//! accepted, everything else counts as NaN and reads back as `None`.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::TransformError;

// ---

/// `place` value reported by sensors mounted indoors.
pub const INDOOR_PLACE: &str = "inside";

/// Model reported for hardware strings not in the table.
pub const UNKNOWN_MODEL: &str = "Unknown";

/// Raw payload as served by `GET http://<sensor>/json`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPayload {
    // ---
    #[serde(rename = "SensorId", default, deserialize_with = "lenient_string")]
    pub sensor_id: Option<String>,

    #[serde(rename = "Geo", default, deserialize_with = "lenient_string")]
    pub geo: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub place: Option<String>,

    #[serde(rename = "version", default, deserialize_with = "lenient_string")]
    pub firmware_version: Option<String>,

    #[serde(
        rename = "hardwarediscovered",
        default,
        deserialize_with = "lenient_string"
    )]
    pub hardware_discovered: Option<String>,

    #[serde(rename = "pm2.5_aqi", default, deserialize_with = "lenient_f64")]
    pub pm2_5_aqi: Option<f64>,

    #[serde(rename = "pm2.5_aqi_b", default, deserialize_with = "lenient_f64")]
    pub pm2_5_aqi_b: Option<f64>,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub pm2_5_atm: Option<f64>,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub pm2_5_atm_b: Option<f64>,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub pm2_5_cf_1: Option<f64>,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub pm2_5_cf_1_b: Option<f64>,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub pm10_0_atm: Option<f64>,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub pm10_0_atm_b: Option<f64>,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub pm10_0_cf_1: Option<f64>,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub pm10_0_cf_1_b: Option<f64>,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub current_temp_f: Option<f64>,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub current_humidity: Option<f64>,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub voc: Option<f64>,
}

/// The required numeric fields of a payload that passed validation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RequiredFields {
    pub pm2_5_aqi: f64,
    pub pm2_5_atm: f64,
    pub pm2_5_cf_1: f64,
    pub pm10_0_atm: f64,
    pub pm10_0_cf_1: f64,
    pub current_temp_f: f64,
    pub current_humidity: f64,
}

impl RawPayload {
    // ---
    /// Decode a payload from a JSON value already read off the wire.
    pub fn from_json(value: Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }

    /// Names of required fields that are absent or NaN, in wire spelling.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        // ---
        [
            ("pm2.5_aqi", self.pm2_5_aqi),
            ("pm2_5_atm", self.pm2_5_atm),
            ("pm2_5_cf_1", self.pm2_5_cf_1),
            ("pm10_0_atm", self.pm10_0_atm),
            ("pm10_0_cf_1", self.pm10_0_cf_1),
            ("current_temp_f", self.current_temp_f),
            ("current_humidity", self.current_humidity),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_none())
        .map(|(name, _)| name)
        .collect()
    }

    pub fn is_invalid(&self) -> bool {
        !self.missing_fields().is_empty()
    }

    /// Check every required field, returning them unwrapped.
    pub fn validate(&self) -> Result<RequiredFields, TransformError> {
        // ---
        match (
            self.pm2_5_aqi,
            self.pm2_5_atm,
            self.pm2_5_cf_1,
            self.pm10_0_atm,
            self.pm10_0_cf_1,
            self.current_temp_f,
            self.current_humidity,
        ) {
            (
                Some(pm2_5_aqi),
                Some(pm2_5_atm),
                Some(pm2_5_cf_1),
                Some(pm10_0_atm),
                Some(pm10_0_cf_1),
                Some(current_temp_f),
                Some(current_humidity),
            ) => Ok(RequiredFields {
                pm2_5_aqi,
                pm2_5_atm,
                pm2_5_cf_1,
                pm10_0_atm,
                pm10_0_cf_1,
                current_temp_f,
                current_humidity,
            }),
            _ => Err(TransformError::InvalidReading {
                fields: self.missing_fields(),
            }),
        }
    }

    pub fn is_indoor(&self) -> bool {
        self.place.as_deref() == Some(INDOOR_PLACE)
    }

    pub fn has_voc(&self) -> bool {
        self.voc.is_some()
    }

    /// `"<Geo> (<place>)"`, falling back to `PurpleAir` without a geo name.
    pub fn display_name(&self) -> String {
        // ---
        let geo = self.geo.as_deref().unwrap_or("PurpleAir");
        match self.place.as_deref() {
            Some(place) => format!("{geo} ({place})"),
            None => geo.to_string(),
        }
    }

    pub fn model(&self) -> &'static str {
        self.hardware_discovered
            .as_deref()
            .map(model_for_hardware)
            .unwrap_or(UNKNOWN_MODEL)
    }
}

/// Mean of both channels when the second one is reported, else channel A.
pub fn channel_mean(a: f64, b: Option<f64>) -> f64 {
    match b {
        Some(b) => (a + b) / 2.0,
        None => a,
    }
}

/// Map a `hardwarediscovered` string onto a PurpleAir model name.
///
/// `+NO-DISK` and the SD card size in `+OPENLOG+<n> MB` vary per unit and
/// are removed before the lookup.
pub fn model_for_hardware(hardware: &str) -> &'static str {
    // ---
    match normalize_hardware(hardware).as_str() {
        "2.0+BME280+PMSX003-A" => "PA-I",
        "2.0+BME280+PMSX003-B+PMSX003-A" => "PA-II",
        "2.0+OPENLOG+DS3231+BME280+PMSX003-B+PMSX003-A" => "PA-II-SD",
        "3.0+BME68X+KX122+PMSX003-A" => "PA-I-LED",
        "3.0+OPENLOG+RV3028+BME68X+PMSX003-A+PMSX003-B" => "PA-II-FLEX",
        _ => UNKNOWN_MODEL,
    }
}

fn normalize_hardware(hardware: &str) -> String {
    // ---
    const OPENLOG: &str = "+OPENLOG";

    let mut normalized = hardware.replacen("+NO-DISK", "", 1);

    if let Some(start) = normalized.find("+OPENLOG+") {
        let size_start = start + OPENLOG.len() + 1;
        let rest = &normalized[size_start..];
        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();

        if digits > 0 && rest[digits..].starts_with(" MB") {
            let size_end = size_start + digits + " MB".len();
            normalized.replace_range(start + OPENLOG.len()..size_end, "");
        }
    }

    normalized
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    // ---
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite()))
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    // ---
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
