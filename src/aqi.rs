//! Air Quality Index math.
//!
//! Two pieces live here: the EPA wildfire correction for PurpleAir PM2.5
//! readings, and the EPA breakpoint table that turns a concentration into an
//! AQI number.

use serde::Serialize;

// ---

/// One row of the EPA PM2.5 breakpoint table.
struct Breakpoint {
    /// Lower exclusive bound on concentration selecting this row.
    above: f64,
    aqi_high: f64,
    aqi_low: f64,
    bp_high: f64,
    bp_low: f64,
}

#[rustfmt::skip]
const BREAKPOINTS: [Breakpoint; 6] = [
    Breakpoint { above: 350.5, aqi_high: 500.0, aqi_low: 401.0, bp_high: 500.0, bp_low: 350.5 },
    Breakpoint { above: 250.5, aqi_high: 400.0, aqi_low: 301.0, bp_high: 350.4, bp_low: 250.5 },
    Breakpoint { above: 150.5, aqi_high: 300.0, aqi_low: 201.0, bp_high: 250.4, bp_low: 150.5 },
    Breakpoint { above: 55.5, aqi_high: 200.0, aqi_low: 151.0, bp_high: 150.4, bp_low: 55.5 },
    Breakpoint { above: 35.5, aqi_high: 150.0, aqi_low: 101.0, bp_high: 55.4, bp_low: 35.5 },
    Breakpoint { above: 12.1, aqi_high: 100.0, aqi_low: 51.0, bp_high: 35.4, bp_low: 12.1 },
];

const GOOD: Breakpoint = Breakpoint {
    above: 0.0,
    aqi_high: 50.0,
    aqi_low: 0.0,
    bp_high: 12.0,
    bp_low: 0.0,
};

/// Convert a PM2.5 concentration (µg/m³) to an AQI number.
///
/// Linear interpolation within the matching breakpoint row:
/// `round((Ih - Il) / (BPh - BPl) * (Cp - BPl) + Il)`.
/// Negative concentrations map to 0.
pub fn pm_to_aqi(pm: f64) -> u32 {
    // ---
    let row = match BREAKPOINTS.iter().find(|row| pm > row.above) {
        Some(row) => row,
        None if pm >= GOOD.above => &GOOD,
        None => return 0,
    };

    let aqi = (row.aqi_high - row.aqi_low) / (row.bp_high - row.bp_low) * (pm - row.bp_low)
        + row.aqi_low;

    aqi.round().max(0.0) as u32
}

/// EPA wildfire-corrected PM2.5 for PurpleAir sensors.
///
/// Five segments keyed on the uncorrected PM2.5. The 30–50 and 210–260
/// segments blend their neighbours' coefficients so the curve has no jumps.
/// Negative input yields 0.
pub fn epa_corrected_pm2_5(pm25: f64, humidity: f64) -> f64 {
    // ---
    if pm25 < 0.0 {
        0.0
    } else if pm25 < 30.0 {
        0.524 * pm25 - 0.0862 * humidity + 5.75
    } else if pm25 < 50.0 {
        let t = pm25 / 20.0 - 3.0 / 2.0;
        (0.786 * t + 0.524 * (1.0 - t)) * pm25 - 0.0862 * humidity + 5.75
    } else if pm25 < 210.0 {
        0.786 * pm25 - 0.0862 * humidity + 5.75
    } else if pm25 < 260.0 {
        let t = pm25 / 50.0 - 21.0 / 5.0;
        (0.69 * t + 0.786 * (1.0 - t)) * pm25 - 0.0862 * humidity * (1.0 - t)
            + 2.966 * t
            + 5.75 * (1.0 - t)
            + 8.84e-4 * pm25.powi(2) * t
    } else {
        2.966 + 0.69 * pm25 + 8.84e-4 * pm25.powi(2)
    }
}

/// AQI computed from an EPA-corrected PM2.5 value.
pub fn epa_aqi(pm25: f64, humidity: f64) -> u32 {
    pm_to_aqi(epa_corrected_pm2_5(pm25, humidity))
}

/// AQI as reported by the sensor, averaging channel B when present.
///
/// The mean is kept as is; the sensor's own precision is all it gets.
pub fn raw_aqi(aqi: f64, aqi_b: Option<f64>) -> f64 {
    match aqi_b {
        Some(b) => (aqi + b) / 2.0,
        None => aqi,
    }
}

/// Coarse air quality bucket derived from AQI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AirQuality {
    Unknown,
    Excellent,
    Good,
    Fair,
    Inferior,
    Poor,
}

impl AirQuality {
    pub fn from_aqi(aqi: f64) -> Self {
        if aqi < 50.0 {
            AirQuality::Excellent
        } else if aqi < 100.0 {
            AirQuality::Good
        } else if aqi < 150.0 {
            AirQuality::Fair
        } else if aqi < 200.0 {
            AirQuality::Inferior
        } else {
            AirQuality::Poor
        }
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_breakpoint_rows() {
        // ---
        assert_eq!(pm_to_aqi(0.0), 0);
        assert_eq!(pm_to_aqi(12.0), 50);
        assert_eq!(pm_to_aqi(12.1), 50);
        assert_eq!(pm_to_aqi(35.4), 100);
        assert_eq!(pm_to_aqi(35.6), 101);
        assert_eq!(pm_to_aqi(55.4), 150);
        assert_eq!(pm_to_aqi(150.4), 200);
        assert_eq!(pm_to_aqi(250.4), 300);
        assert_eq!(pm_to_aqi(350.4), 400);
        assert_eq!(pm_to_aqi(500.0), 500);
    }

    #[test]
    fn test_negative_concentration_is_zero() {
        // ---
        assert_eq!(pm_to_aqi(-3.0), 0);
        assert_eq!(epa_corrected_pm2_5(-1.0, 50.0), 0.0);
    }

    #[test]
    fn test_correction_segments() {
        // ---
        let close = |a: f64, b: f64| (a - b).abs() < 1e-9;

        // [0, 30)
        assert!(close(epa_corrected_pm2_5(10.0, 50.0), 5.24 - 4.31 + 5.75));
        // [30, 50) at its midpoint blends 0.524 and 0.786 evenly
        assert!(close(epa_corrected_pm2_5(40.0, 54.0), 0.655 * 40.0 - 0.0862 * 54.0 + 5.75));
        // [50, 210)
        assert!(close(epa_corrected_pm2_5(100.0, 50.0), 78.6 - 4.31 + 5.75));
        // [260, ∞) ignores humidity
        assert_eq!(epa_corrected_pm2_5(300.0, 10.0), epa_corrected_pm2_5(300.0, 90.0));
    }

    #[test]
    fn test_correction_is_continuous_at_segment_edges() {
        // ---
        for humidity in [0.0, 35.0, 70.0, 100.0] {
            for edge in [30.0, 50.0, 210.0, 260.0] {
                let below = epa_corrected_pm2_5(edge - 1e-9, humidity);
                let at = epa_corrected_pm2_5(edge, humidity);
                assert!(
                    (at - below).abs() < 1e-6,
                    "jump at {edge} µg/m³ with {humidity}% humidity: {below} -> {at}"
                );
            }
        }
    }

    #[test]
    fn test_epa_aqi_is_monotonic() {
        // ---
        for humidity in [0.0, 25.0, 54.0, 80.0, 100.0] {
            let mut previous = 0;
            for step in 0..=2400 {
                let pm25 = step as f64 * 0.25;
                let aqi = epa_aqi(pm25, humidity);
                assert!(
                    aqi >= previous,
                    "AQI dropped from {previous} to {aqi} at {pm25} µg/m³, {humidity}% humidity"
                );
                previous = aqi;
            }
        }
    }

    #[test]
    fn test_epa_scenario_outdoor_40() {
        // ---
        // Corrected PM2.5 is 27.2952, which lands in the 12.1–35.4 row.
        assert_eq!(epa_aqi(40.0, 54.0), 83);
    }

    #[test]
    fn test_raw_aqi_averages_channels() {
        // ---
        assert_eq!(raw_aqi(112.0, None), 112.0);
        assert_eq!(raw_aqi(112.0, Some(116.0)), 114.0);
        assert_eq!(raw_aqi(112.0, Some(113.0)), 112.5);
    }

    #[test]
    fn test_raw_aqi_mean_is_not_rounded_into_next_bucket() {
        // ---
        let aqi = raw_aqi(49.0, Some(50.0));
        assert_eq!(aqi, 49.5);
        assert_eq!(AirQuality::from_aqi(aqi), AirQuality::Excellent);

        assert_eq!(AirQuality::from_aqi(raw_aqi(99.0, Some(100.0))), AirQuality::Good);
    }

    #[test]
    fn test_air_quality_buckets() {
        // ---
        assert_eq!(AirQuality::from_aqi(0.0), AirQuality::Excellent);
        assert_eq!(AirQuality::from_aqi(49.9), AirQuality::Excellent);
        assert_eq!(AirQuality::from_aqi(50.0), AirQuality::Good);
        assert_eq!(AirQuality::from_aqi(100.0), AirQuality::Fair);
        assert_eq!(AirQuality::from_aqi(150.0), AirQuality::Inferior);
        assert_eq!(AirQuality::from_aqi(199.5), AirQuality::Inferior);
        assert_eq!(AirQuality::from_aqi(200.0), AirQuality::Poor);
    }
}
