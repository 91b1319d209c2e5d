//! Data models for the sensor pipeline.
//!
//! Gateway for the raw `/json` payload and the calibrated [`Reading`]
//! derived from it. Siblings only see what is re-exported here.

mod payload;
mod reading;

pub use payload::{model_for_hardware, RawPayload, RequiredFields, INDOOR_PLACE, UNKNOWN_MODEL};
pub use reading::{round2, AqiConversion, Reading, TransformSettings};
