//! Measurement models
//!
//! A measurement groups everything a data reduction routine needs for one
//! record: the timestamp, the run-type category, and one aggregated value
//! per sensor type. Measurements are immutable once built; QC flags on the
//! reduction output escalate separately.

use super::flag::Flag;
use super::instrument::RunTypeCategory;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The aggregated, calibrated value for one sensor type in one measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementValue {
    /// The sensor type the value belongs to
    pub sensor_type: String,

    /// The aggregated value; `None` if all contributing rows were missing
    pub calculated_value: Option<f64>,

    /// Combined QC flag of the contributing raw values
    pub flag: Flag,

    /// Ids of the stored sensor values this value was built from
    #[serde(default)]
    pub supporting_values: Vec<i64>,
}

impl MeasurementValue {
    /// Create a measurement value
    pub fn new(
        sensor_type: impl Into<String>,
        calculated_value: Option<f64>,
        flag: Flag,
        supporting_values: Vec<i64>,
    ) -> Self {
        Self {
            sensor_type: sensor_type.into(),
            calculated_value,
            flag,
            supporting_values,
        }
    }

    /// Whether the value is present and usable
    pub fn has_value(&self) -> bool {
        self.calculated_value.map(|v| !v.is_nan()).unwrap_or(false)
    }
}

/// One aligned record's worth of sensor values, ready for data reduction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// The dataset the measurement belongs to
    pub dataset_id: i64,

    /// Timestamp of the aligned record
    pub time: DateTime<Utc>,

    /// The raw run type from the core file
    pub run_type: String,

    /// The resolved run-type category
    pub category: RunTypeCategory,

    /// Longitude; only present for measurement categories
    pub longitude: Option<f64>,

    /// Latitude; only present for measurement categories
    pub latitude: Option<f64>,

    /// Aggregated values keyed by sensor type name
    pub values: HashMap<String, MeasurementValue>,
}

impl Measurement {
    /// Get the value for a sensor type, if one was recorded
    pub fn value(&self, sensor_type: &str) -> Option<&MeasurementValue> {
        self.values.get(sensor_type)
    }

    /// Get the calculated value for a sensor type, if present and usable
    pub fn calculated_value(&self, sensor_type: &str) -> Option<f64> {
        self.value(sensor_type)
            .filter(|v| v.has_value())
            .and_then(|v| v.calculated_value)
    }

    /// Whether the measurement carries a usable value for a sensor type
    pub fn has_value(&self, sensor_type: &str) -> bool {
        self.value(sensor_type).map(|v| v.has_value()).unwrap_or(false)
    }

    /// The combined QC flag across all values in the measurement
    pub fn combined_flag(&self) -> Flag {
        self.values
            .values()
            .fold(Flag::NotSet, |acc, v| acc.combined_with(v.flag))
    }
}
