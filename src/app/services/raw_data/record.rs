//! Aligned record output
//!
//! A [`RawDataRecord`] is the product of one successful alignment pass: one
//! coherent sample instant with the aggregated, calibrated value of every
//! assigned sensor column.

use crate::app::models::RunTypeCategory;
use chrono::{DateTime, Utc};

/// The aggregated value extracted for one sensor assignment
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentValue {
    /// The sensor assignment's database id
    pub database_id: i64,

    /// The sensor type the assignment feeds
    pub sensor_type: String,

    /// The aggregated, calibrated value; `None` if all rows were missing
    pub value: Option<f64>,
}

/// One aligned record across all of a dataset's file streams
#[derive(Debug, Clone, PartialEq)]
pub struct RawDataRecord {
    /// The record's timestamp
    pub time: DateTime<Utc>,

    /// Raw run type from the core file's selected row
    pub run_type: String,

    /// Resolved category of the run type
    pub category: RunTypeCategory,

    /// Longitude; only extracted for measurement records
    pub longitude: Option<f64>,

    /// Latitude; only extracted for measurement records
    pub latitude: Option<f64>,

    /// One aggregated value per sensor assignment
    pub values: Vec<AssignmentValue>,
}

impl RawDataRecord {
    /// Whether this record is a real measurement
    pub fn is_measurement(&self) -> bool {
        self.category.is_measurement()
    }

    /// Whether this record is an internal calibration
    pub fn is_calibration(&self) -> bool {
        self.category == RunTypeCategory::InternalCalibration
    }

    /// Get the first usable value recorded for a sensor type
    pub fn sensor_value(&self, sensor_type: &str) -> Option<f64> {
        self.values
            .iter()
            .filter(|v| v.sensor_type == sensor_type)
            .find_map(|v| v.value)
    }
}
