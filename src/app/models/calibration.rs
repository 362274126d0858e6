//! Sensor calibration models
//!
//! Calibrations map raw sensor readings onto corrected values using
//! polynomial coefficient sets established during instrument deployment.
//! A dataset is processed against the most recent calibration set deployed
//! at or before its start time; extraction refuses to run without one.

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Polynomial calibration for a single target (sensor assignment)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorCalibration {
    /// The sensor assignment this calibration applies to
    pub target: i64,

    /// When the calibration was established
    pub deployment_date: DateTime<Utc>,

    /// Polynomial coefficients, constant term first
    pub coefficients: Vec<f64>,
}

impl SensorCalibration {
    /// Create a calibration
    pub fn new(target: i64, deployment_date: DateTime<Utc>, coefficients: Vec<f64>) -> Self {
        Self {
            target,
            deployment_date,
            coefficients,
        }
    }

    /// Apply the calibration polynomial to a raw value
    pub fn calibrate_value(&self, raw: f64) -> f64 {
        self.coefficients
            .iter()
            .enumerate()
            .map(|(power, coefficient)| coefficient * raw.powi(power as i32))
            .sum()
    }

    /// A calibration with no coefficients cannot be applied
    pub fn is_complete(&self) -> bool {
        !self.coefficients.is_empty()
    }
}

/// The set of sensor calibrations in force for a dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationSet {
    /// The instrument the calibrations belong to
    pub instrument_id: i64,

    /// Calibrations keyed by target sensor assignment
    pub calibrations: HashMap<i64, SensorCalibration>,
}

impl CalibrationSet {
    /// Create a calibration set from individual calibrations
    pub fn new(instrument_id: i64, calibrations: Vec<SensorCalibration>) -> Self {
        Self {
            instrument_id,
            calibrations: calibrations.into_iter().map(|c| (c.target, c)).collect(),
        }
    }

    /// Check whether the set contains a calibration for a target
    pub fn contains_target(&self, target: i64) -> bool {
        self.calibrations.contains_key(&target)
    }

    /// Calibrate a raw value.
    ///
    /// If no calibration exists for the target, the raw value is returned
    /// unchanged; uncalibrated sensors are legitimate.
    pub fn calibrate(&self, target: i64, raw: f64) -> f64 {
        match self.calibrations.get(&target) {
            Some(calibration) => calibration.calibrate_value(raw),
            None => raw,
        }
    }

    /// Check the set is usable for a dataset starting at the given time.
    ///
    /// Every calibration must be complete and deployed at or before the
    /// dataset start. An empty set is never valid.
    pub fn is_valid(&self, dataset_start: DateTime<Utc>) -> bool {
        !self.calibrations.is_empty()
            && self
                .calibrations
                .values()
                .all(|c| c.is_complete() && c.deployment_date <= dataset_start)
    }

    /// Validate the set, producing the extraction precondition error on
    /// failure
    pub fn check_valid(&self, dataset_start: DateTime<Utc>) -> Result<()> {
        if self.is_valid(dataset_start) {
            Ok(())
        } else {
            Err(Error::calibration_not_valid("Missing valid calibration"))
        }
    }
}
