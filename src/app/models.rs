//! Data models for the pCO₂ processor
//!
//! This module contains the core data structures for instruments, datasets,
//! calibrations, measurements and QC flags. Everything here is pure data:
//! behaviour lives in the services that consume these types.

pub mod calibration;
pub mod dataset;
pub mod flag;
pub mod instrument;
pub mod measurement;

// Re-export the commonly used types
pub use calibration::{CalibrationSet, SensorCalibration};
pub use dataset::{Dataset, DatasetMessage, DatasetStatus, SensorValue};
pub use flag::Flag;
pub use instrument::{
    FileDefinition, Instrument, RunTypeAssignment, RunTypeCategory, SensorAssignment, SensorType,
    Variable,
};
pub use measurement::{Measurement, MeasurementValue};
