//! The data reducer contract and its output record
//!
//! A reducer is a stateless function from an aligned measurement to a set
//! of named derived values. The shared [`perform_calculation`] wrapper
//! enforces the missing-input policy: a measurement lacking a required
//! sensor type produces NaN outputs and a needs-flag QC state, never an
//! error.
//!
//! [`perform_calculation`]: DataReducer::perform_calculation

use crate::app::models::{Flag, Instrument, Measurement, Variable};
use crate::constants::PARAMETER_ID_BASE;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Static metadata describing one output column of a reducer
#[derive(Debug, Clone, PartialEq)]
pub struct CalculationParameter {
    /// Unique parameter id, derived from the variable id and the
    /// parameter's position
    pub id: i64,

    /// Short display name, e.g. "fCO₂"
    pub name: String,

    /// Full descriptive name, e.g. "fCO₂ In Water"
    pub long_name: String,

    /// Export column code
    pub code: String,

    /// Units of the computed value
    pub units: String,

    /// Whether the parameter is a published result (as opposed to an
    /// intermediate calculation column)
    pub is_result: bool,
}

impl CalculationParameter {
    pub fn new(
        id: i64,
        name: impl Into<String>,
        long_name: impl Into<String>,
        code: impl Into<String>,
        units: impl Into<String>,
        is_result: bool,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            long_name: long_name.into(),
            code: code.into(),
            units: units.into(),
            is_result,
        }
    }
}

/// Build a parameter id from a variable id and the parameter's sequence
/// position
pub fn make_parameter_id(variable_id: i64, sequence: i64) -> i64 {
    variable_id * PARAMETER_ID_BASE + sequence
}

/// Recover the owning variable id from a parameter id
pub fn variable_id_for_parameter(parameter_id: i64) -> i64 {
    parameter_id / PARAMETER_ID_BASE
}

/// Recover the parameter sequence position from a parameter id
pub fn parameter_sequence(parameter_id: i64) -> i64 {
    parameter_id % PARAMETER_ID_BASE
}

/// The output of one reducer invocation for one measurement
#[derive(Debug, Clone, PartialEq)]
pub struct DataReductionRecord {
    /// Timestamp of the measurement the record was computed from
    pub measurement_time: DateTime<Utc>,

    /// The variable the record belongs to
    pub variable_id: i64,

    /// Ordered names of the parameters this record may hold
    parameter_names: Vec<String>,

    /// Computed values keyed by parameter name
    values: HashMap<String, f64>,

    /// Accumulated QC flag; only ever escalates
    qc_flag: Flag,

    /// QC messages accumulated alongside the flag
    qc_messages: Vec<String>,
}

impl DataReductionRecord {
    /// Create an empty record for a measurement and a variable's parameter
    /// set
    pub fn new(
        measurement: &Measurement,
        variable: &Variable,
        parameters: &[CalculationParameter],
    ) -> Self {
        Self {
            measurement_time: measurement.time,
            variable_id: variable.id,
            parameter_names: parameters.iter().map(|p| p.name.clone()).collect(),
            values: HashMap::new(),
            qc_flag: Flag::NotSet,
            qc_messages: Vec::new(),
        }
    }

    /// Store a computed value. The parameter must belong to the variable's
    /// declared parameter set.
    pub fn put(&mut self, parameter: &str, value: f64) -> Result<()> {
        if !self.parameter_names.iter().any(|n| n == parameter) {
            return Err(Error::data_reduction(format!(
                "Unknown calculation parameter '{parameter}'"
            )));
        }

        self.values.insert(parameter.to_string(), value);
        Ok(())
    }

    /// Get a computed value by parameter name
    pub fn value(&self, parameter: &str) -> Option<f64> {
        self.values.get(parameter).copied()
    }

    /// The record's accumulated QC flag
    pub fn qc_flag(&self) -> Flag {
        self.qc_flag
    }

    /// The record's QC messages
    pub fn qc_messages(&self) -> &[String] {
        &self.qc_messages
    }

    /// Apply a QC flag with a message. The stored flag only escalates.
    pub fn set_qc(&mut self, flag: Flag, message: impl Into<String>) {
        self.qc_flag = self.qc_flag.combined_with(flag);

        let message = message.into();
        if !message.is_empty() && !self.qc_messages.contains(&message) {
            self.qc_messages.push(message);
        }
    }

    /// Mark every declared parameter NaN and flag the record for manual
    /// attention
    fn mark_missing_inputs(&mut self, missing: &[&str]) {
        for name in self.parameter_names.clone() {
            self.values.insert(name, f64::NAN);
        }

        self.set_qc(
            Flag::NeedsFlag,
            format!("Missing required sensor values: {}", missing.join(", ")),
        );
    }
}

/// A data reduction routine for one variable
pub trait DataReducer: std::fmt::Debug {
    /// The variable this reducer computes
    fn variable(&self) -> &Variable;

    /// Sensor type names that must be present in a measurement before the
    /// calculation can run
    fn required_type_names(&self) -> &[&str];

    /// The fixed, ordered output parameter metadata
    fn calculation_parameters(&self) -> &[CalculationParameter];

    /// Compute the derived values for a measurement.
    ///
    /// Only called when every required input is present; implementations
    /// write their outputs into `record`.
    fn do_calculation(
        &self,
        instrument: &Instrument,
        measurement: &Measurement,
        record: &mut DataReductionRecord,
    ) -> Result<()>;

    /// Run the reduction for a measurement, enforcing the missing-input
    /// policy.
    ///
    /// A measurement without every required sensor value yields a record
    /// with NaN outputs and a [`Flag::NeedsFlag`] QC state.
    fn perform_calculation(
        &self,
        instrument: &Instrument,
        measurement: &Measurement,
    ) -> Result<DataReductionRecord> {
        let mut record =
            DataReductionRecord::new(measurement, self.variable(), self.calculation_parameters());

        let missing: Vec<&str> = self
            .required_type_names()
            .iter()
            .copied()
            .filter(|name| !measurement.has_value(name))
            .collect();

        if !missing.is_empty() {
            record.mark_missing_inputs(&missing);
            return Ok(record);
        }

        self.do_calculation(instrument, measurement, &mut record)?;

        if record.qc_flag() == Flag::NotSet {
            record.set_qc(Flag::Good, "");
        }

        Ok(record)
    }
}

/// Pull a required input out of a measurement.
///
/// Reducer implementations call this after `perform_calculation` has
/// verified presence, so absence here indicates a coding fault in the
/// reducer's required-type list.
pub fn required_value(measurement: &Measurement, sensor_type: &str) -> Result<f64> {
    measurement.calculated_value(sensor_type).ok_or_else(|| {
        Error::data_reduction(format!(
            "Sensor type '{sensor_type}' missing from measurement"
        ))
    })
}
