//! Dataset extraction jobs
//!
//! An [`ExtractionJob`] drives the whole pipeline for one dataset: resolve
//! calibrations, walk the aligned records, reduce the measurements, and
//! persist everything in a single atomic store call. The job owns all
//! mutable state; the only shared pieces (instrument, calibrations) are
//! read-only for its life.
//!
//! On any failure nothing partial is persisted: the dataset is moved to the
//! `Error` status with a diagnostic message and the error is returned to
//! the caller.

#[cfg(test)]
pub mod tests;

use crate::app::adapters::persistence::DataStore;
use crate::app::models::{
    Dataset, DatasetStatus, Flag, Instrument, Measurement, MeasurementValue, SensorValue,
};
use crate::app::services::data_reduction::{self, DataReducer, DataReductionRecord};
use crate::app::services::raw_data::{DataSetRawData, LineSource, RawDataRecord};
use crate::config::ExtractionConfig;
use crate::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, info};

/// Cooperative cancellation signal for a running job.
///
/// The job checks the flag between records; cancelling mid-record is never
/// observable because nothing is persisted until the end of the job.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of the job holding this flag
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Counts reported by a completed extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionSummary {
    /// Aligned records found, including internal calibrations
    pub records: usize,

    /// Records carrying a measurement category
    pub measurements: usize,

    /// Sensor values persisted
    pub sensor_values: usize,

    /// Data reduction records persisted
    pub reduction_records: usize,
}

/// One dataset's journey from raw files to stored reduction records
pub struct ExtractionJob {
    instrument: Arc<Instrument>,
    config: ExtractionConfig,
}

impl ExtractionJob {
    /// Create a job for an instrument.
    ///
    /// The instrument definition is validated here so that configuration
    /// faults surface before any dataset is touched.
    pub fn new(instrument: Arc<Instrument>, config: ExtractionConfig) -> Result<Self> {
        instrument.validate()?;

        Ok(Self { instrument, config })
    }

    /// Create a job by loading the instrument definition from the store
    pub fn for_instrument(
        store: &dyn DataStore,
        instrument_id: i64,
        config: ExtractionConfig,
    ) -> Result<Self> {
        let instrument = store.instrument(instrument_id)?.ok_or_else(|| {
            Error::configuration(format!("Unknown instrument {instrument_id}"))
        })?;

        Self::new(Arc::new(instrument), config)
    }

    /// Run the job for a dataset.
    ///
    /// On failure the dataset is left in the `Error` status with a
    /// diagnostic message both on the dataset and in the store, and the
    /// error is propagated.
    pub fn run(
        &self,
        dataset: &mut Dataset,
        sources: Vec<Box<dyn LineSource>>,
        store: &dyn DataStore,
        cancel: &CancelFlag,
    ) -> Result<ExtractionSummary> {
        match self.extract(dataset, sources, store, cancel) {
            Ok(summary) => Ok(summary),
            Err(job_error) => {
                error!(
                    "Extraction of dataset '{}' failed: {job_error}",
                    dataset.name
                );

                dataset.set_status(DatasetStatus::Error);
                dataset.add_message("Data extraction failed", job_error.to_string());

                // Report the error state as far as the store allows; the
                // original failure is what the caller needs to see
                let _ = store.update_dataset_status(dataset.id, DatasetStatus::Error);
                let _ = store.add_dataset_message(
                    dataset.id,
                    "Data extraction failed",
                    &job_error.to_string(),
                );

                Err(job_error)
            }
        }
    }

    fn extract(
        &self,
        dataset: &mut Dataset,
        sources: Vec<Box<dyn LineSource>>,
        store: &dyn DataStore,
        cancel: &CancelFlag,
    ) -> Result<ExtractionSummary> {
        info!(
            "Starting extraction of dataset '{}' for instrument '{}'",
            dataset.name, self.instrument.name
        );

        dataset.clear_messages();
        self.set_status(dataset, store, DatasetStatus::DataExtraction)?;

        // Resolve every variable's reducer up front: an unknown reducer is a
        // configuration fault and must fail before any data is processed
        let mut reducers: HashMap<&str, Box<dyn DataReducer>> = HashMap::new();
        for variable in &self.instrument.variables {
            reducers.insert(variable.name.as_str(), data_reduction::get_reducer(variable)?);
        }

        let calibrations = store
            .most_recent_calibrations(self.instrument.id, dataset.start)?
            .ok_or_else(|| {
                Error::calibration_not_valid(format!(
                    "No calibrations found for instrument '{}'",
                    self.instrument.name
                ))
            })?;

        let mut raw_data = DataSetRawData::new(
            Arc::clone(&self.instrument),
            dataset,
            sources,
            calibrations,
            self.config.averaging_mode,
        )?;

        let mut sensor_values = Vec::new();
        let mut measurements: Vec<Measurement> = Vec::new();

        while let Some(record) = raw_data.next_record()? {
            if cancel.is_cancelled() {
                return Err(Error::job_cancelled(format!(
                    "extraction of dataset '{}'",
                    dataset.name
                )));
            }

            for value in &record.values {
                sensor_values.push(SensorValue {
                    dataset_id: dataset.id,
                    column_id: value.database_id,
                    time: record.time,
                    value: value.value,
                    flag: if value.value.is_some() {
                        Flag::Good
                    } else {
                        Flag::NotSet
                    },
                });
            }

            measurements.push(build_measurement(dataset.id, &record));
        }

        if measurements.is_empty() {
            return Err(Error::data_set(format!(
                "No records found in dataset '{}'",
                dataset.name
            )));
        }

        debug!(
            "Extracted {} records from dataset '{}'",
            measurements.len(),
            dataset.name
        );

        if self.config.adjust_dataset_bounds {
            dataset.start = measurements.first().map(|m| m.time).unwrap_or(dataset.start);
            dataset.end = measurements.last().map(|m| m.time).unwrap_or(dataset.end);
        }

        self.set_status(dataset, store, DatasetStatus::DataReduction)?;

        let mut reduction_records: Vec<DataReductionRecord> = Vec::new();
        for measurement in measurements.iter().filter(|m| m.category.is_measurement()) {
            if cancel.is_cancelled() {
                return Err(Error::job_cancelled(format!(
                    "reduction of dataset '{}'",
                    dataset.name
                )));
            }

            // The category names a variable; it must be one the instrument
            // declares
            let variable_name = measurement.category.variable().unwrap_or_default();
            let reducer = reducers.get(variable_name).ok_or_else(|| {
                Error::configuration(format!(
                    "Run type category references unknown variable '{variable_name}'"
                ))
            })?;

            reduction_records.push(reducer.perform_calculation(&self.instrument, measurement)?);
        }

        let summary = ExtractionSummary {
            records: measurements.len(),
            measurements: measurements
                .iter()
                .filter(|m| m.category.is_measurement())
                .count(),
            sensor_values: sensor_values.len(),
            reduction_records: reduction_records.len(),
        };

        store.store_extraction_results(dataset.id, sensor_values, reduction_records)?;

        self.set_status(dataset, store, DatasetStatus::AutoQc)?;

        info!(
            "Extraction of dataset '{}' complete: {} records, {} reduced",
            dataset.name, summary.records, summary.reduction_records
        );

        Ok(summary)
    }

    fn set_status(
        &self,
        dataset: &mut Dataset,
        store: &dyn DataStore,
        status: DatasetStatus,
    ) -> Result<()> {
        dataset.set_status(status);
        store.update_dataset_status(dataset.id, status)
    }
}

/// Collapse an aligned record into a measurement keyed by sensor type.
///
/// Several assignments may feed the same sensor type; the first with a
/// usable value wins, matching the record's own lookup rule.
fn build_measurement(dataset_id: i64, record: &RawDataRecord) -> Measurement {
    let mut values: HashMap<String, MeasurementValue> = HashMap::new();

    for assignment in &record.values {
        let candidate = MeasurementValue::new(
            assignment.sensor_type.clone(),
            assignment.value,
            if assignment.value.is_some() {
                Flag::Good
            } else {
                Flag::NotSet
            },
            vec![],
        );

        match values.get(&assignment.sensor_type) {
            Some(existing) if existing.has_value() => {}
            _ => {
                values.insert(assignment.sensor_type.clone(), candidate);
            }
        }
    }

    Measurement {
        dataset_id,
        time: record.time,
        run_type: record.run_type.clone(),
        category: record.category.clone(),
        longitude: record.longitude,
        latitude: record.latitude,
        values,
    }
}
