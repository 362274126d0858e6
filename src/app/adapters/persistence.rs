//! Persistence contracts
//!
//! The pipeline reads calibrations and writes its results through the
//! narrow [`DataStore`] trait; the real database lives outside this crate.
//! [`InMemoryStore`] implements the contract for tests, including a
//! fail-injection switch to exercise the error-status path.

use crate::app::models::{CalibrationSet, DatasetMessage, DatasetStatus, Instrument, SensorValue};
use crate::app::services::data_reduction::DataReductionRecord;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// The persistence operations the extraction pipeline depends on.
///
/// `store_extraction_results` is atomic: either every sensor value and
/// reduction record for the dataset is persisted, or none are. Implementors
/// are expected to wrap the call in a single transaction.
pub trait DataStore {
    /// Load an instrument definition; `None` when the id is unknown
    fn instrument(&self, instrument_id: i64) -> Result<Option<Instrument>>;

    /// The most recent calibration set for an instrument deployed at or
    /// before the given time; `None` when no calibrations exist
    fn most_recent_calibrations(
        &self,
        instrument_id: i64,
        before: DateTime<Utc>,
    ) -> Result<Option<CalibrationSet>>;

    /// Atomically store everything extracted for a dataset
    fn store_extraction_results(
        &self,
        dataset_id: i64,
        sensor_values: Vec<SensorValue>,
        reduction_records: Vec<DataReductionRecord>,
    ) -> Result<()>;

    /// Record a dataset's lifecycle status
    fn update_dataset_status(&self, dataset_id: i64, status: DatasetStatus) -> Result<()>;

    /// Attach a diagnostic message to a dataset
    fn add_dataset_message(&self, dataset_id: i64, message: &str, detail: &str) -> Result<()>;
}

/// Calibration sets stored against their deployment time
struct StoredCalibrations {
    instrument_id: i64,
    valid_from: DateTime<Utc>,
    calibrations: CalibrationSet,
}

/// An in-memory [`DataStore`] for tests.
#[derive(Default)]
pub struct InMemoryStore {
    instruments: Mutex<HashMap<i64, Instrument>>,
    calibrations: Mutex<Vec<StoredCalibrations>>,
    results: Mutex<HashMap<i64, (Vec<SensorValue>, Vec<DataReductionRecord>)>>,
    statuses: Mutex<Vec<(i64, DatasetStatus)>>,
    messages: Mutex<Vec<(i64, DatasetMessage)>>,
    fail_stores: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an instrument definition
    pub fn add_instrument(&self, instrument: Instrument) {
        self.instruments
            .lock()
            .unwrap()
            .insert(instrument.id, instrument);
    }

    /// Register a calibration set for an instrument, valid from the given
    /// time
    pub fn add_calibrations(
        &self,
        instrument_id: i64,
        valid_from: DateTime<Utc>,
        calibrations: CalibrationSet,
    ) {
        self.calibrations.lock().unwrap().push(StoredCalibrations {
            instrument_id,
            valid_from,
            calibrations,
        });
    }

    /// Make every subsequent `store_extraction_results` call fail
    pub fn fail_stores(&self) {
        self.fail_stores.store(true, Ordering::SeqCst);
    }

    /// The sensor values stored for a dataset, if any were
    pub fn stored_sensor_values(&self, dataset_id: i64) -> Vec<SensorValue> {
        self.results
            .lock()
            .unwrap()
            .get(&dataset_id)
            .map(|(values, _)| values.clone())
            .unwrap_or_default()
    }

    /// The reduction records stored for a dataset, if any were
    pub fn stored_reduction_records(&self, dataset_id: i64) -> Vec<DataReductionRecord> {
        self.results
            .lock()
            .unwrap()
            .get(&dataset_id)
            .map(|(_, records)| records.clone())
            .unwrap_or_default()
    }

    /// Every status recorded for a dataset, in order
    pub fn status_history(&self, dataset_id: i64) -> Vec<DatasetStatus> {
        self.statuses
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| *id == dataset_id)
            .map(|(_, status)| *status)
            .collect()
    }

    /// The diagnostic messages recorded for a dataset
    pub fn dataset_messages(&self, dataset_id: i64) -> Vec<DatasetMessage> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| *id == dataset_id)
            .map(|(_, message)| message.clone())
            .collect()
    }
}

impl DataStore for InMemoryStore {
    fn instrument(&self, instrument_id: i64) -> Result<Option<Instrument>> {
        Ok(self.instruments.lock().unwrap().get(&instrument_id).cloned())
    }

    fn most_recent_calibrations(
        &self,
        instrument_id: i64,
        before: DateTime<Utc>,
    ) -> Result<Option<CalibrationSet>> {
        let stored = self.calibrations.lock().unwrap();

        Ok(stored
            .iter()
            .filter(|s| s.instrument_id == instrument_id && s.valid_from <= before)
            .max_by_key(|s| s.valid_from)
            .map(|s| s.calibrations.clone()))
    }

    fn store_extraction_results(
        &self,
        dataset_id: i64,
        sensor_values: Vec<SensorValue>,
        reduction_records: Vec<DataReductionRecord>,
    ) -> Result<()> {
        if self.fail_stores.load(Ordering::SeqCst) {
            return Err(Error::storage("Injected storage failure"));
        }

        self.results
            .lock()
            .unwrap()
            .insert(dataset_id, (sensor_values, reduction_records));
        Ok(())
    }

    fn update_dataset_status(&self, dataset_id: i64, status: DatasetStatus) -> Result<()> {
        self.statuses.lock().unwrap().push((dataset_id, status));
        Ok(())
    }

    fn add_dataset_message(
        &self,
        dataset_id: i64,
        message: &str,
        detail: &str,
    ) -> Result<()> {
        self.messages.lock().unwrap().push((
            dataset_id,
            DatasetMessage {
                message: message.to_string(),
                detail: detail.to_string(),
            },
        ));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::models::SensorCalibration;
    use chrono::TimeZone;

    fn time(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 6, day, 0, 0, 0).unwrap()
    }

    /// A set whose single calibration adds `offset`, so test assertions can
    /// tell the stored sets apart
    fn calibration_set(offset: f64) -> CalibrationSet {
        CalibrationSet::new(
            1,
            vec![SensorCalibration::new(101, time(1), vec![offset, 1.0])],
        )
    }

    #[test]
    fn test_most_recent_calibrations_picks_latest_before() {
        let store = InMemoryStore::new();
        store.add_calibrations(1, time(1), calibration_set(1.0));
        store.add_calibrations(1, time(10), calibration_set(2.0));
        store.add_calibrations(1, time(20), calibration_set(3.0));
        store.add_calibrations(2, time(12), calibration_set(4.0));

        // The set from day 10 wins: day 20 is in the future, day 1 is older,
        // day 12 belongs to another instrument
        let found = store.most_recent_calibrations(1, time(15)).unwrap().unwrap();
        assert_eq!(found.calibrate(101, 0.0), 2.0);
    }

    #[test]
    fn test_no_calibrations_returns_none() {
        let store = InMemoryStore::new();
        assert!(store.most_recent_calibrations(1, time(15)).unwrap().is_none());

        // Calibrations from the future don't count
        store.add_calibrations(1, time(20), calibration_set(1.0));
        assert!(store.most_recent_calibrations(1, time(15)).unwrap().is_none());
    }

    #[test]
    fn test_fail_injection() {
        let store = InMemoryStore::new();
        store.fail_stores();

        let result = store.store_extraction_results(1, Vec::new(), Vec::new());
        assert!(matches!(result, Err(Error::Storage { .. })));
        assert!(store.stored_sensor_values(1).is_empty());
    }

    #[test]
    fn test_status_history_is_per_dataset() {
        let store = InMemoryStore::new();
        store.update_dataset_status(1, DatasetStatus::DataExtraction).unwrap();
        store.update_dataset_status(2, DatasetStatus::Error).unwrap();
        store.update_dataset_status(1, DatasetStatus::DataReduction).unwrap();

        assert_eq!(
            store.status_history(1),
            vec![DatasetStatus::DataExtraction, DatasetStatus::DataReduction]
        );
        assert_eq!(store.status_history(2), vec![DatasetStatus::Error]);
    }
}
