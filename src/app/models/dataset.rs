//! Dataset models
//!
//! A dataset is a time-bounded slice of an instrument's raw data moving
//! through the processing pipeline. The dataset tracks its lifecycle status
//! and carries diagnostic messages when processing fails.

use super::flag::Flag;
use crate::constants::{self, status};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Dataset Status
// =============================================================================

/// Lifecycle status of a dataset.
///
/// The pipeline reports progress by setting these statuses; it does not own
/// the transition rules beyond entering `Error` on failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DatasetStatus {
    /// Processing failed
    Error,

    /// Waiting for data extraction
    Waiting,

    /// Raw data extraction in progress
    DataExtraction,

    /// Data reduction in progress
    DataReduction,

    /// Automatic QC in progress
    AutoQc,

    /// Waiting for manual QC
    UserQc,

    /// Ready for submission
    ReadyForSubmission,

    /// Waiting for approval
    WaitingForApproval,

    /// Waiting for automatic export
    ReadyForExport,

    /// Automatic export in progress
    Exporting,

    /// Automatic export complete
    ExportComplete,
}

impl DatasetStatus {
    /// Get the numeric status code
    pub fn code(self) -> i32 {
        match self {
            DatasetStatus::Error => status::ERROR,
            DatasetStatus::Waiting => status::WAITING,
            DatasetStatus::DataExtraction => status::DATA_EXTRACTION,
            DatasetStatus::DataReduction => status::DATA_REDUCTION,
            DatasetStatus::AutoQc => status::AUTO_QC,
            DatasetStatus::UserQc => status::USER_QC,
            DatasetStatus::ReadyForSubmission => status::READY_FOR_SUBMISSION,
            DatasetStatus::WaitingForApproval => status::WAITING_FOR_APPROVAL,
            DatasetStatus::ReadyForExport => status::READY_FOR_EXPORT,
            DatasetStatus::Exporting => status::EXPORTING,
            DatasetStatus::ExportComplete => status::EXPORT_COMPLETE,
        }
    }

    /// Get the human-readable status name
    pub fn name(self) -> &'static str {
        constants::status_name(self.code())
    }
}

impl TryFrom<i32> for DatasetStatus {
    type Error = Error;

    fn try_from(value: i32) -> Result<Self> {
        match value {
            status::ERROR => Ok(DatasetStatus::Error),
            status::WAITING => Ok(DatasetStatus::Waiting),
            status::DATA_EXTRACTION => Ok(DatasetStatus::DataExtraction),
            status::DATA_REDUCTION => Ok(DatasetStatus::DataReduction),
            status::AUTO_QC => Ok(DatasetStatus::AutoQc),
            status::USER_QC => Ok(DatasetStatus::UserQc),
            status::READY_FOR_SUBMISSION => Ok(DatasetStatus::ReadyForSubmission),
            status::WAITING_FOR_APPROVAL => Ok(DatasetStatus::WaitingForApproval),
            status::READY_FOR_EXPORT => Ok(DatasetStatus::ReadyForExport),
            status::EXPORTING => Ok(DatasetStatus::Exporting),
            status::EXPORT_COMPLETE => Ok(DatasetStatus::ExportComplete),
            _ => Err(Error::configuration(format!(
                "Invalid dataset status {value}"
            ))),
        }
    }
}

impl std::fmt::Display for DatasetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

// =============================================================================
// Dataset
// =============================================================================

/// A diagnostic message attached to a dataset.
///
/// Messages pair a human-readable summary with the technical detail (e.g. an
/// error chain) for support purposes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetMessage {
    /// Human-readable summary
    pub message: String,

    /// Technical detail, such as the full error description
    pub detail: String,
}

/// A time-bounded slice of an instrument's data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    /// Database identifier
    pub id: i64,

    /// The instrument this dataset belongs to
    pub instrument_id: i64,

    /// Dataset name
    pub name: String,

    /// Start of the dataset's time range
    pub start: DateTime<Utc>,

    /// End of the dataset's time range
    pub end: DateTime<Utc>,

    /// Current lifecycle status
    pub status: DatasetStatus,

    /// Diagnostic messages accumulated during processing
    #[serde(default)]
    pub messages: Vec<DatasetMessage>,
}

impl Dataset {
    /// Create a new dataset in the `Waiting` state
    pub fn new(
        id: i64,
        instrument_id: i64,
        name: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Self> {
        if end < start {
            return Err(Error::configuration(format!(
                "Dataset start {start} is after end {end}"
            )));
        }

        Ok(Self {
            id,
            instrument_id,
            name: name.into(),
            start,
            end,
            status: DatasetStatus::Waiting,
            messages: Vec::new(),
        })
    }

    /// Set the dataset status
    pub fn set_status(&mut self, status: DatasetStatus) {
        self.status = status;
    }

    /// Attach a diagnostic message with technical detail
    pub fn add_message(&mut self, message: impl Into<String>, detail: impl Into<String>) {
        self.messages.push(DatasetMessage {
            message: message.into(),
            detail: detail.into(),
        });
    }

    /// Remove all diagnostic messages, e.g. before reprocessing
    pub fn clear_messages(&mut self) {
        self.messages.clear();
    }

    /// Check whether a time falls within the dataset's range (inclusive)
    pub fn contains_time(&self, time: DateTime<Utc>) -> bool {
        time >= self.start && time <= self.end
    }
}

// =============================================================================
// Sensor Values
// =============================================================================

/// One extracted, calibrated sensor value bound for storage.
///
/// Sensor values are the traceability record for data reduction: every
/// measurement value can point back at the raw rows it was built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorValue {
    /// The dataset the value belongs to
    pub dataset_id: i64,

    /// The sensor assignment (column) the value came from
    pub column_id: i64,

    /// Timestamp of the record the value belongs to
    pub time: DateTime<Utc>,

    /// The calibrated value; `None` if every contributing row was missing
    pub value: Option<f64>,

    /// QC flag for the value
    pub flag: Flag,
}
