//! pCO₂ Processor Library
//!
//! A Rust library for extracting, aligning and reducing raw observation data
//! from marine CO₂ sensing platforms (underway systems, SailDrones, moored
//! analysers).
//!
//! This library provides tools for:
//! - Describing instruments: file layouts, run-type categories, sensor
//!   assignments and flushing behaviour
//! - Aligning records across heterogeneous raw file streams, respecting
//!   run-type semantics and flushing exclusion windows
//! - Applying sensor calibrations resolved for a dataset's time range
//! - Reducing aligned measurements to derived quantities (pH₂O, pCO₂, fCO₂)
//!   with per-variable calculation routines
//! - Reporting dataset lifecycle status and QC flags through narrow
//!   persistence contracts

pub mod config;
pub mod constants;

// Core application modules
pub mod app {
    pub mod models;
    pub mod services {
        pub mod data_reduction;
        pub mod extraction;
        pub mod raw_data;
    }
    pub mod adapters {
        pub mod persistence;
    }
}

// Re-export commonly used types
pub use app::models::{Dataset, DatasetStatus, Flag, Instrument, RunTypeCategory};
pub use config::ExtractionConfig;

/// Result type alias for the pCO₂ processor
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error types for extraction and reduction operations
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Instrument or file definition is inconsistent
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// A run type could not be resolved to a category
    #[error("Unrecognised run type '{run_type}' in file '{file}'")]
    RunTypeCategory { file: String, run_type: String },

    /// No valid calibration set covers the dataset
    #[error("Calibration error: {message}")]
    CalibrationNotValid { message: String },

    /// A value could not be extracted from a data file line
    #[error("Data error in file '{file}' line {line}: {message}")]
    DataFile {
        file: String,
        line: usize,
        message: String,
    },

    /// Record alignment failed in a non-recoverable way
    #[error("Dataset error: {message}")]
    DataSet { message: String },

    /// Data reduction could not be performed
    #[error("Data reduction error: {message}")]
    DataReduction { message: String },

    /// The persistence layer rejected an operation
    #[error("Storage error: {message}")]
    Storage {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The extraction job was cancelled externally
    #[error("Job cancelled: {job}")]
    JobCancelled { job: String },
}

impl Error {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a run type category error
    pub fn run_type_category(file: impl Into<String>, run_type: impl Into<String>) -> Self {
        Self::RunTypeCategory {
            file: file.into(),
            run_type: run_type.into(),
        }
    }

    /// Create a calibration error
    pub fn calibration_not_valid(message: impl Into<String>) -> Self {
        Self::CalibrationNotValid {
            message: message.into(),
        }
    }

    /// Create a data file error with file and line context
    pub fn data_file(file: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Self::DataFile {
            file: file.into(),
            line,
            message: message.into(),
        }
    }

    /// Create a dataset error
    pub fn data_set(message: impl Into<String>) -> Self {
        Self::DataSet {
            message: message.into(),
        }
    }

    /// Create a data reduction error
    pub fn data_reduction(message: impl Into<String>) -> Self {
        Self::DataReduction {
            message: message.into(),
        }
    }

    /// Create a storage error with a simple message
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            source: None,
        }
    }

    /// Create a storage error wrapping an underlying driver error
    pub fn storage_with_source(
        message: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Storage {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Create a job cancellation error
    pub fn job_cancelled(job: impl Into<String>) -> Self {
        Self::JobCancelled { job: job.into() }
    }

    /// Whether this error may be skipped during record discovery.
    ///
    /// Only per-line data errors are recoverable: the aligner logs them and
    /// searches for the next record. Everything else aborts the job.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::DataFile { .. })
    }
}
