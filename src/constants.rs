//! Application constants for the pCO₂ processor
//!
//! This module contains dataset lifecycle codes, averaging mode names,
//! and the fixed physical constants used by the data reduction routines.

// =============================================================================
// Dataset Status Codes
// =============================================================================

/// Dataset lifecycle status codes.
///
/// These are the integer codes recorded against a dataset as it moves
/// through the processing pipeline. `ERROR` can be entered from any state.
pub mod status {
    /// Processing failed; a diagnostic message is attached to the dataset
    pub const ERROR: i32 = -1;

    /// Waiting to be picked up for extraction
    pub const WAITING: i32 = 0;

    /// Raw data extraction in progress
    pub const DATA_EXTRACTION: i32 = 1;

    /// Data reduction in progress
    pub const DATA_REDUCTION: i32 = 2;

    /// Automatic quality control in progress
    pub const AUTO_QC: i32 = 3;

    /// Awaiting manual quality control
    pub const USER_QC: i32 = 4;

    /// QC complete; can be submitted for approval
    pub const READY_FOR_SUBMISSION: i32 = 5;

    /// Submitted; awaiting approval
    pub const WAITING_FOR_APPROVAL: i32 = 6;

    /// Approved; waiting for automatic export
    pub const READY_FOR_EXPORT: i32 = 7;

    /// Automatic export in progress
    pub const EXPORTING: i32 = 8;

    /// Automatic export complete
    pub const EXPORT_COMPLETE: i32 = 9;
}

// =============================================================================
// Averaging Modes
// =============================================================================

/// Human-readable name for the no-averaging mode
pub const AVG_MODE_NONE_NAME: &str = "None";

/// Human-readable name for the every-minute averaging mode
pub const AVG_MODE_MINUTE_NAME: &str = "Every minute";

// =============================================================================
// QC Flag Codes
// =============================================================================

/// WOCE-style QC flag values attached to sensor values and reduction records
pub mod flag {
    /// No QC has been performed
    pub const NOT_SET: i32 = 0;

    /// The value is good
    pub const GOOD: i32 = 2;

    /// The value is questionable
    pub const QUESTIONABLE: i32 = 3;

    /// The value is bad
    pub const BAD: i32 = 4;

    /// The value requires a manual QC decision
    pub const NEEDS_FLAG: i32 = -10;
}

// =============================================================================
// Data Reduction Constants
// =============================================================================

/// The conversion factor from Pascals to Atmospheres
pub const PASCALS_TO_ATMOSPHERES: f64 = 0.000009869_232_667_160_13;

/// Offset from degrees Celsius to Kelvin
pub const CELSIUS_TO_KELVIN: f64 = 273.15;

/// Multiplier used to build calculation parameter ids from variable ids.
///
/// A parameter id is `variable_id * PARAMETER_ID_BASE + sequence`, so the
/// owning variable can be recovered from any parameter id.
pub const PARAMETER_ID_BASE: i64 = 10_000;

// =============================================================================
// Helper Functions
// =============================================================================

/// Get the display name for a dataset status code
pub fn status_name(status: i32) -> &'static str {
    match status {
        status::ERROR => "ERROR",
        status::WAITING => "Waiting",
        status::DATA_EXTRACTION => "Data extraction",
        status::DATA_REDUCTION => "Data reduction",
        status::AUTO_QC => "Automatic QC",
        status::USER_QC => "Ready for QC",
        status::READY_FOR_SUBMISSION => "Ready for Submission",
        status::WAITING_FOR_APPROVAL => "Waiting for Approval",
        status::READY_FOR_EXPORT => "Waiting for Automatic Export",
        status::EXPORTING => "Automatic export in progress",
        status::EXPORT_COMPLETE => "Automatic export complete",
        _ => "Unknown status",
    }
}

/// Check if an integer is a recognised dataset status code
pub fn is_valid_status(status: i32) -> bool {
    (status::ERROR..=status::EXPORT_COMPLETE).contains(&status)
}
