//! Configuration for extraction jobs
//!
//! Provides the job-level settings that are not part of an instrument
//! definition: the record averaging mode and dataset bound handling.

use crate::constants::{AVG_MODE_MINUTE_NAME, AVG_MODE_NONE_NAME};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How raw rows are grouped into records during alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AveragingMode {
    /// No averaging: one row per file per record, matched on exact time
    None,

    /// Average all rows within the same UTC minute
    EveryMinute,
}

impl AveragingMode {
    /// Numeric code used when the mode is stored externally
    pub fn code(self) -> i32 {
        match self {
            AveragingMode::None => 0,
            AveragingMode::EveryMinute => 1,
        }
    }

    /// Human-readable mode name
    pub fn name(self) -> &'static str {
        match self {
            AveragingMode::None => AVG_MODE_NONE_NAME,
            AveragingMode::EveryMinute => AVG_MODE_MINUTE_NAME,
        }
    }

    /// All available modes, in display order
    pub fn all() -> [AveragingMode; 2] {
        [AveragingMode::None, AveragingMode::EveryMinute]
    }
}

impl Default for AveragingMode {
    fn default() -> Self {
        AveragingMode::None
    }
}

impl FromStr for AveragingMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            AVG_MODE_NONE_NAME => Ok(AveragingMode::None),
            AVG_MODE_MINUTE_NAME => Ok(AveragingMode::EveryMinute),
            _ => Err(Error::configuration(format!(
                "Unknown averaging mode '{s}'"
            ))),
        }
    }
}

impl std::fmt::Display for AveragingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Settings for one dataset extraction job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// The averaging mode for record alignment
    pub averaging_mode: AveragingMode,

    /// Whether to shrink the dataset's time bounds to the range actually
    /// covered by extracted records
    pub adjust_dataset_bounds: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            averaging_mode: AveragingMode::None,
            adjust_dataset_bounds: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_names_round_trip() {
        for mode in AveragingMode::all() {
            assert_eq!(AveragingMode::from_str(mode.name()).unwrap(), mode);
        }
        assert!(AveragingMode::from_str("Hourly").is_err());
    }

    #[test]
    fn test_mode_codes() {
        assert_eq!(AveragingMode::None.code(), 0);
        assert_eq!(AveragingMode::EveryMinute.code(), 1);
    }

    #[test]
    fn test_default_config() {
        let config = ExtractionConfig::default();
        assert_eq!(config.averaging_mode, AveragingMode::None);
        assert!(config.adjust_dataset_bounds);
    }

    #[test]
    fn test_config_serde_round_trip() {
        let config = ExtractionConfig {
            averaging_mode: AveragingMode::EveryMinute,
            adjust_dataset_bounds: false,
        };
        let json = serde_json::to_string(&config).unwrap();
        let parsed: ExtractionConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, parsed);
    }
}
