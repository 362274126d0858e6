//! Quality control flags
//!
//! WOCE-style flags attached to sensor values, measurements and data
//! reduction records. Flags have a significance ordering so that a record's
//! flag can only ever escalate as contributing values are examined.

use crate::constants::flag;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Quality control flag for a value or record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Flag {
    /// No QC has been performed
    NotSet,

    /// The value passed QC
    Good,

    /// The value is questionable - use with caution
    Questionable,

    /// The value is bad and should not be used
    Bad,

    /// The value cannot be flagged automatically; a human must decide
    NeedsFlag,
}

impl Flag {
    /// Get the numeric WOCE code for this flag
    pub fn code(self) -> i32 {
        match self {
            Flag::NotSet => flag::NOT_SET,
            Flag::Good => flag::GOOD,
            Flag::Questionable => flag::QUESTIONABLE,
            Flag::Bad => flag::BAD,
            Flag::NeedsFlag => flag::NEEDS_FLAG,
        }
    }

    /// Significance rank used when combining flags. Higher wins.
    fn significance(self) -> u8 {
        match self {
            Flag::NotSet => 0,
            Flag::Good => 1,
            Flag::Questionable => 2,
            Flag::Bad => 3,
            Flag::NeedsFlag => 4,
        }
    }

    /// Check whether this flag outranks another when combining
    pub fn more_significant_than(self, other: Flag) -> bool {
        self.significance() > other.significance()
    }

    /// Combine two flags, keeping the more significant one
    pub fn combined_with(self, other: Flag) -> Flag {
        if other.more_significant_than(self) {
            other
        } else {
            self
        }
    }
}

impl Default for Flag {
    fn default() -> Self {
        Flag::NotSet
    }
}

impl TryFrom<i32> for Flag {
    type Error = Error;

    fn try_from(value: i32) -> Result<Self> {
        match value {
            flag::NOT_SET => Ok(Flag::NotSet),
            flag::GOOD => Ok(Flag::Good),
            flag::QUESTIONABLE => Ok(Flag::Questionable),
            flag::BAD => Ok(Flag::Bad),
            flag::NEEDS_FLAG => Ok(Flag::NeedsFlag),
            _ => Err(Error::configuration(format!(
                "Invalid flag value {value}"
            ))),
        }
    }
}

impl FromStr for Flag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let code: i32 = s
            .trim()
            .parse()
            .map_err(|_| Error::configuration(format!("Invalid flag value '{s}'")))?;
        Flag::try_from(code)
    }
}

impl std::fmt::Display for Flag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}
