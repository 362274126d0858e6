//! Instrument definition models
//!
//! An instrument describes everything the extraction pipeline needs to know
//! about a platform: which raw file streams it produces, how run types map to
//! semantic categories, which columns feed which sensors, and how long the
//! instrument takes to flush after switching what it is measuring.
//!
//! Instrument definitions are immutable once built; the pipeline treats them
//! as read-only for the life of a job.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

// =============================================================================
// Run Type Categories
// =============================================================================

/// The resolved semantic meaning of a run type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunTypeCategory {
    /// Lines with this run type carry no usable data
    Ignored,

    /// The instrument was measuring an internal calibration gas
    InternalCalibration,

    /// The instrument was measuring the named variable
    Measurement {
        /// The variable being measured, e.g. "Underway Marine pCO₂"
        variable: String,
    },
}

impl RunTypeCategory {
    /// Check whether this category denotes a real measurement.
    ///
    /// Position data is only extracted for measurement categories; internal
    /// calibration and ignored lines carry no meaningful position.
    pub fn is_measurement(&self) -> bool {
        matches!(self, RunTypeCategory::Measurement { .. })
    }

    /// Get the measured variable name, if this is a measurement category
    pub fn variable(&self) -> Option<&str> {
        match self {
            RunTypeCategory::Measurement { variable } => Some(variable),
            _ => None,
        }
    }
}

impl std::fmt::Display for RunTypeCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunTypeCategory::Ignored => write!(f, "Ignored"),
            RunTypeCategory::InternalCalibration => write!(f, "Internal Calibration"),
            RunTypeCategory::Measurement { variable } => write!(f, "{variable}"),
        }
    }
}

/// The category assignment for a single raw run-type string.
///
/// A run type either maps directly to a category, or aliases another run
/// type. Aliases are resolved transitively when a line's category is looked
/// up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RunTypeAssignment {
    /// Direct category assignment
    Category(RunTypeCategory),

    /// This run type is an alias for another run type
    Alias(String),
}

// =============================================================================
// File Definitions
// =============================================================================

/// Description of one raw-file stream produced by an instrument
///
/// A file definition covers the layout of one stream: whether it carries a
/// run-type column (and if so, how run types map to categories), and whether
/// it carries position data. Column extraction itself is performed by the
/// file's line source; the definition holds the semantic mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileDefinition {
    /// Unique name for this file stream, e.g. "CO2 Analyser"
    pub description: String,

    /// Column holding the run type, if the stream has one
    pub run_type_column: Option<usize>,

    /// Run-type string (lowercased) to category assignment
    #[serde(default)]
    pub run_type_assignments: HashMap<String, RunTypeAssignment>,

    /// Whether this stream carries longitude/latitude columns
    #[serde(default)]
    pub has_position: bool,
}

impl FileDefinition {
    /// Create a file definition without run types or position
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            run_type_column: None,
            run_type_assignments: HashMap::new(),
            has_position: false,
        }
    }

    /// Check whether this stream carries run-type information.
    ///
    /// Only run-type-bearing streams drive record alignment; streams without
    /// run types are followers whose every line is a candidate.
    pub fn has_run_types(&self) -> bool {
        self.run_type_column.is_some()
    }

    /// Add a run-type assignment. Run types are matched case-insensitively.
    pub fn assign_run_type(&mut self, run_type: impl AsRef<str>, assignment: RunTypeAssignment) {
        self.run_type_assignments
            .insert(run_type.as_ref().to_lowercase(), assignment);
    }

    /// Resolve the category for a run type, following alias chains.
    ///
    /// Resolution is transitive: an alias may point at another alias. An
    /// unknown run type, a dangling alias, or an alias cycle is a
    /// configuration fault and fails the lookup.
    pub fn run_type_category(&self, run_type: &str) -> Result<&RunTypeCategory> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut current = run_type.to_lowercase();

        loop {
            if !seen.insert(current.clone()) {
                return Err(Error::configuration(format!(
                    "Alias cycle resolving run type '{}' in file '{}'",
                    run_type, self.description
                )));
            }

            match self.run_type_assignments.get(&current) {
                None => {
                    return Err(Error::run_type_category(&self.description, run_type));
                }
                Some(RunTypeAssignment::Category(category)) => return Ok(category),
                Some(RunTypeAssignment::Alias(target)) => current = target.to_lowercase(),
            }
        }
    }

    /// Validate the definition for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.description.trim().is_empty() {
            return Err(Error::configuration(
                "File definition description cannot be empty".to_string(),
            ));
        }

        if self.has_run_types() && self.run_type_assignments.is_empty() {
            return Err(Error::configuration(format!(
                "File '{}' has a run type column but no run type assignments",
                self.description
            )));
        }

        // Every alias chain must terminate in a category
        for run_type in self.run_type_assignments.keys() {
            self.run_type_category(run_type)?;
        }

        Ok(())
    }
}

// =============================================================================
// Sensors and Variables
// =============================================================================

/// A type of sensor the instrument carries, e.g. "Intake Temperature"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorType {
    /// Unique sensor type id
    pub id: i64,

    /// Sensor type name; reducers look measurement values up by this name
    pub name: String,

    /// Diagnostic sensors monitor the instrument itself and take no part in
    /// data reduction
    #[serde(default)]
    pub diagnostic: bool,
}

/// The assignment of one raw-file column to a sensor type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorAssignment {
    /// Database identifier; also the calibration target key
    pub database_id: i64,

    /// The sensor type this column feeds (by name)
    pub sensor_type: String,

    /// The file definition the column lives in (by description)
    pub file: String,

    /// Zero-based column index within the file's fields
    pub column: usize,

    /// String that marks a missing value in this column
    pub missing_value: String,
}

/// A variable the instrument measures, with its own data reduction routine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    /// Unique variable id
    pub id: i64,

    /// Variable name; keys the data reducer registry
    pub name: String,
}

// =============================================================================
// Instrument
// =============================================================================

/// Complete static description of an instrument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    /// Database identifier
    pub id: i64,

    /// Instrument name
    pub name: String,

    /// The raw-file streams this instrument produces
    pub file_definitions: Vec<FileDefinition>,

    /// The sensor types the instrument carries
    pub sensor_types: Vec<SensorType>,

    /// Column-to-sensor assignments across all files
    pub sensor_assignments: Vec<SensorAssignment>,

    /// The variables measured by this instrument
    pub variables: Vec<Variable>,

    /// Seconds after a run-type change during which readings are unstable
    pub pre_flushing_time: i64,

    /// Seconds before the end of a run-type block during which readings are
    /// unstable
    pub post_flushing_time: i64,
}

impl Instrument {
    /// Look up a file definition by its description
    pub fn file_definition(&self, description: &str) -> Option<&FileDefinition> {
        self.file_definitions
            .iter()
            .find(|d| d.description == description)
    }

    /// Get the index of the file definition with the given description
    pub fn file_definition_index(&self, description: &str) -> Option<usize> {
        self.file_definitions
            .iter()
            .position(|d| d.description == description)
    }

    /// Look up a sensor type by name
    pub fn sensor_type(&self, name: &str) -> Option<&SensorType> {
        self.sensor_types.iter().find(|t| t.name == name)
    }

    /// Look up a variable by name
    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }

    /// Look up a variable by id
    pub fn variable_by_id(&self, id: i64) -> Option<&Variable> {
        self.variables.iter().find(|v| v.id == id)
    }

    /// Get the sensor assignments that take part in data reduction.
    ///
    /// Assignments for diagnostic sensor types are excluded.
    pub fn measurement_assignments(&self) -> impl Iterator<Item = &SensorAssignment> {
        self.sensor_assignments.iter().filter(|a| {
            self.sensor_type(&a.sensor_type)
                .map(|t| !t.diagnostic)
                .unwrap_or(false)
        })
    }

    /// Validate the instrument definition for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::configuration(
                "Instrument name cannot be empty".to_string(),
            ));
        }

        if self.file_definitions.is_empty() {
            return Err(Error::configuration(format!(
                "Instrument '{}' has no file definitions",
                self.name
            )));
        }

        let mut descriptions = HashSet::new();
        for definition in &self.file_definitions {
            definition.validate()?;
            if !descriptions.insert(definition.description.as_str()) {
                return Err(Error::configuration(format!(
                    "Duplicate file definition '{}'",
                    definition.description
                )));
            }
        }

        if !self.file_definitions.iter().any(|d| d.has_run_types()) {
            return Err(Error::configuration(format!(
                "Instrument '{}' has no file definition with run types",
                self.name
            )));
        }

        for assignment in &self.sensor_assignments {
            if self.file_definition(&assignment.file).is_none() {
                return Err(Error::configuration(format!(
                    "Sensor assignment {} references unknown file '{}'",
                    assignment.database_id, assignment.file
                )));
            }

            if self.sensor_type(&assignment.sensor_type).is_none() {
                return Err(Error::configuration(format!(
                    "Sensor assignment {} references unknown sensor type '{}'",
                    assignment.database_id, assignment.sensor_type
                )));
            }
        }

        if self.pre_flushing_time < 0 || self.post_flushing_time < 0 {
            return Err(Error::configuration(format!(
                "Instrument '{}' has negative flushing times",
                self.name
            )));
        }

        Ok(())
    }
}
