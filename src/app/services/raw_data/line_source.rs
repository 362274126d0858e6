//! Raw line access
//!
//! The aligner never touches files directly: it reads decoded content lines
//! through the [`LineSource`] trait, one source per file definition. File
//! parsing and format detection live outside this crate; what arrives here
//! is a dated sequence of field strings.

use crate::{Error, Result};
use chrono::{DateTime, Utc};

/// Accessor over the decoded content lines of one raw file stream.
///
/// Lines are addressed by zero-based index in `first_data_line()..line_count()`.
/// Field values are parsed lazily so that a malformed field surfaces as a
/// recoverable per-record error rather than poisoning the whole stream.
pub trait LineSource {
    /// Name of the underlying file, used in error reporting
    fn file_name(&self) -> &str;

    /// Total number of content lines
    fn line_count(&self) -> usize;

    /// Index of the first line carrying data (after any in-file headers)
    fn first_data_line(&self) -> usize {
        0
    }

    /// The timestamp of a line
    fn date(&self, line: usize) -> Result<DateTime<Utc>>;

    /// The raw run-type string of a line; `None` if the stream has no
    /// run-type column
    fn run_type(&self, line: usize) -> Result<Option<String>>;

    /// A field value parsed as a number.
    ///
    /// Returns `None` when the field is empty or equals the missing-value
    /// sentinel. A field that is present but unparseable is an error.
    fn field_value(&self, line: usize, column: usize, missing_value: &str)
    -> Result<Option<f64>>;

    /// The longitude of a line, for streams carrying position data
    fn longitude(&self, line: usize) -> Result<f64>;

    /// The latitude of a line, for streams carrying position data
    fn latitude(&self, line: usize) -> Result<f64>;
}

/// One decoded content line held in memory
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryLine {
    /// The line's timestamp
    pub time: DateTime<Utc>,

    /// Field values as decoded strings
    pub fields: Vec<String>,
}

/// A [`LineSource`] over lines already decoded into memory.
///
/// This is the production implementation for the eager-load model: file
/// content is decoded up front and alignment runs over in-memory arrays
/// with no blocking points.
#[derive(Debug, Clone)]
pub struct MemoryLineSource {
    file_name: String,
    run_type_column: Option<usize>,
    longitude_column: Option<usize>,
    latitude_column: Option<usize>,
    lines: Vec<MemoryLine>,
}

impl MemoryLineSource {
    /// Create a source with no run-type or position columns
    pub fn new(file_name: impl Into<String>, lines: Vec<MemoryLine>) -> Self {
        Self {
            file_name: file_name.into(),
            run_type_column: None,
            longitude_column: None,
            latitude_column: None,
            lines,
        }
    }

    /// Set the column holding the run type
    pub fn with_run_type_column(mut self, column: usize) -> Self {
        self.run_type_column = Some(column);
        self
    }

    /// Set the columns holding longitude and latitude
    pub fn with_position_columns(mut self, longitude: usize, latitude: usize) -> Self {
        self.longitude_column = Some(longitude);
        self.latitude_column = Some(latitude);
        self
    }

    fn field(&self, line: usize, column: usize) -> Result<&str> {
        let fields = &self
            .lines
            .get(line)
            .ok_or_else(|| {
                Error::data_file(&self.file_name, line, "Line index out of range")
            })?
            .fields;

        fields.get(column).map(String::as_str).ok_or_else(|| {
            Error::data_file(
                &self.file_name,
                line,
                format!("Missing column {column}"),
            )
        })
    }

    fn numeric_field(&self, line: usize, column: usize, what: &str) -> Result<f64> {
        let field = self.field(line, column)?;
        field.trim().parse().map_err(|_| {
            Error::data_file(
                &self.file_name,
                line,
                format!("Invalid {what} '{field}'"),
            )
        })
    }
}

impl LineSource for MemoryLineSource {
    fn file_name(&self) -> &str {
        &self.file_name
    }

    fn line_count(&self) -> usize {
        self.lines.len()
    }

    fn date(&self, line: usize) -> Result<DateTime<Utc>> {
        self.lines.get(line).map(|l| l.time).ok_or_else(|| {
            Error::data_file(&self.file_name, line, "Line index out of range")
        })
    }

    fn run_type(&self, line: usize) -> Result<Option<String>> {
        match self.run_type_column {
            None => Ok(None),
            Some(column) => Ok(Some(self.field(line, column)?.trim().to_string())),
        }
    }

    fn field_value(
        &self,
        line: usize,
        column: usize,
        missing_value: &str,
    ) -> Result<Option<f64>> {
        let field = self.field(line, column)?.trim();

        if field.is_empty() || field == missing_value {
            return Ok(None);
        }

        field.parse().map(Some).map_err(|_| {
            Error::data_file(
                &self.file_name,
                line,
                format!("Invalid field value '{field}' in column {column}"),
            )
        })
    }

    fn longitude(&self, line: usize) -> Result<f64> {
        match self.longitude_column {
            Some(column) => self.numeric_field(line, column, "longitude"),
            None => Err(Error::data_file(
                &self.file_name,
                line,
                "File has no longitude column",
            )),
        }
    }

    fn latitude(&self, line: usize) -> Result<f64> {
        match self.latitude_column {
            Some(column) => self.numeric_field(line, column, "latitude"),
            None => Err(Error::data_file(
                &self.file_name,
                line,
                "File has no latitude column",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn source() -> MemoryLineSource {
        MemoryLineSource::new(
            "co2.txt",
            vec![
                MemoryLine {
                    time: Utc.with_ymd_and_hms(2023, 6, 15, 12, 0, 0).unwrap(),
                    fields: vec![
                        "equ".to_string(),
                        "380.1".to_string(),
                        "NaN".to_string(),
                        "".to_string(),
                        "-24.5".to_string(),
                        "63.1".to_string(),
                    ],
                },
                MemoryLine {
                    time: Utc.with_ymd_and_hms(2023, 6, 15, 12, 0, 10).unwrap(),
                    fields: vec!["equ".to_string(), "garbage".to_string()],
                },
            ],
        )
        .with_run_type_column(0)
        .with_position_columns(4, 5)
    }

    #[test]
    fn test_field_value_parses() {
        let source = source();
        assert_eq!(source.field_value(0, 1, "NaN").unwrap(), Some(380.1));
    }

    #[test]
    fn test_missing_sentinel_and_empty_are_none() {
        let source = source();
        assert_eq!(source.field_value(0, 2, "NaN").unwrap(), None);
        assert_eq!(source.field_value(0, 3, "NaN").unwrap(), None);
    }

    #[test]
    fn test_unparseable_field_is_recoverable_error() {
        let source = source();
        let error = source.field_value(1, 1, "NaN").unwrap_err();
        assert!(error.is_recoverable());
    }

    #[test]
    fn test_run_type_extraction() {
        let source = source();
        assert_eq!(source.run_type(0).unwrap(), Some("equ".to_string()));

        let no_run_types = MemoryLineSource::new("tsg.txt", Vec::new());
        assert_eq!(no_run_types.run_type(0).unwrap(), None);
    }

    #[test]
    fn test_position_extraction() {
        let source = source();
        assert_eq!(source.longitude(0).unwrap(), -24.5);
        assert_eq!(source.latitude(0).unwrap(), 63.1);
    }

    #[test]
    fn test_position_without_columns_fails() {
        let source = MemoryLineSource::new("tsg.txt", Vec::new());
        assert!(source.longitude(0).is_err());
    }

    #[test]
    fn test_out_of_range_line() {
        let source = source();
        assert!(source.date(10).is_err());
        assert!(source.field_value(10, 0, "NaN").is_err());
    }
}
