//! Record alignment across raw file streams
//!
//! This module finds "records" in a dataset's raw data: one row per file
//! stream, all representing the same real-world sample instant. Alignment
//! walks every stream with a forward-only cursor, using run-type-bearing
//! streams to anchor the search, skipping ignored run types, and excluding
//! rows inside the instrument's flushing windows.
//!
//! The behaviour that varies with the averaging mode (what counts as a
//! matching time, how many rows one step consumes, how row values collapse
//! to a single value) is injected through the policies in [`policies`].

pub mod cursor;
pub mod line_source;
pub mod policies;
pub mod record;

#[cfg(test)]
pub mod tests;

// Re-export key types for convenience
pub use cursor::CursorState;
pub use line_source::{LineSource, MemoryLine, MemoryLineSource};
pub use policies::{AggregationPolicy, AlignmentPolicies, MatchPolicy, RowSelectionPolicy};
pub use record::{AssignmentValue, RawDataRecord};

use crate::app::models::{
    CalibrationSet, Dataset, FileDefinition, Instrument, RunTypeCategory, SensorAssignment,
};
use crate::config::AveragingMode;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, warn};

/// Absolute number of seconds between two times
fn seconds_between(first: DateTime<Utc>, second: DateTime<Utc>) -> i64 {
    (second - first).num_seconds().abs()
}

// =============================================================================
// Line walking
// =============================================================================

/// Outcome of skipping a run-type block's pre-flushing window
enum PreFlushOutcome {
    /// The window expired within the block; this row is usable
    Usable(usize),

    /// The run type changed before the window expired; this row starts the
    /// next block
    NewRunType(usize),

    /// The file ended inside the window
    Eof,
}

/// Forward walker over one file's rows, applying run-type and flushing
/// rules.
///
/// Row selection policies drive the walker to build a selection; the
/// aligner then copies the final cursor back into its per-file state.
pub struct LineWalker<'a> {
    definition: &'a FileDefinition,
    source: &'a dyn LineSource,
    lines: &'a [usize],
    pre_flushing_time: i64,
    post_flushing_time: i64,
    cursor: CursorState,
}

impl LineWalker<'_> {
    /// The timestamp of a row
    pub fn line_time(&self, row: usize) -> Result<DateTime<Utc>> {
        self.source.date(self.line_index(row)?)
    }

    /// Move the cursor to the next usable row and return it, or `None` at
    /// end of file
    pub fn advance(&mut self) -> Result<Option<usize>> {
        let next = self.next_usable_row(self.cursor)?;
        self.cursor = match next {
            Some(row) => CursorState::At(row),
            None => CursorState::Eof,
        };
        Ok(next)
    }

    /// Find the next usable row without moving the cursor
    pub fn peek(&self) -> Result<Option<usize>> {
        self.next_usable_row(self.cursor)
    }

    fn line_index(&self, row: usize) -> Result<usize> {
        self.lines.get(row).copied().ok_or_else(|| {
            Error::data_set(format!(
                "Row {row} out of range for file '{}'",
                self.source.file_name()
            ))
        })
    }

    fn run_type(&self, row: usize) -> Result<String> {
        let line = self.line_index(row)?;
        self.source.run_type(line)?.ok_or_else(|| {
            Error::data_file(self.source.file_name(), line, "Missing run type")
        })
    }

    fn is_ignored(&self, row: usize) -> Result<bool> {
        if !self.definition.has_run_types() {
            return Ok(false);
        }

        let run_type = self.run_type(row)?;
        Ok(self.definition.run_type_category(&run_type)? == &RunTypeCategory::Ignored)
    }

    /// Find the next usable row after the given cursor position.
    ///
    /// For streams without run types every row is usable. For run-type
    /// streams, ignored categories are skipped, the pre-flushing window
    /// after each run-type change is skipped, and rows inside the
    /// post-flushing window at the tail of a block are refused.
    fn next_usable_row(&self, from: CursorState) -> Result<Option<usize>> {
        let len = self.lines.len();

        let mut next = match from {
            CursorState::NotStarted => 0,
            CursorState::At(row) => row + 1,
            CursorState::Eof => return Ok(None),
        };

        if next >= len {
            return Ok(None);
        }

        if !self.definition.has_run_types() {
            return Ok(Some(next));
        }

        let current_run_type = match from {
            CursorState::At(row) => Some(self.run_type(row)?),
            _ => None,
        };

        let next_run_type = self.run_type(next)?;
        if current_run_type.as_deref() == Some(next_run_type.as_str()) {
            if !self.in_post_flushing_period(&next_run_type, next)? {
                return Ok(Some(next));
            }

            // The candidate sits in the unstable tail of its block; skip
            // the remainder of the block
            while next < len && self.run_type(next)? == next_run_type {
                next += 1;
            }
            if next >= len {
                return Ok(None);
            }
        }

        // We are at the first line of a new run type
        loop {
            while self.is_ignored(next)? {
                next += 1;
                if next >= len {
                    return Ok(None);
                }
            }

            let run_type = self.run_type(next)?;
            match self.skip_pre_flushing(&run_type, next)? {
                PreFlushOutcome::Usable(row) => return Ok(Some(row)),
                PreFlushOutcome::NewRunType(row) => next = row,
                PreFlushOutcome::Eof => return Ok(None),
            }
        }
    }

    /// Whether a row falls inside the post-flushing window at the tail of
    /// its run-type block.
    ///
    /// The block end is found by scanning forward until the run type
    /// changes; a forward line more than the window ahead proves the
    /// candidate is safe without finding the end. When the block ends at
    /// the file boundary the decision rests on the elapsed time to the last
    /// line of the block.
    fn in_post_flushing_period(&self, run_type: &str, row: usize) -> Result<bool> {
        if self.post_flushing_time == 0 {
            return Ok(false);
        }

        let candidate_time = self.line_time(row)?;
        let mut previous = row;
        let mut previous_time = candidate_time;

        loop {
            let next = previous + 1;
            if next >= self.lines.len() {
                return Ok(
                    seconds_between(candidate_time, previous_time) <= self.post_flushing_time
                );
            }

            if self.run_type(next)? != run_type {
                return Ok(
                    seconds_between(candidate_time, previous_time) <= self.post_flushing_time
                );
            }

            let next_time = self.line_time(next)?;
            if seconds_between(candidate_time, next_time) > self.post_flushing_time {
                return Ok(false);
            }

            previous = next;
            previous_time = next_time;
        }
    }

    /// Skip the pre-flushing window of a run-type block.
    ///
    /// `first` must be the first line of the block. Rows with timestamps in
    /// `[block_start, block_start + window)` are unstable; the first row at
    /// or beyond the window is usable.
    fn skip_pre_flushing(&self, run_type: &str, first: usize) -> Result<PreFlushOutcome> {
        if self.pre_flushing_time == 0 {
            return Ok(PreFlushOutcome::Usable(first));
        }

        let block_start = self.line_time(first)?;
        let mut row = first + 1;

        loop {
            if row >= self.lines.len() {
                return Ok(PreFlushOutcome::Eof);
            }

            if self.run_type(row)? != run_type {
                return Ok(PreFlushOutcome::NewRunType(row));
            }

            if seconds_between(block_start, self.line_time(row)?) >= self.pre_flushing_time {
                return Ok(PreFlushOutcome::Usable(row));
            }

            row += 1;
        }
    }
}

// =============================================================================
// The aligner
// =============================================================================

/// Per-file alignment state
struct FileState {
    source: Box<dyn LineSource>,
    /// Source line indices inside the dataset's time window
    lines: Vec<usize>,
    cursor: CursorState,
    /// Rows currently believed to contribute to the record being assembled
    selection: Option<Vec<usize>>,
}

/// The raw data for one dataset, walked record by record.
///
/// Construction eagerly indexes every stream's lines inside the dataset's
/// time window and verifies the calibration precondition; after that,
/// [`next_record`](Self::next_record) performs no I/O and no blocking.
pub struct DataSetRawData {
    instrument: Arc<Instrument>,
    files: Vec<FileState>,
    calibrations: CalibrationSet,
    policies: AlignmentPolicies,
    core_file: usize,
    position_file: Option<usize>,
}

impl DataSetRawData {
    /// Build the aligner for a dataset.
    ///
    /// `sources` must be ordered to match the instrument's file
    /// definitions. Fails if the instrument definition is inconsistent, a
    /// line's date cannot be read, or no valid calibration set covers the
    /// dataset start.
    pub fn new(
        instrument: Arc<Instrument>,
        dataset: &Dataset,
        sources: Vec<Box<dyn LineSource>>,
        calibrations: CalibrationSet,
        averaging_mode: AveragingMode,
    ) -> Result<Self> {
        instrument.validate()?;

        if sources.len() != instrument.file_definitions.len() {
            return Err(Error::configuration(format!(
                "Expected {} line sources for instrument '{}', got {}",
                instrument.file_definitions.len(),
                instrument.name,
                sources.len()
            )));
        }

        calibrations.check_valid(dataset.start)?;

        let mut files = Vec::with_capacity(sources.len());
        for source in sources {
            let mut lines = Vec::new();
            for line in source.first_data_line()..source.line_count() {
                let time = source.date(line)?;
                if time < dataset.start {
                    continue;
                }
                if time > dataset.end {
                    break;
                }
                lines.push(line);
            }

            debug!(
                "File '{}': {} lines within dataset window",
                source.file_name(),
                lines.len()
            );

            files.push(FileState {
                source,
                lines,
                cursor: CursorState::NotStarted,
                selection: None,
            });
        }

        let core_file = instrument
            .file_definitions
            .iter()
            .position(FileDefinition::has_run_types)
            .ok_or_else(|| {
                Error::configuration(format!(
                    "Instrument '{}' has no file definition with run types",
                    instrument.name
                ))
            })?;

        let position_file = instrument
            .file_definitions
            .iter()
            .position(|d| d.has_position);

        Ok(Self {
            instrument,
            files,
            calibrations,
            policies: AlignmentPolicies::for_mode(averaging_mode),
            core_file,
            position_file,
        })
    }

    /// Rewind all cursors so the dataset can be walked again.
    ///
    /// A reset aligner reproduces exactly the record sequence of a fresh
    /// instance over the same sources.
    pub fn reset(&mut self) {
        for file in &mut self.files {
            file.cursor = CursorState::NotStarted;
            file.selection = None;
        }
        debug!("Aligner reset to start of files");
    }

    /// Find the next aligned record, or `None` when any stream is
    /// exhausted before a full match is assembled.
    ///
    /// Records are emitted in non-decreasing time order. A record whose
    /// values cannot be extracted (e.g. an unparseable field) is logged and
    /// skipped, and the search continues.
    pub fn next_record(&mut self) -> Result<Option<RawDataRecord>> {
        loop {
            // Start from the run-type-bearing file with the smallest step
            // to its next row, so sparse streams don't burn candidates from
            // dense ones
            let mut current_file = self.anchor_file()?;
            let mut begin = true;
            let mut exhausted = false;

            while begin || !self.all_rows_match()? {
                if !self.select_next_rows(current_file)? {
                    exhausted = true;
                    break;
                }

                // If the new selection disagrees with the others, restart
                // the matching from this file's position
                if !self.selected_rows_match(current_file)? {
                    self.reset_other_files(current_file);
                }

                current_file = (current_file + 1) % self.files.len();
                begin = false;
            }

            if exhausted {
                return Ok(None);
            }

            match self.build_record() {
                Ok(record) => return Ok(Some(record)),
                Err(error) if error.is_recoverable() => {
                    warn!("Skipping unreadable record: {error}");
                }
                Err(error) => return Err(error),
            }
        }
    }

    /// Evaluate the aggregated, calibrated value of a sensor assignment for
    /// the currently selected rows
    pub fn sensor_value(&self, assignment: &SensorAssignment) -> Result<Option<f64>> {
        let file = self
            .instrument
            .file_definition_index(&assignment.file)
            .ok_or_else(|| {
                Error::configuration(format!(
                    "Sensor assignment {} references unknown file '{}'",
                    assignment.database_id, assignment.file
                ))
            })?;

        let state = &self.files[file];
        let rows = state.selection.as_ref().ok_or_else(|| {
            Error::data_set(format!(
                "No rows selected for file '{}'",
                assignment.file
            ))
        })?;

        let mut values = Vec::with_capacity(rows.len());
        for &row in rows {
            let line = self.line_index(file, row)?;
            let raw = state
                .source
                .field_value(line, assignment.column, &assignment.missing_value)?;
            values.push(raw.map(|v| self.calibrations.calibrate(assignment.database_id, v)));
        }

        Ok(self.policies.aggregator.aggregate(&values))
    }

    /// The calibration set in force for this dataset
    pub fn calibrations(&self) -> &CalibrationSet {
        &self.calibrations
    }

    // -------------------------------------------------------------------------
    // Selection machinery
    // -------------------------------------------------------------------------

    /// Choose the file to drive the next matching round: the
    /// run-type-bearing file whose next row is temporally closest to its
    /// current row
    fn anchor_file(&self) -> Result<usize> {
        let mut anchor = self.core_file;
        let mut smallest = i64::MAX;

        for (i, state) in self.files.iter().enumerate() {
            if !self.instrument.file_definitions[i].has_run_types() {
                continue;
            }

            if let CursorState::At(row) = state.cursor {
                if row + 1 < state.lines.len() {
                    let increment =
                        (self.row_time(i, row + 1)? - self.row_time(i, row)?).num_seconds();
                    if increment < smallest {
                        smallest = increment;
                        anchor = i;
                    }
                }
            }
        }

        Ok(anchor)
    }

    /// Advance one file's selection through the row selection policy.
    /// Returns `false` when the file is exhausted.
    ///
    /// The selection time of another already-selected file is handed to the
    /// policy so that a lagging file can catch up in one step.
    fn select_next_rows(&mut self, file: usize) -> Result<bool> {
        let target = self.other_selection_time(file)?;

        let instrument = Arc::clone(&self.instrument);
        let state = &mut self.files[file];

        let mut walker = LineWalker {
            definition: &instrument.file_definitions[file],
            source: state.source.as_ref(),
            lines: &state.lines,
            pre_flushing_time: instrument.pre_flushing_time,
            post_flushing_time: instrument.post_flushing_time,
            cursor: state.cursor,
        };

        let rows = self
            .policies
            .selector
            .select_rows(&mut walker, self.policies.matcher.as_ref(), target)?;
        let cursor = walker.cursor;

        let state = &mut self.files[file];
        state.cursor = cursor;

        match rows {
            Some(rows) => {
                state.selection = Some(rows);
                Ok(true)
            }
            None => {
                state.cursor = CursorState::Eof;
                state.selection = None;
                Ok(false)
            }
        }
    }

    /// Whether every file has a selection and they all mutually match
    fn all_rows_match(&self) -> Result<bool> {
        if self.files.iter().any(|f| f.selection.is_none()) {
            return Ok(false);
        }

        self.selected_rows_match(0)
    }

    /// Whether every other file with a selection matches the given file's
    /// selection. Files without selections are not checked.
    fn selected_rows_match(&self, file: usize) -> Result<bool> {
        for i in 0..self.files.len() {
            if i != file && !self.line_selections_match(file, i)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn line_selections_match(&self, file1: usize, file2: usize) -> Result<bool> {
        match (self.selection_time(file1)?, self.selection_time(file2)?) {
            (Some(first), Some(second)) => {
                Ok(self.policies.matcher.times_match(first, second))
            }
            _ => Ok(true),
        }
    }

    /// Clear the selections of every file except the specified one
    fn reset_other_files(&mut self, file: usize) {
        for (i, state) in self.files.iter_mut().enumerate() {
            if i != file {
                state.selection = None;
            }
        }
    }

    /// The selection time of the first other file that has one, if any
    fn other_selection_time(&self, file: usize) -> Result<Option<DateTime<Utc>>> {
        for i in 0..self.files.len() {
            if i != file {
                if let Some(time) = self.selection_time(i)? {
                    return Ok(Some(time));
                }
            }
        }

        Ok(None)
    }

    /// The time of a file's selection (its first selected row), if any
    fn selection_time(&self, file: usize) -> Result<Option<DateTime<Utc>>> {
        match &self.files[file].selection {
            Some(rows) => match rows.first() {
                Some(&row) => Ok(Some(self.row_time(file, row)?)),
                None => Ok(None),
            },
            None => Ok(None),
        }
    }

    fn line_index(&self, file: usize, row: usize) -> Result<usize> {
        self.files[file].lines.get(row).copied().ok_or_else(|| {
            Error::data_set(format!(
                "Row {row} out of range for file '{}'",
                self.files[file].source.file_name()
            ))
        })
    }

    fn row_time(&self, file: usize, row: usize) -> Result<DateTime<Utc>> {
        let line = self.line_index(file, row)?;
        self.files[file].source.date(line)
    }

    fn row_run_type(&self, file: usize, row: usize) -> Result<String> {
        let line = self.line_index(file, row)?;
        self.files[file].source.run_type(line)?.ok_or_else(|| {
            Error::data_file(
                self.files[file].source.file_name(),
                line,
                "Missing run type",
            )
        })
    }

    // -------------------------------------------------------------------------
    // Record construction
    // -------------------------------------------------------------------------

    /// Build the output record from the currently selected rows
    fn build_record(&self) -> Result<RawDataRecord> {
        let core_rows = self.files[self.core_file].selection.as_ref().ok_or_else(|| {
            Error::data_set("No selection for the core file")
        })?;
        let core_row = *core_rows
            .first()
            .ok_or_else(|| Error::data_set("Empty selection for the core file"))?;

        let run_type = self.row_run_type(self.core_file, core_row)?;
        let category = self.instrument.file_definitions[self.core_file]
            .run_type_category(&run_type)?
            .clone();

        let time = self
            .policies
            .matcher
            .record_time(self.row_time(self.core_file, core_row)?);

        // Position only applies to real measurements
        let (longitude, latitude) = if category.is_measurement() {
            self.selected_position()?
        } else {
            (None, None)
        };

        let mut values = Vec::new();
        for assignment in self.instrument.measurement_assignments() {
            values.push(AssignmentValue {
                database_id: assignment.database_id,
                sensor_type: assignment.sensor_type.clone(),
                value: self.sensor_value(assignment)?,
            });
        }

        Ok(RawDataRecord {
            time,
            run_type,
            category,
            longitude,
            latitude,
            values,
        })
    }

    fn selected_position(&self) -> Result<(Option<f64>, Option<f64>)> {
        let file = match self.position_file {
            Some(file) => file,
            None => return Ok((None, None)),
        };

        let rows = self.files[file].selection.as_ref().ok_or_else(|| {
            Error::data_set("No selection for the position file")
        })?;
        let row = *rows
            .first()
            .ok_or_else(|| Error::data_set("Empty selection for the position file"))?;
        let line = self.line_index(file, row)?;

        let source = self.files[file].source.as_ref();
        Ok((Some(source.longitude(line)?), Some(source.latitude(line)?)))
    }
}
