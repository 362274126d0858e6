//! Alignment strategy policies
//!
//! The aligner's behaviour under different averaging modes is composed from
//! three small strategies rather than inheritance:
//!
//! - [`MatchPolicy`] decides whether two files' selections represent the
//!   same sample instant, and what timestamp an emitted record carries
//! - [`RowSelectionPolicy`] decides how many rows one selection step
//!   consumes from a file
//! - [`AggregationPolicy`] collapses the per-row values of a selection into
//!   one value per sensor assignment
//!
//! The shipped combinations correspond to the "None" and "Every minute"
//! averaging modes.

use super::LineWalker;
use crate::Result;
use crate::config::AveragingMode;
use chrono::{DateTime, Duration, DurationRound, Utc};

/// Decides whether two selections represent the same sample instant
pub trait MatchPolicy: std::fmt::Debug {
    /// Whether two selection times match
    fn times_match(&self, first: DateTime<Utc>, second: DateTime<Utc>) -> bool;

    /// The timestamp an emitted record carries, given the core file's
    /// selection time
    fn record_time(&self, selection_time: DateTime<Utc>) -> DateTime<Utc> {
        selection_time
    }
}

/// Selects the next row(s) of a file that form one record's contribution
pub trait RowSelectionPolicy: std::fmt::Debug {
    /// Advance the walker and return the selected row indices, or `None`
    /// when the file is exhausted.
    ///
    /// `target` is the selection time of another file in the current
    /// matching round, if one exists. The policy must advance at least one
    /// row, and should keep advancing rows that fall before the target so a
    /// lagging file catches up in a single step instead of forcing the
    /// other files to be re-selected once per row.
    fn select_rows(
        &self,
        walker: &mut LineWalker<'_>,
        matcher: &dyn MatchPolicy,
        target: Option<DateTime<Utc>>,
    ) -> Result<Option<Vec<usize>>>;
}

/// Advance to the next usable row, then keep advancing while rows fall
/// strictly before the target without matching it
fn advance_towards(
    walker: &mut LineWalker<'_>,
    matcher: &dyn MatchPolicy,
    target: Option<DateTime<Utc>>,
) -> Result<Option<usize>> {
    let mut row = walker.advance()?;

    if let Some(target) = target {
        while let Some(current) = row {
            let time = walker.line_time(current)?;
            if time >= target || matcher.times_match(time, target) {
                break;
            }
            row = walker.advance()?;
        }
    }

    Ok(row)
}

/// Collapses the values extracted from a selection's rows into one value
pub trait AggregationPolicy: std::fmt::Debug {
    /// Aggregate the per-row values; `None` when nothing usable remains
    fn aggregate(&self, values: &[Option<f64>]) -> Option<f64>;
}

// =============================================================================
// No averaging
// =============================================================================

/// Exact timestamp matching for unaveraged alignment
#[derive(Debug, Default)]
pub struct ExactTimeMatch;

impl MatchPolicy for ExactTimeMatch {
    fn times_match(&self, first: DateTime<Utc>, second: DateTime<Utc>) -> bool {
        first == second
    }
}

/// One row per selection step
#[derive(Debug, Default)]
pub struct SingleRowSelection;

impl RowSelectionPolicy for SingleRowSelection {
    fn select_rows(
        &self,
        walker: &mut LineWalker<'_>,
        matcher: &dyn MatchPolicy,
        target: Option<DateTime<Utc>>,
    ) -> Result<Option<Vec<usize>>> {
        Ok(advance_towards(walker, matcher, target)?.map(|row| vec![row]))
    }
}

/// Pass the single selected value through, honouring the missing-value
/// policy
#[derive(Debug, Default)]
pub struct FirstValueAggregation;

impl AggregationPolicy for FirstValueAggregation {
    fn aggregate(&self, values: &[Option<f64>]) -> Option<f64> {
        values.iter().copied().flatten().next()
    }
}

// =============================================================================
// Every-minute averaging
// =============================================================================

/// Truncate a time to the start of its UTC minute
fn minute_bucket(time: DateTime<Utc>) -> DateTime<Utc> {
    time.duration_trunc(Duration::minutes(1)).unwrap_or(time)
}

/// Same-UTC-minute matching for averaged alignment
#[derive(Debug, Default)]
pub struct SameMinuteMatch;

impl MatchPolicy for SameMinuteMatch {
    fn times_match(&self, first: DateTime<Utc>, second: DateTime<Utc>) -> bool {
        minute_bucket(first) == minute_bucket(second)
    }

    fn record_time(&self, selection_time: DateTime<Utc>) -> DateTime<Utc> {
        minute_bucket(selection_time)
    }
}

/// All usable rows within the first row's UTC minute
#[derive(Debug, Default)]
pub struct MinuteRowSelection;

impl RowSelectionPolicy for MinuteRowSelection {
    fn select_rows(
        &self,
        walker: &mut LineWalker<'_>,
        matcher: &dyn MatchPolicy,
        target: Option<DateTime<Utc>>,
    ) -> Result<Option<Vec<usize>>> {
        let first = match advance_towards(walker, matcher, target)? {
            Some(row) => row,
            None => return Ok(None),
        };

        let first_time = walker.line_time(first)?;
        let mut rows = vec![first];

        // Pull in subsequent usable rows while they stay in the same bucket
        while let Some(candidate) = walker.peek()? {
            if !matcher.times_match(first_time, walker.line_time(candidate)?) {
                break;
            }
            walker.advance()?;
            rows.push(candidate);
        }

        Ok(Some(rows))
    }
}

/// Arithmetic mean, ignoring missing values
#[derive(Debug, Default)]
pub struct MeanAggregation;

impl AggregationPolicy for MeanAggregation {
    fn aggregate(&self, values: &[Option<f64>]) -> Option<f64> {
        let present: Vec<f64> = values.iter().copied().flatten().collect();

        if present.is_empty() {
            None
        } else {
            Some(present.iter().sum::<f64>() / present.len() as f64)
        }
    }
}

// =============================================================================
// Policy assembly
// =============================================================================

/// The policy triple driving one aligner instance
pub struct AlignmentPolicies {
    /// Selection matching
    pub matcher: Box<dyn MatchPolicy>,

    /// Row selection
    pub selector: Box<dyn RowSelectionPolicy>,

    /// Value aggregation
    pub aggregator: Box<dyn AggregationPolicy>,
}

impl AlignmentPolicies {
    /// Build the policies for an averaging mode
    pub fn for_mode(mode: AveragingMode) -> Self {
        match mode {
            AveragingMode::None => Self {
                matcher: Box::new(ExactTimeMatch),
                selector: Box::new(SingleRowSelection),
                aggregator: Box::new(FirstValueAggregation),
            },
            AveragingMode::EveryMinute => Self {
                matcher: Box::new(SameMinuteMatch),
                selector: Box::new(MinuteRowSelection),
                aggregator: Box::new(MeanAggregation),
            },
        }
    }
}

impl std::fmt::Debug for AlignmentPolicies {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlignmentPolicies")
            .field("matcher", &self.matcher)
            .field("selector", &self.selector)
            .field("aggregator", &self.aggregator)
            .finish()
    }
}
