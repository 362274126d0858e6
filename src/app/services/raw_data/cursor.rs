//! File cursor state for record alignment
//!
//! Each file stream in a dataset has one cursor. Cursors only move forward
//! during a scan; the only way back is a full [`reset`] of the aligner.
//!
//! [`reset`]: super::DataSetRawData::reset

use serde::{Deserialize, Serialize};

/// Position of a file cursor during record alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CursorState {
    /// Processing of the file has not started
    NotStarted,

    /// The cursor is at the given row index
    At(usize),

    /// The cursor has moved past the end of the file
    Eof,
}

impl CursorState {
    /// Whether the cursor has consumed the whole file
    pub fn is_eof(self) -> bool {
        matches!(self, CursorState::Eof)
    }

    /// Whether the cursor has moved off its starting state
    pub fn is_started(self) -> bool {
        !matches!(self, CursorState::NotStarted)
    }

    /// The row index, if the cursor is positioned on one
    pub fn position(self) -> Option<usize> {
        match self {
            CursorState::At(row) => Some(row),
            _ => None,
        }
    }
}

impl Default for CursorState {
    fn default() -> Self {
        CursorState::NotStarted
    }
}
