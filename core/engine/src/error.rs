//! FILENAME: core/engine/src/error.rs
//! PURPOSE: Errors raised by structural sheet operations.

use crate::cell::CellType;

#[derive(Debug, Clone, PartialEq)]
pub enum SheetError {
    /// A column index outside the sheet was addressed.
    ColumnOutOfRange { index: usize, len: usize },
    /// A cell's text does not match the numeric type it claims to be.
    CorruptCell {
        row: usize,
        col: usize,
        cell_type: CellType,
        value: String,
    },
}

impl std::fmt::Display for SheetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SheetError::ColumnOutOfRange { index, len } => {
                write!(f, "column {} out of range (sheet has {} columns)", index, len)
            }
            SheetError::CorruptCell {
                row,
                col,
                cell_type,
                value,
            } => write!(
                f,
                "cell {}/{} is tagged {:?} but holds '{}'",
                row, col, cell_type, value
            ),
        }
    }
}

impl std::error::Error for SheetError {}

pub type SheetResult<T> = Result<T, SheetError>;
