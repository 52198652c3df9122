//! FILENAME: core/engine/src/coord.rs
//! PURPOSE: Cell addressing helpers.
//! CONTEXT: Internally every position is a 0-based (row, col) pair. Errors are
//! reported as "<row>/<col>"; A1 notation is available for human-facing output.

use serde::{Deserialize, Serialize};

/// A 0-based cell position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellAddress {
    pub row: usize,
    pub col: usize,
}

impl CellAddress {
    pub fn new(row: usize, col: usize) -> Self {
        CellAddress { row, col }
    }

    /// (0, 0) -> "A1", (99, 26) -> "AA100"
    pub fn to_a1(&self) -> String {
        format!("{}{}", index_to_col(self.col), self.row + 1)
    }

    /// Parses an A1 reference such as "B3". `$` markers are not accepted.
    pub fn from_a1(reference: &str) -> Option<Self> {
        let split = reference.find(|c: char| !c.is_ascii_alphabetic())?;
        let (letters, digits) = reference.split_at(split);
        let row: usize = digits.parse().ok()?;
        if row == 0 {
            return None;
        }
        Some(CellAddress::new(row - 1, col_to_index(letters)?))
    }
}

impl std::fmt::Display for CellAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.row, self.col)
    }
}

/// Converts a column string to a 0-based index.
/// "A" -> 0, "Z" -> 25, "AA" -> 26. Returns None for empty or non-letter input.
pub fn col_to_index(col_str: &str) -> Option<usize> {
    if col_str.is_empty() {
        return None;
    }
    let mut result: usize = 0;
    for c in col_str.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let digit = (c.to_ascii_uppercase() as usize) - ('A' as usize) + 1;
        result = result.checked_mul(26)?.checked_add(digit)?;
    }
    Some(result - 1)
}

/// Converts a 0-based column index to a column string.
/// 0 -> "A", 25 -> "Z", 26 -> "AA"
pub fn index_to_col(mut col_index: usize) -> String {
    let mut result = String::new();
    loop {
        let remainder = col_index % 26;
        result.insert(0, (b'A' + remainder as u8) as char);
        if col_index < 26 {
            break;
        }
        col_index = col_index / 26 - 1;
    }
    result
}
