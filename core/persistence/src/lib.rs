//! FILENAME: core/persistence/src/lib.rs
//! Persistence Module
//!
//! Loads XLSX templates into engine sheets and saves rendered sheets back.

mod error;
mod fixes;
mod ooxml;
mod xlsx_reader;
mod xlsx_writer;

pub use error::PersistenceError;
pub use fixes::libre_office_fill_fix;
pub use xlsx_reader::load_xlsx;
pub use xlsx_writer::save_xlsx;

use engine::Sheet;
use serde::{Deserialize, Serialize};

// ============================================================================
// WORKBOOK
// ============================================================================

/// An ordered set of sheets as read from or written to one file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new() -> Self {
        Self {
            sheets: vec![Sheet::new("Sheet1")],
        }
    }

    pub fn from_sheets(sheets: Vec<Sheet>) -> Self {
        Self { sheets }
    }

    pub fn sheet(&self, name: &str) -> Result<&Sheet, PersistenceError> {
        self.sheets
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| PersistenceError::SheetNotFound(name.to_string()))
    }

    pub fn sheet_mut(&mut self, name: &str) -> Result<&mut Sheet, PersistenceError> {
        self.sheets
            .iter_mut()
            .find(|s| s.name == name)
            .ok_or_else(|| PersistenceError::SheetNotFound(name.to_string()))
    }
}

impl Default for Workbook {
    fn default() -> Self {
        Self::new()
    }
}
