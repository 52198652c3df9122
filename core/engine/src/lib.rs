//! FILENAME: core/engine/src/lib.rs
//! PURPOSE: Main library entry point for the sheet model.
//! CONTEXT: Re-exports public types and modules for use by other crates.

pub mod cell;
pub mod coord;
pub mod error;
pub mod sheet;
pub mod style;

// Re-export commonly used types at the crate root
pub use cell::{format_number, Cell, CellType};
pub use coord::{col_to_index, index_to_col, CellAddress};
pub use error::{SheetError, SheetResult};
pub use sheet::{Column, Row, Sheet};
pub use style::{CellStyle, Color, FontStyle, StyleRegistry};
