//! FILENAME: core/engine/src/cell.rs
//! PURPOSE: Defines the fundamental data structure for a single sheet cell.
//! CONTEXT: A cell keeps its raw text exactly as it was loaded, plus a type tag
//! telling readers how to interpret that text. Template rendering works on the
//! raw text; the typed setters/getters convert on demand.

use serde::{Deserialize, Serialize};
use std::num::ParseFloatError;

/// How the raw text of a cell should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CellType {
    String,
    Number,
    Boolean,
    Formula,
    /// Serial date number; the cell's `number_format` says how to display it.
    Date,
    Error,
    #[default]
    General,
}

/// The atomic unit of the sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Cell {
    /// Raw text. For numbers and dates this is the decimal representation.
    pub value: String,
    pub cell_type: CellType,
    pub style_index: usize,
    pub number_format: Option<String>,
}

impl Cell {
    pub fn new() -> Self {
        Cell {
            value: String::new(),
            cell_type: CellType::General,
            style_index: 0,
            number_format: None,
        }
    }

    pub fn new_text(text: impl Into<String>) -> Self {
        let mut cell = Cell::new();
        cell.set_string(text);
        cell
    }

    pub fn new_number(num: f64) -> Self {
        let mut cell = Cell::new();
        cell.set_number(num);
        cell
    }

    pub fn new_formula(formula: impl Into<String>) -> Self {
        let mut cell = Cell::new();
        cell.set_formula(formula);
        cell
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    pub fn set_string(&mut self, text: impl Into<String>) {
        self.value = text.into();
        self.cell_type = CellType::String;
    }

    pub fn set_number(&mut self, num: f64) {
        self.value = format_number(num);
        self.cell_type = CellType::Number;
    }

    pub fn set_bool(&mut self, value: bool) {
        self.value = String::from(if value { "TRUE" } else { "FALSE" });
        self.cell_type = CellType::Boolean;
    }

    pub fn set_formula(&mut self, formula: impl Into<String>) {
        self.value = formula.into();
        self.cell_type = CellType::Formula;
    }

    /// Stores a serial date number together with the format used to display it.
    pub fn set_date_with_format(&mut self, serial: f64, number_format: Option<String>) {
        self.value = format_number(serial);
        self.cell_type = CellType::Date;
        self.number_format = number_format;
    }

    /// Stores text without committing to a specific type.
    pub fn set_value(&mut self, text: impl Into<String>) {
        self.value = text.into();
        self.cell_type = CellType::General;
    }

    /// Parses the raw text as a number.
    pub fn number(&self) -> Result<f64, ParseFloatError> {
        self.value.trim().parse::<f64>()
    }

    pub fn bool_value(&self) -> bool {
        let v = self.value.trim();
        v == "1" || v.eq_ignore_ascii_case("true")
    }

    /// Reproduces this cell through the setter matching its type tag.
    /// Numbers and dates are re-parsed, so a cell whose text does not match
    /// its declared numeric type is rejected.
    pub fn copy_typed(&self) -> Result<Cell, ParseFloatError> {
        let mut copy = Cell::new();
        match self.cell_type {
            CellType::String => copy.set_string(self.value.clone()),
            CellType::Formula => copy.set_formula(self.value.clone()),
            CellType::Number => copy.set_number(self.number()?),
            CellType::Boolean => copy.set_bool(self.bool_value()),
            CellType::Date => {
                copy.set_date_with_format(self.number()?, self.number_format.clone())
            }
            CellType::Error => {
                copy.value = self.value.clone();
                copy.cell_type = CellType::Error;
            }
            CellType::General => copy.set_value(self.value.clone()),
        }
        if copy.number_format.is_none() {
            copy.number_format = self.number_format.clone();
        }
        copy.style_index = self.style_index;
        Ok(copy)
    }
}

/// Formats a number without unnecessary decimal places.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{:.0}", n)
    } else {
        format!("{}", n)
    }
}
