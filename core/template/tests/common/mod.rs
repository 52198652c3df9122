//! FILENAME: tests/common/mod.rs
//! Fixtures shared by the template integration tests.

#![allow(dead_code)]

use engine::{Cell, Sheet};
use serde_json::Value;
use template::{Template, TemplateResult};

/// Builds a sheet from rows of cell text.
pub fn sheet(rows: &[&[&str]]) -> Sheet {
    let rows: Vec<Vec<&str>> = rows.iter().map(|r| r.to_vec()).collect();
    Sheet::from_rows("test", &rows)
}

/// Renders `sheet` in place with the default configuration.
pub fn render(sheet: &mut Sheet, data: &Value) -> TemplateResult<()> {
    Template::new(sheet).execute(data).map(|_| ())
}

pub fn values(sheet: &Sheet) -> Vec<Vec<String>> {
    sheet
        .rows()
        .iter()
        .map(|row| row.cells.iter().map(|c| c.value.clone()).collect())
        .collect()
}

/// Compares cell text row by row, reporting the first difference.
pub fn assert_sheet_values(got: &Sheet, want: &[&[&str]]) {
    assert_eq!(got.row_count(), want.len(), "row count");
    for (row, expected) in want.iter().enumerate() {
        let actual: Vec<&str> = got.rows()[row]
            .cells
            .iter()
            .map(|c: &Cell| c.value.as_str())
            .collect();
        assert_eq!(&actual, expected, "row {}", row);
    }
}
