//! FILENAME: core/engine/src/sheet.rs
//! PURPOSE: Dense row/column sheet model with structural column operations.
//! CONTEXT: A Sheet is an ordered list of rows plus a parallel list of column
//! descriptors. Every row always holds exactly one cell per column; the
//! structural operations below restore that before they return.

use serde::{Deserialize, Serialize};

use crate::cell::Cell;
use crate::error::{SheetError, SheetResult};
use crate::style::StyleRegistry;

/// Column-level metadata. Columns own no cell content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Column {
    /// Width in character units; None means the application default.
    pub width: Option<f64>,
    pub style_index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Row {
    pub cells: Vec<Cell>,
    pub height: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sheet {
    pub name: String,
    rows: Vec<Row>,
    columns: Vec<Column>,
    pub styles: StyleRegistry,
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Sheet {
            name: name.into(),
            rows: Vec::new(),
            columns: Vec::new(),
            styles: StyleRegistry::new(),
        }
    }

    /// Builds a sheet of string cells. Short rows are padded with empty cells.
    pub fn from_rows<S: AsRef<str>>(name: impl Into<String>, rows: &[Vec<S>]) -> Self {
        let mut sheet = Sheet::new(name);
        let width = rows.iter().map(|r| r.len()).max().unwrap_or(0);
        sheet.columns = vec![Column::default(); width];

        for values in rows {
            let row = sheet.add_row();
            for (col, value) in values.iter().enumerate() {
                let value = value.as_ref();
                if !value.is_empty() {
                    row.cells[col].set_string(value);
                }
            }
        }
        sheet
    }

    /// Appends a row holding one empty cell per column.
    pub fn add_row(&mut self) -> &mut Row {
        let row = Row {
            cells: vec![Cell::new(); self.columns.len()],
            height: None,
        };
        self.rows.push(row);
        let last = self.rows.len() - 1;
        &mut self.rows[last]
    }

    /// Appends an empty column, growing every row.
    pub fn add_column(&mut self) -> usize {
        let index = self.columns.len();
        self.columns.push(Column::default());
        for row in self.rows.iter_mut() {
            row.cells.push(Cell::new());
        }
        index
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.rows.get(row).and_then(|r| r.cells.get(col))
    }

    pub fn cell_mut(&mut self, row: usize, col: usize) -> Option<&mut Cell> {
        self.rows.get_mut(row).and_then(|r| r.cells.get_mut(col))
    }

    pub fn column(&self, col: usize) -> Option<&Column> {
        self.columns.get(col)
    }

    pub fn column_mut(&mut self, col: usize) -> Option<&mut Column> {
        self.columns.get_mut(col)
    }

    pub fn row_mut(&mut self, row: usize) -> Option<&mut Row> {
        self.rows.get_mut(row)
    }

    /// Cells of one column, top to bottom.
    pub fn column_cells(&self, col: usize) -> impl Iterator<Item = &Cell> + '_ {
        self.rows.iter().filter_map(move |r| r.cells.get(col))
    }

    pub fn column_cells_mut(&mut self, col: usize) -> impl Iterator<Item = &mut Cell> + '_ {
        self.rows.iter_mut().filter_map(move |r| r.cells.get_mut(col))
    }

    /// Every cell with its (row, col) position, in reading order.
    pub fn cells_mut(&mut self) -> impl Iterator<Item = ((usize, usize), &mut Cell)> + '_ {
        self.rows.iter_mut().enumerate().flat_map(|(r, row)| {
            row.cells
                .iter_mut()
                .enumerate()
                .map(move |(c, cell)| ((r, c), cell))
        })
    }

    pub fn column_width(&self, col: usize) -> Option<f64> {
        self.columns.get(col).and_then(|c| c.width)
    }

    pub fn set_column_width(&mut self, col: usize, width: f64) -> SheetResult<()> {
        let len = self.columns.len();
        let column = self
            .columns
            .get_mut(col)
            .ok_or(SheetError::ColumnOutOfRange { index: col, len })?;
        column.width = Some(width);
        Ok(())
    }

    // ========================================================================
    // STRUCTURE
    // ========================================================================

    /// Inserts an empty column descriptor and an empty cell in every row at
    /// `index`, shifting everything at `>= index` one position right.
    /// `index == column_count()` appends.
    pub fn insert_column_at(&mut self, index: usize) -> SheetResult<()> {
        if index > self.columns.len() {
            return Err(SheetError::ColumnOutOfRange {
                index,
                len: self.columns.len(),
            });
        }

        self.columns.insert(index, Column::default());
        for row in self.rows.iter_mut() {
            // Rows are kept at full width, but never index past a short one.
            let at = index.min(row.cells.len());
            row.cells.insert(at, Cell::new());
        }
        Ok(())
    }

    /// Copies every cell of column `from` into column `to`, preserving type
    /// tags and styles, then copies the column's width and style.
    /// Nothing is written if any source cell turns out to be corrupt.
    pub fn copy_column(&mut self, from: usize, to: usize) -> SheetResult<()> {
        let len = self.columns.len();
        for index in [from, to] {
            if index >= len {
                return Err(SheetError::ColumnOutOfRange { index, len });
            }
        }

        let mut copies = Vec::with_capacity(self.rows.len());
        for (row_idx, row) in self.rows.iter().enumerate() {
            let source = &row.cells[from];
            let copy = source.copy_typed().map_err(|_| SheetError::CorruptCell {
                row: row_idx,
                col: from,
                cell_type: source.cell_type,
                value: source.value.clone(),
            })?;
            copies.push(copy);
        }

        for (row, copy) in self.rows.iter_mut().zip(copies) {
            row.cells[to] = copy;
        }

        let source_column = self.columns[from].clone();
        self.columns[to] = source_column;
        Ok(())
    }

    /// Duplicates column `index` into a freshly inserted column at `index + 1`.
    pub fn copy_column_to_right(&mut self, index: usize) -> SheetResult<()> {
        if index >= self.columns.len() {
            return Err(SheetError::ColumnOutOfRange {
                index,
                len: self.columns.len(),
            });
        }
        self.insert_column_at(index + 1)?;
        self.copy_column(index, index + 1)
    }
}

impl Default for Sheet {
    fn default() -> Self {
        Sheet::new("Sheet1")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CellType;

    fn values(sheet: &Sheet) -> Vec<Vec<String>> {
        sheet
            .rows()
            .iter()
            .map(|r| r.cells.iter().map(|c| c.value.clone()).collect())
            .collect()
    }

    fn assert_rectangular(sheet: &Sheet) {
        for row in sheet.rows() {
            assert_eq!(row.cells.len(), sheet.column_count());
        }
    }

    #[test]
    fn test_from_rows_pads_short_rows() {
        let sheet = Sheet::from_rows("test", &[vec!["a", "b", "c"], vec!["d"]]);
        assert_eq!(sheet.column_count(), 3);
        assert_eq!(sheet.row_count(), 2);
        assert_rectangular(&sheet);
        assert_eq!(sheet.cell(1, 2).unwrap().cell_type, CellType::General);
        assert_eq!(sheet.cell(0, 1).unwrap().cell_type, CellType::String);
    }

    #[test]
    fn test_insert_column_shifts_right() {
        let mut sheet = Sheet::from_rows("test", &[vec!["a", "b"], vec!["c", "d"]]);
        sheet.insert_column_at(1).unwrap();

        assert_eq!(sheet.column_count(), 3);
        assert_rectangular(&sheet);
        assert_eq!(values(&sheet), vec![vec!["a", "", "b"], vec!["c", "", "d"]]);
    }

    #[test]
    fn test_insert_column_appends_at_end() {
        let mut sheet = Sheet::from_rows("test", &[vec!["a"]]);
        sheet.insert_column_at(1).unwrap();
        assert_eq!(values(&sheet), vec![vec!["a", ""]]);

        let err = sheet.insert_column_at(5).unwrap_err();
        assert_eq!(err, SheetError::ColumnOutOfRange { index: 5, len: 2 });
    }

    #[test]
    fn test_copy_column_copies_width_and_style() {
        let mut sheet = Sheet::from_rows("test", &[vec!["a", "b"]]);
        sheet.set_column_width(0, 21.5).unwrap();
        sheet.column_mut(0).unwrap().style_index = 2;
        sheet.cell_mut(0, 0).unwrap().style_index = 4;

        sheet.copy_column(0, 1).unwrap();

        assert_eq!(sheet.column_width(1), Some(21.5));
        assert_eq!(sheet.column(1).unwrap().style_index, 2);
        assert_eq!(sheet.cell(0, 1).unwrap().value, "a");
        assert_eq!(sheet.cell(0, 1).unwrap().style_index, 4);
    }

    #[test]
    fn test_copy_column_to_right() {
        let mut sheet = Sheet::from_rows("test", &[vec!["h1", "h2", "h3"], vec!["x", "y", "z"]]);
        sheet.cell_mut(1, 1).unwrap().set_number(7.0);

        sheet.copy_column_to_right(1).unwrap();

        assert_rectangular(&sheet);
        assert_eq!(
            values(&sheet),
            vec![vec!["h1", "h2", "h2", "h3"], vec!["x", "7", "7", "z"]]
        );
        assert_eq!(sheet.cell(1, 2).unwrap().cell_type, CellType::Number);
    }

    #[test]
    fn test_copy_column_rejects_corrupt_number_without_writing() {
        let mut sheet = Sheet::from_rows("test", &[vec!["ok", ""], vec!["bad", ""]]);
        let cell = sheet.cell_mut(1, 0).unwrap();
        cell.cell_type = CellType::Number;

        let err = sheet.copy_column(0, 1).unwrap_err();
        assert!(matches!(err, SheetError::CorruptCell { row: 1, col: 0, .. }));
        assert_eq!(sheet.cell(0, 1).unwrap().value, "");
    }

    #[test]
    fn test_copy_column_to_right_out_of_range() {
        let mut sheet = Sheet::from_rows("test", &[vec!["a"]]);
        assert!(sheet.copy_column_to_right(1).is_err());
        assert_eq!(sheet.column_count(), 1);
    }

    #[test]
    fn test_cells_mut_visits_reading_order() {
        let mut sheet = Sheet::from_rows("test", &[vec!["a", "b"], vec!["c", "d"]]);
        let order: Vec<(usize, usize)> = sheet.cells_mut().map(|(pos, _)| pos).collect();
        assert_eq!(order, vec![(0, 0), (0, 1), (1, 0), (1, 1)]);
    }
}
