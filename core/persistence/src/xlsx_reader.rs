//! FILENAME: core/persistence/src/xlsx_reader.rs
//! PURPOSE: Loads an XLSX file into dense engine sheets.
//! CONTEXT: Values and formulas come from calamine. Styles, widths and
//! heights come from the package scan in `ooxml`. calamine ranges start at
//! the first used cell; positions are shifted back so that the engine sheet
//! always starts at A1.

use std::path::Path;

use calamine::{open_workbook, Data, Range, Reader, Xlsx};
use engine::{Cell, Sheet};
use log::debug;

use crate::ooxml::{Package, SheetLayout, StyleSheet};
use crate::{PersistenceError, Workbook};

pub fn load_xlsx(path: &Path) -> Result<Workbook, PersistenceError> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    let sheet_names = workbook.sheet_names().to_vec();

    if sheet_names.is_empty() {
        return Err(PersistenceError::InvalidFormat(
            "Workbook contains no sheets".to_string(),
        ));
    }

    let mut package = Package::open(path)?;
    let styles = package.styles()?;
    let parts = package.sheet_parts()?;

    let mut sheets = Vec::new();
    for sheet_name in &sheet_names {
        let range = workbook
            .worksheet_range(sheet_name)
            .map_err(|e| PersistenceError::InvalidFormat(e.to_string()))?;
        let formulas = workbook.worksheet_formula(sheet_name).ok();

        let layout = match parts.get(sheet_name) {
            Some(part) => package.sheet_layout(part)?,
            None => SheetLayout::default(),
        };

        let sheet = build_sheet(sheet_name, &range, formulas.as_ref(), &layout, &styles);
        debug!(
            "loaded sheet '{}': {} rows x {} columns",
            sheet.name,
            sheet.row_count(),
            sheet.column_count()
        );
        sheets.push(sheet);
    }

    Ok(Workbook { sheets })
}

/// Number of rows and columns needed to hold everything the sheet uses.
fn extent(range: &Range<Data>, formulas: Option<&Range<String>>, layout: &SheetLayout) -> (usize, usize) {
    let mut rows = 0;
    let mut cols = 0;

    let ends = [range.end(), formulas.and_then(|f| f.end())];
    for (row, col) in ends.into_iter().flatten() {
        rows = rows.max(row as usize + 1);
        cols = cols.max(col as usize + 1);
    }
    for &(row, col) in layout.cell_styles.keys() {
        rows = rows.max(row + 1);
        cols = cols.max(col + 1);
    }
    (rows, cols)
}

fn build_sheet(
    name: &str,
    range: &Range<Data>,
    formulas: Option<&Range<String>>,
    layout: &SheetLayout,
    styles: &StyleSheet,
) -> Sheet {
    let mut sheet = Sheet::new(name);

    // xf index -> registry index
    let style_map: Vec<usize> = styles
        .xfs
        .iter()
        .map(|xf| sheet.styles.get_or_create(xf.style.clone()))
        .collect();
    let registry_index = |xf: usize| style_map.get(xf).copied().unwrap_or(0);

    let (rows, cols) = extent(range, formulas, layout);
    for _ in 0..cols {
        sheet.add_column();
    }
    for _ in 0..rows {
        sheet.add_row();
    }

    // Values
    if let Some((start_row, start_col)) = range.start() {
        for (row, col, data) in range.used_cells() {
            let (row, col) = (row + start_row as usize, col + start_col as usize);
            let number_format = layout
                .cell_styles
                .get(&(row, col))
                .and_then(|&xf| styles.xfs.get(xf))
                .and_then(|xf| xf.number_format.clone());
            if let Some(cell) = sheet.cell_mut(row, col) {
                fill_cell(cell, data, number_format);
            }
        }
    }

    // Formulas replace the cached values calamine reports for them.
    if let Some(formulas) = formulas {
        if let Some((start_row, start_col)) = formulas.start() {
            for (row, col, formula) in formulas.used_cells() {
                if formula.is_empty() {
                    continue;
                }
                let (row, col) = (row + start_row as usize, col + start_col as usize);
                if let Some(cell) = sheet.cell_mut(row, col) {
                    cell.set_formula(formula.clone());
                }
            }
        }
    }

    // Styles
    for (&(row, col), &xf) in &layout.cell_styles {
        if let Some(cell) = sheet.cell_mut(row, col) {
            cell.style_index = registry_index(xf);
        }
    }

    for spec in &layout.columns {
        for col in spec.first..=spec.last.min(cols.saturating_sub(1)) {
            if let Some(column) = sheet.column_mut(col) {
                column.width = spec.width;
                column.style_index = spec.style.map(registry_index).unwrap_or(0);
            }
        }
    }

    for (&row, &height) in &layout.row_heights {
        if let Some(r) = sheet.row_mut(row) {
            r.height = Some(height);
        }
    }

    sheet
}

fn fill_cell(cell: &mut Cell, data: &Data, number_format: Option<String>) {
    match data {
        Data::Empty => {}
        Data::String(s) => cell.set_string(s.clone()),
        Data::Float(f) => cell.set_number(*f),
        Data::Int(i) => cell.set_number(*i as f64),
        Data::Bool(b) => cell.set_bool(*b),
        Data::Error(e) => {
            cell.set_value(e.to_string());
            cell.cell_type = engine::CellType::Error;
        }
        Data::DateTime(dt) => cell.set_date_with_format(dt.as_f64(), number_format),
        Data::DateTimeIso(s) => cell.set_string(s.clone()),
        Data::DurationIso(s) => cell.set_string(s.clone()),
    }
}
