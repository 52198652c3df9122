//! FILENAME: core/persistence/src/xlsx_writer.rs

use std::path::Path;

use engine::{Cell, CellStyle, CellType, Color, Sheet};
use log::debug;
use rust_xlsxwriter::{Format, FormatPattern, FormatUnderline, Workbook as XlsxWorkbook, Worksheet};

use crate::{PersistenceError, Workbook};

pub fn save_xlsx(workbook: &Workbook, path: &Path) -> Result<(), PersistenceError> {
    let mut xlsx = XlsxWorkbook::new();

    for sheet in &workbook.sheets {
        let worksheet = xlsx.add_worksheet();
        worksheet.set_name(&sheet.name)?;
        write_sheet(worksheet, sheet)?;
        debug!("saved sheet '{}'", sheet.name);
    }

    xlsx.save(path)?;
    Ok(())
}

fn write_sheet(worksheet: &mut Worksheet, sheet: &Sheet) -> Result<(), PersistenceError> {
    let formats: Vec<Format> = sheet
        .styles
        .all_styles()
        .iter()
        .map(convert_style_to_format)
        .collect();
    let default_format = Format::new();
    let format_for = |index: usize| formats.get(index).unwrap_or(&default_format);

    // Column widths and styles
    for (col, column) in sheet.columns().iter().enumerate() {
        let col = col_num(col)?;
        if let Some(width) = column.width {
            worksheet.set_column_width(col, width)?;
        }
        if column.style_index != 0 {
            worksheet.set_column_format(col, format_for(column.style_index))?;
        }
    }

    for (row_idx, row) in sheet.rows().iter().enumerate() {
        let row_num = row_num(row_idx)?;
        if let Some(height) = row.height {
            worksheet.set_row_height(row_num, height)?;
        }

        for (col_idx, cell) in row.cells.iter().enumerate() {
            let col = col_num(col_idx)?;
            let base = format_for(cell.style_index);
            let format = match &cell.number_format {
                Some(code) => base.clone().set_num_format(code),
                None => base.clone(),
            };
            write_cell(worksheet, row_num, col, cell, &format)?;
        }
    }
    Ok(())
}

fn write_cell(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    cell: &Cell,
    format: &Format,
) -> Result<(), PersistenceError> {
    if cell.is_empty() {
        if cell.style_index != 0 {
            worksheet.write_blank(row, col, format)?;
        }
        return Ok(());
    }

    match cell.cell_type {
        CellType::Number | CellType::Date => match cell.number() {
            Ok(n) => worksheet.write_number_with_format(row, col, n, format)?,
            Err(_) => worksheet.write_string_with_format(row, col, &cell.value, format)?,
        },
        CellType::Boolean => {
            worksheet.write_boolean_with_format(row, col, cell.bool_value(), format)?
        }
        CellType::Formula => {
            let clean_formula = cell.value.strip_prefix('=').unwrap_or(&cell.value);
            worksheet.write_formula_with_format(row, col, clean_formula, format)?
        }
        CellType::String | CellType::Error | CellType::General => {
            worksheet.write_string_with_format(row, col, &cell.value, format)?
        }
    };
    Ok(())
}

fn row_num(row: usize) -> Result<u32, PersistenceError> {
    u32::try_from(row)
        .map_err(|_| PersistenceError::InvalidFormat(format!("row {} out of range", row)))
}

fn col_num(col: usize) -> Result<u16, PersistenceError> {
    u16::try_from(col)
        .map_err(|_| PersistenceError::InvalidFormat(format!("column {} out of range", col)))
}

fn convert_style_to_format(style: &CellStyle) -> Format {
    let mut format = Format::new();

    // Font settings
    if style.font.bold {
        format = format.set_bold();
    }
    if style.font.italic {
        format = format.set_italic();
    }
    if style.font.underline {
        format = format.set_underline(FormatUnderline::Single);
    }
    if style.font.color != Color::black() {
        format = format.set_font_color(color_to_xlsx(&style.font.color));
    }

    // Fills that are present but not applied are not written.
    if let Some(background) = style.background.filter(|_| style.apply_fill) {
        format = format
            .set_pattern(FormatPattern::Solid)
            .set_background_color(color_to_xlsx(&background));
    }

    if style.wrap_text {
        format = format.set_text_wrap();
    }

    format
}

fn color_to_xlsx(color: &Color) -> rust_xlsxwriter::Color {
    rust_xlsxwriter::Color::RGB(color.to_rgb())
}
