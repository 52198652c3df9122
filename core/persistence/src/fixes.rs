//! FILENAME: core/persistence/src/fixes.rs
//! PURPOSE: Compatibility adjustments applied to loaded workbooks.

use crate::Workbook;

/// LibreOffice drops cell fills whose style does not set applyFill. Marks
/// every style of every sheet so the writer emits its fill explicitly.
pub fn libre_office_fill_fix(workbook: &mut Workbook) {
    for sheet in workbook.sheets.iter_mut() {
        sheet.styles.update_all(|style| style.apply_fill = true);
    }
}
