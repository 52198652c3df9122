//! FILENAME: core/template/src/lib.rs
//! PURPOSE: Renders a sheet template against a JSON data context.
//! CONTEXT: Rendering runs in two passes over one sheet.
//!
//! 1. Range expansion: every column holding a `{{ col_range <expr> }}`
//!    directive is replicated once per element of `<expr>` and each copy is
//!    rendered with its element as the data context.
//! 2. Substitution: every non-empty cell is rendered against the root data.
//!    Changed cells become numbers when the result is numeric, text otherwise.
//!
//! The first failure stops the render. It is reported with the cell address
//! as `error in template (cell <row>/<col>): ...`; the sheet may be partially
//! rewritten at that point and should be discarded.

pub mod config;
pub mod directive;
pub mod error;
pub mod eval;
pub mod expander;
pub mod substitute;

pub use config::{MissingKeyPolicy, TemplateConfig, DEFAULT_DIRECTIVE};
pub use directive::{split_lines, Directive, DirectiveMatcher};
pub use error::{TemplateError, TemplateResult};
pub use eval::Renderer;
pub use expander::{ExpansionRecord, RangeExpander};
pub use substitute::{apply_data, Substitution};

use engine::{CellAddress, Sheet};
use log::info;
use serde_json::Value;

/// Summary of a successful render.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderReport {
    pub columns_inserted: usize,
    pub cells_substituted: usize,
}

/// A sheet prepared for rendering.
pub struct Template<'s> {
    sheet: &'s mut Sheet,
    config: TemplateConfig,
}

impl<'s> Template<'s> {
    pub fn new(sheet: &'s mut Sheet) -> Self {
        Self::with_config(sheet, TemplateConfig::default())
    }

    pub fn with_config(sheet: &'s mut Sheet, config: TemplateConfig) -> Self {
        Template { sheet, config }
    }

    pub fn sheet(&self) -> &Sheet {
        &*self.sheet
    }

    pub fn config(&self) -> &TemplateConfig {
        &self.config
    }

    /// Runs both passes.
    pub fn execute(&mut self, data: &Value) -> TemplateResult<RenderReport> {
        self.config.validate()?;
        let matcher = DirectiveMatcher::new(&self.config.directive)?;
        let renderer = Renderer::new(&self.config);

        let columns_inserted = self.expand_ranges(&matcher, &renderer, data)?;
        let cells_substituted = self.substitute_all(&renderer, data)?;

        info!(
            "rendered sheet '{}': {} columns inserted, {} cells substituted",
            self.sheet.name, columns_inserted, cells_substituted
        );
        Ok(RenderReport {
            columns_inserted,
            cells_substituted,
        })
    }

    /// Pass 1. Columns are visited in their original order; `inserted`
    /// maps an original index to its current position.
    fn expand_ranges(
        &mut self,
        matcher: &DirectiveMatcher,
        renderer: &Renderer,
        data: &Value,
    ) -> TemplateResult<usize> {
        let expander = RangeExpander::new(matcher, renderer);
        let original_columns = self.sheet.column_count();

        let mut inserted = 0;
        for original in 0..original_columns {
            inserted += expander.expand_column(self.sheet, original + inserted, data)?;
        }
        Ok(inserted)
    }

    /// Pass 2.
    fn substitute_all(&mut self, renderer: &Renderer, data: &Value) -> TemplateResult<usize> {
        let mut changed = 0;
        for ((row, col), cell) in self.sheet.cells_mut() {
            let outcome = apply_data(cell, data, renderer)
                .map_err(|e| e.at(CellAddress::new(row, col)))?;
            if outcome.changed() {
                changed += 1;
            }
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renders_plain_sheet() {
        let mut sheet = Sheet::from_rows("S", &[vec!["{{ .a }}", "static", "{{ .b }}"]]);
        let report = Template::new(&mut sheet)
            .execute(&json!({"a": "x", "b": 2}))
            .unwrap();

        assert_eq!(
            report,
            RenderReport {
                columns_inserted: 0,
                cells_substituted: 2
            }
        );
        assert_eq!(sheet.cell(0, 0).unwrap().value, "x");
        assert_eq!(sheet.cell(0, 2).unwrap().value, "2");
    }

    #[test]
    fn later_columns_are_found_after_insertion() {
        let mut sheet = Sheet::from_rows(
            "S",
            &[vec!["{{col_range .a}}{{.}}", "{{col_range .b}}{{.}}"]],
        );
        let report = Template::new(&mut sheet)
            .execute(&json!({"a": ["a1", "a2"], "b": ["b1", "b2", "b3"]}))
            .unwrap();

        assert_eq!(report.columns_inserted, 3);
        let values: Vec<&str> = sheet.rows()[0].cells.iter().map(|c| c.value.as_str()).collect();
        assert_eq!(values, vec!["a1", "a2", "b1", "b2", "b3"]);
    }

    #[test]
    fn error_carries_cell_address() {
        let mut sheet = Sheet::from_rows("S", &[vec!["ok", ""], vec!["", "{{ .missing }}"]]);
        let err = Template::new(&mut sheet).execute(&json!({})).unwrap_err();

        assert_eq!(
            err.to_string(),
            "error in template (cell 1/1): map has no entry for key \"missing\""
        );
    }

    #[test]
    fn invalid_directive_name_is_a_config_error() {
        let mut sheet = Sheet::from_rows("S", &[vec!["a"]]);
        let config = TemplateConfig::default().with_directive("not valid");
        let err = Template::with_config(&mut sheet, config)
            .execute(&json!({}))
            .unwrap_err();
        assert!(matches!(err, TemplateError::Config(_)));
    }

    #[test]
    fn custom_directive_name() {
        let mut sheet = Sheet::from_rows("S", &[vec!["{{expand .xs}}{{.}}"]]);
        let config = TemplateConfig::default().with_directive("expand");
        Template::with_config(&mut sheet, config)
            .execute(&json!({"xs": [1, 2]}))
            .unwrap();

        assert_eq!(sheet.column_count(), 2);
        assert_eq!(sheet.cell(0, 1).unwrap().value, "2");
    }
}
