//! FILENAME: core/template/src/expander.rs
//! PURPOSE: Column expansion driven by directives (pass 1).
//! CONTEXT: A column whose cells carry a directive is replicated once per
//! element of the directive's sequence. The copies sit directly to the right
//! of the source, and every copy is then rendered with its own element as
//! the data context. The orchestrator calls `expand_column` once per original
//! column and shifts later indices by the number of columns inserted.

use engine::{CellAddress, Sheet, SheetError};
use log::{debug, warn};
use serde_json::Value;

use crate::directive::{split_lines, Directive, DirectiveMatcher};
use crate::error::{TemplateError, TemplateResult};
use crate::eval::{print_value, Renderer};
use crate::substitute::apply_data;

/// One rendered copy of a column: `destination` is bound to `data`.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpansionRecord {
    pub source: usize,
    pub destination: usize,
    pub data: Value,
}

/// Directives found in one cell.
struct DirectiveCell {
    address: CellAddress,
    directives: Vec<Directive>,
}

pub struct RangeExpander<'a> {
    matcher: &'a DirectiveMatcher,
    renderer: &'a Renderer,
}

impl<'a> RangeExpander<'a> {
    pub fn new(matcher: &'a DirectiveMatcher, renderer: &'a Renderer) -> Self {
        RangeExpander { matcher, renderer }
    }

    /// Expands column `col` in place and returns the number of inserted
    /// columns. A column without directives is left untouched.
    pub fn expand_column(&self, sheet: &mut Sheet, col: usize, data: &Value) -> TemplateResult<usize> {
        let cells = self.collect_directives(sheet, col)?;
        if cells.is_empty() {
            return Ok(0);
        }

        let items = self.resolve_sequence(&cells, data)?;
        self.strip_directives(sheet, &cells);

        let Some(items) = items else {
            debug!(
                "column {}: {} argument not in data, directive removed",
                col,
                self.matcher.name()
            );
            return Ok(0);
        };

        if items.is_empty() {
            warn!(
                "column {}: {} sequence is empty, column kept without binding",
                col,
                self.matcher.name()
            );
            return Ok(0);
        }

        let records = replicate(sheet, col, items)?;
        let inserted = records.len() - 1;
        debug!("column {}: expanded into {} columns", col, records.len());

        for record in &records {
            self.bind(sheet, record);
        }
        Ok(inserted)
    }

    fn collect_directives(&self, sheet: &Sheet, col: usize) -> TemplateResult<Vec<DirectiveCell>> {
        let mut found = Vec::new();
        for (row, cell) in sheet.column_cells(col).enumerate() {
            let address = CellAddress::new(row, col);
            let mut directives = Vec::new();
            for line in split_lines(&cell.value) {
                if self.matcher.has_expansion_directive(line) {
                    directives.extend(self.matcher.find(line).map_err(|e| e.at(address))?);
                }
            }
            if !directives.is_empty() {
                found.push(DirectiveCell {
                    address,
                    directives,
                });
            }
        }
        Ok(found)
    }

    /// Evaluates every directive argument. All sequences must agree on their
    /// length; the topmost one drives binding. `None` means no argument
    /// resolved because of missing keys.
    fn resolve_sequence(
        &self,
        cells: &[DirectiveCell],
        data: &Value,
    ) -> TemplateResult<Option<Vec<Value>>> {
        let mut chosen: Option<Vec<Value>> = None;

        for cell in cells {
            for directive in &cell.directives {
                let value = match self.renderer.evaluate(&directive.argument, data) {
                    Ok(value) => value,
                    Err(e) if e.is_missing_key() => {
                        debug!("cell {}: {}", cell.address, e);
                        continue;
                    }
                    Err(e) => return Err(e.at(cell.address)),
                };

                let items = match value {
                    Value::Array(items) => items,
                    other => {
                        return Err(TemplateError::InvalidRangeArgument {
                            directive: self.matcher.name().to_string(),
                            found: describe(&other),
                        }
                        .at(cell.address));
                    }
                };

                match &chosen {
                    None => chosen = Some(items),
                    Some(first) if first.len() != items.len() => {
                        return Err(TemplateError::InvalidRangeArgument {
                            directive: self.matcher.name().to_string(),
                            found: format!(
                                "{} elements where another directive in the column has {}",
                                items.len(),
                                first.len()
                            ),
                        }
                        .at(cell.address));
                    }
                    Some(_) => {}
                }
            }
        }
        Ok(chosen)
    }

    fn strip_directives(&self, sheet: &mut Sheet, cells: &[DirectiveCell]) {
        for cell in cells {
            let address = cell.address;
            if let Some(target) = sheet.cell_mut(address.row, address.col) {
                target.value = self.matcher.strip_cell_text(&target.value);
            }
        }
    }

    /// Renders every cell of the record's destination column with its data.
    /// A cell that fails to render against its element is left untouched for
    /// pass 2, which renders it against the root context and reports any
    /// error that remains.
    fn bind(&self, sheet: &mut Sheet, record: &ExpansionRecord) {
        let col = record.destination;
        for (row, cell) in sheet.column_cells_mut(col).enumerate() {
            if let Err(e) = apply_data(cell, &record.data, self.renderer) {
                debug!("cell {}/{}: left for root context: {}", row, col, e);
            }
        }
    }
}

/// Makes `items.len() - 1` copies of column `col` to its right and pairs
/// each of the resulting columns with its element.
pub fn replicate(sheet: &mut Sheet, col: usize, items: Vec<Value>) -> TemplateResult<Vec<ExpansionRecord>> {
    for _ in 1..items.len() {
        sheet.copy_column_to_right(col).map_err(|e| copy_error(e, col))?;
    }

    Ok(items
        .into_iter()
        .enumerate()
        .map(|(j, data)| ExpansionRecord {
            source: col,
            destination: col + j,
            data,
        })
        .collect())
}

fn copy_error(error: SheetError, col: usize) -> TemplateError {
    let address = match &error {
        SheetError::CorruptCell { row, col, .. } => CellAddress::new(*row, *col),
        SheetError::ColumnOutOfRange { .. } => CellAddress::new(0, col),
    };
    TemplateError::StructuralCopy(error).at(address)
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "nil".to_string(),
        Value::String(s) => format!("string {:?}", s),
        other => print_value(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TemplateConfig;
    use engine::CellType;
    use serde_json::json;

    fn run(sheet: &mut Sheet, col: usize, data: Value) -> TemplateResult<usize> {
        let matcher = DirectiveMatcher::new("col_range").unwrap();
        let renderer = Renderer::new(&TemplateConfig::default());
        RangeExpander::new(&matcher, &renderer).expand_column(sheet, col, &data)
    }

    fn row_values(sheet: &Sheet, row: usize) -> Vec<String> {
        sheet.rows()[row].cells.iter().map(|c| c.value.clone()).collect()
    }

    #[test]
    fn column_without_directive_is_untouched() {
        let mut sheet = Sheet::from_rows("S", &[vec!["a", "{{ .x }}"]]);
        assert_eq!(run(&mut sheet, 1, json!({})).unwrap(), 0);
        assert_eq!(row_values(&sheet, 0), vec!["a", "{{ .x }}"]);
    }

    #[test]
    fn expands_and_binds_each_copy() {
        let mut sheet = Sheet::from_rows(
            "S",
            &[vec!["h", "{{col_range .cols}}{{ .title }}", "t"], vec!["1", "{{ .n }}", "2"]],
        );
        let data = json!({"cols": [{"title": "A", "n": 1}, {"title": "B", "n": 2.5}]});

        assert_eq!(run(&mut sheet, 1, data).unwrap(), 1);
        assert_eq!(row_values(&sheet, 0), vec!["h", "A", "B", "t"]);
        assert_eq!(row_values(&sheet, 1), vec!["1", "1", "2.5", "2"]);
        assert_eq!(sheet.cell(1, 2).unwrap().cell_type, CellType::Number);
    }

    #[test]
    fn root_placeholders_survive_binding() {
        let mut sheet = Sheet::from_rows("S", &[vec!["{{col_range .cols}}{{ .label }}"]]);
        let data = json!({"cols": [{}, {}], "label": "root"});

        assert_eq!(run(&mut sheet, 0, data).unwrap(), 1);
        assert_eq!(row_values(&sheet, 0), vec!["{{ .label }}", "{{ .label }}"]);
    }

    #[test]
    fn scalar_elements_leave_root_lookups_for_later() {
        let mut sheet = Sheet::from_rows(
            "S",
            &[vec!["{{col_range .years}}{{ . }}"], vec!["{{ .company }}"]],
        );
        let data = json!({"years": [2015, 2016], "company": "Tim"});

        assert_eq!(run(&mut sheet, 0, data).unwrap(), 1);
        assert_eq!(row_values(&sheet, 0), vec!["2015", "2016"]);
        assert_eq!(row_values(&sheet, 1), vec!["{{ .company }}", "{{ .company }}"]);
    }

    #[test]
    fn single_element_binds_in_place() {
        let mut sheet = Sheet::from_rows("S", &[vec!["{{col_range .cols}}{{ . }}"]]);
        assert_eq!(run(&mut sheet, 0, json!({"cols": ["only"]})).unwrap(), 0);
        assert_eq!(row_values(&sheet, 0), vec!["only"]);
    }

    #[test]
    fn empty_sequence_only_erases_directive() {
        let mut sheet = Sheet::from_rows("S", &[vec!["{{col_range .cols}}keep {{ .x }}"]]);
        assert_eq!(run(&mut sheet, 0, json!({"cols": []})).unwrap(), 0);
        assert_eq!(row_values(&sheet, 0), vec!["keep {{ .x }}"]);
    }

    #[test]
    fn missing_argument_key_only_erases_directive() {
        let mut sheet = Sheet::from_rows("S", &[vec!["{{col_range .nope}}text"]]);
        assert_eq!(run(&mut sheet, 0, json!({})).unwrap(), 0);
        assert_eq!(row_values(&sheet, 0), vec!["text"]);
    }

    #[test]
    fn non_sequence_argument_is_rejected_at_cell() {
        let mut sheet = Sheet::from_rows("S", &[vec![""], vec!["{{col_range .n}}"]]);
        let err = run(&mut sheet, 0, json!({"n": 3})).unwrap_err();

        assert_eq!(err.address(), Some(CellAddress::new(1, 0)));
        assert!(matches!(
            err.root_cause(),
            TemplateError::InvalidRangeArgument { .. }
        ));
    }

    #[test]
    fn conflicting_lengths_are_rejected() {
        let mut sheet = Sheet::from_rows("S", &[vec!["{{col_range .a}}"], vec!["{{col_range .b}}"]]);
        let err = run(&mut sheet, 0, json!({"a": [1, 2], "b": [1, 2, 3]})).unwrap_err();

        assert_eq!(err.address(), Some(CellAddress::new(1, 0)));
        assert_eq!(sheet.column_count(), 1);
    }

    #[test]
    fn equal_lengths_use_topmost_sequence() {
        let mut sheet = Sheet::from_rows(
            "S",
            &[vec!["{{col_range .a}}{{ . }}"], vec!["{{col_range .b}}"]],
        );
        assert_eq!(run(&mut sheet, 0, json!({"a": ["x", "y"], "b": [1, 2]})).unwrap(), 1);
        assert_eq!(row_values(&sheet, 0), vec!["x", "y"]);
        assert_eq!(row_values(&sheet, 1), vec!["", ""]);
    }

    #[test]
    fn replicate_builds_records() {
        let mut sheet = Sheet::from_rows("S", &[vec!["a", "b"]]);
        let records = replicate(&mut sheet, 0, vec![json!(1), json!(2), json!(3)]).unwrap();

        assert_eq!(sheet.column_count(), 4);
        let destinations: Vec<usize> = records.iter().map(|r| r.destination).collect();
        assert_eq!(destinations, vec![0, 1, 2]);
        assert!(records.iter().all(|r| r.source == 0));
        assert_eq!(records[2].data, json!(3));
    }
}
