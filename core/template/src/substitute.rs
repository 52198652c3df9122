//! FILENAME: core/template/src/substitute.rs
//! PURPOSE: Renders one cell's text and stores the result back into the cell.

use engine::Cell;
use serde_json::Value;

use crate::error::TemplateResult;
use crate::eval::Renderer;

/// What `apply_data` did to a cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Substitution {
    /// Empty cell, nothing to render.
    Skipped,
    /// Rendering produced the original text; the cell keeps its type.
    Unchanged,
    /// The rendered text is numeric; the cell is now a number.
    Number(f64),
    /// The cell now holds the rendered text.
    Text,
}

impl Substitution {
    pub fn changed(&self) -> bool {
        matches!(self, Substitution::Number(_) | Substitution::Text)
    }
}

pub fn apply_data(cell: &mut Cell, data: &Value, renderer: &Renderer) -> TemplateResult<Substitution> {
    if cell.is_empty() {
        return Ok(Substitution::Skipped);
    }

    let rendered = renderer.render_str(&cell.value, data)?;
    if rendered == cell.value {
        return Ok(Substitution::Unchanged);
    }

    match parse_number(&rendered) {
        Some(n) => {
            cell.set_number(n);
            Ok(Substitution::Number(n))
        }
        None => {
            cell.set_string(rendered);
            Ok(Substitution::Text)
        }
    }
}

/// Finite decimal numbers only; "NaN" and "inf" stay text.
fn parse_number(text: &str) -> Option<f64> {
    text.parse::<f64>().ok().filter(|n| n.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TemplateConfig;
    use crate::error::TemplateError;
    use engine::CellType;
    use serde_json::json;

    fn apply(text: &str, data: Value) -> (TemplateResult<Substitution>, Cell) {
        let renderer = Renderer::new(&TemplateConfig::default());
        let mut cell = Cell::new_text(text);
        let result = apply_data(&mut cell, &data, &renderer);
        (result, cell)
    }

    #[test]
    fn empty_cell_is_skipped() {
        let (result, cell) = apply("", json!({}));
        assert_eq!(result.unwrap(), Substitution::Skipped);
        assert!(cell.is_empty());
    }

    #[test]
    fn unchanged_text_keeps_type() {
        let renderer = Renderer::new(&TemplateConfig::default());
        let mut cell = Cell::new_formula("SUM(A1:A3)");
        assert_eq!(
            apply_data(&mut cell, &json!({}), &renderer).unwrap(),
            Substitution::Unchanged
        );
        assert_eq!(cell.cell_type, CellType::Formula);
    }

    #[test]
    fn numeric_result_becomes_number() {
        let (result, cell) = apply("{{ .n }}", json!({"n": 0.5}));
        assert_eq!(result.unwrap(), Substitution::Number(0.5));
        assert_eq!(cell.cell_type, CellType::Number);
        assert_eq!(cell.value, "0.5");
    }

    #[test]
    fn text_result_becomes_string() {
        let (result, cell) = apply("Hi {{ .name }}", json!({"name": "Ann"}));
        assert_eq!(result.unwrap(), Substitution::Text);
        assert_eq!(cell.cell_type, CellType::String);
        assert_eq!(cell.value, "Hi Ann");
    }

    #[test]
    fn nan_stays_text() {
        let (result, cell) = apply("{{ .v }}", json!({"v": "NaN"}));
        assert_eq!(result.unwrap(), Substitution::Text);
        assert_eq!(cell.cell_type, CellType::String);
    }

    #[test]
    fn errors_leave_cell_alone() {
        let (result, cell) = apply("{{ .missing }}", json!({}));
        assert!(matches!(result, Err(TemplateError::MissingKey { .. })));
        assert_eq!(cell.value, "{{ .missing }}");
    }
}
