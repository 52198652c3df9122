//! FILENAME: tests/test_substitution.rs
//! Single-cell rendering: unchanged text, coercion and errors.

use engine::{Cell, CellType};
use serde_json::{json, Value};
use template::{apply_data, Renderer, Substitution, TemplateConfig, TemplateError};

struct Case {
    cell: &'static str,
    data: Value,
    want: &'static str,
    err: bool,
}

fn run(text: &str, data: &Value) -> (Result<Substitution, TemplateError>, Cell) {
    let renderer = Renderer::new(&TemplateConfig::default());
    let mut cell = Cell::new();
    cell.set_value(text);
    let result = apply_data(&mut cell, data, &renderer);
    (result, cell)
}

#[test]
fn test_simple_table() {
    let cases = [
        Case { cell: "", data: json!([]), want: "", err: false },
        Case { cell: "Should be the same", data: json!([]), want: "Should be the same", err: false },
        Case { cell: "{{ .test }}", data: json!({"test": "test"}), want: "test", err: false },
        Case { cell: "Should do nothing", data: json!({"test": "test"}), want: "Should do nothing", err: false },
        Case { cell: "{{ .test }}", data: json!({}), want: "{{ .test }}", err: true },
        Case { cell: "{{ }}", data: json!({}), want: "{{ }}", err: true },
        Case { cell: "0", data: json!({}), want: "0", err: false },
        Case { cell: "0.0", data: json!({}), want: "0.0", err: false },
    ];

    for (i, case) in cases.iter().enumerate() {
        let (result, cell) = run(case.cell, &case.data);
        assert_eq!(result.is_err(), case.err, "case {}: {:?}", i, result);
        assert_eq!(cell.value, case.want, "case {}", i);
    }
}

#[test]
fn test_unchanged_numeric_text_keeps_its_type() {
    let (result, cell) = run("0.0", &json!({}));
    assert_eq!(result.unwrap(), Substitution::Unchanged);
    assert_eq!(cell.cell_type, CellType::General);
}

#[test]
fn test_changed_numeric_text_becomes_number() {
    let (result, cell) = run("{{ .n }}", &json!({"n": 0.5}));
    assert_eq!(result.unwrap(), Substitution::Number(0.5));
    assert_eq!(cell.cell_type, CellType::Number);
}

#[test]
fn test_integer_data_prints_without_fraction() {
    let (_, cell) = run("{{ .year }}", &json!({"year": 2016}));
    assert_eq!(cell.value, "2016");
    assert_eq!(cell.cell_type, CellType::Number);
}

#[test]
fn test_mixed_text_becomes_string() {
    let (result, cell) = run("Year {{ .year }}", &json!({"year": 2016}));
    assert_eq!(result.unwrap(), Substitution::Text);
    assert_eq!(cell.value, "Year 2016");
    assert_eq!(cell.cell_type, CellType::String);
}

#[test]
fn test_syntax_and_missing_key_errors_are_distinguished() {
    let (syntax, _) = run("{{ }}", &json!({}));
    assert!(matches!(syntax, Err(TemplateError::Syntax(_))));

    let (missing, _) = run("{{ .test }}", &json!({}));
    assert!(matches!(missing, Err(TemplateError::MissingKey { key }) if key == "test"));
}

#[test]
fn test_second_render_is_a_no_op() {
    let renderer = Renderer::new(&TemplateConfig::default());
    let data = json!({"name": "Tim"});
    let mut cell = Cell::new_text("{{ .name }} online");

    assert_eq!(apply_data(&mut cell, &data, &renderer).unwrap(), Substitution::Text);
    assert_eq!(apply_data(&mut cell, &data, &renderer).unwrap(), Substitution::Unchanged);
    assert_eq!(cell.value, "Tim online");
}
