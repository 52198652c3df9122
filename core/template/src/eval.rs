//! FILENAME: core/template/src/eval.rs
//! PURPOSE: Evaluates parsed cell templates against a JSON data context.
//! CONTEXT: The parser crate turns cell text into a Document; the Renderer
//! walks it with a current context (dot) and the root context ($) and
//! prints the result. Lookups borrow from the data wherever possible, so
//! rendering a field never clones the subtree behind it.

use std::borrow::Cow;
use std::cmp::Ordering;

use engine::format_number;
use parser::{Document, Expression, Node, ParseError, Value as Literal};
use serde_json::Value;

use crate::config::{MissingKeyPolicy, TemplateConfig};
use crate::error::{TemplateError, TemplateResult};

/// Printed for a missing key under `MissingKeyPolicy::Default`.
pub const NO_VALUE: &str = "<no value>";

const BUILTINS: &[&str] = &[
    "len", "index", "eq", "ne", "lt", "le", "gt", "ge", "not", "and", "or", "print",
];

#[derive(Clone, Copy)]
struct Scope<'d> {
    dot: &'d Value,
    root: &'d Value,
}

#[derive(Debug, Clone)]
pub struct Renderer {
    directive: String,
    missing_key: MissingKeyPolicy,
}

impl Renderer {
    pub fn new(config: &TemplateConfig) -> Self {
        Renderer {
            directive: config.directive.clone(),
            missing_key: config.missing_key,
        }
    }

    /// Parses and renders one cell's text.
    pub fn render_str(&self, text: &str, data: &Value) -> TemplateResult<String> {
        let document = parser::parse(text)?;
        self.render(&document, data)
    }

    pub fn render(&self, document: &Document, data: &Value) -> TemplateResult<String> {
        self.check_functions(&document.nodes)?;

        let mut out = String::new();
        let scope = Scope {
            dot: data,
            root: data,
        };
        self.walk(&document.nodes, scope, &mut out)?;
        Ok(out)
    }

    /// Evaluates a bare pipeline such as a directive argument.
    pub fn evaluate(&self, expr: &Expression, data: &Value) -> TemplateResult<Value> {
        self.check_expression(expr)?;
        let scope = Scope {
            dot: data,
            root: data,
        };
        Ok(self.eval(expr, scope)?.into_owned())
    }

    // ------------------------------------------------------------------------
    // FUNCTION CHECK
    // ------------------------------------------------------------------------

    fn is_function(&self, name: &str) -> bool {
        name == self.directive || BUILTINS.contains(&name)
    }

    /// Unknown functions fail the whole template, even in branches that
    /// would never run.
    fn check_functions(&self, nodes: &[Node]) -> TemplateResult<()> {
        for node in nodes {
            match node {
                Node::Text(_) => {}
                Node::Action(expr) => self.check_expression(expr)?,
                Node::If {
                    condition,
                    then,
                    otherwise,
                } => {
                    self.check_expression(condition)?;
                    self.check_functions(then)?;
                    self.check_functions(otherwise)?;
                }
                Node::Range {
                    pipeline,
                    body,
                    otherwise,
                }
                | Node::With {
                    pipeline,
                    body,
                    otherwise,
                } => {
                    self.check_expression(pipeline)?;
                    self.check_functions(body)?;
                    self.check_functions(otherwise)?;
                }
            }
        }
        Ok(())
    }

    fn check_expression(&self, expr: &Expression) -> TemplateResult<()> {
        if let Expression::Call { name, args } = expr {
            if !self.is_function(name) {
                return Err(ParseError::new(format!("function {:?} not defined", name)).into());
            }
            for arg in args {
                self.check_expression(arg)?;
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // NODES
    // ------------------------------------------------------------------------

    fn walk(&self, nodes: &[Node], scope: Scope<'_>, out: &mut String) -> TemplateResult<()> {
        for node in nodes {
            match node {
                Node::Text(text) => out.push_str(text),

                Node::Action(expr) => {
                    let value = self.eval(expr, scope)?;
                    out.push_str(&print_value(&value));
                }

                Node::If {
                    condition,
                    then,
                    otherwise,
                } => {
                    let value = self.eval(condition, scope)?;
                    let branch = if is_truthy(&value) { then } else { otherwise };
                    self.walk(branch, scope, out)?;
                }

                Node::Range {
                    pipeline,
                    body,
                    otherwise,
                } => {
                    let value = self.eval(pipeline, scope)?;
                    let items: Vec<&Value> = match &*value {
                        Value::Array(items) => items.iter().collect(),
                        // Map values come out in key order.
                        Value::Object(map) => map.values().collect(),
                        Value::Null => Vec::new(),
                        other => {
                            return Err(TemplateError::Exec(format!(
                                "range can't iterate over {}",
                                print_value(other)
                            )));
                        }
                    };

                    if items.is_empty() {
                        self.walk(otherwise, scope, out)?;
                    }
                    for item in items {
                        let inner = Scope {
                            dot: item,
                            root: scope.root,
                        };
                        self.walk(body, inner, out)?;
                    }
                }

                Node::With {
                    pipeline,
                    body,
                    otherwise,
                } => {
                    let value = self.eval(pipeline, scope)?;
                    if is_truthy(&value) {
                        let inner = Scope {
                            dot: &*value,
                            root: scope.root,
                        };
                        self.walk(body, inner, out)?;
                    } else {
                        self.walk(otherwise, scope, out)?;
                    }
                }
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // EXPRESSIONS
    // ------------------------------------------------------------------------

    fn eval<'d>(&self, expr: &Expression, scope: Scope<'d>) -> TemplateResult<Cow<'d, Value>> {
        match expr {
            Expression::Literal(literal) => Ok(Cow::Owned(literal_value(literal))),
            Expression::Dot => Ok(Cow::Borrowed(scope.dot)),
            Expression::Field(path) => self.lookup(scope.dot, path),
            Expression::Root(path) => self.lookup(scope.root, path),
            Expression::Call { name, args } => self.call(name, args, scope).map(Cow::Owned),
        }
    }

    fn lookup<'d>(&self, base: &'d Value, path: &[String]) -> TemplateResult<Cow<'d, Value>> {
        let mut current = base;
        for key in path {
            current = match current {
                Value::Object(map) => match map.get(key) {
                    Some(value) => value,
                    None => return self.missing(key),
                },
                Value::Null => {
                    return Err(TemplateError::Exec(format!(
                        "nil pointer evaluating .{}",
                        key
                    )));
                }
                other => {
                    return Err(TemplateError::Exec(format!(
                        "can't evaluate field {} in type {}",
                        key,
                        type_name(other)
                    )));
                }
            };
        }
        Ok(Cow::Borrowed(current))
    }

    fn missing<'d>(&self, key: &str) -> TemplateResult<Cow<'d, Value>> {
        match self.missing_key {
            MissingKeyPolicy::Error => Err(TemplateError::MissingKey {
                key: key.to_string(),
            }),
            MissingKeyPolicy::Default => Ok(Cow::Owned(Value::String(NO_VALUE.to_string()))),
            MissingKeyPolicy::Zero => Ok(Cow::Owned(Value::Null)),
        }
    }

    fn call(&self, name: &str, args: &[Expression], scope: Scope<'_>) -> TemplateResult<Value> {
        // The directive only has structural effects; in text it prints nothing.
        if name == self.directive {
            return Ok(Value::String(String::new()));
        }

        // and/or stop evaluating at the first deciding argument.
        if name == "and" || name == "or" {
            if args.is_empty() {
                return Err(arity(name, "at least 1", 0));
            }
            let mut last = Value::Null;
            for arg in args {
                let value = self.eval(arg, scope)?;
                let truthy = is_truthy(&value);
                last = value.into_owned();
                if truthy == (name == "or") {
                    break;
                }
            }
            return Ok(last);
        }

        let values = args
            .iter()
            .map(|arg| self.eval(arg, scope))
            .collect::<TemplateResult<Vec<_>>>()?;

        match name {
            "len" => {
                let [value] = values.as_slice() else {
                    return Err(arity(name, "1", values.len()));
                };
                let len = match &**value {
                    Value::Array(items) => items.len(),
                    Value::Object(map) => map.len(),
                    Value::String(s) => s.len(),
                    other => {
                        return Err(TemplateError::Exec(format!(
                            "len of type {}",
                            type_name(other)
                        )));
                    }
                };
                Ok(Value::from(len))
            }

            "index" => {
                let Some((collection, keys)) = values.split_first() else {
                    return Err(arity(name, "at least 1", 0));
                };
                let mut current: &Value = collection;
                for key in keys {
                    current = index_value(current, key)?;
                }
                Ok(current.clone())
            }

            "eq" => {
                let Some((first, rest)) = values.split_first().filter(|(_, rest)| !rest.is_empty())
                else {
                    return Err(arity(name, "at least 2", values.len()));
                };
                Ok(Value::Bool(rest.iter().any(|other| values_equal(first, other))))
            }

            "ne" => {
                let [a, b] = values.as_slice() else {
                    return Err(arity(name, "2", values.len()));
                };
                Ok(Value::Bool(!values_equal(a, b)))
            }

            "lt" | "le" | "gt" | "ge" => {
                let [a, b] = values.as_slice() else {
                    return Err(arity(name, "2", values.len()));
                };
                let ordering = compare(a, b)?;
                let result = match name {
                    "lt" => ordering == Ordering::Less,
                    "le" => ordering != Ordering::Greater,
                    "gt" => ordering == Ordering::Greater,
                    _ => ordering != Ordering::Less,
                };
                Ok(Value::Bool(result))
            }

            "not" => {
                let [value] = values.as_slice() else {
                    return Err(arity(name, "1", values.len()));
                };
                Ok(Value::Bool(!is_truthy(value)))
            }

            "print" => {
                let mut out = String::new();
                for (i, value) in values.iter().enumerate() {
                    // Operands are separated by a space when neither side is a string.
                    if i > 0 && !values[i - 1].is_string() && !value.is_string() {
                        out.push(' ');
                    }
                    out.push_str(&print_value(value));
                }
                Ok(Value::String(out))
            }

            _ => Err(ParseError::new(format!("function {:?} not defined", name)).into()),
        }
    }
}

// ============================================================================
// VALUE HELPERS
// ============================================================================

fn arity(name: &str, expected: &str, got: usize) -> TemplateError {
    TemplateError::Exec(format!(
        "wrong number of args for {}: want {} got {}",
        name, expected, got
    ))
}

fn literal_value(literal: &Literal) -> Value {
    match literal {
        Literal::Number(n) => {
            // Whole numbers stay integers so they print without a fraction.
            if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
                Value::from(*n as i64)
            } else {
                serde_json::Number::from_f64(*n)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            }
        }
        Literal::String(s) => Value::String(s.clone()),
        Literal::Boolean(b) => Value::Bool(*b),
        Literal::Nil => Value::Null,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "nil",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float64",
        Value::Number(_) => "int",
        Value::String(_) => "string",
        Value::Array(_) => "slice",
        Value::Object(_) => "map",
    }
}

/// False, zero, null and empty collections are false; everything else is true.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Text form of a value as it appears in a rendered cell.
pub fn print_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::String(s) => s.clone(),
        Value::Number(n) => {
            if n.is_f64() {
                n.as_f64().map(format_number).unwrap_or_default()
            } else {
                n.to_string()
            }
        }
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn compare(a: &Value, b: &Value) -> TemplateResult<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(f64::NAN), y.as_f64().unwrap_or(f64::NAN));
            x.partial_cmp(&y)
                .ok_or_else(|| TemplateError::Exec("incomparable numbers".to_string()))
        }
        (Value::String(x), Value::String(y)) => Ok(x.cmp(y)),
        _ => Err(TemplateError::Exec(format!(
            "incompatible types for comparison: {} and {}",
            type_name(a),
            type_name(b)
        ))),
    }
}

fn index_value<'v>(collection: &'v Value, key: &Value) -> TemplateResult<&'v Value> {
    match collection {
        Value::Array(items) => {
            let Some(i) = key.as_u64() else {
                return Err(TemplateError::Exec(format!(
                    "cannot index slice with {}",
                    print_value(key)
                )));
            };
            usize::try_from(i)
                .ok()
                .and_then(|i| items.get(i))
                .ok_or_else(|| TemplateError::Exec(format!("index out of range: {}", i)))
        }
        Value::Object(map) => {
            let Some(k) = key.as_str() else {
                return Err(TemplateError::Exec(format!(
                    "cannot index map with {}",
                    print_value(key)
                )));
            };
            // Like a map index expression, an absent key yields nothing.
            Ok(map.get(k).unwrap_or(&Value::Null))
        }
        Value::Null => Err(TemplateError::Exec("index of untyped nil".to_string())),
        other => Err(TemplateError::Exec(format!(
            "can't index item of type {}",
            type_name(other)
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn render(text: &str, data: Value) -> TemplateResult<String> {
        Renderer::new(&TemplateConfig::default()).render_str(text, &data)
    }

    #[test]
    fn renders_fields_and_root() {
        let data = json!({"a": {"b": "deep"}, "n": 3});
        assert_eq!(render("{{ .a.b }}", data.clone()).unwrap(), "deep");
        assert_eq!(render("{{with .a}}{{.b}}-{{$.n}}{{end}}", data).unwrap(), "deep-3");
    }

    #[test]
    fn missing_key_is_an_error_by_default() {
        let err = render("{{ .test }}", json!({})).unwrap_err();
        assert!(matches!(err, TemplateError::MissingKey { ref key } if key == "test"));
    }

    #[test]
    fn missing_key_policies() {
        let config = TemplateConfig::default().with_missing_key(MissingKeyPolicy::Zero);
        let zero = Renderer::new(&config);
        assert_eq!(zero.render_str("[{{ .x }}]", &json!({})).unwrap(), "[]");

        let config = TemplateConfig::default().with_missing_key(MissingKeyPolicy::Default);
        let default = Renderer::new(&config);
        assert_eq!(default.render_str("{{ .x }}", &json!({})).unwrap(), "<no value>");
    }

    #[test]
    fn field_on_scalar_is_exec_error() {
        let err = render("{{ .a.b }}", json!({"a": 1})).unwrap_err();
        assert!(matches!(err, TemplateError::Exec(_)));
    }

    #[test]
    fn prints_values() {
        let data = json!({"i": 7, "f": 0.5, "w": 3.0, "t": true, "z": null, "xs": [1, "a"]});
        assert_eq!(
            render("{{.i}}|{{.f}}|{{.w}}|{{.t}}|{{.z}}|{{.xs}}", data).unwrap(),
            "7|0.5|3|true||[1,\"a\"]"
        );
    }

    #[test]
    fn if_else_chain() {
        let text = "{{if .a}}A{{else if .b}}B{{else}}C{{end}}";
        assert_eq!(render(text, json!({"a": 1, "b": 1})).unwrap(), "A");
        assert_eq!(render(text, json!({"a": 0, "b": "x"})).unwrap(), "B");
        assert_eq!(render(text, json!({"a": "", "b": []})).unwrap(), "C");
    }

    #[test]
    fn range_binds_dot_and_falls_back_to_else() {
        let data = json!({"xs": ["a", "b"], "sep": ";"});
        assert_eq!(render("{{range .xs}}{{.}}{{$.sep}}{{end}}", data).unwrap(), "a;b;");
        assert_eq!(
            render("{{range .xs}}x{{else}}none{{end}}", json!({"xs": []})).unwrap(),
            "none"
        );
    }

    #[test]
    fn builtins() {
        let data = json!({"xs": [10, 20], "m": {"k": "v"}, "s": "héllo"});
        assert_eq!(render("{{len .xs}} {{len .s}}", data.clone()).unwrap(), "2 6");
        assert_eq!(render("{{index .xs 1}} {{index .m \"k\"}}", data.clone()).unwrap(), "20 v");
        assert_eq!(render("{{eq 1 1.0}} {{ne .s \"x\"}}", data.clone()).unwrap(), "true true");
        assert_eq!(render("{{lt 1 2}} {{ge \"a\" \"b\"}}", data.clone()).unwrap(), "true false");
        assert_eq!(render("{{and 1 0}} {{or 0 \"x\"}} {{not 0}}", data.clone()).unwrap(), "0 x true");
        assert_eq!(render("{{print 1 2 \"a\" 3}}", data.clone()).unwrap(), "1 2a3");
        assert_eq!(render("{{.xs | len}}", data).unwrap(), "2");
    }

    #[test]
    fn index_out_of_range_fails() {
        assert!(matches!(
            render("{{index .xs 5}}", json!({"xs": [1]})).unwrap_err(),
            TemplateError::Exec(_)
        ));
    }

    #[test]
    fn directive_prints_nothing() {
        assert_eq!(render("{{col_range .missing}}x", json!({})).unwrap(), "x");
    }

    #[test]
    fn unknown_function_is_a_syntax_error_even_when_unreached() {
        let err = render("{{if false}}{{nope 1}}{{end}}", json!({})).unwrap_err();
        assert!(matches!(err, TemplateError::Syntax(_)));
    }

    #[test]
    fn evaluates_directive_argument() {
        let renderer = Renderer::new(&TemplateConfig::default());
        let expr = parser::parse_expression("index .rows 0").unwrap();
        let value = renderer
            .evaluate(&expr, &json!({"rows": [[1, 2], [3]]}))
            .unwrap();
        assert_eq!(value, json!([1, 2]));
    }
}
