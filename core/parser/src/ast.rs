//! FILENAME: core/parser/src/ast.rs
//! PURPOSE: Defines the Abstract Syntax Tree (AST) for cell templates.
//! CONTEXT: After the Lexer tokenizes cell text, the Parser converts those
//! tokens into a Document: a list of nodes mixing literal text with actions
//! and control structures. The renderer walks this tree against a data context.
//!
//! SUPPORTED CONSTRUCTS:
//! - Literal text
//! - Actions: {{ pipeline }}
//! - Control flow: {{if}} {{else if}} {{else}} {{end}}, {{range}}, {{with}}
//! - Pipelines: {{ .x | fn arg }} (the left result becomes the last argument)

/// A parsed template.
#[derive(Debug, PartialEq, Clone, Default)]
pub struct Document {
    pub nodes: Vec<Node>,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Node {
    Text(String),

    /// `{{ pipeline }}`: evaluates and prints the result.
    Action(Expression),

    /// `{{if c}} then {{else}} otherwise {{end}}`.
    /// `{{else if d}}` is represented as a nested If inside `otherwise`.
    If {
        condition: Expression,
        then: Vec<Node>,
        otherwise: Vec<Node>,
    },

    /// `{{range p}} body {{else}} otherwise {{end}}`: body runs once per
    /// element with the element as the current context.
    Range {
        pipeline: Expression,
        body: Vec<Node>,
        otherwise: Vec<Node>,
    },

    /// `{{with p}} body {{else}} otherwise {{end}}`: body runs with the value
    /// as the current context when it is truthy.
    With {
        pipeline: Expression,
        body: Vec<Node>,
        otherwise: Vec<Node>,
    },
}

/// An expression inside an action.
#[derive(Debug, PartialEq, Clone)]
pub enum Expression {
    Literal(Value),

    /// The current context: `.`
    Dot,

    /// A field chain on the current context: `.a.b`
    Field(Vec<String>),

    /// The root context with an optional field chain: `$`, `$.a.b`
    Root(Vec<String>),

    /// A function call like `len .items` or `col_range .cols`.
    /// Pipelines are folded into calls at parse time.
    Call { name: String, args: Vec<Expression> },
}

/// Literal values that can appear in actions.
#[derive(Debug, PartialEq, Clone)]
pub enum Value {
    Number(f64),
    String(String),
    Boolean(bool),
    Nil,
}

impl std::fmt::Display for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expression::Literal(v) => write!(f, "{}", v),
            Expression::Dot => write!(f, "."),
            Expression::Field(path) => write!(f, ".{}", path.join(".")),
            Expression::Root(path) if path.is_empty() => write!(f, "$"),
            Expression::Root(path) => write!(f, "$.{}", path.join(".")),
            Expression::Call { name, args } => {
                write!(f, "{}", name)?;
                for arg in args {
                    match arg {
                        Expression::Call { args: inner, .. } if !inner.is_empty() => {
                            write!(f, " ({})", arg)?
                        }
                        _ => write!(f, " {}", arg)?,
                    }
                }
                Ok(())
            }
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Nil => write!(f, "nil"),
        }
    }
}
