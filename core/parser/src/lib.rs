//! FILENAME: core/parser/src/lib.rs
//! PURPOSE: Library root for the cell template parser.
//! CONTEXT: This module exposes the lexer, parser, and AST components
//! needed to convert cell text into a renderable template tree.
//!
//! PIPELINE: Cell Text --> Lexer --> Tokens --> Parser --> Document --> Renderer
//!
//! SUPPORTED FEATURES:
//! - Literal text with {{ actions }}
//! - Field lookups: .name, .a.b, $.root
//! - Literals: "text", `raw`, 12, -1.5, true, false, nil
//! - Function calls: len .items, index .rows 0, col_range .cols
//! - Pipelines: .name | print
//! - Control flow: if / else if / else, range, with, end
//! - Trim markers {{- -}} and comments {{/* */}}

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod token;


// Re-export commonly used types for convenience
pub use ast::{Document, Expression, Node, Value};
pub use lexer::Lexer;
pub use parser::{parse, parse_expression, ParseError, ParseResult, Parser};
pub use token::Token;
