//! FILENAME: core/parser/src/token.rs
//! PURPOSE: Token definitions for the template lexer.
//! CONTEXT: Tokens are the atomic units produced by the lexer and consumed by the parser.
//! Literal text between actions is a single Text token; everything between
//! `{{` and `}}` is split into the operand/operator tokens below.

/// Tokens recognized by the template lexer.
#[derive(Debug, PartialEq, Clone)]
pub enum Token {
    /// Literal text outside of any action, already trimmed by `{{-`/`-}}` markers.
    Text(String),

    // Delimiters
    LeftDelim,
    RightDelim,
    LParen,
    RParen,
    Pipe,

    // Operands
    /// The current data context: `.`
    Dot,
    /// A field chain on the current context: `.a.b` -> ["a", "b"]
    Field(Vec<String>),
    /// The root data context, optionally followed by a field chain: `$`, `$.a.b`
    Root(Vec<String>),
    Identifier(String),
    String(String),
    Number(f64),
    Boolean(bool),
    Nil,

    // Special
    EOF,
    Illegal(char),
    /// A lexical error that cannot be expressed as a single bad character.
    Error(String),
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Text(s) => write!(f, "text {:?}", s),
            Token::LeftDelim => write!(f, "{{{{"),
            Token::RightDelim => write!(f, "}}}}"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Pipe => write!(f, "|"),
            Token::Dot => write!(f, "."),
            Token::Field(path) => write!(f, ".{}", path.join(".")),
            Token::Root(path) if path.is_empty() => write!(f, "$"),
            Token::Root(path) => write!(f, "$.{}", path.join(".")),
            Token::Identifier(s) => write!(f, "{}", s),
            Token::String(s) => write!(f, "{:?}", s),
            Token::Number(n) => write!(f, "{}", n),
            Token::Boolean(b) => write!(f, "{}", b),
            Token::Nil => write!(f, "nil"),
            Token::EOF => write!(f, "EOF"),
            Token::Illegal(c) => write!(f, "ILLEGAL({})", c),
            Token::Error(msg) => write!(f, "ERROR({})", msg),
        }
    }
}
