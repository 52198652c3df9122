//! FILENAME: core/parser/src/parser.rs
//! PURPOSE: Recursive descent parser that converts a stream of Tokens into an AST.
//! CONTEXT: This is the second stage of the parsing pipeline. It takes tokens
//! from the Lexer and builds a Document that the renderer can evaluate.
//!
//! GRAMMAR:
//!   document   --> list EOF
//!   list       --> ( TEXT | action | if | range | with )*
//!   action     --> "{{" pipeline "}}"
//!   if         --> "{{" "if" pipeline "}}" list ( "{{" "else" "if" ... | "{{" "else" "}}" list )? "{{" "end" "}}"
//!   range      --> "{{" "range" pipeline "}}" list ( "{{" "else" "}}" list )? "{{" "end" "}}"
//!   with       --> "{{" "with" pipeline "}}" list ( "{{" "else" "}}" list )? "{{" "end" "}}"
//!   pipeline   --> command ( "|" command )*
//!   command    --> IDENTIFIER operand* | operand
//!   operand    --> "." | FIELD | ROOT | STRING | NUMBER | BOOLEAN | "nil" | IDENTIFIER | "(" pipeline ")"

use crate::ast::{Document, Expression, Node, Value};
use crate::lexer::Lexer;
use crate::token::Token;

/// Parser errors with descriptive messages.
#[derive(Debug, PartialEq, Clone)]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(message: impl Into<String>) -> Self {
        ParseError {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Parse error: {}", self.message)
    }
}

impl std::error::Error for ParseError {}

pub type ParseResult<T> = Result<T, ParseError>;

/// What ended a node list.
#[derive(Debug, PartialEq)]
enum ListEnd {
    Eof,
    End,
    Else,
}

/// The Parser struct holds the lexer and current token state.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current_token: Token,
}

impl<'a> Parser<'a> {
    /// Creates a parser for a full template.
    pub fn new(input: &'a str) -> Self {
        Self::with_lexer(Lexer::new(input))
    }

    /// Creates a parser for a single pipeline without delimiters.
    pub fn new_expression(input: &'a str) -> Self {
        Self::with_lexer(Lexer::new_expression(input))
    }

    fn with_lexer(mut lexer: Lexer<'a>) -> Self {
        let current_token = lexer.next_token();
        Parser {
            lexer,
            current_token,
        }
    }

    /// Parses the entire input as a template document.
    pub fn parse(&mut self) -> ParseResult<Document> {
        let (nodes, end) = self.parse_list()?;
        match end {
            ListEnd::Eof => Ok(Document { nodes }),
            ListEnd::End => Err(ParseError::new("unexpected {{end}}")),
            ListEnd::Else => Err(ParseError::new("unexpected {{else}}")),
        }
    }

    /// Parses the entire input as one pipeline.
    pub fn parse_expression(&mut self) -> ParseResult<Expression> {
        if self.current_token == Token::EOF {
            return Err(ParseError::new("Empty expression"));
        }

        let expr = self.parse_pipeline()?;

        if self.current_token != Token::EOF {
            return Err(ParseError::new(format!(
                "Unexpected token after expression: {}",
                self.current_token
            )));
        }

        Ok(expr)
    }

    /// Advances to the next token.
    fn advance(&mut self) {
        self.current_token = self.lexer.next_token();
    }

    /// Checks if the current token matches the expected token.
    /// If it matches, advances and returns Ok. Otherwise returns an error.
    fn expect(&mut self, expected: Token) -> ParseResult<()> {
        if self.current_token == expected {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(&format!("expected {}", expected)))
        }
    }

    fn unexpected(&self, context: &str) -> ParseError {
        match &self.current_token {
            Token::Error(msg) => ParseError::new(msg.clone()),
            Token::Illegal(ch) => ParseError::new(format!("Illegal character: {}", ch)),
            token => ParseError::new(format!("{}, found {}", context, token)),
        }
    }

    fn is_keyword(&self, keyword: &str) -> bool {
        matches!(&self.current_token, Token::Identifier(name) if name == keyword)
    }

    // ------------------------------------------------------------------------
    // NODES
    // ------------------------------------------------------------------------

    /// Parses nodes until EOF, `{{end}}` or `{{else`. For `{{end}}` the closing
    /// delimiter is consumed; for `{{else` the caller handles the rest.
    fn parse_list(&mut self) -> ParseResult<(Vec<Node>, ListEnd)> {
        let mut nodes = Vec::new();

        loop {
            match self.current_token.clone() {
                Token::EOF => return Ok((nodes, ListEnd::Eof)),

                Token::Text(text) => {
                    self.advance();
                    nodes.push(Node::Text(text));
                }

                Token::LeftDelim => {
                    self.advance();

                    if self.is_keyword("end") {
                        self.advance();
                        self.expect(Token::RightDelim)?;
                        return Ok((nodes, ListEnd::End));
                    }
                    if self.is_keyword("else") {
                        self.advance();
                        return Ok((nodes, ListEnd::Else));
                    }
                    if self.is_keyword("if") {
                        self.advance();
                        nodes.push(self.parse_if()?);
                        continue;
                    }
                    if self.is_keyword("range") || self.is_keyword("with") {
                        let is_range = self.is_keyword("range");
                        self.advance();
                        nodes.push(self.parse_block(is_range)?);
                        continue;
                    }

                    let pipeline = self.parse_pipeline()?;
                    self.expect(Token::RightDelim)?;
                    nodes.push(Node::Action(pipeline));
                }

                _ => return Err(self.unexpected("unexpected input")),
            }
        }
    }

    /// Parses the remainder of `{{if` (keyword already consumed).
    fn parse_if(&mut self) -> ParseResult<Node> {
        let condition = self.parse_pipeline()?;
        self.expect(Token::RightDelim)?;

        let (then, end) = self.parse_list()?;
        let otherwise = match end {
            ListEnd::End => Vec::new(),
            ListEnd::Eof => return Err(ParseError::new("unexpected EOF in if")),
            ListEnd::Else => {
                if self.is_keyword("if") {
                    // {{else if ...}} shares the {{end}} of the outer if
                    self.advance();
                    vec![self.parse_if()?]
                } else {
                    self.expect(Token::RightDelim)?;
                    self.parse_else_body("if")?
                }
            }
        };

        Ok(Node::If {
            condition,
            then,
            otherwise,
        })
    }

    /// Parses the remainder of `{{range` or `{{with` (keyword already consumed).
    fn parse_block(&mut self, is_range: bool) -> ParseResult<Node> {
        let keyword = if is_range { "range" } else { "with" };
        let pipeline = self.parse_pipeline()?;
        self.expect(Token::RightDelim)?;

        let (body, end) = self.parse_list()?;
        let otherwise = match end {
            ListEnd::End => Vec::new(),
            ListEnd::Eof => {
                return Err(ParseError::new(format!("unexpected EOF in {}", keyword)));
            }
            ListEnd::Else => {
                self.expect(Token::RightDelim)?;
                self.parse_else_body(keyword)?
            }
        };

        Ok(if is_range {
            Node::Range {
                pipeline,
                body,
                otherwise,
            }
        } else {
            Node::With {
                pipeline,
                body,
                otherwise,
            }
        })
    }

    /// Parses an `{{else}}` body, which must be closed by `{{end}}`.
    fn parse_else_body(&mut self, keyword: &str) -> ParseResult<Vec<Node>> {
        let (nodes, end) = self.parse_list()?;
        match end {
            ListEnd::End => Ok(nodes),
            ListEnd::Else => Err(ParseError::new(format!(
                "expected end; found {{{{else}}}} in {}",
                keyword
            ))),
            ListEnd::Eof => Err(ParseError::new(format!("unexpected EOF in {}", keyword))),
        }
    }

    // ------------------------------------------------------------------------
    // PIPELINES
    // ------------------------------------------------------------------------

    /// Parses `command ( "|" command )*`, folding each stage into a call whose
    /// last argument is the previous stage.
    fn parse_pipeline(&mut self) -> ParseResult<Expression> {
        let mut expr = self.parse_command()?;

        while self.current_token == Token::Pipe {
            self.advance();
            match self.parse_command()? {
                Expression::Call { name, mut args } => {
                    args.push(expr);
                    expr = Expression::Call { name, args };
                }
                other => {
                    return Err(ParseError::new(format!(
                        "non-function {} in pipeline",
                        other
                    )));
                }
            }
        }

        Ok(expr)
    }

    fn parse_command(&mut self) -> ParseResult<Expression> {
        if let Token::Identifier(name) = self.current_token.clone() {
            self.advance();
            let mut args = Vec::new();
            while starts_operand(&self.current_token) {
                args.push(self.parse_operand()?);
            }
            return Ok(Expression::Call { name, args });
        }

        if !starts_operand(&self.current_token) {
            return Err(self.unexpected("missing value for command"));
        }

        let operand = self.parse_operand()?;
        if starts_operand(&self.current_token) {
            return Err(ParseError::new(format!(
                "can't give argument to non-function {}",
                operand
            )));
        }
        Ok(operand)
    }

    fn parse_operand(&mut self) -> ParseResult<Expression> {
        let expr = match self.current_token.clone() {
            Token::Dot => Expression::Dot,
            Token::Field(path) => Expression::Field(path),
            Token::Root(path) => Expression::Root(path),
            Token::String(s) => Expression::Literal(Value::String(s)),
            Token::Number(n) => Expression::Literal(Value::Number(n)),
            Token::Boolean(b) => Expression::Literal(Value::Boolean(b)),
            Token::Nil => Expression::Literal(Value::Nil),

            // A bare identifier used as an argument is a call without arguments.
            Token::Identifier(name) => Expression::Call {
                name,
                args: Vec::new(),
            },

            Token::LParen => {
                self.advance();
                let inner = self.parse_pipeline()?;
                self.expect(Token::RParen)?;
                return Ok(inner);
            }

            _ => return Err(self.unexpected("expected operand")),
        };

        self.advance();
        Ok(expr)
    }
}

fn starts_operand(token: &Token) -> bool {
    matches!(
        token,
        Token::Dot
            | Token::Field(_)
            | Token::Root(_)
            | Token::String(_)
            | Token::Number(_)
            | Token::Boolean(_)
            | Token::Nil
            | Token::Identifier(_)
            | Token::LParen
    )
}

/// Convenience function to parse template text directly.
pub fn parse(input: &str) -> ParseResult<Document> {
    let mut parser = Parser::new(input);
    parser.parse()
}

/// Convenience function to parse a single pipeline such as `.cols` or `index .rows 0`.
pub fn parse_expression(input: &str) -> ParseResult<Expression> {
    let mut parser = Parser::new_expression(input);
    parser.parse_expression()
}
