//! FILENAME: core/parser/src/lexer.rs
//! PURPOSE: Scans raw cell text and produces a stream of Tokens.
//! CONTEXT: This is the first stage of the parsing pipeline. The lexer has two
//! modes: outside an action it collects literal text up to the next `{{`;
//! inside an action it produces operand and operator tokens up to `}}`.
//!
//! SUPPORTED SYNTAX:
//! - Delimiters: {{ }} with trim markers {{- and -}}
//! - Comments: {{/* ... */}}
//! - Operands: . .a.b $ $.a.b "string" `raw` 12 -1.5 true false nil
//! - Operators: | ( )

use crate::token::Token;

const LEFT_DELIM: &str = "{{";
const RIGHT_DELIM: &str = "}}";
const LEFT_COMMENT: &str = "/*";
const RIGHT_COMMENT: &str = "*/";

pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    in_action: bool,
    /// A bare expression has no delimiters; end of input simply ends it.
    bare: bool,
    /// Set by a `-}}` marker: leading whitespace of the next text is dropped.
    trim_next_text: bool,
}

impl<'a> Lexer<'a> {
    /// Lexes a full template: literal text interleaved with `{{ actions }}`.
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input,
            pos: 0,
            in_action: false,
            bare: false,
            trim_next_text: false,
        }
    }

    /// Lexes the inside of a single action, without delimiters.
    pub fn new_expression(input: &'a str) -> Self {
        Lexer {
            input,
            pos: 0,
            in_action: true,
            bare: true,
            trim_next_text: false,
        }
    }

    /// Advances the lexer and returns the next token.
    pub fn next_token(&mut self) -> Token {
        if self.in_action {
            self.next_action_token()
        } else {
            self.next_text_token()
        }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.rest().chars().nth(1)
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    // ------------------------------------------------------------------------
    // TEXT MODE
    // ------------------------------------------------------------------------

    fn next_text_token(&mut self) -> Token {
        loop {
            let rest = self.rest();
            if rest.is_empty() {
                return Token::EOF;
            }

            let (mut text, found_delim) = match rest.find(LEFT_DELIM) {
                Some(i) => (&rest[..i], true),
                None => (rest, false),
            };
            self.pos += text.len();

            if std::mem::take(&mut self.trim_next_text) {
                text = text.trim_start();
            }
            if found_delim && has_left_trim_marker(self.rest()) {
                text = text.trim_end();
            }

            if !text.is_empty() {
                return Token::Text(text.to_string());
            }
            if !found_delim {
                return Token::EOF;
            }

            if let Some(token) = self.open_action() {
                return token;
            }
            // A comment was consumed; continue with the text after it.
        }
    }

    /// Consumes `{{` (and a trim marker). Returns None when the action turned
    /// out to be a comment, which produces no tokens.
    fn open_action(&mut self) -> Option<Token> {
        self.pos += LEFT_DELIM.len();
        if has_left_trim_marker_after_delim(self.rest()) {
            self.pos += 1;
            self.skip_whitespace();
        }

        if self.rest().starts_with(LEFT_COMMENT) {
            return self.skip_comment();
        }

        self.in_action = true;
        Some(Token::LeftDelim)
    }

    fn skip_comment(&mut self) -> Option<Token> {
        let body_start = self.pos + LEFT_COMMENT.len();
        let Some(end) = self.input[body_start..].find(RIGHT_COMMENT) else {
            self.pos = self.input.len();
            return Some(Token::Error("unclosed comment".to_string()));
        };
        self.pos = body_start + end + RIGHT_COMMENT.len();

        let had_space = self.skip_whitespace();
        if had_space && self.rest().starts_with("-}}") {
            self.pos += 3;
            self.trim_next_text = true;
            None
        } else if self.rest().starts_with(RIGHT_DELIM) {
            self.pos += RIGHT_DELIM.len();
            None
        } else {
            Some(Token::Error(
                "comment ends before closing delimiter".to_string(),
            ))
        }
    }

    // ------------------------------------------------------------------------
    // ACTION MODE
    // ------------------------------------------------------------------------

    fn next_action_token(&mut self) -> Token {
        let had_space = self.skip_whitespace();

        if !self.bare {
            if had_space && self.rest().starts_with("-}}") {
                self.pos += 3;
                self.in_action = false;
                self.trim_next_text = true;
                return Token::RightDelim;
            }
            if self.rest().starts_with(RIGHT_DELIM) {
                self.pos += RIGHT_DELIM.len();
                self.in_action = false;
                return Token::RightDelim;
            }
        }

        let Some(ch) = self.peek() else {
            if self.bare {
                return Token::EOF;
            }
            return Token::Error("unclosed action".to_string());
        };

        match ch {
            '|' => {
                self.bump();
                Token::Pipe
            }
            '(' => {
                self.bump();
                Token::LParen
            }
            ')' => {
                self.bump();
                Token::RParen
            }
            '"' => {
                self.bump();
                self.read_string()
            }
            '`' => {
                self.bump();
                self.read_raw_string()
            }
            '.' => match self.peek_second() {
                Some(next) if is_identifier_start(next) => Token::Field(self.read_field_chain()),
                Some(next) if next.is_ascii_digit() => self.read_number(),
                _ => {
                    self.bump();
                    Token::Dot
                }
            },
            '$' => {
                self.bump();
                let path = match (self.peek(), self.peek_second()) {
                    (Some('.'), Some(next)) if is_identifier_start(next) => self.read_field_chain(),
                    _ => Vec::new(),
                };
                Token::Root(path)
            }
            '-' | '+' if self.peek_second().is_some_and(|c| c.is_ascii_digit()) => {
                self.read_number()
            }
            ch if ch.is_ascii_digit() => self.read_number(),
            ch if is_identifier_start(ch) => self.read_identifier(),
            ch => {
                self.bump();
                Token::Illegal(ch)
            }
        }
    }

    /// Skips whitespace and reports whether anything was skipped.
    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if !ch.is_whitespace() {
                break;
            }
            self.bump();
        }
        self.pos > start
    }

    fn read_string(&mut self) -> Token {
        let mut result = String::new();
        while let Some(ch) = self.bump() {
            match ch {
                '"' => return Token::String(result),
                '\n' => break,
                '\\' => match self.bump() {
                    Some('n') => result.push('\n'),
                    Some('t') => result.push('\t'),
                    Some('r') => result.push('\r'),
                    Some('\\') => result.push('\\'),
                    Some('"') => result.push('"'),
                    Some(other) => {
                        return Token::Error(format!("unknown escape sequence: \\{}", other));
                    }
                    None => break,
                },
                _ => result.push(ch),
            }
        }
        Token::Error("unterminated quoted string".to_string())
    }

    fn read_raw_string(&mut self) -> Token {
        let rest = self.rest();
        match rest.find('`') {
            Some(end) => {
                self.pos += end + 1;
                Token::String(rest[..end].to_string())
            }
            None => {
                self.pos = self.input.len();
                Token::Error("unterminated raw quoted string".to_string())
            }
        }
    }

    /// Reads `.a.b.c` into ["a", "b", "c"]. The cursor must be on a '.'.
    fn read_field_chain(&mut self) -> Vec<String> {
        let mut path = Vec::new();
        while self.peek() == Some('.') && self.peek_second().is_some_and(is_identifier_start) {
            self.bump();
            let start = self.pos;
            while self.peek().is_some_and(is_identifier_char) {
                self.bump();
            }
            path.push(self.input[start..self.pos].to_string());
        }
        path
    }

    fn read_number(&mut self) -> Token {
        let start = self.pos;
        if matches!(self.peek(), Some('-') | Some('+')) {
            self.bump();
        }

        let mut has_dot = false;
        let mut has_exponent = false;
        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                self.bump();
            } else if ch == '.' && !has_dot && !has_exponent {
                has_dot = true;
                self.bump();
            } else if (ch == 'e' || ch == 'E') && !has_exponent {
                has_exponent = true;
                self.bump();
                if matches!(self.peek(), Some('-') | Some('+')) {
                    self.bump();
                }
            } else {
                break;
            }
        }

        let number_str = &self.input[start..self.pos];
        match number_str.parse::<f64>() {
            Ok(n) => Token::Number(n),
            Err(_) => Token::Error(format!("bad number syntax: {}", number_str)),
        }
    }

    fn read_identifier(&mut self) -> Token {
        let start = self.pos;
        while self.peek().is_some_and(is_identifier_char) {
            self.bump();
        }

        match &self.input[start..self.pos] {
            "true" => Token::Boolean(true),
            "false" => Token::Boolean(false),
            "nil" => Token::Nil,
            ident => Token::Identifier(ident.to_string()),
        }
    }
}

/// True when the text right at a `{{` continues with a `-` trim marker.
fn has_left_trim_marker(rest: &str) -> bool {
    rest.strip_prefix(LEFT_DELIM)
        .is_some_and(has_left_trim_marker_after_delim)
}

/// `{{- ` needs whitespace after the dash, otherwise `{{-3}}` is a number.
fn has_left_trim_marker_after_delim(rest: &str) -> bool {
    let mut chars = rest.chars();
    chars.next() == Some('-') && chars.next().is_some_and(|c| c.is_whitespace())
}

fn is_identifier_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_'
}

fn is_identifier_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}
