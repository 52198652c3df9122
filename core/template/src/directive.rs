//! FILENAME: core/template/src/directive.rs
//! PURPOSE: Finds, parses and removes column expansion directives.
//! CONTEXT: A directive is an action like `{{ col_range .cols }}` somewhere
//! in a cell line. Cells are scanned line by line, so detection is an
//! unanchored match per line. The argument text is parsed as a pipeline so
//! the expander can evaluate it against the root data context.

use parser::{Expression, ParseError};
use regex::Regex;

use crate::error::{TemplateError, TemplateResult};

/// Splits cell text on '\n'. Empty text has no lines.
pub fn split_lines(text: &str) -> Vec<&str> {
    if text.is_empty() {
        Vec::new()
    } else {
        text.split('\n').collect()
    }
}

/// One directive call found in a line.
#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    /// Argument text as written, e.g. `.cols`.
    pub source: String,
    pub argument: Expression,
}

#[derive(Debug, Clone)]
pub struct DirectiveMatcher {
    name: String,
    pattern: Regex,
}

impl DirectiveMatcher {
    pub fn new(name: &str) -> TemplateResult<Self> {
        // Trim markers also consume the whitespace on their side.
        let pattern = format!(
            r"(?:\s*\{{\{{-|\{{\{{)\s*{}\b(?:\s+(.*?))?(?:\s*-\}}\}}\s*|\s*\}}\}})",
            regex::escape(name)
        );
        let pattern = Regex::new(&pattern)
            .map_err(|e| TemplateError::Config(format!("directive pattern: {}", e)))?;

        Ok(DirectiveMatcher {
            name: name.to_string(),
            pattern,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_expansion_directive(&self, line: &str) -> bool {
        self.pattern.is_match(line)
    }

    /// Parses the argument of every directive in the line, left to right.
    pub fn find(&self, line: &str) -> TemplateResult<Vec<Directive>> {
        let mut directives = Vec::new();
        for captures in self.pattern.captures_iter(line) {
            let source = captures.get(1).map_or("", |m| m.as_str()).trim();
            if source.is_empty() {
                return Err(ParseError::new(format!("{} requires an argument", self.name)).into());
            }

            let argument = parser::parse_expression(source)?;
            directives.push(Directive {
                source: source.to_string(),
                argument,
            });
        }
        Ok(directives)
    }

    /// Removes every directive call, keeping the surrounding text. Trim
    /// markers remove the adjacent whitespace as well.
    pub fn strip(&self, line: &str) -> String {
        self.pattern.replace_all(line, "").into_owned()
    }

    /// Strips directives from each line of `text` and joins the lines back
    /// together without a separator.
    pub fn strip_cell_text(&self, text: &str) -> String {
        split_lines(text)
            .into_iter()
            .map(|line| {
                if self.has_expansion_directive(line) {
                    self.strip(line)
                } else {
                    line.to_string()
                }
            })
            .collect()
    }
}
