//! FILENAME: core/template/src/config.rs
//! PURPOSE: Render options.
//! CONTEXT: Defaults reproduce the standard behavior: the expansion directive
//! is `col_range` and a missing key aborts the render. The struct derives
//! Deserialize so hosts can keep it next to their other settings in JSON.

use serde::{Deserialize, Serialize};

use crate::error::{TemplateError, TemplateResult};

pub const DEFAULT_DIRECTIVE: &str = "col_range";

/// What a field lookup yields when the key is absent from a map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingKeyPolicy {
    /// Abort with `TemplateError::MissingKey`.
    #[default]
    Error,
    /// Print `<no value>`.
    Default,
    /// Behave as if the key held null, which prints as empty text.
    Zero,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    /// Function name that marks a column for expansion.
    pub directive: String,
    pub missing_key: MissingKeyPolicy,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        TemplateConfig {
            directive: DEFAULT_DIRECTIVE.to_string(),
            missing_key: MissingKeyPolicy::default(),
        }
    }
}

impl TemplateConfig {
    pub fn with_directive(mut self, name: impl Into<String>) -> Self {
        self.directive = name.into();
        self
    }

    pub fn with_missing_key(mut self, policy: MissingKeyPolicy) -> Self {
        self.missing_key = policy;
        self
    }

    /// The directive must be a plain identifier so it can be called from
    /// template text and matched literally.
    pub fn validate(&self) -> TemplateResult<()> {
        let mut chars = self.directive.chars();
        let valid = chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

        if valid {
            Ok(())
        } else {
            Err(TemplateError::Config(format!(
                "directive name {:?} is not an identifier",
                self.directive
            )))
        }
    }
}
