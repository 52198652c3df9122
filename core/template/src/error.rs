//! FILENAME: core/template/src/error.rs
//! PURPOSE: Error type for template rendering.

use engine::{CellAddress, SheetError};
use parser::ParseError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("template: {0}")]
    Syntax(#[from] ParseError),

    #[error("map has no entry for key \"{key}\"")]
    MissingKey { key: String },

    #[error("executing template: {0}")]
    Exec(String),

    #[error("{directive} argument must be a sequence, got {found}")]
    InvalidRangeArgument { directive: String, found: String },

    #[error("copying column: {0}")]
    StructuralCopy(#[from] SheetError),

    #[error("invalid template configuration: {0}")]
    Config(String),

    #[error("error in template (cell {address}): {source}")]
    AtCell {
        address: CellAddress,
        source: Box<TemplateError>,
    },
}

impl TemplateError {
    /// Attaches a cell address. An error that already carries one keeps it.
    pub fn at(self, address: CellAddress) -> Self {
        match self {
            TemplateError::AtCell { .. } => self,
            other => TemplateError::AtCell {
                address,
                source: Box::new(other),
            },
        }
    }

    /// The error without its address wrapper.
    pub fn root_cause(&self) -> &TemplateError {
        match self {
            TemplateError::AtCell { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Address of the failing cell, if the error has been located.
    pub fn address(&self) -> Option<CellAddress> {
        match self {
            TemplateError::AtCell { address, .. } => Some(*address),
            _ => None,
        }
    }

    pub fn is_missing_key(&self) -> bool {
        matches!(self.root_cause(), TemplateError::MissingKey { .. })
    }
}

pub type TemplateResult<T> = Result<T, TemplateError>;
