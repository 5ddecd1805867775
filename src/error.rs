//! Error types

use thiserror::Error;

use crate::parser::ParseError;

/// Fatal to the state whose instruction failed to translate; sibling states keep exploring
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslateError {
    #[error("undeclared variable '{0}'")]
    UndeclaredVariable(String),

    #[error("sort mismatch in {context}: {left} vs {right}")]
    SortMismatch {
        context: String,
        left: String,
        right: String,
    },

    #[error("operator '{op}' is not defined on {sort}")]
    UnknownOperator { op: String, sort: String },

    #[error("cannot dereference non-pointer '{0}'")]
    NotAPointer(String),

    #[error("invalid constant '{literal}' of type {ty}")]
    InvalidConstant { literal: String, ty: String },

    #[error("no incoming edge of phi '{0}' resolves")]
    UnresolvedPhi(String),

    #[error("cannot convert {from} to {to}")]
    UnsupportedConversion { from: String, to: String },
}

impl TranslateError {
    pub(crate) fn sort_mismatch(
        context: impl Into<String>,
        left: impl ToString,
        right: impl ToString,
    ) -> Self {
        TranslateError::SortMismatch {
            context: context.into(),
            left: left.to_string(),
            right: right.to_string(),
        }
    }
}

/// Errors surfaced by the driver
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unknown function '{name}'. Available: {available}")]
    UnknownFunction { name: String, available: String },
}

pub type Result<T> = std::result::Result<T, Error>;
