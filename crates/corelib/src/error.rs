//! Core shared errors (renderer-agnostic).

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum CoreError {
    #[error("unknown exercise '{0}' (expected cube, textured or lit)")]
    UnknownExercise(String),
    #[error("invalid color '{0}': expected three comma-separated numbers in [0, 1]")]
    InvalidColor(String),
    #[error("invalid window size '{0}': expected WIDTHxHEIGHT with non-zero values")]
    InvalidSize(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
