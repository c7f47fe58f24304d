//! Formula error types

use thiserror::Error;

/// Result type for formula operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// Errors that can occur while tokenizing or rewriting a formula
#[derive(Debug, Error)]
pub enum FormulaError {
    /// Formula text could not be tokenized
    #[error("Parse error: {0}")]
    Parse(String),

    /// A reference could not be parsed or left the grid
    #[error("Invalid reference: {0}")]
    InvalidReference(String),
}
