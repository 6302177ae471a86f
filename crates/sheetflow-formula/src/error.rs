//! Formula error types

use thiserror::Error;

/// Result type for formula operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// Errors that can occur during formula parsing, evaluation or pass planning
///
/// Spreadsheet-level failures (`#REF!`, `#VALUE!`, ...) are values, not
/// variants of this enum. Anything returned here aborts the current pass.
#[derive(Debug, Error)]
pub enum FormulaError {
    /// Formula parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Formula evaluation error
    #[error("Evaluation error: {0}")]
    Evaluation(String),

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    Argument(String),

    /// Reference to invalid cell
    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    /// A parse reported success but produced no syntax tree
    #[error("No syntax tree produced for formula '{formula}'")]
    MissingAst { formula: String },

    /// A host lookup required by the pass returned nothing
    #[error("Host lookup failed: {0}")]
    MissingHostData(String),

    /// The host marked the pass obsolete
    #[error("Calculation pass cancelled")]
    Cancelled,

    /// Addressing error from sheetflow-core
    #[error(transparent)]
    Core(#[from] sheetflow_core::Error),
}
