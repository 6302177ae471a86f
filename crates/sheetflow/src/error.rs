//! Error types for the sheetflow facade

use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the formula data model and pass orchestration
#[derive(Debug, Error)]
pub enum Error {
    /// A cell was given neither formula text nor a shared formula id
    #[error("Cell {cell} on sheet '{sheet_id}' needs formula text or a shared formula id")]
    EmptyFormula { sheet_id: String, cell: String },

    /// Formula text that does not start with `=`
    #[error("Not a formula: '{0}'")]
    InvalidFormula(String),

    /// Addressing error
    #[error(transparent)]
    Core(#[from] sheetflow_core::Error),

    /// Pass planning error
    #[error(transparent)]
    Formula(#[from] sheetflow_formula::FormulaError),
}

impl Error {
    /// Whether the pass was abandoned because the host cancelled it
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            Error::Formula(sheetflow_formula::FormulaError::Cancelled)
        )
    }
}
