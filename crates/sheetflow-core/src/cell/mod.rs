//! Cell-related types
//!
//! - [`CellAddress`] - A cell's location (e.g., "A1")
//! - [`CellRange`] - A rectangle of cells (e.g., "A1:B10")
//! - [`CellError`] - Error values produced by formulas

mod address;
mod error;

pub use address::{CellAddress, CellRange};
pub use error::CellError;
