//! # sheetflow-core
//!
//! Core addressing types shared by the sheetflow crates.
//!
//! This crate provides:
//! - [`CellAddress`] and [`CellRange`] - A1-style addressing
//! - [`UnitRange`] - A range qualified by unit (document) and sheet identity
//! - [`RangeKind`] - Plain rectangles, whole rows and whole columns
//! - [`CellError`] - Spreadsheet error values (`#REF!`, `#VALUE!`, ...)
//!
//! ## Example
//!
//! ```rust
//! use sheetflow_core::{CellRange, UnitRange};
//!
//! let a = UnitRange::new("book", "sheet1", CellRange::parse("A1:B2").unwrap());
//! let b = UnitRange::new("book", "sheet1", CellRange::parse("B2:C3").unwrap());
//! assert!(a.intersects(&b));
//! ```

pub mod cell;
pub mod error;
pub mod range;

pub use cell::{CellAddress, CellError, CellRange};
pub use error::{Error, Result};
pub use range::{RangeKind, SheetId, UnitId, UnitRange};

/// Maximum number of rows in a worksheet (Excel limit)
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a worksheet (Excel limit)
pub const MAX_COLS: u16 = 16_384;
