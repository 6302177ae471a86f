//! # sheetflow
//!
//! Incremental recalculation planning for spreadsheet-like documents.
//!
//! Sheetflow does not compute formula values. Given every formula a
//! document holds and a description of what changed, it works out which
//! formulas are stale, the order they must run in, and whether the
//! document contains circular references.
//!
//! ## Features
//!
//! - Grid formulas, shared formulas and formulas owned by other objects
//! - Host features that re-run when the ranges they watch change
//! - Dependencies discovered by evaluating references, including
//!   `OFFSET`, `INDIRECT` and `INDEX`
//! - Circular reference detection
//! - A bounded cache of parsed formulas shared across passes
//!
//! ## Example
//!
//! ```rust
//! use sheetflow::prelude::*;
//!
//! let mut model = FormulaDataModel::new();
//! model.set_cell_formula("book", "s1", 0, 0, Some("=1"), None).unwrap();
//! model.set_cell_formula("book", "s1", 0, 1, Some("=A1*2"), None).unwrap();
//!
//! let recalculator = Recalculator::default();
//! let request = PassRequest::new().with_dirty_range(UnitRange::cell("book", "s1", 0, 0));
//! let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
//! let plan = runtime
//!     .block_on(recalculator.plan(&model, &CellValues::new(), &request))
//!     .unwrap();
//!
//! let order: Vec<String> = plan.run_list.iter().map(|item| item.to_string()).collect();
//! assert_eq!(order, vec!["[book]s1!A1", "[book]s1!B1"]);
//! ```

pub mod calculation;
pub mod error;
pub mod model;
pub mod prelude;
pub mod values;

pub use calculation::{CalculationOptions, PassRequest, Recalculator};
pub use error::{Error, Result};
pub use model::FormulaDataModel;
pub use values::CellValues;

// Re-export core types
pub use sheetflow_core::{
    CellAddress, CellError, CellRange, RangeKind, SheetId, UnitId, UnitRange, MAX_COLS, MAX_ROWS,
};

// Re-export formula types
pub use sheetflow_formula::{
    feature_executor, parse_formula, AstCache, CancellationFlag, CellValueSource, FeatureExecutor,
    FeatureRegistration, FormulaError, FormulaExpr, FormulaResult, FormulaValue, NodeLocation,
    PassPlan, PassStats, RunItem,
};
