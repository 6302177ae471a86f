//! Prelude module - common imports for sheetflow users
//!
//! ```rust
//! use sheetflow::prelude::*;
//! ```

pub use crate::{
    // Calculation
    CalculationOptions,
    CancellationFlag,
    // Addressing
    CellAddress,
    CellError,
    CellRange,
    // Host data
    CellValues,
    // Errors
    Error,
    FeatureExecutor,
    FeatureRegistration,
    FormulaDataModel,
    FormulaValue,
    NodeLocation,
    PassPlan,
    PassRequest,
    Recalculator,
    Result,
    RunItem,
    UnitRange,
};
