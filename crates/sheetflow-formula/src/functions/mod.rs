//! Built-in functions
//!
//! Only what range discovery needs: the address-producing functions and a
//! few value functions that commonly feed their arguments.

pub mod math;
pub mod reference;

use crate::error::FormulaResult;
use crate::evaluator::{EvaluationContext, FormulaValue};
use ahash::AHashMap;
use std::sync::OnceLock;

/// Function implementation signature
///
/// Functions can consult the evaluation context (current unit, sheet and
/// cell, host values) to resolve relative behaviour.
pub type FunctionImpl = fn(&[FormulaValue], &EvaluationContext) -> FormulaResult<FormulaValue>;

/// Function definition
pub struct FunctionDef {
    /// Function name (uppercase)
    pub name: &'static str,
    /// Minimum arguments
    pub min_args: usize,
    /// Maximum arguments (None = unlimited)
    pub max_args: Option<usize>,
    /// Implementation
    pub implementation: FunctionImpl,
    /// Arguments arrive as references instead of being read into values
    pub reference_args: bool,
    /// The result is itself a reference
    pub address: bool,
}

/// Function registry
pub struct FunctionRegistry {
    functions: AHashMap<String, FunctionDef>,
}

/// Global function registry (lazily initialized)
static FUNCTION_REGISTRY: OnceLock<FunctionRegistry> = OnceLock::new();

/// The shared registry of built-in functions
pub fn registry() -> &'static FunctionRegistry {
    FUNCTION_REGISTRY.get_or_init(FunctionRegistry::new)
}

/// Whether `name` is a built-in whose result is a reference
pub fn is_address_function(name: &str) -> bool {
    registry().get(name).map_or(false, |def| def.address)
}

impl FunctionRegistry {
    /// Create a new registry with all built-in functions
    pub fn new() -> Self {
        let mut registry = Self {
            functions: AHashMap::new(),
        };

        registry.register_reference_functions();
        registry.register_math_functions();

        registry
    }

    /// Look up a function by name
    pub fn get(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(&name.to_uppercase())
    }

    /// Register a function
    pub fn register(&mut self, def: FunctionDef) {
        self.functions.insert(def.name.to_uppercase(), def);
    }

    fn register_reference_functions(&mut self) {
        // OFFSET
        self.register(FunctionDef {
            name: "OFFSET",
            min_args: 3,
            max_args: Some(5),
            implementation: reference::fn_offset,
            reference_args: true,
            address: true,
        });

        // INDIRECT
        self.register(FunctionDef {
            name: "INDIRECT",
            min_args: 1,
            max_args: Some(2),
            implementation: reference::fn_indirect,
            reference_args: true,
            address: true,
        });

        // INDEX
        self.register(FunctionDef {
            name: "INDEX",
            min_args: 2,
            max_args: Some(3),
            implementation: reference::fn_index,
            reference_args: true,
            address: true,
        });

        // ROW
        self.register(FunctionDef {
            name: "ROW",
            min_args: 0,
            max_args: Some(1),
            implementation: reference::fn_row,
            reference_args: true,
            address: false,
        });

        // COLUMN
        self.register(FunctionDef {
            name: "COLUMN",
            min_args: 0,
            max_args: Some(1),
            implementation: reference::fn_column,
            reference_args: true,
            address: false,
        });

        // ROWS
        self.register(FunctionDef {
            name: "ROWS",
            min_args: 1,
            max_args: Some(1),
            implementation: reference::fn_rows,
            reference_args: true,
            address: false,
        });

        // COLUMNS
        self.register(FunctionDef {
            name: "COLUMNS",
            min_args: 1,
            max_args: Some(1),
            implementation: reference::fn_columns,
            reference_args: true,
            address: false,
        });
    }

    fn register_math_functions(&mut self) {
        // SUM
        self.register(FunctionDef {
            name: "SUM",
            min_args: 1,
            max_args: None,
            implementation: math::fn_sum,
            reference_args: false,
            address: false,
        });

        // MIN
        self.register(FunctionDef {
            name: "MIN",
            min_args: 1,
            max_args: None,
            implementation: math::fn_min,
            reference_args: false,
            address: false,
        });

        // MAX
        self.register(FunctionDef {
            name: "MAX",
            min_args: 1,
            max_args: None,
            implementation: math::fn_max,
            reference_args: false,
            address: false,
        });

        // ABS
        self.register(FunctionDef {
            name: "ABS",
            min_args: 1,
            max_args: Some(1),
            implementation: math::fn_abs,
            reference_args: false,
            address: false,
        });

        // IF
        self.register(FunctionDef {
            name: "IF",
            min_args: 2,
            max_args: Some(3),
            implementation: math::fn_if,
            reference_args: false,
            address: false,
        });
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
