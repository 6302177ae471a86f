//! Calculation pass orchestration
//!
//! [`Recalculator`] keeps the parsed-formula cache of one document alive
//! across passes and turns the current formula data plus a change
//! description into a [`PassPlan`].
//!
//! # Example
//!
//! ```rust
//! use sheetflow::prelude::*;
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let mut model = FormulaDataModel::new();
//! model.set_cell_formula("book", "s1", 0, 2, Some("=A1+B1"), None).unwrap();
//!
//! let recalculator = Recalculator::new(CalculationOptions::default());
//! let request = PassRequest::new().with_dirty_range(UnitRange::cell("book", "s1", 0, 0));
//! let plan = recalculator.plan(&model, &CellValues::new(), &request).await.unwrap();
//!
//! assert_eq!(plan.run_list.len(), 1);
//! # });
//! ```

use crate::error::Result;
use crate::model::FormulaDataModel;
use sheetflow_core::UnitRange;
use sheetflow_formula::dependency::{CalculationPass, ExcludedCells};
use sheetflow_formula::{
    AstCache, CancellationFlag, CellValueSource, FormulaDependencyGenerator, Interpreter, PassPlan,
    DEFAULT_AST_CACHE_CAPACITY,
};

/// Options for planning calculation passes
#[derive(Debug, Clone)]
pub struct CalculationOptions {
    /// Parsed formulas kept between passes (default: 100 000)
    pub ast_cache_capacity: usize,
    /// Plan every formula on every pass, ignoring dirty ranges
    pub force_full_calculation: bool,
}

impl Default for CalculationOptions {
    fn default() -> Self {
        Self {
            ast_cache_capacity: DEFAULT_AST_CACHE_CAPACITY,
            force_full_calculation: false,
        }
    }
}

/// What changed since the last pass
#[derive(Debug, Clone, Default)]
pub struct PassRequest {
    pub dirty_ranges: Vec<UnitRange>,
    /// Plan every formula regardless of dirty ranges
    pub force: bool,
    /// Cells whose own dirtiness does not select them
    pub excluded_cells: ExcludedCells,
    /// Flag the host sets to abandon the pass
    pub cancellation: Option<CancellationFlag>,
}

impl PassRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// A request that plans everything
    pub fn full() -> Self {
        Self {
            force: true,
            ..Self::default()
        }
    }

    pub fn with_dirty_range(mut self, range: UnitRange) -> Self {
        self.dirty_ranges.push(range);
        self
    }

    pub fn with_excluded_cell(mut self, unit_id: &str, sheet_id: &str, row: u32, col: u16) -> Self {
        self.excluded_cells
            .entry(unit_id.to_string())
            .or_default()
            .entry(sheet_id.to_string())
            .or_default()
            .insert((row, col));
        self
    }

    pub fn with_cancellation(mut self, flag: CancellationFlag) -> Self {
        self.cancellation = Some(flag);
        self
    }
}

/// Plans passes for one document.
///
/// Passes are independent except for the shared AST cache; the host runs
/// one pass at a time.
#[derive(Debug)]
pub struct Recalculator {
    options: CalculationOptions,
    cache: AstCache,
}

impl Recalculator {
    pub fn new(options: CalculationOptions) -> Self {
        let cache = AstCache::new(options.ast_cache_capacity);
        Self { options, cache }
    }

    pub fn options(&self) -> &CalculationOptions {
        &self.options
    }

    pub fn ast_cache(&self) -> &AstCache {
        &self.cache
    }

    /// Forget every parsed formula
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Work out which formulas the request makes stale and the order to
    /// run them in
    pub async fn plan<S: CellValueSource>(
        &self,
        model: &FormulaDataModel,
        values: &S,
        request: &PassRequest,
    ) -> Result<PassPlan> {
        let pass = CalculationPass {
            formula_data: model.formula_data(),
            other_formula_data: model.other_formula_data().clone(),
            features: model.features().clone(),
            dirty_ranges: request.dirty_ranges.clone(),
            force_calculate: request.force || self.options.force_full_calculation,
            excluded_cells: request.excluded_cells.clone(),
            cancellation: request.cancellation.clone().unwrap_or_default(),
        };

        let plan = FormulaDependencyGenerator::new(&self.cache)
            .generate(&pass, &Interpreter::new(values))
            .await?;
        Ok(plan)
    }
}

impl Default for Recalculator {
    fn default() -> Self {
        Self::new(CalculationOptions::default())
    }
}
