//! Per-pass inputs supplied by the host

use super::tree::FeatureExecutor;
use sheetflow_core::{SheetId, UnitId, UnitRange};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// One grid formula occurrence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormulaDataItem {
    /// Formula text (for shared formula members, the anchor's text)
    pub f: String,
    /// Shared formula id
    pub si: Option<String>,
    /// Column offset from the shared formula anchor
    pub x: i64,
    /// Row offset from the shared formula anchor
    pub y: i64,
}

impl FormulaDataItem {
    /// An ordinary formula at offset (0, 0)
    pub fn new(f: impl Into<String>) -> Self {
        Self {
            f: f.into(),
            si: None,
            x: 0,
            y: 0,
        }
    }

    /// A shared formula member offset from its anchor
    pub fn shared(f: impl Into<String>, si: impl Into<String>, x: i64, y: i64) -> Self {
        Self {
            f: f.into(),
            si: Some(si.into()),
            x,
            y,
        }
    }
}

/// unit → sheet → (row, col) → formula
pub type FormulaData = BTreeMap<UnitId, BTreeMap<SheetId, BTreeMap<(u32, u16), FormulaDataItem>>>;

/// A formula owned by a non-grid object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtherFormulaItem {
    pub f: String,
}

/// unit → sub-component → formula id → formula
pub type OtherFormulaData =
    BTreeMap<UnitId, BTreeMap<String, BTreeMap<String, OtherFormulaItem>>>;

/// A host feature that re-runs when any of its ranges becomes dirty
#[derive(Clone)]
pub struct FeatureRegistration {
    pub unit_id: UnitId,
    pub sub_component_id: String,
    /// Empty means the feature runs on every pass
    pub dependency_ranges: Vec<UnitRange>,
    pub executor: Arc<dyn FeatureExecutor>,
}

impl fmt::Debug for FeatureRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureRegistration")
            .field("unit_id", &self.unit_id)
            .field("sub_component_id", &self.sub_component_id)
            .field("dependency_ranges", &self.dependency_ranges)
            .finish_non_exhaustive()
    }
}

/// feature id → registration
pub type FeatureRegistrations = BTreeMap<String, FeatureRegistration>;

/// unit → sheet → cells whose own dirtiness is ignored
pub type ExcludedCells = BTreeMap<UnitId, BTreeMap<SheetId, BTreeSet<(u32, u16)>>>;

/// Shared flag the host sets when a running pass becomes obsolete
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Everything one calculation pass reads
#[derive(Debug, Clone, Default)]
pub struct CalculationPass {
    pub formula_data: FormulaData,
    pub other_formula_data: OtherFormulaData,
    pub features: FeatureRegistrations,
    pub dirty_ranges: Vec<UnitRange>,
    /// Select every node regardless of dirty ranges
    pub force_calculate: bool,
    pub excluded_cells: ExcludedCells,
    pub cancellation: CancellationFlag,
}

impl CalculationPass {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a grid formula
    pub fn with_formula(
        mut self,
        unit_id: &str,
        sheet_id: &str,
        row: u32,
        col: u16,
        item: FormulaDataItem,
    ) -> Self {
        self.formula_data
            .entry(unit_id.to_string())
            .or_default()
            .entry(sheet_id.to_string())
            .or_default()
            .insert((row, col), item);
        self
    }

    /// Add a non-grid formula
    pub fn with_other_formula(
        mut self,
        unit_id: &str,
        sub_component_id: &str,
        formula_id: &str,
        f: impl Into<String>,
    ) -> Self {
        self.other_formula_data
            .entry(unit_id.to_string())
            .or_default()
            .entry(sub_component_id.to_string())
            .or_default()
            .insert(formula_id.to_string(), OtherFormulaItem { f: f.into() });
        self
    }

    pub fn with_feature(mut self, feature_id: &str, registration: FeatureRegistration) -> Self {
        self.features.insert(feature_id.to_string(), registration);
        self
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

    pub fn force(mut self) -> Self {
        self.force_calculate = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cancellation_is_shared() {
        let flag = CancellationFlag::new();
        let pass = CalculationPass {
            cancellation: flag.clone(),
            ..Default::default()
        };
        assert!(!pass.cancellation.is_cancelled());
        flag.cancel();
        assert!(pass.cancellation.is_cancelled());
    }

    #[test]
    fn test_builder_groups_by_unit_and_sheet() {
        let pass = CalculationPass::new()
            .with_formula("u", "s", 2, 0, FormulaDataItem::new("=1"))
            .with_formula("u", "s", 0, 1, FormulaDataItem::new("=2"))
            .with_other_formula("u", "cf", "rule-1", "=A1>0")
            .with_excluded_cell("u", "s", 2, 0);

        let cells: Vec<_> = pass.formula_data["u"]["s"].keys().copied().collect();
        assert_eq!(cells, vec![(0, 1), (2, 0)]);
        assert_eq!(pass.other_formula_data["u"]["cf"]["rule-1"].f, "=A1>0");
        assert!(pass.excluded_cells["u"]["s"].contains(&(2, 0)));
        assert!(!pass.force_calculate);
    }

    #[test]
    fn test_shared_item_offsets() {
        let item = FormulaDataItem::shared("=A1*2", "s1", 1, 3);
        assert_eq!(item.si.as_deref(), Some("s1"));
        assert_eq!((item.x, item.y), (1, 3));
    }
}
