//! Dirty range index and excluded-cell lookup

use super::data::ExcludedCells;
use ahash::AHashMap;
use sheetflow_core::{SheetId, UnitId, UnitRange};

/// Dirty ranges grouped by unit and sheet
#[derive(Debug, Clone, Default)]
pub struct DirtyRangeIndex {
    ranges: AHashMap<UnitId, AHashMap<SheetId, Vec<UnitRange>>>,
}

impl DirtyRangeIndex {
    /// Group a flat list of dirty ranges
    pub fn flatten<'a>(ranges: impl IntoIterator<Item = &'a UnitRange>) -> Self {
        let mut index = Self::default();
        for range in ranges {
            index
                .ranges
                .entry(range.unit_id.clone())
                .or_default()
                .entry(range.sheet_id.clone())
                .or_default()
                .push(range.clone());
        }
        index
    }

    pub fn ranges_on(&self, unit_id: &str, sheet_id: &str) -> &[UnitRange] {
        self.ranges
            .get(unit_id)
            .and_then(|sheets| sheets.get(sheet_id))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Whether `range` overlaps any dirty range on its unit and sheet
    pub fn intersects(&self, range: &UnitRange) -> bool {
        self.ranges_on(&range.unit_id, &range.sheet_id)
            .iter()
            .any(|dirty| dirty.overlaps_range(&range.effective()))
    }

    /// Whether the cell is covered by a dirty range
    pub fn contains_cell(&self, unit_id: &str, sheet_id: &str, row: u32, col: u16) -> bool {
        self.ranges_on(unit_id, sheet_id)
            .iter()
            .any(|dirty| dirty.contains_cell(row, col))
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.values().flat_map(|s| s.values()).all(Vec::is_empty)
    }
}

/// Whether the cell is excluded from self-dirty selection
pub fn is_excluded(excluded: &ExcludedCells, unit_id: &str, sheet_id: &str, row: u32, col: u16) -> bool {
    excluded
        .get(unit_id)
        .and_then(|sheets| sheets.get(sheet_id))
        .is_some_and(|cells| cells.contains(&(row, col)))
}
