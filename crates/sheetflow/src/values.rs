//! Literal cell values visible to reference functions

use ahash::AHashMap;
use sheetflow_core::{CellRange, SheetId, UnitId};
use sheetflow_formula::{CellValueSource, FormulaValue};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
struct SheetValues {
    cells: BTreeMap<(u32, u16), FormulaValue>,
    spills: AHashMap<(u32, u16), CellRange>,
}

/// In-memory value store.
///
/// Sheet names registered with [`set_sheet_name`](Self::set_sheet_name)
/// are matched case-insensitively. A unit with no registered names treats
/// names as sheet ids.
#[derive(Debug, Clone, Default)]
pub struct CellValues {
    sheets: AHashMap<(UnitId, SheetId), SheetValues>,
    names: AHashMap<UnitId, AHashMap<String, SheetId>>,
}

impl CellValues {
    pub fn new() -> Self {
        Self::default()
    }

    fn sheet_mut(&mut self, unit_id: &str, sheet_id: &str) -> &mut SheetValues {
        self.sheets
            .entry((unit_id.to_string(), sheet_id.to_string()))
            .or_default()
    }

    fn sheet(&self, unit_id: &str, sheet_id: &str) -> Option<&SheetValues> {
        self.sheets.get(&(unit_id.to_string(), sheet_id.to_string()))
    }

    pub fn set_value(
        &mut self,
        unit_id: &str,
        sheet_id: &str,
        row: u32,
        col: u16,
        value: impl Into<FormulaValue>,
    ) {
        let value = value.into();
        let cells = &mut self.sheet_mut(unit_id, sheet_id).cells;
        if value == FormulaValue::Empty {
            cells.remove(&(row, col));
        } else {
            cells.insert((row, col), value);
        }
    }

    pub fn clear_value(&mut self, unit_id: &str, sheet_id: &str, row: u32, col: u16) {
        self.set_value(unit_id, sheet_id, row, col, FormulaValue::Empty);
    }

    /// Record the extent a dynamic array anchored at `(row, col)` spilled into
    pub fn set_spill_range(&mut self, unit_id: &str, sheet_id: &str, row: u32, col: u16, range: CellRange) {
        self.sheet_mut(unit_id, sheet_id).spills.insert((row, col), range);
    }

    /// Register the display name of a sheet
    pub fn set_sheet_name(&mut self, unit_id: &str, sheet_id: &str, name: &str) {
        self.names
            .entry(unit_id.to_string())
            .or_default()
            .insert(name.to_lowercase(), sheet_id.to_string());
    }
}

impl CellValueSource for CellValues {
    fn cell_value(&self, unit_id: &str, sheet_id: &str, row: u32, col: u16) -> FormulaValue {
        self.sheet(unit_id, sheet_id)
            .and_then(|sheet| sheet.cells.get(&(row, col)))
            .cloned()
            .unwrap_or(FormulaValue::Empty)
    }

    fn sheet_id_by_name(&self, unit_id: &str, name: &str) -> Option<SheetId> {
        match self.names.get(unit_id) {
            Some(names) => names.get(&name.to_lowercase()).cloned(),
            None => Some(name.to_string()),
        }
    }

    fn spill_range(&self, unit_id: &str, sheet_id: &str, row: u32, col: u16) -> Option<CellRange> {
        self.sheet(unit_id, sheet_id)?.spills.get(&(row, col)).copied()
    }

    fn data_extent(&self, unit_id: &str, sheet_id: &str) -> Option<CellRange> {
        let cells = &self.sheet(unit_id, sheet_id)?.cells;
        cells.keys().fold(None, |extent: Option<CellRange>, &(row, col)| {
            let cell = CellRange::from_indices(row, col, row, col);
            Some(match extent {
                Some(extent) => extent.bounding(&cell),
                None => cell,
            })
        })
    }
}
