//! Formula data model
//!
//! Host-side storage of every formula a document holds: grid formulas
//! (plain and shared), formulas owned by non-grid objects, and feature
//! registrations. [`FormulaDataModel::formula_data`] produces the snapshot
//! a calculation pass reads.
//!
//! A shared formula is written once, at its anchor cell, together with a
//! shared id. Other cells carrying only the id reuse the anchor's text,
//! shifted by their distance from the anchor.

use crate::error::{Error, Result};
use sheetflow_core::{CellAddress, SheetId, UnitId};
use sheetflow_formula::dependency::{
    FeatureRegistration, FeatureRegistrations, FormulaData, FormulaDataItem, OtherFormulaData,
    OtherFormulaItem,
};
use std::collections::BTreeMap;

/// What a single cell stores
#[derive(Debug, Clone, PartialEq, Eq)]
struct CellFormula {
    f: Option<String>,
    si: Option<String>,
}

/// Text of a shared formula and the cell it was written for
#[derive(Debug, Clone, PartialEq, Eq)]
struct SharedFormula {
    f: String,
    row: u32,
    col: u16,
}

#[derive(Debug, Clone, Default)]
struct SheetFormulas {
    cells: BTreeMap<(u32, u16), CellFormula>,
    shared: BTreeMap<String, SharedFormula>,
}

impl SheetFormulas {
    /// Drop a cell; if it anchored a shared formula, hand the text to the
    /// first remaining member in row-major order
    fn remove(&mut self, row: u32, col: u16) -> Option<CellFormula> {
        let removed = self.cells.remove(&(row, col))?;

        if let (Some(_), Some(si)) = (&removed.f, &removed.si) {
            let successor = self
                .cells
                .iter_mut()
                .find(|(_, cell)| cell.si.as_ref() == Some(si));
            match successor {
                Some((_, cell)) => {
                    if let Some(shared) = self.shared.get(si) {
                        cell.f = Some(shared.f.clone());
                    }
                }
                None => {
                    self.shared.remove(si);
                }
            }
        }

        Some(removed)
    }

    /// Make `(row, col)` the only cell carrying the text of `si`
    fn anchor(&mut self, si: &str, text: &str, row: u32, col: u16) {
        for cell in self.cells.values_mut() {
            if cell.si.as_deref() == Some(si) {
                cell.f = None;
            }
        }
        self.shared.insert(
            si.to_string(),
            SharedFormula {
                f: text.to_string(),
                row,
                col,
            },
        );
    }
}

fn is_formula_text(text: &str) -> bool {
    text.trim_start().starts_with('=')
}

/// All formulas of every unit the host has loaded
#[derive(Debug, Clone, Default)]
pub struct FormulaDataModel {
    sheets: BTreeMap<UnitId, BTreeMap<SheetId, SheetFormulas>>,
    other: OtherFormulaData,
    features: FeatureRegistrations,
}

impl FormulaDataModel {
    /// Create an empty model
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a formula in a grid cell, replacing whatever was there.
    ///
    /// `text` with `shared_id` makes the cell the anchor of that shared
    /// formula; `shared_id` alone makes it a member.
    pub fn set_cell_formula(
        &mut self,
        unit_id: &str,
        sheet_id: &str,
        row: u32,
        col: u16,
        text: Option<&str>,
        shared_id: Option<&str>,
    ) -> Result<()> {
        if text.is_none() && shared_id.is_none() {
            return Err(Error::EmptyFormula {
                sheet_id: sheet_id.to_string(),
                cell: CellAddress::new(row, col).to_string(),
            });
        }
        if let Some(text) = text {
            if !is_formula_text(text) {
                return Err(Error::InvalidFormula(text.to_string()));
            }
        }

        let sheet = self
            .sheets
            .entry(unit_id.to_string())
            .or_default()
            .entry(sheet_id.to_string())
            .or_default();
        sheet.remove(row, col);

        if let (Some(text), Some(si)) = (text, shared_id) {
            sheet.anchor(si, text, row, col);
        }
        sheet.cells.insert(
            (row, col),
            CellFormula {
                f: text.map(str::to_string),
                si: shared_id.map(str::to_string),
            },
        );
        Ok(())
    }

    /// Remove a grid formula, returning whether one was there
    pub fn remove_cell_formula(&mut self, unit_id: &str, sheet_id: &str, row: u32, col: u16) -> bool {
        self.sheets
            .get_mut(unit_id)
            .and_then(|sheets| sheets.get_mut(sheet_id))
            .and_then(|sheet| sheet.remove(row, col))
            .is_some()
    }

    /// The text stored in a cell, with shared members resolved to their
    /// formula's text
    pub fn cell_formula(&self, unit_id: &str, sheet_id: &str, row: u32, col: u16) -> Option<&str> {
        let sheet = self.sheets.get(unit_id)?.get(sheet_id)?;
        let cell = sheet.cells.get(&(row, col))?;
        match (&cell.f, &cell.si) {
            (Some(f), _) => Some(f),
            (None, Some(si)) => sheet.shared.get(si).map(|shared| shared.f.as_str()),
            (None, None) => None,
        }
    }

    /// Whether the cell anchors a shared formula
    pub fn is_shared_anchor(&self, unit_id: &str, sheet_id: &str, row: u32, col: u16) -> bool {
        self.sheets
            .get(unit_id)
            .and_then(|sheets| sheets.get(sheet_id))
            .and_then(|sheet| sheet.cells.get(&(row, col)))
            .is_some_and(|cell| cell.f.is_some() && cell.si.is_some())
    }

    /// Store a formula owned by a non-grid object
    pub fn set_other_formula(
        &mut self,
        unit_id: &str,
        sub_component_id: &str,
        formula_id: &str,
        text: &str,
    ) -> Result<()> {
        if !is_formula_text(text) {
            return Err(Error::InvalidFormula(text.to_string()));
        }
        self.other
            .entry(unit_id.to_string())
            .or_default()
            .entry(sub_component_id.to_string())
            .or_default()
            .insert(formula_id.to_string(), OtherFormulaItem { f: text.to_string() });
        Ok(())
    }

    pub fn remove_other_formula(&mut self, unit_id: &str, sub_component_id: &str, formula_id: &str) -> bool {
        self.other
            .get_mut(unit_id)
            .and_then(|components| components.get_mut(sub_component_id))
            .and_then(|formulas| formulas.remove(formula_id))
            .is_some()
    }

    /// Register a feature, replacing any registration with the same id
    pub fn register_feature(&mut self, feature_id: &str, registration: FeatureRegistration) {
        self.features.insert(feature_id.to_string(), registration);
    }

    pub fn unregister_feature(&mut self, feature_id: &str) -> Option<FeatureRegistration> {
        self.features.remove(feature_id)
    }

    pub fn features(&self) -> &FeatureRegistrations {
        &self.features
    }

    pub fn other_formula_data(&self) -> &OtherFormulaData {
        &self.other
    }

    /// Snapshot of every grid formula, shared members resolved to their
    /// formula's text and offset
    pub fn formula_data(&self) -> FormulaData {
        let mut data = FormulaData::new();
        for (unit_id, sheets) in &self.sheets {
            for (sheet_id, sheet) in sheets {
                let mut cells = BTreeMap::new();
                for (&(row, col), cell) in &sheet.cells {
                    let item = match (&cell.f, &cell.si) {
                        (Some(f), None) => FormulaDataItem::new(f.as_str()),
                        (_, Some(si)) => match sheet.shared.get(si) {
                            Some(shared) => FormulaDataItem::shared(
                                shared.f.as_str(),
                                si.as_str(),
                                i64::from(col) - i64::from(shared.col),
                                i64::from(row) - i64::from(shared.row),
                            ),
                            None => {
                                tracing::debug!(
                                    unit_id = %unit_id,
                                    sheet_id = %sheet_id,
                                    cell = %CellAddress::new(row, col),
                                    shared_id = %si,
                                    "shared formula member without text"
                                );
                                continue;
                            }
                        },
                        (None, None) => continue,
                    };
                    cells.insert((row, col), item);
                }
                if !cells.is_empty() {
                    data.entry(unit_id.clone())
                        .or_default()
                        .insert(sheet_id.clone(), cells);
                }
            }
        }
        data
    }

    /// Number of grid formula cells
    pub fn len(&self) -> usize {
        self.sheets
            .values()
            .flat_map(|sheets| sheets.values())
            .map(|sheet| sheet.cells.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
