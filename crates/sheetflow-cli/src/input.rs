//! JSON workbook descriptions
//!
//! ```json
//! {
//!   "units": {
//!     "book": {
//!       "sheets": {
//!         "s1": {
//!           "name": "Sheet1",
//!           "cells": {
//!             "A1": 3,
//!             "B1": { "f": "=A1*2", "si": "double" },
//!             "B2": { "si": "double" }
//!           }
//!         }
//!       },
//!       "other_formulas": { "s1": { "rule-1": "=A1>0" } }
//!     }
//!   },
//!   "features": {
//!     "chart-1": { "unit": "book", "sheet": "s1", "ranges": ["A1:B2"] }
//!   },
//!   "dirty": ["book/s1!A1"]
//! }
//! ```

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use sheetflow::prelude::*;
use sheetflow::{feature_executor, RangeKind};
use std::collections::BTreeMap;

#[derive(Debug, Deserialize)]
pub struct WorkbookInput {
    #[serde(default)]
    pub units: BTreeMap<String, UnitInput>,
    #[serde(default)]
    pub features: BTreeMap<String, FeatureInput>,
    #[serde(default)]
    pub dirty: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct UnitInput {
    #[serde(default)]
    pub sheets: BTreeMap<String, SheetInput>,
    /// sub-component → formula id → text
    #[serde(default)]
    pub other_formulas: BTreeMap<String, BTreeMap<String, String>>,
}

#[derive(Debug, Deserialize)]
pub struct SheetInput {
    pub name: Option<String>,
    #[serde(default)]
    pub cells: BTreeMap<String, CellInput>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum CellInput {
    Formula {
        f: Option<String>,
        si: Option<String>,
    },
    Number(f64),
    Boolean(bool),
    Text(String),
}

#[derive(Debug, Deserialize)]
pub struct FeatureInput {
    pub unit: String,
    pub sheet: String,
    #[serde(default)]
    pub ranges: Vec<String>,
}

/// Parse `unit/sheet!A1:B2`, `unit/sheet!3:5` or `unit/sheet!C:D`
pub fn parse_unit_range(text: &str) -> Result<UnitRange> {
    let (unit, rest) = text
        .split_once('/')
        .ok_or_else(|| anyhow!("expected unit/sheet!range, got '{}'", text))?;
    let (sheet, range) = rest
        .rsplit_once('!')
        .ok_or_else(|| anyhow!("expected unit/sheet!range, got '{}'", text))?;
    parse_sheet_range(unit, sheet, range)
}

fn parse_sheet_range(unit: &str, sheet: &str, range: &str) -> Result<UnitRange> {
    if let Some((start, end)) = range.split_once(':') {
        if let (Ok(start), Ok(end)) = (start.parse::<u32>(), end.parse::<u32>()) {
            if start == 0 || end == 0 {
                bail!("row numbers start at 1 in '{}'", range);
            }
            return Ok(UnitRange::rows(unit, sheet, start.min(end) - 1, start.max(end) - 1));
        }
        let letters = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_alphabetic());
        if letters(start) && letters(end) {
            let start = CellAddress::letters_to_column(start)?;
            let end = CellAddress::letters_to_column(end)?;
            return Ok(UnitRange::columns(unit, sheet, start.min(end), start.max(end)));
        }
    }
    let cells = CellRange::parse(range).with_context(|| format!("invalid range '{}'", range))?;
    Ok(UnitRange {
        unit_id: unit.to_string(),
        sheet_id: sheet.to_string(),
        range: cells.without_anchors(),
        kind: RangeKind::Cell,
    })
}

/// Everything a pass needs, loaded from one description
pub struct LoadedWorkbook {
    pub model: FormulaDataModel,
    pub values: CellValues,
    pub dirty: Vec<UnitRange>,
}

impl WorkbookInput {
    pub fn load(self) -> Result<LoadedWorkbook> {
        let mut model = FormulaDataModel::new();
        let mut values = CellValues::new();

        for (unit_id, unit) in &self.units {
            for (sheet_id, sheet) in &unit.sheets {
                if let Some(name) = &sheet.name {
                    values.set_sheet_name(unit_id, sheet_id, name);
                }
                for (a1, cell) in &sheet.cells {
                    let address = CellAddress::parse(a1)
                        .with_context(|| format!("invalid cell '{}' on sheet '{}'", a1, sheet_id))?;
                    let (row, col) = (address.row, address.col);
                    match cell {
                        CellInput::Formula { f, si } => model
                            .set_cell_formula(unit_id, sheet_id, row, col, f.as_deref(), si.as_deref())
                            .with_context(|| format!("cell {} on sheet '{}'", a1, sheet_id))?,
                        CellInput::Number(n) => values.set_value(unit_id, sheet_id, row, col, *n),
                        CellInput::Boolean(b) => values.set_value(unit_id, sheet_id, row, col, *b),
                        CellInput::Text(s) => {
                            values.set_value(unit_id, sheet_id, row, col, s.as_str())
                        }
                    }
                }
            }

            for (sub_component_id, formulas) in &unit.other_formulas {
                for (formula_id, text) in formulas {
                    model
                        .set_other_formula(unit_id, sub_component_id, formula_id, text)
                        .with_context(|| format!("formula '{}'", formula_id))?;
                }
            }
        }

        for (feature_id, feature) in &self.features {
            let ranges = feature
                .ranges
                .iter()
                .map(|range| parse_sheet_range(&feature.unit, &feature.sheet, range))
                .collect::<Result<Vec<_>>>()
                .with_context(|| format!("feature '{}'", feature_id))?;
            let id = feature_id.clone();
            model.register_feature(
                feature_id,
                FeatureRegistration {
                    unit_id: feature.unit.clone(),
                    sub_component_id: feature.sheet.clone(),
                    dependency_ranges: ranges,
                    executor: feature_executor(move || {
                        tracing::info!(feature = %id, "feature executed");
                        Ok(())
                    }),
                },
            );
        }

        let dirty = self
            .dirty
            .iter()
            .map(|text| parse_unit_range(text))
            .collect::<Result<Vec<_>>>()?;

        Ok(LoadedWorkbook {
            model,
            values,
            dirty,
        })
    }
}
