//! Ranges qualified by unit and sheet identity

use crate::cell::{CellAddress, CellRange};
use crate::{MAX_COLS, MAX_ROWS};
use std::fmt;

/// Identifier of a top-level document instance (e.g. one workbook)
pub type UnitId = String;

/// Identifier of a sheet or other sub-component within a unit
pub type SheetId = String;

/// How the rectangle of a [`UnitRange`] should be read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RangeKind {
    /// A plain rectangle of cells
    #[default]
    Cell,
    /// Whole rows; the column bounds are ignored
    Row,
    /// Whole columns; the row bounds are ignored
    Column,
}

/// A rectangular range pinned to a unit and sheet
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UnitRange {
    pub unit_id: UnitId,
    pub sheet_id: SheetId,
    pub range: CellRange,
    #[cfg_attr(feature = "serde", serde(default))]
    pub kind: RangeKind,
}

impl UnitRange {
    /// A plain cell rectangle
    pub fn new(unit_id: impl Into<UnitId>, sheet_id: impl Into<SheetId>, range: CellRange) -> Self {
        Self {
            unit_id: unit_id.into(),
            sheet_id: sheet_id.into(),
            range,
            kind: RangeKind::Cell,
        }
    }

    /// A single cell
    pub fn cell(
        unit_id: impl Into<UnitId>,
        sheet_id: impl Into<SheetId>,
        row: u32,
        col: u16,
    ) -> Self {
        Self::new(unit_id, sheet_id, CellRange::single(CellAddress::new(row, col)))
    }

    /// Whole rows `start_row..=end_row`
    pub fn rows(
        unit_id: impl Into<UnitId>,
        sheet_id: impl Into<SheetId>,
        start_row: u32,
        end_row: u32,
    ) -> Self {
        Self {
            unit_id: unit_id.into(),
            sheet_id: sheet_id.into(),
            range: CellRange::from_indices(start_row, 0, end_row, MAX_COLS - 1),
            kind: RangeKind::Row,
        }
    }

    /// Whole columns `start_col..=end_col`
    pub fn columns(
        unit_id: impl Into<UnitId>,
        sheet_id: impl Into<SheetId>,
        start_col: u16,
        end_col: u16,
    ) -> Self {
        Self {
            unit_id: unit_id.into(),
            sheet_id: sheet_id.into(),
            range: CellRange::from_indices(0, start_col, MAX_ROWS - 1, end_col),
            kind: RangeKind::Column,
        }
    }

    /// Whether this range lives on the given unit and sheet
    pub fn is_on(&self, unit_id: &str, sheet_id: &str) -> bool {
        self.unit_id == unit_id && self.sheet_id == sheet_id
    }

    /// The rectangle actually covered, with row/column kinds expanded
    pub fn effective(&self) -> CellRange {
        match self.kind {
            RangeKind::Cell => self.range,
            RangeKind::Row => {
                CellRange::from_indices(self.range.start.row, 0, self.range.end.row, MAX_COLS - 1)
            }
            RangeKind::Column => {
                CellRange::from_indices(0, self.range.start.col, MAX_ROWS - 1, self.range.end.col)
            }
        }
    }

    /// Whether both ranges share a unit and sheet and overlap
    pub fn intersects(&self, other: &UnitRange) -> bool {
        self.is_on(&other.unit_id, &other.sheet_id) && self.overlaps_range(&other.effective())
    }

    /// Whether this range overlaps a bare rectangle on the same sheet
    pub fn overlaps_range(&self, range: &CellRange) -> bool {
        self.effective().overlaps(range)
    }

    /// Whether the cell at `(row, col)` of this range's sheet is covered
    pub fn contains_cell(&self, row: u32, col: u16) -> bool {
        self.effective().contains_cell(row, col)
    }
}

impl fmt::Display for UnitRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]{}!", self.unit_id, self.sheet_id)?;
        match self.kind {
            RangeKind::Cell => write!(f, "{}", self.range),
            RangeKind::Row => write!(f, "{}:{}", self.range.start.row + 1, self.range.end.row + 1),
            RangeKind::Column => write!(
                f,
                "{}:{}",
                CellAddress::column_to_letters(self.range.start.col),
                CellAddress::column_to_letters(self.range.end.col)
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(s: &str) -> UnitRange {
        UnitRange::new("book", "s1", CellRange::parse(s).unwrap())
    }

    #[test]
    fn test_intersects_requires_same_sheet() {
        let a = cells("A1:B2");
        let mut b = cells("A1");
        assert!(a.intersects(&b));

        b.sheet_id = "s2".into();
        assert!(!a.intersects(&b));

        b.sheet_id = "s1".into();
        b.unit_id = "other".into();
        assert!(!a.intersects(&b));
    }

    #[test]
    fn test_row_and_column_kinds_expand() {
        let rows = UnitRange::rows("book", "s1", 4, 5);
        assert!(rows.intersects(&cells("ZZ5")));
        assert!(!rows.intersects(&cells("A1:C4")));

        let cols = UnitRange::columns("book", "s1", 2, 2);
        assert!(cols.contains_cell(1_000_000, 2));
        assert!(cols.intersects(&rows));
        assert!(!cols.contains_cell(0, 3));
    }

    #[test]
    fn test_effective_ignores_stored_bounds_for_row_kind() {
        let mut narrowed = cells("B3:C4");
        narrowed.kind = RangeKind::Row;
        assert!(narrowed.contains_cell(2, 100));
        assert!(!narrowed.contains_cell(4, 1));
    }

    #[test]
    fn test_display() {
        assert_eq!(cells("A1:B2").to_string(), "[book]s1!A1:B2");
        assert_eq!(UnitRange::rows("book", "s1", 0, 2).to_string(), "[book]s1!1:3");
        assert_eq!(UnitRange::columns("book", "s1", 0, 1).to_string(), "[book]s1!A:B");
    }
}
