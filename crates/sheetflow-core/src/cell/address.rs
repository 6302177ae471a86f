//! Cell address and range types

use crate::error::{Error, Result};
use crate::{MAX_COLS, MAX_ROWS};
use std::fmt;
use std::str::FromStr;

/// A cell address (e.g., "A1", "$B$2")
///
/// Rows and columns are 0-based internally. The `$` markers are kept so
/// shared formulas can tell which parts of a reference move with the formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellAddress {
    /// Row index (0-based internally, 1-based in display)
    pub row: u32,
    /// Column index (0-based, A=0, B=1, ..., XFD=16383)
    pub col: u16,
    /// Whether the row reference is absolute ($)
    #[cfg_attr(feature = "serde", serde(default))]
    pub row_absolute: bool,
    /// Whether the column reference is absolute ($)
    #[cfg_attr(feature = "serde", serde(default))]
    pub col_absolute: bool,
}

impl CellAddress {
    /// Create a new cell address with relative references
    pub fn new(row: u32, col: u16) -> Self {
        Self::with_absolute(row, col, false, false)
    }

    /// Create a new cell address with specified absolute/relative flags
    pub fn with_absolute(row: u32, col: u16, row_absolute: bool, col_absolute: bool) -> Self {
        Self {
            row,
            col,
            row_absolute,
            col_absolute,
        }
    }

    /// Create an absolute cell address ($A$1 style)
    pub fn absolute(row: u32, col: u16) -> Self {
        Self::with_absolute(row, col, true, true)
    }

    /// Parse a cell address from A1-style notation
    ///
    /// # Examples
    /// ```
    /// use sheetflow_core::CellAddress;
    ///
    /// let addr = CellAddress::parse("$B2").unwrap();
    /// assert_eq!((addr.row, addr.col), (1, 1));
    /// assert!(addr.col_absolute);
    /// assert!(!addr.row_absolute);
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::InvalidAddress("empty address".into()));
        }

        let (col_absolute, rest) = match s.strip_prefix('$') {
            Some(rest) => (true, rest),
            None => (false, s),
        };

        let letters_end = rest
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(rest.len());
        if letters_end == 0 {
            return Err(Error::InvalidAddress(format!("no column letters in '{}'", s)));
        }
        let col = Self::letters_to_column(&rest[..letters_end])?;

        let rest = &rest[letters_end..];
        let (row_absolute, digits) = match rest.strip_prefix('$') {
            Some(digits) => (true, digits),
            None => (false, rest),
        };
        let row = Self::parse_row_number(digits)
            .ok_or_else(|| Error::InvalidAddress(format!("invalid row number in '{}'", s)))?;

        Ok(Self::with_absolute(row, col, row_absolute, col_absolute))
    }

    /// Parse a 1-based row number into a 0-based row index.
    pub(crate) fn parse_row_number(digits: &str) -> Option<u32> {
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let row: u32 = digits.parse().ok()?;
        if row == 0 || row > MAX_ROWS {
            return None;
        }
        Some(row - 1)
    }

    /// Convert column index to letters (0 = A, 25 = Z, 26 = AA, etc.)
    pub fn column_to_letters(col: u16) -> String {
        let mut letters = Vec::new();
        let mut n = col as u32 + 1;

        while n > 0 {
            n -= 1;
            letters.push((n % 26) as u8 + b'A');
            n /= 26;
        }

        letters.iter().rev().map(|&b| b as char).collect()
    }

    /// Convert column letters to index (A = 0, Z = 25, AA = 26, etc.)
    pub fn letters_to_column(letters: &str) -> Result<u16> {
        if letters.is_empty() {
            return Err(Error::InvalidAddress("empty column letters".into()));
        }

        let mut col: u32 = 0;
        for c in letters.chars() {
            if !c.is_ascii_alphabetic() {
                return Err(Error::InvalidAddress(format!(
                    "invalid column letter '{}'",
                    c
                )));
            }
            col = col
                .saturating_mul(26)
                .saturating_add(c.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
        }

        let col = col - 1;
        if col >= MAX_COLS as u32 {
            return Err(Error::ColumnOutOfBounds(col, MAX_COLS - 1));
        }

        Ok(col as u16)
    }

    /// Move the address by a signed number of rows and columns.
    ///
    /// Returns `None` when the result falls outside the sheet.
    pub fn offset(&self, rows: i64, cols: i64) -> Option<CellAddress> {
        let row = (self.row as i64).checked_add(rows)?;
        let col = (self.col as i64).checked_add(cols)?;
        if row < 0 || row >= MAX_ROWS as i64 || col < 0 || col >= MAX_COLS as i64 {
            return None;
        }
        Some(Self::with_absolute(
            row as u32,
            col as u16,
            self.row_absolute,
            self.col_absolute,
        ))
    }

    /// Shift only the relative parts of the address.
    ///
    /// `$A$1` never moves, `A1` moves on both axes, `$A1` only moves by rows.
    pub fn translate_relative(&self, col_offset: i64, row_offset: i64) -> Result<CellAddress> {
        let rows = if self.row_absolute { 0 } else { row_offset };
        let cols = if self.col_absolute { 0 } else { col_offset };
        self.offset(rows, cols).ok_or_else(|| {
            Error::InvalidAddress(format!(
                "{} shifted by ({}, {}) leaves the sheet",
                self, col_offset, row_offset
            ))
        })
    }

    /// Format as A1-style string
    pub fn to_a1_string(&self) -> String {
        format!(
            "{}{}{}{}",
            if self.col_absolute { "$" } else { "" },
            Self::column_to_letters(self.col),
            if self.row_absolute { "$" } else { "" },
            self.row + 1
        )
    }

    /// Whether two addresses point at the same cell, ignoring `$` markers.
    pub fn same_cell(&self, other: &CellAddress) -> bool {
        self.row == other.row && self.col == other.col
    }

    /// Create a range from this address to another
    pub fn to(&self, other: CellAddress) -> CellRange {
        CellRange::new(*self, other)
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_a1_string())
    }
}

impl FromStr for CellAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// A rectangular range of cells (e.g., "A1:B10")
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellRange {
    /// Start address (top-left)
    pub start: CellAddress,
    /// End address (bottom-right)
    pub end: CellAddress,
}

impl CellRange {
    /// Create a new cell range, normalized so `start` is the top-left corner
    pub fn new(start: CellAddress, end: CellAddress) -> Self {
        let (top, bottom) = if start.row <= end.row {
            ((start.row, start.row_absolute), (end.row, end.row_absolute))
        } else {
            ((end.row, end.row_absolute), (start.row, start.row_absolute))
        };
        let (left, right) = if start.col <= end.col {
            ((start.col, start.col_absolute), (end.col, end.col_absolute))
        } else {
            ((end.col, end.col_absolute), (start.col, start.col_absolute))
        };

        Self {
            start: CellAddress::with_absolute(top.0, left.0, top.1, left.1),
            end: CellAddress::with_absolute(bottom.0, right.0, bottom.1, right.1),
        }
    }

    /// Create a range from row/column indices
    pub fn from_indices(start_row: u32, start_col: u16, end_row: u32, end_col: u16) -> Self {
        Self::new(
            CellAddress::new(start_row, start_col),
            CellAddress::new(end_row, end_col),
        )
    }

    /// Create a single-cell range
    pub fn single(addr: CellAddress) -> Self {
        Self {
            start: addr,
            end: addr,
        }
    }

    /// Parse a range from A1:B10 notation (a lone address is a single-cell range)
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        match s.split_once(':') {
            Some((start, end)) => Ok(Self::new(
                CellAddress::parse(start)?,
                CellAddress::parse(end)?,
            )),
            None => Ok(Self::single(CellAddress::parse(s)?)),
        }
    }

    /// Check if a cell is within this range
    pub fn contains(&self, addr: &CellAddress) -> bool {
        self.contains_cell(addr.row, addr.col)
    }

    /// Check if the cell at `(row, col)` is within this range
    pub fn contains_cell(&self, row: u32, col: u16) -> bool {
        row >= self.start.row && row <= self.end.row && col >= self.start.col && col <= self.end.col
    }

    /// Get the number of rows in the range
    pub fn row_count(&self) -> u32 {
        self.end.row - self.start.row + 1
    }

    /// Get the number of columns in the range
    pub fn col_count(&self) -> u16 {
        self.end.col - self.start.col + 1
    }

    /// Whether the range covers exactly one cell
    pub fn is_single_cell(&self) -> bool {
        self.start.same_cell(&self.end)
    }

    /// Check if this range overlaps with another
    pub fn overlaps(&self, other: &CellRange) -> bool {
        self.start.row <= other.end.row
            && self.end.row >= other.start.row
            && self.start.col <= other.end.col
            && self.end.col >= other.start.col
    }

    /// Get the intersection of two ranges, if any
    pub fn intersect(&self, other: &CellRange) -> Option<CellRange> {
        if !self.overlaps(other) {
            return None;
        }

        Some(CellRange::from_indices(
            self.start.row.max(other.start.row),
            self.start.col.max(other.start.col),
            self.end.row.min(other.end.row),
            self.end.col.min(other.end.col),
        ))
    }

    /// Smallest range covering both ranges
    pub fn bounding(&self, other: &CellRange) -> CellRange {
        CellRange::from_indices(
            self.start.row.min(other.start.row),
            self.start.col.min(other.start.col),
            self.end.row.max(other.end.row),
            self.end.col.max(other.end.col),
        )
    }

    /// The same rectangle with every `$` marker cleared
    pub fn without_anchors(&self) -> CellRange {
        CellRange::from_indices(self.start.row, self.start.col, self.end.row, self.end.col)
    }

    /// Format as A1:B10 string
    pub fn to_a1_string(&self) -> String {
        if self.start == self.end {
            self.start.to_a1_string()
        } else {
            format!("{}:{}", self.start.to_a1_string(), self.end.to_a1_string())
        }
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_a1_string())
    }
}

impl FromStr for CellRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_letters_roundtrip_edges() {
        assert_eq!(CellAddress::column_to_letters(0), "A");
        assert_eq!(CellAddress::column_to_letters(25), "Z");
        assert_eq!(CellAddress::column_to_letters(26), "AA");
        assert_eq!(CellAddress::column_to_letters(701), "ZZ");
        assert_eq!(CellAddress::column_to_letters(16383), "XFD");

        assert_eq!(CellAddress::letters_to_column("aa").unwrap(), 26);
        assert_eq!(CellAddress::letters_to_column("XFD").unwrap(), 16383);
        assert!(CellAddress::letters_to_column("XFE").is_err());
        assert!(CellAddress::letters_to_column("ZZZZZZZZZZ").is_err());
    }

    #[test]
    fn test_cell_address_parse() {
        let addr = CellAddress::parse("A1").unwrap();
        assert_eq!((addr.row, addr.col), (0, 0));
        assert!(!addr.row_absolute && !addr.col_absolute);

        let addr = CellAddress::parse("$C$10").unwrap();
        assert_eq!((addr.row, addr.col), (9, 2));
        assert!(addr.row_absolute && addr.col_absolute);

        let addr = CellAddress::parse("A$1").unwrap();
        assert!(addr.row_absolute);
        assert!(!addr.col_absolute);

        let addr = CellAddress::parse("XFD1048576").unwrap();
        assert_eq!((addr.row, addr.col), (1_048_575, 16_383));
    }

    #[test]
    fn test_cell_address_parse_errors() {
        assert!(CellAddress::parse("").is_err());
        assert!(CellAddress::parse("A").is_err());
        assert!(CellAddress::parse("1").is_err());
        assert!(CellAddress::parse("A0").is_err());
        assert!(CellAddress::parse("A1048577").is_err());
        assert!(CellAddress::parse("A1B").is_err());
    }

    #[test]
    fn test_display_keeps_absolute_markers() {
        assert_eq!(CellAddress::new(99, 2).to_string(), "C100");
        assert_eq!(CellAddress::absolute(0, 0).to_string(), "$A$1");
        assert_eq!(CellAddress::parse("$B3").unwrap().to_string(), "$B3");
    }

    #[test]
    fn test_translate_relative_respects_dollar_signs() {
        let rel = CellAddress::parse("A1").unwrap();
        assert_eq!(rel.translate_relative(2, 3).unwrap().to_string(), "C4");

        let mixed = CellAddress::parse("$A1").unwrap();
        assert_eq!(mixed.translate_relative(2, 3).unwrap().to_string(), "$A4");

        let abs = CellAddress::parse("$A$1").unwrap();
        assert_eq!(abs.translate_relative(2, 3).unwrap().to_string(), "$A$1");

        assert!(rel.translate_relative(-1, 0).is_err());
    }

    #[test]
    fn test_offset_extreme_distances_leave_the_sheet() {
        let b2 = CellAddress::new(1, 1);
        assert_eq!(b2.offset(i64::MAX, 0), None);
        assert_eq!(b2.offset(0, i64::MAX), None);
        assert_eq!(b2.offset(i64::MIN, i64::MIN), None);
        assert!(b2.translate_relative(i64::MAX, i64::MAX).is_err());
    }

    #[test]
    fn test_cell_range_normalizes_corners() {
        let range = CellRange::parse("C3:A1").unwrap();
        assert_eq!(range.to_string(), "A1:C3");
        assert_eq!(range.row_count(), 3);
        assert_eq!(range.col_count(), 3);

        let single = CellRange::parse("B2").unwrap();
        assert!(single.is_single_cell());
    }

    #[test]
    fn test_cell_range_overlap_and_bounds() {
        let a = CellRange::parse("A1:B2").unwrap();
        let b = CellRange::parse("B2:C3").unwrap();
        let c = CellRange::parse("D4").unwrap();

        assert!(a.overlaps(&b));
        assert_eq!(a.intersect(&b), Some(CellRange::parse("B2").unwrap()));
        assert!(!a.overlaps(&c));
        assert_eq!(a.intersect(&c), None);
        assert_eq!(a.bounding(&c).to_string(), "A1:D4");
        assert!(a.contains(&CellAddress::new(1, 1)));
        assert!(!a.contains_cell(2, 0));
    }

    #[test]
    fn test_without_anchors() {
        let anchored = CellRange::parse("$A$1:B$2").unwrap();
        assert_eq!(anchored.without_anchors(), CellRange::parse("A1:B2").unwrap());
    }
}
