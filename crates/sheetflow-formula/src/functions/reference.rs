//! Reference functions
//!
//! These receive their arguments unread, so a reference argument arrives as
//! [`FormulaValue::Reference`] and numeric arguments are read on demand.

use crate::ast::FormulaExpr;
use crate::error::FormulaResult;
use crate::evaluator::{EvaluationContext, FormulaValue};
use crate::lexer::tokenize;
use crate::parser::parse;
use sheetflow_core::{CellError, CellRange, RangeKind, UnitRange};

fn finish(result: Result<FormulaValue, CellError>) -> FormulaResult<FormulaValue> {
    Ok(result.unwrap_or_else(FormulaValue::Error))
}

/// The argument as a reference, passing errors through
fn reference_arg(arg: Option<&FormulaValue>) -> Result<UnitRange, CellError> {
    match arg {
        Some(FormulaValue::Reference(range)) => Ok(range.clone()),
        Some(FormulaValue::Error(e)) => Err(*e),
        _ => Err(CellError::Value),
    }
}

/// Read an argument down to one value; arrays yield their first element
fn scalar_arg(arg: &FormulaValue, ctx: &EvaluationContext) -> FormulaValue {
    match ctx.dereference(arg.clone()) {
        FormulaValue::Array(rows) => rows
            .into_iter()
            .next()
            .and_then(|row| row.into_iter().next())
            .unwrap_or(FormulaValue::Empty),
        value => value,
    }
}

/// An optional whole-number argument; omitted or blank gives `None`
fn integer_arg(arg: Option<&FormulaValue>, ctx: &EvaluationContext) -> Result<Option<i64>, CellError> {
    let Some(arg) = arg else {
        return Ok(None);
    };
    match scalar_arg(arg, ctx) {
        FormulaValue::Empty => Ok(None),
        FormulaValue::Error(e) => Err(e),
        value => value
            .as_number()
            .map(|n| Some(n.trunc() as i64))
            .ok_or(CellError::Value),
    }
}

fn plain_range(range: UnitRange, rect: CellRange) -> FormulaValue {
    FormulaValue::Reference(UnitRange {
        range: rect.without_anchors(),
        kind: RangeKind::Cell,
        ..range
    })
}

/// OFFSET(reference, rows, cols, [height], [width])
pub fn fn_offset(args: &[FormulaValue], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    finish(offset(args, ctx))
}

fn offset(args: &[FormulaValue], ctx: &EvaluationContext) -> Result<FormulaValue, CellError> {
    let base = reference_arg(args.first())?;
    let rect = base.effective();

    let rows = integer_arg(args.get(1), ctx)?.unwrap_or(0);
    let cols = integer_arg(args.get(2), ctx)?.unwrap_or(0);
    let height = integer_arg(args.get(3), ctx)?.unwrap_or(rect.row_count() as i64);
    let width = integer_arg(args.get(4), ctx)?.unwrap_or(rect.col_count() as i64);
    if height < 1 || width < 1 {
        return Err(CellError::Ref);
    }

    let start = rect.start.offset(rows, cols).ok_or(CellError::Ref)?;
    let end = start.offset(height - 1, width - 1).ok_or(CellError::Ref)?;
    Ok(plain_range(base, CellRange::new(start, end)))
}

/// INDIRECT(ref_text, [a1])
///
/// Only A1-style text is understood; `a1 = FALSE` yields `#REF!`.
pub fn fn_indirect(args: &[FormulaValue], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    finish(indirect(args, ctx))
}

fn indirect(args: &[FormulaValue], ctx: &EvaluationContext) -> Result<FormulaValue, CellError> {
    let text = match args.first().map(|arg| scalar_arg(arg, ctx)) {
        Some(FormulaValue::Error(e)) => return Err(e),
        Some(value) => value.as_string(),
        None => return Err(CellError::Value),
    };

    if let Some(a1) = args.get(1).map(|arg| scalar_arg(arg, ctx)) {
        if a1.as_bool() == Some(false) {
            return Err(CellError::Ref);
        }
    }

    let tokens = tokenize(&format!("={}", text.trim())).map_err(|_| CellError::Ref)?;
    match parse(&tokens, 0, 0).map_err(|_| CellError::Ref)? {
        FormulaExpr::CellRef(cell) => Ok(ctx.reference(
            cell.sheet.as_deref(),
            CellRange::single(cell.address).without_anchors(),
            RangeKind::Cell,
        )),
        FormulaExpr::RangeRef(range) => Ok(ctx.reference(
            range.sheet.as_deref(),
            range.range.without_anchors(),
            range.kind,
        )),
        _ => Err(CellError::Ref),
    }
}

/// INDEX(reference, row_num, [column_num])
///
/// A zero row or column selects the whole column or row of the reference.
/// On a one-row reference a lone index counts columns.
pub fn fn_index(args: &[FormulaValue], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    finish(index(args, ctx))
}

fn index(args: &[FormulaValue], ctx: &EvaluationContext) -> Result<FormulaValue, CellError> {
    let row_num = integer_arg(args.get(1), ctx)?.unwrap_or(0);
    let col_num = integer_arg(args.get(2), ctx)?;
    if row_num < 0 || col_num.map_or(false, |c| c < 0) {
        return Err(CellError::Value);
    }

    match args.first() {
        Some(FormulaValue::Reference(range)) => {
            let rect = range.effective();
            let (row_num, col_num) = match col_num {
                None if rect.row_count() == 1 && rect.col_count() > 1 => (0, row_num),
                None => (row_num, 0),
                Some(col_num) => (row_num, col_num),
            };
            if row_num > rect.row_count() as i64 || col_num > rect.col_count() as i64 {
                return Err(CellError::Ref);
            }

            let (top, bottom) = match row_num {
                0 => (rect.start.row, rect.end.row),
                n => {
                    let row = rect.start.row + (n - 1) as u32;
                    (row, row)
                }
            };
            let (left, right) = match col_num {
                0 => (rect.start.col, rect.end.col),
                n => {
                    let col = rect.start.col + (n - 1) as u16;
                    (col, col)
                }
            };

            let selected = CellRange::from_indices(top, left, bottom, right);
            if selected == rect.without_anchors() && range.kind != RangeKind::Cell {
                return Ok(FormulaValue::Reference(range.clone()));
            }
            Ok(plain_range(range.clone(), selected))
        }
        Some(FormulaValue::Array(rows)) => {
            let row = row_num.max(1) as usize - 1;
            let col = col_num.unwrap_or(1).max(1) as usize - 1;
            rows.get(row)
                .and_then(|r| r.get(col))
                .cloned()
                .ok_or(CellError::Ref)
        }
        Some(FormulaValue::Error(e)) => Err(*e),
        Some(value) if row_num <= 1 && col_num.unwrap_or(1) <= 1 => Ok(value.clone()),
        _ => Err(CellError::Ref),
    }
}

/// ROW([reference]) - 1-based row number of a reference or of the current cell
pub fn fn_row(args: &[FormulaValue], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    finish(match args.first() {
        None => ctx
            .scope
            .row
            .map(|row| FormulaValue::Number((row + 1) as f64))
            .ok_or(CellError::Value),
        Some(arg) => reference_arg(Some(arg)).map(|range| {
            let rect = range.effective();
            if range.kind == RangeKind::Cell && rect.row_count() > 1 {
                // Column vector of row numbers, ROW(A1:A3) = {1;2;3}
                FormulaValue::Array(
                    (rect.start.row..=rect.end.row)
                        .map(|row| vec![FormulaValue::Number((row + 1) as f64)])
                        .collect(),
                )
            } else {
                FormulaValue::Number((rect.start.row + 1) as f64)
            }
        }),
    })
}

/// COLUMN([reference]) - 1-based column number of a reference or of the current cell
pub fn fn_column(args: &[FormulaValue], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    finish(match args.first() {
        None => ctx
            .scope
            .col
            .map(|col| FormulaValue::Number((col + 1) as f64))
            .ok_or(CellError::Value),
        Some(arg) => reference_arg(Some(arg)).map(|range| {
            let rect = range.effective();
            if range.kind == RangeKind::Cell && rect.col_count() > 1 {
                // Row vector of column numbers, COLUMN(A1:C1) = {1,2,3}
                FormulaValue::Array(vec![(rect.start.col..=rect.end.col)
                    .map(|col| FormulaValue::Number((col + 1) as f64))
                    .collect()])
            } else {
                FormulaValue::Number((rect.start.col + 1) as f64)
            }
        }),
    })
}

/// ROWS(reference) - number of rows in a reference or array
pub fn fn_rows(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    finish(match args.first() {
        Some(FormulaValue::Reference(range)) => {
            Ok(FormulaValue::Number(range.effective().row_count() as f64))
        }
        Some(FormulaValue::Array(rows)) => Ok(FormulaValue::Number(rows.len() as f64)),
        Some(FormulaValue::Error(e)) => Err(*e),
        // Single value = 1 row
        _ => Ok(FormulaValue::Number(1.0)),
    })
}

/// COLUMNS(reference) - number of columns in a reference or array
pub fn fn_columns(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    finish(match args.first() {
        Some(FormulaValue::Reference(range)) => {
            Ok(FormulaValue::Number(range.effective().col_count() as f64))
        }
        Some(FormulaValue::Array(rows)) => Ok(FormulaValue::Number(
            rows.first().map_or(0, |row| row.len()) as f64,
        )),
        Some(FormulaValue::Error(e)) => Err(*e),
        // Single value = 1 column
        _ => Ok(FormulaValue::Number(1.0)),
    })
}
