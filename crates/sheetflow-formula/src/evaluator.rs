//! Reference interpreter
//!
//! Evaluates formula ASTs far enough to learn which cells they touch.
//! References stay references until an operator or an ordinary function
//! needs their values, at which point they are read through the host's
//! [`CellValueSource`].

use crate::ast::{BinaryOperator, FormulaExpr, UnaryOperator};
use crate::error::FormulaResult;
use crate::functions::{self, FunctionDef};
use sheetflow_core::{CellAddress, CellError, CellRange, RangeKind, SheetId, UnitRange};
use std::cmp::Ordering;

/// Most cells a single range may expand to when its values are read
pub const MAX_DEREFERENCED_CELLS: u64 = 1 << 18;

/// Value types during formula evaluation
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaValue {
    Number(f64),
    String(String),
    Boolean(bool),
    Error(CellError),
    Array(Vec<Vec<FormulaValue>>),
    /// A resolved reference, the result of `A1`, `A1:B2`, `OFFSET(...)` and friends
    Reference(UnitRange),
    Empty,
}

impl From<f64> for FormulaValue {
    fn from(n: f64) -> Self {
        FormulaValue::Number(n)
    }
}

impl From<bool> for FormulaValue {
    fn from(b: bool) -> Self {
        FormulaValue::Boolean(b)
    }
}

impl From<&str> for FormulaValue {
    fn from(s: &str) -> Self {
        FormulaValue::String(s.to_string())
    }
}

impl From<String> for FormulaValue {
    fn from(s: String) -> Self {
        FormulaValue::String(s)
    }
}

impl From<CellError> for FormulaValue {
    fn from(e: CellError) -> Self {
        FormulaValue::Error(e)
    }
}

impl FormulaValue {
    /// Convert to number, if possible
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FormulaValue::Number(n) => Some(*n),
            FormulaValue::Boolean(true) => Some(1.0),
            FormulaValue::Boolean(false) => Some(0.0),
            FormulaValue::String(s) => s.trim().parse().ok(),
            FormulaValue::Empty => Some(0.0),
            _ => None,
        }
    }

    /// Convert to boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FormulaValue::Boolean(b) => Some(*b),
            FormulaValue::Number(n) => Some(*n != 0.0),
            FormulaValue::String(s) => match s.to_uppercase().as_str() {
                "TRUE" => Some(true),
                "FALSE" => Some(false),
                _ => None,
            },
            FormulaValue::Empty => Some(false),
            _ => None,
        }
    }

    /// Convert to string
    pub fn as_string(&self) -> String {
        match self {
            FormulaValue::Number(n) => {
                // No trailing zeros for whole numbers
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            FormulaValue::String(s) => s.clone(),
            FormulaValue::Boolean(true) => "TRUE".to_string(),
            FormulaValue::Boolean(false) => "FALSE".to_string(),
            FormulaValue::Error(e) => e.to_string(),
            FormulaValue::Empty => String::new(),
            FormulaValue::Array(_) | FormulaValue::Reference(_) => "#VALUE!".to_string(),
        }
    }

    /// Check if this is an error
    pub fn is_error(&self) -> bool {
        matches!(self, FormulaValue::Error(_))
    }

    /// Get the error if this is one
    pub fn get_error(&self) -> Option<CellError> {
        match self {
            FormulaValue::Error(e) => Some(*e),
            _ => None,
        }
    }

    /// The referenced range, if this value is a reference
    pub fn to_unit_range(&self) -> Option<&UnitRange> {
        match self {
            FormulaValue::Reference(range) => Some(range),
            _ => None,
        }
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, FormulaValue::Reference(_))
    }
}

/// Host access to cell values and sheet names
pub trait CellValueSource {
    /// The literal value of one cell; empty cells are [`FormulaValue::Empty`]
    fn cell_value(&self, unit_id: &str, sheet_id: &str, row: u32, col: u16) -> FormulaValue;

    /// Map a sheet name used in formula text to its id
    fn sheet_id_by_name(&self, _unit_id: &str, name: &str) -> Option<SheetId> {
        Some(name.to_string())
    }

    /// The extent a dynamic array anchored at this cell spilled into
    fn spill_range(
        &self,
        _unit_id: &str,
        _sheet_id: &str,
        _row: u32,
        _col: u16,
    ) -> Option<CellRange> {
        None
    }

    /// The rectangle that holds data on a sheet, used to clip whole-row and
    /// whole-column reads
    fn data_extent(&self, _unit_id: &str, _sheet_id: &str) -> Option<CellRange> {
        None
    }
}

/// A source with no values at all
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptySource;

impl CellValueSource for EmptySource {
    fn cell_value(&self, _unit_id: &str, _sheet_id: &str, _row: u32, _col: u16) -> FormulaValue {
        FormulaValue::Empty
    }
}

impl<T: CellValueSource + ?Sized> CellValueSource for &T {
    fn cell_value(&self, unit_id: &str, sheet_id: &str, row: u32, col: u16) -> FormulaValue {
        (**self).cell_value(unit_id, sheet_id, row, col)
    }

    fn sheet_id_by_name(&self, unit_id: &str, name: &str) -> Option<SheetId> {
        (**self).sheet_id_by_name(unit_id, name)
    }

    fn spill_range(&self, unit_id: &str, sheet_id: &str, row: u32, col: u16) -> Option<CellRange> {
        (**self).spill_range(unit_id, sheet_id, row, col)
    }

    fn data_extent(&self, unit_id: &str, sheet_id: &str) -> Option<CellRange> {
        (**self).data_extent(unit_id, sheet_id)
    }
}

/// Where a formula is being evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluationScope<'a> {
    pub unit_id: &'a str,
    pub sheet_id: &'a str,
    /// Grid position, absent for formulas that do not live in a cell
    pub row: Option<u32>,
    pub col: Option<u16>,
}

impl<'a> EvaluationScope<'a> {
    pub fn new(unit_id: &'a str, sheet_id: &'a str) -> Self {
        Self {
            unit_id,
            sheet_id,
            row: None,
            col: None,
        }
    }

    pub fn at(mut self, row: u32, col: u16) -> Self {
        self.row = Some(row);
        self.col = Some(col);
        self
    }
}

/// Context for formula evaluation
pub struct EvaluationContext<'a> {
    pub source: &'a dyn CellValueSource,
    pub scope: EvaluationScope<'a>,
}

impl<'a> EvaluationContext<'a> {
    pub fn new(source: &'a dyn CellValueSource, scope: EvaluationScope<'a>) -> Self {
        Self { source, scope }
    }

    /// Resolve an optional sheet name from formula text to a sheet id
    pub fn resolve_sheet(&self, sheet: Option<&str>) -> Option<SheetId> {
        match sheet {
            Some(name) => self.source.sheet_id_by_name(self.scope.unit_id, name),
            None => Some(self.scope.sheet_id.to_string()),
        }
    }

    /// Build a reference on the current unit, or `#REF!` for an unknown sheet
    pub fn reference(&self, sheet: Option<&str>, range: CellRange, kind: RangeKind) -> FormulaValue {
        match self.resolve_sheet(sheet) {
            Some(sheet_id) => FormulaValue::Reference(UnitRange {
                unit_id: self.scope.unit_id.to_string(),
                sheet_id,
                range,
                kind,
            }),
            None => FormulaValue::Error(CellError::Ref),
        }
    }

    /// Replace a reference with the values it points at.
    ///
    /// A single cell becomes its value, anything larger becomes an array.
    pub fn dereference(&self, value: FormulaValue) -> FormulaValue {
        let FormulaValue::Reference(range) = value else {
            return value;
        };

        let mut rect = range.effective();
        if range.kind != RangeKind::Cell {
            if let Some(extent) = self.source.data_extent(&range.unit_id, &range.sheet_id) {
                match rect.intersect(&extent) {
                    Some(clipped) => rect = clipped,
                    None => return FormulaValue::Array(Vec::new()),
                }
            }
        }

        if rect.is_single_cell() {
            return self.source.cell_value(
                &range.unit_id,
                &range.sheet_id,
                rect.start.row,
                rect.start.col,
            );
        }

        let cells = rect.row_count() as u64 * rect.col_count() as u64;
        if cells > MAX_DEREFERENCED_CELLS {
            tracing::debug!(range = %range, cells, "range too large to read");
            return FormulaValue::Error(CellError::Value);
        }

        let rows = (rect.start.row..=rect.end.row)
            .map(|row| {
                (rect.start.col..=rect.end.col)
                    .map(|col| {
                        self.source
                            .cell_value(&range.unit_id, &range.sheet_id, row, col)
                    })
                    .collect()
            })
            .collect();
        FormulaValue::Array(rows)
    }
}

/// Evaluate a formula expression
pub fn evaluate(expr: &FormulaExpr, ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    match expr {
        // === Literals ===
        FormulaExpr::Number(n) => Ok(FormulaValue::Number(*n)),
        FormulaExpr::String(s) => Ok(FormulaValue::String(s.clone())),
        FormulaExpr::Boolean(b) => Ok(FormulaValue::Boolean(*b)),
        FormulaExpr::Error(e) => Ok(FormulaValue::Error(*e)),

        // === References ===
        FormulaExpr::CellRef(cell_ref) => Ok(ctx.reference(
            cell_ref.sheet.as_deref(),
            CellRange::single(cell_ref.address),
            RangeKind::Cell,
        )),

        FormulaExpr::RangeRef(range_ref) => Ok(ctx.reference(
            range_ref.sheet.as_deref(),
            range_ref.range,
            range_ref.kind,
        )),

        // Defined names are resolved by the host before planning
        FormulaExpr::NameRef(_) => Ok(FormulaValue::Error(CellError::Name)),

        // === Operators ===
        FormulaExpr::BinaryOp { op, left, right } => evaluate_binary_op(*op, left, right, ctx),

        FormulaExpr::UnaryOp { op, operand } => evaluate_unary_op(*op, operand, ctx),

        // === Functions ===
        FormulaExpr::Function { name, args } => evaluate_function(name, args, ctx),

        // === Arrays ===
        FormulaExpr::Array(rows) => {
            let mut result_rows = Vec::with_capacity(rows.len());
            for row in rows {
                let mut result_row = Vec::with_capacity(row.len());
                for expr in row {
                    result_row.push(ctx.dereference(evaluate(expr, ctx)?));
                }
                result_rows.push(result_row);
            }
            Ok(FormulaValue::Array(result_rows))
        }
    }
}

/// Evaluate a binary operation
fn evaluate_binary_op(
    op: BinaryOperator,
    left: &FormulaExpr,
    right: &FormulaExpr,
    ctx: &EvaluationContext,
) -> FormulaResult<FormulaValue> {
    let left_val = evaluate(left, ctx)?;
    let right_val = evaluate(right, ctx)?;

    if op == BinaryOperator::Range {
        return Ok(combine_ranges(left_val, right_val));
    }

    let left_val = ctx.dereference(left_val);
    let right_val = ctx.dereference(right_val);

    // Propagate errors
    if let Some(e) = left_val.get_error() {
        return Ok(FormulaValue::Error(e));
    }
    if let Some(e) = right_val.get_error() {
        return Ok(FormulaValue::Error(e));
    }

    let numbers = || match (left_val.as_number(), right_val.as_number()) {
        (Some(l), Some(r)) => Some((l, r)),
        _ => None,
    };

    let value = match op {
        BinaryOperator::Add => numbers().map(|(l, r)| FormulaValue::Number(l + r)),
        BinaryOperator::Subtract => numbers().map(|(l, r)| FormulaValue::Number(l - r)),
        BinaryOperator::Multiply => numbers().map(|(l, r)| FormulaValue::Number(l * r)),
        BinaryOperator::Divide => numbers().map(|(l, r)| {
            if r == 0.0 {
                FormulaValue::Error(CellError::Div0)
            } else {
                FormulaValue::Number(l / r)
            }
        }),
        BinaryOperator::Power => numbers().map(|(l, r)| {
            let result = l.powf(r);
            if result.is_nan() || result.is_infinite() {
                FormulaValue::Error(CellError::Num)
            } else {
                FormulaValue::Number(result)
            }
        }),

        // Comparison operators
        BinaryOperator::Equal => Some(compare(&left_val, &right_val, Ordering::is_eq)),
        BinaryOperator::NotEqual => Some(compare(&left_val, &right_val, Ordering::is_ne)),
        BinaryOperator::LessThan => Some(compare(&left_val, &right_val, Ordering::is_lt)),
        BinaryOperator::LessEqual => Some(compare(&left_val, &right_val, Ordering::is_le)),
        BinaryOperator::GreaterThan => Some(compare(&left_val, &right_val, Ordering::is_gt)),
        BinaryOperator::GreaterEqual => Some(compare(&left_val, &right_val, Ordering::is_ge)),

        BinaryOperator::Concat => Some(FormulaValue::String(
            left_val.as_string() + &right_val.as_string(),
        )),

        BinaryOperator::Range => None,
    }
    .unwrap_or(FormulaValue::Error(CellError::Value));

    Ok(value)
}

fn compare(left: &FormulaValue, right: &FormulaValue, test: fn(Ordering) -> bool) -> FormulaValue {
    FormulaValue::Boolean(test(compare_values(left, right)))
}

/// Bounding rectangle of two references on the same sheet
fn combine_ranges(left: FormulaValue, right: FormulaValue) -> FormulaValue {
    let (left, right) = match (left, right) {
        (FormulaValue::Reference(l), FormulaValue::Reference(r)) => (l, r),
        (FormulaValue::Error(e), _) | (_, FormulaValue::Error(e)) => {
            return FormulaValue::Error(e)
        }
        _ => return FormulaValue::Error(CellError::Value),
    };

    if !left.is_on(&right.unit_id, &right.sheet_id) {
        return FormulaValue::Error(CellError::Ref);
    }

    let kind = if left.kind == right.kind {
        left.kind
    } else {
        RangeKind::Cell
    };
    let range = match kind {
        RangeKind::Cell => left.effective().bounding(&right.effective()),
        _ => left.range.bounding(&right.range),
    };

    FormulaValue::Reference(UnitRange { range, kind, ..left })
}

/// Compare two values for ordering
fn compare_values(left: &FormulaValue, right: &FormulaValue) -> Ordering {
    fn rank(value: &FormulaValue) -> u8 {
        match value {
            FormulaValue::Number(_) | FormulaValue::Empty => 0,
            FormulaValue::String(_) => 1,
            FormulaValue::Boolean(_) => 2,
            _ => 3,
        }
    }

    match (left, right) {
        (FormulaValue::String(l), FormulaValue::String(r)) => {
            l.to_lowercase().cmp(&r.to_lowercase())
        }
        (FormulaValue::Boolean(l), FormulaValue::Boolean(r)) => l.cmp(r),
        _ if rank(left) == 0 && rank(right) == 0 => {
            let l = left.as_number().unwrap_or(0.0);
            let r = right.as_number().unwrap_or(0.0);
            l.partial_cmp(&r).unwrap_or(Ordering::Equal)
        }
        // Mixed types: number < string < boolean
        _ => rank(left).cmp(&rank(right)),
    }
}

/// Evaluate a unary operation
fn evaluate_unary_op(
    op: UnaryOperator,
    operand: &FormulaExpr,
    ctx: &EvaluationContext,
) -> FormulaResult<FormulaValue> {
    let val = evaluate(operand, ctx)?;

    match op {
        UnaryOperator::ImplicitIntersection => return Ok(intersect_implicitly(val, ctx)),
        UnaryOperator::Spill => return Ok(spill_extent(val, ctx)),
        UnaryOperator::Negate | UnaryOperator::Percent => {}
    }

    let val = ctx.dereference(val);

    // Propagate errors
    if let Some(e) = val.get_error() {
        return Ok(FormulaValue::Error(e));
    }

    let Some(n) = val.as_number() else {
        return Ok(FormulaValue::Error(CellError::Value));
    };

    Ok(match op {
        UnaryOperator::Percent => FormulaValue::Number(n / 100.0),
        _ => FormulaValue::Number(-n),
    })
}

/// `@`: narrow a reference to the cell sharing the formula's row or column
fn intersect_implicitly(value: FormulaValue, ctx: &EvaluationContext) -> FormulaValue {
    let range = match value {
        FormulaValue::Reference(range) => range,
        FormulaValue::Array(rows) => {
            return rows
                .into_iter()
                .next()
                .and_then(|row| row.into_iter().next())
                .unwrap_or(FormulaValue::Error(CellError::Value))
        }
        other => return other,
    };

    let rect = range.effective();
    if rect.is_single_cell() {
        return FormulaValue::Reference(range);
    }

    let (Some(row), Some(col)) = (ctx.scope.row, ctx.scope.col) else {
        return FormulaValue::Error(CellError::Value);
    };

    let target = if rect.col_count() == 1 && rect.start.row <= row && row <= rect.end.row {
        Some(CellAddress::new(row, rect.start.col))
    } else if rect.row_count() == 1 && rect.start.col <= col && col <= rect.end.col {
        Some(CellAddress::new(rect.start.row, col))
    } else if rect.contains_cell(row, col) {
        Some(CellAddress::new(row, col))
    } else {
        None
    };

    match target {
        Some(cell) => FormulaValue::Reference(UnitRange {
            range: CellRange::single(cell),
            kind: RangeKind::Cell,
            ..range
        }),
        None => FormulaValue::Error(CellError::Value),
    }
}

/// `#`: the spill extent of a dynamic array anchor, the anchor itself when
/// the host knows of no spill
fn spill_extent(value: FormulaValue, ctx: &EvaluationContext) -> FormulaValue {
    let range = match value {
        FormulaValue::Reference(range) => range,
        FormulaValue::Error(e) => return FormulaValue::Error(e),
        _ => return FormulaValue::Error(CellError::Ref),
    };

    let anchor = range.effective().start;
    let extent = ctx
        .source
        .spill_range(&range.unit_id, &range.sheet_id, anchor.row, anchor.col)
        .unwrap_or_else(|| CellRange::single(anchor));

    FormulaValue::Reference(UnitRange {
        range: extent,
        kind: RangeKind::Cell,
        ..range
    })
}

/// Evaluate a function call
fn evaluate_function(
    name: &str,
    args: &[FormulaExpr],
    ctx: &EvaluationContext,
) -> FormulaResult<FormulaValue> {
    let Some(func) = functions::registry().get(name) else {
        return Ok(FormulaValue::Error(CellError::Name));
    };

    if !accepts_arg_count(func, args.len()) {
        return Ok(FormulaValue::Error(CellError::Value));
    }

    let mut evaluated_args = Vec::with_capacity(args.len());
    for arg in args {
        let value = evaluate(arg, ctx)?;
        evaluated_args.push(if func.reference_args {
            value
        } else {
            ctx.dereference(value)
        });
    }

    (func.implementation)(&evaluated_args, ctx)
}

fn accepts_arg_count(func: &FunctionDef, count: usize) -> bool {
    count >= func.min_args && func.max_args.map_or(true, |max| count <= max)
}

/// Evaluates reference-producing sub-expressions during range discovery
///
/// `execute_async` is awaited for nodes where `is_async` holds; by default
/// it runs `execute`.
#[allow(async_fn_in_trait)]
pub trait ReferenceEvaluator {
    /// Whether `node` has to be evaluated through [`execute_async`](Self::execute_async)
    fn is_async(&self, _node: &FormulaExpr) -> bool {
        false
    }

    fn execute(&self, node: &FormulaExpr, scope: &EvaluationScope<'_>) -> FormulaResult<FormulaValue>;

    async fn execute_async(
        &self,
        node: &FormulaExpr,
        scope: &EvaluationScope<'_>,
    ) -> FormulaResult<FormulaValue> {
        self.execute(node, scope)
    }
}

/// The built-in interpreter over a host value source
#[derive(Debug, Clone, Default)]
pub struct Interpreter<S> {
    source: S,
}

impl<S: CellValueSource> Interpreter<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

impl<S: CellValueSource> ReferenceEvaluator for Interpreter<S> {
    fn execute(&self, node: &FormulaExpr, scope: &EvaluationScope<'_>) -> FormulaResult<FormulaValue> {
        evaluate(node, &EvaluationContext::new(&self.source, *scope))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_formula;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    /// Values on sheet "s1" of unit "u"
    #[derive(Default)]
    struct Grid {
        cells: HashMap<(u32, u16), FormulaValue>,
        spills: HashMap<(u32, u16), CellRange>,
    }

    impl Grid {
        fn with(mut self, a1: &str, value: FormulaValue) -> Self {
            let addr = CellAddress::parse(a1).unwrap();
            self.cells.insert((addr.row, addr.col), value);
            self
        }
    }

    impl CellValueSource for Grid {
        fn cell_value(&self, _unit: &str, sheet: &str, row: u32, col: u16) -> FormulaValue {
            if sheet != "s1" {
                return FormulaValue::Empty;
            }
            self.cells
                .get(&(row, col))
                .cloned()
                .unwrap_or(FormulaValue::Empty)
        }

        fn sheet_id_by_name(&self, _unit: &str, name: &str) -> Option<SheetId> {
            match name {
                "Sheet1" => Some("s1".into()),
                "Other" => Some("s2".into()),
                _ => None,
            }
        }

        fn spill_range(&self, _unit: &str, _sheet: &str, row: u32, col: u16) -> Option<CellRange> {
            self.spills.get(&(row, col)).copied()
        }
    }

    fn eval_in(grid: &Grid, formula: &str, row: u32, col: u16) -> FormulaValue {
        let ast = parse_formula(formula).unwrap();
        let ctx = EvaluationContext::new(grid, EvaluationScope::new("u", "s1").at(row, col));
        evaluate(&ast, &ctx).unwrap()
    }

    fn eval(grid: &Grid, formula: &str) -> FormulaValue {
        eval_in(grid, formula, 0, 0)
    }

    fn reference(a1: &str) -> FormulaValue {
        FormulaValue::Reference(UnitRange::new("u", "s1", CellRange::parse(a1).unwrap()))
    }

    #[test]
    fn test_references_stay_references() {
        let grid = Grid::default();
        assert_eq!(eval(&grid, "=B2"), reference("B2"));
        assert_eq!(eval(&grid, "=A1:C3"), reference("A1:C3"));
        assert_eq!(
            eval(&grid, "=Other!A1"),
            FormulaValue::Reference(UnitRange::cell("u", "s2", 0, 0))
        );
        assert_eq!(
            eval(&grid, "=Missing!A1"),
            FormulaValue::Error(CellError::Ref)
        );
    }

    #[test]
    fn test_arithmetic_reads_values() {
        let grid = Grid::default()
            .with("A1", FormulaValue::Number(2.0))
            .with("B1", FormulaValue::Number(3.0));
        assert_eq!(eval(&grid, "=A1+B1*2"), FormulaValue::Number(8.0));
        assert_eq!(eval(&grid, "=A1/0"), FormulaValue::Error(CellError::Div0));
        assert_eq!(eval(&grid, "=-A1"), FormulaValue::Number(-2.0));
        assert_eq!(eval(&grid, "=A1>B1"), FormulaValue::Boolean(false));
        assert_eq!(
            eval(&grid, "=A1&\"x\""),
            FormulaValue::String("2x".into())
        );
    }

    #[test]
    fn test_type_mismatch_is_value_error() {
        let grid = Grid::default().with("A1", FormulaValue::String("abc".into()));
        assert_eq!(eval(&grid, "=A1+1"), FormulaValue::Error(CellError::Value));
    }

    #[test]
    fn test_unknown_function_is_name_error() {
        let grid = Grid::default();
        assert_eq!(
            eval(&grid, "=NOSUCHFN(1)"),
            FormulaValue::Error(CellError::Name)
        );
    }

    #[test]
    fn test_range_combinator_bounds_both_sides() {
        let grid = Grid::default();
        assert_eq!(eval(&grid, "=B2:OFFSET(B2,2,2)"), reference("B2:D4"));
        assert_eq!(
            eval(&grid, "=A1:OFFSET(Other!B2,0,0)"),
            FormulaValue::Error(CellError::Ref)
        );
    }

    #[test]
    fn test_implicit_intersection() {
        let grid = Grid::default();
        // Formula in D3 picks A3 out of a column
        assert_eq!(eval_in(&grid, "=@A1:A10", 2, 3), reference("A3"));
        // Formula in C5 picks C1 out of a row
        assert_eq!(eval_in(&grid, "=@A1:E1", 4, 2), reference("C1"));
        // No shared row
        assert_eq!(
            eval_in(&grid, "=@A1:A3", 9, 3),
            FormulaValue::Error(CellError::Value)
        );
        assert_eq!(eval_in(&grid, "=@B7", 0, 0), reference("B7"));
    }

    #[test]
    fn test_spill_uses_host_extent() {
        let mut grid = Grid::default();
        grid.spills.insert((0, 1), CellRange::parse("B1:B4").unwrap());
        assert_eq!(eval(&grid, "=B1#"), reference("B1:B4"));
        assert_eq!(eval(&grid, "=C1#"), reference("C1"));
    }

    #[test]
    fn test_sum_over_range() {
        let grid = Grid::default()
            .with("A1", FormulaValue::Number(1.0))
            .with("A2", FormulaValue::Number(2.0))
            .with("A3", FormulaValue::Number(4.0));
        assert_eq!(eval(&grid, "=SUM(A1:A3)"), FormulaValue::Number(7.0));
    }

    #[test]
    fn test_interpreter_executes_in_scope() {
        let interpreter = Interpreter::new(Grid::default());
        let ast = parse_formula("=@A1:A5").unwrap();
        let scope = EvaluationScope::new("u", "s1").at(3, 1);
        assert_eq!(
            interpreter.execute(&ast, &scope).unwrap(),
            reference("A4")
        );
        assert!(!interpreter.is_async(&ast));
    }
}
