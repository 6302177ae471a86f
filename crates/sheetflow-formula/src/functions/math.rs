//! Value functions

use crate::error::FormulaResult;
use crate::evaluator::{EvaluationContext, FormulaValue};
use sheetflow_core::CellError;

/// Visit every number in the arguments, stopping at the first error.
///
/// Text, booleans and blanks inside arrays are skipped.
fn fold_numbers(
    args: &[FormulaValue],
    mut visit: impl FnMut(f64),
) -> Result<(), CellError> {
    for arg in args {
        match arg {
            FormulaValue::Number(n) => visit(*n),
            FormulaValue::Boolean(b) => visit(if *b { 1.0 } else { 0.0 }),
            FormulaValue::Error(e) => return Err(*e),
            FormulaValue::Array(arr) => {
                for cell in arr.iter().flatten() {
                    match cell {
                        FormulaValue::Number(n) => visit(*n),
                        FormulaValue::Error(e) => return Err(*e),
                        _ => {}
                    }
                }
            }
            _ => {} // Ignore non-numeric
        }
    }
    Ok(())
}

/// SUM function
pub fn fn_sum(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let mut sum = 0.0;
    Ok(match fold_numbers(args, |n| sum += n) {
        Ok(()) => FormulaValue::Number(sum),
        Err(e) => FormulaValue::Error(e),
    })
}

/// MIN function
pub fn fn_min(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let mut min: Option<f64> = None;
    Ok(match fold_numbers(args, |n| min = Some(min.map_or(n, |m| m.min(n)))) {
        Ok(()) => FormulaValue::Number(min.unwrap_or(0.0)),
        Err(e) => FormulaValue::Error(e),
    })
}

/// MAX function
pub fn fn_max(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let mut max: Option<f64> = None;
    Ok(match fold_numbers(args, |n| max = Some(max.map_or(n, |m| m.max(n)))) {
        Ok(()) => FormulaValue::Number(max.unwrap_or(0.0)),
        Err(e) => FormulaValue::Error(e),
    })
}

/// ABS function
pub fn fn_abs(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let arg = args.first().unwrap_or(&FormulaValue::Empty);
    if let Some(e) = arg.get_error() {
        return Ok(FormulaValue::Error(e));
    }
    Ok(match arg.as_number() {
        Some(n) => FormulaValue::Number(n.abs()),
        None => FormulaValue::Error(CellError::Value),
    })
}

/// IF(condition, value_if_true, [value_if_false])
pub fn fn_if(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let condition = args.first().unwrap_or(&FormulaValue::Empty);
    if let Some(e) = condition.get_error() {
        return Ok(FormulaValue::Error(e));
    }
    let Some(condition) = condition.as_bool() else {
        return Ok(FormulaValue::Error(CellError::Value));
    };

    let branch = if condition { args.get(1) } else { args.get(2) };
    Ok(branch
        .cloned()
        .unwrap_or(FormulaValue::Boolean(false)))
}
