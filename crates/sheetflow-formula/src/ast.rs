//! Formula Abstract Syntax Tree types

use sheetflow_core::{CellAddress, CellError, CellRange, RangeKind};

/// Formula expression AST
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaExpr {
    // === Literals ===
    /// Numeric literal
    Number(f64),
    /// String literal
    String(String),
    /// Boolean literal
    Boolean(bool),
    /// Error literal, also used as the sentinel for formulas that fail to parse
    Error(CellError),

    // === References ===
    /// Single cell reference
    CellRef(CellReference),
    /// Range reference (rectangle, whole rows or whole columns)
    RangeRef(RangeReference),
    /// Named range or defined name
    NameRef(String),

    // === Operators ===
    /// Binary operation
    BinaryOp {
        op: BinaryOperator,
        left: Box<FormulaExpr>,
        right: Box<FormulaExpr>,
    },
    /// Unary operation
    UnaryOp {
        op: UnaryOperator,
        operand: Box<FormulaExpr>,
    },

    // === Function call ===
    Function {
        name: String,
        args: Vec<FormulaExpr>,
    },

    // === Array ===
    Array(Vec<Vec<FormulaExpr>>),
}

/// Cell reference with optional sheet
#[derive(Debug, Clone, PartialEq)]
pub struct CellReference {
    pub sheet: Option<String>,
    pub address: CellAddress,
}

/// Range reference with optional sheet
#[derive(Debug, Clone, PartialEq)]
pub struct RangeReference {
    pub sheet: Option<String>,
    pub range: CellRange,
    pub kind: RangeKind,
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,

    // Comparison
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,

    // Text
    Concat,

    /// `:` between two reference-producing expressions, e.g. `A1:INDEX(B:B,3)`
    Range,
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Negate,
    Percent,
    /// Prefix `@`: ensure a single value
    ImplicitIntersection,
    /// Suffix `#`: the whole spill range of a dynamic array anchor
    Spill,
}

impl FormulaExpr {
    /// Direct sub-expressions, left to right
    pub fn children(&self) -> Vec<&FormulaExpr> {
        match self {
            FormulaExpr::BinaryOp { left, right, .. } => vec![left, right],
            FormulaExpr::UnaryOp { operand, .. } => vec![operand],
            FormulaExpr::Function { args, .. } => args.iter().collect(),
            FormulaExpr::Array(rows) => rows.iter().flatten().collect(),
            _ => Vec::new(),
        }
    }

    /// A plain cell or range reference
    pub fn is_reference(&self) -> bool {
        matches!(self, FormulaExpr::CellRef(_) | FormulaExpr::RangeRef(_))
    }

    /// Nodes whose value must be computed before the formula runs to know
    /// which cells it touches: `:` combinators, `@` and `#`.
    pub fn is_pre_calculated(&self) -> bool {
        matches!(
            self,
            FormulaExpr::BinaryOp {
                op: BinaryOperator::Range,
                ..
            } | FormulaExpr::UnaryOp {
                op: UnaryOperator::ImplicitIntersection | UnaryOperator::Spill,
                ..
            }
        )
    }

    /// The error kind if this is an error literal or sentinel
    pub fn as_error(&self) -> Option<CellError> {
        match self {
            FormulaExpr::Error(e) => Some(*e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_children_are_left_to_right() {
        let expr = FormulaExpr::Function {
            name: "SUM".into(),
            args: vec![FormulaExpr::Number(1.0), FormulaExpr::Number(2.0)],
        };
        assert_eq!(
            expr.children(),
            vec![&FormulaExpr::Number(1.0), &FormulaExpr::Number(2.0)]
        );
        assert!(FormulaExpr::Number(1.0).children().is_empty());
    }

    #[test]
    fn test_pre_calculated_nodes() {
        let a1 = FormulaExpr::CellRef(CellReference {
            sheet: None,
            address: CellAddress::new(0, 0),
        });
        let at = FormulaExpr::UnaryOp {
            op: UnaryOperator::ImplicitIntersection,
            operand: Box::new(a1.clone()),
        };
        let neg = FormulaExpr::UnaryOp {
            op: UnaryOperator::Negate,
            operand: Box::new(a1.clone()),
        };
        assert!(at.is_pre_calculated());
        assert!(!neg.is_pre_calculated());
        assert!(a1.is_reference());
        assert!(!a1.is_pre_calculated());
    }
}
