//! Range discovery
//!
//! A formula's dependencies are found by evaluating the parts of its tree
//! that produce references, then reading the resulting ranges.

use super::data::CancellationFlag;
use super::tree::DependencyTree;
use crate::ast::FormulaExpr;
use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::{EvaluationScope, ReferenceEvaluator};
use crate::functions::is_address_function;
use sheetflow_core::UnitRange;

/// Nodes whose value is a reference: `:` combinators, `@`, `#` and plain
/// references, in depth-first left-to-right order.
///
/// Combinators and `@`/`#` are evaluated whole, so their operands are not
/// visited.
pub fn collect_reference_nodes(expr: &FormulaExpr) -> Vec<&FormulaExpr> {
    let mut found = Vec::new();
    visit_references(expr, &mut found);
    found
}

fn visit_references<'a>(expr: &'a FormulaExpr, found: &mut Vec<&'a FormulaExpr>) {
    if expr.is_pre_calculated() {
        found.push(expr);
        return;
    }
    if expr.is_reference() {
        found.push(expr);
    }
    for child in expr.children() {
        visit_references(child, found);
    }
}

/// Calls to functions that return a reference (`OFFSET`, `INDIRECT`,
/// `INDEX`), in depth-first left-to-right order. Nested calls inside a
/// collected one are not visited.
pub fn collect_address_functions(expr: &FormulaExpr) -> Vec<&FormulaExpr> {
    let mut found = Vec::new();
    visit_address_functions(expr, &mut found);
    found
}

fn visit_address_functions<'a>(expr: &'a FormulaExpr, found: &mut Vec<&'a FormulaExpr>) {
    if let FormulaExpr::Function { name, .. } = expr {
        if is_address_function(name) {
            found.push(expr);
            return;
        }
    }
    for child in expr.children() {
        visit_address_functions(child, found);
    }
}

/// Evaluate every reference-producing node of `expr` and collect the
/// ranges they name.
///
/// Nodes are evaluated one at a time; async nodes are awaited before the
/// next one starts. Results that are not references are skipped.
pub async fn discover_ranges<E: ReferenceEvaluator>(
    expr: &FormulaExpr,
    scope: &EvaluationScope<'_>,
    evaluator: &E,
    cancellation: &CancellationFlag,
) -> FormulaResult<Vec<UnitRange>> {
    let nodes = collect_reference_nodes(expr)
        .into_iter()
        .chain(collect_address_functions(expr));

    let mut ranges = Vec::new();
    for node in nodes {
        if cancellation.is_cancelled() {
            return Err(FormulaError::Cancelled);
        }

        let value = if evaluator.is_async(node) {
            evaluator.execute_async(node, scope).await?
        } else {
            evaluator.execute(node, scope)?
        };

        match value.to_unit_range() {
            Some(range) => ranges.push(UnitRange {
                range: range.range.without_anchors(),
                ..range.clone()
            }),
            None => tracing::debug!(?node, ?value, "reference node produced no range"),
        }
    }
    Ok(ranges)
}

/// Fill in the ranges of every formula node in `tree`.
///
/// Feature nodes keep their declared ranges.
pub async fn discover_dependency_ranges<E: ReferenceEvaluator>(
    tree: &mut DependencyTree,
    evaluator: &E,
    cancellation: &CancellationFlag,
) -> FormulaResult<()> {
    for id in tree.ids() {
        let node = tree.node(id);
        let Some(ast) = node.ast.clone() else {
            continue;
        };
        let ranges = discover_ranges(&ast, &node.scope(), evaluator, cancellation).await?;
        tracing::trace!(
            node = %node.location,
            sheet = %node.sheet_id,
            ranges = ranges.len(),
            "discovered dependency ranges"
        );
        tree.node_mut(id).ranges = ranges;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::{EmptySource, FormulaValue, Interpreter};
    use crate::parser::parse_formula;
    use pretty_assertions::assert_eq;
    use sheetflow_core::{CellRange, RangeKind};
    use std::cell::Cell;

    async fn ranges_of(formula: &str) -> Vec<String> {
        let expr = parse_formula(formula).unwrap();
        let scope = EvaluationScope::new("u", "s").at(0, 0);
        let interpreter = Interpreter::new(EmptySource);
        let ranges = discover_ranges(&expr, &scope, &interpreter, &CancellationFlag::new())
            .await
            .unwrap();
        ranges.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_collect_reference_nodes_order() {
        let expr = parse_formula("=SUM(A1:B2, C3) + @D4:D9 + E5").unwrap();
        let found: Vec<String> = collect_reference_nodes(&expr)
            .iter()
            .map(|node| format!("{:?}", node))
            .collect();
        assert_eq!(found.len(), 4);
        assert!(found[0].contains("RangeRef"));
        assert!(found[2].contains("ImplicitIntersection"));
        assert!(found[3].contains("CellRef"));
    }

    #[test]
    fn test_collect_address_functions_skips_nested() {
        let expr = parse_formula("=SUM(OFFSET(INDEX(A1:A9,2),1,0), INDIRECT(\"B1\"))").unwrap();
        let found = collect_address_functions(&expr);
        let names: Vec<&str> = found
            .iter()
            .filter_map(|node| match node {
                FormulaExpr::Function { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(names, vec!["OFFSET", "INDIRECT"]);
    }

    #[tokio::test]
    async fn test_plain_references() {
        assert_eq!(
            ranges_of("=A1+B1").await,
            vec!["[u]s!A1".to_string(), "[u]s!B1".to_string()]
        );
    }

    #[tokio::test]
    async fn test_anchors_are_dropped() {
        assert_eq!(ranges_of("=$A$1").await, vec!["[u]s!A1".to_string()]);
    }

    #[tokio::test]
    async fn test_offset_adds_target_after_references() {
        assert_eq!(
            ranges_of("=OFFSET(A1,0,1)").await,
            vec!["[u]s!A1".to_string(), "[u]s!B1".to_string()]
        );
    }

    #[tokio::test]
    async fn test_range_combinator_is_evaluated_whole() {
        assert_eq!(ranges_of("=SUM(A1:B2:C3)").await, vec!["[u]s!A1:C3".to_string()]);
    }

    #[tokio::test]
    async fn test_non_reference_results_are_skipped() {
        assert_eq!(ranges_of("=INDIRECT(\"junk\")").await, Vec::<String>::new());
        assert_eq!(ranges_of("=1+2").await, Vec::<String>::new());
    }

    #[tokio::test]
    async fn test_cancelled_before_first_evaluation() {
        let expr = parse_formula("=A1").unwrap();
        let scope = EvaluationScope::new("u", "s");
        let flag = CancellationFlag::new();
        flag.cancel();
        let result = discover_ranges(
            &expr,
            &scope,
            &Interpreter::new(EmptySource),
            &flag,
        )
        .await;
        assert!(matches!(result, Err(FormulaError::Cancelled)));
    }

    /// Every node goes through the async path; counts the calls
    struct AsyncOnly {
        calls: Cell<usize>,
    }

    impl ReferenceEvaluator for AsyncOnly {
        fn is_async(&self, _node: &FormulaExpr) -> bool {
            true
        }

        fn execute(
            &self,
            _node: &FormulaExpr,
            _scope: &EvaluationScope<'_>,
        ) -> FormulaResult<FormulaValue> {
            Err(FormulaError::Evaluation("sync path used".into()))
        }

        async fn execute_async(
            &self,
            _node: &FormulaExpr,
            scope: &EvaluationScope<'_>,
        ) -> FormulaResult<FormulaValue> {
            tokio::task::yield_now().await;
            self.calls.set(self.calls.get() + 1);
            Ok(FormulaValue::Reference(UnitRange {
                unit_id: scope.unit_id.to_string(),
                sheet_id: scope.sheet_id.to_string(),
                range: CellRange::from_indices(9, 9, 9, 9),
                kind: RangeKind::Cell,
            }))
        }
    }

    #[tokio::test]
    async fn test_async_nodes_are_awaited() {
        let expr = parse_formula("=A1+B1").unwrap();
        let evaluator = AsyncOnly {
            calls: Cell::new(0),
        };
        let ranges = discover_ranges(
            &expr,
            &EvaluationScope::new("u", "s"),
            &evaluator,
            &CancellationFlag::new(),
        )
        .await
        .unwrap();
        assert_eq!(evaluator.calls.get(), 2);
        assert_eq!(ranges.len(), 2);
    }

    #[tokio::test]
    async fn test_evaluator_errors_abort() {
        struct Failing;
        impl ReferenceEvaluator for Failing {
            fn execute(
                &self,
                _node: &FormulaExpr,
                _scope: &EvaluationScope<'_>,
            ) -> FormulaResult<FormulaValue> {
                Err(FormulaError::Evaluation("boom".into()))
            }
        }
        let expr = parse_formula("=A1").unwrap();
        let result = discover_ranges(
            &expr,
            &EvaluationScope::new("u", "s"),
            &Failing,
            &CancellationFlag::new(),
        )
        .await;
        assert!(matches!(result, Err(FormulaError::Evaluation(_))));
    }
}
