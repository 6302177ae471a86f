//! Tree list construction
//!
//! One node per grid formula, then per non-grid formula, then per
//! registered feature. Formula ASTs come from the shared [`AstCache`].

use super::data::CalculationPass;
use super::tree::{DependencyTree, DependencyTreeNode, NodeLocation};
use crate::ast::FormulaExpr;
use crate::ast_cache::{AstCache, AstCacheKey};
use crate::lexer::tokenize;
use crate::parser::parse;
use sheetflow_core::CellError;
use std::sync::Arc;

/// Parse `formula` at offset `(x, y)`, going through the cache.
///
/// Formulas that fail to tokenize or parse get an uncached error node, so
/// they still take part in the pass with no dependencies.
pub fn resolve_ast(cache: &AstCache, formula: &str, x: i64, y: i64) -> Arc<FormulaExpr> {
    let key = AstCacheKey::new(formula, x, y);
    if let Some(ast) = cache.get(&key) {
        return ast;
    }

    let tokens = match tokenize(formula) {
        Ok(tokens) => tokens,
        Err(kind) => {
            tracing::trace!(formula, %kind, "formula rejected by tokenizer");
            return Arc::new(FormulaExpr::Error(kind));
        }
    };

    match parse(&tokens, x, y) {
        Ok(expr) => {
            let ast = Arc::new(expr);
            cache.set(key, ast.clone());
            ast
        }
        Err(err) => {
            tracing::warn!(formula, error = %err, "formula failed to parse");
            Arc::new(FormulaExpr::Error(CellError::Name))
        }
    }
}

/// Build the nodes of one pass, without edges or discovered ranges
pub fn build_tree_list(pass: &CalculationPass, cache: &AstCache) -> DependencyTree {
    let mut tree = DependencyTree::new();

    for (unit_id, sheets) in &pass.formula_data {
        for (sheet_id, cells) in sheets {
            for (&(row, col), item) in cells {
                let ast = resolve_ast(cache, &item.f, item.x, item.y);
                tree.push(DependencyTreeNode::formula(
                    unit_id.as_str(),
                    sheet_id.as_str(),
                    NodeLocation::Cell { row, col },
                    item.f.as_str(),
                    ast,
                ));
            }
        }
    }

    for (unit_id, components) in &pass.other_formula_data {
        for (sub_component_id, formulas) in components {
            for (formula_id, item) in formulas {
                let ast = resolve_ast(cache, &item.f, 0, 0);
                tree.push(DependencyTreeNode::formula(
                    unit_id.as_str(),
                    sub_component_id.as_str(),
                    NodeLocation::Formula {
                        formula_id: formula_id.clone(),
                    },
                    item.f.as_str(),
                    ast,
                ));
            }
        }
    }

    for (feature_id, registration) in &pass.features {
        tree.push(DependencyTreeNode::feature(
            registration.unit_id.as_str(),
            registration.sub_component_id.as_str(),
            feature_id.as_str(),
            registration.dependency_ranges.clone(),
            registration.executor.clone(),
        ));
    }

    tree
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependency::data::{FeatureRegistration, FormulaDataItem};
    use crate::dependency::tree::feature_executor;
    use pretty_assertions::assert_eq;
    use sheetflow_core::UnitRange;

    #[test]
    fn test_cache_hit_reuses_tree() {
        let cache = AstCache::new(16);
        let first = resolve_ast(&cache, "=A1+1", 0, 0);
        let second = resolve_ast(&cache, "=A1+1", 0, 0);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);

        let shifted = resolve_ast(&cache, "=A1+1", 1, 0);
        assert!(!Arc::ptr_eq(&first, &shifted));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_failures_become_uncached_sentinels() {
        let cache = AstCache::new(16);

        let unbalanced = resolve_ast(&cache, "=SUM(A1", 0, 0);
        assert_eq!(unbalanced.as_error(), Some(CellError::Value));

        let empty = resolve_ast(&cache, "=", 0, 0);
        assert_eq!(empty.as_error(), Some(CellError::Name));

        let dangling = resolve_ast(&cache, "=1+", 0, 0);
        assert_eq!(dangling.as_error(), Some(CellError::Name));

        assert!(cache.is_empty());
    }

    #[test]
    fn test_node_order() {
        let executor = feature_executor(|| Ok(()));
        let pass = CalculationPass::new()
            .with_formula("u", "s", 1, 0, FormulaDataItem::new("=1"))
            .with_formula("u", "s", 0, 3, FormulaDataItem::new("=2"))
            .with_other_formula("u", "cf", "rule", "=A1")
            .with_feature(
                "validation",
                FeatureRegistration {
                    unit_id: "u".into(),
                    sub_component_id: "s".into(),
                    dependency_ranges: vec![UnitRange::cell("u", "s", 0, 0)],
                    executor,
                },
            );

        let tree = build_tree_list(&pass, &AstCache::default());
        let locations: Vec<String> = tree.nodes().map(|(_, n)| n.location.to_string()).collect();
        assert_eq!(
            locations,
            vec!["D1", "A2", "formula:rule", "feature:validation"]
        );
        assert_eq!(tree.node(2).sheet_id, "cf");
        assert!(tree.node(3).ast.is_none());
        assert_eq!(tree.node(3).ranges.len(), 1);
        assert_eq!(tree.edge_count(), 0);
    }
}
