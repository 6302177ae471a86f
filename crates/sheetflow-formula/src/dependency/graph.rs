//! Edge construction and dirty selection

use super::data::ExcludedCells;
use super::dirty::{is_excluded, DirtyRangeIndex};
use super::tree::{DependencyTree, NodeId};

/// Connect every node to the grid formulas its ranges cover.
///
/// Every ordered pair is checked, so this is quadratic in the node count.
/// A formula covering its own cell gets a self edge.
pub fn make_dependency(tree: &mut DependencyTree) {
    let mut edges = Vec::new();
    for (parent, dependent) in tree.nodes() {
        if dependent.ranges.is_empty() {
            continue;
        }
        for (child, prerequisite) in tree.nodes() {
            if dependent.depends_on(prerequisite) {
                edges.push((parent, child));
            }
        }
    }
    for (parent, child) in edges {
        tree.add_dependency(parent, child);
    }
}

/// Nodes that must run this pass, in tree-list order.
///
/// With no dirty index (forced pass) everything is selected. Otherwise a
/// node is selected when one of its ranges is dirty, when its own cell is
/// dirty and not excluded, or when it is a feature with no ranges.
pub fn select_nodes(
    tree: &DependencyTree,
    dirty: Option<&DirtyRangeIndex>,
    excluded: &ExcludedCells,
) -> Vec<NodeId> {
    let Some(dirty) = dirty else {
        return tree.ids().collect();
    };

    tree.nodes()
        .filter(|(_, node)| {
            if node.is_feature() && node.ranges.is_empty() {
                return true;
            }
            if node.ranges.iter().any(|range| dirty.intersects(range)) {
                return true;
            }
            // Sheet rename/insert/delete dirtiness is not tracked yet
            node.position().is_some_and(|(row, col)| {
                dirty.contains_cell(&node.unit_id, &node.sheet_id, row, col)
                    && !is_excluded(excluded, &node.unit_id, &node.sheet_id, row, col)
            })
        })
        .map(|(id, _)| id)
        .collect()
}

/// Add the direct prerequisites of everything `selected` reaches through
/// dependents.
///
/// Those prerequisites run first even when they are not dirty. Added nodes follow `selected` in tree-list order. Excluded cells are
/// never added.
pub fn with_prerequisites(
    tree: &DependencyTree,
    selected: &[NodeId],
    excluded: &ExcludedCells,
) -> Vec<NodeId> {
    let mut reached = vec![false; tree.len()];
    let mut stack = Vec::new();
    for &id in selected {
        if !reached[id] {
            reached[id] = true;
            stack.push(id);
        }
    }
    while let Some(id) = stack.pop() {
        for &parent in tree.node(id).parents() {
            if !reached[parent] {
                reached[parent] = true;
                stack.push(parent);
            }
        }
    }

    let mut wanted = vec![false; tree.len()];
    for id in tree.ids().filter(|&id| reached[id]) {
        for &child in tree.node(id).children() {
            if reached[child] {
                continue;
            }
            let node = tree.node(child);
            let skip = node.position().is_some_and(|(row, col)| {
                is_excluded(excluded, &node.unit_id, &node.sheet_id, row, col)
            });
            wanted[child] = !skip;
        }
    }

    let mut widened = selected.to_vec();
    widened.extend(tree.ids().filter(|&id| wanted[id]));
    widened
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::FormulaExpr;
    use crate::dependency::tree::{feature_executor, DependencyTreeNode, NodeLocation};
    use pretty_assertions::assert_eq;
    use sheetflow_core::{CellRange, UnitRange};
    use std::sync::Arc;

    fn cell(tree: &mut DependencyTree, a1: &str, deps: &[&str]) -> NodeId {
        let address = sheetflow_core::CellAddress::parse(a1).unwrap();
        let mut node = DependencyTreeNode::formula(
            "u",
            "s",
            NodeLocation::Cell {
                row: address.row,
                col: address.col,
            },
            "=0",
            Arc::new(FormulaExpr::Number(0.0)),
        );
        node.ranges = deps
            .iter()
            .map(|d| UnitRange::new("u", "s", CellRange::parse(d).unwrap()))
            .collect();
        tree.push(node)
    }

    fn dirty(a1: &str) -> DirtyRangeIndex {
        DirtyRangeIndex::flatten(&[UnitRange::new("u", "s", CellRange::parse(a1).unwrap())])
    }

    #[test]
    fn test_edges_follow_ranges() {
        let mut tree = DependencyTree::new();
        let a1 = cell(&mut tree, "A1", &[]);
        let b1 = cell(&mut tree, "B1", &[]);
        let c1 = cell(&mut tree, "C1", &["A1:B1"]);
        make_dependency(&mut tree);

        assert_eq!(tree.node(c1).children(), &[a1, b1]);
        assert_eq!(tree.node(a1).parents(), &[c1]);
        assert_eq!(tree.node(b1).parents(), &[c1]);
        assert_eq!(tree.edge_count(), 2);
    }

    #[test]
    fn test_self_reference_gets_self_edge() {
        let mut tree = DependencyTree::new();
        let a1 = cell(&mut tree, "A1", &["A1"]);
        make_dependency(&mut tree);
        assert_eq!(tree.node(a1).children(), &[a1]);
        assert_eq!(tree.node(a1).parents(), &[a1]);
    }

    #[test]
    fn test_force_selects_everything() {
        let mut tree = DependencyTree::new();
        cell(&mut tree, "A1", &[]);
        cell(&mut tree, "B1", &["A1"]);
        assert_eq!(select_nodes(&tree, None, &ExcludedCells::new()), vec![0, 1]);
    }

    #[test]
    fn test_selection_by_range_and_position() {
        let mut tree = DependencyTree::new();
        let a1 = cell(&mut tree, "A1", &[]);
        let b1 = cell(&mut tree, "B1", &["A1"]);
        cell(&mut tree, "C1", &["Z9"]);

        let index = dirty("A1");
        assert_eq!(select_nodes(&tree, Some(&index), &ExcludedCells::new()), vec![a1, b1]);

        let mut excluded = ExcludedCells::new();
        excluded
            .entry("u".into())
            .or_default()
            .entry("s".into())
            .or_default()
            .insert((0, 0));
        assert_eq!(select_nodes(&tree, Some(&index), &excluded), vec![b1]);
    }

    #[test]
    fn test_empty_dirty_selects_only_unconditional_features() {
        let mut tree = DependencyTree::new();
        cell(&mut tree, "A1", &[]);
        let executor = feature_executor(|| Ok(()));
        let always = tree.push(DependencyTreeNode::feature("u", "s", "always", vec![], executor.clone()));
        tree.push(DependencyTreeNode::feature(
            "u",
            "s",
            "watcher",
            vec![UnitRange::cell("u", "s", 5, 5)],
            executor,
        ));

        let index = DirtyRangeIndex::default();
        assert_eq!(select_nodes(&tree, Some(&index), &ExcludedCells::new()), vec![always]);
    }

    #[test]
    fn test_prerequisites_of_selected_and_dependents_are_added() {
        let mut tree = DependencyTree::new();
        let a1 = cell(&mut tree, "A1", &[]);
        let b1 = cell(&mut tree, "B1", &[]);
        let c1 = cell(&mut tree, "C1", &["A1", "B1"]);
        let d1 = cell(&mut tree, "D1", &[]);
        // E1 is reached as a dependent, so its other input D1 is added
        cell(&mut tree, "E1", &["C1", "D1"]);
        cell(&mut tree, "F1", &[]);
        cell(&mut tree, "G1", &["F1"]);
        make_dependency(&mut tree);

        let widened = with_prerequisites(&tree, &[a1, c1], &ExcludedCells::new());
        assert_eq!(widened, vec![a1, c1, b1, d1]);
    }

    #[test]
    fn test_excluded_prerequisite_is_not_added() {
        let mut tree = DependencyTree::new();
        let a1 = cell(&mut tree, "A1", &[]);
        cell(&mut tree, "B1", &[]);
        let c1 = cell(&mut tree, "C1", &["A1:B1"]);
        make_dependency(&mut tree);

        let mut excluded = ExcludedCells::new();
        excluded
            .entry("u".into())
            .or_default()
            .entry("s".into())
            .or_default()
            .insert((0, 1));
        assert_eq!(with_prerequisites(&tree, &[a1, c1], &excluded), vec![a1, c1]);
    }
}
