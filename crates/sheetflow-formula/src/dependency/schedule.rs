//! Run order computation

use super::tree::{DependencyTree, NodeId, NodeState};

/// Order `selected` and everything that depends on them so prerequisites
/// come first.
///
/// The stack is seeded with `selected` in the given order. A node whose
/// dependents are all emitted is emitted; otherwise it is queued and
/// pushed back under its dependents. A queued node popped again is
/// emitted as is, which keeps cyclic input finite.
pub fn schedule(tree: &DependencyTree, selected: &[NodeId]) -> Vec<NodeId> {
    let mut state = vec![NodeState::Unvisited; tree.len()];
    let mut stack: Vec<NodeId> = selected.to_vec();
    let mut order = Vec::new();

    while let Some(id) = stack.pop() {
        match state[id] {
            NodeState::Emitted => continue,
            NodeState::Queued => {
                state[id] = NodeState::Emitted;
                order.push(id);
                continue;
            }
            NodeState::Unvisited => {}
        }

        let pending: Vec<NodeId> = tree
            .node(id)
            .parents()
            .iter()
            .copied()
            .filter(|&parent| parent != id && state[parent] != NodeState::Emitted)
            .collect();

        if pending.is_empty() {
            state[id] = NodeState::Emitted;
            order.push(id);
        } else {
            state[id] = NodeState::Queued;
            stack.push(id);
            stack.extend(pending);
        }
    }

    order.reverse();
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::FormulaExpr;
    use crate::dependency::tree::{DependencyTreeNode, NodeLocation};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn tree_with_edges(count: u32, edges: &[(NodeId, NodeId)]) -> DependencyTree {
        let mut tree = DependencyTree::new();
        for row in 0..count {
            tree.push(DependencyTreeNode::formula(
                "u",
                "s",
                NodeLocation::Cell { row, col: 0 },
                "=0",
                Arc::new(FormulaExpr::Number(0.0)),
            ));
        }
        for &(parent, child) in edges {
            tree.add_dependency(parent, child);
        }
        tree
    }

    fn position(order: &[NodeId], id: NodeId) -> usize {
        order.iter().position(|&n| n == id).unwrap()
    }

    #[test]
    fn test_prerequisites_first() {
        // 2 depends on 0 and 1
        let tree = tree_with_edges(3, &[(2, 0), (2, 1)]);
        let order = schedule(&tree, &[0, 1]);
        assert_eq!(order.len(), 3);
        assert!(position(&order, 0) < position(&order, 2));
        assert!(position(&order, 1) < position(&order, 2));
    }

    #[test]
    fn test_dependents_are_pulled_in() {
        // 1 depends on 0, 2 depends on 1
        let tree = tree_with_edges(4, &[(1, 0), (2, 1)]);
        assert_eq!(schedule(&tree, &[0]), vec![0, 1, 2]);
    }

    #[test]
    fn test_duplicate_selection_emits_once() {
        let tree = tree_with_edges(2, &[(1, 0)]);
        assert_eq!(schedule(&tree, &[0, 0, 1]), vec![0, 1]);
    }

    #[test]
    fn test_cycles_terminate() {
        let tree = tree_with_edges(3, &[(0, 0), (1, 2), (2, 1)]);
        let mut order = schedule(&tree, &[0, 1]);
        order.sort_unstable();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn test_nothing_selected() {
        let tree = tree_with_edges(2, &[(1, 0)]);
        assert!(schedule(&tree, &[]).is_empty());
    }
}
