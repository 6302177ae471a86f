//! Circular reference detection

use super::tree::{DependencyTree, NodeId, NodeState};

/// Whether the child edges of `tree` contain a directed cycle.
///
/// Depth-first over children with an explicit frame stack, started from
/// every unvisited node in tree-list order. `Queued` marks nodes on the
/// current path and `Emitted` nodes that are fully explored.
pub fn has_cycle(tree: &DependencyTree) -> bool {
    let mut state = vec![NodeState::Unvisited; tree.len()];
    // (node, index of the next child to visit)
    let mut frames: Vec<(NodeId, usize)> = Vec::new();

    for root in tree.ids() {
        if state[root] != NodeState::Unvisited {
            continue;
        }
        state[root] = NodeState::Queued;
        frames.push((root, 0));

        while let Some(frame) = frames.last_mut() {
            let (id, next) = *frame;
            let children = tree.node(id).children();
            let Some(&child) = children.get(next) else {
                state[id] = NodeState::Emitted;
                frames.pop();
                continue;
            };
            frame.1 += 1;

            match state[child] {
                NodeState::Queued => return true,
                NodeState::Emitted => {}
                NodeState::Unvisited => {
                    state[child] = NodeState::Queued;
                    frames.push((child, 0));
                }
            }
        }
    }

    false
}
