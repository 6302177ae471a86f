//! Pass planning: from host data to an ordered run list

use super::builder::build_tree_list;
use super::cycle::has_cycle;
use super::data::CalculationPass;
use super::dirty::DirtyRangeIndex;
use super::discovery::discover_dependency_ranges;
use super::graph::{make_dependency, select_nodes, with_prerequisites};
use super::schedule::schedule;
use super::tree::{DependencyTree, RunItem};
use crate::ast_cache::AstCache;
use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::ReferenceEvaluator;

/// Counters describing one planned pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub selected_count: usize,
    pub scheduled_count: usize,
}

/// Result of planning a pass
#[derive(Debug, Clone, Default)]
pub struct PassPlan {
    /// What to run, prerequisites first
    pub run_list: Vec<RunItem>,
    /// Whether the full graph contains a circular reference
    pub has_cycle: bool,
    pub stats: PassStats,
}

/// Plans calculation passes against a shared AST cache
#[derive(Debug, Clone, Copy)]
pub struct FormulaDependencyGenerator<'a> {
    cache: &'a AstCache,
}

impl<'a> FormulaDependencyGenerator<'a> {
    pub fn new(cache: &'a AstCache) -> Self {
        Self { cache }
    }

    /// Build the dependency graph of `pass` and order what has to run.
    ///
    /// A cycle is reported in the plan, never as an error. The pass is
    /// abandoned with [`FormulaError::Cancelled`] if its flag is set
    /// before the plan is published.
    pub async fn generate<E: ReferenceEvaluator>(
        &self,
        pass: &CalculationPass,
        evaluator: &E,
    ) -> FormulaResult<PassPlan> {
        let dirty = (!pass.force_calculate).then(|| DirtyRangeIndex::flatten(&pass.dirty_ranges));

        let mut tree = self.build_tree(pass, evaluator).await?;
        make_dependency(&mut tree);
        let has_cycle = has_cycle(&tree);

        let selected = select_nodes(&tree, dirty.as_ref(), &pass.excluded_cells);
        let order = schedule(
            &tree,
            &with_prerequisites(&tree, &selected, &pass.excluded_cells),
        );

        if pass.cancellation.is_cancelled() {
            return Err(FormulaError::Cancelled);
        }

        let run_list = order
            .iter()
            .map(|&id| tree.run_item(id))
            .collect::<FormulaResult<Vec<_>>>()?;

        let stats = PassStats {
            node_count: tree.len(),
            edge_count: tree.edge_count(),
            selected_count: selected.len(),
            scheduled_count: run_list.len(),
        };
        tracing::debug!(
            nodes = stats.node_count,
            edges = stats.edge_count,
            selected = stats.selected_count,
            scheduled = stats.scheduled_count,
            has_cycle,
            "planned calculation pass"
        );

        Ok(PassPlan {
            run_list,
            has_cycle,
            stats,
        })
    }

    /// Nodes with discovered ranges, before any edges exist
    pub async fn build_tree<E: ReferenceEvaluator>(
        &self,
        pass: &CalculationPass,
        evaluator: &E,
    ) -> FormulaResult<DependencyTree> {
        let mut tree = build_tree_list(pass, self.cache);
        discover_dependency_ranges(&mut tree, evaluator, &pass.cancellation).await?;
        Ok(tree)
    }
}
