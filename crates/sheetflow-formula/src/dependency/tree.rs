//! Dependency tree nodes and the per-pass node arena

use crate::ast::FormulaExpr;
use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::EvaluationScope;
use sheetflow_core::{SheetId, UnitId, UnitRange};
use std::fmt;
use std::sync::Arc;

/// Index of a node in its [`DependencyTree`]
pub type NodeId = usize;

/// Per-node marker shared by the cycle detector and the scheduler.
///
/// During cycle detection `Queued` means "on the active DFS path" and
/// `Emitted` means "fully explored".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodeState {
    #[default]
    Unvisited,
    Queued,
    Emitted,
}

/// Where a node's formula lives
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeLocation {
    /// A formula in a grid cell
    Cell { row: u32, col: u16 },
    /// A formula owned by a non-grid object, keyed by an opaque id
    Formula { formula_id: String },
    /// A registered feature that re-runs when its declared ranges change
    Feature { feature_id: String },
}

impl fmt::Display for NodeLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeLocation::Cell { row, col } => write!(
                f,
                "{}",
                sheetflow_core::CellAddress::new(*row, *col)
            ),
            NodeLocation::Formula { formula_id } => write!(f, "formula:{}", formula_id),
            NodeLocation::Feature { feature_id } => write!(f, "feature:{}", feature_id),
        }
    }
}

/// Work a registered feature performs when its dependencies change
pub trait FeatureExecutor: Send + Sync {
    fn execute(&self) -> FormulaResult<()>;
}

impl<F> FeatureExecutor for F
where
    F: Fn() -> FormulaResult<()> + Send + Sync,
{
    fn execute(&self) -> FormulaResult<()> {
        self()
    }
}

/// Wrap a closure as a shareable executor
pub fn feature_executor<F>(f: F) -> Arc<dyn FeatureExecutor>
where
    F: Fn() -> FormulaResult<()> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// One formula occurrence or registered feature
#[derive(Clone)]
pub struct DependencyTreeNode {
    pub unit_id: UnitId,
    /// Sheet id, or sub-component id for non-grid formulas and features
    pub sheet_id: SheetId,
    pub location: NodeLocation,
    /// Formula text, absent for features
    pub formula: Option<String>,
    pub ast: Option<Arc<FormulaExpr>>,
    /// Discovered (formulas) or declared (features) dependency ranges
    pub ranges: Vec<UnitRange>,
    pub executor: Option<Arc<dyn FeatureExecutor>>,
    parents: Vec<NodeId>,
    children: Vec<NodeId>,
}

impl DependencyTreeNode {
    /// A grid or non-grid formula node
    pub fn formula(
        unit_id: impl Into<UnitId>,
        sheet_id: impl Into<SheetId>,
        location: NodeLocation,
        formula: impl Into<String>,
        ast: Arc<FormulaExpr>,
    ) -> Self {
        Self {
            unit_id: unit_id.into(),
            sheet_id: sheet_id.into(),
            location,
            formula: Some(formula.into()),
            ast: Some(ast),
            ranges: Vec::new(),
            executor: None,
            parents: Vec::new(),
            children: Vec::new(),
        }
    }

    /// A feature node with fixed ranges and no AST
    pub fn feature(
        unit_id: impl Into<UnitId>,
        sheet_id: impl Into<SheetId>,
        feature_id: impl Into<String>,
        ranges: Vec<UnitRange>,
        executor: Arc<dyn FeatureExecutor>,
    ) -> Self {
        Self {
            unit_id: unit_id.into(),
            sheet_id: sheet_id.into(),
            location: NodeLocation::Feature {
                feature_id: feature_id.into(),
            },
            formula: None,
            ast: None,
            ranges,
            executor: Some(executor),
            parents: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Grid position, for cell formulas only
    pub fn position(&self) -> Option<(u32, u16)> {
        match self.location {
            NodeLocation::Cell { row, col } => Some((row, col)),
            _ => None,
        }
    }

    pub fn is_feature(&self) -> bool {
        matches!(self.location, NodeLocation::Feature { .. })
    }

    /// Whether `other` sits inside one of this node's ranges, making it a
    /// prerequisite of this node
    pub fn depends_on(&self, other: &DependencyTreeNode) -> bool {
        let Some((row, col)) = other.position() else {
            return false;
        };
        self.ranges.iter().any(|range| {
            range.is_on(&other.unit_id, &other.sheet_id) && range.contains_cell(row, col)
        })
    }

    /// The evaluation scope discovery runs this node's formula in
    pub fn scope(&self) -> EvaluationScope<'_> {
        let scope = EvaluationScope::new(&self.unit_id, &self.sheet_id);
        match self.position() {
            Some((row, col)) => scope.at(row, col),
            None => scope,
        }
    }

    /// Dependents: nodes that must run after this one
    pub fn parents(&self) -> &[NodeId] {
        &self.parents
    }

    /// Prerequisites: nodes that must run before this one
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

impl fmt::Debug for DependencyTreeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependencyTreeNode")
            .field("unit_id", &self.unit_id)
            .field("sheet_id", &self.sheet_id)
            .field("location", &self.location)
            .field("formula", &self.formula)
            .field("ranges", &self.ranges)
            .field("parents", &self.parents)
            .field("children", &self.children)
            .finish_non_exhaustive()
    }
}

/// Index arena holding every node of one pass and the edges between them
#[derive(Debug, Default, Clone)]
pub struct DependencyTree {
    nodes: Vec<DependencyTreeNode>,
}

impl DependencyTree {
    /// Create a new empty tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, returning its id
    pub fn push(&mut self, node: DependencyTreeNode) -> NodeId {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node ids in tree-list order
    pub fn ids(&self) -> std::ops::Range<NodeId> {
        0..self.nodes.len()
    }

    pub fn node(&self, id: NodeId) -> &DependencyTreeNode {
        &self.nodes[id]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut DependencyTreeNode {
        &mut self.nodes[id]
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &DependencyTreeNode)> {
        self.nodes.iter().enumerate()
    }

    /// Add a dependency: `parent` depends on `child`.
    ///
    /// Both endpoints record the edge; adding an existing edge is a no-op.
    pub fn add_dependency(&mut self, parent: NodeId, child: NodeId) {
        if self.nodes[parent].children.contains(&child) {
            return;
        }
        self.nodes[parent].children.push(child);
        self.nodes[child].parents.push(parent);
    }

    /// Number of parent/child edges
    pub fn edge_count(&self) -> usize {
        self.nodes.iter().map(|node| node.children.len()).sum()
    }

    /// Remove every edge, keeping the nodes
    pub fn clear_dependencies(&mut self) {
        for node in &mut self.nodes {
            node.parents.clear();
            node.children.clear();
        }
    }

    /// What the evaluator receives for a scheduled node
    pub fn run_item(&self, id: NodeId) -> FormulaResult<RunItem> {
        let node = &self.nodes[id];
        match (&node.location, &node.executor) {
            (NodeLocation::Feature { feature_id }, Some(executor)) => Ok(RunItem::Feature {
                unit_id: node.unit_id.clone(),
                sheet_id: node.sheet_id.clone(),
                feature_id: feature_id.clone(),
                executor: executor.clone(),
            }),
            (NodeLocation::Feature { feature_id }, None) => Err(FormulaError::MissingHostData(
                format!("feature '{}' has no executor", feature_id),
            )),
            (location, _) => {
                let formula = node.formula.clone().unwrap_or_default();
                let ast = node.ast.clone().ok_or_else(|| FormulaError::MissingAst {
                    formula: formula.clone(),
                })?;
                Ok(RunItem::Formula {
                    unit_id: node.unit_id.clone(),
                    sheet_id: node.sheet_id.clone(),
                    location: location.clone(),
                    formula,
                    ast,
                })
            }
        }
    }
}

/// One entry of the ordered run list
#[derive(Clone)]
pub enum RunItem {
    /// Evaluate this formula at this location
    Formula {
        unit_id: UnitId,
        sheet_id: SheetId,
        location: NodeLocation,
        formula: String,
        ast: Arc<FormulaExpr>,
    },
    /// Invoke this feature's executor
    Feature {
        unit_id: UnitId,
        sheet_id: SheetId,
        feature_id: String,
        executor: Arc<dyn FeatureExecutor>,
    },
}

impl RunItem {
    pub fn unit_id(&self) -> &str {
        match self {
            RunItem::Formula { unit_id, .. } | RunItem::Feature { unit_id, .. } => unit_id,
        }
    }

    pub fn sheet_id(&self) -> &str {
        match self {
            RunItem::Formula { sheet_id, .. } | RunItem::Feature { sheet_id, .. } => sheet_id,
        }
    }

    pub fn location(&self) -> NodeLocation {
        match self {
            RunItem::Formula { location, .. } => location.clone(),
            RunItem::Feature { feature_id, .. } => NodeLocation::Feature {
                feature_id: feature_id.clone(),
            },
        }
    }
}

impl fmt::Display for RunItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]{}!{}", self.unit_id(), self.sheet_id(), self.location())
    }
}

impl fmt::Debug for RunItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunItem::Formula { formula, .. } => write!(f, "RunItem({} {})", self, formula),
            RunItem::Feature { .. } => write!(f, "RunItem({})", self),
        }
    }
}
