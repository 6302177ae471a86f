//! Dependency tracking for incremental recalculation
//!
//! A pass goes through these stages:
//! 1. [`builder`]: one node per formula or feature, ASTs from the cache
//! 2. [`discovery`]: evaluate reference-producing sub-expressions into ranges
//! 3. [`graph`]: connect nodes whose ranges cover other formula cells
//! 4. [`cycle`]: report circular references
//! 5. [`graph::select_nodes`]: pick dirty nodes, then
//!    [`graph::with_prerequisites`] adds the formulas they read
//! 6. [`schedule`]: order them with their dependents
//!
//! [`FormulaDependencyGenerator`] runs all of them.

pub mod builder;
pub mod cycle;
pub mod data;
pub mod dirty;
pub mod discovery;
pub mod generator;
pub mod graph;
pub mod schedule;
pub mod tree;

pub use data::{
    CalculationPass, CancellationFlag, ExcludedCells, FeatureRegistration, FeatureRegistrations,
    FormulaData, FormulaDataItem, OtherFormulaData, OtherFormulaItem,
};
pub use dirty::DirtyRangeIndex;
pub use generator::{FormulaDependencyGenerator, PassPlan, PassStats};
pub use tree::{
    feature_executor, DependencyTree, DependencyTreeNode, FeatureExecutor, NodeId, NodeLocation,
    NodeState, RunItem,
};
