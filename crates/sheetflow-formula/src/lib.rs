//! # sheetflow-formula
//!
//! Formula parsing and dependency planning for sheetflow.
//!
//! This crate provides:
//! - Formula tokenizing and parsing (text → AST), with shared formula offsets
//! - A bounded cache of parsed formulas
//! - A reference interpreter for the parts of a formula that name cells
//! - Dependency graph construction, cycle detection and run ordering
//!
//! ## Example
//!
//! ```rust
//! use sheetflow_formula::{
//!     AstCache, CalculationPass, EmptySource, FormulaDataItem,
//!     FormulaDependencyGenerator, Interpreter,
//! };
//!
//! # tokio_test_runtime(async {
//! let pass = CalculationPass::new()
//!     .with_formula("book", "sheet1", 0, 0, FormulaDataItem::new("=1"))
//!     .with_formula("book", "sheet1", 0, 1, FormulaDataItem::new("=A1*2"))
//!     .force();
//!
//! let cache = AstCache::default();
//! let plan = FormulaDependencyGenerator::new(&cache)
//!     .generate(&pass, &Interpreter::new(EmptySource))
//!     .await
//!     .unwrap();
//! assert_eq!(plan.run_list.len(), 2);
//! assert!(!plan.has_cycle);
//! # });
//! # fn tokio_test_runtime<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

pub mod ast;
pub mod ast_cache;
pub mod dependency;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod lexer;
pub mod parser;

pub use ast::{BinaryOperator, CellReference, FormulaExpr, RangeReference, UnaryOperator};
pub use ast_cache::{AstCache, AstCacheKey, DEFAULT_AST_CACHE_CAPACITY};
pub use dependency::{
    feature_executor, CalculationPass, CancellationFlag, FeatureExecutor, FeatureRegistration,
    FormulaData, FormulaDataItem, FormulaDependencyGenerator, NodeLocation, OtherFormulaData,
    PassPlan, PassStats, RunItem,
};
pub use error::{FormulaError, FormulaResult};
pub use evaluator::{
    evaluate, CellValueSource, EmptySource, EvaluationContext, EvaluationScope, FormulaValue,
    Interpreter, ReferenceEvaluator,
};
pub use lexer::{tokenize, TokenStream};
pub use parser::{parse, parse_formula};
