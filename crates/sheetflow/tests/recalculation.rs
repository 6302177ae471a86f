//! Planning passes through the facade

use pretty_assertions::assert_eq;
use sheetflow::feature_executor;
use sheetflow::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn order(plan: &PassPlan) -> Vec<String> {
    plan.run_list.iter().map(|item| item.location().to_string()).collect()
}

fn dirty(a1: &str) -> PassRequest {
    PassRequest::new().with_dirty_range(UnitRange::new("book", "s1", CellRange::parse(a1).unwrap()))
}

#[tokio::test]
async fn test_offset_reads_literal_arguments() {
    let mut model = FormulaDataModel::new();
    model.set_cell_formula("book", "s1", 0, 3, Some("=OFFSET(A1,B1,0)"), None).unwrap();
    model.set_cell_formula("book", "s1", 4, 0, Some("=10"), None).unwrap();

    let mut values = CellValues::new();
    values.set_value("book", "s1", 0, 1, 4.0);

    let plan = Recalculator::default()
        .plan(&model, &values, &dirty("A5"))
        .await
        .unwrap();
    assert_eq!(order(&plan), vec!["A5", "D1"]);
}

#[tokio::test]
async fn test_indirect_resolves_sheet_names() {
    let mut model = FormulaDataModel::new();
    model.set_cell_formula("book", "s1", 0, 0, Some("=INDIRECT(\"Data!B2\")"), None).unwrap();
    model.set_cell_formula("book", "s2", 1, 1, Some("=5"), None).unwrap();

    let mut values = CellValues::new();
    values.set_sheet_name("book", "s1", "Summary");
    values.set_sheet_name("book", "s2", "Data");

    let request = PassRequest::new().with_dirty_range(UnitRange::cell("book", "s2", 1, 1));
    let plan = Recalculator::default().plan(&model, &values, &request).await.unwrap();

    let cells: Vec<String> = plan.run_list.iter().map(ToString::to_string).collect();
    assert_eq!(cells, vec!["[book]s2!B2", "[book]s1!A1"]);
}

#[tokio::test]
async fn test_shared_formula_rows() {
    let mut model = FormulaDataModel::new();
    model.set_cell_formula("book", "s1", 0, 1, Some("=A1*2"), Some("double")).unwrap();
    for row in 1..4 {
        model.set_cell_formula("book", "s1", row, 1, None, Some("double")).unwrap();
    }

    let plan = Recalculator::default()
        .plan(&model, &CellValues::new(), &dirty("A3"))
        .await
        .unwrap();
    assert_eq!(order(&plan), vec!["B3"]);

    model.remove_cell_formula("book", "s1", 0, 1);
    let plan = Recalculator::default()
        .plan(&model, &CellValues::new(), &dirty("A3"))
        .await
        .unwrap();
    assert_eq!(order(&plan), vec!["B3"]);
}

#[tokio::test]
async fn test_features_run_after_their_inputs() {
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = runs.clone();
    let executor = feature_executor(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    let mut model = FormulaDataModel::new();
    model.set_cell_formula("book", "s1", 0, 0, Some("=1"), None).unwrap();
    model.register_feature(
        "chart-1",
        FeatureRegistration {
            unit_id: "book".into(),
            sub_component_id: "s1".into(),
            dependency_ranges: vec![UnitRange::new("book", "s1", CellRange::parse("A1:A10").unwrap())],
            executor: executor.clone(),
        },
    );
    model.register_feature(
        "always",
        FeatureRegistration {
            unit_id: "book".into(),
            sub_component_id: "s1".into(),
            dependency_ranges: vec![],
            executor,
        },
    );

    let recalculator = Recalculator::default();
    let plan = recalculator
        .plan(&model, &CellValues::new(), &dirty("A1"))
        .await
        .unwrap();
    assert_eq!(order(&plan), vec!["A1", "feature:always", "feature:chart-1"]);

    for item in &plan.run_list {
        if let RunItem::Feature { executor, .. } = item {
            executor.execute().unwrap();
        }
    }
    assert_eq!(runs.load(Ordering::SeqCst), 2);

    // Nothing dirty: only the unconditional feature runs
    let plan = recalculator
        .plan(&model, &CellValues::new(), &PassRequest::new())
        .await
        .unwrap();
    assert_eq!(order(&plan), vec!["feature:always"]);
}

#[tokio::test]
async fn test_cycle_reported_in_plan() {
    let mut model = FormulaDataModel::new();
    model.set_cell_formula("book", "s1", 0, 0, Some("=B1"), None).unwrap();
    model.set_cell_formula("book", "s1", 0, 1, Some("=A1"), None).unwrap();
    model.set_cell_formula("book", "s1", 5, 5, Some("=1"), None).unwrap();

    let plan = Recalculator::default()
        .plan(&model, &CellValues::new(), &dirty("F6"))
        .await
        .unwrap();
    assert!(plan.has_cycle);
    assert_eq!(order(&plan), vec!["F6"]);
    assert_eq!(plan.stats.node_count, 3);
}
