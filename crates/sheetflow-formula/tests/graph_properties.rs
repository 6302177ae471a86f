//! Property tests over randomly generated formula graphs
//!
//! Every generated workbook is a column of formulas in `A`, where the
//! formula in row `i` reads some of the rows listed for it.

use proptest::prelude::*;
use sheetflow_core::UnitRange;
use sheetflow_formula::dependency::cycle::has_cycle;
use sheetflow_formula::dependency::graph::make_dependency;
use sheetflow_formula::dependency::schedule::schedule;
use sheetflow_formula::{
    AstCache, CalculationPass, EmptySource, FormulaDataItem, FormulaDependencyGenerator,
    Interpreter, NodeLocation, PassPlan,
};
use std::collections::HashSet;

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
        .block_on(future)
}

/// `reads[i]` lists the rows the formula in row `i` reads
fn workbook(reads: &[Vec<usize>]) -> CalculationPass {
    reads.iter().enumerate().fold(CalculationPass::new(), |pass, (row, deps)| {
        let formula = if deps.is_empty() {
            "=0".to_string()
        } else {
            let refs: Vec<String> = deps.iter().map(|d| format!("A{}", d + 1)).collect();
            format!("={}", refs.join("+"))
        };
        pass.with_formula("u", "s", row as u32, 0, FormulaDataItem::new(formula))
    })
}

fn plan(pass: &CalculationPass) -> PassPlan {
    let cache = AstCache::default();
    block_on(FormulaDependencyGenerator::new(&cache).generate(pass, &Interpreter::new(EmptySource)))
        .unwrap()
}

fn rows(plan: &PassPlan) -> Vec<usize> {
    plan.run_list
        .iter()
        .filter_map(|item| match item.location() {
            NodeLocation::Cell { row, .. } => Some(row as usize),
            _ => None,
        })
        .collect()
}

/// Row `i` only reads rows below `i`, so the graph is acyclic
fn acyclic_reads() -> impl Strategy<Value = Vec<Vec<usize>>> {
    (1usize..24).prop_flat_map(|n| {
        (0..n)
            .map(|i| {
                if i == 0 {
                    Just(Vec::new()).boxed()
                } else {
                    proptest::collection::vec(0..i, 0..4).boxed()
                }
            })
            .collect::<Vec<_>>()
    })
}

/// Arbitrary reads, cycles allowed
fn any_reads() -> impl Strategy<Value = Vec<Vec<usize>>> {
    (1usize..16).prop_flat_map(|n| proptest::collection::vec(proptest::collection::vec(0..n, 0..3), n))
}

/// Rows reachable from `start` through readers
fn readers_closure(reads: &[Vec<usize>], start: &[usize]) -> HashSet<usize> {
    let mut seen: HashSet<usize> = start.iter().copied().collect();
    let mut stack: Vec<usize> = start.to_vec();
    while let Some(row) = stack.pop() {
        for (reader, deps) in reads.iter().enumerate() {
            if deps.contains(&row) && seen.insert(reader) {
                stack.push(reader);
            }
        }
    }
    seen
}

proptest! {
    #[test]
    fn prop_forced_acyclic_pass_is_topological(reads in acyclic_reads()) {
        let plan = plan(&workbook(&reads).force());
        let order = rows(&plan);

        prop_assert!(!plan.has_cycle);
        prop_assert_eq!(order.len(), reads.len());
        let unique: HashSet<_> = order.iter().collect();
        prop_assert_eq!(unique.len(), order.len());

        for (reader, deps) in reads.iter().enumerate() {
            let reader_at = order.iter().position(|&r| r == reader).unwrap();
            for dep in deps {
                let dep_at = order.iter().position(|r| r == dep).unwrap();
                prop_assert!(dep_at < reader_at);
            }
        }
    }

    #[test]
    fn prop_dirty_pass_schedules_readers_and_their_inputs(reads in acyclic_reads(), seed in 0usize..24) {
        let dirty_row = seed % reads.len();
        let pass = workbook(&reads)
            .with_dirty_range(UnitRange::cell("u", "s", dirty_row as u32, 0));
        let order = rows(&plan(&pass));

        // Everything reached through readers, plus what those formulas read
        let reached = readers_closure(&reads, &[dirty_row]);
        let mut seeds: Vec<usize> = reached.iter().copied().collect();
        seeds.extend(reached.iter().flat_map(|&row| reads[row].iter().copied()));
        let expected = readers_closure(&reads, &seeds);

        prop_assert_eq!(order.len(), expected.len());
        let actual: HashSet<usize> = order.iter().copied().collect();
        prop_assert_eq!(actual, expected);

        for (at, &reader) in order.iter().enumerate() {
            for dep in &reads[reader] {
                if let Some(dep_at) = order.iter().position(|r| r == dep) {
                    prop_assert!(dep_at < at);
                }
            }
        }
    }

    #[test]
    fn prop_cyclic_input_terminates_without_duplicates(reads in any_reads()) {
        let plan = plan(&workbook(&reads).force());
        let order = rows(&plan);

        let unique: HashSet<_> = order.iter().collect();
        prop_assert_eq!(unique.len(), order.len());
        prop_assert_eq!(order.len(), reads.len());

        let self_loop = reads.iter().enumerate().any(|(row, deps)| deps.contains(&row));
        if self_loop {
            prop_assert!(plan.has_cycle);
        }
    }

    #[test]
    fn prop_schedule_is_deterministic(reads in any_reads()) {
        let pass = workbook(&reads).force();
        let cache = AstCache::default();
        let generator = FormulaDependencyGenerator::new(&cache);
        let interpreter = Interpreter::new(EmptySource);

        let mut tree = block_on(generator.build_tree(&pass, &interpreter)).unwrap();
        make_dependency(&mut tree);
        let selected: Vec<_> = tree.ids().collect();

        let first = schedule(&tree, &selected);
        let second = schedule(&tree, &selected);
        prop_assert_eq!(first, second);
        prop_assert_eq!(has_cycle(&tree), has_cycle(&tree));
    }
}
