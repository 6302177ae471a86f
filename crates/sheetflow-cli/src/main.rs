//! Sheetflow CLI - plan recalculation passes for a JSON workbook description

mod input;
mod logging;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use input::{parse_unit_range, WorkbookInput};
use serde::Serialize;
use sheetflow::prelude::*;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "sheetflow")]
#[command(author, version, about = "Spreadsheet recalculation planner")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the formulas a pass would run, in order
    Plan {
        /// Workbook description (JSON)
        input: PathBuf,

        /// Plan every formula, ignoring dirty ranges
        #[arg(short, long)]
        force: bool,

        /// Extra dirty range, as unit/sheet!A1:B2 (repeatable)
        #[arg(short, long = "dirty", value_name = "RANGE")]
        dirty: Vec<String>,

        /// Emit a JSON document instead of text
        #[arg(long)]
        json: bool,
    },

    /// Report whether the workbook contains circular references
    Check {
        /// Workbook description (JSON)
        input: PathBuf,
    },
}

#[derive(Serialize)]
struct PlanOutput {
    run_list: Vec<RunItemOutput>,
    has_cycle: bool,
    stats: StatsOutput,
}

#[derive(Serialize)]
struct RunItemOutput {
    unit: String,
    sheet: String,
    location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    formula: Option<String>,
}

#[derive(Serialize)]
struct StatsOutput {
    nodes: usize,
    edges: usize,
    selected: usize,
    scheduled: usize,
}

impl From<&PassPlan> for PlanOutput {
    fn from(plan: &PassPlan) -> Self {
        let run_list = plan
            .run_list
            .iter()
            .map(|item| RunItemOutput {
                unit: item.unit_id().to_string(),
                sheet: item.sheet_id().to_string(),
                location: item.location().to_string(),
                formula: match item {
                    RunItem::Formula { formula, .. } => Some(formula.clone()),
                    RunItem::Feature { .. } => None,
                },
            })
            .collect();
        Self {
            run_list,
            has_cycle: plan.has_cycle,
            stats: StatsOutput {
                nodes: plan.stats.node_count,
                edges: plan.stats.edge_count,
                selected: plan.stats.selected_count,
                scheduled: plan.stats.scheduled_count,
            },
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    logging::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Plan {
            input,
            force,
            dirty,
            json,
        } => plan(&input, force, &dirty, json).await,
        Commands::Check { input } => check(&input).await,
    }
}

fn read_input(path: &Path) -> Result<WorkbookInput> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read '{}'", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse '{}'", path.display()))
}

async fn plan(input: &Path, force: bool, extra_dirty: &[String], json: bool) -> Result<()> {
    let loaded = read_input(input)?.load()?;

    let mut request = PassRequest {
        dirty_ranges: loaded.dirty,
        force,
        ..Default::default()
    };
    for text in extra_dirty {
        request.dirty_ranges.push(parse_unit_range(text)?);
    }

    let plan = Recalculator::default()
        .plan(&loaded.model, &loaded.values, &request)
        .await
        .context("Failed to plan calculation pass")?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if json {
        serde_json::to_writer_pretty(&mut out, &PlanOutput::from(&plan))?;
        writeln!(out)?;
    } else {
        for item in &plan.run_list {
            match item {
                RunItem::Formula { formula, .. } => writeln!(out, "{}\t{}", item, formula)?,
                RunItem::Feature { .. } => writeln!(out, "{}", item)?,
            }
        }
        writeln!(out, "cyclic: {}", plan.has_cycle)?;
    }
    Ok(())
}

async fn check(input: &Path) -> Result<()> {
    let loaded = read_input(input)?.load()?;
    let plan = Recalculator::default()
        .plan(&loaded.model, &loaded.values, &PassRequest::full())
        .await
        .context("Failed to build dependency graph")?;

    println!("nodes: {}", plan.stats.node_count);
    println!("dependencies: {}", plan.stats.edge_count);
    println!("cyclic: {}", plan.has_cycle);
    Ok(())
}
