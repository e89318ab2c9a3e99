//! Plan command - show what a run would execute, without running it

use super::{prepare, Prepared, Selector};
use anyhow::Result;
use colored::*;
use conform_engine::{Identity, Plan};
use std::collections::HashSet;

/// Arguments for the plan command
#[derive(Debug, Default)]
pub struct PlanArgs {
    pub selector: Selector,
    /// Output in JSON format
    pub json: bool,
}

/// Expand the selection into its execution order
pub fn run(args: PlanArgs) -> Result<()> {
    let Prepared {
        config, requested, ..
    } = prepare(&args.selector)?;
    let plan = Plan::expand(&requested, &config.run)?;

    let requested: HashSet<&Identity> = requested.iter().map(|t| t.identity()).collect();

    if args.json {
        let tests: Vec<_> = plan
            .tests()
            .iter()
            .map(|t| {
                serde_json::json!({
                    "area": t.area(),
                    "group": t.group(),
                    "assertion": t.assertion(),
                    "requested": requested.contains(t.identity()),
                    "expects": t.expects(),
                    "provides": t.provides(),
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::json!({
                "requested": requested.len(),
                "tests": tests,
            })
        );
        return Ok(());
    }

    if plan.is_empty() {
        println!("{}", "No tests selected.".yellow());
    } else {
        println!(
            "Execution plan: {} test{} ({} requested)",
            plan.len().to_string().bold(),
            if plan.len() == 1 { "" } else { "s" },
            requested.len()
        );
        println!();

        let width = plan.len().to_string().len();
        for (index, test) in plan.tests().iter().enumerate() {
            let marker = if requested.contains(test.identity()) {
                String::new()
            } else {
                format!(" {}", "(dependency)".dimmed())
            };
            println!(
                "  {:>width$}. {}{}",
                index + 1,
                test.identity(),
                marker,
                width = width
            );
        }
    }

    Ok(())
}
