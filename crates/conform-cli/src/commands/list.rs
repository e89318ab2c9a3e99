//! List command - show the built-in catalog

use crate::catalog::{self, FakeService};
use anyhow::Result;
use colored::*;
use conform_config::RunConfig;
use conform_engine::{Dependencies, Test};
use serde_json::{json, Value};
use std::sync::Arc;

/// Arguments for the list command
#[derive(Debug, Default)]
pub struct ListArgs {
    /// Show dependencies and context keys
    pub verbose: bool,
    /// Output in JSON format
    pub json: bool,
}

fn dependencies_json(test: &Test<RunConfig>) -> Value {
    match test.dependencies() {
        Dependencies::None => json!([]),
        Dependencies::Fixed(tests) => json!(tests
            .iter()
            .map(|t| t.identity().to_string())
            .collect::<Vec<_>>()),
        Dependencies::Resolver(_) => json!("configuration-dependent"),
    }
}

fn dependencies_text(test: &Test<RunConfig>) -> Option<String> {
    match test.dependencies() {
        Dependencies::None => None,
        Dependencies::Fixed(tests) => Some(
            tests
                .iter()
                .map(|t| t.identity().to_string())
                .collect::<Vec<_>>()
                .join(", "),
        ),
        Dependencies::Resolver(_) => Some("resolved from configuration".to_string()),
    }
}

fn join_keys<'a>(keys: impl IntoIterator<Item = &'a String>) -> String {
    keys.into_iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Print every area and its tests
pub fn run(args: ListArgs) -> Result<()> {
    let catalog = catalog::builtin(Arc::new(FakeService::new()))?;

    if args.json {
        let areas: Vec<_> = catalog
            .areas()
            .into_iter()
            .map(|area| {
                let tests: Vec<_> = catalog
                    .tests()
                    .iter()
                    .filter(|t| t.area() == area)
                    .map(|t| {
                        json!({
                            "group": t.group(),
                            "assertion": t.assertion(),
                            "dependencies": dependencies_json(t),
                            "expects": t.expects(),
                            "provides": t.provides(),
                        })
                    })
                    .collect();
                json!({ "name": area, "tests": tests })
            })
            .collect();
        println!("{}", json!({ "areas": areas }));
        return Ok(());
    }

    for area in catalog.areas() {
        println!("{}", area.bold());
        for test in catalog.tests().iter().filter(|t| t.area() == area) {
            println!("  {}: {}", test.group().cyan(), test.assertion());
            if !args.verbose {
                continue;
            }
            if let Some(dependencies) = dependencies_text(test) {
                println!("      {} {}", "depends on:".dimmed(), dependencies);
            }
            if !test.expects().is_empty() {
                println!("      {} {}", "expects:".dimmed(), join_keys(test.expects()));
            }
            if !test.provides().is_empty() {
                println!("      {} {}", "provides:".dimmed(), join_keys(test.provides()));
            }
        }
        println!();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_command() {
        let args = ListArgs {
            verbose: true,
            ..Default::default()
        };
        assert!(run(args).is_ok());
    }

    #[test]
    fn test_dependency_descriptions() {
        let catalog = catalog::builtin(Arc::new(FakeService::new())).unwrap();
        let find = |assertion: &str| {
            catalog
                .tests()
                .iter()
                .find(|t| t.assertion() == assertion)
                .unwrap()
        };

        assert_eq!(dependencies_text(find("wrong password is rejected")), None);
        assert_eq!(
            dependencies_text(find("deleted value is gone")).as_deref(),
            Some("store / values: stored value can be read back")
        );
        assert_eq!(
            dependencies_json(find("stored value can be read back")),
            json!("configuration-dependent")
        );
    }
}
