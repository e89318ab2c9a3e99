//! Run command - execute the selected conformance tests

use super::{prepare, Prepared, Selector};
use crate::reporter::TestReporter;
use crate::status::{StatusDump, StatusEntry};
use anyhow::Result;
use colored::*;
use conform_engine::run_tests;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

/// Arguments for the run command
#[derive(Debug, Default)]
pub struct RunArgs {
    pub selector: Selector,
    /// Verbose output (one line per test)
    pub verbose: bool,
    /// Output in JSON format
    pub json: bool,
    /// Status dump path; overrides the configured one
    pub status_file: Option<PathBuf>,
}

/// Run the selected tests, returning the run's summary
pub fn run(args: RunArgs) -> Result<StatusDump> {
    let Prepared {
        config,
        catalog,
        requested,
    } = prepare(&args.selector)?;

    if !args.json {
        if requested.is_empty() {
            println!("{}", "No tests selected.".yellow());
        } else {
            println!(
                "Requested {} of {} test{}",
                requested.len().to_string().bold(),
                catalog.len(),
                if catalog.len() == 1 { "" } else { "s" }
            );
            println!();
        }
    }

    let started = Instant::now();
    let mut reporter = if args.json || requested.is_empty() {
        None
    } else {
        Some(TestReporter::new(args.verbose))
    };

    let mut entries = Vec::new();
    for run in run_tests(&config.run, requested) {
        let entry = StatusEntry::from_run(&run);
        if let Some(reporter) = reporter.as_mut() {
            reporter.record(&entry)?;
        }
        entries.push(entry);
    }

    let dump = StatusDump::new(entries);
    info!(
        target: "conform::cli",
        tests = dump.tests,
        passed = dump.passed,
        failed = dump.failed,
        skipped = dump.skipped,
        "run finished"
    );

    if let Some(mut reporter) = reporter {
        reporter.finish(&dump, started.elapsed())?;
    } else if args.json {
        println!("{}", dump.to_json()?);
    }

    if let Some(path) = args.status_file.or_else(|| config.status_file()) {
        dump.write_to(&path)?;
        if !args.json {
            println!("Status written to {}", path.display());
        }
    }

    Ok(dump)
}
