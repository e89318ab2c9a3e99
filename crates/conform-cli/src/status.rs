//! Status dump - the machine-readable summary of one run
//!
//! Printed by `--json` and written to the configured status file.

use anyhow::{Context, Result};
use conform_engine::{Failure, TestRun};
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Outcome of one test as reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Passed,
    /// The check ran and the service did not conform
    Failed,
    /// The harness could not run the check
    Error,
    Skipped,
}

/// One reported test
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusEntry {
    pub area: String,
    pub group: String,
    pub assertion: String,
    pub status: Status,
    pub failure: Option<Failure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<Value>,
    pub duration_ms: u128,
}

impl StatusEntry {
    pub fn from_run<C>(run: &TestRun<C>) -> Self {
        let result = &run.result;
        let status = match &result.failure {
            Some(failure) if failure.is_harness() => Status::Error,
            Some(_) => Status::Failed,
            None if result.skipped => Status::Skipped,
            None => Status::Passed,
        };
        let identity = run.test.identity();

        Self {
            area: identity.area.clone(),
            group: identity.group.clone(),
            assertion: identity.assertion.clone(),
            status,
            failure: result.failure.clone(),
            expected: result.expected.clone(),
            actual: result.actual.clone(),
            duration_ms: run.duration.as_millis(),
        }
    }

    /// `area / group: assertion`
    pub fn name(&self) -> String {
        format!("{} / {}: {}", self.area, self.group, self.assertion)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.status, Status::Failed | Status::Error)
    }
}

/// Summary of a whole run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatusDump {
    pub tests: usize,
    pub passed: usize,
    /// Assertion failures and harness errors
    pub failed: usize,
    pub skipped: usize,
    pub results: Vec<StatusEntry>,
}

impl StatusDump {
    pub fn new(results: Vec<StatusEntry>) -> Self {
        let count = |status: Status| results.iter().filter(|e| e.status == status).count();
        Self {
            tests: results.len(),
            passed: count(Status::Passed),
            failed: count(Status::Failed) + count(Status::Error),
            skipped: count(Status::Skipped),
            results,
        }
    }

    /// Number of harness errors among the failures
    pub fn errors(&self) -> usize {
        self.results
            .iter()
            .filter(|e| e.status == Status::Error)
            .count()
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the dump, creating parent directories as needed
    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(path, self.to_json()? + "\n")
            .with_context(|| format!("Failed to write status file {}", path.display()))?;
        tracing::debug!(target: "conform::status", path = %path.display(), tests = self.tests, "wrote status dump");
        Ok(())
    }
}
