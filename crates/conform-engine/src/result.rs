//! Test results, failures and the failure taxonomy used by the engine
use crate::descriptor::TestRef;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Failures raised by the harness itself rather than by a protocol check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HarnessFailure {
    /// The test reappeared in its own ancestor chain
    DependencyCycle,
    /// A direct or transitive dependency failed
    FailedDependency,
    /// An expected context key was never produced
    MissingExpectedContext,
    /// A provided context key was left unset
    MissingProvidedContext,
    /// The body returned an error or panicked
    UnexpectedException,
}

impl HarnessFailure {
    /// Stable failure name
    pub fn name(self) -> &'static str {
        match self {
            HarnessFailure::DependencyCycle => "dependency cycle detected",
            HarnessFailure::FailedDependency => "failed dependency",
            HarnessFailure::MissingExpectedContext => "missing expected context",
            HarnessFailure::MissingProvidedContext => "missing provided context",
            HarnessFailure::UnexpectedException => "unexpected exception",
        }
    }
}

impl fmt::Display for HarnessFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Who produced a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", content = "reason", rename_all = "kebab-case")]
pub enum FailureKind {
    /// The check ran and the system under test did not conform
    Assertion,
    /// The harness could not run the check
    Harness(HarnessFailure),
}

/// A structured failure. The message is never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Failure {
    pub name: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<String>,
    pub kind: FailureKind,
}

impl Failure {
    /// Create an assertion failure
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        let name = name.into();
        let mut message = message.into();
        if message.trim().is_empty() {
            message = name.clone();
        }
        Self {
            name,
            message,
            links: Vec::new(),
            kind: FailureKind::Assertion,
        }
    }

    /// Create an assertion failure from a message template.
    ///
    /// `{key}` placeholders are replaced with the matching argument; unknown
    /// placeholders are left as written.
    pub fn from_template(
        name: impl Into<String>,
        template: &str,
        args: &BTreeMap<String, String>,
    ) -> Self {
        Self::new(name, render_template(template, args))
    }

    /// Create a harness failure
    pub fn harness(kind: HarnessFailure, message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Harness(kind),
            ..Self::new(kind.name(), message)
        }
    }

    /// Attach a reference link
    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.links.push(link.into());
        self
    }

    /// Whether the harness produced this failure
    pub fn is_harness(&self) -> bool {
        matches!(self.kind, FailureKind::Harness(_))
    }

    /// The harness failure kind, if any
    pub fn harness_kind(&self) -> Option<HarnessFailure> {
        match self.kind {
            FailureKind::Harness(kind) => Some(kind),
            FailureKind::Assertion => None,
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.message)
    }
}

fn render_template(template: &str, args: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let key = &after[..close];
                match args.get(key) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push('{');
                        out.push_str(key);
                        out.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// One network interaction attempted by a test body, kept for diagnostics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub request: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
}

impl Interaction {
    pub fn new(request: Value) -> Self {
        Self {
            request,
            response: None,
        }
    }

    pub fn with_response(mut self, response: Value) -> Self {
        self.response = Some(response);
        self
    }
}

/// Outcome of one attempt at a test
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interactions: Vec<Interaction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<Failure>,
    #[serde(default)]
    pub skipped: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<Value>,
}

impl TestResult {
    /// A passing result with no diagnostics
    pub fn pass() -> Self {
        Self::default()
    }

    /// A failing result
    pub fn fail(failure: Failure) -> Self {
        Self {
            failure: Some(failure),
            ..Self::default()
        }
    }

    /// A result that was intentionally not evaluated
    pub fn skip() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }

    pub fn with_interaction(mut self, interaction: Interaction) -> Self {
        self.interactions.push(interaction);
        self
    }

    /// Record expected/actual diagnostic values
    pub fn with_comparison(mut self, expected: Value, actual: Value) -> Self {
        self.expected = Some(expected);
        self.actual = Some(actual);
        self
    }

    pub fn is_pass(&self) -> bool {
        self.failure.is_none() && !self.skipped
    }

    pub fn is_fail(&self) -> bool {
        self.failure.is_some()
    }

    pub fn is_skipped(&self) -> bool {
        self.skipped && self.failure.is_none()
    }
}

/// A test paired with the result of attempting it
#[derive(Debug)]
pub struct TestRun<C> {
    /// The test that was attempted
    pub test: TestRef<C>,
    /// Result of the attempt
    pub result: TestResult,
    /// Wall clock time spent in the body (zero for synthetic results)
    pub duration: Duration,
}

impl<C> Clone for TestRun<C> {
    fn clone(&self) -> Self {
        Self {
            test: Arc::clone(&self.test),
            result: self.result.clone(),
            duration: self.duration,
        }
    }
}

impl<C> TestRun<C> {
    /// Name of the failure, if the run failed
    pub fn failure_name(&self) -> Option<&str> {
        self.result.failure.as_ref().map(|f| f.name.as_str())
    }
}
