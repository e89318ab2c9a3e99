//! Built-in conformance suites
//!
//! Two protocol areas run against the in-memory [`FakeService`]:
//! - `session`: login, identity and logout
//! - `store`: authenticated key/value writes and capacity limits
//!
//! Bodies read their per-area settings from the run configuration.

pub mod service;
mod session;
mod store;

use anyhow::Result;
use conform_config::RunConfig;
use conform_engine::{Catalog, CatalogResult, Failure, Interaction, TestResult};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;

pub use service::{FakeService, Request, Response};

pub const SESSION: &str = "session";
pub const STORE: &str = "store";

/// Build the built-in catalog against a service instance
pub fn builtin(service: Arc<FakeService>) -> CatalogResult<Catalog<RunConfig>> {
    let mut catalog = Catalog::new();
    for test in session::tests(&service)
        .into_iter()
        .chain(store::tests(&service))
    {
        catalog.add(test)?;
    }
    Ok(catalog)
}

/// Records every request a body sends, for the result's diagnostics
pub(crate) struct Exchange<'a> {
    service: &'a FakeService,
    interactions: Vec<Interaction>,
}

impl<'a> Exchange<'a> {
    pub(crate) fn new(service: &'a FakeService) -> Self {
        Self {
            service,
            interactions: Vec::new(),
        }
    }

    pub(crate) fn send(&mut self, request: Request) -> Result<Response> {
        let response = self.service.handle(&request);
        self.interactions.push(
            Interaction::new(serde_json::to_value(&request)?)
                .with_response(serde_json::to_value(&response)?),
        );
        Ok(response)
    }

    /// Attach the recorded interactions to a result
    pub(crate) fn finish(self, mut result: TestResult) -> TestResult {
        result.interactions = self.interactions;
        result
    }

    pub(crate) fn status_mismatch(self, expected: u16, actual: u16) -> TestResult {
        let args = BTreeMap::from([
            ("expected".to_string(), expected.to_string()),
            ("actual".to_string(), actual.to_string()),
        ]);
        let failure = Failure::from_template(
            "status mismatch",
            "expected status {expected}, got {actual}",
            &args,
        );
        self.finish(TestResult::fail(failure).with_comparison(json!(expected), json!(actual)))
    }

    pub(crate) fn malformed(self, what: &str) -> TestResult {
        self.finish(TestResult::fail(Failure::new(
            "malformed response",
            format!("response carries no {}", what),
        )))
    }
}
