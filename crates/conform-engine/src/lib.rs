//! Conform execution engine
//!
//! Runs a conformance suite whose tests declare dependencies on each other
//! and share data through a run-scoped context:
//! - Graph expansion with cycle detection ([`Plan`])
//! - Dependency-first execution, each test at most once ([`Run`])
//! - Producer/consumer context contract ([`ContextStore`], [`TestContext`])
//! - Structured failures that never abort the run ([`Failure`])
//! - Catalog registration and top-level selection ([`Catalog`])
//!
//! # Example
//!
//! ```
//! use conform_engine::{run_tests, Test, TestResult};
//!
//! let login = Test::new("session", "login", "issues a token", |_: &(), ctx| {
//!     ctx.provide("token", "abc")?;
//!     Ok(TestResult::pass())
//! })
//! .with_provides(["token"])
//! .into_ref();
//!
//! let whoami = Test::new("session", "whoami", "accepts the token", |_: &(), ctx| {
//!     assert_eq!(ctx.expected_str("token")?, "abc");
//!     Ok(TestResult::pass())
//! })
//! .with_dependencies(vec![login])
//! .with_expects(["token"])
//! .into_ref();
//!
//! let runs: Vec<_> = run_tests(&(), vec![whoami]).collect();
//! assert_eq!(runs.len(), 2);
//! assert!(runs.iter().all(|r| r.result.is_pass()));
//! ```

pub mod catalog;
pub mod context;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod plan;
pub mod result;

// Re-export main types
pub use catalog::{Catalog, Selection};
pub use context::{ContextError, ContextStore, TestContext};
pub use descriptor::{Dependencies, Identity, Test, TestRef};
pub use engine::{run_tests, Run};
pub use error::{CatalogError, CatalogResult, PlanError, PlanResult};
pub use plan::Plan;
pub use result::{Failure, FailureKind, HarnessFailure, Interaction, TestResult, TestRun};
