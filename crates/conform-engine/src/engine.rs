//! Test execution engine
//!
//! [`Run`] walks a requested test set in dependency-first order and yields
//! one [`TestRun`] at a time. Each identity is attempted at most once per
//! run: later references to a passed test are silently satisfied, references
//! to a failed test invalidate the referencing test instead.
//!
//! The walk is an explicit stack of frames. A frame whose dependency cannot
//! be satisfied receives a [`Signal`] from that dependency instead of a
//! result, and decides whether to report it or hand it further up.

use crate::context::{ContextStore, TestContext};
use crate::descriptor::{Identity, TestRef};
use crate::error::format_cycle;
use crate::result::{Failure, HarnessFailure, TestResult, TestRun};
use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::iter::FusedIterator;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// What a finished (or refused) dependency tells the frame that asked for it
#[derive(Debug, Clone, PartialEq, Eq)]
enum Signal {
    Passed,
    Failed,
    /// `closes` reappeared in its own chain; `path` runs from its first
    /// occurrence back to itself
    Cycle { closes: Identity, path: Vec<Identity> },
}

struct Frame<C> {
    test: TestRef<C>,
    dependencies: Vec<TestRef<C>>,
    next: usize,
}

impl<C> Frame<C> {
    fn advance(&mut self) -> Option<TestRef<C>> {
        let dependency = self.dependencies.get(self.next).map(Arc::clone)?;
        self.next += 1;
        Some(dependency)
    }

    /// The dependency processed most recently
    fn current_dependency(&self) -> Option<&TestRef<C>> {
        self.next
            .checked_sub(1)
            .and_then(|index| self.dependencies.get(index))
    }
}

/// A single execution of a requested test set.
///
/// The context store, the ancestor chain and the ledger all live inside the
/// run and are dropped with it.
pub struct Run<'a, C> {
    config: &'a C,
    requested: std::vec::IntoIter<TestRef<C>>,
    store: ContextStore,
    frames: Vec<Frame<C>>,
    on_chain: HashSet<Identity>,
    ledger: HashMap<Identity, bool>,
    signal: Option<Signal>,
}

/// Start a run with a fresh context store
pub fn run_tests<C>(config: &C, requested: Vec<TestRef<C>>) -> Run<'_, C> {
    Run::new(config, requested)
}

impl<'a, C> Run<'a, C> {
    /// Create a run with an empty context store
    pub fn new(config: &'a C, requested: Vec<TestRef<C>>) -> Self {
        Self::with_store(config, requested, ContextStore::new())
    }

    /// Create a run seeded with an existing context store
    pub fn with_store(config: &'a C, requested: Vec<TestRef<C>>, store: ContextStore) -> Self {
        debug!(
            target: "conform::engine",
            requested = requested.len(),
            seeded = store.len(),
            "Starting run"
        );
        Self {
            config,
            requested: requested.into_iter(),
            store,
            frames: Vec::new(),
            on_chain: HashSet::new(),
            ledger: HashMap::new(),
            signal: None,
        }
    }

    /// Context produced so far
    pub fn store(&self) -> &ContextStore {
        &self.store
    }

    /// Consume the run, keeping its context
    pub fn into_store(self) -> ContextStore {
        self.store
    }

    /// Ledger entry for an identity: `Some(true)` once attempted and passed
    /// (or still in progress), `Some(false)` once failed or invalidated.
    pub fn status(&self, identity: &Identity) -> Option<bool> {
        self.ledger.get(identity).copied()
    }

    /// Number of identities attempted so far
    pub fn attempted(&self) -> usize {
        self.ledger.len()
    }

    /// Try to start a test. Returns a signal when the test is not entered:
    /// it closes a cycle, or the ledger already decided it.
    fn enter(&mut self, test: TestRef<C>) -> Option<Signal> {
        let identity = test.identity();

        if self.on_chain.contains(identity) {
            let start = self
                .frames
                .iter()
                .position(|frame| frame.test.identity() == identity)
                .unwrap_or(0);
            let mut path: Vec<Identity> = self.frames[start..]
                .iter()
                .map(|frame| frame.test.identity().clone())
                .collect();
            path.push(identity.clone());

            warn!(
                target: "conform::engine",
                test = %identity,
                cycle = %format_cycle(&path),
                "Dependency cycle detected"
            );
            return Some(Signal::Cycle {
                closes: identity.clone(),
                path,
            });
        }

        if let Some(&passed) = self.ledger.get(identity) {
            debug!(target: "conform::engine", test = %identity, passed, "Already attempted");
            return Some(if passed { Signal::Passed } else { Signal::Failed });
        }

        self.ledger.insert(identity.clone(), true);
        let dependencies = test.dependencies().resolve(self.config);
        debug!(
            target: "conform::engine",
            test = %identity,
            dependencies = dependencies.len(),
            "Entering test"
        );

        self.on_chain.insert(identity.clone());
        self.frames.push(Frame {
            test,
            dependencies,
            next: 0,
        });
        None
    }

    fn pop_frame(&mut self) -> Option<Frame<C>> {
        let frame = self.frames.pop()?;
        self.on_chain.remove(frame.test.identity());
        Some(frame)
    }

    /// Hand a signal to the innermost frame. Returns a run when that frame
    /// reports it.
    fn deliver(&mut self, signal: Signal) -> Option<TestRun<C>> {
        if self.frames.is_empty() {
            // Top-level tests that were already attempted yield nothing
            return None;
        }

        match signal {
            Signal::Passed => None,
            Signal::Failed => {
                let frame = self.pop_frame()?;
                let message = match frame.current_dependency() {
                    Some(dependency) => format!("dependency '{}' failed", dependency.identity()),
                    None => "a dependency failed".to_string(),
                };
                Some(self.invalidate(frame.test, HarnessFailure::FailedDependency, message))
            }
            Signal::Cycle { closes, path } => {
                let frame = self.pop_frame()?;
                if frame.test.identity() == &closes {
                    let message = format!("cycle: {}", format_cycle(&path));
                    return Some(self.invalidate(
                        frame.test,
                        HarnessFailure::DependencyCycle,
                        message,
                    ));
                }

                // Not ours: pass it up unchanged. The test never ran, so it
                // must not count as satisfied for later dependents.
                self.ledger.insert(frame.test.identity().clone(), false);
                self.signal = Some(Signal::Cycle { closes, path });
                None
            }
        }
    }

    /// Report a test that will not run because of the harness
    fn invalidate(
        &mut self,
        test: TestRef<C>,
        kind: HarnessFailure,
        message: String,
    ) -> TestRun<C> {
        self.ledger.insert(test.identity().clone(), false);
        self.signal = Some(Signal::Failed);
        self.emit(TestRun {
            test,
            result: TestResult::fail(Failure::harness(kind, message)),
            duration: Duration::ZERO,
        })
    }

    /// Run the body of the innermost frame once all its dependencies passed
    fn finish_frame(&mut self) -> Option<TestRun<C>> {
        let frame = self.pop_frame()?;
        let run = self.execute(frame.test);

        let passed = !run.result.is_fail();
        if !passed {
            self.ledger.insert(run.test.identity().clone(), false);
        }
        self.signal = Some(if passed { Signal::Passed } else { Signal::Failed });
        Some(self.emit(run))
    }

    fn execute(&mut self, test: TestRef<C>) -> TestRun<C> {
        if let Some(key) = self.store.first_missing(test.expects()) {
            let failure = Failure::harness(
                HarnessFailure::MissingExpectedContext,
                format!("context key '{key}' was never provided"),
            );
            return TestRun {
                test,
                result: TestResult::fail(failure),
                duration: Duration::ZERO,
            };
        }

        let mut context = TestContext::new(&self.store, test.expects(), test.provides());
        let config = self.config;

        let start = Instant::now();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| test.invoke(config, &mut context)));
        let duration = start.elapsed();

        let mut result = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(error)) => TestResult::fail(Failure::harness(
                HarnessFailure::UnexpectedException,
                format!("{error:#}"),
            )),
            Err(payload) => TestResult::fail(Failure::harness(
                HarnessFailure::UnexpectedException,
                panic_message(payload.as_ref()),
            )),
        };

        if result.failure.is_none() {
            match context.first_unset() {
                Some(key) => {
                    result.failure = Some(Failure::harness(
                        HarnessFailure::MissingProvidedContext,
                        format!("context key '{key}' was declared as provided but never set"),
                    ));
                }
                None => context.commit(&mut self.store),
            }
        }

        TestRun {
            test,
            result,
            duration,
        }
    }

    fn emit(&self, run: TestRun<C>) -> TestRun<C> {
        let identity = run.test.identity();
        match &run.result.failure {
            Some(failure) if failure.is_harness() => warn!(
                target: "conform::engine",
                test = %identity,
                failure = %failure.name,
                message = %failure.message,
                "Test invalidated"
            ),
            Some(failure) => info!(
                target: "conform::engine",
                test = %identity,
                failure = %failure.name,
                duration_ms = run.duration.as_millis() as u64,
                "Test failed"
            ),
            None => info!(
                target: "conform::engine",
                test = %identity,
                skipped = run.result.skipped,
                duration_ms = run.duration.as_millis() as u64,
                "Test passed"
            ),
        }
        run
    }
}

impl<C> Iterator for Run<'_, C> {
    type Item = TestRun<C>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(signal) = self.signal.take() {
                if let Some(run) = self.deliver(signal) {
                    return Some(run);
                }
                continue;
            }

            let dependency = match self.frames.last_mut() {
                Some(frame) => frame.advance(),
                None => {
                    let test = self.requested.next()?;
                    // A top-level test already decided by an earlier branch
                    // produces no new run
                    let _ = self.enter(test);
                    continue;
                }
            };

            match dependency {
                Some(dependency) => self.signal = self.enter(dependency),
                None => return self.finish_frame(),
            }
        }
    }
}

impl<C> FusedIterator for Run<'_, C> {}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panicked: {message}")
    } else {
        "panicked with a non-string payload".to_string()
    }
}
