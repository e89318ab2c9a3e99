//! Test descriptors: identity, dependencies and context contract
use crate::context::TestContext;
use crate::result::TestResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Shared handle to a test; the same descriptor is usually reachable from
/// several dependents.
pub type TestRef<C> = Arc<Test<C>>;

/// A test body. Returning `Err` (or panicking) counts as an unexpected
/// exception, not as an assertion failure.
pub type Body<C> = dyn Fn(&C, &mut TestContext) -> anyhow::Result<TestResult> + Send + Sync;

/// Computes a dependency list from the run configuration.
pub type Resolver<C> = dyn Fn(&C) -> Vec<TestRef<C>> + Send + Sync;

/// The `(area, group, assertion)` triple naming a test.
///
/// Two descriptors with equal identity are the same graph node, even if they
/// are separate allocations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Identity {
    /// Protocol area (e.g. "session")
    pub area: String,
    /// Group within the area
    pub group: String,
    /// Assertion text
    pub assertion: String,
}

impl Identity {
    /// Create a new identity
    pub fn new(
        area: impl Into<String>,
        group: impl Into<String>,
        assertion: impl Into<String>,
    ) -> Self {
        Self {
            area: area.into(),
            group: group.into(),
            assertion: assertion.into(),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}: {}", self.area, self.group, self.assertion)
    }
}

/// How a test finds the tests it depends on
pub enum Dependencies<C> {
    /// Leaf node
    None,
    /// Fixed, ordered list
    Fixed(Vec<TestRef<C>>),
    /// List computed from the run configuration
    Resolver(Arc<Resolver<C>>),
}

impl<C> Dependencies<C> {
    /// Resolve to a concrete ordered list
    pub fn resolve(&self, config: &C) -> Vec<TestRef<C>> {
        match self {
            Dependencies::None => Vec::new(),
            Dependencies::Fixed(tests) => tests.clone(),
            Dependencies::Resolver(resolver) => resolver(config),
        }
    }

    /// Whether the dependency list is computed at run time
    pub fn is_dynamic(&self) -> bool {
        matches!(self, Dependencies::Resolver(_))
    }
}

impl<C> Clone for Dependencies<C> {
    fn clone(&self) -> Self {
        match self {
            Dependencies::None => Dependencies::None,
            Dependencies::Fixed(tests) => Dependencies::Fixed(tests.clone()),
            Dependencies::Resolver(resolver) => Dependencies::Resolver(Arc::clone(resolver)),
        }
    }
}

impl<C> fmt::Debug for Dependencies<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dependencies::None => f.write_str("None"),
            Dependencies::Fixed(tests) => f
                .debug_list()
                .entries(tests.iter().map(|t| t.identity()))
                .finish(),
            Dependencies::Resolver(_) => f.write_str("Resolver(..)"),
        }
    }
}

/// A test descriptor
pub struct Test<C> {
    identity: Identity,
    dependencies: Dependencies<C>,
    expects: BTreeSet<String>,
    provides: BTreeSet<String>,
    body: Arc<Body<C>>,
}

impl<C> Test<C> {
    /// Create a leaf test with the given body
    pub fn new<F>(
        area: impl Into<String>,
        group: impl Into<String>,
        assertion: impl Into<String>,
        body: F,
    ) -> Self
    where
        F: Fn(&C, &mut TestContext) -> anyhow::Result<TestResult> + Send + Sync + 'static,
    {
        Self {
            identity: Identity::new(area, group, assertion),
            dependencies: Dependencies::None,
            expects: BTreeSet::new(),
            provides: BTreeSet::new(),
            body: Arc::new(body),
        }
    }

    /// Depend on a fixed list of tests
    pub fn with_dependencies(mut self, dependencies: Vec<TestRef<C>>) -> Self {
        self.dependencies = if dependencies.is_empty() {
            Dependencies::None
        } else {
            Dependencies::Fixed(dependencies)
        };
        self
    }

    /// Depend on a list computed from the run configuration
    pub fn with_resolver<F>(mut self, resolver: F) -> Self
    where
        F: Fn(&C) -> Vec<TestRef<C>> + Send + Sync + 'static,
    {
        self.dependencies = Dependencies::Resolver(Arc::new(resolver));
        self
    }

    /// Context keys that must be populated before this test runs
    pub fn with_expects<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expects.extend(keys.into_iter().map(Into::into));
        self
    }

    /// Context keys this test promises to populate
    pub fn with_provides<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.provides.extend(keys.into_iter().map(Into::into));
        self
    }

    /// Wrap in a shared handle
    pub fn into_ref(self) -> TestRef<C> {
        Arc::new(self)
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn area(&self) -> &str {
        &self.identity.area
    }

    pub fn group(&self) -> &str {
        &self.identity.group
    }

    pub fn assertion(&self) -> &str {
        &self.identity.assertion
    }

    pub fn dependencies(&self) -> &Dependencies<C> {
        &self.dependencies
    }

    pub fn expects(&self) -> &BTreeSet<String> {
        &self.expects
    }

    pub fn provides(&self) -> &BTreeSet<String> {
        &self.provides
    }

    /// Invoke the body directly. The engine wraps this with panic capture
    /// and the context contract checks.
    pub fn invoke(&self, config: &C, context: &mut TestContext) -> anyhow::Result<TestResult> {
        (self.body)(config, context)
    }
}

impl<C> fmt::Debug for Test<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Test")
            .field("identity", &self.identity)
            .field("dependencies", &self.dependencies)
            .field("expects", &self.expects)
            .field("provides", &self.provides)
            .finish_non_exhaustive()
    }
}
