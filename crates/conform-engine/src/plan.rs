//! Non-executing expansion of a requested test set into its dependency closure
use crate::descriptor::{Identity, TestRef};
use crate::error::{PlanError, PlanResult};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Ordered, de-duplicated list of every test a request needs.
///
/// Dependencies come strictly before their dependents; ties are broken by
/// first discovery.
#[derive(Debug)]
pub struct Plan<C> {
    order: Vec<TestRef<C>>,
}

impl<C> Plan<C> {
    /// Expand `requested` into its transitive closure.
    ///
    /// Fails the whole call on the first cycle found.
    pub fn expand(requested: &[TestRef<C>], config: &C) -> PlanResult<Self> {
        let mut expander = Expander {
            config,
            seen: HashSet::new(),
            stack: Vec::new(),
            order: Vec::new(),
        };
        expander.visit_all(requested)?;

        debug!(
            target: "conform::plan",
            requested = requested.len(),
            planned = expander.order.len(),
            "Expanded test plan"
        );
        Ok(Self {
            order: expander.order,
        })
    }

    pub fn tests(&self) -> &[TestRef<C>] {
        &self.order
    }

    pub fn identities(&self) -> impl Iterator<Item = &Identity> {
        self.order.iter().map(|t| t.identity())
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, identity: &Identity) -> bool {
        self.identities().any(|id| id == identity)
    }

    pub fn into_tests(self) -> Vec<TestRef<C>> {
        self.order
    }
}

struct Expander<'a, C> {
    config: &'a C,
    seen: HashSet<Identity>,
    /// Ancestor chain of the test currently being expanded
    stack: Vec<Identity>,
    order: Vec<TestRef<C>>,
}

impl<C> Expander<'_, C> {
    fn visit_all(&mut self, tests: &[TestRef<C>]) -> PlanResult<()> {
        for test in tests {
            self.visit(test)?;
        }
        Ok(())
    }

    fn visit(&mut self, test: &TestRef<C>) -> PlanResult<()> {
        let identity = test.identity();

        if let Some(start) = self.stack.iter().position(|id| id == identity) {
            let mut cycle = self.stack[start..].to_vec();
            cycle.push(identity.clone());
            return Err(PlanError::cycle(cycle));
        }

        if self.seen.contains(identity) {
            return Ok(());
        }

        let dependencies = test.dependencies().resolve(self.config);
        if !dependencies.is_empty() {
            self.stack.push(identity.clone());
            let expanded = self.visit_all(&dependencies);
            self.stack.pop();
            expanded?;
        }

        self.seen.insert(identity.clone());
        self.order.push(Arc::clone(test));
        Ok(())
    }
}
