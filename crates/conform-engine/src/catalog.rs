//! Test catalog and top-level selection
//!
//! Selection only decides which tests are *requested*. Dependencies of a
//! requested test are always followed, whatever the filters say.

use crate::descriptor::{Identity, TestRef};
use crate::error::{CatalogError, CatalogResult};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Which tests to request from a catalog
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// Enabled protocol areas; empty means every area
    pub areas: Vec<String>,
    /// Case-insensitive substrings matched against group and assertion text;
    /// empty means no filtering
    pub filters: Vec<String>,
}

impl Selection {
    /// Select everything
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_areas<I, S>(mut self, areas: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.areas = areas.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_filters<I, S>(mut self, filters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filters = filters.into_iter().map(Into::into).collect();
        self
    }

    fn area_enabled(&self, area: &str) -> bool {
        self.areas.is_empty() || self.areas.iter().any(|a| a == area)
    }

    fn filter_matches(&self, identity: &Identity) -> bool {
        if self.filters.is_empty() {
            return true;
        }
        let group = identity.group.to_lowercase();
        let assertion = identity.assertion.to_lowercase();
        self.filters.iter().any(|filter| {
            let filter = filter.to_lowercase();
            group.contains(&filter) || assertion.contains(&filter)
        })
    }

    /// Whether a test is requested by this selection
    pub fn matches(&self, identity: &Identity) -> bool {
        self.area_enabled(&identity.area) && self.filter_matches(identity)
    }
}

/// Fixed collection of tests, grouped by protocol area in insertion order
#[derive(Debug)]
pub struct Catalog<C> {
    tests: Vec<TestRef<C>>,
    identities: HashSet<Identity>,
}

impl<C> Catalog<C> {
    pub fn new() -> Self {
        Self {
            tests: Vec::new(),
            identities: HashSet::new(),
        }
    }

    /// Register a test, returning its handle for use as a dependency
    pub fn add(&mut self, test: TestRef<C>) -> CatalogResult<TestRef<C>> {
        if !self.identities.insert(test.identity().clone()) {
            return Err(CatalogError::DuplicateIdentity(test.identity().clone()));
        }
        self.tests.push(Arc::clone(&test));
        Ok(test)
    }

    pub fn tests(&self) -> &[TestRef<C>] {
        &self.tests
    }

    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }

    pub fn get(&self, identity: &Identity) -> Option<&TestRef<C>> {
        self.tests.iter().find(|t| t.identity() == identity)
    }

    /// Protocol areas in first-registered order
    pub fn areas(&self) -> Vec<&str> {
        let mut areas: Vec<&str> = Vec::new();
        for test in &self.tests {
            if !areas.contains(&test.area()) {
                areas.push(test.area());
            }
        }
        areas
    }

    pub fn has_area(&self, area: &str) -> bool {
        self.tests.iter().any(|t| t.area() == area)
    }

    /// Requested top-level tests for a selection, in catalog order
    pub fn select(&self, selection: &Selection) -> CatalogResult<Vec<TestRef<C>>> {
        if let Some(unknown) = selection.areas.iter().find(|a| !self.has_area(a)) {
            return Err(CatalogError::unknown_area(unknown.as_str()));
        }

        let selected: Vec<_> = self
            .tests
            .iter()
            .filter(|t| selection.matches(t.identity()))
            .map(Arc::clone)
            .collect();

        debug!(
            target: "conform::catalog",
            total = self.tests.len(),
            selected = selected.len(),
            "Selected tests"
        );
        Ok(selected)
    }
}

impl<C> Default for Catalog<C> {
    fn default() -> Self {
        Self::new()
    }
}
