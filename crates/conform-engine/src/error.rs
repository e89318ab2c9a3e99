/// Engine error types
use crate::descriptor::Identity;
use thiserror::Error;

pub type PlanResult<T> = Result<T, PlanError>;
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Errors from non-executing graph expansion
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("Circular dependency detected: {}", format_cycle(.cycle))]
    DependencyCycle { cycle: Vec<Identity> },
}

/// Errors building or querying a test catalog
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Duplicate test identity: {0}")]
    DuplicateIdentity(Identity),

    #[error("Unknown protocol area: {area}")]
    UnknownArea { area: String },
}

impl PlanError {
    /// Create a cycle error from the identities forming the loop
    pub fn cycle(cycle: Vec<Identity>) -> Self {
        Self::DependencyCycle { cycle }
    }
}

impl CatalogError {
    pub fn unknown_area(area: impl Into<String>) -> Self {
        Self::UnknownArea { area: area.into() }
    }
}

pub(crate) fn format_cycle(cycle: &[Identity]) -> String {
    cycle
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}
