//! CLI command implementations

pub mod list;
pub mod plan;
pub mod run;

use crate::catalog::{self, FakeService};
use anyhow::{Context, Result};
use conform_config::{Config, ConfigLoader, RunConfig};
use conform_engine::{Catalog, Selection, TestRef};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Where the run configuration comes from, and the CLI's narrowing of it
#[derive(Debug, Clone)]
pub struct Selector {
    /// Filters from the command line; replace configured filters when given
    pub filters: Vec<String>,
    /// Areas from the command line; replace configured areas when given
    pub areas: Vec<String>,
    /// Explicit config file instead of searching for conform.toml
    pub config_file: Option<PathBuf>,
    /// Directory to start the conform.toml search from
    pub dir: PathBuf,
}

impl Default for Selector {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
            areas: Vec::new(),
            config_file: None,
            dir: PathBuf::from("."),
        }
    }
}

impl Selector {
    /// Load configuration and apply command-line overrides
    pub fn load(&self) -> Result<Config> {
        let loader = ConfigLoader::new();
        let mut config = match &self.config_file {
            Some(path) => loader.load_from_file(path)?,
            None => {
                // The upward search needs real parents to walk
                let dir = if self.dir.is_absolute() {
                    self.dir.clone()
                } else {
                    std::env::current_dir()?.join(&self.dir)
                };
                loader.load_from_directory(&dir)?
            }
        };

        if !self.areas.is_empty() {
            config.run.run.areas = self.areas.clone();
        }
        if !self.filters.is_empty() {
            config.run.run.filters = self.filters.clone();
        }
        Ok(config)
    }
}

/// A validated configuration with the tests it requests
pub struct Prepared {
    pub config: Config,
    pub catalog: Catalog<RunConfig>,
    pub requested: Vec<TestRef<RunConfig>>,
}

/// Load, validate and select. Any error here means nothing runs.
pub fn prepare(selector: &Selector) -> Result<Prepared> {
    let config = selector.load()?;
    let catalog = catalog::builtin(Arc::new(FakeService::new()))?;

    let known = catalog.areas();
    config
        .run
        .validate(&known)
        .context("Invalid run configuration")?;

    let selection = Selection::all()
        .with_areas(config.run.enabled_areas(&known))
        .with_filters(config.run.filters().iter().cloned());
    let requested = catalog.select(&selection)?;

    debug!(
        target: "conform::cli",
        project = ?config.project_root(),
        areas = ?selection.areas,
        requested = requested.len(),
        "prepared run"
    );

    Ok(Prepared {
        config,
        catalog,
        requested,
    })
}
