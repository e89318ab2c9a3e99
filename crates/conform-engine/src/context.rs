//! Run-scoped context store and the per-test view of it
//!
//! A run owns exactly one [`ContextStore`]. Test bodies never see the store
//! itself; they receive a [`TestContext`] holding only the keys they declared.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors raised by a test body misusing its context view
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContextError {
    #[error("context key '{0}' was not declared as expected")]
    UndeclaredExpect(String),

    #[error("context key '{0}' was not declared as provided")]
    UndeclaredProvide(String),

    #[error("context key '{key}' has an unexpected shape: {reason}")]
    InvalidValue { key: String, reason: String },
}

/// Key/value state shared across the tests of one run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContextStore {
    values: BTreeMap<String, Value>,
}

impl ContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Insert a value, returning the previous one if the key was already set
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.values.insert(key.into(), value)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// First key of `keys` that is not present in the store
    pub(crate) fn first_missing<'a, I>(&self, keys: I) -> Option<&'a str>
    where
        I: IntoIterator<Item = &'a String>,
    {
        keys.into_iter()
            .find(|key| !self.values.contains_key(key.as_str()))
            .map(String::as_str)
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for ContextStore {
    fn from_iter<T: IntoIterator<Item = (K, Value)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// A test's view of the context: its expected values, already populated,
/// and placeholders for the values it provides.
#[derive(Debug, Clone, Default)]
pub struct TestContext {
    expects: BTreeMap<String, Value>,
    provides: BTreeMap<String, Option<Value>>,
}

impl TestContext {
    /// Build a view for the given declarations, copying expected values out
    /// of the store. Keys absent from the store are simply not populated.
    pub fn new<'a, E, P>(store: &ContextStore, expects: E, provides: P) -> Self
    where
        E: IntoIterator<Item = &'a String>,
        P: IntoIterator<Item = &'a String>,
    {
        let expects = expects
            .into_iter()
            .filter_map(|key| store.get(key).map(|v| (key.clone(), v.clone())))
            .collect();
        let provides = provides.into_iter().map(|key| (key.clone(), None)).collect();
        Self { expects, provides }
    }

    /// Read an expected value
    pub fn expected(&self, key: &str) -> Result<&Value, ContextError> {
        self.expects
            .get(key)
            .ok_or_else(|| ContextError::UndeclaredExpect(key.to_string()))
    }

    /// Read an expected value that must be a string
    pub fn expected_str(&self, key: &str) -> Result<&str, ContextError> {
        self.expected(key)?
            .as_str()
            .ok_or_else(|| ContextError::InvalidValue {
                key: key.to_string(),
                reason: "expected a string".to_string(),
            })
    }

    /// Fill a provided placeholder
    pub fn provide(&mut self, key: &str, value: impl Into<Value>) -> Result<(), ContextError> {
        match self.provides.get_mut(key) {
            Some(slot) => {
                *slot = Some(value.into());
                Ok(())
            }
            None => Err(ContextError::UndeclaredProvide(key.to_string())),
        }
    }

    /// First declared provided key still left unset
    pub fn first_unset(&self) -> Option<&str> {
        self.provides
            .iter()
            .find(|(_, value)| value.is_none())
            .map(|(key, _)| key.as_str())
    }

    /// Move provided values into the store
    pub(crate) fn commit(self, store: &mut ContextStore) {
        for (key, value) in self.provides {
            if let Some(value) = value {
                store.insert(key, value);
            }
        }
    }
}
