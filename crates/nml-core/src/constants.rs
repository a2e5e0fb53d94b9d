//! # Named Constants
//!
//! The constant table is supplied by the configuration and referenced by
//! identifier tokens inside `x-fortran-shape` and `x-fortran-len`. Any
//! token used as a dimension or length must resolve here to a positive
//! integer.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Value of a configured constant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConstantValue {
    /// Integer constant, usable as a dimension or length.
    Integer(i64),
    /// Real constant, only emitted into the helper module.
    Real(f64),
}

/// Table of named constants, ordered by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constants {
    values: BTreeMap<String, ConstantValue>,
}

impl Constants {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a constant.
    pub fn insert(&mut self, name: impl Into<String>, value: ConstantValue) {
        self.values.insert(name.into(), value);
    }

    /// Look up a constant by name.
    pub fn get(&self, name: &str) -> Option<ConstantValue> {
        self.values.get(name).copied()
    }

    /// Number of constants.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, ConstantValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Resolve `name` as a positive integer. `what` names the usage
    /// (e.g. "dimension constant", "length constant") in the error.
    pub fn resolve_positive(&self, name: &str, what: &str) -> Result<u64, ConfigError> {
        match self.get(name) {
            None => Err(ConfigError::new(format!(
                "{what} '{name}' is not defined in config"
            ))),
            Some(ConstantValue::Real(_)) => Err(ConfigError::new(format!(
                "{what} '{name}' must be an integer"
            ))),
            Some(ConstantValue::Integer(v)) if v <= 0 => Err(ConfigError::new(format!(
                "{what} '{name}' must be positive (got {v})"
            ))),
            Some(ConstantValue::Integer(v)) => Ok(v as u64),
        }
    }
}

impl FromIterator<(String, ConstantValue)> for Constants {
    fn from_iter<T: IntoIterator<Item = (String, ConstantValue)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}
