//! Field-level validation accumulator shared by all modules.

use std::collections::{BTreeMap, HashSet};
use std::hash::Hash;

/// Field name to message map surfaced to clients.
pub type ValidationErrors = BTreeMap<String, String>;

/// Collects the outcome of independent checks against named fields.
///
/// Every failing check is remembered in order, while [`Validator::errors`]
/// keeps only the first message recorded for each field.
#[derive(Debug, Default, Clone)]
pub struct Validator {
    failures: Vec<(String, String)>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no check has failed.
    pub fn valid(&self) -> bool {
        self.failures.is_empty()
    }

    /// Record `message` against `key`.
    pub fn add_error(&mut self, key: impl Into<String>, message: impl Into<String>) {
        self.failures.push((key.into(), message.into()));
    }

    /// Record `message` against `key` unless `ok` holds.
    pub fn check(&mut self, ok: bool, key: &str, message: &str) {
        if !ok {
            self.add_error(key, message);
        }
    }

    /// All failed checks, in the order they were made.
    pub fn failures(&self) -> &[(String, String)] {
        &self.failures
    }

    /// Whether `key` failed with exactly `message`.
    pub fn has_failure(&self, key: &str, message: &str) -> bool {
        self.failures
            .iter()
            .any(|(k, m)| k == key && m == message)
    }

    /// First failing message per field.
    pub fn errors(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        for (key, message) in &self.failures {
            errors
                .entry(key.clone())
                .or_insert_with(|| message.clone());
        }
        errors
    }

    pub fn into_errors(self) -> ValidationErrors {
        self.errors()
    }
}

/// True if `value` is one of `permitted`.
pub fn permitted_value<T: PartialEq + ?Sized>(value: &T, permitted: &[&T]) -> bool {
    permitted.iter().any(|candidate| *candidate == value)
}

/// True if no element appears twice.
pub fn unique<T: Eq + Hash>(values: &[T]) -> bool {
    let mut seen = HashSet::with_capacity(values.len());
    values.iter().all(|value| seen.insert(value))
}
