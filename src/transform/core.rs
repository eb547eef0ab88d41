//! Core transformer trait.

use std::fmt;

use crate::attr::Value;
use crate::error::{ViewError, ViewResult};
use crate::hash::StableHasher;
use crate::node::Fragment;

/// Converts foreign-format source into a [`Fragment`].
///
/// A transformer is configured through a flat key/value surface and must be
/// deterministic for a fixed `(source, configuration)`.
pub trait Transformer: fmt::Debug + Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Apply one configuration entry.
    ///
    /// Returns `Ok(false)` when `key` is not an option of this transformer;
    /// the caller then treats it as an attribute of the container element.
    fn set_option(&mut self, key: &str, value: &Value) -> ViewResult<bool> {
        let _ = (key, value);
        Ok(false)
    }

    /// Convert `source` into a fragment.
    fn transform(&self, source: &str) -> ViewResult<Fragment> {
        let _ = source;
        Err(ViewError::not_implemented("transform"))
    }

    /// Feed the current configuration into `hasher`.
    ///
    /// Two configurations that render differently must hash differently.
    fn fingerprint(&self, hasher: StableHasher) -> StableHasher {
        hasher
    }
}

// =============================================================================
// Option helpers
// =============================================================================

pub(crate) fn option_bool(transformer: &'static str, key: &str, value: &Value) -> ViewResult<bool> {
    value
        .as_bool()
        .ok_or_else(|| ViewError::invalid_option(transformer, key, format!("expected bool, found {}", value.shape())))
}

pub(crate) fn option_int(transformer: &'static str, key: &str, value: &Value) -> ViewResult<i64> {
    value
        .as_int()
        .ok_or_else(|| ViewError::invalid_option(transformer, key, format!("expected int, found {}", value.shape())))
}

/// Text option; `Unset` reads as the empty string.
pub(crate) fn option_text(transformer: &'static str, key: &str, value: &Value) -> ViewResult<String> {
    match value {
        Value::Unset => Ok(String::new()),
        Value::Text(s) => Ok(s.to_string()),
        other => Err(ViewError::invalid_option(
            transformer,
            key,
            format!("expected text, found {}", other.shape()),
        )),
    }
}

/// List of text tokens; a single text value reads as a one-item list.
pub(crate) fn option_list(transformer: &'static str, key: &str, value: &Value) -> ViewResult<Vec<String>> {
    match value {
        Value::Unset => Ok(Vec::new()),
        Value::Text(s) => Ok(vec![s.to_string()]),
        Value::List(items) => items
            .iter()
            .map(|item| {
                item.as_str().map(str::to_string).ok_or_else(|| {
                    ViewError::invalid_option(transformer, key, format!("expected text items, found {}", item.shape()))
                })
            })
            .collect(),
        other => Err(ViewError::invalid_option(
            transformer,
            key,
            format!("expected list, found {}", other.shape()),
        )),
    }
}
