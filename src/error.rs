//! Error types for tola-view.
//!
//! Every failure propagates synchronously to the render caller. Nothing here
//! is transient, so there is no retry policy.

use thiserror::Error;

use crate::id::NodeId;

/// Errors that can occur while building, updating or rendering a view.
#[derive(Debug, Error)]
pub enum ViewError {
    /// A render-target or transformer capability was called on a binding
    /// that does not provide it.
    #[error("`{capability}` is not implemented by this binding")]
    NotImplemented {
        /// Name of the missing capability
        capability: &'static str,
    },

    /// The codec cannot encode this value for this attribute.
    #[error("unsupported attribute kind for `{attr}`: {kind} cannot encode {found}")]
    UnsupportedAttributeKind {
        /// Attribute name
        attr: String,
        /// Declared (or requested) kind
        kind: String,
        /// Shape of the offending value
        found: &'static str,
    },

    /// Foreign content uses a format version this transformer does not render.
    #[error("format version mismatch: expected v{expected}, found v{found}")]
    FormatVersion {
        /// Version the transformer is configured for
        expected: u32,
        /// Version found in the source (or requested by configuration)
        found: u32,
    },

    /// A looper was bound to something that is not a sequence.
    #[error("reconciliation failed: {0}")]
    Reconciliation(String),

    /// Structural query could not be parsed.
    #[error("invalid query `{query}`: {reason}")]
    InvalidQuery {
        /// The query text
        query: String,
        /// What went wrong
        reason: String,
    },

    /// A change record names a node that no longer exists.
    #[error("stale node {0}")]
    StaleNode(NodeId),

    /// A render-target mutation names a released handle.
    #[error("stale render-target handle {0}")]
    StaleHandle(String),

    /// A structural mutation would corrupt the render-target tree.
    #[error("invalid tree operation: {0}")]
    Structure(String),

    /// A binding or render call names a variable the view never declared.
    #[error("unknown view variable `{0}`")]
    UnknownVariable(String),

    /// A transformer option has the wrong value shape.
    #[error("invalid `{key}` option for {transformer}: {reason}")]
    InvalidOption {
        /// Transformer name
        transformer: &'static str,
        /// Option key
        key: String,
        /// What went wrong
        reason: String,
    },

    /// Markup source could not be parsed into a fragment.
    #[error("markup parse error: {0}")]
    Markup(String),

    /// Notebook source is not a valid notebook document.
    #[error("notebook error: {0}")]
    Notebook(String),

    /// A render-target binding violates the capability contract.
    #[error("conformance check failed: {0}")]
    Conformance(String),
}

/// Result type alias for view operations.
pub type ViewResult<T> = Result<T, ViewError>;

impl ViewError {
    /// Create a missing-capability error.
    pub fn not_implemented(capability: &'static str) -> Self {
        Self::NotImplemented { capability }
    }

    /// Create a codec error for an attribute.
    pub fn unsupported(attr: impl Into<String>, kind: impl ToString, found: &'static str) -> Self {
        Self::UnsupportedAttributeKind {
            attr: attr.into(),
            kind: kind.to_string(),
            found,
        }
    }

    /// Create an invalid-option error.
    pub fn invalid_option(
        transformer: &'static str,
        key: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidOption {
            transformer,
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Create a query error.
    pub fn invalid_query(query: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidQuery {
            query: query.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error signals a missing integration rather than bad input.
    pub fn is_not_implemented(&self) -> bool {
        matches!(self, Self::NotImplemented { .. })
    }
}

#[cfg(feature = "notebook")]
impl From<serde_json::Error> for ViewError {
    fn from(err: serde_json::Error) -> Self {
        Self::Notebook(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ViewError::FormatVersion { expected: 4, found: 3 };
        assert_eq!(err.to_string(), "format version mismatch: expected v4, found v3");

        let err = ViewError::not_implemented("find");
        assert_eq!(err.to_string(), "`find` is not implemented by this binding");
        assert!(err.is_not_implemented());

        let err = ViewError::unsupported("class", "boolean-presence", "list");
        assert_eq!(
            err.to_string(),
            "unsupported attribute kind for `class`: boolean-presence cannot encode list"
        );
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ViewError>();
    }
}
