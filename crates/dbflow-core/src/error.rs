//! Error types shared by every DBFlow crate.
//!
//! Build-time schema problems are not errors in this sense: they are
//! collected as diagnostics by `dbflow-schema`. `Error` covers runtime
//! failures, which are either caller precondition violations (fail-fast,
//! never retried) or storage-engine failures propagated unchanged.

use thiserror::Error;

/// Result alias used throughout DBFlow.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Runtime error.
#[derive(Debug, Error)]
pub enum Error {
    /// The storage engine rejected a statement (constraint violation, I/O, ...).
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A query was used in a way its shape does not allow, e.g. listing rows
    /// from a `Where` that is not based on a SELECT.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// `replace_empty_params` received the wrong number of values.
    #[error("expected {expected} parameter values but {actual} were supplied")]
    ParamCountMismatch {
        /// Number of `?` placeholders in the condition group.
        expected: usize,
        /// Number of values supplied by the caller.
        actual: usize,
    },

    /// A condition group mixes `?` placeholders with bound values.
    #[error("a condition group cannot mix empty parameters with bound values")]
    MixedParams,

    /// No value converter is registered for a type.
    #[error("no type converter registered for `{0}`")]
    MissingConverter(String),

    /// A value could not be converted between its field and storage forms.
    #[error("conversion failed: {0}")]
    Conversion(String),

    /// A model does not expose a field with the given name.
    #[error("unknown field `{field}` on `{model}`")]
    UnknownField {
        /// Model type name.
        model: &'static str,
        /// Requested field name.
        field: String,
    },

    /// A field received a value of the wrong kind.
    #[error("field `{field}` expects {expected}, found {found}")]
    TypeMismatch {
        /// Field name.
        field: String,
        /// Expected kind.
        expected: &'static str,
        /// Kind actually supplied.
        found: &'static str,
    },

    /// A model, database or adapter was looked up before registration.
    #[error("`{0}` is not registered")]
    NotRegistered(String),

    /// A schema manifest could not be parsed.
    #[error("manifest error: {0}")]
    Manifest(#[from] serde_json::Error),
}

impl Error {
    /// Wrap a storage-engine failure.
    pub fn storage(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Error::Storage(err.into())
    }

    /// Whether this error is a caller precondition violation rather than a
    /// storage failure.
    #[must_use]
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Error::InvalidQuery(_) | Error::ParamCountMismatch { .. } | Error::MixedParams
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_keeps_message() {
        let err = Error::storage("NOT NULL constraint failed: Hero.name");
        assert_eq!(
            err.to_string(),
            "storage error: NOT NULL constraint failed: Hero.name"
        );
        assert!(!err.is_precondition());
    }

    #[test]
    fn test_param_mismatch_is_precondition() {
        let err = Error::ParamCountMismatch {
            expected: 2,
            actual: 3,
        };
        assert!(err.is_precondition());
        assert_eq!(
            err.to_string(),
            "expected 2 parameter values but 3 were supplied"
        );
    }
}
