//! Errors raised while assembling a database definition.

use dbflow_schema::Diagnostics;
use thiserror::Error;

/// A [`crate::DatabaseBuilder`] could not produce a definition.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Generating adapters for the registered tables reported errors.
    #[error("database `{database}` failed generation with {} error(s)", diagnostics.error_count())]
    Generation {
        database: String,
        diagnostics: Diagnostics,
    },

    /// The same model type was registered twice.
    #[error("`{entity}` is registered more than once in `{database}`")]
    DuplicateEntity { database: String, entity: String },

    /// A table declares a different owning database than the builder.
    #[error("`{entity}` belongs to database `{declared}`, not `{database}`")]
    WrongDatabase {
        database: String,
        entity: String,
        declared: String,
    },

    /// A database with this name is already registered.
    #[error("database `{0}` is already registered")]
    DuplicateDatabase(String),
}
