//! Validation rules.
//!
//! Every validator records problems into [`crate::Diagnostics`] and returns
//! whether the checked element is usable. None of them stop at the first
//! problem.

mod column;
mod relation;
mod table;

pub use column::validate_column;
pub use relation::{
    validate_converter, validate_database, validate_endpoint, validate_migration,
    validate_one_to_many,
};
pub use table::validate_table;
