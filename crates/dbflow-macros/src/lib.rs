//! Procedural macros for DBFlow Rust.
//!
//! - `#[derive(Table)]` implements `Model`, `ModelHooks` (unless
//!   `#[table(hooks)]` asks for a hand-written one), the field-value
//!   traits and `Table::entity_decl()`.
//! - `#[derive(SqlEnum)]` persists a unit-only enum by variant name.
//!
//! # Example
//!
//! ```ignore
//! use dbflow::{SqlEnum, Table};
//!
//! #[derive(SqlEnum, Clone, Copy, Default)]
//! enum Rank {
//!     #[default]
//!     Rookie,
//!     Veteran,
//! }
//!
//! #[derive(Table, Default)]
//! #[table(database = "League", insert_conflict = "replace")]
//! struct Hero {
//!     #[primary_key(autoincrement)]
//!     id: i64,
//!     #[column(length = 64)]
//!     #[not_null]
//!     name: String,
//!     #[column(sql_enum)]
//!     rank: Rank,
//! }
//! ```

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod attrs;
mod sql_enum_derive;
mod table_derive;

/// Derive `Model` and the declaration facts for a table, view or query model.
///
/// Struct attributes (`#[table(...)]`): `database` (required), `name`,
/// `all_fields`, `caching`, `hooks`, `view = "SELECT ..."`, `query_model`,
/// `insert_conflict`, `update_conflict`, `primary_key_conflict`,
/// `unique_group(number, on_conflict)`, `index_group(number, name, unique)`,
/// `one_to_many(name, methods, target)`.
///
/// Field attributes: `#[column(...)]`, `#[primary_key(...)]`,
/// `#[foreign_key(...)]`, `#[not_null(...)]`, `#[unique(...)]`,
/// `#[index(...)]`.
#[proc_macro_derive(
    Table,
    attributes(table, column, primary_key, foreign_key, not_null, unique, index)
)]
pub fn derive_table(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match table_derive::parse_table(&input) {
        Ok(def) => table_derive::generate_table_impl(&def).into(),
        Err(e) => e.to_compile_error().into(),
    }
}

/// Derive `SqlEnum` and the field-value traits for a unit-only enum.
///
/// `#[sql_enum(name = "...")]` on a variant overrides its stored name.
#[proc_macro_derive(SqlEnum, attributes(sql_enum))]
pub fn derive_sql_enum(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match sql_enum_derive::parse_sql_enum(&input) {
        Ok(def) => sql_enum_derive::generate_sql_enum_impl(&def).into(),
        Err(e) => e.to_compile_error().into(),
    }
}
