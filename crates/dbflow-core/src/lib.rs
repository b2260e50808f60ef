//! Core types and traits for DBFlow Rust.
//!
//! `dbflow-core` is the **foundation layer** of the workspace. It defines the
//! value model, the storage-engine contract and the instance-access traits that
//! every other crate builds on.
//!
//! # Role In The Architecture
//!
//! - **Value/type mapping**: `FieldKind`, `StoragePrimitive`, `CursorGetter` and
//!   `StatementBinder` decide how each field is stored, bound and read back.
//! - **Contract layer**: `DatabaseWrapper`, `DatabaseStatement` and `FlowCursor`
//!   are implemented by storage drivers; `Model` and `ModelHooks` are
//!   implemented (usually derived) by user types.
//! - **Converters**: `TypeConverter` plus a process-wide registry for custom
//!   field types, with built-in converters for `bool` and `char`.
//!
//! # Who Uses This Crate
//!
//! - `dbflow-query` renders `Value`s into SQL text and executes against
//!   `DatabaseWrapper`.
//! - `dbflow-schema` maps declarations onto `FieldKind`/`StoragePrimitive` and
//!   drives `Model` accessors from its generated adapter plans.
//! - `dbflow-macros` generates `Model`, `ModelHooks` and `SqlEnum` impls.
//!
//! Most applications should use the `dbflow` facade.

pub mod converter;
pub mod database;
pub mod error;
pub mod identifiers;
pub mod model;
pub mod types;
pub mod value;

pub use converter::{
    BooleanConverter, CharConverter, ConverterRegistry, ErasedConverter, TypeConverter,
    convert_to_db, converter_for_type, converter_named, register_converter, short_type_name,
};
pub use database::{ContentValues, DatabaseStatement, DatabaseWrapper, FlowCursor};
pub use error::{Error, Result};
pub use identifiers::{quote_ident, sanitize_identifier, sql_escape_string, strip_quotes};
pub use model::{Model, ModelHooks, model_from_record, model_to_record};
pub use types::{
    Collate, ConflictAction, CursorGetter, FieldKind, ReferentialAction, SqlEnum,
    StatementBinder, StoragePrimitive,
};
pub use value::{
    Blob, FieldValue, FromFieldValue, IntoFieldValue, Value, custom_from_field_value,
    custom_required, custom_to_field_value,
};
