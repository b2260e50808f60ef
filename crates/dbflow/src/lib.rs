//! DBFlow Rust: compile-time object-relational mapping for embedded SQLite
//! storage.
//!
//! This facade re-exports the workspace crates and adds the runtime side:
//! database definitions, the process-wide registry, migrations, model
//! persistence and the transaction-queue boundary.
//!
//! # Example
//!
//! ```ignore
//! use dbflow::prelude::*;
//!
//! #[derive(Table, Debug, Default, Clone)]
//! #[table(database = "League")]
//! struct Hero {
//!     #[primary_key(autoincrement)]
//!     id: i64,
//!     #[column]
//!     #[not_null]
//!     name: String,
//! }
//!
//! let definition = DatabaseBuilder::new("League", 1).table::<Hero>().build()?;
//! definition.on_create(&db)?;
//! dbflow::register_database(definition)?;
//!
//! let mut hero = Hero { name: "Spider-Boy".into(), ..Hero::default() };
//! hero.save(&db)?;
//! let heroes: Vec<Hero> = dbflow::query_list(&dbflow::select_from::<Hero>()?.into_where(), &db)?;
//! ```

pub mod definition;
pub mod error;
pub mod migration;
pub mod persistence;
pub mod registry;
pub mod table;
pub mod transaction;

pub use dbflow_schema as schema;

pub use dbflow_core::{
    Blob, BooleanConverter, CharConverter, Collate, ConflictAction, ContentValues, CursorGetter,
    DatabaseStatement, DatabaseWrapper, Error, FieldKind, FieldValue, FlowCursor, FromFieldValue,
    IntoFieldValue, Model, ModelHooks, ReferentialAction, Result, SqlEnum, StatementBinder,
    StoragePrimitive, TypeConverter, Value, convert_to_db, converter_for_type, converter_named,
    custom_from_field_value, custom_required, custom_to_field_value, model_from_record,
    model_to_record, register_converter,
};
pub use dbflow_macros::{SqlEnum, Table};
pub use dbflow_query::{
    CompletedTrigger, Condition, ConditionGroup, Delete, From, Index, Insert, Join, JoinKind,
    Method, ModelAdapter, NameAlias, Operand, Operator, OrderBy, Query, QueryBuilder, Select,
    Separator, Set, Trigger, TriggerMethod, TriggerTiming, Update, Where, saver, select,
};
pub use dbflow_schema::{EntityKind, PlanAdapter};

pub use definition::{DatabaseBuilder, DatabaseDefinition};
pub use error::BuildError;
pub use migration::{AlterTableMigration, IndexMigration, Migration, UpdateTableMigration};
pub use persistence::{ModelPersistence, query_list, query_single, select_from};
pub use registry::{
    adapter_for, database, database_for, database_for_entity, database_names, register_database,
    unregister_database,
};
pub use table::Table;
pub use transaction::{
    QueuedTransaction, StoreModelsTransaction, StoreOperation, Transaction, TransactionQueue,
};

/// Common imports. `From` is left out so it does not shadow the std trait;
/// reach it as `dbflow::From` or through [`Select::from`].
pub mod prelude {
    pub use crate::{
        AlterTableMigration, BuildError, Collate, ConditionGroup, ConflictAction, DatabaseBuilder,
        DatabaseDefinition, DatabaseStatement, DatabaseWrapper, Delete, EntityKind, Error,
        FieldValue, FlowCursor, IndexMigration, Insert, Migration, Model, ModelAdapter, ModelHooks,
        ModelPersistence, Operator, OrderBy, Query, QueuedTransaction, ReferentialAction, Result,
        Select, SqlEnum, StoragePrimitive, Table, Transaction, TransactionQueue, TypeConverter,
        Update, UpdateTableMigration, Value, Where,
    };
}
