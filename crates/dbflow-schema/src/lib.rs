//! Schema model, validation and adapter generation for DBFlow Rust.
//!
//! `dbflow-schema` is the **generation layer**. It takes entity, database,
//! converter and migration declarations and produces, per entity, an
//! [`AdapterPlan`]: resolved columns, DDL, statement SQL and binder trees.
//!
//! # Role In The Architecture
//!
//! - **Declarations** (`decl`): what a derive macro or a JSON manifest says
//!   about a type, before any resolution.
//! - **Schema model** (`column`, `table`): resolved columns, keys and
//!   groups, built in two phases so foreign keys can reference entities in
//!   any order.
//! - **Validation** (`validate`): every rule reports into [`Diagnostics`]
//!   and keeps going; one bad entity never hides problems in the others.
//! - **Output** (`ddl`, `codegen`): table/view/index DDL, adapter plans,
//!   the per-database registry plan and optionally printed Rust source.
//! - **Runtime** (`adapter`): [`PlanAdapter`] runs an adapter plan directly,
//!   and the helper functions printed adapters call.
//!
//! # Example
//!
//! ```ignore
//! use dbflow_schema::{GenerationContext, SchemaManifest};
//!
//! let manifest = SchemaManifest::from_json(&std::fs::read_to_string("schema.json")?)?;
//! let output = GenerationContext::from_manifest(manifest).generate();
//! for diagnostic in &output.diagnostics {
//!     eprintln!("{}: {}", diagnostic.location(), diagnostic.message);
//! }
//! ```

pub mod adapter;
pub mod builder;
pub mod codegen;
pub mod column;
pub mod config;
pub mod context;
pub mod ddl;
pub mod decl;
pub mod diagnostics;
pub mod resolver;
pub mod table;
pub mod validate;

pub use adapter::{PlanAdapter, field_at, nested_record, read_value};
pub use codegen::{AdapterPlan, DatabasePlan, RegistryPlan, plan_adapter, plan_registry};
pub use column::{ColumnSchema, ValueCodec};
pub use config::{DEFAULT_FOREIGN_KEY_TEMPLATE, GeneratorConfig};
pub use context::{GenerationContext, GenerationOutput};
pub use decl::{
    ColumnAttr, ContentUriDecl, DatabaseDecl, EndpointDecl, EntityDecl, EntityKind,
    ForeignKeyAttr, IndexAttr, IndexGroupDecl, InheritedColumnDecl, InheritedPrimaryKeyDecl,
    MemberAnnotations, MemberDecl, MigrationDecl, NotNullAttr, OneToManyDecl, OneToManyMethod,
    PrimaryKeyAttr, ReferenceDecl, SchemaManifest, TableAttr, TypeConverterDecl, TypeRef,
    UniqueAttr, UniqueGroupDecl,
};
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use table::{IndexGroup, OneToManyRelation, TableSchema};
