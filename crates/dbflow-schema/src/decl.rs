//! Declaration facts: the input of the generation pipeline.
//!
//! A declaration describes an entity the way its source declares it:
//! members, their types and their annotations. Nothing here is resolved or
//! validated. Declarations come from `#[derive(Table)]` or from a JSON
//! [`SchemaManifest`].

use dbflow_core::{Collate, ConflictAction, FieldKind, ReferentialAction, Result};
use serde::{Deserialize, Serialize};

use crate::config::GeneratorConfig;

/// Logical type of a member, before conversion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum TypeRef {
    /// A built-in field kind.
    Primitive(FieldKind),
    /// An enum stored by variant name.
    Enum(String),
    /// Another entity, stored through foreign-key columns.
    Model(String),
    /// Any other type; needs a value converter.
    Custom(String),
}

impl TypeRef {
    /// Type name for messages and printed source.
    #[must_use]
    pub fn type_name(&self) -> &str {
        match self {
            TypeRef::Primitive(kind) => kind.rust_name(),
            TypeRef::Enum(name) | TypeRef::Model(name) | TypeRef::Custom(name) => name,
        }
    }

    #[must_use]
    pub fn is_model(&self) -> bool {
        matches!(self, TypeRef::Model(_))
    }

    #[must_use]
    pub fn is_enum(&self) -> bool {
        matches!(self, TypeRef::Enum(_))
    }
}

/// What kind of storage object an entity maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    #[default]
    Table,
    /// A view over a defining SELECT.
    View,
    /// A load-only projection of an arbitrary query.
    QueryModel,
}

/// Column-level overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnAttr {
    /// Storage column name override.
    pub name: Option<String>,
    pub length: Option<u32>,
    /// String-encoded default value, emitted verbatim into DDL.
    pub default_value: Option<String>,
    pub collate: Option<Collate>,
    /// Explicit value converter, by name.
    pub type_converter: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrimaryKeyAttr {
    pub autoincrement: bool,
    /// A rowid alias: engine-assigned like autoincrement, without the
    /// AUTOINCREMENT keyword.
    pub rowid: bool,
}

/// One explicit local-column to target-column pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceDecl {
    /// Local storage column name.
    pub column_name: String,
    /// Storage column on the target entity.
    pub foreign_key_column_name: String,
    /// Declared local type, checked against the target column.
    #[serde(default)]
    pub column_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForeignKeyAttr {
    /// Target entity; defaults to the member's model type.
    pub table: Option<String>,
    /// Explicit reference pairs; empty means one per target primary key.
    pub references: Vec<ReferenceDecl>,
    pub on_delete: ReferentialAction,
    pub on_update: ReferentialAction,
    pub deferred: bool,
    /// Column naming template for implicit references, e.g. `{field}_{column}`.
    pub naming: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotNullAttr {
    pub on_null_conflict: ConflictAction,
}

impl Default for NotNullAttr {
    fn default() -> Self {
        Self {
            on_null_conflict: ConflictAction::Fail,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UniqueAttr {
    /// Column-level UNIQUE constraint.
    pub unique: bool,
    /// Unique-group memberships.
    pub groups: Vec<i32>,
    pub on_unique_conflict: ConflictAction,
}

impl Default for UniqueAttr {
    fn default() -> Self {
        Self {
            unique: true,
            groups: Vec::new(),
            on_unique_conflict: ConflictAction::Fail,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexAttr {
    /// Index-group memberships; empty means a single-column index.
    pub groups: Vec<i32>,
}

/// Annotations on one member.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemberAnnotations {
    pub column: Option<ColumnAttr>,
    pub primary_key: Option<PrimaryKeyAttr>,
    pub foreign_key: Option<ForeignKeyAttr>,
    pub not_null: Option<NotNullAttr>,
    pub unique: Option<UniqueAttr>,
    pub index: Option<IndexAttr>,
    pub ignore: bool,
}

impl MemberAnnotations {
    /// Whether the member is explicitly declared persistent.
    #[must_use]
    pub fn marks_column(&self) -> bool {
        self.column.is_some() || self.primary_key.is_some() || self.foreign_key.is_some()
    }
}

/// One member of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberDecl {
    pub name: String,
    pub ty: TypeRef,
    /// `Option<T>`.
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub is_final: bool,
    #[serde(default)]
    pub is_private: bool,
    /// Declared on a parent type.
    #[serde(default)]
    pub inherited: bool,
    /// Accessor indirection for encapsulated fields.
    #[serde(default)]
    pub getter: Option<String>,
    #[serde(default)]
    pub setter: Option<String>,
    #[serde(default)]
    pub annotations: MemberAnnotations,
}

impl MemberDecl {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            nullable: false,
            is_static: false,
            is_final: false,
            is_private: false,
            inherited: false,
            getter: None,
            setter: None,
            annotations: MemberAnnotations::default(),
        }
    }

    /// Whether an adapter can reach the value.
    #[must_use]
    pub fn is_accessible(&self) -> bool {
        !self.is_private || (self.getter.is_some() && self.setter.is_some())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniqueGroupDecl {
    pub number: i32,
    #[serde(default)]
    pub on_conflict: ConflictAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexGroupDecl {
    pub number: i32,
    pub name: String,
    #[serde(default)]
    pub unique: bool,
}

/// A parent-type member promoted to a column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InheritedColumnDecl {
    pub field_name: String,
    #[serde(default)]
    pub column: ColumnAttr,
    #[serde(default)]
    pub not_null: Option<NotNullAttr>,
}

/// A parent-type member promoted to a primary key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InheritedPrimaryKeyDecl {
    pub field_name: String,
    #[serde(default)]
    pub column: ColumnAttr,
    #[serde(default)]
    pub primary_key: PrimaryKeyAttr,
}

/// Entity-level attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableAttr {
    /// Table name override; defaults to the entity's type name.
    pub name: Option<String>,
    pub database: String,
    /// Persist every eligible field, not only annotated ones.
    pub all_fields: bool,
    pub caching_enabled: bool,
    pub insert_conflict: ConflictAction,
    pub update_conflict: ConflictAction,
    pub primary_key_conflict: ConflictAction,
    pub unique_groups: Vec<UniqueGroupDecl>,
    pub index_groups: Vec<IndexGroupDecl>,
    pub inherited_columns: Vec<InheritedColumnDecl>,
    pub inherited_primary_keys: Vec<InheritedPrimaryKeyDecl>,
}

/// Lifecycle operations a one-to-many relation participates in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OneToManyMethod {
    Load,
    Save,
    Delete,
    All,
}

/// A method-based one-to-many edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OneToManyDecl {
    /// Relation (accessor) name.
    pub name: String,
    pub methods: Vec<OneToManyMethod>,
    /// Related entity, informational.
    #[serde(default)]
    pub target: Option<String>,
    /// The accessor yields a collection.
    #[serde(default = "default_true")]
    pub returns_collection: bool,
}

fn default_true() -> bool {
    true
}

/// One entity declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDecl {
    pub type_name: String,
    #[serde(default)]
    pub kind: EntityKind,
    #[serde(default)]
    pub table: TableAttr,
    pub members: Vec<MemberDecl>,
    #[serde(default)]
    pub one_to_many: Vec<OneToManyDecl>,
    /// Defining SELECT of a view.
    #[serde(default)]
    pub view_query: Option<String>,
    /// The entity implements a post-load hook.
    #[serde(default)]
    pub has_load_hook: bool,
}

impl EntityDecl {
    pub fn new(type_name: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            kind: EntityKind::Table,
            table: TableAttr {
                database: database.into(),
                ..TableAttr::default()
            },
            members: Vec::new(),
            one_to_many: Vec::new(),
            view_query: None,
            has_load_hook: false,
        }
    }

    #[must_use]
    pub fn member(mut self, member: MemberDecl) -> Self {
        self.members.push(member);
        self
    }

    /// Table name, falling back to the type name.
    #[must_use]
    pub fn table_name(&self) -> &str {
        self.table.name.as_deref().unwrap_or(&self.type_name)
    }
}

/// A value converter declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeConverterDecl {
    pub name: String,
    /// Logical type the converter accepts.
    pub model_type: String,
    /// Rust type of the storage side, e.g. `i64` or `String`.
    pub storage_type: String,
    /// Open type parameters of the converter declaration.
    #[serde(default)]
    pub generic_params: Vec<String>,
}

/// A migration registered for a database version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationDecl {
    pub name: String,
    pub database: String,
    pub version: u32,
    #[serde(default)]
    pub priority: i32,
}

/// One addressable URI of an endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentUriDecl {
    pub path: String,
    #[serde(default)]
    pub content_type: String,
    /// Return type of the accessor that produces this URI, when declared
    /// through a member.
    #[serde(default)]
    pub accessor_return_type: Option<String>,
}

/// A content endpoint exposed by a database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointDecl {
    pub name: String,
    #[serde(default)]
    pub authority: String,
    #[serde(default)]
    pub uris: Vec<ContentUriDecl>,
}

/// Per-database configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseDecl {
    pub name: String,
    pub version: u32,
    #[serde(default)]
    pub insert_conflict: ConflictAction,
    #[serde(default)]
    pub update_conflict: ConflictAction,
    #[serde(default)]
    pub foreign_keys_enforced: bool,
    #[serde(default)]
    pub endpoints: Vec<EndpointDecl>,
}

impl DatabaseDecl {
    pub fn new(name: impl Into<String>, version: u32) -> Self {
        Self {
            name: name.into(),
            version,
            insert_conflict: ConflictAction::None,
            update_conflict: ConflictAction::None,
            foreign_keys_enforced: false,
            endpoints: Vec::new(),
        }
    }
}

/// A complete code-first schema description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaManifest {
    pub config: GeneratorConfig,
    pub databases: Vec<DatabaseDecl>,
    pub entities: Vec<EntityDecl>,
    pub converters: Vec<TypeConverterDecl>,
    pub migrations: Vec<MigrationDecl>,
}

impl SchemaManifest {
    /// Parse a manifest from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annotation_defaults() {
        assert_eq!(NotNullAttr::default().on_null_conflict, ConflictAction::Fail);
        let unique = UniqueAttr::default();
        assert!(unique.unique);
        assert_eq!(unique.on_unique_conflict, ConflictAction::Fail);
    }

    #[test]
    fn test_member_accessibility() {
        let mut member = MemberDecl::new("secret", TypeRef::Primitive(FieldKind::String));
        assert!(member.is_accessible());
        member.is_private = true;
        assert!(!member.is_accessible());
        member.getter = Some("secret".into());
        member.setter = Some("set_secret".into());
        assert!(member.is_accessible());
    }

    #[test]
    fn test_manifest_from_json() {
        let json = r#"{
            "databases": [{ "name": "App", "version": 2 }],
            "entities": [{
                "type_name": "Hero",
                "table": { "database": "App" },
                "members": [
                    { "name": "id", "ty": { "kind": "primitive", "name": "i64" },
                      "annotations": { "primary_key": { "autoincrement": true } } },
                    { "name": "team", "ty": { "kind": "model", "name": "Team" }, "nullable": true,
                      "annotations": { "foreign_key": {} } }
                ]
            }]
        }"#;
        let manifest = SchemaManifest::from_json(json).unwrap();
        assert_eq!(manifest.databases[0].version, 2);
        let hero = &manifest.entities[0];
        assert_eq!(hero.table_name(), "Hero");
        assert_eq!(hero.kind, EntityKind::Table);
        assert_eq!(hero.members[0].ty, TypeRef::Primitive(FieldKind::I64));
        assert!(hero.members[1].annotations.foreign_key.is_some());
        assert_eq!(manifest.config, GeneratorConfig::default());
    }

    #[test]
    fn test_manifest_rejects_malformed_json() {
        let err = SchemaManifest::from_json("{ \"entities\": 3 }").unwrap_err();
        assert!(matches!(err, dbflow_core::Error::Manifest(_)));
    }
}
