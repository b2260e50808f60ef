//! Table model: a validated-or-not collection of columns plus table-level facts.

use std::collections::BTreeMap;

use dbflow_core::ConflictAction;
use serde::Serialize;

use crate::column::{ColumnSchema, ValueCodec};
use crate::decl::{EntityKind, IndexGroupDecl, OneToManyMethod};

/// A method-based one-to-many relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OneToManyRelation {
    pub name: String,
    pub load: bool,
    pub save: bool,
    pub delete: bool,
}

impl OneToManyRelation {
    pub fn new(name: impl Into<String>, methods: &[OneToManyMethod]) -> Self {
        let all = methods.contains(&OneToManyMethod::All);
        Self {
            name: name.into(),
            load: all || methods.contains(&OneToManyMethod::Load),
            save: all || methods.contains(&OneToManyMethod::Save),
            delete: all || methods.contains(&OneToManyMethod::Delete),
        }
    }
}

/// A named multi-column index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexGroup {
    pub number: i32,
    pub name: String,
    pub unique: bool,
    /// Storage column names in declaration order.
    pub columns: Vec<String>,
}

/// Everything the pipeline knows about one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSchema {
    /// Entity type name.
    pub entity: String,
    pub kind: EntityKind,
    pub table_name: String,
    pub database: String,
    /// Columns in declaration order.
    pub columns: Vec<ColumnSchema>,
    /// Conflict actions of declared unique groups.
    pub unique_group_conflicts: BTreeMap<i32, ConflictAction>,
    pub index_group_decls: Vec<IndexGroupDecl>,
    pub one_to_many: Vec<OneToManyRelation>,
    pub insert_conflict: ConflictAction,
    pub update_conflict: ConflictAction,
    pub primary_key_conflict: ConflictAction,
    pub caching_enabled: bool,
    pub view_query: Option<String>,
    pub has_load_hook: bool,
}

impl TableSchema {
    pub fn new(entity: impl Into<String>, table_name: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            kind: EntityKind::Table,
            table_name: table_name.into(),
            database: database.into(),
            columns: Vec::new(),
            unique_group_conflicts: BTreeMap::new(),
            index_group_decls: Vec::new(),
            one_to_many: Vec::new(),
            insert_conflict: ConflictAction::None,
            update_conflict: ConflictAction::None,
            primary_key_conflict: ConflictAction::None,
            caching_enabled: false,
            view_query: None,
            has_load_hook: false,
        }
    }

    #[must_use]
    pub fn column(&self, field_name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.field_name == field_name)
    }

    /// Column by storage name, foreign-key references included.
    #[must_use]
    pub fn column_by_storage_name(&self, column_name: &str) -> Option<&ColumnSchema> {
        self.columns
            .iter()
            .find(|c| c.storage_columns().contains(&column_name))
    }

    pub fn primary_keys(&self) -> impl Iterator<Item = &ColumnSchema> {
        self.columns.iter().filter(|c| c.is_primary_key())
    }

    pub fn foreign_keys(&self) -> impl Iterator<Item = &ColumnSchema> {
        self.columns.iter().filter(|c| c.is_foreign_key())
    }

    /// The engine-assigned key, if any.
    #[must_use]
    pub fn auto_increment(&self) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.is_engine_assigned())
    }

    /// Explicit (caller-assigned) primary keys.
    pub fn explicit_primary_keys(&self) -> impl Iterator<Item = &ColumnSchema> {
        self.primary_keys().filter(|c| !c.is_engine_assigned())
    }

    /// Storage columns of the primary key, references expanded.
    #[must_use]
    pub fn primary_key_columns(&self) -> Vec<&str> {
        self.primary_keys()
            .flat_map(ColumnSchema::storage_columns)
            .collect()
    }

    /// Every storage column in declaration order, references expanded.
    #[must_use]
    pub fn storage_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .flat_map(ColumnSchema::storage_columns)
            .collect()
    }

    /// Unique groups with their member storage columns.
    #[must_use]
    pub fn unique_groups(&self) -> BTreeMap<i32, Vec<&str>> {
        let mut groups: BTreeMap<i32, Vec<&str>> = BTreeMap::new();
        for column in &self.columns {
            for group in &column.unique_groups {
                groups
                    .entry(*group)
                    .or_default()
                    .extend(column.storage_columns());
            }
        }
        groups
    }

    /// Conflict action of a unique group; undeclared groups have none.
    #[must_use]
    pub fn unique_group_conflict(&self, group: i32) -> ConflictAction {
        self.unique_group_conflicts
            .get(&group)
            .copied()
            .unwrap_or_default()
    }

    /// Declared index groups plus single-column indexes.
    #[must_use]
    pub fn index_groups(&self) -> Vec<IndexGroup> {
        let mut groups: Vec<IndexGroup> = self
            .index_group_decls
            .iter()
            .map(|decl| IndexGroup {
                number: decl.number,
                name: decl.name.clone(),
                unique: decl.unique,
                columns: self
                    .columns
                    .iter()
                    .filter(|c| c.index_groups.contains(&decl.number))
                    .flat_map(|c| c.storage_columns().into_iter().map(str::to_string))
                    .collect(),
            })
            .collect();
        for column in self.columns.iter().filter(|c| c.indexed) {
            groups.push(IndexGroup {
                number: -1,
                name: format!("index_{}_{}", self.table_name, column.column_name),
                unique: false,
                columns: column
                    .storage_columns()
                    .into_iter()
                    .map(str::to_string)
                    .collect(),
            });
        }
        groups
    }

    /// Caching needs a single primary key stored without a user converter.
    #[must_use]
    pub fn is_cachable(&self) -> bool {
        let mut keys = self.primary_keys();
        match (keys.next(), keys.next()) {
            (Some(key), None) => {
                self.primary_key_columns().len() == 1
                    && !key.codec.as_ref().is_some_and(ValueCodec::is_custom_converter)
            }
            _ => false,
        }
    }

    /// The single primary-key column used as the cache id.
    #[must_use]
    pub fn caching_column(&self) -> Option<&ColumnSchema> {
        if self.is_cachable() {
            self.primary_keys().next()
        } else {
            None
        }
    }

    #[must_use]
    pub fn is_table(&self) -> bool {
        self.kind == EntityKind::Table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::PrimaryKeyKind;
    use crate::decl::TypeRef;
    use dbflow_core::FieldKind;

    fn hero() -> TableSchema {
        let mut table = TableSchema::new("Hero", "Hero", "App");
        let mut id = ColumnSchema::new("id", TypeRef::Primitive(FieldKind::I64));
        id.primary_key = Some(PrimaryKeyKind::AutoIncrement);
        let mut name = ColumnSchema::new("name", TypeRef::Primitive(FieldKind::String));
        name.unique_groups = vec![1];
        name.index_groups = vec![1];
        let mut age = ColumnSchema::new("age", TypeRef::Primitive(FieldKind::I32));
        age.unique_groups = vec![1];
        age.indexed = true;
        table.columns = vec![id, name, age];
        table.unique_group_conflicts.insert(1, ConflictAction::Replace);
        table.index_group_decls.push(IndexGroupDecl {
            number: 1,
            name: "hero_name".into(),
            unique: false,
        });
        table
    }

    #[test]
    fn test_derived_lists() {
        let table = hero();
        assert_eq!(table.primary_key_columns(), ["id"]);
        assert_eq!(table.auto_increment().map(|c| c.field_name.as_str()), Some("id"));
        assert_eq!(table.storage_columns(), ["id", "name", "age"]);
        assert!(table.is_cachable());
        assert_eq!(table.explicit_primary_keys().count(), 0);
    }

    #[test]
    fn test_groups() {
        let table = hero();
        let unique = table.unique_groups();
        assert_eq!(unique[&1], ["name", "age"]);
        assert_eq!(table.unique_group_conflict(1), ConflictAction::Replace);
        assert_eq!(table.unique_group_conflict(2), ConflictAction::None);

        let indexes = table.index_groups();
        assert_eq!(indexes.len(), 2);
        assert_eq!(indexes[0].columns, ["name"]);
        assert_eq!(indexes[1].name, "index_Hero_age");
    }

    #[test]
    fn test_one_to_many_methods() {
        let all = OneToManyRelation::new("ants", &[OneToManyMethod::All]);
        assert!(all.load && all.save && all.delete);
        let load = OneToManyRelation::new("ants", &[OneToManyMethod::Load]);
        assert!(load.load && !load.save && !load.delete);
    }
}
