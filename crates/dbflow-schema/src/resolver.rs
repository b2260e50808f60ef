//! Phase two: converter and foreign-key resolution across entities.
//!
//! Converters are resolved first so every key column has a known storage
//! type. Foreign keys are then resolved on demand with memoization: a
//! reference whose target key is itself a foreign key resolves that key
//! first and flattens its references. A key that depends on itself is a
//! cycle and is reported instead of recursing forever.

use std::collections::{BTreeMap, HashSet};

use dbflow_core::{FieldKind, StoragePrimitive};

use crate::column::{ColumnSchema, ForeignKeyReference, ValueCodec};
use crate::config::{GeneratorConfig, check_template, render_template};
use crate::decl::{EntityKind, TypeConverterDecl, TypeRef};
use crate::diagnostics::Diagnostics;
use crate::table::TableSchema;

/// Attach converter codecs to custom-typed and explicitly converted columns.
///
/// Columns whose converter cannot be found are removed.
pub fn resolve_converters(
    tables: &mut BTreeMap<String, TableSchema>,
    converters: &[TypeConverterDecl],
    diags: &mut Diagnostics,
) {
    for table in tables.values_mut() {
        let entity = table.entity.clone();
        table.columns.retain_mut(|column| {
            if column.codec.is_some() || column.is_foreign_key() {
                return true;
            }
            let found = match (&column.converter, &column.ty) {
                (Some(name), _) => converters.iter().find(|c| &c.name == name),
                (None, TypeRef::Custom(ty)) => converters.iter().find(|c| &c.model_type == ty),
                _ => None,
            };
            let Some(converter) = found else {
                let wanted = column
                    .converter
                    .clone()
                    .unwrap_or_else(|| format!("a converter for `{}`", column.ty.type_name()));
                diags.member_error(&entity, &column.field_name, format!("no type converter found: {wanted}"));
                return false;
            };
            let Some(storage) = FieldKind::from_rust_name(&converter.storage_type) else {
                diags.member_error(
                    &entity,
                    &column.field_name,
                    format!("converter `{}` has no storable storage type", converter.name),
                );
                return false;
            };
            let codec = ValueCodec::Converter {
                name: converter.name.clone(),
                storage: storage.storage(),
                kind: match column.ty {
                    TypeRef::Primitive(kind) => Some(kind),
                    _ => None,
                },
            };
            if column.is_engine_assigned() && codec.storage() != StoragePrimitive::Integer {
                diags.member_error(
                    &entity,
                    &column.field_name,
                    "an autoincrement key must be stored as INTEGER",
                );
                return false;
            }
            tracing::trace!(entity = %entity, field = %column.field_name, converter = %converter.name, "Resolved converter");
            column.codec = Some(codec);
            true
        });
    }
}

/// A key of a target table as seen by a referencing column.
struct KeyRef {
    target_column: String,
    path: Vec<String>,
    codec: ValueCodec,
}

/// Resolves every foreign key of every table.
pub struct ForeignKeyResolver<'a> {
    config: &'a GeneratorConfig,
    tables: &'a mut BTreeMap<String, TableSchema>,
    diags: &'a mut Diagnostics,
    in_progress: HashSet<(String, String)>,
    failed: HashSet<(String, String)>,
}

impl<'a> ForeignKeyResolver<'a> {
    pub fn new(
        config: &'a GeneratorConfig,
        tables: &'a mut BTreeMap<String, TableSchema>,
        diags: &'a mut Diagnostics,
    ) -> Self {
        Self {
            config,
            tables,
            diags,
            in_progress: HashSet::new(),
            failed: HashSet::new(),
        }
    }

    /// Resolve all foreign keys, then drop the columns that failed.
    pub fn resolve_all(mut self) {
        let pending: Vec<(String, String)> = self
            .tables
            .iter()
            .flat_map(|(entity, table)| {
                table
                    .foreign_keys()
                    .map(|c| (entity.clone(), c.field_name.clone()))
                    .collect::<Vec<_>>()
            })
            .collect();
        for (entity, field) in &pending {
            self.resolve_column(entity, field);
        }
        for (entity, field) in &self.failed {
            if let Some(table) = self.tables.get_mut(entity) {
                table.columns.retain(|c| &c.field_name != field);
            }
        }
    }

    fn resolve_column(&mut self, entity: &str, field: &str) -> bool {
        let key = (entity.to_string(), field.to_string());
        if self.failed.contains(&key) {
            return false;
        }
        let Some(column) = self.tables.get(entity).and_then(|t| t.column(field)) else {
            return false;
        };
        match &column.foreign_key {
            None => return true,
            Some(fk) if fk.resolved => return true,
            Some(_) => {}
        }
        if !self.in_progress.insert(key.clone()) {
            self.diags.member_error(entity, field, "foreign key forms a cycle through primary keys");
            self.failed.insert(key);
            return false;
        }
        let column = column.clone();
        let result = self.compute_references(&column);
        self.in_progress.remove(&key);

        match result {
            Ok((target_table, references)) => {
                tracing::debug!(
                    entity = entity,
                    field = field,
                    references = references.len(),
                    "Resolved foreign key"
                );
                let resolved = self
                    .tables
                    .get_mut(entity)
                    .and_then(|t| t.columns.iter_mut().find(|c| c.field_name == field))
                    .and_then(|c| c.foreign_key.as_mut());
                if let Some(fk) = resolved {
                    fk.target_table = target_table;
                    fk.references = references;
                    fk.resolved = true;
                }
                true
            }
            Err(message) => {
                if !self.failed.contains(&key) {
                    self.diags.member_error(entity, field, message);
                    self.failed.insert(key);
                }
                false
            }
        }
    }

    fn compute_references(
        &mut self,
        column: &ColumnSchema,
    ) -> Result<(String, Vec<ForeignKeyReference>), String> {
        let Some(fk) = &column.foreign_key else {
            return Ok((String::new(), Vec::new()));
        };
        let target = fk.target.clone();
        let Some(target_table) = self.tables.get(&target) else {
            return Err(format!("foreign key target `{target}` is not a known table"));
        };
        if target_table.kind != EntityKind::Table {
            return Err(format!("foreign key target `{target}` is not a table"));
        }
        let target_name = target_table.table_name.clone();

        let mut references = Vec::new();
        if fk.declared.is_empty() {
            let keys: Vec<ColumnSchema> = target_table.primary_keys().cloned().collect();
            if keys.is_empty() {
                return Err(format!("foreign key target `{target}` has no primary key"));
            }
            let template = fk
                .naming
                .clone()
                .unwrap_or_else(|| self.config.foreign_key_template.clone());
            check_template(&template).map_err(|e| format!("invalid naming template: {e}"))?;
            for key in &keys {
                for key_ref in self.key_refs(&target, key)? {
                    references.push(ForeignKeyReference {
                        column_name: render_template(&template, &column.column_name, &key_ref.target_column),
                        target_column: key_ref.target_column,
                        path: key_ref.path,
                        codec: key_ref.codec,
                    });
                }
            }
        } else {
            let declared = fk.declared.clone();
            for decl in &declared {
                let Some(target_column) = self
                    .tables
                    .get(&target)
                    .and_then(|t| t.column_by_storage_name(&decl.foreign_key_column_name))
                    .cloned()
                else {
                    return Err(format!(
                        "reference `{}` names unknown column `{}` of `{target}`",
                        decl.column_name, decl.foreign_key_column_name
                    ));
                };
                let key_ref = self
                    .key_refs(&target, &target_column)?
                    .into_iter()
                    .find(|k| k.target_column == decl.foreign_key_column_name)
                    .ok_or_else(|| {
                        format!("column `{}` of `{target}` cannot be referenced", decl.foreign_key_column_name)
                    })?;
                if let Some(ty) = &decl.column_type {
                    check_local_type(ty, &decl.column_name, &key_ref)?;
                }
                references.push(ForeignKeyReference {
                    column_name: decl.column_name.clone(),
                    target_column: key_ref.target_column,
                    path: key_ref.path,
                    codec: key_ref.codec,
                });
            }
        }
        Ok((target_name, references))
    }

    /// The storage keys behind one target column, flattened through
    /// foreign keys.
    fn key_refs(&mut self, target: &str, column: &ColumnSchema) -> Result<Vec<KeyRef>, String> {
        if !column.is_foreign_key() {
            let codec = column.codec.clone().ok_or_else(|| {
                format!("column `{}` of `{target}` has no storage type", column.field_name)
            })?;
            return Ok(vec![KeyRef {
                target_column: column.column_name.clone(),
                path: vec![column.field_name.clone()],
                codec,
            }]);
        }
        if !self.resolve_column(target, &column.field_name) {
            return Err(format!(
                "key `{}` of `{target}` could not be resolved",
                column.field_name
            ));
        }
        let references = self
            .tables
            .get(target)
            .and_then(|t| t.column(&column.field_name))
            .and_then(|c| c.foreign_key.as_ref())
            .map(|fk| fk.references.clone())
            .unwrap_or_default();
        Ok(references
            .into_iter()
            .map(|r| {
                let mut path = vec![column.field_name.clone()];
                path.extend(r.path);
                KeyRef {
                    target_column: r.column_name,
                    path,
                    codec: r.codec,
                }
            })
            .collect())
    }
}

fn check_local_type(ty: &str, column: &str, key: &KeyRef) -> Result<(), String> {
    match FieldKind::from_rust_name(ty) {
        Some(kind) if kind.storage() == key.codec.storage() => Ok(()),
        Some(kind) => Err(format!(
            "reference `{column}` is declared as {ty} ({}) but `{}` is stored as {}",
            kind.storage().sql_name(),
            key.target_column,
            key.codec.storage().sql_name()
        )),
        None => Err(format!("reference `{column}` declares unknown type `{ty}`")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::{ForeignKeySpec, PrimaryKeyKind};
    use crate::decl::ReferenceDecl;
    use dbflow_core::ReferentialAction;

    fn key(name: &str, kind: FieldKind) -> ColumnSchema {
        let mut column = ColumnSchema::new(name, TypeRef::Primitive(kind));
        column.primary_key = Some(PrimaryKeyKind::Explicit);
        column
    }

    fn foreign_key(name: &str, target: &str, declared: Vec<ReferenceDecl>) -> ColumnSchema {
        let mut column = ColumnSchema::new(name, TypeRef::Model(target.into()));
        column.foreign_key = Some(ForeignKeySpec {
            target: target.into(),
            target_table: String::new(),
            declared,
            references: Vec::new(),
            resolved: false,
            on_delete: ReferentialAction::NoAction,
            on_update: ReferentialAction::NoAction,
            deferred: false,
            naming: None,
        });
        column
    }

    fn table(entity: &str, columns: Vec<ColumnSchema>) -> (String, TableSchema) {
        let mut table = TableSchema::new(entity, entity, "App");
        table.columns = columns;
        (entity.to_string(), table)
    }

    fn resolve(tables: &mut BTreeMap<String, TableSchema>) -> Diagnostics {
        let config = GeneratorConfig::default();
        let mut diags = Diagnostics::new();
        ForeignKeyResolver::new(&config, tables, &mut diags).resolve_all();
        diags
    }

    fn references(tables: &BTreeMap<String, TableSchema>, entity: &str, field: &str) -> Vec<ForeignKeyReference> {
        tables[entity].column(field).unwrap().foreign_key.as_ref().unwrap().references.clone()
    }

    #[test]
    fn test_implicit_composite_reference() {
        let mut tables: BTreeMap<_, _> = [
            table("Team", vec![key("id", FieldKind::I64), key("league", FieldKind::String)]),
            table("Hero", vec![key("id", FieldKind::I64), foreign_key("team", "Team", Vec::new())]),
        ]
        .into_iter()
        .collect();
        let diags = resolve(&mut tables);
        assert!(diags.is_empty());
        let refs = references(&tables, "Hero", "team");
        let names: Vec<&str> = refs.iter().map(|r| r.column_name.as_str()).collect();
        assert_eq!(names, ["team_id", "team_league"]);
        assert_eq!(refs[1].codec, ValueCodec::Direct { kind: FieldKind::String });
        assert_eq!(tables["Hero"].storage_columns(), ["id", "team_id", "team_league"]);
    }

    #[test]
    fn test_nested_key_is_flattened() {
        let mut tables: BTreeMap<_, _> = [
            table("League", vec![key("id", FieldKind::I32)]),
            table("Team", {
                let mut league = foreign_key("league", "League", Vec::new());
                league.primary_key = Some(PrimaryKeyKind::Explicit);
                vec![league]
            }),
            table("Hero", vec![key("id", FieldKind::I64), foreign_key("team", "Team", Vec::new())]),
        ]
        .into_iter()
        .collect();
        let diags = resolve(&mut tables);
        assert!(diags.is_empty());
        let refs = references(&tables, "Hero", "team");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].column_name, "team_league_id");
        assert_eq!(refs[0].target_column, "league_id");
        assert_eq!(refs[0].path, ["league", "id"]);
    }

    #[test]
    fn test_explicit_references_are_type_checked() {
        let declared = vec![ReferenceDecl {
            column_name: "owner".into(),
            foreign_key_column_name: "id".into(),
            column_type: Some("String".into()),
        }];
        let mut tables: BTreeMap<_, _> = [
            table("Team", vec![key("id", FieldKind::I64)]),
            table("Hero", vec![key("id", FieldKind::I64), foreign_key("team", "Team", declared)]),
        ]
        .into_iter()
        .collect();
        let diags = resolve(&mut tables);
        assert!(diags.has_errors_for("Hero"));
        assert!(tables["Hero"].column("team").is_none());
    }

    #[test]
    fn test_explicit_reference_names() {
        let declared = vec![ReferenceDecl {
            column_name: "owner".into(),
            foreign_key_column_name: "id".into(),
            column_type: Some("i64".into()),
        }];
        let mut tables: BTreeMap<_, _> = [
            table("Team", vec![key("id", FieldKind::I64)]),
            table("Hero", vec![key("id", FieldKind::I64), foreign_key("team", "Team", declared)]),
        ]
        .into_iter()
        .collect();
        let diags = resolve(&mut tables);
        assert!(diags.is_empty());
        assert_eq!(references(&tables, "Hero", "team")[0].column_name, "owner");
    }

    #[test]
    fn test_key_cycle_reported() {
        let mut a = foreign_key("b", "B", Vec::new());
        a.primary_key = Some(PrimaryKeyKind::Explicit);
        let mut b = foreign_key("a", "A", Vec::new());
        b.primary_key = Some(PrimaryKeyKind::Explicit);
        let mut tables: BTreeMap<_, _> = [table("A", vec![a]), table("B", vec![b])]
            .into_iter()
            .collect();
        let diags = resolve(&mut tables);
        assert!(diags.has_errors());
        assert!(tables["A"].columns.is_empty());
        assert!(tables["B"].columns.is_empty());
    }

    #[test]
    fn test_self_reference_is_not_a_cycle() {
        let mut tables: BTreeMap<_, _> = [table(
            "Node",
            vec![key("id", FieldKind::I64), foreign_key("parent", "Node", Vec::new())],
        )]
        .into_iter()
        .collect();
        let diags = resolve(&mut tables);
        assert!(diags.is_empty());
        assert_eq!(references(&tables, "Node", "parent")[0].column_name, "parent_id");
    }

    #[test]
    fn test_unknown_target() {
        let mut tables: BTreeMap<_, _> = [table(
            "Hero",
            vec![key("id", FieldKind::I64), foreign_key("team", "Team", Vec::new())],
        )]
        .into_iter()
        .collect();
        let diags = resolve(&mut tables);
        assert_eq!(diags.error_count(), 1);
    }

    #[test]
    fn test_converters() {
        let converters = vec![TypeConverterDecl {
            name: "DateConverter".into(),
            model_type: "Date".into(),
            storage_type: "i64".into(),
            generic_params: Vec::new(),
        }];
        let mut tables: BTreeMap<_, _> = [table(
            "Hero",
            vec![
                key("id", FieldKind::I64),
                ColumnSchema::new("born", TypeRef::Custom("Date".into())),
                ColumnSchema::new("when", TypeRef::Custom("Instant".into())),
            ],
        )]
        .into_iter()
        .collect();
        let mut diags = Diagnostics::new();
        resolve_converters(&mut tables, &converters, &mut diags);
        assert_eq!(diags.error_count(), 1);
        let born = tables["Hero"].column("born").unwrap();
        assert_eq!(
            born.codec,
            Some(ValueCodec::Converter {
                name: "DateConverter".into(),
                storage: StoragePrimitive::Integer,
                kind: None,
            })
        );
        assert!(tables["Hero"].column("when").is_none());
    }
}
