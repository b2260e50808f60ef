//! Entity model builder: one declaration in, one unresolved table schema out.
//!
//! Phase one of generation. Foreign keys are recorded as unresolved
//! placeholders here; [`crate::resolver`] fills them in once every entity
//! has been built.

use dbflow_core::ConflictAction;

use crate::column::{ColumnSchema, ForeignKeySpec, PrimaryKeyKind};
use crate::decl::{
    ColumnAttr, DatabaseDecl, EntityDecl, MemberAnnotations, MemberDecl, NotNullAttr, TypeRef,
};
use crate::diagnostics::Diagnostics;
use crate::table::{OneToManyRelation, TableSchema};
use crate::validate::validate_column;

/// Build the table schema of one entity.
///
/// Columns failing column-level validation are left out; their problems
/// are in `diags`.
pub fn build_table(
    decl: &EntityDecl,
    database: Option<&DatabaseDecl>,
    diags: &mut Diagnostics,
) -> TableSchema {
    let entity = decl.type_name.as_str();
    tracing::debug!(entity = entity, kind = ?decl.kind, "Building table schema");

    let mut table = TableSchema::new(entity, decl.table_name(), &decl.table.database);
    table.kind = decl.kind;
    let (db_insert, db_update) = database.map_or((ConflictAction::None, ConflictAction::None), |db| {
        (db.insert_conflict, db.update_conflict)
    });
    table.insert_conflict = decl.table.insert_conflict.or(db_insert);
    table.update_conflict = decl.table.update_conflict.or(db_update);
    table.primary_key_conflict = decl.table.primary_key_conflict;
    table.caching_enabled = decl.table.caching_enabled;
    table.view_query.clone_from(&decl.view_query);
    table.has_load_hook = decl.has_load_hook;

    for group in &decl.table.unique_groups {
        if table
            .unique_group_conflicts
            .insert(group.number, group.on_conflict)
            .is_some()
        {
            diags.error(entity, format!("unique group {} is declared twice", group.number));
        }
    }
    for group in &decl.table.index_groups {
        if table.index_group_decls.iter().any(|g| g.number == group.number) {
            diags.error(entity, format!("index group {} is declared twice", group.number));
            continue;
        }
        table.index_group_decls.push(group.clone());
    }

    table.one_to_many = decl
        .one_to_many
        .iter()
        .map(|r| OneToManyRelation::new(&r.name, &r.methods))
        .collect();

    let mut seen_auto_increment = None;
    for member in &decl.members {
        let Some(mut column) = column_for_member(decl, member, diags) else {
            continue;
        };
        if validate_column(entity, &mut column, &mut seen_auto_increment, diags) {
            table.columns.push(column);
        } else {
            tracing::debug!(entity = entity, field = %member.name, "Rejected column");
        }
    }

    table
}

/// Effective annotations of a member, or `None` if it is not persisted.
fn member_annotations(decl: &EntityDecl, member: &MemberDecl) -> Option<MemberAnnotations> {
    if member.annotations.ignore {
        return None;
    }
    if !member.inherited {
        return Some(member.annotations.clone());
    }
    // Parent members are persisted only when promoted by the entity.
    if let Some(promoted) = decl
        .table
        .inherited_primary_keys
        .iter()
        .find(|p| p.field_name == member.name)
    {
        return Some(MemberAnnotations {
            column: Some(promoted.column.clone()),
            primary_key: Some(promoted.primary_key),
            ..member.annotations.clone()
        });
    }
    decl.table
        .inherited_columns
        .iter()
        .find(|c| c.field_name == member.name)
        .map(|promoted| MemberAnnotations {
            column: Some(promoted.column.clone()),
            not_null: promoted.not_null.or(member.annotations.not_null),
            ..member.annotations.clone()
        })
}

fn column_for_member(
    decl: &EntityDecl,
    member: &MemberDecl,
    diags: &mut Diagnostics,
) -> Option<ColumnSchema> {
    let entity = decl.type_name.as_str();
    let annotations = member_annotations(decl, member)?;

    if annotations.marks_column() {
        if member.is_static || member.is_final {
            diags.member_error(entity, &member.name, "a column cannot be static or final");
            return None;
        }
    } else if !decl.table.all_fields || member.is_static || member.is_final {
        return None;
    }

    if !member.is_accessible() {
        diags.member_error(
            entity,
            &member.name,
            "a private field needs both a getter and a setter to be persisted",
        );
        return None;
    }

    let mut column = ColumnSchema::new(&member.name, member.ty.clone());
    column.nullable = member.nullable;
    column.getter.clone_from(&member.getter);
    column.setter.clone_from(&member.setter);

    if let Some(attr) = &annotations.column {
        apply_column_attr(&mut column, attr);
    }

    if let Some(pk) = annotations.primary_key {
        column.primary_key = Some(if pk.rowid {
            PrimaryKeyKind::RowId
        } else if pk.autoincrement {
            PrimaryKeyKind::AutoIncrement
        } else {
            PrimaryKeyKind::Explicit
        });
    }

    match (&member.ty, &annotations.foreign_key) {
        (TypeRef::Model(model), Some(fk)) => {
            column.foreign_key = Some(ForeignKeySpec {
                target: fk.table.clone().unwrap_or_else(|| model.clone()),
                target_table: String::new(),
                declared: fk.references.clone(),
                references: Vec::new(),
                resolved: false,
                on_delete: fk.on_delete,
                on_update: fk.on_update,
                deferred: fk.deferred,
                naming: fk.naming.clone(),
            });
        }
        (_, Some(_)) => {
            diags.member_error(
                entity,
                &member.name,
                format!("a foreign key must hold a model type, not `{}`", member.ty.type_name()),
            );
            return None;
        }
        (TypeRef::Model(model), None) => {
            diags.member_error(
                entity,
                &member.name,
                format!("model-typed member of type `{model}` must be declared as a foreign key"),
            );
            return None;
        }
        _ => {}
    }

    if let Some(NotNullAttr { on_null_conflict }) = annotations.not_null {
        column.not_null = Some(on_null_conflict);
    }
    if let Some(unique) = &annotations.unique {
        if unique.unique {
            column.unique = Some(unique.on_unique_conflict);
        }
        column.unique_groups.clone_from(&unique.groups);
    }
    if let Some(index) = &annotations.index {
        if index.groups.is_empty() {
            column.indexed = true;
        } else {
            column.index_groups.clone_from(&index.groups);
        }
    }

    Some(column)
}

fn apply_column_attr(column: &mut ColumnSchema, attr: &ColumnAttr) {
    if let Some(name) = attr.name.as_deref().filter(|n| !n.is_empty()) {
        column.column_name = name.to_string();
        column.name_overridden = true;
    }
    column.length = attr.length;
    column.default_value.clone_from(&attr.default_value);
    column.collate = attr.collate;
    if let Some(converter) = &attr.type_converter {
        column.converter = Some(converter.clone());
        // Resolved against the declared converters later.
        column.codec = None;
    }
}
