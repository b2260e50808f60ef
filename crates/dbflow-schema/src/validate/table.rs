//! Table-level rules, applied after references are resolved.

use std::collections::BTreeSet;

use crate::decl::EntityKind;
use crate::diagnostics::Diagnostics;
use crate::table::TableSchema;

/// Check one table. Returns `false` if the entity must not be generated.
pub fn validate_table(table: &TableSchema, diags: &mut Diagnostics) -> bool {
    let before = diags.error_count();
    let entity = table.entity.as_str();

    if table.columns.is_empty() {
        diags.error(entity, "an entity needs at least one column");
    }

    match table.kind {
        EntityKind::Table => check_primary_key(table, diags),
        EntityKind::View => {
            if table.view_query.as_deref().is_none_or(|q| q.trim().is_empty()) {
                diags.error(entity, "a view needs a defining query");
            }
        }
        EntityKind::QueryModel => {}
    }

    if table.caching_enabled && !table.is_cachable() {
        diags.error(
            entity,
            "caching requires exactly one primary key column without a custom converter",
        );
    }

    let mut seen = BTreeSet::new();
    for name in table.storage_columns() {
        if !seen.insert(name) {
            diags.error(entity, format!("duplicate storage column `{name}`"));
        }
    }

    for column in table.foreign_keys() {
        let unresolved = column
            .foreign_key
            .as_ref()
            .is_some_and(|fk| !fk.resolved || fk.references.is_empty());
        if unresolved {
            diags.member_error(entity, &column.field_name, "foreign key has no resolved references");
        }
    }

    let declared: BTreeSet<i32> = table.index_group_decls.iter().map(|g| g.number).collect();
    for column in &table.columns {
        for group in &column.index_groups {
            if !declared.contains(group) {
                diags.member_error(
                    entity,
                    &column.field_name,
                    format!("index group {group} is not declared on the table"),
                );
            }
        }
    }
    for group in table.index_groups() {
        if group.columns.is_empty() {
            diags.warning(entity, format!("index group `{}` has no columns", group.name));
        }
    }

    diags.error_count() == before
}

fn check_primary_key(table: &TableSchema, diags: &mut Diagnostics) {
    let engine_assigned = table.columns.iter().filter(|c| c.is_engine_assigned()).count();
    let explicit = table.explicit_primary_keys().count();
    if engine_assigned > 0 && explicit > 0 {
        diags.error(
            &table.entity,
            "an autoincrement key cannot be combined with other primary keys",
        );
    } else if engine_assigned == 0 && explicit == 0 {
        diags.error(&table.entity, "a table needs a primary key");
    }
}
