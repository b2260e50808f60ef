//! Creation DDL for tables, views and index groups.

use dbflow_core::{ConflictAction, quote_ident};
use dbflow_query::{Index, Query, QueryBuilder};

use crate::column::ColumnSchema;
use crate::config::GeneratorConfig;
use crate::decl::EntityKind;
use crate::table::TableSchema;

/// `CREATE TABLE`/`CREATE VIEW` statement of an entity; empty for query models.
#[must_use]
pub fn creation_query(table: &TableSchema, config: &GeneratorConfig) -> String {
    tracing::debug!(entity = %table.entity, kind = ?table.kind, "Generating DDL");
    match table.kind {
        EntityKind::Table => create_table(table, config),
        EntityKind::View => create_view(table, config),
        EntityKind::QueryModel => String::new(),
    }
}

/// `CREATE INDEX` statements for the table's index groups.
#[must_use]
pub fn index_queries(table: &TableSchema) -> Vec<String> {
    table
        .index_groups()
        .into_iter()
        .filter(|group| !group.columns.is_empty())
        .map(|group| {
            Index::new(group.name)
                .unique(group.unique)
                .on(table.table_name.as_str(), group.columns)
                .query()
        })
        .collect()
}

fn create_table(table: &TableSchema, config: &GeneratorConfig) -> String {
    let mut qb = QueryBuilder::with("CREATE TABLE ");
    if config.if_not_exists {
        qb.append("IF NOT EXISTS ");
    }
    qb.append_quoted(&table.table_name).append('(');

    let mut parts: Vec<String> = Vec::new();
    for column in &table.columns {
        parts.extend(column_definitions(table, column));
    }

    for (group, columns) in table.unique_groups() {
        let mut constraint = format!("UNIQUE({})", quoted_list(columns.iter().copied()));
        append_conflict(&mut constraint, table.unique_group_conflict(group));
        parts.push(constraint);
    }

    if table.auto_increment().is_none() {
        let keys = table.primary_key_columns();
        if !keys.is_empty() {
            let mut constraint = format!("PRIMARY KEY({})", quoted_list(keys.iter().copied()));
            append_conflict(&mut constraint, table.primary_key_conflict);
            parts.push(constraint);
        }
    }

    for column in table.foreign_keys() {
        let Some(fk) = &column.foreign_key else {
            continue;
        };
        let mut constraint = format!(
            "FOREIGN KEY({}) REFERENCES {} ({}) ON UPDATE {} ON DELETE {}",
            quoted_list(fk.references.iter().map(|r| r.column_name.as_str())),
            quote_ident(&fk.target_table),
            quoted_list(fk.references.iter().map(|r| r.target_column.as_str())),
            fk.on_update.as_sql(),
            fk.on_delete.as_sql(),
        );
        if fk.deferred {
            constraint.push_str(" DEFERRABLE INITIALLY DEFERRED");
        }
        parts.push(constraint);
    }

    qb.append_joined(", ", parts).append(')');
    qb.build()
}

fn create_view(table: &TableSchema, config: &GeneratorConfig) -> String {
    let mut qb = QueryBuilder::with("CREATE VIEW ");
    if config.if_not_exists {
        qb.append("IF NOT EXISTS ");
    }
    qb.append_quoted(&table.table_name)
        .append(" AS ")
        .append(table.view_query.as_deref().unwrap_or_default().trim());
    qb.build()
}

/// One definition per storage column: foreign keys expand to their references.
fn column_definitions(table: &TableSchema, column: &ColumnSchema) -> Vec<String> {
    match &column.foreign_key {
        Some(fk) => fk
            .references
            .iter()
            .map(|r| {
                let mut def = format!("{} {}", quote_ident(&r.column_name), r.storage().sql_name());
                append_constraints(&mut def, column);
                def
            })
            .collect(),
        None => {
            let sql_type = column.storage().map_or("TEXT", |s| s.sql_name());
            let mut def = format!("{} {}", quote_ident(&column.column_name), sql_type);
            if let Some(length) = column.length {
                def.push_str(&format!("({length})"));
            }
            if column.is_engine_assigned() {
                def.push_str(" PRIMARY KEY");
                append_conflict(&mut def, table.primary_key_conflict);
                if column.is_autoincrement() {
                    def.push_str(" AUTOINCREMENT");
                }
            }
            append_constraints(&mut def, column);
            vec![def]
        }
    }
}

fn append_constraints(def: &mut String, column: &ColumnSchema) {
    if let Some(conflict) = column.unique {
        def.push_str(" UNIQUE");
        append_conflict(def, conflict);
    }
    if let Some(conflict) = column.not_null {
        def.push_str(" NOT NULL");
        append_conflict(def, conflict);
    }
    if let Some(default) = &column.default_value {
        def.push_str(" DEFAULT ");
        def.push_str(default);
    }
    if let Some(collate) = column.collate {
        def.push_str(" COLLATE ");
        def.push_str(collate.as_sql());
    }
}

fn append_conflict(sql: &mut String, conflict: ConflictAction) {
    if let Some(keyword) = conflict.as_sql() {
        sql.push_str(" ON CONFLICT ");
        sql.push_str(keyword);
    }
}

fn quoted_list<'a>(names: impl IntoIterator<Item = &'a str>) -> String {
    names
        .into_iter()
        .map(quote_ident)
        .collect::<Vec<_>>()
        .join(", ")
}
