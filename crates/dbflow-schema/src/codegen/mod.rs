//! Adapter code generation.
//!
//! [`plan_adapter`] turns a validated [`TableSchema`] into an [`AdapterPlan`]:
//! the statement SQL, binder trees, loader steps, existence strategy and
//! cascades of one entity. The plan is the single source for both outputs
//! of generation:
//!
//! - [`printer`] renders it as Rust source implementing `ModelAdapter`;
//! - [`crate::PlanAdapter`] interprets it at runtime.
//!
//! Bind indexes are assigned here and only here, so every consumer agrees
//! on statement order.

pub mod ir;
pub mod printer;
pub mod registry;

use dbflow_core::quote_ident;
use dbflow_query::{ConditionGroup, Delete, Insert, Operator, Query, Update};

pub use ir::{
    AdapterPlan, AutoIncrementPlan, BindStmt, CachingPlan, CascadePlan, ColumnRead, ConditionPart,
    ExistsStrategy, FieldPath, LoadStmt, Slot,
};
pub use registry::{DatabasePlan, RegistryPlan, plan_registry};

use crate::column::{ColumnSchema, ValueCodec};
use crate::config::GeneratorConfig;
use crate::ddl;
use crate::table::TableSchema;

/// One storage column of a logical column, with where its value comes from.
struct BindUnit<'a> {
    column: &'a str,
    source: FieldPath,
    codec: ValueCodec,
}

fn bind_units(column: &ColumnSchema) -> Vec<BindUnit<'_>> {
    match (&column.foreign_key, &column.codec) {
        (Some(fk), _) => fk
            .references
            .iter()
            .map(|r| BindUnit {
                column: &r.column_name,
                source: FieldPath::nested(column.field_name.clone(), r.path.clone()),
                codec: r.codec.clone(),
            })
            .collect(),
        (None, Some(codec)) => vec![BindUnit {
            column: &column.column_name,
            source: FieldPath::field(column.field_name.clone()),
            codec: codec.clone(),
        }],
        (None, None) => Vec::new(),
    }
}

/// Binder statements for `columns`, slots handed out by `slot` in bind order.
fn bind_block<'a>(
    columns: impl IntoIterator<Item = &'a ColumnSchema>,
    mut slot: impl FnMut(&str) -> Slot,
) -> Vec<BindStmt> {
    let mut out = Vec::new();
    for column in columns {
        let binds: Vec<BindStmt> = bind_units(column)
            .into_iter()
            .map(|unit| BindStmt::Bind {
                slot: slot(unit.column),
                source: unit.source,
                codec: unit.codec,
            })
            .collect();
        if binds.is_empty() {
            continue;
        }
        if column.needs_null_guard() {
            let otherwise = binds
                .iter()
                .flat_map(BindStmt::slots)
                .map(|slot| BindStmt::BindNull { slot: slot.clone() })
                .collect();
            out.push(BindStmt::IfNotNull {
                field: column.field_name.clone(),
                then: binds,
                otherwise,
            });
        } else {
            out.extend(binds);
        }
    }
    out
}

fn statement_slots(start: usize) -> impl FnMut(&str) -> Slot {
    let mut next = start;
    move |_: &str| {
        let slot = Slot::Index(next);
        next += 1;
        slot
    }
}

fn param_group(base: ConditionGroup, columns: &[&str]) -> ConditionGroup {
    base.and_all(columns.iter().map(|c| Operator::column(*c).eq_param()))
}

fn load_steps(table: &TableSchema) -> Vec<LoadStmt> {
    let mut steps = Vec::new();
    for column in &table.columns {
        match (&column.foreign_key, &column.codec) {
            (Some(fk), _) => steps.push(LoadStmt::AssignReference {
                field: column.field_name.clone(),
                nullable: column.nullable,
                reads: fk
                    .references
                    .iter()
                    .map(|r| ColumnRead {
                        column: r.column_name.clone(),
                        getter: r.codec.getter(),
                        codec: r.codec.clone(),
                        path: r.path.clone(),
                    })
                    .collect(),
            }),
            (None, Some(codec)) => steps.push(LoadStmt::Assign {
                field: column.field_name.clone(),
                read: ColumnRead {
                    column: column.column_name.clone(),
                    getter: codec.getter(),
                    codec: codec.clone(),
                    path: Vec::new(),
                },
                nullable: column.nullable,
            }),
            (None, None) => {}
        }
    }
    for relation in table.one_to_many.iter().filter(|r| r.load) {
        steps.push(LoadStmt::LoadRelation {
            name: relation.name.clone(),
        });
    }
    if table.has_load_hook {
        steps.push(LoadStmt::OnLoad);
    }
    steps
}

fn exists_strategy(table: &TableSchema) -> ExistsStrategy {
    let single_key = table.primary_keys().count() == 1;
    match table.auto_increment() {
        Some(column)
            if single_key && matches!(column.codec, Some(ValueCodec::Direct { .. })) =>
        {
            ExistsStrategy::AutoIncrementId {
                field: column.field_name.clone(),
                nullable: column.nullable,
            }
        }
        _ => ExistsStrategy::Query,
    }
}

/// Build the adapter plan of a validated table.
#[must_use]
pub fn plan_adapter(table: &TableSchema, config: &GeneratorConfig) -> AdapterPlan {
    tracing::debug!(entity = %table.entity, table = %table.table_name, "Planning adapter");

    let columns: Vec<String> = table.storage_columns().into_iter().map(str::to_string).collect();
    let insert_columns: Vec<&ColumnSchema> =
        table.columns.iter().filter(|c| !c.is_engine_assigned()).collect();
    let primary_keys: Vec<&ColumnSchema> = table.primary_keys().collect();
    let key_columns = table.primary_key_columns();

    let mut plan = AdapterPlan {
        entity: table.entity.clone(),
        table_name: table.table_name.clone(),
        database: table.database.clone(),
        kind: table.kind,
        columns: columns.clone(),
        insert_query: String::new(),
        update_query: String::new(),
        delete_query: String::new(),
        creation_query: ddl::creation_query(table, config),
        index_queries: Vec::new(),
        insert_conflict: table.insert_conflict,
        update_conflict: table.update_conflict,
        bind_all: bind_block(&table.columns, statement_slots(1)),
        bind_insert: Vec::new(),
        bind_update: Vec::new(),
        bind_delete: Vec::new(),
        bind_content_values: bind_block(insert_columns.iter().copied(), |c| Slot::Key(quote_ident(c))),
        load: load_steps(table),
        exists: exists_strategy(table),
        primary_condition: primary_keys
            .iter()
            .flat_map(|c| bind_units(c))
            .map(|unit| ConditionPart {
                column: unit.column.to_string(),
                source: unit.source,
                codec: unit.codec,
            })
            .collect(),
        caching: None,
        auto_increment: None,
        cascades: CascadePlan {
            load: Vec::new(),
            save: table.one_to_many.iter().filter(|r| r.save).map(|r| r.name.clone()).collect(),
            delete: table.one_to_many.iter().filter(|r| r.delete).map(|r| r.name.clone()).collect(),
        },
    };
    plan.cascades.load = plan
        .load
        .iter()
        .filter_map(|step| match step {
            LoadStmt::LoadRelation { name } => Some(name.clone()),
            _ => None,
        })
        .collect();

    if table.is_table() {
        let insert_names: Vec<&str> = insert_columns
            .iter()
            .flat_map(|c| c.storage_columns())
            .collect();
        plan.insert_query = Insert::into(table.table_name.as_str())
            .or(table.insert_conflict)
            .columns(insert_names)
            .placeholders()
            .query();
        plan.bind_insert = bind_block(insert_columns.iter().copied(), statement_slots(1));
        plan.index_queries = ddl::index_queries(table);

        if !key_columns.is_empty() {
            let set_columns: Vec<&str> = columns.iter().map(String::as_str).collect();
            plan.update_query = Update::table(table.table_name.as_str())
                .or(table.update_conflict)
                .set_group(param_group(ConditionGroup::comma_separated(), &set_columns))
                .filter_group(param_group(ConditionGroup::clause(), &key_columns))
                .query();
            plan.delete_query =
                Delete::table(table.table_name.as_str(), param_group(ConditionGroup::clause(), &key_columns))
                    .query();

            let mut update_binds = bind_block(&table.columns, statement_slots(1));
            update_binds.extend(bind_block(
                primary_keys.iter().copied(),
                statement_slots(columns.len() + 1),
            ));
            plan.bind_update = update_binds;
            plan.bind_delete = bind_block(primary_keys.iter().copied(), statement_slots(1));
        }

        if table.caching_enabled {
            plan.caching = table
                .caching_column()
                .and_then(|column| bind_units(column).into_iter().next())
                .map(|unit| CachingPlan {
                    column: unit.column.to_string(),
                    source: unit.source,
                    codec: unit.codec,
                });
        }
        plan.auto_increment = table.auto_increment().and_then(|column| {
            column.codec.clone().map(|codec| AutoIncrementPlan {
                field: column.field_name.clone(),
                codec,
            })
        });
    }

    plan
}
