//! Per-database registry plan: which adapters, migrations and converters
//! each database owns.

use std::collections::BTreeMap;

use dbflow_core::ConflictAction;
use serde::Serialize;

use crate::codegen::ir::AdapterPlan;
use crate::decl::{DatabaseDecl, EntityKind, MigrationDecl, TypeConverterDecl};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationPlan {
    pub name: String,
    pub version: u32,
    pub priority: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatabasePlan {
    pub name: String,
    pub version: u32,
    pub foreign_keys_enforced: bool,
    pub insert_conflict: ConflictAction,
    pub update_conflict: ConflictAction,
    /// Entities in creation order.
    pub tables: Vec<String>,
    pub views: Vec<String>,
    pub query_models: Vec<String>,
    /// Migrations per version, lower priority values first.
    pub migrations: BTreeMap<u32, Vec<MigrationPlan>>,
    /// Endpoint names, for content-provider wiring.
    pub endpoints: Vec<String>,
}

impl DatabasePlan {
    /// Migrations with `from < version <= to`, in run order.
    pub fn migrations_between(&self, from: u32, to: u32) -> impl Iterator<Item = &MigrationPlan> {
        self.migrations
            .iter()
            .filter(move |(version, _)| **version > from && **version <= to)
            .flat_map(|(_, migrations)| migrations)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConverterPlan {
    pub name: String,
    pub model_type: String,
    pub storage_type: String,
}

/// Lookup tables the runtime registry is built from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegistryPlan {
    pub databases: Vec<DatabasePlan>,
    pub converters: Vec<ConverterPlan>,
    /// Entity type to owning database.
    pub entity_databases: BTreeMap<String, String>,
}

impl RegistryPlan {
    #[must_use]
    pub fn database(&self, name: &str) -> Option<&DatabasePlan> {
        self.databases.iter().find(|db| db.name == name)
    }

    #[must_use]
    pub fn database_for(&self, entity: &str) -> Option<&DatabasePlan> {
        self.entity_databases
            .get(entity)
            .and_then(|name| self.database(name))
    }

    /// Converter registered for a model type.
    #[must_use]
    pub fn converter_for(&self, model_type: &str) -> Option<&ConverterPlan> {
        self.converters.iter().find(|c| c.model_type == model_type)
    }
}

/// Group generated adapters, migrations and converters by database.
///
/// Only adapters that made it through validation are listed; migrations
/// for unknown databases were already reported and are skipped.
pub fn plan_registry(
    databases: &BTreeMap<String, DatabaseDecl>,
    adapters: &[AdapterPlan],
    converters: &[TypeConverterDecl],
    migrations: &[MigrationDecl],
) -> RegistryPlan {
    let mut plan = RegistryPlan {
        converters: converters
            .iter()
            .map(|c| ConverterPlan {
                name: c.name.clone(),
                model_type: c.model_type.clone(),
                storage_type: c.storage_type.clone(),
            })
            .collect(),
        ..RegistryPlan::default()
    };

    for database in databases.values() {
        let mut db = DatabasePlan {
            name: database.name.clone(),
            version: database.version,
            foreign_keys_enforced: database.foreign_keys_enforced,
            insert_conflict: database.insert_conflict,
            update_conflict: database.update_conflict,
            tables: Vec::new(),
            views: Vec::new(),
            query_models: Vec::new(),
            migrations: BTreeMap::new(),
            endpoints: database.endpoints.iter().map(|e| e.name.clone()).collect(),
        };
        for adapter in adapters.iter().filter(|a| a.database == database.name) {
            let bucket = match adapter.kind {
                EntityKind::Table => &mut db.tables,
                EntityKind::View => &mut db.views,
                EntityKind::QueryModel => &mut db.query_models,
            };
            bucket.push(adapter.entity.clone());
            plan.entity_databases
                .insert(adapter.entity.clone(), database.name.clone());
        }
        for migration in migrations.iter().filter(|m| m.database == database.name) {
            db.migrations
                .entry(migration.version)
                .or_default()
                .push(MigrationPlan {
                    name: migration.name.clone(),
                    version: migration.version,
                    priority: migration.priority,
                });
        }
        for list in db.migrations.values_mut() {
            list.sort_by_key(|m| m.priority);
        }
        tracing::debug!(
            database = %db.name,
            tables = db.tables.len(),
            views = db.views.len(),
            migrations = db.migrations.values().map(Vec::len).sum::<usize>(),
            "Planned database registry"
        );
        plan.databases.push(db);
    }
    plan
}
