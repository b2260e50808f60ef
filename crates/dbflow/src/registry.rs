//! The process-wide database registry.
//!
//! Definitions are registered once at startup and looked up by database
//! name or by model type afterwards.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use dbflow_core::{Error, Result};
use dbflow_query::ModelAdapter;

use crate::definition::DatabaseDefinition;
use crate::error::BuildError;

#[derive(Default)]
struct DatabaseRegistry {
    databases: HashMap<String, Arc<DatabaseDefinition>>,
    /// Model type to owning database name.
    owners: HashMap<TypeId, String>,
}

fn global() -> &'static RwLock<DatabaseRegistry> {
    static REGISTRY: OnceLock<RwLock<DatabaseRegistry>> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(DatabaseRegistry::default()))
}

/// Register a definition. Database names are unique; a model type may belong
/// to one database only.
pub fn register_database(definition: DatabaseDefinition) -> Result<Arc<DatabaseDefinition>, BuildError> {
    let mut registry = global().write().unwrap_or_else(PoisonError::into_inner);
    let name = definition.name().to_string();
    if registry.databases.contains_key(&name) {
        return Err(BuildError::DuplicateDatabase(name));
    }
    let definition = Arc::new(definition);
    for type_id in definition.type_ids() {
        if let Some(owner) = registry.owners.get(&type_id) {
            tracing::warn!(database = %name, owner = %owner, "Model already belongs to another database");
            continue;
        }
        registry.owners.insert(type_id, name.clone());
    }
    registry.databases.insert(name.clone(), Arc::clone(&definition));
    tracing::debug!(database = %name, "Registered database");
    Ok(definition)
}

/// Remove a definition and its model ownership entries.
pub fn unregister_database(name: &str) -> Option<Arc<DatabaseDefinition>> {
    let mut registry = global().write().unwrap_or_else(PoisonError::into_inner);
    let removed = registry.databases.remove(name)?;
    registry.owners.retain(|_, owner| owner != name);
    Some(removed)
}

/// Definition registered under `name`.
pub fn database(name: &str) -> Result<Arc<DatabaseDefinition>> {
    global()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .databases
        .get(name)
        .cloned()
        .ok_or_else(|| Error::NotRegistered(format!("database {name}")))
}

/// Definition that owns model type `M`.
pub fn database_for<M: 'static>() -> Result<Arc<DatabaseDefinition>> {
    let registry = global().read().unwrap_or_else(PoisonError::into_inner);
    registry
        .owners
        .get(&TypeId::of::<M>())
        .and_then(|name| registry.databases.get(name))
        .cloned()
        .ok_or_else(|| Error::NotRegistered(std::any::type_name::<M>().to_string()))
}

/// Definition that owns the model named `entity`.
pub fn database_for_entity(entity: &str) -> Result<Arc<DatabaseDefinition>> {
    global()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .databases
        .values()
        .find(|definition| definition.contains_entity(entity))
        .cloned()
        .ok_or_else(|| Error::NotRegistered(entity.to_string()))
}

/// Adapter for model type `M`, from whichever database owns it.
pub fn adapter_for<M: 'static>() -> Result<Arc<dyn ModelAdapter<M>>> {
    database_for::<M>()?
        .adapter::<M>()
        .ok_or_else(|| Error::NotRegistered(std::any::type_name::<M>().to_string()))
}

/// Names of every registered database, sorted.
#[must_use]
pub fn database_names() -> Vec<String> {
    let registry = global().read().unwrap_or_else(PoisonError::into_inner);
    let mut names: Vec<String> = registry.databases.keys().cloned().collect();
    names.sort();
    names
}
