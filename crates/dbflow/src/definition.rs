//! Runtime database definitions: which adapters and migrations a database
//! owns, and how it is created and upgraded.

use std::any::{Any, TypeId};
use std::collections::BTreeMap;
use std::sync::Arc;

use dbflow_core::{
    ConflictAction, DatabaseWrapper, Model, Result, StoragePrimitive, TypeConverter,
    register_converter, short_type_name,
};
use dbflow_query::ModelAdapter;
use dbflow_schema::{
    AdapterPlan, DatabaseDecl, Diagnostics, EntityDecl, EntityKind, GenerationContext,
    GeneratorConfig, PlanAdapter, TypeConverterDecl,
};

use crate::error::BuildError;
use crate::migration::Migration;
use crate::table::Table;

const FOREIGN_KEYS_PRAGMA: &str = "PRAGMA foreign_keys=ON";

/// One registered model type.
struct EntityEntry {
    type_id: TypeId,
    name: &'static str,
    kind: EntityKind,
    table_name: String,
    creation_query: String,
    index_queries: Vec<String>,
    /// `Arc<dyn ModelAdapter<M>>` for the entry's model type.
    adapter: Box<dyn Any + Send + Sync>,
}

struct MigrationEntry {
    priority: i32,
    migration: Box<dyn Migration>,
}

/// A table whose adapter is planned when the builder runs.
struct PendingTable {
    type_id: TypeId,
    name: &'static str,
    decl: EntityDecl,
    attach: fn(AdapterPlan) -> Box<dyn Any + Send + Sync>,
}

fn attach_plan<T: Table + 'static>(plan: AdapterPlan) -> Box<dyn Any + Send + Sync> {
    let adapter: Arc<dyn ModelAdapter<T>> = Arc::new(PlanAdapter::<T>::new(plan));
    Box::new(adapter)
}

fn kind_rank(kind: EntityKind) -> u8 {
    match kind {
        EntityKind::Table => 0,
        EntityKind::View => 1,
        EntityKind::QueryModel => 2,
    }
}

/// Rust name of the field kind a storage class is declared with.
fn storage_type_name(storage: StoragePrimitive) -> &'static str {
    match storage {
        StoragePrimitive::Integer => "i64",
        StoragePrimitive::Real => "f64",
        StoragePrimitive::Text => "String",
        StoragePrimitive::Blob => "Vec<u8>",
    }
}

/// Assembles a [`DatabaseDefinition`].
///
/// Tables registered with [`DatabaseBuilder::table`] are run through the
/// generation pipeline when [`DatabaseBuilder::build`] is called; adapters
/// registered with [`DatabaseBuilder::adapter`] (typically generated
/// source) are used as given.
///
/// # Example
///
/// ```ignore
/// let definition = DatabaseBuilder::new("League", 2)
///     .foreign_keys(true)
///     .table::<Team>()
///     .table::<Hero>()
///     .migration(2, 0, AlterTableMigration::new("Hero").add_column(StoragePrimitive::Text, "nickname"))
///     .build()?;
/// definition.on_create(&db)?;
/// ```
pub struct DatabaseBuilder {
    decl: DatabaseDecl,
    config: GeneratorConfig,
    pending: Vec<PendingTable>,
    entries: Vec<EntityEntry>,
    converters: Vec<TypeConverterDecl>,
    migrations: Vec<(u32, MigrationEntry)>,
}

impl std::fmt::Debug for DatabaseBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseBuilder")
            .field("name", &self.decl.name)
            .field("version", &self.decl.version)
            .field("tables", &self.pending.len())
            .field("adapters", &self.entries.len())
            .field("migrations", &self.migrations.len())
            .finish()
    }
}

impl DatabaseBuilder {
    pub fn new(name: impl Into<String>, version: u32) -> Self {
        Self {
            decl: DatabaseDecl::new(name, version),
            config: GeneratorConfig {
                emit_source: false,
                ..GeneratorConfig::default()
            },
            pending: Vec::new(),
            entries: Vec::new(),
            converters: Vec::new(),
            migrations: Vec::new(),
        }
    }

    /// Enable `PRAGMA foreign_keys` whenever the database is opened.
    #[must_use]
    pub fn foreign_keys(mut self, enforced: bool) -> Self {
        self.decl.foreign_keys_enforced = enforced;
        self
    }

    /// Default insert conflict action for tables that do not set one.
    #[must_use]
    pub fn insert_conflict(mut self, action: ConflictAction) -> Self {
        self.decl.insert_conflict = action;
        self
    }

    /// Default update conflict action for tables that do not set one.
    #[must_use]
    pub fn update_conflict(mut self, action: ConflictAction) -> Self {
        self.decl.update_conflict = action;
        self
    }

    /// Generator settings used for tables registered with [`DatabaseBuilder::table`].
    #[must_use]
    pub fn config(mut self, config: GeneratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Register a table, view or query model by its declaration.
    #[must_use]
    pub fn table<T: Table + 'static>(mut self) -> Self {
        self.pending.push(PendingTable {
            type_id: TypeId::of::<T>(),
            name: T::NAME,
            decl: T::entity_decl(),
            attach: attach_plan::<T>,
        });
        self
    }

    /// Register a ready-made adapter and the index DDL of its table.
    #[must_use]
    pub fn adapter<M, A>(mut self, kind: EntityKind, adapter: A, index_queries: &[&str]) -> Self
    where
        M: Model + 'static,
        A: ModelAdapter<M> + 'static,
    {
        let table_name = adapter.table_name().to_string();
        let creation_query = adapter.creation_query();
        let adapter: Arc<dyn ModelAdapter<M>> = Arc::new(adapter);
        self.entries.push(EntityEntry {
            type_id: TypeId::of::<M>(),
            name: M::NAME,
            kind,
            table_name,
            creation_query,
            index_queries: index_queries.iter().map(ToString::to_string).collect(),
            adapter: Box::new(adapter),
        });
        self
    }

    /// Register a value converter process-wide and declare it for planning.
    #[must_use]
    pub fn converter<C: TypeConverter>(mut self, converter: C) -> Self {
        self.converters.push(TypeConverterDecl {
            name: TypeConverter::name(&converter).to_string(),
            model_type: short_type_name::<C::Model>().to_string(),
            storage_type: storage_type_name(C::STORAGE).to_string(),
            generic_params: Vec::new(),
        });
        register_converter(converter);
        self
    }

    /// Register a migration for `version`; lower `priority` runs first.
    #[must_use]
    pub fn migration(mut self, version: u32, priority: i32, migration: impl Migration + 'static) -> Self {
        self.migrations.push((
            version,
            MigrationEntry {
                priority,
                migration: Box::new(migration),
            },
        ));
        self
    }

    fn plan_pending(&mut self) -> Result<Vec<EntityEntry>, BuildError> {
        if self.pending.is_empty() {
            return Ok(Vec::new());
        }
        for table in &self.pending {
            if table.decl.table.database != self.decl.name {
                return Err(BuildError::WrongDatabase {
                    database: self.decl.name.clone(),
                    entity: table.name.to_string(),
                    declared: table.decl.table.database.clone(),
                });
            }
        }

        let mut context = GenerationContext::new(self.config.clone());
        context.register_database(self.decl.clone());
        for table in &self.pending {
            context.register_entity(table.decl.clone());
        }
        for converter in &self.converters {
            context.register_converter(converter.clone());
        }
        let output = context.generate();
        for diagnostic in output.diagnostics.iter().filter(|d| !d.is_error()) {
            tracing::warn!(database = %self.decl.name, element = %diagnostic.location(), "{}", diagnostic.message);
        }
        if output.has_errors() {
            return Err(BuildError::Generation {
                database: self.decl.name.clone(),
                diagnostics: output.diagnostics,
            });
        }

        let mut entries = Vec::with_capacity(self.pending.len());
        for table in self.pending.drain(..) {
            let Some(plan) = output.adapter(table.name).cloned() else {
                let mut diagnostics = Diagnostics::new();
                diagnostics.error(table.name, "no adapter was generated");
                return Err(BuildError::Generation {
                    database: self.decl.name.clone(),
                    diagnostics,
                });
            };
            tracing::trace!(entity = table.name, sql = %plan.creation_query, "Planned table");
            entries.push(EntityEntry {
                type_id: table.type_id,
                name: table.name,
                kind: plan.kind,
                table_name: plan.table_name.clone(),
                creation_query: plan.creation_query.clone(),
                index_queries: plan.index_queries.clone(),
                adapter: (table.attach)(plan),
            });
        }
        Ok(entries)
    }

    /// Plan every registered table and assemble the definition.
    pub fn build(mut self) -> Result<DatabaseDefinition, BuildError> {
        let name = self.decl.name.clone();
        for (index, table) in self.pending.iter().enumerate() {
            let seen_before = self.pending[..index].iter().any(|t| t.type_id == table.type_id)
                || self.entries.iter().any(|e| e.type_id == table.type_id);
            if seen_before {
                return Err(BuildError::DuplicateEntity {
                    database: name,
                    entity: table.name.to_string(),
                });
            }
        }
        for (index, entry) in self.entries.iter().enumerate() {
            if self.entries[..index].iter().any(|e| e.type_id == entry.type_id) {
                return Err(BuildError::DuplicateEntity {
                    database: name,
                    entity: entry.name.to_string(),
                });
            }
        }

        let mut entities = self.plan_pending()?;
        entities.append(&mut self.entries);
        entities.sort_by_key(|entry| kind_rank(entry.kind));

        let mut migrations: BTreeMap<u32, Vec<MigrationEntry>> = BTreeMap::new();
        for (version, entry) in self.migrations {
            if version > self.decl.version {
                tracing::warn!(
                    database = %name,
                    version,
                    current = self.decl.version,
                    "Migration is above the database version and will not run yet"
                );
            }
            migrations.entry(version).or_default().push(entry);
        }
        for entries in migrations.values_mut() {
            entries.sort_by_key(|entry| entry.priority);
        }

        tracing::info!(
            database = %name,
            version = self.decl.version,
            entities = entities.len(),
            "Built database definition"
        );
        Ok(DatabaseDefinition {
            name,
            version: self.decl.version,
            foreign_keys: self.decl.foreign_keys_enforced,
            insert_conflict: self.decl.insert_conflict,
            update_conflict: self.decl.update_conflict,
            entities,
            migrations,
        })
    }
}

/// A database's adapters, DDL and migrations.
pub struct DatabaseDefinition {
    name: String,
    version: u32,
    foreign_keys: bool,
    insert_conflict: ConflictAction,
    update_conflict: ConflictAction,
    /// Tables, then views, then query models.
    entities: Vec<EntityEntry>,
    migrations: BTreeMap<u32, Vec<MigrationEntry>>,
}

impl std::fmt::Debug for DatabaseDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseDefinition")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("foreign_keys", &self.foreign_keys)
            .field("entities", &self.entities.iter().map(|e| e.name).collect::<Vec<_>>())
            .field("migration_versions", &self.migrations.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl DatabaseDefinition {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn version(&self) -> u32 {
        self.version
    }

    #[must_use]
    pub fn foreign_keys_enforced(&self) -> bool {
        self.foreign_keys
    }

    #[must_use]
    pub fn insert_conflict(&self) -> ConflictAction {
        self.insert_conflict
    }

    #[must_use]
    pub fn update_conflict(&self) -> ConflictAction {
        self.update_conflict
    }

    /// Model names of the given kind, in creation order.
    pub fn entities_of(&self, kind: EntityKind) -> impl Iterator<Item = &'static str> + '_ {
        self.entities
            .iter()
            .filter(move |entry| entry.kind == kind)
            .map(|entry| entry.name)
    }

    #[must_use]
    pub fn contains<M: 'static>(&self) -> bool {
        self.entry(TypeId::of::<M>()).is_some()
    }

    /// Whether a model with this name belongs to the database.
    #[must_use]
    pub fn contains_entity(&self, name: &str) -> bool {
        self.entities.iter().any(|entry| entry.name == name)
    }

    /// Table name of a registered model.
    #[must_use]
    pub fn table_name_of(&self, entity: &str) -> Option<&str> {
        self.entities
            .iter()
            .find(|entry| entry.name == entity)
            .map(|entry| entry.table_name.as_str())
    }

    pub(crate) fn type_ids(&self) -> impl Iterator<Item = TypeId> + '_ {
        self.entities.iter().map(|entry| entry.type_id)
    }

    fn entry(&self, type_id: TypeId) -> Option<&EntityEntry> {
        self.entities.iter().find(|entry| entry.type_id == type_id)
    }

    /// Adapter for model type `M`.
    #[must_use]
    pub fn adapter<M: 'static>(&self) -> Option<Arc<dyn ModelAdapter<M>>> {
        self.entry(TypeId::of::<M>())?
            .adapter
            .downcast_ref::<Arc<dyn ModelAdapter<M>>>()
            .cloned()
    }

    /// Migrations registered for exactly `version`, in run order.
    pub fn migrations_for(&self, version: u32) -> impl Iterator<Item = &dyn Migration> {
        self.migrations
            .get(&version)
            .into_iter()
            .flatten()
            .map(|entry| entry.migration.as_ref())
    }

    /// Versions that have migrations, ascending.
    pub fn migration_versions(&self) -> impl Iterator<Item = u32> + '_ {
        self.migrations.keys().copied()
    }

    /// Table DDL, each followed by its index DDL.
    #[must_use]
    pub fn table_creation_queries(&self) -> Vec<String> {
        self.entities
            .iter()
            .filter(|entry| entry.kind == EntityKind::Table)
            .flat_map(|entry| {
                std::iter::once(entry.creation_query.clone()).chain(entry.index_queries.iter().cloned())
            })
            .collect()
    }

    #[must_use]
    pub fn view_creation_queries(&self) -> Vec<String> {
        self.entities
            .iter()
            .filter(|entry| entry.kind == EntityKind::View)
            .map(|entry| entry.creation_query.clone())
            .collect()
    }

    /// Create the schema of a new database and bring it to the current
    /// version.
    pub fn on_create(&self, db: &dyn DatabaseWrapper) -> Result<()> {
        tracing::info!(database = %self.name, version = self.version, "Creating database");
        self.enable_foreign_keys(db)?;
        in_transaction(db, || {
            self.create_tables(db)?;
            self.run_migrations(db, 0, self.version)?;
            self.create_views(db)
        })
    }

    /// Upgrade a database from `old_version` to `new_version`: create any
    /// missing tables, run migrations with `old < version <= new`, then
    /// create any missing views.
    pub fn on_upgrade(&self, db: &dyn DatabaseWrapper, old_version: u32, new_version: u32) -> Result<()> {
        tracing::info!(
            database = %self.name,
            from = old_version,
            to = new_version,
            "Upgrading database"
        );
        self.enable_foreign_keys(db)?;
        in_transaction(db, || {
            self.create_tables(db)?;
            self.run_migrations(db, old_version, new_version)?;
            self.create_views(db)
        })
    }

    /// Open hook: re-enables foreign keys, which the engine resets per
    /// connection.
    pub fn on_open(&self, db: &dyn DatabaseWrapper) -> Result<()> {
        self.enable_foreign_keys(db)
    }

    fn enable_foreign_keys(&self, db: &dyn DatabaseWrapper) -> Result<()> {
        if self.foreign_keys {
            tracing::debug!(database = %self.name, "Enabling foreign keys");
            db.exec_sql(FOREIGN_KEYS_PRAGMA)?;
        }
        Ok(())
    }

    fn create_tables(&self, db: &dyn DatabaseWrapper) -> Result<()> {
        for sql in self.table_creation_queries() {
            tracing::trace!(database = %self.name, sql = %sql, "Creating table");
            db.exec_sql(&sql)?;
        }
        Ok(())
    }

    fn create_views(&self, db: &dyn DatabaseWrapper) -> Result<()> {
        for sql in self.view_creation_queries() {
            tracing::trace!(database = %self.name, sql = %sql, "Creating view");
            db.exec_sql(&sql)?;
        }
        Ok(())
    }

    fn run_migrations(&self, db: &dyn DatabaseWrapper, from: u32, to: u32) -> Result<()> {
        for (version, entries) in self.migrations.range(from.saturating_add(1)..) {
            if *version > to {
                break;
            }
            tracing::info!(database = %self.name, version, count = entries.len(), "Running migrations");
            for entry in entries {
                entry.migration.on_pre_migrate();
                entry.migration.migrate(db)?;
                entry.migration.on_post_migrate();
            }
        }
        Ok(())
    }
}

/// Run `work` between begin and end, marking success only if it returned Ok.
pub(crate) fn in_transaction<T>(db: &dyn DatabaseWrapper, work: impl FnOnce() -> Result<T>) -> Result<T> {
    db.begin_transaction()?;
    let result = work();
    if result.is_ok() {
        if let Err(err) = db.set_transaction_successful() {
            db.end_transaction()?;
            return Err(err);
        }
    }
    db.end_transaction()?;
    result
}
