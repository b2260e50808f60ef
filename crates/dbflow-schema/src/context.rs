//! One generation pass, from declarations to adapter plans.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::builder::build_table;
use crate::codegen::printer::print_sources;
use crate::codegen::{AdapterPlan, RegistryPlan, plan_adapter, plan_registry};
use crate::config::{GeneratorConfig, check_template};
use crate::decl::{DatabaseDecl, EntityDecl, MigrationDecl, SchemaManifest, TypeConverterDecl};
use crate::diagnostics::Diagnostics;
use crate::resolver::{ForeignKeyResolver, resolve_converters};
use crate::table::TableSchema;
use crate::validate::{
    validate_converter, validate_database, validate_migration, validate_one_to_many, validate_table,
};

/// Declarations collected for one generation pass.
///
/// Registration order does not matter: every entity is built before any
/// foreign key is resolved.
#[derive(Debug, Clone, Default)]
pub struct GenerationContext {
    config: GeneratorConfig,
    databases: BTreeMap<String, DatabaseDecl>,
    entities: Vec<EntityDecl>,
    converters: Vec<TypeConverterDecl>,
    migrations: Vec<MigrationDecl>,
}

/// Result of [`GenerationContext::generate`].
#[derive(Debug, Clone, Serialize)]
pub struct GenerationOutput {
    /// Plans of every entity that passed validation, by entity name order.
    pub adapters: Vec<AdapterPlan>,
    pub registry: RegistryPlan,
    /// Resolved schemas of every built entity, valid or not.
    pub tables: BTreeMap<String, TableSchema>,
    /// Rendered Rust source, when enabled in the config.
    pub sources: Option<String>,
    pub diagnostics: Diagnostics,
}

impl GenerationOutput {
    /// Whether any error was reported; the processor's failure status.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics.has_errors()
    }

    #[must_use]
    pub fn adapter(&self, entity: &str) -> Option<&AdapterPlan> {
        self.adapters.iter().find(|a| a.entity == entity)
    }
}

impl GenerationContext {
    #[must_use]
    pub fn new(config: GeneratorConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn from_manifest(manifest: SchemaManifest) -> Self {
        let mut context = Self::new(manifest.config);
        for database in manifest.databases {
            context.register_database(database);
        }
        for entity in manifest.entities {
            context.register_entity(entity);
        }
        for converter in manifest.converters {
            context.register_converter(converter);
        }
        for migration in manifest.migrations {
            context.register_migration(migration);
        }
        context
    }

    #[must_use]
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Register a database; a later declaration with the same name replaces it.
    pub fn register_database(&mut self, database: DatabaseDecl) -> &mut Self {
        self.databases.insert(database.name.clone(), database);
        self
    }

    pub fn register_entity(&mut self, entity: EntityDecl) -> &mut Self {
        self.entities.push(entity);
        self
    }

    pub fn register_converter(&mut self, converter: TypeConverterDecl) -> &mut Self {
        self.converters.push(converter);
        self
    }

    pub fn register_migration(&mut self, migration: MigrationDecl) -> &mut Self {
        self.migrations.push(migration);
        self
    }

    /// Run the whole pipeline. Problems accumulate in the output's
    /// diagnostics; entities with errors are left out of the plans.
    #[must_use]
    pub fn generate(self) -> GenerationOutput {
        let mut diags = Diagnostics::new();
        tracing::info!(
            databases = self.databases.len(),
            entities = self.entities.len(),
            converters = self.converters.len(),
            "Starting generation"
        );

        if let Err(problem) = check_template(&self.config.foreign_key_template) {
            diags.error("<config>", format!("invalid foreign key template: {problem}"));
        }
        for database in self.databases.values() {
            validate_database(database, &mut diags);
        }
        let converters: Vec<TypeConverterDecl> = self
            .converters
            .iter()
            .filter(|c| validate_converter(c, &mut diags))
            .cloned()
            .collect();

        // Phase one: every entity, references left unresolved.
        let mut tables: BTreeMap<String, TableSchema> = BTreeMap::new();
        for decl in &self.entities {
            let entity = decl.type_name.as_str();
            if tables.contains_key(entity) {
                diags.error(entity, "entity is declared twice");
                continue;
            }
            let Some(database) = self.databases.get(&decl.table.database) else {
                diags.error(
                    entity,
                    format!("entity belongs to unknown database `{}`", decl.table.database),
                );
                continue;
            };
            let rejected: Vec<&str> = decl
                .one_to_many
                .iter()
                .filter(|relation| !validate_one_to_many(entity, relation, &mut diags))
                .map(|relation| relation.name.as_str())
                .collect();
            let mut table = build_table(decl, Some(database), &mut diags);
            table.one_to_many.retain(|r| !rejected.contains(&r.name.as_str()));
            tables.insert(entity.to_string(), table);
        }

        // Phase two: converters, then foreign keys across entities.
        resolve_converters(&mut tables, &converters, &mut diags);
        ForeignKeyResolver::new(&self.config, &mut tables, &mut diags).resolve_all();

        let migrations: Vec<MigrationDecl> = self
            .migrations
            .iter()
            .filter(|m| validate_migration(m, &self.databases, &mut diags))
            .cloned()
            .collect();

        let mut adapters = Vec::new();
        for table in tables.values() {
            let valid = validate_table(table, &mut diags);
            // Rejected columns are already gone; only table-level errors drop the entity.
            if valid && !diags.has_element_errors(&table.entity) {
                adapters.push(plan_adapter(table, &self.config));
            } else {
                tracing::warn!(entity = %table.entity, "Skipping entity with errors");
            }
        }

        let registry = plan_registry(&self.databases, &adapters, &converters, &migrations);
        let sources = self
            .config
            .emit_source
            .then(|| print_sources(&adapters, &registry));

        tracing::info!(
            adapters = adapters.len(),
            errors = diags.error_count(),
            diagnostics = diags.len(),
            "Generation finished"
        );
        GenerationOutput {
            adapters,
            registry,
            tables,
            sources,
            diagnostics: diags,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decl::{MemberDecl, PrimaryKeyAttr, TypeRef};
    use dbflow_core::FieldKind;

    fn hero() -> EntityDecl {
        let mut id = MemberDecl::new("id", TypeRef::Primitive(FieldKind::I64));
        id.annotations.primary_key = Some(PrimaryKeyAttr {
            autoincrement: true,
            rowid: false,
        });
        let mut decl = EntityDecl::new("Hero", "App")
            .member(id)
            .member(MemberDecl::new("name", TypeRef::Primitive(FieldKind::String)));
        decl.table.all_fields = true;
        decl
    }

    #[test]
    fn test_generates_valid_entity() {
        let mut context = GenerationContext::new(GeneratorConfig::default());
        context
            .register_database(DatabaseDecl::new("App", 1))
            .register_entity(hero());
        let output = context.generate();
        assert!(!output.has_errors(), "{:?}", output.diagnostics);
        assert_eq!(output.adapters.len(), 1);
        assert_eq!(output.registry.database_for("Hero").map(|d| d.name.as_str()), Some("App"));
        assert!(output.sources.is_some());
    }

    #[test]
    fn test_unknown_database_is_reported() {
        let mut context = GenerationContext::new(GeneratorConfig::default());
        context.register_entity(hero());
        let output = context.generate();
        assert!(output.has_errors());
        assert!(output.adapters.is_empty());
    }

    #[test]
    fn test_bad_entity_does_not_hide_others() {
        let broken = EntityDecl::new("Broken", "App")
            .member(MemberDecl::new("name", TypeRef::Primitive(FieldKind::String)));
        let mut context = GenerationContext::new(GeneratorConfig {
            emit_source: false,
            ..GeneratorConfig::default()
        });
        context
            .register_database(DatabaseDecl::new("App", 1))
            .register_entity(broken)
            .register_entity(hero());
        let output = context.generate();
        assert!(output.has_errors());
        assert!(output.adapter("Hero").is_some());
        assert!(output.adapter("Broken").is_none());
        assert!(output.tables.contains_key("Broken"));
        assert!(output.sources.is_none());
    }

    #[test]
    fn test_bad_column_keeps_the_rest_of_the_table() {
        let mut decl = hero();
        decl.members
            .push(MemberDecl::new("born", TypeRef::Custom("Date".into())));
        let mut context = GenerationContext::new(GeneratorConfig::default());
        context
            .register_database(DatabaseDecl::new("App", 1))
            .register_entity(decl);
        let output = context.generate();

        assert!(output.has_errors());
        let locations: Vec<String> = output.diagnostics.errors().map(|d| d.location()).collect();
        assert_eq!(locations, ["Hero.born"]);
        let plan = output.adapter("Hero").unwrap();
        assert_eq!(plan.columns, ["id", "name"]);
        assert_eq!(plan.insert_query, "INSERT INTO `Hero`(`name`) VALUES(?)");
    }

    #[test]
    fn test_duplicate_entity() {
        let mut context = GenerationContext::new(GeneratorConfig::default());
        context
            .register_database(DatabaseDecl::new("App", 1))
            .register_entity(hero())
            .register_entity(hero());
        let output = context.generate();
        assert_eq!(output.diagnostics.error_count(), 1);
        assert!(output.adapter("Hero").is_none());
    }
}
