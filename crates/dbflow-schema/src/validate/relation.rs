//! Rules for one-to-many relations, endpoints, converters, migrations and databases.

use std::collections::BTreeMap;

use dbflow_core::FieldKind;

use crate::decl::{DatabaseDecl, EndpointDecl, MigrationDecl, OneToManyDecl, TypeConverterDecl};
use crate::diagnostics::Diagnostics;

pub fn validate_one_to_many(entity: &str, relation: &OneToManyDecl, diags: &mut Diagnostics) -> bool {
    let before = diags.error_count();
    if relation.name.trim().is_empty() {
        diags.error(entity, "a one-to-many relation needs a name");
    }
    if relation.methods.is_empty() {
        diags.member_error(entity, &relation.name, "a one-to-many relation needs at least one method");
    }
    if !relation.returns_collection {
        diags.member_error(entity, &relation.name, "a one-to-many accessor must return a collection");
    }
    diags.error_count() == before
}

pub fn validate_endpoint(database: &str, endpoint: &EndpointDecl, diags: &mut Diagnostics) -> bool {
    let before = diags.error_count();
    if endpoint.uris.is_empty() {
        diags.member_error(database, &endpoint.name, "an endpoint must expose at least one URI");
    }
    for uri in &endpoint.uris {
        if uri.path.trim().is_empty() {
            diags.member_error(database, &endpoint.name, "a content URI needs a path");
        }
        if let Some(ty) = uri.accessor_return_type.as_deref().filter(|ty| *ty != "String") {
            diags.member_error(
                database,
                &endpoint.name,
                format!("content URI accessor for `{}` must return String, not {ty}", uri.path),
            );
        }
    }
    diags.error_count() == before
}

/// Both sides of a converter must be concrete, and the storage side a built-in kind.
pub fn validate_converter(converter: &TypeConverterDecl, diags: &mut Diagnostics) -> bool {
    let before = diags.error_count();
    let is_open = |ty: &str| converter.generic_params.iter().any(|p| p == ty);
    if converter.model_type.trim().is_empty() || is_open(&converter.model_type) {
        diags.error(
            &converter.name,
            format!("model type `{}` is not a concrete type", converter.model_type),
        );
    }
    if is_open(&converter.storage_type) || FieldKind::from_rust_name(&converter.storage_type).is_none() {
        diags.error(
            &converter.name,
            format!("storage type `{}` is not a storable type", converter.storage_type),
        );
    }
    diags.error_count() == before
}

pub fn validate_migration(
    migration: &MigrationDecl,
    databases: &BTreeMap<String, DatabaseDecl>,
    diags: &mut Diagnostics,
) -> bool {
    let Some(database) = databases.get(&migration.database) else {
        diags.error(
            &migration.name,
            format!("migration targets unknown database `{}`", migration.database),
        );
        return false;
    };
    if migration.version > database.version {
        diags.warning(
            &migration.name,
            format!(
                "migration version {} is above database version {} and will not run",
                migration.version, database.version
            ),
        );
    }
    true
}

pub fn validate_database(database: &DatabaseDecl, diags: &mut Diagnostics) -> bool {
    let before = diags.error_count();
    if database.name.trim().is_empty() {
        diags.error("<database>", "a database needs a name");
    }
    if database.version == 0 {
        diags.error(&database.name, "database version starts at 1");
    }
    for endpoint in &database.endpoints {
        validate_endpoint(&database.name, endpoint, diags);
    }
    diags.error_count() == before
}
