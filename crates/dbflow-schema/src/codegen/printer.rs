//! Rust source rendering of adapter and registry plans.
//!
//! Output is meant to be written from a build script and `include!`d; it
//! refers to everything through `::dbflow` paths and to the entity and
//! converter types by the names they were declared with.

use proc_macro2::{Ident, Literal, Span, TokenStream};
use quote::{format_ident, quote};

use dbflow_core::{ConflictAction, FieldKind, StoragePrimitive, sanitize_identifier};

use crate::codegen::ir::{
    AdapterPlan, BindStmt, ColumnRead, ExistsStrategy, FieldPath, LoadStmt, Slot,
};
use crate::codegen::registry::{DatabasePlan, RegistryPlan};
use crate::column::ValueCodec;
use crate::decl::EntityKind;

/// A valid identifier for `name`.
fn ident(name: &str) -> Ident {
    let mut clean = sanitize_identifier(name);
    if clean.starts_with(|c: char| c.is_ascii_digit()) {
        clean.insert(0, '_');
    }
    Ident::new(&clean, Span::call_site())
}

/// Type path from a declared name such as `models::Hero`.
fn type_path(name: &str) -> TokenStream {
    let segments = name.split("::").filter(|s| !s.is_empty()).map(ident);
    quote! { #(#segments)::* }
}

fn adapter_ident(entity: &str) -> Ident {
    let last = entity.rsplit("::").next().unwrap_or(entity);
    format_ident!("{}Adapter", ident(last))
}

fn index_lit(index: usize) -> Literal {
    Literal::usize_unsuffixed(index)
}

fn kind_tokens(kind: FieldKind) -> TokenStream {
    let variant = ident(&format!("{kind:?}"));
    quote! { ::dbflow::FieldKind::#variant }
}

fn storage_tokens(storage: StoragePrimitive) -> TokenStream {
    let variant = ident(&format!("{storage:?}"));
    quote! { ::dbflow::StoragePrimitive::#variant }
}

fn conflict_tokens(conflict: ConflictAction) -> TokenStream {
    let variant = ident(&format!("{conflict:?}"));
    quote! { ::dbflow::ConflictAction::#variant }
}

fn entity_kind_tokens(kind: EntityKind) -> TokenStream {
    let variant = ident(&format!("{kind:?}"));
    quote! { ::dbflow::EntityKind::#variant }
}

fn codec_tokens(codec: &ValueCodec) -> TokenStream {
    match codec {
        ValueCodec::Direct { kind } => {
            let kind = kind_tokens(*kind);
            quote! { ::dbflow::schema::ValueCodec::Direct { kind: #kind } }
        }
        ValueCodec::Enum => quote! { ::dbflow::schema::ValueCodec::Enum },
        ValueCodec::Converter {
            name,
            storage,
            kind,
        } => {
            let storage = storage_tokens(*storage);
            let kind = match kind {
                Some(kind) => {
                    let kind = kind_tokens(*kind);
                    quote! { ::std::option::Option::Some(#kind) }
                }
                None => quote! { ::std::option::Option::None },
            };
            quote! {
                ::dbflow::schema::ValueCodec::Converter {
                    name: ::std::string::String::from(#name),
                    storage: #storage,
                    kind: #kind,
                }
            }
        }
    }
}

fn field_tokens(source: &FieldPath) -> TokenStream {
    let field = &source.field;
    let path = &source.path;
    quote! { ::dbflow::schema::field_at(model, #field, &[#(#path),*])? }
}

fn encode_tokens(source: &FieldPath, codec: &ValueCodec) -> TokenStream {
    let codec = codec_tokens(codec);
    let dotted = source.dotted();
    let value = field_tokens(source);
    quote! { (#codec).encode(#dotted, &#value)? }
}

fn bind_tokens(stmt: &BindStmt) -> TokenStream {
    match stmt {
        BindStmt::Bind {
            slot: Slot::Index(index),
            source,
            codec,
        } => {
            let index = index_lit(*index);
            let value = encode_tokens(source, codec);
            quote! { statement.bind_value(#index, &#value); }
        }
        BindStmt::Bind {
            slot: Slot::Key(key),
            source,
            codec,
        } => {
            let value = encode_tokens(source, codec);
            quote! { values.put(#key, #value); }
        }
        BindStmt::BindNull {
            slot: Slot::Index(index),
        } => {
            let index = index_lit(*index);
            quote! { statement.bind_null(#index); }
        }
        BindStmt::BindNull {
            slot: Slot::Key(key),
        } => quote! { values.put_null(#key); },
        BindStmt::IfNotNull {
            field,
            then,
            otherwise,
        } => {
            let then = then.iter().map(bind_tokens);
            let otherwise = otherwise.iter().map(bind_tokens);
            quote! {
                if ::dbflow::schema::field_at(model, #field, &[])?.is_null() {
                    #(#otherwise)*
                } else {
                    #(#then)*
                }
            }
        }
    }
}

fn binder_body(stmts: &[BindStmt]) -> TokenStream {
    let stmts = stmts.iter().map(bind_tokens);
    quote! {
        #(#stmts)*
        ::std::result::Result::Ok(())
    }
}

fn read_tokens(read: &ColumnRead) -> TokenStream {
    let column = &read.column;
    let getter = ident(&format!("{:?}", read.getter));
    let codec = codec_tokens(&read.codec);
    quote! {
        (#codec).decode(
            #column,
            ::dbflow::schema::read_value(cursor, index, ::dbflow::CursorGetter::#getter),
        )?
    }
}

fn load_tokens(stmt: &LoadStmt) -> TokenStream {
    match stmt {
        LoadStmt::Assign {
            field,
            read,
            nullable,
        } => {
            let column = &read.column;
            let value = read_tokens(read);
            let assign = if *nullable {
                quote! {
                    if cursor.is_null(index) {
                        ::dbflow::Model::set_field(model, #field, ::dbflow::FieldValue::Null)?;
                    } else {
                        ::dbflow::Model::set_field(model, #field, #value)?;
                    }
                }
            } else {
                quote! { ::dbflow::Model::set_field(model, #field, #value)?; }
            };
            quote! {
                if let ::std::option::Option::Some(index) = cursor.column_index(#column) {
                    #assign
                }
            }
        }
        LoadStmt::AssignReference {
            field,
            nullable,
            reads,
        } => {
            let reads = reads.iter().map(|read| {
                let column = &read.column;
                let path = &read.path;
                let value = read_tokens(read);
                quote! {
                    if let ::std::option::Option::Some(index) = cursor.column_index(#column) {
                        present = true;
                        if !cursor.is_null(index) {
                            all_null = false;
                            entries.push((
                                ::std::vec![#(::std::string::String::from(#path)),*],
                                #value,
                            ));
                        }
                    }
                }
            });
            quote! {
                {
                    let mut entries = ::std::vec::Vec::new();
                    let mut present = false;
                    let mut all_null = true;
                    #(#reads)*
                    if present {
                        let value = if all_null && #nullable {
                            ::dbflow::FieldValue::Null
                        } else {
                            ::dbflow::schema::nested_record(entries)
                        };
                        ::dbflow::Model::set_field(model, #field, value)?;
                    }
                }
            }
        }
        LoadStmt::LoadRelation { name } => {
            quote! { ::dbflow::ModelHooks::load_related(model, #name, db)?; }
        }
        LoadStmt::OnLoad => quote! { ::dbflow::ModelHooks::on_load(model); },
    }
}

/// Source of the adapter struct and its `ModelAdapter` implementation.
#[must_use]
pub fn render_adapter(plan: &AdapterPlan) -> TokenStream {
    let model = type_path(&plan.entity);
    let adapter = adapter_ident(&plan.entity);
    let table = &plan.table_name;
    let columns = &plan.columns;
    let insert_query = &plan.insert_query;
    let update_query = &plan.update_query;
    let delete_query = &plan.delete_query;
    let creation_query = &plan.creation_query;
    let insert_conflict = conflict_tokens(plan.insert_conflict);
    let update_conflict = conflict_tokens(plan.update_conflict);

    let load = plan.load.iter().map(load_tokens);
    let bind_all = binder_body(&plan.bind_all);
    let bind_insert = binder_body(&plan.bind_insert);
    let bind_update = binder_body(&plan.bind_update);
    let bind_delete = binder_body(&plan.bind_delete);
    let bind_content_values = binder_body(&plan.bind_content_values);

    let conditions = plan.primary_condition.iter().map(|part| {
        let column = &part.column;
        let value = encode_tokens(&part.source, &part.codec);
        quote! { .and(::dbflow::Operator::column(#column).eq(#value)) }
    });

    let exists = match (&plan.exists, plan.primary_condition.is_empty()) {
        (ExistsStrategy::AutoIncrementId { field, .. }, _) => quote! {
            let _ = db;
            ::std::result::Result::Ok(
                ::dbflow::schema::field_at(model, #field, &[])?
                    .to_storage()?
                    .as_i64()
                    .is_some_and(|id| id > 0),
            )
        },
        (ExistsStrategy::Query, true) => quote! {
            let _ = (model, db);
            ::std::result::Result::Ok(false)
        },
        (ExistsStrategy::Query, false) => quote! {
            let count = ::dbflow::Select::count_of()
                .from(#table)
                .filter_group(self.primary_condition(model)?)
                .long_value(db)?;
            ::std::result::Result::Ok(count > 0)
        },
    };

    let caching = plan.caching.as_ref().map(|caching| {
        let column = &caching.column;
        let value = encode_tokens(&caching.source, &caching.codec);
        quote! {
            fn has_caching_id(&self) -> bool {
                true
            }

            fn caching_column_name(&self) -> ::std::option::Option<&str> {
                ::std::option::Option::Some(#column)
            }

            fn caching_id(
                &self,
                model: &#model,
            ) -> ::dbflow::Result<::std::option::Option<::dbflow::Value>> {
                ::std::result::Result::Ok(::std::option::Option::Some(#value))
            }
        }
    });

    let auto_increment = plan.auto_increment.as_ref().map(|auto| {
        let field = &auto.field;
        let codec = codec_tokens(&auto.codec);
        quote! {
            fn auto_increment_id(&self, model: &#model) -> ::dbflow::Result<::std::option::Option<i64>> {
                ::std::result::Result::Ok(
                    ::dbflow::schema::field_at(model, #field, &[])?.to_storage()?.as_i64(),
                )
            }

            fn update_auto_increment(&self, model: &mut #model, id: i64) -> ::dbflow::Result<()> {
                let value = (#codec).decode(#field, ::dbflow::Value::Integer(id))?;
                ::dbflow::Model::set_field(model, #field, value)
            }
        }
    });

    let save_relations = (!plan.cascades.save.is_empty()).then(|| {
        let names = &plan.cascades.save;
        quote! {
            fn save_relations(
                &self,
                model: &#model,
                db: &dyn ::dbflow::DatabaseWrapper,
            ) -> ::dbflow::Result<()> {
                #(::dbflow::ModelHooks::save_related(model, #names, db)?;)*
                ::std::result::Result::Ok(())
            }
        }
    });

    let delete_relations = (!plan.cascades.delete.is_empty()).then(|| {
        let names = &plan.cascades.delete;
        quote! {
            fn delete_relations(
                &self,
                model: &#model,
                db: &dyn ::dbflow::DatabaseWrapper,
            ) -> ::dbflow::Result<()> {
                #(::dbflow::ModelHooks::delete_related(model, #names, db)?;)*
                ::std::result::Result::Ok(())
            }
        }
    });

    quote! {
        #[derive(Debug, Clone, Copy, Default)]
        pub struct #adapter;

        impl ::dbflow::ModelAdapter<#model> for #adapter {
            fn table_name(&self) -> &str {
                #table
            }

            fn new_instance(&self) -> #model {
                <#model as ::dbflow::Model>::new_instance()
            }

            fn column_names(&self) -> ::std::vec::Vec<::std::string::String> {
                ::std::vec![#(::std::string::String::from(#columns)),*]
            }

            fn load_from_cursor(
                &self,
                cursor: &dyn ::dbflow::FlowCursor,
                model: &mut #model,
                db: &dyn ::dbflow::DatabaseWrapper,
            ) -> ::dbflow::Result<()> {
                let _ = db;
                #(#load)*
                ::std::result::Result::Ok(())
            }

            fn bind_to_statement(
                &self,
                statement: &mut dyn ::dbflow::DatabaseStatement,
                model: &#model,
            ) -> ::dbflow::Result<()> {
                #bind_all
            }

            fn bind_to_insert_statement(
                &self,
                statement: &mut dyn ::dbflow::DatabaseStatement,
                model: &#model,
            ) -> ::dbflow::Result<()> {
                #bind_insert
            }

            fn bind_to_update_statement(
                &self,
                statement: &mut dyn ::dbflow::DatabaseStatement,
                model: &#model,
            ) -> ::dbflow::Result<()> {
                #bind_update
            }

            fn bind_to_delete_statement(
                &self,
                statement: &mut dyn ::dbflow::DatabaseStatement,
                model: &#model,
            ) -> ::dbflow::Result<()> {
                #bind_delete
            }

            fn bind_to_content_values(
                &self,
                values: &mut ::dbflow::ContentValues,
                model: &#model,
            ) -> ::dbflow::Result<()> {
                #bind_content_values
            }

            fn exists(
                &self,
                model: &#model,
                db: &dyn ::dbflow::DatabaseWrapper,
            ) -> ::dbflow::Result<bool> {
                #exists
            }

            fn primary_condition(&self, model: &#model) -> ::dbflow::Result<::dbflow::ConditionGroup> {
                let _ = model;
                ::std::result::Result::Ok(::dbflow::ConditionGroup::clause()#(#conditions)*)
            }

            fn insert_statement_query(&self) -> ::std::string::String {
                ::std::string::String::from(#insert_query)
            }

            fn update_statement_query(&self) -> ::std::string::String {
                ::std::string::String::from(#update_query)
            }

            fn delete_statement_query(&self) -> ::std::string::String {
                ::std::string::String::from(#delete_query)
            }

            fn creation_query(&self) -> ::std::string::String {
                ::std::string::String::from(#creation_query)
            }

            fn insert_on_conflict_action(&self) -> ::dbflow::ConflictAction {
                #insert_conflict
            }

            fn update_on_conflict_action(&self) -> ::dbflow::ConflictAction {
                #update_conflict
            }

            #caching
            #auto_increment
            #save_relations
            #delete_relations
        }
    }
}

fn render_database(database: &DatabasePlan, adapters: &[AdapterPlan]) -> TokenStream {
    let function = format_ident!("{}_database", ident(&database.name.to_lowercase()));
    let name = &database.name;
    let version = Literal::u32_unsuffixed(database.version);
    let foreign_keys = database.foreign_keys_enforced;
    let insert_conflict = conflict_tokens(database.insert_conflict);
    let update_conflict = conflict_tokens(database.update_conflict);

    let ordered = database
        .tables
        .iter()
        .chain(&database.views)
        .chain(&database.query_models);
    let entries = ordered.filter_map(|entity| {
        let plan = adapters.iter().find(|p| &p.entity == entity)?;
        let model = type_path(entity);
        let adapter = adapter_ident(entity);
        let kind = entity_kind_tokens(plan.kind);
        let indexes = &plan.index_queries;
        Some(quote! { .adapter::<#model, _>(#kind, #adapter, &[#(#indexes),*]) })
    });

    let migrations = database.migrations.values().flatten().map(|migration| {
        let version = Literal::u32_unsuffixed(migration.version);
        let priority = Literal::i32_unsuffixed(migration.priority);
        let ty = type_path(&migration.name);
        quote! { .migration(#version, #priority, <#ty as ::std::default::Default>::default()) }
    });

    quote! {
        pub fn #function() -> ::std::result::Result<::dbflow::DatabaseDefinition, ::dbflow::BuildError> {
            ::dbflow::DatabaseBuilder::new(#name, #version)
                .foreign_keys(#foreign_keys)
                .insert_conflict(#insert_conflict)
                .update_conflict(#update_conflict)
                #(#entries)*
                #(#migrations)*
                .build()
        }
    }
}

/// Source of one `<name>_database()` constructor per database plus
/// `register_converters()`.
#[must_use]
pub fn render_registry(registry: &RegistryPlan, adapters: &[AdapterPlan]) -> TokenStream {
    let databases = registry
        .databases
        .iter()
        .map(|database| render_database(database, adapters));
    let converters = registry.converters.iter().map(|c| type_path(&c.name));
    quote! {
        #(#databases)*

        pub fn register_converters() {
            #(::dbflow::register_converter(#converters);)*
        }
    }
}

/// Complete generated file: adapters followed by the registry.
#[must_use]
pub fn print_sources(adapters: &[AdapterPlan], registry: &RegistryPlan) -> String {
    let adapter_items = adapters.iter().map(render_adapter);
    let registry_items = render_registry(registry, adapters);
    let file = quote! {
        #(#adapter_items)*
        #registry_items
    };
    tracing::trace!(adapters = adapters.len(), "Rendered generated sources");
    file.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::ir::{AutoIncrementPlan, CascadePlan, ConditionPart};
    use crate::codegen::registry::MigrationPlan;
    use std::collections::BTreeMap;

    fn plan() -> AdapterPlan {
        let id = ValueCodec::Direct { kind: FieldKind::I64 };
        AdapterPlan {
            entity: "Hero".into(),
            table_name: "Hero".into(),
            database: "App".into(),
            kind: EntityKind::Table,
            columns: vec!["id".into(), "name".into()],
            insert_query: "INSERT INTO `Hero`(`name`) VALUES(?)".into(),
            update_query: "UPDATE `Hero` SET `id`=?,`name`=? WHERE `id`=?".into(),
            delete_query: "DELETE FROM `Hero` WHERE `id`=?".into(),
            creation_query: "CREATE TABLE IF NOT EXISTS `Hero`(`id` INTEGER PRIMARY KEY AUTOINCREMENT, `name` TEXT)".into(),
            index_queries: Vec::new(),
            insert_conflict: ConflictAction::None,
            update_conflict: ConflictAction::Replace,
            bind_all: vec![
                BindStmt::Bind {
                    slot: Slot::Index(1),
                    source: FieldPath::field("id"),
                    codec: id.clone(),
                },
                BindStmt::IfNotNull {
                    field: "name".into(),
                    then: vec![BindStmt::Bind {
                        slot: Slot::Index(2),
                        source: FieldPath::field("name"),
                        codec: ValueCodec::Direct { kind: FieldKind::String },
                    }],
                    otherwise: vec![BindStmt::BindNull { slot: Slot::Index(2) }],
                },
            ],
            bind_insert: Vec::new(),
            bind_update: Vec::new(),
            bind_delete: Vec::new(),
            bind_content_values: vec![BindStmt::BindNull {
                slot: Slot::Key("`name`".into()),
            }],
            load: vec![
                LoadStmt::Assign {
                    field: "name".into(),
                    read: ColumnRead {
                        column: "name".into(),
                        getter: dbflow_core::CursorGetter::String,
                        codec: ValueCodec::Direct { kind: FieldKind::String },
                        path: Vec::new(),
                    },
                    nullable: true,
                },
                LoadStmt::OnLoad,
            ],
            exists: ExistsStrategy::AutoIncrementId {
                field: "id".into(),
                nullable: false,
            },
            primary_condition: vec![ConditionPart {
                column: "id".into(),
                source: FieldPath::field("id"),
                codec: id.clone(),
            }],
            caching: None,
            auto_increment: Some(AutoIncrementPlan {
                field: "id".into(),
                codec: id,
            }),
            cascades: CascadePlan {
                load: Vec::new(),
                save: vec!["powers".into()],
                delete: Vec::new(),
            },
        }
    }

    fn squash(tokens: &str) -> String {
        tokens.chars().filter(|c| !c.is_whitespace()).collect()
    }

    #[test]
    fn test_identifiers_are_sanitized() {
        assert_eq!(ident("1st-Hero").to_string(), "_1st_Hero");
        assert_eq!(type_path("models::Hero").to_string(), "models :: Hero");
        assert_eq!(adapter_ident("models::Hero").to_string(), "HeroAdapter");
    }

    #[test]
    fn test_adapter_source() {
        let source = squash(&render_adapter(&plan()).to_string());
        assert!(source.contains("pubstructHeroAdapter;"));
        assert!(source.contains("impl::dbflow::ModelAdapter<Hero>forHeroAdapter"));
        assert!(source.contains("statement.bind_null(2);"));
        assert!(source.contains("values.put_null(\"`name`\");"));
        assert!(source.contains("\"DELETEFROM`Hero`WHERE`id`=?\""));
        assert!(source.contains("::dbflow::ConflictAction::Replace"));
        assert!(source.contains("::dbflow::ModelHooks::save_related(model,\"powers\",db)?;"));
        assert!(source.contains("::dbflow::ModelHooks::on_load(model);"));
        assert!(source.contains("fnupdate_auto_increment"));
        assert!(!source.contains("fndelete_relations"));
        assert!(!source.contains("fnhas_caching_id"));
    }

    #[test]
    fn test_registry_source() {
        let mut migrations = BTreeMap::new();
        migrations.insert(
            2,
            vec![MigrationPlan {
                name: "AddEmail".into(),
                version: 2,
                priority: 0,
            }],
        );
        let registry = RegistryPlan {
            databases: vec![DatabasePlan {
                name: "App".into(),
                version: 2,
                foreign_keys_enforced: true,
                insert_conflict: ConflictAction::None,
                update_conflict: ConflictAction::None,
                tables: vec!["Hero".into()],
                views: Vec::new(),
                query_models: Vec::new(),
                migrations,
                endpoints: Vec::new(),
            }],
            converters: Vec::new(),
            entity_databases: BTreeMap::new(),
        };
        let source = squash(&print_sources(&[plan()], &registry));
        assert!(source.contains("pubfnapp_database()"));
        assert!(source.contains("::dbflow::DatabaseBuilder::new(\"App\",2)"));
        assert!(source.contains(".adapter::<Hero,_>(::dbflow::EntityKind::Table,HeroAdapter,&[])"));
        assert!(source.contains(".migration(2,0,<AddEmailas::std::default::Default>::default())"));
        assert!(source.contains("pubfnregister_converters()"));
    }
}
