//! Implementation of the Table derive macro.
//!
//! The derive is the compile-time declaration inspector: it reads the
//! struct's fields and `#[table(...)]`/per-field attributes and emits
//!
//! - `Model` accessors, one match arm per persisted field;
//! - `IntoFieldValue`/`FromFieldValue`, so other entities can reference it;
//! - an empty `ModelHooks` impl unless `#[table(hooks)]` is given;
//! - `Table::entity_decl()`, the declaration facts the generation pipeline
//!   consumes.
//!
//! Validation of those facts is left to the pipeline, which reports every
//! problem at once.

use proc_macro2::TokenStream;
use quote::quote;
use syn::meta::ParseNestedMeta;
use syn::{Data, DeriveInput, Error, Field, Fields, Ident, LitInt, LitStr, Result, Type};

use crate::attrs;

/// Parsed `#[derive(Table)]` input.
#[derive(Debug)]
pub struct TableDef {
    pub name: Ident,
    pub attrs: TableAttrs,
    pub fields: Vec<FieldDef>,
}

#[derive(Debug)]
pub enum EntityKindDef {
    Table,
    View(String),
    QueryModel,
}

#[derive(Debug)]
pub struct RelationDef {
    pub name: String,
    pub methods: Vec<TokenStream>,
    pub target: Option<String>,
}

/// Struct-level `#[table(...)]` options.
#[derive(Debug)]
pub struct TableAttrs {
    pub database: Option<String>,
    pub table_name: Option<String>,
    pub kind: EntityKindDef,
    pub all_fields: bool,
    pub caching: bool,
    pub hooks: bool,
    pub insert_conflict: Option<TokenStream>,
    pub update_conflict: Option<TokenStream>,
    pub primary_key_conflict: Option<TokenStream>,
    pub unique_groups: Vec<(i32, TokenStream)>,
    pub index_groups: Vec<(i32, String, bool)>,
    pub one_to_many: Vec<RelationDef>,
}

impl Default for TableAttrs {
    fn default() -> Self {
        Self {
            database: None,
            table_name: None,
            kind: EntityKindDef::Table,
            all_fields: false,
            caching: false,
            hooks: false,
            insert_conflict: None,
            update_conflict: None,
            primary_key_conflict: None,
            unique_groups: Vec::new(),
            index_groups: Vec::new(),
            one_to_many: Vec::new(),
        }
    }
}

/// How the field's value is classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldClass {
    /// A built-in kind (`FieldKind` variant).
    Primitive(&'static str),
    Enum,
    Model,
    /// Needs a value converter.
    Custom,
}

#[derive(Debug, Default)]
pub struct ColumnDef {
    pub name: Option<String>,
    pub length: Option<u32>,
    pub default_value: Option<String>,
    pub collate: Option<TokenStream>,
    pub converter: Option<String>,
}

#[derive(Debug)]
pub struct ReferenceDef {
    pub column: String,
    pub target: String,
    pub ty: Option<String>,
}

#[derive(Debug, Default)]
pub struct ForeignKeyDef {
    pub table: Option<String>,
    pub references: Vec<ReferenceDef>,
    pub on_delete: Option<TokenStream>,
    pub on_update: Option<TokenStream>,
    pub deferred: bool,
    pub naming: Option<String>,
}

#[derive(Debug)]
pub struct UniqueDef {
    pub column: bool,
    pub groups: Vec<i32>,
    pub on_conflict: Option<TokenStream>,
}

/// One persisted (or skipped) struct field.
#[derive(Debug)]
pub struct FieldDef {
    pub ident: Ident,
    pub name: String,
    /// Type with any `Option` stripped.
    pub inner: Type,
    pub nullable: bool,
    pub class: FieldClass,
    pub skip: bool,
    pub column: Option<ColumnDef>,
    /// `(autoincrement, rowid)`.
    pub primary_key: Option<(bool, bool)>,
    pub foreign_key: Option<ForeignKeyDef>,
    pub not_null: Option<Option<TokenStream>>,
    pub unique: Option<UniqueDef>,
    pub index: Option<Vec<i32>>,
}

/// Parse a `DeriveInput` into a `TableDef`.
pub fn parse_table(input: &DeriveInput) -> Result<TableDef> {
    if !input.generics.params.is_empty() {
        return Err(Error::new_spanned(
            &input.generics,
            "Table cannot be derived for generic structs",
        ));
    }
    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => named
                .named
                .iter()
                .map(parse_field)
                .collect::<Result<Vec<_>>>()?,
            other => {
                return Err(Error::new_spanned(
                    other,
                    "Table requires a struct with named fields",
                ));
            }
        },
        Data::Enum(_) => {
            return Err(Error::new_spanned(
                input,
                "Table can only be derived for structs, not enums",
            ));
        }
        Data::Union(_) => {
            return Err(Error::new_spanned(
                input,
                "Table can only be derived for structs, not unions",
            ));
        }
    };

    let attrs = parse_table_attrs(input)?;
    if attrs.database.is_none() {
        return Err(Error::new_spanned(
            &input.ident,
            "missing `#[table(database = \"...\")]`",
        ));
    }

    Ok(TableDef {
        name: input.ident.clone(),
        attrs,
        fields,
    })
}

fn lit_str(meta: &ParseNestedMeta<'_>) -> Result<LitStr> {
    meta.value()?.parse()
}

fn lit_int<N: std::str::FromStr>(meta: &ParseNestedMeta<'_>) -> Result<N>
where
    N::Err: std::fmt::Display,
{
    let lit: LitInt = meta.value()?.parse()?;
    attrs::parse_int(&lit)
}

fn unknown(meta: &ParseNestedMeta<'_>, attr: &str, valid: &str) -> Error {
    let name = meta
        .path
        .get_ident()
        .map_or_else(String::new, ToString::to_string);
    meta.error(format!(
        "unknown {attr} attribute `{name}`. Valid attributes are: {valid}"
    ))
}

fn parse_table_attrs(input: &DeriveInput) -> Result<TableAttrs> {
    let mut out = TableAttrs::default();
    for attr in &input.attrs {
        if !attr.path().is_ident("table") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("database") {
                out.database = Some(attrs::check_identifier(&lit_str(&meta)?, "database")?);
            } else if meta.path.is_ident("name") {
                out.table_name = Some(lit_str(&meta)?.value());
            } else if meta.path.is_ident("all_fields") {
                out.all_fields = true;
            } else if meta.path.is_ident("caching") {
                out.caching = true;
            } else if meta.path.is_ident("hooks") {
                out.hooks = true;
            } else if meta.path.is_ident("view") {
                out.kind = EntityKindDef::View(lit_str(&meta)?.value());
            } else if meta.path.is_ident("query_model") {
                out.kind = EntityKindDef::QueryModel;
            } else if meta.path.is_ident("insert_conflict") {
                out.insert_conflict = Some(attrs::conflict_action(&lit_str(&meta)?)?);
            } else if meta.path.is_ident("update_conflict") {
                out.update_conflict = Some(attrs::conflict_action(&lit_str(&meta)?)?);
            } else if meta.path.is_ident("primary_key_conflict") {
                out.primary_key_conflict = Some(attrs::conflict_action(&lit_str(&meta)?)?);
            } else if meta.path.is_ident("unique_group") {
                let mut number = None;
                let mut on_conflict = quote!(::dbflow::ConflictAction::None);
                meta.parse_nested_meta(|inner| {
                    if inner.path.is_ident("number") {
                        number = Some(lit_int(&inner)?);
                    } else if inner.path.is_ident("on_conflict") {
                        on_conflict = attrs::conflict_action(&lit_str(&inner)?)?;
                    } else {
                        return Err(unknown(&inner, "unique_group", "number, on_conflict"));
                    }
                    Ok(())
                })?;
                let number = number.ok_or_else(|| meta.error("unique_group needs a `number`"))?;
                out.unique_groups.push((number, on_conflict));
            } else if meta.path.is_ident("index_group") {
                let mut number = None;
                let mut name = None;
                let mut unique = false;
                meta.parse_nested_meta(|inner| {
                    if inner.path.is_ident("number") {
                        number = Some(lit_int(&inner)?);
                    } else if inner.path.is_ident("name") {
                        name = Some(lit_str(&inner)?.value());
                    } else if inner.path.is_ident("unique") {
                        unique = true;
                    } else {
                        return Err(unknown(&inner, "index_group", "number, name, unique"));
                    }
                    Ok(())
                })?;
                let number = number.ok_or_else(|| meta.error("index_group needs a `number`"))?;
                let name = name.ok_or_else(|| meta.error("index_group needs a `name`"))?;
                out.index_groups.push((number, name, unique));
            } else if meta.path.is_ident("one_to_many") {
                let mut name = None;
                let mut methods = None;
                let mut target = None;
                meta.parse_nested_meta(|inner| {
                    if inner.path.is_ident("name") {
                        name = Some(lit_str(&inner)?.value());
                    } else if inner.path.is_ident("methods") {
                        methods = Some(attrs::one_to_many_methods(&lit_str(&inner)?)?);
                    } else if inner.path.is_ident("target") {
                        target = Some(lit_str(&inner)?.value());
                    } else {
                        return Err(unknown(&inner, "one_to_many", "name, methods, target"));
                    }
                    Ok(())
                })?;
                out.one_to_many.push(RelationDef {
                    name: name.ok_or_else(|| meta.error("one_to_many needs a `name`"))?,
                    methods: methods.ok_or_else(|| meta.error("one_to_many needs `methods`"))?,
                    target,
                });
            } else {
                return Err(unknown(
                    &meta,
                    "table",
                    "database, name, all_fields, caching, hooks, view, query_model, \
                     insert_conflict, update_conflict, primary_key_conflict, unique_group, \
                     index_group, one_to_many",
                ));
            }
            Ok(())
        })?;
    }
    Ok(out)
}

/// Parse a single field and its column attributes.
fn parse_field(field: &Field) -> Result<FieldDef> {
    let ident = field
        .ident
        .clone()
        .ok_or_else(|| Error::new_spanned(field, "expected named field"))?;
    let name = ident.to_string().trim_start_matches("r#").to_string();
    let (inner, nullable) = match attrs::option_inner(&field.ty) {
        Some(inner) => (inner.clone(), true),
        None => (field.ty.clone(), false),
    };

    let mut def = FieldDef {
        ident,
        name,
        inner,
        nullable,
        class: FieldClass::Custom,
        skip: false,
        column: None,
        primary_key: None,
        foreign_key: None,
        not_null: None,
        unique: None,
        index: None,
    };
    let mut sql_enum = false;

    for attr in &field.attrs {
        let path = attr.path();
        if path.is_ident("column") {
            let mut column = ColumnDef::default();
            if !matches!(attr.meta, syn::Meta::Path(_)) {
                attr.parse_nested_meta(|meta| {
                    if meta.path.is_ident("name") {
                        column.name = Some(lit_str(&meta)?.value());
                    } else if meta.path.is_ident("length") {
                        column.length = Some(lit_int(&meta)?);
                    } else if meta.path.is_ident("default") {
                        column.default_value = Some(lit_str(&meta)?.value());
                    } else if meta.path.is_ident("collate") {
                        column.collate = Some(attrs::collate(&lit_str(&meta)?)?);
                    } else if meta.path.is_ident("converter") {
                        column.converter = Some(lit_str(&meta)?.value());
                    } else if meta.path.is_ident("sql_enum") {
                        sql_enum = true;
                    } else if meta.path.is_ident("skip") {
                        def.skip = true;
                    } else {
                        return Err(unknown(
                            &meta,
                            "column",
                            "name, length, default, collate, converter, sql_enum, skip",
                        ));
                    }
                    Ok(())
                })?;
            }
            def.column = Some(column);
        } else if path.is_ident("primary_key") {
            let mut autoincrement = false;
            let mut rowid = false;
            if !matches!(attr.meta, syn::Meta::Path(_)) {
                attr.parse_nested_meta(|meta| {
                    if meta.path.is_ident("autoincrement") {
                        autoincrement = true;
                    } else if meta.path.is_ident("rowid") {
                        rowid = true;
                    } else {
                        return Err(unknown(&meta, "primary_key", "autoincrement, rowid"));
                    }
                    Ok(())
                })?;
            }
            def.primary_key = Some((autoincrement, rowid));
        } else if path.is_ident("foreign_key") {
            let mut fk = ForeignKeyDef::default();
            if !matches!(attr.meta, syn::Meta::Path(_)) {
                attr.parse_nested_meta(|meta| {
                    if meta.path.is_ident("table") {
                        fk.table = Some(lit_str(&meta)?.value());
                    } else if meta.path.is_ident("on_delete") {
                        fk.on_delete = Some(attrs::referential_action(&lit_str(&meta)?)?);
                    } else if meta.path.is_ident("on_update") {
                        fk.on_update = Some(attrs::referential_action(&lit_str(&meta)?)?);
                    } else if meta.path.is_ident("deferred") {
                        fk.deferred = true;
                    } else if meta.path.is_ident("naming") {
                        fk.naming = Some(attrs::check_naming_template(&lit_str(&meta)?)?);
                    } else if meta.path.is_ident("reference") {
                        let mut column = None;
                        let mut target = None;
                        let mut ty = None;
                        meta.parse_nested_meta(|inner| {
                            if inner.path.is_ident("column") {
                                column = Some(lit_str(&inner)?.value());
                            } else if inner.path.is_ident("target") {
                                target = Some(lit_str(&inner)?.value());
                            } else if inner.path.is_ident("ty") {
                                ty = Some(lit_str(&inner)?.value());
                            } else {
                                return Err(unknown(&inner, "reference", "column, target, ty"));
                            }
                            Ok(())
                        })?;
                        fk.references.push(ReferenceDef {
                            column: column.ok_or_else(|| meta.error("reference needs a `column`"))?,
                            target: target.ok_or_else(|| meta.error("reference needs a `target`"))?,
                            ty,
                        });
                    } else {
                        return Err(unknown(
                            &meta,
                            "foreign_key",
                            "table, on_delete, on_update, deferred, naming, reference",
                        ));
                    }
                    Ok(())
                })?;
            }
            def.foreign_key = Some(fk);
        } else if path.is_ident("not_null") {
            let mut on_conflict = None;
            if !matches!(attr.meta, syn::Meta::Path(_)) {
                attr.parse_nested_meta(|meta| {
                    if meta.path.is_ident("on_conflict") {
                        on_conflict = Some(attrs::conflict_action(&lit_str(&meta)?)?);
                        Ok(())
                    } else {
                        Err(unknown(&meta, "not_null", "on_conflict"))
                    }
                })?;
            }
            def.not_null = Some(on_conflict);
        } else if path.is_ident("unique") {
            let mut unique = UniqueDef {
                column: true,
                groups: Vec::new(),
                on_conflict: None,
            };
            if !matches!(attr.meta, syn::Meta::Path(_)) {
                attr.parse_nested_meta(|meta| {
                    if meta.path.is_ident("group") {
                        unique.groups.push(lit_int(&meta)?);
                    } else if meta.path.is_ident("on_conflict") {
                        unique.on_conflict = Some(attrs::conflict_action(&lit_str(&meta)?)?);
                    } else {
                        return Err(unknown(&meta, "unique", "group, on_conflict"));
                    }
                    Ok(())
                })?;
                // Group membership alone does not make the column unique.
                unique.column = unique.groups.is_empty();
            }
            def.unique = Some(unique);
        } else if path.is_ident("index") {
            let mut groups = Vec::new();
            if !matches!(attr.meta, syn::Meta::Path(_)) {
                attr.parse_nested_meta(|meta| {
                    if meta.path.is_ident("group") {
                        groups.push(lit_int(&meta)?);
                        Ok(())
                    } else {
                        Err(unknown(&meta, "index", "group"))
                    }
                })?;
            }
            def.index = Some(groups);
        }
    }

    def.class = if def.foreign_key.is_some() {
        FieldClass::Model
    } else if sql_enum {
        FieldClass::Enum
    } else if let Some(kind) = attrs::field_kind(&def.inner) {
        FieldClass::Primitive(kind)
    } else {
        FieldClass::Custom
    };
    Ok(def)
}

fn getter(field: &FieldDef) -> TokenStream {
    let ident = &field.ident;
    match (field.class, field.nullable) {
        (FieldClass::Custom, true) => quote!(::dbflow::custom_to_field_value(self.#ident.as_ref())),
        (FieldClass::Custom, false) => {
            quote!(::dbflow::custom_to_field_value(::std::option::Option::Some(&self.#ident)))
        }
        _ => quote!(::dbflow::IntoFieldValue::to_field_value(&self.#ident)),
    }
}

fn setter(field: &FieldDef) -> TokenStream {
    let ident = &field.ident;
    match (field.class, field.nullable) {
        (FieldClass::Custom, true) => quote!(self.#ident = ::dbflow::custom_from_field_value(name, value)?;),
        (FieldClass::Custom, false) => quote!(self.#ident = ::dbflow::custom_required(name, value)?;),
        _ => quote!(self.#ident = ::dbflow::FromFieldValue::from_field_value(name, value)?;),
    }
}

fn type_ref(field: &FieldDef) -> TokenStream {
    let short = attrs::short_name(&field.inner).unwrap_or_default();
    match field.class {
        FieldClass::Primitive(kind) => {
            let kind = Ident::new(kind, proc_macro2::Span::call_site());
            quote!(::dbflow::schema::TypeRef::Primitive(::dbflow::FieldKind::#kind))
        }
        FieldClass::Enum => quote!(::dbflow::schema::TypeRef::Enum(::std::string::String::from(#short))),
        FieldClass::Model => quote!(::dbflow::schema::TypeRef::Model(::std::string::String::from(#short))),
        FieldClass::Custom => quote!(::dbflow::schema::TypeRef::Custom(::std::string::String::from(#short))),
    }
}

fn member_decl(field: &FieldDef) -> TokenStream {
    let name = &field.name;
    let ty = type_ref(field);
    let nullable = field.nullable;
    let mut stmts = Vec::new();

    if let Some(column) = &field.column {
        let col_name = attrs::opt_string(column.name.as_ref());
        let length = match column.length {
            Some(length) => quote!(::std::option::Option::Some(#length)),
            None => quote!(::std::option::Option::None),
        };
        let default_value = attrs::opt_string(column.default_value.as_ref());
        let collate = attrs::opt_tokens(column.collate.as_ref());
        let converter = attrs::opt_string(column.converter.as_ref());
        stmts.push(quote! {
            member.annotations.column = ::std::option::Option::Some(::dbflow::schema::ColumnAttr {
                name: #col_name,
                length: #length,
                default_value: #default_value,
                collate: #collate,
                type_converter: #converter,
            });
        });
    }
    if let Some((autoincrement, rowid)) = field.primary_key {
        stmts.push(quote! {
            member.annotations.primary_key = ::std::option::Option::Some(::dbflow::schema::PrimaryKeyAttr {
                autoincrement: #autoincrement,
                rowid: #rowid,
            });
        });
    }
    if let Some(fk) = &field.foreign_key {
        let table = attrs::opt_string(fk.table.as_ref());
        let references = fk.references.iter().map(|r| {
            let column = &r.column;
            let target = &r.target;
            let ty = attrs::opt_string(r.ty.as_ref());
            quote! {
                ::dbflow::schema::ReferenceDecl {
                    column_name: ::std::string::String::from(#column),
                    foreign_key_column_name: ::std::string::String::from(#target),
                    column_type: #ty,
                }
            }
        });
        let on_delete = fk
            .on_delete
            .clone()
            .unwrap_or_else(|| quote!(::dbflow::ReferentialAction::NoAction));
        let on_update = fk
            .on_update
            .clone()
            .unwrap_or_else(|| quote!(::dbflow::ReferentialAction::NoAction));
        let deferred = fk.deferred;
        let naming = attrs::opt_string(fk.naming.as_ref());
        stmts.push(quote! {
            member.annotations.foreign_key = ::std::option::Option::Some(::dbflow::schema::ForeignKeyAttr {
                table: #table,
                references: ::std::vec![#(#references),*],
                on_delete: #on_delete,
                on_update: #on_update,
                deferred: #deferred,
                naming: #naming,
            });
        });
    }
    if let Some(on_conflict) = &field.not_null {
        let on_conflict = on_conflict
            .clone()
            .unwrap_or_else(|| quote!(::dbflow::ConflictAction::Fail));
        stmts.push(quote! {
            member.annotations.not_null = ::std::option::Option::Some(::dbflow::schema::NotNullAttr {
                on_null_conflict: #on_conflict,
            });
        });
    }
    if let Some(unique) = &field.unique {
        let column = unique.column;
        let groups = &unique.groups;
        let on_conflict = unique
            .on_conflict
            .clone()
            .unwrap_or_else(|| quote!(::dbflow::ConflictAction::Fail));
        stmts.push(quote! {
            member.annotations.unique = ::std::option::Option::Some(::dbflow::schema::UniqueAttr {
                unique: #column,
                groups: ::std::vec![#(#groups),*],
                on_unique_conflict: #on_conflict,
            });
        });
    }
    if let Some(groups) = &field.index {
        stmts.push(quote! {
            member.annotations.index = ::std::option::Option::Some(::dbflow::schema::IndexAttr {
                groups: ::std::vec![#(#groups),*],
            });
        });
    }

    quote! {
        {
            #[allow(unused_mut)]
            let mut member = ::dbflow::schema::MemberDecl::new(#name, #ty);
            member.nullable = #nullable;
            #(#stmts)*
            member
        }
    }
}

fn table_statements(def: &TableDef) -> Vec<TokenStream> {
    let attrs = &def.attrs;
    let mut stmts = Vec::new();
    if let Some(name) = &attrs.table_name {
        stmts.push(quote!(decl.table.name = ::std::option::Option::Some(::std::string::String::from(#name));));
    }
    match &attrs.kind {
        EntityKindDef::Table => {}
        EntityKindDef::View(query) => stmts.push(quote! {
            decl.kind = ::dbflow::EntityKind::View;
            decl.view_query = ::std::option::Option::Some(::std::string::String::from(#query));
        }),
        EntityKindDef::QueryModel => stmts.push(quote!(decl.kind = ::dbflow::EntityKind::QueryModel;)),
    }
    if attrs.all_fields {
        stmts.push(quote!(decl.table.all_fields = true;));
    }
    if attrs.caching {
        stmts.push(quote!(decl.table.caching_enabled = true;));
    }
    if attrs.hooks {
        stmts.push(quote!(decl.has_load_hook = true;));
    }
    if let Some(action) = &attrs.insert_conflict {
        stmts.push(quote!(decl.table.insert_conflict = #action;));
    }
    if let Some(action) = &attrs.update_conflict {
        stmts.push(quote!(decl.table.update_conflict = #action;));
    }
    if let Some(action) = &attrs.primary_key_conflict {
        stmts.push(quote!(decl.table.primary_key_conflict = #action;));
    }
    for (number, on_conflict) in &attrs.unique_groups {
        stmts.push(quote! {
            decl.table.unique_groups.push(::dbflow::schema::UniqueGroupDecl {
                number: #number,
                on_conflict: #on_conflict,
            });
        });
    }
    for (number, name, unique) in &attrs.index_groups {
        stmts.push(quote! {
            decl.table.index_groups.push(::dbflow::schema::IndexGroupDecl {
                number: #number,
                name: ::std::string::String::from(#name),
                unique: #unique,
            });
        });
    }
    for relation in &attrs.one_to_many {
        let name = &relation.name;
        let methods = &relation.methods;
        let target = attrs::opt_string(relation.target.as_ref());
        stmts.push(quote! {
            decl.one_to_many.push(::dbflow::schema::OneToManyDecl {
                name: ::std::string::String::from(#name),
                methods: ::std::vec![#(#methods),*],
                target: #target,
                returns_collection: true,
            });
        });
    }
    stmts
}

/// Generate the `Model`, `ModelHooks`, field-value and `Table` impls.
pub fn generate_table_impl(def: &TableDef) -> TokenStream {
    let name = &def.name;
    let name_str = name.to_string();
    let database = def.attrs.database.clone().unwrap_or_default();
    let persisted: Vec<&FieldDef> = def.fields.iter().filter(|f| !f.skip).collect();

    let field_names: Vec<&str> = persisted.iter().map(|f| f.name.as_str()).collect();
    let getters: Vec<TokenStream> = persisted.iter().map(|f| getter(f)).collect();
    let setters: Vec<TokenStream> = persisted.iter().map(|f| setter(f)).collect();
    let members: Vec<TokenStream> = persisted.iter().map(|f| member_decl(f)).collect();
    let table_stmts = table_statements(def);

    let hooks = if def.attrs.hooks {
        quote!()
    } else {
        quote!(impl ::dbflow::ModelHooks for #name {})
    };

    quote! {
        impl ::dbflow::Model for #name {
            const NAME: &'static str = #name_str;

            fn new_instance() -> Self {
                <Self as ::std::default::Default>::default()
            }

            fn get_field(&self, name: &str) -> ::std::option::Option<::dbflow::FieldValue> {
                match name {
                    #(#field_names => ::std::option::Option::Some(#getters),)*
                    _ => ::std::option::Option::None,
                }
            }

            fn set_field(&mut self, name: &str, value: ::dbflow::FieldValue) -> ::dbflow::Result<()> {
                match name {
                    #(#field_names => { #setters })*
                    _ => {
                        return ::std::result::Result::Err(::dbflow::Error::UnknownField {
                            model: <Self as ::dbflow::Model>::NAME,
                            field: ::std::string::ToString::to_string(name),
                        });
                    }
                }
                ::std::result::Result::Ok(())
            }

            fn to_record(&self) -> ::std::vec::Vec<(&'static str, ::dbflow::FieldValue)> {
                ::std::vec![#((#field_names, #getters)),*]
            }
        }

        impl ::dbflow::IntoFieldValue for #name {
            fn to_field_value(&self) -> ::dbflow::FieldValue {
                ::dbflow::model_to_record(self)
            }
        }

        impl ::dbflow::FromFieldValue for #name {
            fn from_field_value(field: &str, value: ::dbflow::FieldValue) -> ::dbflow::Result<Self> {
                ::dbflow::model_from_record(field, value)
            }
        }

        #hooks

        impl ::dbflow::Table for #name {
            fn entity_decl() -> ::dbflow::schema::EntityDecl {
                let mut decl = ::dbflow::schema::EntityDecl::new(#name_str, #database);
                #(#table_stmts)*
                #(decl.members.push(#members);)*
                decl
            }
        }
    }
}
