//! Implementation of the SqlEnum derive macro.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Error, Fields, Ident, LitStr, Result};

#[derive(Debug)]
pub struct SqlEnumDef {
    pub name: Ident,
    /// `(variant, stored name)` in declaration order.
    pub variants: Vec<(Ident, String)>,
}

pub fn parse_sql_enum(input: &DeriveInput) -> Result<SqlEnumDef> {
    if !input.generics.params.is_empty() {
        return Err(Error::new_spanned(
            &input.generics,
            "SqlEnum cannot be derived for generic enums",
        ));
    }
    let Data::Enum(data) = &input.data else {
        return Err(Error::new_spanned(
            &input.ident,
            "SqlEnum can only be derived for enums",
        ));
    };
    if data.variants.is_empty() {
        return Err(Error::new_spanned(
            &input.ident,
            "SqlEnum needs at least one variant",
        ));
    }

    let mut variants: Vec<(Ident, String)> = Vec::new();
    for variant in &data.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(Error::new_spanned(
                variant,
                "SqlEnum variants cannot carry data",
            ));
        }
        let mut stored = variant.ident.to_string();
        for attr in &variant.attrs {
            if !attr.path().is_ident("sql_enum") {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    let lit: LitStr = meta.value()?.parse()?;
                    stored = lit.value();
                    Ok(())
                } else {
                    Err(meta.error("unknown sql_enum attribute. Valid attributes are: name"))
                }
            })?;
        }
        if variants.iter().any(|(_, existing)| *existing == stored) {
            return Err(Error::new_spanned(
                variant,
                format!("stored name `{stored}` is used by more than one variant"),
            ));
        }
        variants.push((variant.ident.clone(), stored));
    }

    Ok(SqlEnumDef {
        name: input.ident.clone(),
        variants,
    })
}

pub fn generate_sql_enum_impl(def: &SqlEnumDef) -> TokenStream {
    let name = &def.name;
    let idents: Vec<&Ident> = def.variants.iter().map(|(ident, _)| ident).collect();
    let stored: Vec<&str> = def.variants.iter().map(|(_, s)| s.as_str()).collect();

    quote! {
        impl ::dbflow::SqlEnum for #name {
            fn sql_name(&self) -> &'static str {
                match self {
                    #(Self::#idents => #stored,)*
                }
            }

            fn from_sql_name(name: &str) -> ::std::option::Option<Self> {
                match name {
                    #(#stored => ::std::option::Option::Some(Self::#idents),)*
                    _ => ::std::option::Option::None,
                }
            }
        }

        impl ::dbflow::IntoFieldValue for #name {
            fn to_field_value(&self) -> ::dbflow::FieldValue {
                ::dbflow::FieldValue::Enum(::std::string::String::from(
                    <Self as ::dbflow::SqlEnum>::sql_name(self),
                ))
            }
        }

        impl ::dbflow::FromFieldValue for #name {
            fn from_field_value(field: &str, value: ::dbflow::FieldValue) -> ::dbflow::Result<Self> {
                match value {
                    ::dbflow::FieldValue::Enum(stored) | ::dbflow::FieldValue::Text(stored) => {
                        <Self as ::dbflow::SqlEnum>::from_sql_name(&stored).ok_or_else(|| {
                            ::dbflow::Error::Conversion(::std::format!(
                                "`{}` is not a variant of {} (field `{}`)",
                                stored,
                                ::std::stringify!(#name),
                                field
                            ))
                        })
                    }
                    other => ::std::result::Result::Err(::dbflow::Error::TypeMismatch {
                        field: ::std::string::ToString::to_string(field),
                        expected: "enum",
                        found: other.kind_name(),
                    }),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn test_stored_names() {
        let input: DeriveInput = parse_quote! {
            enum Rank {
                Rookie,
                #[sql_enum(name = "veteran")]
                Veteran,
            }
        };
        let def = parse_sql_enum(&input).unwrap();
        let stored: Vec<&str> = def.variants.iter().map(|(_, s)| s.as_str()).collect();
        assert_eq!(stored, ["Rookie", "veteran"]);
        let tokens = generate_sql_enum_impl(&def).to_string();
        assert!(tokens.contains("impl :: dbflow :: SqlEnum for Rank"));
    }

    #[test]
    fn test_rejects_data_variants_and_duplicates() {
        let input: DeriveInput = parse_quote! {
            enum Shape { Circle(f64) }
        };
        assert!(parse_sql_enum(&input).is_err());

        let input: DeriveInput = parse_quote! {
            enum Twice {
                A,
                #[sql_enum(name = "A")]
                B,
            }
        };
        let err = parse_sql_enum(&input).unwrap_err();
        assert!(err.to_string().contains("more than one variant"));
    }

    #[test]
    fn test_rejects_structs_and_empty_enums() {
        let input: DeriveInput = parse_quote! { struct NotAnEnum; };
        assert!(parse_sql_enum(&input).is_err());
        let input: DeriveInput = parse_quote! { enum Never {} };
        assert!(parse_sql_enum(&input).is_err());
    }
}
