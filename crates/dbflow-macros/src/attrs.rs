//! Attribute value parsing shared by the derives.
//!
//! String-valued options (`on_conflict = "replace"`, `collate = "nocase"`,
//! ...) are resolved here at compile time so a typo is a compile error on
//! the attribute, not a runtime surprise.

use proc_macro2::{Ident, Span, TokenStream};
use quote::quote;
use syn::{Error, GenericArgument, LitInt, LitStr, PathArguments, Result, Type};

fn variant(lit: &LitStr, table: &[(&str, &str)], what: &str) -> Result<Ident> {
    let value = lit.value().to_ascii_lowercase();
    table
        .iter()
        .find(|(name, _)| *name == value)
        .map(|(_, variant)| Ident::new(variant, Span::call_site()))
        .ok_or_else(|| {
            let expected: Vec<&str> = table.iter().map(|(name, _)| *name).collect();
            Error::new_spanned(
                lit,
                format!("unknown {what} `{}`, expected one of: {}", lit.value(), expected.join(", ")),
            )
        })
}

/// `ConflictAction` variant for an attribute string.
pub fn conflict_action(lit: &LitStr) -> Result<TokenStream> {
    let ident = variant(
        lit,
        &[
            ("none", "None"),
            ("rollback", "Rollback"),
            ("abort", "Abort"),
            ("fail", "Fail"),
            ("ignore", "Ignore"),
            ("replace", "Replace"),
        ],
        "conflict action",
    )?;
    Ok(quote!(::dbflow::ConflictAction::#ident))
}

pub fn referential_action(lit: &LitStr) -> Result<TokenStream> {
    let ident = variant(
        lit,
        &[
            ("no_action", "NoAction"),
            ("no action", "NoAction"),
            ("restrict", "Restrict"),
            ("cascade", "Cascade"),
            ("set_null", "SetNull"),
            ("set null", "SetNull"),
            ("set_default", "SetDefault"),
            ("set default", "SetDefault"),
        ],
        "referential action",
    )?;
    Ok(quote!(::dbflow::ReferentialAction::#ident))
}

pub fn collate(lit: &LitStr) -> Result<TokenStream> {
    let ident = variant(
        lit,
        &[
            ("binary", "Binary"),
            ("nocase", "NoCase"),
            ("rtrim", "RTrim"),
            ("localized", "Localized"),
            ("unicode", "Unicode"),
        ],
        "collation",
    )?;
    Ok(quote!(::dbflow::Collate::#ident))
}

/// `OneToManyMethod` variants for a comma-separated list.
pub fn one_to_many_methods(lit: &LitStr) -> Result<Vec<TokenStream>> {
    let mut methods = Vec::new();
    for part in lit.value().split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let ident = variant(
            &LitStr::new(part, lit.span()),
            &[
                ("load", "Load"),
                ("save", "Save"),
                ("delete", "Delete"),
                ("all", "All"),
            ],
            "one-to-many method",
        )?;
        methods.push(quote!(::dbflow::schema::OneToManyMethod::#ident));
    }
    if methods.is_empty() {
        return Err(Error::new_spanned(lit, "expected at least one method"));
    }
    Ok(methods)
}

/// Reject names the registry printer cannot turn into a function name.
pub fn check_identifier(lit: &LitStr, what: &str) -> Result<String> {
    let value = lit.value();
    let re = regex::Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$")
        .map_err(|e| Error::new_spanned(lit, format!("identifier pattern: {e}")))?;
    if re.is_match(&value) {
        Ok(value)
    } else {
        Err(Error::new_spanned(
            lit,
            format!("{what} `{value}` must be a plain identifier"),
        ))
    }
}

/// Only `{field}` and `{column}` may appear in a naming template.
pub fn check_naming_template(lit: &LitStr) -> Result<String> {
    let value = lit.value();
    let re = regex::Regex::new(r"\{([^}]*)\}")
        .map_err(|e| Error::new_spanned(lit, format!("template pattern: {e}")))?;
    for caps in re.captures_iter(&value) {
        let name = &caps[1];
        if name != "field" && name != "column" {
            return Err(Error::new_spanned(
                lit,
                format!("unknown placeholder `{{{name}}}`, expected {{field}} or {{column}}"),
            ));
        }
    }
    Ok(value)
}

pub fn parse_int<N: std::str::FromStr>(lit: &LitInt) -> Result<N>
where
    N::Err: std::fmt::Display,
{
    lit.base10_parse::<N>()
}

/// `Some(String::from(..))` or `None`.
pub fn opt_string(value: Option<&String>) -> TokenStream {
    match value {
        Some(s) => quote!(::std::option::Option::Some(::std::string::String::from(#s))),
        None => quote!(::std::option::Option::None),
    }
}

pub fn opt_tokens(value: Option<&TokenStream>) -> TokenStream {
    match value {
        Some(tokens) => quote!(::std::option::Option::Some(#tokens)),
        None => quote!(::std::option::Option::None),
    }
}

/// Inner type of `Option<T>`.
pub fn option_inner(ty: &Type) -> Option<&Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != "Option" {
        return None;
    }
    match &segment.arguments {
        PathArguments::AngleBracketed(args) => match args.args.first() {
            Some(GenericArgument::Type(inner)) => Some(inner),
            _ => None,
        },
        _ => None,
    }
}

/// Short name of a type: its last path segment.
pub fn short_name(ty: &Type) -> Option<String> {
    match ty {
        Type::Path(type_path) => type_path.path.segments.last().map(|s| s.ident.to_string()),
        _ => None,
    }
}

/// `FieldKind` variant of a built-in field type.
pub fn field_kind(ty: &Type) -> Option<&'static str> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    let kind = match segment.ident.to_string().as_str() {
        "bool" => "Bool",
        "i8" => "I8",
        "i16" => "I16",
        "i32" => "I32",
        "i64" => "I64",
        "u8" => "U8",
        "u16" => "U16",
        "u32" => "U32",
        "f32" => "F32",
        "f64" => "F64",
        "char" => "Char",
        "String" => "String",
        "Blob" => "Blob",
        "Vec" => {
            let PathArguments::AngleBracketed(args) = &segment.arguments else {
                return None;
            };
            match args.args.first() {
                Some(GenericArgument::Type(inner)) if short_name(inner).as_deref() == Some("u8") => {
                    "Bytes"
                }
                _ => return None,
            }
        }
        _ => return None,
    };
    Some(kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    fn lit(s: &str) -> LitStr {
        LitStr::new(s, Span::call_site())
    }

    #[test]
    fn test_conflict_action_is_case_insensitive() {
        let tokens = conflict_action(&lit("REPLACE")).unwrap();
        assert_eq!(tokens.to_string(), quote!(::dbflow::ConflictAction::Replace).to_string());
        assert!(conflict_action(&lit("explode")).is_err());
    }

    #[test]
    fn test_referential_action_spellings() {
        assert!(referential_action(&lit("set null")).is_ok());
        assert!(referential_action(&lit("set_null")).is_ok());
        assert!(referential_action(&lit("nullify")).is_err());
    }

    #[test]
    fn test_methods_list() {
        assert_eq!(one_to_many_methods(&lit("load, save")).unwrap().len(), 2);
        assert!(one_to_many_methods(&lit("")).is_err());
        assert!(one_to_many_methods(&lit("load,fetch")).is_err());
    }

    #[test]
    fn test_identifier_and_template_checks() {
        assert!(check_identifier(&lit("AppDatabase"), "database").is_ok());
        assert!(check_identifier(&lit("app-db"), "database").is_err());
        assert!(check_naming_template(&lit("{field}_{column}")).is_ok());
        assert!(check_naming_template(&lit("{table}_{column}")).is_err());
    }

    #[test]
    fn test_type_helpers() {
        let ty: Type = parse_quote!(Option<Vec<u8>>);
        let inner = option_inner(&ty).unwrap();
        assert_eq!(field_kind(inner), Some("Bytes"));
        let ty: Type = parse_quote!(chrono::NaiveDate);
        assert_eq!(field_kind(&ty), None);
        assert_eq!(short_name(&ty).as_deref(), Some("NaiveDate"));
        let ty: Type = parse_quote!(Vec<String>);
        assert_eq!(field_kind(&ty), None);
    }
}
