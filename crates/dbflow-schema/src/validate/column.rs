//! Column-level rules, applied while a table is being built.

use dbflow_core::StoragePrimitive;

use crate::column::ColumnSchema;
use crate::decl::TypeRef;
use crate::diagnostics::Diagnostics;

/// Check one column. Returns `false` if the column must be rejected.
///
/// Defaults on primitive columns are dropped with a warning rather than
/// rejected. `seen_auto_increment` carries the field name of the first
/// engine-assigned key seen in this table.
pub fn validate_column(
    entity: &str,
    column: &mut ColumnSchema,
    seen_auto_increment: &mut Option<String>,
    diags: &mut Diagnostics,
) -> bool {
    let before = diags.error_count();
    let field = column.field_name.clone();

    if column.column_name.trim().is_empty() || column.column_name.contains('`') {
        diags.member_error(
            entity,
            &field,
            format!("invalid storage column name `{}`", column.column_name),
        );
    }

    if matches!(column.ty, TypeRef::Enum(_)) && (column.is_primary_key() || column.is_foreign_key())
    {
        diags.member_error(entity, &field, "an enum column cannot be a primary or foreign key");
    }

    if column.is_foreign_key() && column.name_overridden {
        diags.member_error(
            entity,
            &field,
            "a foreign key cannot override its column name; name the references instead",
        );
    }

    if column.default_value.is_some() {
        if column.ty.is_model() || column.is_foreign_key() {
            diags.member_error(entity, &field, "a foreign key column cannot declare a default value");
        } else if column.is_primitive() {
            diags.member_warning(
                entity,
                &field,
                "default values on non-optional primitive columns are ignored",
            );
            column.default_value = None;
        }
    }

    if column.is_engine_assigned() {
        match (&column.ty, column.storage()) {
            (TypeRef::Model(_), _) => {
                diags.member_error(entity, &field, "an autoincrement key cannot be a foreign key");
            }
            (_, Some(storage)) if storage != StoragePrimitive::Integer => {
                diags.member_error(
                    entity,
                    &field,
                    format!("an autoincrement key must be stored as INTEGER, not {}", storage.sql_name()),
                );
            }
            _ => {}
        }
        match seen_auto_increment {
            Some(previous) if *previous != field => {
                diags.member_error(
                    entity,
                    &field,
                    format!("only one autoincrement key is allowed; `{previous}` is already one"),
                );
            }
            _ => *seen_auto_increment = Some(field.clone()),
        }
    }

    diags.error_count() == before
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::PrimaryKeyKind;
    use crate::column::ForeignKeySpec;
    use dbflow_core::{FieldKind, ReferentialAction};

    fn primitive(name: &str, kind: FieldKind) -> ColumnSchema {
        ColumnSchema::new(name, TypeRef::Primitive(kind))
    }

    fn foreign_key(name: &str) -> ColumnSchema {
        let mut column = ColumnSchema::new(name, TypeRef::Model("Team".into()));
        column.foreign_key = Some(ForeignKeySpec {
            target: "Team".into(),
            target_table: String::new(),
            declared: Vec::new(),
            references: Vec::new(),
            resolved: false,
            on_delete: ReferentialAction::NoAction,
            on_update: ReferentialAction::NoAction,
            deferred: false,
            naming: None,
        });
        column
    }

    #[test]
    fn test_enum_key_rejected() {
        let mut diags = Diagnostics::new();
        let mut column = ColumnSchema::new("kind", TypeRef::Enum("Kind".into()));
        column.primary_key = Some(PrimaryKeyKind::Explicit);
        assert!(!validate_column("Hero", &mut column, &mut None, &mut diags));
        assert!(diags.has_errors_for("Hero"));
    }

    #[test]
    fn test_primitive_default_dropped_with_warning() {
        let mut diags = Diagnostics::new();
        let mut column = primitive("age", FieldKind::I32);
        column.default_value = Some("18".into());
        assert!(validate_column("Hero", &mut column, &mut None, &mut diags));
        assert_eq!(column.default_value, None);
        assert_eq!(diags.len(), 1);
        assert!(!diags.has_errors());

        let mut name = primitive("name", FieldKind::String);
        name.default_value = Some("'anon'".into());
        assert!(validate_column("Hero", &mut name, &mut None, &mut diags));
        assert_eq!(name.default_value.as_deref(), Some("'anon'"));
    }

    #[test]
    fn test_foreign_key_default_rejected() {
        let mut diags = Diagnostics::new();
        let mut column = foreign_key("team");
        column.default_value = Some("1".into());
        assert!(!validate_column("Hero", &mut column, &mut None, &mut diags));
    }

    #[test]
    fn test_foreign_key_name_override_rejected() {
        let mut diags = Diagnostics::new();
        let mut column = foreign_key("team");
        column.column_name = "team_ref".into();
        column.name_overridden = true;
        assert!(!validate_column("Hero", &mut column, &mut None, &mut diags));
    }

    #[test]
    fn test_single_auto_increment() {
        let mut diags = Diagnostics::new();
        let mut seen = None;
        let mut id = primitive("id", FieldKind::I64);
        id.primary_key = Some(PrimaryKeyKind::AutoIncrement);
        assert!(validate_column("Hero", &mut id, &mut seen, &mut diags));
        let mut other = primitive("other", FieldKind::I64);
        other.primary_key = Some(PrimaryKeyKind::RowId);
        assert!(!validate_column("Hero", &mut other, &mut seen, &mut diags));
        assert_eq!(seen.as_deref(), Some("id"));
    }

    #[test]
    fn test_auto_increment_must_be_integer() {
        let mut diags = Diagnostics::new();
        let mut id = primitive("id", FieldKind::String);
        id.primary_key = Some(PrimaryKeyKind::AutoIncrement);
        assert!(!validate_column("Hero", &mut id, &mut None, &mut diags));
    }
}
