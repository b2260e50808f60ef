//! Instance access for persisted types.
//!
//! Adapters never touch struct fields directly. They read and write through
//! [`Model`], which `#[derive(Table)]` implements with one match arm per
//! field, and call lifecycle hooks through [`ModelHooks`].

use crate::database::DatabaseWrapper;
use crate::error::{Error, Result};
use crate::value::FieldValue;

/// Dynamic field access for a persisted type.
pub trait Model: Sized + 'static {
    /// Type name used in declarations and diagnostics.
    const NAME: &'static str;

    /// Empty instance that `load_from_cursor` fills in.
    fn new_instance() -> Self;

    /// Current value of a field, `None` if the model has no such field.
    fn get_field(&self, name: &str) -> Option<FieldValue>;

    /// Replace a field's value.
    fn set_field(&mut self, name: &str, value: FieldValue) -> Result<()>;

    /// Every persisted field as `(name, value)` in declaration order.
    fn to_record(&self) -> Vec<(&'static str, FieldValue)>;

    /// Field value, or [`Error::UnknownField`].
    fn require_field(&self, name: &str) -> Result<FieldValue> {
        self.get_field(name).ok_or_else(|| Error::UnknownField {
            model: Self::NAME,
            field: name.to_string(),
        })
    }
}

/// Lifecycle hooks invoked by adapters around loads and cascades.
///
/// Relations are addressed by the name they were declared with.
/// `#[derive(Table)]` emits an empty implementation unless the struct is
/// marked `#[table(hooks)]`.
pub trait ModelHooks {
    /// Runs after every column and load-time relation has been assigned.
    fn on_load(&mut self) {}

    /// Load a one-to-many collection.
    fn load_related(&mut self, relation: &str, db: &dyn DatabaseWrapper) -> Result<()> {
        let _ = (relation, db);
        Ok(())
    }

    /// Persist a one-to-many collection before the owner is saved.
    fn save_related(&self, relation: &str, db: &dyn DatabaseWrapper) -> Result<()> {
        let _ = (relation, db);
        Ok(())
    }

    /// Delete a one-to-many collection before the owner is deleted.
    fn delete_related(&self, relation: &str, db: &dyn DatabaseWrapper) -> Result<()> {
        let _ = (relation, db);
        Ok(())
    }
}

/// Build a model from a [`FieldValue::Record`].
///
/// Used by the `FromFieldValue` impl of derived models. `Null` yields an
/// empty instance; fields missing from the record keep their empty value.
pub fn model_from_record<M: Model>(field: &str, value: FieldValue) -> Result<M> {
    let mut instance = M::new_instance();
    match value {
        FieldValue::Null => {}
        FieldValue::Record(entries) => {
            for (name, value) in entries {
                instance.set_field(&name, value)?;
            }
        }
        other => {
            return Err(Error::TypeMismatch {
                field: field.to_string(),
                expected: "record",
                found: other.kind_name(),
            });
        }
    }
    Ok(instance)
}

/// Render a model as a [`FieldValue::Record`].
pub fn model_to_record<M: Model>(model: &M) -> FieldValue {
    FieldValue::Record(
        model
            .to_record()
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{FromFieldValue, IntoFieldValue};

    #[derive(Debug, Default, PartialEq)]
    struct Team {
        id: i64,
        name: String,
    }

    impl Model for Team {
        const NAME: &'static str = "Team";

        fn new_instance() -> Self {
            Self::default()
        }

        fn get_field(&self, name: &str) -> Option<FieldValue> {
            match name {
                "id" => Some(self.id.to_field_value()),
                "name" => Some(self.name.to_field_value()),
                _ => None,
            }
        }

        fn set_field(&mut self, name: &str, value: FieldValue) -> Result<()> {
            match name {
                "id" => self.id = FromFieldValue::from_field_value(name, value)?,
                "name" => self.name = FromFieldValue::from_field_value(name, value)?,
                _ => {
                    return Err(Error::UnknownField {
                        model: Self::NAME,
                        field: name.to_string(),
                    });
                }
            }
            Ok(())
        }

        fn to_record(&self) -> Vec<(&'static str, FieldValue)> {
            vec![
                ("id", self.id.to_field_value()),
                ("name", self.name.to_field_value()),
            ]
        }
    }

    #[test]
    fn test_record_round_trip() {
        let team = Team {
            id: 4,
            name: "Preventers".into(),
        };
        let record = model_to_record(&team);
        let back: Team = model_from_record("team", record).unwrap();
        assert_eq!(back, team);
    }

    #[test]
    fn test_partial_record_keeps_defaults() {
        let record = FieldValue::Record(vec![("id".into(), FieldValue::I64(9))]);
        let team: Team = model_from_record("team", record).unwrap();
        assert_eq!(team.id, 9);
        assert!(team.name.is_empty());
    }

    #[test]
    fn test_require_unknown_field() {
        let err = Team::default().require_field("age").unwrap_err();
        assert!(matches!(err, Error::UnknownField { model: "Team", .. }));
    }

    #[test]
    fn test_non_record_rejected() {
        let err = model_from_record::<Team>("team", FieldValue::I32(1)).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { expected: "record", .. }));
    }
}
