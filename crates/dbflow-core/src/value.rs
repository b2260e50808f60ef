//! Storage values and logical field values.
//!
//! [`Value`] is what the storage engine sees: one of the four storage
//! classes or NULL. [`FieldValue`] is what a model field holds before any
//! conversion, and is the currency of the dynamic [`crate::Model`] accessors.

use std::any::Any;
use std::fmt;

use crate::error::{Error, Result};
use crate::identifiers::{blob_literal, sql_escape_string};
use crate::types::StoragePrimitive;

/// A storage-level value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Storage class of a non-null value.
    #[must_use]
    pub const fn storage(&self) -> Option<StoragePrimitive> {
        match self {
            Value::Null => None,
            Value::Integer(_) => Some(StoragePrimitive::Integer),
            Value::Real(_) => Some(StoragePrimitive::Real),
            Value::Text(_) => Some(StoragePrimitive::Text),
            Value::Blob(_) => Some(StoragePrimitive::Blob),
        }
    }

    /// Render as an SQL literal: numbers verbatim, text single-quoted and
    /// escaped, blobs as `X'..'`.
    #[must_use]
    pub fn to_sql_literal(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Real(f) => f.to_string(),
            Value::Text(s) => sql_escape_string(s),
            Value::Blob(b) => blob_literal(b),
        }
    }

    /// Text form used for positional `raw_query` arguments.
    #[must_use]
    pub fn to_arg_string(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Integer(i) => i.to_string(),
            Value::Real(f) => f.to_string(),
            Value::Text(s) => s.clone(),
            Value::Blob(b) => blob_literal(b),
        }
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql_literal())
    }
}

macro_rules! value_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::Integer(i64::from(v))
            }
        })*
    };
}

value_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Real(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Blob(v)
    }
}

impl From<Blob> for Value {
    fn from(v: Blob) -> Self {
        Value::Blob(v.0)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Wrapper marking a byte field as a blob column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Blob(pub Vec<u8>);

impl Blob {
    #[must_use]
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Blob(bytes.into())
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// A model field's value in logical (pre-conversion) form.
pub enum FieldValue {
    Null,
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    F32(f32),
    F64(f64),
    Char(char),
    Text(String),
    Blob(Blob),
    Bytes(Vec<u8>),
    /// Enum variant by stored name.
    Enum(String),
    /// Referenced model, as `(field name, value)` pairs.
    Record(Vec<(String, FieldValue)>),
    /// Value of a custom type that needs a registered converter.
    Custom(Box<dyn Any + Send + Sync>),
}

impl FieldValue {
    /// Box a custom-typed value.
    pub fn custom<T: Any + Send + Sync>(value: T) -> Self {
        FieldValue::Custom(Box::new(value))
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Short name of the variant, used in mismatch errors.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Bool(_) => "bool",
            FieldValue::I8(_) => "i8",
            FieldValue::I16(_) => "i16",
            FieldValue::I32(_) => "i32",
            FieldValue::I64(_) => "i64",
            FieldValue::U8(_) => "u8",
            FieldValue::U16(_) => "u16",
            FieldValue::U32(_) => "u32",
            FieldValue::F32(_) => "f32",
            FieldValue::F64(_) => "f64",
            FieldValue::Char(_) => "char",
            FieldValue::Text(_) => "text",
            FieldValue::Blob(_) => "blob",
            FieldValue::Bytes(_) => "bytes",
            FieldValue::Enum(_) => "enum",
            FieldValue::Record(_) => "record",
            FieldValue::Custom(_) => "custom",
        }
    }

    /// Look up a field inside a [`FieldValue::Record`].
    #[must_use]
    pub fn record_field(&self, name: &str) -> Option<&FieldValue> {
        match self {
            FieldValue::Record(fields) => fields.iter().find(|(n, _)| n == name).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Convert a primitive field value into its storage value.
    ///
    /// Records and custom values need schema knowledge (references,
    /// converters) and are rejected here.
    pub fn to_storage(&self) -> Result<Value> {
        Ok(match self {
            FieldValue::Null => Value::Null,
            FieldValue::Bool(b) => Value::Integer(i64::from(*b)),
            FieldValue::I8(v) => Value::from(*v),
            FieldValue::I16(v) => Value::from(*v),
            FieldValue::I32(v) => Value::from(*v),
            FieldValue::I64(v) => Value::Integer(*v),
            FieldValue::U8(v) => Value::from(*v),
            FieldValue::U16(v) => Value::from(*v),
            FieldValue::U32(v) => Value::from(*v),
            FieldValue::F32(v) => Value::from(*v),
            FieldValue::F64(v) => Value::Real(*v),
            FieldValue::Char(c) => Value::Text(c.to_string()),
            FieldValue::Text(s) | FieldValue::Enum(s) => Value::Text(s.clone()),
            FieldValue::Blob(b) => Value::Blob(b.0.clone()),
            FieldValue::Bytes(b) => Value::Blob(b.clone()),
            FieldValue::Record(_) | FieldValue::Custom(_) => {
                return Err(Error::Conversion(format!(
                    "{} values have no direct storage form",
                    self.kind_name()
                )));
            }
        })
    }
}

impl fmt::Debug for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => f.write_str("Null"),
            FieldValue::Bool(v) => f.debug_tuple("Bool").field(v).finish(),
            FieldValue::I8(v) => f.debug_tuple("I8").field(v).finish(),
            FieldValue::I16(v) => f.debug_tuple("I16").field(v).finish(),
            FieldValue::I32(v) => f.debug_tuple("I32").field(v).finish(),
            FieldValue::I64(v) => f.debug_tuple("I64").field(v).finish(),
            FieldValue::U8(v) => f.debug_tuple("U8").field(v).finish(),
            FieldValue::U16(v) => f.debug_tuple("U16").field(v).finish(),
            FieldValue::U32(v) => f.debug_tuple("U32").field(v).finish(),
            FieldValue::F32(v) => f.debug_tuple("F32").field(v).finish(),
            FieldValue::F64(v) => f.debug_tuple("F64").field(v).finish(),
            FieldValue::Char(v) => f.debug_tuple("Char").field(v).finish(),
            FieldValue::Text(v) => f.debug_tuple("Text").field(v).finish(),
            FieldValue::Blob(v) => f.debug_tuple("Blob").field(v).finish(),
            FieldValue::Bytes(v) => f.debug_tuple("Bytes").field(v).finish(),
            FieldValue::Enum(v) => f.debug_tuple("Enum").field(v).finish(),
            FieldValue::Record(v) => f.debug_tuple("Record").field(v).finish(),
            FieldValue::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Conversion from a Rust field into a [`FieldValue`].
pub trait IntoFieldValue {
    fn to_field_value(&self) -> FieldValue;
}

/// Conversion from a [`FieldValue`] back into a Rust field.
pub trait FromFieldValue: Sized {
    fn from_field_value(field: &str, value: FieldValue) -> Result<Self>;
}

fn mismatch(field: &str, expected: &'static str, found: &FieldValue) -> Error {
    Error::TypeMismatch {
        field: field.to_string(),
        expected,
        found: found.kind_name(),
    }
}

macro_rules! field_value_primitive {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl IntoFieldValue for $t {
                fn to_field_value(&self) -> FieldValue {
                    FieldValue::$variant(self.clone())
                }
            }

            impl FromFieldValue for $t {
                fn from_field_value(field: &str, value: FieldValue) -> Result<Self> {
                    match value {
                        FieldValue::$variant(v) => Ok(v),
                        FieldValue::Null => Ok(<$t>::default()),
                        other => Err(mismatch(field, stringify!($t), &other)),
                    }
                }
            }
        )*
    };
}

field_value_primitive!(
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    f32 => F32,
    f64 => F64,
    char => Char,
    String => Text,
    Blob => Blob,
    Vec<u8> => Bytes,
);

impl<T: IntoFieldValue> IntoFieldValue for Option<T> {
    fn to_field_value(&self) -> FieldValue {
        self.as_ref().map_or(FieldValue::Null, IntoFieldValue::to_field_value)
    }
}

impl<T: FromFieldValue> FromFieldValue for Option<T> {
    fn from_field_value(field: &str, value: FieldValue) -> Result<Self> {
        match value {
            FieldValue::Null => Ok(None),
            other => T::from_field_value(field, other).map(Some),
        }
    }
}

/// Field value of a converter-backed custom type; `None` is null.
pub fn custom_to_field_value<T: Any + Clone + Send + Sync>(value: Option<&T>) -> FieldValue {
    value.map_or(FieldValue::Null, |v| FieldValue::custom(v.clone()))
}

/// Unbox a custom field value produced by a converter.
pub fn custom_from_field_value<T: Any + Send + Sync>(
    field: &str,
    value: FieldValue,
) -> Result<Option<T>> {
    match value {
        FieldValue::Null => Ok(None),
        FieldValue::Custom(boxed) => boxed.downcast::<T>().map(|v| Some(*v)).map_err(|_| {
            Error::Conversion(format!(
                "`{field}` does not hold a {}",
                std::any::type_name::<T>()
            ))
        }),
        other => Err(mismatch(field, "custom", &other)),
    }
}

/// Like [`custom_from_field_value`], rejecting null.
pub fn custom_required<T: Any + Send + Sync>(field: &str, value: FieldValue) -> Result<T> {
    custom_from_field_value(field, value)?.ok_or_else(|| Error::TypeMismatch {
        field: field.to_string(),
        expected: "custom",
        found: "null",
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_literals() {
        assert_eq!(Value::Integer(6).to_sql_literal(), "6");
        assert_eq!(Value::Real(4.5).to_sql_literal(), "4.5");
        assert_eq!(Value::Text("James".into()).to_sql_literal(), "'James'");
        assert_eq!(Value::Null.to_sql_literal(), "NULL");
        assert_eq!(Value::Blob(vec![1, 2]).to_sql_literal(), "X'0102'");
    }

    #[test]
    fn test_value_from_option() {
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(Value::from(Some(5_i32)), Value::Integer(5));
    }

    #[test]
    fn test_field_value_to_storage() {
        assert_eq!(FieldValue::Bool(true).to_storage().unwrap(), Value::Integer(1));
        assert_eq!(
            FieldValue::Char('x').to_storage().unwrap(),
            Value::Text("x".into())
        );
        assert_eq!(
            FieldValue::Blob(Blob::new(vec![9])).to_storage().unwrap(),
            Value::Blob(vec![9])
        );
        assert!(FieldValue::custom(3_u64).to_storage().is_err());
    }

    #[test]
    fn test_option_round_trip() {
        let value = Some("Ryan".to_string()).to_field_value();
        let back: Option<String> = FromFieldValue::from_field_value("name", value).unwrap();
        assert_eq!(back.as_deref(), Some("Ryan"));

        let back: Option<String> =
            FromFieldValue::from_field_value("name", FieldValue::Null).unwrap();
        assert_eq!(back, None);
    }

    #[test]
    fn test_type_mismatch() {
        let err = i64::from_field_value("id", FieldValue::Text("x".into())).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { expected: "i64", .. }));
    }

    #[test]
    fn test_custom_round_trip() {
        #[derive(Debug, Clone, PartialEq)]
        struct Celsius(f64);

        let value = custom_to_field_value(Some(&Celsius(21.5)));
        assert_eq!(value.kind_name(), "custom");
        let back: Celsius = custom_required("temp", value).unwrap();
        assert_eq!(back, Celsius(21.5));

        assert!(custom_to_field_value::<Celsius>(None).is_null());
        assert!(custom_required::<Celsius>("temp", FieldValue::Null).is_err());
        let err = custom_from_field_value::<Celsius>("temp", FieldValue::custom(3_u8)).unwrap_err();
        assert!(matches!(err, Error::Conversion(_)));
    }

    #[test]
    fn test_record_field_lookup() {
        let record = FieldValue::Record(vec![("id".into(), FieldValue::I64(7))]);
        assert!(matches!(record.record_field("id"), Some(FieldValue::I64(7))));
        assert!(record.record_field("name").is_none());
    }
}
