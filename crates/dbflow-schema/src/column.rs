//! Column model: one persisted member and how its value reaches storage.

use std::any::Any;

use dbflow_core::{
    Blob, Collate, ConflictAction, CursorGetter, Error, FieldKind, FieldValue, ReferentialAction,
    Result, StatementBinder, StoragePrimitive, Value, converter_named,
};
use serde::Serialize;

use crate::decl::{ReferenceDecl, TypeRef};

/// How a logical value is encoded into a storage value and back.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "codec", rename_all = "snake_case")]
pub enum ValueCodec {
    /// Stored as-is (blob wrappers unwrapped).
    Direct { kind: FieldKind },
    /// Enum stored by variant name as TEXT.
    Enum,
    /// Through a registered value converter.
    Converter {
        name: String,
        storage: StoragePrimitive,
        /// Logical kind when the field is a built-in kind, used to rebuild
        /// the field value after conversion.
        kind: Option<FieldKind>,
    },
}

impl ValueCodec {
    /// Codec for a built-in kind: direct, or its built-in converter.
    #[must_use]
    pub fn for_kind(kind: FieldKind) -> Self {
        match kind.builtin_converter() {
            Some(name) => ValueCodec::Converter {
                name: name.to_string(),
                storage: kind.storage(),
                kind: Some(kind),
            },
            None => ValueCodec::Direct { kind },
        }
    }

    #[must_use]
    pub fn storage(&self) -> StoragePrimitive {
        match self {
            ValueCodec::Direct { kind } => kind.storage(),
            ValueCodec::Enum => StoragePrimitive::Text,
            ValueCodec::Converter { storage, .. } => *storage,
        }
    }

    #[must_use]
    pub fn getter(&self) -> CursorGetter {
        match self {
            ValueCodec::Direct { kind } => kind.getter(),
            ValueCodec::Enum => CursorGetter::String,
            ValueCodec::Converter { storage, .. } => storage.default_getter(),
        }
    }

    #[must_use]
    pub fn binder(&self) -> StatementBinder {
        self.storage().binder()
    }

    /// Whether values pass through a user converter rather than a built-in one.
    #[must_use]
    pub fn is_custom_converter(&self) -> bool {
        matches!(self, ValueCodec::Converter { kind: None, .. })
    }

    /// Logical value to storage value.
    pub fn encode(&self, field: &str, value: &FieldValue) -> Result<Value> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        match self {
            ValueCodec::Direct { .. } => value.to_storage(),
            ValueCodec::Enum => match value {
                FieldValue::Enum(name) | FieldValue::Text(name) => Ok(Value::Text(name.clone())),
                other => Err(Error::TypeMismatch {
                    field: field.to_string(),
                    expected: "enum",
                    found: other.kind_name(),
                }),
            },
            ValueCodec::Converter { name, .. } => {
                let converter =
                    converter_named(name).ok_or_else(|| Error::MissingConverter(name.clone()))?;
                let any = field_any(value).ok_or_else(|| Error::TypeMismatch {
                    field: field.to_string(),
                    expected: "convertible value",
                    found: value.kind_name(),
                })?;
                converter.to_db_any(any)
            }
        }
    }

    /// Storage value to logical value.
    pub fn decode(&self, field: &str, value: Value) -> Result<FieldValue> {
        if value.is_null() {
            return Ok(FieldValue::Null);
        }
        match self {
            ValueCodec::Direct { kind } => decode_kind(field, *kind, value),
            ValueCodec::Enum => match value {
                Value::Text(name) => Ok(FieldValue::Enum(name)),
                other => Err(storage_mismatch(field, "TEXT", &other)),
            },
            ValueCodec::Converter { name, kind, .. } => {
                let converter =
                    converter_named(name).ok_or_else(|| Error::MissingConverter(name.clone()))?;
                let boxed = converter.from_db_any(value)?;
                match kind {
                    Some(kind) => unbox_kind(field, *kind, boxed),
                    None => Ok(FieldValue::Custom(boxed)),
                }
            }
        }
    }
}

fn storage_mismatch(field: &str, expected: &str, found: &Value) -> Error {
    Error::Conversion(format!("`{field}` expects {expected} storage, found {found:?}"))
}

fn field_any(value: &FieldValue) -> Option<&dyn Any> {
    let any: &dyn Any = match value {
        FieldValue::Bool(v) => v,
        FieldValue::I8(v) => v,
        FieldValue::I16(v) => v,
        FieldValue::I32(v) => v,
        FieldValue::I64(v) => v,
        FieldValue::U8(v) => v,
        FieldValue::U16(v) => v,
        FieldValue::U32(v) => v,
        FieldValue::F32(v) => v,
        FieldValue::F64(v) => v,
        FieldValue::Char(v) => v,
        FieldValue::Text(v) => v,
        FieldValue::Blob(v) => v,
        FieldValue::Bytes(v) => v,
        FieldValue::Custom(v) => &**v,
        FieldValue::Null | FieldValue::Enum(_) | FieldValue::Record(_) => return None,
    };
    Some(any)
}

fn narrow<T: TryFrom<i64>>(field: &str, value: i64) -> Result<T> {
    T::try_from(value).map_err(|_| {
        Error::Conversion(format!(
            "`{field}` value {value} does not fit {}",
            std::any::type_name::<T>()
        ))
    })
}

fn decode_kind(field: &str, kind: FieldKind, value: Value) -> Result<FieldValue> {
    Ok(match (kind, value) {
        (FieldKind::Bool, Value::Integer(i)) => FieldValue::Bool(i != 0),
        (FieldKind::I8, Value::Integer(i)) => FieldValue::I8(narrow(field, i)?),
        (FieldKind::I16, Value::Integer(i)) => FieldValue::I16(narrow(field, i)?),
        (FieldKind::I32, Value::Integer(i)) => FieldValue::I32(narrow(field, i)?),
        (FieldKind::I64, Value::Integer(i)) => FieldValue::I64(i),
        (FieldKind::U8, Value::Integer(i)) => FieldValue::U8(narrow(field, i)?),
        (FieldKind::U16, Value::Integer(i)) => FieldValue::U16(narrow(field, i)?),
        (FieldKind::U32, Value::Integer(i)) => FieldValue::U32(narrow(field, i)?),
        (FieldKind::F32, Value::Real(f)) => FieldValue::F32(f as f32),
        (FieldKind::F64, Value::Real(f)) => FieldValue::F64(f),
        (FieldKind::F32, Value::Integer(i)) => FieldValue::F32(i as f32),
        (FieldKind::F64, Value::Integer(i)) => FieldValue::F64(i as f64),
        (FieldKind::String, Value::Text(s)) => FieldValue::Text(s),
        (FieldKind::Char, Value::Text(s)) => match s.chars().next() {
            Some(c) => FieldValue::Char(c),
            None => return Err(Error::Conversion(format!("`{field}` read empty text as char"))),
        },
        (FieldKind::Blob, Value::Blob(b)) => FieldValue::Blob(Blob(b)),
        (FieldKind::Bytes, Value::Blob(b)) => FieldValue::Bytes(b),
        (kind, other) => return Err(storage_mismatch(field, kind.storage().sql_name(), &other)),
    })
}

macro_rules! unbox_as {
    ($field:expr, $boxed:expr, $t:ty, $variant:ident) => {
        $boxed
            .downcast::<$t>()
            .map(|v| FieldValue::$variant(*v))
            .map_err(|_| Error::Conversion(format!(
                "converter for `{}` did not produce {}",
                $field,
                stringify!($t)
            )))
    };
}

fn unbox_kind(field: &str, kind: FieldKind, boxed: Box<dyn Any + Send + Sync>) -> Result<FieldValue> {
    match kind {
        FieldKind::Bool => unbox_as!(field, boxed, bool, Bool),
        FieldKind::I8 => unbox_as!(field, boxed, i8, I8),
        FieldKind::I16 => unbox_as!(field, boxed, i16, I16),
        FieldKind::I32 => unbox_as!(field, boxed, i32, I32),
        FieldKind::I64 => unbox_as!(field, boxed, i64, I64),
        FieldKind::U8 => unbox_as!(field, boxed, u8, U8),
        FieldKind::U16 => unbox_as!(field, boxed, u16, U16),
        FieldKind::U32 => unbox_as!(field, boxed, u32, U32),
        FieldKind::F32 => unbox_as!(field, boxed, f32, F32),
        FieldKind::F64 => unbox_as!(field, boxed, f64, F64),
        FieldKind::Char => unbox_as!(field, boxed, char, Char),
        FieldKind::String => unbox_as!(field, boxed, String, Text),
        FieldKind::Blob => unbox_as!(field, boxed, Blob, Blob),
        FieldKind::Bytes => unbox_as!(field, boxed, Vec<u8>, Bytes),
    }
}

/// Primary-key flavor of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimaryKeyKind {
    /// Caller-assigned key.
    Explicit,
    /// Engine-assigned with the AUTOINCREMENT keyword.
    AutoIncrement,
    /// Engine-assigned rowid alias.
    RowId,
}

/// Role of a column in its table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    Plain,
    PrimaryKey,
    PrimaryKeyAutoIncrement,
    RowId,
    ForeignKey,
}

/// One resolved local-column to target-column pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForeignKeyReference {
    /// Local storage column.
    pub column_name: String,
    /// Storage column on the target table.
    pub target_column: String,
    /// Field path from the referenced model down to the referenced value.
    /// Longer than one when the target key is itself a foreign key.
    pub path: Vec<String>,
    pub codec: ValueCodec,
}

impl ForeignKeyReference {
    #[must_use]
    pub fn storage(&self) -> StoragePrimitive {
        self.codec.storage()
    }
}

/// Foreign-key facts of a model-typed column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForeignKeySpec {
    /// Target entity type.
    pub target: String,
    /// Target table name; known once resolved.
    pub target_table: String,
    /// Declared reference pairs; empty for implicit references.
    pub declared: Vec<ReferenceDecl>,
    /// Resolved references; non-empty once `resolved` is set.
    pub references: Vec<ForeignKeyReference>,
    pub resolved: bool,
    pub on_delete: ReferentialAction,
    pub on_update: ReferentialAction,
    pub deferred: bool,
    /// Per-column naming template override.
    pub naming: Option<String>,
}

impl ForeignKeySpec {
    #[must_use]
    pub fn is_explicit(&self) -> bool {
        !self.declared.is_empty()
    }
}

/// A persisted member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnSchema {
    /// Member name on the model.
    pub field_name: String,
    /// Storage column name.
    pub column_name: String,
    /// The storage name came from an explicit override.
    pub name_overridden: bool,
    pub ty: TypeRef,
    /// Declared as `Option<T>`.
    pub nullable: bool,
    pub primary_key: Option<PrimaryKeyKind>,
    pub foreign_key: Option<ForeignKeySpec>,
    /// Value codec; `None` for foreign keys (each reference carries one)
    /// and for converted columns before resolution.
    pub codec: Option<ValueCodec>,
    /// Explicitly named converter.
    pub converter: Option<String>,
    pub not_null: Option<ConflictAction>,
    pub default_value: Option<String>,
    /// Column-level UNIQUE and its conflict action.
    pub unique: Option<ConflictAction>,
    pub unique_groups: Vec<i32>,
    pub index_groups: Vec<i32>,
    /// Single-column index.
    pub indexed: bool,
    pub length: Option<u32>,
    pub collate: Option<Collate>,
    pub getter: Option<String>,
    pub setter: Option<String>,
}

impl ColumnSchema {
    /// A plain column named after its field.
    pub fn new(field_name: impl Into<String>, ty: TypeRef) -> Self {
        let field_name = field_name.into();
        let codec = match &ty {
            TypeRef::Primitive(kind) => Some(ValueCodec::for_kind(*kind)),
            TypeRef::Enum(_) => Some(ValueCodec::Enum),
            TypeRef::Model(_) | TypeRef::Custom(_) => None,
        };
        Self {
            column_name: field_name.clone(),
            field_name,
            name_overridden: false,
            ty,
            nullable: false,
            primary_key: None,
            foreign_key: None,
            codec,
            converter: None,
            not_null: None,
            default_value: None,
            unique: None,
            unique_groups: Vec::new(),
            index_groups: Vec::new(),
            indexed: false,
            length: None,
            collate: None,
            getter: None,
            setter: None,
        }
    }

    #[must_use]
    pub fn role(&self) -> ColumnRole {
        match (self.primary_key, &self.foreign_key) {
            (Some(PrimaryKeyKind::AutoIncrement), _) => ColumnRole::PrimaryKeyAutoIncrement,
            (Some(PrimaryKeyKind::RowId), _) => ColumnRole::RowId,
            (_, Some(_)) => ColumnRole::ForeignKey,
            (Some(PrimaryKeyKind::Explicit), None) => ColumnRole::PrimaryKey,
            (None, None) => ColumnRole::Plain,
        }
    }

    #[must_use]
    pub fn is_primary_key(&self) -> bool {
        self.primary_key.is_some()
    }

    #[must_use]
    pub fn is_foreign_key(&self) -> bool {
        self.foreign_key.is_some()
    }

    /// Engine-assigned key: autoincrement or rowid.
    #[must_use]
    pub fn is_engine_assigned(&self) -> bool {
        matches!(
            self.primary_key,
            Some(PrimaryKeyKind::AutoIncrement | PrimaryKeyKind::RowId)
        )
    }

    #[must_use]
    pub fn is_autoincrement(&self) -> bool {
        self.primary_key == Some(PrimaryKeyKind::AutoIncrement)
    }

    /// Storage class of a non-foreign-key column, once its codec is known.
    #[must_use]
    pub fn storage(&self) -> Option<StoragePrimitive> {
        self.codec.as_ref().map(ValueCodec::storage)
    }

    /// Storage column names in bind order.
    #[must_use]
    pub fn storage_columns(&self) -> Vec<&str> {
        match &self.foreign_key {
            Some(fk) => fk.references.iter().map(|r| r.column_name.as_str()).collect(),
            None => vec![self.column_name.as_str()],
        }
    }

    /// Whether binders must branch on null before binding.
    #[must_use]
    pub fn needs_null_guard(&self) -> bool {
        if self.nullable || self.is_foreign_key() {
            return true;
        }
        match &self.codec {
            Some(ValueCodec::Direct { kind }) => matches!(
                kind.storage(),
                StoragePrimitive::Text | StoragePrimitive::Blob
            ),
            Some(ValueCodec::Enum) => true,
            Some(ValueCodec::Converter { kind, .. }) => kind.is_none(),
            None => true,
        }
    }

    /// Whether the declared type is a non-optional numeric, bool or char.
    #[must_use]
    pub fn is_primitive(&self) -> bool {
        !self.nullable
            && matches!(
                self.ty,
                TypeRef::Primitive(kind)
                    if !matches!(kind, FieldKind::String | FieldKind::Blob | FieldKind::Bytes)
            )
    }
}
