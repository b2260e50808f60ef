//! Value/type mapping: field kinds, storage primitives and SQL keywords.

use serde::{Deserialize, Serialize};

/// The four storage classes every persisted value is reduced to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoragePrimitive {
    /// Signed 64-bit integer storage.
    Integer,
    /// 64-bit floating point storage.
    Real,
    /// UTF-8 text storage.
    Text,
    /// Raw bytes.
    Blob,
}

impl StoragePrimitive {
    /// SQL type name used in column definitions.
    #[must_use]
    pub const fn sql_name(self) -> &'static str {
        match self {
            StoragePrimitive::Integer => "INTEGER",
            StoragePrimitive::Real => "REAL",
            StoragePrimitive::Text => "TEXT",
            StoragePrimitive::Blob => "BLOB",
        }
    }

    /// Statement binder used for values of this storage class.
    #[must_use]
    pub const fn binder(self) -> StatementBinder {
        match self {
            StoragePrimitive::Integer => StatementBinder::Long,
            StoragePrimitive::Real => StatementBinder::Double,
            StoragePrimitive::Text => StatementBinder::String,
            StoragePrimitive::Blob => StatementBinder::Blob,
        }
    }

    /// Cursor getter used when the logical kind is not known.
    #[must_use]
    pub const fn default_getter(self) -> CursorGetter {
        match self {
            StoragePrimitive::Integer => CursorGetter::Long,
            StoragePrimitive::Real => CursorGetter::Double,
            StoragePrimitive::Text => CursorGetter::String,
            StoragePrimitive::Blob => CursorGetter::Blob,
        }
    }
}

/// Logical kind of a persisted field, before any conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    F32,
    F64,
    Char,
    String,
    /// `Blob` wrapper, unwrapped to bytes on bind and rewrapped on load.
    Blob,
    /// Plain `Vec<u8>`.
    Bytes,
}

impl FieldKind {
    /// Storage class this kind maps to.
    #[must_use]
    pub const fn storage(self) -> StoragePrimitive {
        match self {
            FieldKind::Bool
            | FieldKind::I8
            | FieldKind::I16
            | FieldKind::I32
            | FieldKind::I64
            | FieldKind::U8
            | FieldKind::U16
            | FieldKind::U32 => StoragePrimitive::Integer,
            FieldKind::F32 | FieldKind::F64 => StoragePrimitive::Real,
            FieldKind::Char | FieldKind::String => StoragePrimitive::Text,
            FieldKind::Blob | FieldKind::Bytes => StoragePrimitive::Blob,
        }
    }

    /// Cursor accessor that reads this kind back.
    #[must_use]
    pub const fn getter(self) -> CursorGetter {
        match self {
            FieldKind::Bool | FieldKind::I64 | FieldKind::U32 => CursorGetter::Long,
            FieldKind::I8 | FieldKind::I16 | FieldKind::U8 => CursorGetter::Short,
            FieldKind::I32 | FieldKind::U16 => CursorGetter::Int,
            FieldKind::F32 => CursorGetter::Float,
            FieldKind::F64 => CursorGetter::Double,
            FieldKind::Char | FieldKind::String => CursorGetter::String,
            FieldKind::Blob | FieldKind::Bytes => CursorGetter::Blob,
        }
    }

    /// Kinds that go through a built-in value converter instead of binding directly.
    #[must_use]
    pub const fn builtin_converter(self) -> Option<&'static str> {
        match self {
            FieldKind::Bool => Some("BooleanConverter"),
            FieldKind::Char => Some("CharConverter"),
            _ => None,
        }
    }

    /// Rust spelling of the kind, used by the source printer.
    #[must_use]
    pub const fn rust_name(self) -> &'static str {
        match self {
            FieldKind::Bool => "bool",
            FieldKind::I8 => "i8",
            FieldKind::I16 => "i16",
            FieldKind::I32 => "i32",
            FieldKind::I64 => "i64",
            FieldKind::U8 => "u8",
            FieldKind::U16 => "u16",
            FieldKind::U32 => "u32",
            FieldKind::F32 => "f32",
            FieldKind::F64 => "f64",
            FieldKind::Char => "char",
            FieldKind::String => "String",
            FieldKind::Blob => "Blob",
            FieldKind::Bytes => "Vec<u8>",
        }
    }

    /// Parse a Rust type spelling (last path segment) into a kind.
    #[must_use]
    pub fn from_rust_name(name: &str) -> Option<Self> {
        Some(match name {
            "bool" => FieldKind::Bool,
            "i8" => FieldKind::I8,
            "i16" => FieldKind::I16,
            "i32" => FieldKind::I32,
            "i64" => FieldKind::I64,
            "u8" => FieldKind::U8,
            "u16" => FieldKind::U16,
            "u32" => FieldKind::U32,
            "f32" => FieldKind::F32,
            "f64" => FieldKind::F64,
            "char" => FieldKind::Char,
            "String" | "str" => FieldKind::String,
            "Blob" => FieldKind::Blob,
            "Vec<u8>" => FieldKind::Bytes,
            _ => return None,
        })
    }
}

/// Cursor accessor family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CursorGetter {
    Long,
    Int,
    Short,
    Double,
    Float,
    String,
    Blob,
}

impl CursorGetter {
    /// Method name on [`crate::FlowCursor`].
    #[must_use]
    pub const fn method(self) -> &'static str {
        match self {
            CursorGetter::Long => "get_long",
            CursorGetter::Int => "get_int",
            CursorGetter::Short => "get_short",
            CursorGetter::Double => "get_double",
            CursorGetter::Float => "get_float",
            CursorGetter::String => "get_string",
            CursorGetter::Blob => "get_blob",
        }
    }
}

/// Prepared-statement binder family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementBinder {
    Long,
    Double,
    String,
    Blob,
}

impl StatementBinder {
    /// Method name on [`crate::DatabaseStatement`].
    #[must_use]
    pub const fn method(self) -> &'static str {
        match self {
            StatementBinder::Long => "bind_long",
            StatementBinder::Double => "bind_double",
            StatementBinder::String => "bind_string",
            StatementBinder::Blob => "bind_blob",
        }
    }
}

/// SQL conflict clause applied when a constraint is violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictAction {
    /// No conflict clause is emitted.
    #[default]
    None,
    Rollback,
    Abort,
    Fail,
    Ignore,
    Replace,
}

impl ConflictAction {
    /// SQL keyword, or `None` for [`ConflictAction::None`].
    #[must_use]
    pub const fn as_sql(self) -> Option<&'static str> {
        match self {
            ConflictAction::None => None,
            ConflictAction::Rollback => Some("ROLLBACK"),
            ConflictAction::Abort => Some("ABORT"),
            ConflictAction::Fail => Some("FAIL"),
            ConflictAction::Ignore => Some("IGNORE"),
            ConflictAction::Replace => Some("REPLACE"),
        }
    }

    /// Whether a conflict clause is emitted at all.
    #[must_use]
    pub const fn is_set(self) -> bool {
        !matches!(self, ConflictAction::None)
    }

    /// Use `self` unless it is unset, then fall back to `default`.
    #[must_use]
    pub const fn or(self, default: ConflictAction) -> ConflictAction {
        if self.is_set() { self } else { default }
    }

    /// Parse a conflict action (case-insensitive).
    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "NONE" | "" => Some(ConflictAction::None),
            "ROLLBACK" => Some(ConflictAction::Rollback),
            "ABORT" => Some(ConflictAction::Abort),
            "FAIL" => Some(ConflictAction::Fail),
            "IGNORE" => Some(ConflictAction::Ignore),
            "REPLACE" => Some(ConflictAction::Replace),
            _ => None,
        }
    }
}

/// Referential action for foreign key constraints (ON DELETE / ON UPDATE).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferentialAction {
    /// No action - raise error if any references exist.
    #[default]
    NoAction,
    Restrict,
    Cascade,
    SetNull,
    SetDefault,
}

impl ReferentialAction {
    /// Get the SQL representation of this action.
    #[must_use]
    pub const fn as_sql(&self) -> &'static str {
        match self {
            ReferentialAction::NoAction => "NO ACTION",
            ReferentialAction::Restrict => "RESTRICT",
            ReferentialAction::Cascade => "CASCADE",
            ReferentialAction::SetNull => "SET NULL",
            ReferentialAction::SetDefault => "SET DEFAULT",
        }
    }

    /// Parse a referential action from a string (case-insensitive).
    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "NO ACTION" | "NOACTION" | "NO_ACTION" => Some(ReferentialAction::NoAction),
            "RESTRICT" => Some(ReferentialAction::Restrict),
            "CASCADE" => Some(ReferentialAction::Cascade),
            "SET NULL" | "SETNULL" | "SET_NULL" => Some(ReferentialAction::SetNull),
            "SET DEFAULT" | "SETDEFAULT" | "SET_DEFAULT" => Some(ReferentialAction::SetDefault),
            _ => None,
        }
    }
}

/// Collating sequences understood by SQLite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collate {
    Binary,
    NoCase,
    RTrim,
    Localized,
    Unicode,
}

impl Collate {
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Collate::Binary => "BINARY",
            Collate::NoCase => "NOCASE",
            Collate::RTrim => "RTRIM",
            Collate::Localized => "LOCALIZED",
            Collate::Unicode => "UNICODE",
        }
    }

    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "BINARY" => Some(Collate::Binary),
            "NOCASE" => Some(Collate::NoCase),
            "RTRIM" => Some(Collate::RTrim),
            "LOCALIZED" => Some(Collate::Localized),
            "UNICODE" => Some(Collate::Unicode),
            _ => None,
        }
    }
}

/// Enums persisted by variant name.
///
/// Implemented by `#[derive(SqlEnum)]`; a column holding an enum stores
/// `sql_name()` as TEXT and restores it with `from_sql_name`.
pub trait SqlEnum: Sized {
    /// Stored name of this variant.
    fn sql_name(&self) -> &'static str;

    /// Variant for a stored name, if any.
    fn from_sql_name(name: &str) -> Option<Self>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_storage_mapping() {
        assert_eq!(FieldKind::Bool.storage(), StoragePrimitive::Integer);
        assert_eq!(FieldKind::U32.storage(), StoragePrimitive::Integer);
        assert_eq!(FieldKind::F32.storage(), StoragePrimitive::Real);
        assert_eq!(FieldKind::Char.storage(), StoragePrimitive::Text);
        assert_eq!(FieldKind::Blob.storage(), StoragePrimitive::Blob);
        assert_eq!(FieldKind::Bytes.storage(), StoragePrimitive::Blob);
    }

    #[test]
    fn test_kind_accessors() {
        assert_eq!(FieldKind::I32.getter(), CursorGetter::Int);
        assert_eq!(FieldKind::I16.getter().method(), "get_short");
        assert_eq!(FieldKind::F32.storage().binder().method(), "bind_double");
        assert_eq!(FieldKind::from_rust_name("Vec<u8>"), Some(FieldKind::Bytes));
        assert_eq!(FieldKind::from_rust_name("Date"), None);
    }

    #[test]
    fn test_conflict_fallback() {
        assert_eq!(
            ConflictAction::None.or(ConflictAction::Abort),
            ConflictAction::Abort
        );
        assert_eq!(
            ConflictAction::Replace.or(ConflictAction::Abort),
            ConflictAction::Replace
        );
        assert_eq!(ConflictAction::None.as_sql(), None);
        assert_eq!(ConflictAction::from_str("fail"), Some(ConflictAction::Fail));
    }

    #[test]
    fn test_referential_action_round_trip() {
        for action in [
            ReferentialAction::NoAction,
            ReferentialAction::Restrict,
            ReferentialAction::Cascade,
            ReferentialAction::SetNull,
            ReferentialAction::SetDefault,
        ] {
            assert_eq!(ReferentialAction::from_str(action.as_sql()), Some(action));
        }
    }
}
