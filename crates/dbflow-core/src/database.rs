//! Storage-engine collaborator interface.
//!
//! DBFlow never talks to a concrete engine. Drivers implement these traits
//! over a prepared-statement/cursor style API; statement indexes are
//! 1-based and cursor column indexes are 0-based, as in SQLite.

use crate::error::Result;
use crate::types::ConflictAction;
use crate::value::Value;

/// A compiled statement with positional bindings.
pub trait DatabaseStatement {
    fn bind_long(&mut self, index: usize, value: i64);
    fn bind_double(&mut self, index: usize, value: f64);
    fn bind_string(&mut self, index: usize, value: &str);
    fn bind_blob(&mut self, index: usize, value: &[u8]);
    fn bind_null(&mut self, index: usize);

    /// Bind any storage value with the matching typed binder.
    fn bind_value(&mut self, index: usize, value: &Value) {
        match value {
            Value::Null => self.bind_null(index),
            Value::Integer(v) => self.bind_long(index, *v),
            Value::Real(v) => self.bind_double(index, *v),
            Value::Text(v) => self.bind_string(index, v),
            Value::Blob(v) => self.bind_blob(index, v),
        }
    }

    /// Execute an INSERT, returning the new row id.
    fn execute_insert(&mut self) -> Result<i64>;

    /// Execute an UPDATE or DELETE, returning affected rows.
    fn execute_update_delete(&mut self) -> Result<u64>;

    fn clear_bindings(&mut self);
}

/// A forward-only result cursor.
pub trait FlowCursor {
    /// Ordinal of a result column, `None` when the column is absent.
    fn column_index(&self, name: &str) -> Option<usize>;
    fn is_null(&self, index: usize) -> bool;
    fn get_long(&self, index: usize) -> i64;
    fn get_int(&self, index: usize) -> i32;
    fn get_short(&self, index: usize) -> i16;
    fn get_double(&self, index: usize) -> f64;
    fn get_float(&self, index: usize) -> f32;
    fn get_string(&self, index: usize) -> String;
    fn get_blob(&self, index: usize) -> Vec<u8>;
    fn move_to_first(&mut self) -> bool;
    fn move_to_next(&mut self) -> bool;
    fn count(&self) -> usize;
}

/// Connection-like handle the core executes against.
///
/// Implementations are not required to be thread-safe; cross-thread
/// serialization belongs to the transaction queue.
pub trait DatabaseWrapper {
    fn exec_sql(&self, sql: &str) -> Result<()>;
    fn compile_statement(&self, sql: &str) -> Result<Box<dyn DatabaseStatement + '_>>;
    fn raw_query(&self, sql: &str, args: &[String]) -> Result<Box<dyn FlowCursor + '_>>;

    fn insert_with_on_conflict(
        &self,
        table: &str,
        values: &ContentValues,
        conflict: ConflictAction,
    ) -> Result<i64>;

    fn update_with_on_conflict(
        &self,
        table: &str,
        values: &ContentValues,
        where_clause: &str,
        where_args: &[String],
        conflict: ConflictAction,
    ) -> Result<u64>;

    fn delete(&self, table: &str, where_clause: &str, where_args: &[String]) -> Result<u64>;

    fn begin_transaction(&self) -> Result<()>;
    fn set_transaction_successful(&self) -> Result<()>;
    fn end_transaction(&self) -> Result<()>;

    /// Schema version currently stored in the database.
    fn version(&self) -> u32;
}

/// Ordered key/value map bound into insert/update convenience calls.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentValues {
    entries: Vec<(String, Value)>,
}

impl ContentValues {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key`, replacing an earlier value in place.
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    pub fn put_null(&mut self, key: impl Into<String>) {
        self.put(key, Value::Null);
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(pos).1)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}
