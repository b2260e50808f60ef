//! In-memory storage doubles for dbflow-schema integration tests.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, VecDeque};

use dbflow_core::{
    ConflictAction, ContentValues, DatabaseStatement, DatabaseWrapper, FlowCursor, Result, Value,
};

/// A statement as it was executed: its SQL and final bindings.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutedStatement {
    pub sql: String,
    pub binds: BTreeMap<usize, Value>,
}

pub struct MemoryStatement<'a> {
    db: &'a MockDatabase,
    sql: String,
    binds: BTreeMap<usize, Value>,
}

impl MemoryStatement<'_> {
    fn record(&self) {
        self.db.statements.borrow_mut().push(ExecutedStatement {
            sql: self.sql.clone(),
            binds: self.binds.clone(),
        });
    }
}

impl DatabaseStatement for MemoryStatement<'_> {
    fn bind_long(&mut self, index: usize, value: i64) {
        self.binds.insert(index, Value::Integer(value));
    }

    fn bind_double(&mut self, index: usize, value: f64) {
        self.binds.insert(index, Value::Real(value));
    }

    fn bind_string(&mut self, index: usize, value: &str) {
        self.binds.insert(index, Value::Text(value.to_string()));
    }

    fn bind_blob(&mut self, index: usize, value: &[u8]) {
        self.binds.insert(index, Value::Blob(value.to_vec()));
    }

    fn bind_null(&mut self, index: usize) {
        self.binds.insert(index, Value::Null);
    }

    fn execute_insert(&mut self) -> Result<i64> {
        self.record();
        let id = self.db.next_insert_id.get();
        self.db.next_insert_id.set(id + 1);
        Ok(id)
    }

    fn execute_update_delete(&mut self) -> Result<u64> {
        self.record();
        Ok(self.db.affected_rows.get())
    }

    fn clear_bindings(&mut self) {
        self.binds.clear();
    }
}

/// A cursor over fixed rows.
#[derive(Debug, Clone, Default)]
pub struct MemoryCursor {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    position: Option<usize>,
}

impl MemoryCursor {
    pub fn new(columns: &[&str], rows: Vec<Vec<Value>>) -> Self {
        Self {
            columns: columns.iter().map(|c| (*c).to_string()).collect(),
            rows,
            position: None,
        }
    }

    fn cell(&self, index: usize) -> Option<&Value> {
        self.position
            .and_then(|p| self.rows.get(p))
            .and_then(|row| row.get(index))
    }
}

impl FlowCursor for MemoryCursor {
    fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    fn is_null(&self, index: usize) -> bool {
        self.cell(index).is_none_or(Value::is_null)
    }

    fn get_long(&self, index: usize) -> i64 {
        self.cell(index).and_then(Value::as_i64).unwrap_or_default()
    }

    fn get_int(&self, index: usize) -> i32 {
        i32::try_from(self.get_long(index)).unwrap_or_default()
    }

    fn get_short(&self, index: usize) -> i16 {
        i16::try_from(self.get_long(index)).unwrap_or_default()
    }

    fn get_double(&self, index: usize) -> f64 {
        match self.cell(index) {
            Some(Value::Real(f)) => *f,
            Some(Value::Integer(i)) => *i as f64,
            _ => 0.0,
        }
    }

    fn get_float(&self, index: usize) -> f32 {
        self.get_double(index) as f32
    }

    fn get_string(&self, index: usize) -> String {
        match self.cell(index) {
            Some(Value::Text(s)) => s.clone(),
            Some(Value::Integer(i)) => i.to_string(),
            _ => String::new(),
        }
    }

    fn get_blob(&self, index: usize) -> Vec<u8> {
        match self.cell(index) {
            Some(Value::Blob(b)) => b.clone(),
            _ => Vec::new(),
        }
    }

    fn move_to_first(&mut self) -> bool {
        if self.rows.is_empty() {
            return false;
        }
        self.position = Some(0);
        true
    }

    fn move_to_next(&mut self) -> bool {
        match self.position {
            Some(p) if p + 1 < self.rows.len() => {
                self.position = Some(p + 1);
                true
            }
            _ => false,
        }
    }

    fn count(&self) -> usize {
        self.rows.len()
    }
}

/// Records everything executed against it; queries answer from a queue
/// of canned cursors.
pub struct MockDatabase {
    pub executed: RefCell<Vec<String>>,
    pub statements: RefCell<Vec<ExecutedStatement>>,
    pub queries: RefCell<Vec<String>>,
    results: RefCell<VecDeque<MemoryCursor>>,
    next_insert_id: Cell<i64>,
    affected_rows: Cell<u64>,
    version: Cell<u32>,
}

impl MockDatabase {
    pub fn new() -> Self {
        Self {
            executed: RefCell::new(Vec::new()),
            statements: RefCell::new(Vec::new()),
            queries: RefCell::new(Vec::new()),
            results: RefCell::new(VecDeque::new()),
            next_insert_id: Cell::new(1),
            affected_rows: Cell::new(1),
            version: Cell::new(0),
        }
    }

    pub fn push_result(&self, cursor: MemoryCursor) {
        self.results.borrow_mut().push_back(cursor);
    }

    pub fn set_next_insert_id(&self, id: i64) {
        self.next_insert_id.set(id);
    }

    pub fn set_affected_rows(&self, rows: u64) {
        self.affected_rows.set(rows);
    }

    pub fn last_statement(&self) -> Option<ExecutedStatement> {
        self.statements.borrow().last().cloned()
    }
}

impl DatabaseWrapper for MockDatabase {
    fn exec_sql(&self, sql: &str) -> Result<()> {
        self.executed.borrow_mut().push(sql.to_string());
        Ok(())
    }

    fn compile_statement(&self, sql: &str) -> Result<Box<dyn DatabaseStatement + '_>> {
        Ok(Box::new(MemoryStatement {
            db: self,
            sql: sql.to_string(),
            binds: BTreeMap::new(),
        }))
    }

    fn raw_query(&self, sql: &str, _args: &[String]) -> Result<Box<dyn FlowCursor + '_>> {
        self.queries.borrow_mut().push(sql.to_string());
        let cursor = self.results.borrow_mut().pop_front().unwrap_or_default();
        Ok(Box::new(cursor))
    }

    fn insert_with_on_conflict(
        &self,
        table: &str,
        values: &ContentValues,
        _conflict: ConflictAction,
    ) -> Result<i64> {
        let keys: Vec<&str> = values.keys().collect();
        self.executed
            .borrow_mut()
            .push(format!("insert {table} {}", keys.join(",")));
        let id = self.next_insert_id.get();
        self.next_insert_id.set(id + 1);
        Ok(id)
    }

    fn update_with_on_conflict(
        &self,
        table: &str,
        _values: &ContentValues,
        where_clause: &str,
        _where_args: &[String],
        _conflict: ConflictAction,
    ) -> Result<u64> {
        self.executed
            .borrow_mut()
            .push(format!("update {table} {where_clause}"));
        Ok(self.affected_rows.get())
    }

    fn delete(&self, table: &str, where_clause: &str, _where_args: &[String]) -> Result<u64> {
        self.executed
            .borrow_mut()
            .push(format!("delete {table} {where_clause}"));
        Ok(self.affected_rows.get())
    }

    fn begin_transaction(&self) -> Result<()> {
        self.executed.borrow_mut().push("BEGIN".to_string());
        Ok(())
    }

    fn set_transaction_successful(&self) -> Result<()> {
        self.executed.borrow_mut().push("SUCCESSFUL".to_string());
        Ok(())
    }

    fn end_transaction(&self) -> Result<()> {
        self.executed.borrow_mut().push("END".to_string());
        Ok(())
    }

    fn version(&self) -> u32 {
        self.version.get()
    }
}
