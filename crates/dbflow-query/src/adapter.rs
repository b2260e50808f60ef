//! The per-entity adapter contract.
//!
//! An adapter binds one model type to its table: it reconstructs instances
//! from cursors, binds instances into statements and content maps, and
//! supplies the SQL text for its table. `dbflow-schema` produces adapters
//! from validated table schemas.

use dbflow_core::{
    ConflictAction, ContentValues, DatabaseStatement, DatabaseWrapper, FlowCursor, Result, Value,
};

use crate::condition::ConditionGroup;

/// Maps model type `M` to a table.
///
/// Statement binders use 1-based indexes and bind in the column order of
/// the matching statement query.
pub trait ModelAdapter<M>: Send + Sync {
    /// Unquoted table name.
    fn table_name(&self) -> &str;

    fn new_instance(&self) -> M;

    /// Storage column names in `bind_to_statement` order.
    fn column_names(&self) -> Vec<String>;

    /// Assign every column present in the cursor's current row, then run
    /// load-time relations and the post-load hook.
    fn load_from_cursor(
        &self,
        cursor: &dyn FlowCursor,
        model: &mut M,
        db: &dyn DatabaseWrapper,
    ) -> Result<()>;

    /// Bind every column, autoincrement included.
    fn bind_to_statement(&self, statement: &mut dyn DatabaseStatement, model: &M) -> Result<()>;

    /// Bind for [`ModelAdapter::insert_statement_query`].
    fn bind_to_insert_statement(
        &self,
        statement: &mut dyn DatabaseStatement,
        model: &M,
    ) -> Result<()>;

    /// Bind for [`ModelAdapter::update_statement_query`]: SET columns, then
    /// primary keys.
    fn bind_to_update_statement(
        &self,
        statement: &mut dyn DatabaseStatement,
        model: &M,
    ) -> Result<()>;

    /// Bind for [`ModelAdapter::delete_statement_query`]: primary keys.
    fn bind_to_delete_statement(
        &self,
        statement: &mut dyn DatabaseStatement,
        model: &M,
    ) -> Result<()>;

    /// Put every non-autoincrement column into `values`, keyed by quoted
    /// column name.
    fn bind_to_content_values(&self, values: &mut ContentValues, model: &M) -> Result<()>;

    /// Whether the instance's row exists in storage.
    fn exists(&self, model: &M, db: &dyn DatabaseWrapper) -> Result<bool>;

    /// Primary-key equality conditions for the instance.
    fn primary_condition(&self, model: &M) -> Result<ConditionGroup>;

    fn insert_statement_query(&self) -> String;

    fn update_statement_query(&self) -> String;

    fn delete_statement_query(&self) -> String;

    /// `CREATE TABLE` (or `CREATE VIEW`) DDL.
    fn creation_query(&self) -> String;

    fn insert_on_conflict_action(&self) -> ConflictAction;

    fn update_on_conflict_action(&self) -> ConflictAction;

    /// Whether instances can be cached by a single primary key.
    fn has_caching_id(&self) -> bool {
        false
    }

    fn caching_column_name(&self) -> Option<&str> {
        None
    }

    fn caching_id(&self, model: &M) -> Result<Option<Value>> {
        let _ = model;
        Ok(None)
    }

    /// Current value of the autoincrement key, if the table has one.
    fn auto_increment_id(&self, model: &M) -> Result<Option<i64>> {
        let _ = model;
        Ok(None)
    }

    /// Store a storage-assigned id into the autoincrement key.
    fn update_auto_increment(&self, model: &mut M, id: i64) -> Result<()> {
        let _ = (model, id);
        Ok(())
    }

    /// Persist one-to-many relations tagged for saving, before the owner.
    fn save_relations(&self, model: &M, db: &dyn DatabaseWrapper) -> Result<()> {
        let _ = (model, db);
        Ok(())
    }

    /// Delete one-to-many relations tagged for deletion, before the owner.
    fn delete_relations(&self, model: &M, db: &dyn DatabaseWrapper) -> Result<()> {
        let _ = (model, db);
        Ok(())
    }
}
