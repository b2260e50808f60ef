//! Model persistence through an adapter: save, insert, update, delete.
//!
//! Every public operation first runs the adapter's one-to-many cascade for
//! that operation, then persists the owning row.

use dbflow_core::{DatabaseWrapper, Result};

use crate::adapter::ModelAdapter;

/// Update the row if it exists, insert it otherwise.
pub fn save<M>(adapter: &dyn ModelAdapter<M>, model: &mut M, db: &dyn DatabaseWrapper) -> Result<bool> {
    adapter.save_relations(model, db)?;
    if adapter.exists(model, db)? && update_row(adapter, model, db)? {
        return Ok(true);
    }
    Ok(insert_row(adapter, model, db)? > 0)
}

/// Insert the row and store the assigned id into the autoincrement key.
pub fn insert<M>(adapter: &dyn ModelAdapter<M>, model: &mut M, db: &dyn DatabaseWrapper) -> Result<i64> {
    adapter.save_relations(model, db)?;
    insert_row(adapter, model, db)
}

/// Update the row by primary key. A zero-row update is logged, not an error.
pub fn update<M>(adapter: &dyn ModelAdapter<M>, model: &M, db: &dyn DatabaseWrapper) -> Result<bool> {
    adapter.save_relations(model, db)?;
    update_row(adapter, model, db)
}

/// Delete the row by primary key and reset the autoincrement key.
pub fn delete<M>(adapter: &dyn ModelAdapter<M>, model: &mut M, db: &dyn DatabaseWrapper) -> Result<bool> {
    adapter.delete_relations(model, db)?;
    let sql = adapter.delete_statement_query();
    tracing::debug!(table = adapter.table_name(), sql = %sql, "Deleting model");
    let affected = {
        let mut statement = db.compile_statement(&sql)?;
        adapter.bind_to_delete_statement(statement.as_mut(), model)?;
        statement.execute_update_delete()?
    };
    if affected > 0 {
        adapter.update_auto_increment(model, 0)?;
    }
    Ok(affected > 0)
}

fn insert_row<M>(adapter: &dyn ModelAdapter<M>, model: &mut M, db: &dyn DatabaseWrapper) -> Result<i64> {
    let sql = adapter.insert_statement_query();
    tracing::debug!(table = adapter.table_name(), sql = %sql, "Inserting model");
    let id = {
        let mut statement = db.compile_statement(&sql)?;
        adapter.bind_to_insert_statement(statement.as_mut(), model)?;
        statement.execute_insert()?
    };
    if id > 0 {
        adapter.update_auto_increment(model, id)?;
    }
    Ok(id)
}

fn update_row<M>(adapter: &dyn ModelAdapter<M>, model: &M, db: &dyn DatabaseWrapper) -> Result<bool> {
    let sql = adapter.update_statement_query();
    tracing::debug!(table = adapter.table_name(), sql = %sql, "Updating model");
    let mut statement = db.compile_statement(&sql)?;
    adapter.bind_to_update_statement(statement.as_mut(), model)?;
    let affected = statement.execute_update_delete()?;
    if affected == 0 {
        tracing::warn!(table = adapter.table_name(), "Update affected no rows");
    }
    Ok(affected > 0)
}
