//! Model persistence through the registered adapters.

use dbflow_core::{DatabaseWrapper, Model, Result};
use dbflow_query::{From, Select, Where, saver};

use crate::registry::adapter_for;

/// Save, insert, update, delete and reload a registered model.
///
/// Implemented for every [`Model`]; calls fail with
/// [`dbflow_core::Error::NotRegistered`] until the model's database is
/// registered.
pub trait ModelPersistence: Model + Sized + 'static {
    /// Update the row if it exists, insert it otherwise.
    fn save(&mut self, db: &dyn DatabaseWrapper) -> Result<bool> {
        let adapter = adapter_for::<Self>()?;
        saver::save(adapter.as_ref(), self, db)
    }

    /// Insert the row; returns the engine-assigned row id.
    fn insert(&mut self, db: &dyn DatabaseWrapper) -> Result<i64> {
        let adapter = adapter_for::<Self>()?;
        saver::insert(adapter.as_ref(), self, db)
    }

    /// Update by primary key. `false` when no row matched.
    fn update(&self, db: &dyn DatabaseWrapper) -> Result<bool> {
        let adapter = adapter_for::<Self>()?;
        saver::update(adapter.as_ref(), self, db)
    }

    fn delete(&mut self, db: &dyn DatabaseWrapper) -> Result<bool> {
        let adapter = adapter_for::<Self>()?;
        saver::delete(adapter.as_ref(), self, db)
    }

    fn exists(&self, db: &dyn DatabaseWrapper) -> Result<bool> {
        let adapter = adapter_for::<Self>()?;
        adapter.exists(self, db)
    }

    /// Reload every column from the row with this model's primary key.
    /// Returns `false`, leaving the model untouched, when there is no row.
    fn load(&mut self, db: &dyn DatabaseWrapper) -> Result<bool> {
        let adapter = adapter_for::<Self>()?;
        let query = Select::new()
            .from(adapter.table_name())
            .filter_group(adapter.primary_condition(self)?)
            .limit(1);
        let mut cursor = query.cursor(db)?;
        if !cursor.move_to_first() {
            return Ok(false);
        }
        adapter.load_from_cursor(cursor.as_ref(), self, db)?;
        Ok(true)
    }
}

impl<M: Model + 'static> ModelPersistence for M {}

/// `SELECT * FROM` the table of `M`.
pub fn select_from<M: Model + 'static>() -> Result<From> {
    let adapter = adapter_for::<M>()?;
    Ok(Select::new().from(adapter.table_name()))
}

/// Load every row of a SELECT into models of type `M`.
pub fn query_list<M: Model + 'static>(query: &Where, db: &dyn DatabaseWrapper) -> Result<Vec<M>> {
    let adapter = adapter_for::<M>()?;
    query.query_list(db, adapter.as_ref())
}

/// Load the first row of a SELECT, if any.
pub fn query_single<M: Model + 'static>(query: &Where, db: &dyn DatabaseWrapper) -> Result<Option<M>> {
    let adapter = adapter_for::<M>()?;
    query.query_single(db, adapter.as_ref())
}
