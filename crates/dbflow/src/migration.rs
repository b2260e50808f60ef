//! Schema migrations run by [`crate::DatabaseDefinition`] on create and upgrade.
//!
//! A migration is registered for one database version with a priority;
//! within a version, lower priorities run first.

use dbflow_core::{DatabaseWrapper, Error, Result, StoragePrimitive, quote_ident};
use dbflow_query::{Condition, ConditionGroup, Index, Query, Update};

/// One unit of schema or data change.
pub trait Migration: Send + Sync {
    /// Called before [`Migration::migrate`].
    fn on_pre_migrate(&self) {}

    fn migrate(&self, db: &dyn DatabaseWrapper) -> Result<()>;

    /// Called after [`Migration::migrate`] succeeded.
    fn on_post_migrate(&self) {}
}

impl<F> Migration for F
where
    F: Fn(&dyn DatabaseWrapper) -> Result<()> + Send + Sync,
{
    fn migrate(&self, db: &dyn DatabaseWrapper) -> Result<()> {
        self(db)
    }
}

// ==================== ALTER TABLE ====================

#[derive(Debug, Clone, PartialEq, Eq)]
struct AddedColumn {
    name: String,
    definition: String,
}

/// Renames a table and/or adds columns to it.
///
/// Columns already present in the table are skipped, so the migration can
/// run against a table created from the current schema.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlterTableMigration {
    table: String,
    rename_from: Option<String>,
    columns: Vec<AddedColumn>,
}

impl AlterTableMigration {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }

    /// Rename `old_name` to this migration's table first.
    #[must_use]
    pub fn rename_from(mut self, old_name: impl Into<String>) -> Self {
        self.rename_from = Some(old_name.into());
        self
    }

    #[must_use]
    pub fn add_column(mut self, storage: StoragePrimitive, name: impl Into<String>) -> Self {
        let name = name.into();
        self.columns.push(AddedColumn {
            definition: format!("{} {}", quote_ident(&name), storage.sql_name()),
            name,
        });
        self
    }

    /// Add a column that references another table.
    #[must_use]
    pub fn add_foreign_key_column(
        mut self,
        storage: StoragePrimitive,
        name: impl Into<String>,
        references: &str,
    ) -> Self {
        let name = name.into();
        self.columns.push(AddedColumn {
            definition: format!(
                "{} {} REFERENCES {}",
                quote_ident(&name),
                storage.sql_name(),
                quote_ident(references)
            ),
            name,
        });
        self
    }

    #[must_use]
    pub fn rename_query(&self) -> Option<String> {
        self.rename_from.as_ref().map(|old| {
            format!(
                "ALTER TABLE {} RENAME TO {}",
                quote_ident(old),
                quote_ident(&self.table)
            )
        })
    }

    /// One `ADD COLUMN` statement per added column.
    #[must_use]
    pub fn column_queries(&self) -> Vec<String> {
        self.columns
            .iter()
            .map(|column| {
                format!(
                    "ALTER TABLE {} ADD COLUMN {}",
                    quote_ident(&self.table),
                    column.definition
                )
            })
            .collect()
    }
}

impl Migration for AlterTableMigration {
    fn migrate(&self, db: &dyn DatabaseWrapper) -> Result<()> {
        if let Some(sql) = self.rename_query() {
            tracing::debug!(sql = %sql, "Renaming table");
            db.exec_sql(&sql)?;
        }
        if self.columns.is_empty() {
            return Ok(());
        }

        let existing = {
            let probe = format!("SELECT * FROM {} LIMIT 0", quote_ident(&self.table));
            let cursor = db.raw_query(&probe, &[])?;
            self.columns
                .iter()
                .map(|column| cursor.column_index(&column.name).is_some())
                .collect::<Vec<_>>()
        };
        for (query, present) in self.column_queries().into_iter().zip(existing) {
            if present {
                tracing::debug!(table = %self.table, sql = %query, "Column already present");
                continue;
            }
            tracing::debug!(sql = %query, "Adding column");
            db.exec_sql(&query)?;
        }
        Ok(())
    }
}

// ==================== INDEX ====================

/// Creates an index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexMigration {
    name: String,
    table: String,
    unique: bool,
    columns: Vec<String>,
}

impl IndexMigration {
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            unique: false,
            columns: Vec::new(),
        }
    }

    #[must_use]
    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    #[must_use]
    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.columns.push(column.into());
        self
    }

    #[must_use]
    pub fn index(&self) -> Index {
        Index::new(self.name.as_str())
            .unique(self.unique)
            .on(self.table.as_str(), self.columns.iter().map(String::as_str))
    }
}

impl Migration for IndexMigration {
    fn migrate(&self, db: &dyn DatabaseWrapper) -> Result<()> {
        if self.columns.is_empty() {
            return Err(Error::InvalidQuery(format!(
                "index `{}` has no columns",
                self.name
            )));
        }
        self.index().enable(db)
    }
}

// ==================== UPDATE ====================

/// Rewrites data with an `UPDATE ... SET ... [WHERE ...]`.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateTableMigration {
    table: String,
    assignments: ConditionGroup,
    conditions: ConditionGroup,
}

impl UpdateTableMigration {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            assignments: ConditionGroup::comma_separated(),
            conditions: ConditionGroup::clause(),
        }
    }

    #[must_use]
    pub fn set(mut self, assignment: impl Into<Condition>) -> Self {
        self.assignments = self.assignments.and(assignment);
        self
    }

    #[must_use]
    pub fn filter(mut self, condition: impl Into<Condition>) -> Self {
        self.conditions = self.conditions.and(condition);
        self
    }

    /// The statement this migration runs.
    pub fn query(&self) -> Result<String> {
        if self.assignments.is_empty() {
            return Err(Error::InvalidQuery(format!(
                "update migration for `{}` has no assignments",
                self.table
            )));
        }
        let set = Update::table(self.table.as_str()).set_group(self.assignments.clone());
        if self.conditions.is_empty() {
            Ok(set.query())
        } else {
            Ok(set.filter_group(self.conditions.clone()).query())
        }
    }
}

impl Migration for UpdateTableMigration {
    fn migrate(&self, db: &dyn DatabaseWrapper) -> Result<()> {
        let sql = self.query()?;
        tracing::debug!(sql = %sql, "Running update migration");
        db.exec_sql(&sql)
    }
}
