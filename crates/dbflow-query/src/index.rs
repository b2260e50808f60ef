//! Index DDL.

use dbflow_core::{DatabaseWrapper, Result, quote_ident};

use crate::alias::NameAlias;
use crate::builder::{Query, QueryBuilder};

/// `CREATE [UNIQUE ]INDEX IF NOT EXISTS <name> ON <table>(<columns>)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Index {
    name: String,
    unique: bool,
    table: Option<NameAlias>,
    columns: Vec<NameAlias>,
}

impl Index {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unique: false,
            table: None,
            columns: Vec::new(),
        }
    }

    #[must_use]
    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    /// Table and indexed columns.
    #[must_use]
    pub fn on<I, T>(mut self, table: impl Into<NameAlias>, columns: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<NameAlias>,
    {
        self.table = Some(table.into());
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn is_unique(&self) -> bool {
        self.unique
    }

    pub fn enable(&self, db: &dyn DatabaseWrapper) -> Result<()> {
        let sql = self.query();
        tracing::debug!(sql = %sql, "Creating index");
        db.exec_sql(&sql)
    }

    pub fn disable(&self, db: &dyn DatabaseWrapper) -> Result<()> {
        let sql = drop_index_query(&self.name);
        tracing::debug!(sql = %sql, "Dropping index");
        db.exec_sql(&sql)
    }
}

impl Query for Index {
    fn query(&self) -> String {
        let mut qb = QueryBuilder::with("CREATE ");
        if self.unique {
            qb.append("UNIQUE ");
        }
        qb.append("INDEX IF NOT EXISTS ").append_quoted(&self.name);
        if let Some(table) = &self.table {
            qb.append(" ON ")
                .append(table.name_as_key())
                .append('(')
                .append_array(self.columns.iter().map(NameAlias::name_as_key))
                .append(')');
        }
        qb.build()
    }
}

/// `DROP INDEX IF EXISTS <name>`.
#[must_use]
pub fn drop_index_query(name: &str) -> String {
    format!("DROP INDEX IF EXISTS {}", quote_ident(name))
}
