//! Names with optional table qualifier and `AS` alias.

use dbflow_core::{quote_ident, strip_quotes};

use crate::builder::Query;

/// A column or table name as it appears in a query.
///
/// Renders as `` `table`.`name` AS `alias` ``, omitting the parts that are
/// not set. Raw names are emitted verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NameAlias {
    name: String,
    alias: Option<String>,
    table: Option<String>,
    quote: bool,
}

impl NameAlias {
    /// A quoted name. Existing backticks are stripped first.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self {
            name: strip_quotes(name.as_ref()).to_string(),
            alias: None,
            table: None,
            quote: true,
        }
    }

    /// A name emitted exactly as given, e.g. an expression.
    pub fn raw(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
            table: None,
            quote: false,
        }
    }

    /// Add an `AS` alias.
    #[must_use]
    pub fn alias(mut self, alias: impl AsRef<str>) -> Self {
        self.alias = Some(strip_quotes(alias.as_ref()).to_string());
        self
    }

    /// Qualify with a table name.
    #[must_use]
    pub fn with_table(mut self, table: impl AsRef<str>) -> Self {
        self.table = Some(strip_quotes(table.as_ref()).to_string());
        self
    }

    /// Unquoted name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn alias_name(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    #[must_use]
    pub fn table_name(&self) -> Option<&str> {
        self.table.as_deref()
    }

    /// The name as it should appear in a key position: qualified and
    /// quoted, without the alias.
    #[must_use]
    pub fn name_as_key(&self) -> String {
        let name = if self.quote {
            quote_ident(&self.name)
        } else {
            self.name.clone()
        };
        match &self.table {
            Some(table) => format!("{}.{name}", quote_ident(table)),
            None => name,
        }
    }
}

impl Query for NameAlias {
    fn query(&self) -> String {
        let mut out = self.name_as_key();
        if let Some(alias) = &self.alias {
            out.push_str(" AS ");
            out.push_str(&quote_ident(alias));
        }
        out
    }
}

impl From<&str> for NameAlias {
    fn from(name: &str) -> Self {
        NameAlias::new(name)
    }
}

impl From<String> for NameAlias {
    fn from(name: String) -> Self {
        NameAlias::new(name)
    }
}

impl From<&String> for NameAlias {
    fn from(name: &String) -> Self {
        NameAlias::new(name)
    }
}
