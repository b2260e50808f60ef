//! Aggregate and scalar SQL functions usable as projections or condition
//! left-hand sides.

use dbflow_core::{StoragePrimitive, quote_ident};

use crate::alias::NameAlias;
use crate::builder::{Query, QueryBuilder};
use crate::condition::Operator;

/// A function call such as `COUNT(*)` or `CAST(`x` AS TEXT)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Method {
    name: &'static str,
    args: Vec<String>,
    cast: Option<StoragePrimitive>,
    alias: Option<String>,
}

impl Method {
    fn new<I, T>(name: &'static str, args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<NameAlias>,
    {
        Self {
            name,
            args: args.into_iter().map(|a| a.into().query()).collect(),
            cast: None,
            alias: None,
        }
    }

    /// `COUNT(*)` when `columns` is empty.
    pub fn count<I, T>(columns: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<NameAlias>,
    {
        Self::new("COUNT", columns)
    }

    pub fn avg(column: impl Into<NameAlias>) -> Self {
        Self::new("AVG", [column])
    }

    pub fn sum(column: impl Into<NameAlias>) -> Self {
        Self::new("SUM", [column])
    }

    pub fn total(column: impl Into<NameAlias>) -> Self {
        Self::new("TOTAL", [column])
    }

    pub fn min(column: impl Into<NameAlias>) -> Self {
        Self::new("MIN", [column])
    }

    pub fn max(column: impl Into<NameAlias>) -> Self {
        Self::new("MAX", [column])
    }

    pub fn group_concat(column: impl Into<NameAlias>) -> Self {
        Self::new("GROUP_CONCAT", [column])
    }

    /// `CAST(<column> AS <type>)`.
    pub fn cast(column: impl Into<NameAlias>, to: StoragePrimitive) -> Self {
        Self {
            cast: Some(to),
            ..Self::new("CAST", [column])
        }
    }

    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Start a condition on this method's result.
    #[must_use]
    pub fn op(&self) -> Operator {
        Operator::expression(self)
    }
}

impl Query for Method {
    fn query(&self) -> String {
        let mut qb = QueryBuilder::with(self.name);
        qb.append('(');
        if self.args.is_empty() {
            qb.append('*');
        } else {
            qb.append_array(&self.args);
        }
        if let Some(to) = self.cast {
            qb.append(" AS ").append(to.sql_name());
        }
        qb.append(')');
        if let Some(alias) = &self.alias {
            qb.append(" AS ").append(quote_ident(alias));
        }
        qb.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count() {
        assert_eq!(Method::count(Vec::<&str>::new()).query(), "COUNT(*)");
        assert_eq!(Method::count(["id"]).alias("c").query(), "COUNT(`id`) AS `c`");
    }

    #[test]
    fn test_aggregates() {
        assert_eq!(Method::avg("age").query(), "AVG(`age`)");
        assert_eq!(Method::sum("age").query(), "SUM(`age`)");
        assert_eq!(Method::total("age").query(), "TOTAL(`age`)");
        assert_eq!(Method::min("age").query(), "MIN(`age`)");
        assert_eq!(Method::max("age").query(), "MAX(`age`)");
        assert_eq!(Method::group_concat("name").query(), "GROUP_CONCAT(`name`)");
    }

    #[test]
    fn test_cast() {
        assert_eq!(
            Method::cast("age", StoragePrimitive::Text).query(),
            "CAST(`age` AS TEXT)"
        );
    }

    #[test]
    fn test_method_condition() {
        assert_eq!(Method::max("age").op().gt(30).query(), "MAX(`age`)>30");
    }
}
