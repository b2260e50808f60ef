//! SELECT projections.

use crate::alias::NameAlias;
use crate::builder::{Query, QueryBuilder};
use crate::clause::{From, FromBase};
use crate::method::Method;

/// `SELECT [DISTINCT ]<projection>`; call [`Select::from`] to continue.
///
/// # Example
///
/// ```ignore
/// let query = Select::new()
///     .columns(["name"])
///     .from("TestModel1")
///     .filter(Operator::column("name").eq("test"));
/// assert_eq!(query.query(), "SELECT `name` FROM `TestModel1` WHERE `name`='test'");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Select {
    distinct: bool,
    projection: Vec<String>,
}

impl Select {
    /// `SELECT *`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `SELECT COUNT(*)`.
    #[must_use]
    pub fn count_of() -> Self {
        Self::new().method(&Method::count(Vec::<NameAlias>::new()))
    }

    #[must_use]
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    #[must_use]
    pub fn column(mut self, column: impl Into<NameAlias>) -> Self {
        self.projection.push(column.into().query());
        self
    }

    #[must_use]
    pub fn columns<I, T>(self, columns: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<NameAlias>,
    {
        columns.into_iter().fold(self, Self::column)
    }

    /// Project a function call.
    #[must_use]
    pub fn method(mut self, method: &Method) -> Self {
        self.projection.push(method.query());
        self
    }

    pub fn from(self, table: impl Into<NameAlias>) -> From {
        From::new(FromBase::Select(self), table)
    }
}

impl Query for Select {
    fn query(&self) -> String {
        let mut qb = QueryBuilder::with("SELECT ");
        if self.distinct {
            qb.append("DISTINCT ");
        }
        if self.projection.is_empty() {
            qb.append('*');
        } else {
            qb.append_array(&self.projection);
        }
        qb.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::Operator;

    #[test]
    fn test_select_one_column_with_condition() {
        let query = Select::new()
            .columns(["name"])
            .from("TestModel1")
            .filter(Operator::column("name").eq("test"));
        assert_eq!(
            query.query(),
            "SELECT `name` FROM `TestModel1` WHERE `name`='test'"
        );
    }

    #[test]
    fn test_select_distinct_star() {
        let query = Select::new().distinct().from("TestModel3");
        assert_eq!(query.query(), "SELECT DISTINCT * FROM `TestModel3`");
    }

    #[test]
    fn test_select_methods() {
        assert_eq!(Select::count_of().query(), "SELECT COUNT(*)");
        let query = Select::new()
            .column(NameAlias::new("name").alias("n"))
            .method(&Method::max("age"));
        assert_eq!(query.query(), "SELECT `name` AS `n`, MAX(`age`)");
    }
}
