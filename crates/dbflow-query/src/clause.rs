//! FROM, JOIN and WHERE, plus query execution.
//!
//! Clauses render in a fixed order: WHERE, GROUP BY, HAVING, ORDER BY,
//! LIMIT, OFFSET. Empty clauses are omitted.

use dbflow_core::{DatabaseWrapper, Error, FlowCursor, Result};

use crate::adapter::ModelAdapter;
use crate::alias::NameAlias;
use crate::builder::{Delete, Query, QueryBuilder, Set};
use crate::condition::{Condition, ConditionGroup};
use crate::order::OrderBy;
use crate::select::Select;

/// Statement a [`From`] continues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FromBase {
    Select(Select),
    Delete,
}

impl Query for FromBase {
    fn query(&self) -> String {
        match self {
            FromBase::Select(select) => select.query(),
            FromBase::Delete => Delete.query(),
        }
    }
}

/// Join flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Left,
    LeftOuter,
    Inner,
    Cross,
}

impl JoinKind {
    const fn as_sql(self) -> &'static str {
        match self {
            JoinKind::Left => "LEFT",
            JoinKind::LeftOuter => "LEFT OUTER",
            JoinKind::Inner => "INNER",
            JoinKind::Cross => "CROSS",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum JoinConstraint {
    None,
    On(ConditionGroup),
    Using(Vec<NameAlias>),
    Natural,
}

/// `[NATURAL ]<kind> JOIN <table>[ ON ...| USING (...)]`.
///
/// At most one of ON, USING and NATURAL applies; the last one set wins.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    kind: JoinKind,
    table: NameAlias,
    constraint: JoinConstraint,
}

impl Join {
    pub fn new(kind: JoinKind, table: impl Into<NameAlias>) -> Self {
        Self {
            kind,
            table: table.into(),
            constraint: JoinConstraint::None,
        }
    }

    pub fn left(table: impl Into<NameAlias>) -> Self {
        Self::new(JoinKind::Left, table)
    }

    pub fn left_outer(table: impl Into<NameAlias>) -> Self {
        Self::new(JoinKind::LeftOuter, table)
    }

    pub fn inner(table: impl Into<NameAlias>) -> Self {
        Self::new(JoinKind::Inner, table)
    }

    pub fn cross(table: impl Into<NameAlias>) -> Self {
        Self::new(JoinKind::Cross, table)
    }

    /// Alias the joined table.
    #[must_use]
    pub fn alias(mut self, alias: &str) -> Self {
        self.table = self.table.alias(alias);
        self
    }

    #[must_use]
    pub fn on(mut self, condition: impl Into<Condition>) -> Self {
        self.constraint = JoinConstraint::On(ConditionGroup::clause().and(condition));
        self
    }

    #[must_use]
    pub fn on_group(mut self, group: ConditionGroup) -> Self {
        self.constraint = JoinConstraint::On(group);
        self
    }

    #[must_use]
    pub fn using<I, T>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<NameAlias>,
    {
        self.constraint = JoinConstraint::Using(columns.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn natural(mut self) -> Self {
        self.constraint = JoinConstraint::Natural;
        self
    }
}

impl Query for Join {
    fn query(&self) -> String {
        let mut qb = QueryBuilder::new();
        if self.constraint == JoinConstraint::Natural {
            qb.append("NATURAL ");
        }
        qb.append(self.kind.as_sql())
            .append(" JOIN ")
            .append(self.table.query());
        match &self.constraint {
            JoinConstraint::On(group) => {
                qb.append_qualifier("ON", &group.query());
            }
            JoinConstraint::Using(columns) => {
                qb.append(" USING (")
                    .append_array(columns.iter().map(NameAlias::name_as_key))
                    .append(')');
            }
            JoinConstraint::None | JoinConstraint::Natural => {}
        }
        qb.build()
    }
}

/// `<SELECT|DELETE> FROM <table>[ AS alias][ joins]`.
#[derive(Debug, Clone, PartialEq)]
pub struct From {
    base: FromBase,
    table: NameAlias,
    joins: Vec<Join>,
}

impl From {
    pub fn new(base: FromBase, table: impl Into<NameAlias>) -> Self {
        Self {
            base,
            table: table.into(),
            joins: Vec::new(),
        }
    }

    /// Alias the table.
    #[must_use]
    pub fn alias(mut self, alias: &str) -> Self {
        self.table = self.table.alias(alias);
        self
    }

    #[must_use]
    pub fn join(mut self, join: Join) -> Self {
        self.joins.push(join);
        self
    }

    #[must_use]
    pub fn table(&self) -> &NameAlias {
        &self.table
    }

    /// Add a WHERE clause starting with `condition`.
    #[must_use]
    pub fn filter(self, condition: impl Into<Condition>) -> Where {
        Where::new(WhereBase::From(self)).and(condition)
    }

    /// Use `group` as the WHERE clause.
    #[must_use]
    pub fn filter_group(self, group: ConditionGroup) -> Where {
        Where::new(WhereBase::From(self)).and_group(group)
    }

    #[must_use]
    pub fn group_by<I, T>(self, columns: I) -> Where
    where
        I: IntoIterator<Item = T>,
        T: Into<NameAlias>,
    {
        self.into_where().group_by(columns)
    }

    #[must_use]
    pub fn order_by(self, order: impl Into<OrderBy>) -> Where {
        self.into_where().order_by(order)
    }

    #[must_use]
    pub fn limit(self, limit: u64) -> Where {
        self.into_where().limit(limit)
    }

    #[must_use]
    pub fn offset(self, offset: u64) -> Where {
        self.into_where().offset(offset)
    }

    /// A WHERE with no conditions, for clause-only queries and execution.
    #[must_use]
    pub fn into_where(self) -> Where {
        Where::new(WhereBase::From(self))
    }
}

impl Query for From {
    fn query(&self) -> String {
        let mut qb = QueryBuilder::with(self.base.query());
        qb.append_qualifier("FROM", &self.table.query());
        for join in &self.joins {
            qb.append_not_empty(&join.query());
        }
        qb.build()
    }
}

/// Statement a [`Where`] continues.
#[derive(Debug, Clone, PartialEq)]
pub enum WhereBase {
    From(From),
    Set(Set),
}

impl WhereBase {
    const fn is_select(&self) -> bool {
        matches!(
            self,
            WhereBase::From(From {
                base: FromBase::Select(_),
                ..
            })
        )
    }
}

impl Query for WhereBase {
    fn query(&self) -> String {
        match self {
            WhereBase::From(from) => from.query(),
            WhereBase::Set(set) => set.query(),
        }
    }
}

/// WHERE and the clauses that follow it.
#[derive(Debug, Clone, PartialEq)]
pub struct Where {
    base: WhereBase,
    group: ConditionGroup,
    group_by: Vec<NameAlias>,
    having: ConditionGroup,
    order_by: Vec<OrderBy>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl Where {
    #[must_use]
    pub fn new(base: WhereBase) -> Self {
        Self {
            base,
            group: ConditionGroup::clause(),
            group_by: Vec::new(),
            having: ConditionGroup::clause(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    #[must_use]
    pub fn and(mut self, condition: impl Into<Condition>) -> Self {
        self.group = self.group.and(condition);
        self
    }

    #[must_use]
    pub fn or(mut self, condition: impl Into<Condition>) -> Self {
        self.group = self.group.or(condition);
        self
    }

    /// Use `group` as the WHERE clause, or AND it (parenthesized) onto
    /// existing conditions.
    #[must_use]
    pub fn and_group(mut self, group: ConditionGroup) -> Self {
        if self.group.is_empty() {
            self.group = group.into_clause();
        } else {
            self.group = self.group.and(group);
        }
        self
    }

    #[must_use]
    pub fn group_by<I, T>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<NameAlias>,
    {
        self.group_by.extend(columns.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn having(mut self, condition: impl Into<Condition>) -> Self {
        self.having = self.having.and(condition);
        self
    }

    #[must_use]
    pub fn order_by(mut self, order: impl Into<OrderBy>) -> Self {
        self.order_by.push(order.into());
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// The WHERE condition group.
    #[must_use]
    pub fn conditions(&self) -> &ConditionGroup {
        &self.group
    }

    /// Fill `?` placeholders in the WHERE clause.
    pub fn replace_empty_params<I, T>(&mut self, values: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: Into<dbflow_core::Value>,
    {
        self.group.replace_empty_params(values)
    }

    fn require_select(&self, operation: &str) -> Result<()> {
        if self.base.is_select() {
            Ok(())
        } else {
            Err(Error::InvalidQuery(format!(
                "{operation} requires a SELECT statement, got `{}`",
                self.query()
            )))
        }
    }

    /// Run a SELECT and return its cursor.
    pub fn cursor<'d>(&self, db: &'d dyn DatabaseWrapper) -> Result<Box<dyn FlowCursor + 'd>> {
        self.require_select("cursor")?;
        let sql = self.query();
        tracing::debug!(sql = %sql, "Executing query");
        db.raw_query(&sql, &[])
    }

    /// Load every row into models.
    pub fn query_list<M>(
        &self,
        db: &dyn DatabaseWrapper,
        adapter: &dyn ModelAdapter<M>,
    ) -> Result<Vec<M>> {
        self.require_select("query_list")?;
        let mut cursor = self.cursor(db)?;
        let mut models = Vec::with_capacity(cursor.count());
        if cursor.move_to_first() {
            loop {
                let mut model = adapter.new_instance();
                adapter.load_from_cursor(cursor.as_ref(), &mut model, db)?;
                models.push(model);
                if !cursor.move_to_next() {
                    break;
                }
            }
        }
        Ok(models)
    }

    /// Load the first row, with `LIMIT 1` applied.
    pub fn query_single<M>(
        &self,
        db: &dyn DatabaseWrapper,
        adapter: &dyn ModelAdapter<M>,
    ) -> Result<Option<M>> {
        self.require_select("query_single")?;
        let limited = self.clone().limit(1);
        let mut cursor = limited.cursor(db)?;
        if !cursor.move_to_first() {
            return Ok(None);
        }
        let mut model = adapter.new_instance();
        adapter.load_from_cursor(cursor.as_ref(), &mut model, db)?;
        Ok(Some(model))
    }

    /// Whether the SELECT returns at least one row.
    pub fn has_data(&self, db: &dyn DatabaseWrapper) -> Result<bool> {
        self.require_select("has_data")?;
        let cursor = self.cursor(db)?;
        Ok(cursor.count() > 0)
    }

    /// Read the first column of the first row as an integer, e.g. for
    /// `SELECT COUNT(*)` queries.
    pub fn long_value(&self, db: &dyn DatabaseWrapper) -> Result<i64> {
        self.require_select("long_value")?;
        let mut cursor = self.cursor(db)?;
        if cursor.move_to_first() && !cursor.is_null(0) {
            Ok(cursor.get_long(0))
        } else {
            Ok(0)
        }
    }

    /// Run a non-SELECT statement.
    pub fn execute(&self, db: &dyn DatabaseWrapper) -> Result<()> {
        let sql = self.query();
        tracing::debug!(sql = %sql, "Executing statement");
        db.exec_sql(&sql)
    }

    /// Run an UPDATE or DELETE and return affected rows.
    pub fn execute_update_delete(&self, db: &dyn DatabaseWrapper) -> Result<u64> {
        let sql = self.query();
        tracing::debug!(sql = %sql, "Executing update/delete");
        let mut statement = db.compile_statement(&sql)?;
        let affected = statement.execute_update_delete()?;
        if affected == 0 && matches!(self.base, WhereBase::Set(_)) {
            tracing::warn!(sql = %sql, "Update affected no rows");
        }
        Ok(affected)
    }
}

impl Query for Where {
    fn query(&self) -> String {
        let mut qb = QueryBuilder::with(self.base.query());
        qb.append_qualifier("WHERE", &self.group.query());
        let group_by: Vec<String> = self.group_by.iter().map(NameAlias::name_as_key).collect();
        qb.append_qualifier("GROUP BY", &group_by.join(", "));
        qb.append_qualifier("HAVING", &self.having.query());
        let order_by: Vec<String> = self.order_by.iter().map(Query::query).collect();
        qb.append_qualifier("ORDER BY", &order_by.join(", "));
        if let Some(limit) = self.limit {
            qb.append_qualifier("LIMIT", &limit.to_string());
        }
        if let Some(offset) = self.offset {
            qb.append_qualifier("OFFSET", &offset.to_string());
        }
        qb.build()
    }
}
