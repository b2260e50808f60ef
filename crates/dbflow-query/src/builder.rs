//! The SQL text accumulator and the INSERT, UPDATE and DELETE statements.
//!
//! Every statement in this crate renders through [`QueryBuilder`], so the
//! spacing rules live in one place:
//! - [`QueryBuilder::append_qualifier`] is a no-op for an empty value and
//!   inserts a single separating space only when one is needed
//! - column lists join with `", "`, value lists with `","`
//! - nothing ever emits a trailing space

use std::fmt;

use dbflow_core::{ConflictAction, ContentValues, DatabaseWrapper, Result, Value, quote_ident};

use crate::alias::NameAlias;
use crate::clause::{From, FromBase, Where, WhereBase};
use crate::condition::{Condition, ConditionGroup};
use crate::select::Select;

/// Anything that renders to SQL text.
pub trait Query {
    /// The SQL text of this query or fragment.
    fn query(&self) -> String;
}

impl Query for String {
    fn query(&self) -> String {
        self.clone()
    }
}

impl Query for &str {
    fn query(&self) -> String {
        (*self).to_string()
    }
}

/// Chainable SQL text accumulator.
///
/// # Example
///
/// ```ignore
/// let mut qb = QueryBuilder::new();
/// qb.append("SELECT * FROM ").append_quoted("Hero");
/// qb.append_qualifier("WHERE", "`age`>3");
/// assert_eq!(qb.to_string(), "SELECT * FROM `Hero` WHERE `age`>3");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryBuilder {
    sql: String,
}

impl QueryBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from existing text.
    pub fn with(sql: impl Into<String>) -> Self {
        Self { sql: sql.into() }
    }

    pub fn append(&mut self, fragment: impl fmt::Display) -> &mut Self {
        use fmt::Write;
        // Writing into a String cannot fail.
        let _ = write!(self.sql, "{fragment}");
        self
    }

    /// Append an identifier, backtick-quoted.
    pub fn append_quoted(&mut self, name: &str) -> &mut Self {
        self.sql.push_str(&quote_ident(name));
        self
    }

    pub fn append_space(&mut self) -> &mut Self {
        self.sql.push(' ');
        self
    }

    /// Append ` fragment ` with a space on each side.
    pub fn append_space_separated(&mut self, fragment: impl fmt::Display) -> &mut Self {
        self.append_space().append(fragment).append_space()
    }

    pub fn append_parenthesis_enclosed(&mut self, fragment: impl fmt::Display) -> &mut Self {
        self.append('(').append(fragment).append(')')
    }

    /// Append `KEYWORD value`, or nothing when `value` is empty.
    pub fn append_qualifier(&mut self, keyword: &str, value: &str) -> &mut Self {
        if value.is_empty() {
            return self;
        }
        self.separate();
        self.sql.push_str(keyword);
        self.sql.push(' ');
        self.sql.push_str(value);
        self
    }

    /// Append `fragment` separated by one space, or nothing when it is empty.
    pub fn append_not_empty(&mut self, fragment: &str) -> &mut Self {
        if fragment.is_empty() {
            return self;
        }
        self.separate();
        self.sql.push_str(fragment);
        self
    }

    /// Append items joined with `", "`.
    pub fn append_array<I, T>(&mut self, items: I) -> &mut Self
    where
        I: IntoIterator<Item = T>,
        T: fmt::Display,
    {
        self.append_joined(", ", items)
    }

    /// Append identifiers, quoted and joined with `", "`.
    pub fn append_quoted_array<I, T>(&mut self, names: I) -> &mut Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        self.append_array(names.into_iter().map(|n| quote_ident(n.as_ref())))
    }

    /// Append items joined with `separator`.
    pub fn append_joined<I, T>(&mut self, separator: &str, items: I) -> &mut Self
    where
        I: IntoIterator<Item = T>,
        T: fmt::Display,
    {
        for (i, item) in items.into_iter().enumerate() {
            if i > 0 {
                self.sql.push_str(separator);
            }
            self.append(item);
        }
        self
    }

    /// Append a value as an escaped SQL literal.
    pub fn append_sql_literal(&mut self, value: &Value) -> &mut Self {
        self.sql.push_str(&value.to_sql_literal());
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.sql
    }

    /// Consume the builder, returning the SQL text.
    #[must_use]
    pub fn build(self) -> String {
        self.sql
    }

    fn separate(&mut self) {
        if !self.sql.is_empty() && !self.sql.ends_with(' ') {
            self.sql.push(' ');
        }
    }
}

impl fmt::Display for QueryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

impl Query for QueryBuilder {
    fn query(&self) -> String {
        self.sql.clone()
    }
}

fn append_conflict(qb: &mut QueryBuilder, conflict: ConflictAction) {
    if let Some(keyword) = conflict.as_sql() {
        qb.append("OR ").append(keyword).append_space();
    }
}

// ==================== INSERT ====================

/// Source of the inserted rows.
#[derive(Debug, Clone, PartialEq)]
enum InsertSource {
    Values(Vec<Vec<Value>>),
    /// One `?` per column, for prepared statements.
    Placeholders,
    Select(String),
}

/// `INSERT [OR <conflict>] INTO <table>(<columns>) VALUES(...)` or `... SELECT ...`.
///
/// # Example
///
/// ```ignore
/// let insert = Insert::into("InsertModel")
///     .or(ConflictAction::Fail)
///     .columns(["name", "value"])
///     .values(["Test", "Test1"]);
/// assert_eq!(
///     insert.query(),
///     "INSERT OR FAIL INTO `InsertModel`(`name`, `value`) VALUES('Test','Test1')"
/// );
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    table: NameAlias,
    conflict: ConflictAction,
    columns: Vec<String>,
    source: InsertSource,
}

impl Insert {
    /// Insert into `table`.
    pub fn into(table: impl Into<NameAlias>) -> Self {
        Self {
            table: table.into(),
            conflict: ConflictAction::None,
            columns: Vec::new(),
            source: InsertSource::Values(Vec::new()),
        }
    }

    /// Conflict action emitted right after `INSERT`.
    #[must_use]
    pub fn or(mut self, conflict: ConflictAction) -> Self {
        self.conflict = conflict;
        self
    }

    #[must_use]
    pub fn or_replace(self) -> Self {
        self.or(ConflictAction::Replace)
    }

    #[must_use]
    pub fn or_rollback(self) -> Self {
        self.or(ConflictAction::Rollback)
    }

    #[must_use]
    pub fn or_abort(self) -> Self {
        self.or(ConflictAction::Abort)
    }

    #[must_use]
    pub fn or_fail(self) -> Self {
        self.or(ConflictAction::Fail)
    }

    #[must_use]
    pub fn or_ignore(self) -> Self {
        self.or(ConflictAction::Ignore)
    }

    /// Column list; names are quoted when rendered.
    #[must_use]
    pub fn columns<I, T>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Add one row of values. Repeated calls insert multiple rows.
    #[must_use]
    pub fn values<I, T>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        let row = values.into_iter().map(Into::into).collect();
        match &mut self.source {
            InsertSource::Values(rows) => rows.push(row),
            InsertSource::Placeholders | InsertSource::Select(_) => {
                self.source = InsertSource::Values(vec![row]);
            }
        }
        self
    }

    /// One row of `?` placeholders, one per column.
    #[must_use]
    pub fn placeholders(mut self) -> Self {
        self.source = InsertSource::Placeholders;
        self
    }

    /// Columns and one row of values from `(column, value)` pairs.
    #[must_use]
    pub fn column_values<I, C, V>(self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (C, V)>,
        C: Into<String>,
        V: Into<Value>,
    {
        let (columns, values): (Vec<String>, Vec<Value>) = pairs
            .into_iter()
            .map(|(c, v)| (c.into(), v.into()))
            .unzip();
        Self {
            source: InsertSource::Values(Vec::new()),
            ..self
        }
        .columns(columns)
        .values(values)
    }

    /// Columns and one row of values from a content map.
    #[must_use]
    pub fn content_values(self, values: &ContentValues) -> Self {
        self.column_values(values.iter().map(|(k, v)| (k.to_string(), v.clone())))
    }

    /// Insert the rows produced by a SELECT.
    #[must_use]
    pub fn select(mut self, query: &dyn Query) -> Self {
        self.source = InsertSource::Select(query.query());
        self
    }

    /// Run the insert.
    pub fn execute(&self, db: &dyn DatabaseWrapper) -> Result<i64> {
        let sql = self.query();
        tracing::debug!(sql = %sql, "Executing insert");
        let mut statement = db.compile_statement(&sql)?;
        statement.execute_insert()
    }
}

impl Query for Insert {
    fn query(&self) -> String {
        let mut qb = QueryBuilder::with("INSERT ");
        append_conflict(&mut qb, self.conflict);
        qb.append("INTO ").append(self.table.query());
        if !self.columns.is_empty() {
            qb.append('(').append_quoted_array(&self.columns).append(')');
        }
        match &self.source {
            InsertSource::Values(rows) => {
                if !rows.is_empty() {
                    qb.append(" VALUES");
                    let rendered = rows.iter().map(|row| {
                        let literals: Vec<String> = row.iter().map(Value::to_sql_literal).collect();
                        format!("({})", literals.join(","))
                    });
                    qb.append_joined(",", rendered);
                }
            }
            InsertSource::Placeholders => {
                qb.append(" VALUES(")
                    .append_joined(",", self.columns.iter().map(|_| "?"))
                    .append(')');
            }
            InsertSource::Select(select) => {
                qb.append_not_empty(select);
            }
        }
        qb.build()
    }
}

// ==================== UPDATE ====================

/// `UPDATE [OR <conflict>] <table>`; call [`Update::set`] to continue.
///
/// # Example
///
/// ```ignore
/// let update = Update::table("TestModel1")
///     .set(Operator::column("name").eq("newvalue"))
///     .filter(Operator::column("name").eq("oldvalue"));
/// assert_eq!(
///     update.query(),
///     "UPDATE `TestModel1` SET `name`='newvalue' WHERE `name`='oldvalue'"
/// );
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    table: NameAlias,
    conflict: ConflictAction,
}

impl Update {
    pub fn table(table: impl Into<NameAlias>) -> Self {
        Self {
            table: table.into(),
            conflict: ConflictAction::None,
        }
    }

    #[must_use]
    pub fn or(mut self, conflict: ConflictAction) -> Self {
        self.conflict = conflict;
        self
    }

    #[must_use]
    pub fn or_replace(self) -> Self {
        self.or(ConflictAction::Replace)
    }

    #[must_use]
    pub fn or_rollback(self) -> Self {
        self.or(ConflictAction::Rollback)
    }

    #[must_use]
    pub fn or_abort(self) -> Self {
        self.or(ConflictAction::Abort)
    }

    #[must_use]
    pub fn or_fail(self) -> Self {
        self.or(ConflictAction::Fail)
    }

    #[must_use]
    pub fn or_ignore(self) -> Self {
        self.or(ConflictAction::Ignore)
    }

    /// Start the SET list with one assignment.
    #[must_use]
    pub fn set(self, assignment: impl Into<Condition>) -> Set {
        Set {
            update: self,
            assignments: ConditionGroup::comma_separated().and(assignment),
        }
    }

    /// Start the SET list from a whole group of assignments.
    #[must_use]
    pub fn set_group(self, assignments: ConditionGroup) -> Set {
        Set {
            update: self,
            assignments: assignments.into_comma_separated(),
        }
    }
}

impl Query for Update {
    fn query(&self) -> String {
        let mut qb = QueryBuilder::with("UPDATE ");
        append_conflict(&mut qb, self.conflict);
        qb.append(self.table.query());
        qb.build()
    }
}

/// `UPDATE ... SET a=..,b=..`; call [`Set::filter`] to add a WHERE.
#[derive(Debug, Clone, PartialEq)]
pub struct Set {
    update: Update,
    assignments: ConditionGroup,
}

impl Set {
    /// Add another assignment.
    #[must_use]
    pub fn and(mut self, assignment: impl Into<Condition>) -> Self {
        self.assignments = self.assignments.and(assignment);
        self
    }

    /// Add a WHERE clause.
    #[must_use]
    pub fn filter(self, condition: impl Into<Condition>) -> Where {
        Where::new(WhereBase::Set(self)).and(condition)
    }

    /// Add a WHERE clause from a whole group.
    #[must_use]
    pub fn filter_group(self, conditions: ConditionGroup) -> Where {
        Where::new(WhereBase::Set(self)).and_group(conditions)
    }

    /// Mutable access to the assignments, e.g. to fill `?` placeholders.
    pub fn assignments_mut(&mut self) -> &mut ConditionGroup {
        &mut self.assignments
    }

    /// Run the statement and return affected rows.
    pub fn execute_update_delete(&self, db: &dyn DatabaseWrapper) -> Result<u64> {
        Where::new(WhereBase::Set(self.clone())).execute_update_delete(db)
    }
}

impl Query for Set {
    fn query(&self) -> String {
        let mut qb = QueryBuilder::with(self.update.query());
        qb.append_qualifier("SET", &self.assignments.query());
        qb.build()
    }
}

// ==================== DELETE ====================

/// `DELETE`; call [`Delete::from`] to name the table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delete;

impl Delete {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// `DELETE FROM <table>`.
    pub fn from(self, table: impl Into<NameAlias>) -> From {
        From::new(FromBase::Delete, table)
    }

    /// `DELETE FROM <table> WHERE <conditions>`.
    pub fn table(table: impl Into<NameAlias>, conditions: ConditionGroup) -> Where {
        Delete.from(table).filter_group(conditions)
    }
}

impl Query for Delete {
    fn query(&self) -> String {
        "DELETE".to_string()
    }
}

/// Start a SELECT of `*`.
#[must_use]
pub fn select() -> Select {
    Select::new()
}
