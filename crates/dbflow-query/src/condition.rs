//! Condition trees: operator leaves and AND/OR groups.
//!
//! A leaf renders as `<column><operation><value>[ COLLATE X]`. Values are
//! converted to storage form when the leaf is built and escaped into SQL
//! literals when it is rendered; raw operands skip both.
//!
//! Separators belong to the node that precedes them and are only emitted
//! between nodes.

use std::any::Any;

use dbflow_core::{
    Blob, Collate, Error, Result, SqlEnum, Value, convert_to_db,
};

use crate::alias::NameAlias;
use crate::builder::{Query, QueryBuilder};

/// Right-hand side of an operator.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// A storage value, rendered as an escaped literal.
    Value(Value),
    /// Text inserted verbatim.
    Raw(String),
    /// Another column, for column-to-column comparisons.
    Column(NameAlias),
    /// A rendered subquery, wrapped in parentheses.
    Query(String),
    /// An empty `?` parameter, filled later by
    /// [`ConditionGroup::replace_empty_params`].
    Param,
}

impl Operand {
    /// Convert a value through the converter registered for its type.
    pub fn converted<T: Any>(value: &T) -> Result<Self> {
        convert_to_db(value).map(Operand::Value)
    }

    /// An enum, by its stored name.
    pub fn enum_name<E: SqlEnum>(value: &E) -> Self {
        Operand::Value(Value::Text(value.sql_name().to_string()))
    }

    /// A subquery.
    pub fn query(query: &dyn Query) -> Self {
        Operand::Query(query.query())
    }

    pub fn raw(sql: impl Into<String>) -> Self {
        Operand::Raw(sql.into())
    }

    fn render(&self) -> String {
        match self {
            Operand::Value(value) => value.to_sql_literal(),
            Operand::Raw(sql) => sql.clone(),
            Operand::Column(name) => name.query(),
            Operand::Query(sql) => format!("({sql})"),
            Operand::Param => "?".to_string(),
        }
    }

    const fn is_param(&self) -> bool {
        matches!(self, Operand::Param)
    }

    const fn is_bound(&self) -> bool {
        matches!(self, Operand::Value(_))
    }
}

macro_rules! operand_from_value {
    ($($t:ty),* $(,)?) => {
        $(impl From<$t> for Operand {
            fn from(v: $t) -> Self {
                Operand::Value(Value::from(v))
            }
        })*
    };
}

operand_from_value!(i8, i16, i32, i64, u8, u16, u32, f32, f64, &str, String, Vec<u8>, Blob);

impl From<Value> for Operand {
    fn from(v: Value) -> Self {
        Operand::Value(v)
    }
}

impl From<bool> for Operand {
    fn from(v: bool) -> Self {
        Operand::Value(convert_to_db(&v).unwrap_or(Value::Integer(i64::from(v))))
    }
}

impl From<char> for Operand {
    fn from(v: char) -> Self {
        Operand::Value(convert_to_db(&v).unwrap_or_else(|_| Value::Text(v.to_string())))
    }
}

impl From<NameAlias> for Operand {
    fn from(v: NameAlias) -> Self {
        Operand::Column(v)
    }
}

impl<T: Into<Operand>> From<Option<T>> for Operand {
    fn from(v: Option<T>) -> Self {
        v.map_or(Operand::Value(Value::Null), Into::into)
    }
}

/// Comparison applied by an [`Operator`].
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Bare column, no comparison.
    None,
    Eq(Operand),
    NotEq(Operand),
    Lt(Operand),
    Gt(Operand),
    Ge(Operand),
    Le(Operand),
    Like(Operand),
    NotLike(Operand),
    Glob(Operand),
    IsNull,
    IsNotNull,
    Between(Operand, Operand),
    In(Vec<Operand>),
    NotIn(Vec<Operand>),
    /// `col=col || value`, for SET clauses.
    Concatenate(Operand),
}

impl Operation {
    fn operands(&self) -> Vec<&Operand> {
        match self {
            Operation::None | Operation::IsNull | Operation::IsNotNull => Vec::new(),
            Operation::Eq(o)
            | Operation::NotEq(o)
            | Operation::Lt(o)
            | Operation::Gt(o)
            | Operation::Ge(o)
            | Operation::Le(o)
            | Operation::Like(o)
            | Operation::NotLike(o)
            | Operation::Glob(o)
            | Operation::Concatenate(o) => vec![o],
            Operation::Between(a, b) => vec![a, b],
            Operation::In(list) | Operation::NotIn(list) => list.iter().collect(),
        }
    }

    fn operands_mut(&mut self) -> Vec<&mut Operand> {
        match self {
            Operation::None | Operation::IsNull | Operation::IsNotNull => Vec::new(),
            Operation::Eq(o)
            | Operation::NotEq(o)
            | Operation::Lt(o)
            | Operation::Gt(o)
            | Operation::Ge(o)
            | Operation::Le(o)
            | Operation::Like(o)
            | Operation::NotLike(o)
            | Operation::Glob(o)
            | Operation::Concatenate(o) => vec![o],
            Operation::Between(a, b) => vec![a, b],
            Operation::In(list) | Operation::NotIn(list) => list.iter_mut().collect(),
        }
    }
}

/// A single predicate leaf.
///
/// # Example
///
/// ```ignore
/// let op = Operator::column("name").in_list(["Jason", "Ryan", "Michael"]);
/// assert_eq!(op.query(), "`name` IN ('Jason','Ryan','Michael')");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Operator {
    lhs: String,
    operation: Operation,
    collate: Option<Collate>,
}

impl Operator {
    /// Leaf on a (quoted) column.
    pub fn column(name: impl Into<NameAlias>) -> Self {
        Self::raw_lhs(name.into().name_as_key())
    }

    /// Leaf whose left side is an expression such as a method call.
    pub fn expression(expr: &dyn Query) -> Self {
        Self::raw_lhs(expr.query())
    }

    fn raw_lhs(lhs: String) -> Self {
        Self {
            lhs,
            operation: Operation::None,
            collate: None,
        }
    }

    fn with(mut self, operation: Operation) -> Self {
        self.operation = operation;
        self
    }

    #[must_use]
    pub fn eq(self, value: impl Into<Operand>) -> Self {
        self.with(Operation::Eq(value.into()))
    }

    /// `= ?`, filled later.
    #[must_use]
    pub fn eq_param(self) -> Self {
        self.with(Operation::Eq(Operand::Param))
    }

    #[must_use]
    pub fn not_eq(self, value: impl Into<Operand>) -> Self {
        self.with(Operation::NotEq(value.into()))
    }

    #[must_use]
    pub fn lt(self, value: impl Into<Operand>) -> Self {
        self.with(Operation::Lt(value.into()))
    }

    #[must_use]
    pub fn gt(self, value: impl Into<Operand>) -> Self {
        self.with(Operation::Gt(value.into()))
    }

    #[must_use]
    pub fn ge(self, value: impl Into<Operand>) -> Self {
        self.with(Operation::Ge(value.into()))
    }

    #[must_use]
    pub fn le(self, value: impl Into<Operand>) -> Self {
        self.with(Operation::Le(value.into()))
    }

    #[must_use]
    pub fn like(self, pattern: impl Into<Operand>) -> Self {
        self.with(Operation::Like(pattern.into()))
    }

    #[must_use]
    pub fn not_like(self, pattern: impl Into<Operand>) -> Self {
        self.with(Operation::NotLike(pattern.into()))
    }

    #[must_use]
    pub fn glob(self, pattern: impl Into<Operand>) -> Self {
        self.with(Operation::Glob(pattern.into()))
    }

    #[must_use]
    pub fn is_null(self) -> Self {
        self.with(Operation::IsNull)
    }

    #[must_use]
    pub fn is_not_null(self) -> Self {
        self.with(Operation::IsNotNull)
    }

    #[must_use]
    pub fn between(self, low: impl Into<Operand>, high: impl Into<Operand>) -> Self {
        self.with(Operation::Between(low.into(), high.into()))
    }

    #[must_use]
    pub fn in_list<I, T>(self, values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Operand>,
    {
        self.with(Operation::In(values.into_iter().map(Into::into).collect()))
    }

    #[must_use]
    pub fn not_in<I, T>(self, values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Operand>,
    {
        self.with(Operation::NotIn(values.into_iter().map(Into::into).collect()))
    }

    /// `IN (subquery)`.
    #[must_use]
    pub fn in_query(self, query: &dyn Query) -> Self {
        self.with(Operation::In(vec![Operand::Raw(query.query())]))
    }

    /// `col=col || value`.
    #[must_use]
    pub fn concatenate(self, value: impl Into<Operand>) -> Self {
        self.with(Operation::Concatenate(value.into()))
    }

    /// Append a `COLLATE` directive after the value.
    #[must_use]
    pub fn collate(mut self, collate: Collate) -> Self {
        self.collate = Some(collate);
        self
    }

    #[must_use]
    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    /// Rendered left side.
    #[must_use]
    pub fn column_name(&self) -> &str {
        &self.lhs
    }

    fn append_to(&self, qb: &mut QueryBuilder) {
        qb.append(&self.lhs);
        match &self.operation {
            Operation::None => {}
            Operation::Eq(o) => {
                qb.append('=').append(o.render());
            }
            Operation::NotEq(o) => {
                qb.append("!=").append(o.render());
            }
            Operation::Lt(o) => {
                qb.append('<').append(o.render());
            }
            Operation::Gt(o) => {
                qb.append('>').append(o.render());
            }
            Operation::Ge(o) => {
                qb.append(">=").append(o.render());
            }
            Operation::Le(o) => {
                qb.append("<=").append(o.render());
            }
            Operation::Like(o) => {
                qb.append(" LIKE ").append(o.render());
            }
            Operation::NotLike(o) => {
                qb.append(" NOT LIKE ").append(o.render());
            }
            Operation::Glob(o) => {
                qb.append(" GLOB ").append(o.render());
            }
            Operation::IsNull => {
                qb.append(" IS NULL");
            }
            Operation::IsNotNull => {
                qb.append(" IS NOT NULL");
            }
            Operation::Between(low, high) => {
                qb.append(" BETWEEN ")
                    .append(low.render())
                    .append(" AND ")
                    .append(high.render());
            }
            Operation::In(list) => {
                qb.append(" IN (")
                    .append_joined(",", list.iter().map(Operand::render))
                    .append(')');
            }
            Operation::NotIn(list) => {
                qb.append(" NOT IN (")
                    .append_joined(",", list.iter().map(Operand::render))
                    .append(')');
            }
            Operation::Concatenate(o) => {
                qb.append('=')
                    .append(&self.lhs)
                    .append(" || ")
                    .append(o.render());
            }
        }
        if let Some(collate) = self.collate {
            qb.append(" COLLATE ").append(collate.as_sql());
        }
    }
}

impl Query for Operator {
    fn query(&self) -> String {
        let mut qb = QueryBuilder::new();
        self.append_to(&mut qb);
        qb.build()
    }
}

/// Connective between two nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Separator {
    And,
    Or,
    Comma,
}

impl Separator {
    const fn as_sql(self) -> &'static str {
        match self {
            Separator::And => " AND ",
            Separator::Or => " OR ",
            Separator::Comma => ",",
        }
    }
}

/// One node of a condition tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Operator(Operator),
    Group(ConditionGroup),
    /// `[NOT ]EXISTS (subquery)`.
    Exists { query: String, negated: bool },
    /// Text inserted verbatim.
    Raw(String),
}

impl Condition {
    pub fn exists(query: &dyn Query) -> Self {
        Condition::Exists {
            query: query.query(),
            negated: false,
        }
    }

    pub fn not_exists(query: &dyn Query) -> Self {
        Condition::Exists {
            query: query.query(),
            negated: true,
        }
    }

    pub fn raw(sql: impl Into<String>) -> Self {
        Condition::Raw(sql.into())
    }

    fn append_to(&self, qb: &mut QueryBuilder) {
        match self {
            Condition::Operator(op) => op.append_to(qb),
            Condition::Group(group) => group.append_to(qb),
            Condition::Exists { query, negated } => {
                if *negated {
                    qb.append("NOT ");
                }
                qb.append("EXISTS ").append_parenthesis_enclosed(query);
            }
            Condition::Raw(sql) => {
                qb.append(sql);
            }
        }
    }

    fn visit_operands<'a>(&'a self, out: &mut Vec<&'a Operand>) {
        match self {
            Condition::Operator(op) => out.extend(op.operation.operands()),
            Condition::Group(group) => {
                for (node, _) in &group.nodes {
                    node.visit_operands(out);
                }
            }
            Condition::Exists { .. } | Condition::Raw(_) => {}
        }
    }

    fn visit_operands_mut<'a>(&'a mut self, out: &mut Vec<&'a mut Operand>) {
        match self {
            Condition::Operator(op) => out.extend(op.operation.operands_mut()),
            Condition::Group(group) => {
                for (node, _) in &mut group.nodes {
                    node.visit_operands_mut(out);
                }
            }
            Condition::Exists { .. } | Condition::Raw(_) => {}
        }
    }
}

impl From<Operator> for Condition {
    fn from(op: Operator) -> Self {
        Condition::Operator(op)
    }
}

impl From<ConditionGroup> for Condition {
    fn from(group: ConditionGroup) -> Self {
        Condition::Group(group)
    }
}

impl Query for Condition {
    fn query(&self) -> String {
        let mut qb = QueryBuilder::new();
        self.append_to(&mut qb);
        qb.build()
    }
}

/// An ordered list of conditions joined by AND/OR.
///
/// Groups built with [`ConditionGroup::new`] are parenthesized when
/// rendered; [`ConditionGroup::clause`] groups (the top level of a WHERE or
/// HAVING) are not.
///
/// # Example
///
/// ```ignore
/// let group = ConditionGroup::clause()
///     .and(Operator::column("name").eq("James"))
///     .or(Operator::column("number").eq(6))
///     .and(Operator::column("fraction").eq(4.5));
/// assert_eq!(group.query(), "`name`='James' OR `number`=6 AND `fraction`=4.5");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionGroup {
    nodes: Vec<(Condition, Option<Separator>)>,
    parenthesized: bool,
    comma_separated: bool,
}

impl Default for ConditionGroup {
    fn default() -> Self {
        Self::new()
    }
}

impl ConditionGroup {
    /// A parenthesized group.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            parenthesized: true,
            comma_separated: false,
        }
    }

    /// A top-level group, rendered without parentheses.
    #[must_use]
    pub fn clause() -> Self {
        Self {
            parenthesized: false,
            ..Self::new()
        }
    }

    /// A group whose nodes are joined by `,` (SET lists).
    #[must_use]
    pub fn comma_separated() -> Self {
        Self {
            comma_separated: true,
            ..Self::clause()
        }
    }

    pub(crate) fn into_clause(mut self) -> Self {
        self.parenthesized = false;
        self
    }

    pub(crate) fn into_comma_separated(mut self) -> Self {
        self.comma_separated = true;
        self.parenthesized = false;
        self
    }

    fn push(mut self, separator: Separator, condition: impl Into<Condition>) -> Self {
        if let Some((_, last)) = self.nodes.last_mut() {
            *last = Some(separator);
        }
        self.nodes.push((condition.into(), None));
        self
    }

    #[must_use]
    pub fn and(self, condition: impl Into<Condition>) -> Self {
        self.push(Separator::And, condition)
    }

    #[must_use]
    pub fn or(self, condition: impl Into<Condition>) -> Self {
        self.push(Separator::Or, condition)
    }

    /// AND every condition in turn.
    #[must_use]
    pub fn and_all<I, C>(self, conditions: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Condition>,
    {
        conditions.into_iter().fold(self, Self::and)
    }

    /// OR every condition in turn.
    #[must_use]
    pub fn or_all<I, C>(self, conditions: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Condition>,
    {
        conditions.into_iter().fold(self, Self::or)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn conditions(&self) -> impl Iterator<Item = &Condition> {
        self.nodes.iter().map(|(c, _)| c)
    }

    /// Number of `?` placeholders in the tree.
    #[must_use]
    pub fn empty_param_count(&self) -> usize {
        self.operands().into_iter().filter(|o| o.is_param()).count()
    }

    fn operands(&self) -> Vec<&Operand> {
        let mut out = Vec::new();
        for (node, _) in &self.nodes {
            node.visit_operands(&mut out);
        }
        out
    }

    /// Fill every `?` placeholder, in tree order, with `values`.
    ///
    /// Fails if the group also holds bound values, or if the number of
    /// values differs from the number of placeholders.
    pub fn replace_empty_params<I, T>(&mut self, values: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        let operands = self.operands();
        let expected = operands.iter().filter(|o| o.is_param()).count();
        if expected > 0 && operands.iter().any(|o| o.is_bound()) {
            return Err(Error::MixedParams);
        }
        if expected != values.len() {
            return Err(Error::ParamCountMismatch {
                expected,
                actual: values.len(),
            });
        }

        let mut slots = Vec::new();
        for (node, _) in &mut self.nodes {
            node.visit_operands_mut(&mut slots);
        }
        let mut values = values.into_iter();
        for slot in slots.into_iter().filter(|o| o.is_param()) {
            if let Some(value) = values.next() {
                *slot = Operand::Value(value);
            }
        }
        Ok(())
    }

    fn append_to(&self, qb: &mut QueryBuilder) {
        if self.nodes.is_empty() {
            return;
        }
        if self.parenthesized {
            qb.append('(');
        }
        let last = self.nodes.len() - 1;
        for (i, (node, separator)) in self.nodes.iter().enumerate() {
            node.append_to(qb);
            if i < last {
                let separator = if self.comma_separated {
                    Separator::Comma
                } else {
                    separator.unwrap_or(Separator::And)
                };
                qb.append(separator.as_sql());
            }
        }
        if self.parenthesized {
            qb.append(')');
        }
    }
}

impl Query for ConditionGroup {
    fn query(&self) -> String {
        let mut qb = QueryBuilder::new();
        self.append_to(&mut qb);
        qb.build()
    }
}
