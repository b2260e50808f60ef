//! Runtime adapter driven directly by an [`AdapterPlan`].
//!
//! This is the no-build-script path: the plan produced by generation is
//! interpreted statement by statement, with the same bind order and null
//! guards the printed source would have. The free functions here are also
//! what printed adapters call into.

use std::marker::PhantomData;

use dbflow_core::{
    ConflictAction, ContentValues, CursorGetter, DatabaseStatement, DatabaseWrapper, Error,
    FieldValue, FlowCursor, Model, ModelHooks, Result, Value,
};
use dbflow_query::{ConditionGroup, ModelAdapter, Operator, Select};

use crate::codegen::ir::{AdapterPlan, BindStmt, ExistsStrategy, FieldPath, LoadStmt, Slot};

/// Value of `field`, descending into referenced records along `path`.
///
/// A null anywhere along the path yields null.
pub fn field_at<M: Model>(model: &M, field: &str, path: &[&str]) -> Result<FieldValue> {
    let mut value = model.require_field(field)?;
    for name in path {
        value = match value {
            FieldValue::Null => return Ok(FieldValue::Null),
            FieldValue::Record(entries) => entries
                .into_iter()
                .find(|(entry, _)| entry == name)
                .map(|(_, v)| v)
                .ok_or_else(|| Error::UnknownField {
                    model: M::NAME,
                    field: format!("{field}.{name}"),
                })?,
            other => {
                return Err(Error::TypeMismatch {
                    field: field.to_string(),
                    expected: "record",
                    found: other.kind_name(),
                });
            }
        };
    }
    Ok(value)
}

fn source_value<M: Model>(model: &M, source: &FieldPath) -> Result<FieldValue> {
    let path: Vec<&str> = source.path.iter().map(String::as_str).collect();
    field_at(model, &source.field, &path)
}

/// Read one cursor column with the given accessor; null stays null.
pub fn read_value(cursor: &dyn FlowCursor, index: usize, getter: CursorGetter) -> Value {
    if cursor.is_null(index) {
        return Value::Null;
    }
    match getter {
        CursorGetter::Long => Value::Integer(cursor.get_long(index)),
        CursorGetter::Int => Value::Integer(i64::from(cursor.get_int(index))),
        CursorGetter::Short => Value::Integer(i64::from(cursor.get_short(index))),
        CursorGetter::Double => Value::Real(cursor.get_double(index)),
        CursorGetter::Float => Value::Real(f64::from(cursor.get_float(index))),
        CursorGetter::String => Value::Text(cursor.get_string(index)),
        CursorGetter::Blob => Value::Blob(cursor.get_blob(index)),
    }
}

/// Assemble a referenced model's record from `(path, value)` pairs.
///
/// `[["league", "id"], 3]` becomes `{league: {id: 3}}`.
pub fn nested_record(entries: Vec<(Vec<String>, FieldValue)>) -> FieldValue {
    let mut fields = Vec::new();
    for (path, value) in entries {
        insert_at(&mut fields, &path, value);
    }
    FieldValue::Record(fields)
}

fn insert_at(fields: &mut Vec<(String, FieldValue)>, path: &[String], value: FieldValue) {
    let Some((head, rest)) = path.split_first() else {
        return;
    };
    if rest.is_empty() {
        fields.push((head.clone(), value));
        return;
    }
    let position = match fields.iter().position(|(name, _)| name == head) {
        Some(position) => position,
        None => {
            fields.push((head.clone(), FieldValue::Record(Vec::new())));
            fields.len() - 1
        }
    };
    if let FieldValue::Record(inner) = &mut fields[position].1 {
        insert_at(inner, rest, value);
    }
}

enum BindTarget<'a> {
    Statement(&'a mut dyn DatabaseStatement),
    Values(&'a mut ContentValues),
}

impl BindTarget<'_> {
    fn put(&mut self, slot: &Slot, value: Value) -> Result<()> {
        match (self, slot) {
            (BindTarget::Statement(statement), Slot::Index(index)) => {
                statement.bind_value(*index, &value);
            }
            (BindTarget::Values(values), Slot::Key(key)) => {
                if value.is_null() {
                    values.put_null(key.as_str());
                } else {
                    values.put(key.as_str(), value);
                }
            }
            (_, slot) => {
                return Err(Error::InvalidQuery(format!(
                    "bind slot {slot:?} does not match its target"
                )));
            }
        }
        Ok(())
    }
}

/// A [`ModelAdapter`] that interprets an [`AdapterPlan`].
pub struct PlanAdapter<M> {
    plan: AdapterPlan,
    _model: PhantomData<fn() -> M>,
}

impl<M> std::fmt::Debug for PlanAdapter<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanAdapter")
            .field("entity", &self.plan.entity)
            .field("table", &self.plan.table_name)
            .finish()
    }
}

impl<M: Model + ModelHooks> PlanAdapter<M> {
    #[must_use]
    pub fn new(plan: AdapterPlan) -> Self {
        if plan.entity != M::NAME {
            tracing::warn!(plan = %plan.entity, model = M::NAME, "Adapter plan used for a different model");
        }
        Self {
            plan,
            _model: PhantomData,
        }
    }

    #[must_use]
    pub fn plan(&self) -> &AdapterPlan {
        &self.plan
    }

    fn run_binds(&self, stmts: &[BindStmt], model: &M, target: &mut BindTarget<'_>) -> Result<()> {
        for stmt in stmts {
            match stmt {
                BindStmt::Bind {
                    slot,
                    source,
                    codec,
                } => {
                    let value = codec.encode(&source.dotted(), &source_value(model, source)?)?;
                    target.put(slot, value)?;
                }
                BindStmt::BindNull { slot } => target.put(slot, Value::Null)?,
                BindStmt::IfNotNull {
                    field,
                    then,
                    otherwise,
                } => {
                    if model.require_field(field)?.is_null() {
                        self.run_binds(otherwise, model, target)?;
                    } else {
                        self.run_binds(then, model, target)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn bind_statement(
        &self,
        stmts: &[BindStmt],
        statement: &mut dyn DatabaseStatement,
        model: &M,
    ) -> Result<()> {
        self.run_binds(stmts, model, &mut BindTarget::Statement(statement))
    }
}

impl<M: Model + ModelHooks> ModelAdapter<M> for PlanAdapter<M> {
    fn table_name(&self) -> &str {
        &self.plan.table_name
    }

    fn new_instance(&self) -> M {
        M::new_instance()
    }

    fn column_names(&self) -> Vec<String> {
        self.plan.columns.clone()
    }

    fn load_from_cursor(
        &self,
        cursor: &dyn FlowCursor,
        model: &mut M,
        db: &dyn DatabaseWrapper,
    ) -> Result<()> {
        for step in &self.plan.load {
            match step {
                LoadStmt::Assign {
                    field,
                    read,
                    nullable,
                } => {
                    // Columns missing from the result set are left alone.
                    let Some(index) = cursor.column_index(&read.column) else {
                        continue;
                    };
                    let value = if *nullable && cursor.is_null(index) {
                        FieldValue::Null
                    } else {
                        read.codec
                            .decode(&read.column, read_value(cursor, index, read.getter))?
                    };
                    model.set_field(field, value)?;
                }
                LoadStmt::AssignReference {
                    field,
                    nullable,
                    reads,
                } => {
                    let mut entries = Vec::new();
                    let mut present = false;
                    let mut all_null = true;
                    for read in reads {
                        let Some(index) = cursor.column_index(&read.column) else {
                            continue;
                        };
                        present = true;
                        if cursor.is_null(index) {
                            continue;
                        }
                        all_null = false;
                        let value = read
                            .codec
                            .decode(&read.column, read_value(cursor, index, read.getter))?;
                        entries.push((read.path.clone(), value));
                    }
                    if present {
                        let value = if all_null && *nullable {
                            FieldValue::Null
                        } else {
                            nested_record(entries)
                        };
                        model.set_field(field, value)?;
                    }
                }
                LoadStmt::LoadRelation { name } => model.load_related(name, db)?,
                LoadStmt::OnLoad => model.on_load(),
            }
        }
        Ok(())
    }

    fn bind_to_statement(&self, statement: &mut dyn DatabaseStatement, model: &M) -> Result<()> {
        self.bind_statement(&self.plan.bind_all, statement, model)
    }

    fn bind_to_insert_statement(
        &self,
        statement: &mut dyn DatabaseStatement,
        model: &M,
    ) -> Result<()> {
        self.bind_statement(&self.plan.bind_insert, statement, model)
    }

    fn bind_to_update_statement(
        &self,
        statement: &mut dyn DatabaseStatement,
        model: &M,
    ) -> Result<()> {
        self.bind_statement(&self.plan.bind_update, statement, model)
    }

    fn bind_to_delete_statement(
        &self,
        statement: &mut dyn DatabaseStatement,
        model: &M,
    ) -> Result<()> {
        self.bind_statement(&self.plan.bind_delete, statement, model)
    }

    fn bind_to_content_values(&self, values: &mut ContentValues, model: &M) -> Result<()> {
        self.run_binds(
            &self.plan.bind_content_values,
            model,
            &mut BindTarget::Values(values),
        )
    }

    fn exists(&self, model: &M, db: &dyn DatabaseWrapper) -> Result<bool> {
        match &self.plan.exists {
            ExistsStrategy::AutoIncrementId { field, .. } => Ok(model
                .require_field(field)?
                .to_storage()?
                .as_i64()
                .is_some_and(|id| id > 0)),
            ExistsStrategy::Query if self.plan.primary_condition.is_empty() => Ok(false),
            ExistsStrategy::Query => {
                let count = Select::count_of()
                    .from(self.plan.table_name.as_str())
                    .filter_group(self.primary_condition(model)?)
                    .long_value(db)?;
                Ok(count > 0)
            }
        }
    }

    fn primary_condition(&self, model: &M) -> Result<ConditionGroup> {
        let mut group = ConditionGroup::clause();
        for part in &self.plan.primary_condition {
            let value = part
                .codec
                .encode(&part.source.dotted(), &source_value(model, &part.source)?)?;
            group = group.and(Operator::column(part.column.as_str()).eq(value));
        }
        Ok(group)
    }

    fn insert_statement_query(&self) -> String {
        self.plan.insert_query.clone()
    }

    fn update_statement_query(&self) -> String {
        self.plan.update_query.clone()
    }

    fn delete_statement_query(&self) -> String {
        self.plan.delete_query.clone()
    }

    fn creation_query(&self) -> String {
        self.plan.creation_query.clone()
    }

    fn insert_on_conflict_action(&self) -> ConflictAction {
        self.plan.insert_conflict
    }

    fn update_on_conflict_action(&self) -> ConflictAction {
        self.plan.update_conflict
    }

    fn has_caching_id(&self) -> bool {
        self.plan.caching.is_some()
    }

    fn caching_column_name(&self) -> Option<&str> {
        self.plan.caching.as_ref().map(|c| c.column.as_str())
    }

    fn caching_id(&self, model: &M) -> Result<Option<Value>> {
        self.plan
            .caching
            .as_ref()
            .map(|c| c.codec.encode(&c.source.dotted(), &source_value(model, &c.source)?))
            .transpose()
    }

    fn auto_increment_id(&self, model: &M) -> Result<Option<i64>> {
        match &self.plan.auto_increment {
            Some(auto) => Ok(model.require_field(&auto.field)?.to_storage()?.as_i64()),
            None => Ok(None),
        }
    }

    fn update_auto_increment(&self, model: &mut M, id: i64) -> Result<()> {
        let Some(auto) = &self.plan.auto_increment else {
            return Ok(());
        };
        let value = auto.codec.decode(&auto.field, Value::Integer(id))?;
        model.set_field(&auto.field, value)
    }

    fn save_relations(&self, model: &M, db: &dyn DatabaseWrapper) -> Result<()> {
        for name in &self.plan.cascades.save {
            model.save_related(name, db)?;
        }
        Ok(())
    }

    fn delete_relations(&self, model: &M, db: &dyn DatabaseWrapper) -> Result<()> {
        for name in &self.plan.cascades.delete {
            model.delete_related(name, db)?;
        }
        Ok(())
    }
}
