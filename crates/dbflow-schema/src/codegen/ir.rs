//! Adapter intermediate representation.
//!
//! Bind order and null-guard branching live in these trees rather than in
//! template strings: the planner builds them from a validated table, the
//! printer renders them as Rust source and [`crate::PlanAdapter`] runs
//! them directly.

use dbflow_core::{ConflictAction, CursorGetter};
use serde::Serialize;

use crate::column::ValueCodec;
use crate::decl::EntityKind;

/// A field on the model, optionally descending into a referenced record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldPath {
    pub field: String,
    /// Fields inside the referenced model; empty for plain columns.
    pub path: Vec<String>,
}

impl FieldPath {
    pub fn field(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            path: Vec::new(),
        }
    }

    pub fn nested(field: impl Into<String>, path: Vec<String>) -> Self {
        Self {
            field: field.into(),
            path,
        }
    }

    /// Dotted form, e.g. `team.league.id`.
    #[must_use]
    pub fn dotted(&self) -> String {
        std::iter::once(self.field.as_str())
            .chain(self.path.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(".")
    }
}

/// Where a bound value goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "slot", content = "at", rename_all = "snake_case")]
pub enum Slot {
    /// 1-based statement index.
    Index(usize),
    /// Quoted content-values key.
    Key(String),
}

/// One step of a binder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum BindStmt {
    /// Encode the field value and bind it.
    Bind {
        slot: Slot,
        source: FieldPath,
        codec: ValueCodec,
    },
    /// Bind a typed null without touching the accessor.
    BindNull { slot: Slot },
    /// Branch on the field being null.
    IfNotNull {
        field: String,
        then: Vec<BindStmt>,
        otherwise: Vec<BindStmt>,
    },
}

impl BindStmt {
    /// Slots written by this statement, in order, along the non-null branch.
    #[must_use]
    pub fn slots(&self) -> Vec<&Slot> {
        match self {
            BindStmt::Bind { slot, .. } | BindStmt::BindNull { slot } => vec![slot],
            BindStmt::IfNotNull { then, .. } => then.iter().flat_map(BindStmt::slots).collect(),
        }
    }
}

/// Read of one cursor column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnRead {
    pub column: String,
    pub getter: CursorGetter,
    pub codec: ValueCodec,
    /// Position inside a referenced record; empty for plain columns.
    pub path: Vec<String>,
}

/// One step of `load_from_cursor`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum LoadStmt {
    Assign {
        field: String,
        read: ColumnRead,
        nullable: bool,
    },
    /// Rebuild a referenced model from its key columns.
    AssignReference {
        field: String,
        nullable: bool,
        reads: Vec<ColumnRead>,
    },
    LoadRelation { name: String },
    OnLoad,
}

/// How `exists` is decided.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum ExistsStrategy {
    /// `id > 0` on a single engine-assigned key (`Some(id) > 0` when nullable).
    AutoIncrementId { field: String, nullable: bool },
    /// `SELECT COUNT(*)` by primary key.
    Query,
}

/// One primary-key equality of `primary_condition`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConditionPart {
    pub column: String,
    pub source: FieldPath,
    pub codec: ValueCodec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CachingPlan {
    pub column: String,
    pub source: FieldPath,
    pub codec: ValueCodec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AutoIncrementPlan {
    pub field: String,
    pub codec: ValueCodec,
}

/// Relations cascaded for each operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CascadePlan {
    pub load: Vec<String>,
    pub save: Vec<String>,
    pub delete: Vec<String>,
}

/// Everything an adapter needs, for one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdapterPlan {
    pub entity: String,
    pub table_name: String,
    pub database: String,
    pub kind: EntityKind,
    /// Storage columns in `bind_all` order.
    pub columns: Vec<String>,
    pub insert_query: String,
    pub update_query: String,
    pub delete_query: String,
    pub creation_query: String,
    pub index_queries: Vec<String>,
    pub insert_conflict: ConflictAction,
    pub update_conflict: ConflictAction,
    pub bind_all: Vec<BindStmt>,
    pub bind_insert: Vec<BindStmt>,
    pub bind_update: Vec<BindStmt>,
    pub bind_delete: Vec<BindStmt>,
    pub bind_content_values: Vec<BindStmt>,
    pub load: Vec<LoadStmt>,
    pub exists: ExistsStrategy,
    pub primary_condition: Vec<ConditionPart>,
    pub caching: Option<CachingPlan>,
    pub auto_increment: Option<AutoIncrementPlan>,
    pub cascades: CascadePlan,
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbflow_core::FieldKind;

    #[test]
    fn test_field_path_dotted() {
        assert_eq!(FieldPath::field("id").dotted(), "id");
        assert_eq!(
            FieldPath::nested("team", vec!["league".into(), "id".into()]).dotted(),
            "team.league.id"
        );
    }

    #[test]
    fn test_guarded_slots_follow_then_branch() {
        let codec = ValueCodec::Direct { kind: FieldKind::I64 };
        let stmt = BindStmt::IfNotNull {
            field: "team".into(),
            then: vec![
                BindStmt::Bind {
                    slot: Slot::Index(2),
                    source: FieldPath::nested("team", vec!["id".into()]),
                    codec: codec.clone(),
                },
                BindStmt::Bind {
                    slot: Slot::Index(3),
                    source: FieldPath::nested("team", vec!["league".into()]),
                    codec,
                },
            ],
            otherwise: vec![
                BindStmt::BindNull { slot: Slot::Index(2) },
                BindStmt::BindNull { slot: Slot::Index(3) },
            ],
        };
        assert_eq!(stmt.slots(), [&Slot::Index(2), &Slot::Index(3)]);
    }
}
