//! Composable SQL fragment builder for DBFlow Rust.
//!
//! `dbflow-query` turns chains of builder calls into byte-exact SQL text.
//! Identifiers are backtick-quoted, string literals single-quoted with
//! embedded quotes doubled.
//!
//! # Role In The Architecture
//!
//! - **Statements**: `Select`/`From`/`Where`, `Insert`, `Update`/`Set`,
//!   `Delete`, `Trigger` and `Index` DDL.
//! - **Conditions**: `Operator` leaves and `ConditionGroup` trees shared by
//!   WHERE, HAVING, JOIN ON and SET.
//! - **Adapter contract**: `ModelAdapter` is what generated adapters
//!   implement; `saver` persists models through it.
//!
//! Builders are plain values: construct one per query on the thread that
//! uses it.
//!
//! # Example
//!
//! ```ignore
//! use dbflow_query::{Operator, Query, Select};
//!
//! let sql = Select::new()
//!     .columns(["name"])
//!     .from("TestModel1")
//!     .filter(Operator::column("name").eq("test"))
//!     .query();
//! assert_eq!(sql, "SELECT `name` FROM `TestModel1` WHERE `name`='test'");
//! ```

pub mod adapter;
pub mod alias;
pub mod builder;
pub mod clause;
pub mod condition;
pub mod index;
pub mod method;
pub mod order;
pub mod saver;
pub mod select;
pub mod trigger;

pub use adapter::ModelAdapter;
pub use alias::NameAlias;
pub use builder::{Delete, Insert, Query, QueryBuilder, Set, Update, select};
pub use clause::{From, FromBase, Join, JoinKind, Where, WhereBase};
pub use condition::{Condition, ConditionGroup, Operand, Operation, Operator, Separator};
pub use index::{Index, drop_index_query};
pub use method::Method;
pub use order::OrderBy;
pub use select::Select;
pub use trigger::{CompletedTrigger, Trigger, TriggerMethod, TriggerTiming, drop_trigger_query};
