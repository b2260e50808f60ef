//! Trigger DDL.
//!
//! ```text
//! CREATE [TEMP ]TRIGGER IF NOT EXISTS `name` <BEFORE|AFTER|INSTEAD OF>
//!     <INSERT|UPDATE[ OF cols]|DELETE> ON `table`[ FOR EACH ROW][ WHEN cond]
//!     BEGIN <stmt>; [<stmt>; ...]END
//! ```

use dbflow_core::{DatabaseWrapper, Result, quote_ident};

use crate::alias::NameAlias;
use crate::builder::{Query, QueryBuilder};
use crate::condition::{Condition, ConditionGroup};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerTiming {
    Before,
    After,
    InsteadOf,
}

impl TriggerTiming {
    const fn as_sql(self) -> &'static str {
        match self {
            TriggerTiming::Before => "BEFORE",
            TriggerTiming::After => "AFTER",
            TriggerTiming::InsteadOf => "INSTEAD OF",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum TriggerEvent {
    Insert,
    Update(Vec<NameAlias>),
    Delete,
}

/// A named trigger; pick a timing and an event to get a [`TriggerMethod`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    name: String,
    temporary: bool,
    timing: TriggerTiming,
}

impl Trigger {
    /// An AFTER trigger named `name`.
    pub fn create(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            temporary: false,
            timing: TriggerTiming::After,
        }
    }

    #[must_use]
    pub fn temporary(mut self) -> Self {
        self.temporary = true;
        self
    }

    #[must_use]
    pub fn before(mut self) -> Self {
        self.timing = TriggerTiming::Before;
        self
    }

    #[must_use]
    pub fn after(mut self) -> Self {
        self.timing = TriggerTiming::After;
        self
    }

    #[must_use]
    pub fn instead_of(mut self) -> Self {
        self.timing = TriggerTiming::InsteadOf;
        self
    }

    pub fn insert_on(self, table: impl Into<NameAlias>) -> TriggerMethod {
        TriggerMethod::new(self, TriggerEvent::Insert, table.into())
    }

    /// `UPDATE[ OF cols] ON table`; an empty column list fires on any update.
    pub fn update_on<I, T>(self, table: impl Into<NameAlias>, columns: I) -> TriggerMethod
    where
        I: IntoIterator<Item = T>,
        T: Into<NameAlias>,
    {
        let columns = columns.into_iter().map(Into::into).collect();
        TriggerMethod::new(self, TriggerEvent::Update(columns), table.into())
    }

    pub fn delete_on(self, table: impl Into<NameAlias>) -> TriggerMethod {
        TriggerMethod::new(self, TriggerEvent::Delete, table.into())
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Query for Trigger {
    fn query(&self) -> String {
        let mut qb = QueryBuilder::with("CREATE ");
        if self.temporary {
            qb.append("TEMP ");
        }
        qb.append("TRIGGER IF NOT EXISTS ")
            .append_quoted(&self.name)
            .append_space()
            .append(self.timing.as_sql());
        qb.build()
    }
}

/// Trigger with its event and table; call [`TriggerMethod::begin`] to add
/// the body.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerMethod {
    trigger: Trigger,
    event: TriggerEvent,
    table: NameAlias,
    for_each_row: bool,
    when: ConditionGroup,
}

impl TriggerMethod {
    fn new(trigger: Trigger, event: TriggerEvent, table: NameAlias) -> Self {
        Self {
            trigger,
            event,
            table,
            for_each_row: false,
            when: ConditionGroup::clause(),
        }
    }

    #[must_use]
    pub fn for_each_row(mut self) -> Self {
        self.for_each_row = true;
        self
    }

    #[must_use]
    pub fn when(mut self, condition: impl Into<Condition>) -> Self {
        self.when = self.when.and(condition);
        self
    }

    /// First statement of the trigger body.
    pub fn begin(self, statement: &dyn Query) -> CompletedTrigger {
        CompletedTrigger {
            method: self,
            body: vec![statement.query()],
        }
    }
}

impl Query for TriggerMethod {
    fn query(&self) -> String {
        let mut qb = QueryBuilder::with(self.trigger.query());
        qb.append_space();
        match &self.event {
            TriggerEvent::Insert => {
                qb.append("INSERT");
            }
            TriggerEvent::Delete => {
                qb.append("DELETE");
            }
            TriggerEvent::Update(columns) => {
                qb.append("UPDATE");
                if !columns.is_empty() {
                    qb.append(" OF ")
                        .append_array(columns.iter().map(NameAlias::name_as_key));
                }
            }
        }
        qb.append_qualifier("ON", &self.table.query());
        if self.for_each_row {
            qb.append(" FOR EACH ROW");
        }
        qb.append_qualifier("WHEN", &self.when.query());
        qb.build()
    }
}

/// A trigger with a body, ready to create or drop.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedTrigger {
    method: TriggerMethod,
    body: Vec<String>,
}

impl CompletedTrigger {
    /// Append another body statement.
    #[must_use]
    pub fn and(mut self, statement: &dyn Query) -> Self {
        self.body.push(statement.query());
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.method.trigger.name()
    }

    /// Create the trigger.
    pub fn enable(&self, db: &dyn DatabaseWrapper) -> Result<()> {
        let sql = self.query();
        tracing::debug!(sql = %sql, "Creating trigger");
        db.exec_sql(&sql)
    }

    /// Drop the trigger.
    pub fn disable(&self, db: &dyn DatabaseWrapper) -> Result<()> {
        let sql = drop_trigger_query(self.name());
        tracing::debug!(sql = %sql, "Dropping trigger");
        db.exec_sql(&sql)
    }
}

impl Query for CompletedTrigger {
    fn query(&self) -> String {
        let mut qb = QueryBuilder::with(self.method.query());
        qb.append(" BEGIN ");
        for statement in &self.body {
            qb.append(statement).append("; ");
        }
        qb.append("END");
        qb.build()
    }
}

/// `DROP TRIGGER IF EXISTS <name>`.
#[must_use]
pub fn drop_trigger_query(name: &str) -> String {
    format!("DROP TRIGGER IF EXISTS {}", quote_ident(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{Insert, Update};
    use crate::condition::Operator;

    #[test]
    fn test_after_insert_trigger() {
        let trigger = Trigger::create("log_insert")
            .after()
            .insert_on("Hero")
            .begin(&Insert::into("Log").columns(["msg"]).values(["inserted"]));
        assert_eq!(
            trigger.query(),
            "CREATE TRIGGER IF NOT EXISTS `log_insert` AFTER INSERT ON `Hero` \
             BEGIN INSERT INTO `Log`(`msg`) VALUES('inserted'); END"
        );
    }

    #[test]
    fn test_before_update_of_columns_with_when() {
        let body = Update::table("Hero").set(Operator::column("touched").eq(1));
        let trigger = Trigger::create("touch")
            .temporary()
            .before()
            .update_on("Hero", ["name", "age"])
            .for_each_row()
            .when(Operator::column("new.age").gt(0))
            .begin(&body)
            .and(&"SELECT 1");
        assert_eq!(
            trigger.query(),
            "CREATE TEMP TRIGGER IF NOT EXISTS `touch` BEFORE UPDATE OF `name`, `age` ON `Hero` \
             FOR EACH ROW WHEN `new`.`age`>0 BEGIN UPDATE `Hero` SET `touched`=1; SELECT 1; END"
        );
    }

    #[test]
    fn test_delete_trigger_and_drop() {
        let trigger = Trigger::create("gone")
            .instead_of()
            .delete_on("HeroView")
            .begin(&"SELECT 1");
        assert_eq!(
            trigger.query(),
            "CREATE TRIGGER IF NOT EXISTS `gone` INSTEAD OF DELETE ON `HeroView` BEGIN SELECT 1; END"
        );
        assert_eq!(drop_trigger_query(trigger.name()), "DROP TRIGGER IF EXISTS `gone`");
    }
}
