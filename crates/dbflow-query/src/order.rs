//! ORDER BY terms.

use dbflow_core::Collate;

use crate::alias::NameAlias;
use crate::builder::Query;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Unspecified,
    Asc,
    Desc,
}

/// One ORDER BY term: `` `col`[ COLLATE X][ ASC|DESC] ``.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    column: String,
    collate: Option<Collate>,
    direction: Direction,
}

impl OrderBy {
    pub fn column(column: impl Into<NameAlias>) -> Self {
        Self {
            column: column.into().name_as_key(),
            collate: None,
            direction: Direction::Unspecified,
        }
    }

    /// Order by an arbitrary expression, emitted verbatim.
    pub fn raw(expr: impl Into<String>) -> Self {
        Self {
            column: expr.into(),
            collate: None,
            direction: Direction::Unspecified,
        }
    }

    #[must_use]
    pub fn asc(mut self) -> Self {
        self.direction = Direction::Asc;
        self
    }

    #[must_use]
    pub fn desc(mut self) -> Self {
        self.direction = Direction::Desc;
        self
    }

    #[must_use]
    pub fn collate(mut self, collate: Collate) -> Self {
        self.collate = Some(collate);
        self
    }
}

impl Query for OrderBy {
    fn query(&self) -> String {
        let mut out = self.column.clone();
        if let Some(collate) = self.collate {
            out.push_str(" COLLATE ");
            out.push_str(collate.as_sql());
        }
        match self.direction {
            Direction::Unspecified => {}
            Direction::Asc => out.push_str(" ASC"),
            Direction::Desc => out.push_str(" DESC"),
        }
        out
    }
}

impl From<&str> for OrderBy {
    fn from(column: &str) -> Self {
        OrderBy::column(column)
    }
}
