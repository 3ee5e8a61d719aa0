//! List, aggregate and group-by arguments, validated at runtime.
//!
//! Column names are never taken from user input directly: each entity exposes
//! a field enum whose variants map to a fixed column name.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::{DatabaseError, Result};

/// Largest page an explicit `take` can request.
pub const MAX_PAGE_SIZE: i64 = 500;

/// A column that queries may sort or group by.
pub trait Field: Copy + PartialEq + std::fmt::Debug {
    /// Quoted column name as used in SQL.
    fn column_name(&self) -> &'static str;
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// A single sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderBy<F> {
    pub field: F,
    pub order: SortOrder,
}

impl<F: Field> OrderBy<F> {
    pub fn asc(field: F) -> Self {
        Self {
            field,
            order: SortOrder::Asc,
        }
    }

    pub fn desc(field: F) -> Self {
        Self {
            field,
            order: SortOrder::Desc,
        }
    }
}

/// Sorting and pagination for list queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListOptions<F> {
    pub order_by: Vec<OrderBy<F>>,
    pub skip: Option<i64>,
    pub take: Option<i64>,
}

impl<F> Default for ListOptions<F> {
    fn default() -> Self {
        Self {
            order_by: Vec::new(),
            skip: None,
            take: None,
        }
    }
}

impl<F: Field> ListOptions<F> {
    pub fn order_by(mut self, order_by: OrderBy<F>) -> Self {
        self.order_by.push(order_by);
        self
    }

    pub fn skip(mut self, skip: i64) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn take(mut self, take: i64) -> Self {
        self.take = Some(take);
        self
    }

    /// Render `ORDER BY ... [LIMIT ... OFFSET ...]`.
    ///
    /// `default` is used when no ordering was requested so paging stays stable.
    /// Without `take` every remaining row is returned.
    pub(crate) fn to_sql(&self, default: OrderBy<F>) -> Result<String> {
        let order_by = if self.order_by.is_empty() {
            std::slice::from_ref(&default)
        } else {
            self.order_by.as_slice()
        };

        let mut sql = render_order_by(order_by);

        let skip = self.skip.unwrap_or(0);
        if skip < 0 {
            return Err(DatabaseError::InvalidQuery(format!(
                "skip must not be negative (got {})",
                skip
            )));
        }
        let take = match self.take {
            Some(take) if take < 0 => {
                return Err(DatabaseError::InvalidQuery(format!(
                    "take must not be negative (got {})",
                    take
                )))
            }
            Some(take) => Some(take.min(MAX_PAGE_SIZE)),
            None => None,
        };

        match take {
            Some(take) => sql.push_str(&format!(" LIMIT {} OFFSET {}", take, skip)),
            // SQLite needs a LIMIT before OFFSET; -1 means no limit.
            None if skip > 0 => sql.push_str(&format!(" LIMIT -1 OFFSET {}", skip)),
            None => {}
        }
        Ok(sql)
    }
}

fn render_order_by<F: Field>(order_by: &[OrderBy<F>]) -> String {
    let keys: Vec<String> = order_by
        .iter()
        .map(|o| format!("{} {}", o.field.column_name(), o.order.as_sql()))
        .collect();
    format!("ORDER BY {}", keys.join(", "))
}

/// Group-by arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupBy<F> {
    pub by: Vec<F>,
    pub order_by: Vec<OrderBy<F>>,
}

impl<F: Field> GroupBy<F> {
    pub fn new(by: Vec<F>) -> Self {
        Self {
            by,
            order_by: Vec::new(),
        }
    }

    pub fn order_by(mut self, order_by: OrderBy<F>) -> Self {
        self.order_by.push(order_by);
        self
    }

    /// Check that `by` is non-empty and every sort key is one of the grouped fields.
    pub fn validate(&self) -> Result<()> {
        if self.by.is_empty() {
            return Err(DatabaseError::InvalidQuery(
                "group by requires at least one field".to_string(),
            ));
        }

        for o in &self.order_by {
            if !self.by.contains(&o.field) {
                return Err(DatabaseError::InvalidQuery(format!(
                    "field {:?} in order by must be listed in by",
                    o.field
                )));
            }
        }

        Ok(())
    }

    pub(crate) fn select_columns(&self) -> String {
        self.by
            .iter()
            .map(|f| f.column_name())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub(crate) fn order_by_sql(&self) -> String {
        if self.order_by.is_empty() {
            String::new()
        } else {
            render_order_by(&self.order_by)
        }
    }
}

/// `_count`, `_sum`, `_avg`, `_min` and `_max` of a numeric column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Aggregate {
    pub count: i64,
    pub sum: Option<i64>,
    pub avg: Option<f64>,
    pub min: Option<i64>,
    pub max: Option<i64>,
}

pub(crate) fn aggregate_select(column: &str) -> String {
    format!(
        "SELECT COUNT({c}) AS count, SUM({c}) AS sum, AVG({c}) AS avg, MIN({c}) AS min, MAX({c}) AS max",
        c = column
    )
}
