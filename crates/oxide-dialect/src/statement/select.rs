//! SELECT requests.

use super::Statement;
use crate::error::Result;
use crate::expr::{Expr, OrderBy};
use crate::render::QueryBuilder;
use crate::schema::Table;

/// A table in a FROM or JOIN clause.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableRef {
    /// Table name.
    pub name: String,
    /// Optional alias.
    pub alias: Option<String>,
}

impl TableRef {
    /// An unaliased table.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: String::from(name),
            alias: None,
        }
    }

    /// Sets the alias.
    #[must_use]
    pub fn alias(mut self, alias: &str) -> Self {
        self.alias = Some(String::from(alias));
        self
    }

    /// The name other clauses use to refer to this table.
    #[must_use]
    pub fn qualifier(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

impl From<&Table> for TableRef {
    fn from(table: &Table) -> Self {
        Self::new(&table.name)
    }
}

impl From<&str> for TableRef {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Join types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinKind {
    /// `INNER JOIN`
    Inner,
    /// `LEFT JOIN`
    Left,
    /// `RIGHT JOIN`
    Right,
    /// `FULL JOIN`
    Full,
    /// `CROSS JOIN`
    Cross,
}

impl JoinKind {
    /// SQL keywords.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Inner => "INNER JOIN",
            Self::Left => "LEFT JOIN",
            Self::Right => "RIGHT JOIN",
            Self::Full => "FULL JOIN",
            Self::Cross => "CROSS JOIN",
        }
    }
}

/// One JOIN clause.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Join {
    /// Join type.
    pub kind: JoinKind,
    /// Joined table.
    pub table: TableRef,
    /// Join condition; absent for cross joins.
    pub on: Option<Expr>,
}

impl Join {
    /// `INNER JOIN table ON condition`.
    #[must_use]
    pub fn inner(table: impl Into<TableRef>, on: Expr) -> Self {
        Self {
            kind: JoinKind::Inner,
            table: table.into(),
            on: Some(on),
        }
    }

    /// `LEFT JOIN table ON condition`.
    #[must_use]
    pub fn left(table: impl Into<TableRef>, on: Expr) -> Self {
        Self {
            kind: JoinKind::Left,
            table: table.into(),
            on: Some(on),
        }
    }
}

/// A SELECT query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Select {
    /// `SELECT DISTINCT`.
    pub distinct: bool,
    /// Projection; empty means `*`.
    pub columns: Vec<Expr>,
    /// FROM table; absent for constant selects.
    pub from: Option<TableRef>,
    /// Joins.
    pub joins: Vec<Join>,
    /// WHERE predicate.
    pub where_clause: Option<Expr>,
    /// GROUP BY keys.
    pub group_by: Vec<Expr>,
    /// HAVING predicate.
    pub having: Option<Expr>,
    /// ORDER BY items.
    pub order_by: Vec<OrderBy>,
    /// Row limit.
    pub limit: Option<u64>,
    /// Rows skipped.
    pub offset: Option<u64>,
    /// `FOR UPDATE`.
    pub for_update: bool,
}

impl Select {
    /// Selects `columns`; an empty list selects `*`.
    #[must_use]
    pub fn new(columns: Vec<Expr>) -> Self {
        Self {
            columns,
            ..Self::default()
        }
    }

    /// Sets the FROM table.
    #[must_use]
    pub fn from(mut self, table: impl Into<TableRef>) -> Self {
        self.from = Some(table.into());
        self
    }

    /// Adds a join.
    #[must_use]
    pub fn join(mut self, join: Join) -> Self {
        self.joins.push(join);
        self
    }

    /// Adds a WHERE predicate, AND-ed with any existing one.
    #[must_use]
    pub fn filter(mut self, predicate: Expr) -> Self {
        self.where_clause = Some(match self.where_clause.take() {
            Some(existing) => existing.and(predicate),
            None => predicate,
        });
        self
    }

    /// Sets GROUP BY keys.
    #[must_use]
    pub fn group_by(mut self, keys: Vec<Expr>) -> Self {
        self.group_by = keys;
        self
    }

    /// Sets the HAVING predicate.
    #[must_use]
    pub fn having(mut self, predicate: Expr) -> Self {
        self.having = Some(predicate);
        self
    }

    /// Adds an ORDER BY item.
    #[must_use]
    pub fn order_by(mut self, item: OrderBy) -> Self {
        self.order_by.push(item);
        self
    }

    /// Sets the row limit.
    #[must_use]
    pub const fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the number of skipped rows.
    #[must_use]
    pub const fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Selects distinct rows.
    #[must_use]
    pub const fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Locks the selected rows.
    #[must_use]
    pub const fn for_update(mut self) -> Self {
        self.for_update = true;
        self
    }
}

impl Statement for Select {
    fn render_to(&self, qb: &mut QueryBuilder<'_>) -> Result<()> {
        qb.dialect().statements().select(self, qb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{MySqlDialect, OracleDialect, PostgresDialect, SqlServerDialect, SqliteDialect};
    use crate::expr::col;
    use crate::types::ColumnType;

    fn id() -> Expr {
        col("id", ColumnType::integer()).into()
    }

    #[test]
    fn test_limit_offset_per_vendor() {
        let q = Select::new(vec![id()])
            .from("users")
            .order_by(OrderBy::asc(id()))
            .limit(10)
            .offset(20);
        assert_eq!(
            q.to_sql(&PostgresDialect::new()).unwrap(),
            "SELECT id FROM users ORDER BY id ASC LIMIT 10 OFFSET 20"
        );
        assert_eq!(
            q.to_sql(&OracleDialect::new()).unwrap(),
            "SELECT id FROM users ORDER BY id ASC OFFSET 20 ROWS FETCH NEXT 10 ROWS ONLY"
        );
        assert_eq!(
            q.to_sql(&SqlServerDialect::new()).unwrap(),
            "SELECT id FROM users ORDER BY id ASC OFFSET 20 ROWS FETCH NEXT 10 ROWS ONLY"
        );
    }

    #[test]
    fn test_sql_server_injects_order_by() {
        let q = Select::new(vec![id()]).from("users").limit(5);
        assert_eq!(
            q.to_sql(&SqlServerDialect::new()).unwrap(),
            "SELECT id FROM users ORDER BY (SELECT NULL) OFFSET 0 ROWS FETCH NEXT 5 ROWS ONLY"
        );
    }

    #[test]
    fn test_offset_without_limit() {
        let q = Select::new(vec![]).from("users").offset(3);
        assert_eq!(
            q.to_sql(&MySqlDialect::new()).unwrap(),
            "SELECT * FROM users LIMIT 18446744073709551615 OFFSET 3"
        );
        assert_eq!(
            q.to_sql(&SqliteDialect::new()).unwrap(),
            "SELECT * FROM users LIMIT -1 OFFSET 3"
        );
        assert_eq!(
            q.to_sql(&PostgresDialect::new()).unwrap(),
            "SELECT * FROM users OFFSET 3"
        );
    }

    #[test]
    fn test_constant_select_uses_dual_on_oracle() {
        let q = Select::new(vec![crate::expr::raw("1")]);
        assert_eq!(q.to_sql(&OracleDialect::new()).unwrap(), "SELECT 1 FROM DUAL");
        assert_eq!(q.to_sql(&PostgresDialect::new()).unwrap(), "SELECT 1");
    }

    #[test]
    fn test_join_and_filters() {
        let q = Select::new(vec![id()])
            .from(TableRef::new("users").alias("u"))
            .join(Join::inner(
                TableRef::new("posts").alias("p"),
                crate::expr::raw("p.author = u.id"),
            ))
            .filter(col("id", ColumnType::integer()).gt(1))
            .filter(col("id", ColumnType::integer()).lt(9));
        assert_eq!(
            q.to_sql(&PostgresDialect::new()).unwrap(),
            "SELECT id FROM users u INNER JOIN posts p ON p.author = u.id WHERE id > 1 AND id < 9"
        );
    }

    #[test]
    fn test_for_update_is_rejected_on_sqlite() {
        let q = Select::new(vec![id()]).from("users").for_update();
        assert!(q.to_sql(&SqliteDialect::new()).is_err());
        assert_eq!(
            q.to_sql(&PostgresDialect::new()).unwrap(),
            "SELECT id FROM users FOR UPDATE"
        );
    }
}
