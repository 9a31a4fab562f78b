//! UPDATE and DELETE requests.

use super::{Join, Statement, TableRef};
use crate::error::Result;
use crate::expr::{ColumnRef, Expr};
use crate::render::QueryBuilder;
use crate::value::ToSqlValue;

/// An UPDATE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update {
    /// Updated table.
    pub table: TableRef,
    /// `column = expr` assignments.
    pub set: Vec<(String, Expr)>,
    /// Joined tables providing extra rows to match against.
    pub joins: Vec<Join>,
    /// WHERE predicate.
    pub where_clause: Option<Expr>,
    /// Maximum number of updated rows.
    pub limit: Option<u64>,
    /// RETURNING projection.
    pub returning: Vec<Expr>,
}

impl Update {
    /// An update of `table` with no assignments yet.
    #[must_use]
    pub fn table(table: impl Into<TableRef>) -> Self {
        Self {
            table: table.into(),
            set: Vec::new(),
            joins: Vec::new(),
            where_clause: None,
            limit: None,
            returning: Vec::new(),
        }
    }

    /// Assigns an expression.
    #[must_use]
    pub fn set(mut self, column: &str, expr: Expr) -> Self {
        self.set.push((String::from(column), expr));
        self
    }

    /// Assigns a value bound through the column's type.
    #[must_use]
    pub fn set_value<T: ToSqlValue>(mut self, column: &ColumnRef, value: T) -> Self {
        self.set.push((column.name.clone(), column.bind(value)));
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

    /// Limits the number of updated rows.
    #[must_use]
    pub const fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the RETURNING projection.
    #[must_use]
    pub fn returning(mut self, exprs: Vec<Expr>) -> Self {
        self.returning = exprs;
        self
    }
}

impl Statement for Update {
    fn render_to(&self, qb: &mut QueryBuilder<'_>) -> Result<()> {
        qb.dialect().statements().update(self, qb)
    }
}

/// A DELETE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delete {
    /// Table rows are deleted from.
    pub table: TableRef,
    /// Joined tables restricting the deleted rows.
    pub joins: Vec<Join>,
    /// WHERE predicate.
    pub where_clause: Option<Expr>,
    /// Maximum number of deleted rows.
    pub limit: Option<u64>,
    /// RETURNING projection.
    pub returning: Vec<Expr>,
}

impl Delete {
    /// A delete of every row of `table`.
    #[must_use]
    pub fn from(table: impl Into<TableRef>) -> Self {
        Self {
            table: table.into(),
            joins: Vec::new(),
            where_clause: None,
            limit: None,
            returning: Vec::new(),
        }
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

    /// Limits the number of deleted rows.
    #[must_use]
    pub const fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the RETURNING projection.
    #[must_use]
    pub fn returning(mut self, exprs: Vec<Expr>) -> Self {
        self.returning = exprs;
        self
    }
}

impl Statement for Delete {
    fn render_to(&self, qb: &mut QueryBuilder<'_>) -> Result<()> {
        qb.dialect().statements().delete(self, qb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{
        H2Dialect, H2Mode, MySqlDialect, OracleDialect, PostgresDialect, SqlServerDialect,
        SqliteDialect,
    };
    use crate::error::DialectError;
    use crate::expr::{col, raw};
    use crate::types::ColumnType;

    fn name() -> ColumnRef {
        col("name", ColumnType::varchar(50))
    }

    fn id() -> ColumnRef {
        col("id", ColumnType::integer())
    }

    #[test]
    fn test_update_with_limit() {
        let u = Update::table("users")
            .set_value(&name(), "x")
            .filter(id().gt(3))
            .limit(1);
        assert_eq!(
            u.to_sql(&MySqlDialect::new()).unwrap(),
            "UPDATE users SET name = 'x' WHERE id > 3 LIMIT 1"
        );
        assert_eq!(
            u.to_sql(&SqlServerDialect::new()).unwrap(),
            "UPDATE TOP(1) users SET name = 'x' WHERE id > 3"
        );
        assert_eq!(
            u.to_sql(&OracleDialect::new()).unwrap(),
            "UPDATE users SET name = 'x' WHERE id > 3 AND ROWNUM <= 1"
        );
        assert!(matches!(
            u.to_sql(&PostgresDialect::new()).unwrap_err(),
            DialectError::Unsupported { .. }
        ));
    }

    #[test]
    fn test_update_with_join() {
        let u = Update::table("users")
            .join(Join::inner("posts", raw("posts.author = users.id")))
            .set("name", raw("posts.title"))
            .filter(raw("posts.id = 1"));
        assert_eq!(
            u.to_sql(&MySqlDialect::new()).unwrap(),
            "UPDATE users INNER JOIN posts ON posts.author = users.id SET name = posts.title WHERE posts.id = 1"
        );
        assert_eq!(
            u.to_sql(&PostgresDialect::new()).unwrap(),
            "UPDATE users SET name = posts.title FROM posts WHERE posts.author = users.id AND posts.id = 1"
        );
        assert_eq!(
            u.to_sql(&SqlServerDialect::new()).unwrap(),
            "UPDATE users SET name = posts.title FROM users INNER JOIN posts ON posts.author = users.id WHERE posts.id = 1"
        );
        assert!(u.to_sql(&OracleDialect::new()).is_err());
        assert!(u.to_sql(&H2Dialect::new(H2Mode::Regular)).is_err());
    }

    #[test]
    fn test_join_update_with_two_partners_is_ambiguous_on_postgres() {
        let u = Update::table("users")
            .join(Join::inner("posts", raw("posts.author = users.id")))
            .join(Join::inner("tags", raw("tags.post = posts.id")))
            .set("name", raw("tags.label"));
        assert!(matches!(
            u.to_sql(&PostgresDialect::new()).unwrap_err(),
            DialectError::Validation(_)
        ));
    }

    #[test]
    fn test_delete_forms() {
        let d = Delete::from("users").filter(id().eq(1));
        assert_eq!(
            d.to_sql(&PostgresDialect::new()).unwrap(),
            "DELETE FROM users WHERE id = 1"
        );
        let limited = Delete::from("users").limit(10);
        assert_eq!(
            limited.to_sql(&SqliteDialect::new()).unwrap(),
            "DELETE FROM users LIMIT 10"
        );
        assert_eq!(
            limited.to_sql(&SqlServerDialect::new()).unwrap(),
            "DELETE TOP(10) FROM users"
        );
        assert_eq!(
            limited.to_sql(&OracleDialect::new()).unwrap(),
            "DELETE FROM users WHERE ROWNUM <= 10"
        );
    }

    #[test]
    fn test_delete_with_join() {
        let d = Delete::from("users")
            .join(Join::inner("bans", raw("bans.user_id = users.id")));
        assert_eq!(
            d.to_sql(&MySqlDialect::new()).unwrap(),
            "DELETE users FROM users INNER JOIN bans ON bans.user_id = users.id"
        );
        assert_eq!(
            d.to_sql(&PostgresDialect::new()).unwrap(),
            "DELETE FROM users USING bans WHERE bans.user_id = users.id"
        );
        assert!(d.to_sql(&SqliteDialect::new()).is_err());
    }

    #[test]
    fn test_returning_is_capability_gated() {
        let d = Delete::from("users").returning(vec![id().into()]);
        assert_eq!(
            d.to_sql(&PostgresDialect::new()).unwrap(),
            "DELETE FROM users RETURNING id"
        );
        assert_eq!(
            d.to_sql(&MySqlDialect::mariadb()).unwrap(),
            "DELETE FROM users RETURNING id"
        );
        assert!(d.to_sql(&MySqlDialect::new()).is_err());
    }
}
