//! EXPLAIN wrapper.

use super::Statement;
use crate::error::Result;
use crate::render::QueryBuilder;

/// Asks the database for the plan of another statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Explain<S> {
    /// Explained statement.
    pub statement: S,
    /// Execute the statement and report actual costs.
    pub analyze: bool,
    /// Raw vendor options such as `FORMAT JSON`.
    pub options: Option<String>,
}

impl<S: Statement> Explain<S> {
    /// Plain EXPLAIN.
    #[must_use]
    pub const fn new(statement: S) -> Self {
        Self {
            statement,
            analyze: false,
            options: None,
        }
    }

    /// Requests ANALYZE.
    #[must_use]
    pub const fn analyze(mut self) -> Self {
        self.analyze = true;
        self
    }

    /// Sets raw options.
    #[must_use]
    pub fn options(mut self, options: &str) -> Self {
        self.options = Some(String::from(options));
        self
    }
}

impl<S: Statement> Statement for Explain<S> {
    fn render_to(&self, qb: &mut QueryBuilder<'_>) -> Result<()> {
        qb.dialect()
            .statements()
            .explain(self.analyze, self.options.as_deref(), qb)?;
        self.statement.render_to(qb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{H2Dialect, H2Mode, OracleDialect, PostgresDialect, SqlServerDialect, SqliteDialect};
    use crate::statement::Select;

    fn query() -> Select {
        Select::new(vec![]).from("users")
    }

    #[test]
    fn test_explain_forms() {
        assert_eq!(
            Explain::new(query()).to_sql(&PostgresDialect::new()).unwrap(),
            "EXPLAIN SELECT * FROM users"
        );
        assert_eq!(
            Explain::new(query())
                .analyze()
                .options("FORMAT JSON")
                .to_sql(&PostgresDialect::new())
                .unwrap(),
            "EXPLAIN (ANALYZE, FORMAT JSON) SELECT * FROM users"
        );
        assert_eq!(
            Explain::new(query()).to_sql(&OracleDialect::new()).unwrap(),
            "EXPLAIN PLAN FOR SELECT * FROM users"
        );
        assert_eq!(
            Explain::new(query()).to_sql(&SqliteDialect::new()).unwrap(),
            "EXPLAIN QUERY PLAN SELECT * FROM users"
        );
    }

    #[test]
    fn test_explain_restrictions() {
        assert!(Explain::new(query()).analyze().to_sql(&SqliteDialect::new()).is_err());
        assert!(Explain::new(query())
            .options("VERBOSE")
            .to_sql(&H2Dialect::new(H2Mode::Regular))
            .is_err());
        assert!(Explain::new(query()).to_sql(&SqlServerDialect::new()).is_err());
    }
}
