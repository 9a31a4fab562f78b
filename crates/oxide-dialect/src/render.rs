//! The render context.
//!
//! A [`QueryBuilder`] accumulates SQL text for one statement. In prepared
//! mode every bound value becomes a placeholder and is appended to the
//! argument list; otherwise values are inlined as literals.

use crate::dialect::Dialect;
use crate::error::Result;
use crate::expr::Expr;
use crate::types::ColumnType;
use crate::value::SqlValue;

/// A bound parameter: the column type it was rendered through and the
/// driver-ready value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    /// Column type used to convert the value.
    pub ty: ColumnType,
    /// Value handed to the driver.
    pub value: SqlValue,
}

/// Finished statement text plus its ordered bindings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedStatement {
    /// SQL text.
    pub sql: String,
    /// Bindings in placeholder order.
    pub arguments: Vec<Argument>,
}

impl PreparedStatement {
    /// Returns just the bound values.
    #[must_use]
    pub fn values(&self) -> Vec<SqlValue> {
        self.arguments.iter().map(|a| a.value.clone()).collect()
    }
}

/// Single-use accumulator that turns AST nodes into SQL text.
#[derive(Debug)]
pub struct QueryBuilder<'d> {
    dialect: &'d dyn Dialect,
    prepared: bool,
    sql: String,
    arguments: Vec<Argument>,
}

impl<'d> QueryBuilder<'d> {
    /// Creates a render context.
    #[must_use]
    pub fn new(dialect: &'d dyn Dialect, prepared: bool) -> Self {
        Self {
            dialect,
            prepared,
            sql: String::new(),
            arguments: Vec::new(),
        }
    }

    /// Creates a context that emits placeholders.
    #[must_use]
    pub fn prepared(dialect: &'d dyn Dialect) -> Self {
        Self::new(dialect, true)
    }

    /// Creates a context that inlines literals.
    #[must_use]
    pub fn inline(dialect: &'d dyn Dialect) -> Self {
        Self::new(dialect, false)
    }

    /// The dialect this context renders for.
    #[must_use]
    pub fn dialect(&self) -> &'d dyn Dialect {
        self.dialect
    }

    /// Whether values become placeholders.
    #[must_use]
    pub const fn is_prepared(&self) -> bool {
        self.prepared
    }

    /// SQL text rendered so far.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Bindings registered so far.
    #[must_use]
    pub fn arguments(&self) -> &[Argument] {
        &self.arguments
    }

    /// Appends raw text.
    pub fn push(&mut self, text: &str) -> &mut Self {
        self.sql.push_str(text);
        self
    }

    /// Appends a single character.
    pub fn push_char(&mut self, c: char) -> &mut Self {
        self.sql.push(c);
        self
    }

    /// Appends an identifier, quoted if the dialect requires it.
    pub fn push_identifier(&mut self, name: &str) -> &mut Self {
        let quoted = self.dialect.quote_identifier(name);
        self.sql.push_str(&quoted);
        self
    }

    /// Appends `table.name` or `name`.
    pub fn push_qualified(&mut self, table: Option<&str>, name: &str) -> &mut Self {
        if let Some(table) = table {
            self.push_identifier(table);
            self.sql.push('.');
        }
        self.push_identifier(name)
    }

    /// Appends a comma-separated list of identifiers.
    pub fn push_identifiers<S: AsRef<str>>(&mut self, names: &[S]) -> &mut Self {
        for (i, name) in names.iter().enumerate() {
            if i > 0 {
                self.sql.push_str(", ");
            }
            self.push_identifier(name.as_ref());
        }
        self
    }

    /// Registers one value, either as a placeholder or as an inline literal.
    ///
    /// # Errors
    ///
    /// Fails when the value does not fit `ty`.
    pub fn register_argument(&mut self, ty: &ColumnType, value: &SqlValue) -> Result<()> {
        if self.prepared {
            let value = ty.to_parameter(value, self.dialect)?;
            self.arguments.push(Argument {
                ty: ty.clone(),
                value,
            });
            let placeholder = self
                .dialect
                .capabilities()
                .param_style
                .placeholder(self.arguments.len());
            self.sql.push_str(&placeholder);
        } else {
            let literal = ty.value_to_literal(value, self.dialect)?;
            self.sql.push_str(&literal);
        }
        Ok(())
    }

    /// Registers a collection of values separated by `, `.
    ///
    /// Values are registered in the order of their rendered literal text, not
    /// in the order given.
    ///
    /// # Errors
    ///
    /// Fails when any value does not fit `ty`.
    pub fn register_arguments(&mut self, ty: &ColumnType, values: &[SqlValue]) -> Result<()> {
        let mut keyed = values
            .iter()
            .map(|v| Ok((ty.value_to_literal(v, self.dialect)?, v)))
            .collect::<Result<Vec<_>>>()?;
        keyed.sort_by(|a, b| a.0.cmp(&b.0));
        for (i, (_, value)) in keyed.into_iter().enumerate() {
            if i > 0 {
                self.sql.push_str(", ");
            }
            self.register_argument(ty, value)?;
        }
        Ok(())
    }

    /// Renders an expression.
    ///
    /// # Errors
    ///
    /// Propagates rendering failures.
    pub fn render(&mut self, expr: &Expr) -> Result<()> {
        expr.render(self)
    }

    /// Renders expressions separated by `separator`.
    ///
    /// # Errors
    ///
    /// Propagates rendering failures.
    pub fn render_list(&mut self, exprs: &[Expr], separator: &str) -> Result<()> {
        for (i, expr) in exprs.iter().enumerate() {
            if i > 0 {
                self.sql.push_str(separator);
            }
            expr.render(self)?;
        }
        Ok(())
    }

    /// Renders an expression into a detached string while still registering
    /// its arguments on this context.
    ///
    /// # Errors
    ///
    /// Propagates rendering failures.
    pub fn render_detached(&mut self, expr: &Expr) -> Result<String> {
        let saved = std::mem::take(&mut self.sql);
        let result = expr.render(self);
        let rendered = std::mem::replace(&mut self.sql, saved);
        result.map(|()| rendered)
    }

    /// Consumes the context.
    #[must_use]
    pub fn finish(self) -> PreparedStatement {
        PreparedStatement {
            sql: self.sql,
            arguments: self.arguments,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{MySqlDialect, OracleDialect, PostgresDialect, SqlServerDialect};

    #[test]
    fn test_placeholder_styles() {
        let ty = ColumnType::integer();
        let values = [SqlValue::Int(1), SqlValue::Int(2)];

        let pg = PostgresDialect::new();
        let mut qb = QueryBuilder::prepared(&pg);
        qb.register_arguments(&ty, &values).unwrap();
        assert_eq!(qb.sql(), "$1, $2");

        let mysql = MySqlDialect::new();
        let mut qb = QueryBuilder::prepared(&mysql);
        qb.register_arguments(&ty, &values).unwrap();
        assert_eq!(qb.sql(), "?, ?");

        let mssql = SqlServerDialect::new();
        let mut qb = QueryBuilder::prepared(&mssql);
        qb.register_arguments(&ty, &values).unwrap();
        assert_eq!(qb.sql(), "@P1, @P2");

        let oracle = OracleDialect::new();
        let mut qb = QueryBuilder::prepared(&oracle);
        qb.register_arguments(&ty, &values).unwrap();
        assert_eq!(qb.sql(), ":1, :2");
    }

    #[test]
    fn test_collection_registration_is_sorted_by_literal_text() {
        let pg = PostgresDialect::new();
        let ty = ColumnType::integer();
        let values = [SqlValue::Int(3), SqlValue::Int(10), SqlValue::Int(2)];
        let mut qb = QueryBuilder::prepared(&pg);
        qb.register_arguments(&ty, &values).unwrap();
        let stmt = qb.finish();
        // "10" < "2" < "3" as text.
        assert_eq!(
            stmt.values(),
            vec![SqlValue::Int(10), SqlValue::Int(2), SqlValue::Int(3)]
        );
    }

    #[test]
    fn test_inline_mode_writes_literals() {
        let pg = PostgresDialect::new();
        let mut qb = QueryBuilder::inline(&pg);
        qb.register_argument(&ColumnType::text(), &SqlValue::Text(String::from("o'k")))
            .unwrap();
        let stmt = qb.finish();
        assert_eq!(stmt.sql, "'o''k'");
        assert!(stmt.arguments.is_empty());
    }

    #[test]
    fn test_identifiers_are_quoted_only_when_needed() {
        let pg = PostgresDialect::new();
        let mut qb = QueryBuilder::inline(&pg);
        qb.push_identifiers(&["id", "user", "FirstName"]);
        assert_eq!(qb.sql(), "id, \"user\", \"FirstName\"");

        let mysql = MySqlDialect::new();
        let mut qb = QueryBuilder::inline(&mysql);
        qb.push_identifier("order");
        assert_eq!(qb.sql(), "`order`");
    }
}
