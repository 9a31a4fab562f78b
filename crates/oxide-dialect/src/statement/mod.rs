//! DML request types.
//!
//! These are plain descriptions of a statement. Rendering goes through the
//! active dialect's [`StatementProvider`](crate::dialect::StatementProvider),
//! so the same request produces vendor-specific SQL.

mod explain;
mod insert;
mod merge;
mod select;
mod update;

pub use explain::Explain;
pub use insert::{Insert, InsertSource, OnConflict, Replace, Upsert};
pub use merge::{Merge, MergeAction, MergeClause, MergeSource, MergeWhen};
pub use select::{Join, JoinKind, Select, TableRef};
pub use update::{Delete, Update};

use tracing::debug;

use crate::dialect::Dialect;
use crate::error::{DialectError, Result};
use crate::expr::Expr;
use crate::render::{PreparedStatement, QueryBuilder};
use crate::schema::Table;
use crate::value::SqlValue;

/// A renderable statement.
pub trait Statement {
    /// Renders into an existing context.
    ///
    /// # Errors
    ///
    /// `Unsupported` when the dialect cannot express the statement,
    /// `Validation` when the request is self-contradictory.
    fn render_to(&self, qb: &mut QueryBuilder<'_>) -> Result<()>;

    /// Renders with placeholders.
    ///
    /// # Errors
    ///
    /// See [`Statement::render_to`].
    fn prepare(&self, dialect: &dyn Dialect) -> Result<PreparedStatement> {
        let mut qb = QueryBuilder::prepared(dialect);
        self.render_to(&mut qb)?;
        let prepared = qb.finish();
        debug!(
            dialect = dialect.name(),
            sql = %prepared.sql,
            arguments = prepared.arguments.len(),
            "prepared statement"
        );
        Ok(prepared)
    }

    /// Renders with inlined literals.
    ///
    /// # Errors
    ///
    /// See [`Statement::render_to`].
    fn to_sql(&self, dialect: &dyn Dialect) -> Result<String> {
        let mut qb = QueryBuilder::inline(dialect);
        self.render_to(&mut qb)?;
        let sql = qb.finish().sql;
        debug!(dialect = dialect.name(), sql = %sql, "rendered statement");
        Ok(sql)
    }
}

/// Binds a row of values through the declared types of `columns`.
fn typed_row(table: &Table, columns: &[String], values: Vec<SqlValue>) -> Result<Vec<Expr>> {
    if values.len() != columns.len() {
        return Err(DialectError::validation(format!(
            "row for '{}' has {} values for {} columns",
            table.name,
            values.len(),
            columns.len()
        )));
    }
    columns
        .iter()
        .zip(values)
        .map(|(name, value)| {
            let column = known_column(table, name)?;
            Ok(Expr::Value {
                value,
                ty: column.ty.clone(),
            })
        })
        .collect()
}

fn known_column<'t>(table: &'t Table, name: &str) -> Result<&'t crate::schema::Column> {
    table.get(name).ok_or_else(|| {
        DialectError::validation(format!(
            "column '{name}' does not belong to table '{}'",
            table.name
        ))
    })
}

fn column_list(table: &Table, columns: &[&str]) -> Result<Vec<String>> {
    columns
        .iter()
        .map(|c| known_column(table, c).map(|col| col.name.clone()))
        .collect()
}
