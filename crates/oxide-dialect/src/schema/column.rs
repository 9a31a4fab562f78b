//! Column model.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::sequence::Sequence;
use crate::dialect::Dialect;
use crate::error::Result;
use crate::expr::{ColumnRef, Expr};
use crate::render::QueryBuilder;
use crate::types::ColumnType;
use crate::value::{SqlValue, ToSqlValue};

/// Foreign-key reference actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReferenceAction {
    /// `CASCADE`
    Cascade,
    /// `SET NULL`
    SetNull,
    /// `RESTRICT`
    Restrict,
    /// `NO ACTION`
    NoAction,
    /// `SET DEFAULT`
    SetDefault,
}

impl ReferenceAction {
    /// SQL keywords.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::Restrict => "RESTRICT",
            Self::NoAction => "NO ACTION",
            Self::SetDefault => "SET DEFAULT",
        }
    }
}

impl fmt::Display for ReferenceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// A column's default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnDefault {
    /// A value rendered as a literal in DDL.
    Literal(SqlValue),
    /// An expression rendered verbatim in DDL.
    Expression(Expr),
    /// Computed by the client at insert time; never part of DDL.
    ClientSide,
}

/// Reference from a column to another table's column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// Target table.
    pub table: String,
    /// Target column.
    pub column: String,
    /// `ON UPDATE` action.
    pub on_update: Option<ReferenceAction>,
    /// `ON DELETE` action.
    pub on_delete: Option<ReferenceAction>,
    /// Explicit constraint name.
    pub name: Option<String>,
}

/// A column of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Owning table name.
    pub table: String,
    /// Column name.
    pub name: String,
    /// Column type; its nullability is the column's nullability.
    pub ty: ColumnType,
    /// Default value.
    pub default: Option<ColumnDefault>,
    /// Foreign-key reference.
    pub references: Option<Reference>,
    /// Column comment.
    pub comment: Option<String>,
    /// Raw vendor-specific text appended to the definition.
    pub suffix: Option<String>,
}

impl Column {
    /// Creates a column; the owning table is set when it is added.
    #[must_use]
    pub fn new(name: &str, ty: ColumnType) -> Self {
        Self {
            table: String::new(),
            name: String::from(name),
            ty,
            default: None,
            references: None,
            comment: None,
            suffix: None,
        }
    }

    /// Whether NULL is allowed.
    #[must_use]
    pub const fn is_nullable(&self) -> bool {
        self.ty.nullable
    }

    /// Makes the column nullable by rewriting its type.
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.ty = self.ty.nullable();
        self
    }

    /// Wraps the column type in auto-increment.
    #[must_use]
    pub fn auto_increment(mut self) -> Self {
        self.ty = self.ty.auto_increment();
        self
    }

    /// Wraps the column type in auto-increment backed by a named sequence.
    #[must_use]
    pub fn auto_increment_with_sequence(mut self, sequence: &str) -> Self {
        self.ty = self.ty.auto_increment_with_sequence(sequence);
        self
    }

    /// Sets a literal default.
    #[must_use]
    pub fn default_value<T: ToSqlValue>(mut self, value: T) -> Self {
        self.default = Some(ColumnDefault::Literal(value.to_sql_value()));
        self
    }

    /// Sets an expression default.
    #[must_use]
    pub fn default_expression(mut self, expr: Expr) -> Self {
        self.default = Some(ColumnDefault::Expression(expr));
        self
    }

    /// Marks the default as computed by the client.
    #[must_use]
    pub fn client_default(mut self) -> Self {
        self.default = Some(ColumnDefault::ClientSide);
        self
    }

    /// Adds a foreign-key reference.
    #[must_use]
    pub fn references(mut self, table: &str, column: &str) -> Self {
        self.references = Some(Reference {
            table: String::from(table),
            column: String::from(column),
            on_update: None,
            on_delete: None,
            name: None,
        });
        self
    }

    /// Sets the `ON DELETE` action of the reference.
    #[must_use]
    pub fn on_delete(mut self, action: ReferenceAction) -> Self {
        if let Some(r) = &mut self.references {
            r.on_delete = Some(action);
        }
        self
    }

    /// Sets the `ON UPDATE` action of the reference.
    #[must_use]
    pub fn on_update(mut self, action: ReferenceAction) -> Self {
        if let Some(r) = &mut self.references {
            r.on_update = Some(action);
        }
        self
    }

    /// Sets the constraint name of the reference.
    #[must_use]
    pub fn reference_name(mut self, name: &str) -> Self {
        if let Some(r) = &mut self.references {
            r.name = Some(String::from(name));
        }
        self
    }

    /// Sets the comment.
    #[must_use]
    pub fn comment(mut self, comment: &str) -> Self {
        self.comment = Some(String::from(comment));
        self
    }

    /// Sets a raw definition suffix.
    #[must_use]
    pub fn suffix(mut self, suffix: &str) -> Self {
        self.suffix = Some(String::from(suffix));
        self
    }

    /// An unqualified typed reference for use in expressions; call
    /// [`ColumnRef::qualified`] when a statement joins several tables.
    #[must_use]
    pub fn to_ref(&self) -> ColumnRef {
        ColumnRef {
            table: None,
            name: self.name.clone(),
            ty: self.ty.clone(),
        }
    }

    /// The sequence backing this column's auto-increment under `dialect`.
    #[must_use]
    pub fn auto_inc_sequence(&self, dialect: &dyn Dialect) -> Option<Sequence> {
        if !self.ty.uses_sequence(dialect) {
            return None;
        }
        let name = self
            .ty
            .explicit_sequence()
            .map_or_else(|| format!("{}_{}_seq", self.table, self.name), String::from);
        Some(Sequence::auto_increment(&name))
    }

    /// The default as it appears in DDL, or `None` when there is none.
    ///
    /// # Errors
    ///
    /// Fails when a literal default does not fit the column type.
    pub fn default_sql(&self, dialect: &dyn Dialect) -> Result<Option<String>> {
        let tn = dialect.type_names();
        match &self.default {
            None | Some(ColumnDefault::ClientSide) => Ok(None),
            Some(ColumnDefault::Literal(value)) => {
                let literal = self.ty.value_to_literal(value, dialect)?;
                Ok(Some(tn.format_default(&literal, true)))
            }
            Some(ColumnDefault::Expression(expr)) => {
                let mut qb = QueryBuilder::inline(dialect);
                expr.render(&mut qb)?;
                let rendered = qb.finish().sql;
                let is_literal = matches!(expr, Expr::Literal { .. } | Expr::Value { .. } | Expr::Null);
                Ok(Some(tn.format_default(&rendered, is_literal)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{MySqlDialect, OracleDialect, PostgresDialect};
    use crate::expr::raw;

    #[test]
    fn test_nullable_rewrites_type() {
        let c = Column::new("bio", ColumnType::text()).nullable();
        assert!(c.is_nullable());
        assert!(c.ty.nullable);
    }

    #[test]
    fn test_default_sequence_name() {
        let mut c = Column::new("id", ColumnType::integer()).auto_increment();
        c.table = String::from("users");
        assert!(c.auto_inc_sequence(&PostgresDialect::new()).is_none());
        let seq = c.auto_inc_sequence(&OracleDialect::new()).unwrap();
        assert_eq!(seq.name, "users_id_seq");
    }

    #[test]
    fn test_expression_default_is_wrapped_on_mysql() {
        let c = Column::new("created", ColumnType::timestamp()).default_expression(raw("NOW()"));
        assert_eq!(
            c.default_sql(&MySqlDialect::new()).unwrap().as_deref(),
            Some("(NOW())")
        );
        assert_eq!(
            c.default_sql(&PostgresDialect::new()).unwrap().as_deref(),
            Some("NOW()")
        );
    }

    #[test]
    fn test_client_default_is_not_rendered() {
        let c = Column::new("token", ColumnType::uuid()).client_default();
        assert_eq!(c.default_sql(&PostgresDialect::new()).unwrap(), None);
    }
}
