//! Expression AST.
//!
//! Every node renders itself into a [`QueryBuilder`] and has no other side
//! effect. Equality and hashing are structural over the tree and never
//! depend on rendered text.

mod function;
mod ops;

pub use function::{DatePart, Function, StatFunction};
pub use ops::{and_all, col, or_all, raw, value};

use crate::dialect::Dialect;
use crate::error::Result;
use crate::render::{PreparedStatement, QueryBuilder};
use crate::statement::Select;
use crate::types::ColumnType;
use crate::value::SqlValue;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortOrder {
    /// Ascending.
    #[default]
    Asc,
    /// Descending.
    Desc,
}

impl SortOrder {
    /// SQL keyword.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Placement of NULLs in an ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NullsOrder {
    /// `NULLS FIRST`.
    First,
    /// `NULLS LAST`.
    Last,
}

impl NullsOrder {
    /// SQL keywords.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::First => "NULLS FIRST",
            Self::Last => "NULLS LAST",
        }
    }
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    /// `=`
    Eq,
    /// `<>`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,
}

impl CompareOp {
    /// SQL operator.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "<>",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
        }
    }
}

/// Arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Mod,
}

impl ArithOp {
    /// SQL operator.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
        }
    }
}

/// A typed column reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    /// Optional table qualifier.
    pub table: Option<String>,
    /// Column name.
    pub name: String,
    /// Column type, used to convert values compared against it.
    pub ty: ColumnType,
}

/// One `ORDER BY` item.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrderBy {
    /// Sort key.
    pub expr: Expr,
    /// Direction.
    pub order: SortOrder,
    /// Null placement.
    pub nulls: Option<NullsOrder>,
}

impl OrderBy {
    /// Ascending order on `expr`.
    #[must_use]
    pub const fn asc(expr: Expr) -> Self {
        Self {
            expr,
            order: SortOrder::Asc,
            nulls: None,
        }
    }

    /// Descending order on `expr`.
    #[must_use]
    pub const fn desc(expr: Expr) -> Self {
        Self {
            expr,
            order: SortOrder::Desc,
            nulls: None,
        }
    }

    /// Sets the null placement.
    #[must_use]
    pub const fn nulls(mut self, nulls: NullsOrder) -> Self {
        self.nulls = Some(nulls);
        self
    }

    /// Renders this item through the dialect's ordering rules.
    ///
    /// # Errors
    ///
    /// Propagates rendering failures.
    pub fn render(&self, qb: &mut QueryBuilder<'_>) -> Result<()> {
        let expr = qb.render_detached(&self.expr)?;
        let dialect = qb.dialect();
        let text = dialect.type_names().order_by(&expr, self.order, self.nulls);
        qb.push(&text);
        Ok(())
    }
}

/// SQL expression tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    /// Column reference.
    Column(ColumnRef),
    /// A value bound through a column type (placeholder in prepared mode).
    Value {
        /// The value.
        value: SqlValue,
        /// Type used for conversion.
        ty: ColumnType,
    },
    /// A value always inlined as a literal.
    Literal {
        /// The value.
        value: SqlValue,
        /// Type used for conversion.
        ty: ColumnType,
    },
    /// Raw SQL fragment.
    Raw(String),
    /// Boolean constant used as a predicate.
    Constant(bool),
    /// `NULL`.
    Null,
    /// Binary comparison.
    Compare {
        /// Left operand.
        left: Box<Expr>,
        /// Operator.
        op: CompareOp,
        /// Right operand.
        right: Box<Expr>,
    },
    /// Flattened conjunction.
    And(Vec<Expr>),
    /// Flattened disjunction.
    Or(Vec<Expr>),
    /// Negation.
    Not(Box<Expr>),
    /// `IS [NOT] NULL`.
    IsNull {
        /// Operand.
        expr: Box<Expr>,
        /// `IS NOT NULL` when set.
        negated: bool,
    },
    /// `[NOT] IN (...)` over a value collection.
    InList {
        /// Operand.
        expr: Box<Expr>,
        /// Candidate values.
        values: Vec<SqlValue>,
        /// Type used to convert the values.
        ty: ColumnType,
        /// `NOT IN` when set.
        negated: bool,
    },
    /// `[NOT] BETWEEN low AND high`.
    Between {
        /// Operand.
        expr: Box<Expr>,
        /// Lower bound.
        low: Box<Expr>,
        /// Upper bound.
        high: Box<Expr>,
        /// `NOT BETWEEN` when set.
        negated: bool,
    },
    /// `[NOT] LIKE pattern [ESCAPE 'c']`.
    Like {
        /// Operand.
        expr: Box<Expr>,
        /// Pattern.
        pattern: Box<Expr>,
        /// Escape character.
        escape: Option<char>,
        /// `NOT LIKE` when set.
        negated: bool,
    },
    /// Regular-expression match.
    Regexp {
        /// Operand.
        expr: Box<Expr>,
        /// Pattern.
        pattern: Box<Expr>,
        /// Case-sensitive match.
        case_sensitive: bool,
    },
    /// Binary arithmetic.
    Arithmetic {
        /// Left operand.
        left: Box<Expr>,
        /// Operator.
        op: ArithOp,
        /// Right operand.
        right: Box<Expr>,
    },
    /// Scalar or aggregate function call.
    Function(Box<Function>),
    /// `CASE [operand] WHEN .. THEN .. [ELSE ..] END`.
    Case {
        /// Simple-case operand.
        operand: Option<Box<Expr>>,
        /// `(WHEN, THEN)` pairs.
        branches: Vec<(Expr, Expr)>,
        /// `ELSE` branch.
        otherwise: Option<Box<Expr>>,
    },
    /// `COALESCE(...)`.
    Coalesce(Vec<Expr>),
    /// `CAST(expr AS type)`.
    Cast {
        /// Operand.
        expr: Box<Expr>,
        /// Target type.
        ty: ColumnType,
    },
    /// The value proposed for insertion in an upsert (`EXCLUDED.col` and
    /// vendor equivalents).
    Excluded(String),
    /// Scalar sub-select.
    Subquery(Box<Select>),
}

impl Expr {
    /// Renders this node.
    ///
    /// # Errors
    ///
    /// Returns `Unsupported` when the dialect cannot express a node and
    /// `InvalidValue` when a value does not fit its type.
    pub fn render(&self, qb: &mut QueryBuilder<'_>) -> Result<()> {
        let dialect = qb.dialect();
        match self {
            Self::Column(c) => {
                qb.push_qualified(c.table.as_deref(), &c.name);
            }
            Self::Value { value, ty } => qb.register_argument(ty, value)?,
            Self::Literal { value, ty } => {
                let literal = ty.value_to_literal(value, dialect)?;
                qb.push(&literal);
            }
            Self::Raw(sql) => {
                qb.push(sql);
            }
            Self::Constant(b) => {
                qb.push(&dialect.type_names().boolean_condition(*b));
            }
            Self::Null => {
                qb.push("NULL");
            }
            Self::Compare { left, op, right } => {
                left.render_operand(qb)?;
                qb.push(" ").push(op.as_sql()).push(" ");
                right.render_operand(qb)?;
            }
            Self::And(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        qb.push(" AND ");
                    }
                    if matches!(item, Self::Or(_)) {
                        item.render_wrapped(qb)?;
                    } else {
                        item.render(qb)?;
                    }
                }
            }
            Self::Or(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        qb.push(" OR ");
                    }
                    item.render(qb)?;
                }
            }
            Self::Not(inner) => {
                qb.push("NOT ");
                inner.render_wrapped(qb)?;
            }
            Self::IsNull { expr, negated } => {
                expr.render_operand(qb)?;
                qb.push(if *negated { " IS NOT NULL" } else { " IS NULL" });
            }
            Self::InList {
                expr,
                values,
                ty,
                negated,
            } => render_in_list(expr, values, ty, *negated, qb)?,
            Self::Between {
                expr,
                low,
                high,
                negated,
            } => {
                expr.render_operand(qb)?;
                qb.push(if *negated { " NOT BETWEEN " } else { " BETWEEN " });
                low.render_operand(qb)?;
                qb.push(" AND ");
                high.render_operand(qb)?;
            }
            Self::Like {
                expr,
                pattern,
                escape,
                negated,
            } => {
                expr.render_operand(qb)?;
                qb.push(if *negated { " NOT LIKE " } else { " LIKE " });
                pattern.render_operand(qb)?;
                if let Some(c) = escape {
                    let escape = dialect.type_names().quote_string(&c.to_string());
                    qb.push(" ESCAPE ").push(&escape);
                }
            }
            Self::Regexp {
                expr,
                pattern,
                case_sensitive,
            } => dialect
                .statements()
                .regexp(expr, pattern, *case_sensitive, qb)?,
            Self::Arithmetic { left, op, right } => {
                left.render_operand(qb)?;
                qb.push(" ").push(op.as_sql()).push(" ");
                right.render_operand(qb)?;
            }
            Self::Function(f) => f.render(qb)?,
            Self::Case {
                operand,
                branches,
                otherwise,
            } => {
                qb.push("CASE");
                if let Some(operand) = operand {
                    qb.push(" ");
                    operand.render_operand(qb)?;
                }
                for (when, then) in branches {
                    qb.push(" WHEN ");
                    when.render(qb)?;
                    qb.push(" THEN ");
                    then.render(qb)?;
                }
                if let Some(otherwise) = otherwise {
                    qb.push(" ELSE ");
                    otherwise.render(qb)?;
                }
                qb.push(" END");
            }
            Self::Coalesce(items) => {
                qb.push("COALESCE(");
                qb.render_list(items, ", ")?;
                qb.push(")");
            }
            Self::Cast { expr, ty } => dialect.statements().cast(expr, ty, qb)?,
            Self::Excluded(column) => dialect.statements().excluded_column(column, qb)?,
            Self::Subquery(select) => {
                qb.push("(");
                dialect.statements().select(select, qb)?;
                qb.push(")");
            }
        }
        Ok(())
    }

    /// Renders with surrounding parentheses.
    fn render_wrapped(&self, qb: &mut QueryBuilder<'_>) -> Result<()> {
        if self.is_compound() {
            qb.push("(");
            self.render(qb)?;
            qb.push(")");
            Ok(())
        } else {
            self.render(qb)
        }
    }

    /// Renders as the operand of another operator.
    fn render_operand(&self, qb: &mut QueryBuilder<'_>) -> Result<()> {
        self.render_wrapped(qb)
    }

    const fn is_compound(&self) -> bool {
        matches!(
            self,
            Self::And(_)
                | Self::Or(_)
                | Self::Not(_)
                | Self::Compare { .. }
                | Self::IsNull { .. }
                | Self::InList { .. }
                | Self::Between { .. }
                | Self::Like { .. }
                | Self::Regexp { .. }
                | Self::Arithmetic { .. }
        )
    }

    /// Renders with inlined literals.
    ///
    /// # Errors
    ///
    /// Propagates rendering failures.
    pub fn to_sql(&self, dialect: &dyn Dialect) -> Result<String> {
        let mut qb = QueryBuilder::inline(dialect);
        self.render(&mut qb)?;
        Ok(qb.finish().sql)
    }

    /// Renders with placeholders.
    ///
    /// # Errors
    ///
    /// Propagates rendering failures.
    pub fn prepare(&self, dialect: &dyn Dialect) -> Result<PreparedStatement> {
        let mut qb = QueryBuilder::prepared(dialect);
        self.render(&mut qb)?;
        Ok(qb.finish())
    }
}

fn render_in_list(
    expr: &Expr,
    values: &[SqlValue],
    ty: &ColumnType,
    negated: bool,
    qb: &mut QueryBuilder<'_>,
) -> Result<()> {
    match values {
        [] => Expr::Constant(negated).render(qb),
        [single] => {
            expr.render_operand(qb)?;
            qb.push(if negated { " <> " } else { " = " });
            qb.register_argument(ty, single)
        }
        _ => {
            expr.render_operand(qb)?;
            qb.push(if negated { " NOT IN (" } else { " IN (" });
            qb.register_arguments(ty, values)?;
            qb.push(")");
            Ok(())
        }
    }
}

impl From<ColumnRef> for Expr {
    fn from(c: ColumnRef) -> Self {
        Self::Column(c)
    }
}

impl From<&ColumnRef> for Expr {
    fn from(c: &ColumnRef) -> Self {
        Self::Column(c.clone())
    }
}

impl From<Function> for Expr {
    fn from(f: Function) -> Self {
        Self::Function(Box::new(f))
    }
}

impl From<Select> for Expr {
    fn from(s: Select) -> Self {
        Self::Subquery(Box::new(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{MySqlDialect, PostgresDialect, SqlServerDialect};

    fn id() -> ColumnRef {
        col("id", ColumnType::integer())
    }

    #[test]
    fn test_empty_in_list_matches_constants() {
        for dialect in [
            &PostgresDialect::new() as &dyn Dialect,
            &MySqlDialect::new(),
            &SqlServerDialect::new(),
        ] {
            let empty_in = id().in_list(Vec::<i32>::new()).to_sql(dialect).unwrap();
            let empty_not_in = id().not_in_list(Vec::<i32>::new()).to_sql(dialect).unwrap();
            assert_eq!(empty_in, Expr::Constant(false).to_sql(dialect).unwrap());
            assert_eq!(empty_not_in, Expr::Constant(true).to_sql(dialect).unwrap());
        }
    }

    #[test]
    fn test_single_element_in_list_is_equality() {
        let pg = PostgresDialect::new();
        assert_eq!(id().in_list(vec![5]).to_sql(&pg).unwrap(), "id = 5");
        assert_eq!(id().not_in_list(vec![5]).to_sql(&pg).unwrap(), "id <> 5");
        assert_eq!(
            id().in_list(vec![5, 1]).to_sql(&pg).unwrap(),
            "id IN (1, 5)"
        );
    }

    #[test]
    fn test_prepared_in_list_binds_sorted_values() {
        let pg = PostgresDialect::new();
        let stmt = id().in_list(vec![30, 4, 200]).prepare(&pg).unwrap();
        assert_eq!(stmt.sql, "id IN ($1, $2, $3)");
        assert_eq!(
            stmt.values(),
            vec![SqlValue::Int(200), SqlValue::Int(30), SqlValue::Int(4)]
        );
    }

    #[test]
    fn test_and_flattens_and_or_is_wrapped() {
        let pg = PostgresDialect::new();
        let name = col("name", ColumnType::varchar(50));
        let expr = id()
            .gt(1)
            .and(id().lt(10))
            .and(name.eq("a").or(name.eq("b")));
        assert!(matches!(&expr, Expr::And(items) if items.len() == 3));
        assert_eq!(
            expr.to_sql(&pg).unwrap(),
            "id > 1 AND id < 10 AND (name = 'a' OR name = 'b')"
        );
    }

    #[test]
    fn test_and_inside_or_is_not_wrapped() {
        let pg = PostgresDialect::new();
        let expr = id().eq(1).and(id().eq(2)).or(id().eq(3));
        assert_eq!(expr.to_sql(&pg).unwrap(), "id = 1 AND id = 2 OR id = 3");
    }

    #[test]
    fn test_not_wraps_compound_operand() {
        let pg = PostgresDialect::new();
        let expr = !id().eq(1).or(id().eq(2));
        assert_eq!(expr.to_sql(&pg).unwrap(), "NOT (id = 1 OR id = 2)");
    }

    #[test]
    fn test_boolean_constants_per_vendor() {
        assert_eq!(Expr::Constant(true).to_sql(&PostgresDialect::new()).unwrap(), "TRUE");
        assert_eq!(Expr::Constant(true).to_sql(&SqlServerDialect::new()).unwrap(), "1 = 1");
        assert_eq!(Expr::Constant(false).to_sql(&SqlServerDialect::new()).unwrap(), "1 = 0");
    }

    #[test]
    fn test_equality_is_structural() {
        let a = id().eq(1);
        let b = id().eq(1);
        let c = id().eq(2);
        assert_eq!(a, b);
        assert_ne!(a, c);
        // Same rendered text in one dialect, different trees.
        let raw = raw("id = 1");
        assert_ne!(a, raw);
    }

    #[test]
    fn test_eq_null_becomes_is_null() {
        let pg = PostgresDialect::new();
        assert_eq!(id().eq(None::<i32>).to_sql(&pg).unwrap(), "id IS NULL");
        assert_eq!(id().not_eq(None::<i32>).to_sql(&pg).unwrap(), "id IS NOT NULL");
    }

    #[test]
    fn test_like_with_escape() {
        let pg = PostgresDialect::new();
        let name = col("name", ColumnType::text());
        assert_eq!(
            name.like_escape("50!%", '!').to_sql(&pg).unwrap(),
            "name LIKE '50!%' ESCAPE '!'"
        );
    }

    #[test]
    fn test_case_and_arithmetic() {
        let pg = PostgresDialect::new();
        let expr = Expr::Case {
            operand: None,
            branches: vec![(id().gt(10), value(1))],
            otherwise: Some(Box::new(value(0))),
        };
        assert_eq!(expr.to_sql(&pg).unwrap(), "CASE WHEN id > 10 THEN 1 ELSE 0 END");
        let sum = (Expr::from(id()) + value(1)) * value(2);
        assert_eq!(sum.to_sql(&pg).unwrap(), "(id + 1) * 2");
    }
}
