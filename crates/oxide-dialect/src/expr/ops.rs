//! Operator builders.

use std::ops;

use super::{ArithOp, ColumnRef, CompareOp, Expr};
use crate::types::ColumnType;
use crate::value::{SqlValue, ToSqlValue};

/// Creates a typed column reference.
#[must_use]
pub fn col(name: &str, ty: ColumnType) -> ColumnRef {
    ColumnRef {
        table: None,
        name: String::from(name),
        ty,
    }
}

/// A bound value whose type is inferred from the value itself.
#[must_use]
pub fn value<T: ToSqlValue>(v: T) -> Expr {
    let value = v.to_sql_value();
    let ty = ColumnType::infer(&value);
    Expr::Value { value, ty }
}

/// A raw SQL fragment.
///
/// **Warning**: Only use this for SQL fragments that don't contain user input.
#[must_use]
pub fn raw(sql: &str) -> Expr {
    Expr::Raw(String::from(sql))
}

/// Conjunction of all items; `None` when empty.
#[must_use]
pub fn and_all(items: impl IntoIterator<Item = Expr>) -> Option<Expr> {
    items.into_iter().reduce(Expr::and)
}

/// Disjunction of all items; `None` when empty.
#[must_use]
pub fn or_all(items: impl IntoIterator<Item = Expr>) -> Option<Expr> {
    items.into_iter().reduce(Expr::or)
}

impl ColumnRef {
    /// Returns a copy qualified by `table`.
    #[must_use]
    pub fn qualified(mut self, table: &str) -> Self {
        self.table = Some(String::from(table));
        self
    }

    /// Wraps a value in this column's type.
    #[must_use]
    pub fn bind<T: ToSqlValue>(&self, v: T) -> Expr {
        Expr::Value {
            value: v.to_sql_value(),
            ty: self.ty.clone(),
        }
    }

    fn compare<T: ToSqlValue>(&self, op: CompareOp, v: T) -> Expr {
        let value = v.to_sql_value();
        match (op, value.is_null()) {
            (CompareOp::Eq, true) => self.is_null(),
            (CompareOp::NotEq, true) => self.is_not_null(),
            _ => Expr::from(self).compare(
                op,
                Expr::Value {
                    value,
                    ty: self.ty.clone(),
                },
            ),
        }
    }

    /// `col = value`, or `col IS NULL` for a NULL value.
    #[must_use]
    pub fn eq<T: ToSqlValue>(&self, v: T) -> Expr {
        self.compare(CompareOp::Eq, v)
    }

    /// `col <> value`, or `col IS NOT NULL` for a NULL value.
    #[must_use]
    pub fn not_eq<T: ToSqlValue>(&self, v: T) -> Expr {
        self.compare(CompareOp::NotEq, v)
    }

    /// `col < value`.
    #[must_use]
    pub fn lt<T: ToSqlValue>(&self, v: T) -> Expr {
        self.compare(CompareOp::Lt, v)
    }

    /// `col <= value`.
    #[must_use]
    pub fn lt_eq<T: ToSqlValue>(&self, v: T) -> Expr {
        self.compare(CompareOp::LtEq, v)
    }

    /// `col > value`.
    #[must_use]
    pub fn gt<T: ToSqlValue>(&self, v: T) -> Expr {
        self.compare(CompareOp::Gt, v)
    }

    /// `col >= value`.
    #[must_use]
    pub fn gt_eq<T: ToSqlValue>(&self, v: T) -> Expr {
        self.compare(CompareOp::GtEq, v)
    }

    /// `col = other`.
    #[must_use]
    pub fn eq_column(&self, other: &Self) -> Expr {
        Expr::from(self).compare(CompareOp::Eq, Expr::from(other))
    }

    /// `col IS NULL`.
    #[must_use]
    pub fn is_null(&self) -> Expr {
        Expr::IsNull {
            expr: Box::new(self.into()),
            negated: false,
        }
    }

    /// `col IS NOT NULL`.
    #[must_use]
    pub fn is_not_null(&self) -> Expr {
        Expr::IsNull {
            expr: Box::new(self.into()),
            negated: true,
        }
    }

    /// `col IN (...)`.
    #[must_use]
    pub fn in_list<T: ToSqlValue>(&self, values: impl IntoIterator<Item = T>) -> Expr {
        self.list(values, false)
    }

    /// `col NOT IN (...)`.
    #[must_use]
    pub fn not_in_list<T: ToSqlValue>(&self, values: impl IntoIterator<Item = T>) -> Expr {
        self.list(values, true)
    }

    fn list<T: ToSqlValue>(&self, values: impl IntoIterator<Item = T>, negated: bool) -> Expr {
        Expr::InList {
            expr: Box::new(self.into()),
            values: values.into_iter().map(ToSqlValue::to_sql_value).collect(),
            ty: self.ty.clone(),
            negated,
        }
    }

    /// `col BETWEEN low AND high`.
    #[must_use]
    pub fn between<T: ToSqlValue, U: ToSqlValue>(&self, low: T, high: U) -> Expr {
        Expr::Between {
            expr: Box::new(self.into()),
            low: Box::new(self.bind(low)),
            high: Box::new(self.bind(high)),
            negated: false,
        }
    }

    /// `col LIKE pattern`.
    #[must_use]
    pub fn like(&self, pattern: &str) -> Expr {
        self.pattern(pattern, None, false)
    }

    /// `col NOT LIKE pattern`.
    #[must_use]
    pub fn not_like(&self, pattern: &str) -> Expr {
        self.pattern(pattern, None, true)
    }

    /// `col LIKE pattern ESCAPE 'c'`.
    #[must_use]
    pub fn like_escape(&self, pattern: &str, escape: char) -> Expr {
        self.pattern(pattern, Some(escape), false)
    }

    fn pattern(&self, pattern: &str, escape: Option<char>, negated: bool) -> Expr {
        Expr::Like {
            expr: Box::new(self.into()),
            pattern: Box::new(Expr::Value {
                value: SqlValue::Text(String::from(pattern)),
                ty: ColumnType::text(),
            }),
            escape,
            negated,
        }
    }

    /// Regular-expression match.
    #[must_use]
    pub fn regexp(&self, pattern: &str, case_sensitive: bool) -> Expr {
        Expr::Regexp {
            expr: Box::new(self.into()),
            pattern: Box::new(Expr::Value {
                value: SqlValue::Text(String::from(pattern)),
                ty: ColumnType::text(),
            }),
            case_sensitive,
        }
    }
}

impl Expr {
    /// `self op other`.
    #[must_use]
    pub fn compare(self, op: CompareOp, other: Self) -> Self {
        Self::Compare {
            left: Box::new(self),
            op,
            right: Box::new(other),
        }
    }

    /// Conjunction, flattened into a single AND node.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        let mut items = match self {
            Self::And(items) => items,
            other => vec![other],
        };
        match other {
            Self::And(rest) => items.extend(rest),
            other => items.push(other),
        }
        Self::And(items)
    }

    /// Disjunction, flattened into a single OR node.
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        let mut items = match self {
            Self::Or(items) => items,
            other => vec![other],
        };
        match other {
            Self::Or(rest) => items.extend(rest),
            other => items.push(other),
        }
        Self::Or(items)
    }

    /// `self IS NULL`.
    #[must_use]
    pub fn is_null(self) -> Self {
        Self::IsNull {
            expr: Box::new(self),
            negated: false,
        }
    }

    /// `CAST(self AS ty)`.
    #[must_use]
    pub fn cast(self, ty: ColumnType) -> Self {
        Self::Cast {
            expr: Box::new(self),
            ty,
        }
    }

    fn arithmetic(self, op: ArithOp, other: Self) -> Self {
        Self::Arithmetic {
            left: Box::new(self),
            op,
            right: Box::new(other),
        }
    }
}

impl ops::Not for Expr {
    type Output = Self;

    fn not(self) -> Self {
        Self::Not(Box::new(self))
    }
}

macro_rules! arithmetic_op {
    ($($trait:ident, $method:ident => $op:expr;)*) => {
        $(
            impl ops::$trait for Expr {
                type Output = Self;

                fn $method(self, rhs: Self) -> Self {
                    self.arithmetic($op, rhs)
                }
            }
        )*
    };
}

arithmetic_op! {
    Add, add => ArithOp::Add;
    Sub, sub => ArithOp::Sub;
    Mul, mul => ArithOp::Mul;
    Div, div => ArithOp::Div;
    Rem, rem => ArithOp::Mod;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_and_all_of_nothing_is_none() {
        assert!(and_all(Vec::new()).is_none());
    }

    #[test]
    fn test_or_flattens_right_operands() {
        let a = col("a", ColumnType::integer());
        let expr = a.eq(1).or(a.eq(2).or(a.eq(3)));
        assert!(matches!(expr, Expr::Or(items) if items.len() == 3));
    }

    #[test]
    fn test_value_infers_type() {
        match value("x") {
            Expr::Value { ty, .. } => assert_eq!(ty, ColumnType::text()),
            other => panic!("unexpected {other:?}"),
        }
    }
}
