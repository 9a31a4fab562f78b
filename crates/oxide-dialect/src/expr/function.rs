//! Function call nodes.
//!
//! Vendor spellings live in the dialect's statement provider; these nodes
//! only carry the arguments.

use super::{Expr, OrderBy};
use crate::error::Result;
use crate::render::QueryBuilder;

/// Date/time fields for extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatePart {
    /// Calendar year.
    Year,
    /// Month of year.
    Month,
    /// Day of month.
    Day,
    /// Hour of day.
    Hour,
    /// Minute of hour.
    Minute,
    /// Second of minute.
    Second,
}

impl DatePart {
    /// Standard SQL field name.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Year => "YEAR",
            Self::Month => "MONTH",
            Self::Day => "DAY",
            Self::Hour => "HOUR",
            Self::Minute => "MINUTE",
            Self::Second => "SECOND",
        }
    }
}

/// Statistical aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatFunction {
    /// Population standard deviation.
    StdDevPop,
    /// Sample standard deviation.
    StdDevSamp,
    /// Population variance.
    VarPop,
    /// Sample variance.
    VarSamp,
}

impl StatFunction {
    /// Standard SQL function name.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::StdDevPop => "STDDEV_POP",
            Self::StdDevSamp => "STDDEV_SAMP",
            Self::VarPop => "VAR_POP",
            Self::VarSamp => "VAR_SAMP",
        }
    }
}

/// A function call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Function {
    /// Substring starting at a 1-based position.
    Substring {
        /// Source string.
        expr: Expr,
        /// 1-based start.
        start: Expr,
        /// Number of characters.
        length: Expr,
    },
    /// Length in characters.
    CharLength(Expr),
    /// Concatenation, optionally with a separator.
    Concat {
        /// Separator placed between arguments.
        separator: Option<String>,
        /// Arguments.
        args: Vec<Expr>,
    },
    /// Grouped concatenation aggregate.
    GroupConcat {
        /// Aggregated expression.
        expr: Expr,
        /// Separator.
        separator: Option<String>,
        /// Aggregate only distinct values.
        distinct: bool,
        /// Ordering inside the group.
        order_by: Vec<OrderBy>,
    },
    /// 1-based position of `needle` in `haystack`, 0 when absent.
    Locate {
        /// String searched.
        haystack: Expr,
        /// String searched for.
        needle: Expr,
    },
    /// Extracts a date/time field.
    DatePart {
        /// Field.
        part: DatePart,
        /// Temporal operand.
        expr: Expr,
    },
    /// Value at a JSON path.
    JsonExtract {
        /// JSON document.
        expr: Expr,
        /// Key segments leading to the value; numeric segments index arrays.
        path: Vec<String>,
        /// Unwrap to a scalar text value.
        to_scalar: bool,
    },
    /// Whether the document contains a candidate document.
    JsonContains {
        /// JSON document.
        target: Expr,
        /// Candidate document.
        candidate: Expr,
        /// Optional path narrowing the search.
        path: Option<String>,
    },
    /// Whether any of the JSON paths resolves to a value.
    JsonExists {
        /// JSON document.
        expr: Expr,
        /// JSONPath expressions; `$.` is prepended when missing.
        path: Vec<String>,
    },
    /// Random number.
    Random {
        /// Optional seed.
        seed: Option<i64>,
    },
    /// Statistical aggregate.
    Stat {
        /// Aggregate kind.
        function: StatFunction,
        /// Operand.
        expr: Expr,
    },
    /// Any other function, rendered as `NAME(args)`.
    Call {
        /// Function name.
        name: String,
        /// Arguments.
        args: Vec<Expr>,
    },
}

impl Function {
    /// Shorthand for [`Function::Call`].
    #[must_use]
    pub fn call(name: &str, args: Vec<Expr>) -> Self {
        Self::Call {
            name: String::from(name),
            args,
        }
    }

    /// Renders the call through the dialect's statement provider.
    ///
    /// # Errors
    ///
    /// Returns `Unsupported` when the dialect has no equivalent.
    pub fn render(&self, qb: &mut QueryBuilder<'_>) -> Result<()> {
        let provider = qb.dialect().statements();
        match self {
            Self::Substring {
                expr,
                start,
                length,
            } => provider.substring(expr, start, length, qb),
            Self::CharLength(expr) => provider.char_length(expr, qb),
            Self::Concat { separator, args } => provider.concat(separator.as_deref(), args, qb),
            Self::GroupConcat {
                expr,
                separator,
                distinct,
                order_by,
            } => provider.group_concat(expr, separator.as_deref(), *distinct, order_by, qb),
            Self::Locate { haystack, needle } => provider.locate(haystack, needle, qb),
            Self::DatePart { part, expr } => provider.date_part(*part, expr, qb),
            Self::JsonExtract {
                expr,
                path,
                to_scalar,
            } => provider.json_extract(expr, path, *to_scalar, qb),
            Self::JsonContains {
                target,
                candidate,
                path,
            } => provider.json_contains(target, candidate, path.as_deref(), qb),
            Self::JsonExists { expr, path } => provider.json_exists(expr, path, qb),
            Self::Random { seed } => provider.random(*seed, qb),
            Self::Stat { function, expr } => provider.stat(*function, expr, qb),
            Self::Call { name, args } => {
                qb.push(name).push("(");
                qb.render_list(args, ", ")?;
                qb.push(")");
                Ok(())
            }
        }
    }
}
