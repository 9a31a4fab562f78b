//! Vendor type names and literal spelling.
//!
//! [`TypeNameProvider`] carries standard-SQL defaults for every method; each
//! vendor overrides only where it deviates.

use std::fmt;
use std::fmt::Write as _;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use uuid::Uuid;

use crate::error::{DialectError, Result};
use crate::expr::{NullsOrder, SortOrder};
use crate::types::{TextSize, TypeKind};
use crate::value::SqlValue;

/// Resolves vendor type names, literal syntax and ordering directives.
pub trait TypeNameProvider: Send + Sync + fmt::Debug {
    /// Name of the dialect this provider belongs to, used in errors.
    fn dialect_name(&self) -> &'static str;

    /// 8-bit signed integer.
    fn tiny_int_type(&self) -> String {
        String::from("TINYINT")
    }

    /// 8-bit unsigned integer.
    fn utiny_int_type(&self) -> String {
        String::from("SMALLINT")
    }

    /// 16-bit signed integer.
    fn small_int_type(&self) -> String {
        String::from("SMALLINT")
    }

    /// 16-bit unsigned integer.
    fn usmall_int_type(&self) -> String {
        String::from("INT")
    }

    /// 32-bit signed integer.
    fn integer_type(&self) -> String {
        String::from("INT")
    }

    /// 32-bit unsigned integer.
    fn uinteger_type(&self) -> String {
        String::from("BIGINT")
    }

    /// 64-bit signed integer.
    fn big_int_type(&self) -> String {
        String::from("BIGINT")
    }

    /// 64-bit unsigned integer.
    fn ubig_int_type(&self) -> String {
        String::from("NUMERIC(20)")
    }

    /// Auto-increment form of an integer type.
    ///
    /// # Errors
    ///
    /// Fails for non-integer base types.
    fn auto_increment_type(&self, base: &TypeKind) -> Result<String> {
        match base {
            TypeKind::TinyInt
            | TypeKind::UTinyInt
            | TypeKind::SmallInt
            | TypeKind::USmallInt
            | TypeKind::Integer => Ok(format!("{} AUTO_INCREMENT", self.integer_type())),
            TypeKind::UInteger | TypeKind::BigInt | TypeKind::UBigInt => {
                Ok(format!("{} AUTO_INCREMENT", self.big_int_type()))
            }
            _ => Err(self.unsupported("auto-increment on a non-integer column")),
        }
    }

    /// Whether the auto-increment type name already carries `PRIMARY KEY`.
    fn auto_increment_includes_primary_key(&self) -> bool {
        false
    }

    /// Exact decimal.
    fn decimal_type(&self, precision: u32, scale: u32) -> String {
        format!("DECIMAL({precision}, {scale})")
    }

    /// Single precision float.
    fn float_type(&self) -> String {
        String::from("FLOAT")
    }

    /// Double precision float.
    fn double_type(&self) -> String {
        String::from("DOUBLE PRECISION")
    }

    /// Fixed-length string.
    fn char_type(&self, length: u32) -> String {
        format!("CHAR({length})")
    }

    /// Variable-length string.
    fn varchar_type(&self, length: u32) -> String {
        format!("VARCHAR({length})")
    }

    /// Unbounded text of the given size class.
    fn text_type(&self, _size: TextSize) -> String {
        String::from("TEXT")
    }

    /// Collation clause appended to a character type.
    fn collate(&self, collation: &str) -> String {
        format!("COLLATE {collation}")
    }

    /// Binary string type.
    ///
    /// # Errors
    ///
    /// The default requires a length.
    fn binary_type(&self, length: Option<u32>) -> Result<String> {
        match length {
            Some(n) => Ok(format!("VARBINARY({n})")),
            None => Err(DialectError::validation(
                "the length of a binary column is missing",
            )),
        }
    }

    /// Binary large object.
    fn blob_type(&self) -> String {
        String::from("BLOB")
    }

    /// UUID type.
    fn uuid_type(&self) -> String {
        String::from("BINARY(16)")
    }

    /// Boolean type.
    fn boolean_type(&self) -> String {
        String::from("BOOLEAN")
    }

    /// Date type.
    fn date_type(&self) -> String {
        String::from("DATE")
    }

    /// Time-of-day type.
    fn time_type(&self) -> String {
        String::from("TIME")
    }

    /// Timestamp without zone.
    fn timestamp_type(&self) -> String {
        String::from("TIMESTAMP")
    }

    /// Timestamp with zone.
    ///
    /// # Errors
    ///
    /// Vendors without a zoned timestamp report `Unsupported`.
    fn timestamp_tz_type(&self) -> Result<String> {
        Ok(String::from("TIMESTAMP WITH TIME ZONE"))
    }

    /// Textual JSON type.
    fn json_type(&self) -> String {
        String::from("JSON")
    }

    /// Binary JSON type.
    ///
    /// # Errors
    ///
    /// Unsupported unless overridden.
    fn jsonb_type(&self) -> Result<String> {
        Err(self.unsupported("JSONB column type"))
    }

    /// Inline literal for a boolean value.
    fn boolean_literal(&self, value: bool) -> String {
        String::from(if value { "TRUE" } else { "FALSE" })
    }

    /// A boolean constant used as a whole predicate.
    fn boolean_condition(&self, value: bool) -> String {
        self.boolean_literal(value)
    }

    /// Bind value for a boolean.
    fn boolean_parameter(&self, value: bool) -> SqlValue {
        SqlValue::Bool(value)
    }

    /// Reads a boolean from its driver string form.
    ///
    /// # Errors
    ///
    /// Fails on anything that is not a recognised boolean spelling.
    fn parse_boolean(&self, raw: &str) -> Result<bool> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "t" | "true" | "y" | "yes" => Ok(true),
            "0" | "f" | "false" | "n" | "no" => Ok(false),
            _ => Err(DialectError::invalid_value("boolean", raw)),
        }
    }

    /// Hex literal for binary data.
    fn hex_literal(&self, bytes: &[u8]) -> String {
        format!("X'{}'", to_hex(bytes))
    }

    /// Quotes a string literal.
    fn quote_string(&self, value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }

    /// Literal for a date.
    fn date_literal(&self, value: &NaiveDate) -> String {
        format!("'{}'", value.format("%Y-%m-%d"))
    }

    /// Literal for a time of day.
    fn time_literal(&self, value: &NaiveTime) -> String {
        format!("'{}'", value.format("%H:%M:%S%.f"))
    }

    /// Literal for a timestamp.
    fn timestamp_literal(&self, value: &NaiveDateTime) -> String {
        format!("'{}'", value.format("%Y-%m-%d %H:%M:%S%.f"))
    }

    /// Literal for a zoned timestamp.
    fn timestamp_tz_literal(&self, value: &DateTime<FixedOffset>) -> String {
        format!("'{}'", value.format("%Y-%m-%d %H:%M:%S%.f%:z"))
    }

    /// Whether UUIDs travel as 16 raw bytes.
    fn uuid_as_bytes(&self) -> bool {
        true
    }

    /// Literal for a UUID.
    fn uuid_literal(&self, value: &Uuid) -> String {
        if self.uuid_as_bytes() {
            self.hex_literal(value.as_bytes())
        } else {
            format!("'{value}'")
        }
    }

    /// Formats a rendered default for a column definition.
    fn format_default(&self, rendered: &str, is_literal: bool) -> String {
        let _ = is_literal;
        String::from(rendered)
    }

    /// Renders one ORDER BY item.
    ///
    /// Vendors without native `NULLS FIRST/LAST` override this with a `CASE`
    /// rewrite.
    fn order_by(&self, expr: &str, order: SortOrder, nulls: Option<NullsOrder>) -> String {
        let mut out = format!("{expr} {}", order.as_sql());
        if let Some(nulls) = nulls {
            out.push(' ');
            out.push_str(nulls.as_sql());
        }
        out
    }

    /// Builds an `Unsupported` error naming this dialect.
    fn unsupported(&self, feature: &str) -> DialectError {
        DialectError::unsupported(self.dialect_name(), feature)
    }
}

/// `CASE`-based null ordering for vendors that lack `NULLS FIRST/LAST`.
#[must_use]
pub fn emulated_nulls_order(expr: &str, order: SortOrder, nulls: Option<NullsOrder>) -> String {
    match nulls {
        None => format!("{expr} {}", order.as_sql()),
        Some(nulls) => {
            let (null_rank, other_rank) = match nulls {
                NullsOrder::First => (0, 1),
                NullsOrder::Last => (1, 0),
            };
            format!(
                "CASE WHEN {expr} IS NULL THEN {null_rank} ELSE {other_rank} END, {expr} {}",
                order.as_sql()
            )
        }
    }
}

/// Lowercase hex encoding.
#[must_use]
pub fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out
}

/// Standard-SQL type names with no vendor deviations.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardTypeNames;

impl TypeNameProvider for StandardTypeNames {
    fn dialect_name(&self) -> &'static str {
        "standard"
    }
}
