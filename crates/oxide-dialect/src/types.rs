//! Column type descriptors.
//!
//! A [`ColumnType`] knows how to name itself under a dialect, how to spell a
//! value as an inline literal, how to turn a value into a bind parameter and
//! how to read a raw driver value back.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dialect::{Dialect, TypeNameProvider};
use crate::error::{DialectError, Result};
use crate::value::SqlValue;

/// Size class for unbounded text columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextSize {
    /// Regular text.
    #[default]
    Text,
    /// Medium text (MySQL `MEDIUMTEXT`).
    Medium,
    /// Large text (MySQL `LONGTEXT`).
    Large,
}

/// How an enumeration is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnumStorage {
    /// Stored as the variant's position.
    Ordinal,
    /// Stored as the variant's name.
    Name,
}

/// Logical column types.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TypeKind {
    /// 8-bit signed integer.
    TinyInt,
    /// 8-bit unsigned integer.
    UTinyInt,
    /// 16-bit signed integer.
    SmallInt,
    /// 16-bit unsigned integer.
    USmallInt,
    /// 32-bit signed integer.
    Integer,
    /// 32-bit unsigned integer.
    UInteger,
    /// 64-bit signed integer.
    BigInt,
    /// 64-bit unsigned integer.
    UBigInt,
    /// Exact decimal.
    Decimal {
        /// Total number of digits.
        precision: u32,
        /// Digits after the decimal point.
        scale: u32,
    },
    /// Single precision float.
    Float,
    /// Double precision float.
    Double,
    /// Fixed-length character string.
    Char {
        /// Length in characters.
        length: u32,
        /// Optional collation.
        #[serde(default)]
        collation: Option<String>,
    },
    /// Variable-length character string.
    Varchar {
        /// Maximum length in characters.
        length: u32,
        /// Optional collation.
        #[serde(default)]
        collation: Option<String>,
    },
    /// Unbounded text.
    Text {
        /// Optional collation.
        #[serde(default)]
        collation: Option<String>,
        /// Size class.
        #[serde(default)]
        size: TextSize,
    },
    /// Binary string, optionally bounded.
    Binary {
        /// Maximum length in bytes.
        #[serde(default)]
        length: Option<u32>,
    },
    /// Binary large object.
    Blob,
    /// Boolean.
    Boolean,
    /// Calendar date.
    Date,
    /// Time of day.
    Time,
    /// Timestamp without zone.
    Timestamp,
    /// Timestamp with zone offset.
    TimestampTz,
    /// UUID.
    Uuid,
    /// JSON document, optionally in the vendor's binary encoding.
    Json {
        /// Use the binary JSON type (`JSONB`).
        #[serde(default)]
        binary: bool,
    },
    /// Enumeration stored by ordinal or by name.
    Enumeration {
        /// Variant names in declaration order.
        variants: Vec<String>,
        /// Storage strategy.
        by: EnumStorage,
    },
    /// Auto-increment wrapper around an integer type.
    AutoIncrement {
        /// Underlying integer type.
        base: Box<TypeKind>,
        /// Explicit sequence name.
        #[serde(default)]
        sequence: Option<String>,
    },
}

/// An immutable column type descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnType {
    /// Logical type.
    #[serde(flatten)]
    pub kind: TypeKind,
    /// Whether NULL is allowed.
    #[serde(default)]
    pub nullable: bool,
}

macro_rules! simple_constructors {
    ($($(#[$doc:meta])* $fn_name:ident => $kind:expr;)*) => {
        $(
            $(#[$doc])*
            #[must_use]
            pub const fn $fn_name() -> Self {
                Self::new($kind)
            }
        )*
    };
}

impl ColumnType {
    /// Creates a non-nullable column type.
    #[must_use]
    pub const fn new(kind: TypeKind) -> Self {
        Self {
            kind,
            nullable: false,
        }
    }

    simple_constructors! {
        /// `TINYINT`.
        tiny_int => TypeKind::TinyInt;
        /// Unsigned 8-bit integer.
        utiny_int => TypeKind::UTinyInt;
        /// `SMALLINT`.
        small_int => TypeKind::SmallInt;
        /// Unsigned 16-bit integer.
        usmall_int => TypeKind::USmallInt;
        /// `INT`.
        integer => TypeKind::Integer;
        /// Unsigned 32-bit integer.
        uinteger => TypeKind::UInteger;
        /// `BIGINT`.
        big_int => TypeKind::BigInt;
        /// Unsigned 64-bit integer.
        ubig_int => TypeKind::UBigInt;
        /// Single precision float.
        float => TypeKind::Float;
        /// Double precision float.
        double => TypeKind::Double;
        /// Binary large object.
        blob => TypeKind::Blob;
        /// Boolean.
        boolean => TypeKind::Boolean;
        /// Date.
        date => TypeKind::Date;
        /// Time of day.
        time => TypeKind::Time;
        /// Timestamp without zone.
        timestamp => TypeKind::Timestamp;
        /// Timestamp with zone.
        timestamp_tz => TypeKind::TimestampTz;
        /// UUID.
        uuid => TypeKind::Uuid;
    }

    /// Exact decimal with precision and scale.
    #[must_use]
    pub const fn decimal(precision: u32, scale: u32) -> Self {
        Self::new(TypeKind::Decimal { precision, scale })
    }

    /// Fixed-length string.
    #[must_use]
    pub const fn char(length: u32) -> Self {
        Self::new(TypeKind::Char {
            length,
            collation: None,
        })
    }

    /// Variable-length string.
    #[must_use]
    pub const fn varchar(length: u32) -> Self {
        Self::new(TypeKind::Varchar {
            length,
            collation: None,
        })
    }

    /// Unbounded text.
    #[must_use]
    pub const fn text() -> Self {
        Self::new(TypeKind::Text {
            collation: None,
            size: TextSize::Text,
        })
    }

    /// Binary string with an optional maximum length.
    #[must_use]
    pub const fn binary(length: Option<u32>) -> Self {
        Self::new(TypeKind::Binary { length })
    }

    /// Textual JSON.
    #[must_use]
    pub const fn json() -> Self {
        Self::new(TypeKind::Json { binary: false })
    }

    /// Binary JSON (`JSONB`).
    #[must_use]
    pub const fn jsonb() -> Self {
        Self::new(TypeKind::Json { binary: true })
    }

    /// Enumeration stored by variant name.
    #[must_use]
    pub fn enumeration_by_name<S: Into<String>>(variants: impl IntoIterator<Item = S>) -> Self {
        Self::new(TypeKind::Enumeration {
            variants: variants.into_iter().map(Into::into).collect(),
            by: EnumStorage::Name,
        })
    }

    /// Enumeration stored by ordinal.
    #[must_use]
    pub fn enumeration_by_ordinal<S: Into<String>>(variants: impl IntoIterator<Item = S>) -> Self {
        Self::new(TypeKind::Enumeration {
            variants: variants.into_iter().map(Into::into).collect(),
            by: EnumStorage::Ordinal,
        })
    }

    /// Wraps this type in an auto-increment descriptor.
    #[must_use]
    pub fn auto_increment(self) -> Self {
        Self {
            kind: TypeKind::AutoIncrement {
                base: Box::new(self.kind),
                sequence: None,
            },
            nullable: false,
        }
    }

    /// Wraps this type in an auto-increment descriptor backed by a named sequence.
    #[must_use]
    pub fn auto_increment_with_sequence(self, sequence: impl Into<String>) -> Self {
        Self {
            kind: TypeKind::AutoIncrement {
                base: Box::new(self.kind),
                sequence: Some(sequence.into()),
            },
            nullable: false,
        }
    }

    /// Returns a nullable copy of this type.
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Returns a copy with the given collation on character types.
    #[must_use]
    pub fn with_collation(mut self, name: impl Into<String>) -> Self {
        match &mut self.kind {
            TypeKind::Char { collation, .. }
            | TypeKind::Varchar { collation, .. }
            | TypeKind::Text { collation, .. } => *collation = Some(name.into()),
            _ => {}
        }
        self
    }

    /// Returns `true` for the auto-increment wrapper.
    #[must_use]
    pub const fn is_auto_increment(&self) -> bool {
        matches!(self.kind, TypeKind::AutoIncrement { .. })
    }

    /// The explicit sequence name of an auto-increment type, if any.
    #[must_use]
    pub fn explicit_sequence(&self) -> Option<&str> {
        match &self.kind {
            TypeKind::AutoIncrement { sequence, .. } => sequence.as_deref(),
            _ => None,
        }
    }

    /// Whether the auto-increment is realised through a sequence under `dialect`.
    #[must_use]
    pub fn uses_sequence(&self, dialect: &dyn Dialect) -> bool {
        let TypeKind::AutoIncrement { sequence, .. } = &self.kind else {
            return false;
        };
        let caps = dialect.capabilities();
        caps.needs_sequence_to_auto_inc || (sequence.is_some() && caps.supports_create_sequence)
    }

    /// The vendor type name, including the auto-increment form when it applies.
    ///
    /// # Errors
    ///
    /// Returns [`DialectError::Unsupported`] when the dialect has no name for
    /// the type.
    pub fn sql_type(&self, dialect: &dyn Dialect) -> Result<String> {
        match &self.kind {
            TypeKind::AutoIncrement { base, .. } if !self.uses_sequence(dialect) => {
                dialect.type_names().auto_increment_type(base)
            }
            _ => self.base_sql_type(dialect),
        }
    }

    /// The vendor type name with any auto-increment marker stripped.
    ///
    /// # Errors
    ///
    /// Returns [`DialectError::Unsupported`] when the dialect has no name for
    /// the type.
    pub fn base_sql_type(&self, dialect: &dyn Dialect) -> Result<String> {
        kind_sql_type(&self.kind, dialect.type_names())
    }

    /// Renders `value` as an inline literal.
    ///
    /// # Errors
    ///
    /// Returns [`DialectError::InvalidValue`] when the value does not fit the
    /// type.
    pub fn value_to_literal(&self, value: &SqlValue, dialect: &dyn Dialect) -> Result<String> {
        let tn = dialect.type_names();
        if value.is_null() {
            return Ok(String::from("NULL"));
        }
        let value = self.coerce(value)?;
        Ok(match &value {
            SqlValue::Null => String::from("NULL"),
            SqlValue::Bool(b) => tn.boolean_literal(*b),
            SqlValue::Int(n) => n.to_string(),
            SqlValue::UInt(n) => n.to_string(),
            SqlValue::Float(f) => format_float(*f),
            SqlValue::Decimal(d) => d.to_string(),
            SqlValue::Text(s) => tn.quote_string(s),
            SqlValue::Blob(b) => tn.hex_literal(b),
            SqlValue::Date(d) => tn.date_literal(d),
            SqlValue::Time(t) => tn.time_literal(t),
            SqlValue::Timestamp(t) => tn.timestamp_literal(t),
            SqlValue::TimestampTz(t) => tn.timestamp_tz_literal(t),
            SqlValue::Uuid(u) => tn.uuid_literal(u),
            SqlValue::Json(j) => tn.quote_string(&j.to_string()),
        })
    }

    /// Converts `value` into the form handed to the driver as a bind parameter.
    ///
    /// # Errors
    ///
    /// Returns [`DialectError::InvalidValue`] when the value does not fit the
    /// type.
    pub fn to_parameter(&self, value: &SqlValue, dialect: &dyn Dialect) -> Result<SqlValue> {
        if value.is_null() {
            return Ok(SqlValue::Null);
        }
        let tn = dialect.type_names();
        Ok(match self.coerce(value)? {
            SqlValue::Uuid(u) if tn.uuid_as_bytes() => SqlValue::Blob(u.as_bytes().to_vec()),
            SqlValue::Bool(b) => tn.boolean_parameter(b),
            SqlValue::Json(j) => SqlValue::Text(j.to_string()),
            other => other,
        })
    }

    /// Reads a raw driver value back into the domain representation.
    ///
    /// # Errors
    ///
    /// Returns [`DialectError::InvalidValue`] when the raw value cannot be
    /// interpreted as this type.
    pub fn parse_raw(&self, raw: SqlValue, dialect: &dyn Dialect) -> Result<SqlValue> {
        if raw.is_null() {
            return Ok(SqlValue::Null);
        }
        let tn = dialect.type_names();
        let kind = self.effective_kind();
        match (kind, raw) {
            (TypeKind::Boolean, SqlValue::Text(s)) => tn.parse_boolean(&s).map(SqlValue::Bool),
            (TypeKind::Boolean, SqlValue::Int(n)) => Ok(SqlValue::Bool(n != 0)),
            (TypeKind::Boolean, SqlValue::UInt(n)) => Ok(SqlValue::Bool(n != 0)),
            (TypeKind::Uuid, SqlValue::Blob(b)) => Uuid::from_slice(&b)
                .map(SqlValue::Uuid)
                .map_err(|_| DialectError::invalid_value("uuid", format!("{} bytes", b.len()))),
            (TypeKind::Json { .. }, SqlValue::Text(s)) => serde_json::from_str(&s)
                .map(SqlValue::Json)
                .map_err(|e| DialectError::invalid_value("json", e.to_string())),
            (TypeKind::Json { .. }, SqlValue::Blob(b)) => serde_json::from_slice(&b)
                .map(SqlValue::Json)
                .map_err(|e| DialectError::invalid_value("json", e.to_string())),
            (TypeKind::Timestamp, SqlValue::TimestampTz(t)) => {
                Ok(SqlValue::Timestamp(t.naive_utc()))
            }
            (TypeKind::Date, SqlValue::Timestamp(t)) => Ok(SqlValue::Date(t.date())),
            (TypeKind::Enumeration { variants, by }, raw) => {
                parse_enumeration(variants, *by, &raw)
            }
            (_, raw) => self.coerce(&raw),
        }
    }

    /// The kind with any auto-increment wrapper removed.
    #[must_use]
    pub fn effective_kind(&self) -> &TypeKind {
        match &self.kind {
            TypeKind::AutoIncrement { base, .. } => base,
            other => other,
        }
    }

    /// Checks `value` against the type and converts textual forms where the
    /// type has an unambiguous parse.
    fn coerce(&self, value: &SqlValue) -> Result<SqlValue> {
        let kind = self.effective_kind();
        let mismatch = || Err(DialectError::invalid_value(kind_label(kind), value.kind()));
        match (kind, value) {
            (_, SqlValue::Null) => Ok(SqlValue::Null),
            (
                TypeKind::TinyInt
                | TypeKind::UTinyInt
                | TypeKind::SmallInt
                | TypeKind::USmallInt
                | TypeKind::Integer
                | TypeKind::UInteger
                | TypeKind::BigInt
                | TypeKind::UBigInt,
                SqlValue::Int(_) | SqlValue::UInt(_),
            ) => check_integer_range(kind, value),
            (
                TypeKind::TinyInt
                | TypeKind::UTinyInt
                | TypeKind::SmallInt
                | TypeKind::USmallInt
                | TypeKind::Integer
                | TypeKind::UInteger
                | TypeKind::BigInt
                | TypeKind::UBigInt,
                SqlValue::Text(s),
            ) => match s.trim().parse::<i64>() {
                Ok(n) => check_integer_range(kind, &SqlValue::Int(n)),
                Err(_) => mismatch(),
            },
            (
                TypeKind::Decimal { .. } | TypeKind::Float | TypeKind::Double,
                SqlValue::Int(_) | SqlValue::UInt(_) | SqlValue::Decimal(_),
            ) => Ok(value.clone()),
            (TypeKind::Decimal { .. } | TypeKind::Float | TypeKind::Double, SqlValue::Float(f)) => {
                if f.is_finite() {
                    Ok(value.clone())
                } else {
                    Err(DialectError::invalid_value(kind_label(kind), f.to_string()))
                }
            }
            (TypeKind::Decimal { .. }, SqlValue::Text(s)) => Decimal::from_str(s.trim())
                .map(SqlValue::Decimal)
                .map_err(|_| DialectError::invalid_value("decimal", s.clone())),
            (TypeKind::Float | TypeKind::Double, SqlValue::Text(s)) => s
                .trim()
                .parse::<f64>()
                .map(SqlValue::Float)
                .map_err(|_| DialectError::invalid_value("float", s.clone())),
            (TypeKind::Char { .. } | TypeKind::Varchar { .. } | TypeKind::Text { .. }, SqlValue::Text(_))
            | (TypeKind::Binary { .. } | TypeKind::Blob, SqlValue::Blob(_))
            | (TypeKind::Boolean, SqlValue::Bool(_))
            | (TypeKind::Date, SqlValue::Date(_))
            | (TypeKind::Time, SqlValue::Time(_))
            | (TypeKind::Timestamp, SqlValue::Timestamp(_))
            | (TypeKind::TimestampTz, SqlValue::TimestampTz(_))
            | (TypeKind::Uuid, SqlValue::Uuid(_))
            | (TypeKind::Json { .. }, SqlValue::Json(_)) => Ok(value.clone()),
            (TypeKind::Date, SqlValue::Text(s)) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map(SqlValue::Date)
                .map_err(|_| DialectError::invalid_value("date", s.clone())),
            (TypeKind::Time, SqlValue::Text(s)) => NaiveTime::from_str(s)
                .map(SqlValue::Time)
                .map_err(|_| DialectError::invalid_value("time", s.clone())),
            (TypeKind::Timestamp, SqlValue::Text(s)) => parse_timestamp(s)
                .map(SqlValue::Timestamp)
                .ok_or_else(|| DialectError::invalid_value("timestamp", s.clone())),
            (TypeKind::TimestampTz, SqlValue::Text(s)) => DateTime::parse_from_rfc3339(s)
                .or_else(|_| DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%:z"))
                .map(SqlValue::TimestampTz)
                .map_err(|_| DialectError::invalid_value("timestamp with time zone", s.clone())),
            (TypeKind::Uuid, SqlValue::Text(s)) => Uuid::parse_str(s)
                .map(SqlValue::Uuid)
                .map_err(|_| DialectError::invalid_value("uuid", s.clone())),
            (TypeKind::Json { .. }, SqlValue::Text(s)) => serde_json::from_str(s)
                .map(SqlValue::Json)
                .map_err(|e| DialectError::invalid_value("json", e.to_string())),
            (TypeKind::Enumeration { variants, by }, _) => parse_enumeration(variants, *by, value),
            _ => mismatch(),
        }
    }

    /// A reasonable type for a bare value with no column to borrow one from.
    #[must_use]
    pub fn infer(value: &SqlValue) -> Self {
        let ty = match value {
            SqlValue::Null | SqlValue::Text(_) => Self::text(),
            SqlValue::Bool(_) => Self::boolean(),
            SqlValue::Int(_) => Self::big_int(),
            SqlValue::UInt(_) => Self::ubig_int(),
            SqlValue::Float(_) => Self::double(),
            SqlValue::Decimal(d) => Self::decimal(38, d.scale()),
            SqlValue::Blob(_) => Self::blob(),
            SqlValue::Date(_) => Self::date(),
            SqlValue::Time(_) => Self::time(),
            SqlValue::Timestamp(_) => Self::timestamp(),
            SqlValue::TimestampTz(_) => Self::timestamp_tz(),
            SqlValue::Uuid(_) => Self::uuid(),
            SqlValue::Json(_) => Self::json(),
        };
        if value.is_null() {
            ty.nullable()
        } else {
            ty
        }
    }
}

fn kind_sql_type(kind: &TypeKind, tn: &dyn TypeNameProvider) -> Result<String> {
    Ok(match kind {
        TypeKind::TinyInt => tn.tiny_int_type(),
        TypeKind::UTinyInt => tn.utiny_int_type(),
        TypeKind::SmallInt => tn.small_int_type(),
        TypeKind::USmallInt => tn.usmall_int_type(),
        TypeKind::Integer => tn.integer_type(),
        TypeKind::UInteger => tn.uinteger_type(),
        TypeKind::BigInt => tn.big_int_type(),
        TypeKind::UBigInt => tn.ubig_int_type(),
        TypeKind::Decimal { precision, scale } => tn.decimal_type(*precision, *scale),
        TypeKind::Float => tn.float_type(),
        TypeKind::Double => tn.double_type(),
        TypeKind::Char { length, collation } => {
            with_collation(tn, tn.char_type(*length), collation.as_deref())
        }
        TypeKind::Varchar { length, collation } => {
            with_collation(tn, tn.varchar_type(*length), collation.as_deref())
        }
        TypeKind::Text { collation, size } => {
            with_collation(tn, tn.text_type(*size), collation.as_deref())
        }
        TypeKind::Binary { length } => tn.binary_type(*length)?,
        TypeKind::Blob => tn.blob_type(),
        TypeKind::Boolean => tn.boolean_type(),
        TypeKind::Date => tn.date_type(),
        TypeKind::Time => tn.time_type(),
        TypeKind::Timestamp => tn.timestamp_type(),
        TypeKind::TimestampTz => tn.timestamp_tz_type()?,
        TypeKind::Uuid => tn.uuid_type(),
        TypeKind::Json { binary: false } => tn.json_type(),
        TypeKind::Json { binary: true } => tn.jsonb_type()?,
        TypeKind::Enumeration { variants, by } => match by {
            EnumStorage::Ordinal => tn.integer_type(),
            EnumStorage::Name => {
                let longest = variants.iter().map(|v| v.chars().count()).max().unwrap_or(1);
                tn.varchar_type(u32::try_from(longest).unwrap_or(u32::MAX))
            }
        },
        TypeKind::AutoIncrement { base, .. } => kind_sql_type(base, tn)?,
    })
}

fn with_collation(tn: &dyn TypeNameProvider, base: String, collation: Option<&str>) -> String {
    match collation {
        Some(c) => format!("{base} {}", tn.collate(c)),
        None => base,
    }
}

fn kind_label(kind: &TypeKind) -> &'static str {
    match kind {
        TypeKind::TinyInt => "TINYINT",
        TypeKind::UTinyInt => "unsigned TINYINT",
        TypeKind::SmallInt => "SMALLINT",
        TypeKind::USmallInt => "unsigned SMALLINT",
        TypeKind::Integer => "INT",
        TypeKind::UInteger => "unsigned INT",
        TypeKind::BigInt => "BIGINT",
        TypeKind::UBigInt => "unsigned BIGINT",
        TypeKind::Decimal { .. } => "decimal",
        TypeKind::Float | TypeKind::Double => "float",
        TypeKind::Char { .. } | TypeKind::Varchar { .. } | TypeKind::Text { .. } => "text",
        TypeKind::Binary { .. } | TypeKind::Blob => "binary",
        TypeKind::Boolean => "boolean",
        TypeKind::Date => "date",
        TypeKind::Time => "time",
        TypeKind::Timestamp => "timestamp",
        TypeKind::TimestampTz => "timestamp with time zone",
        TypeKind::Uuid => "uuid",
        TypeKind::Json { .. } => "json",
        TypeKind::Enumeration { .. } => "enumeration",
        TypeKind::AutoIncrement { base, .. } => kind_label(base),
    }
}

fn integer_bounds(kind: &TypeKind) -> (i128, i128) {
    match kind {
        TypeKind::TinyInt => (i128::from(i8::MIN), i128::from(i8::MAX)),
        TypeKind::UTinyInt => (0, i128::from(u8::MAX)),
        TypeKind::SmallInt => (i128::from(i16::MIN), i128::from(i16::MAX)),
        TypeKind::USmallInt => (0, i128::from(u16::MAX)),
        TypeKind::Integer => (i128::from(i32::MIN), i128::from(i32::MAX)),
        TypeKind::UInteger => (0, i128::from(u32::MAX)),
        TypeKind::BigInt => (i128::from(i64::MIN), i128::from(i64::MAX)),
        _ => (0, i128::from(u64::MAX)),
    }
}

fn check_integer_range(kind: &TypeKind, value: &SqlValue) -> Result<SqlValue> {
    let n = match value {
        SqlValue::Int(n) => i128::from(*n),
        SqlValue::UInt(n) => i128::from(*n),
        _ => return Err(DialectError::invalid_value(kind_label(kind), value.kind())),
    };
    let (min, max) = integer_bounds(kind);
    if n < min || n > max {
        return Err(DialectError::invalid_value(kind_label(kind), n.to_string()));
    }
    Ok(value.clone())
}

fn parse_enumeration(variants: &[String], by: EnumStorage, value: &SqlValue) -> Result<SqlValue> {
    let position = match value {
        SqlValue::Text(s) => variants.iter().position(|v| v == s.trim_end()),
        SqlValue::Int(n) => usize::try_from(*n).ok().filter(|i| *i < variants.len()),
        SqlValue::UInt(n) => usize::try_from(*n).ok().filter(|i| *i < variants.len()),
        _ => None,
    };
    let Some(position) = position else {
        return Err(DialectError::invalid_value(
            format!("one of [{}]", variants.join(", ")),
            match value {
                SqlValue::Text(s) => s.clone(),
                other => other.kind().to_string(),
            },
        ));
    };
    Ok(match by {
        EnumStorage::Name => SqlValue::Text(variants[position].clone()),
        EnumStorage::Ordinal => SqlValue::Int(i64::try_from(position).unwrap_or(i64::MAX)),
    })
}

fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

fn format_float(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{f:.1}")
    } else {
        f.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{MySqlDialect, OracleDialect, PostgresDialect, SqliteDialect, SqlServerDialect};

    #[test]
    fn test_integer_names_per_vendor() {
        assert_eq!(ColumnType::integer().sql_type(&PostgresDialect::new()).unwrap(), "INT");
        assert_eq!(ColumnType::integer().sql_type(&OracleDialect::new()).unwrap(), "NUMBER(10)");
        assert_eq!(
            ColumnType::uinteger().sql_type(&MySqlDialect::new()).unwrap(),
            "INT UNSIGNED"
        );
    }

    #[test]
    fn test_auto_increment_resolution() {
        let ty = ColumnType::integer().auto_increment();
        assert_eq!(ty.sql_type(&PostgresDialect::new()).unwrap(), "SERIAL");
        assert_eq!(ty.sql_type(&MySqlDialect::new()).unwrap(), "INT AUTO_INCREMENT");
        assert_eq!(ty.sql_type(&SqlServerDialect::new()).unwrap(), "INT IDENTITY(1,1)");
        // Oracle needs a sequence, so only the base type is emitted.
        assert!(ty.uses_sequence(&OracleDialect::new()));
        assert_eq!(ty.sql_type(&OracleDialect::new()).unwrap(), "NUMBER(10)");
        assert_eq!(ty.base_sql_type(&PostgresDialect::new()).unwrap(), "INT");
    }

    #[test]
    fn test_explicit_sequence_ignored_without_sequence_support() {
        let ty = ColumnType::big_int().auto_increment_with_sequence("ids");
        assert!(ty.uses_sequence(&PostgresDialect::new()));
        assert!(!ty.uses_sequence(&SqliteDialect::new()));
        assert_eq!(
            ty.sql_type(&SqliteDialect::new()).unwrap(),
            "INTEGER PRIMARY KEY AUTOINCREMENT"
        );
    }

    #[test]
    fn test_jsonb_outside_supported_vendors_fails() {
        let err = ColumnType::jsonb().sql_type(&MySqlDialect::new()).unwrap_err();
        assert!(matches!(err, DialectError::Unsupported { .. }));
        assert_eq!(ColumnType::jsonb().sql_type(&PostgresDialect::new()).unwrap(), "JSONB");
    }

    #[test]
    fn test_literal_escaping() {
        let ty = ColumnType::varchar(20);
        let value = SqlValue::Text(String::from("it's"));
        assert_eq!(ty.value_to_literal(&value, &SqliteDialect::new()).unwrap(), "'it''s'");
        let value = SqlValue::Text(String::from("a\nb"));
        assert_eq!(ty.value_to_literal(&value, &MySqlDialect::new()).unwrap(), "'a\\nb'");
        assert_eq!(ty.value_to_literal(&value, &PostgresDialect::new()).unwrap(), "E'a\\nb'");
    }

    #[test]
    fn test_boolean_literals() {
        let ty = ColumnType::boolean();
        let t = SqlValue::Bool(true);
        assert_eq!(ty.value_to_literal(&t, &PostgresDialect::new()).unwrap(), "TRUE");
        assert_eq!(ty.value_to_literal(&t, &SqlServerDialect::new()).unwrap(), "1");
        assert_eq!(ty.value_to_literal(&t, &OracleDialect::new()).unwrap(), "1");
    }

    #[test]
    fn test_uuid_parameter_is_bytes_on_mysql() {
        let id = Uuid::nil();
        let ty = ColumnType::uuid();
        let param = ty.to_parameter(&SqlValue::Uuid(id), &MySqlDialect::new()).unwrap();
        assert_eq!(param, SqlValue::Blob(vec![0; 16]));
        let param = ty.to_parameter(&SqlValue::Uuid(id), &PostgresDialect::new()).unwrap();
        assert_eq!(param, SqlValue::Uuid(id));
    }

    #[test]
    fn test_value_mismatch_is_rejected() {
        let err = ColumnType::integer()
            .value_to_literal(&SqlValue::Text(String::from("abc")), &PostgresDialect::new())
            .unwrap_err();
        assert!(matches!(err, DialectError::InvalidValue { .. }));
        let err = ColumnType::tiny_int()
            .value_to_literal(&SqlValue::Int(300), &PostgresDialect::new())
            .unwrap_err();
        assert!(matches!(err, DialectError::InvalidValue { .. }));
    }

    #[test]
    fn test_parse_raw_boolean_and_uuid() {
        let dialect = OracleDialect::new();
        let parsed = ColumnType::boolean()
            .parse_raw(SqlValue::Text(String::from("1")), &dialect)
            .unwrap();
        assert_eq!(parsed, SqlValue::Bool(true));
        let id = Uuid::new_v4();
        let parsed = ColumnType::uuid()
            .parse_raw(SqlValue::Blob(id.as_bytes().to_vec()), &dialect)
            .unwrap();
        assert_eq!(parsed, SqlValue::Uuid(id));
    }

    #[test]
    fn test_enumeration_storage() {
        let by_name = ColumnType::enumeration_by_name(["RED", "GREEN"]);
        let by_ordinal = ColumnType::enumeration_by_ordinal(["RED", "GREEN"]);
        let pg = PostgresDialect::new();
        assert_eq!(by_name.sql_type(&pg).unwrap(), "VARCHAR(5)");
        assert_eq!(by_ordinal.sql_type(&pg).unwrap(), "INT");
        let green = SqlValue::Text(String::from("GREEN"));
        assert_eq!(by_ordinal.value_to_literal(&green, &pg).unwrap(), "1");
        assert_eq!(by_name.value_to_literal(&green, &pg).unwrap(), "'GREEN'");
        assert!(by_name
            .value_to_literal(&SqlValue::Text(String::from("BLUE")), &pg)
            .is_err());
    }

    #[test]
    fn test_serde_shape() {
        let ty: ColumnType =
            serde_json::from_str(r#"{"type":"varchar","length":42,"nullable":true}"#).unwrap();
        assert_eq!(ty, ColumnType::varchar(42).nullable());
    }
}
