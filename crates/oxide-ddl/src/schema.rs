//! JSON schema files.
//!
//! A schema file lists tables and free-standing sequences:
//!
//! ```json
//! {
//!   "tables": [{
//!     "name": "users",
//!     "columns": [
//!       {"name": "id", "type": "integer", "auto_increment": true},
//!       {"name": "email", "type": "varchar", "length": 120, "nullable": true},
//!       {"name": "active", "type": "boolean", "default": true}
//!     ],
//!     "primary_key": {"columns": ["id"]},
//!     "indices": [{"columns": ["email"], "unique": true}]
//!   }],
//!   "sequences": [{"name": "invoice_no", "start": 1000}]
//! }
//! ```
//!
//! Column types use the same tagged form as [`ColumnType`]'s serde
//! representation. Filters, checks and expression defaults are raw SQL.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use oxide_dialect::schema::{Column, Index, ReferenceAction, Sequence, Table};
use oxide_dialect::{raw, ColumnType, SqlValue};
use serde::Deserialize;

/// Root of a schema file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchemaFile {
    /// Tables.
    #[serde(default)]
    pub tables: Vec<TableSpec>,
    /// Sequences not tied to an auto-increment column.
    #[serde(default)]
    pub sequences: Vec<SequenceSpec>,
}

/// One table.
#[derive(Debug, Clone, Deserialize)]
pub struct TableSpec {
    /// Table name.
    pub name: String,
    /// Columns in order.
    pub columns: Vec<ColumnSpec>,
    /// Primary key.
    #[serde(default)]
    pub primary_key: Option<PrimaryKeySpec>,
    /// Indices.
    #[serde(default)]
    pub indices: Vec<IndexSpec>,
    /// Check constraints.
    #[serde(default)]
    pub checks: Vec<CheckSpec>,
}

/// One column.
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnSpec {
    /// Column name.
    pub name: String,
    /// Column type and nullability.
    #[serde(flatten)]
    pub ty: ColumnType,
    /// Wraps the type in an auto-increment.
    #[serde(default)]
    pub auto_increment: bool,
    /// Explicit sequence for the auto-increment.
    #[serde(default)]
    pub sequence: Option<String>,
    /// Literal default.
    #[serde(default)]
    pub default: Option<serde_json::Value>,
    /// Raw SQL default, used when `default` is absent.
    #[serde(default)]
    pub default_expression: Option<String>,
    /// Foreign-key reference.
    #[serde(default)]
    pub references: Option<ReferenceSpec>,
    /// Column comment.
    #[serde(default)]
    pub comment: Option<String>,
}

/// A foreign-key reference.
#[derive(Debug, Clone, Deserialize)]
pub struct ReferenceSpec {
    /// Referenced table.
    pub table: String,
    /// Referenced column.
    pub column: String,
    /// `ON DELETE` action.
    #[serde(default)]
    pub on_delete: Option<ReferenceAction>,
    /// `ON UPDATE` action.
    #[serde(default)]
    pub on_update: Option<ReferenceAction>,
    /// Constraint name.
    #[serde(default)]
    pub name: Option<String>,
}

/// A primary key.
#[derive(Debug, Clone, Deserialize)]
pub struct PrimaryKeySpec {
    /// Key columns.
    pub columns: Vec<String>,
    /// Constraint name.
    #[serde(default)]
    pub name: Option<String>,
}

/// An index.
#[derive(Debug, Clone, Deserialize)]
pub struct IndexSpec {
    /// Indexed columns.
    pub columns: Vec<String>,
    /// Unique index.
    #[serde(default)]
    pub unique: bool,
    /// Index name; derived from the columns when absent.
    #[serde(default)]
    pub name: Option<String>,
    /// Vendor index type such as `HASH` or `GIN`.
    #[serde(default)]
    pub index_type: Option<String>,
    /// Partial-index predicate.
    #[serde(default)]
    pub filter: Option<String>,
}

/// A named check constraint.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckSpec {
    /// Constraint name.
    pub name: String,
    /// Raw SQL condition.
    pub condition: String,
}

/// A free-standing sequence.
#[derive(Debug, Clone, Deserialize)]
pub struct SequenceSpec {
    /// Sequence name.
    pub name: String,
    /// `START WITH`.
    #[serde(default)]
    pub start: Option<i64>,
    /// `INCREMENT BY`.
    #[serde(default)]
    pub increment: Option<i64>,
    /// `MINVALUE`.
    #[serde(default)]
    pub min_value: Option<i64>,
    /// `MAXVALUE`.
    #[serde(default)]
    pub max_value: Option<i64>,
    /// `CYCLE`.
    #[serde(default)]
    pub cycle: Option<bool>,
    /// `CACHE`.
    #[serde(default)]
    pub cache: Option<i64>,
}

impl SchemaFile {
    /// Reads and parses a schema file.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or is not a valid schema.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("cannot read schema file {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("invalid schema file {}", path.display()))
    }

    /// Builds the declared tables.
    ///
    /// # Errors
    ///
    /// Fails on duplicate columns or keys and indices over unknown columns.
    pub fn tables(&self) -> Result<Vec<Table>> {
        self.tables
            .iter()
            .map(|t| t.build().with_context(|| format!("in table '{}'", t.name)))
            .collect()
    }

    /// Builds the free-standing sequences.
    #[must_use]
    pub fn sequences(&self) -> Vec<Sequence> {
        self.sequences.iter().map(SequenceSpec::build).collect()
    }
}

impl TableSpec {
    fn build(&self) -> Result<Table> {
        let mut table = Table::new(&self.name);
        for spec in &self.columns {
            table.add(spec.build())?;
        }
        if let Some(pk) = &self.primary_key {
            let columns: Vec<&str> = pk.columns.iter().map(String::as_str).collect();
            table.set_primary_key(&columns, pk.name.as_deref())?;
        }
        for spec in &self.indices {
            table.add_index(spec.build())?;
        }
        for check in &self.checks {
            table.add_check(&check.name, raw(&check.condition));
        }
        Ok(table)
    }
}

impl ColumnSpec {
    fn build(&self) -> Column {
        let mut column = Column::new(&self.name, self.ty.clone());
        column = match (&self.sequence, self.auto_increment) {
            (Some(sequence), _) => column.auto_increment_with_sequence(sequence),
            (None, true) => column.auto_increment(),
            (None, false) => column,
        };
        if let Some(value) = self.default.as_ref().and_then(json_to_value) {
            column = column.default_value(value);
        } else if let Some(expression) = &self.default_expression {
            column = column.default_expression(raw(expression));
        }
        if let Some(reference) = &self.references {
            column = column.references(&reference.table, &reference.column);
            if let Some(action) = reference.on_delete {
                column = column.on_delete(action);
            }
            if let Some(action) = reference.on_update {
                column = column.on_update(action);
            }
            if let Some(name) = &reference.name {
                column = column.reference_name(name);
            }
        }
        if let Some(comment) = &self.comment {
            column = column.comment(comment);
        }
        column
    }
}

impl IndexSpec {
    fn build(&self) -> Index {
        let columns: Vec<&str> = self.columns.iter().map(String::as_str).collect();
        let mut index = if self.unique {
            Index::unique(&columns)
        } else {
            Index::new(&columns)
        };
        if let Some(name) = &self.name {
            index = index.named(name);
        }
        if let Some(tag) = &self.index_type {
            index = index.index_type(tag);
        }
        if let Some(filter) = &self.filter {
            index = index.filter(raw(filter));
        }
        index
    }
}

impl SequenceSpec {
    fn build(&self) -> Sequence {
        let mut sequence = Sequence::new(&self.name);
        sequence.start = self.start;
        sequence.increment = self.increment;
        sequence.min_value = self.min_value;
        sequence.max_value = self.max_value;
        sequence.cycle = self.cycle;
        sequence.cache = self.cache;
        sequence
    }
}

/// A JSON default as a domain value; `null` means no default.
fn json_to_value(value: &serde_json::Value) -> Option<SqlValue> {
    use serde_json::Value;
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(SqlValue::Bool(*b)),
        Value::Number(n) => n
            .as_i64()
            .map(SqlValue::Int)
            .or_else(|| n.as_u64().map(SqlValue::UInt))
            .or_else(|| n.as_f64().map(SqlValue::Float)),
        Value::String(s) => Some(SqlValue::Text(s.clone())),
        Value::Array(_) | Value::Object(_) => Some(SqlValue::Json(value.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxide_dialect::dialect::PostgresDialect;

    const USERS: &str = r#"{
        "tables": [{
            "name": "users",
            "columns": [
                {"name": "id", "type": "integer", "auto_increment": true},
                {"name": "name", "type": "varchar", "length": 50},
                {"name": "email", "type": "varchar", "length": 120, "nullable": true},
                {"name": "active", "type": "boolean", "default": true}
            ],
            "primary_key": {"columns": ["id"]},
            "indices": [{"columns": ["email"], "unique": true}]
        }]
    }"#;

    #[test]
    fn test_users_schema_builds() {
        let schema: SchemaFile = serde_json::from_str(USERS).unwrap();
        let tables = schema.tables().unwrap();
        assert_eq!(tables.len(), 1);
        let users = &tables[0];
        assert_eq!(users.columns.len(), 4);
        assert!(users.columns[0].ty.is_auto_increment());
        assert!(users.columns[2].is_nullable());
        assert_eq!(users.indices[0].index_name(), "users_email_unique");

        let ddl = users.create_statements(&PostgresDialect::new()).unwrap();
        assert_eq!(
            ddl[0],
            "CREATE TABLE IF NOT EXISTS users (id SERIAL PRIMARY KEY NOT NULL, \
             name VARCHAR(50) NOT NULL, email VARCHAR(120) NULL, \
             active BOOLEAN DEFAULT TRUE NOT NULL)"
        );
    }

    #[test]
    fn test_unknown_key_column_is_reported_with_table() {
        let json = r#"{"tables": [{
            "name": "t",
            "columns": [{"name": "a", "type": "integer"}],
            "primary_key": {"columns": ["b"]}
        }]}"#;
        let schema: SchemaFile = serde_json::from_str(json).unwrap();
        let err = schema.tables().unwrap_err();
        assert!(format!("{err:#}").contains("in table 't'"));
    }

    #[test]
    fn test_json_defaults() {
        assert_eq!(json_to_value(&serde_json::json!(null)), None);
        assert_eq!(json_to_value(&serde_json::json!(3)), Some(SqlValue::Int(3)));
        assert_eq!(
            json_to_value(&serde_json::json!("x")),
            Some(SqlValue::Text(String::from("x")))
        );
    }

    #[test]
    fn test_sequences_keep_parameters() {
        let schema: SchemaFile =
            serde_json::from_str(r#"{"sequences": [{"name": "invoice_no", "start": 1000}]}"#)
                .unwrap();
        let sequences = schema.sequences();
        assert_eq!(sequences[0].name, "invoice_no");
        assert_eq!(sequences[0].start, Some(1000));
        assert_eq!(sequences[0].increment, None);
    }
}
