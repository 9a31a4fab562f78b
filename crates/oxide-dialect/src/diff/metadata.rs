//! Snapshots of live database metadata.
//!
//! The diff engine reads these through [`MetadataSource`]. A
//! [`DatabaseSnapshot`] is an in-memory source that can also be loaded from
//! JSON.

use serde::{Deserialize, Serialize};

use crate::error::{DialectError, Result};

/// A column as it exists in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMetadata {
    /// Column name as stored by the database.
    pub name: String,
    /// Type name as reported by the database.
    pub sql_type: String,
    /// Whether NULL is allowed.
    pub nullable: bool,
    /// Length or precision.
    #[serde(default)]
    pub size: Option<u32>,
    /// Scale.
    #[serde(default)]
    pub scale: Option<u32>,
    /// Default expression text as reported.
    #[serde(default)]
    pub default: Option<String>,
    /// Identity / auto-increment column.
    #[serde(default)]
    pub auto_increment: bool,
    /// Column comment.
    #[serde(default)]
    pub comment: Option<String>,
}

impl ColumnMetadata {
    /// A non-null column with no size, default or comment.
    #[must_use]
    pub fn new(name: &str, sql_type: &str) -> Self {
        Self {
            name: String::from(name),
            sql_type: String::from(sql_type),
            nullable: false,
            size: None,
            scale: None,
            default: None,
            auto_increment: false,
            comment: None,
        }
    }

    /// Marks the column nullable.
    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Sets the size.
    #[must_use]
    pub const fn size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    /// Sets size and scale.
    #[must_use]
    pub const fn precision(mut self, size: u32, scale: u32) -> Self {
        self.size = Some(size);
        self.scale = Some(scale);
        self
    }

    /// Sets the reported default.
    #[must_use]
    pub fn with_default(mut self, default: &str) -> Self {
        self.default = Some(String::from(default));
        self
    }

    /// Marks the column auto-increment.
    #[must_use]
    pub const fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    /// Sets the comment.
    #[must_use]
    pub fn comment(mut self, comment: &str) -> Self {
        self.comment = Some(String::from(comment));
        self
    }
}

/// A primary key as it exists in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryKeyMetadata {
    /// Constraint name.
    #[serde(default)]
    pub name: Option<String>,
    /// Key columns in order.
    pub columns: Vec<String>,
}

/// An index as it exists in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMetadata {
    /// Index name.
    pub name: String,
    /// Indexed columns in order.
    pub columns: Vec<String>,
    /// Unique index.
    #[serde(default)]
    pub unique: bool,
    /// Partial-index predicate text.
    #[serde(default)]
    pub filter: Option<String>,
}

/// Everything known about one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableMetadata {
    /// Table name.
    pub name: String,
    /// Columns.
    pub columns: Vec<ColumnMetadata>,
    /// Primary key.
    #[serde(default)]
    pub primary_key: Option<PrimaryKeyMetadata>,
    /// Indices, excluding the primary key's own index.
    #[serde(default)]
    pub indices: Vec<IndexMetadata>,
}

/// Supplies live metadata to the diff engine.
pub trait MetadataSource {
    /// Whether the table exists.
    fn table_exists(&self, table: &str) -> bool;

    /// Existing columns.
    ///
    /// # Errors
    ///
    /// [`DialectError::MissingMetadata`] when nothing is known for the table.
    fn columns(&self, table: &str) -> Result<Vec<ColumnMetadata>>;

    /// Existing primary key.
    ///
    /// # Errors
    ///
    /// [`DialectError::MissingMetadata`] when nothing is known for the table.
    fn primary_key(&self, table: &str) -> Result<Option<PrimaryKeyMetadata>>;

    /// Existing indices.
    ///
    /// # Errors
    ///
    /// [`DialectError::MissingMetadata`] when nothing is known for the table.
    fn indices(&self, table: &str) -> Result<Vec<IndexMetadata>>;

    /// Existing sequence names.
    fn sequences(&self) -> Vec<String>;

    /// Drops any cached state so the next read observes the database again.
    fn reset_cache(&mut self) {}
}

/// In-memory metadata, loadable from JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSnapshot {
    /// Tables.
    #[serde(default)]
    pub tables: Vec<TableMetadata>,
    /// Sequence names.
    #[serde(default)]
    pub sequences: Vec<String>,
}

impl DatabaseSnapshot {
    /// An empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a table.
    #[must_use]
    pub fn with_table(mut self, table: TableMetadata) -> Self {
        self.tables.push(table);
        self
    }

    /// Adds a sequence name.
    #[must_use]
    pub fn with_sequence(mut self, name: &str) -> Self {
        self.sequences.push(String::from(name));
        self
    }

    /// Looks a table up, ignoring case.
    #[must_use]
    pub fn table(&self, name: &str) -> Option<&TableMetadata> {
        self.tables
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
    }

    fn require(&self, name: &str) -> Result<&TableMetadata> {
        self.table(name).ok_or_else(|| DialectError::MissingMetadata {
            table: String::from(name),
        })
    }
}

impl MetadataSource for DatabaseSnapshot {
    fn table_exists(&self, table: &str) -> bool {
        self.table(table).is_some()
    }

    fn columns(&self, table: &str) -> Result<Vec<ColumnMetadata>> {
        Ok(self.require(table)?.columns.clone())
    }

    fn primary_key(&self, table: &str) -> Result<Option<PrimaryKeyMetadata>> {
        Ok(self.require(table)?.primary_key.clone())
    }

    fn indices(&self, table: &str) -> Result<Vec<IndexMetadata>> {
        Ok(self.require(table)?.indices.clone())
    }

    fn sequences(&self) -> Vec<String> {
        self.sequences.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_lookup_ignores_case() {
        let snapshot = DatabaseSnapshot::new().with_table(TableMetadata {
            name: String::from("USERS"),
            columns: vec![ColumnMetadata::new("ID", "NUMBER").size(10)],
            primary_key: None,
            indices: Vec::new(),
        });
        assert!(snapshot.table_exists("users"));
        assert_eq!(snapshot.columns("users").unwrap().len(), 1);
    }

    #[test]
    fn test_unknown_table_is_missing_metadata() {
        let snapshot = DatabaseSnapshot::new();
        assert_eq!(
            snapshot.columns("ghost").unwrap_err(),
            DialectError::MissingMetadata {
                table: String::from("ghost")
            }
        );
    }

    #[test]
    fn test_snapshot_from_json() {
        let json = r#"{
            "tables": [{
                "name": "users",
                "columns": [{"name": "id", "sql_type": "integer", "nullable": false, "auto_increment": true}],
                "primary_key": {"columns": ["id"]}
            }],
            "sequences": ["users_id_seq"]
        }"#;
        let snapshot: DatabaseSnapshot = serde_json::from_str(json).unwrap();
        assert!(snapshot.tables[0].columns[0].auto_increment);
        assert_eq!(snapshot.sequences(), vec![String::from("users_id_seq")]);
    }
}
