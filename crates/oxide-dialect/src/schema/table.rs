//! Table model.

use super::column::{Column, ReferenceAction};
use super::index::Index;
use crate::ddl::{self, DdlOptions};
use crate::dialect::Dialect;
use crate::error::{DialectError, Result};
use crate::expr::{ColumnRef, Expr};
use crate::types::ColumnType;

/// A declared primary key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PrimaryKey {
    /// Key columns in order.
    pub columns: Vec<String>,
    /// Explicit constraint name.
    pub name: Option<String>,
}

/// A named `CHECK` constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CheckConstraint {
    /// Constraint name.
    pub name: String,
    /// Predicate.
    pub condition: Expr,
}

/// A foreign key derived from a column reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ForeignKey {
    /// Referencing table.
    pub table: String,
    /// Referencing columns.
    pub columns: Vec<String>,
    /// Referenced table.
    pub target_table: String,
    /// Referenced columns.
    pub target_columns: Vec<String>,
    /// `ON UPDATE` action.
    pub on_update: Option<ReferenceAction>,
    /// `ON DELETE` action.
    pub on_delete: Option<ReferenceAction>,
    /// Explicit constraint name.
    pub name: Option<String>,
}

impl ForeignKey {
    /// Explicit name or `fk_{table}_{columns}__{target columns}`.
    #[must_use]
    pub fn constraint_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| {
            format!(
                "fk_{}_{}__{}",
                self.table,
                self.columns.join("_"),
                self.target_columns.join("_")
            )
        })
    }
}

/// A declared table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    /// Table name.
    pub name: String,
    /// Columns in declaration order.
    pub columns: Vec<Column>,
    /// Primary key.
    pub primary_key: Option<PrimaryKey>,
    /// Indices.
    pub indices: Vec<Index>,
    /// Check constraints.
    pub checks: Vec<CheckConstraint>,
}

impl Table {
    /// An empty table.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: String::from(name),
            columns: Vec::new(),
            primary_key: None,
            indices: Vec::new(),
            checks: Vec::new(),
        }
    }

    /// Adds a column.
    ///
    /// # Errors
    ///
    /// Fails with a validation error when the name is already taken.
    pub fn add(&mut self, mut column: Column) -> Result<ColumnRef> {
        if self.get(&column.name).is_some() {
            return Err(DialectError::validation(format!(
                "column '{}' is declared twice in table '{}'",
                column.name, self.name
            )));
        }
        column.table.clone_from(&self.name);
        let reference = column.to_ref();
        self.columns.push(column);
        Ok(reference)
    }

    /// Adds a plain column of the given type.
    ///
    /// # Errors
    ///
    /// Fails with a validation error when the name is already taken.
    pub fn column(&mut self, name: &str, ty: ColumnType) -> Result<ColumnRef> {
        self.add(Column::new(name, ty))
    }

    /// Replaces a column with a transformed copy at the same position.
    ///
    /// # Errors
    ///
    /// Fails when no such column exists or the new name collides.
    pub fn replace_column(&mut self, name: &str, f: impl FnOnce(Column) -> Column) -> Result<()> {
        let position = self
            .columns
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| {
                DialectError::validation(format!("table '{}' has no column '{name}'", self.name))
            })?;
        let mut replacement = f(self.columns[position].clone());
        replacement.table.clone_from(&self.name);
        let collides = self
            .columns
            .iter()
            .enumerate()
            .any(|(i, c)| i != position && c.name == replacement.name);
        if collides {
            return Err(DialectError::validation(format!(
                "column '{}' is declared twice in table '{}'",
                replacement.name, self.name
            )));
        }
        self.columns[position] = replacement;
        Ok(())
    }

    /// Looks a column up by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// A typed reference to a column.
    #[must_use]
    pub fn column_ref(&self, name: &str) -> Option<ColumnRef> {
        self.get(name).map(Column::to_ref)
    }

    /// Declares the primary key.
    ///
    /// # Errors
    ///
    /// Fails when a key column is unknown or no column is given.
    pub fn set_primary_key(&mut self, columns: &[&str], name: Option<&str>) -> Result<()> {
        if columns.is_empty() {
            return Err(DialectError::validation(format!(
                "primary key of '{}' has no columns",
                self.name
            )));
        }
        self.check_columns(columns, "primary key")?;
        self.primary_key = Some(PrimaryKey {
            columns: columns.iter().map(|c| String::from(*c)).collect(),
            name: name.map(String::from),
        });
        Ok(())
    }

    /// Adds an index.
    ///
    /// # Errors
    ///
    /// Fails when an indexed column does not belong to this table.
    pub fn add_index(&mut self, mut index: Index) -> Result<()> {
        let columns: Vec<&str> = index.columns.iter().map(String::as_str).collect();
        self.check_columns(&columns, "index")?;
        if index.columns.is_empty() && index.functions.is_empty() {
            return Err(DialectError::validation(format!(
                "index on '{}' has neither columns nor expressions",
                self.name
            )));
        }
        index.table.clone_from(&self.name);
        self.indices.push(index);
        Ok(())
    }

    /// Adds a check constraint.
    pub fn add_check(&mut self, name: &str, condition: Expr) {
        self.checks.push(CheckConstraint {
            name: String::from(name),
            condition,
        });
    }

    fn check_columns(&self, columns: &[&str], what: &str) -> Result<()> {
        for c in columns {
            if self.get(c).is_none() {
                return Err(DialectError::validation(format!(
                    "{what} column '{c}' does not belong to table '{}'",
                    self.name
                )));
            }
        }
        Ok(())
    }

    /// Foreign keys derived from column references.
    #[must_use]
    pub fn foreign_keys(&self) -> Vec<ForeignKey> {
        self.columns
            .iter()
            .filter_map(|c| {
                c.references.as_ref().map(|r| ForeignKey {
                    table: self.name.clone(),
                    columns: vec![c.name.clone()],
                    target_table: r.table.clone(),
                    target_columns: vec![r.column.clone()],
                    on_update: r.on_update,
                    on_delete: r.on_delete,
                    name: r.name.clone(),
                })
            })
            .collect()
    }

    /// Whether `column` is part of the primary key.
    #[must_use]
    pub fn is_primary_key_column(&self, column: &str) -> bool {
        self.primary_key
            .as_ref()
            .is_some_and(|pk| pk.columns.iter().any(|c| c == column))
    }

    /// The primary key column when the key has exactly one.
    #[must_use]
    pub fn single_primary_key_column(&self) -> Option<&Column> {
        match self.primary_key.as_ref().map(|pk| pk.columns.as_slice()) {
            Some([only]) => self.get(only),
            _ => None,
        }
    }

    /// Constraint name of the primary key: explicit or `pk_{table}`.
    #[must_use]
    pub fn primary_key_name(&self) -> String {
        self.primary_key
            .as_ref()
            .and_then(|pk| pk.name.clone())
            .unwrap_or_else(|| format!("pk_{}", self.name))
    }

    /// Statements creating this table with default options.
    ///
    /// # Errors
    ///
    /// Propagates rendering failures.
    pub fn create_statements(&self, dialect: &dyn Dialect) -> Result<Vec<String>> {
        ddl::create_statements(std::slice::from_ref(self), dialect, &DdlOptions::default())
    }

    /// Statements dropping this table.
    ///
    /// # Errors
    ///
    /// Propagates rendering failures.
    pub fn drop_statements(&self, dialect: &dyn Dialect) -> Result<Vec<String>> {
        ddl::drop_statements(std::slice::from_ref(self), dialect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> Table {
        let mut t = Table::new("users");
        t.add(Column::new("id", ColumnType::integer()).auto_increment())
            .unwrap();
        t.column("name", ColumnType::varchar(50)).unwrap();
        t.set_primary_key(&["id"], None).unwrap();
        t
    }

    #[test]
    fn test_duplicate_column_is_rejected() {
        let mut t = users();
        let err = t.column("name", ColumnType::text()).unwrap_err();
        assert!(matches!(err, DialectError::Validation(_)));
    }

    #[test]
    fn test_primary_key_must_use_known_columns() {
        let mut t = users();
        assert!(t.set_primary_key(&["missing"], None).is_err());
        assert!(t.set_primary_key(&[], None).is_err());
    }

    #[test]
    fn test_replace_column_keeps_position() {
        let mut t = users();
        let before = t.get("name").cloned().unwrap();
        t.replace_column("name", Column::nullable).unwrap();
        assert_eq!(t.columns[1].name, "name");
        assert!(t.columns[1].is_nullable());
        // The previous value is untouched.
        assert!(!before.is_nullable());
    }

    #[test]
    fn test_replace_column_rejects_collisions() {
        let mut t = users();
        let err = t
            .replace_column("name", |mut c| {
                c.name = String::from("id");
                c
            })
            .unwrap_err();
        assert!(matches!(err, DialectError::Validation(_)));
    }

    #[test]
    fn test_index_columns_must_belong_to_table() {
        let mut t = users();
        assert!(t.add_index(Index::new(&["nope"])).is_err());
        t.add_index(Index::unique(&["name"])).unwrap();
        assert_eq!(t.indices[0].table, "users");
    }

    #[test]
    fn test_foreign_keys_are_derived() {
        let mut t = Table::new("posts");
        t.add(Column::new("author", ColumnType::integer()).references("users", "id"))
            .unwrap();
        let fks = t.foreign_keys();
        assert_eq!(fks.len(), 1);
        assert_eq!(fks[0].constraint_name(), "fk_posts_author__id");
    }
}
