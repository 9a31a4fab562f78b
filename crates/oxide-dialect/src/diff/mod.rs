//! Schema diff engine.
//!
//! Compares declared [`Table`]s with live metadata from a
//! [`MetadataSource`] and produces the DDL needed to bring the database in
//! line. Statements come out grouped: missing sequences, missing tables,
//! added columns, modified columns, primary keys, then indices. Nothing here
//! ever emits a data-modifying statement.

mod equivalence;
mod metadata;

use std::collections::HashSet;
use std::fmt;

use tracing::{debug, info, warn};

pub use equivalence::{defaults_match, normalize_default, TypeEquivalence};
pub use metadata::{
    ColumnMetadata, DatabaseSnapshot, IndexMetadata, MetadataSource, PrimaryKeyMetadata,
    TableMetadata,
};

use crate::ddl::{self, DdlOptions};
use crate::dialect::{CommentStyle, Dialect};
use crate::error::Result;
use crate::render::QueryBuilder;
use crate::schema::{Column, Index, Table};

/// Which aspects of a live column differ from its declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct ColumnChanges {
    /// Type differs.
    pub ty: bool,
    /// Nullability differs.
    pub nullability: bool,
    /// Default differs.
    pub default: bool,
    /// Auto-increment differs.
    pub auto_increment: bool,
    /// Comment differs.
    pub comment: bool,
    /// Stored name when it differs from the declared one only by case.
    pub rename_from: Option<String>,
}

impl ColumnChanges {
    /// No difference at all.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        !self.ty
            && !self.nullability
            && !self.default
            && !self.auto_increment
            && !self.comment
            && self.rename_from.is_none()
    }

    /// The same changes without the rename.
    #[must_use]
    pub fn without_rename(&self) -> Self {
        Self {
            rename_from: None,
            ..self.clone()
        }
    }
}

/// Something the engine found but did not turn into DDL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffWarning {
    /// Several live indices cover the same columns; clean up by hand.
    DuplicateIndices {
        /// Table name.
        table: String,
        /// Names of the redundant indices.
        indices: Vec<String>,
    },
    /// A column change the dialect cannot apply in place.
    ColumnChangeSkipped {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
        /// The changes that were skipped.
        changes: ColumnChanges,
    },
    /// A primary key change the dialect cannot apply in place.
    PrimaryKeyChangeSkipped {
        /// Table name.
        table: String,
    },
}

impl fmt::Display for DiffWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateIndices { table, indices } => write!(
                f,
                "table '{table}' has duplicate indices {}; drop the redundant ones manually",
                indices.join(", ")
            ),
            Self::ColumnChangeSkipped {
                table,
                column,
                changes,
            } => write!(
                f,
                "column '{table}.{column}' differs ({changes:?}) but cannot be altered in place"
            ),
            Self::PrimaryKeyChangeSkipped { table } => write!(
                f,
                "primary key of '{table}' differs but cannot be altered in place"
            ),
        }
    }
}

/// Result of [`SchemaDiff::compute`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaDiff {
    /// DDL statements in execution order.
    pub statements: Vec<String>,
    /// Findings that need manual attention.
    pub warnings: Vec<DiffWarning>,
}

/// Statement groups, concatenated in field order.
#[derive(Default)]
struct Sections {
    sequences: Vec<String>,
    tables: Vec<String>,
    add_columns: Vec<String>,
    modify_columns: Vec<String>,
    primary_keys: Vec<String>,
    indices: Vec<String>,
}

impl SchemaDiff {
    /// Statements bringing the database described by `metadata` in line with
    /// `tables`.
    ///
    /// # Errors
    ///
    /// [`crate::DialectError::MissingMetadata`] when the source claims a
    /// table exists but cannot describe it; otherwise rendering failures.
    pub fn compute(
        tables: &[Table],
        metadata: &dyn MetadataSource,
        dialect: &dyn Dialect,
    ) -> Result<Self> {
        let mut sections = Sections::default();
        let mut warnings = Vec::new();

        let live_sequences: HashSet<String> = metadata
            .sequences()
            .iter()
            .map(|s| s.to_ascii_lowercase())
            .collect();
        for table in tables {
            for column in &table.columns {
                let Some(sequence) = column.auto_inc_sequence(dialect) else {
                    continue;
                };
                if !live_sequences.contains(&sequence.name.to_ascii_lowercase()) {
                    debug!(sequence = %sequence.name, "sequence missing");
                    sections
                        .sequences
                        .push(dialect.create_sequence(&sequence, true)?);
                }
            }
        }

        let (missing, existing): (Vec<&Table>, Vec<&Table>) = tables
            .iter()
            .partition(|t| !metadata.table_exists(&t.name));
        if !missing.is_empty() {
            let missing: Vec<Table> = missing.into_iter().cloned().collect();
            for table in &missing {
                debug!(table = %table.name, "table missing");
            }
            let opts = DdlOptions {
                sequences: false,
                ..DdlOptions::default()
            };
            sections
                .tables
                .extend(ddl::create_statements(&missing, dialect, &opts)?);
        }

        for table in existing {
            diff_columns(table, metadata, dialect, &mut sections, &mut warnings)?;
            diff_primary_key(table, metadata, dialect, &mut sections, &mut warnings)?;
            diff_indices(table, metadata, dialect, &mut sections, &mut warnings)?;
        }

        for warning in &warnings {
            warn!(dialect = dialect.name(), "{warning}");
        }
        let statements: Vec<String> = [
            sections.sequences,
            sections.tables,
            sections.add_columns,
            sections.modify_columns,
            sections.primary_keys,
            sections.indices,
        ]
        .into_iter()
        .flatten()
        .collect();
        info!(
            dialect = dialect.name(),
            statements = statements.len(),
            warnings = warnings.len(),
            "schema diff computed"
        );
        Ok(Self {
            statements,
            warnings,
        })
    }

    /// Whether the database already matches.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty() && self.warnings.is_empty()
    }
}

// ================================================================
// Columns
// ================================================================

/// The live column for a declared one: exact name, else case-insensitive.
fn find_live<'a>(live: &'a [ColumnMetadata], column: &Column) -> Option<&'a ColumnMetadata> {
    live.iter()
        .find(|m| m.name == column.name)
        .or_else(|| live.iter().find(|m| m.name.eq_ignore_ascii_case(&column.name)))
}

/// What differs between a declared column and its live counterpart.
///
/// # Errors
///
/// Fails when the declared type or default cannot be rendered.
pub fn column_changes(
    column: &Column,
    live: &ColumnMetadata,
    dialect: &dyn Dialect,
) -> Result<ColumnChanges> {
    let declared_auto = column.ty.is_auto_increment() && !column.ty.uses_sequence(dialect);
    let ty = !dialect.are_equivalent_column_types(&column.ty.base_sql_type(dialect)?, live);
    let default = if column.ty.is_auto_increment() {
        false
    } else {
        let declared = column
            .default_sql(dialect)?
            .and_then(|d| dialect.normalize_default(&d));
        let current = live
            .default
            .as_deref()
            .and_then(|d| dialect.normalize_default(d));
        !defaults_match(declared.as_deref(), current.as_deref())
    };
    let comment = dialect.capabilities().comment_style != CommentStyle::Unsupported
        && column.comment.as_deref().unwrap_or_default()
            != live.comment.as_deref().unwrap_or_default();
    let rename_from = (live.name != dialect.fold_identifier(&column.name)
        && live.name != column.name)
        .then(|| live.name.clone());
    Ok(ColumnChanges {
        ty,
        nullability: column.is_nullable() != live.nullable,
        default,
        auto_increment: declared_auto != live.auto_increment,
        comment,
        rename_from,
    })
}

fn diff_columns(
    table: &Table,
    metadata: &dyn MetadataSource,
    dialect: &dyn Dialect,
    sections: &mut Sections,
    warnings: &mut Vec<DiffWarning>,
) -> Result<()> {
    let caps = dialect.capabilities();
    let live = metadata.columns(&table.name)?;
    for column in &table.columns {
        let Some(current) = find_live(&live, column) else {
            debug!(table = %table.name, column = %column.name, "column missing");
            sections.add_columns.extend(dialect.add_column(column)?);
            continue;
        };
        let mut changes = column_changes(column, current, dialect)?;
        if changes.is_empty() {
            continue;
        }
        debug!(table = %table.name, column = %column.name, ?changes, "column differs");
        if changes.auto_increment && !caps.supports_auto_increment_change {
            warnings.push(DiffWarning::ColumnChangeSkipped {
                table: table.name.clone(),
                column: column.name.clone(),
                changes: ColumnChanges {
                    auto_increment: true,
                    ..ColumnChanges::default()
                },
            });
            changes.auto_increment = false;
        }
        let in_place = changes.without_rename();
        if !caps.supports_column_type_change
            && (in_place.ty || in_place.nullability || in_place.default || in_place.auto_increment)
        {
            warnings.push(DiffWarning::ColumnChangeSkipped {
                table: table.name.clone(),
                column: column.name.clone(),
                changes: in_place,
            });
            changes = ColumnChanges {
                comment: changes.comment,
                rename_from: changes.rename_from,
                ..ColumnChanges::default()
            };
        }
        if changes.is_empty() {
            continue;
        }
        sections
            .modify_columns
            .extend(dialect.modify_column_with_metadata(column, current, &changes)?);
    }
    Ok(())
}

// ================================================================
// Primary keys
// ================================================================

fn same_columns(a: &[String], b: &[String]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.eq_ignore_ascii_case(y))
}

fn diff_primary_key(
    table: &Table,
    metadata: &dyn MetadataSource,
    dialect: &dyn Dialect,
    sections: &mut Sections,
    warnings: &mut Vec<DiffWarning>,
) -> Result<()> {
    let live = metadata.primary_key(&table.name)?;
    let declared = table.primary_key.as_ref();
    let unchanged = match (declared, &live) {
        (None, None) => true,
        (Some(d), Some(l)) => same_columns(&d.columns, &l.columns),
        _ => false,
    };
    if unchanged {
        return Ok(());
    }
    debug!(table = %table.name, "primary key differs");
    if !dialect.capabilities().supports_alter_primary_key {
        warnings.push(DiffWarning::PrimaryKeyChangeSkipped {
            table: table.name.clone(),
        });
        return Ok(());
    }
    if let Some(live) = &live {
        sections
            .primary_keys
            .push(dialect.drop_primary_key(&table.name, live.name.as_deref())?);
    }
    if let Some(declared) = declared {
        let name = dialect.truncate_identifier(&table.primary_key_name());
        sections
            .primary_keys
            .push(dialect.add_primary_key(&table.name, &name, &declared.columns)?);
    }
    Ok(())
}

// ================================================================
// Indices
// ================================================================

fn filter_text(index: &Index, dialect: &dyn Dialect) -> Result<Option<String>> {
    let Some(filter) = &index.filter else {
        return Ok(None);
    };
    let mut qb = QueryBuilder::inline(dialect);
    filter.render(&mut qb)?;
    Ok(normalize_default(&qb.finish().sql))
}

fn same_index(
    declared: &Index,
    declared_filter: Option<&str>,
    live: &IndexMetadata,
) -> bool {
    if !declared.functions.is_empty() {
        return declared.index_name().eq_ignore_ascii_case(&live.name);
    }
    let live_filter = live.filter.as_deref().and_then(normalize_default);
    declared.unique == live.unique
        && same_columns(&declared.columns, &live.columns)
        && declared_filter == live_filter.as_deref()
}

fn diff_indices(
    table: &Table,
    metadata: &dyn MetadataSource,
    dialect: &dyn Dialect,
    sections: &mut Sections,
    warnings: &mut Vec<DiffWarning>,
) -> Result<()> {
    let live = metadata.indices(&table.name)?;
    let mut matched = vec![false; live.len()];
    let mut creates = Vec::new();

    for index in &table.indices {
        let filter = filter_text(index, dialect)?;
        let hits: Vec<usize> = live
            .iter()
            .enumerate()
            .filter(|(_, l)| same_index(index, filter.as_deref(), l))
            .map(|(i, _)| i)
            .collect();
        let Some(&first) = hits.first() else {
            debug!(table = %table.name, index = %index.index_name(), "index missing");
            creates.extend(dialect.create_index(index)?);
            continue;
        };
        for &i in &hits {
            matched[i] = true;
        }
        let declared_name = index.index_name();
        if !live[first].name.eq_ignore_ascii_case(&declared_name) {
            info!(
                table = %table.name,
                declared = %declared_name,
                live = %live[first].name,
                "index exists under another name"
            );
        }
        if hits.len() > 1 {
            warnings.push(DiffWarning::DuplicateIndices {
                table: table.name.clone(),
                indices: hits[1..].iter().map(|&i| live[i].name.clone()).collect(),
            });
        }
    }

    let implicit: Vec<Vec<String>> = table
        .primary_key
        .iter()
        .map(|pk| pk.columns.clone())
        .chain(table.foreign_keys().into_iter().map(|fk| fk.columns))
        .collect();
    for (index, _) in live.iter().zip(&matched).filter(|(_, m)| !**m) {
        if implicit.iter().any(|cols| same_columns(cols, &index.columns)) {
            continue;
        }
        debug!(table = %table.name, index = %index.name, "index not declared");
        sections
            .indices
            .push(dialect.drop_index(&table.name, &index.name));
    }
    sections.indices.extend(creates);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{MySqlDialect, OracleDialect, PostgresDialect, SqliteDialect};
    use crate::error::DialectError;
    use crate::types::ColumnType;

    fn users() -> Table {
        let mut t = Table::new("users");
        t.add(Column::new("id", ColumnType::integer()).auto_increment())
            .unwrap();
        t.column("name", ColumnType::varchar(50)).unwrap();
        t.set_primary_key(&["id"], None).unwrap();
        t
    }

    fn live_users() -> TableMetadata {
        TableMetadata {
            name: String::from("users"),
            columns: vec![
                ColumnMetadata::new("id", "integer").auto_increment(),
                ColumnMetadata::new("name", "character varying").size(50),
            ],
            primary_key: Some(PrimaryKeyMetadata {
                name: Some(String::from("users_pkey")),
                columns: vec![String::from("id")],
            }),
            indices: Vec::new(),
        }
    }

    #[test]
    fn test_matching_schema_is_empty() {
        let snapshot = DatabaseSnapshot::new().with_table(live_users());
        let diff = SchemaDiff::compute(&[users()], &snapshot, &PostgresDialect::new()).unwrap();
        assert!(diff.is_empty(), "{diff:?}");
    }

    #[test]
    fn test_missing_table_is_created() {
        let diff = SchemaDiff::compute(&[users()], &DatabaseSnapshot::new(), &PostgresDialect::new())
            .unwrap();
        assert_eq!(diff.statements.len(), 1);
        assert!(diff.statements[0].starts_with("CREATE TABLE IF NOT EXISTS users"));
    }

    #[test]
    fn test_missing_sequence_comes_first() {
        let diff =
            SchemaDiff::compute(&[users()], &DatabaseSnapshot::new(), &OracleDialect::new()).unwrap();
        assert_eq!(diff.statements.len(), 2);
        assert!(diff.statements[0].starts_with("CREATE SEQUENCE users_id_seq"));
        assert!(diff.statements[1].starts_with("CREATE TABLE users"));
    }

    #[test]
    fn test_added_and_modified_columns_are_ordered() {
        let mut t = users();
        t.column("email", ColumnType::varchar(120).nullable()).unwrap();
        t.replace_column("name", |c| Column::new(&c.name, ColumnType::varchar(80)))
            .unwrap();
        let snapshot = DatabaseSnapshot::new().with_table(live_users());
        let diff = SchemaDiff::compute(&[t], &snapshot, &PostgresDialect::new()).unwrap();
        assert_eq!(
            diff.statements,
            vec![
                String::from("ALTER TABLE users ADD COLUMN email VARCHAR(120) NULL"),
                String::from("ALTER TABLE users ALTER COLUMN name SET DATA TYPE VARCHAR(80)"),
            ]
        );
    }

    #[test]
    fn test_case_only_difference_renames() {
        let mut t = users();
        t.replace_column("name", |mut c| {
            c.name = String::from("Name");
            c
        })
        .unwrap();
        let snapshot = DatabaseSnapshot::new().with_table(live_users());
        let diff = SchemaDiff::compute(&[t], &snapshot, &PostgresDialect::new()).unwrap();
        assert_eq!(
            diff.statements,
            vec![String::from("ALTER TABLE users RENAME COLUMN \"name\" TO \"Name\"")]
        );
    }

    #[test]
    fn test_whitespace_default_differs_from_empty() {
        let mut t = Table::new("notes");
        t.add(Column::new("body", ColumnType::varchar(10)).default_value(" "))
            .unwrap();
        let snapshot = DatabaseSnapshot::new().with_table(TableMetadata {
            name: String::from("notes"),
            columns: vec![ColumnMetadata::new("body", "varchar")
                .size(10)
                .with_default("''::character varying")],
            primary_key: None,
            indices: Vec::new(),
        });
        let diff = SchemaDiff::compute(&[t], &snapshot, &PostgresDialect::new()).unwrap();
        assert_eq!(
            diff.statements,
            vec![String::from("ALTER TABLE notes ALTER COLUMN body SET DEFAULT ' '")]
        );
    }

    #[test]
    fn test_primary_key_added() {
        let mut live = live_users();
        live.primary_key = None;
        let snapshot = DatabaseSnapshot::new().with_table(live);
        let diff = SchemaDiff::compute(&[users()], &snapshot, &PostgresDialect::new()).unwrap();
        assert_eq!(
            diff.statements,
            vec![String::from("ALTER TABLE users ADD CONSTRAINT pk_users PRIMARY KEY (id)")]
        );
    }

    #[test]
    fn test_sqlite_changes_become_warnings() {
        let mut t = users();
        t.replace_column("name", Column::nullable).unwrap();
        let mut live = live_users();
        live.columns[1] = ColumnMetadata::new("name", "VARCHAR(50)");
        let snapshot = DatabaseSnapshot::new().with_table(live);
        let diff = SchemaDiff::compute(&[t], &snapshot, &SqliteDialect::new()).unwrap();
        assert!(diff.statements.is_empty());
        assert!(matches!(
            &diff.warnings[..],
            [DiffWarning::ColumnChangeSkipped { column, .. }] if column == "name"
        ));
    }

    #[test]
    fn test_index_matching_and_duplicates() {
        let mut t = users();
        t.add_index(Index::unique(&["name"])).unwrap();
        let mut live = live_users();
        live.indices = vec![
            IndexMetadata {
                name: String::from("uq_name"),
                columns: vec![String::from("name")],
                unique: true,
                filter: None,
            },
            IndexMetadata {
                name: String::from("uq_name_2"),
                columns: vec![String::from("name")],
                unique: true,
                filter: None,
            },
            IndexMetadata {
                name: String::from("legacy"),
                columns: vec![String::from("name"), String::from("id")],
                unique: false,
                filter: None,
            },
        ];
        let snapshot = DatabaseSnapshot::new().with_table(live);
        let diff = SchemaDiff::compute(&[t], &snapshot, &MySqlDialect::new()).unwrap();
        assert_eq!(
            diff.statements,
            vec![String::from("DROP INDEX legacy ON users")]
        );
        assert_eq!(
            diff.warnings,
            vec![DiffWarning::DuplicateIndices {
                table: String::from("users"),
                indices: vec![String::from("uq_name_2")],
            }]
        );
    }

    #[test]
    fn test_existing_table_without_metadata_fails() {
        struct Lying;
        impl MetadataSource for Lying {
            fn table_exists(&self, _: &str) -> bool {
                true
            }
            fn columns(&self, table: &str) -> Result<Vec<ColumnMetadata>> {
                Err(DialectError::MissingMetadata {
                    table: String::from(table),
                })
            }
            fn primary_key(&self, _: &str) -> Result<Option<PrimaryKeyMetadata>> {
                Ok(None)
            }
            fn indices(&self, _: &str) -> Result<Vec<IndexMetadata>> {
                Ok(Vec::new())
            }
            fn sequences(&self) -> Vec<String> {
                Vec::new()
            }
        }
        let err = SchemaDiff::compute(&[users()], &Lying, &PostgresDialect::new()).unwrap_err();
        assert!(matches!(err, DialectError::MissingMetadata { .. }));
    }
}
