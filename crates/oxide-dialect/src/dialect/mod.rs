//! Dialects: capability flags plus type-name and statement providers.
//!
//! A [`Dialect`] bundles a [`Capabilities`] table, one
//! [`TypeNameProvider`] and one [`StatementProvider`], and exposes the DDL
//! entry points that need to inspect the schema model directly. Every DDL
//! method carries a standard-SQL default; vendors override what differs.

pub mod context;
mod h2;
mod mysql;
mod oracle;
mod postgres;
pub mod registry;
mod sqlite;
mod sqlserver;
mod statements;
mod type_names;

use std::fmt;

use tracing::{debug, warn};

pub use h2::{H2Dialect, H2Mode};
pub use mysql::MySqlDialect;
pub use oracle::OracleDialect;
pub use postgres::PostgresDialect;
pub use registry::{DialectFactory, DialectRegistry, DialectRegistryBuilder};
pub use sqlite::SqliteDialect;
pub use sqlserver::SqlServerDialect;
pub use statements::{StandardStatements, StatementProvider};
pub use type_names::{emulated_nulls_order, to_hex, StandardTypeNames, TypeNameProvider};

use crate::diff::{normalize_default, ColumnChanges, ColumnMetadata, TypeEquivalence};
use crate::error::{DialectError, Result};
use crate::render::QueryBuilder;
use crate::schema::{Column, ForeignKey, Index, ReferenceAction, Sequence};

/// Database vendors with a built-in dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Vendor {
    /// PostgreSQL.
    PostgreSql,
    /// MySQL.
    MySql,
    /// MariaDB.
    MariaDb,
    /// H2.
    H2,
    /// Oracle.
    Oracle,
    /// SQLite.
    Sqlite,
    /// Microsoft SQL Server.
    SqlServer,
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::PostgreSql => "PostgreSQL",
            Self::MySql => "MySQL",
            Self::MariaDb => "MariaDB",
            Self::H2 => "H2",
            Self::Oracle => "Oracle",
            Self::Sqlite => "SQLite",
            Self::SqlServer => "SQL Server",
        })
    }
}

/// Bind-parameter placeholder syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamStyle {
    /// `?`
    Question,
    /// `$1`, `$2`, ...
    Dollar,
    /// `@P1`, `@P2`, ...
    AtP,
    /// `:1`, `:2`, ...
    Colon,
}

impl ParamStyle {
    /// Placeholder for the 1-based parameter `index`.
    #[must_use]
    pub fn placeholder(self, index: usize) -> String {
        match self {
            Self::Question => String::from("?"),
            Self::Dollar => format!("${index}"),
            Self::AtP => format!("@P{index}"),
            Self::Colon => format!(":{index}"),
        }
    }
}

/// How unquoted identifiers are stored by the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentifierCase {
    /// Folded to upper case.
    Upper,
    /// Folded to lower case.
    Lower,
    /// Stored as written.
    Preserve,
}

/// How column comments are expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommentStyle {
    /// `COMMENT 'x'` inside the column definition.
    Inline,
    /// A separate `COMMENT ON COLUMN` statement.
    Statement,
    /// Not supported.
    Unsupported,
}

/// Where an index type tag goes in `CREATE INDEX`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexTypeClause {
    /// Keyword before `INDEX` (`CREATE BITMAP INDEX`).
    Prefix(String),
    /// `USING x` right after the index name.
    UsingAfterName(String),
    /// `USING x` right after the table name.
    UsingAfterTable(String),
}

/// Capability flags of a dialect.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct Capabilities {
    /// `CREATE ... IF NOT EXISTS`.
    pub supports_if_not_exists: bool,
    /// `DROP ... IF EXISTS`.
    pub supports_if_exists: bool,
    /// `CREATE SEQUENCE`.
    pub supports_create_sequence: bool,
    /// Auto-increment columns need an explicit sequence.
    pub needs_sequence_to_auto_inc: bool,
    /// Reference action applied when none is given.
    pub default_reference_action: ReferenceAction,
    /// A `DUAL` table exists for FROM-less selects.
    pub supports_dual_table: bool,
    /// Native `NULLS FIRST/LAST`.
    pub supports_nulls_ordering: bool,
    /// Window frames in `GROUPS` mode.
    pub supports_window_groups_mode: bool,
    /// `ON UPDATE` reference actions.
    pub supports_on_update: bool,
    /// `SET DEFAULT` reference action.
    pub supports_set_default: bool,
    /// `RESTRICT` reference action.
    pub supports_restrict: bool,
    /// `ALTER COLUMN` type/nullability/default changes.
    pub supports_column_type_change: bool,
    /// Foreign keys inside `CREATE TABLE`.
    pub supports_inline_foreign_keys: bool,
    /// `ALTER TABLE ... ADD CONSTRAINT ... FOREIGN KEY`.
    pub supports_alter_foreign_keys: bool,
    /// Adding or dropping a primary key on an existing table.
    pub supports_alter_primary_key: bool,
    /// Turning auto-increment on or off for an existing column.
    pub supports_auto_increment_change: bool,
    /// More than one generated key returned per statement.
    pub supports_multiple_generated_keys: bool,
    /// `RETURNING` clauses.
    pub supports_returning: bool,
    /// `SELECT ... FOR UPDATE`.
    pub supports_select_for_update: bool,
    /// `CREATE SCHEMA`.
    pub supports_create_schema: bool,
    /// Generated keys come from identity columns rather than sequences.
    pub supports_identity_columns: bool,
    /// Partial (filtered) indices.
    pub supports_partial_indexes: bool,
    /// Indices over expressions.
    pub supports_functional_indexes: bool,
    /// Column comment syntax.
    pub comment_style: CommentStyle,
    /// Largest `MAXVALUE` a sequence accepts.
    pub max_sequence_value: i128,
    /// Longest identifier.
    pub max_identifier_length: usize,
    /// Case folding of unquoted identifiers.
    pub identifier_case: IdentifierCase,
    /// Placeholder syntax.
    pub param_style: ParamStyle,
    /// Opening and closing identifier quote.
    pub identifier_quote: (char, char),
}

impl Capabilities {
    /// Standard-SQL baseline that vendors adjust.
    pub const STANDARD: Self = Self {
        supports_if_not_exists: true,
        supports_if_exists: true,
        supports_create_sequence: true,
        needs_sequence_to_auto_inc: false,
        default_reference_action: ReferenceAction::NoAction,
        supports_dual_table: false,
        supports_nulls_ordering: true,
        supports_window_groups_mode: false,
        supports_on_update: true,
        supports_set_default: true,
        supports_restrict: true,
        supports_column_type_change: true,
        supports_inline_foreign_keys: true,
        supports_alter_foreign_keys: true,
        supports_alter_primary_key: true,
        supports_auto_increment_change: false,
        supports_multiple_generated_keys: false,
        supports_returning: false,
        supports_select_for_update: true,
        supports_create_schema: true,
        supports_identity_columns: true,
        supports_partial_indexes: true,
        supports_functional_indexes: true,
        comment_style: CommentStyle::Statement,
        max_sequence_value: i64::MAX as i128,
        max_identifier_length: 128,
        identifier_case: IdentifierCase::Upper,
        param_style: ParamStyle::Question,
        identifier_quote: ('"', '"'),
    };
}

/// Words that must be quoted when used as identifiers.
const RESERVED_WORDS: &[&str] = &[
    "ALL", "ALTER", "AND", "ANY", "AS", "ASC", "BETWEEN", "BY", "CASE", "CHECK", "COLUMN",
    "CONSTRAINT", "CREATE", "CROSS", "CURRENT_DATE", "CURRENT_TIME", "CURRENT_TIMESTAMP",
    "CURRENT_USER", "DEFAULT", "DELETE", "DESC", "DISTINCT", "DROP", "ELSE", "END", "EXCEPT",
    "EXISTS", "FALSE", "FETCH", "FOR", "FOREIGN", "FROM", "FULL", "GRANT", "GROUP", "HAVING",
    "IN", "INDEX", "INNER", "INSERT", "INTERSECT", "INTO", "IS", "JOIN", "KEY", "LEFT", "LIKE",
    "LIMIT", "NOT", "NULL", "OFFSET", "ON", "OR", "ORDER", "OUTER", "PRIMARY", "REFERENCES",
    "RIGHT", "ROW", "ROWS", "SELECT", "SET", "TABLE", "THEN", "TO", "TRUE", "UNION", "UNIQUE",
    "UPDATE", "USER", "USING", "VALUES", "WHEN", "WHERE", "WITH",
];

/// Gives default trait methods access to `self` as a trait object.
pub trait AsDialect {
    /// Returns `self` as `&dyn Dialect`.
    fn as_dialect(&self) -> &dyn Dialect;
}

impl<T: Dialect> AsDialect for T {
    fn as_dialect(&self) -> &dyn Dialect {
        self
    }
}

/// A SQL dialect.
pub trait Dialect: AsDialect + Send + Sync + fmt::Debug {
    /// Dialect name as used in errors and the registry.
    fn name(&self) -> &'static str;

    /// Vendor family.
    fn vendor(&self) -> Vendor;

    /// Capability flags.
    fn capabilities(&self) -> &Capabilities;

    /// Type names and literal syntax.
    fn type_names(&self) -> &dyn TypeNameProvider;

    /// Statement and function templates.
    fn statements(&self) -> &dyn StatementProvider;

    /// Vendor-specific reserved words in addition to the common set.
    fn extra_keywords(&self) -> &'static [&'static str] {
        &[]
    }

    /// Whether `word` is reserved.
    fn is_keyword(&self, word: &str) -> bool {
        RESERVED_WORDS
            .iter()
            .chain(self.extra_keywords())
            .any(|k| k.eq_ignore_ascii_case(word))
    }

    /// Whether an identifier must be quoted to survive unchanged.
    fn needs_quotes(&self, identifier: &str) -> bool {
        let mut chars = identifier.chars();
        let Some(first) = chars.next() else {
            return true;
        };
        if first.is_ascii_digit() {
            return true;
        }
        if !identifier
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return true;
        }
        let has_upper = identifier.chars().any(|c| c.is_ascii_uppercase());
        let has_lower = identifier.chars().any(|c| c.is_ascii_lowercase());
        (has_upper && has_lower) || self.is_keyword(identifier)
    }

    /// Quotes an identifier when needed; dotted names are quoted per part.
    fn quote_identifier(&self, identifier: &str) -> String {
        identifier
            .split('.')
            .map(|part| {
                if self.needs_quotes(part) {
                    self.delimit_identifier(part)
                } else {
                    String::from(part)
                }
            })
            .collect::<Vec<_>>()
            .join(".")
    }

    /// `identifier` wrapped in quotes with embedded closing quotes doubled,
    /// whether or not it needs them.
    fn delimit_identifier(&self, identifier: &str) -> String {
        let (open, close) = self.capabilities().identifier_quote;
        let escaped = identifier.replace(close, &format!("{close}{close}"));
        format!("{open}{escaped}{close}")
    }

    /// The name the database stores for an identifier written as `identifier`.
    fn fold_identifier(&self, identifier: &str) -> String {
        if self.needs_quotes(identifier) {
            return String::from(identifier);
        }
        match self.capabilities().identifier_case {
            IdentifierCase::Upper => identifier.to_ascii_uppercase(),
            IdentifierCase::Lower => identifier.to_ascii_lowercase(),
            IdentifierCase::Preserve => String::from(identifier),
        }
    }

    /// Cuts a generated name to the identifier length limit.
    fn truncate_identifier(&self, name: &str) -> String {
        let max = self.capabilities().max_identifier_length;
        name.chars().take(max).collect()
    }

    /// `CREATE SEQUENCE`.
    ///
    /// # Errors
    ///
    /// `Unsupported` when the dialect has no sequences.
    fn create_sequence(&self, sequence: &Sequence, if_not_exists: bool) -> Result<String> {
        sequence_statement(self.as_dialect(), sequence, if_not_exists, "NO CYCLE", None)
    }

    /// `DROP SEQUENCE`.
    ///
    /// # Errors
    ///
    /// `Unsupported` when the dialect has no sequences.
    fn drop_sequence(&self, name: &str) -> Result<String> {
        let caps = self.capabilities();
        if !caps.supports_create_sequence {
            return Err(DialectError::unsupported(self.name(), "DROP SEQUENCE"));
        }
        let if_exists = if caps.supports_if_exists { "IF EXISTS " } else { "" };
        Ok(format!(
            "DROP SEQUENCE {if_exists}{}",
            self.quote_identifier(name)
        ))
    }

    /// `DROP TABLE`.
    fn drop_table(&self, table: &str) -> String {
        let if_exists = if self.capabilities().supports_if_exists {
            "IF EXISTS "
        } else {
            ""
        };
        format!("DROP TABLE {if_exists}{}", self.quote_identifier(table))
    }

    /// `DEFAULT` clause of a column definition.
    fn default_clause(&self, column: &Column, default_sql: &str) -> String {
        let _ = column;
        format!(" DEFAULT {default_sql}")
    }

    /// Placement of an index type tag, or `None` when the tag is not
    /// expressible.
    fn index_type_clause(&self, tag: &str) -> Option<IndexTypeClause> {
        let _ = tag;
        None
    }

    /// Whether indexed expressions need their own parentheses.
    fn wrap_index_expressions(&self) -> bool {
        false
    }

    /// Whether `CREATE INDEX` accepts `IF NOT EXISTS`.
    fn index_if_not_exists(&self) -> bool {
        self.capabilities().supports_if_not_exists
    }

    /// `CREATE INDEX`, or `None` (with a warning) when the index shape cannot
    /// be expressed.
    ///
    /// # Errors
    ///
    /// Propagates rendering failures of the filter or indexed expressions.
    fn create_index(&self, index: &Index) -> Result<Option<String>> {
        create_index_statement(self.as_dialect(), index)
    }

    /// `DROP INDEX`.
    fn drop_index(&self, table: &str, index_name: &str) -> String {
        let _ = table;
        let if_exists = if self.capabilities().supports_if_exists {
            "IF EXISTS "
        } else {
            ""
        };
        format!("DROP INDEX {if_exists}{}", self.quote_identifier(index_name))
    }

    /// `ALTER TABLE ... ADD COLUMN`, followed by a comment statement when needed.
    ///
    /// # Errors
    ///
    /// Propagates rendering failures.
    fn add_column(&self, column: &Column) -> Result<Vec<String>> {
        add_column_statements(self.as_dialect(), column, "ADD COLUMN")
    }

    /// Statements bringing an existing column in line with `column`.
    ///
    /// # Errors
    ///
    /// `Unsupported` when the vendor cannot alter columns.
    fn modify_column(&self, column: &Column, changes: &ColumnChanges) -> Result<Vec<String>> {
        let d = self.as_dialect();
        let table = self.quote_identifier(&column.table);
        let name = self.quote_identifier(&column.name);
        let mut out = Vec::new();
        if changes.ty {
            out.push(format!(
                "ALTER TABLE {table} ALTER COLUMN {name} SET DATA TYPE {}",
                column.ty.base_sql_type(d)?
            ));
        }
        if changes.nullability {
            let action = if column.is_nullable() {
                "DROP NOT NULL"
            } else {
                "SET NOT NULL"
            };
            out.push(format!("ALTER TABLE {table} ALTER COLUMN {name} {action}"));
        }
        if changes.default {
            out.push(match column.default_sql(d)? {
                Some(default) => {
                    format!("ALTER TABLE {table} ALTER COLUMN {name} SET DEFAULT {default}")
                }
                None => format!("ALTER TABLE {table} ALTER COLUMN {name} DROP DEFAULT"),
            });
        }
        if changes.comment {
            out.extend(self.column_comment_statement(column));
        }
        Ok(out)
    }

    /// Like [`Dialect::modify_column`], but takes the live column so a
    /// case-only rename can be emitted first.
    ///
    /// # Errors
    ///
    /// `Unsupported` when the vendor cannot alter columns.
    fn modify_column_with_metadata(
        &self,
        column: &Column,
        metadata: &ColumnMetadata,
        changes: &ColumnChanges,
    ) -> Result<Vec<String>> {
        let mut out = Vec::new();
        if changes.rename_from.is_some() {
            out.push(self.rename_column(&column.table, &metadata.name, &column.name)?);
        }
        let rest = changes.without_rename();
        if !rest.is_empty() {
            out.extend(self.modify_column(column, &rest)?);
        }
        Ok(out)
    }

    /// `ALTER TABLE ... RENAME COLUMN`.
    ///
    /// # Errors
    ///
    /// `Unsupported` when the vendor cannot rename columns.
    fn rename_column(&self, table: &str, from: &str, to: &str) -> Result<String> {
        // The source name is the stored one and is always quoted verbatim.
        Ok(format!(
            "ALTER TABLE {} RENAME COLUMN {} TO {}",
            self.quote_identifier(table),
            self.delimit_identifier(from),
            self.quote_identifier(to)
        ))
    }

    /// `ALTER TABLE ... ADD CONSTRAINT ... PRIMARY KEY`.
    ///
    /// # Errors
    ///
    /// `Unsupported` when keys cannot be added to existing tables.
    fn add_primary_key(&self, table: &str, name: &str, columns: &[String]) -> Result<String> {
        if !self.capabilities().supports_alter_primary_key {
            return Err(DialectError::unsupported(self.name(), "ADD PRIMARY KEY"));
        }
        let cols: Vec<String> = columns.iter().map(|c| self.quote_identifier(c)).collect();
        Ok(format!(
            "ALTER TABLE {} ADD CONSTRAINT {} PRIMARY KEY ({})",
            self.quote_identifier(table),
            self.quote_identifier(name),
            cols.join(", ")
        ))
    }

    /// Drops the primary key of `table`.
    ///
    /// # Errors
    ///
    /// `Unsupported` when keys cannot be dropped from existing tables.
    fn drop_primary_key(&self, table: &str, name: Option<&str>) -> Result<String> {
        if !self.capabilities().supports_alter_primary_key {
            return Err(DialectError::unsupported(self.name(), "DROP PRIMARY KEY"));
        }
        let name = name.map_or_else(|| format!("{table}_pkey"), String::from);
        Ok(format!(
            "ALTER TABLE {} DROP CONSTRAINT {}",
            self.quote_identifier(table),
            self.quote_identifier(&name)
        ))
    }

    /// `ALTER TABLE ... ADD CONSTRAINT ... FOREIGN KEY`.
    ///
    /// # Errors
    ///
    /// `Unsupported` when constraints cannot be added after creation.
    fn add_foreign_key(&self, fk: &ForeignKey) -> Result<String> {
        if !self.capabilities().supports_alter_foreign_keys {
            return Err(DialectError::unsupported(self.name(), "ALTER TABLE ADD FOREIGN KEY"));
        }
        Ok(format!(
            "ALTER TABLE {} ADD {}",
            self.quote_identifier(&fk.table),
            foreign_key_clause(self.as_dialect(), fk)
        ))
    }

    /// Drops a foreign-key constraint.
    fn drop_foreign_key(&self, table: &str, name: &str) -> String {
        format!(
            "ALTER TABLE {} DROP CONSTRAINT {}",
            self.quote_identifier(table),
            self.quote_identifier(name)
        )
    }

    /// Separate comment statement for `column`, when comments use that style.
    fn column_comment_statement(&self, column: &Column) -> Option<String> {
        match self.capabilities().comment_style {
            CommentStyle::Statement => {
                let comment = column.comment.as_deref().map_or_else(
                    || String::from("NULL"),
                    |c| self.type_names().quote_string(c),
                );
                Some(format!(
                    "COMMENT ON COLUMN {}.{} IS {comment}",
                    self.quote_identifier(&column.table),
                    self.quote_identifier(&column.name)
                ))
            }
            CommentStyle::Inline => None,
            CommentStyle::Unsupported => {
                if column.comment.is_some() {
                    warn!(
                        dialect = self.name(),
                        table = %column.table,
                        column = %column.name,
                        "column comments are not supported, comment skipped"
                    );
                }
                None
            }
        }
    }

    /// `CREATE DATABASE`.
    ///
    /// # Errors
    ///
    /// `Unsupported` on vendors without databases.
    fn create_database(&self, name: &str) -> Result<String> {
        Ok(format!("CREATE DATABASE {}", self.quote_identifier(name)))
    }

    /// `DROP DATABASE`.
    ///
    /// # Errors
    ///
    /// `Unsupported` on vendors without databases.
    fn drop_database(&self, name: &str) -> Result<String> {
        Ok(format!("DROP DATABASE {}", self.quote_identifier(name)))
    }

    /// Query listing databases.
    ///
    /// # Errors
    ///
    /// `Unsupported` on vendors without a catalog query.
    fn list_databases(&self) -> Result<String> {
        Ok(String::from(
            "SELECT SCHEMA_NAME FROM INFORMATION_SCHEMA.SCHEMATA",
        ))
    }

    /// `CREATE SCHEMA`.
    ///
    /// # Errors
    ///
    /// `Unsupported` on vendors without schemas.
    fn create_schema(&self, name: &str, authorization: Option<&str>) -> Result<String> {
        let caps = self.capabilities();
        if !caps.supports_create_schema {
            return Err(DialectError::unsupported(self.name(), "CREATE SCHEMA"));
        }
        let mut sql = String::from("CREATE SCHEMA ");
        if caps.supports_if_not_exists {
            sql.push_str("IF NOT EXISTS ");
        }
        sql.push_str(&self.quote_identifier(name));
        if let Some(owner) = authorization {
            sql.push_str(" AUTHORIZATION ");
            sql.push_str(&self.quote_identifier(owner));
        }
        Ok(sql)
    }

    /// `DROP SCHEMA`.
    ///
    /// # Errors
    ///
    /// `Unsupported` on vendors without schemas.
    fn drop_schema(&self, name: &str, cascade: bool) -> Result<String> {
        let caps = self.capabilities();
        if !caps.supports_create_schema {
            return Err(DialectError::unsupported(self.name(), "DROP SCHEMA"));
        }
        let mut sql = String::from("DROP SCHEMA ");
        if caps.supports_if_exists {
            sql.push_str("IF EXISTS ");
        }
        sql.push_str(&self.quote_identifier(name));
        if cascade {
            sql.push_str(" CASCADE");
        }
        Ok(sql)
    }

    /// Switches the session's current schema.
    ///
    /// # Errors
    ///
    /// `Unsupported` on vendors without schemas.
    fn set_schema(&self, name: &str) -> Result<String> {
        Ok(format!("SET SCHEMA {}", self.quote_identifier(name)))
    }

    /// Synonym table used by [`Dialect::are_equivalent_column_types`].
    fn type_equivalence(&self) -> TypeEquivalence {
        TypeEquivalence::standard()
    }

    /// Whether a declared type and a live column's type are the same type.
    fn are_equivalent_column_types(&self, declared: &str, metadata: &ColumnMetadata) -> bool {
        let equivalent = self.type_equivalence().equivalent(declared, metadata);
        debug!(
            dialect = self.name(),
            declared,
            live = %metadata.sql_type,
            equivalent,
            "compared column types"
        );
        equivalent
    }

    /// Canonical text of a default expression; `None` means no default.
    fn normalize_default(&self, raw: &str) -> Option<String> {
        normalize_default(raw)
    }
}

/// Shared `CREATE SEQUENCE` renderer; `no_cycle` is the vendor's spelling of
/// the negated cycle option.
pub(crate) fn sequence_statement(
    dialect: &dyn Dialect,
    sequence: &Sequence,
    if_not_exists: bool,
    no_cycle: &str,
    no_cache: Option<&str>,
) -> Result<String> {
    let caps = dialect.capabilities();
    if !caps.supports_create_sequence {
        return Err(DialectError::unsupported(dialect.name(), "CREATE SEQUENCE"));
    }
    let mut sql = String::from("CREATE SEQUENCE ");
    if if_not_exists && caps.supports_if_not_exists {
        sql.push_str("IF NOT EXISTS ");
    }
    sql.push_str(&dialect.quote_identifier(&sequence.name));
    if let Some(start) = sequence.start {
        sql.push_str(&format!(" START WITH {start}"));
    }
    if let Some(increment) = sequence.increment {
        sql.push_str(&format!(" INCREMENT BY {increment}"));
    }
    if let Some(min) = sequence.min_value {
        sql.push_str(&format!(" MINVALUE {min}"));
    }
    if let Some(max) = sequence.max_value {
        let max = i128::from(max).min(caps.max_sequence_value);
        sql.push_str(&format!(" MAXVALUE {max}"));
    }
    match sequence.cycle {
        Some(true) => sql.push_str(" CYCLE"),
        Some(false) => {
            sql.push(' ');
            sql.push_str(no_cycle);
        }
        None => {}
    }
    match (sequence.cache, no_cache) {
        (Some(cache), Some(no_cache)) if cache <= 1 => {
            sql.push(' ');
            sql.push_str(no_cache);
        }
        (Some(cache), _) => sql.push_str(&format!(" CACHE {cache}")),
        (None, _) => {}
    }
    Ok(sql)
}

/// Shared `CREATE INDEX` renderer honouring the capability flags.
pub(crate) fn create_index_statement(dialect: &dyn Dialect, index: &Index) -> Result<Option<String>> {
    let caps = dialect.capabilities();
    let name = dialect.truncate_identifier(&index.index_name());
    if index.filter.is_some() && !caps.supports_partial_indexes {
        warn!(
            dialect = dialect.name(),
            table = %index.table,
            index = %name,
            "partial indices are not supported, index skipped"
        );
        return Ok(None);
    }
    if !index.functions.is_empty() && !caps.supports_functional_indexes {
        warn!(
            dialect = dialect.name(),
            table = %index.table,
            index = %name,
            "functional indices are not supported, index skipped"
        );
        return Ok(None);
    }
    let type_clause = match &index.index_type {
        None => None,
        Some(tag) => {
            let Some(clause) = dialect.index_type_clause(tag) else {
                warn!(
                    dialect = dialect.name(),
                    table = %index.table,
                    index = %name,
                    index_type = %tag,
                    "index type is not supported, index skipped"
                );
                return Ok(None);
            };
            Some(clause)
        }
    };

    let mut qb = QueryBuilder::inline(dialect);
    qb.push("CREATE ");
    if index.unique {
        qb.push("UNIQUE ");
    }
    if let Some(IndexTypeClause::Prefix(kw)) = &type_clause {
        qb.push(kw).push(" ");
    }
    qb.push("INDEX ");
    if dialect.index_if_not_exists() {
        qb.push("IF NOT EXISTS ");
    }
    qb.push_identifier(&name);
    if let Some(IndexTypeClause::UsingAfterName(kw)) = &type_clause {
        qb.push(" USING ").push(kw);
    }
    qb.push(" ON ").push_identifier(&index.table);
    if let Some(IndexTypeClause::UsingAfterTable(kw)) = &type_clause {
        qb.push(" USING ").push(kw);
    }
    qb.push(" (");
    qb.push_identifiers(&index.columns);
    for (i, function) in index.functions.iter().enumerate() {
        if i > 0 || !index.columns.is_empty() {
            qb.push(", ");
        }
        if dialect.wrap_index_expressions() {
            qb.push("(");
            function.render(&mut qb)?;
            qb.push(")");
        } else {
            function.render(&mut qb)?;
        }
    }
    qb.push(")");
    if let Some(filter) = &index.filter {
        qb.push(" WHERE ");
        filter.render(&mut qb)?;
    }
    Ok(Some(qb.finish().sql))
}

/// Shared `ADD COLUMN` renderer; `keyword` is `ADD COLUMN` or `ADD`.
pub(crate) fn add_column_statements(
    dialect: &dyn Dialect,
    column: &Column,
    keyword: &str,
) -> Result<Vec<String>> {
    let definition = crate::ddl::column_definition(dialect, column, false, true)?;
    let mut out = vec![format!(
        "ALTER TABLE {} {keyword} {definition}",
        dialect.quote_identifier(&column.table)
    )];
    if column.comment.is_some() {
        out.extend(dialect.column_comment_statement(column));
    }
    Ok(out)
}

/// `CONSTRAINT name FOREIGN KEY (...) REFERENCES t (...) [actions]`.
pub(crate) fn foreign_key_clause(dialect: &dyn Dialect, fk: &ForeignKey) -> String {
    let caps = dialect.capabilities();
    let name = dialect.truncate_identifier(&fk.constraint_name());
    let cols: Vec<String> = fk.columns.iter().map(|c| dialect.quote_identifier(c)).collect();
    let targets: Vec<String> = fk
        .target_columns
        .iter()
        .map(|c| dialect.quote_identifier(c))
        .collect();
    let mut sql = format!(
        "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
        dialect.quote_identifier(&name),
        cols.join(", "),
        dialect.quote_identifier(&fk.target_table),
        targets.join(", ")
    );
    let supported = |action: ReferenceAction| match action {
        ReferenceAction::SetDefault => caps.supports_set_default,
        ReferenceAction::Restrict => caps.supports_restrict,
        _ => true,
    };
    let explicit = |action: &ReferenceAction| *action != caps.default_reference_action;
    if let Some(action) = fk.on_delete.filter(explicit) {
        if supported(action) {
            sql.push_str(" ON DELETE ");
            sql.push_str(action.as_sql());
        } else {
            warn!(dialect = dialect.name(), constraint = %name, %action, "ON DELETE action not supported, skipped");
        }
    }
    if let Some(action) = fk.on_update.filter(explicit) {
        if caps.supports_on_update && supported(action) {
            sql.push_str(" ON UPDATE ");
            sql.push_str(action.as_sql());
        } else {
            warn!(dialect = dialect.name(), constraint = %name, %action, "ON UPDATE action not supported, skipped");
        }
    }
    sql
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rename_source_escapes_quotes() {
        let pg = PostgresDialect::new();
        assert_eq!(
            pg.rename_column("users", "Na\"me", "name").unwrap(),
            "ALTER TABLE users RENAME COLUMN \"Na\"\"me\" TO name"
        );
        let mysql = MySqlDialect::new();
        assert_eq!(
            mysql.rename_column("users", "a`b", "ab").unwrap(),
            "ALTER TABLE users RENAME COLUMN `a``b` TO ab"
        );
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(ParamStyle::Dollar.placeholder(3), "$3");
        assert_eq!(ParamStyle::AtP.placeholder(1), "@P1");
        assert_eq!(ParamStyle::Colon.placeholder(2), ":2");
        assert_eq!(ParamStyle::Question.placeholder(9), "?");
    }

    #[test]
    fn test_identifier_folding() {
        let oracle = OracleDialect::new();
        assert_eq!(oracle.fold_identifier("users"), "USERS");
        assert_eq!(oracle.fold_identifier("MixedCase"), "MixedCase");
        let pg = PostgresDialect::new();
        assert_eq!(pg.fold_identifier("USERS"), "users");
    }

    #[test]
    fn test_quote_doubles_closing_char() {
        let pg = PostgresDialect::new();
        assert_eq!(pg.quote_identifier("we\"ird"), "\"we\"\"ird\"");
        assert_eq!(pg.quote_identifier("public.user"), "public.\"user\"");
        let mssql = SqlServerDialect::new();
        assert_eq!(mssql.quote_identifier("order"), "[order]");
    }

    #[test]
    fn test_sequence_max_value_is_clamped() {
        let seq = Sequence::auto_increment("s").cycle(false);
        let pg = PostgresDialect::new();
        assert_eq!(
            pg.create_sequence(&seq, true).unwrap(),
            "CREATE SEQUENCE IF NOT EXISTS s START WITH 1 INCREMENT BY 1 MINVALUE 1 MAXVALUE 9223372036854775807 NO CYCLE"
        );
        let oracle = OracleDialect::new();
        assert_eq!(
            oracle.create_sequence(&seq, true).unwrap(),
            "CREATE SEQUENCE s START WITH 1 INCREMENT BY 1 MINVALUE 1 MAXVALUE 9223372036854775807 NOCYCLE"
        );
        assert!(MySqlDialect::new().create_sequence(&seq, true).is_err());
    }

    #[test]
    fn test_schema_statements() {
        let pg = PostgresDialect::new();
        assert_eq!(
            pg.create_schema("app", Some("admin")).unwrap(),
            "CREATE SCHEMA IF NOT EXISTS app AUTHORIZATION admin"
        );
        assert_eq!(pg.drop_schema("app", true).unwrap(), "DROP SCHEMA IF EXISTS app CASCADE");
        assert_eq!(pg.set_schema("app").unwrap(), "SET search_path TO app");
        assert!(SqliteDialect::new().create_schema("app", None).is_err());
    }
}
