//! MySQL and MariaDB dialects.

use tracing::warn;

use super::statements::{
    json_path, json_path_expression, render_assignments, render_joins, render_order_by,
    render_rows, render_where, unsupported,
};
use super::{
    emulated_nulls_order, Capabilities, CommentStyle, Dialect, IdentifierCase, IndexTypeClause,
    StatementProvider, TypeNameProvider, Vendor,
};
use crate::ddl::column_definition;
use crate::diff::{normalize_default, ColumnChanges, ColumnMetadata, TypeEquivalence};
use crate::error::Result;
use crate::expr::{Expr, NullsOrder, OrderBy, SortOrder};
use crate::render::QueryBuilder;
use crate::schema::{Column, ReferenceAction};
use crate::statement::{Delete, Insert, Merge, Replace, Update, Upsert};
use crate::types::{ColumnType, TextSize, TypeKind};

static MYSQL_CAPABILITIES: Capabilities = Capabilities {
    supports_create_sequence: false,
    default_reference_action: ReferenceAction::Restrict,
    supports_nulls_ordering: false,
    supports_set_default: false,
    supports_auto_increment_change: true,
    supports_multiple_generated_keys: true,
    supports_partial_indexes: false,
    comment_style: CommentStyle::Inline,
    max_identifier_length: 64,
    identifier_case: IdentifierCase::Preserve,
    identifier_quote: ('`', '`'),
    ..Capabilities::STANDARD
};

static MARIADB_CAPABILITIES: Capabilities = Capabilities {
    supports_create_sequence: true,
    supports_returning: true,
    supports_functional_indexes: false,
    ..MYSQL_CAPABILITIES
};

/// MySQL, or MariaDB through [`MySqlDialect::mariadb`].
#[derive(Debug, Clone, Copy)]
pub struct MySqlDialect {
    mariadb: bool,
    type_names: MySqlTypeNames,
    statements: MySqlStatements,
}

impl MySqlDialect {
    /// MySQL 8.
    #[must_use]
    pub const fn new() -> Self {
        Self::variant(false)
    }

    /// MariaDB.
    #[must_use]
    pub const fn mariadb() -> Self {
        Self::variant(true)
    }

    const fn variant(mariadb: bool) -> Self {
        Self {
            mariadb,
            type_names: MySqlTypeNames { mariadb },
            statements: MySqlStatements { mariadb },
        }
    }

    /// Whether this is the MariaDB variant.
    #[must_use]
    pub const fn is_mariadb(&self) -> bool {
        self.mariadb
    }
}

impl Default for MySqlDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl Dialect for MySqlDialect {
    fn name(&self) -> &'static str {
        if self.mariadb {
            "mariadb"
        } else {
            "mysql"
        }
    }

    fn vendor(&self) -> Vendor {
        if self.mariadb {
            Vendor::MariaDb
        } else {
            Vendor::MySql
        }
    }

    fn capabilities(&self) -> &Capabilities {
        if self.mariadb {
            &MARIADB_CAPABILITIES
        } else {
            &MYSQL_CAPABILITIES
        }
    }

    fn type_names(&self) -> &dyn TypeNameProvider {
        &self.type_names
    }

    fn statements(&self) -> &dyn StatementProvider {
        &self.statements
    }

    fn extra_keywords(&self) -> &'static [&'static str] {
        &[
            "CHANGE", "DATABASE", "DUAL", "IGNORE", "INTERVAL", "KEYS", "MODIFY", "RANGE",
            "READ", "REGEXP", "RENAME", "REPLACE", "SCHEMA", "SHOW", "STATUS", "USE",
        ]
    }

    fn index_type_clause(&self, tag: &str) -> Option<IndexTypeClause> {
        match tag.to_ascii_uppercase().as_str() {
            "BTREE" | "HASH" => Some(IndexTypeClause::UsingAfterName(tag.to_ascii_uppercase())),
            "FULLTEXT" | "SPATIAL" => Some(IndexTypeClause::Prefix(tag.to_ascii_uppercase())),
            _ => None,
        }
    }

    fn wrap_index_expressions(&self) -> bool {
        true
    }

    fn index_if_not_exists(&self) -> bool {
        self.mariadb
    }

    fn drop_index(&self, table: &str, index_name: &str) -> String {
        let if_exists = if self.mariadb { "IF EXISTS " } else { "" };
        format!(
            "DROP INDEX {if_exists}{} ON {}",
            self.quote_identifier(index_name),
            self.quote_identifier(table)
        )
    }

    fn modify_column(&self, column: &Column, changes: &ColumnChanges) -> Result<Vec<String>> {
        if changes.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![format!(
            "ALTER TABLE {} MODIFY COLUMN {}",
            self.quote_identifier(&column.table),
            column_definition(self, column, false, true)?
        )])
    }

    fn modify_column_with_metadata(
        &self,
        column: &Column,
        metadata: &ColumnMetadata,
        changes: &ColumnChanges,
    ) -> Result<Vec<String>> {
        if changes.rename_from.is_none() {
            return self.modify_column(column, changes);
        }
        Ok(vec![format!(
            "ALTER TABLE {} CHANGE COLUMN `{}` {}",
            self.quote_identifier(&column.table),
            metadata.name,
            column_definition(self, column, false, true)?
        )])
    }

    fn drop_primary_key(&self, table: &str, _name: Option<&str>) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} DROP PRIMARY KEY",
            self.quote_identifier(table)
        ))
    }

    fn drop_foreign_key(&self, table: &str, name: &str) -> String {
        format!(
            "ALTER TABLE {} DROP FOREIGN KEY {}",
            self.quote_identifier(table),
            self.quote_identifier(name)
        )
    }

    fn list_databases(&self) -> Result<String> {
        Ok(String::from("SHOW DATABASES"))
    }

    fn create_schema(&self, name: &str, authorization: Option<&str>) -> Result<String> {
        if authorization.is_some() {
            warn!(dialect = self.name(), schema = name, "schema owners are not supported, AUTHORIZATION skipped");
        }
        Ok(format!("CREATE SCHEMA IF NOT EXISTS {}", self.quote_identifier(name)))
    }

    fn drop_schema(&self, name: &str, _cascade: bool) -> Result<String> {
        Ok(format!("DROP SCHEMA IF EXISTS {}", self.quote_identifier(name)))
    }

    fn set_schema(&self, name: &str) -> Result<String> {
        Ok(format!("USE {}", self.quote_identifier(name)))
    }

    fn type_equivalence(&self) -> TypeEquivalence {
        TypeEquivalence::standard()
            .with("BOOLEAN", "TINYINT")
            .with("DATETIME", "TIMESTAMP")
            .with("LONGBLOB", "BLOB")
    }

    fn normalize_default(&self, raw: &str) -> Option<String> {
        // Boolean defaults are stored and reported as TINYINT.
        normalize_default(raw).map(|d| match d.as_str() {
            "TRUE" => String::from("1"),
            "FALSE" => String::from("0"),
            _ => d,
        })
    }
}

/// MySQL type names.
#[derive(Debug, Clone, Copy)]
pub struct MySqlTypeNames {
    mariadb: bool,
}

impl TypeNameProvider for MySqlTypeNames {
    fn dialect_name(&self) -> &'static str {
        if self.mariadb {
            "mariadb"
        } else {
            "mysql"
        }
    }

    fn utiny_int_type(&self) -> String {
        String::from("TINYINT UNSIGNED")
    }

    fn usmall_int_type(&self) -> String {
        String::from("SMALLINT UNSIGNED")
    }

    fn uinteger_type(&self) -> String {
        String::from("INT UNSIGNED")
    }

    fn ubig_int_type(&self) -> String {
        String::from("BIGINT UNSIGNED")
    }

    fn auto_increment_type(&self, base: &TypeKind) -> Result<String> {
        let name = match base {
            TypeKind::TinyInt => self.tiny_int_type(),
            TypeKind::UTinyInt => self.utiny_int_type(),
            TypeKind::SmallInt => self.small_int_type(),
            TypeKind::USmallInt => self.usmall_int_type(),
            TypeKind::Integer => self.integer_type(),
            TypeKind::UInteger => self.uinteger_type(),
            TypeKind::BigInt => self.big_int_type(),
            TypeKind::UBigInt => self.ubig_int_type(),
            _ => return Err(self.unsupported("auto-increment on a non-integer column")),
        };
        Ok(format!("{name} AUTO_INCREMENT"))
    }

    fn double_type(&self) -> String {
        String::from("DOUBLE")
    }

    fn text_type(&self, size: TextSize) -> String {
        String::from(match size {
            TextSize::Text => "TEXT",
            TextSize::Medium => "MEDIUMTEXT",
            TextSize::Large => "LONGTEXT",
        })
    }

    fn binary_type(&self, length: Option<u32>) -> Result<String> {
        Ok(length.map_or_else(|| String::from("BLOB"), |n| format!("VARBINARY({n})")))
    }

    fn blob_type(&self) -> String {
        String::from("LONGBLOB")
    }

    fn timestamp_type(&self) -> String {
        String::from("DATETIME(6)")
    }

    fn timestamp_tz_type(&self) -> Result<String> {
        Err(self.unsupported("TIMESTAMP WITH TIME ZONE"))
    }

    fn quote_string(&self, value: &str) -> String {
        let mut out = String::with_capacity(value.len() + 2);
        out.push('\'');
        for c in value.chars() {
            match c {
                '\'' => out.push_str("''"),
                '\\' => out.push_str("\\\\"),
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                '\0' => out.push_str("\\0"),
                '\u{1a}' => out.push_str("\\Z"),
                '\u{8}' => out.push_str("\\b"),
                c => out.push(c),
            }
        }
        out.push('\'');
        out
    }

    fn format_default(&self, rendered: &str, is_literal: bool) -> String {
        if is_literal {
            String::from(rendered)
        } else {
            format!("({rendered})")
        }
    }

    fn order_by(&self, expr: &str, order: SortOrder, nulls: Option<NullsOrder>) -> String {
        emulated_nulls_order(expr, order, nulls)
    }
}

/// MySQL statement templates.
#[derive(Debug, Clone, Copy)]
pub struct MySqlStatements {
    mariadb: bool,
}

impl MySqlStatements {
    fn render_values_insert(
        &self,
        verb: &str,
        table: &str,
        columns: &[String],
        rows: &[Vec<Expr>],
        qb: &mut QueryBuilder<'_>,
    ) -> Result<()> {
        qb.push(verb)
            .push(" ")
            .push_identifier(table)
            .push(" (")
            .push_identifiers(columns)
            .push(") VALUES ");
        render_rows(self, rows, &[], qb)
    }
}

impl StatementProvider for MySqlStatements {
    fn limit_offset(
        &self,
        limit: Option<u64>,
        offset: Option<u64>,
        _has_order_by: bool,
        qb: &mut QueryBuilder<'_>,
    ) -> Result<()> {
        match (limit, offset) {
            (Some(limit), _) => {
                qb.push(&format!(" LIMIT {limit}"));
            }
            (None, Some(_)) => {
                qb.push(&format!(" LIMIT {}", u64::MAX));
            }
            (None, None) => {}
        }
        if let Some(offset) = offset {
            qb.push(&format!(" OFFSET {offset}"));
        }
        Ok(())
    }

    fn insert_ignore(&self) -> Option<(&'static str, &'static str)> {
        Some(("INSERT IGNORE INTO", ""))
    }

    fn default_values(&self, _insert: &Insert<'_>, qb: &mut QueryBuilder<'_>) -> Result<()> {
        qb.push(" () VALUES ()");
        Ok(())
    }

    fn upsert(&self, upsert: &Upsert<'_>, qb: &mut QueryBuilder<'_>) -> Result<()> {
        upsert.effective_keys()?;
        if upsert.where_clause.is_some() {
            return Err(unsupported(qb, "conditional ON DUPLICATE KEY UPDATE"));
        }
        let assignments = upsert.assignments()?;
        let verb = if assignments.is_empty() {
            "INSERT IGNORE INTO"
        } else {
            "INSERT INTO"
        };
        self.render_values_insert(verb, &upsert.table.name, &upsert.columns, &upsert.rows, qb)?;
        if !assignments.is_empty() {
            if !self.mariadb {
                qb.push(" AS NEW");
            }
            qb.push(" ON DUPLICATE KEY UPDATE ");
            render_assignments(&assignments, qb)?;
        }
        self.returning(&upsert.returning, qb)
    }

    fn replace(&self, replace: &Replace<'_>, qb: &mut QueryBuilder<'_>) -> Result<()> {
        self.render_values_insert(
            "REPLACE INTO",
            &replace.table.name,
            &replace.columns,
            &replace.rows,
            qb,
        )
    }

    fn merge(&self, _merge: &Merge<'_>, qb: &mut QueryBuilder<'_>) -> Result<()> {
        Err(unsupported(qb, "MERGE"))
    }

    fn update(&self, update: &Update, qb: &mut QueryBuilder<'_>) -> Result<()> {
        if !update.returning.is_empty() {
            return Err(unsupported(qb, "UPDATE ... RETURNING"));
        }
        if !update.joins.is_empty() {
            return self.update_with_join(update, qb);
        }
        super::statements::render_update(self, update, update.where_clause.as_ref(), qb)?;
        if let Some(limit) = update.limit {
            qb.push(&format!(" LIMIT {limit}"));
        }
        Ok(())
    }

    fn update_with_join(&self, update: &Update, qb: &mut QueryBuilder<'_>) -> Result<()> {
        if update.limit.is_some() {
            return Err(unsupported(qb, "multi-table UPDATE ... LIMIT"));
        }
        qb.push("UPDATE ");
        self.table_ref(&update.table, qb)?;
        render_joins(self, &update.joins, qb)?;
        qb.push(" SET ");
        render_assignments(&update.set, qb)?;
        render_where(update.where_clause.as_ref(), qb)
    }

    fn delete_with_join(&self, delete: &Delete, qb: &mut QueryBuilder<'_>) -> Result<()> {
        if delete.limit.is_some() {
            return Err(unsupported(qb, "multi-table DELETE ... LIMIT"));
        }
        if !delete.returning.is_empty() {
            return Err(unsupported(qb, "multi-table DELETE ... RETURNING"));
        }
        qb.push("DELETE ").push_identifier(delete.table.qualifier()).push(" FROM ");
        self.table_ref(&delete.table, qb)?;
        render_joins(self, &delete.joins, qb)?;
        render_where(delete.where_clause.as_ref(), qb)
    }

    fn explain(&self, analyze: bool, options: Option<&str>, qb: &mut QueryBuilder<'_>) -> Result<()> {
        qb.push(match (analyze, self.mariadb) {
            (true, true) => "ANALYZE ",
            (true, false) => "EXPLAIN ANALYZE ",
            (false, _) => "EXPLAIN ",
        });
        if let Some(options) = options {
            qb.push(options).push(" ");
        }
        Ok(())
    }

    fn excluded_column(&self, column: &str, qb: &mut QueryBuilder<'_>) -> Result<()> {
        if self.mariadb {
            qb.push("VALUES(").push_identifier(column).push(")");
        } else {
            qb.push("NEW.").push_identifier(column);
        }
        Ok(())
    }

    fn cast(&self, expr: &Expr, ty: &ColumnType, qb: &mut QueryBuilder<'_>) -> Result<()> {
        let target = match ty.effective_kind() {
            TypeKind::TinyInt
            | TypeKind::SmallInt
            | TypeKind::Integer
            | TypeKind::BigInt
            | TypeKind::Boolean => String::from("SIGNED"),
            TypeKind::UTinyInt | TypeKind::USmallInt | TypeKind::UInteger | TypeKind::UBigInt => {
                String::from("UNSIGNED")
            }
            TypeKind::Decimal { precision, scale } => format!("DECIMAL({precision}, {scale})"),
            TypeKind::Float => String::from("FLOAT"),
            TypeKind::Double => String::from("DOUBLE"),
            TypeKind::Char { .. }
            | TypeKind::Varchar { .. }
            | TypeKind::Text { .. }
            | TypeKind::Enumeration { .. } => String::from("CHAR"),
            TypeKind::Binary { .. } | TypeKind::Blob | TypeKind::Uuid => String::from("BINARY"),
            TypeKind::Date => String::from("DATE"),
            TypeKind::Time => String::from("TIME"),
            TypeKind::Timestamp | TypeKind::TimestampTz => String::from("DATETIME"),
            TypeKind::Json { .. } => String::from("JSON"),
            TypeKind::AutoIncrement { .. } => ty.base_sql_type(qb.dialect())?,
        };
        qb.push("CAST(");
        expr.render(qb)?;
        qb.push(" AS ").push(&target).push(")");
        Ok(())
    }

    fn group_concat(
        &self,
        expr: &Expr,
        separator: Option<&str>,
        distinct: bool,
        order_by: &[OrderBy],
        qb: &mut QueryBuilder<'_>,
    ) -> Result<()> {
        qb.push("GROUP_CONCAT(");
        if distinct {
            qb.push("DISTINCT ");
        }
        expr.render(qb)?;
        if !order_by.is_empty() {
            qb.push(" ORDER BY ");
            render_order_by(order_by, qb)?;
        }
        if let Some(sep) = separator {
            let sep = qb.dialect().type_names().quote_string(sep);
            qb.push(" SEPARATOR ").push(&sep);
        }
        qb.push(")");
        Ok(())
    }

    fn locate(&self, haystack: &Expr, needle: &Expr, qb: &mut QueryBuilder<'_>) -> Result<()> {
        qb.push("LOCATE(");
        needle.render(qb)?;
        qb.push(", ");
        haystack.render(qb)?;
        qb.push(")");
        Ok(())
    }

    fn regexp(&self, expr: &Expr, pattern: &Expr, case_sensitive: bool, qb: &mut QueryBuilder<'_>) -> Result<()> {
        if !self.mariadb {
            qb.push("REGEXP_LIKE(");
            expr.render(qb)?;
            qb.push(", ");
            pattern.render(qb)?;
            qb.push(if case_sensitive { ", 'c')" } else { ", 'i')" });
            return Ok(());
        }
        expr.render(qb)?;
        qb.push(if case_sensitive { " REGEXP BINARY " } else { " REGEXP " });
        pattern.render(qb)
    }

    fn json_extract(&self, expr: &Expr, path: &[String], to_scalar: bool, qb: &mut QueryBuilder<'_>) -> Result<()> {
        let path = qb.dialect().type_names().quote_string(&json_path(path));
        if to_scalar {
            qb.push("JSON_UNQUOTE(");
        }
        qb.push("JSON_EXTRACT(");
        expr.render(qb)?;
        qb.push(", ").push(&path).push(")");
        if to_scalar {
            qb.push(")");
        }
        Ok(())
    }

    fn json_contains(&self, target: &Expr, candidate: &Expr, path: Option<&str>, qb: &mut QueryBuilder<'_>) -> Result<()> {
        qb.push("JSON_CONTAINS(");
        target.render(qb)?;
        qb.push(", ");
        candidate.render(qb)?;
        if let Some(path) = path {
            let path = qb.dialect().type_names().quote_string(&json_path_expression(path));
            qb.push(", ").push(&path);
        }
        qb.push(")");
        Ok(())
    }

    fn json_exists(&self, expr: &Expr, path: &[String], qb: &mut QueryBuilder<'_>) -> Result<()> {
        qb.push("JSON_CONTAINS_PATH(");
        expr.render(qb)?;
        qb.push(", 'one'");
        for p in path {
            let literal = qb.dialect().type_names().quote_string(&json_path_expression(p));
            qb.push(", ").push(&literal);
        }
        qb.push(")");
        Ok(())
    }

    fn random(&self, seed: Option<i64>, qb: &mut QueryBuilder<'_>) -> Result<()> {
        match seed {
            Some(seed) => qb.push(&format!("RAND({seed})")),
            None => qb.push("RAND()"),
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{col, Function};
    use crate::schema::Table;

    #[test]
    fn test_text_sizes() {
        let tn = MySqlDialect::new().type_names;
        assert_eq!(tn.text_type(TextSize::Medium), "MEDIUMTEXT");
        assert_eq!(tn.text_type(TextSize::Large), "LONGTEXT");
    }

    #[test]
    fn test_cast_targets() {
        let mysql = MySqlDialect::new();
        let id: Expr = col("id", ColumnType::varchar(10)).into();
        assert_eq!(
            id.clone().cast(ColumnType::big_int()).to_sql(&mysql).unwrap(),
            "CAST(id AS SIGNED)"
        );
        assert_eq!(
            id.cast(ColumnType::decimal(10, 2)).to_sql(&mysql).unwrap(),
            "CAST(id AS DECIMAL(10, 2))"
        );
    }

    #[test]
    fn test_nulls_ordering_is_emulated() {
        let mysql = MySqlDialect::new();
        let item = OrderBy::asc(col("a", ColumnType::integer()).into()).nulls(NullsOrder::Last);
        let mut qb = QueryBuilder::inline(&mysql);
        item.render(&mut qb).unwrap();
        assert_eq!(qb.sql(), "CASE WHEN a IS NULL THEN 1 ELSE 0 END, a ASC");
    }

    #[test]
    fn test_json_functions() {
        let mysql = MySqlDialect::new();
        let doc: Expr = col("doc", ColumnType::json()).into();
        let extract = Expr::from(Function::JsonExtract {
            expr: doc.clone(),
            path: vec![String::from("tags"), String::from("0")],
            to_scalar: true,
        });
        assert_eq!(
            extract.to_sql(&mysql).unwrap(),
            "JSON_UNQUOTE(JSON_EXTRACT(doc, '$.tags[0]'))"
        );
        let exists = Expr::from(Function::JsonExists {
            expr: doc,
            path: vec![String::from("a"), String::from("$.b")],
        });
        assert_eq!(
            exists.to_sql(&mysql).unwrap(),
            "JSON_CONTAINS_PATH(doc, 'one', '$.a', '$.b')"
        );
    }

    #[test]
    fn test_modify_and_change_column() {
        let mysql = MySqlDialect::new();
        let mut t = Table::new("users");
        t.column("Name", ColumnType::varchar(80)).unwrap();
        let column = t.get("Name").unwrap();
        let changes = ColumnChanges {
            ty: true,
            ..ColumnChanges::default()
        };
        assert_eq!(
            mysql.modify_column(column, &changes).unwrap(),
            vec![String::from("ALTER TABLE users MODIFY COLUMN `Name` VARCHAR(80) NOT NULL")]
        );
        let renamed = ColumnChanges {
            rename_from: Some(String::from("name")),
            ..ColumnChanges::default()
        };
        let live = ColumnMetadata::new("name", "varchar").size(80);
        assert_eq!(
            mysql.modify_column_with_metadata(column, &live, &renamed).unwrap(),
            vec![String::from("ALTER TABLE users CHANGE COLUMN `name` `Name` VARCHAR(80) NOT NULL")]
        );
    }

    #[test]
    fn test_drop_statements() {
        let mysql = MySqlDialect::new();
        assert_eq!(mysql.drop_index("users", "users_name"), "DROP INDEX users_name ON users");
        assert_eq!(
            MySqlDialect::mariadb().drop_index("users", "users_name"),
            "DROP INDEX IF EXISTS users_name ON users"
        );
        assert_eq!(mysql.drop_primary_key("users", None).unwrap(), "ALTER TABLE users DROP PRIMARY KEY");
        assert_eq!(
            mysql.drop_foreign_key("posts", "fk_posts_author__id"),
            "ALTER TABLE posts DROP FOREIGN KEY fk_posts_author__id"
        );
    }
}
