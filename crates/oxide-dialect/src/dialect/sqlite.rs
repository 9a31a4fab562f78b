//! SQLite dialect.

use tracing::warn;

use super::statements::{
    json_path, json_path_expression, on_conflict_upsert, pipe_concat, render_assignments,
    render_delete, render_rows, render_update, single_join_partner, unsupported,
};
use super::{
    Capabilities, CommentStyle, Dialect, IdentifierCase, StatementProvider, TypeNameProvider,
    Vendor,
};
use crate::diff::{ColumnChanges, TypeEquivalence};
use crate::error::{DialectError, Result};
use crate::expr::{DatePart, Expr, OrderBy, StatFunction};
use crate::render::QueryBuilder;
use crate::schema::Column;
use crate::statement::{Delete, Merge, Replace, Update, Upsert};
use crate::types::{TextSize, TypeKind};

static CAPABILITIES: Capabilities = Capabilities {
    supports_create_sequence: false,
    supports_column_type_change: false,
    supports_alter_foreign_keys: false,
    supports_alter_primary_key: false,
    supports_returning: true,
    supports_select_for_update: false,
    supports_create_schema: false,
    comment_style: CommentStyle::Unsupported,
    max_identifier_length: 1024,
    identifier_case: IdentifierCase::Preserve,
    ..Capabilities::STANDARD
};

/// SQLite 3.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl SqliteDialect {
    /// Creates the dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn vendor(&self) -> Vendor {
        Vendor::Sqlite
    }

    fn capabilities(&self) -> &Capabilities {
        &CAPABILITIES
    }

    fn type_names(&self) -> &dyn TypeNameProvider {
        &SqliteTypeNames
    }

    fn statements(&self) -> &dyn StatementProvider {
        &SqliteStatements
    }

    fn extra_keywords(&self) -> &'static [&'static str] {
        &["AUTOINCREMENT", "GLOB", "INDEXED", "PRAGMA", "REGEXP", "VACUUM"]
    }

    fn modify_column(&self, column: &Column, changes: &ColumnChanges) -> Result<Vec<String>> {
        if changes.ty || changes.nullability || changes.default || changes.auto_increment {
            return Err(DialectError::unsupported(
                self.name(),
                format!("ALTER COLUMN ({}.{})", column.table, column.name),
            ));
        }
        if changes.comment {
            warn!(
                dialect = self.name(),
                table = %column.table,
                column = %column.name,
                "column comments are not supported, comment change skipped"
            );
        }
        Ok(Vec::new())
    }

    fn create_database(&self, _name: &str) -> Result<String> {
        Err(DialectError::unsupported(self.name(), "CREATE DATABASE"))
    }

    fn drop_database(&self, _name: &str) -> Result<String> {
        Err(DialectError::unsupported(self.name(), "DROP DATABASE"))
    }

    fn list_databases(&self) -> Result<String> {
        Ok(String::from("PRAGMA database_list"))
    }

    fn set_schema(&self, _name: &str) -> Result<String> {
        Err(DialectError::unsupported(self.name(), "SET SCHEMA"))
    }

    fn type_equivalence(&self) -> TypeEquivalence {
        TypeEquivalence::standard()
            .with("BIGINT", "INTEGER")
            .with("SMALLINT", "INTEGER")
            .with("TINYINT", "INTEGER")
            .with("DOUBLE PRECISION", "REAL")
    }
}

/// SQLite type names.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteTypeNames;

impl TypeNameProvider for SqliteTypeNames {
    fn dialect_name(&self) -> &'static str {
        "sqlite"
    }

    fn tiny_int_type(&self) -> String {
        String::from("INTEGER")
    }

    fn utiny_int_type(&self) -> String {
        String::from("INTEGER")
    }

    fn small_int_type(&self) -> String {
        String::from("INTEGER")
    }

    fn usmall_int_type(&self) -> String {
        String::from("INTEGER")
    }

    fn integer_type(&self) -> String {
        String::from("INTEGER")
    }

    fn uinteger_type(&self) -> String {
        String::from("INTEGER")
    }

    fn big_int_type(&self) -> String {
        String::from("INTEGER")
    }

    fn ubig_int_type(&self) -> String {
        String::from("INTEGER")
    }

    fn auto_increment_type(&self, base: &TypeKind) -> Result<String> {
        match base {
            TypeKind::TinyInt
            | TypeKind::UTinyInt
            | TypeKind::SmallInt
            | TypeKind::USmallInt
            | TypeKind::Integer
            | TypeKind::UInteger
            | TypeKind::BigInt
            | TypeKind::UBigInt => Ok(String::from("INTEGER PRIMARY KEY AUTOINCREMENT")),
            _ => Err(self.unsupported("auto-increment on a non-integer column")),
        }
    }

    fn auto_increment_includes_primary_key(&self) -> bool {
        true
    }

    fn float_type(&self) -> String {
        String::from("REAL")
    }

    fn double_type(&self) -> String {
        String::from("REAL")
    }

    fn text_type(&self, _size: TextSize) -> String {
        String::from("TEXT")
    }

    fn binary_type(&self, _length: Option<u32>) -> Result<String> {
        Ok(String::from("BLOB"))
    }

    fn uuid_type(&self) -> String {
        String::from("BLOB")
    }

    fn jsonb_type(&self) -> Result<String> {
        Ok(String::from("JSONB"))
    }

    fn format_default(&self, rendered: &str, is_literal: bool) -> String {
        if is_literal {
            String::from(rendered)
        } else {
            format!("({rendered})")
        }
    }
}

/// SQLite statement templates.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteStatements;

fn strftime_format(part: DatePart) -> &'static str {
    match part {
        DatePart::Year => "%Y",
        DatePart::Month => "%m",
        DatePart::Day => "%d",
        DatePart::Hour => "%H",
        DatePart::Minute => "%M",
        DatePart::Second => "%S",
    }
}

impl StatementProvider for SqliteStatements {
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
                qb.push(" LIMIT -1");
            }
            (None, None) => {}
        }
        if let Some(offset) = offset {
            qb.push(&format!(" OFFSET {offset}"));
        }
        Ok(())
    }

    fn insert_ignore(&self) -> Option<(&'static str, &'static str)> {
        Some(("INSERT OR IGNORE INTO", ""))
    }

    fn next_value(&self, _sequence: &str, qb: &mut QueryBuilder<'_>) -> Result<()> {
        Err(unsupported(qb, "sequences"))
    }

    fn upsert(&self, upsert: &Upsert<'_>, qb: &mut QueryBuilder<'_>) -> Result<()> {
        on_conflict_upsert(self, upsert, qb)
    }

    fn replace(&self, replace: &Replace<'_>, qb: &mut QueryBuilder<'_>) -> Result<()> {
        qb.push("REPLACE INTO ")
            .push_identifier(&replace.table.name)
            .push(" (")
            .push_identifiers(&replace.columns)
            .push(") VALUES ");
        render_rows(self, &replace.rows, &[], qb)
    }

    fn merge(&self, _merge: &Merge<'_>, qb: &mut QueryBuilder<'_>) -> Result<()> {
        Err(unsupported(qb, "MERGE"))
    }

    fn update_with_join(&self, update: &Update, qb: &mut QueryBuilder<'_>) -> Result<()> {
        if update.limit.is_some() {
            return Err(unsupported(qb, "UPDATE ... FROM with LIMIT"));
        }
        let (partner, predicate) = single_join_partner(&update.joins, update.where_clause.as_ref())?;
        qb.push("UPDATE ");
        self.table_ref(&update.table, qb)?;
        qb.push(" SET ");
        render_assignments(&update.set, qb)?;
        qb.push(" FROM ");
        self.table_ref(partner, qb)?;
        if let Some(predicate) = &predicate {
            qb.push(" WHERE ");
            predicate.render(qb)?;
        }
        self.returning(&update.returning, qb)
    }

    fn update(&self, update: &Update, qb: &mut QueryBuilder<'_>) -> Result<()> {
        if !update.joins.is_empty() {
            return self.update_with_join(update, qb);
        }
        render_update(self, update, update.where_clause.as_ref(), qb)?;
        self.returning(&update.returning, qb)?;
        if let Some(limit) = update.limit {
            qb.push(&format!(" LIMIT {limit}"));
        }
        Ok(())
    }

    fn delete(&self, delete: &Delete, qb: &mut QueryBuilder<'_>) -> Result<()> {
        if !delete.joins.is_empty() {
            return self.delete_with_join(delete, qb);
        }
        render_delete(self, delete, delete.where_clause.as_ref(), qb)?;
        self.returning(&delete.returning, qb)?;
        if let Some(limit) = delete.limit {
            qb.push(&format!(" LIMIT {limit}"));
        }
        Ok(())
    }

    fn explain(&self, analyze: bool, options: Option<&str>, qb: &mut QueryBuilder<'_>) -> Result<()> {
        if analyze {
            return Err(unsupported(qb, "EXPLAIN ANALYZE"));
        }
        if options.is_some() {
            return Err(unsupported(qb, "EXPLAIN options"));
        }
        qb.push("EXPLAIN QUERY PLAN ");
        Ok(())
    }

    fn substring(&self, expr: &Expr, start: &Expr, length: &Expr, qb: &mut QueryBuilder<'_>) -> Result<()> {
        qb.push("SUBSTR(");
        qb.render_list(&[expr.clone(), start.clone(), length.clone()], ", ")?;
        qb.push(")");
        Ok(())
    }

    fn char_length(&self, expr: &Expr, qb: &mut QueryBuilder<'_>) -> Result<()> {
        qb.push("LENGTH(");
        expr.render(qb)?;
        qb.push(")");
        Ok(())
    }

    fn concat(&self, separator: Option<&str>, args: &[Expr], qb: &mut QueryBuilder<'_>) -> Result<()> {
        pipe_concat(separator, args, qb)
    }

    fn group_concat(
        &self,
        expr: &Expr,
        separator: Option<&str>,
        distinct: bool,
        order_by: &[OrderBy],
        qb: &mut QueryBuilder<'_>,
    ) -> Result<()> {
        if distinct && separator.is_some() {
            return Err(unsupported(qb, "GROUP_CONCAT with DISTINCT and a separator"));
        }
        if !order_by.is_empty() {
            return Err(unsupported(qb, "GROUP_CONCAT with ORDER BY"));
        }
        qb.push("GROUP_CONCAT(");
        if distinct {
            qb.push("DISTINCT ");
        }
        expr.render(qb)?;
        if let Some(sep) = separator {
            let sep = qb.dialect().type_names().quote_string(sep);
            qb.push(", ").push(&sep);
        }
        qb.push(")");
        Ok(())
    }

    fn locate(&self, haystack: &Expr, needle: &Expr, qb: &mut QueryBuilder<'_>) -> Result<()> {
        qb.push("INSTR(");
        haystack.render(qb)?;
        qb.push(", ");
        needle.render(qb)?;
        qb.push(")");
        Ok(())
    }

    fn regexp(&self, expr: &Expr, pattern: &Expr, case_sensitive: bool, qb: &mut QueryBuilder<'_>) -> Result<()> {
        if !case_sensitive {
            return Err(unsupported(qb, "case-insensitive REGEXP"));
        }
        expr.render(qb)?;
        qb.push(" REGEXP ");
        pattern.render(qb)
    }

    fn date_part(&self, part: DatePart, expr: &Expr, qb: &mut QueryBuilder<'_>) -> Result<()> {
        qb.push("CAST(STRFTIME('").push(strftime_format(part)).push("', ");
        expr.render(qb)?;
        qb.push(") AS INTEGER)");
        Ok(())
    }

    fn json_extract(&self, expr: &Expr, path: &[String], to_scalar: bool, qb: &mut QueryBuilder<'_>) -> Result<()> {
        let path = qb.dialect().type_names().quote_string(&json_path(path));
        if to_scalar {
            qb.push("JSON_EXTRACT(");
            expr.render(qb)?;
            qb.push(", ").push(&path).push(")");
        } else {
            expr.render(qb)?;
            qb.push(" -> ").push(&path);
        }
        Ok(())
    }

    fn json_exists(&self, expr: &Expr, path: &[String], qb: &mut QueryBuilder<'_>) -> Result<()> {
        if path.is_empty() {
            return Err(DialectError::validation("JSON path existence needs at least one path"));
        }
        if path.len() > 1 {
            qb.push("(");
        }
        for (i, p) in path.iter().enumerate() {
            if i > 0 {
                qb.push(" OR ");
            }
            let literal = qb.dialect().type_names().quote_string(&json_path_expression(p));
            qb.push("JSON_TYPE(");
            expr.render(qb)?;
            qb.push(", ").push(&literal).push(") IS NOT NULL");
        }
        if path.len() > 1 {
            qb.push(")");
        }
        Ok(())
    }

    fn stat(&self, function: StatFunction, _expr: &Expr, qb: &mut QueryBuilder<'_>) -> Result<()> {
        Err(unsupported(qb, function.as_sql()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{col, Function};
    use crate::schema::Table;
    use crate::statement::{Join, Statement};
    use crate::types::ColumnType;

    fn created() -> Expr {
        col("created", ColumnType::timestamp()).into()
    }

    #[test]
    fn test_date_parts_use_strftime() {
        let f = Expr::from(Function::DatePart {
            part: DatePart::Month,
            expr: created(),
        });
        assert_eq!(
            f.to_sql(&SqliteDialect::new()).unwrap(),
            "CAST(STRFTIME('%m', created) AS INTEGER)"
        );
    }

    #[test]
    fn test_concat_with_separator() {
        let a: Expr = col("a", ColumnType::text()).into();
        let b: Expr = col("b", ColumnType::text()).into();
        let f = Expr::from(Function::Concat {
            separator: Some(String::from("-")),
            args: vec![a, b],
        });
        assert_eq!(f.to_sql(&SqliteDialect::new()).unwrap(), "a || '-' || b");
    }

    #[test]
    fn test_json_exists_ors_paths() {
        let doc: Expr = col("doc", ColumnType::json()).into();
        let f = Expr::from(Function::JsonExists {
            expr: doc,
            path: vec![String::from("a"), String::from("b")],
        });
        assert_eq!(
            f.to_sql(&SqliteDialect::new()).unwrap(),
            "(JSON_TYPE(doc, '$.a') IS NOT NULL OR JSON_TYPE(doc, '$.b') IS NOT NULL)"
        );
    }

    #[test]
    fn test_case_insensitive_regexp_is_unsupported() {
        let expr = col("name", ColumnType::text()).regexp("^a", false);
        assert!(expr.to_sql(&SqliteDialect::new()).is_err());
        let expr = col("name", ColumnType::text()).regexp("^a", true);
        assert_eq!(expr.to_sql(&SqliteDialect::new()).unwrap(), "name REGEXP '^a'");
    }

    #[test]
    fn test_update_from_join() {
        let u = Update::table("users")
            .join(Join::inner("posts", crate::expr::raw("posts.author = users.id")))
            .set("name", crate::expr::raw("posts.title"));
        assert_eq!(
            u.to_sql(&SqliteDialect::new()).unwrap(),
            "UPDATE users SET name = posts.title FROM posts WHERE posts.author = users.id"
        );
    }

    #[test]
    fn test_alter_column_is_unsupported() {
        let mut t = Table::new("users");
        t.column("name", ColumnType::text()).unwrap();
        let changes = ColumnChanges {
            nullability: true,
            ..ColumnChanges::default()
        };
        let err = SqliteDialect::new()
            .modify_column(t.get("name").unwrap(), &changes)
            .unwrap_err();
        assert!(matches!(err, DialectError::Unsupported { .. }));
    }
}
