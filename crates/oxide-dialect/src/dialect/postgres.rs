//! PostgreSQL dialect.

use super::statements::{
    json_path_expression, on_conflict_upsert, render_assignments, render_delete,
    render_merge, render_order_by, render_update, single_join_partner, unsupported, MergeStyle,
};
use super::type_names::to_hex;
use super::{
    Capabilities, Dialect, IdentifierCase, ParamStyle, StatementProvider, TypeNameProvider, Vendor,
};
use crate::diff::TypeEquivalence;
use crate::error::Result;
use crate::expr::{Expr, OrderBy};
use crate::render::QueryBuilder;
use crate::statement::{Delete, Merge, OnConflict, Replace, Update, Upsert};
use crate::types::TypeKind;

static CAPABILITIES: Capabilities = Capabilities {
    supports_window_groups_mode: true,
    supports_auto_increment_change: true,
    supports_returning: true,
    supports_identity_columns: false,
    max_identifier_length: 63,
    identifier_case: IdentifierCase::Lower,
    param_style: ParamStyle::Dollar,
    ..Capabilities::STANDARD
};

/// PostgreSQL.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    /// Creates the dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgresql"
    }

    fn vendor(&self) -> Vendor {
        Vendor::PostgreSql
    }

    fn capabilities(&self) -> &Capabilities {
        &CAPABILITIES
    }

    fn type_names(&self) -> &dyn TypeNameProvider {
        &PostgresTypeNames
    }

    fn statements(&self) -> &dyn StatementProvider {
        &PostgresStatements
    }

    fn extra_keywords(&self) -> &'static [&'static str] {
        &["ANALYSE", "ANALYZE", "ILIKE", "LATERAL", "RETURNING", "SIMILAR", "VERBOSE"]
    }

    fn list_databases(&self) -> Result<String> {
        Ok(String::from(
            "SELECT datname FROM pg_database WHERE datistemplate = false",
        ))
    }

    fn set_schema(&self, name: &str) -> Result<String> {
        Ok(format!("SET search_path TO {}", self.quote_identifier(name)))
    }

    fn type_equivalence(&self) -> TypeEquivalence {
        TypeEquivalence::standard()
            .with("SERIAL", "INTEGER")
            .with("SMALLSERIAL", "SMALLINT")
            .with("BIGSERIAL", "BIGINT")
            .with("BPCHAR", "CHAR")
    }
}

/// PostgreSQL type names.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresTypeNames;

impl TypeNameProvider for PostgresTypeNames {
    fn dialect_name(&self) -> &'static str {
        "postgresql"
    }

    fn tiny_int_type(&self) -> String {
        String::from("SMALLINT")
    }

    fn auto_increment_type(&self, base: &TypeKind) -> Result<String> {
        match base {
            TypeKind::TinyInt | TypeKind::UTinyInt | TypeKind::SmallInt => {
                Ok(String::from("SMALLSERIAL"))
            }
            TypeKind::USmallInt | TypeKind::Integer => Ok(String::from("SERIAL")),
            TypeKind::UInteger | TypeKind::BigInt | TypeKind::UBigInt => {
                Ok(String::from("BIGSERIAL"))
            }
            _ => Err(self.unsupported("auto-increment on a non-integer column")),
        }
    }

    fn float_type(&self) -> String {
        String::from("REAL")
    }

    fn collate(&self, collation: &str) -> String {
        format!("COLLATE \"{collation}\"")
    }

    fn binary_type(&self, _length: Option<u32>) -> Result<String> {
        Ok(String::from("BYTEA"))
    }

    fn blob_type(&self) -> String {
        String::from("BYTEA")
    }

    fn uuid_type(&self) -> String {
        String::from("UUID")
    }

    fn jsonb_type(&self) -> Result<String> {
        Ok(String::from("JSONB"))
    }

    fn hex_literal(&self, bytes: &[u8]) -> String {
        format!("'\\x{}'", to_hex(bytes))
    }

    fn quote_string(&self, value: &str) -> String {
        if !value.chars().any(|c| c == '\\' || c.is_control()) {
            return format!("'{}'", value.replace('\'', "''"));
        }
        let mut out = String::with_capacity(value.len() + 3);
        out.push_str("E'");
        for c in value.chars() {
            match c {
                '\'' => out.push_str("''"),
                '\\' => out.push_str("\\\\"),
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                '\u{8}' => out.push_str("\\b"),
                '\u{c}' => out.push_str("\\f"),
                c if c.is_control() => out.push_str(&format!("\\x{:02x}", u32::from(c))),
                c => out.push(c),
            }
        }
        out.push('\'');
        out
    }

    fn uuid_as_bytes(&self) -> bool {
        false
    }
}

/// PostgreSQL statement templates.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresStatements;

impl StatementProvider for PostgresStatements {
    fn insert_ignore(&self) -> Option<(&'static str, &'static str)> {
        Some(("INSERT INTO", " ON CONFLICT DO NOTHING"))
    }

    fn next_value(&self, sequence: &str, qb: &mut QueryBuilder<'_>) -> Result<()> {
        let name = qb.dialect().quote_identifier(sequence);
        let literal = qb.dialect().type_names().quote_string(&name);
        qb.push("NEXTVAL(").push(&literal).push(")");
        Ok(())
    }

    fn upsert(&self, upsert: &Upsert<'_>, qb: &mut QueryBuilder<'_>) -> Result<()> {
        on_conflict_upsert(self, upsert, qb)
    }

    fn replace(&self, replace: &Replace<'_>, qb: &mut QueryBuilder<'_>) -> Result<()> {
        let upsert = Upsert {
            table: replace.table,
            keys: Vec::new(),
            columns: replace.columns.clone(),
            rows: replace.rows.clone(),
            on_conflict: OnConflict::UpdateAll,
            where_clause: None,
            returning: Vec::new(),
        };
        on_conflict_upsert(self, &upsert, qb)
    }

    fn merge(&self, merge: &Merge<'_>, qb: &mut QueryBuilder<'_>) -> Result<()> {
        render_merge(self, merge, MergeStyle::POSTGRES, qb)
    }

    fn update(&self, update: &Update, qb: &mut QueryBuilder<'_>) -> Result<()> {
        if update.limit.is_some() {
            return Err(unsupported(qb, "UPDATE ... LIMIT"));
        }
        if !update.joins.is_empty() {
            return self.update_with_join(update, qb);
        }
        render_update(self, update, update.where_clause.as_ref(), qb)?;
        self.returning(&update.returning, qb)
    }

    fn update_with_join(&self, update: &Update, qb: &mut QueryBuilder<'_>) -> Result<()> {
        let (partner, predicate) = single_join_partner(&update.joins, update.where_clause.as_ref())?;
        qb.push("UPDATE ");
        self.table_ref(&update.table, qb)?;
        qb.push(" SET ");
        render_assignments(&update.set, qb)?;
        qb.push(" FROM ");
        self.table_ref(partner, qb)?;
        if let Some(predicate) = predicate {
            qb.push(" WHERE ");
            predicate.render(qb)?;
        }
        self.returning(&update.returning, qb)
    }

    fn delete(&self, delete: &Delete, qb: &mut QueryBuilder<'_>) -> Result<()> {
        if delete.limit.is_some() {
            return Err(unsupported(qb, "DELETE ... LIMIT"));
        }
        if !delete.joins.is_empty() {
            return self.delete_with_join(delete, qb);
        }
        render_delete(self, delete, delete.where_clause.as_ref(), qb)?;
        self.returning(&delete.returning, qb)
    }

    fn delete_with_join(&self, delete: &Delete, qb: &mut QueryBuilder<'_>) -> Result<()> {
        let (partner, predicate) = single_join_partner(&delete.joins, delete.where_clause.as_ref())?;
        qb.push("DELETE FROM ");
        self.table_ref(&delete.table, qb)?;
        qb.push(" USING ");
        self.table_ref(partner, qb)?;
        if let Some(predicate) = predicate {
            qb.push(" WHERE ");
            predicate.render(qb)?;
        }
        self.returning(&delete.returning, qb)
    }

    fn explain(&self, analyze: bool, options: Option<&str>, qb: &mut QueryBuilder<'_>) -> Result<()> {
        let mut parts = Vec::new();
        if analyze {
            parts.push("ANALYZE");
        }
        if let Some(options) = options {
            parts.push(options);
        }
        if parts.is_empty() {
            qb.push("EXPLAIN ");
        } else {
            qb.push("EXPLAIN (").push(&parts.join(", ")).push(") ");
        }
        Ok(())
    }

    fn substring(&self, expr: &Expr, start: &Expr, length: &Expr, qb: &mut QueryBuilder<'_>) -> Result<()> {
        qb.push("SUBSTRING(");
        expr.render(qb)?;
        qb.push(" FROM ");
        start.render(qb)?;
        qb.push(" FOR ");
        length.render(qb)?;
        qb.push(")");
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
        let sep = qb.dialect().type_names().quote_string(separator.unwrap_or(","));
        qb.push("STRING_AGG(");
        if distinct {
            qb.push("DISTINCT ");
        }
        expr.render(qb)?;
        qb.push(", ").push(&sep);
        if !order_by.is_empty() {
            qb.push(" ORDER BY ");
            render_order_by(order_by, qb)?;
        }
        qb.push(")");
        Ok(())
    }

    fn regexp(&self, expr: &Expr, pattern: &Expr, case_sensitive: bool, qb: &mut QueryBuilder<'_>) -> Result<()> {
        expr.render(qb)?;
        qb.push(if case_sensitive { " ~ " } else { " ~* " });
        pattern.render(qb)
    }

    fn json_extract(&self, expr: &Expr, path: &[String], to_scalar: bool, qb: &mut QueryBuilder<'_>) -> Result<()> {
        let path = qb.dialect().type_names().quote_string(&pg_path(path.iter().map(String::as_str)));
        expr.render(qb)?;
        qb.push(if to_scalar { " #>> " } else { " #> " }).push(&path);
        Ok(())
    }

    fn json_contains(&self, target: &Expr, candidate: &Expr, path: Option<&str>, qb: &mut QueryBuilder<'_>) -> Result<()> {
        match path {
            None => target.render(qb)?,
            Some(path) => {
                let expression = json_path_expression(path);
                let segments = expression
                    .trim_start_matches('$')
                    .split(['.', '[', ']'])
                    .filter(|s| !s.is_empty());
                let path = qb.dialect().type_names().quote_string(&pg_path(segments));
                qb.push("(");
                target.render(qb)?;
                qb.push(" #> ").push(&path).push(")");
            }
        }
        qb.push(" @> ");
        candidate.render(qb)
    }

    fn json_exists(&self, expr: &Expr, path: &[String], qb: &mut QueryBuilder<'_>) -> Result<()> {
        if path.len() > 1 {
            qb.push("(");
        }
        for (i, p) in path.iter().enumerate() {
            if i > 0 {
                qb.push(" OR ");
            }
            let literal = qb.dialect().type_names().quote_string(&json_path_expression(p));
            qb.push("JSONB_PATH_EXISTS(");
            expr.render(qb)?;
            qb.push(", ").push(&literal).push(")");
        }
        if path.len() > 1 {
            qb.push(")");
        }
        Ok(())
    }
}

/// `{a,b,0}` text-array path.
fn pg_path<'a>(segments: impl Iterator<Item = &'a str>) -> String {
    format!("{{{}}}", segments.collect::<Vec<_>>().join(","))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{col, Function};
    use crate::types::ColumnType;
    use crate::value::SqlValue;

    #[test]
    fn test_escape_string_literal() {
        let tn = PostgresTypeNames;
        assert_eq!(tn.quote_string("plain"), "'plain'");
        assert_eq!(tn.quote_string("a\\b'c"), "E'a\\\\b''c'");
    }

    #[test]
    fn test_json_functions() {
        let pg = PostgresDialect::new();
        let doc: Expr = col("doc", ColumnType::jsonb()).into();
        let extract = Expr::from(Function::JsonExtract {
            expr: doc.clone(),
            path: vec![String::from("a"), String::from("0")],
            to_scalar: true,
        });
        assert_eq!(extract.to_sql(&pg).unwrap(), "doc #>> '{a,0}'");
        let exists = Expr::from(Function::JsonExists {
            expr: doc.clone(),
            path: vec![String::from("a.b")],
        });
        assert_eq!(exists.to_sql(&pg).unwrap(), "JSONB_PATH_EXISTS(doc, '$.a.b')");
        let contains = Expr::from(Function::JsonContains {
            target: doc,
            candidate: Expr::Literal {
                value: SqlValue::Text(String::from("{\"x\":1}")),
                ty: ColumnType::text(),
            },
            path: Some(String::from("a")),
        });
        assert_eq!(contains.to_sql(&pg).unwrap(), "(doc #> '{a}') @> '{\"x\":1}'");
    }

    #[test]
    fn test_regexp_case_sensitivity() {
        let pg = PostgresDialect::new();
        let name = col("name", ColumnType::text());
        assert_eq!(name.regexp("^a", false).to_sql(&pg).unwrap(), "name ~* '^a'");
    }

    #[test]
    fn test_serial_types() {
        let tn = PostgresTypeNames;
        assert_eq!(tn.auto_increment_type(&TypeKind::BigInt).unwrap(), "BIGSERIAL");
        assert!(tn.auto_increment_type(&TypeKind::Boolean).is_err());
    }
}
