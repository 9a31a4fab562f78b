//! Microsoft SQL Server dialect.

use super::statements::{
    json_path, json_path_expression, merge_upsert, render_assignments, render_joins,
    render_merge, render_order_by, render_where, unsupported, MergeStyle, UpsertRows,
};
use super::type_names::{emulated_nulls_order, to_hex};
use super::{
    add_column_statements, Capabilities, CommentStyle, Dialect, IdentifierCase, ParamStyle,
    StatementProvider, TypeNameProvider, Vendor,
};
use crate::diff::{ColumnChanges, TypeEquivalence};
use crate::error::{DialectError, Result};
use crate::expr::{DatePart, Expr, NullsOrder, OrderBy, SortOrder, StatFunction};
use crate::render::QueryBuilder;
use crate::schema::Column;
use crate::statement::{Delete, Merge, Update, Upsert};
use crate::types::{TextSize, TypeKind};

static CAPABILITIES: Capabilities = Capabilities {
    supports_if_not_exists: false,
    supports_nulls_ordering: false,
    supports_restrict: false,
    supports_select_for_update: false,
    supports_functional_indexes: false,
    comment_style: CommentStyle::Unsupported,
    identifier_case: IdentifierCase::Preserve,
    param_style: ParamStyle::AtP,
    identifier_quote: ('[', ']'),
    ..Capabilities::STANDARD
};

/// Microsoft SQL Server.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlServerDialect;

impl SqlServerDialect {
    /// Creates the dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn default_constraint(&self, column: &Column) -> String {
        self.truncate_identifier(&format!("DF_{}_{}", column.table, column.name))
    }
}

impl Dialect for SqlServerDialect {
    fn name(&self) -> &'static str {
        "sqlserver"
    }

    fn vendor(&self) -> Vendor {
        Vendor::SqlServer
    }

    fn capabilities(&self) -> &Capabilities {
        &CAPABILITIES
    }

    fn type_names(&self) -> &dyn TypeNameProvider {
        &SqlServerTypeNames
    }

    fn statements(&self) -> &dyn StatementProvider {
        &SqlServerStatements
    }

    fn extra_keywords(&self) -> &'static [&'static str] {
        &[
            "BROWSE", "CLUSTERED", "DBCC", "DENY", "EXEC", "FILE", "IDENTITY", "MERGE",
            "NONCLUSTERED", "OUTPUT", "PIVOT", "PROC", "TOP", "TRAN", "UNPIVOT",
        ]
    }

    fn default_clause(&self, column: &Column, default_sql: &str) -> String {
        format!(
            " CONSTRAINT {} DEFAULT {default_sql}",
            self.quote_identifier(&self.default_constraint(column))
        )
    }

    fn drop_index(&self, table: &str, index_name: &str) -> String {
        format!(
            "DROP INDEX IF EXISTS {} ON {}",
            self.quote_identifier(index_name),
            self.quote_identifier(table)
        )
    }

    fn add_column(&self, column: &Column) -> Result<Vec<String>> {
        add_column_statements(self, column, "ADD")
    }

    fn modify_column(&self, column: &Column, changes: &ColumnChanges) -> Result<Vec<String>> {
        if changes.auto_increment {
            return Err(DialectError::unsupported(
                self.name(),
                "changing the IDENTITY property of a column",
            ));
        }
        let table = self.quote_identifier(&column.table);
        let name = self.quote_identifier(&column.name);
        let mut out = Vec::new();
        if changes.ty || changes.nullability {
            let nullability = if column.is_nullable() { "NULL" } else { "NOT NULL" };
            out.push(format!(
                "ALTER TABLE {table} ALTER COLUMN {name} {} {nullability}",
                column.ty.base_sql_type(self)?
            ));
        }
        if changes.default {
            let constraint = self.quote_identifier(&self.default_constraint(column));
            out.push(format!("ALTER TABLE {table} DROP CONSTRAINT IF EXISTS {constraint}"));
            if let Some(default) = column.default_sql(self)? {
                out.push(format!(
                    "ALTER TABLE {table} ADD CONSTRAINT {constraint} DEFAULT {default} FOR {name}"
                ));
            }
        }
        if changes.comment {
            out.extend(self.column_comment_statement(column));
        }
        Ok(out)
    }

    fn rename_column(&self, table: &str, from: &str, to: &str) -> Result<String> {
        let tn = self.type_names();
        Ok(format!(
            "EXEC sp_rename {}, {}, 'COLUMN'",
            tn.quote_string(&format!("{table}.{from}")),
            tn.quote_string(to)
        ))
    }

    fn list_databases(&self) -> Result<String> {
        Ok(String::from("SELECT name FROM sys.databases"))
    }

    fn drop_schema(&self, name: &str, cascade: bool) -> Result<String> {
        if cascade {
            return Err(DialectError::unsupported(self.name(), "DROP SCHEMA ... CASCADE"));
        }
        Ok(format!("DROP SCHEMA IF EXISTS {}", self.quote_identifier(name)))
    }

    fn set_schema(&self, _name: &str) -> Result<String> {
        Err(DialectError::unsupported(
            self.name(),
            "switching the session schema",
        ))
    }

    fn type_equivalence(&self) -> TypeEquivalence {
        TypeEquivalence::standard()
            .with("NVARCHAR", "VARCHAR")
            .with("NCHAR", "CHAR")
            .with("DATETIME2", "TIMESTAMP")
            .with("DATETIME", "TIMESTAMP")
            .with("BIT", "BOOLEAN")
    }
}

/// SQL Server type names.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlServerTypeNames;

impl TypeNameProvider for SqlServerTypeNames {
    fn dialect_name(&self) -> &'static str {
        "sqlserver"
    }

    // TINYINT is unsigned on this vendor.
    fn tiny_int_type(&self) -> String {
        String::from("SMALLINT")
    }

    fn utiny_int_type(&self) -> String {
        String::from("TINYINT")
    }

    fn auto_increment_type(&self, base: &TypeKind) -> Result<String> {
        let name = match base {
            TypeKind::TinyInt => self.tiny_int_type(),
            TypeKind::UTinyInt => self.utiny_int_type(),
            TypeKind::SmallInt => self.small_int_type(),
            TypeKind::USmallInt | TypeKind::Integer => self.integer_type(),
            TypeKind::UInteger | TypeKind::BigInt => self.big_int_type(),
            TypeKind::UBigInt => self.ubig_int_type(),
            _ => return Err(self.unsupported("auto-increment on a non-integer column")),
        };
        Ok(format!("{name} IDENTITY(1,1)"))
    }

    fn float_type(&self) -> String {
        String::from("REAL")
    }

    fn double_type(&self) -> String {
        String::from("FLOAT")
    }

    fn char_type(&self, length: u32) -> String {
        format!("NCHAR({length})")
    }

    fn varchar_type(&self, length: u32) -> String {
        format!("NVARCHAR({length})")
    }

    fn text_type(&self, _size: TextSize) -> String {
        String::from("NVARCHAR(MAX)")
    }

    fn binary_type(&self, length: Option<u32>) -> Result<String> {
        Ok(length.map_or_else(|| String::from("VARBINARY(MAX)"), |n| format!("VARBINARY({n})")))
    }

    fn blob_type(&self) -> String {
        String::from("VARBINARY(MAX)")
    }

    fn uuid_type(&self) -> String {
        String::from("UNIQUEIDENTIFIER")
    }

    fn boolean_type(&self) -> String {
        String::from("BIT")
    }

    fn timestamp_type(&self) -> String {
        String::from("DATETIME2")
    }

    fn timestamp_tz_type(&self) -> Result<String> {
        Ok(String::from("DATETIMEOFFSET"))
    }

    fn json_type(&self) -> String {
        String::from("NVARCHAR(MAX)")
    }

    fn boolean_literal(&self, value: bool) -> String {
        String::from(if value { "1" } else { "0" })
    }

    fn boolean_condition(&self, value: bool) -> String {
        String::from(if value { "1 = 1" } else { "1 = 0" })
    }

    fn hex_literal(&self, bytes: &[u8]) -> String {
        format!("0x{}", to_hex(bytes))
    }

    fn uuid_as_bytes(&self) -> bool {
        false
    }

    fn order_by(&self, expr: &str, order: SortOrder, nulls: Option<NullsOrder>) -> String {
        emulated_nulls_order(expr, order, nulls)
    }
}

/// SQL Server statement templates.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlServerStatements;

impl SqlServerStatements {
    fn top(limit: Option<u64>, qb: &mut QueryBuilder<'_>) {
        if let Some(limit) = limit {
            qb.push(&format!(" TOP({limit})"));
        }
    }
}

impl StatementProvider for SqlServerStatements {
    fn limit_offset(
        &self,
        limit: Option<u64>,
        offset: Option<u64>,
        has_order_by: bool,
        qb: &mut QueryBuilder<'_>,
    ) -> Result<()> {
        if limit.is_none() && offset.is_none() {
            return Ok(());
        }
        if !has_order_by {
            qb.push(" ORDER BY (SELECT NULL)");
        }
        qb.push(&format!(" OFFSET {} ROWS", offset.unwrap_or(0)));
        if let Some(limit) = limit {
            qb.push(&format!(" FETCH NEXT {limit} ROWS ONLY"));
        }
        Ok(())
    }

    fn upsert(&self, upsert: &Upsert<'_>, qb: &mut QueryBuilder<'_>) -> Result<()> {
        merge_upsert(self, upsert, MergeStyle::SQL_SERVER, UpsertRows::Values, qb)
    }

    fn excluded_column(&self, column: &str, qb: &mut QueryBuilder<'_>) -> Result<()> {
        qb.push_qualified(Some("S"), column);
        Ok(())
    }

    fn merge(&self, merge: &Merge<'_>, qb: &mut QueryBuilder<'_>) -> Result<()> {
        render_merge(self, merge, MergeStyle::SQL_SERVER, qb)
    }

    fn update(&self, update: &Update, qb: &mut QueryBuilder<'_>) -> Result<()> {
        if !update.returning.is_empty() {
            return Err(unsupported(qb, "UPDATE ... RETURNING"));
        }
        if !update.joins.is_empty() {
            return self.update_with_join(update, qb);
        }
        qb.push("UPDATE");
        Self::top(update.limit, qb);
        qb.push(" ");
        self.table_ref(&update.table, qb)?;
        qb.push(" SET ");
        render_assignments(&update.set, qb)?;
        render_where(update.where_clause.as_ref(), qb)
    }

    fn update_with_join(&self, update: &Update, qb: &mut QueryBuilder<'_>) -> Result<()> {
        qb.push("UPDATE");
        Self::top(update.limit, qb);
        qb.push(" ").push_identifier(update.table.qualifier()).push(" SET ");
        render_assignments(&update.set, qb)?;
        qb.push(" FROM ");
        self.table_ref(&update.table, qb)?;
        render_joins(self, &update.joins, qb)?;
        render_where(update.where_clause.as_ref(), qb)
    }

    fn delete(&self, delete: &Delete, qb: &mut QueryBuilder<'_>) -> Result<()> {
        if !delete.returning.is_empty() {
            return Err(unsupported(qb, "DELETE ... RETURNING"));
        }
        if !delete.joins.is_empty() {
            return self.delete_with_join(delete, qb);
        }
        qb.push("DELETE");
        Self::top(delete.limit, qb);
        qb.push(" FROM ");
        self.table_ref(&delete.table, qb)?;
        render_where(delete.where_clause.as_ref(), qb)
    }

    fn delete_with_join(&self, delete: &Delete, qb: &mut QueryBuilder<'_>) -> Result<()> {
        qb.push("DELETE");
        Self::top(delete.limit, qb);
        qb.push(" ").push_identifier(delete.table.qualifier()).push(" FROM ");
        self.table_ref(&delete.table, qb)?;
        render_joins(self, &delete.joins, qb)?;
        render_where(delete.where_clause.as_ref(), qb)
    }

    fn explain(&self, _analyze: bool, _options: Option<&str>, qb: &mut QueryBuilder<'_>) -> Result<()> {
        Err(unsupported(qb, "EXPLAIN"))
    }

    fn char_length(&self, expr: &Expr, qb: &mut QueryBuilder<'_>) -> Result<()> {
        qb.push("LEN(");
        expr.render(qb)?;
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
        if distinct {
            return Err(unsupported(qb, "STRING_AGG(DISTINCT ...)"));
        }
        let sep = qb.dialect().type_names().quote_string(separator.unwrap_or(","));
        qb.push("STRING_AGG(");
        expr.render(qb)?;
        qb.push(", ").push(&sep).push(")");
        if !order_by.is_empty() {
            qb.push(" WITHIN GROUP (ORDER BY ");
            render_order_by(order_by, qb)?;
            qb.push(")");
        }
        Ok(())
    }

    fn locate(&self, haystack: &Expr, needle: &Expr, qb: &mut QueryBuilder<'_>) -> Result<()> {
        qb.push("CHARINDEX(");
        needle.render(qb)?;
        qb.push(", ");
        haystack.render(qb)?;
        qb.push(")");
        Ok(())
    }

    fn regexp(&self, _expr: &Expr, _pattern: &Expr, _case_sensitive: bool, qb: &mut QueryBuilder<'_>) -> Result<()> {
        Err(unsupported(qb, "regular expressions"))
    }

    fn date_part(&self, part: DatePart, expr: &Expr, qb: &mut QueryBuilder<'_>) -> Result<()> {
        qb.push("DATEPART(").push(part.as_sql()).push(", ");
        expr.render(qb)?;
        qb.push(")");
        Ok(())
    }

    fn json_extract(&self, expr: &Expr, path: &[String], to_scalar: bool, qb: &mut QueryBuilder<'_>) -> Result<()> {
        let path = qb.dialect().type_names().quote_string(&json_path(path));
        qb.push(if to_scalar { "JSON_VALUE(" } else { "JSON_QUERY(" });
        expr.render(qb)?;
        qb.push(", ").push(&path).push(")");
        Ok(())
    }

    fn json_exists(&self, expr: &Expr, path: &[String], qb: &mut QueryBuilder<'_>) -> Result<()> {
        if path.is_empty() {
            return Err(DialectError::validation("JSON existence test without a path"));
        }
        let wrap = path.len() > 1;
        if wrap {
            qb.push("(");
        }
        for (i, p) in path.iter().enumerate() {
            if i > 0 {
                qb.push(" OR ");
            }
            let p = qb.dialect().type_names().quote_string(&json_path_expression(p));
            qb.push("JSON_PATH_EXISTS(");
            expr.render(qb)?;
            qb.push(", ").push(&p).push(") = 1");
        }
        if wrap {
            qb.push(")");
        }
        Ok(())
    }

    fn random(&self, seed: Option<i64>, qb: &mut QueryBuilder<'_>) -> Result<()> {
        match seed {
            Some(seed) => qb.push(&format!("RAND({seed})")),
            None => qb.push("RAND()"),
        };
        Ok(())
    }

    fn stat(&self, function: StatFunction, expr: &Expr, qb: &mut QueryBuilder<'_>) -> Result<()> {
        qb.push(match function {
            StatFunction::StdDevPop => "STDEVP(",
            StatFunction::StdDevSamp => "STDEV(",
            StatFunction::VarPop => "VARP(",
            StatFunction::VarSamp => "VAR(",
        });
        expr.render(qb)?;
        qb.push(")");
        Ok(())
    }
}
