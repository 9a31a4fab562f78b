//! Oracle dialect.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};

use super::statements::{
    json_path, json_path_expression, merge_upsert, pipe_concat, render_assignments,
    render_delete, render_insert, render_merge_head, render_row, render_update, rownum_bound,
    sequence_columns, unsupported, MergeStyle, UpsertRows,
};
use super::type_names::to_hex;
use super::{
    add_column_statements, sequence_statement, Capabilities, Dialect, IndexTypeClause,
    ParamStyle, StatementProvider, TypeNameProvider, Vendor,
};
use crate::diff::{ColumnChanges, TypeEquivalence};
use crate::error::{DialectError, Result};
use crate::expr::Expr;
use crate::render::QueryBuilder;
use crate::schema::{Column, Sequence};
use crate::statement::{
    Delete, Insert, InsertSource, Merge, MergeAction, MergeClause, MergeWhen, Update, Upsert,
};
use crate::types::{TextSize, TypeKind};
use crate::value::SqlValue;

static CAPABILITIES: Capabilities = Capabilities {
    supports_if_not_exists: false,
    supports_if_exists: false,
    needs_sequence_to_auto_inc: true,
    supports_dual_table: true,
    supports_window_groups_mode: true,
    supports_on_update: false,
    supports_set_default: false,
    supports_restrict: false,
    supports_create_schema: false,
    supports_identity_columns: false,
    supports_partial_indexes: false,
    max_sequence_value: 9_999_999_999_999_999_999_999_999_999,
    param_style: ParamStyle::Colon,
    ..Capabilities::STANDARD
};

/// Oracle Database.
#[derive(Debug, Clone, Copy, Default)]
pub struct OracleDialect;

impl OracleDialect {
    /// Creates the dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for OracleDialect {
    fn name(&self) -> &'static str {
        "oracle"
    }

    fn vendor(&self) -> Vendor {
        Vendor::Oracle
    }

    fn capabilities(&self) -> &Capabilities {
        &CAPABILITIES
    }

    fn type_names(&self) -> &dyn TypeNameProvider {
        &OracleTypeNames
    }

    fn statements(&self) -> &dyn StatementProvider {
        &OracleStatements
    }

    fn extra_keywords(&self) -> &'static [&'static str] {
        &[
            "ACCESS", "AUDIT", "CLUSTER", "COMMENT", "COMPRESS", "CONNECT", "FILE", "IDENTIFIED",
            "LEVEL", "LOCK", "LONG", "MINUS", "MODE", "NUMBER", "OPTION", "PRIOR", "RAW",
            "RESOURCE", "ROWID", "ROWNUM", "SESSION", "SIZE", "START", "SYNONYM", "SYSDATE",
            "UID", "VARCHAR2", "VIEW",
        ]
    }

    fn create_sequence(&self, sequence: &Sequence, if_not_exists: bool) -> Result<String> {
        sequence_statement(self, sequence, if_not_exists, "NOCYCLE", Some("NOCACHE"))
    }

    fn drop_table(&self, table: &str) -> String {
        format!("DROP TABLE {} CASCADE CONSTRAINTS", self.quote_identifier(table))
    }

    fn index_type_clause(&self, tag: &str) -> Option<IndexTypeClause> {
        tag.eq_ignore_ascii_case("BITMAP")
            .then(|| IndexTypeClause::Prefix(String::from("BITMAP")))
    }

    fn add_column(&self, column: &Column) -> Result<Vec<String>> {
        add_column_statements(self, column, "ADD")
    }

    fn modify_column(&self, column: &Column, changes: &ColumnChanges) -> Result<Vec<String>> {
        let mut parts = Vec::new();
        if changes.ty {
            parts.push(column.ty.base_sql_type(self)?);
        }
        if changes.default {
            let default = column
                .default_sql(self)?
                .unwrap_or_else(|| String::from("NULL"));
            parts.push(format!("DEFAULT {default}"));
        }
        if changes.nullability {
            parts.push(String::from(if column.is_nullable() {
                "NULL"
            } else {
                "NOT NULL"
            }));
        }
        let mut out = Vec::new();
        if !parts.is_empty() {
            out.push(format!(
                "ALTER TABLE {} MODIFY ({} {})",
                self.quote_identifier(&column.table),
                self.quote_identifier(&column.name),
                parts.join(" ")
            ));
        }
        if changes.comment {
            out.extend(self.column_comment_statement(column));
        }
        Ok(out)
    }

    fn drop_primary_key(&self, table: &str, _name: Option<&str>) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} DROP PRIMARY KEY",
            self.quote_identifier(table)
        ))
    }

    fn create_database(&self, _name: &str) -> Result<String> {
        Err(DialectError::unsupported(self.name(), "CREATE DATABASE"))
    }

    fn drop_database(&self, _name: &str) -> Result<String> {
        Err(DialectError::unsupported(self.name(), "DROP DATABASE"))
    }

    fn list_databases(&self) -> Result<String> {
        Ok(String::from("SELECT USERNAME FROM ALL_USERS"))
    }

    fn set_schema(&self, name: &str) -> Result<String> {
        Ok(format!(
            "ALTER SESSION SET CURRENT_SCHEMA = {}",
            self.quote_identifier(name)
        ))
    }

    fn type_equivalence(&self) -> TypeEquivalence {
        TypeEquivalence::standard()
            .with("VARCHAR", "VARCHAR2")
            .with("NVARCHAR2", "VARCHAR2")
            .with("NCLOB", "CLOB")
    }
}

/// Oracle type names.
#[derive(Debug, Clone, Copy, Default)]
pub struct OracleTypeNames;

impl TypeNameProvider for OracleTypeNames {
    fn dialect_name(&self) -> &'static str {
        "oracle"
    }

    fn tiny_int_type(&self) -> String {
        String::from("NUMBER(3)")
    }

    fn utiny_int_type(&self) -> String {
        String::from("NUMBER(3)")
    }

    fn small_int_type(&self) -> String {
        String::from("NUMBER(5)")
    }

    fn usmall_int_type(&self) -> String {
        String::from("NUMBER(5)")
    }

    fn integer_type(&self) -> String {
        String::from("NUMBER(10)")
    }

    fn uinteger_type(&self) -> String {
        String::from("NUMBER(10)")
    }

    fn big_int_type(&self) -> String {
        String::from("NUMBER(19)")
    }

    fn ubig_int_type(&self) -> String {
        String::from("NUMBER(20)")
    }

    fn auto_increment_type(&self, base: &TypeKind) -> Result<String> {
        // Only reached through an explicit call; columns always use a sequence.
        match base {
            TypeKind::TinyInt | TypeKind::UTinyInt => Ok(self.tiny_int_type()),
            TypeKind::SmallInt | TypeKind::USmallInt => Ok(self.small_int_type()),
            TypeKind::Integer | TypeKind::UInteger => Ok(self.integer_type()),
            TypeKind::BigInt => Ok(self.big_int_type()),
            TypeKind::UBigInt => Ok(self.ubig_int_type()),
            _ => Err(self.unsupported("auto-increment on a non-integer column")),
        }
    }

    fn decimal_type(&self, precision: u32, scale: u32) -> String {
        format!("NUMBER({precision}, {scale})")
    }

    fn float_type(&self) -> String {
        String::from("BINARY_FLOAT")
    }

    fn double_type(&self) -> String {
        String::from("BINARY_DOUBLE")
    }

    fn varchar_type(&self, length: u32) -> String {
        format!("VARCHAR2({length})")
    }

    fn text_type(&self, _size: TextSize) -> String {
        String::from("CLOB")
    }

    fn binary_type(&self, length: Option<u32>) -> Result<String> {
        Ok(length.map_or_else(|| String::from("BLOB"), |n| format!("RAW({n})")))
    }

    fn uuid_type(&self) -> String {
        String::from("RAW(16)")
    }

    fn boolean_type(&self) -> String {
        String::from("NUMBER(1)")
    }

    fn time_type(&self) -> String {
        String::from("TIMESTAMP")
    }

    fn boolean_literal(&self, value: bool) -> String {
        String::from(if value { "1" } else { "0" })
    }

    fn boolean_condition(&self, value: bool) -> String {
        String::from(if value { "1 = 1" } else { "1 = 0" })
    }

    fn boolean_parameter(&self, value: bool) -> SqlValue {
        SqlValue::Int(i64::from(value))
    }

    fn hex_literal(&self, bytes: &[u8]) -> String {
        format!("HEXTORAW('{}')", to_hex(bytes))
    }

    fn date_literal(&self, value: &NaiveDate) -> String {
        format!("DATE '{}'", value.format("%Y-%m-%d"))
    }

    fn time_literal(&self, value: &NaiveTime) -> String {
        format!("TIMESTAMP '1970-01-01 {}'", value.format("%H:%M:%S%.f"))
    }

    fn timestamp_literal(&self, value: &NaiveDateTime) -> String {
        format!("TIMESTAMP '{}'", value.format("%Y-%m-%d %H:%M:%S%.f"))
    }

    fn timestamp_tz_literal(&self, value: &DateTime<FixedOffset>) -> String {
        format!("TIMESTAMP '{}'", value.format("%Y-%m-%d %H:%M:%S%.f %:z"))
    }
}

/// Oracle statement templates.
#[derive(Debug, Clone, Copy, Default)]
pub struct OracleStatements;

impl OracleStatements {
    /// `INSERT ALL INTO t (...) VALUES (...) ... SELECT * FROM DUAL`.
    fn insert_all(&self, insert: &Insert<'_>, rows: &[Vec<Expr>], qb: &mut QueryBuilder<'_>) -> Result<()> {
        qb.push("INSERT ALL");
        for row in rows {
            qb.push(" INTO ")
                .push_identifier(&insert.table.name)
                .push(" (")
                .push_identifiers(&insert.columns)
                .push(") VALUES ");
            render_row(self, row, &[], qb)?;
        }
        qb.push(" SELECT * FROM DUAL");
        Ok(())
    }
}

/// The clauses of a MERGE regrouped into Oracle's fixed shape.
struct OracleMergeClauses<'m> {
    update: Option<&'m MergeClause>,
    delete: Option<&'m MergeClause>,
    insert: Option<&'m MergeClause>,
}

impl<'m> OracleMergeClauses<'m> {
    fn collect(merge: &'m Merge<'_>, qb: &QueryBuilder<'_>) -> Result<Self> {
        let mut out = Self {
            update: None,
            delete: None,
            insert: None,
        };
        for clause in &merge.clauses {
            let slot = match (clause.when, &clause.action) {
                (MergeWhen::Matched, MergeAction::Update(_)) => &mut out.update,
                (MergeWhen::Matched, MergeAction::Delete) => &mut out.delete,
                (MergeWhen::NotMatched, MergeAction::Insert { .. }) => &mut out.insert,
                (MergeWhen::NotMatchedBySource, _) => {
                    return Err(unsupported(qb, "WHEN NOT MATCHED BY SOURCE"));
                }
                (_, MergeAction::DoNothing) => return Err(unsupported(qb, "MERGE ... DO NOTHING")),
                _ => return Err(DialectError::validation("MERGE clause action does not fit its WHEN branch")),
            };
            if slot.replace(clause).is_some() {
                return Err(unsupported(qb, "more than one MERGE clause of the same kind"));
            }
        }
        if out.delete.is_some() && out.update.is_none() {
            return Err(unsupported(qb, "MERGE DELETE without an UPDATE clause"));
        }
        Ok(out)
    }
}

impl StatementProvider for OracleStatements {
    fn limit_offset(
        &self,
        limit: Option<u64>,
        offset: Option<u64>,
        _has_order_by: bool,
        qb: &mut QueryBuilder<'_>,
    ) -> Result<()> {
        if let Some(offset) = offset {
            qb.push(&format!(" OFFSET {offset} ROWS"));
        }
        if let Some(limit) = limit {
            let which = if offset.is_some() { "NEXT" } else { "FIRST" };
            qb.push(&format!(" FETCH {which} {limit} ROWS ONLY"));
        }
        Ok(())
    }

    fn insert(&self, insert: &Insert<'_>, qb: &mut QueryBuilder<'_>) -> Result<()> {
        if insert.ignore {
            return Err(unsupported(qb, "INSERT IGNORE"));
        }
        if !insert.returning.is_empty() {
            return Err(unsupported(qb, "RETURNING"));
        }
        match &insert.source {
            InsertSource::Values(rows) if rows.len() > 1 => {
                if !sequence_columns(insert, qb).is_empty() {
                    return Err(unsupported(qb, "sequence values in a multi-row INSERT"));
                }
                self.insert_all(insert, rows, qb)
            }
            _ => render_insert(self, insert, "INSERT INTO", qb),
        }
    }

    fn default_values(&self, insert: &Insert<'_>, qb: &mut QueryBuilder<'_>) -> Result<()> {
        let Some(first) = insert.table.columns.first() else {
            return Err(DialectError::validation(format!(
                "table '{}' has no columns to default",
                insert.table.name
            )));
        };
        qb.push(" (").push_identifier(&first.name).push(") VALUES (DEFAULT)");
        Ok(())
    }

    fn next_value(&self, sequence: &str, qb: &mut QueryBuilder<'_>) -> Result<()> {
        qb.push_identifier(sequence).push(".NEXTVAL");
        Ok(())
    }

    fn upsert(&self, upsert: &Upsert<'_>, qb: &mut QueryBuilder<'_>) -> Result<()> {
        merge_upsert(self, upsert, MergeStyle::ORACLE, UpsertRows::Dual, qb)
    }

    fn excluded_column(&self, column: &str, qb: &mut QueryBuilder<'_>) -> Result<()> {
        qb.push_qualified(Some("S"), column);
        Ok(())
    }

    fn merge(&self, merge: &Merge<'_>, qb: &mut QueryBuilder<'_>) -> Result<()> {
        let clauses = OracleMergeClauses::collect(merge, qb)?;
        render_merge_head(self, merge, MergeStyle::ORACLE, qb)?;
        if let Some(update) = clauses.update {
            let MergeAction::Update(set) = &update.action else {
                return Err(DialectError::validation("MERGE UPDATE clause without assignments"));
            };
            qb.push(" WHEN MATCHED THEN UPDATE SET ");
            render_assignments(set, qb)?;
            if let Some(condition) = &update.condition {
                qb.push(" WHERE ");
                condition.render(qb)?;
            }
            if let Some(delete) = clauses.delete {
                qb.push(" DELETE WHERE ");
                match &delete.condition {
                    Some(condition) => condition.render(qb)?,
                    None => {
                        let always = qb.dialect().type_names().boolean_condition(true);
                        qb.push(&always);
                    }
                }
            }
        }
        if let Some(insert) = clauses.insert {
            let MergeAction::Insert { columns, values } = &insert.action else {
                return Err(DialectError::validation("MERGE INSERT clause without values"));
            };
            qb.push(" WHEN NOT MATCHED THEN INSERT (")
                .push_identifiers(columns)
                .push(") VALUES (");
            qb.render_list(values, ", ")?;
            qb.push(")");
            if let Some(condition) = &insert.condition {
                qb.push(" WHERE ");
                condition.render(qb)?;
            }
        }
        Ok(())
    }

    fn update(&self, update: &Update, qb: &mut QueryBuilder<'_>) -> Result<()> {
        if !update.joins.is_empty() {
            return self.update_with_join(update, qb);
        }
        if !update.returning.is_empty() {
            return Err(unsupported(qb, "RETURNING"));
        }
        let predicate = rownum_bound(update.where_clause.as_ref(), update.limit);
        render_update(self, update, predicate.as_ref(), qb)
    }

    fn delete(&self, delete: &Delete, qb: &mut QueryBuilder<'_>) -> Result<()> {
        if !delete.joins.is_empty() {
            return self.delete_with_join(delete, qb);
        }
        if !delete.returning.is_empty() {
            return Err(unsupported(qb, "RETURNING"));
        }
        let predicate = rownum_bound(delete.where_clause.as_ref(), delete.limit);
        render_delete(self, delete, predicate.as_ref(), qb)
    }

    fn explain(&self, analyze: bool, options: Option<&str>, qb: &mut QueryBuilder<'_>) -> Result<()> {
        if analyze {
            return Err(unsupported(qb, "EXPLAIN ANALYZE"));
        }
        if options.is_some() {
            return Err(unsupported(qb, "EXPLAIN options"));
        }
        qb.push("EXPLAIN PLAN FOR ");
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

    fn locate(&self, haystack: &Expr, needle: &Expr, qb: &mut QueryBuilder<'_>) -> Result<()> {
        qb.push("INSTR(");
        haystack.render(qb)?;
        qb.push(", ");
        needle.render(qb)?;
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
        let [path] = path else {
            return Err(unsupported(qb, "JSON_EXISTS with other than one path"));
        };
        let path = qb.dialect().type_names().quote_string(&json_path_expression(path));
        qb.push("JSON_EXISTS(");
        expr.render(qb)?;
        qb.push(", ").push(&path).push(")");
        Ok(())
    }

    fn random(&self, seed: Option<i64>, qb: &mut QueryBuilder<'_>) -> Result<()> {
        if seed.is_some() {
            return Err(unsupported(qb, "seeded DBMS_RANDOM.VALUE"));
        }
        qb.push("DBMS_RANDOM.VALUE");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{col, Function};
    use crate::schema::Table;
    use crate::types::ColumnType;

    #[test]
    fn test_type_names() {
        let oracle = OracleDialect::new();
        assert_eq!(ColumnType::varchar(20).sql_type(&oracle).unwrap(), "VARCHAR2(20)");
        assert_eq!(ColumnType::text().sql_type(&oracle).unwrap(), "CLOB");
        assert_eq!(ColumnType::boolean().sql_type(&oracle).unwrap(), "NUMBER(1)");
        assert_eq!(ColumnType::decimal(12, 2).sql_type(&oracle).unwrap(), "NUMBER(12, 2)");
        assert_eq!(ColumnType::uuid().sql_type(&oracle).unwrap(), "RAW(16)");
    }

    #[test]
    fn test_date_literal() {
        let oracle = OracleDialect::new();
        let date = SqlValue::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert_eq!(
            ColumnType::date().value_to_literal(&date, &oracle).unwrap(),
            "DATE '2024-02-29'"
        );
    }

    #[test]
    fn test_modify_column() {
        let oracle = OracleDialect::new();
        let mut t = Table::new("users");
        t.column("name", ColumnType::varchar(80).nullable()).unwrap();
        let changes = ColumnChanges {
            ty: true,
            nullability: true,
            ..ColumnChanges::default()
        };
        assert_eq!(
            oracle.modify_column(t.get("name").unwrap(), &changes).unwrap(),
            vec![String::from("ALTER TABLE users MODIFY (name VARCHAR2(80) NULL)")]
        );
    }

    #[test]
    fn test_add_column_has_no_column_keyword() {
        let oracle = OracleDialect::new();
        let mut t = Table::new("users");
        t.column("age", ColumnType::integer().nullable()).unwrap();
        assert_eq!(
            oracle.add_column(t.get("age").unwrap()).unwrap(),
            vec![String::from("ALTER TABLE users ADD age NUMBER(10) NULL")]
        );
    }

    #[test]
    fn test_json_exists_takes_one_path() {
        let doc: Expr = col("doc", ColumnType::json()).into();
        let one = Expr::from(Function::JsonExists {
            expr: doc.clone(),
            path: vec![String::from("a")],
        });
        assert_eq!(
            one.to_sql(&OracleDialect::new()).unwrap(),
            "JSON_EXISTS(doc, '$.a')"
        );
        let two = Expr::from(Function::JsonExists {
            expr: doc,
            path: vec![String::from("a"), String::from("b")],
        });
        assert!(two.to_sql(&OracleDialect::new()).is_err());
    }

    #[test]
    fn test_empty_in_list_is_false_condition() {
        let id = col("id", ColumnType::integer());
        assert_eq!(
            id.in_list(Vec::<i32>::new()).to_sql(&OracleDialect::new()).unwrap(),
            "1 = 0"
        );
    }
}
