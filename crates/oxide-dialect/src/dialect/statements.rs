//! Statement and function templates.
//!
//! [`StatementProvider`] renders DML requests and the scalar functions whose
//! spelling differs between vendors. Defaults follow standard SQL; vendor
//! providers override the pieces that diverge and reuse the helpers at the
//! bottom of this module.

use std::fmt;

use crate::error::{DialectError, Result};
use crate::expr::{DatePart, Expr, OrderBy, StatFunction};
use crate::render::QueryBuilder;
use crate::statement::{
    Delete, Insert, InsertSource, Join, Merge, MergeAction, MergeSource, MergeWhen, Replace,
    Select, TableRef, Update, Upsert,
};
use crate::types::ColumnType;

/// Renders DML statements and vendor-specific functions.
pub trait StatementProvider: Send + Sync + fmt::Debug {
    /// `SELECT`.
    ///
    /// # Errors
    ///
    /// Propagates rendering failures.
    fn select(&self, select: &Select, qb: &mut QueryBuilder<'_>) -> Result<()> {
        render_select(self, select, qb)
    }

    /// Pagination suffix.
    ///
    /// # Errors
    ///
    /// Vendors may reject some combinations.
    fn limit_offset(
        &self,
        limit: Option<u64>,
        offset: Option<u64>,
        has_order_by: bool,
        qb: &mut QueryBuilder<'_>,
    ) -> Result<()> {
        let _ = has_order_by;
        if let Some(limit) = limit {
            qb.push(&format!(" LIMIT {limit}"));
        }
        if let Some(offset) = offset {
            qb.push(&format!(" OFFSET {offset}"));
        }
        Ok(())
    }

    /// A table with its optional alias.
    ///
    /// # Errors
    ///
    /// Propagates rendering failures.
    fn table_ref(&self, table: &TableRef, qb: &mut QueryBuilder<'_>) -> Result<()> {
        qb.push_identifier(&table.name);
        if let Some(alias) = &table.alias {
            qb.push(" ").push_identifier(alias);
        }
        Ok(())
    }

    /// Verb and suffix of the insert-ignore form, `None` when unsupported.
    fn insert_ignore(&self) -> Option<(&'static str, &'static str)> {
        None
    }

    /// `INSERT`.
    ///
    /// # Errors
    ///
    /// `Unsupported` for an ignore insert without a vendor form.
    fn insert(&self, insert: &Insert<'_>, qb: &mut QueryBuilder<'_>) -> Result<()> {
        let (verb, suffix) = if insert.ignore {
            self.insert_ignore()
                .ok_or_else(|| unsupported(qb, "INSERT IGNORE"))?
        } else {
            ("INSERT INTO", "")
        };
        render_insert(self, insert, verb, qb)?;
        qb.push(suffix);
        self.returning(&insert.returning, qb)
    }

    /// Tail of an insert that only uses column defaults.
    ///
    /// # Errors
    ///
    /// Propagates rendering failures.
    fn default_values(&self, insert: &Insert<'_>, qb: &mut QueryBuilder<'_>) -> Result<()> {
        let _ = insert;
        qb.push(" DEFAULT VALUES");
        Ok(())
    }

    /// Next value of a sequence.
    ///
    /// # Errors
    ///
    /// `Unsupported` on vendors without sequences.
    fn next_value(&self, sequence: &str, qb: &mut QueryBuilder<'_>) -> Result<()> {
        qb.push("NEXT VALUE FOR ").push_identifier(sequence);
        Ok(())
    }

    /// Insert-or-update. The default rewrites into a MERGE over a `VALUES`
    /// row source.
    ///
    /// # Errors
    ///
    /// `Validation` when no key columns can be resolved.
    fn upsert(&self, upsert: &Upsert<'_>, qb: &mut QueryBuilder<'_>) -> Result<()> {
        merge_upsert(self, upsert, MergeStyle::STANDARD, UpsertRows::Values, qb)
    }

    /// `REPLACE`.
    ///
    /// # Errors
    ///
    /// Unsupported unless overridden.
    fn replace(&self, replace: &Replace<'_>, qb: &mut QueryBuilder<'_>) -> Result<()> {
        let _ = replace;
        Err(unsupported(qb, "REPLACE"))
    }

    /// `MERGE`.
    ///
    /// # Errors
    ///
    /// `Unsupported` for clause kinds the vendor lacks, `Validation` when no
    /// ON condition can be derived.
    fn merge(&self, merge: &Merge<'_>, qb: &mut QueryBuilder<'_>) -> Result<()> {
        render_merge(self, merge, MergeStyle::STANDARD, qb)
    }

    /// `UPDATE`.
    ///
    /// # Errors
    ///
    /// `Validation` when nothing is assigned.
    fn update(&self, update: &Update, qb: &mut QueryBuilder<'_>) -> Result<()> {
        if !update.joins.is_empty() {
            return self.update_with_join(update, qb);
        }
        render_update(self, update, update.where_clause.as_ref(), qb)?;
        if let Some(limit) = update.limit {
            qb.push(&format!(" LIMIT {limit}"));
        }
        self.returning(&update.returning, qb)
    }

    /// `UPDATE` driven by joined tables.
    ///
    /// # Errors
    ///
    /// Unsupported unless overridden.
    fn update_with_join(&self, update: &Update, qb: &mut QueryBuilder<'_>) -> Result<()> {
        let _ = update;
        Err(unsupported(qb, "UPDATE with a JOIN"))
    }

    /// `DELETE`.
    ///
    /// # Errors
    ///
    /// Propagates rendering failures.
    fn delete(&self, delete: &Delete, qb: &mut QueryBuilder<'_>) -> Result<()> {
        if !delete.joins.is_empty() {
            return self.delete_with_join(delete, qb);
        }
        render_delete(self, delete, delete.where_clause.as_ref(), qb)?;
        if let Some(limit) = delete.limit {
            qb.push(&format!(" LIMIT {limit}"));
        }
        self.returning(&delete.returning, qb)
    }

    /// `DELETE` restricted by joined tables.
    ///
    /// # Errors
    ///
    /// Unsupported unless overridden.
    fn delete_with_join(&self, delete: &Delete, qb: &mut QueryBuilder<'_>) -> Result<()> {
        let _ = delete;
        Err(unsupported(qb, "DELETE with a JOIN"))
    }

    /// Prefix of an explained statement.
    ///
    /// # Errors
    ///
    /// The default rejects options.
    fn explain(&self, analyze: bool, options: Option<&str>, qb: &mut QueryBuilder<'_>) -> Result<()> {
        if options.is_some() {
            return Err(unsupported(qb, "EXPLAIN options"));
        }
        qb.push(if analyze { "EXPLAIN ANALYZE " } else { "EXPLAIN " });
        Ok(())
    }

    /// `RETURNING` clause; no-op for an empty projection.
    ///
    /// # Errors
    ///
    /// `Unsupported` when the dialect has no RETURNING.
    fn returning(&self, exprs: &[Expr], qb: &mut QueryBuilder<'_>) -> Result<()> {
        if exprs.is_empty() {
            return Ok(());
        }
        if !qb.dialect().capabilities().supports_returning {
            return Err(unsupported(qb, "RETURNING"));
        }
        qb.push(" RETURNING ");
        qb.render_list(exprs, ", ")
    }

    /// The value proposed for `column` inside an upsert's update part.
    ///
    /// # Errors
    ///
    /// Propagates rendering failures.
    fn excluded_column(&self, column: &str, qb: &mut QueryBuilder<'_>) -> Result<()> {
        qb.push("EXCLUDED.").push_identifier(column);
        Ok(())
    }

    /// `CAST(expr AS type)`.
    ///
    /// # Errors
    ///
    /// Fails when the target type has no name in this dialect.
    fn cast(&self, expr: &Expr, ty: &ColumnType, qb: &mut QueryBuilder<'_>) -> Result<()> {
        let target = ty.base_sql_type(qb.dialect())?;
        qb.push("CAST(");
        expr.render(qb)?;
        qb.push(" AS ").push(&target).push(")");
        Ok(())
    }

    /// Substring from a 1-based start.
    ///
    /// # Errors
    ///
    /// Propagates rendering failures.
    fn substring(&self, expr: &Expr, start: &Expr, length: &Expr, qb: &mut QueryBuilder<'_>) -> Result<()> {
        qb.push("SUBSTRING(");
        qb.render_list(&[expr.clone(), start.clone(), length.clone()], ", ")?;
        qb.push(")");
        Ok(())
    }

    /// Length in characters.
    ///
    /// # Errors
    ///
    /// Propagates rendering failures.
    fn char_length(&self, expr: &Expr, qb: &mut QueryBuilder<'_>) -> Result<()> {
        call(qb, "CHAR_LENGTH", std::slice::from_ref(expr))
    }

    /// Concatenation, optionally with a separator.
    ///
    /// # Errors
    ///
    /// Propagates rendering failures.
    fn concat(&self, separator: Option<&str>, args: &[Expr], qb: &mut QueryBuilder<'_>) -> Result<()> {
        match separator {
            None => call(qb, "CONCAT", args),
            Some(sep) => {
                let sep = qb.dialect().type_names().quote_string(sep);
                qb.push("CONCAT_WS(").push(&sep);
                for arg in args {
                    qb.push(", ");
                    arg.render(qb)?;
                }
                qb.push(")");
                Ok(())
            }
        }
    }

    /// Grouped concatenation. The default is `LISTAGG ... WITHIN GROUP`.
    ///
    /// # Errors
    ///
    /// Propagates rendering failures.
    fn group_concat(
        &self,
        expr: &Expr,
        separator: Option<&str>,
        distinct: bool,
        order_by: &[OrderBy],
        qb: &mut QueryBuilder<'_>,
    ) -> Result<()> {
        let sep = qb.dialect().type_names().quote_string(separator.unwrap_or(","));
        qb.push("LISTAGG(");
        if distinct {
            qb.push("DISTINCT ");
        }
        expr.render(qb)?;
        qb.push(", ").push(&sep).push(")");
        if !order_by.is_empty() {
            qb.push(" WITHIN GROUP (ORDER BY ");
            render_order_by(order_by, qb)?;
            qb.push(")");
        }
        Ok(())
    }

    /// 1-based position of `needle` in `haystack`.
    ///
    /// # Errors
    ///
    /// Propagates rendering failures.
    fn locate(&self, haystack: &Expr, needle: &Expr, qb: &mut QueryBuilder<'_>) -> Result<()> {
        qb.push("POSITION(");
        needle.render(qb)?;
        qb.push(" IN ");
        haystack.render(qb)?;
        qb.push(")");
        Ok(())
    }

    /// Regular-expression match.
    ///
    /// # Errors
    ///
    /// `Unsupported` where the vendor has no regexp operator.
    fn regexp(&self, expr: &Expr, pattern: &Expr, case_sensitive: bool, qb: &mut QueryBuilder<'_>) -> Result<()> {
        qb.push("REGEXP_LIKE(");
        expr.render(qb)?;
        qb.push(", ");
        pattern.render(qb)?;
        qb.push(if case_sensitive { ", 'c')" } else { ", 'i')" });
        Ok(())
    }

    /// Extraction of a date/time field.
    ///
    /// # Errors
    ///
    /// Propagates rendering failures.
    fn date_part(&self, part: DatePart, expr: &Expr, qb: &mut QueryBuilder<'_>) -> Result<()> {
        qb.push("EXTRACT(").push(part.as_sql()).push(" FROM ");
        expr.render(qb)?;
        qb.push(")");
        Ok(())
    }

    /// Value at a JSON path.
    ///
    /// # Errors
    ///
    /// Unsupported unless overridden.
    fn json_extract(&self, expr: &Expr, path: &[String], to_scalar: bool, qb: &mut QueryBuilder<'_>) -> Result<()> {
        let _ = (expr, path, to_scalar);
        Err(unsupported(qb, "JSON extraction"))
    }

    /// JSON containment test.
    ///
    /// # Errors
    ///
    /// Unsupported unless overridden.
    fn json_contains(&self, target: &Expr, candidate: &Expr, path: Option<&str>, qb: &mut QueryBuilder<'_>) -> Result<()> {
        let _ = (target, candidate, path);
        Err(unsupported(qb, "JSON containment"))
    }

    /// JSON path existence test.
    ///
    /// # Errors
    ///
    /// Unsupported unless overridden.
    fn json_exists(&self, expr: &Expr, path: &[String], qb: &mut QueryBuilder<'_>) -> Result<()> {
        let _ = (expr, path);
        Err(unsupported(qb, "JSON path existence"))
    }

    /// Random number, optionally seeded.
    ///
    /// # Errors
    ///
    /// The default rejects seeds.
    fn random(&self, seed: Option<i64>, qb: &mut QueryBuilder<'_>) -> Result<()> {
        if seed.is_some() {
            return Err(unsupported(qb, "seeded RANDOM"));
        }
        qb.push("RANDOM()");
        Ok(())
    }

    /// Statistical aggregate.
    ///
    /// # Errors
    ///
    /// `Unsupported` where the vendor lacks the aggregate.
    fn stat(&self, function: StatFunction, expr: &Expr, qb: &mut QueryBuilder<'_>) -> Result<()> {
        call(qb, function.as_sql(), std::slice::from_ref(expr))
    }
}

/// Standard-SQL templates with no vendor deviations.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardStatements;

impl StatementProvider for StandardStatements {}

/// Builds an `Unsupported` error for the dialect being rendered.
pub(crate) fn unsupported(qb: &QueryBuilder<'_>, feature: &str) -> DialectError {
    DialectError::unsupported(qb.dialect().name(), feature)
}

/// `NAME(arg, ...)`.
pub(crate) fn call(qb: &mut QueryBuilder<'_>, name: &str, args: &[Expr]) -> Result<()> {
    qb.push(name).push("(");
    qb.render_list(args, ", ")?;
    qb.push(")");
    Ok(())
}

pub(crate) fn render_order_by(items: &[OrderBy], qb: &mut QueryBuilder<'_>) -> Result<()> {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        item.render(qb)?;
    }
    Ok(())
}

pub(crate) fn render_where(predicate: Option<&Expr>, qb: &mut QueryBuilder<'_>) -> Result<()> {
    if let Some(predicate) = predicate {
        qb.push(" WHERE ");
        predicate.render(qb)?;
    }
    Ok(())
}

/// `a = x, b = y`.
pub(crate) fn render_assignments(set: &[(String, Expr)], qb: &mut QueryBuilder<'_>) -> Result<()> {
    if set.is_empty() {
        return Err(DialectError::validation("UPDATE without assignments"));
    }
    for (i, (column, expr)) in set.iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        qb.push_identifier(column).push(" = ");
        expr.render(qb)?;
    }
    Ok(())
}

/// `UPDATE t SET ... [WHERE predicate]`.
pub(crate) fn render_update<P: StatementProvider + ?Sized>(
    provider: &P,
    update: &Update,
    predicate: Option<&Expr>,
    qb: &mut QueryBuilder<'_>,
) -> Result<()> {
    qb.push("UPDATE ");
    provider.table_ref(&update.table, qb)?;
    qb.push(" SET ");
    render_assignments(&update.set, qb)?;
    render_where(predicate, qb)
}

/// `DELETE FROM t [WHERE predicate]`.
pub(crate) fn render_delete<P: StatementProvider + ?Sized>(
    provider: &P,
    delete: &Delete,
    predicate: Option<&Expr>,
    qb: &mut QueryBuilder<'_>,
) -> Result<()> {
    qb.push("DELETE FROM ");
    provider.table_ref(&delete.table, qb)?;
    render_where(predicate, qb)
}

/// Predicate with an Oracle-style `ROWNUM <= n` bound appended.
pub(crate) fn rownum_bound(predicate: Option<&Expr>, limit: Option<u64>) -> Option<Expr> {
    let Some(limit) = limit else {
        return predicate.cloned();
    };
    let bound = Expr::Raw(format!("ROWNUM <= {limit}"));
    Some(match predicate {
        Some(p) => p.clone().and(bound),
        None => bound,
    })
}

pub(crate) fn render_joins<P: StatementProvider + ?Sized>(
    provider: &P,
    joins: &[Join],
    qb: &mut QueryBuilder<'_>,
) -> Result<()> {
    for join in joins {
        qb.push(" ").push(join.kind.as_sql()).push(" ");
        provider.table_ref(&join.table, qb)?;
        if let Some(on) = &join.on {
            qb.push(" ON ");
            on.render(qb)?;
        }
    }
    Ok(())
}

/// The single join partner of a `FROM`/`USING` style join, with the join
/// condition merged into the WHERE predicate.
pub(crate) fn single_join_partner<'j>(
    joins: &'j [Join],
    where_clause: Option<&Expr>,
) -> Result<(&'j TableRef, Option<Expr>)> {
    let [join] = joins else {
        return Err(DialectError::validation(
            "a joined UPDATE/DELETE needs exactly one join partner",
        ));
    };
    let predicate = match (join.on.clone(), where_clause.cloned()) {
        (Some(on), Some(w)) => Some(on.and(w)),
        (on, w) => on.or(w),
    };
    Ok((&join.table, predicate))
}

pub(crate) fn render_select<P: StatementProvider + ?Sized>(
    provider: &P,
    select: &Select,
    qb: &mut QueryBuilder<'_>,
) -> Result<()> {
    let caps = qb.dialect().capabilities();
    qb.push("SELECT ");
    if select.distinct {
        qb.push("DISTINCT ");
    }
    if select.columns.is_empty() {
        qb.push("*");
    } else {
        qb.render_list(&select.columns, ", ")?;
    }
    match &select.from {
        Some(table) => {
            qb.push(" FROM ");
            provider.table_ref(table, qb)?;
        }
        None if caps.supports_dual_table => {
            qb.push(" FROM DUAL");
        }
        None => {}
    }
    render_joins(provider, &select.joins, qb)?;
    render_where(select.where_clause.as_ref(), qb)?;
    if !select.group_by.is_empty() {
        qb.push(" GROUP BY ");
        qb.render_list(&select.group_by, ", ")?;
    }
    if let Some(having) = &select.having {
        qb.push(" HAVING ");
        having.render(qb)?;
    }
    if !select.order_by.is_empty() {
        qb.push(" ORDER BY ");
        render_order_by(&select.order_by, qb)?;
    }
    provider.limit_offset(select.limit, select.offset, !select.order_by.is_empty(), qb)?;
    if select.for_update {
        if !caps.supports_select_for_update {
            return Err(unsupported(qb, "SELECT FOR UPDATE"));
        }
        qb.push(" FOR UPDATE");
    }
    Ok(())
}

/// Columns whose values come from a sequence and that the insert does not
/// list, paired with their sequence names.
pub(crate) fn sequence_columns(insert: &Insert<'_>, qb: &QueryBuilder<'_>) -> Vec<(String, String)> {
    let dialect = qb.dialect();
    insert
        .table
        .columns
        .iter()
        .filter(|c| !insert.columns.contains(&c.name))
        .filter_map(|c| c.auto_inc_sequence(dialect).map(|s| (c.name.clone(), s.name)))
        .collect()
}

/// `(a, b), (c, d)` value rows, with next sequence values appended.
pub(crate) fn render_rows<P: StatementProvider + ?Sized>(
    provider: &P,
    rows: &[Vec<Expr>],
    sequences: &[(String, String)],
    qb: &mut QueryBuilder<'_>,
) -> Result<()> {
    for (i, row) in rows.iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        render_row(provider, row, sequences, qb)?;
    }
    Ok(())
}

pub(crate) fn render_row<P: StatementProvider + ?Sized>(
    provider: &P,
    row: &[Expr],
    sequences: &[(String, String)],
    qb: &mut QueryBuilder<'_>,
) -> Result<()> {
    qb.push("(");
    qb.render_list(row, ", ")?;
    for (i, (_, sequence)) in sequences.iter().enumerate() {
        if i > 0 || !row.is_empty() {
            qb.push(", ");
        }
        provider.next_value(sequence, qb)?;
    }
    qb.push(")");
    Ok(())
}

/// `{verb} t (cols) VALUES ...` / `SELECT ...` / default values.
pub(crate) fn render_insert<P: StatementProvider + ?Sized>(
    provider: &P,
    insert: &Insert<'_>,
    verb: &str,
    qb: &mut QueryBuilder<'_>,
) -> Result<()> {
    let sequences = sequence_columns(insert, qb);
    qb.push(verb).push(" ").push_identifier(&insert.table.name);
    let mut columns = insert.columns.clone();
    match &insert.source {
        InsertSource::DefaultValues if sequences.is_empty() => {
            provider.default_values(insert, qb)?;
        }
        InsertSource::DefaultValues => {
            columns.extend(sequences.iter().map(|(c, _)| c.clone()));
            qb.push(" (").push_identifiers(&columns).push(") VALUES ");
            render_row(provider, &[], &sequences, qb)?;
        }
        InsertSource::Values(rows) => {
            columns.extend(sequences.iter().map(|(c, _)| c.clone()));
            qb.push(" (").push_identifiers(&columns).push(") VALUES ");
            render_rows(provider, rows, &sequences, qb)?;
        }
        InsertSource::Select(query) => {
            qb.push(" (").push_identifiers(&columns).push(") ");
            provider.select(query, qb)?;
        }
    }
    Ok(())
}

/// `INSERT ... ON CONFLICT (keys) DO UPDATE SET ... | DO NOTHING`.
pub(crate) fn on_conflict_upsert<P: StatementProvider + ?Sized>(
    provider: &P,
    upsert: &Upsert<'_>,
    qb: &mut QueryBuilder<'_>,
) -> Result<()> {
    let keys = upsert.effective_keys()?;
    let assignments = upsert.assignments()?;
    qb.push("INSERT INTO ")
        .push_identifier(&upsert.table.name)
        .push(" (")
        .push_identifiers(&upsert.columns)
        .push(") VALUES ");
    render_rows(provider, &upsert.rows, &[], qb)?;
    qb.push(" ON CONFLICT (").push_identifiers(&keys).push(")");
    if assignments.is_empty() {
        qb.push(" DO NOTHING");
    } else {
        qb.push(" DO UPDATE SET ");
        render_assignments(&assignments, qb)?;
        render_where(upsert.where_clause.as_ref(), qb)?;
    }
    provider.returning(&upsert.returning, qb)
}

/// Syntax switches of the MERGE family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub(crate) struct MergeStyle {
    /// `AS` before aliases.
    pub alias_as: bool,
    /// Parentheses around the ON condition.
    pub on_parens: bool,
    /// Trailing `;`.
    pub terminator: bool,
    /// `THEN DO NOTHING` allowed.
    pub do_nothing: bool,
    /// `WHEN NOT MATCHED BY SOURCE` allowed.
    pub by_source: bool,
    /// At most one `WHEN NOT MATCHED` clause.
    pub single_not_matched: bool,
    /// Update conditions trail `UPDATE SET` as `WHERE` instead of joining
    /// `WHEN MATCHED` with `AND`.
    pub update_where: bool,
}

impl MergeStyle {
    pub(crate) const STANDARD: Self = Self {
        alias_as: true,
        on_parens: false,
        terminator: false,
        do_nothing: false,
        by_source: false,
        single_not_matched: false,
        update_where: false,
    };

    pub(crate) const POSTGRES: Self = Self {
        do_nothing: true,
        ..Self::STANDARD
    };

    pub(crate) const SQL_SERVER: Self = Self {
        terminator: true,
        by_source: true,
        single_not_matched: true,
        ..Self::STANDARD
    };

    pub(crate) const ORACLE: Self = Self {
        alias_as: false,
        on_parens: true,
        update_where: true,
        ..Self::STANDARD
    };

    fn alias(self, qb: &mut QueryBuilder<'_>, alias: &str) {
        qb.push(if self.alias_as { " AS " } else { " " });
        qb.push_identifier(alias);
    }
}

/// `MERGE INTO target [alias] USING source [alias] ON cond`.
pub(crate) fn render_merge_head<P: StatementProvider + ?Sized>(
    provider: &P,
    merge: &Merge<'_>,
    style: MergeStyle,
    qb: &mut QueryBuilder<'_>,
) -> Result<()> {
    let on = merge.on_condition()?;
    qb.push("MERGE INTO ").push_identifier(&merge.target.name);
    if let Some(alias) = &merge.target_alias {
        style.alias(qb, alias);
    }
    qb.push(" USING ");
    match &merge.source {
        MergeSource::Table(table) => {
            qb.push_identifier(&table.name);
            if let Some(alias) = &merge.source_alias {
                style.alias(qb, alias);
            }
        }
        MergeSource::Select(query) => {
            qb.push("(");
            provider.select(query, qb)?;
            qb.push(")");
            style.alias(qb, merge.source_name()?);
        }
    }
    qb.push(" ON ");
    if style.on_parens {
        qb.push("(");
        on.render(qb)?;
        qb.push(")");
    } else {
        on.render(qb)?;
    }
    Ok(())
}

/// Standard `WHEN ... THEN ...` rendering under `style`'s restrictions.
pub(crate) fn render_merge<P: StatementProvider + ?Sized>(
    provider: &P,
    merge: &Merge<'_>,
    style: MergeStyle,
    qb: &mut QueryBuilder<'_>,
) -> Result<()> {
    let not_matched = merge
        .clauses
        .iter()
        .filter(|c| c.when == MergeWhen::NotMatched)
        .count();
    if style.single_not_matched && not_matched > 1 {
        return Err(unsupported(qb, "more than one WHEN NOT MATCHED clause"));
    }
    for clause in &merge.clauses {
        if clause.when == MergeWhen::NotMatchedBySource && !style.by_source {
            return Err(unsupported(qb, "WHEN NOT MATCHED BY SOURCE"));
        }
        if clause.action == MergeAction::DoNothing && !style.do_nothing {
            return Err(unsupported(qb, "MERGE ... DO NOTHING"));
        }
    }
    render_merge_head(provider, merge, style, qb)?;
    for clause in &merge.clauses {
        qb.push(match clause.when {
            MergeWhen::Matched => " WHEN MATCHED",
            MergeWhen::NotMatched => " WHEN NOT MATCHED",
            MergeWhen::NotMatchedBySource => " WHEN NOT MATCHED BY SOURCE",
        });
        if let Some(condition) = &clause.condition {
            qb.push(" AND ");
            condition.render(qb)?;
        }
        qb.push(" THEN ");
        render_merge_action(&clause.action, qb)?;
    }
    if style.terminator {
        qb.push(";");
    }
    Ok(())
}

pub(crate) fn render_merge_action(action: &MergeAction, qb: &mut QueryBuilder<'_>) -> Result<()> {
    match action {
        MergeAction::Insert { columns, values } => {
            qb.push("INSERT (").push_identifiers(columns).push(") VALUES (");
            qb.render_list(values, ", ")?;
            qb.push(")");
        }
        MergeAction::Update(set) => {
            qb.push("UPDATE SET ");
            render_assignments(set, qb)?;
        }
        MergeAction::Delete => {
            qb.push("DELETE");
        }
        MergeAction::DoNothing => {
            qb.push("DO NOTHING");
        }
    }
    Ok(())
}

/// How a MERGE-based upsert spells its synthesized row source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UpsertRows {
    /// `(VALUES (...), (...)) S (cols)`
    Values,
    /// `(SELECT v c, ... FROM DUAL UNION ALL ...) S`
    Dual,
}

const UPSERT_TARGET: &str = "T";
const UPSERT_SOURCE: &str = "S";

/// Upsert rewritten as a MERGE over a synthesized row source.
pub(crate) fn merge_upsert<P: StatementProvider + ?Sized>(
    provider: &P,
    upsert: &Upsert<'_>,
    style: MergeStyle,
    rows: UpsertRows,
    qb: &mut QueryBuilder<'_>,
) -> Result<()> {
    let keys = upsert.effective_keys()?;
    let assignments = upsert.assignments()?;
    if !upsert.returning.is_empty() {
        return Err(unsupported(qb, "RETURNING on a MERGE upsert"));
    }
    qb.push("MERGE INTO ").push_identifier(&upsert.table.name);
    style.alias(qb, UPSERT_TARGET);
    qb.push(" USING (");
    match rows {
        UpsertRows::Values => {
            qb.push("VALUES ");
            render_rows(provider, &upsert.rows, &[], qb)?;
            qb.push(")");
            style.alias(qb, UPSERT_SOURCE);
            qb.push(" (").push_identifiers(&upsert.columns).push(")");
        }
        UpsertRows::Dual => {
            for (i, row) in upsert.rows.iter().enumerate() {
                if i > 0 {
                    qb.push(" UNION ALL ");
                }
                qb.push("SELECT ");
                for (j, (value, column)) in row.iter().zip(&upsert.columns).enumerate() {
                    if j > 0 {
                        qb.push(", ");
                    }
                    value.render(qb)?;
                    qb.push(" ").push_identifier(column);
                }
                qb.push(" FROM DUAL");
            }
            qb.push(")");
            style.alias(qb, UPSERT_SOURCE);
        }
    }
    qb.push(" ON ");
    if style.on_parens {
        qb.push("(");
    }
    for (i, key) in keys.iter().enumerate() {
        if i > 0 {
            qb.push(" AND ");
        }
        qb.push_qualified(Some(UPSERT_TARGET), key)
            .push(" = ")
            .push_qualified(Some(UPSERT_SOURCE), key);
    }
    if style.on_parens {
        qb.push(")");
    }
    if !assignments.is_empty() {
        qb.push(" WHEN MATCHED");
        if let (Some(predicate), false) = (&upsert.where_clause, style.update_where) {
            qb.push(" AND ");
            predicate.render(qb)?;
        }
        qb.push(" THEN UPDATE SET ");
        render_assignments(&assignments, qb)?;
        if style.update_where {
            render_where(upsert.where_clause.as_ref(), qb)?;
        }
    }
    qb.push(" WHEN NOT MATCHED THEN INSERT (")
        .push_identifiers(&upsert.columns)
        .push(") VALUES (");
    for (i, column) in upsert.columns.iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        qb.push_qualified(Some(UPSERT_SOURCE), column);
    }
    qb.push(")");
    if style.terminator {
        qb.push(";");
    }
    Ok(())
}

/// `a || b`, with a quoted separator between arguments when given.
pub(crate) fn pipe_concat(separator: Option<&str>, args: &[Expr], qb: &mut QueryBuilder<'_>) -> Result<()> {
    let separator = separator.map(|s| qb.dialect().type_names().quote_string(s));
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            qb.push(" || ");
            if let Some(sep) = &separator {
                qb.push(sep).push(" || ");
            }
        }
        arg.render(qb)?;
    }
    Ok(())
}

/// Standard JSONPath for a list of key segments: `$.a.b[0]`.
pub(crate) fn json_path(segments: &[String]) -> String {
    let mut path = String::from("$");
    for segment in segments {
        if !segment.is_empty() && segment.chars().all(|c| c.is_ascii_digit()) {
            path.push('[');
            path.push_str(segment);
            path.push(']');
        } else {
            path.push('.');
            path.push_str(segment);
        }
    }
    path
}

/// A caller-supplied JSONPath, with `$.` prepended when missing.
pub(crate) fn json_path_expression(path: &str) -> String {
    if path.starts_with('$') {
        String::from(path)
    } else {
        format!("$.{path}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::PostgresDialect;
    use crate::expr::col;

    #[test]
    fn test_json_paths() {
        let segments = vec![String::from("a"), String::from("0"), String::from("b")];
        assert_eq!(json_path(&segments), "$.a[0].b");
        assert_eq!(json_path_expression("x.y"), "$.x.y");
        assert_eq!(json_path_expression("$.x"), "$.x");
    }

    #[test]
    fn test_empty_assignments_are_rejected() {
        let pg = PostgresDialect::new();
        let mut qb = QueryBuilder::inline(&pg);
        assert!(matches!(
            render_assignments(&[], &mut qb).unwrap_err(),
            DialectError::Validation(_)
        ));
    }

    #[test]
    fn test_standard_statements_defaults() {
        let pg = PostgresDialect::new();
        let provider = StandardStatements;
        let name: Expr = col("name", ColumnType::text()).into();
        let mut qb = QueryBuilder::inline(&pg);
        provider.char_length(&name, &mut qb).unwrap();
        qb.push(" ");
        provider.date_part(DatePart::Year, &name, &mut qb).unwrap();
        assert_eq!(qb.sql(), "CHAR_LENGTH(name) EXTRACT(YEAR FROM name)");
        let mut qb = QueryBuilder::inline(&pg);
        assert!(provider.random(Some(1), &mut qb).is_err());
    }
}
