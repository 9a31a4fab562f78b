//! `CREATE` / `DROP` statement generation for declared tables.
//!
//! Tables are emitted parents first. Foreign keys are written inline unless
//! they touch a table on a reference cycle or the dialect cannot declare them
//! inside `CREATE TABLE`; those become `ALTER TABLE` statements emitted after
//! every table exists. Dialects without `ALTER TABLE ADD FOREIGN KEY` keep
//! every key inline.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::dialect::{foreign_key_clause, CommentStyle, Dialect};
use crate::error::Result;
use crate::render::QueryBuilder;
use crate::schema::{Column, ForeignKey, Table};

/// Options for [`create_statements`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct DdlOptions {
    /// Add `IF NOT EXISTS` where the dialect supports it.
    pub if_not_exists: bool,
    /// Emit `CREATE SEQUENCE` for sequence-backed auto-increment columns.
    pub sequences: bool,
    /// Emit `CREATE INDEX` for declared indices.
    pub indices: bool,
    /// Emit column comments.
    pub comments: bool,
}

impl Default for DdlOptions {
    fn default() -> Self {
        Self {
            if_not_exists: true,
            sequences: true,
            indices: true,
            comments: true,
        }
    }
}

/// One column definition:
/// `name TYPE [PRIMARY KEY] [DEFAULT x] [NULL|NOT NULL] [COMMENT 'x'] [suffix]`.
///
/// An auto-increment type that already carries `PRIMARY KEY` falls back to
/// its base type unless the column is the table's inline primary key.
///
/// # Errors
///
/// Fails when the type or default cannot be rendered for `dialect`.
pub fn column_definition(
    dialect: &dyn Dialect,
    column: &Column,
    inline_primary_key: bool,
    include_comment: bool,
) -> Result<String> {
    let tn = dialect.type_names();
    let type_has_key = column.ty.is_auto_increment()
        && !column.ty.uses_sequence(dialect)
        && tn.auto_increment_includes_primary_key();
    let ty = if type_has_key && !inline_primary_key {
        warn!(
            dialect = dialect.name(),
            table = %column.table,
            column = %column.name,
            "auto-increment needs a single-column primary key here, using the plain type"
        );
        column.ty.base_sql_type(dialect)?
    } else {
        column.ty.sql_type(dialect)?
    };
    let mut sql = format!("{} {ty}", dialect.quote_identifier(&column.name));
    if inline_primary_key && !type_has_key {
        sql.push_str(" PRIMARY KEY");
    }
    if !column.ty.is_auto_increment() {
        if let Some(default) = column.default_sql(dialect)? {
            sql.push_str(&dialect.default_clause(column, &default));
        }
    }
    sql.push_str(if column.is_nullable() { " NULL" } else { " NOT NULL" });
    if include_comment && dialect.capabilities().comment_style == CommentStyle::Inline {
        if let Some(comment) = &column.comment {
            sql.push_str(" COMMENT ");
            sql.push_str(&tn.quote_string(comment));
        }
    }
    if let Some(suffix) = &column.suffix {
        sql.push(' ');
        sql.push_str(suffix);
    }
    Ok(sql)
}

/// Tables sorted parents first, plus the names of tables on a reference
/// cycle.
///
/// Self-references do not count as cycles. Tables outside `tables` are
/// ignored when ordering. Every reference whose parent is created after its
/// child has both ends in the returned set.
pub fn sort_tables(tables: &[Table]) -> (Vec<&Table>, HashSet<&str>) {
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Mark {
        Unvisited,
        Visiting,
        Done,
    }

    struct Walk<'a> {
        tables: &'a [Table],
        by_name: HashMap<&'a str, usize>,
        marks: Vec<Mark>,
        path: Vec<usize>,
        out: Vec<&'a Table>,
        cyclic: HashSet<&'a str>,
    }

    impl<'a> Walk<'a> {
        fn visit(&mut self, i: usize) {
            let tables = self.tables;
            match self.marks[i] {
                Mark::Done => return,
                Mark::Visiting => {
                    if let Some(start) = self.path.iter().position(|&p| p == i) {
                        for &member in &self.path[start..] {
                            self.cyclic.insert(tables[member].name.as_str());
                        }
                    }
                    return;
                }
                Mark::Unvisited => {}
            }
            self.marks[i] = Mark::Visiting;
            self.path.push(i);
            for column in &tables[i].columns {
                let Some(reference) = &column.references else {
                    continue;
                };
                if let Some(&parent) = self.by_name.get(reference.table.as_str()) {
                    if parent != i {
                        self.visit(parent);
                    }
                }
            }
            self.path.pop();
            self.marks[i] = Mark::Done;
            self.out.push(&tables[i]);
        }
    }

    let mut walk = Walk {
        tables,
        by_name: tables
            .iter()
            .enumerate()
            .map(|(i, t)| (t.name.as_str(), i))
            .collect(),
        marks: vec![Mark::Unvisited; tables.len()],
        path: Vec::new(),
        out: Vec::with_capacity(tables.len()),
        cyclic: HashSet::new(),
    };
    for i in 0..tables.len() {
        walk.visit(i);
    }
    (walk.out, walk.cyclic)
}

/// Whether `fk` is added by `ALTER TABLE` after every table exists.
///
/// Dialects that cannot add foreign keys later keep them inline, which works
/// because they accept references to tables created afterwards.
fn is_deferred(fk: &ForeignKey, cyclic: &HashSet<&str>, dialect: &dyn Dialect) -> bool {
    let caps = dialect.capabilities();
    caps.supports_alter_foreign_keys
        && (!caps.supports_inline_foreign_keys || on_cycle(fk, cyclic))
}

fn on_cycle(fk: &ForeignKey, cyclic: &HashSet<&str>) -> bool {
    cyclic.contains(fk.table.as_str()) || cyclic.contains(fk.target_table.as_str())
}

/// Whether the primary key is written inline on its column.
fn inline_primary_key(table: &Table, dialect: &dyn Dialect) -> Option<String> {
    let pk = table.primary_key.as_ref()?;
    let column = table.single_primary_key_column()?;
    let auto_increment = column.ty.is_auto_increment() && !column.ty.uses_sequence(dialect);
    (pk.name.is_none() || auto_increment).then(|| column.name.clone())
}

fn create_table(
    table: &Table,
    dialect: &dyn Dialect,
    opts: &DdlOptions,
    inline_fks: &[ForeignKey],
) -> Result<String> {
    let caps = dialect.capabilities();
    let inline_pk = inline_primary_key(table, dialect);
    let mut parts = Vec::with_capacity(table.columns.len() + 2);
    for column in &table.columns {
        let is_inline_pk = inline_pk.as_deref() == Some(column.name.as_str());
        parts.push(column_definition(dialect, column, is_inline_pk, opts.comments)?);
    }
    if let (Some(pk), None) = (&table.primary_key, &inline_pk) {
        let cols: Vec<String> = pk.columns.iter().map(|c| dialect.quote_identifier(c)).collect();
        parts.push(format!(
            "CONSTRAINT {} PRIMARY KEY ({})",
            dialect.quote_identifier(&dialect.truncate_identifier(&table.primary_key_name())),
            cols.join(", ")
        ));
    }
    for fk in inline_fks {
        parts.push(foreign_key_clause(dialect, fk));
    }
    for check in &table.checks {
        let mut qb = QueryBuilder::inline(dialect);
        qb.push("CONSTRAINT ")
            .push_identifier(&dialect.truncate_identifier(&check.name))
            .push(" CHECK (");
        check.condition.render(&mut qb)?;
        qb.push(")");
        parts.push(qb.finish().sql);
    }
    let if_not_exists = if opts.if_not_exists && caps.supports_if_not_exists {
        "IF NOT EXISTS "
    } else {
        ""
    };
    Ok(format!(
        "CREATE TABLE {if_not_exists}{} ({})",
        dialect.quote_identifier(&table.name),
        parts.join(", ")
    ))
}

/// Statements creating `tables` and everything they own.
///
/// # Errors
///
/// Propagates rendering failures.
pub fn create_statements(
    tables: &[Table],
    dialect: &dyn Dialect,
    opts: &DdlOptions,
) -> Result<Vec<String>> {
    let caps = dialect.capabilities();
    let (ordered, cyclic) = sort_tables(tables);
    let mut out = Vec::new();
    let mut deferred: Vec<ForeignKey> = Vec::new();

    for table in ordered {
        if opts.sequences {
            for column in &table.columns {
                if let Some(sequence) = column.auto_inc_sequence(dialect) {
                    out.push(dialect.create_sequence(&sequence, opts.if_not_exists)?);
                }
            }
        }
        let (later, inline): (Vec<ForeignKey>, Vec<ForeignKey>) = table
            .foreign_keys()
            .into_iter()
            .partition(|fk| is_deferred(fk, &cyclic, dialect));
        out.push(create_table(table, dialect, opts, &inline)?);
        deferred.extend(later);
        if opts.indices {
            for index in &table.indices {
                out.extend(dialect.create_index(index)?);
            }
        }
        if opts.comments && caps.comment_style == CommentStyle::Statement {
            out.extend(
                table
                    .columns
                    .iter()
                    .filter(|c| c.comment.is_some())
                    .filter_map(|c| dialect.column_comment_statement(c)),
            );
        }
    }
    for fk in &deferred {
        out.push(dialect.add_foreign_key(fk)?);
    }
    for statement in &out {
        debug!(dialect = dialect.name(), sql = %statement, "create statement");
    }
    Ok(out)
}

/// Statements dropping `tables`, children first, then their sequences.
///
/// # Errors
///
/// Propagates `Unsupported` from sequence drops.
pub fn drop_statements(tables: &[Table], dialect: &dyn Dialect) -> Result<Vec<String>> {
    let (ordered, cyclic) = sort_tables(tables);
    let mut out = Vec::new();
    if dialect.capabilities().supports_alter_foreign_keys {
        for table in &ordered {
            for fk in table
                .foreign_keys()
                .into_iter()
                .filter(|fk| on_cycle(fk, &cyclic))
            {
                let name = dialect.truncate_identifier(&fk.constraint_name());
                out.push(dialect.drop_foreign_key(&table.name, &name));
            }
        }
    }
    for table in ordered.iter().rev() {
        out.push(dialect.drop_table(&table.name));
        for column in &table.columns {
            if let Some(sequence) = column.auto_inc_sequence(dialect) {
                out.push(dialect.drop_sequence(&sequence.name)?);
            }
        }
    }
    for statement in &out {
        debug!(dialect = dialect.name(), sql = %statement, "drop statement");
    }
    Ok(out)
}
