//! What each subcommand renders.

use std::collections::HashSet;
use std::fmt::Write as _;

use anyhow::{bail, Result};
use oxide_dialect::ddl::{create_statements, drop_statements};
use oxide_dialect::{
    DatabaseSnapshot, DdlOptions, Dialect, DialectRegistry, MetadataSource, SchemaDiff, Vendor,
};
use tracing::debug;

use crate::schema::SchemaFile;

/// `CREATE` statements for the whole schema: free-standing sequences, then
/// tables in dependency order.
///
/// # Errors
///
/// Fails when the schema is invalid or the dialect cannot express it.
pub fn create_sql(
    schema: &SchemaFile,
    dialect: &dyn Dialect,
    opts: &DdlOptions,
) -> Result<Vec<String>> {
    let mut out = Vec::new();
    if opts.sequences {
        for sequence in schema.sequences() {
            out.push(dialect.create_sequence(&sequence, opts.if_not_exists)?);
        }
    }
    out.extend(create_statements(&schema.tables()?, dialect, opts)?);
    debug!(
        dialect = dialect.name(),
        statements = out.len(),
        "rendered create script"
    );
    Ok(out)
}

/// `DROP` statements for the whole schema, children first.
///
/// # Errors
///
/// Fails when the schema is invalid or the dialect cannot express it.
pub fn drop_sql(schema: &SchemaFile, dialect: &dyn Dialect) -> Result<Vec<String>> {
    let mut out = drop_statements(&schema.tables()?, dialect)?;
    for sequence in schema.sequences() {
        out.push(dialect.drop_sequence(&sequence.name)?);
    }
    debug!(dialect = dialect.name(), statements = out.len(), "rendered drop script");
    Ok(out)
}

/// Migration from `snapshot` to the schema. Free-standing sequences the
/// snapshot lacks come first.
///
/// # Errors
///
/// Fails when the schema is invalid, metadata is incomplete or the dialect
/// cannot express a change.
pub fn diff_sql(
    schema: &SchemaFile,
    snapshot: &DatabaseSnapshot,
    dialect: &dyn Dialect,
) -> Result<SchemaDiff> {
    let mut diff = SchemaDiff::compute(&schema.tables()?, snapshot, dialect)?;
    let live: HashSet<String> = snapshot
        .sequences()
        .iter()
        .map(|s| s.to_ascii_lowercase())
        .collect();
    let mut missing = Vec::new();
    for sequence in schema.sequences() {
        if !live.contains(&sequence.name.to_ascii_lowercase()) {
            missing.push(dialect.create_sequence(&sequence, true)?);
        }
    }
    if !missing.is_empty() {
        missing.append(&mut diff.statements);
        diff.statements = missing;
    }
    Ok(diff)
}

/// Registered vendor tokens with the dialect each resolves to.
#[must_use]
pub fn dialect_table(registry: &DialectRegistry) -> Vec<(String, String)> {
    registry
        .vendors()
        .filter_map(|token| {
            registry
                .resolve(token)
                .ok()
                .map(|d| (String::from(token), format!("{} ({})", d.name(), d.vendor())))
        })
        .collect()
}

/// Joins statements into a script, one terminated statement per line.
#[must_use]
pub fn script(statements: &[String]) -> String {
    let mut out = String::new();
    for statement in statements {
        out.push_str(statement);
        if !statement.ends_with(';') {
            out.push(';');
        }
        out.push('\n');
    }
    out
}

/// A script for a diff, warnings first as SQL comments.
#[must_use]
pub fn diff_script(diff: &SchemaDiff) -> String {
    let mut out = String::new();
    for warning in &diff.warnings {
        let _ = writeln!(out, "-- warning: {warning}");
    }
    out.push_str(&script(&diff.statements));
    out
}

/// Only SQLite databases can be read live.
///
/// # Errors
///
/// Fails for any other vendor.
pub fn ensure_introspectable(dialect: &dyn Dialect) -> Result<()> {
    if dialect.vendor() != Vendor::Sqlite {
        bail!(
            "live introspection is only available for SQLite, not {}",
            dialect.vendor()
        );
    }
    Ok(())
}
