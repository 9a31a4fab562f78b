//! Schema and snapshot files on disk.

use std::fs;

use oxide_ddl::commands::{create_sql, diff_script, diff_sql, script};
use oxide_ddl::SchemaFile;
use oxide_dialect::dialect::{MySqlDialect, PostgresDialect};
use oxide_dialect::{DatabaseSnapshot, DdlOptions, DialectRegistry};
use tempfile::TempDir;

const SCHEMA: &str = r#"{
    "tables": [{
        "name": "users",
        "columns": [
            {"name": "id", "type": "integer", "auto_increment": true},
            {"name": "name", "type": "varchar", "length": 50, "comment": "display name"},
            {"name": "visits", "type": "integer", "default": 0}
        ],
        "primary_key": {"columns": ["id"]},
        "indices": [{"columns": ["name"]}],
        "checks": [{"name": "visits_positive", "condition": "visits >= 0"}]
    }]
}"#;

const SNAPSHOT: &str = r#"{
    "tables": [{
        "name": "users",
        "columns": [
            {"name": "id", "sql_type": "int", "nullable": false, "auto_increment": true},
            {"name": "name", "sql_type": "varchar(50)", "nullable": false, "comment": "display name"}
        ],
        "primary_key": {"name": "PRIMARY", "columns": ["id"]},
        "indices": [{"name": "users_name", "columns": ["name"]}]
    }]
}"#;

fn write(dir: &TempDir, name: &str, text: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, text).unwrap();
    path
}

// =============================================================================
// Loading
// =============================================================================

#[test]
fn test_schema_file_loads_from_disk() {
    let dir = TempDir::new().unwrap();
    let schema = SchemaFile::load(&write(&dir, "schema.json", SCHEMA)).unwrap();
    let tables = schema.tables().unwrap();
    assert_eq!(tables[0].columns.len(), 3);
    assert_eq!(tables[0].checks.len(), 1);
}

#[test]
fn test_missing_and_malformed_files_are_errors() {
    let dir = TempDir::new().unwrap();
    let err = SchemaFile::load(&dir.path().join("absent.json")).unwrap_err();
    assert!(err.to_string().contains("cannot read schema file"));

    let err = SchemaFile::load(&write(&dir, "bad.json", "{\"tables\": 3}")).unwrap_err();
    assert!(err.to_string().contains("invalid schema file"));
}

// =============================================================================
// Scripts
// =============================================================================

#[test]
fn test_create_script_for_url_resolved_dialect() {
    let dir = TempDir::new().unwrap();
    let schema = SchemaFile::load(&write(&dir, "schema.json", SCHEMA)).unwrap();
    let dialect = DialectRegistry::global()
        .resolve("jdbc:mysql://localhost/app")
        .unwrap();
    let statements = create_sql(&schema, dialect.as_ref(), &DdlOptions::default()).unwrap();
    assert_eq!(
        statements,
        vec![
            String::from(
                "CREATE TABLE IF NOT EXISTS users (id INT AUTO_INCREMENT PRIMARY KEY NOT NULL, \
                 name VARCHAR(50) NOT NULL COMMENT 'display name', \
                 visits INT DEFAULT 0 NOT NULL, \
                 CONSTRAINT visits_positive CHECK (visits >= 0))"
            ),
            String::from("CREATE INDEX users_name ON users (name)"),
        ]
    );
    assert!(script(&statements).ends_with("ON users (name);\n"));
}

#[test]
fn test_diff_from_snapshot_file() {
    let dir = TempDir::new().unwrap();
    let schema = SchemaFile::load(&write(&dir, "schema.json", SCHEMA)).unwrap();
    let text = fs::read_to_string(write(&dir, "live.json", SNAPSHOT)).unwrap();
    let snapshot: DatabaseSnapshot = serde_json::from_str(&text).unwrap();

    let diff = diff_sql(&schema, &snapshot, &MySqlDialect::new()).unwrap();
    assert_eq!(
        diff.statements,
        vec![String::from(
            "ALTER TABLE users ADD COLUMN visits INT DEFAULT 0 NOT NULL"
        )]
    );
    assert_eq!(
        diff_script(&diff),
        "ALTER TABLE users ADD COLUMN visits INT DEFAULT 0 NOT NULL;\n"
    );
}

#[test]
fn test_diff_against_nothing_matches_create() {
    let schema: SchemaFile = serde_json::from_str(SCHEMA).unwrap();
    let dialect = PostgresDialect::new();
    let diff = diff_sql(&schema, &DatabaseSnapshot::new(), &dialect).unwrap();
    let create = create_sql(&schema, &dialect, &DdlOptions::default()).unwrap();
    assert_eq!(diff.statements, create);
}
