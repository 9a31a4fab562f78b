//! Catalog queries against `sqlite_master` and the table-valued pragmas.

use oxide_dialect::diff::{ColumnMetadata, IndexMetadata, PrimaryKeyMetadata, TableMetadata};
use oxide_dialect::DatabaseSnapshot;
use regex::Regex;
use sqlx::sqlite::SqlitePool;
use sqlx::Row;
use tracing::{debug, info};

use crate::error::{IntrospectError, Result};

const TABLES_SQL: &str = "SELECT name FROM sqlite_master \
    WHERE type = 'table' AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\' ORDER BY name";

const COLUMNS_SQL: &str = "SELECT name, \"type\", \"notnull\", dflt_value, pk \
    FROM pragma_table_info(?1) ORDER BY cid";

const INDEX_LIST_SQL: &str = "SELECT name, \"unique\", origin FROM pragma_index_list(?1)";

const INDEX_INFO_SQL: &str = "SELECT name FROM pragma_index_info(?1) ORDER BY seqno";

const OBJECT_SQL: &str = "SELECT sql FROM sqlite_master WHERE type = ?1 AND name = ?2";

/// Reads schema metadata from a SQLite pool.
#[derive(Debug, Clone)]
pub struct SqliteIntrospector {
    pool: SqlitePool,
    autoincrement: Regex,
    partial_filter: Regex,
}

impl SqliteIntrospector {
    /// Wraps a pool.
    ///
    /// # Errors
    ///
    /// Fails only if the catalog patterns do not compile.
    pub fn new(pool: SqlitePool) -> Result<Self> {
        Ok(Self {
            pool,
            autoincrement: Regex::new(r"(?i)\bAUTOINCREMENT\b")?,
            partial_filter: Regex::new(r"(?is)\)\s*WHERE\s+(.+?)\s*;?\s*$")?,
        })
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// User table names, internal `sqlite_` tables excluded.
    ///
    /// # Errors
    ///
    /// Propagates driver failures.
    pub async fn table_names(&self) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(TABLES_SQL).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    /// Metadata for one table, or `None` when it does not exist.
    ///
    /// # Errors
    ///
    /// Propagates driver failures.
    pub async fn table(&self, name: &str) -> Result<Option<TableMetadata>> {
        let Some(create_sql) = self.object_sql("table", name).await? else {
            return Ok(None);
        };

        let rows = sqlx::query(COLUMNS_SQL)
            .bind(name)
            .fetch_all(&self.pool)
            .await?;
        let mut columns = Vec::with_capacity(rows.len());
        let mut key: Vec<(i64, String)> = Vec::new();
        for row in &rows {
            let column_name: String = row.try_get("name")?;
            let sql_type: String = row.try_get("type")?;
            let not_null: i64 = row.try_get("notnull")?;
            let default: Option<String> = row.try_get("dflt_value")?;
            let pk: i64 = row.try_get("pk")?;
            if pk > 0 {
                key.push((pk, column_name.clone()));
            }
            columns.push(ColumnMetadata {
                name: column_name,
                sql_type,
                nullable: not_null == 0,
                size: None,
                scale: None,
                default,
                auto_increment: false,
                comment: None,
            });
        }
        key.sort_by_key(|(position, _)| *position);
        let key: Vec<String> = key.into_iter().map(|(_, column)| column).collect();

        // Only a single INTEGER key column declared AUTOINCREMENT is an identity.
        if let [only] = key.as_slice() {
            if self.autoincrement.is_match(&create_sql) {
                if let Some(column) = columns.iter_mut().find(|c| &c.name == only) {
                    column.auto_increment = column.sql_type.eq_ignore_ascii_case("INTEGER");
                }
            }
        }

        let primary_key = (!key.is_empty()).then(|| PrimaryKeyMetadata {
            name: None,
            columns: key,
        });
        let indices = self.indices(name).await?;
        debug!(
            table = name,
            columns = columns.len(),
            indices = indices.len(),
            "read table metadata"
        );
        Ok(Some(TableMetadata {
            name: String::from(name),
            columns,
            primary_key,
            indices,
        }))
    }

    /// Declared indices of a table.
    ///
    /// Indices SQLite creates for PRIMARY KEY and UNIQUE constraints are
    /// skipped; expression columns are left out of the column list.
    ///
    /// # Errors
    ///
    /// Propagates driver failures.
    pub async fn indices(&self, table: &str) -> Result<Vec<IndexMetadata>> {
        let rows = sqlx::query(INDEX_LIST_SQL)
            .bind(table)
            .fetch_all(&self.pool)
            .await?;
        let mut indices = Vec::new();
        for row in &rows {
            let name: String = row.try_get("name")?;
            let origin: String = row.try_get("origin")?;
            if origin == "pk" || name.starts_with("sqlite_autoindex_") {
                continue;
            }
            let unique: i64 = row.try_get("unique")?;
            let columns: Vec<(Option<String>,)> = sqlx::query_as(INDEX_INFO_SQL)
                .bind(&name)
                .fetch_all(&self.pool)
                .await?;
            let filter = self
                .object_sql("index", &name)
                .await?
                .and_then(|sql| self.filter_of(&sql));
            indices.push(IndexMetadata {
                name,
                columns: columns.into_iter().filter_map(|(c,)| c).collect(),
                unique: unique != 0,
                filter,
            });
        }
        indices.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(indices)
    }

    /// Every user table in one snapshot. SQLite has no sequences.
    ///
    /// # Errors
    ///
    /// Propagates driver failures.
    pub async fn snapshot(&self) -> Result<DatabaseSnapshot> {
        let mut snapshot = DatabaseSnapshot::new();
        for name in self.table_names().await? {
            if let Some(table) = self.table(&name).await? {
                snapshot = snapshot.with_table(table);
            }
        }
        info!(tables = snapshot.tables.len(), "read sqlite schema");
        Ok(snapshot)
    }

    /// Runs `statements` in one transaction.
    ///
    /// # Errors
    ///
    /// [`IntrospectError::Apply`] names the first failing statement; nothing
    /// is committed in that case.
    pub async fn apply(&self, statements: &[String]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for (index, statement) in statements.iter().enumerate() {
            debug!(statement = %statement, "applying");
            sqlx::query(statement.as_str())
                .execute(&mut *tx)
                .await
                .map_err(|source| IntrospectError::Apply {
                    index,
                    statement: statement.clone(),
                    source,
                })?;
        }
        tx.commit().await?;
        info!(statements = statements.len(), "applied schema changes");
        Ok(())
    }

    async fn object_sql(&self, kind: &str, name: &str) -> Result<Option<String>> {
        let row: Option<(Option<String>,)> = sqlx::query_as(OBJECT_SQL)
            .bind(kind)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(sql,)| sql.unwrap_or_default()))
    }

    fn filter_of(&self, create_index_sql: &str) -> Option<String> {
        self.partial_filter
            .captures(create_index_sql)
            .and_then(|c| c.get(1))
            .map(|m| String::from(m.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn introspector() -> SqliteIntrospector {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await
            .expect("Failed to create in-memory SQLite pool");
        SqliteIntrospector::new(pool).unwrap()
    }

    #[tokio::test]
    async fn test_empty_database() {
        let db = introspector().await;
        assert!(db.table_names().await.unwrap().is_empty());
        assert!(db.table("missing").await.unwrap().is_none());
        assert_eq!(db.snapshot().await.unwrap(), DatabaseSnapshot::new());
    }

    #[tokio::test]
    async fn test_columns_and_key() {
        let db = introspector().await;
        db.apply(&[String::from(
            "CREATE TABLE users (id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL, \
             name VARCHAR(50) NOT NULL, bio TEXT, visits INTEGER DEFAULT 0 NOT NULL)",
        )])
        .await
        .unwrap();

        assert_eq!(db.table_names().await.unwrap(), vec![String::from("users")]);
        let users = db.table("users").await.unwrap().unwrap();
        let names: Vec<&str> = users.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["id", "name", "bio", "visits"]);
        assert!(users.columns[0].auto_increment);
        assert_eq!(users.columns[1].sql_type, "VARCHAR(50)");
        assert!(!users.columns[1].nullable);
        assert!(users.columns[2].nullable);
        assert_eq!(users.columns[3].default.as_deref(), Some("0"));
        assert_eq!(
            users.primary_key,
            Some(PrimaryKeyMetadata {
                name: None,
                columns: vec![String::from("id")]
            })
        );
    }

    #[tokio::test]
    async fn test_rowid_alias_without_autoincrement_is_not_identity() {
        let db = introspector().await;
        db.apply(&[String::from("CREATE TABLE t (id INTEGER PRIMARY KEY, v TEXT)")])
            .await
            .unwrap();
        let t = db.table("t").await.unwrap().unwrap();
        assert!(!t.columns[0].auto_increment);
    }

    #[tokio::test]
    async fn test_indices_skip_constraint_indices() {
        let db = introspector().await;
        db.apply(&[
            String::from(
                "CREATE TABLE pairs (a INTEGER NOT NULL, b INTEGER NOT NULL, \
                 code TEXT UNIQUE, flag BOOLEAN, PRIMARY KEY (a, b))",
            ),
            String::from("CREATE INDEX pairs_b ON pairs (b)"),
            String::from("CREATE UNIQUE INDEX pairs_code_flag ON pairs (code) WHERE flag = TRUE"),
        ])
        .await
        .unwrap();

        let pairs = db.table("pairs").await.unwrap().unwrap();
        assert_eq!(
            pairs.primary_key.unwrap().columns,
            vec![String::from("a"), String::from("b")]
        );
        assert_eq!(
            pairs.indices,
            vec![
                IndexMetadata {
                    name: String::from("pairs_b"),
                    columns: vec![String::from("b")],
                    unique: false,
                    filter: None,
                },
                IndexMetadata {
                    name: String::from("pairs_code_flag"),
                    columns: vec![String::from("code")],
                    unique: true,
                    filter: Some(String::from("flag = TRUE")),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_batch_is_rolled_back() {
        let db = introspector().await;
        let err = db
            .apply(&[
                String::from("CREATE TABLE kept (id INTEGER)"),
                String::from("CREATE TABLE broken ("),
            ])
            .await
            .unwrap_err();
        assert!(matches!(err, IntrospectError::Apply { index: 1, .. }));
        assert!(db.table_names().await.unwrap().is_empty());
    }
}
