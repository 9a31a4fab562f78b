//! INSERT, UPSERT and REPLACE requests.

use super::{column_list, known_column, typed_row, Select, Statement};
use crate::error::{DialectError, Result};
use crate::expr::Expr;
use crate::render::QueryBuilder;
use crate::schema::Table;
use crate::value::{SqlValue, ToSqlValue};

/// Where inserted rows come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertSource {
    /// Literal rows, one expression per listed column.
    Values(Vec<Vec<Expr>>),
    /// Rows produced by a query.
    Select(Box<Select>),
    /// A single row made of column defaults.
    DefaultValues,
}

/// An INSERT into a declared table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insert<'a> {
    /// Target table.
    pub table: &'a Table,
    /// Listed columns.
    pub columns: Vec<String>,
    /// Row source.
    pub source: InsertSource,
    /// Skip rows that violate a constraint.
    pub ignore: bool,
    /// RETURNING projection.
    pub returning: Vec<Expr>,
}

impl<'a> Insert<'a> {
    /// An insert of one all-defaults row.
    #[must_use]
    pub fn into(table: &'a Table) -> Self {
        Self {
            table,
            columns: Vec::new(),
            source: InsertSource::DefaultValues,
            ignore: false,
            returning: Vec::new(),
        }
    }

    /// Lists the columns subsequent rows provide.
    ///
    /// # Errors
    ///
    /// Fails when a column does not belong to the table.
    pub fn columns(mut self, columns: &[&str]) -> Result<Self> {
        self.columns = column_list(self.table, columns)?;
        Ok(self)
    }

    /// Sets one column of a single-row insert.
    ///
    /// # Errors
    ///
    /// Fails when the column is unknown or rows were already added.
    pub fn set<T: ToSqlValue>(mut self, column: &str, value: T) -> Result<Self> {
        let ty = known_column(self.table, column)?.ty.clone();
        let expr = Expr::Value {
            value: value.to_sql_value(),
            ty,
        };
        if matches!(self.source, InsertSource::DefaultValues) {
            self.columns = vec![String::from(column)];
            self.source = InsertSource::Values(vec![vec![expr]]);
            return Ok(self);
        }
        match &mut self.source {
            InsertSource::Values(rows) if rows.len() == 1 => rows[0].push(expr),
            _ => {
                return Err(DialectError::validation(
                    "set() only applies to single-row inserts",
                ))
            }
        }
        self.columns.push(String::from(column));
        Ok(self)
    }

    /// Appends a row of values for the listed columns.
    ///
    /// # Errors
    ///
    /// Fails when the row length does not match the column list.
    pub fn row(mut self, values: Vec<SqlValue>) -> Result<Self> {
        let row = typed_row(self.table, &self.columns, values)?;
        if let InsertSource::Values(rows) = &mut self.source {
            rows.push(row);
        } else {
            self.source = InsertSource::Values(vec![row]);
        }
        Ok(self)
    }

    /// Inserts the rows of a query.
    #[must_use]
    pub fn select(mut self, query: Select) -> Self {
        self.source = InsertSource::Select(Box::new(query));
        self
    }

    /// Skips conflicting rows.
    #[must_use]
    pub const fn ignore(mut self) -> Self {
        self.ignore = true;
        self
    }

    /// Sets the RETURNING projection.
    #[must_use]
    pub fn returning(mut self, exprs: Vec<Expr>) -> Self {
        self.returning = exprs;
        self
    }
}

impl Statement for Insert<'_> {
    fn render_to(&self, qb: &mut QueryBuilder<'_>) -> Result<()> {
        qb.dialect().statements().insert(self, qb)
    }
}

/// What an upsert does with a row whose key already exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OnConflict {
    /// Overwrite every non-key column with the proposed value.
    UpdateAll,
    /// Apply these assignments.
    Update(Vec<(String, Expr)>),
    /// Keep the existing row.
    DoNothing,
}

/// Insert-or-update keyed on a set of columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upsert<'a> {
    /// Target table.
    pub table: &'a Table,
    /// Conflict keys; empty means the primary key.
    pub keys: Vec<String>,
    /// Inserted columns.
    pub columns: Vec<String>,
    /// Inserted rows.
    pub rows: Vec<Vec<Expr>>,
    /// Conflict action.
    pub on_conflict: OnConflict,
    /// Restricts which existing rows are updated.
    pub where_clause: Option<Expr>,
    /// RETURNING projection.
    pub returning: Vec<Expr>,
}

impl<'a> Upsert<'a> {
    /// An upsert into `table` that overwrites conflicting rows.
    #[must_use]
    pub fn into(table: &'a Table) -> Self {
        Self {
            table,
            keys: Vec::new(),
            columns: Vec::new(),
            rows: Vec::new(),
            on_conflict: OnConflict::UpdateAll,
            where_clause: None,
            returning: Vec::new(),
        }
    }

    /// Sets the conflict keys.
    ///
    /// # Errors
    ///
    /// Fails when a key is not a column of the table.
    pub fn keys(mut self, keys: &[&str]) -> Result<Self> {
        self.keys = column_list(self.table, keys)?;
        Ok(self)
    }

    /// Lists the inserted columns.
    ///
    /// # Errors
    ///
    /// Fails when a column does not belong to the table.
    pub fn columns(mut self, columns: &[&str]) -> Result<Self> {
        self.columns = column_list(self.table, columns)?;
        Ok(self)
    }

    /// Appends a row.
    ///
    /// # Errors
    ///
    /// Fails when the row length does not match the column list.
    pub fn row(mut self, values: Vec<SqlValue>) -> Result<Self> {
        let row = typed_row(self.table, &self.columns, values)?;
        self.rows.push(row);
        Ok(self)
    }

    /// Uses explicit assignments on conflict.
    #[must_use]
    pub fn update(mut self, assignments: Vec<(String, Expr)>) -> Self {
        self.on_conflict = OnConflict::Update(assignments);
        self
    }

    /// Keeps existing rows on conflict.
    #[must_use]
    pub fn do_nothing(mut self) -> Self {
        self.on_conflict = OnConflict::DoNothing;
        self
    }

    /// Restricts which existing rows are updated.
    #[must_use]
    pub fn filter(mut self, predicate: Expr) -> Self {
        self.where_clause = Some(predicate);
        self
    }

    /// Sets the RETURNING projection.
    #[must_use]
    pub fn returning(mut self, exprs: Vec<Expr>) -> Self {
        self.returning = exprs;
        self
    }

    /// Conflict keys, falling back to the primary key.
    ///
    /// # Errors
    ///
    /// Fails when neither keys nor a primary key exist.
    pub fn effective_keys(&self) -> Result<Vec<String>> {
        if !self.keys.is_empty() {
            return Ok(self.keys.clone());
        }
        match &self.table.primary_key {
            Some(pk) if !pk.columns.is_empty() => Ok(pk.columns.clone()),
            _ => Err(DialectError::validation(format!(
                "upsert into '{}' has no key columns and the table has no primary key",
                self.table.name
            ))),
        }
    }

    /// Assignments applied on conflict; empty when conflicting rows are kept.
    ///
    /// # Errors
    ///
    /// Fails when the keys cannot be resolved.
    pub fn assignments(&self) -> Result<Vec<(String, Expr)>> {
        match &self.on_conflict {
            OnConflict::DoNothing => Ok(Vec::new()),
            OnConflict::Update(assignments) => Ok(assignments.clone()),
            OnConflict::UpdateAll => {
                let keys = self.effective_keys()?;
                Ok(self
                    .columns
                    .iter()
                    .filter(|c| !keys.contains(c))
                    .filter(|c| {
                        self.table
                            .get(c)
                            .is_some_and(|col| !col.ty.is_auto_increment())
                    })
                    .map(|c| (c.clone(), Expr::Excluded(c.clone())))
                    .collect())
            }
        }
    }

    pub(crate) fn check_rows(&self) -> Result<()> {
        if self.rows.is_empty() {
            return Err(DialectError::validation(format!(
                "upsert into '{}' has no rows",
                self.table.name
            )));
        }
        Ok(())
    }
}

impl Statement for Upsert<'_> {
    fn render_to(&self, qb: &mut QueryBuilder<'_>) -> Result<()> {
        self.check_rows()?;
        qb.dialect().statements().upsert(self, qb)
    }
}

/// Delete-then-insert of rows keyed on the primary key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replace<'a> {
    /// Target table.
    pub table: &'a Table,
    /// Listed columns.
    pub columns: Vec<String>,
    /// Rows.
    pub rows: Vec<Vec<Expr>>,
}

impl<'a> Replace<'a> {
    /// A replace into `table`.
    #[must_use]
    pub fn into(table: &'a Table) -> Self {
        Self {
            table,
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Lists the columns.
    ///
    /// # Errors
    ///
    /// Fails when a column does not belong to the table.
    pub fn columns(mut self, columns: &[&str]) -> Result<Self> {
        self.columns = column_list(self.table, columns)?;
        Ok(self)
    }

    /// Appends a row.
    ///
    /// # Errors
    ///
    /// Fails when the row length does not match the column list.
    pub fn row(mut self, values: Vec<SqlValue>) -> Result<Self> {
        let row = typed_row(self.table, &self.columns, values)?;
        self.rows.push(row);
        Ok(self)
    }
}

impl Statement for Replace<'_> {
    fn render_to(&self, qb: &mut QueryBuilder<'_>) -> Result<()> {
        if self.rows.is_empty() {
            return Err(DialectError::validation(format!(
                "replace into '{}' has no rows",
                self.table.name
            )));
        }
        qb.dialect().statements().replace(self, qb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{
        H2Dialect, H2Mode, MySqlDialect, OracleDialect, PostgresDialect, SqlServerDialect,
        SqliteDialect,
    };
    use crate::schema::Column;
    use crate::types::ColumnType;

    fn users() -> Table {
        let mut t = Table::new("users");
        t.add(Column::new("id", ColumnType::integer()).auto_increment())
            .unwrap();
        t.column("name", ColumnType::varchar(50)).unwrap();
        t.set_primary_key(&["id"], None).unwrap();
        t
    }

    fn pairs() -> Table {
        let mut t = Table::new("pairs");
        t.column("a", ColumnType::integer()).unwrap();
        t.column("b", ColumnType::integer()).unwrap();
        t.column("v", ColumnType::varchar(10)).unwrap();
        t.set_primary_key(&["a", "b"], None).unwrap();
        t
    }

    #[test]
    fn test_prepared_insert() {
        let t = users();
        let stmt = Insert::into(&t)
            .set("name", "ann")
            .unwrap()
            .prepare(&PostgresDialect::new())
            .unwrap();
        assert_eq!(stmt.sql, "INSERT INTO users (name) VALUES ($1)");
        assert_eq!(stmt.values(), vec![SqlValue::Text(String::from("ann"))]);
    }

    #[test]
    fn test_sequence_is_injected_on_oracle() {
        let t = users();
        let sql = Insert::into(&t)
            .set("name", "ann")
            .unwrap()
            .to_sql(&OracleDialect::new())
            .unwrap();
        assert_eq!(
            sql,
            "INSERT INTO users (name, id) VALUES ('ann', users_id_seq.NEXTVAL)"
        );
    }

    #[test]
    fn test_default_values_forms() {
        let mut t = Table::new("logs");
        t.column("id", ColumnType::integer()).unwrap();
        let insert = Insert::into(&t);
        assert_eq!(
            insert.to_sql(&PostgresDialect::new()).unwrap(),
            "INSERT INTO logs DEFAULT VALUES"
        );
        assert_eq!(
            insert.to_sql(&MySqlDialect::new()).unwrap(),
            "INSERT INTO logs () VALUES ()"
        );
        assert_eq!(
            insert.to_sql(&OracleDialect::new()).unwrap(),
            "INSERT INTO logs (id) VALUES (DEFAULT)"
        );
    }

    #[test]
    fn test_insert_ignore_forms() {
        let t = users();
        let insert = Insert::into(&t).set("name", "x").unwrap().ignore();
        assert_eq!(
            insert.to_sql(&MySqlDialect::new()).unwrap(),
            "INSERT IGNORE INTO users (name) VALUES ('x')"
        );
        assert_eq!(
            insert.to_sql(&PostgresDialect::new()).unwrap(),
            "INSERT INTO users (name) VALUES ('x') ON CONFLICT DO NOTHING"
        );
        assert_eq!(
            insert.to_sql(&SqliteDialect::new()).unwrap(),
            "INSERT OR IGNORE INTO users (name) VALUES ('x')"
        );
        assert!(insert.to_sql(&SqlServerDialect::new()).is_err());
    }

    #[test]
    fn test_multi_row_insert_on_oracle() {
        let t = pairs();
        let sql = Insert::into(&t)
            .columns(&["a", "b", "v"])
            .unwrap()
            .row(vec![SqlValue::Int(1), SqlValue::Int(2), "x".to_sql_value()])
            .unwrap()
            .row(vec![SqlValue::Int(3), SqlValue::Int(4), "y".to_sql_value()])
            .unwrap()
            .to_sql(&OracleDialect::new())
            .unwrap();
        assert_eq!(
            sql,
            "INSERT ALL INTO pairs (a, b, v) VALUES (1, 2, 'x') INTO pairs (a, b, v) VALUES (3, 4, 'y') SELECT * FROM DUAL"
        );
    }

    #[test]
    fn test_row_length_is_validated() {
        let t = pairs();
        let err = Insert::into(&t)
            .columns(&["a", "b"])
            .unwrap()
            .row(vec![SqlValue::Int(1)])
            .unwrap_err();
        assert!(matches!(err, DialectError::Validation(_)));
    }

    fn pair_upsert(t: &Table) -> Upsert<'_> {
        Upsert::into(t)
            .keys(&["a", "b"])
            .unwrap()
            .columns(&["a", "b", "v"])
            .unwrap()
            .row(vec![SqlValue::Int(1), SqlValue::Int(2), "x".to_sql_value()])
            .unwrap()
    }

    #[test]
    fn test_upsert_on_conflict() {
        let t = pairs();
        assert_eq!(
            pair_upsert(&t).to_sql(&PostgresDialect::new()).unwrap(),
            "INSERT INTO pairs (a, b, v) VALUES (1, 2, 'x') ON CONFLICT (a, b) DO UPDATE SET v = EXCLUDED.v"
        );
        assert_eq!(
            pair_upsert(&t).to_sql(&SqliteDialect::new()).unwrap(),
            "INSERT INTO pairs (a, b, v) VALUES (1, 2, 'x') ON CONFLICT (a, b) DO UPDATE SET v = EXCLUDED.v"
        );
    }

    #[test]
    fn test_upsert_on_duplicate_key() {
        let t = pairs();
        assert_eq!(
            pair_upsert(&t).to_sql(&MySqlDialect::new()).unwrap(),
            "INSERT INTO pairs (a, b, v) VALUES (1, 2, 'x') AS NEW ON DUPLICATE KEY UPDATE v = NEW.v"
        );
        assert_eq!(
            pair_upsert(&t).to_sql(&MySqlDialect::mariadb()).unwrap(),
            "INSERT INTO pairs (a, b, v) VALUES (1, 2, 'x') ON DUPLICATE KEY UPDATE v = VALUES(v)"
        );
    }

    #[test]
    fn test_upsert_merge_emulation() {
        let t = pairs();
        assert_eq!(
            pair_upsert(&t).to_sql(&SqlServerDialect::new()).unwrap(),
            "MERGE INTO pairs AS T USING (VALUES (1, 2, 'x')) AS S (a, b, v) ON T.a = S.a AND T.b = S.b \
             WHEN MATCHED THEN UPDATE SET v = S.v \
             WHEN NOT MATCHED THEN INSERT (a, b, v) VALUES (S.a, S.b, S.v);"
        );
        assert_eq!(
            pair_upsert(&t).to_sql(&OracleDialect::new()).unwrap(),
            "MERGE INTO pairs T USING (SELECT 1 a, 2 b, 'x' v FROM DUAL) S ON (T.a = S.a AND T.b = S.b) \
             WHEN MATCHED THEN UPDATE SET v = S.v \
             WHEN NOT MATCHED THEN INSERT (a, b, v) VALUES (S.a, S.b, S.v)"
        );
    }

    #[test]
    fn test_upsert_needs_keys() {
        let mut t = Table::new("nokey");
        t.column("v", ColumnType::integer()).unwrap();
        let err = Upsert::into(&t)
            .columns(&["v"])
            .unwrap()
            .row(vec![SqlValue::Int(1)])
            .unwrap()
            .to_sql(&PostgresDialect::new())
            .unwrap_err();
        assert!(matches!(err, DialectError::Validation(_)));
    }

    #[test]
    fn test_replace_forms() {
        let t = users();
        let replace = Replace::into(&t)
            .columns(&["id", "name"])
            .unwrap()
            .row(vec![SqlValue::Int(1), "ann".to_sql_value()])
            .unwrap();
        assert_eq!(
            replace.to_sql(&MySqlDialect::new()).unwrap(),
            "REPLACE INTO users (id, name) VALUES (1, 'ann')"
        );
        assert_eq!(
            replace.to_sql(&H2Dialect::new(H2Mode::Regular)).unwrap(),
            "MERGE INTO users (id, name) KEY (id) VALUES (1, 'ann')"
        );
        assert_eq!(
            replace.to_sql(&PostgresDialect::new()).unwrap(),
            "INSERT INTO users (id, name) VALUES (1, 'ann') ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name"
        );
        assert!(replace.to_sql(&OracleDialect::new()).is_err());
    }
}
