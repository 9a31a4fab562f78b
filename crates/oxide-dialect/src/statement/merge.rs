//! MERGE requests.

use super::{Select, Statement};
use crate::error::{DialectError, Result};
use crate::expr::Expr;
use crate::render::QueryBuilder;
use crate::schema::Table;

/// Rows merged into the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeSource<'a> {
    /// Another declared table.
    Table(&'a Table),
    /// A sub-select.
    Select(Box<Select>),
}

/// Which rows a clause applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MergeWhen {
    /// Source rows with a matching target row.
    Matched,
    /// Source rows without a matching target row.
    NotMatched,
    /// Target rows without a matching source row.
    NotMatchedBySource,
}

/// What a clause does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeAction {
    /// Inserts a row.
    Insert {
        /// Target columns.
        columns: Vec<String>,
        /// Values, usually source columns.
        values: Vec<Expr>,
    },
    /// Updates the matched row.
    Update(Vec<(String, Expr)>),
    /// Deletes the matched row.
    Delete,
    /// Leaves the row alone.
    DoNothing,
}

/// One `WHEN ... THEN ...` clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeClause {
    /// Row class.
    pub when: MergeWhen,
    /// Extra condition.
    pub condition: Option<Expr>,
    /// Action.
    pub action: MergeAction,
}

/// A MERGE of a source into a declared target table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Merge<'a> {
    /// Target table.
    pub target: &'a Table,
    /// Target alias.
    pub target_alias: Option<String>,
    /// Source rows.
    pub source: MergeSource<'a>,
    /// Source alias.
    pub source_alias: Option<String>,
    /// Match condition; derived from a single-column primary key when absent.
    pub on: Option<Expr>,
    /// Clauses in order.
    pub clauses: Vec<MergeClause>,
}

impl<'a> Merge<'a> {
    /// Merges rows from another table.
    #[must_use]
    pub const fn from_table(target: &'a Table, source: &'a Table) -> Self {
        Self {
            target,
            target_alias: None,
            source: MergeSource::Table(source),
            source_alias: None,
            on: None,
            clauses: Vec::new(),
        }
    }

    /// Merges rows from a query aliased as `alias`.
    #[must_use]
    pub fn from_select(target: &'a Table, source: Select, alias: &str) -> Self {
        Self {
            target,
            target_alias: None,
            source: MergeSource::Select(Box::new(source)),
            source_alias: Some(String::from(alias)),
            on: None,
            clauses: Vec::new(),
        }
    }

    /// Aliases the target.
    #[must_use]
    pub fn target_alias(mut self, alias: &str) -> Self {
        self.target_alias = Some(String::from(alias));
        self
    }

    /// Aliases the source.
    #[must_use]
    pub fn source_alias(mut self, alias: &str) -> Self {
        self.source_alias = Some(String::from(alias));
        self
    }

    /// Sets the match condition.
    #[must_use]
    pub fn on(mut self, condition: Expr) -> Self {
        self.on = Some(condition);
        self
    }

    /// Adds a clause.
    #[must_use]
    pub fn when(mut self, when: MergeWhen, condition: Option<Expr>, action: MergeAction) -> Self {
        self.clauses.push(MergeClause {
            when,
            condition,
            action,
        });
        self
    }

    /// Name the target is referred to by.
    #[must_use]
    pub fn target_name(&self) -> &str {
        self.target_alias.as_deref().unwrap_or(&self.target.name)
    }

    /// Name the source is referred to by.
    ///
    /// # Errors
    ///
    /// Fails for an unaliased sub-select.
    pub fn source_name(&self) -> Result<&str> {
        match (&self.source_alias, &self.source) {
            (Some(alias), _) => Ok(alias),
            (None, MergeSource::Table(t)) => Ok(&t.name),
            (None, MergeSource::Select(_)) => Err(DialectError::validation(
                "a MERGE sub-select source needs an alias",
            )),
        }
    }

    /// The match condition, derived from a single-column primary key of the
    /// target or the source when not given.
    ///
    /// # Errors
    ///
    /// Fails when no condition is given and neither side has a single-column
    /// primary key.
    pub fn on_condition(&self) -> Result<Expr> {
        if let Some(on) = &self.on {
            return Ok(on.clone());
        }
        let source_table = match &self.source {
            MergeSource::Table(t) => Some(*t),
            MergeSource::Select(_) => None,
        };
        let key = self
            .target
            .single_primary_key_column()
            .or_else(|| source_table.and_then(Table::single_primary_key_column))
            .ok_or_else(|| {
                DialectError::validation(format!(
                    "MERGE into '{}' has no ON condition and no single-column primary key",
                    self.target.name
                ))
            })?;
        let target = key.to_ref().qualified(self.target_name());
        let source = key.to_ref().qualified(self.source_name()?);
        Ok(target.eq_column(&source))
    }
}

impl Statement for Merge<'_> {
    fn render_to(&self, qb: &mut QueryBuilder<'_>) -> Result<()> {
        qb.dialect().statements().merge(self, qb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{MySqlDialect, OracleDialect, PostgresDialect, SqlServerDialect};
    use crate::expr::raw;
    use crate::schema::Column;
    use crate::types::ColumnType;

    fn accounts(name: &str) -> Table {
        let mut t = Table::new(name);
        t.add(Column::new("id", ColumnType::integer())).unwrap();
        t.column("balance", ColumnType::integer()).unwrap();
        t.set_primary_key(&["id"], None).unwrap();
        t
    }

    fn merge<'a>(target: &'a Table, source: &'a Table) -> Merge<'a> {
        Merge::from_table(target, source)
            .target_alias("t")
            .source_alias("s")
            .when(
                MergeWhen::Matched,
                None,
                MergeAction::Update(vec![(String::from("balance"), raw("s.balance"))]),
            )
            .when(
                MergeWhen::NotMatched,
                None,
                MergeAction::Insert {
                    columns: vec![String::from("id"), String::from("balance")],
                    values: vec![raw("s.id"), raw("s.balance")],
                },
            )
    }

    #[test]
    fn test_on_condition_from_primary_key() {
        let (a, b) = (accounts("accounts"), accounts("staging"));
        let m = merge(&a, &b);
        assert_eq!(
            m.on_condition().unwrap().to_sql(&PostgresDialect::new()).unwrap(),
            "t.id = s.id"
        );
    }

    #[test]
    fn test_standard_merge() {
        let (a, b) = (accounts("accounts"), accounts("staging"));
        assert_eq!(
            merge(&a, &b).to_sql(&PostgresDialect::new()).unwrap(),
            "MERGE INTO accounts AS t USING staging AS s ON t.id = s.id \
             WHEN MATCHED THEN UPDATE SET balance = s.balance \
             WHEN NOT MATCHED THEN INSERT (id, balance) VALUES (s.id, s.balance)"
        );
        assert!(merge(&a, &b).to_sql(&MySqlDialect::new()).is_err());
    }

    #[test]
    fn test_sql_server_merge_is_terminated() {
        let (a, b) = (accounts("accounts"), accounts("staging"));
        let m = merge(&a, &b).when(MergeWhen::NotMatchedBySource, None, MergeAction::Delete);
        assert_eq!(
            m.to_sql(&SqlServerDialect::new()).unwrap(),
            "MERGE INTO accounts AS t USING staging AS s ON t.id = s.id \
             WHEN MATCHED THEN UPDATE SET balance = s.balance \
             WHEN NOT MATCHED THEN INSERT (id, balance) VALUES (s.id, s.balance) \
             WHEN NOT MATCHED BY SOURCE THEN DELETE;"
        );
    }

    #[test]
    fn test_oracle_folds_delete_into_update() {
        let (a, b) = (accounts("accounts"), accounts("staging"));
        let m = merge(&a, &b).when(MergeWhen::Matched, Some(raw("s.balance = 0")), MergeAction::Delete);
        assert_eq!(
            m.to_sql(&OracleDialect::new()).unwrap(),
            "MERGE INTO accounts t USING staging s ON (t.id = s.id) \
             WHEN MATCHED THEN UPDATE SET balance = s.balance DELETE WHERE s.balance = 0 \
             WHEN NOT MATCHED THEN INSERT (id, balance) VALUES (s.id, s.balance)"
        );
    }

    #[test]
    fn test_oracle_rejects_delete_without_update() {
        let (a, b) = (accounts("accounts"), accounts("staging"));
        let m = Merge::from_table(&a, &b).when(MergeWhen::Matched, None, MergeAction::Delete);
        assert!(m.to_sql(&OracleDialect::new()).is_err());
    }

    #[test]
    fn test_do_nothing_only_on_postgres() {
        let (a, b) = (accounts("accounts"), accounts("staging"));
        let m = Merge::from_table(&a, &b).when(MergeWhen::Matched, None, MergeAction::DoNothing);
        assert_eq!(
            m.to_sql(&PostgresDialect::new()).unwrap(),
            "MERGE INTO accounts USING staging ON accounts.id = staging.id WHEN MATCHED THEN DO NOTHING"
        );
        assert!(m.to_sql(&SqlServerDialect::new()).is_err());
    }

    #[test]
    fn test_missing_on_without_key_is_invalid() {
        let mut a = Table::new("a");
        a.column("x", ColumnType::integer()).unwrap();
        let b = a.clone();
        let m = Merge::from_table(&a, &b).when(MergeWhen::Matched, None, MergeAction::Delete);
        assert!(matches!(
            m.to_sql(&PostgresDialect::new()).unwrap_err(),
            DialectError::Validation(_)
        ));
    }
}
