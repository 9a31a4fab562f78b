//! H2 dialect and its compatibility modes.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use tracing::{debug, warn};

use super::statements::{merge_upsert, render_rows, MergeStyle, UpsertRows};
use super::{
    Capabilities, Dialect, IndexTypeClause, MySqlDialect, OracleDialect, PostgresDialect,
    SqlServerDialect, StatementProvider, TypeNameProvider, Vendor,
};
use crate::diff::TypeEquivalence;
use crate::error::{DialectError, Result};
use crate::expr::{Expr, OrderBy};
use crate::render::QueryBuilder;
use crate::statement::{Replace, Upsert};
use crate::types::TextSize;

static CAPABILITIES: Capabilities = Capabilities {
    supports_window_groups_mode: true,
    supports_partial_indexes: false,
    supports_functional_indexes: false,
    max_identifier_length: 256,
    ..Capabilities::STANDARD
};

/// H2 compatibility mode, as given by `MODE=` in the connection URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum H2Mode {
    /// Native H2 behaviour.
    #[default]
    Regular,
    /// MySQL compatibility.
    MySql,
    /// MariaDB compatibility.
    MariaDb,
    /// PostgreSQL compatibility.
    PostgreSql,
    /// Oracle compatibility.
    Oracle,
    /// SQL Server compatibility.
    SqlServer,
}

impl H2Mode {
    /// Reads `MODE=` from an H2 URL such as `jdbc:h2:mem:test;MODE=MySQL`.
    /// Unknown or missing modes fall back to [`H2Mode::Regular`].
    #[must_use]
    pub fn from_url(url: &str) -> Self {
        let Some(value) = url
            .split(';')
            .skip(1)
            .filter_map(|setting| setting.split_once('='))
            .find(|(key, _)| key.trim().eq_ignore_ascii_case("MODE"))
            .map(|(_, value)| value.trim())
        else {
            return Self::Regular;
        };
        value.parse().unwrap_or_else(|_| {
            warn!(mode = value, "unknown H2 compatibility mode, using regular mode");
            Self::Regular
        })
    }

    fn delegate(self) -> Option<Box<dyn Dialect>> {
        match self {
            Self::Regular => None,
            Self::MySql => Some(Box::new(MySqlDialect::new())),
            Self::MariaDb => Some(Box::new(MySqlDialect::mariadb())),
            Self::PostgreSql => Some(Box::new(PostgresDialect::new())),
            Self::Oracle => Some(Box::new(OracleDialect::new())),
            Self::SqlServer => Some(Box::new(SqlServerDialect::new())),
        }
    }
}

impl FromStr for H2Mode {
    type Err = DialectError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "regular" | "" => Ok(Self::Regular),
            "mysql" => Ok(Self::MySql),
            "mariadb" => Ok(Self::MariaDb),
            "postgresql" | "postgres" => Ok(Self::PostgreSql),
            "oracle" => Ok(Self::Oracle),
            "mssqlserver" | "sqlserver" => Ok(Self::SqlServer),
            _ => Err(DialectError::invalid_value("H2 compatibility mode", s)),
        }
    }
}

impl fmt::Display for H2Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Regular => "REGULAR",
            Self::MySql => "MySQL",
            Self::MariaDb => "MariaDB",
            Self::PostgreSql => "PostgreSQL",
            Self::Oracle => "Oracle",
            Self::SqlServer => "MSSQLServer",
        })
    }
}

/// H2 database engine.
///
/// Compatibility modes keep H2's capabilities and type names; only the
/// insert-ignore, replace, upsert and grouped-concat templates follow the
/// emulated vendor.
#[derive(Debug, Default)]
pub struct H2Dialect {
    statements: H2Statements,
}

impl H2Dialect {
    /// Creates the dialect in `mode`.
    #[must_use]
    pub const fn new(mode: H2Mode) -> Self {
        Self {
            statements: H2Statements {
                mode,
                delegate: OnceLock::new(),
            },
        }
    }

    /// The compatibility mode.
    #[must_use]
    pub const fn mode(&self) -> H2Mode {
        self.statements.mode
    }
}

impl Dialect for H2Dialect {
    fn name(&self) -> &'static str {
        "h2"
    }

    fn vendor(&self) -> Vendor {
        Vendor::H2
    }

    fn capabilities(&self) -> &Capabilities {
        &CAPABILITIES
    }

    fn type_names(&self) -> &dyn TypeNameProvider {
        &H2TypeNames
    }

    fn statements(&self) -> &dyn StatementProvider {
        &self.statements
    }

    fn extra_keywords(&self) -> &'static [&'static str] {
        &["MINUS", "QUALIFY", "REGEXP", "ROWNUM", "SYSDATE", "SYSTIME", "TODAY", "TOP"]
    }

    fn index_type_clause(&self, tag: &str) -> Option<IndexTypeClause> {
        tag.eq_ignore_ascii_case("HASH")
            .then(|| IndexTypeClause::Prefix(String::from("HASH")))
    }

    fn create_database(&self, _name: &str) -> Result<String> {
        Err(DialectError::unsupported(self.name(), "CREATE DATABASE"))
    }

    fn drop_database(&self, _name: &str) -> Result<String> {
        Err(DialectError::unsupported(self.name(), "DROP DATABASE"))
    }

    fn type_equivalence(&self) -> TypeEquivalence {
        TypeEquivalence::standard()
            .with("CHARACTER VARYING", "VARCHAR")
            .with("CHARACTER LARGE OBJECT", "CLOB")
            .with("BINARY VARYING", "VARBINARY")
            .with("BINARY LARGE OBJECT", "BLOB")
    }
}

/// H2 type names.
#[derive(Debug, Clone, Copy, Default)]
pub struct H2TypeNames;

impl TypeNameProvider for H2TypeNames {
    fn dialect_name(&self) -> &'static str {
        "h2"
    }

    fn text_type(&self, size: TextSize) -> String {
        String::from(match size {
            TextSize::Text => "VARCHAR",
            TextSize::Medium | TextSize::Large => "CLOB",
        })
    }

    fn binary_type(&self, length: Option<u32>) -> Result<String> {
        Ok(length.map_or_else(|| String::from("VARBINARY"), |n| format!("VARBINARY({n})")))
    }

    fn uuid_type(&self) -> String {
        String::from("UUID")
    }

    fn jsonb_type(&self) -> Result<String> {
        Ok(String::from("JSON"))
    }

    fn uuid_as_bytes(&self) -> bool {
        false
    }
}

/// H2 statement templates, delegating vendor-flavoured inserts to the
/// emulated dialect.
#[derive(Default)]
pub struct H2Statements {
    mode: H2Mode,
    delegate: OnceLock<Option<Box<dyn Dialect>>>,
}

impl fmt::Debug for H2Statements {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("H2Statements")
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl H2Statements {
    fn delegate(&self) -> Option<&dyn StatementProvider> {
        self.delegate
            .get_or_init(|| {
                debug!(mode = %self.mode, "creating H2 compatibility delegate");
                self.mode.delegate()
            })
            .as_deref()
            .map(|dialect| dialect.statements())
    }
}

impl StatementProvider for H2Statements {
    fn insert_ignore(&self) -> Option<(&'static str, &'static str)> {
        self.delegate().and_then(|delegate| delegate.insert_ignore())
    }

    fn upsert(&self, upsert: &Upsert<'_>, qb: &mut QueryBuilder<'_>) -> Result<()> {
        match self.delegate() {
            Some(delegate) => delegate.upsert(upsert, qb),
            None => merge_upsert(self, upsert, MergeStyle::STANDARD, UpsertRows::Values, qb),
        }
    }

    fn excluded_column(&self, column: &str, qb: &mut QueryBuilder<'_>) -> Result<()> {
        match self.delegate() {
            Some(delegate) => delegate.excluded_column(column, qb),
            None => {
                qb.push_qualified(Some("S"), column);
                Ok(())
            }
        }
    }

    fn replace(&self, replace: &Replace<'_>, qb: &mut QueryBuilder<'_>) -> Result<()> {
        if let Some(delegate) = self.delegate() {
            return delegate.replace(replace, qb);
        }
        let Some(pk) = &replace.table.primary_key else {
            return Err(DialectError::validation(format!(
                "MERGE ... KEY on '{}' needs a primary key",
                replace.table.name
            )));
        };
        qb.push("MERGE INTO ")
            .push_identifier(&replace.table.name)
            .push(" (")
            .push_identifiers(&replace.columns)
            .push(") KEY (")
            .push_identifiers(&pk.columns)
            .push(") VALUES ");
        render_rows(self, &replace.rows, &[], qb)
    }

    fn group_concat(
        &self,
        expr: &Expr,
        separator: Option<&str>,
        distinct: bool,
        order_by: &[OrderBy],
        qb: &mut QueryBuilder<'_>,
    ) -> Result<()> {
        match self.delegate() {
            Some(delegate) => delegate.group_concat(expr, separator, distinct, order_by, qb),
            None => {
                let sep = qb.dialect().type_names().quote_string(separator.unwrap_or(","));
                qb.push("LISTAGG(");
                if distinct {
                    qb.push("DISTINCT ");
                }
                expr.render(qb)?;
                qb.push(", ").push(&sep).push(")");
                if !order_by.is_empty() {
                    qb.push(" WITHIN GROUP (ORDER BY ");
                    super::statements::render_order_by(order_by, qb)?;
                    qb.push(")");
                }
                Ok(())
            }
        }
    }

    fn random(&self, seed: Option<i64>, qb: &mut QueryBuilder<'_>) -> Result<()> {
        match seed {
            Some(seed) => qb.push(&format!("RAND({seed})")),
            None => qb.push("RAND()"),
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{col, value, Function};
    use crate::schema::{Index, Table};
    use crate::statement::Statement;
    use crate::types::ColumnType;
    use crate::value::ToSqlValue;

    fn users() -> Table {
        let mut t = Table::new("users");
        t.column("id", ColumnType::integer()).unwrap();
        t.column("name", ColumnType::varchar(40).nullable()).unwrap();
        t.set_primary_key(&["id"], None).unwrap();
        t
    }

    #[test]
    fn test_mode_from_url() {
        assert_eq!(H2Mode::from_url("jdbc:h2:mem:test;MODE=MySQL"), H2Mode::MySql);
        assert_eq!(
            H2Mode::from_url("h2:mem:test;DB_CLOSE_DELAY=-1;mode=PostgreSQL"),
            H2Mode::PostgreSql
        );
        assert_eq!(H2Mode::from_url("h2:mem:test"), H2Mode::Regular);
        assert_eq!(H2Mode::from_url("h2:mem:test;MODE=Derby"), H2Mode::Regular);
    }

    #[test]
    fn test_regular_replace_uses_merge_key() {
        let h2 = H2Dialect::new(H2Mode::Regular);
        let t = users();
        let replace = Replace::into(&t)
            .columns(&["id", "name"])
            .unwrap()
            .row(vec![1.to_sql_value(), "ann".to_sql_value()])
            .unwrap();
        assert_eq!(
            replace.to_sql(&h2).unwrap(),
            "MERGE INTO users (id, name) KEY (id) VALUES (1, 'ann')"
        );
    }

    #[test]
    fn test_mysql_mode_delegates_insert_templates() {
        let h2 = H2Dialect::new(H2Mode::MySql);
        let t = users();
        let replace = Replace::into(&t)
            .columns(&["id", "name"])
            .unwrap()
            .row(vec![1.to_sql_value(), "ann".to_sql_value()])
            .unwrap();
        assert_eq!(
            replace.to_sql(&h2).unwrap(),
            "REPLACE INTO users (id, name) VALUES (1, 'ann')"
        );
        let agg = Expr::from(Function::GroupConcat {
            expr: col("name", ColumnType::text()).into(),
            separator: None,
            distinct: false,
            order_by: Vec::new(),
        });
        assert!(agg.to_sql(&h2).unwrap().starts_with("GROUP_CONCAT("));
        // Own capabilities are kept.
        assert_eq!(h2.capabilities().identifier_quote, ('"', '"'));
    }

    #[test]
    fn test_partial_index_is_skipped() {
        let h2 = H2Dialect::new(H2Mode::Regular);
        let mut t = users();
        t.add_index(
            Index::new(&["name"]).filter(col("name", ColumnType::text()).is_not_null()),
        )
        .unwrap();
        assert_eq!(h2.create_index(&t.indices[0]).unwrap(), None);
        t.add_index(Index::new(&["id"]).index_type("HASH")).unwrap();
        assert_eq!(
            h2.create_index(&t.indices[1]).unwrap().unwrap(),
            "CREATE HASH INDEX IF NOT EXISTS users_id ON users (id)"
        );
    }

    #[test]
    fn test_random_and_json() {
        let h2 = H2Dialect::default();
        assert_eq!(
            Expr::from(Function::Random { seed: Some(3) }).to_sql(&h2).unwrap(),
            "RAND(3)"
        );
        let extract = Expr::from(Function::JsonExtract {
            expr: value("{}"),
            path: vec![String::from("a")],
            to_scalar: true,
        });
        assert!(extract.to_sql(&h2).is_err());
    }
}
