//! Vendor-token to dialect lookup.
//!
//! A connection URL such as `jdbc:postgresql://host/db` or
//! `h2:mem:test;MODE=MySQL` is reduced to its vendor token (`postgresql`,
//! `h2`) and handed, together with the full URL, to the registered factory.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use tracing::debug;

use super::{
    Dialect, H2Dialect, H2Mode, MySqlDialect, OracleDialect, PostgresDialect, SqliteDialect,
    SqlServerDialect,
};
use crate::error::{DialectError, Result};

/// Builds a dialect from the full connection URL.
pub type DialectFactory = Arc<dyn Fn(&str) -> Arc<dyn Dialect> + Send + Sync>;

static DEFAULT_REGISTRY: OnceLock<DialectRegistry> = OnceLock::new();

/// Immutable map from vendor tokens to dialect factories.
#[derive(Clone)]
pub struct DialectRegistry {
    factories: BTreeMap<String, DialectFactory>,
}

impl fmt::Debug for DialectRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DialectRegistry")
            .field("vendors", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl DialectRegistry {
    /// Starts an empty registry.
    #[must_use]
    pub fn builder() -> DialectRegistryBuilder {
        DialectRegistryBuilder::default()
    }

    /// The shared registry holding every built-in dialect.
    pub fn global() -> &'static Self {
        DEFAULT_REGISTRY.get_or_init(|| DialectRegistryBuilder::with_builtins().build())
    }

    /// Vendor token of a connection URL: the scheme, lowercased, with any
    /// `jdbc:` prefix removed.
    #[must_use]
    pub fn vendor_token(url: &str) -> String {
        let trimmed = url.trim();
        let rest = trimmed
            .get(..5)
            .filter(|prefix| prefix.eq_ignore_ascii_case("jdbc:"))
            .map_or(trimmed, |_| &trimmed[5..]);
        let end = rest.find([':', ';', '/']).unwrap_or(rest.len());
        rest[..end].to_ascii_lowercase()
    }

    /// Resolves the dialect for a connection URL.
    ///
    /// # Errors
    ///
    /// [`DialectError::UnknownVendor`] when no factory matches the token.
    pub fn resolve(&self, url: &str) -> Result<Arc<dyn Dialect>> {
        let token = Self::vendor_token(url);
        let factory = self
            .factories
            .get(&token)
            .ok_or_else(|| DialectError::UnknownVendor(token.clone()))?;
        let dialect = factory(url);
        debug!(vendor = %token, dialect = dialect.name(), "resolved dialect");
        Ok(dialect)
    }

    /// Registered vendor tokens, sorted.
    pub fn vendors(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Whether a token is registered.
    #[must_use]
    pub fn contains(&self, token: &str) -> bool {
        self.factories.contains_key(&token.to_ascii_lowercase())
    }
}

/// Collects factories before the registry is frozen.
#[derive(Default)]
pub struct DialectRegistryBuilder {
    factories: BTreeMap<String, DialectFactory>,
}

impl DialectRegistryBuilder {
    /// A builder pre-filled with every built-in dialect and its aliases.
    #[must_use]
    pub fn with_builtins() -> Self {
        Self::default()
            .register_all(&["postgresql", "postgres", "pgsql", "pg"], |_| {
                Arc::new(PostgresDialect::new())
            })
            .register_all(&["mysql"], |_| Arc::new(MySqlDialect::new()))
            .register_all(&["mariadb"], |_| Arc::new(MySqlDialect::mariadb()))
            .register_all(&["h2"], |url| Arc::new(H2Dialect::new(H2Mode::from_url(url))))
            .register_all(&["oracle"], |_| Arc::new(OracleDialect::new()))
            .register_all(&["sqlite", "sqlite3"], |_| Arc::new(SqliteDialect::new()))
            .register_all(&["sqlserver", "mssql", "jtds"], |_| {
                Arc::new(SqlServerDialect::new())
            })
    }

    /// Registers `factory` under `token`, replacing an earlier registration.
    #[must_use]
    pub fn register<F>(mut self, token: &str, factory: F) -> Self
    where
        F: Fn(&str) -> Arc<dyn Dialect> + Send + Sync + 'static,
    {
        self.factories
            .insert(token.to_ascii_lowercase(), Arc::new(factory));
        self
    }

    /// Registers one factory under several tokens.
    #[must_use]
    pub fn register_all<F>(mut self, tokens: &[&str], factory: F) -> Self
    where
        F: Fn(&str) -> Arc<dyn Dialect> + Send + Sync + 'static,
    {
        let factory: DialectFactory = Arc::new(factory);
        for token in tokens {
            self.factories
                .insert(token.to_ascii_lowercase(), Arc::clone(&factory));
        }
        self
    }

    /// Freezes the registry.
    #[must_use]
    pub fn build(self) -> DialectRegistry {
        DialectRegistry {
            factories: self.factories,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Vendor;

    #[test]
    fn test_vendor_token() {
        assert_eq!(DialectRegistry::vendor_token("jdbc:postgresql://db/app"), "postgresql");
        assert_eq!(DialectRegistry::vendor_token("JDBC:MySQL://db/app"), "mysql");
        assert_eq!(DialectRegistry::vendor_token("sqlite:app.db"), "sqlite");
        assert_eq!(DialectRegistry::vendor_token("oracle:thin:@host:1521:xe"), "oracle");
        assert_eq!(DialectRegistry::vendor_token("h2:mem:test;MODE=MySQL"), "h2");
    }

    #[test]
    fn test_resolve_builtins_and_aliases() {
        let registry = DialectRegistry::global();
        let cases = [
            ("postgres://localhost/app", Vendor::PostgreSql),
            ("pgsql://localhost/app", Vendor::PostgreSql),
            ("jdbc:mariadb://localhost/app", Vendor::MariaDb),
            ("mssql://localhost", Vendor::SqlServer),
            ("sqlite::memory:", Vendor::Sqlite),
            ("oracle:thin:@localhost:1521:xe", Vendor::Oracle),
        ];
        for (url, vendor) in cases {
            assert_eq!(registry.resolve(url).unwrap().vendor(), vendor, "{url}");
        }
    }

    #[test]
    fn test_h2_factory_reads_mode() {
        let dialect = DialectRegistry::global()
            .resolve("jdbc:h2:mem:test;MODE=MySQL")
            .unwrap();
        assert_eq!(dialect.vendor(), Vendor::H2);
        assert_eq!(
            dialect.statements().insert_ignore(),
            Some(("INSERT IGNORE INTO", ""))
        );
    }

    #[test]
    fn test_unknown_vendor() {
        let err = DialectRegistry::global().resolve("db2://host").unwrap_err();
        assert_eq!(err, DialectError::UnknownVendor(String::from("db2")));
    }

    #[test]
    fn test_custom_registry() {
        let registry = DialectRegistry::builder()
            .register("warehouse", |_| Arc::new(PostgresDialect::new()))
            .build();
        assert!(registry.contains("WAREHOUSE"));
        assert!(!registry.contains("mysql"));
        assert_eq!(registry.vendors().collect::<Vec<_>>(), vec!["warehouse"]);
        assert_eq!(
            registry.resolve("warehouse://x").unwrap().name(),
            "postgresql"
        );
    }
}
