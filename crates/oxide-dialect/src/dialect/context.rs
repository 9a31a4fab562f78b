//! Ambient dialect for a unit of work.
//!
//! Every render entry point takes an explicit `&dyn Dialect`. Code that sits
//! between a unit of work and the renderer can instead bind a dialect here:
//! [`scope`] binds it for an async task, [`sync_scope`] for a synchronous
//! closure on the current thread. Scopes nest; the innermost binding wins and
//! the previous one is restored on exit, so one unit of work can render for
//! a second dialect without disturbing the first.

use std::future::Future;
use std::sync::Arc;

use tracing::trace;

use super::Dialect;
use crate::error::{DialectError, Result};
use crate::render::PreparedStatement;
use crate::statement::Statement;

tokio::task_local! {
    static ACTIVE: Arc<dyn Dialect>;
}

/// Runs `future` with `dialect` bound as the active dialect.
pub async fn scope<F: Future>(dialect: Arc<dyn Dialect>, future: F) -> F::Output {
    trace!(dialect = dialect.name(), "entering async dialect scope");
    ACTIVE.scope(dialect, future).await
}

/// Runs `f` with `dialect` bound as the active dialect on this thread.
pub fn sync_scope<R>(dialect: Arc<dyn Dialect>, f: impl FnOnce() -> R) -> R {
    trace!(dialect = dialect.name(), "entering dialect scope");
    ACTIVE.sync_scope(dialect, f)
}

/// The active dialect.
///
/// # Errors
///
/// [`DialectError::NoActiveDialect`] outside any scope.
pub fn current() -> Result<Arc<dyn Dialect>> {
    ACTIVE
        .try_with(Arc::clone)
        .map_err(|_| DialectError::NoActiveDialect)
}

/// Whether a dialect is bound.
#[must_use]
pub fn is_active() -> bool {
    ACTIVE.try_with(|_| ()).is_ok()
}

/// Renders `statement` with inlined literals for the active dialect.
///
/// # Errors
///
/// [`DialectError::NoActiveDialect`] outside any scope, otherwise whatever
/// rendering reports.
pub fn to_sql<S: Statement + ?Sized>(statement: &S) -> Result<String> {
    let dialect = current()?;
    statement.to_sql(dialect.as_ref())
}

/// Renders `statement` with placeholders for the active dialect.
///
/// # Errors
///
/// [`DialectError::NoActiveDialect`] outside any scope, otherwise whatever
/// rendering reports.
pub fn prepare<S: Statement + ?Sized>(statement: &S) -> Result<PreparedStatement> {
    let dialect = current()?;
    statement.prepare(dialect.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{MySqlDialect, PostgresDialect, Vendor};
    use crate::schema::Table;
    use crate::statement::Delete;
    use crate::types::ColumnType;

    fn pg() -> Arc<dyn Dialect> {
        Arc::new(PostgresDialect::new())
    }

    fn mysql() -> Arc<dyn Dialect> {
        Arc::new(MySqlDialect::new())
    }

    #[test]
    fn test_no_active_dialect_outside_scope() {
        assert!(!is_active());
        assert_eq!(current().unwrap_err(), DialectError::NoActiveDialect);
    }

    #[test]
    fn test_nested_sync_scopes_restore() {
        sync_scope(pg(), || {
            assert_eq!(current().unwrap().vendor(), Vendor::PostgreSql);
            sync_scope(mysql(), || {
                assert_eq!(current().unwrap().vendor(), Vendor::MySql);
            });
            assert_eq!(current().unwrap().vendor(), Vendor::PostgreSql);
        });
        assert!(!is_active());
    }

    #[tokio::test]
    async fn test_async_scope_renders_with_bound_dialect() {
        let mut t = Table::new("users");
        t.column("id", ColumnType::integer()).unwrap();
        let delete = Delete::from(&t).filter(t.column_ref("id").unwrap().eq(1));
        let sql = scope(pg(), async { prepare(&delete).unwrap().sql }).await;
        assert_eq!(sql, "DELETE FROM users WHERE id = $1");
        let sql = scope(mysql(), async { to_sql(&delete).unwrap() }).await;
        assert_eq!(sql, "DELETE FROM users WHERE id = 1");
    }

    #[tokio::test]
    async fn test_tasks_do_not_share_bindings() {
        let inner = scope(pg(), async {
            tokio::spawn(async { is_active() }).await.unwrap()
        })
        .await;
        assert!(!inner);
    }
}
