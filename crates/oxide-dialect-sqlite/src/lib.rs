//! # oxide-dialect-sqlite
//!
//! Reads the live schema of a SQLite database into a
//! [`DatabaseSnapshot`](oxide_dialect::DatabaseSnapshot), the metadata source
//! consumed by [`SchemaDiff`](oxide_dialect::SchemaDiff).
//!
//! ```ignore
//! use oxide_dialect::dialect::SqliteDialect;
//! use oxide_dialect::SchemaDiff;
//! use oxide_dialect_sqlite::SqliteIntrospector;
//!
//! let introspector = SqliteIntrospector::new(pool)?;
//! let snapshot = introspector.snapshot().await?;
//! let diff = SchemaDiff::compute(&tables, &snapshot, &SqliteDialect::new())?;
//! introspector.apply(&diff.statements).await?;
//! ```

mod error;
mod introspect;

pub use error::{IntrospectError, Result};
pub use introspect::SqliteIntrospector;
