//! # oxide-dialect
//!
//! Vendor-specific SQL from a vendor-neutral model.
//!
//! Tables, columns and expression trees are built once; a [`Dialect`]
//! renders them as DDL and DML for PostgreSQL, MySQL, MariaDB, H2, Oracle,
//! SQLite or SQL Server. The crate also compares declared tables with live
//! metadata and emits the DDL that reconciles them.
//!
//! ```rust
//! use oxide_dialect::dialect::{OracleDialect, PostgresDialect};
//! use oxide_dialect::statement::{Select, Statement};
//! use oxide_dialect::schema::{Column, Table};
//! use oxide_dialect::types::ColumnType;
//!
//! let mut users = Table::new("users");
//! users.add(Column::new("id", ColumnType::integer()).auto_increment()).unwrap();
//! let name = users.column("name", ColumnType::varchar(50)).unwrap();
//! users.set_primary_key(&["id"], None).unwrap();
//!
//! let query = Select::new(vec![name.clone().into()])
//!     .from(&users)
//!     .filter(name.eq("ann"));
//! let prepared = query.prepare(&PostgresDialect::new()).unwrap();
//! assert_eq!(prepared.sql, "SELECT name FROM users WHERE name = $1");
//!
//! // Oracle needs a sequence for the auto-increment key.
//! let ddl = users.create_statements(&OracleDialect::new()).unwrap();
//! assert!(ddl[0].starts_with("CREATE SEQUENCE users_id_seq"));
//! ```
//!
//! ## Choosing a dialect
//!
//! Every render entry point takes `&dyn Dialect`. Dialects can be resolved
//! from a connection URL through [`DialectRegistry`] and bound for a unit of
//! work with [`dialect::context`].

pub mod ddl;
pub mod dialect;
pub mod diff;
pub mod error;
pub mod expr;
pub mod render;
pub mod schema;
pub mod statement;
pub mod types;
pub mod value;

pub use ddl::DdlOptions;
pub use dialect::{Capabilities, Dialect, DialectRegistry, Vendor};
pub use diff::{DatabaseSnapshot, DiffWarning, MetadataSource, SchemaDiff};
pub use error::{DialectError, Result};
pub use expr::{col, raw, value, Expr};
pub use render::{PreparedStatement, QueryBuilder};
pub use schema::{Column, Index, Sequence, Table};
pub use statement::Statement;
pub use types::ColumnType;
pub use value::{SqlValue, ToSqlValue};
