//! # oxide-ddl
//!
//! Library half of the `oxide-ddl` command: loading JSON schema files and
//! rendering create, drop and migration scripts for a dialect.

pub mod commands;
pub mod schema;

pub use schema::SchemaFile;
