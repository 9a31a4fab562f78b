//! Error types for SQLite introspection.

/// Errors raised while reading or changing a live SQLite schema.
#[derive(Debug, thiserror::Error)]
pub enum IntrospectError {
    /// The driver failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A catalog pattern failed to compile.
    #[error("Invalid catalog pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// A statement could not be rendered for SQLite.
    #[error("Rendering error: {0}")]
    Dialect(#[from] oxide_dialect::DialectError),

    /// A statement failed while applying a batch; the batch was rolled back.
    #[error("Statement {index} failed ({statement}): {source}")]
    Apply {
        /// Position of the failing statement.
        index: usize,
        /// Statement text.
        statement: String,
        /// Driver error.
        source: sqlx::Error,
    },
}

/// Result type for introspection.
pub type Result<T> = std::result::Result<T, IntrospectError>;
