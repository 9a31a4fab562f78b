//! Error types for rendering, DDL generation and schema diffing.

/// Errors that can occur while turning the logical model into SQL.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DialectError {
    /// The active dialect has no correct rendering for the request.
    #[error("{feature} is not supported by {dialect}")]
    Unsupported {
        /// Name of the dialect that rejected the request.
        dialect: String,
        /// Human-readable description of the missing capability.
        feature: String,
    },

    /// The in-memory model is self-contradictory for the requested operation.
    #[error("Invalid model: {0}")]
    Validation(String),

    /// The metadata source has nothing for a table it was asked about.
    #[error("No metadata available for table '{table}'")]
    MissingMetadata {
        /// Table name that could not be resolved.
        table: String,
    },

    /// Nothing is bound in the ambient dialect context.
    #[error("No dialect is active in the current unit of work")]
    NoActiveDialect,

    /// The registry has no factory for a vendor token.
    #[error("No dialect registered for vendor '{0}'")]
    UnknownVendor(String),

    /// A value does not fit the column type it is rendered through.
    #[error("Cannot convert {found} to {expected}")]
    InvalidValue {
        /// What the column type expected.
        expected: String,
        /// What was supplied.
        found: String,
    },
}

impl DialectError {
    /// Builds an [`DialectError::Unsupported`] for the given dialect.
    pub fn unsupported(dialect: &str, feature: impl Into<String>) -> Self {
        Self::Unsupported {
            dialect: dialect.to_string(),
            feature: feature.into(),
        }
    }

    /// Builds a [`DialectError::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Builds a [`DialectError::InvalidValue`].
    pub fn invalid_value(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::InvalidValue {
            expected: expected.into(),
            found: found.into(),
        }
    }
}

/// Result type for dialect operations.
pub type Result<T> = std::result::Result<T, DialectError>;
