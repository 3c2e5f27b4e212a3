//! Error types for the PostgreSQL artifact backend.

use oidc_store::StoreError;
use sqlx_core::error::Error as SqlxError;

/// SQLSTATE raised when a statement references a table that does not exist.
const UNDEFINED_TABLE: &str = "42P01";

/// Errors specific to the PostgreSQL artifact backend.
#[derive(Debug, thiserror::Error)]
pub enum PostgresError {
    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] SqlxError),

    /// A table name is not a plain SQL identifier.
    #[error("Invalid table name: {name}")]
    InvalidIdentifier { name: String },

    /// A stored record could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PostgresError {
    /// Creates a new invalid identifier error.
    #[must_use]
    pub fn invalid_identifier(name: impl Into<String>) -> Self {
        Self::InvalidIdentifier { name: name.into() }
    }

    /// Returns `true` if a configured artifact or index table does not exist.
    #[must_use]
    pub fn is_missing_table(&self) -> bool {
        match self {
            Self::Database(SqlxError::Database(db)) => db.code().as_deref() == Some(UNDEFINED_TABLE),
            _ => false,
        }
    }
}

impl From<PostgresError> for StoreError {
    fn from(err: PostgresError) -> Self {
        if err.is_missing_table() {
            return StoreError::configuration(format!(
                "{err}; create the tables with `oidc-store schema`"
            ));
        }
        match err {
            PostgresError::Database(e) => StoreError::backend(e.to_string()),
            PostgresError::InvalidIdentifier { name } => {
                StoreError::configuration(format!("invalid table name: {name}"))
            }
            PostgresError::Serialization(e) => StoreError::Serialization(e),
        }
    }
}

/// Result type alias for PostgreSQL operations.
pub type Result<T> = std::result::Result<T, PostgresError>;
