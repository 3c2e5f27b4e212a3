//! Storage error types.
//!
//! This module defines every error the artifact store, the grant index and
//! the revocation coordinator can report. Not-found on `find` is not an error:
//! lookups of missing or expired artifacts resolve to `Ok(None)`.

use std::fmt;

/// Errors that can occur while storing, consuming, destroying or revoking
/// artifacts.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A required backing resource is not configured.
    ///
    /// Raised once, at construction time, and must abort initialization.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the missing or invalid setting.
        message: String,
    },

    /// A mutating call was made through the rejecting store of an
    /// unrecognized artifact kind.
    #[error("Unsupported artifact kind: {kind}")]
    UnsupportedKind {
        /// The kind name that was requested.
        kind: String,
    },

    /// The artifact does not exist or has already expired.
    #[error("Artifact not found: {kind}/{id}")]
    NotFound {
        /// The artifact kind.
        kind: String,
        /// The artifact identifier.
        id: String,
    },

    /// The backing store reported a failure.
    #[error("Backend error: {message}")]
    Backend {
        /// Description of the backend failure.
        message: String,
    },

    /// An artifact record could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Some deletes of a grant revocation failed.
    ///
    /// The successful deletes are not rolled back and nothing is retried.
    #[error("Partial revocation of grant {grant_id}: {failed} of {attempted} deletes failed")]
    PartialRevocation {
        /// The grant being revoked.
        grant_id: String,
        /// Number of deletes that failed.
        failed: usize,
        /// Number of deletes that were issued.
        attempted: usize,
        /// Storage keys whose delete failed.
        failed_keys: Vec<String>,
    },
}

impl StoreError {
    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new `UnsupportedKind` error.
    #[must_use]
    pub fn unsupported_kind(kind: impl Into<String>) -> Self {
        Self::UnsupportedKind { kind: kind.into() }
    }

    /// Creates a new `NotFound` error.
    #[must_use]
    pub fn not_found(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            id: id.into(),
        }
    }

    /// Creates a new `Backend` error.
    #[must_use]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a configuration error.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }

    /// Returns `true` if this is an unsupported kind error.
    #[must_use]
    pub fn is_unsupported_kind(&self) -> bool {
        matches!(self, Self::UnsupportedKind { .. })
    }

    /// Returns `true` if this is a not found error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` if this is a backend error.
    #[must_use]
    pub fn is_backend(&self) -> bool {
        matches!(self, Self::Backend { .. })
    }

    /// Returns `true` if this is a partial revocation error.
    #[must_use]
    pub fn is_partial_revocation(&self) -> bool {
        matches!(self, Self::PartialRevocation { .. })
    }

    /// Returns the error category for logging purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::UnsupportedKind { .. } | Self::NotFound { .. } => ErrorCategory::Caller,
            Self::Backend { .. } | Self::PartialRevocation { .. } => ErrorCategory::Backend,
            Self::Serialization(_) => ErrorCategory::Data,
        }
    }
}

/// Coarse classification of storage errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Fatal startup misconfiguration.
    Configuration,
    /// The caller asked for something the store cannot do.
    Caller,
    /// Transient failure of the backing store.
    Backend,
    /// Malformed stored data.
    Data,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "configuration"),
            Self::Caller => write!(f, "caller"),
            Self::Backend => write!(f, "backend"),
            Self::Data => write!(f, "data"),
        }
    }
}

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;
