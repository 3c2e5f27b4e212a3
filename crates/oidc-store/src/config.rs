//! Backing table configuration.
//!
//! Each recognized kind is stored in its own table. Table names come from the
//! environment, one variable per kind, named by
//! [`ArtifactKind::table_env_var`]:
//!
//! ```text
//! ACCESS_TOKENS_TABLE_NAME=oidc_access_tokens
//! AUTHORIZATION_CODES_TABLE_NAME=oidc_authorization_codes
//! CLIENT_CREDENTIALS_TABLE_NAME=oidc_client_credentials
//! ...
//! ```
//!
//! Resolution happens once at startup; a missing variable is a fatal
//! configuration error.

use std::collections::BTreeMap;

use crate::error::{StoreError, StoreResult};
use crate::kind::ArtifactKind;

/// Table name per artifact kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableConfig {
    tables: BTreeMap<ArtifactKind, String>,
}

impl TableConfig {
    /// Creates an empty configuration. Fill it with [`TableConfig::with_table`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves every table name from the process environment.
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming every missing variable.
    pub fn from_env() -> StoreResult<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Resolves every table name through `lookup`, which maps a variable name
    /// to its value.
    ///
    /// Empty values count as missing.
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming every missing variable.
    pub fn from_lookup<F>(lookup: F) -> StoreResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new();
        for kind in ArtifactKind::ALL {
            if let Some(table) = lookup(&kind.table_env_var()).filter(|t| !t.trim().is_empty()) {
                config.tables.insert(kind, table.trim().to_string());
            }
        }
        config.validate()?;
        Ok(config)
    }

    /// Derives a table name for every kind from `prefix` and the snake-cased
    /// environment variable stem, e.g. `oidc_access_tokens`.
    #[must_use]
    pub fn with_prefix(prefix: &str) -> Self {
        let mut config = Self::new();
        for kind in ArtifactKind::ALL {
            let var = kind.table_env_var();
            let stem = var.trim_end_matches("_TABLE_NAME").to_lowercase();
            config.tables.insert(kind, format!("{prefix}{stem}"));
        }
        config
    }

    /// Sets the table for `kind`, replacing any previous value.
    #[must_use]
    pub fn with_table(mut self, kind: ArtifactKind, table: impl Into<String>) -> Self {
        self.tables.insert(kind, table.into());
        self
    }

    /// Returns the table configured for `kind`.
    #[must_use]
    pub fn table(&self, kind: ArtifactKind) -> Option<&str> {
        self.tables.get(&kind).map(String::as_str)
    }

    /// Iterates over the configured `(kind, table)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (ArtifactKind, &str)> {
        self.tables.iter().map(|(kind, table)| (*kind, table.as_str()))
    }

    /// Checks that every recognized kind has a table.
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming every missing variable.
    pub fn validate(&self) -> StoreResult<()> {
        let missing: Vec<String> = ArtifactKind::ALL
            .iter()
            .filter(|kind| !self.tables.contains_key(*kind))
            .map(ArtifactKind::table_env_var)
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(StoreError::configuration(format!(
                "expected environment variables to be present: {}",
                missing.join(", ")
            )))
        }
    }
}
