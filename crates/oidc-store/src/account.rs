//! Account lookup.
//!
//! The identity provider resolves accounts by id only when it has to release
//! claims. Claims are released per scope:
//!
//! | Scope    | Claims                    |
//! |----------|---------------------------|
//! | `openid` | `sub`                     |
//! | `email`  | `email`, `email_verified` |

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::StoreResult;

/// Claims released for each supported scope.
pub const SCOPE_CLAIMS: &[(&str, &[&str])] = &[
    ("openid", &["sub"]),
    ("email", &["email", "email_verified"]),
];

/// An end-user account known to the identity provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Stable account identifier, released as `sub`.
    pub account_id: String,
    /// Every claim held for the account.
    #[serde(default)]
    pub claims: Map<String, Value>,
}

impl Account {
    /// Creates an account without claims.
    #[must_use]
    pub fn new(account_id: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            claims: Map::new(),
        }
    }

    /// Adds a claim.
    #[must_use]
    pub fn with_claim(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.claims.insert(name.into(), value.into());
        self
    }

    /// Returns the claims released for `scopes`.
    ///
    /// `sub` is always the account id. Unknown scopes release nothing.
    #[must_use]
    pub fn claims_for(&self, scopes: &[&str]) -> Map<String, Value> {
        let mut released = Map::new();

        for (scope, names) in SCOPE_CLAIMS {
            if !scopes.contains(scope) {
                continue;
            }
            for name in *names {
                let value = if *name == "sub" {
                    Some(Value::String(self.account_id.clone()))
                } else {
                    self.claims.get(*name).cloned()
                };
                if let Some(value) = value {
                    released.insert((*name).to_string(), value);
                }
            }
        }

        released
    }
}

/// Resolves accounts by id.
#[async_trait]
pub trait AccountLookup: Send + Sync {
    /// Finds an account by its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup backend fails.
    async fn find_by_id(&self, account_id: &str) -> StoreResult<Option<Account>>;
}

/// Fixed, in-memory account list.
#[derive(Debug, Clone, Default)]
pub struct StaticAccounts {
    accounts: HashMap<String, Account>,
}

impl StaticAccounts {
    /// Creates an empty account list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `account`, replacing any account with the same id.
    #[must_use]
    pub fn with_account(mut self, account: Account) -> Self {
        self.accounts.insert(account.account_id.clone(), account);
        self
    }

    /// Number of known accounts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Returns `true` if no accounts are known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

#[async_trait]
impl AccountLookup for StaticAccounts {
    async fn find_by_id(&self, account_id: &str) -> StoreResult<Option<Account>> {
        Ok(self.accounts.get(account_id).cloned())
    }
}
