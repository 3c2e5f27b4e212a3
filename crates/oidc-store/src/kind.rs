//! Artifact kinds.
//!
//! The identity provider names every model it persists. Only the names in
//! [`ArtifactKind::ALL`] are backed by a real store; anything else resolves
//! to the rejecting store.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Closed set of artifact kinds the store knows how to persist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ArtifactKind {
    AccessToken,
    AuthorizationCode,
    ClientCredentials,
    RefreshToken,
    Session,
    Client,
    RegistrationAccessToken,
    InitialAccessToken,
}

impl ArtifactKind {
    /// Every recognized kind.
    pub const ALL: [ArtifactKind; 8] = [
        Self::AccessToken,
        Self::AuthorizationCode,
        Self::ClientCredentials,
        Self::RefreshToken,
        Self::Session,
        Self::Client,
        Self::RegistrationAccessToken,
        Self::InitialAccessToken,
    ];

    /// Kinds that can be issued under a grant and are swept by revocation.
    ///
    /// Everything except [`Session`](Self::Session) and
    /// [`Client`](Self::Client).
    pub const REVOCABLE: [ArtifactKind; 6] = [
        Self::AccessToken,
        Self::AuthorizationCode,
        Self::ClientCredentials,
        Self::RefreshToken,
        Self::RegistrationAccessToken,
        Self::InitialAccessToken,
    ];

    /// Returns the model name used by the identity provider.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccessToken => "AccessToken",
            Self::AuthorizationCode => "AuthorizationCode",
            Self::ClientCredentials => "ClientCredentials",
            Self::RefreshToken => "RefreshToken",
            Self::Session => "Session",
            Self::Client => "Client",
            Self::RegistrationAccessToken => "RegistrationAccessToken",
            Self::InitialAccessToken => "InitialAccessToken",
        }
    }

    /// Returns `true` if artifacts of this kind are deleted when their grant
    /// is revoked.
    #[must_use]
    pub fn is_revocable(&self) -> bool {
        Self::REVOCABLE.contains(self)
    }

    /// Returns the environment variable holding this kind's table name.
    ///
    /// The name is pluralized (an `s` is appended unless the name already
    /// ends in `s`), converted to upper snake case and suffixed with
    /// `_TABLE_NAME`: `AccessToken` maps to `ACCESS_TOKENS_TABLE_NAME` and
    /// `ClientCredentials` to `CLIENT_CREDENTIALS_TABLE_NAME`.
    #[must_use]
    pub fn table_env_var(&self) -> String {
        let name = self.as_str();
        let plural = if name.ends_with('s') {
            name.to_string()
        } else {
            format!("{name}s")
        };
        format!("{}_TABLE_NAME", upper_snake_case(&plural))
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtifactKind {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| StoreError::unsupported_kind(s))
    }
}

fn upper_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, ch) in name.chars().enumerate() {
        if ch.is_uppercase() && i > 0 {
            out.push('_');
        }
        out.extend(ch.to_uppercase());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_recognized_kinds() {
        for kind in ArtifactKind::ALL {
            assert_eq!(kind.as_str().parse::<ArtifactKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_parse_unknown_kind() {
        let err = "DeviceCode".parse::<ArtifactKind>().unwrap_err();
        assert!(err.is_unsupported_kind());
        assert!("accesstoken".parse::<ArtifactKind>().is_err());
    }

    #[test]
    fn test_table_env_var_convention() {
        assert_eq!(
            ArtifactKind::AccessToken.table_env_var(),
            "ACCESS_TOKENS_TABLE_NAME"
        );
        assert_eq!(
            ArtifactKind::AuthorizationCode.table_env_var(),
            "AUTHORIZATION_CODES_TABLE_NAME"
        );
        assert_eq!(
            ArtifactKind::ClientCredentials.table_env_var(),
            "CLIENT_CREDENTIALS_TABLE_NAME"
        );
        assert_eq!(ArtifactKind::Session.table_env_var(), "SESSIONS_TABLE_NAME");
        assert_eq!(
            ArtifactKind::RegistrationAccessToken.table_env_var(),
            "REGISTRATION_ACCESS_TOKENS_TABLE_NAME"
        );
    }

    #[test]
    fn test_revocable_kinds() {
        assert!(ArtifactKind::RefreshToken.is_revocable());
        assert!(ArtifactKind::ClientCredentials.is_revocable());
        assert!(ArtifactKind::RegistrationAccessToken.is_revocable());
        assert!(ArtifactKind::InitialAccessToken.is_revocable());
        assert!(!ArtifactKind::Session.is_revocable());
        assert!(!ArtifactKind::Client.is_revocable());
    }
}
