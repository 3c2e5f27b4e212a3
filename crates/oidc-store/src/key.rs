//! Key codec.
//!
//! Storage keys are `"{Kind}:{id}"` and grant index keys are
//! `"grant:{grantId}"`. Identifiers are opaque and may themselves contain
//! `:`; decoding splits on the first separator only.

use std::fmt;

use crate::kind::ArtifactKind;

const SEPARATOR: char = ':';
const GRANT_PREFIX: &str = "grant";

/// Key of one artifact row, unique across kinds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorageKey {
    kind: ArtifactKind,
    id: String,
}

impl StorageKey {
    /// Builds the key of artifact `id` of `kind`.
    #[must_use]
    pub fn new(kind: ArtifactKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    /// Decodes a key produced by [`StorageKey::encode`].
    ///
    /// Returns `None` for keys whose kind prefix is not recognized.
    #[must_use]
    pub fn decode(raw: &str) -> Option<Self> {
        let (kind, id) = raw.split_once(SEPARATOR)?;
        let kind = kind.parse::<ArtifactKind>().ok()?;
        Some(Self::new(kind, id))
    }

    /// Returns the encoded `"{Kind}:{id}"` form.
    #[must_use]
    pub fn encode(&self) -> String {
        format!("{}{SEPARATOR}{}", self.kind, self.id)
    }

    #[must_use]
    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{SEPARATOR}{}", self.kind, self.id)
    }
}

/// Returns the grant index key for `grant_id`.
#[must_use]
pub fn grant_key(grant_id: &str) -> String {
    format!("{GRANT_PREFIX}{SEPARATOR}{grant_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_is_kind_prefixed() {
        let key = StorageKey::new(ArtifactKind::AccessToken, "abc");
        assert_eq!(key.encode(), "AccessToken:abc");
        assert_eq!(key.to_string(), key.encode());
    }

    #[test]
    fn test_decode_keeps_separators_in_id() {
        let key = StorageKey::decode("RefreshToken:a:b:c").unwrap();
        assert_eq!(key.kind(), ArtifactKind::RefreshToken);
        assert_eq!(key.id(), "a:b:c");
    }

    #[test]
    fn test_decode_rejects_unknown_kind() {
        assert!(StorageKey::decode("DeviceCode:abc").is_none());
        assert!(StorageKey::decode("no-separator").is_none());
    }

    #[test]
    fn test_same_id_differs_across_kinds() {
        let a = StorageKey::new(ArtifactKind::AccessToken, "x");
        let b = StorageKey::new(ArtifactKind::RefreshToken, "x");
        assert_ne!(a.encode(), b.encode());
    }

    #[test]
    fn test_grant_key() {
        assert_eq!(grant_key("G1"), "grant:G1");
    }
}
