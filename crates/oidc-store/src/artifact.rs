//! Stored artifact records.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::clock;
use crate::inspection::TokenInspection;
use crate::key::StorageKey;
use crate::kind::ArtifactKind;

/// Payload field carrying the grant back-reference.
pub const GRANT_ID_FIELD: &str = "grantId";

/// One stored instance of an artifact kind.
///
/// The payload is kept exactly as handed over by the identity provider.
/// `grant_id` is a copy of the payload's `grantId` used for indexing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    /// Opaque identifier, unique within the kind.
    pub id: String,

    /// The artifact kind.
    pub kind: ArtifactKind,

    /// Kind-specific fields.
    pub payload: Map<String, Value>,

    /// Absolute expiry in epoch seconds. `None` never expires via TTL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,

    /// When the artifact was consumed, in epoch seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumed: Option<i64>,

    /// Grant this artifact was issued under.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grant_id: Option<String>,

    /// Decoded JWT segments, when the payload carries them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inspection: Option<TokenInspection>,
}

impl Artifact {
    /// Builds the record written by an upsert at time `now`.
    #[must_use]
    pub fn new(
        kind: ArtifactKind,
        id: impl Into<String>,
        payload: Map<String, Value>,
        now: i64,
        ttl_secs: Option<u64>,
    ) -> Self {
        let grant_id = payload
            .get(GRANT_ID_FIELD)
            .and_then(Value::as_str)
            .filter(|grant| !grant.is_empty())
            .map(str::to_string);
        let inspection = TokenInspection::from_payload(&payload);

        Self {
            id: id.into(),
            kind,
            payload,
            expires_at: clock::expires_at(now, ttl_secs),
            consumed: None,
            grant_id,
            inspection,
        }
    }

    /// Returns the storage key of this artifact.
    #[must_use]
    pub fn storage_key(&self) -> StorageKey {
        StorageKey::new(self.kind, self.id.clone())
    }

    /// Returns `true` if the artifact is no longer visible at `now`.
    #[must_use]
    pub fn is_expired(&self, now: i64) -> bool {
        clock::is_expired(self.expires_at, now)
    }

    /// Returns `true` once the artifact has been consumed.
    #[must_use]
    pub fn is_consumed(&self) -> bool {
        self.consumed.is_some()
    }
}
