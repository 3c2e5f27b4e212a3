//! JWT segment inspection.
//!
//! Token payloads handed over by the identity provider carry the three
//! base64url segments of a signed JWT as `header`, `payload` and `signature`.
//! Decoding the first two gives operators insight into stored tokens. The
//! decoded copies live next to the payload; the segments themselves are
//! never modified, since any change breaks the signature check the provider
//! runs on every stored token.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

/// Decoded view of a token's JWT segments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenInspection {
    /// Decoded JOSE header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<Value>,
    /// Decoded claims set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claims: Option<Value>,
}

impl TokenInspection {
    /// Decodes the `header` and `payload` segments of `payload`, if present.
    ///
    /// Returns `None` when neither segment is present or decodable. A segment
    /// that fails to decode is skipped; inspection never fails a write.
    #[must_use]
    pub fn from_payload(payload: &Map<String, Value>) -> Option<Self> {
        let header = payload.get("header").and_then(decode_segment);
        let claims = payload.get("payload").and_then(decode_segment);

        if header.is_none() && claims.is_none() {
            return None;
        }

        Some(Self { header, claims })
    }
}

fn decode_segment(value: &Value) -> Option<Value> {
    let segment = value.as_str()?;
    let bytes = match URL_SAFE_NO_PAD.decode(segment.trim_end_matches('=')) {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!(error = %e, "JWT segment is not base64url");
            return None;
        }
    };

    match serde_json::from_slice(&bytes) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            debug!(error = %e, "JWT segment is not JSON");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn encode(value: &Value) -> String {
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(value).unwrap())
    }

    #[test]
    fn test_decodes_header_and_claims() {
        let header = json!({"alg": "RS256", "typ": "JWT"});
        let claims = json!({"sub": "user-1", "exp": 1700000000});
        let payload = json!({
            "grantId": "G1",
            "header": encode(&header),
            "payload": encode(&claims),
            "signature": "c2ln",
        });

        let inspection = TokenInspection::from_payload(payload.as_object().unwrap()).unwrap();

        assert_eq!(inspection.header, Some(header));
        assert_eq!(inspection.claims, Some(claims));
    }

    #[test]
    fn test_padded_segment_is_accepted() {
        let header = json!({"alg": "none"});
        let padded = format!("{}==", encode(&header));
        let payload = json!({ "header": padded });

        let inspection = TokenInspection::from_payload(payload.as_object().unwrap()).unwrap();
        assert_eq!(inspection.header, Some(header));
        assert!(inspection.claims.is_none());
    }

    #[test]
    fn test_garbage_segments_are_ignored() {
        let payload = json!({"header": "%%%", "payload": "bm90LWpzb24"});
        assert!(TokenInspection::from_payload(payload.as_object().unwrap()).is_none());
    }

    #[test]
    fn test_session_payload_has_nothing_to_inspect() {
        let payload = json!({"account": "user-1", "loginTs": 1700000000});
        assert!(TokenInspection::from_payload(payload.as_object().unwrap()).is_none());
    }
}
