use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Type tag every credential carries; anything else is rejected before the
/// signature is even looked at.
pub const PAYLOAD_TYPE: &str = "secure-ticket";

/// The QR wire payload. Ephemeral: rendered into an image at issuance,
/// decoded back by the scan client, never persisted.
///
/// ```json
/// { "type": "secure-ticket", "token": "...", "eventId": 7,
///   "expiresAt": "2026-08-24T10:00:00Z", "signature": "<hex>" }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrPayload {
    #[serde(rename = "type")]
    pub kind: String,
    pub token: String,
    pub event_id: i64,
    pub expires_at: DateTime<Utc>,
    pub signature: String,
}

impl QrPayload {
    /// Canonical byte form the signature covers: every field except the
    /// signature itself, joined with `|`, expiry at second precision in
    /// UTC. Changing any signed field changes these bytes, so re-signing
    /// is mandatory after any edit.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        format!(
            "{}|{}|{}|{}",
            self.kind,
            self.token,
            self.event_id,
            self.expires_at.to_rfc3339_opts(SecondsFormat::Secs, true)
        )
        .into_bytes()
    }
}
