use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A credential token persisted at issuance. The token store is the sole
/// source of truth for whether a credential is still redeemable: a record
/// that has been deleted (consumed or revoked) or has passed `expires_at`
/// must never again authorize a redemption.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedToken {
    pub token: String,
    pub ticket_id: i64,
    pub event_id: i64,
    pub owner_id: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Fields supplied when persisting a freshly minted token.
#[derive(Debug, Clone)]
pub struct NewIssuedToken {
    pub token: String,
    pub ticket_id: i64,
    pub event_id: i64,
    pub owner_id: i64,
    pub expires_at: DateTime<Utc>,
}
