use std::sync::Arc;

use chrono::Duration;
use thiserror::Error;

use crate::models::{NewIssuedToken, TicketStatus};
use crate::security::{self, GateSecret};
use crate::store::{GateStore, StoreError, TicketStore, TokenStore};

use super::payload::{QrPayload, PAYLOAD_TYPE};
use super::qr;

#[derive(Debug, Error)]
pub enum IssueError {
    #[error("ticket {0} not found")]
    TicketNotFound(i64),

    #[error("ticket {id} is not issuable in status {status}")]
    NotIssuable { id: i64, status: TicketStatus },

    #[error("failed to encode credential: {0}")]
    Encoding(String),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// A minted credential: the signed payload and its rendered QR image.
#[derive(Debug, Clone)]
pub struct IssuedCredential {
    pub payload: QrPayload,
    pub qr_svg: String,
}

/// Mints signed, time-bound, single-use entry credentials.
#[derive(Clone)]
pub struct CredentialIssuer {
    secret: Arc<GateSecret>,
    store: Arc<dyn GateStore>,
}

impl CredentialIssuer {
    pub fn new(secret: Arc<GateSecret>, store: Arc<dyn GateStore>) -> Self {
        Self { secret, store }
    }

    /// Issue a credential for a VALID ticket.
    ///
    /// Ordering matters: the token record is persisted before the payload
    /// is built or returned, so every credential that leaves this function
    /// is already independently verifiable. Reissuing revokes any earlier
    /// live tokens for the same ticket first, keeping the redemption
    /// surface at one outstanding credential per ticket.
    pub async fn issue(
        &self,
        ticket_id: i64,
        window: Duration,
    ) -> Result<IssuedCredential, IssueError> {
        let ticket = self
            .store
            .get_ticket(ticket_id)
            .await?
            .ok_or(IssueError::TicketNotFound(ticket_id))?;

        if ticket.status != TicketStatus::Valid {
            return Err(IssueError::NotIssuable {
                id: ticket.id,
                status: ticket.status,
            });
        }

        let token = security::generate_token();
        let expires_at = security::expiry_after(window);

        let revoked = self.store.revoke_for_ticket(ticket.id).await?;
        if revoked > 0 {
            tracing::info!(
                ticket_id = ticket.id,
                revoked,
                "Revoked outstanding tokens on reissue"
            );
        }

        self.store
            .create_token(NewIssuedToken {
                token: token.clone(),
                ticket_id: ticket.id,
                event_id: ticket.event_id,
                owner_id: ticket.owner_id,
                expires_at,
            })
            .await?;

        let mut payload = QrPayload {
            kind: PAYLOAD_TYPE.to_string(),
            token,
            event_id: ticket.event_id,
            expires_at,
            signature: String::new(),
        };
        payload.signature = security::sign(&self.secret, &payload.canonical_bytes());

        let json = serde_json::to_string(&payload)
            .map_err(|e| IssueError::Encoding(e.to_string()))?;
        let qr_svg = qr::render_svg(&json).map_err(|e| IssueError::Encoding(e.to_string()))?;

        tracing::info!(
            ticket_id = ticket.id,
            event_id = ticket.event_id,
            expires_at = %payload.expires_at,
            "Issued entry credential"
        );

        Ok(IssuedCredential { payload, qr_svg })
    }
}
