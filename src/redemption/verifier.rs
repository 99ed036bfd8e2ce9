use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::credential::{QrPayload, PAYLOAD_TYPE};
use crate::models::{EventSummary, TicketStatus, TicketSummary};
use crate::security::{self, GateSecret};
use crate::store::{
    EventStore, GateStore, RedeemError, RedemptionRequest, RedemptionStore, StoreError,
    TicketStore, TokenStore,
};

/// Why a scan was refused. Every variant is a terminal answer for the
/// operator; nothing here retries on its own.
///
/// `Expired` is deliberately distinct from `InvalidSignature`: an expired
/// but authentic credential means "reissue and rescan", a bad signature
/// means the code was forged or corrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ScanRejection {
    #[error("Payload is not a readable credential")]
    MalformedPayload,

    #[error("Credential type is not recognized")]
    InvalidType,

    #[error("Credential signature is invalid")]
    InvalidSignature,

    #[error("Credential has expired; reissue and rescan")]
    Expired,

    #[error("Token is unknown or already consumed")]
    UnknownOrConsumedToken,

    #[error("Credential was issued for a different event")]
    EventMismatch,

    #[error("Ticket not found")]
    TicketNotFound,

    #[error("Ticket has already been used")]
    TicketAlreadyUsed,

    #[error("Storage failure; redemption state must be reconciled manually before rescanning")]
    StorageFailure,
}

impl ScanRejection {
    /// Stable machine code for the scan client.
    pub fn code(&self) -> &'static str {
        match self {
            ScanRejection::MalformedPayload => "MALFORMED_PAYLOAD",
            ScanRejection::InvalidType => "INVALID_TYPE",
            ScanRejection::InvalidSignature => "INVALID_SIGNATURE",
            ScanRejection::Expired => "EXPIRED",
            ScanRejection::UnknownOrConsumedToken => "UNKNOWN_OR_CONSUMED_TOKEN",
            ScanRejection::EventMismatch => "EVENT_MISMATCH",
            ScanRejection::TicketNotFound => "TICKET_NOT_FOUND",
            ScanRejection::TicketAlreadyUsed => "TICKET_ALREADY_USED",
            ScanRejection::StorageFailure => "STORAGE_FAILURE",
        }
    }
}

/// Display-ready result of an admitted scan.
#[derive(Debug, Clone)]
pub struct Admission {
    pub ticket: TicketSummary,
    pub event: Option<EventSummary>,
}

/// Verifies scanned payloads and drives the atomic redemption.
#[derive(Clone)]
pub struct GateVerifier {
    secret: Arc<GateSecret>,
    store: Arc<dyn GateStore>,
}

impl GateVerifier {
    pub fn new(secret: Arc<GateSecret>, store: Arc<dyn GateStore>) -> Self {
        Self { secret, store }
    }

    /// Evaluate a scanned payload as an ordered gate and, if every check
    /// passes, redeem it in one atomic transaction.
    ///
    /// No state is touched until the transaction runs, so any rejection
    /// leaves the world exactly as it was. The same-token race between
    /// concurrent scanners is settled inside the store's transaction, not
    /// here; losing that race maps back into the rejection taxonomy.
    pub async fn verify_and_redeem(
        &self,
        qr: &str,
        scanner_id: Uuid,
    ) -> Result<Admission, ScanRejection> {
        // 1. Parse.
        let payload: QrPayload =
            serde_json::from_str(qr).map_err(|_| ScanRejection::MalformedPayload)?;

        // 2. Type tag.
        if payload.kind != PAYLOAD_TYPE {
            return Err(ScanRejection::InvalidType);
        }

        // 3. Authenticate before trusting any field.
        if !security::verify(&self.secret, &payload.canonical_bytes(), &payload.signature) {
            return Err(ScanRejection::InvalidSignature);
        }

        // 4. Embedded expiry, judged only by this server's clock.
        let now = Utc::now();
        if now >= payload.expires_at {
            return Err(ScanRejection::Expired);
        }

        // 5. Token lookup; the store already excludes expired rows, so a
        // skewed stored expiry cannot resurrect a dead credential.
        let record = self
            .store
            .find_token(&payload.token)
            .await
            .map_err(log_storage_failure)?
            .ok_or(ScanRejection::UnknownOrConsumedToken)?;

        // 6. Cross-check the payload's event binding against the record.
        if record.event_id != payload.event_id {
            return Err(ScanRejection::EventMismatch);
        }

        // 7. Ticket state.
        let ticket = self
            .store
            .get_ticket(record.ticket_id)
            .await
            .map_err(log_storage_failure)?
            .ok_or(ScanRejection::TicketNotFound)?;

        if ticket.status != TicketStatus::Valid {
            return Err(ScanRejection::TicketAlreadyUsed);
        }

        // 8. The atomic transaction. Races lost here surface as the same
        // deterministic rejections a later rescan would get.
        let request = RedemptionRequest {
            token: record.token.clone(),
            ticket_id: ticket.id,
            event_id: record.event_id,
            owner_id: record.owner_id,
            scanner_id,
            scanned_at: now,
        };

        match self.store.redeem(&request).await {
            Ok(()) => {}
            Err(RedeemError::TicketNoLongerValid) => return Err(ScanRejection::TicketAlreadyUsed),
            Err(RedeemError::TokenConsumed) => return Err(ScanRejection::UnknownOrConsumedToken),
            Err(RedeemError::Storage(e)) => return Err(log_storage_failure(e)),
        }

        tracing::info!(
            ticket_id = ticket.id,
            event_id = record.event_id,
            %scanner_id,
            "Ticket redeemed"
        );

        // The redemption is committed; a lookup failure on the event
        // summary must not turn it into a reported failure.
        let event = match self.store.get_event(record.event_id).await {
            Ok(event) => event.map(|e| EventSummary::from(&e)),
            Err(e) => {
                tracing::warn!(error = %e, event_id = record.event_id, "Event summary lookup failed after commit");
                None
            }
        };

        Ok(Admission {
            ticket: TicketSummary {
                id: ticket.id,
                event_id: ticket.event_id,
                owner_id: ticket.owner_id,
                status: TicketStatus::Used,
            },
            event,
        })
    }

    /// Delete expired token rows. Hygiene only: lookup already excludes
    /// expired records, so correctness never depends on this running.
    pub async fn purge_expired(&self) -> Result<u64, StoreError> {
        let purged = self.store.delete_expired().await?;
        if purged > 0 {
            tracing::info!(purged, "Purged expired tokens");
        }
        Ok(purged)
    }
}

fn log_storage_failure(err: StoreError) -> ScanRejection {
    // Commit status may be unknown from the operator's point of view, so
    // this is terminal: report, reconcile manually, never silently retry.
    tracing::error!(error = %err, "Storage failure during scan verification");
    ScanRejection::StorageFailure
}
