//! Persistence seams for the credential lifecycle.
//!
//! The ticket and event catalogs are owned by the wider platform; this
//! service only reads them, plus owns the token, audit, and attendance
//! tables. Everything is reached through traits so the redemption engine
//! and issuer can be exercised against the in-memory store in tests.

pub mod memory;
pub mod postgres;

pub use memory::MemoryGateStore;
pub use postgres::PgGateStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Event, IssuedToken, NewIssuedToken, Ticket};

#[derive(Debug, Error)]
#[error("storage failure: {0}")]
pub struct StoreError(pub String);

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self(err.to_string())
    }
}

#[async_trait]
pub trait TicketStore: Send + Sync {
    async fn get_ticket(&self, id: i64) -> Result<Option<Ticket>, StoreError>;
}

#[async_trait]
pub trait EventStore: Send + Sync {
    async fn get_event(&self, id: i64) -> Result<Option<Event>, StoreError>;
}

#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Persist a freshly minted token. Must complete before the credential
    /// is handed to anyone, so every outstanding credential is backed by a
    /// row the verifier can find.
    async fn create_token(&self, record: NewIssuedToken) -> Result<IssuedToken, StoreError>;

    /// Look up a live token. Expired rows are excluded here, not just at
    /// the embedded-expiry check, so a stale record can never authorize a
    /// redemption even if the payload's own expiry was somehow accepted.
    async fn find_token(&self, token: &str) -> Result<Option<IssuedToken>, StoreError>;

    /// Delete a single token record. Returns whether a row existed.
    async fn delete_token(&self, token: &str) -> Result<bool, StoreError>;

    /// Revoke all outstanding tokens for a ticket. Called on reissue so at
    /// most one live credential exists per ticket.
    async fn revoke_for_ticket(&self, ticket_id: i64) -> Result<u64, StoreError>;

    /// Purge expired token rows. Hygiene only; `find_token` already
    /// excludes them.
    async fn delete_expired(&self) -> Result<u64, StoreError>;
}

/// Everything the redemption transaction needs to write.
#[derive(Debug, Clone)]
pub struct RedemptionRequest {
    pub token: String,
    pub ticket_id: i64,
    pub event_id: i64,
    pub owner_id: i64,
    pub scanner_id: Uuid,
    pub scanned_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum RedeemError {
    /// The conditional status write affected no rows: another scanner won
    /// the race, or the ticket left VALID through some other channel.
    #[error("ticket is no longer in a redeemable state")]
    TicketNoLongerValid,

    /// The token row was gone or expired by the time the transaction ran.
    #[error("token was already consumed or has expired")]
    TokenConsumed,

    #[error(transparent)]
    Storage(#[from] StoreError),
}

#[async_trait]
pub trait RedemptionStore: Send + Sync {
    /// Apply a redemption as one atomic unit: flip the ticket VALID -> USED
    /// with a compare-and-swap write, consume the token, append the scan
    /// audit entry, and upsert the attendance row. All of it commits or
    /// none of it does; a ticket must never end up USED with the audit or
    /// attendance write lost.
    ///
    /// Concurrent scans of the same credential are resolved here by the
    /// underlying store (affected-row counts and the unique attendance
    /// constraint), not by in-process locking, so the guarantee holds when
    /// the verifier is scaled across processes.
    async fn redeem(&self, request: &RedemptionRequest) -> Result<(), RedeemError>;
}

/// Umbrella trait the issuer and verifier are injected with.
pub trait GateStore: TicketStore + EventStore + TokenStore + RedemptionStore {}

impl<T> GateStore for T where T: TicketStore + EventStore + TokenStore + RedemptionStore {}
