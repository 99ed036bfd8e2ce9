//! PostgreSQL-backed stores.
//!
//! Redemption relies on the database for its race guarantees: the status
//! flip is a conditional UPDATE checked by `rows_affected`, the token
//! delete re-checks expiry, and attendance rides on `UNIQUE (ticket_id)`.
//! No advisory locks, no read-then-write.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use crate::models::{Event, IssuedToken, NewIssuedToken, Ticket, TicketStatus};

use super::{
    EventStore, RedeemError, RedemptionRequest, RedemptionStore, StoreError, TicketStore,
    TokenStore,
};

#[derive(Clone)]
pub struct PgGateStore {
    pool: PgPool,
}

impl PgGateStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct TicketRow {
    id: i64,
    owner_id: i64,
    event_id: i64,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TicketRow {
    fn into_ticket(self) -> Result<Ticket, StoreError> {
        let status = TicketStatus::parse(&self.status)
            .ok_or_else(|| StoreError(format!("unknown ticket status '{}'", self.status)))?;
        Ok(Ticket {
            id: self.id,
            owner_id: self.owner_id,
            event_id: self.event_id,
            status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(FromRow)]
struct TokenRow {
    token: String,
    ticket_id: i64,
    event_id: i64,
    owner_id: i64,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl From<TokenRow> for IssuedToken {
    fn from(row: TokenRow) -> Self {
        Self {
            token: row.token,
            ticket_id: row.ticket_id,
            event_id: row.event_id,
            owner_id: row.owner_id,
            created_at: row.created_at,
            expires_at: row.expires_at,
        }
    }
}

#[async_trait]
impl TicketStore for PgGateStore {
    async fn get_ticket(&self, id: i64) -> Result<Option<Ticket>, StoreError> {
        let row = sqlx::query_as::<_, TicketRow>(
            "SELECT id, owner_id, event_id, status, created_at, updated_at \
             FROM tickets WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TicketRow::into_ticket).transpose()
    }
}

#[async_trait]
impl EventStore for PgGateStore {
    async fn get_event(&self, id: i64) -> Result<Option<Event>, StoreError> {
        let event = sqlx::query_as::<_, Event>(
            "SELECT id, title, location, starts_at FROM events WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(event)
    }
}

#[async_trait]
impl TokenStore for PgGateStore {
    async fn create_token(&self, record: NewIssuedToken) -> Result<IssuedToken, StoreError> {
        let row = sqlx::query_as::<_, TokenRow>(
            "INSERT INTO issued_tokens (token, ticket_id, event_id, owner_id, expires_at) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING token, ticket_id, event_id, owner_id, created_at, expires_at",
        )
        .bind(&record.token)
        .bind(record.ticket_id)
        .bind(record.event_id)
        .bind(record.owner_id)
        .bind(record.expires_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn find_token(&self, token: &str) -> Result<Option<IssuedToken>, StoreError> {
        let row = sqlx::query_as::<_, TokenRow>(
            "SELECT token, ticket_id, event_id, owner_id, created_at, expires_at \
             FROM issued_tokens WHERE token = $1 AND expires_at > NOW()",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(IssuedToken::from))
    }

    async fn delete_token(&self, token: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM issued_tokens WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn revoke_for_ticket(&self, ticket_id: i64) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM issued_tokens WHERE ticket_id = $1")
            .bind(ticket_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn delete_expired(&self) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM issued_tokens WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl RedemptionStore for PgGateStore {
    async fn redeem(&self, request: &RedemptionRequest) -> Result<(), RedeemError> {
        let mut tx = self.pool.begin().await.map_err(StoreError::from)?;

        // Compare-and-swap status flip. A concurrent redemption of the same
        // ticket blocks on the row lock and then sees 0 affected rows.
        let updated = sqlx::query(
            "UPDATE tickets SET status = $1, updated_at = NOW() \
             WHERE id = $2 AND status = $3",
        )
        .bind(TicketStatus::Used.as_str())
        .bind(request.ticket_id)
        .bind(TicketStatus::Valid.as_str())
        .execute(&mut *tx)
        .await
        .map_err(StoreError::from)?;

        if updated.rows_affected() != 1 {
            tx.rollback().await.map_err(StoreError::from)?;
            return Err(RedeemError::TicketNoLongerValid);
        }

        // Consume the token; the expiry guard re-checks against the
        // database clock inside the transaction.
        let deleted = sqlx::query(
            "DELETE FROM issued_tokens WHERE token = $1 AND expires_at > NOW()",
        )
        .bind(&request.token)
        .execute(&mut *tx)
        .await
        .map_err(StoreError::from)?;

        if deleted.rows_affected() != 1 {
            tx.rollback().await.map_err(StoreError::from)?;
            return Err(RedeemError::TokenConsumed);
        }

        sqlx::query(
            "INSERT INTO scan_audit (ticket_id, scanner_id, scanned_at) VALUES ($1, $2, $3)",
        )
        .bind(request.ticket_id)
        .bind(request.scanner_id)
        .bind(request.scanned_at)
        .execute(&mut *tx)
        .await
        .map_err(StoreError::from)?;

        sqlx::query(
            "INSERT INTO event_attendance (event_id, user_id, ticket_id, checked_in_at) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (ticket_id) DO NOTHING",
        )
        .bind(request.event_id)
        .bind(request.owner_id)
        .bind(request.ticket_id)
        .bind(request.scanned_at)
        .execute(&mut *tx)
        .await
        .map_err(StoreError::from)?;

        tx.commit().await.map_err(StoreError::from)?;
        Ok(())
    }
}
