//! In-memory store, used by the test suite and for local demos without a
//! database. One async mutex guards all tables, which makes `redeem` a
//! single critical section; the Postgres store gets the same atomicity
//! from its transaction instead.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::models::{
    Event, EventAttendance, IssuedToken, NewIssuedToken, ScanAuditRecord, Ticket, TicketStatus,
};

use super::{
    EventStore, RedeemError, RedemptionRequest, RedemptionStore, StoreError, TicketStore,
    TokenStore,
};

#[derive(Default)]
struct Tables {
    tickets: HashMap<i64, Ticket>,
    events: HashMap<i64, Event>,
    tokens: HashMap<String, IssuedToken>,
    scan_audit: Vec<ScanAuditRecord>,
    attendance: HashMap<i64, EventAttendance>,
}

#[derive(Default)]
pub struct MemoryGateStore {
    tables: Mutex<Tables>,
}

impl MemoryGateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed_event(&self, event: Event) {
        self.tables.lock().await.events.insert(event.id, event);
    }

    pub async fn seed_ticket(&self, ticket: Ticket) {
        self.tables.lock().await.tickets.insert(ticket.id, ticket);
    }

    pub async fn scan_audit(&self) -> Vec<ScanAuditRecord> {
        self.tables.lock().await.scan_audit.clone()
    }

    pub async fn attendance(&self) -> Vec<EventAttendance> {
        self.tables.lock().await.attendance.values().cloned().collect()
    }

    pub async fn token_count(&self) -> usize {
        self.tables.lock().await.tokens.len()
    }
}

#[async_trait]
impl TicketStore for MemoryGateStore {
    async fn get_ticket(&self, id: i64) -> Result<Option<Ticket>, StoreError> {
        Ok(self.tables.lock().await.tickets.get(&id).cloned())
    }
}

#[async_trait]
impl EventStore for MemoryGateStore {
    async fn get_event(&self, id: i64) -> Result<Option<Event>, StoreError> {
        Ok(self.tables.lock().await.events.get(&id).cloned())
    }
}

#[async_trait]
impl TokenStore for MemoryGateStore {
    async fn create_token(&self, record: NewIssuedToken) -> Result<IssuedToken, StoreError> {
        let issued = IssuedToken {
            token: record.token.clone(),
            ticket_id: record.ticket_id,
            event_id: record.event_id,
            owner_id: record.owner_id,
            created_at: Utc::now(),
            expires_at: record.expires_at,
        };
        self.tables
            .lock()
            .await
            .tokens
            .insert(record.token, issued.clone());
        Ok(issued)
    }

    async fn find_token(&self, token: &str) -> Result<Option<IssuedToken>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .tokens
            .get(token)
            .filter(|record| record.expires_at > Utc::now())
            .cloned())
    }

    async fn delete_token(&self, token: &str) -> Result<bool, StoreError> {
        Ok(self.tables.lock().await.tokens.remove(token).is_some())
    }

    async fn revoke_for_ticket(&self, ticket_id: i64) -> Result<u64, StoreError> {
        let mut tables = self.tables.lock().await;
        let before = tables.tokens.len();
        tables.tokens.retain(|_, record| record.ticket_id != ticket_id);
        Ok((before - tables.tokens.len()) as u64)
    }

    async fn delete_expired(&self) -> Result<u64, StoreError> {
        let now = Utc::now();
        let mut tables = self.tables.lock().await;
        let before = tables.tokens.len();
        tables.tokens.retain(|_, record| record.expires_at > now);
        Ok((before - tables.tokens.len()) as u64)
    }
}

#[async_trait]
impl RedemptionStore for MemoryGateStore {
    async fn redeem(&self, request: &RedemptionRequest) -> Result<(), RedeemError> {
        let mut tables = self.tables.lock().await;

        let redeemable = tables
            .tickets
            .get(&request.ticket_id)
            .map(|ticket| ticket.status == TicketStatus::Valid)
            .unwrap_or(false);
        if !redeemable {
            return Err(RedeemError::TicketNoLongerValid);
        }

        let live = tables
            .tokens
            .get(&request.token)
            .map(|record| record.expires_at > Utc::now())
            .unwrap_or(false);
        if !live {
            return Err(RedeemError::TokenConsumed);
        }

        // All checks passed; apply every write before releasing the lock.
        let ticket = tables
            .tickets
            .get_mut(&request.ticket_id)
            .ok_or(RedeemError::TicketNoLongerValid)?;
        ticket.status = TicketStatus::Used;
        ticket.updated_at = request.scanned_at;

        tables.tokens.remove(&request.token);

        tables.scan_audit.push(ScanAuditRecord {
            ticket_id: request.ticket_id,
            scanner_id: request.scanner_id,
            scanned_at: request.scanned_at,
        });

        tables
            .attendance
            .entry(request.ticket_id)
            .or_insert(EventAttendance {
                event_id: request.event_id,
                user_id: request.owner_id,
                ticket_id: request.ticket_id,
                checked_in_at: request.scanned_at,
            });

        Ok(())
    }
}
