use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Append-only audit entry, one per successful redemption.
#[derive(Debug, Clone, Serialize)]
pub struct ScanAuditRecord {
    pub ticket_id: i64,
    pub scanner_id: Uuid,
    pub scanned_at: DateTime<Utc>,
}

/// Check-in row, at most one per ticket. The uniqueness guarantee lives in
/// the store (a `UNIQUE (ticket_id)` constraint in Postgres), not here.
#[derive(Debug, Clone, Serialize)]
pub struct EventAttendance {
    pub event_id: i64,
    pub user_id: i64,
    pub ticket_id: i64,
    pub checked_in_at: DateTime<Utc>,
}
