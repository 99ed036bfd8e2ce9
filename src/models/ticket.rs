use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a ticket. The only transition this service ever
/// performs is `Valid -> Used`, and it is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    Valid,
    Used,
    Cancelled,
    Refunded,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Valid => "VALID",
            TicketStatus::Used => "USED",
            TicketStatus::Cancelled => "CANCELLED",
            TicketStatus::Refunded => "REFUNDED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "VALID" => Some(TicketStatus::Valid),
            "USED" => Some(TicketStatus::Used),
            "CANCELLED" => Some(TicketStatus::Cancelled),
            "REFUNDED" => Some(TicketStatus::Refunded),
            _ => None,
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: i64,
    pub owner_id: i64,
    pub event_id: i64,
    pub status: TicketStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Display-ready ticket summary returned to the scan operator.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketSummary {
    pub id: i64,
    pub event_id: i64,
    pub owner_id: i64,
    pub status: TicketStatus,
}

impl From<&Ticket> for TicketSummary {
    fn from(ticket: &Ticket) -> Self {
        Self {
            id: ticket.id,
            event_id: ticket.event_id,
            owner_id: ticket.owner_id,
            status: ticket.status,
        }
    }
}
