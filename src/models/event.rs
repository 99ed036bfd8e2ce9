use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: i64,
    pub title: String,
    pub location: Option<String>,
    pub starts_at: DateTime<Utc>,
}

/// Display-ready event summary returned to the scan operator.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSummary {
    pub id: i64,
    pub title: String,
    pub date: DateTime<Utc>,
}

impl From<&Event> for EventSummary {
    fn from(event: &Event) -> Self {
        Self {
            id: event.id,
            title: event.title.clone(),
            date: event.starts_at,
        }
    }
}
