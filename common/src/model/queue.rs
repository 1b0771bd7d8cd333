use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One staged image waiting for submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingItemSummary {
    pub id: String,
    pub file_name: String,
    pub size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub items: Vec<PendingItemSummary>,
}

/// Token handed back for a short-lived report selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandoffTicket {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}
