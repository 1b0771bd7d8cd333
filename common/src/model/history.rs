use crate::model::classification::ClassificationRecord;
use serde::{Deserialize, Serialize};

/// Fixed page size of the history listing.
pub const HISTORY_PAGE_SIZE: i64 = 8;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPage {
    pub total_histories: i64,
    pub total_pages: i64,
    pub page: i64,
    pub limit: i64,
    pub histories: Vec<ClassificationRecord>,
    /// Only set when the page is empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Outcome of one item in a batch submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItemOutcome {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Per-item report returned when some batch items fail. Persisted items are
/// not rolled back.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    pub persisted: Vec<BatchItemOutcome>,
    pub failed: Vec<BatchItemOutcome>,
}
